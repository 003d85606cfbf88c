//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! Traffic is partitioned into two [`Topic`] lanes so components only receive
//! the messages they care about:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::JointStates`] | Joint-angle samples arriving at sensor rate |
//! | [`Topic::Transforms`] | Stamped base-to-camera transforms, one per sample |

use pantilt_types::Event;
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of the routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Joint-angle samples ingested from the input topic.
    JointStates,
    /// Stamped frame transforms produced by the broadcaster.
    Transforms,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    joint_states: broadcast::Sender<Event>,
    transforms: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (joint_states, _) = broadcast::channel(capacity);
        let (transforms, _) = broadcast::channel(capacity);
        Self {
            joint_states,
            transforms,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event.
    /// Zero means no subscriber is currently listening on the topic – a
    /// normal condition for a publisher that starts before its consumers.
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        self.topic_sender(topic).send(event).unwrap_or(0)
    }

    /// Subscribe to a specific [`Topic`] channel.
    ///
    /// The returned [`TopicReceiver`] yields only events published to that
    /// topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::JointStates => &self.joint_states,
            Topic::Transforms => &self.transforms,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
