//! `pantilt-middleware` – event routing for the pan-tilt transform node.
//!
//! Routes joint-state samples from the outside world to the kinematics
//! engine and the resulting frame transforms back out, without caring about
//! the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – typed, topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.
//! - [`bridge`] – WebSocket bridge that ingests rosbridge-style joint-state
//!   frames and streams the live event feed to connected clients.
//! - [`broadcaster`] – evaluates the forward kinematics once per received
//!   joint sample and publishes the stamped base-to-camera transform.

pub mod bridge;
pub mod broadcaster;
pub mod bus;

pub use bridge::JointBridge;
pub use broadcaster::TransformBroadcaster;
pub use bus::{EventBus, Topic, TopicReceiver};
