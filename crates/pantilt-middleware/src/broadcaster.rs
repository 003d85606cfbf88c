//! Transform broadcaster.
//!
//! [`TransformBroadcaster`] consumes joint-state samples from the event bus,
//! evaluates the pan-tilt forward kinematics once per sample, and publishes
//! the resulting base-to-camera transform on the [`Topic::Transforms`] lane,
//! stamped at receipt.
//!
//! Samples are independent: nothing is carried between evaluations, so a
//! dropped or reordered sample only costs its own transform.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pantilt_kinematics::PanTiltKinematics;
use pantilt_types::{Event, EventPayload, FrameTransform, JointStateSample, PanTiltError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bus::{EventBus, Topic};

/// Evaluates forward kinematics per joint sample and broadcasts the result.
pub struct TransformBroadcaster {
    bus: Arc<EventBus>,
    engine: PanTiltKinematics,
    parent_frame: String,
    child_frame: String,
    joint_topic: String,
    pan_joint: String,
    tilt_joint: String,
}

impl TransformBroadcaster {
    /// Create a broadcaster.
    ///
    /// `joint_topic` names the input topic whose samples this broadcaster
    /// reacts to; `pan_joint` / `tilt_joint` name the joints whose positions
    /// are looked up within each sample.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<EventBus>,
        engine: PanTiltKinematics,
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        joint_topic: impl Into<String>,
        pan_joint: impl Into<String>,
        tilt_joint: impl Into<String>,
    ) -> Self {
        Self {
            bus,
            engine,
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            joint_topic: joint_topic.into(),
            pan_joint: pan_joint.into(),
            tilt_joint: tilt_joint.into(),
        }
    }

    /// Compute the stamped transform for one joint-state sample.
    ///
    /// The pan and tilt angles are located by joint name within the sample;
    /// array order and unrelated joints do not matter.  A sample that lacks
    /// either joint yields [`PanTiltError::MissingJoint`].
    pub fn compute(
        &self,
        sample: &JointStateSample,
        received_at: DateTime<Utc>,
    ) -> Result<FrameTransform, PanTiltError> {
        sample.validate()?;
        let pan = sample
            .position_of(&self.pan_joint)
            .ok_or_else(|| PanTiltError::MissingJoint(self.pan_joint.clone()))?;
        let tilt = sample
            .position_of(&self.tilt_joint)
            .ok_or_else(|| PanTiltError::MissingJoint(self.tilt_joint.clone()))?;

        let t = self.engine.translation(pan, tilt);
        let q = self.engine.quaternion(pan, tilt);

        Ok(FrameTransform {
            translation: [t.x, t.y, t.z],
            rotation: [q.i, q.j, q.k, q.w],
            timestamp: received_at,
            parent_frame: self.parent_frame.clone(),
            child_frame: self.child_frame.clone(),
        })
    }

    /// Compute and publish the transform for one sample.
    ///
    /// Returns the number of bus receivers that were handed the event.
    pub fn broadcast(&self, sample: &JointStateSample) -> Result<usize, PanTiltError> {
        let tf = self.compute(sample, Utc::now())?;
        let event = Event {
            id: Uuid::new_v4(),
            timestamp: tf.timestamp,
            source: "pantilt-middleware::tf".to_string(),
            payload: EventPayload::Transform(tf),
        };
        Ok(self.bus.publish_to(Topic::Transforms, event))
    }

    /// Consume joint samples from the bus until it shuts down.
    ///
    /// Events whose source does not name the configured input topic are
    /// skipped.  Malformed samples and samples missing the pan or tilt joint
    /// are logged and dropped; they never stop the loop.
    pub async fn run(&self) {
        let mut rx = self.bus.subscribe_to(Topic::JointStates);
        info!(
            topic = %self.joint_topic,
            parent = %self.parent_frame,
            child = %self.child_frame,
            "broadcasting transforms"
        );

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !event.source.ends_with(self.joint_topic.as_str()) {
                        continue;
                    }
                    let EventPayload::JointState(sample) = event.payload else {
                        continue;
                    };
                    match self.broadcast(&sample) {
                        Ok(receivers) => {
                            debug!(receivers, "transform broadcast");
                        }
                        Err(e) => {
                            warn!(error = %e, "dropping joint sample");
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "joint subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
