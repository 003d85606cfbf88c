use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on the number of joints accepted in a single sample.
///
/// Samples with more entries are rejected before they reach the event bus so
/// a malformed or malicious publisher cannot exhaust memory.
pub const MAX_JOINTS: usize = 256;

/// One joint-state sample from the input topic.
///
/// Mirrors the `sensor_msgs/JointState` layout: a list of joint names and a
/// parallel list of angular positions in radians. The serde aliases accept
/// the ROS field spellings (`name`, `position`) so rosbridge JSON frames
/// deserialize without translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointStateSample {
    #[serde(alias = "name")]
    pub names: Vec<String>,
    #[serde(alias = "position")]
    pub positions: Vec<f64>,
}

impl JointStateSample {
    /// Build a sample from parallel name/position lists.
    pub fn new(names: Vec<String>, positions: Vec<f64>) -> Self {
        Self { names, positions }
    }

    /// Position of the first joint called `joint`, if present.
    pub fn position_of(&self, joint: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == joint)
            .and_then(|i| self.positions.get(i).copied())
    }

    /// Reject samples whose name/position lists disagree in length or exceed
    /// [`MAX_JOINTS`].
    pub fn validate(&self) -> Result<(), PanTiltError> {
        if self.names.len() != self.positions.len() {
            return Err(PanTiltError::Parsing(format!(
                "joint sample has {} names but {} positions",
                self.names.len(),
                self.positions.len(),
            )));
        }
        if self.names.len() > MAX_JOINTS {
            return Err(PanTiltError::Parsing(format!(
                "joint sample has {} joints, exceeding the limit of {}",
                self.names.len(),
                MAX_JOINTS,
            )));
        }
        Ok(())
    }
}

/// A stamped rigid-body transform between two named frames.
///
/// `rotation` is a unit quaternion in `(x, y, z, w)` order; `translation` is
/// metres in the parent frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
    pub timestamp: DateTime<Utc>,
    pub parent_frame: String,
    pub child_frame: String,
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. "pantilt-middleware::bridge/pantilt/joint_states"
    pub source: String,
    pub payload: EventPayload,
}

/// Variants of data routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    JointState(JointStateSample),
    Transform(FrameTransform),
}

/// Global error type spanning channel failures, malformed input, and
/// configuration problems.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum PanTiltError {
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Parse error: {0}")]
    Parsing(String),

    #[error("Joint '{0}' not present in sample")]
    MissingJoint(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
