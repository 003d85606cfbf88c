//! Forward kinematics for a two-axis pan-tilt camera mount.
//!
//! [`PanTiltKinematics`] maps a pan angle and a tilt angle to the rigid-body
//! transform from the mount's base frame to the camera frame: a 4×4
//! homogeneous matrix, its translation and rotation sub-blocks, and a unit
//! quaternion form of the rotation.
//!
//! # Example
//!
//! ```rust
//! use pantilt_kinematics::{MountOffsets, PanTiltKinematics};
//!
//! // Camera 10 cm out from the tilt axis, 20 cm up the pan column.
//! let fk = PanTiltKinematics::new(MountOffsets::new(0.1, 0.2));
//!
//! let t = fk.translation(0.0, 0.0);
//! assert!((t.x - 0.1).abs() < 1e-12);
//! assert!((t.z - 0.2).abs() < 1e-12);
//! ```

pub mod engine;

pub use engine::{MountOffsets, PanTiltKinematics};
