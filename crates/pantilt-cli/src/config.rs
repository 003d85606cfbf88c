//! Launch configuration – reads the node's TOML parameter file.

use std::fs;
use std::path::Path;

use pantilt_kinematics::{MountOffsets, PanTiltKinematics};
use pantilt_types::PanTiltError;
use serde::{Deserialize, Serialize};

fn default_pan_joint() -> String {
    "pan".to_string()
}
fn default_tilt_joint() -> String {
    "tilt".to_string()
}
fn default_ws_port() -> u16 {
    9090
}
fn default_channel_capacity() -> usize {
    256
}

/// Node configuration, loaded once at startup.
///
/// The five core parameters (`a`, `d`, `parent_frame`, `child_frame`,
/// `joint_input_topic`) carry no defaults: a file that omits any of them
/// fails to parse and the process must not start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Horizontal offset between the tilt axis and the camera centre, metres.
    pub a: f64,
    /// Vertical offset along the pan axis, metres.
    pub d: f64,
    /// Name of the fixed base frame the transform is expressed in.
    pub parent_frame: String,
    /// Name of the camera frame the transform points at.
    pub child_frame: String,
    /// Topic carrying joint-state samples.
    pub joint_input_topic: String,

    /// Joint name whose position is read as the pan angle.
    #[serde(default = "default_pan_joint")]
    pub pan_joint: String,

    /// Joint name whose position is read as the tilt angle.
    #[serde(default = "default_tilt_joint")]
    pub tilt_joint: String,

    /// WebSocket port of the joint-state bridge.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// Event-bus channel capacity.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Optional camera alignment correction, row-major 4×4.  An override
    /// that is not 4×4 is rejected with a logged warning and the identity
    /// default is kept.
    #[serde(default)]
    pub alignment: Option<Vec<Vec<f64>>>,
}

impl NodeConfig {
    /// Load and validate the configuration at `path`.
    ///
    /// Environment overrides are a separate step; callers that want them
    /// apply [`apply_env_overrides`] after loading.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PanTiltError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| PanTiltError::Config(format!("failed to read {}: {e}", path.display())))?;
        let cfg: Self = toml::from_str(&raw).map_err(|e| {
            PanTiltError::Config(format!("failed to parse {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations that would produce unusable transforms.
    pub fn validate(&self) -> Result<(), PanTiltError> {
        if !self.a.is_finite() || !self.d.is_finite() {
            return Err(PanTiltError::Config(
                "offsets a and d must be finite".to_string(),
            ));
        }
        for (field, value) in [
            ("parent_frame", &self.parent_frame),
            ("child_frame", &self.child_frame),
            ("joint_input_topic", &self.joint_input_topic),
            ("pan_joint", &self.pan_joint),
            ("tilt_joint", &self.tilt_joint),
        ] {
            if value.is_empty() {
                return Err(PanTiltError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Build the kinematics engine this configuration describes.
    pub fn engine(&self) -> PanTiltKinematics {
        let engine = PanTiltKinematics::new(MountOffsets::new(self.a, self.d));
        match &self.alignment {
            Some(rows) => engine.with_alignment_rows(rows),
            None => engine,
        }
    }
}

/// Apply `PANTILT_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `PANTILT_JOINT_INPUT_TOPIC` | `joint_input_topic` |
/// | `PANTILT_PARENT_FRAME` | `parent_frame` |
/// | `PANTILT_CHILD_FRAME` | `child_frame` |
/// | `PANTILT_WS_PORT` | `ws_port` |
pub fn apply_env_overrides(cfg: &mut NodeConfig) {
    if let Ok(v) = std::env::var("PANTILT_JOINT_INPUT_TOPIC") {
        cfg.joint_input_topic = v;
    }
    if let Ok(v) = std::env::var("PANTILT_PARENT_FRAME") {
        cfg.parent_frame = v;
    }
    if let Ok(v) = std::env::var("PANTILT_CHILD_FRAME") {
        cfg.child_frame = v;
    }
    if let Ok(v) = std::env::var("PANTILT_WS_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.ws_port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
        a = 0.1
        d = 0.2
        parent_frame = "pantilt_base"
        child_frame = "camera"
        joint_input_topic = "/pantilt/joint_states"
    "#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tmp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn load_full_config_applies_defaults() {
        let file = write_config(FULL);
        let cfg = NodeConfig::load(file.path()).expect("load");

        assert!((cfg.a - 0.1).abs() < f64::EPSILON);
        assert!((cfg.d - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.parent_frame, "pantilt_base");
        assert_eq!(cfg.child_frame, "camera");
        assert_eq!(cfg.joint_input_topic, "/pantilt/joint_states");
        assert_eq!(cfg.pan_joint, "pan");
        assert_eq!(cfg.tilt_joint, "tilt");
        assert_eq!(cfg.ws_port, 9090);
        assert_eq!(cfg.channel_capacity, 256);
        assert!(cfg.alignment.is_none());
    }

    #[test]
    fn load_fails_without_required_offset() {
        let file = write_config(
            r#"
            d = 0.2
            parent_frame = "pantilt_base"
            child_frame = "camera"
            joint_input_topic = "/pantilt/joint_states"
        "#,
        );
        let result = NodeConfig::load(file.path());
        assert!(matches!(result, Err(PanTiltError::Config(_))));
    }

    #[test]
    fn load_fails_without_topic() {
        let file = write_config(
            r#"
            a = 0.1
            d = 0.2
            parent_frame = "pantilt_base"
            child_frame = "camera"
        "#,
        );
        assert!(matches!(
            NodeConfig::load(file.path()),
            Err(PanTiltError::Config(_))
        ));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let result = NodeConfig::load("/nonexistent/path/pantilt.toml");
        assert!(matches!(result, Err(PanTiltError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_frame_name() {
        let file = write_config(FULL);
        let mut cfg = NodeConfig::load(file.path()).unwrap();
        cfg.child_frame.clear();
        assert!(matches!(cfg.validate(), Err(PanTiltError::Config(_))));
    }

    #[test]
    fn validate_rejects_non_finite_offsets() {
        let file = write_config(FULL);
        let mut cfg = NodeConfig::load(file.path()).unwrap();
        cfg.a = f64::NAN;
        assert!(matches!(cfg.validate(), Err(PanTiltError::Config(_))));
    }

    #[test]
    fn engine_uses_configured_offsets() {
        let file = write_config(FULL);
        let cfg = NodeConfig::load(file.path()).unwrap();
        let engine = cfg.engine();
        let t = engine.translation(0.0, 0.0);
        assert!((t.x - 0.1).abs() < 1e-12);
        assert!((t.z - 0.2).abs() < 1e-12);
    }

    #[test]
    fn engine_applies_well_formed_alignment() {
        let file = write_config(
            r#"
            a = 0.0
            d = 0.0
            parent_frame = "pantilt_base"
            child_frame = "camera"
            joint_input_topic = "/pantilt/joint_states"
            alignment = [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.5],
                [0.0, 0.0, 0.0, 1.0],
            ]
        "#,
        );
        let cfg = NodeConfig::load(file.path()).unwrap();
        let engine = cfg.engine();
        // The camera-frame z shift lands on base -y at rest.
        let t = engine.translation(0.0, 0.0);
        assert!((t.y + 0.5).abs() < 1e-12);
    }

    #[test]
    fn engine_keeps_identity_for_misshapen_alignment() {
        let file = write_config(
            r#"
            a = 0.0
            d = 0.0
            parent_frame = "pantilt_base"
            child_frame = "camera"
            joint_input_topic = "/pantilt/joint_states"
            alignment = [
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ]
        "#,
        );
        let cfg = NodeConfig::load(file.path()).unwrap();
        let engine = cfg.engine();
        let t = engine.translation(0.0, 0.0);
        assert!(t.x.abs() < 1e-12);
        assert!(t.y.abs() < 1e-12);
        assert!(t.z.abs() < 1e-12);
    }

    fn in_memory_config() -> NodeConfig {
        toml::from_str(FULL).expect("parse")
    }

    #[test]
    fn env_overrides_change_topic() {
        // SAFETY: no other test touches this env var.
        unsafe { std::env::set_var("PANTILT_JOINT_INPUT_TOPIC", "/robot/joints") };
        let mut cfg = in_memory_config();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.joint_input_topic, "/robot/joints");
        unsafe { std::env::remove_var("PANTILT_JOINT_INPUT_TOPIC") };
    }

    #[test]
    fn env_override_ignores_invalid_port() {
        // SAFETY: no other test touches this env var.
        unsafe { std::env::set_var("PANTILT_WS_PORT", "not-a-port") };
        let mut cfg = in_memory_config();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.ws_port, 9090);
        unsafe { std::env::remove_var("PANTILT_WS_PORT") };
    }
}
