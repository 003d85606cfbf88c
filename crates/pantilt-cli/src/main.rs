//! `pantilt-tf` – pan-tilt transform broadcaster.
//!
//! The binary:
//!
//! 1. Loads the launch configuration (first CLI argument, default
//!    `pantilt.toml`); an incomplete configuration is fatal.
//! 2. Builds the kinematics engine, the event bus, the WebSocket joint
//!    bridge and the transform broadcaster.
//! 3. Broadcasts one stamped base-to-camera transform per received joint
//!    sample until Ctrl-C.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use pantilt_middleware::{EventBus, JointBridge, TransformBroadcaster};
use tracing::{error, info};

use config::NodeConfig;

#[tokio::main]
async fn main() {
    // Structured logging via RUST_LOG (defaults to "info").  Set
    // PANTILT_LOG_FORMAT=json to emit newline-delimited JSON logs suitable
    // for log aggregators.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("PANTILT_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pantilt.toml".to_string());
    let mut cfg = match NodeConfig::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(path = %path, error = %e, "cannot start without a complete configuration");
            std::process::exit(1);
        }
    };
    config::apply_env_overrides(&mut cfg);
    if let Err(e) = cfg.validate() {
        error!(error = %e, "environment overrides produced an invalid configuration");
        std::process::exit(1);
    }

    let bus = Arc::new(EventBus::new(cfg.channel_capacity));

    let broadcaster = TransformBroadcaster::new(
        Arc::clone(&bus),
        cfg.engine(),
        cfg.parent_frame.clone(),
        cfg.child_frame.clone(),
        cfg.joint_input_topic.clone(),
        cfg.pan_joint.clone(),
        cfg.tilt_joint.clone(),
    );
    tokio::spawn(async move { broadcaster.run().await });

    let bridge = JointBridge::new(Arc::clone(&bus), cfg.joint_input_topic.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.ws_port));
    info!(topic = %cfg.joint_input_topic, "subscribing to joint samples");
    info!(
        parent = %cfg.parent_frame,
        child = %cfg.child_frame,
        addr = %addr,
        "ready to broadcast transforms"
    );
    tokio::spawn(async move {
        if let Err(e) = bridge.run_ws_server(addr).await {
            error!(error = %e, "joint bridge failed");
            std::process::exit(1);
        }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received; shutting down"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}
