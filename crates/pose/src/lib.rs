//! Repsense Pose — body-pose estimation via a sidecar process
//!
//! Landmark detection runs in a separate long-lived process that speaks a
//! line-delimited JSON protocol on stdin/stdout. This crate owns that
//! process and exposes it as a [`repsense_core::PoseEstimator`].

pub mod protocol;
pub mod sidecar;

pub use protocol::{parse_response, PoseRequest, PoseResponse};
pub use sidecar::SidecarPoseEstimator;
