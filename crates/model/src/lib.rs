//! Repsense Data Model
//!
//! Defines the data contracts shared by the tracking pipeline:
//! - **Landmarks:** Per-frame body keypoints from the pose estimator
//! - **Labels:** The closed set of exercise states the classifier emits
//! - **MET tables:** Metabolic-equivalent rates for trackable exercises
//! - **Summaries:** Frame-level and session-level tracking output
//!
//! All landmark coordinates are normalized to `[0.0, 1.0]` relative to the
//! frame so they survive resolution changes between sources.

pub mod label;
pub mod landmark;
pub mod met;
pub mod summary;

pub use label::*;
pub use landmark::*;
pub use met::*;
pub use summary::*;
