//! Repsense Core — the per-frame tracking pipeline
//!
//! Turns pose landmarks into a running exercise summary:
//! - **Angles:** Five joint angles from a landmark set
//! - **Classification:** Angle vector to exercise label, behind a trait seam
//! - **Rep counting:** Debounced Idle-to-exercise transitions per exercise
//! - **Calories:** MET-rate integration over wall-clock time
//! - **Frame processing:** One frame through all of the above
//! - **Sessions:** Independent tracker state per live session id
//!
//! Pose estimation and classification are external collaborators reached
//! through [`PoseEstimator`] and [`StateClassifier`]; time is read through an
//! injected [`repsense_common::Clock`].

pub mod angles;
pub mod calories;
pub mod classifier;
pub mod frame;
pub mod pose;
pub mod rep_counter;
pub mod sessions;
pub mod tracker;

pub use angles::{calculate_angle, extract_angles, AngleVector};
pub use calories::CalorieTracker;
pub use classifier::{ForestClassifier, StateClassifier};
pub use frame::{FrameOutcome, FrameProcessor};
pub use pose::PoseEstimator;
pub use rep_counter::{RepCounter, RepCounterSet, DEFAULT_DEBOUNCE_SECS};
pub use sessions::{lock_session, Session, SessionHandle, SessionStore};
pub use tracker::ExerciseTracker;
