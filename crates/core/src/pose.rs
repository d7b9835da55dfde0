//! Pose-estimation seam.

use image::RgbImage;

use repsense_common::error::RepsenseResult;
use repsense_model::landmark::LandmarkSet;

/// Trait for body-pose estimators.
///
/// Implementations hold one long-lived estimation context and must be safe
/// to share across request threads.
pub trait PoseEstimator: Send + Sync {
    /// Estimate landmarks for one RGB frame. `Ok(None)` means no body was
    /// detected.
    fn estimate(&self, frame: &RgbImage) -> RepsenseResult<Option<LandmarkSet>>;

    /// Estimator name for logging.
    fn name(&self) -> &str;

    /// Check if the estimator can run on this host.
    fn is_available(&self) -> bool {
        true
    }
}
