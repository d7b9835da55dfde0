//! One frame through the whole pipeline.

use std::sync::Arc;

use image::RgbImage;

use repsense_common::clock::Clock;
use repsense_model::label::ExerciseLabel;
use repsense_model::landmark::LandmarkSet;
use repsense_model::summary::FrameSummary;

use crate::angles::extract_angles;
use crate::classifier::StateClassifier;
use crate::pose::PoseEstimator;
use crate::tracker::ExerciseTracker;

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub summary: FrameSummary,
    /// Landmarks used for this frame, kept for overlay rendering.
    pub landmarks: Option<LandmarkSet>,
    /// Label the frame was classified as (Idle when no valid pose).
    pub label: ExerciseLabel,
}

/// Drives pose estimation, angle extraction, classification and tracker
/// updates for single frames.
///
/// Stateless apart from its shared collaborators; all accumulated state lives
/// in the [`ExerciseTracker`] passed to each call.
#[derive(Clone)]
pub struct FrameProcessor {
    estimator: Arc<dyn PoseEstimator>,
    classifier: Arc<dyn StateClassifier>,
    clock: Arc<dyn Clock>,
}

impl FrameProcessor {
    pub fn new(
        estimator: Arc<dyn PoseEstimator>,
        classifier: Arc<dyn StateClassifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            estimator,
            classifier,
            clock,
        }
    }

    /// Estimate, classify, and record one RGB frame.
    pub fn process_frame(
        &self,
        frame: &RgbImage,
        tracker: &mut ExerciseTracker,
        weight_kg: f64,
    ) -> FrameOutcome {
        let landmarks = match self.estimator.estimate(frame) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                tracing::warn!(
                    estimator = self.estimator.name(),
                    error = %e,
                    "Pose estimation failed, treating frame as no pose"
                );
                None
            }
        };
        self.observe(landmarks, tracker, weight_kg)
    }

    /// Classify already-estimated landmarks and record the result.
    pub fn observe(
        &self,
        landmarks: Option<LandmarkSet>,
        tracker: &mut ExerciseTracker,
        weight_kg: f64,
    ) -> FrameOutcome {
        let label = landmarks
            .as_ref()
            .map(|l| self.classify(l))
            .unwrap_or_default();
        let now = self.clock.now_secs();
        let summary = tracker.observe(&label, weight_kg, now);

        FrameOutcome {
            summary,
            landmarks,
            label,
        }
    }

    fn classify(&self, landmarks: &LandmarkSet) -> ExerciseLabel {
        let angles = extract_angles(landmarks);
        if !angles.is_valid() {
            return ExerciseLabel::Idle;
        }
        match self.classifier.classify(&angles) {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(
                    classifier = self.classifier.name(),
                    error = %e,
                    "Classification failed, treating frame as Idle"
                );
                ExerciseLabel::Idle
            }
        }
    }

    pub fn estimator(&self) -> &Arc<dyn PoseEstimator> {
        &self.estimator
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for FrameProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameProcessor")
            .field("estimator", &self.estimator.name())
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repsense_common::clock::ManualClock;
    use repsense_common::error::{RepsenseError, RepsenseResult};
    use repsense_model::landmark::{Landmark, POSE_LANDMARK_COUNT};
    use repsense_model::met::MetTable;

    use crate::angles::AngleVector;

    struct FixedPose(Option<LandmarkSet>);

    impl PoseEstimator for FixedPose {
        fn estimate(&self, _frame: &RgbImage) -> RepsenseResult<Option<LandmarkSet>> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingPose;

    impl PoseEstimator for FailingPose {
        fn estimate(&self, _frame: &RgbImage) -> RepsenseResult<Option<LandmarkSet>> {
            Err(RepsenseError::pose("sidecar exited"))
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct AlwaysSquats;

    impl StateClassifier for AlwaysSquats {
        fn classify(&self, _angles: &AngleVector) -> RepsenseResult<ExerciseLabel> {
            Ok(ExerciseLabel::Squats)
        }
        fn name(&self) -> &str {
            "squats"
        }
    }

    struct BrokenClassifier;

    impl StateClassifier for BrokenClassifier {
        fn classify(&self, _angles: &AngleVector) -> RepsenseResult<ExerciseLabel> {
            Err(RepsenseError::classifier("model not loaded"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    fn bent_knee_pose() -> LandmarkSet {
        let mut landmarks = vec![Landmark::new(0.5, 0.5); POSE_LANDMARK_COUNT];
        landmarks[11] = Landmark::new(0.45, 0.35);
        landmarks[13] = Landmark::new(0.55, 0.45);
        landmarks[15] = Landmark::new(0.60, 0.35);
        landmarks[23] = Landmark::new(0.40, 0.60);
        landmarks[25] = Landmark::new(0.55, 0.65);
        landmarks[27] = Landmark::new(0.45, 0.85);
        LandmarkSet::new(landmarks)
    }

    fn processor(
        estimator: impl PoseEstimator + 'static,
        classifier: impl StateClassifier + 'static,
    ) -> FrameProcessor {
        FrameProcessor::new(
            Arc::new(estimator),
            Arc::new(classifier),
            Arc::new(ManualClock::new(1_700_000_000.0)),
        )
    }

    fn tracker() -> ExerciseTracker {
        ExerciseTracker::new([(ExerciseLabel::Squats, 5.0)].into_iter().collect::<MetTable>())
    }

    #[test]
    fn test_valid_pose_is_classified() {
        let processor = processor(FixedPose(Some(bent_knee_pose())), AlwaysSquats);
        let mut tracker = tracker();
        let outcome = processor.process_frame(&RgbImage::new(4, 4), &mut tracker, 75.0);
        assert_eq!(outcome.label, ExerciseLabel::Squats);
        assert_eq!(outcome.summary.current_state, Some(ExerciseLabel::Squats));
        assert!(outcome.landmarks.is_some());
    }

    #[test]
    fn test_no_pose_is_idle() {
        let processor = processor(FixedPose(None), AlwaysSquats);
        let mut tracker = tracker();
        let outcome = processor.process_frame(&RgbImage::new(4, 4), &mut tracker, 75.0);
        assert_eq!(outcome.label, ExerciseLabel::Idle);
        assert_eq!(outcome.summary.current_state, None);
        assert_eq!(outcome.summary.exercise_types_count, 1);
    }

    #[test]
    fn test_incomplete_pose_skips_classifier() {
        let partial = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); 10]);
        let processor = processor(FixedPose(Some(partial)), AlwaysSquats);
        let mut tracker = tracker();
        let outcome = processor.process_frame(&RgbImage::new(4, 4), &mut tracker, 75.0);
        assert_eq!(outcome.label, ExerciseLabel::Idle);
    }

    #[test]
    fn test_estimator_error_degrades_to_idle() {
        let processor = processor(FailingPose, AlwaysSquats);
        let mut tracker = tracker();
        let outcome = processor.process_frame(&RgbImage::new(4, 4), &mut tracker, 75.0);
        assert_eq!(outcome.label, ExerciseLabel::Idle);
        assert!(outcome.landmarks.is_none());
    }

    #[test]
    fn test_classifier_error_degrades_to_idle() {
        let processor = processor(FixedPose(Some(bent_knee_pose())), BrokenClassifier);
        let mut tracker = tracker();
        let outcome = processor.process_frame(&RgbImage::new(4, 4), &mut tracker, 75.0);
        assert_eq!(outcome.label, ExerciseLabel::Idle);
        assert_eq!(tracker.exercise_types().len(), 1);
    }
}
