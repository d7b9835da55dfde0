pub mod analyze;
pub mod check;
pub mod serve;

use std::sync::Arc;

use repsense_common::clock::SystemClock;
use repsense_common::config::AppConfig;
use repsense_core::{ForestClassifier, FrameProcessor};
use repsense_pose::SidecarPoseEstimator;

/// The production collaborators: pose sidecar, forest model, wall clock.
pub(crate) struct Collaborators {
    pub estimator: Arc<SidecarPoseEstimator>,
    pub classifier: Arc<ForestClassifier>,
    pub clock: Arc<SystemClock>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let classifier = ForestClassifier::load(&config.classifier.model_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to load classifier model {}: {e}",
                config.classifier.model_path.display()
            )
        })?;
        Ok(Self {
            estimator: Arc::new(SidecarPoseEstimator::from_config(&config.pose)),
            classifier: Arc::new(classifier),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn processor(&self) -> FrameProcessor {
        FrameProcessor::new(
            self.estimator.clone(),
            self.classifier.clone(),
            self.clock.clone(),
        )
    }
}
