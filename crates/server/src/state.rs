//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use repsense_common::clock::Clock;
use repsense_common::config::AppConfig;
use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_core::{FrameProcessor, PoseEstimator, SessionStore, StateClassifier};
use repsense_model::met::MetTable;
use repsense_video::BatchRunner;

/// Per-request knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub default_weight_kg: f64,
    pub results_path: PathBuf,
    pub cors_allowed_origins: String,
}

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub processor: FrameProcessor,
    pub batch: Arc<BatchRunner>,
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    /// Wire the pipeline from configuration and the external collaborators.
    pub fn from_config(
        config: &AppConfig,
        estimator: Arc<dyn PoseEstimator>,
        classifier: Arc<dyn StateClassifier>,
        clock: Arc<dyn Clock>,
    ) -> RepsenseResult<Self> {
        let batch_met = MetTable::from_named(&config.tracking.batch_met);
        let live_met = MetTable::from_named(&config.tracking.live_met);
        if batch_met.is_empty() || live_met.is_empty() {
            return Err(RepsenseError::config("MET tables must not be empty"));
        }

        let processor = FrameProcessor::new(estimator, classifier, Arc::clone(&clock));
        let batch = BatchRunner::new(processor.clone(), batch_met, config.video.clone())?
            .with_debounce(config.tracking.debounce_secs)
            .with_results_path(config.results_path.clone());
        let sessions = SessionStore::new(live_met, config.tracking.debounce_secs, clock);

        Ok(Self {
            sessions: Arc::new(sessions),
            processor,
            batch: Arc::new(batch),
            settings: Arc::new(ServerSettings {
                upload_dir: config.server.upload_dir.clone(),
                max_upload_bytes: config.server.max_upload_bytes,
                default_weight_kg: config.tracking.default_weight_kg,
                results_path: config.results_path.clone(),
                cors_allowed_origins: config.server.cors_allowed_origins.clone(),
            }),
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions.len())
            .field("processor", &self.processor)
            .field("settings", &self.settings)
            .finish()
    }
}
