//! Application configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RepsenseError, RepsenseResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP surface settings.
    pub server: ServerConfig,

    /// Tracker defaults (weight, debounce, MET tables).
    pub tracking: TrackingConfig,

    /// Pose-estimation sidecar.
    pub pose: PoseConfig,

    /// Exercise-state classifier.
    pub classifier: ClassifierConfig,

    /// Batch video processing.
    pub video: VideoConfig,

    /// Live session lifecycle.
    pub sessions: SessionConfig,

    /// Where the latest results summary is written.
    pub results_path: PathBuf,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Directory uploaded videos are staged in while they are analyzed.
    pub upload_dir: PathBuf,

    /// Maximum accepted request body in bytes.
    pub max_upload_bytes: usize,

    /// Comma-separated origin list, or `*` for any origin.
    pub cors_allowed_origins: String,
}

/// Tracker defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Body weight used when a request does not supply one.
    pub default_weight_kg: f64,

    /// Minimum time between counted transitions.
    pub debounce_secs: f64,

    /// MET values used for batch video analysis, keyed by exercise label.
    pub batch_met: BTreeMap<String, f64>,

    /// MET values used for live sessions, keyed by exercise label.
    pub live_met: BTreeMap<String, f64>,
}

/// Pose-estimation sidecar command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub command: String,
    pub args: Vec<String>,

    /// Seconds to wait for the sidecar to answer one frame before it is
    /// killed and respawned.
    pub response_timeout_secs: f64,
}

/// Classifier model location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
}

/// Batch video processing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frame rate assumed when the container reports none.
    pub fallback_fps: f64,

    /// Frame count assumed when the container reports none (logging only).
    pub fallback_frame_count: u64,

    /// TrueType font for the text overlay. The bundled DejaVu Sans Mono is
    /// used when unset.
    pub overlay_font: Option<PathBuf>,

    /// Directory transient annotated videos are written to.
    pub artifact_dir: Option<PathBuf>,
}

/// Live session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which an abandoned session is evicted. `None` disables eviction.
    pub idle_timeout_secs: Option<u64>,

    /// How often the eviction sweep runs.
    pub sweep_interval_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "repsense_core=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tracking: TrackingConfig::default(),
            pose: PoseConfig::default(),
            classifier: ClassifierConfig::default(),
            video: VideoConfig::default(),
            sessions: SessionConfig::default(),
            results_path: PathBuf::from("results.json"),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            upload_dir: PathBuf::from("Uploads"),
            max_upload_bytes: 100 * 1024 * 1024,
            cors_allowed_origins: "*".to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_weight_kg: 75.0,
            debounce_secs: 0.5,
            batch_met: met_table(&[
                ("Squats", 5.0),
                ("Push Ups", 2.0),
                ("Jumping Jacks", 8.0),
                ("Pull-ups", 6.0),
                ("Russian Twists", 4.0),
            ]),
            live_met: met_table(&[
                ("Squats", 5.0),
                ("Push Ups", 8.0),
                ("Jumping Jacks", 8.0),
                ("Pull-ups", 6.0),
                ("Russian Twists", 4.0),
            ]),
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            command: "repsense-pose".to_string(),
            args: Vec::new(),
            response_timeout_secs: 30.0,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("exercise_classifier.json"),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fallback_fps: 30.0,
            fallback_frame_count: 10_000,
            overlay_font: None,
            artifact_dir: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: Some(30 * 60),
            sweep_interval_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// Environment overrides are applied last.
    pub fn load() -> Self {
        let config_path = config_file_path();
        let mut config = if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config
    }

    /// Load config from an explicit path. Missing fields take their defaults.
    pub fn load_from(path: &Path) -> RepsenseResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RepsenseError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            RepsenseError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PORT`, `UPLOAD_FOLDER`, `REPSENSE_RESULTS_PATH` and
    /// `CORS_ALLOWED_ORIGINS` from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT"),
            }
        }
        if let Ok(dir) = std::env::var("UPLOAD_FOLDER") {
            self.server.upload_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("REPSENSE_RESULTS_PATH") {
            self.results_path = PathBuf::from(path);
        }
        if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = origins;
        }
    }

    /// Reject values the trackers cannot work with.
    pub fn validate(&self) -> RepsenseResult<()> {
        if !(self.tracking.default_weight_kg > 0.0) {
            return Err(RepsenseError::config("tracking.default_weight_kg must be positive"));
        }
        if self.tracking.debounce_secs < 0.0 {
            return Err(RepsenseError::config("tracking.debounce_secs must not be negative"));
        }
        for (label, met) in self
            .tracking
            .batch_met
            .iter()
            .chain(self.tracking.live_met.iter())
        {
            if !(*met >= 0.0) {
                return Err(RepsenseError::config(format!(
                    "MET value for {label} must be a non-negative number"
                )));
            }
        }
        let timeout = self.pose.response_timeout_secs;
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(RepsenseError::config(
                "pose.response_timeout_secs must be a positive number",
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(RepsenseError::config("server.max_upload_bytes must be non-zero"));
        }
        Ok(())
    }
}

fn met_table(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(label, met)| (label.to_string(), *met))
        .collect()
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("repsense").join("config.json")
}
