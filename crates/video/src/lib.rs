//! Repsense Video — batch analysis of recorded workouts
//!
//! Probes and decodes a video with ffmpeg, runs every frame through the core
//! pipeline, and renders an annotated copy with the skeleton and a
//! calorie readout. The annotated copy is transient; only the summary is
//! kept.

pub mod batch;
pub mod ffmpeg;
pub mod overlay;
pub mod probe;

pub use batch::{BatchReport, BatchRunner};
pub use ffmpeg::{FfmpegDecoder, FfmpegEncoder};
pub use overlay::OverlayRenderer;
pub use probe::{ffmpeg_available, probe_video, VideoInfo};
