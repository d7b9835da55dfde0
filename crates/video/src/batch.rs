//! Whole-video analysis.

use std::path::{Path, PathBuf};
use std::time::Instant;

use repsense_common::config::VideoConfig;
use repsense_common::error::RepsenseResult;
use repsense_common::results::write_results;
use repsense_core::{ExerciseTracker, FrameProcessor, DEFAULT_DEBOUNCE_SECS};
use repsense_model::met::MetTable;
use repsense_model::summary::SessionSummary;

use crate::ffmpeg::{FfmpegDecoder, FfmpegEncoder};
use crate::overlay::OverlayRenderer;
use crate::probe::{probe_video, VideoInfo};

const PROGRESS_LOG_EVERY: u64 = 100;

/// Outcome of a batch analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub summary: SessionSummary,
    pub video: VideoInfo,
    pub frames_processed: u64,
    pub elapsed_secs: f64,
}

/// Runs every frame of a video through a [`FrameProcessor`] with a fresh
/// tracker, rendering an annotated copy as it goes.
///
/// The annotated video is transient: it is deleted when the run ends,
/// whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    processor: FrameProcessor,
    met_table: MetTable,
    debounce_secs: f64,
    video: VideoConfig,
    overlay: OverlayRenderer,
    results_path: Option<PathBuf>,
}

impl BatchRunner {
    pub fn new(
        processor: FrameProcessor,
        met_table: MetTable,
        video: VideoConfig,
    ) -> RepsenseResult<Self> {
        let overlay = match &video.overlay_font {
            Some(font) => OverlayRenderer::with_font_file(font)?,
            None => OverlayRenderer::new()?,
        };
        Ok(Self {
            processor,
            met_table,
            debounce_secs: DEFAULT_DEBOUNCE_SECS,
            video,
            overlay,
            results_path: None,
        })
    }

    pub fn with_debounce(mut self, debounce_secs: f64) -> Self {
        self.debounce_secs = debounce_secs;
        self
    }

    /// Overwrite this results file after every successful run.
    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = Some(path.into());
        self
    }

    /// Analyze `input` for a person weighing `weight_kg`.
    pub fn run(&self, input: &Path, weight_kg: f64) -> RepsenseResult<BatchReport> {
        let start = Instant::now();
        let info = probe_video(input, &self.video)?;

        let artifact = ArtifactGuard::new(self.artifact_path());
        let mut decoder = FfmpegDecoder::open(input, &info)?;
        let mut encoder =
            FfmpegEncoder::create(artifact.path(), info.width, info.height, info.fps)?;

        let mut tracker =
            ExerciseTracker::with_debounce(self.met_table.clone(), self.debounce_secs);
        let mut frames = 0u64;
        while let Some(mut frame) = decoder.next_frame()? {
            let outcome = self.processor.process_frame(&frame, &mut tracker, weight_kg);
            if let Some(landmarks) = &outcome.landmarks {
                self.overlay.draw_skeleton(&mut frame, landmarks);
            }
            self.overlay.draw_status(
                &mut frame,
                outcome.summary.current_state.as_ref(),
                outcome.summary.calories,
            );
            encoder.write_frame(&frame)?;

            frames += 1;
            if frames % PROGRESS_LOG_EVERY == 0 {
                tracing::debug!(
                    frame = frames,
                    total = info.frame_count,
                    state = %outcome.label,
                    "Batch progress"
                );
            }
        }
        tracing::info!(frames, path = %input.display(), "End of video");

        decoder.finish()?;
        encoder.finish()?;

        let summary = tracker.summary();
        if let Some(path) = &self.results_path {
            write_results(path, &tracker.results())?;
        }

        let elapsed_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            calories = summary.calories,
            exercise_types_count = summary.exercise_types_count,
            reps = summary.total_reps(),
            frames,
            elapsed_secs,
            "Batch analysis complete"
        );

        Ok(BatchReport {
            summary,
            video: info,
            frames_processed: frames,
            elapsed_secs,
        })
    }

    fn artifact_path(&self) -> PathBuf {
        let dir = self
            .video
            .artifact_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        dir.join(format!("repsense-annotated-{}.mp4", uuid::Uuid::new_v4()))
    }
}

/// Deletes the transient annotated video when dropped.
struct ArtifactGuard {
    path: PathBuf,
}

impl ArtifactGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed annotated output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Error removing annotated output"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_guard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotated.mp4");
        std::fs::write(&path, b"frames").unwrap();
        {
            let guard = ArtifactGuard::new(path.clone());
            assert!(guard.path().exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_artifact_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        drop(ArtifactGuard::new(dir.path().join("never-created.mp4")));
    }
}
