//! Video stream metadata via `ffprobe`.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use repsense_common::config::VideoConfig;
use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_common::process::command_exists;

/// Properties of the first video stream of a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second, or the configured fallback when unreported.
    pub fps: f64,
    /// Reported frame count, or the configured fallback. Informational only:
    /// decoding always runs until the stream ends.
    pub frame_count: u64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe `path`, substituting configured fallbacks for missing fps and frame
/// count.
pub fn probe_video(path: &Path, config: &VideoConfig) -> RepsenseResult<VideoInfo> {
    if !path.exists() {
        return Err(RepsenseError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| RepsenseError::resource(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(RepsenseError::input_unreadable(format!(
            "Error opening video file {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_json(&raw, config)?;
    tracing::info!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        fps = info.fps,
        frame_count = info.frame_count,
        "Video probed"
    );
    Ok(info)
}

/// Interpret ffprobe's JSON output.
pub fn parse_probe_json(raw: &str, config: &VideoConfig) -> RepsenseResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(raw)
        .map_err(|e| RepsenseError::input_unreadable(format!("Unreadable ffprobe output: {e}")))?;

    let stream = probe
        .streams
        .first()
        .ok_or_else(|| RepsenseError::input_unreadable("No video stream found"))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(RepsenseError::input_unreadable(
                "Video stream has no usable resolution",
            ))
        }
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .unwrap_or_else(|| {
            tracing::warn!(fallback = config.fallback_fps, "FPS unavailable, using fallback");
            config.fallback_fps
        });

    let duration = stream
        .duration
        .as_deref()
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0)
        .or_else(|| duration.map(|d| (d * fps).round() as u64))
        .filter(|n| *n > 0)
        .unwrap_or_else(|| {
            tracing::warn!(
                fallback = config.fallback_frame_count,
                "Frame count unavailable, using fallback"
            );
            config.fallback_frame_count
        });

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Whether both `ffmpeg` and `ffprobe` are installed.
pub fn ffmpeg_available() -> bool {
    command_exists("ffmpeg") && command_exists("ffprobe")
}
