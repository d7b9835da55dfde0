//! Raw-frame pipes to and from `ffmpeg`.
//!
//! Both ends spawn an ffmpeg child exchanging packed rgb24 frames over a pipe.
//! Stderr is drained on a helper thread so ffmpeg never blocks on a full
//! pipe, and dropping either handle kills a child that is still running.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;

use repsense_common::error::{RepsenseError, RepsenseResult};

use crate::probe::VideoInfo;

/// Reads decoded frames from a video file.
pub struct FfmpegDecoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl FfmpegDecoder {
    pub fn open(path: &Path, info: &VideoInfo) -> RepsenseResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RepsenseError::resource(format!("Failed to start ffmpeg decoder: {e}"))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RepsenseError::resource("Failed to capture ffmpeg stdout"))?;
        let stderr_task = child.stderr.take().map(drain_stderr);

        tracing::debug!(pid = child.id(), path = %path.display(), "ffmpeg decoder started");

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr_task,
            width: info.width,
            height: info.height,
            frames_read: 0,
        })
    }

    /// Next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> RepsenseResult<Option<RgbImage>> {
        let frame_len = self.width as usize * self.height as usize * 3;
        let mut buffer = vec![0u8; frame_len];
        let mut filled = 0;
        while filled < frame_len {
            let n = self
                .stdout
                .read(&mut buffer[filled..])
                .map_err(|e| {
                    RepsenseError::input_unreadable(format!("Failed reading frames: {e}"))
                })?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < frame_len {
            tracing::warn!(
                frame = self.frames_read,
                bytes = filled,
                expected = frame_len,
                "Truncated trailing frame dropped"
            );
            return Ok(None);
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| RepsenseError::input_unreadable("Decoded frame has the wrong size"))
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Wait for ffmpeg to exit and surface a decode failure.
    pub fn finish(mut self) -> RepsenseResult<()> {
        let status = self
            .child
            .wait()
            .map_err(|e| RepsenseError::resource(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr = join_stderr(self.stderr_task.take());
        if !status.success() && self.frames_read == 0 {
            return Err(RepsenseError::input_unreadable(format!(
                "ffmpeg could not decode video (status {status}): {}",
                stderr.trim()
            )));
        }
        if !status.success() {
            tracing::warn!(
                %status,
                frames = self.frames_read,
                stderr = stderr.trim(),
                "ffmpeg decoder exited with error"
            );
        }
        Ok(())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        kill_if_running(&mut self.child);
    }
}

/// Encodes frames into a video file.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr_task: Option<JoinHandle<String>>,
    output: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl FfmpegEncoder {
    pub fn create(output: &Path, width: u32, height: u32, fps: f64) -> RepsenseResult<Self> {
        let size = format!("{width}x{height}");
        let rate = format!("{fps:.3}");
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &size, "-r", &rate, "-i", "pipe:0"])
            .args(["-an", "-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2"])
            .args(["-c:v", "mpeg4", "-q:v", "5"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RepsenseError::resource(format!("Failed to start ffmpeg encoder: {e}"))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RepsenseError::resource("Failed to capture ffmpeg stdin"))?;
        let stderr_task = child.stderr.take().map(drain_stderr);

        tracing::debug!(
            pid = child.id(),
            output = %output.display(),
            %size,
            "ffmpeg encoder started"
        );

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            stderr_task,
            output: output.to_path_buf(),
            width,
            height,
            frames_written: 0,
        })
    }

    pub fn write_frame(&mut self, frame: &RgbImage) -> RepsenseResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(RepsenseError::invalid_input(format!(
                "Frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RepsenseError::resource("Encoder already finished"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| {
                RepsenseError::resource(format!("Failed writing to ffmpeg encoder: {e}"))
            })?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Close the input and wait for ffmpeg to finalize the file.
    pub fn finish(mut self) -> RepsenseResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .flush()
                .map_err(|e| {
                    RepsenseError::resource(format!("Failed flushing ffmpeg encoder: {e}"))
                })?;
        }
        let status = self
            .child
            .wait()
            .map_err(|e| RepsenseError::resource(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr = join_stderr(self.stderr_task.take());
        if !status.success() {
            return Err(RepsenseError::resource(format!(
                "ffmpeg encode failed (status {status}): {}",
                stderr.trim()
            )));
        }
        tracing::debug!(
            output = %self.output.display(),
            frames = self.frames_written,
            "Encoded video finalized"
        );
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.stdin.take();
        kill_if_running(&mut self.child);
    }
}

fn drain_stderr(stderr: impl Read + Send + 'static) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    })
}

fn join_stderr(task: Option<JoinHandle<String>>) -> String {
    task.map(|t| {
        t.join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
    })
    .unwrap_or_default()
}

fn kill_if_running(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
        let _: std::io::Result<ExitStatus> = child.wait();
    }
}
