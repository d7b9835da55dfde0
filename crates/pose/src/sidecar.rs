//! Long-lived pose-estimation child process.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

use image::RgbImage;

use repsense_common::config::PoseConfig;
use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_common::process::command_exists;
use repsense_core::pose::PoseEstimator;
use repsense_model::landmark::LandmarkSet;

use crate::protocol::{parse_response, PoseRequest};

/// Default wait for one pose answer, generous enough for model warm-up.
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: f64 = 30.0;

/// Pose estimator backed by a sidecar process.
///
/// The sidecar is spawned on first use and kept for the life of the
/// estimator. Requests are serialized over its stdin/stdout. If it dies or
/// answers garbage, the failing frame errors and the next frame respawns it.
/// A sidecar that does not answer within the response timeout is treated as
/// dead.
pub struct SidecarPoseEstimator {
    command: String,
    args: Vec<String>,
    response_timeout: Duration,
    process: Mutex<Option<SidecarProcess>>,
    spawn_count: AtomicU64,
}

struct SidecarProcess {
    child: Child,
    stdin: ChildStdin,
    responses: Receiver<std::io::Result<String>>,
}

impl SidecarPoseEstimator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            response_timeout: Duration::from_secs_f64(DEFAULT_RESPONSE_TIMEOUT_SECS),
            process: Mutex::new(None),
            spawn_count: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &PoseConfig) -> Self {
        let secs = config.response_timeout_secs;
        let secs = if secs.is_finite() && secs > 0.0 {
            secs
        } else {
            DEFAULT_RESPONSE_TIMEOUT_SECS
        };
        Self::new(config.command.clone(), config.args.clone())
            .with_response_timeout(Duration::from_secs_f64(secs))
    }

    /// How long to wait for the answer to one frame.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Spawn the sidecar now instead of on the first frame.
    pub fn warm_up(&self) -> RepsenseResult<()> {
        let mut process = self.lock_process();
        if process.is_none() {
            *process = Some(self.spawn()?);
        }
        Ok(())
    }

    /// Number of times the sidecar has been started.
    pub fn spawn_count(&self) -> u64 {
        self.spawn_count.load(Ordering::SeqCst)
    }

    /// PID of the running sidecar, if one is up.
    pub fn running_pid(&self) -> Option<u32> {
        self.lock_process().as_ref().map(|p| p.child.id())
    }

    fn lock_process(&self) -> std::sync::MutexGuard<'_, Option<SidecarProcess>> {
        self.process
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn(&self) -> RepsenseResult<SidecarProcess> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                RepsenseError::pose(format!("Failed to start pose sidecar '{}': {e}", self.command))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RepsenseError::pose("Failed to capture sidecar stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RepsenseError::pose("Failed to capture sidecar stdout"))?;

        let pid = child.id();
        if let Some(stderr) = child.stderr.take() {
            std::thread::spawn(move || forward_stderr(pid, stderr));
        }
        let (tx, responses) = mpsc::channel();
        std::thread::spawn(move || read_responses(stdout, tx));

        let count = self.spawn_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            pid = child.id(),
            command = %self.command,
            spawn_count = count,
            "Pose sidecar started"
        );

        Ok(SidecarProcess {
            child,
            stdin,
            responses,
        })
    }
}

impl SidecarProcess {
    fn exchange(
        &mut self,
        request: &str,
        timeout: Duration,
    ) -> RepsenseResult<Option<LandmarkSet>> {
        self.stdin
            .write_all(request.as_bytes())
            .and_then(|_| self.stdin.flush())
            .map_err(|e| RepsenseError::pose(format!("Failed writing to pose sidecar: {e}")))?;

        match self.responses.recv_timeout(timeout) {
            Ok(Ok(line)) => parse_response(&line),
            Ok(Err(e)) => Err(RepsenseError::pose(format!(
                "Failed reading from pose sidecar: {e}"
            ))),
            Err(RecvTimeoutError::Timeout) => Err(RepsenseError::pose(format!(
                "Pose sidecar did not answer within {:.1}s",
                timeout.as_secs_f64()
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(RepsenseError::pose("Pose sidecar closed its output"))
            }
        }
    }
}

impl Drop for SidecarProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl PoseEstimator for SidecarPoseEstimator {
    fn estimate(&self, frame: &RgbImage) -> RepsenseResult<Option<LandmarkSet>> {
        let request = PoseRequest::from_frame(frame).to_line()?;

        let mut slot = self.lock_process();
        if slot.is_none() {
            *slot = Some(self.spawn()?);
        }
        let Some(process) = slot.as_mut() else {
            return Err(RepsenseError::pose("Pose sidecar unavailable"));
        };

        let result = process.exchange(&request, self.response_timeout);
        if let Err(e) = &result {
            tracing::warn!(
                pid = process.child.id(),
                error = %e,
                "Pose sidecar failed, will respawn on next frame"
            );
            *slot = None;
        }
        result
    }

    fn name(&self) -> &str {
        "sidecar"
    }

    fn is_available(&self) -> bool {
        command_exists(&self.command)
    }
}

impl std::fmt::Debug for SidecarPoseEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidecarPoseEstimator")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("response_timeout", &self.response_timeout)
            .field("spawn_count", &self.spawn_count())
            .finish()
    }
}

/// Pump response lines to the estimator until the sidecar closes stdout.
fn read_responses(stdout: ChildStdout, tx: mpsc::Sender<std::io::Result<String>>) {
    let mut reader = BufReader::new(stdout);
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

fn forward_stderr(pid: u32, stderr: impl Read) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(line) if !line.trim().is_empty() => {
                tracing::debug!(pid, "pose sidecar: {}", line.trim_end());
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
}
