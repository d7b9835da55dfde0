//! Helpers for the external programs Repsense drives.

use std::path::Path;
use std::process::{Command, Stdio};

/// Whether `binary` can be executed.
///
/// A name containing `/` is checked as a path. Anything else is looked up on
/// `PATH` with `command -v`, passing the name as a positional argument so it
/// is never interpreted by the shell.
pub fn command_exists(binary: &str) -> bool {
    if binary.is_empty() {
        return false;
    }
    if binary.contains('/') {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .args(["-c", r#"command -v "$1""#, "sh", binary])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
