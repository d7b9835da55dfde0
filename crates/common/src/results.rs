//! The persisted results summary.
//!
//! After every batch analysis and every live-session termination the latest
//! summary is written to a single JSON file. Only the most recent result
//! survives; the file is replaced, never appended to.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RepsenseResult;

/// Stable on-disk shape of a results summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    /// Calories burned, rounded to two decimals.
    pub calories: f64,

    /// Number of distinct exercise labels observed, including Idle.
    pub exercise_types_count: usize,
}

/// Overwrite the results file at `path` with `summary`.
///
/// The summary is written to a uniquely named sibling temp file and renamed
/// into place, so readers never observe a half-written file and concurrent
/// writers never share a temp file. The last rename wins.
pub fn write_results(path: &Path, summary: &ResultsSummary) -> RepsenseResult<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    let json = serde_json::to_string(summary)?;
    let mut file = tempfile::Builder::new()
        .prefix(".results-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    file.write_all(json.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    tracing::info!(path = %path.display(), ?summary, "Results saved");
    Ok(())
}

/// Read the latest results file.
pub fn read_results(path: &Path) -> RepsenseResult<ResultsSummary> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_are_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        write_results(
            &path,
            &ResultsSummary {
                calories: 12.5,
                exercise_types_count: 3,
            },
        )
        .unwrap();
        write_results(
            &path,
            &ResultsSummary {
                calories: 0.0,
                exercise_types_count: 1,
            },
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, r#"{"calories":0.0,"exercise_types_count":1}"#);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_writers_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| {
                            let summary = ResultsSummary {
                                calories: (writer * 100 + i) as f64,
                                exercise_types_count: writer + 1,
                            };
                            write_results(&path, &summary).is_err()
                        })
                        .count()
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(failures, 0);
        let last = read_results(&path).unwrap();
        assert!((1..=8).contains(&last.exercise_types_count));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_onto_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let summary = ResultsSummary {
            calories: 1.0,
            exercise_types_count: 1,
        };
        assert!(write_results(dir.path(), &summary).is_err());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        let summary = ResultsSummary {
            calories: 375.0,
            exercise_types_count: 2,
        };
        write_results(&path, &summary).unwrap();
        assert_eq!(read_results(&path).unwrap(), summary);
    }
}
