//! Analyze a recorded workout video.

use std::path::PathBuf;

use repsense_common::config::AppConfig;
use repsense_model::met::MetTable;
use repsense_video::BatchRunner;

use super::Collaborators;

pub async fn run(
    config: &AppConfig,
    video: PathBuf,
    weight: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let weight_kg = weight.unwrap_or(config.tracking.default_weight_kg);
    if !(weight_kg.is_finite() && weight_kg > 0.0) {
        anyhow::bail!("Weight must be a positive number of kilograms, got {weight_kg}");
    }

    let collaborators = Collaborators::from_config(config)?;
    let runner = BatchRunner::new(
        collaborators.processor(),
        MetTable::from_named(&config.tracking.batch_met),
        config.video.clone(),
    )?
    .with_debounce(config.tracking.debounce_secs)
    .with_results_path(config.results_path.clone());

    if !json {
        println!("Analyzing video: {}", video.display());
    }
    let report = tokio::task::spawn_blocking(move || runner.run(&video, weight_kg)).await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
        return Ok(());
    }

    println!(
        "  Video: {}x{} @ {:.1} fps, {} frames processed in {:.1}s",
        report.video.width,
        report.video.height,
        report.video.fps,
        report.frames_processed,
        report.elapsed_secs
    );
    println!("  Calories burned: {:.2}", report.summary.calories);
    println!(
        "  Exercise types seen: {}",
        report.summary.exercise_types_count
    );
    if report.summary.reps.is_empty() {
        println!("  No repetitions counted.");
    } else {
        for (label, count) in &report.summary.reps {
            println!("    {label}: {count}");
        }
        println!("  Total reps: {}", report.summary.total_reps());
    }
    println!("  Results written to {}", config.results_path.display());
    Ok(())
}
