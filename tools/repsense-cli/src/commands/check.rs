//! Check external tools and the classifier model.

use repsense_common::config::AppConfig;
use repsense_common::process::command_exists;
use repsense_core::{ForestClassifier, PoseEstimator};
use repsense_pose::SidecarPoseEstimator;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Repsense System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;

    for binary in ["ffmpeg", "ffprobe"] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[FAIL] {binary} not found on PATH (needed for video analysis)");
            all_ok = false;
        }
    }

    let sidecar = SidecarPoseEstimator::from_config(&config.pose);
    if sidecar.is_available() {
        match sidecar.warm_up() {
            Ok(()) => println!("[OK] Pose sidecar: {}", config.pose.command),
            Err(e) => {
                println!("[FAIL] Pose sidecar {} failed to start: {e}", config.pose.command);
                all_ok = false;
            }
        }
    } else {
        println!("[FAIL] Pose sidecar not found: {}", config.pose.command);
        all_ok = false;
    }

    let model_path = &config.classifier.model_path;
    match ForestClassifier::load(model_path) {
        Ok(model) => {
            let classes: Vec<&str> = model.classes().iter().map(|c| c.as_str()).collect();
            println!("[OK] Classifier model: {}", model_path.display());
            println!("     classes: {}", classes.join(", "));
        }
        Err(e) => {
            println!("[FAIL] Classifier model {}: {e}", model_path.display());
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All components are available. Repsense is ready.");
        Ok(())
    } else {
        anyhow::bail!("Some components are missing. See above for details.")
    }
}
