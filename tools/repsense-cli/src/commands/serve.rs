//! Start the HTTP API.

use repsense_common::config::AppConfig;
use repsense_server::AppState;

use super::Collaborators;

pub async fn run(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let collaborators = Collaborators::from_config(&config)?;
    if let Err(e) = collaborators.estimator.warm_up() {
        // Respawned lazily on the next frame.
        tracing::warn!(error = %e, "Pose sidecar warm-up failed");
    }

    let state = AppState::from_config(
        &config,
        collaborators.estimator,
        collaborators.classifier,
        collaborators.clock,
    )?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        upload_dir = %config.server.upload_dir.display(),
        "Starting Repsense server"
    );
    repsense_server::serve(&config.server, &config.sessions, state).await?;
    Ok(())
}
