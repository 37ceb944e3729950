//! Terminology server entry point

use anyhow::Context;
use ayush_terminology::{api::create_router, background, config::Config, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _telemetry_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging/telemetry")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = config.logging.deployment_environment,
        "Starting AYUSH terminology server"
    );

    let addr = config
        .socket_addr()
        .context("Failed to determine socket address")?;

    tracing::info!(
        namaste_system = config.terminology.namaste_system,
        icd11_enabled = config.icd11.enabled,
        listen_addr = %addr,
        "Configuration loaded"
    );

    let state = AppState::new(config).context("Failed to initialize application state")?;

    // An unreadable catalog at startup is fatal
    state
        .load_initial_data()
        .await
        .context("Failed to load NAMASTE catalog")?;

    let _token_fetch = background::spawn_initial_token_fetch(&state);
    let jobs = background::start_scheduler(&state);

    let app = create_router(state);

    tracing::info!("Terminology server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("FHIR endpoint: http://{}/fhir", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    for job in jobs {
        job.abort();
    }

    if let Err(e) = served {
        tracing::error!(error = %e, "Server terminated unexpectedly");
        return Err(e.into());
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let sigint = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigint => {
                    tracing::info!("SIGINT received, starting graceful shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received, starting graceful shutdown...");
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for SIGINT only");
            if sigint.await.is_ok() {
                tracing::info!("SIGINT received, starting graceful shutdown...");
            }
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
