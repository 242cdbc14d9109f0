//! `ytdlp-gateway` server binary

use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use ytdlp_gateway::{Config, Error, Orchestrator, Result, YtDlpCli, api};

const DEFAULT_LOG_FILTER: &str = "ytdlp_gateway=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "ytdlp-gateway exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;

    // Without the downloader there is nothing to serve
    let tool = YtDlpCli::discover(&config.tools, config.format.clone())?;

    let orchestrator = Orchestrator::new(config, Arc::new(tool)).await?;
    let listener = api::bind(&orchestrator).await?;

    let stop_server = CancellationToken::new();
    let server = tokio::spawn(api::serve(listener, orchestrator.clone(), {
        let stop_server = stop_server.clone();
        async move { stop_server.cancelled().await }
    }));

    if let Err(e) = orchestrator.initialize().await {
        tracing::error!(error = %e, "startup checks failed");
        orchestrator.shutdown().await?;
        stop_server.cancel();
        let _ = server.await;
        return Err(e);
    }

    let sweeper = orchestrator.spawn_sweeper();

    ytdlp_gateway::run_with_shutdown(orchestrator).await?;
    stop_server.cancel();

    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }

    server
        .await
        .map_err(|e| Error::ApiServerError(format!("server task failed: {}", e)))?
}
