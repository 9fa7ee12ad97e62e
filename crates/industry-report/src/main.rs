mod config;
mod error;
mod extractor;
mod loader;
mod model;
mod pipeline;
mod ranker;
mod server;
mod summarizer;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::AppError;
use loader::DocxLoader;
use pipeline::ReportPipeline;
use report_common::error::CommonError;
use report_common::openai::{OpenAiClient, OpenAiClientConfig};
use server::AppState;
use summarizer::OpenAiSummarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(false)
        .init();

    info!("starting industry-report server");

    // 1. Load config from environment; a missing API key stops startup here.
    let config = Config::from_env()?;
    let openai_config = OpenAiClientConfig::from_env().map_err(AppError::from)?;
    info!(
        report_dir = %config.report_dir.display(),
        listen_addr = %config.listen_addr,
        model = %config.model,
        summary_max_tokens = config.summary_max_tokens,
        summary_timeout_ms = config.summary_timeout.as_millis(),
        "configuration loaded"
    );
    info!(
        base_url = %openai_config.base_url,
        timeout_ms = openai_config.default_timeout.as_millis(),
        "openai client configured"
    );

    // 2. Wire the pipeline collaborators.
    let request_timeout = openai_config.default_timeout;
    let openai = OpenAiClient::new(openai_config)
        .map_err(CommonError::from)
        .map_err(AppError::from)?;
    let pipeline = ReportPipeline::new(
        Arc::new(DocxLoader),
        Arc::new(OpenAiSummarizer::new(
            Arc::new(openai),
            config.model.clone(),
            request_timeout,
        )),
        config.report_dir.clone(),
        config.summary_max_tokens,
        config.summary_timeout,
    );

    // 3. Serve HTTP.
    let cors = server::cors_layer(config.cors_allow_origins.as_deref())?;
    let app = server::router(AppState { pipeline }, cors);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %config.listen_addr, "HTTP server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
        })?;

    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
