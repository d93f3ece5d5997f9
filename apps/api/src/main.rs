mod config;
mod embedding;
mod errors;
mod generation;
mod index;
mod ingest;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EmbeddingProvider};
use crate::embedding::{AzureEmbeddingClient, Embedder, LocalEmbedder};
use crate::generation::generator::PromptGenerator;
use crate::index::AttributeIndex;
use crate::ingest::initialize_index;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    info!(
        "Starting Attribute Prompt Generator API v{}",
        env!("CARGO_PKG_VERSION")
    );
    config.warn_if_llm_unconfigured();

    let embedder = build_embedder(&config)?;
    info!("Embedding model: {}", embedder.id());

    let index = AttributeIndex::open(&config.index_path, &config.collection_name, embedder).await?;
    initialize_index(&config, &index).await?;

    let llm = LlmClient::new(&config)?;
    info!("LLM client initialized (deployment: {})", llm.deployment_name());

    let state = AppState {
        config: config.clone(),
        index,
        generator: PromptGenerator::new(Arc::new(llm)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down application...");
    Ok(())
}

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match &config.embedding_provider {
        EmbeddingProvider::Local => Arc::new(LocalEmbedder::new()),
        EmbeddingProvider::Azure { deployment } => {
            let (Some(endpoint), Some(api_key)) = (&config.azure_endpoint, &config.azure_api_key)
            else {
                anyhow::bail!(
                    "EMBEDDING_PROVIDER=azure requires AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY"
                );
            };
            Arc::new(AzureEmbeddingClient::new(
                endpoint,
                deployment,
                &config.azure_api_version,
                api_key.clone(),
            )?)
        }
    };
    Ok(embedder)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
