use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use wellness_agent::api;
use wellness_agent::channels::run_repl;
use wellness_agent::config::AppConfig;
use wellness_agent::graph::DispatchGraph;
use wellness_agent::knowledge::{EmbeddedDocs, KnowledgeBase, SeedDocs};
use wellness_agent::llm::{create_embedder, create_provider};
use wellness_agent::store::{LibSqlBackend, WellnessStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage. A second install
    // only errors, so the result is ignored.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env().context("Failed to read configuration")?;

    // Initialize tracing; keep the guard alive so the file writer flushes.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "wellness.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    eprintln!("🩺 Wellness Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Chat API: http://0.0.0.0:{}/api/chat", config.http_port);
    eprintln!("   User: {}", config.cli_user);
    eprintln!("   Type a message and press Enter. /quit to exit.\n");

    let llm = create_provider(&config.llm).context("Failed to create LLM provider")?;

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn WellnessStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── Knowledge ────────────────────────────────────────────────────────
    let knowledge = SeedDocs::load_dir(&config.knowledge_dir)
        .await
        .context("Failed to load seed documents")?;
    eprintln!("   Knowledge: {} passages", knowledge.len());

    let knowledge: Arc<dyn KnowledgeBase> =
        match create_embedder(&config.llm).context("Failed to create embedding model")? {
            Some(embedder) => match EmbeddedDocs::build(knowledge.clone(), embedder).await {
                Ok(index) => Arc::new(index),
                Err(e) => {
                    tracing::warn!(error = %e, "Embedding seed passages failed, using keyword retrieval");
                    Arc::new(knowledge)
                }
            },
            None => Arc::new(knowledge),
        };

    // ── Graph ────────────────────────────────────────────────────────────
    let graph = Arc::new(DispatchGraph::new(
        llm,
        knowledge,
        store.clone(),
        config.graph.clone(),
    ));

    // Spawn the HTTP server
    let app = api::routes(graph.clone(), store);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.http_port))?;
    tokio::spawn(async move {
        tracing::info!("HTTP server started");
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server stopped: {}", e);
        }
    });

    run_repl(graph, &config.cli_user).await?;
    Ok(())
}
