//! City router server
//!
//! Serves the agent-routing workflow over HTTP.

use city_router::api::{create_router, AppState};
use city_router::cities;
use city_router::config::AppConfig;
use city_router::llm::{build_service, LlmService};
use city_router::tools::{Document, DocumentIndex};
use city_router::workflow::RouterWorkflow;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "city_router=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env()?;

    // Data sources
    let db = cities::open_in_memory()?;
    tracing::info!(rows = cities::CITY_ROWS.len(), table = cities::CITY_TABLE, "City table loaded");

    let index = match &config.docs_dir {
        Some(dir) => {
            let index = DocumentIndex::load_dir(dir)?;
            tracing::info!(path = %dir.display(), chunks = index.len(), "City documents indexed");
            index
        }
        None => {
            let docs: Vec<Document> = cities::builtin_documents();
            tracing::info!(documents = docs.len(), "Using built-in city notes");
            DocumentIndex::from_documents(docs)
        }
    };

    // Reasoning service, shared by the router and the SQL tool
    let llm = build_service(&config.llm_config())?;
    tracing::info!(model = %llm.model_id(), "LLM service initialized");

    let tools = cities::default_tools(db, llm.clone(), index);
    let workflow = RouterWorkflow::new(tools, llm, config.workflow_config())?;

    let state = AppState::new(workflow);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        timeout_secs = config.timeout.as_secs(),
        verbose = config.verbose,
        "City router listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
