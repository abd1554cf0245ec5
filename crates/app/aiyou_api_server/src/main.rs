//! AIYou API server binary.
//!
//! Wires the credential and vector stores, embedder, chat provider and tool
//! registry into the HTTP router and serves it until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use aiyou_api::AppState;
use aiyou_api::config::ApiConfig;
use aiyou_core::auth::memory::MemoryCredentialStore;
use aiyou_core::auth::postgres::PgCredentialStore;
use aiyou_core::auth::{CredentialStore, TokenService};
use aiyou_core::embedding::build_embedder;
use aiyou_core::embedding::config::EmbeddingConfig;
use aiyou_core::llm::ollama::OllamaChat;
use aiyou_core::retrieval::memory::MemoryVectorStore;
use aiyou_core::retrieval::postgres::PgVectorStore;
use aiyou_core::retrieval::{RetrievalConfig, RetrievalGateway, VectorStore};
use aiyou_core::tools::{ToolEndpoints, ToolRegistry};
use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info,aiyou_api=debug,aiyou_core=debug";

/// Dimensionality of the `embeddings.embedding` column.
const PG_VECTOR_DIMENSIONS: usize = 768;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum StoreBackend {
    /// Process-local stores; everything is lost on exit.
    Memory,
    /// PostgreSQL with pgvector; runs migrations on start.
    Postgres,
}

impl StoreBackend {
    fn name(self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Postgres => "postgres",
        }
    }
}

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "aiyou_api_server", about = "AIYou API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind: String,

    /// Credential and vector store backend.
    #[arg(long, env = "AIYOU_STORE", value_enum, default_value_t = StoreBackend::Memory)]
    store: StoreBackend,

    /// PostgreSQL connection URL (postgres backend only).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/aiyou"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind.clone(),
        database_url: args.database_url.clone(),
        ..ApiConfig::from_env()
    };
    info!(
        addr = %config.bind_addr,
        store = args.store.name(),
        top_k = config.top_k,
        timeout_secs = config.call_timeout.as_secs(),
        "starting aiyou_api_server"
    );

    let embedding = EmbeddingConfig::from_env(config.call_timeout);
    let embedder = build_embedder(&embedding)?;
    info!(provider = %embedding.provider, dimensions = embedding.dimensions, "embedder ready");

    let (users, vectors): (Arc<dyn CredentialStore>, Arc<dyn VectorStore>) = match args.store {
        StoreBackend::Memory => (
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemoryVectorStore::new(embedding.dimensions)),
        ),
        StoreBackend::Postgres => {
            if embedding.dimensions != PG_VECTOR_DIMENSIONS {
                warn!(
                    configured = embedding.dimensions,
                    column = PG_VECTOR_DIMENSIONS,
                    "embedding dimensions differ from the vector column; inserts will fail"
                );
            }
            let pool = PgPoolOptions::new()
                .max_connections(args.max_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database_url)
                .await?;
            info!("running database migrations");
            aiyou_core::migrate::migrate(&pool).await?;
            (
                Arc::new(PgCredentialStore::new(pool.clone())),
                Arc::new(PgVectorStore::new(pool)),
            )
        }
    };

    let tokens = TokenService::new(users, config.jwt_secret.as_bytes(), config.token);
    #[cfg(feature = "dev-auth")]
    let tokens = tokens.with_dev_auth(aiyou_core::auth::dev::DevAuth::from_env());
    #[cfg(not(feature = "dev-auth"))]
    {
        if std::env::var_os("ALLOW_DEV_AUTH").is_some() {
            warn!("ALLOW_DEV_AUTH ignored: this build does not include the dev-auth feature");
        }
    }

    let retrieval = RetrievalGateway::new(
        embedder,
        vectors,
        RetrievalConfig {
            top_k: config.top_k,
            call_timeout: config.call_timeout,
            ..Default::default()
        },
    );
    let chat = OllamaChat::new(&config.ollama_base_url, &config.chat_model, config.call_timeout)?;
    let tools = ToolRegistry::new(ToolEndpoints::from_env(), config.call_timeout);

    let state = AppState::new(
        config.clone(),
        tokens,
        retrieval,
        Arc::new(chat),
        Arc::new(tools),
        args.store.name(),
    );
    let app = aiyou_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
