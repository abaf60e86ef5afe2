// src/main.rs

use std::{net::SocketAddr, sync::Arc, time::Duration};

use quizlink::{
    ai::{GeminiModel, ModelHandle},
    attempts::AttemptRegistry,
    config::Config,
    routes,
    state::AppState,
    store::{MemoryDocumentStore, PgDocumentStore, Store},
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const MAX_CONNECT_RETRIES: u32 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (.env included)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "quizlink.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store = connect_store(&config).await?;

    let ai = match GeminiModel::from_config(&config) {
        Ok(Some(model)) => {
            tracing::info!("AI authoring enabled with model {}", config.gemini_model);
            ModelHandle::new(Arc::new(model))
        }
        Ok(None) => {
            tracing::warn!("GEMINI_API_KEY not set, AI routes will answer ai/not-configured");
            ModelHandle::disabled()
        }
        Err(e) => {
            tracing::error!("Failed to set up the Gemini client: {}", e);
            ModelHandle::disabled()
        }
    };

    let state = AppState {
        store,
        config: config.clone(),
        ai,
        attempts: AttemptRegistry::new(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("QuizLink listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Peer addresses feed the per-IP rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Postgres when `DATABASE_URL` is set (with retry and migrations), memory otherwise.
async fn connect_store(config: &Config) -> Result<Store, Box<dyn std::error::Error>> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    };

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > MAX_CONNECT_RETRIES {
                    return Err(format!(
                        "Failed to connect to database after {} retries: {}",
                        MAX_CONNECT_RETRIES, e
                    )
                    .into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    Ok(Arc::new(PgDocumentStore::new(pool)))
}
