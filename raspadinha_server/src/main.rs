use raspadinha_core::EngineConfig;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod session;
mod store;

use routes::{app, AppState};
use session::{spawn_reaper, Sessions, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_ACTIVE};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={v}: {e}")),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(
            &std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://raspadinha.db?mode=rwc".to_string()),
        )
        .await?;

    let seed_config = match std::env::var("ENGINE_CONFIG") {
        Ok(path) => {
            info!("loading engine config from {path}");
            Some(EngineConfig::load(&path)?)
        }
        Err(_) => None,
    };
    store::init_db(&db, seed_config).await?;

    let idle = Duration::from_secs(env_or("BATCH_IDLE_SECS", DEFAULT_IDLE_TIMEOUT.as_secs())?);
    let sessions = Arc::new(Sessions::new(
        idle,
        env_or("MAX_ACTIVE_BATCHES", DEFAULT_MAX_ACTIVE)?,
    ));
    let _reaper = spawn_reaper(sessions.clone(), (idle / 4).max(Duration::from_secs(1)));

    let state = Arc::new(AppState {
        db,
        api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".into()),
        sessions,
    });

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
