use anyhow::Context;
use raspadinha_core::{derive_hash_hex, EngineConfig, SettlementRequest};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

// DB schema is defined in migrations (see migrations/ folder)

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredParams {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub engine_json: String,
    pub nonce: i64,
}

impl StoredParams {
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let config: EngineConfig =
            serde_json::from_str(&self.engine_json).context("stored engine config")?;
        config.validate()?;
        Ok(config)
    }
}

pub async fn get_params(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let row = sqlx::query_as::<_, StoredParams>(
        "SELECT server_seed, server_seed_hash, engine_json, nonce FROM params WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Bumps the nonce atomically and returns the params it now applies to.
pub async fn next_nonce(pool: &SqlitePool) -> anyhow::Result<StoredParams> {
    let row = sqlx::query_as::<_, StoredParams>(
        "UPDATE params SET nonce = nonce + 1 WHERE id = 1 \
         RETURNING server_seed, server_seed_hash, engine_json, nonce",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn set_engine_config(pool: &SqlitePool, config: &EngineConfig) -> anyhow::Result<()> {
    config.validate()?;
    sqlx::query("UPDATE params SET engine_json = ? WHERE id = 1")
        .bind(serde_json::to_string(config)?)
        .execute(pool)
        .await?;
    Ok(())
}

async fn set_seed_hash(pool: &SqlitePool, hash: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE params SET server_seed_hash = ? WHERE id = 1")
        .bind(hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Runs migrations, repairs the published seed hash and makes sure a valid
/// engine config is stored. `seed_config` overrides whatever is stored.
pub async fn init_db(db: &SqlitePool, seed_config: Option<EngineConfig>) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    let p = get_params(db).await?;
    let hash = derive_hash_hex(p.server_seed.as_bytes());
    if p.server_seed_hash != hash {
        set_seed_hash(db, &hash).await?;
    }
    match (seed_config, p.engine_config()) {
        (Some(config), _) => {
            info!("storing engine config from file");
            set_engine_config(db, &config).await?;
        }
        (None, Ok(_)) => {}
        (None, Err(e)) => {
            if !p.engine_json.is_empty() {
                warn!("stored engine config unusable, resetting to defaults: {e:#}");
            }
            set_engine_config(db, &EngineConfig::default()).await?;
        }
    }
    Ok(())
}

pub struct SettlementRecord<'a> {
    pub batch_id: Uuid,
    pub client_seed: &'a str,
    pub nonce: u64,
    pub server_seed_hash: &'a str,
    pub settlement: &'a SettlementRequest,
}

pub async fn insert_settlement(pool: &SqlitePool, r: &SettlementRecord<'_>) -> anyhow::Result<i64> {
    let s = r.settlement;
    let details = serde_json::to_string(&s.card_details)?;
    let ts = chrono::Utc::now().to_rfc3339();
    let id = sqlx::query(
        "INSERT INTO settlements (ts, batch_id, client_seed, nonce, server_seed_hash, quantity, \
         bonus_quantity, total_wagered, total_prize, card_details_json) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(ts)
    .bind(r.batch_id.to_string())
    .bind(r.client_seed)
    .bind(r.nonce as i64)
    .bind(r.server_seed_hash)
    .bind(s.quantity as i64)
    .bind(s.bonus_quantity as i64)
    .bind(s.total_wagered)
    .bind(s.total_prize)
    .bind(details)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}
