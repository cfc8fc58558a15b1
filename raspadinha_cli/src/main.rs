use clap::{Parser, Subcommand};
use raspadinha_core::{generate_batch, EngineConfig, RngDraws, ScratchSurface, Tier};
use sha2::{Digest, Sha256};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "raspadinha-cli", about = "Admin CLI for the raspadinha server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://raspadinha.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rotate server seed to a new secret, revealing the old one.
    /// Run only while no batches are active: unscratched cards from the old seed become predictable.
    RotateSeed { new_seed: String },
    /// View last N settlements
    ViewSettlements {
        #[arg(default_value_t = 20)]
        n: i64,
    },
    /// Export settlements to CSV path
    ExportCsv { path: String },
    /// Draw cards offline and report the empirical prize distribution
    Simulate {
        #[arg(long, default_value_t = 100_000)]
        cards: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Engine config TOML; defaults are used when omitted
        #[arg(long)]
        config: Option<String>,
    },
}

async fn get_pool(url: Option<String>) -> anyhow::Result<SqlitePool> {
    let url = url.unwrap_or_else(|| "sqlite://raspadinha.db".into());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await?;
    Ok(pool)
}

fn simulate(cards: usize, seed: u64, config: Option<String>) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    // Outcomes only; a 1x1 surface keeps memory flat for large runs.
    let batch = generate_batch(
        cards,
        &config.prize_table,
        &ScratchSurface::new(1, 1, 1.0),
        &mut RngDraws::seeded(seed),
    )?;

    let mut by_value: BTreeMap<u64, usize> = BTreeMap::new();
    let mut by_tier: BTreeMap<Tier, usize> = BTreeMap::new();
    let mut total_prize = 0.0;
    for c in batch.cards() {
        total_prize += c.outcome();
        *by_value.entry((c.outcome() * 100.0).round() as u64).or_default() += 1;
        *by_tier.entry(c.tier()).or_default() += 1;
    }

    let wagered = cards as f64 * config.unit_price;
    println!("cards={cards} seed={seed} unit_price={}", config.unit_price);
    for (cents, count) in &by_value {
        println!(
            "  prize {:>8.2}: {:>8} ({:.3}%)",
            *cents as f64 / 100.0,
            count,
            *count as f64 * 100.0 / cards as f64
        );
    }
    for (tier, count) in &by_tier {
        println!("  tier {:<8}: {count}", format!("{tier:?}"));
    }
    let misses = by_tier.get(&Tier::Miss).copied().unwrap_or(0);
    println!(
        "no-prize rate={:.3}% rtp={:.3}% expected_rtp={:.3}% max_prize={:.2}",
        misses as f64 * 100.0 / cards as f64,
        total_prize * 100.0 / wagered,
        config.prize_table.expected_value() * 100.0 / config.unit_price,
        config.prize_table.max_prize()
    );
    Ok(())
}

fn rotation_report(old_seed: &str, new_hash: &str) -> String {
    format!(
        "Revealed previous seed: {old_seed}\n\
         Rotated server seed. New hash: {new_hash}\n\
         WARNING: outcomes of unsettled batches drawn from the previous seed are now public. \
         Rotate only while the server has no active batches, or restart it to drop them."
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            cards,
            seed,
            config,
        } => simulate(cards, seed, config)?,
        Commands::RotateSeed { new_seed } => {
            let pool = get_pool(cli.database_url).await?;
            let old: String = sqlx::query("SELECT server_seed FROM params WHERE id = 1")
                .fetch_one(&pool)
                .await?
                .get("server_seed");
            let hash = {
                let mut h = Sha256::new();
                h.update(new_seed.as_bytes());
                hex::encode(h.finalize())
            };
            sqlx::query(
                "UPDATE params SET server_seed = ?, server_seed_hash = ?, nonce = 0 WHERE id = 1",
            )
            .bind(new_seed)
            .bind(hash.clone())
            .execute(&pool)
            .await?;
            info!("server seed rotated");
            warn!("batches still active on the server can now be predicted; restart it to drop them");
            println!("{}", rotation_report(&old, &hash));
        }
        Commands::ViewSettlements { n } => {
            let pool = get_pool(cli.database_url).await?;
            let rows = sqlx::query("SELECT id, ts, batch_id, client_seed, nonce, quantity, total_wagered, total_prize FROM settlements ORDER BY id DESC LIMIT ?")
                .bind(n)
                .fetch_all(&pool).await?;
            for r in rows {
                let id: i64 = r.get("id");
                let ts: String = r.get("ts");
                let batch_id: String = r.get("batch_id");
                let client_seed: String = r.get("client_seed");
                let nonce: i64 = r.get("nonce");
                let quantity: i64 = r.get("quantity");
                let wagered: f64 = r.get("total_wagered");
                let prize: f64 = r.get("total_prize");
                println!(
                    "#{:>6} {} batch={} seed={} nonce={} cards={} wagered={:.2} prize={:.2}",
                    id, ts, batch_id, client_seed, nonce, quantity, wagered, prize
                );
            }
        }
        Commands::ExportCsv { path } => {
            let pool = get_pool(cli.database_url).await?;
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "ts",
                "batch_id",
                "client_seed",
                "nonce",
                "server_seed_hash",
                "quantity",
                "bonus_quantity",
                "total_wagered",
                "total_prize",
                "card_details_json",
            ])?;
            let rows = sqlx::query("SELECT id, ts, batch_id, client_seed, nonce, server_seed_hash, quantity, bonus_quantity, total_wagered, total_prize, card_details_json FROM settlements ORDER BY id ASC")
                .fetch_all(&pool).await?;
            let total = rows.len();
            for r in &rows {
                wtr.write_record(&[
                    r.get::<i64, _>("id").to_string(),
                    r.get::<String, _>("ts"),
                    r.get::<String, _>("batch_id"),
                    r.get::<String, _>("client_seed"),
                    r.get::<i64, _>("nonce").to_string(),
                    r.get::<String, _>("server_seed_hash"),
                    r.get::<i64, _>("quantity").to_string(),
                    r.get::<i64, _>("bonus_quantity").to_string(),
                    r.get::<f64, _>("total_wagered").to_string(),
                    r.get::<f64, _>("total_prize").to_string(),
                    r.get::<String, _>("card_details_json"),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", total, path);
        }
    }

    Ok(())
}
