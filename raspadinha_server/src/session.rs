//! In-memory batches between purchase and settlement.
//!
//! Outcomes never leave this module except through revealed cards. Each batch
//! sits behind its own mutex so scratches on one batch are applied in arrival
//! order while other batches proceed independently. Batches untouched for
//! longer than the idle timeout are dropped unsettled.

use hmac::Mac;
use raspadinha_core::{rng::HmacSha256, Batch, CardEngine};
use raspadinha_shared::{ApiError, ApiResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_ACTIVE: usize = 10_000;

pub struct ActiveBatch {
    pub batch: Batch,
    pub engine: CardEngine,
    pub token: String,
    pub client_seed: String,
    pub nonce: u64,
    pub server_seed_hash: String,
    pub settled: bool,
}

struct Slot {
    batch: Arc<Mutex<ActiveBatch>>,
    touched: Instant,
}

pub struct Sessions {
    inner: Mutex<HashMap<Uuid, Slot>>,
    idle_timeout: Duration,
    max_active: usize,
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_ACTIVE)
    }
}

impl Sessions {
    pub fn new(idle_timeout: Duration, max_active: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            idle_timeout,
            max_active,
        }
    }

    /// Fails with `Busy` when the table is still full after dropping idle batches.
    pub async fn insert(&self, id: Uuid, active: ActiveBatch) -> ApiResult<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        if inner.len() >= self.max_active {
            let dropped = Self::drop_idle(&mut inner, now, self.idle_timeout);
            if dropped > 0 {
                info!(dropped, "evicted idle batches");
            }
        }
        if inner.len() >= self.max_active {
            warn!(active = inner.len(), "batch table full");
            return Err(ApiError::Busy);
        }
        inner.insert(
            id,
            Slot {
                batch: Arc::new(Mutex::new(active)),
                touched: now,
            },
        );
        Ok(())
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<ActiveBatch>>> {
        let mut inner = self.inner.lock().await;
        let slot = inner.get_mut(id)?;
        slot.touched = Instant::now();
        Some(slot.batch.clone())
    }

    pub async fn remove(&self, id: &Uuid) {
        self.inner.lock().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Drops batches last touched at least one idle timeout before `now`.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock().await;
        Self::drop_idle(&mut inner, now, self.idle_timeout)
    }

    fn drop_idle(inner: &mut HashMap<Uuid, Slot>, now: Instant, timeout: Duration) -> usize {
        let before = inner.len();
        inner.retain(|_, slot| now.saturating_duration_since(slot.touched) < timeout);
        before - inner.len()
    }
}

/// Sweeps idle batches every `period` until the process exits.
pub fn spawn_reaper(sessions: Arc<Sessions>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(period);
        loop {
            tick.tick().await;
            let dropped = sessions.evict_idle(Instant::now()).await;
            if dropped > 0 {
                info!(dropped, "evicted idle batches");
            }
        }
    })
}

/// hex(HMAC-SHA256(server_seed, batch_id))
pub fn batch_token(server_seed: &str, batch_id: &Uuid) -> String {
    let mut mac =
        HmacSha256::new_from_slice(server_seed.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(batch_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Comparison time does not depend on where the strings differ.
pub fn token_matches(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
