use crate::card::{Batch, RevealEvent};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress { revealed: usize, total: usize },
    Finished { total_prize: f64 },
}

impl BatchStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, BatchStatus::Finished { .. })
    }
}

fn status_of(batch: &Batch) -> BatchStatus {
    if batch.is_finished() {
        BatchStatus::Finished {
            total_prize: batch.total_prize(),
        }
    } else {
        BatchStatus::InProgress {
            revealed: batch.revealed_count(),
            total: batch.len(),
        }
    }
}

/// Tallies a reveal into the batch total and closes the batch once every card
/// has been tallied. Each card is counted at most once.
pub fn on_revealed(batch: &mut Batch, event: &RevealEvent) -> EngineResult<BatchStatus> {
    let len = batch.len();
    let index = event.card_index;
    let card = batch
        .card_mut(index)
        .ok_or(EngineError::InvalidIndex { index, len })?;
    if !card.is_revealed() {
        return Err(EngineError::NotRevealed(index));
    }
    if card.is_tallied() {
        return Ok(status_of(batch));
    }
    card.mark_tallied();
    let outcome = card.outcome();
    batch.add_prize(outcome);

    if batch.cards().iter().all(|c| c.is_tallied()) {
        batch.mark_finished();
        info!(
            cards = len,
            total_prize = batch.total_prize(),
            "batch finished"
        );
    }
    Ok(status_of(batch))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetail {
    pub index: usize,
    pub outcome: f64,
    pub bonus: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub quantity: usize,
    pub bonus_quantity: usize,
    pub unit_price: f64,
    pub total_wagered: f64,
    pub total_prize: f64,
    pub card_details: Vec<CardDetail>,
}

impl SettlementRequest {
    pub fn net(&self) -> f64 {
        self.total_prize - self.total_wagered
    }
}

/// Bonus cards are paid out but not wagered.
pub fn settle(batch: &Batch, unit_price: f64) -> EngineResult<SettlementRequest> {
    if !batch.is_finished() {
        return Err(EngineError::NotFinished {
            revealed: batch.revealed_count(),
            total: batch.len(),
        });
    }
    let bonus_quantity = batch.bonus_count();
    let paid = batch.len() - bonus_quantity;
    Ok(SettlementRequest {
        quantity: batch.len(),
        bonus_quantity,
        unit_price,
        total_wagered: paid as f64 * unit_price,
        total_prize: batch.total_prize(),
        card_details: batch
            .cards()
            .iter()
            .enumerate()
            .map(|(index, c)| CardDetail {
                index,
                outcome: c.outcome(),
                bonus: c.is_bonus(),
            })
            .collect(),
    })
}
