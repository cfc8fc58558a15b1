use crate::{
    card::{Batch, RevealEvent},
    config::EngineConfig,
    error::{EngineError, EngineResult},
    generator,
    reveal::{self, ScratchMask},
    rng::{DrawSource, ProvablyFairRng},
    settlement::{self, BatchStatus, SettlementRequest},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScratchOutcome {
    pub event: Option<RevealEvent>,
    pub status: BatchStatus,
}

/// Generator, reveal tracker and settlement aggregator bound to one validated
/// configuration.
///
/// The engine holds no batch state; callers own their `Batch` and must not
/// mutate the same batch from more than one thread at a time.
#[derive(Debug, Clone)]
pub struct CardEngine {
    config: EngineConfig,
}

impl CardEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generate_batch<D: DrawSource + ?Sized>(
        &self,
        n: usize,
        draws: &mut D,
    ) -> EngineResult<Batch> {
        self.generate_batch_with_bonus(n, 0, draws)
    }

    pub fn generate_batch_with_bonus<D: DrawSource + ?Sized>(
        &self,
        paid: usize,
        bonus: usize,
        draws: &mut D,
    ) -> EngineResult<Batch> {
        let n = paid + bonus;
        if n > self.config.max_batch_size {
            return Err(EngineError::config(format!(
                "batch of {n} exceeds the limit of {}",
                self.config.max_batch_size
            )));
        }
        generator::generate_batch_with_bonus(
            paid,
            bonus,
            &self.config.prize_table,
            &self.config.surface,
            draws,
        )
    }

    pub fn generate_fair_batch(
        &self,
        rng: &ProvablyFairRng,
        paid: usize,
        bonus: usize,
    ) -> EngineResult<Batch> {
        self.generate_batch_with_bonus(paid, bonus, &mut rng.stream())
    }

    pub fn apply_scratch(
        &self,
        batch: &mut Batch,
        index: usize,
        mask: &ScratchMask,
    ) -> EngineResult<Option<RevealEvent>> {
        let points = mask.stroke_points();
        if points > self.config.max_mask_points {
            return Err(EngineError::MaskTooLarge {
                points,
                max: self.config.max_mask_points,
            });
        }
        reveal::apply_scratch(batch, index, mask, self.config.reveal_threshold)
    }

    pub fn on_revealed(&self, batch: &mut Batch, event: &RevealEvent) -> EngineResult<BatchStatus> {
        settlement::on_revealed(batch, event)
    }

    /// Applies a scratch and, when it reveals the card, tallies it straight away.
    pub fn scratch(
        &self,
        batch: &mut Batch,
        index: usize,
        mask: &ScratchMask,
    ) -> EngineResult<ScratchOutcome> {
        let event = self.apply_scratch(batch, index, mask)?;
        let status = match &event {
            Some(e) => {
                info!(card = e.card_index, outcome = e.outcome, "card revealed");
                self.on_revealed(batch, e)?
            }
            None => BatchStatus::InProgress {
                revealed: batch.revealed_count(),
                total: batch.len(),
            },
        };
        Ok(ScratchOutcome { event, status })
    }

    pub fn settle(&self, batch: &Batch) -> EngineResult<SettlementRequest> {
        settlement::settle(batch, self.config.unit_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::ScratchSurface;
    use crate::rng::RngDraws;

    fn small_engine() -> CardEngine {
        CardEngine::new(EngineConfig {
            surface: ScratchSurface::new(10, 10, 2.0),
            max_batch_size: 5,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let err = CardEngine::new(EngineConfig {
            reveal_threshold: 0.0,
            ..EngineConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn enforces_batch_limit() {
        let engine = small_engine();
        assert!(engine
            .generate_batch_with_bonus(4, 2, &mut RngDraws::seeded(1))
            .is_err());
        assert_eq!(
            engine
                .generate_batch(5, &mut RngDraws::seeded(1))
                .unwrap()
                .len(),
            5
        );
    }

    #[test]
    fn fair_batch_is_deterministic() {
        let engine = small_engine();
        let rng = ProvablyFairRng::new("server", "client", 1);
        let a = engine.generate_fair_batch(&rng, 5, 0).unwrap();
        let b = engine.generate_fair_batch(&rng, 5, 0).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn long_strokes_are_rejected_before_rasterising() {
        let engine = CardEngine::new(EngineConfig {
            surface: ScratchSurface::new(10, 10, 2.0),
            max_mask_points: 4,
            ..EngineConfig::default()
        })
        .unwrap();
        let mut batch = engine.generate_batch(1, &mut RngDraws::seeded(3)).unwrap();
        let zigzag: Vec<(f64, f64)> = (0..5)
            .map(|i| if i % 2 == 0 { (0.0, 0.0) } else { (10.0, 10.0) })
            .collect();
        let err = engine
            .scratch(&mut batch, 0, &ScratchMask::stroke(zigzag))
            .unwrap_err();
        assert_eq!(err, EngineError::MaskTooLarge { points: 5, max: 4 });
        assert_eq!(batch.cards()[0].scratched_ratio(), 0.0);

        let ok = ScratchMask::stroke([(0.0, 0.0), (10.0, 10.0)]);
        engine.scratch(&mut batch, 0, &ok).unwrap();
    }

    #[test]
    fn scratch_reports_progress_without_event() {
        let engine = small_engine();
        let mut batch = engine.generate_batch(2, &mut RngDraws::seeded(2)).unwrap();
        let out = engine
            .scratch(&mut batch, 0, &ScratchMask::pixels([(0, 0)]))
            .unwrap();
        assert_eq!(out.event, None);
        assert_eq!(
            out.status,
            BatchStatus::InProgress {
                revealed: 0,
                total: 2
            }
        );
    }
}
