use proptest::prelude::*;
use raspadinha_core::{
    generate_batch, BatchStatus, CardEngine, EngineConfig, EngineError, PrizeTable, RngDraws,
    ScratchMask, ScratchSurface, ScriptedDraws,
};

fn engine_10x10(threshold: f64) -> CardEngine {
    CardEngine::new(EngineConfig {
        reveal_threshold: threshold,
        surface: ScratchSurface::new(10, 10, 1.5),
        ..EngineConfig::default()
    })
    .unwrap()
}

// First `count` pixels of a 10-wide surface, row-major.
fn first_pixels(from: u32, count: u32) -> ScratchMask {
    ScratchMask::pixels((from..from + count).map(|i| (i % 10, i / 10)))
}

#[test]
fn scripted_batch_follows_gate_then_value() {
    let table = PrizeTable::default();
    // gate, [value] per card: miss; hit -> 0.3; hit -> 0.85
    let mut draws = ScriptedDraws::new(vec![0.95, 0.1, 0.3, 0.4, 0.85]);
    let batch = generate_batch(3, &table, &ScratchSurface::default(), &mut draws).unwrap();
    let outcomes: Vec<f64> = batch.cards().iter().map(|c| c.outcome()).collect();
    assert_eq!(outcomes, vec![0.0, 5.0, 20.0]);
}

#[test]
fn draw_on_cumulative_boundary_goes_to_next_entry() {
    // running sum after the 20 entry is exactly 0.9; 0.9 does not strictly exceed it
    let table = PrizeTable::default();
    let mut draws = ScriptedDraws::new(vec![0.4, 0.9]);
    let batch = generate_batch(1, &table, &ScratchSurface::default(), &mut draws).unwrap();
    assert_eq!(batch.cards()[0].outcome(), 50.0);
}

#[test]
fn distribution_converges() {
    let table = PrizeTable::default();
    let n = 100_000;
    let batch = generate_batch(
        n,
        &table,
        &ScratchSurface::new(1, 1, 1.0),
        &mut RngDraws::seeded(20_240_601),
    )
    .unwrap();
    let misses = batch.cards().iter().filter(|c| c.outcome() == 0.0).count();
    let jackpots = batch.cards().iter().filter(|c| c.outcome() == 500.0).count();
    let miss_rate = misses as f64 / n as f64;
    let jackpot_rate = jackpots as f64 / n as f64;
    assert!((miss_rate - 0.30).abs() <= 0.01, "miss rate {miss_rate}");
    assert!(
        (jackpot_rate - 0.0035).abs() <= 0.0005,
        "jackpot rate {jackpot_rate}"
    );
}

#[test]
fn reveal_on_crossing_fifty_one_percent() {
    let engine = engine_10x10(0.5);
    let mut batch = engine.generate_batch(1, &mut RngDraws::seeded(5)).unwrap();

    let first = engine.scratch(&mut batch, 0, &first_pixels(0, 49)).unwrap();
    assert_eq!(first.event, None);
    assert!((batch.cards()[0].scratched_ratio() - 0.49).abs() < 1e-12);

    let second = engine.scratch(&mut batch, 0, &first_pixels(49, 2)).unwrap();
    let event = second.event.expect("reveal on the 51% sample");
    assert_eq!(event.card_index, 0);
    assert_eq!(event.outcome, batch.cards()[0].outcome());
    assert_eq!(
        second.status,
        BatchStatus::Finished {
            total_prize: event.outcome
        }
    );
    assert!(batch.is_finished());

    // finished batches reject further scratching
    assert_eq!(
        engine.scratch(&mut batch, 0, &first_pixels(60, 5)),
        Err(EngineError::BatchFinished)
    );
}

#[test]
fn exactly_threshold_reveals_and_finishes_last_card() {
    let engine = engine_10x10(0.5);
    let mut batch = engine.generate_batch(2, &mut RngDraws::seeded(8)).unwrap();

    let done = engine.scratch(&mut batch, 0, &first_pixels(0, 100)).unwrap();
    assert!(done.event.is_some());
    assert!(!done.status.is_finished());

    let half = engine.scratch(&mut batch, 1, &first_pixels(0, 50)).unwrap();
    assert!(half.event.is_some());
    assert_eq!(batch.cards()[1].scratched_ratio(), 0.5);
    let expected: f64 = batch.cards().iter().map(|c| c.outcome()).sum();
    assert_eq!(
        half.status,
        BatchStatus::Finished {
            total_prize: expected
        }
    );
}

#[test]
fn revealed_card_ignores_further_scratches() {
    let engine = engine_10x10(0.5);
    let mut batch = engine.generate_batch(2, &mut RngDraws::seeded(3)).unwrap();
    engine.scratch(&mut batch, 0, &first_pixels(0, 60)).unwrap();
    let total = batch.total_prize();
    let ratio = batch.cards()[0].scratched_ratio();

    let again = engine.scratch(&mut batch, 0, &first_pixels(60, 40)).unwrap();
    assert_eq!(again.event, None);
    assert_eq!(batch.total_prize(), total);
    assert_eq!(batch.cards()[0].scratched_ratio(), ratio);
}

#[test]
fn out_of_range_index_is_rejected() {
    let engine = engine_10x10(0.5);
    let mut batch = engine.generate_batch(2, &mut RngDraws::seeded(3)).unwrap();
    assert_eq!(
        engine.apply_scratch(&mut batch, 2, &first_pixels(0, 1)),
        Err(EngineError::InvalidIndex { index: 2, len: 2 })
    );
}

#[test]
fn full_flow_settles() {
    let engine = engine_10x10(0.5);
    let mut batch = engine
        .generate_batch_with_bonus(3, 1, &mut RngDraws::seeded(11))
        .unwrap();
    assert!(engine.settle(&batch).is_err());
    for i in 0..batch.len() {
        engine
            .scratch(&mut batch, i, &ScratchMask::stroke([(0.0, 5.0), (10.0, 5.0)]))
            .unwrap();
        engine
            .scratch(
                &mut batch,
                i,
                &ScratchMask::stroke([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
            )
            .unwrap();
    }
    assert!(batch.is_finished());
    let s = engine.settle(&batch).unwrap();
    assert_eq!(s.quantity, 4);
    assert_eq!(s.total_wagered, 15.0);
    assert_eq!(s.total_prize, batch.total_prize());
    assert_eq!(s.card_details.len(), 4);

    let json = serde_json::to_value(&s).unwrap();
    assert_eq!(json["quantity"], 4);
}

#[test]
fn public_view_reveals_progressively() {
    let engine = engine_10x10(0.5);
    let mut batch = engine.generate_batch(2, &mut RngDraws::seeded(4)).unwrap();
    assert!(batch.public_view().cards.iter().all(|c| c.outcome.is_none()));
    engine.scratch(&mut batch, 1, &first_pixels(0, 100)).unwrap();
    let view = batch.public_view();
    assert_eq!(view.cards[0].outcome, None);
    assert_eq!(view.cards[1].outcome, Some(batch.cards()[1].outcome()));
    assert_eq!(view.revealed_count, 1);
}

fn stroke_strategy() -> impl Strategy<Value = (usize, Vec<(f64, f64)>)> {
    (
        0usize..3,
        prop::collection::vec((-2.0f64..12.0, -2.0f64..12.0), 1..5),
    )
}

proptest! {
    #[test]
    fn scratching_is_monotone_and_conserves_prize(
        seed in any::<u64>(),
        strokes in prop::collection::vec(stroke_strategy(), 1..40),
    ) {
        let engine = engine_10x10(0.5);
        let mut batch = engine.generate_batch(3, &mut RngDraws::seeded(seed)).unwrap();
        let outcomes: Vec<f64> = batch.cards().iter().map(|c| c.outcome()).collect();

        for (index, points) in strokes {
            let before_ratio = batch.cards()[index].scratched_ratio();
            let before_revealed = batch.cards()[index].is_revealed();
            let result = engine.scratch(&mut batch, index, &ScratchMask::stroke(points));
            if batch.is_finished() && result.is_err() {
                prop_assert_eq!(result, Err(EngineError::BatchFinished));
                continue;
            }
            let out = result.unwrap();
            let card = &batch.cards()[index];
            prop_assert!(card.scratched_ratio() >= before_ratio);
            prop_assert!(!before_revealed || card.is_revealed());
            if before_revealed {
                prop_assert!(out.event.is_none());
            }

            let revealed_sum: f64 = batch
                .cards()
                .iter()
                .filter(|c| c.is_revealed())
                .map(|c| c.outcome())
                .sum();
            prop_assert_eq!(batch.total_prize(), revealed_sum);
        }
        let after: Vec<f64> = batch.cards().iter().map(|c| c.outcome()).collect();
        prop_assert_eq!(outcomes, after);
    }
}
