use crate::card::{Batch, Card};
use crate::error::{EngineError, EngineResult};
use crate::prize_table::PrizeTable;
use crate::reveal::ScratchSurface;
use crate::rng::{DrawSource, ProvablyFairRng};
use tracing::debug;

/// Draws `n` hidden outcomes from `table`. Every card starts unrevealed with
/// nothing scratched.
pub fn generate_batch<D: DrawSource + ?Sized>(
    n: usize,
    table: &PrizeTable,
    surface: &ScratchSurface,
    draws: &mut D,
) -> EngineResult<Batch> {
    generate_batch_with_bonus(n, 0, table, surface, draws)
}

/// Like [`generate_batch`], with `bonus` free cards appended after the `paid` ones.
pub fn generate_batch_with_bonus<D: DrawSource + ?Sized>(
    paid: usize,
    bonus: usize,
    table: &PrizeTable,
    surface: &ScratchSurface,
    draws: &mut D,
) -> EngineResult<Batch> {
    let n = paid + bonus;
    if n == 0 {
        return Err(EngineError::config("a batch needs at least one card"));
    }
    table.validate()?;
    surface.validate()?;

    let cards: Vec<Card> = (0..n)
        .map(|i| Card::new(table.draw(&mut *draws), i >= paid, surface))
        .collect();
    debug!(
        paid,
        bonus,
        winners = cards.iter().filter(|c| c.outcome() > 0.0).count(),
        "batch generated"
    );
    Ok(Batch::new(cards, *surface))
}

pub fn verify_batch(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    table: &PrizeTable,
    outcomes: &[f64],
) -> bool {
    let mut draws = ProvablyFairRng::new(server_seed, client_seed, nonce).stream();
    outcomes
        .iter()
        .all(|&expected| table.draw(&mut draws) == expected)
}
