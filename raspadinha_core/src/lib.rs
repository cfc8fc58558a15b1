pub mod card;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod prize_table;
pub mod reveal;
pub mod rng;
pub mod settlement;

pub use crate::card::{Batch, BatchSnapshot, BatchView, Card, CardSnapshot, CardView, RevealEvent, Tier};
pub use crate::config::EngineConfig;
pub use crate::engine::{CardEngine, ScratchOutcome};
pub use crate::error::{EngineError, EngineResult};
pub use crate::generator::{generate_batch, generate_batch_with_bonus, verify_batch};
pub use crate::prize_table::{PrizeEntry, PrizeTable};
pub use crate::reveal::{
    apply_scratch, CoverageGrid, Pixel, Point, ScratchMask, ScratchSurface, MAX_SURFACE_PIXELS,
};
pub use crate::rng::{derive_floats, derive_hash_hex, DrawSource, FairDraws, ProvablyFairRng, RngDraws, ScriptedDraws};
pub use crate::settlement::{on_revealed, settle, BatchStatus, CardDetail, SettlementRequest};
