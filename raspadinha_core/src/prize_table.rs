use crate::error::{EngineError, EngineResult};
use crate::rng::DrawSource;
use serde::{Deserialize, Serialize};

pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrizeEntry {
    pub value: f64,
    pub probability: f64,
}

impl PrizeEntry {
    pub fn new(value: f64, probability: f64) -> Self {
        Self { value, probability }
    }
}

/// Weighted distribution of non-zero prizes, gated by `prize_chance`.
///
/// Entry order matters: the value draw walks the cumulative distribution in
/// declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeTable {
    pub prize_chance: f64,
    pub entries: Vec<PrizeEntry>,
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            entries: vec![
                PrizeEntry::new(5.0, 0.5),
                PrizeEntry::new(10.0, 0.25),
                PrizeEntry::new(20.0, 0.15),
                PrizeEntry::new(50.0, 0.07),
                PrizeEntry::new(100.0, 0.025),
                PrizeEntry::new(500.0, 0.005),
            ],
            prize_chance: 0.7,
        }
    }
}

impl PrizeTable {
    pub fn new(entries: Vec<PrizeEntry>, prize_chance: f64) -> Self {
        Self {
            entries,
            prize_chance,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.entries.is_empty() {
            return Err(EngineError::config("prize table is empty"));
        }
        if !(0.0..=1.0).contains(&self.prize_chance) {
            return Err(EngineError::config(format!(
                "prize chance {} outside [0, 1]",
                self.prize_chance
            )));
        }
        for (i, e) in self.entries.iter().enumerate() {
            if !e.value.is_finite() || e.value < 0.0 {
                return Err(EngineError::config(format!(
                    "entry {i}: prize value {} must be a non-negative number",
                    e.value
                )));
            }
            if !(0.0..=1.0).contains(&e.probability) {
                return Err(EngineError::config(format!(
                    "entry {i}: probability {} outside [0, 1]",
                    e.probability
                )));
            }
        }
        let sum: f64 = self.entries.iter().map(|e| e.probability).sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(EngineError::config(format!(
                "probabilities sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }

    /// One card outcome: Bernoulli gate on `prize_chance`, then a cumulative
    /// walk picking the first entry whose running sum strictly exceeds the
    /// value draw. Rounding that leaves the walk unmatched lands on the last entry.
    pub fn draw<D: DrawSource + ?Sized>(&self, draws: &mut D) -> f64 {
        let gate = draws.next_unit();
        if gate >= self.prize_chance {
            return 0.0;
        }
        let r = draws.next_unit();
        let mut cumulative = 0.0;
        for e in &self.entries {
            cumulative += e.probability;
            if cumulative > r {
                return e.value;
            }
        }
        self.entries.last().map(|e| e.value).unwrap_or(0.0)
    }

    pub fn expected_value(&self) -> f64 {
        self.prize_chance
            * self
                .entries
                .iter()
                .map(|e| e.value * e.probability)
                .sum::<f64>()
    }

    pub fn max_prize(&self) -> f64 {
        self.entries.iter().map(|e| e.value).fold(0.0, f64::max)
    }
}
