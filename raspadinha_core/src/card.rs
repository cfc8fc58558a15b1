use crate::reveal::{CoverageGrid, ScratchSurface};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Miss,
    Coins,
    Clover,
    Gem,
    Star,
    Jackpot,
}

impl Tier {
    pub fn from_outcome(value: f64) -> Self {
        if value <= 0.0 {
            Tier::Miss
        } else if value >= 100.0 {
            Tier::Jackpot
        } else if value >= 50.0 {
            Tier::Star
        } else if value >= 20.0 {
            Tier::Gem
        } else if value >= 10.0 {
            Tier::Clover
        } else {
            Tier::Coins
        }
    }

    pub fn is_win(self) -> bool {
        self != Tier::Miss
    }
}

/// One scratch-off unit. The outcome is fixed at generation; the reveal state
/// only moves forward.
#[derive(Debug, Clone)]
pub struct Card {
    outcome: f64,
    bonus: bool,
    revealed: bool,
    tallied: bool,
    coverage: CoverageGrid,
}

impl Card {
    pub(crate) fn new(outcome: f64, bonus: bool, surface: &ScratchSurface) -> Self {
        Self {
            outcome,
            bonus,
            revealed: false,
            tallied: false,
            coverage: CoverageGrid::new(surface.width, surface.height),
        }
    }

    pub fn outcome(&self) -> f64 {
        self.outcome
    }

    pub fn is_bonus(&self) -> bool {
        self.bonus
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn scratched_ratio(&self) -> f64 {
        self.coverage.ratio()
    }

    pub fn tier(&self) -> Tier {
        Tier::from_outcome(self.outcome)
    }

    pub fn coverage(&self) -> &CoverageGrid {
        &self.coverage
    }

    pub(crate) fn coverage_mut(&mut self) -> &mut CoverageGrid {
        &mut self.coverage
    }

    pub(crate) fn mark_revealed(&mut self) {
        self.revealed = true;
    }

    pub(crate) fn is_tallied(&self) -> bool {
        self.tallied
    }

    pub(crate) fn mark_tallied(&mut self) {
        self.tallied = true;
    }

    pub fn snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            outcome: self.outcome,
            revealed: self.revealed,
            scratched_ratio: self.scratched_ratio(),
            bonus: self.bonus,
        }
    }

    /// Renderer-facing view; the outcome stays hidden until the card is revealed.
    pub fn view(&self, index: usize) -> CardView {
        CardView {
            index,
            outcome: self.revealed.then_some(self.outcome),
            tier: self.revealed.then(|| self.tier()),
            revealed: self.revealed,
            scratched_ratio: self.scratched_ratio(),
            bonus: self.bonus,
        }
    }
}

/// Emitted once per card, on the scratch that first crosses the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealEvent {
    pub card_index: usize,
    pub outcome: f64,
}

#[derive(Debug, Clone)]
pub struct Batch {
    cards: Vec<Card>,
    surface: ScratchSurface,
    total_prize: f64,
    finished: bool,
}

impl Batch {
    pub(crate) fn new(cards: Vec<Card>, surface: ScratchSurface) -> Self {
        Self {
            cards,
            surface,
            total_prize: 0.0,
            finished: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub(crate) fn card_mut(&mut self, index: usize) -> Option<&mut Card> {
        self.cards.get_mut(index)
    }

    pub fn surface(&self) -> &ScratchSurface {
        &self.surface
    }

    pub fn total_prize(&self) -> f64 {
        self.total_prize
    }

    pub(crate) fn add_prize(&mut self, value: f64) {
        self.total_prize += value;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn revealed_count(&self) -> usize {
        self.cards.iter().filter(|c| c.revealed).count()
    }

    pub fn bonus_count(&self) -> usize {
        self.cards.iter().filter(|c| c.bonus).count()
    }

    pub fn all_revealed(&self) -> bool {
        self.cards.iter().all(|c| c.revealed)
    }

    /// Full state including hidden outcomes. Only for the trusted side.
    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            cards: self.cards.iter().map(Card::snapshot).collect(),
            total_prize: self.total_prize,
            finished: self.finished,
        }
    }

    pub fn public_view(&self) -> BatchView {
        BatchView {
            cards: self
                .cards
                .iter()
                .enumerate()
                .map(|(i, c)| c.view(i))
                .collect(),
            total_prize: self.total_prize,
            finished: self.finished,
            revealed_count: self.revealed_count(),
            total_count: self.cards.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub outcome: f64,
    pub revealed: bool,
    pub scratched_ratio: f64,
    pub bonus: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub cards: Vec<CardSnapshot>,
    pub total_prize: f64,
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub index: usize,
    pub outcome: Option<f64>,
    pub tier: Option<Tier>,
    pub revealed: bool,
    pub scratched_ratio: f64,
    pub bonus: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchView {
    pub cards: Vec<CardView>,
    pub total_prize: f64,
    pub finished: bool,
    pub revealed_count: usize,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_prize_bands() {
        assert_eq!(Tier::from_outcome(0.0), Tier::Miss);
        assert_eq!(Tier::from_outcome(5.0), Tier::Coins);
        assert_eq!(Tier::from_outcome(10.0), Tier::Clover);
        assert_eq!(Tier::from_outcome(20.0), Tier::Gem);
        assert_eq!(Tier::from_outcome(50.0), Tier::Star);
        assert_eq!(Tier::from_outcome(100.0), Tier::Jackpot);
        assert_eq!(Tier::from_outcome(500.0), Tier::Jackpot);
        assert!(!Tier::Miss.is_win());
    }

    #[test]
    fn view_hides_unrevealed_outcome() {
        let surface = ScratchSurface::new(4, 4, 1.0);
        let mut card = Card::new(20.0, false, &surface);
        let hidden = card.view(3);
        assert_eq!(hidden.index, 3);
        assert_eq!(hidden.outcome, None);
        assert_eq!(hidden.tier, None);

        card.mark_revealed();
        let shown = card.view(3);
        assert_eq!(shown.outcome, Some(20.0));
        assert_eq!(shown.tier, Some(Tier::Gem));
        assert_eq!(card.snapshot().outcome, 20.0);
    }
}
