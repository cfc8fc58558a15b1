//! Scratch coverage tracking.
//!
//! Erasure is modelled geometrically: a brush is a disc of fixed radius and a
//! gesture sweeps that disc along the polyline through its sampled points.
//! Each card keeps a one-bit-per-pixel grid, so overlapping strokes are
//! counted once and the ratio can only grow.

use crate::card::{Batch, RevealEvent};
use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Largest surface a card may carry, in pixels.
pub const MAX_SURFACE_PIXELS: u64 = 4096 * 4096;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScratchSurface {
    pub width: u32,
    pub height: u32,
    pub brush_radius: f64,
}

impl Default for ScratchSurface {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            brush_radius: 15.0,
        }
    }
}

impl ScratchSurface {
    pub fn new(width: u32, height: u32, brush_radius: f64) -> Self {
        Self {
            width,
            height,
            brush_radius,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::config(format!(
                "surface {}x{} has no area",
                self.width, self.height
            )));
        }
        if self.area() > MAX_SURFACE_PIXELS {
            return Err(EngineError::config(format!(
                "surface {}x{} exceeds {MAX_SURFACE_PIXELS} pixels",
                self.width, self.height
            )));
        }
        if !self.brush_radius.is_finite() || self.brush_radius <= 0.0 {
            return Err(EngineError::config(format!(
                "brush radius {} must be positive",
                self.brush_radius
            )));
        }
        Ok(())
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
}

impl Pixel {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Newly erased region of one card's surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScratchMask {
    /// Continuous gesture; consecutive points are joined by the swept brush.
    Stroke { points: Vec<Point> },
    /// Explicit erased pixels; anything off the surface is ignored.
    Pixels { pixels: Vec<Pixel> },
}

impl ScratchMask {
    pub fn stroke(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        ScratchMask::Stroke {
            points: points.into_iter().map(|(x, y)| Point::new(x, y)).collect(),
        }
    }

    pub fn pixels(pixels: impl IntoIterator<Item = (u32, u32)>) -> Self {
        ScratchMask::Pixels {
            pixels: pixels.into_iter().map(|(x, y)| Pixel::new(x, y)).collect(),
        }
    }

    /// Number of stroke points, zero for pixel masks.
    pub fn stroke_points(&self) -> usize {
        match self {
            ScratchMask::Stroke { points } => points.len(),
            ScratchMask::Pixels { .. } => 0,
        }
    }
}

pub(crate) fn check_threshold(threshold: f64) -> EngineResult<()> {
    if threshold > 0.0 && threshold <= 1.0 {
        return Ok(());
    }
    Err(EngineError::config(format!(
        "reveal threshold {threshold} outside (0, 1]"
    )))
}

// Erased pixels of one surface, one bit each.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageGrid {
    width: u32,
    height: u32,
    bits: Vec<u64>,
    erased: u64,
}

impl CoverageGrid {
    pub fn new(width: u32, height: u32) -> Self {
        let cells = width as usize * height as usize;
        Self {
            width,
            height,
            bits: vec![0; cells.div_ceil(64)],
            erased: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn erased(&self) -> u64 {
        self.erased
    }

    pub fn is_full(&self) -> bool {
        self.erased == self.total()
    }

    pub fn total(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.erased as f64 / total as f64
    }

    pub fn is_erased(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let i = y as usize * self.width as usize + x as usize;
        self.bits[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Returns true when the pixel was not erased before.
    pub fn erase(&mut self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let i = y as usize * self.width as usize + x as usize;
        let mask = 1u64 << (i % 64);
        let word = &mut self.bits[i / 64];
        if *word & mask != 0 {
            return false;
        }
        *word |= mask;
        self.erased += 1;
        true
    }

    /// Erases every pixel whose centre lies within `radius` of segment `a`-`b`.
    pub fn erase_capsule(&mut self, a: Point, b: Point, radius: f64) -> u64 {
        if !a.is_finite() || !b.is_finite() || self.is_full() {
            return 0;
        }
        let Some((x0, x1)) = clip_span(a.x.min(b.x) - radius, a.x.max(b.x) + radius, self.width)
        else {
            return 0;
        };
        let Some((y0, y1)) = clip_span(a.y.min(b.y) - radius, a.y.max(b.y) + radius, self.height)
        else {
            return 0;
        };

        let r2 = radius * radius;
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len2 = dx * dx + dy * dy;
        let mut newly = 0;
        for y in y0..=y1 {
            let cy = y as f64 + 0.5;
            for x in x0..=x1 {
                let cx = x as f64 + 0.5;
                let t = if len2 > 0.0 {
                    (((cx - a.x) * dx + (cy - a.y) * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (px, py) = (a.x + t * dx - cx, a.y + t * dy - cy);
                if px * px + py * py <= r2 && self.erase(x, y) {
                    newly += 1;
                }
            }
        }
        newly
    }

    pub fn erase_disc(&mut self, center: Point, radius: f64) -> u64 {
        self.erase_capsule(center, center, radius)
    }

    /// Applies a whole mask and returns the number of newly erased pixels.
    pub fn apply(&mut self, mask: &ScratchMask, radius: f64) -> u64 {
        match mask {
            ScratchMask::Stroke { points } => match points.as_slice() {
                [] => 0,
                [only] => self.erase_disc(*only, radius),
                _ => points
                    .windows(2)
                    .map(|w| self.erase_capsule(w[0], w[1], radius))
                    .sum(),
            },
            ScratchMask::Pixels { pixels } => pixels
                .iter()
                .filter(|p| self.erase(p.x, p.y))
                .count() as u64,
        }
    }
}

// Inclusive pixel range covering [lo, hi] clipped to [0, limit).
fn clip_span(lo: f64, hi: f64, limit: u32) -> Option<(u32, u32)> {
    if limit == 0 || hi < 0.0 || lo >= limit as f64 {
        return None;
    }
    let start = lo.floor().max(0.0) as u32;
    let end = (hi.floor() as u32).min(limit - 1);
    (start <= end).then_some((start, end))
}

/// Feeds one mask into a card and flips it to revealed when coverage first
/// reaches `threshold` (inclusive). Scratching a card that is already revealed
/// is a no-op returning `None`.
pub fn apply_scratch(
    batch: &mut Batch,
    index: usize,
    mask: &ScratchMask,
    threshold: f64,
) -> EngineResult<Option<RevealEvent>> {
    check_threshold(threshold)?;
    let len = batch.len();
    if batch.is_finished() {
        return Err(EngineError::BatchFinished);
    }
    let radius = batch.surface().brush_radius;
    let card = batch
        .card_mut(index)
        .ok_or(EngineError::InvalidIndex { index, len })?;
    if card.is_revealed() {
        return Ok(None);
    }

    let newly = card.coverage_mut().apply(mask, radius);
    let ratio = card.scratched_ratio();
    debug!(card = index, newly, ratio, "scratch applied");

    if ratio >= threshold {
        card.mark_revealed();
        return Ok(Some(RevealEvent {
            card_index: index,
            outcome: card.outcome(),
        }));
    }
    Ok(None)
}
