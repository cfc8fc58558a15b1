//! Engine configuration. One value is built per engine instance; there is no
//! ambient global state.

use crate::error::{EngineError, EngineResult};
use crate::prize_table::PrizeTable;
use crate::reveal::{self, ScratchSurface};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of the surface that must be scratched to reveal a card, in (0, 1]
    pub reveal_threshold: f64,
    pub unit_price: f64,
    pub max_batch_size: usize,
    /// Most points accepted in one stroke mask
    pub max_mask_points: usize,
    pub surface: ScratchSurface,
    pub prize_table: PrizeTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reveal_threshold: 0.5,
            unit_price: 5.0,
            max_batch_size: 100,
            max_mask_points: 1024,
            surface: ScratchSurface::default(),
            prize_table: PrizeTable::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.prize_table.validate()?;
        self.surface.validate()?;
        reveal::check_threshold(self.reveal_threshold)?;
        if !self.unit_price.is_finite() || self.unit_price <= 0.0 {
            return Err(EngineError::config(format!(
                "unit price {} must be positive",
                self.unit_price
            )));
        }
        if self.max_batch_size == 0 {
            return Err(EngineError::config("max batch size must be at least 1"));
        }
        if self.max_mask_points == 0 {
            return Err(EngineError::config("max mask points must be at least 1"));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::config(format!("cannot serialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn threshold_bounds() {
        let mut c = EngineConfig::default();
        c.reveal_threshold = 1.0;
        c.validate().unwrap();
        c.reveal_threshold = 0.0;
        assert!(c.validate().is_err());
        c.reveal_threshold = -0.5;
        assert!(c.validate().is_err());
        c.reveal_threshold = 1.01;
        assert!(c.validate().is_err());
    }

    #[test]
    fn oversized_surface_is_rejected() {
        let c = EngineConfig {
            surface: ScratchSurface::new(u32::MAX, u32::MAX, 1.0),
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(EngineError::Config(_))));
        let c = EngineConfig {
            max_mask_points: 0,
            ..EngineConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = EngineConfig::from_toml_str(
            r#"
reveal_threshold = 0.6
unit_price = 2.5

[surface]
width = 100
height = 80
brush_radius = 10.0
"#,
        )
        .unwrap();
        assert_eq!(c.reveal_threshold, 0.6);
        assert_eq!(c.surface.height, 80);
        assert_eq!(c.prize_table, PrizeTable::default());
    }

    #[test]
    fn toml_prize_table() {
        let c = EngineConfig::from_toml_str(
            r#"
[prize_table]
prize_chance = 0.5
entries = [
    { value = 2.0, probability = 0.75 },
    { value = 50.0, probability = 0.25 },
]
"#,
        )
        .unwrap();
        assert_eq!(c.prize_table.entries.len(), 2);
        assert_eq!(c.prize_table.prize_chance, 0.5);
    }

    #[test]
    fn invalid_toml_table_is_a_config_error() {
        let err = EngineConfig::from_toml_str(
            r#"
[prize_table]
prize_chance = 0.5
entries = [{ value = 2.0, probability = 0.5 }]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn toml_round_trip() {
        let c = EngineConfig::default();
        let back = EngineConfig::from_toml_str(&c.to_toml_string().unwrap()).unwrap();
        assert_eq!(back, c);
    }
}
