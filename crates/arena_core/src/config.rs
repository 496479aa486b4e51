//! Data-driven arena configuration.
//!
//! Both structures here are plain data deserialized from RON. This module
//! does no file IO; callers hand in the text (see `arena_headless` for the
//! loader).
//!
//! # Example RON
//!
//! ```ron
//! ArenaConfig(
//!     board_width: 8,
//!     board_height: 6,
//!     distance_metric: Chebyshev,
//!     fallback_hit_delay_ms: 200,
//! )
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{millis, DistanceMetric, Fixed, MAX_MILLIS};

/// Simulation ticks per second for the room driver.
pub const TICK_RATE: u32 = 20;

/// Duration of one room tick in milliseconds.
pub const TICK_DURATION_MS: u32 = 1000 / TICK_RATE;

/// Frame rate the unit animation metadata is authored at.
pub const ANIMATION_FPS: u32 = 36;

/// Hit delay used whenever the animation metadata produces a degenerate value.
pub const FALLBACK_HIT_DELAY_MS: u32 = 200;

/// PP granted to an attacker each time a basic attack lands.
pub const ON_ATTACK_PP: u32 = 5;

/// Room-wide tuning knobs.
///
/// Every field has a default, so a RON document only needs to list the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Board columns.
    pub board_width: u32,
    /// Board rows.
    pub board_height: u32,
    /// Metric used for every range, sight and nearest-target comparison.
    pub distance_metric: DistanceMetric,
    /// Frame rate of the animation metadata.
    pub animation_fps: u32,
    /// Hit delay used when timing metadata is missing or degenerate.
    pub fallback_hit_delay_ms: u32,
    /// PP granted per landed basic attack.
    pub on_attack_pp: u32,
    /// Pause between movement steps.
    pub move_cooldown_ms: u32,
    /// Elapsed time per [`Room::tick`](crate::room::Room::tick).
    pub tick_duration_ms: u32,
    /// Lower clamp for attack speed, in hundredths of an attack per second.
    pub min_attack_speed_centi: u32,
    /// Upper clamp for attack speed, in hundredths of an attack per second.
    pub max_attack_speed_centi: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            board_width: 8,
            board_height: 6,
            distance_metric: DistanceMetric::Chebyshev,
            animation_fps: ANIMATION_FPS,
            fallback_hit_delay_ms: FALLBACK_HIT_DELAY_MS,
            on_attack_pp: ON_ATTACK_PP,
            move_cooldown_ms: 500,
            tick_duration_ms: TICK_DURATION_MS,
            min_attack_speed_centi: 40,
            max_attack_speed_centi: 250,
        }
    }
}

impl ArenaConfig {
    /// Parse a configuration from RON text and check its ranges.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            source_name: "arena config".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the fixed-point timers cannot represent.
    pub fn validate(&self) -> Result<()> {
        let timers = [
            ("fallback_hit_delay_ms", self.fallback_hit_delay_ms),
            ("move_cooldown_ms", self.move_cooldown_ms),
            ("tick_duration_ms", self.tick_duration_ms),
            ("min_attack_speed_centi", self.min_attack_speed_centi),
            ("max_attack_speed_centi", self.max_attack_speed_centi),
        ];
        if let Some((field, value)) = timers.iter().find(|(_, value)| *value > MAX_MILLIS) {
            return Err(GameError::ConfigParse {
                source_name: "arena config".to_string(),
                message: format!("{field} = {value} exceeds {MAX_MILLIS}"),
            });
        }
        if self.min_attack_speed_centi > self.max_attack_speed_centi {
            return Err(GameError::ConfigParse {
                source_name: "arena config".to_string(),
                message: format!(
                    "min_attack_speed_centi ({}) is above max_attack_speed_centi ({})",
                    self.min_attack_speed_centi, self.max_attack_speed_centi
                ),
            });
        }
        Ok(())
    }

    /// Tick duration as a fixed-point millisecond value.
    #[must_use]
    pub fn tick_duration(&self) -> Fixed {
        millis(self.tick_duration_ms)
    }

    /// Clamp an attack speed into the configured bounds.
    #[must_use]
    pub fn clamp_attack_speed(&self, speed: Fixed) -> Fixed {
        let hundred = Fixed::from_num(100);
        let min = Fixed::saturating_from_num(self.min_attack_speed_centi) / hundred;
        let max = Fixed::saturating_from_num(self.max_attack_speed_centi) / hundred;
        speed.max(min).min(max)
    }
}

/// Per-unit attack animation metadata, in animation frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationDelay {
    /// Total length of the attack animation.
    pub ticks: u32,
    /// Frame on which the hit visually connects.
    pub hit_tick: u32,
}

impl AnimationDelay {
    /// Create new animation metadata.
    #[must_use]
    pub const fn new(ticks: u32, hit_tick: u32) -> Self {
        Self { ticks, hit_tick }
    }
}

/// Animation metadata keyed by unit index.
///
/// # Example RON
///
/// ```ron
/// {
///     "0001": (ticks: 18, hit_tick: 9),
///     "0004": (ticks: 24, hit_tick: 14),
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationTable {
    entries: BTreeMap<String, AnimationDelay>,
}

impl AnimationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            source_name: "animation table".to_string(),
            message: e.to_string(),
        })
    }

    /// Add or replace the metadata for a unit index.
    pub fn insert(&mut self, index: impl Into<String>, delay: AnimationDelay) {
        self.entries.insert(index.into(), delay);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, index: impl Into<String>, delay: AnimationDelay) -> Self {
        self.insert(index, delay);
        self
    }

    /// Metadata for a unit index, if known.
    #[must_use]
    pub fn get(&self, index: &str) -> Option<AnimationDelay> {
        self.entries.get(index).copied()
    }

    /// Number of unit indices with metadata.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ArenaConfig::from_ron_str("(board_width: 10, distance_metric: Manhattan)")
            .unwrap();
        assert_eq!(config.board_width, 10);
        assert_eq!(config.board_height, 6);
        assert_eq!(config.distance_metric, DistanceMetric::Manhattan);
        assert_eq!(config.fallback_hit_delay_ms, FALLBACK_HIT_DELAY_MS);
    }

    #[test]
    fn test_out_of_range_timers_are_rejected() {
        for doc in [
            "(tick_duration_ms: 3000000000)",
            "(fallback_hit_delay_ms: 3000000000)",
            "(move_cooldown_ms: 4294967295)",
            "(min_attack_speed_centi: 300, max_attack_speed_centi: 200)",
        ] {
            let err = ArenaConfig::from_ron_str(doc).unwrap_err();
            assert!(matches!(err, GameError::ConfigParse { .. }), "{doc}");
        }
        assert!(ArenaConfig::from_ron_str("(tick_duration_ms: 2147483647)").is_ok());
    }

    #[test]
    fn test_huge_timers_saturate_instead_of_panicking() {
        let config = ArenaConfig {
            tick_duration_ms: 3_000_000_000,
            max_attack_speed_centi: u32::MAX,
            ..ArenaConfig::default()
        };
        assert_eq!(config.tick_duration(), Fixed::MAX);
        assert!(config.clamp_attack_speed(Fixed::from_num(1_000)) > Fixed::from_num(999));
    }

    #[test]
    fn test_bad_config_is_reported() {
        let err = ArenaConfig::from_ron_str("(board_width: \"wide\")").unwrap_err();
        assert!(matches!(err, GameError::ConfigParse { .. }));
    }

    #[test]
    fn test_attack_speed_clamp() {
        let config = ArenaConfig::default();
        assert_eq!(
            config.clamp_attack_speed(Fixed::ZERO),
            Fixed::from_num(40) / Fixed::from_num(100)
        );
        assert_eq!(config.clamp_attack_speed(Fixed::from_num(9)), Fixed::from_num(2.5));
        assert_eq!(config.clamp_attack_speed(Fixed::from_num(2)), Fixed::from_num(2));
    }

    #[test]
    fn test_animation_table_from_ron() {
        let table =
            AnimationTable::from_ron_str(r#"{"0001": (ticks: 18, hit_tick: 9)}"#).unwrap();
        assert_eq!(table.get("0001"), Some(AnimationDelay::new(18, 9)));
        assert_eq!(table.get("0002"), None);
        assert_eq!(table.len(), 1);
    }
}
