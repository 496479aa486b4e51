//! Scenario loading and configuration.
//!
//! A scenario is the complete initial state of a battle: board settings,
//! animation metadata, weather and a roster of unit placements. Scenarios
//! are written in RON and turned into a started [`Room`] per seed.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "duel",
//!     config: (board_width: 4, board_height: 4),
//!     units: [
//!         (team: Blue, x: 0, y: 0, attack: 20),
//!         (team: Red, x: 3, y: 3, attack_speed_centi: 150, items: [ScopeLens]),
//!     ],
//! )
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use arena_core::abilities::AbilityId;
use arena_core::combatant::CombatantSpec;
use arena_core::components::{HeldItem, Team};
use arena_core::config::{AnimationDelay, AnimationTable, ArenaConfig};
use arena_core::error::GameError;
use arena_core::math::{Fixed, GridPos};
use arena_core::room::Room;
use arena_core::state::Weather;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the built-in scenario used when none is given.
pub const DEFAULT_SCENARIO: &str = "skirmish_3v3";

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found and no built-in scenario has that name.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The room rejected the scenario or failed mid-battle.
    #[error("Simulation error: {0}")]
    Game(#[from] GameError),
}

/// One unit on the starting board.
///
/// Attack speed is authored in hundredths of an attack per second so the
/// file never carries floats into the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitPlacement {
    /// Side.
    pub team: Team,
    /// Starting column.
    pub x: i32,
    /// Starting row.
    pub y: i32,
    /// Unit index for animation lookup.
    pub index: String,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Basic attack damage.
    pub attack: u32,
    /// Starting PP.
    pub pp: u32,
    /// PP needed to cast.
    pub max_pp: u32,
    /// Attacks per second × 100.
    pub attack_speed_centi: u32,
    /// Crit chance in percent.
    pub crit_chance: u32,
    /// Attack range in cells.
    pub range: u32,
    /// Sight range in cells.
    pub sight_range: u32,
    /// Ability id.
    pub ability: String,
    /// Held items.
    pub items: Vec<HeldItem>,
}

impl Default for UnitPlacement {
    fn default() -> Self {
        let spec = CombatantSpec::default();
        Self {
            team: spec.team,
            x: spec.position.x,
            y: spec.position.y,
            index: spec.index,
            max_hp: spec.max_hp,
            attack: spec.attack,
            pp: spec.pp,
            max_pp: spec.max_pp,
            attack_speed_centi: 100,
            crit_chance: spec.crit_chance,
            range: spec.range,
            sight_range: spec.sight_range,
            ability: spec.ability.as_str().to_string(),
            items: Vec::new(),
        }
    }
}

impl UnitPlacement {
    /// A default unit of `team` on `(x, y)`.
    #[must_use]
    pub fn at(team: Team, x: i32, y: i32) -> Self {
        Self {
            team,
            x,
            y,
            ..Self::default()
        }
    }

    /// Convert into the core spawn parameters.
    #[must_use]
    pub fn to_spec(&self) -> CombatantSpec {
        CombatantSpec {
            index: self.index.clone(),
            team: self.team,
            position: GridPos::new(self.x, self.y),
            max_hp: self.max_hp,
            attack: self.attack,
            pp: self.pp,
            max_pp: self.max_pp,
            attack_speed: Fixed::saturating_from_num(self.attack_speed_centi) / Fixed::from_num(100),
            crit_chance: self.crit_chance,
            range: self.range,
            sight_range: self.sight_range,
            ability: AbilityId::new(self.ability.as_str()),
            items: self.items.iter().copied().collect::<BTreeSet<_>>(),
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Board and timing settings.
    pub config: ArenaConfig,
    /// Attack animation metadata by unit index.
    pub animations: AnimationTable,
    /// Field weather.
    pub weather: Weather,
    /// Starting roster.
    pub units: Vec<UnitPlacement>,
    /// Default seed for single runs and the first game of a batch.
    pub seed: u64,
    /// Ticks before a battle is called unfinished.
    pub tick_limit: u64,
    /// Default number of rooms in a batch.
    pub room_count: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "empty".to_string(),
            description: String::new(),
            config: ArenaConfig::default(),
            animations: AnimationTable::new(),
            weather: Weather::Neutral,
            units: Vec::new(),
            seed: 0,
            tick_limit: 6_000,
            room_count: 100,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a scenario from RON text.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "skirmish_3v3" => Some(Self::skirmish_3v3()),
            "duel" => Some(Self::duel()),
            _ => None,
        }
    }

    /// Resolve a scenario argument: an existing file path first, then a
    /// built-in name.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        let path = Path::new(name_or_path);
        if path.exists() {
            return Self::load(path);
        }
        Self::builtin(name_or_path)
            .ok_or_else(|| ScenarioError::FileNotFound(name_or_path.to_string()))
    }

    /// Three units a side across the default board.
    #[must_use]
    pub fn skirmish_3v3() -> Self {
        let mut units = vec![
            UnitPlacement {
                attack: 18,
                ..UnitPlacement::at(Team::Blue, 0, 1)
            },
            UnitPlacement {
                attack: 12,
                range: 3,
                attack_speed_centi: 140,
                index: "0004".to_string(),
                ..UnitPlacement::at(Team::Blue, 0, 3)
            },
            UnitPlacement {
                max_hp: 160,
                ability: "recover".to_string(),
                ..UnitPlacement::at(Team::Blue, 1, 2)
            },
            UnitPlacement {
                attack: 18,
                ..UnitPlacement::at(Team::Red, 7, 4)
            },
            UnitPlacement {
                attack: 12,
                range: 3,
                attack_speed_centi: 140,
                index: "0004".to_string(),
                items: vec![HeldItem::ReaperCloth],
                ..UnitPlacement::at(Team::Red, 7, 2)
            },
            UnitPlacement {
                max_hp: 160,
                ability: "recover".to_string(),
                ..UnitPlacement::at(Team::Red, 6, 3)
            },
        ];
        for unit in &mut units {
            unit.max_pp = 60;
        }
        Self {
            name: "skirmish_3v3".to_string(),
            description: "Mirrored three-a-side skirmish on the default board".to_string(),
            animations: AnimationTable::new()
                .with("0000", AnimationDelay::new(18, 9))
                .with("0004", AnimationDelay::new(24, 14)),
            units,
            ..Self::default()
        }
    }

    /// Two identical units in opposite corners.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_string(),
            description: "One unit a side, opposite corners".to_string(),
            units: vec![
                UnitPlacement::at(Team::Blue, 0, 0),
                UnitPlacement::at(Team::Red, 7, 5),
            ],
            tick_limit: 3_000,
            ..Self::default()
        }
    }

    /// Build and start a room for `seed`, sharing `animations`.
    pub fn build_room_with(
        &self,
        room_id: impl Into<String>,
        seed: u64,
        animations: Arc<AnimationTable>,
    ) -> Result<Room, ScenarioError> {
        let mut room = Room::new(room_id, self.config.clone(), seed)
            .with_animations(animations)
            .with_weather(self.weather);
        for unit in &self.units {
            room.spawn(unit.to_spec())?;
        }
        room.start()?;
        Ok(room)
    }

    /// Build and start a room for `seed`.
    pub fn build_room(&self, room_id: impl Into<String>, seed: u64) -> Result<Room, ScenarioError> {
        self.build_room_with(room_id, seed, Arc::new(self.animations.clone()))
    }
}
