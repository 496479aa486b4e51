//! Small value types attached to combatants.
//!
//! These are pure data with no behavior beyond simple queries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Unique identifier for combatants within a room.
pub type EntityId = u64;

/// Side a combatant fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// First player's board.
    Blue,
    /// Second player's board.
    Red,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Blue => f.write_str("blue"),
            Team::Red => f.write_str("red"),
        }
    }
}

/// Held items that modify the attack decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeldItem {
    /// Lets ability casts roll for a critical hit.
    ReaperCloth,
    /// Raises critical hit chance.
    ScopeLens,
}

impl HeldItem {
    /// Whether holding this item lets abilities crit.
    #[must_use]
    pub const fn enables_ability_crit(self) -> bool {
        matches!(self, HeldItem::ReaperCloth)
    }

    /// Crit chance bonus in percentage points.
    #[must_use]
    pub const fn crit_chance_bonus(self) -> u32 {
        match self {
            HeldItem::ReaperCloth => 0,
            HeldItem::ScopeLens => 10,
        }
    }
}

/// Display tag mirrored to remote observers for animation selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ActionState {
    /// Standing still.
    #[default]
    Idle,
    /// Walking between cells.
    Walk,
    /// Attack loop.
    Attack,
    /// Knocked out.
    Dead,
}

/// Telemetry counters kept per combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CombatCounters {
    /// Basic attacks started.
    pub attack_count: u32,
    /// Abilities cast.
    pub ability_count: u32,
    /// Delayed hits that found a valid target.
    pub hits_landed: u32,
    /// Delayed hits whose cell no longer held a valid target.
    pub hits_fizzled: u32,
    /// Total damage dealt.
    pub damage_dealt: u64,
}

/// Percent value as a fixed-point probability in `[0, 1]`.
#[must_use]
pub fn percent_to_probability(percent: u32) -> Fixed {
    Fixed::from_num(percent.min(100)) / Fixed::from_num(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_crit_flags() {
        assert!(HeldItem::ReaperCloth.enables_ability_crit());
        assert!(!HeldItem::ScopeLens.enables_ability_crit());
        assert_eq!(HeldItem::ScopeLens.crit_chance_bonus(), 10);
    }

    #[test]
    fn test_percent_to_probability() {
        assert_eq!(percent_to_probability(0), Fixed::ZERO);
        assert_eq!(percent_to_probability(100), Fixed::ONE);
        assert_eq!(percent_to_probability(250), Fixed::ONE);
        assert_eq!(percent_to_probability(50), Fixed::from_num(0.5));
    }
}
