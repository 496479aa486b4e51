//! Status effects that alter how a combatant picks and uses targets.
//!
//! Statuses live in a small fixed set with one timer per status. A status is
//! active while its timer is above zero; the shared per-tick base update
//! decays every timer by the elapsed time.
//!
//! # Precedence
//!
//! When several statuses are active at once they apply in this order:
//!
//! 1. [`Status::Confusion`] replaces target *selection*: the confused rule
//!    picks the coordinate and allegiance is ignored.
//! 2. [`Status::Charm`] then vetoes the *use* of whatever target was
//!    resolved, however it was found. A charmed unit never attacks or casts.
//! 3. [`Status::Silence`] only matters once a target is usable: it turns a
//!    would-be ability cast into a basic attack.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// A status effect that affects the attack decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    /// Targets the nearest unit of any team.
    Confusion,
    /// Never fights, even with a valid target.
    Charm,
    /// Cannot cast its ability.
    Silence,
}

impl Status {
    /// Number of distinct statuses.
    pub const COUNT: usize = 3;

    /// All statuses, in precedence order.
    pub const PRECEDENCE: [Status; Self::COUNT] =
        [Status::Confusion, Status::Charm, Status::Silence];

    const fn index(self) -> usize {
        match self {
            Status::Confusion => 0,
            Status::Charm => 1,
            Status::Silence => 2,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
struct StatusTimer {
    #[serde(with = "fixed_serde")]
    remaining: Fixed,
}

/// The set of statuses currently affecting a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSet {
    timers: [StatusTimer; Status::COUNT],
}

impl StatusSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status for `duration_ms`.
    ///
    /// Re-applying keeps whichever duration is longer.
    pub fn apply(&mut self, status: Status, duration_ms: Fixed) {
        let timer = &mut self.timers[status.index()];
        timer.remaining = timer.remaining.max(duration_ms);
    }

    /// Remove a status immediately.
    pub fn clear(&mut self, status: Status) {
        self.timers[status.index()].remaining = Fixed::ZERO;
    }

    /// Whether a status is active.
    #[must_use]
    pub fn has(&self, status: Status) -> bool {
        self.timers[status.index()].remaining > Fixed::ZERO
    }

    /// Remaining duration of a status (zero when inactive).
    #[must_use]
    pub fn remaining(&self, status: Status) -> Fixed {
        self.timers[status.index()].remaining
    }

    /// Shorthand for `has(Status::Confusion)`.
    #[must_use]
    pub fn is_confused(&self) -> bool {
        self.has(Status::Confusion)
    }

    /// Shorthand for `has(Status::Charm)`.
    #[must_use]
    pub fn is_charmed(&self) -> bool {
        self.has(Status::Charm)
    }

    /// Shorthand for `has(Status::Silence)`.
    #[must_use]
    pub fn is_silenced(&self) -> bool {
        self.has(Status::Silence)
    }

    /// Active statuses as a bitmask (bit order follows [`Status::PRECEDENCE`]).
    #[must_use]
    pub fn bits(&self) -> u8 {
        Status::PRECEDENCE
            .iter()
            .filter(|status| self.has(**status))
            .fold(0, |mask, status| mask | status.bit())
    }

    /// Advance every timer by `dt`, flooring at zero.
    pub fn decay(&mut self, dt: Fixed) {
        for timer in &mut self.timers {
            timer.remaining = (timer.remaining - dt).max(Fixed::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_expire() {
        let mut set = StatusSet::new();
        set.apply(Status::Charm, Fixed::from_num(300));
        assert!(set.is_charmed());
        assert!(!set.is_confused());

        set.decay(Fixed::from_num(200));
        assert!(set.is_charmed());
        assert_eq!(set.remaining(Status::Charm), Fixed::from_num(100));

        set.decay(Fixed::from_num(200));
        assert!(!set.is_charmed());
        assert_eq!(set.remaining(Status::Charm), Fixed::ZERO);
    }

    #[test]
    fn test_reapply_keeps_longer_duration() {
        let mut set = StatusSet::new();
        set.apply(Status::Silence, Fixed::from_num(1000));
        set.apply(Status::Silence, Fixed::from_num(200));
        assert_eq!(set.remaining(Status::Silence), Fixed::from_num(1000));
    }

    #[test]
    fn test_bits() {
        let mut set = StatusSet::new();
        assert_eq!(set.bits(), 0);
        set.apply(Status::Confusion, Fixed::from_num(10));
        set.apply(Status::Silence, Fixed::from_num(10));
        assert_eq!(set.bits(), 0b101);
        set.clear(Status::Confusion);
        assert_eq!(set.bits(), 0b100);
    }
}
