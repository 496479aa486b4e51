//! Fixed-point math and grid geometry for deterministic simulation.
//!
//! Timers, attack speeds and delays are fixed-point so that every room
//! produces bit-identical results on every platform. Board coordinates are
//! plain integers.

use std::fmt;

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Millisecond timers stay far inside the integer range.
pub type Fixed = I32F32;

/// Milliseconds in one second, as a fixed-point constant.
pub const MS_PER_SECOND: Fixed = Fixed::from_bits(1000_i64 << 32);

/// Largest millisecond value a [`Fixed`] timer can hold exactly.
pub const MAX_MILLIS: u32 = i32::MAX as u32;

/// Build a fixed-point millisecond value from an integer.
///
/// Values above [`MAX_MILLIS`] saturate at [`Fixed::MAX`].
#[must_use]
pub fn millis(ms: u32) -> Fixed {
    Fixed::saturating_from_num(ms)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// A discrete board coordinate.
///
/// `(-1, -1)` is the "no target" sentinel used by target memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridPos {
    /// Sentinel meaning "no remembered target".
    pub const NONE: Self = Self { x: -1, y: -1 };

    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether this is the "no target" sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.x == Self::NONE.x && self.y == Self::NONE.y
    }
}

impl Default for GridPos {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Distance metric used for range, sight and "nearest" comparisons.
///
/// The metric is a board-wide configuration constant: every range check and
/// every nearest-target query in a room uses the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// `max(|dx|, |dy|)` - diagonal neighbours are one step away.
    #[default]
    Chebyshev,
    /// `|dx| + |dy|` - only orthogonal neighbours are one step away.
    Manhattan,
}

impl DistanceMetric {
    /// Distance between two cells under this metric.
    #[must_use]
    pub fn distance(self, a: GridPos, b: GridPos) -> u32 {
        let dx = a.x.abs_diff(b.x);
        let dy = a.y.abs_diff(b.y);
        match self {
            Self::Chebyshev => dx.max(dy),
            Self::Manhattan => dx.saturating_add(dy),
        }
    }

    /// Offsets of the cells one step away, in the order movement tries them.
    #[must_use]
    pub fn step_offsets(self) -> &'static [(i32, i32)] {
        const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
        const ALL: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        match self {
            Self::Chebyshev => &ALL,
            Self::Manhattan => &ORTHOGONAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev_distance() {
        let a = GridPos::new(0, 0);
        assert_eq!(DistanceMetric::Chebyshev.distance(a, GridPos::new(3, 1)), 3);
        assert_eq!(DistanceMetric::Chebyshev.distance(a, GridPos::new(2, 2)), 2);
        assert_eq!(DistanceMetric::Chebyshev.distance(a, a), 0);
    }

    #[test]
    fn test_manhattan_distance() {
        let a = GridPos::new(1, 1);
        assert_eq!(DistanceMetric::Manhattan.distance(a, GridPos::new(3, 2)), 3);
        assert_eq!(DistanceMetric::Manhattan.distance(a, GridPos::new(-1, -1)), 4);
    }

    #[test]
    fn test_sentinel() {
        assert!(GridPos::NONE.is_none());
        assert!(GridPos::default().is_none());
        assert!(!GridPos::new(0, 0).is_none());
    }

    #[test]
    fn test_step_offsets_are_one_step() {
        for metric in [DistanceMetric::Chebyshev, DistanceMetric::Manhattan] {
            let origin = GridPos::new(5, 5);
            for &(dx, dy) in metric.step_offsets() {
                let next = GridPos::new(origin.x + dx, origin.y + dy);
                assert_eq!(metric.distance(origin, next), 1);
            }
        }
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = MS_PER_SECOND / Fixed::from_num(3);
        let b = millis(1000) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_millis_saturates_past_the_integer_range() {
        assert_eq!(millis(MAX_MILLIS), Fixed::from_num(i32::MAX));
        assert_eq!(millis(3_000_000_000), Fixed::MAX);
        assert_eq!(millis(u32::MAX), Fixed::MAX);
    }
}
