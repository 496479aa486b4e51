//! Random source used by combat decisions.
//!
//! Decisions only ever ask two questions of randomness: "did this roll
//! succeed" and "which of these equally good candidates". Keeping the
//! surface that small makes it easy to script in tests.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Source of random decisions.
pub trait RandomSource {
    /// Return `true` with probability `p`.
    ///
    /// `p <= 0` is always `false` and `p >= 1` is always `true`.
    fn chance(&mut self, p: Fixed) -> bool;

    /// Pick an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Seeded, reproducible random source.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
}

/// Serializable position of a [`SeededRng`] stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    /// Original seed.
    pub seed: [u8; 32],
    /// Word position within the stream.
    pub word_pos: u128,
}

impl SeededRng {
    /// Create a generator from a numeric seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Capture the stream position.
    #[must_use]
    pub fn state(&self) -> RngState {
        RngState {
            seed: self.rng.get_seed(),
            word_pos: self.rng.get_word_pos(),
        }
    }

    /// Resume a stream captured with [`state`](Self::state).
    #[must_use]
    pub fn from_state(state: RngState) -> Self {
        let mut rng = ChaCha8Rng::from_seed(state.seed);
        rng.set_word_pos(state.word_pos);
        Self { rng }
    }
}

impl RandomSource for SeededRng {
    fn chance(&mut self, p: Fixed) -> bool {
        if p <= Fixed::ZERO {
            return false;
        }
        if p >= Fixed::ONE {
            return true;
        }
        // A uniform u32 is exactly the fractional bits of a value in [0, 1).
        let roll = Fixed::from_bits(i64::from(self.rng.gen::<u32>()));
        roll < p
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chance_bounds() {
        let mut rng = SeededRng::new(7);
        for _ in 0..100 {
            assert!(!rng.chance(Fixed::ZERO));
            assert!(!rng.chance(Fixed::from_num(-1)));
            assert!(rng.chance(Fixed::ONE));
            assert!(rng.chance(Fixed::from_num(3)));
        }
    }

    #[test]
    fn test_chance_frequency() {
        let mut rng = SeededRng::new(42);
        let p = Fixed::from_num(0.3);
        let hits = (0..10_000).filter(|_| rng.chance(p)).count();
        assert!((2_700..3_300).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SeededRng::new(99);
        let mut b = SeededRng::new(99);
        for _ in 0..50 {
            assert_eq!(a.pick(17), b.pick(17));
        }
    }

    #[test]
    fn test_state_resumes_stream() {
        let mut rng = SeededRng::new(5);
        rng.pick(10);
        rng.chance(Fixed::from_num(0.5));
        let mut resumed = SeededRng::from_state(rng.state());
        for _ in 0..20 {
            assert_eq!(rng.pick(1000), resumed.pick(1000));
        }
    }

    #[test]
    fn test_pick_single_candidate() {
        let mut rng = SeededRng::new(0);
        assert_eq!(rng.pick(1), 0);
    }
}
