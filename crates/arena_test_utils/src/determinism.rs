//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a room produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and server-side verification need every room to be 100%
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`arena_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity ID order and scan the board row by row.
//!
//! - **System randomness**: Crits and confusion roll through a seeded
//!   ChaCha stream owned by the room.
//!
//! - **Shared state between rooms**: Rooms share only read-only tables, so
//!   running many in parallel must not change any single result.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::room::Room;
use tracing::debug;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic room).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the room was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Room is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        debug!(runs, ticks, ?hashes, "Runs ended in different states");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Advance a room by one tick inside a harness.
///
/// # Panics
///
/// Panics if the tick fails; a failing tick is a broken fixture.
pub fn advance(room: &mut Room) {
    if let Err(e) = room.tick() {
        panic!("room {} failed at tick {}: {e}", room.id(), room.get_tick());
    }
}

/// Run a room twice with identical setup and compare final hashes.
pub fn verify_room_determinism<F>(setup_fn: F, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Room,
{
    verify_determinism(2, num_ticks, &setup_fn, advance, Room::state_hash)
}

/// Run N rooms on their own threads and collect final hashes.
///
/// Each room stays on one thread from setup to final hash.
pub fn run_parallel_rooms<F>(setup_fn: F, num_rooms: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Room + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_rooms)
            .map(|_| {
                s.spawn(|| {
                    let mut room = setup_fn();
                    for _ in 0..num_ticks {
                        advance(&mut room);
                    }
                    room.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two room runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the rooms stay identical, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Room,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        debug!(room = a.id(), "Rooms differ before the first tick");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        advance(&mut a);
        advance(&mut b);

        if a.state_hash() != b.state_hash() {
            debug!(
                room = a.id(),
                tick,
                left = a.state_hash(),
                right = b.state_hash(),
                "Rooms diverged"
            );
            return Some(tick);
        }
    }

    None
}

/// Verify that a snapshot taken mid-battle resumes exactly.
///
/// Runs `num_ticks`, snapshots, restores into a fresh room, then runs both
/// for `num_ticks` more and compares.
pub fn verify_snapshot_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Room,
{
    let mut original = setup_fn();
    for _ in 0..num_ticks {
        advance(&mut original);
    }

    let bytes = match original.snapshot() {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(room = original.id(), error = %e, "Snapshot failed");
            return false;
        }
    };
    let mut restored = setup_fn();
    if let Err(e) = restored.restore(&bytes) {
        debug!(room = restored.id(), error = %e, "Restore failed");
        return false;
    }
    if restored.state_hash() != original.state_hash() {
        debug!(room = restored.id(), "Restored room hashes differently");
        return false;
    }

    for _ in 0..num_ticks {
        advance(&mut original);
        advance(&mut restored);
    }
    restored.state_hash() == original.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for arena tests.
pub mod strategies {
    use arena_core::combatant::CombatantSpec;
    use arena_core::components::Team;
    use arena_core::math::{Fixed, GridPos};
    use proptest::prelude::*;

    /// Either team.
    pub fn arb_team() -> impl Strategy<Value = Team> {
        prop_oneof![Just(Team::Blue), Just(Team::Red)]
    }

    /// A cell on a `width` × `height` board.
    pub fn arb_cell(width: i32, height: i32) -> impl Strategy<Value = GridPos> {
        (0..width, 0..height).prop_map(|(x, y)| GridPos::new(x, y))
    }

    /// Attack speed between 0.2 and 3.0 attacks per second, including
    /// values outside the default clamp.
    pub fn arb_attack_speed() -> impl Strategy<Value = Fixed> {
        (20u32..=300).prop_map(|centi| Fixed::from_num(centi) / Fixed::from_num(100))
    }

    /// Elapsed time for one step, 1 to 1000 ms.
    pub fn arb_dt() -> impl Strategy<Value = Fixed> {
        (1u32..=1000).prop_map(Fixed::from_num)
    }

    /// A unit with randomized stats on an 8 × 6 board.
    pub fn arb_unit() -> impl Strategy<Value = CombatantSpec> {
        (
            arb_team(),
            arb_cell(8, 6),
            1u32..400,
            1u32..60,
            0u32..150,
            arb_attack_speed(),
            1u32..5,
        )
            .prop_map(|(team, position, max_hp, attack, pp, attack_speed, range)| {
                CombatantSpec {
                    team,
                    position,
                    max_hp,
                    attack,
                    pp,
                    attack_speed,
                    range,
                    ..CombatantSpec::default()
                }
            })
    }

    /// Up to `max_units` units; duplicates on a cell are dropped by the caller.
    pub fn arb_roster(max_units: usize) -> impl Strategy<Value = Vec<CombatantSpec>> {
        proptest::collection::vec(arb_unit(), 1..max_units)
    }
}
