//! # Arena Core
//!
//! Deterministic combat decision core for a grid auto-battler.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (every roll goes through a seeded [`random::RandomSource`])
//! - No floating-point math (uses fixed-point)
//!
//! Every tick each living combatant runs its state machine: retarget, cast
//! its ability, start a basic attack, or walk toward the nearest enemy.
//! Basic attacks schedule a delayed command against the target *cell* and
//! broadcast a projectile event carrying the same delay.
//!
//! ## Crate Structure
//!
//! - [`room`] - One battle: tick loop, outcome, state hash, snapshots
//! - [`state`] - Per-combatant state machine (idle, moving, attacking, dead)
//! - [`battlefield`] - Combatant storage and spatial queries
//! - [`board`] - The grid of occupant ids
//! - [`command`] - Delayed effects that re-resolve their target cell
//! - [`abilities`] - Ability dispatch table
//! - [`timing`] - Hit delay from animation metadata
//! - [`config`] - RON configuration
//! - [`math`] - Fixed-point math and grid coordinates

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod battlefield;
pub mod board;
pub mod combatant;
pub mod command;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod math;
pub mod random;
pub mod room;
pub mod state;
pub mod status;
pub mod timing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{AbilityId, AbilityRegistry, AbilityStrategy, AbilityTarget};
    pub use crate::battlefield::Battlefield;
    pub use crate::combatant::{Combatant, CombatantSpec};
    pub use crate::command::{CommandKind, CommandOutcome};
    pub use crate::components::*;
    pub use crate::config::{AnimationDelay, AnimationTable, ArenaConfig};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventLog, EventSink, SimulationEvent};
    pub use crate::math::{Fixed, GridPos};
    pub use crate::random::{RandomSource, SeededRng};
    pub use crate::room::{MatchOutcome, Room, TickReport};
    pub use crate::state::{StateKind, TickContext, Transition, Weather};
    pub use crate::status::Status;
}
