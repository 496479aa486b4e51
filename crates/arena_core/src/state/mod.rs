//! Per-combatant finite state machine.
//!
//! Every combatant is in exactly one [`StateKind`]. Each kind is bound to a
//! stateless handler implementing [`CombatantState`]; all per-unit data
//! lives on the [`Combatant`] itself, so handlers are plain statics.
//!
//! # Transitions
//!
//! `update` returns a [`Transition`]. The room applies it with
//! [`change_state`], which runs the old state's `on_exit` to completion
//! before the new state's `on_enter`. Staying in the same state is not a
//! transition and never re-enters.

mod attacking;
mod dead;
mod idle;
mod moving;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use attacking::AttackingState;
pub use dead::DeadState;
pub use idle::IdleState;
pub use moving::MovingState;

use crate::abilities::AbilityRegistry;
use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::config::{AnimationTable, ArenaConfig};
use crate::error::Result;
use crate::events::EventSink;
use crate::math::Fixed;
use crate::random::RandomSource;

/// The closed set of combatant states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StateKind {
    /// Waiting for the battle to start.
    #[default]
    Idle,
    /// Closing in on an enemy.
    Moving,
    /// Attack loop.
    Attacking,
    /// Knocked out.
    Dead,
}

impl StateKind {
    /// Handler bound to this state.
    #[must_use]
    pub fn handler(self) -> &'static dyn CombatantState {
        static IDLE: IdleState = IdleState;
        static MOVING: MovingState = MovingState;
        static ATTACKING: AttackingState = AttackingState;
        static DEAD: DeadState = DeadState;
        match self {
            StateKind::Idle => &IDLE,
            StateKind::Moving => &MOVING,
            StateKind::Attacking => &ATTACKING,
            StateKind::Dead => &DEAD,
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Idle => "idle",
            StateKind::Moving => "moving",
            StateKind::Attacking => "attacking",
            StateKind::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// What the room should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Keep the current state.
    Stay,
    /// Switch to another state.
    To(StateKind),
}

/// Field conditions that abilities may react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weather {
    /// No weather.
    #[default]
    Neutral,
    /// Harsh sunlight.
    Sun,
    /// Rain.
    Rain,
}

/// Everything a state update may read or emit besides the unit and the
/// battlefield.
///
/// Built fresh by the room for every tick; nothing here outlives it.
pub struct TickContext<'a> {
    /// Room id stamped on outbound events.
    pub simulation_id: &'a str,
    /// Current field weather.
    pub weather: Weather,
    /// Room configuration.
    pub config: &'a ArenaConfig,
    /// Attack animation metadata.
    pub animations: &'a AnimationTable,
    /// Ability dispatch table.
    pub abilities: &'a AbilityRegistry,
    /// Random source for crits and confusion.
    pub rng: &'a mut dyn RandomSource,
    /// Broadcast sink.
    pub events: &'a mut dyn EventSink,
}

/// Three-method contract every state implements.
pub trait CombatantState: Sync {
    /// Called once when the unit enters this state.
    fn on_enter(&self, _unit: &mut Combatant) {}

    /// Called every tick while the unit is in this state.
    ///
    /// Implementations start with [`base_update`].
    fn update(
        &self,
        unit: &mut Combatant,
        dt: Fixed,
        field: &mut Battlefield,
        ctx: &mut TickContext<'_>,
    ) -> Result<Transition>;

    /// Called once when the unit leaves this state.
    fn on_exit(&self, _unit: &mut Combatant) {}
}

/// Per-tick behaviour shared by every living state.
pub fn base_update(unit: &mut Combatant, dt: Fixed) {
    unit.status.decay(dt);
}

/// Move `unit` into `next`, running exit and enter hooks.
///
/// A no-op when the unit is already in `next`.
pub fn change_state(unit: &mut Combatant, next: StateKind) {
    let from = unit.state;
    if from == next {
        return;
    }
    from.handler().on_exit(unit);
    unit.state = next;
    next.handler().on_enter(unit);
    debug!(unit = unit.id, %from, to = %next, "State transition");
}
