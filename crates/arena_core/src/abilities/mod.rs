//! Ability dispatch.
//!
//! Every combatant names its special ability by [`AbilityId`]. The
//! [`AbilityRegistry`] maps those ids to [`AbilityStrategy`] trait objects;
//! the attacking state looks the strategy up and hands over control when a
//! unit's PP pool is full.
//!
//! A room checks that the registry covers every spawned unit before the
//! first tick, so a miss during a tick means the registry changed under a
//! running room and is reported as an error.

mod builtin;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use builtin::{Burst, Recover};

use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::events::{AbilityCastEvent, SimulationEvent};
use crate::math::GridPos;
use crate::state::{AttackingState, TickContext};

/// Name of a special ability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(String);

impl AbilityId {
    /// Create an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AbilityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The unit an ability was cast at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbilityTarget {
    /// Target unit.
    pub id: EntityId,
    /// Cell it stood on when the cast started.
    pub position: GridPos,
}

/// Executes one special ability.
///
/// Implementations decide everything about the cast: immediate effects,
/// delayed commands pushed onto the caster's queue, extra events. They
/// should finish with [`finish_cast`] so PP and telemetry stay consistent.
pub trait AbilityStrategy: Send + Sync {
    /// Run the ability.
    ///
    /// `caster` is out of `field` while this runs; `target` is resolved and
    /// usable, and `crit` has already been rolled.
    fn process(
        &self,
        caster: &mut Combatant,
        state: &AttackingState,
        field: &mut Battlefield,
        target: AbilityTarget,
        crit: bool,
        ctx: &mut TickContext<'_>,
    ) -> Result<()>;
}

/// Bookkeeping every cast ends with: empty the PP pool, count the cast and
/// broadcast it.
pub fn finish_cast(
    caster: &mut Combatant,
    target: AbilityTarget,
    crit: bool,
    ctx: &mut TickContext<'_>,
) {
    caster.set_pp(0);
    caster.counters.ability_count += 1;
    ctx.events
        .emit(SimulationEvent::AbilityCast(AbilityCastEvent {
            actor_id: caster.id,
            simulation_id: ctx.simulation_id.to_string(),
            ability: caster.ability.clone(),
            target_x: target.position.x,
            target_y: target.position.y,
            crit,
        }));
    debug!(
        unit = caster.id,
        ability = %caster.ability,
        target = target.id,
        crit,
        "Ability cast"
    );
}

/// Ability id to strategy table.
#[derive(Default)]
pub struct AbilityRegistry {
    strategies: HashMap<AbilityId, Box<dyn AbilityStrategy>>,
}

impl AbilityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the reference strategies
    /// (`"strike"` → [`Burst`], `"recover"` → [`Recover`]).
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .with(AbilityId::new(Burst::ID), Burst)
            .with(AbilityId::new(Recover::ID), Recover)
    }

    /// Register or replace a strategy.
    pub fn register(&mut self, id: AbilityId, strategy: impl AbilityStrategy + 'static) {
        self.strategies.insert(id, Box::new(strategy));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, id: AbilityId, strategy: impl AbilityStrategy + 'static) -> Self {
        self.register(id, strategy);
        self
    }

    /// Whether a strategy is registered for `id`.
    #[must_use]
    pub fn contains(&self, id: &AbilityId) -> bool {
        self.strategies.contains_key(id)
    }

    /// Strategy for `id`, cast by `unit`.
    pub fn get(&self, id: &AbilityId, unit: EntityId) -> Result<&dyn AbilityStrategy> {
        self.strategies
            .get(id)
            .map(Box::as_ref)
            .ok_or_else(|| GameError::UnknownAbility {
                ability: id.clone(),
                unit,
            })
    }

    /// Check that every `(unit, ability)` pair has a strategy.
    pub fn ensure_total<'a>(
        &self,
        abilities: impl IntoIterator<Item = (EntityId, &'a AbilityId)>,
    ) -> Result<()> {
        for (unit, id) in abilities {
            self.get(id, unit)?;
        }
        Ok(())
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&AbilityId> {
        let mut ids: Vec<_> = self.strategies.keys().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for AbilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
