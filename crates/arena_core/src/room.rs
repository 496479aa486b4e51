//! One independent battle.
//!
//! A [`Room`] owns its battlefield, random stream and event log outright;
//! the only things it shares are the read-only animation table and ability
//! registry behind [`Arc`]s. Rooms never touch each other, so a runner can
//! hand each room to its own worker thread.
//!
//! # Tick order
//!
//! Every tick visits living combatants in ascending id order. For each one:
//!
//! 1. Its due commands execute, oldest first.
//! 2. Its current state's `update` runs, and any transition is applied.
//!
//! After every combatant has acted, units at zero hp switch to
//! [`StateKind::Dead`] and leave the board.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::abilities::AbilityRegistry;
use crate::battlefield::Battlefield;
use crate::combatant::{Combatant, CombatantSpec};
use crate::command::CommandOutcome;
use crate::components::{EntityId, Team};
use crate::config::{AnimationTable, ArenaConfig};
use crate::error::{GameError, Result};
use crate::events::{EventLog, EventSink, KnockoutEvent, SimulationEvent};
use crate::math::Fixed;
use crate::random::{RngState, SeededRng};
use crate::state::{change_state, StateKind, TickContext, Transition, Weather};

/// How a battle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// Both sides still have living units.
    InProgress,
    /// Only this side has living units left.
    Victory(Team),
    /// Nobody is left standing.
    Draw,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number after the step.
    pub tick: u64,
    /// Commands that came due, in execution order.
    pub outcomes: Vec<CommandOutcome>,
    /// Units knocked out at the end of the tick.
    pub knockouts: Vec<EntityId>,
}

#[derive(Serialize, Deserialize)]
struct RoomSnapshot {
    tick: u64,
    started: bool,
    weather: Weather,
    rng: RngState,
    field: Battlefield,
}

/// A single simulated battle.
#[derive(Debug)]
pub struct Room {
    id: String,
    tick: u64,
    started: bool,
    weather: Weather,
    config: ArenaConfig,
    animations: Arc<AnimationTable>,
    abilities: Arc<AbilityRegistry>,
    field: Battlefield,
    rng: SeededRng,
    events: EventLog,
}

impl Room {
    /// Create an empty room with the built-in abilities and no animation
    /// metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, config: ArenaConfig, seed: u64) -> Self {
        let field = Battlefield::new(&config);
        Self {
            id: id.into(),
            tick: 0,
            started: false,
            weather: Weather::Neutral,
            config,
            animations: Arc::new(AnimationTable::new()),
            abilities: Arc::new(AbilityRegistry::with_builtins()),
            field,
            rng: SeededRng::new(seed),
            events: EventLog::new(),
        }
    }

    /// Use a shared animation table.
    #[must_use]
    pub fn with_animations(mut self, animations: Arc<AnimationTable>) -> Self {
        self.animations = animations;
        self
    }

    /// Use a shared ability registry.
    #[must_use]
    pub fn with_abilities(mut self, abilities: Arc<AbilityRegistry>) -> Self {
        self.abilities = abilities;
        self
    }

    /// Set the field weather.
    #[must_use]
    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = weather;
        self
    }

    /// Room id, stamped on every outbound event.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Whether [`start`](Self::start) has run.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Current weather.
    #[must_use]
    pub const fn weather(&self) -> Weather {
        self.weather
    }

    /// Change the weather mid-battle.
    pub fn set_weather(&mut self, weather: Weather) {
        self.weather = weather;
    }

    /// Room configuration.
    #[must_use]
    pub const fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Board and combatants.
    #[must_use]
    pub const fn field(&self) -> &Battlefield {
        &self.field
    }

    /// Mutable board and combatants, for setup and tests.
    pub fn field_mut(&mut self) -> &mut Battlefield {
        &mut self.field
    }

    /// Combatant by id.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&Combatant> {
        self.field.get(id)
    }

    /// Events not yet drained.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every pending event.
    pub fn drain_events(&mut self) -> Vec<SimulationEvent> {
        self.events.drain()
    }

    /// Add a combatant.
    ///
    /// Fails when the cell is taken or off the board, or when the registry
    /// has no strategy for the unit's ability.
    pub fn spawn(&mut self, spec: CombatantSpec) -> Result<EntityId> {
        self.abilities.get(&spec.ability, self.field.units().next_id())?;
        let id = self.field.spawn(spec, &self.config)?;
        if self.started {
            if let Some(unit) = self.field.get_mut(id) {
                change_state(unit, StateKind::Moving);
            }
        }
        Ok(id)
    }

    /// Check the ability registry against every unit and send everyone
    /// into battle.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(GameError::InvalidState(format!(
                "Room {} already started",
                self.id
            )));
        }
        let ids = self.field.sorted_ids();
        self.abilities.ensure_total(
            ids.iter()
                .filter_map(|id| self.field.get(*id))
                .map(|unit| (unit.id, &unit.ability)),
        )?;
        for index in self.indices_without_animation() {
            warn!(room = %self.id, index = %index, "No attack animation metadata, hits use the fallback delay");
        }

        for id in ids {
            if let Some(unit) = self.field.get_mut(id) {
                if unit.is_alive() {
                    change_state(unit, StateKind::Moving);
                }
            }
        }
        self.started = true;
        info!(room = %self.id, units = self.field.units().len(), "Battle started");
        Ok(())
    }

    /// Unit indices on the board with no animation metadata, sorted.
    #[must_use]
    pub fn indices_without_animation(&self) -> Vec<String> {
        self.field
            .units()
            .iter_sorted()
            .filter(|unit| self.animations.get(&unit.index).is_none())
            .map(|unit| unit.index.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Advance by one configured tick.
    pub fn tick(&mut self) -> Result<TickReport> {
        let dt = self.config.tick_duration();
        self.step(dt)
    }

    /// Advance by `dt` milliseconds.
    pub fn step(&mut self, dt: Fixed) -> Result<TickReport> {
        let mut report = TickReport::default();

        let mut ctx = TickContext {
            simulation_id: &self.id,
            weather: self.weather,
            config: &self.config,
            animations: &*self.animations,
            abilities: &*self.abilities,
            rng: &mut self.rng,
            events: &mut self.events,
        };

        for id in self.field.sorted_ids() {
            let mut unit = self.field.take(id)?;
            if !unit.is_alive() {
                self.field.put_back(unit);
                continue;
            }

            for command in unit.commands.advance(dt) {
                let outcome = command.execute(&mut unit, &mut self.field, &self.config);
                report.outcomes.push(outcome);
            }

            let transition = match unit
                .state
                .handler()
                .update(&mut unit, dt, &mut self.field, &mut ctx)
            {
                Ok(transition) => transition,
                Err(e) => {
                    self.field.put_back(unit);
                    return Err(e);
                }
            };
            if let Transition::To(next) = transition {
                change_state(&mut unit, next);
            }
            self.field.put_back(unit);
        }

        report.knockouts = self.sweep_knockouts();
        self.tick += 1;
        report.tick = self.tick;

        #[cfg(feature = "debug-validation")]
        self.validate()?;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            debug!(room = %self.id, tick = self.tick, state_hash = hash, "Room state hash");
        }

        Ok(report)
    }

    fn sweep_knockouts(&mut self) -> Vec<EntityId> {
        let mut knockouts = Vec::new();
        for id in self.field.sorted_ids() {
            let Some(unit) = self.field.get_mut(id) else {
                continue;
            };
            if unit.is_alive() || unit.state == StateKind::Dead {
                continue;
            }
            change_state(unit, StateKind::Dead);
            self.field.vacate(id);
            self.events.emit(SimulationEvent::Knockout(KnockoutEvent {
                actor_id: id,
                simulation_id: self.id.clone(),
            }));
            knockouts.push(id);
        }
        knockouts
    }

    /// Advance until one side wins or `max_ticks` have run.
    pub fn run_until(&mut self, max_ticks: u64) -> Result<MatchOutcome> {
        while self.tick < max_ticks {
            if self.outcome() != MatchOutcome::InProgress {
                break;
            }
            self.tick()?;
        }
        Ok(self.outcome())
    }

    /// Current result of the battle.
    #[must_use]
    pub fn outcome(&self) -> MatchOutcome {
        let alive = |team: Team| {
            self.field
                .units()
                .iter_sorted()
                .any(|unit| unit.team == team && unit.is_alive())
        };
        match (alive(Team::Blue), alive(Team::Red)) {
            (true, true) => MatchOutcome::InProgress,
            (true, false) => MatchOutcome::Victory(Team::Blue),
            (false, true) => MatchOutcome::Victory(Team::Red),
            (false, false) => MatchOutcome::Draw,
        }
    }

    /// Hash of everything that influences future ticks.
    ///
    /// Two rooms with the same hash will produce the same battle.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.weather.hash(&mut hasher);

        let ids = self.field.sorted_ids();
        ids.len().hash(&mut hasher);

        for id in ids {
            if let Some(unit) = self.field.get(id) {
                id.hash(&mut hasher);
                unit.position.hash(&mut hasher);
                unit.target.hash(&mut hasher);
                unit.hp.hash(&mut hasher);
                unit.pp().hash(&mut hasher);
                unit.cooldown.to_bits().hash(&mut hasher);
                unit.attack_speed().to_bits().hash(&mut hasher);
                unit.state.hash(&mut hasher);
                unit.action.hash(&mut hasher);
                unit.status.bits().hash(&mut hasher);
                unit.targetable.hash(&mut hasher);
                unit.counters.hash(&mut hasher);

                unit.commands.len().hash(&mut hasher);
                for command in unit.commands.iter() {
                    command.remaining.to_bits().hash(&mut hasher);
                    command.kind.hash(&mut hasher);
                }
            }
        }

        hasher.finish()
    }

    /// Serialize the battle state.
    ///
    /// The animation table, ability registry, configuration and event log
    /// are not included; restore into a room built with the same ones.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let snapshot = RoomSnapshot {
            tick: self.tick,
            started: self.started,
            weather: self.weather,
            rng: self.rng.state(),
            field: self.field.clone(),
        };
        bincode::serialize(&snapshot)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize room: {e}")))
    }

    /// Replace the battle state with one taken by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, data: &[u8]) -> Result<()> {
        let snapshot: RoomSnapshot = bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize room: {e}")))?;
        self.tick = snapshot.tick;
        self.started = snapshot.started;
        self.weather = snapshot.weather;
        self.rng = SeededRng::from_state(snapshot.rng);
        self.field = snapshot.field;
        debug!(room = %self.id, tick = self.tick, "Room restored");
        Ok(())
    }

    /// Check that the board and unit storage agree.
    #[cfg(feature = "debug-validation")]
    fn validate(&self) -> Result<()> {
        for unit in self.field.units().iter_sorted() {
            let on_board = self.field.board().get(unit.position) == Some(unit.id);
            if unit.is_alive() != on_board {
                return Err(GameError::InvalidState(format!(
                    "Unit {} at {} disagrees with the board",
                    unit.id, unit.position
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::AbilityId;
    use crate::config::AnimationDelay;
    use crate::math::GridPos;

    fn spec(team: Team, x: i32, y: i32) -> CombatantSpec {
        CombatantSpec {
            team,
            position: GridPos::new(x, y),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_moves_everyone_out_of_idle() {
        let mut room = Room::new("r", ArenaConfig::default(), 1);
        let a = room.spawn(spec(Team::Blue, 0, 0)).unwrap();
        let b = room.spawn(spec(Team::Red, 5, 0)).unwrap();
        assert_eq!(room.unit(a).unwrap().state, StateKind::Idle);
        room.start().unwrap();
        assert_eq!(room.unit(a).unwrap().state, StateKind::Moving);
        assert_eq!(room.unit(b).unwrap().state, StateKind::Moving);
        assert!(room.start().is_err());
    }

    #[test]
    fn test_missing_animation_indices_are_listed_once() {
        let mut table = AnimationTable::new();
        table.insert("0001", AnimationDelay::new(10, 10));
        let mut room = Room::new("r", ArenaConfig::default(), 1).with_animations(Arc::new(table));
        for (x, index) in [(0, "0001"), (2, "0002"), (4, "0002"), (6, "0000")] {
            room.spawn(CombatantSpec {
                index: index.to_string(),
                ..spec(Team::Blue, x, 0)
            })
            .unwrap();
        }
        assert_eq!(room.indices_without_animation(), vec!["0000", "0002"]);
        room.start().unwrap();
    }

    #[test]
    fn test_spawn_rejects_unknown_ability() {
        let mut room = Room::new("r", ArenaConfig::default(), 1);
        let err = room
            .spawn(CombatantSpec {
                ability: AbilityId::new("nope"),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, GameError::UnknownAbility { .. }));
    }

    #[test]
    fn test_start_validates_swapped_registry() {
        let mut room = Room::new("r", ArenaConfig::default(), 1);
        room.spawn(spec(Team::Blue, 0, 0)).unwrap();
        let mut room = room.with_abilities(Arc::new(AbilityRegistry::new()));
        assert!(matches!(
            room.start(),
            Err(GameError::UnknownAbility { .. })
        ));
    }

    #[test]
    fn test_outcome() {
        let mut room = Room::new("r", ArenaConfig::default(), 1);
        assert_eq!(room.outcome(), MatchOutcome::Draw);
        room.spawn(spec(Team::Blue, 0, 0)).unwrap();
        assert_eq!(room.outcome(), MatchOutcome::Victory(Team::Blue));
        room.spawn(spec(Team::Red, 3, 0)).unwrap();
        assert_eq!(room.outcome(), MatchOutcome::InProgress);
    }

    #[test]
    fn test_tick_counts_up() {
        let mut room = Room::new("r", ArenaConfig::default(), 1);
        room.spawn(spec(Team::Blue, 0, 0)).unwrap();
        let report = room.tick().unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(room.get_tick(), 1);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_hash() {
        let mut room = Room::new("r", ArenaConfig::default(), 9);
        room.spawn(spec(Team::Blue, 0, 0)).unwrap();
        room.spawn(spec(Team::Red, 4, 3)).unwrap();
        room.start().unwrap();
        for _ in 0..10 {
            room.tick().unwrap();
        }
        let bytes = room.snapshot().unwrap();
        let hash = room.state_hash();

        let mut restored = Room::new("r", ArenaConfig::default(), 0);
        restored.restore(&bytes).unwrap();
        assert_eq!(restored.state_hash(), hash);

        for _ in 0..20 {
            room.tick().unwrap();
            restored.tick().unwrap();
        }
        assert_eq!(restored.state_hash(), room.state_hash());
    }
}
