//! Test fixtures and helpers.
//!
//! Unit specs, randomness you can script, an ability that records its calls,
//! and [`TestWorld`]: a battlefield plus everything a state update needs,
//! without the room's tick loop in the way.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use arena_core::abilities::{finish_cast, AbilityId, AbilityRegistry, AbilityStrategy, AbilityTarget};
use arena_core::battlefield::Battlefield;
use arena_core::combatant::{Combatant, CombatantSpec};
use arena_core::command::CommandOutcome;
use arena_core::components::{EntityId, Team};
use arena_core::config::{AnimationTable, ArenaConfig};
use arena_core::error::Result;
use arena_core::events::SimulationEvent;
use arena_core::math::{Fixed, GridPos};
use arena_core::random::{RandomSource, SeededRng};
use arena_core::state::{change_state, AttackingState, StateKind, TickContext, Transition, Weather};
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A default unit of `team` standing on `(x, y)`.
#[must_use]
pub fn unit_at(team: Team, x: i32, y: i32) -> CombatantSpec {
    CombatantSpec {
        team,
        position: GridPos::new(x, y),
        ..CombatantSpec::default()
    }
}

/// Randomness that replays a script.
///
/// Unscripted `chance` calls return `false` and unscripted `pick` calls
/// return `0`. Every call is counted either way.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRng {
    chances: VecDeque<bool>,
    picks: VecDeque<usize>,
    /// Number of `chance` calls so far.
    pub chance_calls: usize,
    /// Probabilities passed to `chance`, in call order.
    pub probabilities: Vec<Fixed>,
    /// Number of `pick` calls so far.
    pub pick_calls: usize,
}

impl ScriptedRng {
    /// An empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue answers for `chance`.
    #[must_use]
    pub fn with_chances(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.chances.extend(answers);
        self
    }

    /// Queue answers for `pick`.
    #[must_use]
    pub fn with_picks(mut self, answers: impl IntoIterator<Item = usize>) -> Self {
        self.picks.extend(answers);
        self
    }
}

impl RandomSource for ScriptedRng {
    fn chance(&mut self, p: Fixed) -> bool {
        self.chance_calls += 1;
        self.probabilities.push(p);
        self.chances.pop_front().unwrap_or(false)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.pick_calls += 1;
        self.picks.pop_front().unwrap_or(0).min(len.saturating_sub(1))
    }
}

/// A seeded generator that counts how often it was consulted.
#[derive(Debug, Clone)]
pub struct CountingRng {
    inner: SeededRng,
    /// Number of `chance` calls so far.
    pub chance_calls: usize,
    /// Number of `chance` calls that returned `true`.
    pub chance_hits: usize,
}

impl CountingRng {
    /// Wrap a seeded generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SeededRng::new(seed),
            chance_calls: 0,
            chance_hits: 0,
        }
    }
}

impl RandomSource for CountingRng {
    fn chance(&mut self, p: Fixed) -> bool {
        self.chance_calls += 1;
        let hit = self.inner.chance(p);
        if hit {
            self.chance_hits += 1;
        }
        hit
    }

    fn pick(&mut self, len: usize) -> usize {
        self.inner.pick(len)
    }
}

/// One recorded ability dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastRecord {
    /// Caster.
    pub caster: EntityId,
    /// Target handed to the strategy.
    pub target: AbilityTarget,
    /// Crit flag handed to the strategy.
    pub crit: bool,
}

/// Ability strategy that only records its calls and does the standard
/// end-of-cast bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingAbility {
    calls: Arc<Mutex<Vec<CastRecord>>>,
}

impl RecordingAbility {
    /// Registry id used by [`TestWorld`].
    pub const ID: &'static str = "recorded";

    /// A new recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls so far.
    ///
    /// # Panics
    ///
    /// Panics if a recording thread panicked while holding the lock.
    #[must_use]
    pub fn calls(&self) -> Vec<CastRecord> {
        self.calls.lock().expect("recording lock poisoned").clone()
    }
}

impl AbilityStrategy for RecordingAbility {
    fn process(
        &self,
        caster: &mut Combatant,
        _state: &AttackingState,
        _field: &mut Battlefield,
        target: AbilityTarget,
        crit: bool,
        ctx: &mut TickContext<'_>,
    ) -> Result<()> {
        self.calls
            .lock()
            .expect("recording lock poisoned")
            .push(CastRecord {
                caster: caster.id,
                target,
                crit,
            });
        finish_cast(caster, target, crit, ctx);
        Ok(())
    }
}

/// A battlefield plus everything a state update reads, driven one unit
/// at a time.
pub struct TestWorld<R: RandomSource = SeededRng> {
    /// Room id stamped on events.
    pub simulation_id: String,
    /// Configuration.
    pub config: ArenaConfig,
    /// Animation metadata.
    pub animations: AnimationTable,
    /// Ability registry. Includes the built-ins and [`RecordingAbility`].
    pub abilities: AbilityRegistry,
    /// The recorder registered under [`RecordingAbility::ID`].
    pub recorder: RecordingAbility,
    /// Board and units.
    pub field: Battlefield,
    /// Random source.
    pub rng: R,
    /// Every emitted event.
    pub events: Vec<SimulationEvent>,
    /// Weather handed to updates.
    pub weather: Weather,
}

impl TestWorld<SeededRng> {
    /// A world on the default board with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SeededRng::new(seed))
    }
}

impl<R: RandomSource> TestWorld<R> {
    /// A world on the default board using `rng`.
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self::with_config(ArenaConfig::default(), rng)
    }

    /// A world with a custom configuration.
    #[must_use]
    pub fn with_config(config: ArenaConfig, rng: R) -> Self {
        let recorder = RecordingAbility::new();
        let abilities = AbilityRegistry::with_builtins()
            .with(AbilityId::new(RecordingAbility::ID), recorder.clone());
        Self {
            simulation_id: "test-room".to_string(),
            field: Battlefield::new(&config),
            config,
            animations: AnimationTable::new(),
            abilities,
            recorder,
            rng,
            events: Vec::new(),
            weather: Weather::Neutral,
        }
    }

    /// Spawn a unit.
    ///
    /// # Panics
    ///
    /// Panics if the cell is taken or off the board.
    pub fn spawn(&mut self, spec: CombatantSpec) -> EntityId {
        self.field
            .spawn(spec, &self.config)
            .expect("fixture spawn failed")
    }

    /// Spawn a unit straight into the attacking state.
    pub fn spawn_attacker(&mut self, spec: CombatantSpec) -> EntityId {
        let id = self.spawn(spec);
        self.enter(id, StateKind::Attacking);
        id
    }

    /// Run a state transition on a unit.
    ///
    /// # Panics
    ///
    /// Panics if the unit does not exist.
    pub fn enter(&mut self, id: EntityId, state: StateKind) {
        let unit = self.field.get_mut(id).expect("unknown unit");
        change_state(unit, state);
    }

    /// A unit.
    ///
    /// # Panics
    ///
    /// Panics if the unit does not exist.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> &Combatant {
        self.field.get(id).expect("unknown unit")
    }

    /// A unit, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the unit does not exist.
    pub fn unit_mut(&mut self, id: EntityId) -> &mut Combatant {
        self.field.get_mut(id).expect("unknown unit")
    }

    /// Run one state update for `id` without applying the transition.
    ///
    /// # Panics
    ///
    /// Panics if the unit does not exist.
    pub fn update(&mut self, id: EntityId, dt: Fixed) -> Result<Transition> {
        let mut unit = self.field.take(id).expect("unknown unit");
        let mut ctx = TickContext {
            simulation_id: &self.simulation_id,
            weather: self.weather,
            config: &self.config,
            animations: &self.animations,
            abilities: &self.abilities,
            rng: &mut self.rng,
            events: &mut self.events,
        };
        let result = unit
            .state
            .handler()
            .update(&mut unit, dt, &mut self.field, &mut ctx);
        self.field.put_back(unit);
        result
    }

    /// Run one state update and apply its transition.
    pub fn update_and_apply(&mut self, id: EntityId, dt: Fixed) -> Result<Transition> {
        let transition = self.update(id, dt)?;
        if let Transition::To(next) = transition {
            self.enter(id, next);
        }
        Ok(transition)
    }

    /// Age `id`'s command queue by `dt` and execute whatever came due.
    ///
    /// # Panics
    ///
    /// Panics if the unit does not exist.
    pub fn run_commands(&mut self, id: EntityId, dt: Fixed) -> Vec<CommandOutcome> {
        let mut unit = self.field.take(id).expect("unknown unit");
        let outcomes = unit
            .commands
            .advance(dt)
            .into_iter()
            .map(|command| command.execute(&mut unit, &mut self.field, &self.config))
            .collect();
        self.field.put_back(unit);
        outcomes
    }

    /// Projectile events emitted so far.
    #[must_use]
    pub fn projectiles(&self) -> Vec<&arena_core::events::ProjectileEvent> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SimulationEvent::Projectile(projectile) => Some(projectile),
                _ => None,
            })
            .collect()
    }
}
