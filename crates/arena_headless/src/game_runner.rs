//! Runs a single battle from a scenario to completion.
//!
//! The runner drains the room's event log every tick so a long battle
//! never accumulates events, feeding them to the metrics collector and to
//! an optional observer (the CLI uses this to stream JSON lines).

use std::sync::Arc;
use std::time::Instant;

use arena_core::config::AnimationTable;
use arena_core::events::SimulationEvent;
use arena_core::room::MatchOutcome;
use tracing::{debug, info};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for one battle.
#[derive(Debug, Clone)]
pub struct GameConfig<'a> {
    /// Room id stamped on every event.
    pub game_id: String,
    /// Random seed for the room.
    pub seed: u64,
    /// Maximum ticks before the battle is called unfinished.
    pub max_ticks: u64,
    /// Scenario to build the room from.
    pub scenario: &'a Scenario,
    /// Animation table shared between rooms.
    pub animations: Arc<AnimationTable>,
}

impl<'a> GameConfig<'a> {
    /// A battle of `scenario` with its own seed and tick limit.
    #[must_use]
    pub fn new(scenario: &'a Scenario, seed: u64) -> Self {
        Self {
            game_id: format!("{}-{seed}", scenario.name),
            seed,
            max_ticks: scenario.tick_limit,
            scenario,
            animations: Arc::new(scenario.animations.clone()),
        }
    }
}

/// Result of a completed battle.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Collected metrics.
    pub metrics: GameMetrics,
    /// State hash after the last tick.
    pub final_state_hash: u64,
}

/// Run a battle, discarding events.
pub fn run_game(config: &GameConfig<'_>) -> Result<GameResult, ScenarioError> {
    run_game_observed(config, |_| {})
}

/// Run a battle, handing every drained event to `observe`.
pub fn run_game_observed<F>(config: &GameConfig<'_>, mut observe: F) -> Result<GameResult, ScenarioError>
where
    F: FnMut(&SimulationEvent),
{
    let started = Instant::now();
    debug!(
        game_id = %config.game_id,
        seed = config.seed,
        max_ticks = config.max_ticks,
        scenario = %config.scenario.name,
        "Starting battle"
    );

    let mut room =
        config
            .scenario
            .build_room_with(config.game_id.clone(), config.seed, Arc::clone(&config.animations))?;
    let mut collector = MetricsCollector::new();

    while room.get_tick() < config.max_ticks && room.outcome() == MatchOutcome::InProgress {
        let report = room.tick()?;
        let events = room.drain_events();
        for event in &events {
            observe(event);
        }
        collector.record_events(report.tick, &events);
    }

    let metrics = collector.finish(&room, config.seed);
    info!(
        game_id = %config.game_id,
        outcome = ?metrics.outcome,
        ticks = metrics.duration_ticks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Battle finished"
    );

    Ok(GameResult {
        final_state_hash: metrics.final_state_hash,
        metrics,
    })
}
