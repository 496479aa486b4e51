//! Per-battle metrics and batch summaries.
//!
//! [`MetricsCollector`] watches the events a room emits while it runs and
//! reads the combat counters off the units once the battle is over.
//! [`BatchSummary`] folds many [`GameMetrics`] into win rates and averages
//! for balance work.

use std::collections::BTreeMap;

use arena_core::components::Team;
use arena_core::events::SimulationEvent;
use arena_core::room::{MatchOutcome, Room};
use serde::{Deserialize, Serialize};

/// Per-team totals for one battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Units fielded.
    pub units: u32,
    /// Units still standing at the end.
    pub survivors: u32,
    /// Basic attacks started.
    pub attacks: u32,
    /// Abilities cast.
    pub abilities_cast: u32,
    /// Critical ability casts.
    pub ability_crits: u32,
    /// Delayed hits that landed.
    pub hits_landed: u32,
    /// Delayed hits that found nothing at their cell.
    pub hits_fizzled: u32,
    /// Total damage dealt.
    pub damage_dealt: u64,
}

/// Event totals for one battle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    /// Projectile events.
    pub projectiles: u32,
    /// Ability cast events.
    pub ability_casts: u32,
    /// Knockout events.
    pub knockouts: u32,
}

/// Complete metrics for a single battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Room id.
    pub room_id: String,
    /// Seed the room ran with.
    pub seed: u64,
    /// How the battle ended.
    pub outcome: MatchOutcome,
    /// Winning team, if any.
    pub winner: Option<Team>,
    /// Ticks simulated.
    pub duration_ticks: u64,
    /// Tick of the first knockout.
    pub first_knockout_tick: Option<u64>,
    /// Per-team totals keyed by team name.
    pub teams: BTreeMap<String, TeamMetrics>,
    /// Event totals.
    pub events: EventCounts,
    /// Room state hash after the last tick.
    pub final_state_hash: u64,
}

/// Accumulates metrics while a room runs.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    events: EventCounts,
    ability_crits: BTreeMap<u64, u32>,
    first_knockout_tick: Option<u64>,
}

impl MetricsCollector {
    /// An empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the events drained after tick `tick`.
    pub fn record_events(&mut self, tick: u64, events: &[SimulationEvent]) {
        for event in events {
            match event {
                SimulationEvent::Projectile(_) => self.events.projectiles += 1,
                SimulationEvent::AbilityCast(cast) => {
                    self.events.ability_casts += 1;
                    if cast.crit {
                        *self.ability_crits.entry(cast.actor_id).or_default() += 1;
                    }
                }
                SimulationEvent::Knockout(_) => {
                    self.events.knockouts += 1;
                    self.first_knockout_tick.get_or_insert(tick);
                }
            }
        }
    }

    /// Event totals so far.
    #[must_use]
    pub fn events(&self) -> EventCounts {
        self.events
    }

    /// Read the unit counters and produce the final metrics.
    #[must_use]
    pub fn finish(self, room: &Room, seed: u64) -> GameMetrics {
        let mut teams: BTreeMap<String, TeamMetrics> = BTreeMap::new();
        for team in [Team::Blue, Team::Red] {
            teams.insert(team.to_string(), TeamMetrics::default());
        }

        for unit in room.field().units().iter_sorted() {
            let entry = teams.entry(unit.team.to_string()).or_default();
            entry.units += 1;
            if unit.is_alive() {
                entry.survivors += 1;
            }
            entry.attacks += unit.counters.attack_count;
            entry.abilities_cast += unit.counters.ability_count;
            entry.ability_crits += self.ability_crits.get(&unit.id).copied().unwrap_or(0);
            entry.hits_landed += unit.counters.hits_landed;
            entry.hits_fizzled += unit.counters.hits_fizzled;
            entry.damage_dealt += unit.counters.damage_dealt;
        }

        let outcome = room.outcome();
        let winner = match outcome {
            MatchOutcome::Victory(team) => Some(team),
            MatchOutcome::InProgress | MatchOutcome::Draw => None,
        };

        GameMetrics {
            room_id: room.id().to_string(),
            seed,
            outcome,
            winner,
            duration_ticks: room.get_tick(),
            first_knockout_tick: self.first_knockout_tick,
            teams,
            events: self.events,
            final_state_hash: room.state_hash(),
        }
    }
}

/// Summary statistics across multiple battles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total battles played.
    pub total_games: u32,
    /// Battles won per team.
    pub wins_by_team: BTreeMap<String, u32>,
    /// Win rate per team.
    pub win_rates: BTreeMap<String, f64>,
    /// Battles where nobody was left standing.
    pub draws: u32,
    /// Battles that hit the tick limit.
    pub unfinished: u32,
    /// Average battle length in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest battle.
    pub min_duration_ticks: u64,
    /// Longest battle.
    pub max_duration_ticks: u64,
    /// Average damage dealt per battle by team.
    pub avg_damage_by_team: BTreeMap<String, f64>,
    /// Average survivors per battle by team.
    pub avg_survivors_by_team: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of battle metrics.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let total = games.len() as f64;
        let mut summary = Self {
            total_games: games.len() as u32,
            min_duration_ticks: u64::MAX,
            ..Self::default()
        };

        let mut duration_sum = 0u64;
        let mut damage: BTreeMap<String, u64> = BTreeMap::new();
        let mut survivors: BTreeMap<String, u32> = BTreeMap::new();

        for game in games {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match game.outcome {
                MatchOutcome::Victory(team) => {
                    *summary.wins_by_team.entry(team.to_string()).or_default() += 1;
                }
                MatchOutcome::Draw => summary.draws += 1,
                MatchOutcome::InProgress => summary.unfinished += 1,
            }

            for (team, stats) in &game.teams {
                *damage.entry(team.clone()).or_default() += stats.damage_dealt;
                *survivors.entry(team.clone()).or_default() += stats.survivors;
            }
        }

        summary.avg_duration_ticks = duration_sum as f64 / total;

        for team in [Team::Blue, Team::Red] {
            let wins = summary.wins_by_team.get(&team.to_string()).copied().unwrap_or(0);
            summary
                .win_rates
                .insert(team.to_string(), f64::from(wins) / total);
        }
        for (team, sum) in damage {
            summary.avg_damage_by_team.insert(team, sum as f64 / total);
        }
        for (team, sum) in survivors {
            summary
                .avg_survivors_by_team
                .insert(team, f64::from(sum) / total);
        }

        summary
    }

    /// Whether every team's win rate is within `threshold` of 50%.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        self.win_rates
            .values()
            .all(|rate| (rate - 0.5).abs() <= threshold)
    }

    /// The team winning more than `0.5 + threshold` of battles, if any.
    #[must_use]
    pub fn dominant_team(&self, threshold: f64) -> Option<&str> {
        self.win_rates
            .iter()
            .find(|(_, rate)| **rate > 0.5 + threshold)
            .map(|(team, _)| team.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn game(outcome: MatchOutcome, ticks: u64, blue_damage: u64) -> GameMetrics {
        let mut teams = BTreeMap::new();
        teams.insert(
            "blue".to_string(),
            TeamMetrics {
                damage_dealt: blue_damage,
                survivors: 1,
                ..TeamMetrics::default()
            },
        );
        teams.insert("red".to_string(), TeamMetrics::default());
        GameMetrics {
            room_id: "r".to_string(),
            seed: 0,
            outcome,
            winner: None,
            duration_ticks: ticks,
            first_knockout_tick: None,
            teams,
            events: EventCounts::default(),
            final_state_hash: 0,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_games(&[]);
        assert_eq!(summary.total_games, 0);
        assert!(summary.win_rates.is_empty());
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let games = [
            game(MatchOutcome::Victory(Team::Blue), 100, 300),
            game(MatchOutcome::Victory(Team::Blue), 200, 100),
            game(MatchOutcome::Victory(Team::Red), 300, 0),
            game(MatchOutcome::Draw, 400, 0),
            game(MatchOutcome::InProgress, 500, 0),
        ];
        let summary = BatchSummary::from_games(&games);

        assert_eq!(summary.total_games, 5);
        assert_eq!(summary.wins_by_team["blue"], 2);
        assert_eq!(summary.wins_by_team["red"], 1);
        assert_eq!(summary.draws, 1);
        assert_eq!(summary.unfinished, 1);
        assert!((summary.win_rates["blue"] - 0.4).abs() < 1e-9);
        assert!((summary.win_rates["red"] - 0.2).abs() < 1e-9);
        assert_eq!(summary.min_duration_ticks, 100);
        assert_eq!(summary.max_duration_ticks, 500);
        assert!((summary.avg_duration_ticks - 300.0).abs() < 1e-9);
        assert!((summary.avg_damage_by_team["blue"] - 80.0).abs() < 1e-9);
        assert!((summary.avg_survivors_by_team["blue"] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_balance_checks() {
        let even = BatchSummary::from_games(&[
            game(MatchOutcome::Victory(Team::Blue), 1, 0),
            game(MatchOutcome::Victory(Team::Red), 1, 0),
        ]);
        assert!(even.is_balanced(0.05));
        assert_eq!(even.dominant_team(0.05), None);

        let lopsided = BatchSummary::from_games(&[
            game(MatchOutcome::Victory(Team::Red), 1, 0),
            game(MatchOutcome::Victory(Team::Red), 1, 0),
            game(MatchOutcome::Victory(Team::Red), 1, 0),
            game(MatchOutcome::Victory(Team::Blue), 1, 0),
        ]);
        assert!(!lopsided.is_balanced(0.1));
        assert_eq!(lopsided.dominant_team(0.1), Some("red"));
    }

    #[test]
    fn test_collector_reads_room() {
        let mut room = Scenario::duel().build_room("metrics", 5).unwrap();
        let mut collector = MetricsCollector::new();
        for _ in 0..400 {
            let report = room.tick().unwrap();
            let events = room.drain_events();
            collector.record_events(report.tick, &events);
        }
        let counts = collector.events();
        let metrics = collector.finish(&room, 5);

        assert_eq!(metrics.room_id, "metrics");
        assert_eq!(metrics.duration_ticks, 400);
        assert_eq!(metrics.teams["blue"].units, 1);
        assert_eq!(metrics.teams["red"].units, 1);
        let attacks = metrics.teams["blue"].attacks + metrics.teams["red"].attacks;
        assert_eq!(attacks, counts.projectiles);
        assert!(attacks > 0);
        assert_eq!(metrics.final_state_hash, room.state_hash());
    }
}
