//! Batch battle runner for balance testing.
//!
//! Runs many seeded rooms of one scenario in parallel using rayon. Each
//! room lives on one worker from setup to final hash; rooms share only
//! the read-only animation table.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arena_core::components::Team;
use arena_core::config::AnimationTable;
use arena_core::room::MatchOutcome;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::game_runner::{run_game, GameConfig};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::scenario::{Scenario, ScenarioError, DEFAULT_SCENARIO};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name or path.
    pub scenario: String,
    /// Number of battles to run.
    pub game_count: u32,
    /// Maximum parallel battles (0 = rayon default).
    pub parallel_games: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// Seed of the first battle; battle `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Tick limit override; the scenario's own limit when `None`.
    pub max_ticks: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: DEFAULT_SCENARIO.to_string(),
            game_count: 100,
            parallel_games: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            max_ticks: None,
        }
    }
}

impl BatchConfig {
    /// Create a new batch config.
    #[must_use]
    pub fn new(scenario: &str, game_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set starting seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the tick limit.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_parallel(mut self, parallel_games: u32) -> Self {
        self.parallel_games = parallel_games;
        self
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual battle metrics, in seed order.
    pub games: Vec<GameMetrics>,
    /// Summary statistics.
    pub summary: BatchSummary,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Battles that failed.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file.
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Default file name inside the output directory.
    #[must_use]
    pub fn default_path(&self) -> PathBuf {
        self.config.output_dir.join(format!(
            "batch_{}_{}.json",
            self.config.scenario.replace(['/', '\\', '.'], "_"),
            self.config.seed_start
        ))
    }
}

/// A battle that failed during a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle index.
    pub game_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Lock-free progress counters shared by the workers.
#[derive(Debug)]
pub struct BatchProgress {
    total: u32,
    completed: AtomicU32,
    blue_wins: AtomicU32,
    red_wins: AtomicU32,
    started: Instant,
}

impl BatchProgress {
    /// Track a batch of `total` battles.
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            blue_wins: AtomicU32::new(0),
            red_wins: AtomicU32::new(0),
            started: Instant::now(),
        }
    }

    /// Record a finished battle.
    pub fn record_completion(&self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Victory(Team::Blue) => {
                self.blue_wins.fetch_add(1, Ordering::Relaxed);
            }
            MatchOutcome::Victory(Team::Red) => {
                self.red_wins.fetch_add(1, Ordering::Relaxed);
            }
            MatchOutcome::Draw | MatchOutcome::InProgress => {}
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Battles finished so far.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        f64::from(self.current()) / f64::from(self.total) * 100.0
    }

    /// Blue and red win rates over the finished battles.
    #[must_use]
    pub fn current_win_rates(&self) -> (f64, f64) {
        let completed = self.current();
        if completed == 0 {
            return (0.0, 0.0);
        }
        let completed = f64::from(completed);
        (
            f64::from(self.blue_wins.load(Ordering::Relaxed)) / completed,
            f64::from(self.red_wins.load(Ordering::Relaxed)) / completed,
        )
    }

    fn log(&self) {
        let (blue, red) = self.current_win_rates();
        info!(
            completed = self.current(),
            total = self.total,
            percent = %format!("{:.1}", self.percentage()),
            blue_win_rate = %format!("{blue:.3}"),
            red_win_rate = %format!("{red:.3}"),
            elapsed_s = self.started.elapsed().as_secs(),
            "Batch progress"
        );
    }
}

fn run_single_game(
    scenario: &Scenario,
    animations: &Arc<AnimationTable>,
    seed: u64,
    max_ticks: u64,
) -> Result<GameMetrics, ScenarioError> {
    let config = GameConfig {
        game_id: format!("{}-{seed}", scenario.name),
        seed,
        max_ticks,
        scenario,
        animations: Arc::clone(animations),
    };
    Ok(run_game(&config)?.metrics)
}

/// Run a batch of battles of an already loaded scenario.
#[must_use]
pub fn run_batch_with(config: BatchConfig, scenario: &Scenario) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.game_count);
    let animations = Arc::new(scenario.animations.clone());
    let max_ticks = config.max_ticks.unwrap_or(scenario.tick_limit);

    info!(
        games = config.game_count,
        scenario = %scenario.name,
        seed_start = config.seed_start,
        max_ticks,
        "Starting batch run"
    );

    let run_all = || -> Vec<Result<GameMetrics, BatchError>> {
        (0..config.game_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                match run_single_game(scenario, &animations, seed, max_ticks) {
                    Ok(metrics) => {
                        progress.record_completion(metrics.outcome);
                        let completed = progress.current();
                        if completed % 10 == 0 {
                            debug!("Progress: {}/{}", completed, config.game_count);
                        }
                        if completed % 100 == 0 {
                            progress.log();
                        }
                        Ok(metrics)
                    }
                    Err(e) => {
                        warn!("Battle {} (seed {}) failed: {}", i, seed, e);
                        Err(BatchError {
                            game_index: i,
                            seed,
                            message: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    };

    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using the global pool", e);
                run_all()
            }
        }
    } else {
        run_all()
    };

    let mut games = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(e) => errors.push(e),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        games.len(),
        duration_seconds,
        games.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Resolve the configured scenario and run a batch of it.
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let scenario = Scenario::resolve(&config.scenario)?;
    Ok(run_batch_with(config, &scenario))
}

/// Run the same seed `runs` times, half of them concurrently, and check
/// every run ends in the same state.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool, ScenarioError> {
    let animations = Arc::new(scenario.animations.clone());
    let max_ticks = scenario.tick_limit;

    let sequential = runs.div_ceil(2);
    let mut results = (0..sequential)
        .map(|_| run_single_game(scenario, &animations, seed, max_ticks))
        .collect::<Result<Vec<_>, _>>()?;
    let parallel = (sequential..runs)
        .into_par_iter()
        .map(|_| run_single_game(scenario, &animations, seed, max_ticks))
        .collect::<Result<Vec<_>, _>>()?;
    results.extend(parallel);

    let Some(first) = results.first() else {
        return Ok(true);
    };
    let deterministic = results.iter().all(|r| {
        r.final_state_hash == first.final_state_hash
            && r.outcome == first.outcome
            && r.duration_ticks == first.duration_ticks
    });
    if !deterministic {
        let hashes: Vec<u64> = results.iter().map(|r| r.final_state_hash).collect();
        warn!(seed, ?hashes, "Runs diverged");
    }
    Ok(deterministic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert_eq!(config.scenario, DEFAULT_SCENARIO);
        assert_eq!(config.max_ticks, None);
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("duel", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_max_ticks(99)
            .with_parallel(2);

        assert_eq!(config.scenario, "duel");
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.max_ticks, Some(99));
        assert_eq!(config.parallel_games, 2);
    }

    #[test]
    fn test_progress_tracking() {
        let progress = BatchProgress::new(4);
        assert_eq!(progress.current(), 0);
        assert_eq!(progress.percentage(), 0.0);

        progress.record_completion(MatchOutcome::Victory(Team::Blue));
        progress.record_completion(MatchOutcome::Victory(Team::Red));
        progress.record_completion(MatchOutcome::Victory(Team::Blue));
        progress.record_completion(MatchOutcome::Draw);

        assert_eq!(progress.current(), 4);
        assert_eq!(progress.percentage(), 100.0);
        assert_eq!(progress.current_win_rates(), (0.5, 0.25));
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(BatchConfig::new("duel", 6).with_seed(10)).unwrap();

        assert_eq!(results.games.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_games, 6);
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, (10..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_is_independent_of_worker_count() {
        let scenario = Scenario::skirmish_3v3();
        let one = run_batch_with(BatchConfig::new("skirmish_3v3", 8).with_parallel(1), &scenario);
        let four = run_batch_with(BatchConfig::new("skirmish_3v3", 8).with_parallel(4), &scenario);
        assert_eq!(one.games, four.games);
    }

    #[test]
    fn test_failed_battles_are_reported() {
        let mut scenario = Scenario::duel();
        scenario.units[0].ability = "meteor".to_string();
        let results = run_batch_with(BatchConfig::new("broken", 3), &scenario);

        assert!(results.games.is_empty());
        assert_eq!(results.errors.len(), 3);
        assert!(results.errors[0].message.contains("meteor"));
    }

    #[test]
    fn test_unknown_scenario() {
        assert!(matches!(
            run_batch(BatchConfig::new("nowhere", 1)),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_verify_determinism() {
        assert!(verify_determinism(&Scenario::skirmish_3v3(), 12345, 4).unwrap());
        assert!(verify_determinism(&Scenario::duel(), 1, 0).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(BatchConfig::new("duel", 3)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config.scenario, "duel");
    }

    #[test]
    fn test_default_path_is_sanitized() {
        let results = run_batch_with(
            BatchConfig::new("scenarios/duel.ron", 0).with_output(PathBuf::from("out")),
            &Scenario::duel(),
        );
        assert_eq!(
            results.default_path(),
            PathBuf::from("out").join("batch_scenarios_duel_ron_0.json")
        );
    }
}
