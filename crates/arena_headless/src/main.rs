//! Headless arena battle runner.
//!
//! Runs battles without any client, for balance batches and CI
//! determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Run one battle and print its metrics
//! cargo run -p arena_headless -- run --scenario duel
//!
//! # Stream every event as a JSON line
//! cargo run -p arena_headless -- run --scenario scenarios/skirmish.ron --events
//!
//! # Run a batch for balance testing
//! cargo run -p arena_headless -- batch --scenario skirmish_3v3 --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --scenario skirmish_3v3 --seed 42 --runs 8
//! ```
//!
//! # Output
//!
//! stdout: JSON (metrics, or one event per line with `--events`)
//! stderr: logs, filtered by `RUST_LOG`

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arena_headless::{
    batch::{run_batch_with, verify_determinism, BatchConfig},
    game_runner::{run_game_observed, GameConfig},
    scenario::{Scenario, DEFAULT_SCENARIO},
};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless auto-battler runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle
    Run {
        /// Scenario file or built-in name
        #[arg(short, long, default_value = DEFAULT_SCENARIO)]
        scenario: String,

        /// Seed (defaults to the scenario's seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Tick limit (defaults to the scenario's limit)
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Print every event as a JSON line
        #[arg(long)]
        events: bool,
    },

    /// Run a batch of battles for balance testing
    Batch {
        /// Scenario file or built-in name
        #[arg(short, long, default_value = DEFAULT_SCENARIO)]
        scenario: String,

        /// Number of battles (defaults to the scenario's room count)
        #[arg(short, long)]
        count: Option<u32>,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed (defaults to the scenario's seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Tick limit (defaults to the scenario's limit)
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Verify determinism by running the same seed repeatedly
    Verify {
        /// Scenario file or built-in name
        #[arg(short, long, default_value = DEFAULT_SCENARIO)]
        scenario: String,

        /// Random seed
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            max_ticks,
            events,
        }) => cmd_run(&scenario, seed, max_ticks, events),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            max_ticks,
        }) => cmd_batch(&scenario, count, parallel, output, seed, max_ticks),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(&scenario, seed, runs),
        None => cmd_run(DEFAULT_SCENARIO, None, None, false),
    }
}

fn load_scenario(name_or_path: &str) -> Scenario {
    match Scenario::resolve(name_or_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario '{name_or_path}': {e}");
            std::process::exit(1);
        }
    }
}

/// Run one battle and print its metrics (or its events) to stdout
fn cmd_run(scenario: &str, seed: Option<u64>, max_ticks: Option<u64>, events: bool) {
    let scenario = load_scenario(scenario);
    let seed = seed.unwrap_or(scenario.seed);
    let mut config = GameConfig::new(&scenario, seed);
    if let Some(max_ticks) = max_ticks {
        config.max_ticks = max_ticks;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = run_game_observed(&config, |event| {
        if events {
            match serde_json::to_string(event) {
                Ok(line) => {
                    let _ = writeln!(out, "{line}");
                }
                Err(e) => tracing::warn!("Failed to encode event: {}", e),
            }
        }
    });

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Battle failed: {e}");
            std::process::exit(1);
        }
    };

    if events {
        eprintln!(
            "Outcome: {:?} after {} ticks",
            result.metrics.outcome, result.metrics.duration_ticks
        );
        return;
    }

    match serde_json::to_string_pretty(&result.metrics) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
        }
        Err(e) => {
            eprintln!("Failed to encode metrics: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a batch and save the results as JSON
fn cmd_batch(
    scenario: &str,
    count: Option<u32>,
    parallel: u32,
    output: PathBuf,
    seed: Option<u64>,
    max_ticks: Option<u64>,
) {
    let loaded = load_scenario(scenario);
    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    let mut config = BatchConfig::new(scenario, count.unwrap_or(loaded.room_count))
        .with_output(output)
        .with_seed(seed.unwrap_or(loaded.seed))
        .with_parallel(parallel);
    if let Some(max_ticks) = max_ticks {
        config = config.with_max_ticks(max_ticks);
    }

    tracing::info!(
        scenario = %config.scenario,
        count = config.game_count,
        parallel = config.parallel_games,
        seed = config.seed_start,
        output = %config.output_dir.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    let results = run_batch_with(config, &loaded);
    let path = results.default_path();
    if let Err(e) = results.save(&path) {
        eprintln!("Failed to save results to {}: {e}", path.display());
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("Battles: {}", summary.total_games);
    for (team, rate) in &summary.win_rates {
        eprintln!("  {team:<6} win rate: {:>5.1}%", rate * 100.0);
    }
    eprintln!("  draws: {}  unfinished: {}", summary.draws, summary.unfinished);
    eprintln!(
        "  duration: avg {:.1} ticks (min {}, max {})",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    if let Some(team) = summary.dominant_team(0.1) {
        eprintln!("  {team} dominates this scenario");
    }
    eprintln!("Results saved to {}", path.display());

    if !results.errors.is_empty() {
        eprintln!("FAIL: {} battles failed", results.errors.len());
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario,
        seed,
        runs
    );

    let loaded = load_scenario(scenario);
    match verify_determinism(&loaded, seed, runs) {
        Ok(true) => eprintln!("PASS: All {runs} runs produced identical results"),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Battle failed: {e}");
            std::process::exit(1);
        }
    }
}
