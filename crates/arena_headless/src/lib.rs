//! Headless battle runner for balance testing and CI verification.
//!
//! This crate drives `arena_core` rooms without any client attached:
//!
//! - **Scenarios**: RON files (or built-ins) describing the board and the
//!   starting roster
//! - **Single runs**: one battle, optionally streaming every event as a
//!   JSON line on stdout
//! - **Batches**: many seeded battles in parallel with summary statistics
//! - **Determinism checks**: the same seed run repeatedly, sequentially and
//!   concurrently, must end in the same state
//!
//! # Example
//!
//! ```bash
//! # Stream one battle's events
//! cargo run -p arena_headless -- run --scenario duel --events
//!
//! # Balance batch
//! cargo run -p arena_headless -- batch --scenario scenarios/skirmish.ron --count 1000
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --seed 42 --runs 8
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod game_runner;
pub mod metrics;
pub mod scenario;

pub use batch::{run_batch, run_batch_with, verify_determinism, BatchConfig, BatchResults};
pub use game_runner::{run_game, run_game_observed, GameConfig, GameResult};
pub use metrics::{BatchSummary, GameMetrics, MetricsCollector, TeamMetrics};
pub use scenario::{Scenario, ScenarioError, UnitPlacement};
