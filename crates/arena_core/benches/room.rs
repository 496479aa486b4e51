//! Room tick benchmarks for arena_core.
//!
//! Run with: `cargo bench -p arena_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use arena_core::combatant::CombatantSpec;
use arena_core::components::Team;
use arena_core::config::ArenaConfig;
use arena_core::math::GridPos;
use arena_core::room::Room;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

/// Two full rows facing each other on the default 8 × 6 board.
fn full_board() -> Room {
    let mut room = Room::new("bench", ArenaConfig::default(), 17);
    for x in 0..8 {
        for (team, y) in [(Team::Blue, 0), (Team::Red, 5)] {
            let spec = CombatantSpec {
                team,
                position: GridPos::new(x, y),
                range: (x % 3 + 1) as u32,
                ..CombatantSpec::default()
            };
            room.spawn(spec).expect("bench roster overlaps");
        }
    }
    room.start().expect("bench roster has unknown abilities");
    room
}

/// Runs room tick benchmarks.
pub fn room_benchmark(c: &mut Criterion) {
    c.bench_function("room_tick_16_units", |b| {
        b.iter_batched(
            full_board,
            |mut room| {
                for _ in 0..20 {
                    black_box(room.tick().ok());
                }
                room
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("room_full_battle", |b| {
        b.iter_batched(
            full_board,
            |mut room| black_box(room.run_until(2_000).ok()),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("room_state_hash", |b| {
        let room = full_board();
        b.iter(|| black_box(room.state_hash()))
    });
}

criterion_group!(benches, room_benchmark);
criterion_main!(benches);
