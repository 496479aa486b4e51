//! Whole-room behaviour: tick order, movement, knockouts and outcomes.

use std::sync::Arc;

use arena_core::combatant::CombatantSpec;
use arena_core::command::CommandOutcome;
use arena_core::components::{ActionState, Team};
use arena_core::config::{AnimationTable, ArenaConfig};
use arena_core::events::SimulationEvent;
use arena_core::math::{DistanceMetric, GridPos};
use arena_core::room::{MatchOutcome, Room};
use arena_core::state::StateKind;
use arena_test_utils::determinism::{find_first_divergence, verify_room_determinism};
use arena_test_utils::fixtures::{fixed, unit_at};

fn duel(blue: CombatantSpec, red: CombatantSpec) -> (Room, u64, u64) {
    let mut room = Room::new("duel", ArenaConfig::default(), 7);
    let a = room.spawn(blue).unwrap();
    let b = room.spawn(red).unwrap();
    room.start().unwrap();
    (room, a, b)
}

#[test]
fn test_end_to_end_first_attack() {
    let (mut room, attacker, _) = duel(
        CombatantSpec {
            range: 2,
            attack_speed: fixed(2),
            ..unit_at(Team::Blue, 0, 0)
        },
        CombatantSpec {
            attack: 0,
            range: 2,
            ..unit_at(Team::Red, 2, 0)
        },
    );

    // Moving sees the enemy in range and switches.
    room.step(fixed(500)).unwrap();
    assert_eq!(room.unit(attacker).unwrap().state, StateKind::Attacking);
    assert_eq!(room.unit(attacker).unwrap().counters.attack_count, 0);

    room.step(fixed(500)).unwrap();
    let unit = room.unit(attacker).unwrap();
    assert_eq!(unit.counters.attack_count, 1);
    assert_eq!(unit.commands.len(), 1);

    let projectiles: Vec<_> = room
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SimulationEvent::Projectile(p) if p.actor_id == attacker => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(projectiles.len(), 1);
    assert_eq!(projectiles[0].target_x, 2);
    assert_eq!(projectiles[0].target_y, 0);
    assert_eq!(projectiles[0].simulation_id, "duel");
}

#[test]
fn test_scheduled_hit_lands_on_a_later_tick() {
    let (mut room, attacker, target) = duel(
        CombatantSpec {
            attack: 30,
            ..unit_at(Team::Blue, 0, 0)
        },
        CombatantSpec {
            attack: 0,
            ..unit_at(Team::Red, 1, 0)
        },
    );

    room.tick().unwrap(); // switch to attacking
    room.tick().unwrap(); // attack starts, 200 ms fallback delay
    assert_eq!(room.unit(target).unwrap().hp, 100);

    let mut landed = Vec::new();
    for _ in 0..4 {
        landed.extend(room.tick().unwrap().outcomes);
    }
    assert!(landed.contains(&CommandOutcome::Hit {
        attacker,
        target,
        damage: 30,
        lethal: false,
    }));
    assert_eq!(room.unit(target).unwrap().hp, 70);
    assert_eq!(room.unit(attacker).unwrap().pp(), 5);
}

#[test]
fn test_knockout_removes_unit_and_clears_its_queue() {
    let (mut room, attacker, victim) = duel(
        CombatantSpec {
            attack: 500,
            ..unit_at(Team::Blue, 0, 0)
        },
        CombatantSpec {
            attack: 1,
            ..unit_at(Team::Red, 1, 0)
        },
    );

    let mut knockouts = Vec::new();
    for _ in 0..20 {
        knockouts.extend(room.tick().unwrap().knockouts);
    }

    assert_eq!(knockouts, vec![victim]);
    let dead = room.unit(victim).unwrap();
    assert_eq!(dead.state, StateKind::Dead);
    assert_eq!(dead.action, ActionState::Dead);
    assert!(dead.commands.is_empty());
    assert!(!dead.is_targetable());
    assert_eq!(room.field().board().get(GridPos::new(1, 0)), None);
    assert_eq!(room.outcome(), MatchOutcome::Victory(Team::Blue));
    assert!(room.unit(attacker).unwrap().is_alive());

    assert!(room
        .events()
        .pending()
        .iter()
        .any(|e| matches!(e, SimulationEvent::Knockout(k) if k.actor_id == victim)));
}

#[test]
fn test_units_walk_into_range() {
    let (mut room, blue, red) = duel(
        CombatantSpec {
            attack: 0,
            ..unit_at(Team::Blue, 0, 0)
        },
        CombatantSpec {
            attack: 0,
            ..unit_at(Team::Red, 7, 5)
        },
    );

    for _ in 0..200 {
        room.tick().unwrap();
    }

    let a = room.unit(blue).unwrap();
    let b = room.unit(red).unwrap();
    assert_eq!(room.field().distance(a.position, b.position), 1);
    assert_eq!(a.state, StateKind::Attacking);
    assert_eq!(b.state, StateKind::Attacking);
}

#[test]
fn test_manhattan_board_walks_orthogonally() {
    let config = ArenaConfig {
        distance_metric: DistanceMetric::Manhattan,
        ..ArenaConfig::default()
    };
    let mut room = Room::new("grid", config, 3);
    let blue = room
        .spawn(CombatantSpec {
            attack: 0,
            ..unit_at(Team::Blue, 0, 0)
        })
        .unwrap();
    room.spawn(CombatantSpec {
        attack: 0,
        ..unit_at(Team::Red, 3, 3)
    })
    .unwrap();
    room.start().unwrap();

    let mut last = GridPos::new(0, 0);
    for _ in 0..100 {
        room.tick().unwrap();
        let now = room.unit(blue).unwrap().position;
        assert!((now.x - last.x).abs() + (now.y - last.y).abs() <= 1);
        last = now;
    }
}

#[test]
fn test_battle_runs_to_a_winner() {
    let mut room = Room::new("brawl", ArenaConfig::default(), 11);
    room.spawn(CombatantSpec {
        attack: 25,
        ..unit_at(Team::Blue, 0, 0)
    })
    .unwrap();
    room.spawn(CombatantSpec {
        attack: 25,
        ..unit_at(Team::Blue, 0, 1)
    })
    .unwrap();
    room.spawn(CombatantSpec {
        attack: 5,
        ..unit_at(Team::Red, 7, 5)
    })
    .unwrap();
    room.start().unwrap();

    let outcome = room.run_until(2_000).unwrap();
    assert_eq!(outcome, MatchOutcome::Victory(Team::Blue));
}

#[test]
fn test_animation_table_from_ron_drives_delays() {
    let table = AnimationTable::from_ron_str(r#"{ "0025": (ticks: 18, hit_tick: 9) }"#).unwrap();
    let mut room = Room::new("anim", ArenaConfig::default(), 1).with_animations(Arc::new(table));
    room.spawn(CombatantSpec {
        index: "0025".to_string(),
        ..unit_at(Team::Blue, 0, 0)
    })
    .unwrap();
    room.spawn(unit_at(Team::Red, 1, 0)).unwrap();
    room.start().unwrap();

    room.tick().unwrap();
    room.tick().unwrap();

    let delays: Vec<u32> = room
        .events()
        .pending()
        .iter()
        .filter_map(|e| match e {
            SimulationEvent::Projectile(p) if p.actor_id == 1 => Some(p.delay_ms),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![250]);
}

fn melee() -> Room {
    let mut room = Room::new("melee", ArenaConfig::default(), 1234);
    let mut confused = unit_at(Team::Blue, 3, 2);
    confused.range = 2;
    for spec in [
        confused,
        unit_at(Team::Blue, 2, 2),
        unit_at(Team::Red, 4, 2),
        unit_at(Team::Red, 4, 3),
        unit_at(Team::Blue, 3, 4),
        unit_at(Team::Red, 5, 1),
    ] {
        room.spawn(spec).unwrap();
    }
    room.field_mut()
        .get_mut(1)
        .unwrap()
        .status
        .apply(arena_core::status::Status::Confusion, fixed(3000));
    room.start().unwrap();
    room
}

#[test]
fn test_melee_is_deterministic() {
    verify_room_determinism(melee, 400).assert_deterministic();
    assert_eq!(find_first_divergence(melee, 200), None);
}

#[test]
fn test_huge_tick_duration_saturates() {
    let config = ArenaConfig {
        tick_duration_ms: 3_000_000_000,
        ..ArenaConfig::default()
    };
    let mut room = Room::new("long", config, 5);
    let blue = room.spawn(unit_at(Team::Blue, 0, 0)).unwrap();
    let red = room.spawn(unit_at(Team::Red, 1, 0)).unwrap();
    room.start().unwrap();

    for _ in 0..4 {
        room.tick().unwrap();
    }
    assert!(room.unit(blue).unwrap().hp < 100);
    assert!(room.unit(red).unwrap().hp < 100);
}

#[test]
fn test_huge_fallback_delay_is_scheduled_not_fatal() {
    let config = ArenaConfig {
        fallback_hit_delay_ms: 3_000_000_000,
        ..ArenaConfig::default()
    };
    let mut room = Room::new("slow-hit", config, 5);
    let blue = room.spawn(unit_at(Team::Blue, 0, 0)).unwrap();
    room.spawn(unit_at(Team::Red, 1, 0)).unwrap();
    room.start().unwrap();

    room.tick().unwrap();
    room.tick().unwrap();

    let delays: Vec<u32> = room
        .events()
        .pending()
        .iter()
        .filter_map(|e| match e {
            SimulationEvent::Projectile(p) if p.actor_id == blue => Some(p.delay_ms),
            _ => None,
        })
        .collect();
    assert_eq!(delays, vec![3_000_000_000]);
    assert_eq!(room.unit(blue).unwrap().commands.len(), 1);
}
