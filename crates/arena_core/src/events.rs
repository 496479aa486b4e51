//! Outbound events for remote observers.
//!
//! The core never talks to a network. Anything an observer needs to render
//! goes through an [`EventSink`] handed in with the tick context; the room
//! keeps an [`EventLog`] by default.

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityId;
use crate::components::EntityId;

/// A basic attack projectile.
///
/// `delay_ms` matches the delay of the attack command scheduled alongside
/// it, so the visual lands when the hit resolves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileEvent {
    /// Attacker.
    pub actor_id: EntityId,
    /// Room the attack happened in.
    pub simulation_id: String,
    /// Target column.
    pub target_x: i32,
    /// Target row.
    pub target_y: i32,
    /// Time until the hit resolves.
    pub delay_ms: u32,
}

/// An ability cast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityCastEvent {
    /// Caster.
    pub actor_id: EntityId,
    /// Room the cast happened in.
    pub simulation_id: String,
    /// Ability cast.
    pub ability: AbilityId,
    /// Target column.
    pub target_x: i32,
    /// Target row.
    pub target_y: i32,
    /// Whether the cast rolled a critical hit.
    pub crit: bool,
}

/// A unit reached zero hit points and left the board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnockoutEvent {
    /// Fallen unit.
    pub actor_id: EntityId,
    /// Room it fell in.
    pub simulation_id: String,
}

/// Everything the simulation broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// Basic attack visual.
    Projectile(ProjectileEvent),
    /// Ability visual.
    AbilityCast(AbilityCastEvent),
    /// Unit removed from play.
    Knockout(KnockoutEvent),
}

/// Receiver for outbound events.
pub trait EventSink {
    /// Publish one event.
    fn emit(&mut self, event: SimulationEvent);
}

impl EventSink for Vec<SimulationEvent> {
    fn emit(&mut self, event: SimulationEvent) {
        self.push(event);
    }
}

/// Buffered events, drained by whoever forwards them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<SimulationEvent>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events not yet drained.
    #[must_use]
    pub fn pending(&self) -> &[SimulationEvent] {
        &self.events
    }

    /// Take every pending event.
    pub fn drain(&mut self) -> Vec<SimulationEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: SimulationEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projectile_wire_shape() {
        let event = SimulationEvent::Projectile(ProjectileEvent {
            actor_id: 3,
            simulation_id: "room-1".to_string(),
            target_x: 2,
            target_y: 0,
            delay_ms: 250,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "projectile");
        assert_eq!(json["actorId"], 3);
        assert_eq!(json["simulationId"], "room-1");
        assert_eq!(json["targetX"], 2);
        assert_eq!(json["targetY"], 0);
        assert_eq!(json["delayMs"], 250);
    }

    #[test]
    fn test_log_drains() {
        let mut log = EventLog::new();
        log.emit(SimulationEvent::Knockout(KnockoutEvent {
            actor_id: 1,
            simulation_id: "r".to_string(),
        }));
        assert_eq!(log.len(), 1);
        assert_eq!(log.drain().len(), 1);
        assert!(log.is_empty());
    }
}
