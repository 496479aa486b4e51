//! Delayed effects owned by a combatant.
//!
//! A command never holds a reference to its target. It captures the target
//! *cell* at schedule time and looks the cell up again when the delay runs
//! out: by then the cell may be empty, may hold a different unit, or may
//! still hold the original target. Execution re-validates whatever is there.
//!
//! The queue belongs to the acting combatant. When that combatant dies its
//! queue is cleared, so nothing it scheduled can fire afterwards.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::components::EntityId;
use crate::config::ArenaConfig;
use crate::math::{fixed_serde, Fixed, GridPos};

/// What a command does once its delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Land a basic attack on whatever stands on `target`.
    Attack {
        /// Cell captured when the attack started.
        target: GridPos,
        /// Set for confused attacks, which ignore allegiance.
        allow_allies: bool,
    },
    /// Deal a fixed amount of damage to an enemy standing on `target`.
    Strike {
        /// Cell captured when the strike was scheduled.
        target: GridPos,
        /// Damage to apply.
        damage: u32,
    },
}

impl CommandKind {
    /// Cell this command resolves against.
    #[must_use]
    pub const fn target(&self) -> GridPos {
        match self {
            CommandKind::Attack { target, .. } | CommandKind::Strike { target, .. } => *target,
        }
    }

    /// Resolve the command against the current board.
    ///
    /// `actor` is the combatant that owns the command; it must not be stored
    /// in `field` while this runs.
    pub fn execute(
        &self,
        actor: &mut Combatant,
        field: &mut Battlefield,
        config: &ArenaConfig,
    ) -> CommandOutcome {
        let cell = self.target();
        let allow_allies = matches!(
            self,
            CommandKind::Attack {
                allow_allies: true,
                ..
            }
        );

        let Some(victim) = field.occupant_mut(cell) else {
            actor.counters.hits_fizzled += 1;
            debug!(unit = actor.id, %cell, "Delayed hit fizzled: cell empty");
            return CommandOutcome::Fizzled { cell };
        };

        let hostile = victim.team != actor.team;
        if victim.id == actor.id || !victim.is_targetable() || (!hostile && !allow_allies) {
            actor.counters.hits_fizzled += 1;
            debug!(
                unit = actor.id,
                occupant = victim.id,
                %cell,
                "Delayed hit fizzled: occupant not a valid target"
            );
            return CommandOutcome::Fizzled { cell };
        }

        let damage = match self {
            CommandKind::Attack { .. } => actor.attack,
            CommandKind::Strike { damage, .. } => *damage,
        };
        let target = victim.id;
        let lethal = victim.take_damage(damage);

        if matches!(self, CommandKind::Attack { .. }) {
            actor.add_pp(config.on_attack_pp);
        }
        actor.counters.hits_landed += 1;
        actor.counters.damage_dealt += u64::from(damage);

        debug!(unit = actor.id, target, damage, lethal, %cell, "Delayed hit landed");
        CommandOutcome::Hit {
            attacker: actor.id,
            target,
            damage,
            lethal,
        }
    }
}

/// Result of executing a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandOutcome {
    /// The cell held a valid target and the effect was applied.
    Hit {
        /// Owner of the command.
        attacker: EntityId,
        /// Unit that was hit.
        target: EntityId,
        /// Damage applied.
        damage: u32,
        /// Whether the hit brought the target to zero hp.
        lethal: bool,
    },
    /// The cell was empty or held something that may not be hit.
    Fizzled {
        /// The captured cell.
        cell: GridPos,
    },
}

/// A command waiting for its delay to run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    /// Time left before the command fires (ms).
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// The effect.
    pub kind: CommandKind,
}

/// FIFO queue of delayed commands owned by one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandQueue {
    pending: VecDeque<ScheduledCommand>,
}

impl CommandQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Schedule `kind` to fire after `delay_ms`.
    pub fn push(&mut self, delay_ms: Fixed, kind: CommandKind) {
        self.pending.push_back(ScheduledCommand {
            remaining: delay_ms,
            kind,
        });
    }

    /// Age every command by `dt` and return the ones that are now due,
    /// in the order they were scheduled.
    pub fn advance(&mut self, dt: Fixed) -> Vec<CommandKind> {
        let mut due = Vec::new();
        self.pending.retain_mut(|command| {
            command.remaining = command.remaining.saturating_sub(dt);
            if command.remaining <= Fixed::ZERO {
                due.push(command.kind);
                false
            } else {
                true
            }
        });
        due
    }

    /// Drop every pending command.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Iterate over pending commands in schedule order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledCommand> {
        self.pending.iter()
    }
}
