//! The attack loop.
//!
//! Each time the cooldown runs out the unit resolves a target, then either
//! casts its ability (full PP, not silenced) or starts a basic attack. A
//! basic attack never lands immediately: it schedules an attack command
//! against the target's *cell* and broadcasts a projectile with the same
//! delay, so the remote visual and the logical hit line up.

use tracing::{debug, error};

use super::{base_update, CombatantState, StateKind, TickContext, Transition};
use crate::abilities::AbilityTarget;
use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::command::CommandKind;
use crate::components::{ActionState, EntityId};
use crate::error::Result;
use crate::events::{ProjectileEvent, SimulationEvent};
use crate::math::{millis, Fixed, GridPos};
use crate::timing;

/// Handler for [`StateKind::Attacking`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackingState;

impl AttackingState {
    /// Pick the cell this unit acts on, updating its target memory.
    ///
    /// Confused units use the confusion rule. Everyone else keeps the
    /// remembered target while it stays a valid enemy in range and otherwise
    /// falls back to the nearest enemy in range.
    pub fn resolve_target(
        &self,
        unit: &mut Combatant,
        field: &Battlefield,
        ctx: &mut TickContext<'_>,
    ) -> Option<(GridPos, EntityId)> {
        let cell = if unit.status.is_confused() {
            Self::confused_target(unit, field, ctx)
        } else if field.is_valid_target(unit, unit.target) {
            Some(unit.target)
        } else {
            let retarget = field.nearest_target_at_range(unit);
            if let Some(cell) = retarget {
                debug!(unit = unit.id, from = %unit.target, to = %cell, "Retargeted");
            }
            retarget
        };

        match cell.and_then(|cell| field.occupant(cell).map(|other| (cell, other.id))) {
            Some(found) => {
                unit.target = found.0;
                Some(found)
            }
            None => {
                unit.target = GridPos::NONE;
                None
            }
        }
    }

    fn confused_target(
        unit: &Combatant,
        field: &Battlefield,
        ctx: &mut TickContext<'_>,
    ) -> Option<GridPos> {
        let candidates = field.confused_candidates(unit);
        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            n => Some(candidates[ctx.rng.pick(n)]),
        }
    }

    /// Hit delay for a basic attack by `unit`, in whole milliseconds.
    pub fn hit_delay_ms(&self, unit: &Combatant, ctx: &TickContext<'_>) -> u32 {
        let animation = ctx.animations.get(&unit.index);
        if animation.is_none() {
            debug!(
                unit = unit.id,
                index = %unit.index,
                "No attack animation metadata, using fallback delay"
            );
        }
        timing::hit_delay_ms(animation, unit.attack_speed(), ctx.config)
    }

    fn cast(
        &self,
        unit: &mut Combatant,
        field: &mut Battlefield,
        target: AbilityTarget,
        ctx: &mut TickContext<'_>,
    ) -> Result<()> {
        // Only roll when an item allows ability crits.
        let crit = unit.can_crit_abilities() && ctx.rng.chance(unit.crit_probability());

        let abilities = ctx.abilities;
        let strategy = abilities.get(&unit.ability, unit.id).map_err(|e| {
            error!(unit = unit.id, ability = %unit.ability, "Ability missing from registry");
            e
        })?;
        strategy.process(unit, self, field, target, crit, ctx)
    }

    fn basic_attack(&self, unit: &mut Combatant, target: GridPos, ctx: &mut TickContext<'_>) {
        unit.counters.attack_count += 1;
        let delay_ms = self.hit_delay_ms(unit, ctx);

        ctx.events.emit(SimulationEvent::Projectile(ProjectileEvent {
            actor_id: unit.id,
            simulation_id: ctx.simulation_id.to_string(),
            target_x: target.x,
            target_y: target.y,
            delay_ms,
        }));
        unit.commands.push(
            millis(delay_ms),
            CommandKind::Attack {
                target,
                allow_allies: unit.status.is_confused(),
            },
        );

        debug!(unit = unit.id, %target, delay_ms, "Basic attack");
    }
}

impl CombatantState for AttackingState {
    fn on_enter(&self, unit: &mut Combatant) {
        unit.action = ActionState::Attack;
        unit.cooldown = Fixed::ZERO;
    }

    fn update(
        &self,
        unit: &mut Combatant,
        dt: Fixed,
        field: &mut Battlefield,
        ctx: &mut TickContext<'_>,
    ) -> Result<Transition> {
        base_update(unit, dt);

        if unit.cooldown > Fixed::ZERO {
            unit.tick_cooldown(dt);
            return Ok(Transition::Stay);
        }
        unit.cooldown = unit.attack_delay();

        let resolved = self.resolve_target(unit, field, ctx);
        let (cell, id) = match resolved {
            Some(target) if !unit.status.is_charmed() => target,
            _ => {
                return Ok(if field.nearest_target_at_sight(unit).is_some() {
                    Transition::To(StateKind::Moving)
                } else {
                    Transition::Stay
                });
            }
        };

        if unit.has_full_pp() && !unit.status.is_silenced() {
            let target = AbilityTarget { id, position: cell };
            self.cast(unit, field, target, ctx)?;
        } else {
            self.basic_attack(unit, cell, ctx);
        }
        Ok(Transition::Stay)
    }

    fn on_exit(&self, unit: &mut Combatant) {
        unit.target = GridPos::NONE;
    }
}
