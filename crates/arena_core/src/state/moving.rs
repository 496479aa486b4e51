//! Greedy approach toward the nearest enemy in sight.
//!
//! No pathfinding: each move is a single step onto a free neighbouring
//! cell that is strictly closer to the goal. A blocked unit waits.

use tracing::debug;

use super::{base_update, CombatantState, StateKind, TickContext, Transition};
use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::components::ActionState;
use crate::error::Result;
use crate::math::{millis, Fixed};

/// Handler for [`StateKind::Moving`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MovingState;

impl CombatantState for MovingState {
    fn on_enter(&self, unit: &mut Combatant) {
        unit.action = ActionState::Walk;
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

        // Charmed units never switch to attacking.
        if !unit.status.is_charmed() && field.nearest_target_at_range(unit).is_some() {
            return Ok(Transition::To(StateKind::Attacking));
        }

        if unit.cooldown > Fixed::ZERO {
            unit.tick_cooldown(dt);
            return Ok(Transition::Stay);
        }

        let Some(goal) = field.nearest_target_at_sight(unit) else {
            unit.action = ActionState::Idle;
            return Ok(Transition::Stay);
        };

        unit.cooldown = millis(ctx.config.move_cooldown_ms);
        if let Some(next) = field.step_toward(unit, goal) {
            let from = unit.position;
            field.relocate(unit, next)?;
            unit.action = ActionState::Walk;
            debug!(unit = unit.id, %from, to = %next, %goal, "Stepped");
        }
        Ok(Transition::Stay)
    }
}
