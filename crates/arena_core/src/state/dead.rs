use super::{CombatantState, TickContext, Transition};
use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::components::ActionState;
use crate::error::Result;
use crate::math::{Fixed, GridPos};

/// Handler for [`StateKind::Dead`](super::StateKind::Dead).
///
/// Entering drops everything the unit had scheduled. A dead unit never
/// acts again, not even the shared base update.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadState;

impl CombatantState for DeadState {
    fn on_enter(&self, unit: &mut Combatant) {
        unit.action = ActionState::Dead;
        unit.commands.clear();
        unit.target = GridPos::NONE;
        unit.targetable = false;
        unit.cooldown = Fixed::ZERO;
    }

    fn update(
        &self,
        _unit: &mut Combatant,
        _dt: Fixed,
        _field: &mut Battlefield,
        _ctx: &mut TickContext<'_>,
    ) -> Result<Transition> {
        Ok(Transition::Stay)
    }
}
