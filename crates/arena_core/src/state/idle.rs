use super::{base_update, CombatantState, TickContext, Transition};
use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::components::ActionState;
use crate::error::Result;
use crate::math::Fixed;

/// Handler for [`StateKind::Idle`](super::StateKind::Idle). Waits for the
/// room to start the battle.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleState;

impl CombatantState for IdleState {
    fn on_enter(&self, unit: &mut Combatant) {
        unit.action = ActionState::Idle;
    }

    fn update(
        &self,
        unit: &mut Combatant,
        dt: Fixed,
        _field: &mut Battlefield,
        _ctx: &mut TickContext<'_>,
    ) -> Result<Transition> {
        base_update(unit, dt);
        Ok(Transition::Stay)
    }
}
