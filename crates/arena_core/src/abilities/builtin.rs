//! Reference ability strategies.

use tracing::debug;

use super::{finish_cast, AbilityStrategy, AbilityTarget};
use crate::battlefield::Battlefield;
use crate::combatant::Combatant;
use crate::command::CommandKind;
use crate::error::Result;
use crate::math::millis;
use crate::state::{AttackingState, TickContext, Weather};

/// Heavy single-target hit that lands with the caster's normal hit timing.
///
/// Deals twice the caster's attack, doubled again on a crit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Burst;

impl Burst {
    /// Registry id.
    pub const ID: &'static str = "strike";
}

impl AbilityStrategy for Burst {
    fn process(
        &self,
        caster: &mut Combatant,
        state: &AttackingState,
        _field: &mut Battlefield,
        target: AbilityTarget,
        crit: bool,
        ctx: &mut TickContext<'_>,
    ) -> Result<()> {
        let mut damage = caster.attack.saturating_mul(2);
        if crit {
            damage = damage.saturating_mul(2);
        }
        let delay_ms = state.hit_delay_ms(caster, ctx);
        caster.commands.push(
            millis(delay_ms),
            CommandKind::Strike {
                target: target.position,
                damage,
            },
        );
        finish_cast(caster, target, crit, ctx);
        Ok(())
    }
}

/// Self heal for a quarter of max hp, scaled by weather.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recover;

impl Recover {
    /// Registry id.
    pub const ID: &'static str = "recover";

    fn amount(max_hp: u32, weather: Weather, crit: bool) -> u32 {
        let base = max_hp / 4;
        let scaled = match weather {
            Weather::Sun => base + base / 2,
            Weather::Rain => base - base / 4,
            Weather::Neutral => base,
        };
        if crit {
            scaled.saturating_mul(2)
        } else {
            scaled
        }
    }
}

impl AbilityStrategy for Recover {
    fn process(
        &self,
        caster: &mut Combatant,
        _state: &AttackingState,
        _field: &mut Battlefield,
        target: AbilityTarget,
        crit: bool,
        ctx: &mut TickContext<'_>,
    ) -> Result<()> {
        let amount = Self::amount(caster.max_hp, ctx.weather, crit);
        caster.heal(amount);
        debug!(unit = caster.id, amount, weather = ?ctx.weather, "Recovered hp");
        finish_cast(caster, target, crit, ctx);
        Ok(())
    }
}
