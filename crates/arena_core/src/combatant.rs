//! Per-unit mutable combat state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityId;
use crate::command::CommandQueue;
use crate::components::{
    percent_to_probability, ActionState, CombatCounters, EntityId, HeldItem, Team,
};
use crate::config::ArenaConfig;
use crate::math::{fixed_serde, Fixed, GridPos, MS_PER_SECOND};
use crate::state::StateKind;
use crate::status::StatusSet;

/// Parameters for spawning a new combatant.
///
/// All fields have sensible defaults; only provide what the test or
/// scenario cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatantSpec {
    /// Unit index used to look up animation metadata.
    pub index: String,
    /// Side.
    pub team: Team,
    /// Starting cell.
    pub position: GridPos,
    /// Maximum (and starting) hit points.
    pub max_hp: u32,
    /// Basic attack damage.
    pub attack: u32,
    /// Starting PP.
    pub pp: u32,
    /// PP needed to cast.
    pub max_pp: u32,
    /// Attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Critical hit chance in percent.
    pub crit_chance: u32,
    /// Attack range in cells.
    pub range: u32,
    /// Sight range in cells; never below `range`.
    pub sight_range: u32,
    /// Ability identifier.
    pub ability: AbilityId,
    /// Held items.
    pub items: BTreeSet<HeldItem>,
}

impl Default for CombatantSpec {
    fn default() -> Self {
        Self {
            index: "0000".to_string(),
            team: Team::Blue,
            position: GridPos::new(0, 0),
            max_hp: 100,
            attack: 10,
            pp: 0,
            max_pp: 100,
            attack_speed: Fixed::ONE,
            crit_chance: 10,
            range: 1,
            sight_range: 16,
            ability: AbilityId::new("strike"),
            items: BTreeSet::new(),
        }
    }
}

/// A single unit participating in a battle.
///
/// The combatant owns its command queue. It is referenced from the board
/// only by id, so removing it from the board never leaves a dangling
/// pointer in anyone's delayed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique id within the room.
    pub id: EntityId,
    /// Unit index used to look up animation metadata.
    pub index: String,
    /// Side.
    pub team: Team,
    /// Current cell.
    pub position: GridPos,
    /// Remembered target cell, or [`GridPos::NONE`].
    pub target: GridPos,
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Basic attack damage.
    pub attack: u32,
    pp: u32,
    /// PP needed to cast.
    pub max_pp: u32,
    /// Time until the current state acts again (ms, never negative).
    #[serde(with = "fixed_serde")]
    pub cooldown: Fixed,
    #[serde(with = "fixed_serde")]
    attack_speed: Fixed,
    /// Critical hit chance in percent.
    pub crit_chance: u32,
    /// Attack range in cells.
    pub range: u32,
    /// Sight range in cells.
    pub sight_range: u32,
    /// Held items.
    pub items: BTreeSet<HeldItem>,
    /// Active statuses.
    pub status: StatusSet,
    /// Ability identifier.
    pub ability: AbilityId,
    /// Pending delayed effects.
    pub commands: CommandQueue,
    /// Display tag for remote observers.
    pub action: ActionState,
    /// Current state machine state.
    pub state: StateKind,
    /// Cleared while the unit is invulnerable or phased out.
    pub targetable: bool,
    /// Telemetry.
    pub counters: CombatCounters,
}

impl Combatant {
    /// Create a combatant from a spec, clamping values into their invariants.
    #[must_use]
    pub fn new(id: EntityId, spec: CombatantSpec, config: &ArenaConfig) -> Self {
        let max_hp = spec.max_hp.max(1);
        Self {
            id,
            index: spec.index,
            team: spec.team,
            position: spec.position,
            target: GridPos::NONE,
            hp: max_hp,
            max_hp,
            attack: spec.attack,
            pp: spec.pp.min(spec.max_pp),
            max_pp: spec.max_pp,
            cooldown: Fixed::ZERO,
            attack_speed: config.clamp_attack_speed(spec.attack_speed),
            crit_chance: spec.crit_chance,
            range: spec.range,
            sight_range: spec.sight_range.max(spec.range),
            items: spec.items,
            status: StatusSet::new(),
            ability: spec.ability,
            commands: CommandQueue::new(),
            action: ActionState::Idle,
            state: StateKind::Idle,
            targetable: true,
            counters: CombatCounters::default(),
        }
    }

    /// Current PP.
    #[must_use]
    pub const fn pp(&self) -> u32 {
        self.pp
    }

    /// Set PP, clamped to `[0, max_pp]`.
    pub fn set_pp(&mut self, pp: u32) {
        self.pp = pp.min(self.max_pp);
    }

    /// Add PP, clamped to `max_pp`.
    pub fn add_pp(&mut self, amount: u32) {
        self.set_pp(self.pp.saturating_add(amount));
    }

    /// Whether the PP pool is full.
    #[must_use]
    pub const fn has_full_pp(&self) -> bool {
        self.pp >= self.max_pp
    }

    /// Attacks per second.
    #[must_use]
    pub const fn attack_speed(&self) -> Fixed {
        self.attack_speed
    }

    /// Time between two attack decisions (ms).
    #[must_use]
    pub fn attack_delay(&self) -> Fixed {
        MS_PER_SECOND
            .checked_div(self.attack_speed)
            .unwrap_or(MS_PER_SECOND)
    }

    /// Whether the unit is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Whether other units may currently select this one as a target.
    #[must_use]
    pub const fn is_targetable(&self) -> bool {
        self.targetable && self.hp > 0
    }

    /// Apply damage. Returns `true` when this brought the unit to zero hp.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        let was_alive = self.hp > 0;
        self.hp = self.hp.saturating_sub(amount);
        was_alive && self.hp == 0
    }

    /// Restore hit points, capped at `max_hp`.
    pub fn heal(&mut self, amount: u32) {
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
    }

    /// Whether a held item lets ability casts crit.
    #[must_use]
    pub fn can_crit_abilities(&self) -> bool {
        self.items.iter().any(|item| item.enables_ability_crit())
    }

    /// Critical hit chance including item bonuses, as a probability.
    #[must_use]
    pub fn crit_probability(&self) -> Fixed {
        let bonus: u32 = self.items.iter().map(|item| item.crit_chance_bonus()).sum();
        percent_to_probability(self.crit_chance.saturating_add(bonus))
    }

    /// Tick the cooldown down by `dt`, flooring at zero.
    pub fn tick_cooldown(&mut self, dt: Fixed) {
        self.cooldown = (self.cooldown - dt).max(Fixed::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(spec: CombatantSpec) -> Combatant {
        Combatant::new(1, spec, &ArenaConfig::default())
    }

    #[test]
    fn test_pp_is_clamped() {
        let mut c = unit(CombatantSpec {
            pp: 500,
            max_pp: 80,
            ..Default::default()
        });
        assert_eq!(c.pp(), 80);
        assert!(c.has_full_pp());

        c.set_pp(10);
        c.add_pp(u32::MAX);
        assert_eq!(c.pp(), 80);
    }

    #[test]
    fn test_attack_delay_follows_speed() {
        let c = unit(CombatantSpec {
            attack_speed: Fixed::from_num(2),
            ..Default::default()
        });
        assert_eq!(c.attack_delay(), Fixed::from_num(500));
    }

    #[test]
    fn test_attack_speed_is_clamped_away_from_zero() {
        let c = unit(CombatantSpec {
            attack_speed: Fixed::ZERO,
            ..Default::default()
        });
        assert!(c.attack_speed() > Fixed::ZERO);
        assert_eq!(c.attack_delay(), Fixed::from_num(1000) / c.attack_speed());
    }

    #[test]
    fn test_cooldown_floors_at_zero() {
        let mut c = unit(CombatantSpec::default());
        c.cooldown = Fixed::from_num(30);
        c.tick_cooldown(Fixed::from_num(50));
        assert_eq!(c.cooldown, Fixed::ZERO);
    }

    #[test]
    fn test_damage_and_heal() {
        let mut c = unit(CombatantSpec {
            max_hp: 50,
            ..Default::default()
        });
        assert!(!c.take_damage(20));
        c.heal(100);
        assert_eq!(c.hp, 50);
        assert!(c.take_damage(80));
        assert!(!c.is_alive());
        assert!(!c.is_targetable());
        // Already dead: further damage is not a new kill.
        assert!(!c.take_damage(5));
    }

    #[test]
    fn test_crit_probability_includes_items() {
        let mut c = unit(CombatantSpec {
            crit_chance: 20,
            ..Default::default()
        });
        assert!(!c.can_crit_abilities());
        c.items.insert(HeldItem::ScopeLens);
        c.items.insert(HeldItem::ReaperCloth);
        assert!(c.can_crit_abilities());
        assert_eq!(c.crit_probability(), Fixed::from_num(30) / Fixed::from_num(100));
    }

    #[test]
    fn test_sight_never_below_range() {
        let c = unit(CombatantSpec {
            range: 4,
            sight_range: 2,
            ..Default::default()
        });
        assert_eq!(c.sight_range, 4);
    }
}
