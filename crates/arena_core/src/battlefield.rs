//! Combatant storage plus the grid they stand on.
//!
//! The [`Battlefield`] is what states and commands see of the world. It owns
//! every combatant that is currently *not* acting. The room takes the acting
//! combatant out of storage for the duration of its update, so lookups
//! through the board never alias the `&mut Combatant` being updated: the
//! actor's own cell resolves to `None` while it acts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::combatant::{Combatant, CombatantSpec};
use crate::components::EntityId;
use crate::config::ArenaConfig;
use crate::error::{GameError, Result};
use crate::math::GridPos;

/// Storage for combatants with deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatantStorage {
    units: HashMap<EntityId, Combatant>,
    next_id: EntityId,
}

impl CombatantStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate the next id.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Id the next [`allocate_id`](Self::allocate_id) will return.
    #[must_use]
    pub fn next_id(&self) -> EntityId {
        self.next_id.max(1)
    }

    /// Store a combatant under its own id.
    pub fn insert(&mut self, unit: Combatant) {
        self.units.insert(unit.id, unit);
    }

    /// Remove a combatant by id.
    pub fn remove(&mut self, id: EntityId) -> Option<Combatant> {
        self.units.remove(&id)
    }

    /// Get a combatant by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a combatant by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.units.get_mut(&id)
    }

    /// Check if a combatant exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.units.contains_key(&id)
    }

    /// Get the number of combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate in id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Combatant> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.units.get(&id))
    }
}

/// The grid and every combatant not currently acting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battlefield {
    board: Board,
    units: CombatantStorage,
}

impl Battlefield {
    /// Create an empty battlefield sized by `config`.
    #[must_use]
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            board: Board::new(
                config.board_width,
                config.board_height,
                config.distance_metric,
            ),
            units: CombatantStorage::new(),
        }
    }

    /// The grid.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Stored combatants.
    #[must_use]
    pub const fn units(&self) -> &CombatantStorage {
        &self.units
    }

    /// Create a combatant and place it on its starting cell.
    pub fn spawn(&mut self, spec: CombatantSpec, config: &ArenaConfig) -> Result<EntityId> {
        let position = spec.position;
        if !self.board.is_free(position) {
            return Err(match self.board.get(position) {
                Some(occupant) => GameError::CellOccupied {
                    cell: position,
                    occupant,
                },
                None => GameError::CellOutOfBounds(position),
            });
        }
        let id = self.units.allocate_id();
        self.board.place(position, id)?;
        self.units.insert(Combatant::new(id, spec, config));
        Ok(id)
    }

    /// Combatant by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.units.get(id)
    }

    /// Mutable combatant by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.units.get_mut(id)
    }

    /// Sorted ids of stored combatants.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        self.units.sorted_ids()
    }

    /// Take a combatant out of storage so it can act. Its cell stays marked.
    pub fn take(&mut self, id: EntityId) -> Result<Combatant> {
        self.units.remove(id).ok_or(GameError::EntityNotFound(id))
    }

    /// Return a combatant taken with [`take`](Self::take).
    pub fn put_back(&mut self, unit: Combatant) {
        self.units.insert(unit);
    }

    /// Remove a combatant from the grid without dropping it from storage.
    pub fn vacate(&mut self, id: EntityId) {
        if let Some(unit) = self.units.get(id) {
            let pos = unit.position;
            if self.board.get(pos) == Some(id) {
                self.board.remove(pos);
            }
        }
    }

    /// Move `unit` one cell, keeping the grid and its position in sync.
    pub fn relocate(&mut self, unit: &mut Combatant, to: GridPos) -> Result<()> {
        self.board.move_occupant(unit.position, to)?;
        unit.position = to;
        Ok(())
    }

    /// Combatant standing on `pos`.
    #[must_use]
    pub fn occupant(&self, pos: GridPos) -> Option<&Combatant> {
        self.board.get(pos).and_then(|id| self.units.get(id))
    }

    /// Mutable combatant standing on `pos`.
    pub fn occupant_mut(&mut self, pos: GridPos) -> Option<&mut Combatant> {
        let id = self.board.get(pos)?;
        self.units.get_mut(id)
    }

    /// Distance between two cells.
    #[must_use]
    pub fn distance(&self, a: GridPos, b: GridPos) -> u32 {
        self.board.distance(a, b)
    }

    /// Whether the occupant of `pos` is a usable target for `unit`:
    /// present, hostile, targetable and within attack range.
    #[must_use]
    pub fn is_valid_target(&self, unit: &Combatant, pos: GridPos) -> bool {
        self.occupant(pos).is_some_and(|other| {
            other.team != unit.team
                && other.is_targetable()
                && self.distance(unit.position, pos) <= unit.range
        })
    }

    /// Nearest targetable enemy of `unit` within `radius`.
    ///
    /// Ties go to the first candidate in scan order.
    #[must_use]
    pub fn nearest_enemy_within(&self, unit: &Combatant, radius: u32) -> Option<GridPos> {
        let mut best: Option<(u32, GridPos)> = None;
        for (pos, id) in self.board.occupants() {
            let Some(other) = self.units.get(id) else {
                continue;
            };
            if other.team == unit.team || !other.is_targetable() {
                continue;
            }
            let distance = self.distance(unit.position, pos);
            if distance > radius {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, pos));
            }
        }
        best.map(|(_, pos)| pos)
    }

    /// Nearest enemy within attack range.
    #[must_use]
    pub fn nearest_target_at_range(&self, unit: &Combatant) -> Option<GridPos> {
        self.nearest_enemy_within(unit, unit.range)
    }

    /// Nearest enemy within sight range.
    #[must_use]
    pub fn nearest_target_at_sight(&self, unit: &Combatant) -> Option<GridPos> {
        self.nearest_enemy_within(unit, unit.sight_range)
    }

    /// Cells a confused `unit` may lash out at: every targetable occupant
    /// other than itself within attack range, of either team, at the
    /// smallest distance found. Returned in scan order.
    #[must_use]
    pub fn confused_candidates(&self, unit: &Combatant) -> Vec<GridPos> {
        let mut best = u32::MAX;
        let mut candidates = Vec::new();
        for (pos, id) in self.board.occupants() {
            if id == unit.id {
                continue;
            }
            let Some(other) = self.units.get(id) else {
                continue;
            };
            if !other.is_targetable() {
                continue;
            }
            let distance = self.distance(unit.position, pos);
            if distance > unit.range || distance > best {
                continue;
            }
            if distance < best {
                best = distance;
                candidates.clear();
            }
            candidates.push(pos);
        }
        candidates
    }

    /// Free neighbouring cell that brings `unit` strictly closer to `goal`.
    ///
    /// Candidates are tried in the metric's step order; the first closest wins.
    #[must_use]
    pub fn step_toward(&self, unit: &Combatant, goal: GridPos) -> Option<GridPos> {
        let current = self.distance(unit.position, goal);
        let mut best: Option<(u32, GridPos)> = None;
        for next in self.board.neighbours(unit.position) {
            if !self.board.is_free(next) {
                continue;
            }
            let distance = self.distance(next, goal);
            if distance >= current {
                continue;
            }
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, next));
            }
        }
        best.map(|(_, pos)| pos)
    }
}
