//! The battlefield grid.
//!
//! Each cell holds at most one occupant id. The board never owns a
//! combatant; it only answers "who stands here" and "how far apart are
//! these cells".
//!
//! # Scan order
//!
//! Every "nearest" query walks the board row by row (`y` outer, `x` inner)
//! and keeps the first candidate at the best distance. That order is the
//! tie-break, so it must never change.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::error::{GameError, Result};
use crate::math::{DistanceMetric, GridPos};

/// A width × height grid of optional occupant ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: u32,
    height: u32,
    metric: DistanceMetric,
    cells: Vec<Option<EntityId>>,
}

impl Board {
    /// Create an empty board.
    #[must_use]
    pub fn new(width: u32, height: u32, metric: DistanceMetric) -> Self {
        Self {
            width,
            height,
            metric,
            cells: vec![None; width as usize * height as usize],
        }
    }

    /// Columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Distance metric in use.
    #[must_use]
    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Whether `pos` addresses a cell on this board.
    #[must_use]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn slot(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    /// Occupant of a cell. Off-board cells and the sentinel are empty.
    #[must_use]
    pub fn get(&self, pos: GridPos) -> Option<EntityId> {
        self.slot(pos).and_then(|i| self.cells[i])
    }

    /// Whether a cell is on the board and empty.
    #[must_use]
    pub fn is_free(&self, pos: GridPos) -> bool {
        self.slot(pos).is_some_and(|i| self.cells[i].is_none())
    }

    /// Put a unit on an empty cell.
    pub fn place(&mut self, pos: GridPos, id: EntityId) -> Result<()> {
        let slot = self.slot(pos).ok_or(GameError::CellOutOfBounds(pos))?;
        if let Some(occupant) = self.cells[slot] {
            return Err(GameError::CellOccupied {
                cell: pos,
                occupant,
            });
        }
        self.cells[slot] = Some(id);
        Ok(())
    }

    /// Clear a cell, returning whoever stood there.
    pub fn remove(&mut self, pos: GridPos) -> Option<EntityId> {
        let slot = self.slot(pos)?;
        self.cells[slot].take()
    }

    /// Move the occupant of `from` onto the empty cell `to`.
    pub fn move_occupant(&mut self, from: GridPos, to: GridPos) -> Result<()> {
        let id = self.get(from).ok_or_else(|| {
            GameError::InvalidState(format!("No occupant to move at {from}"))
        })?;
        self.place(to, id)?;
        self.remove(from);
        Ok(())
    }

    /// Distance between two cells under the board's metric.
    #[must_use]
    pub fn distance(&self, a: GridPos, b: GridPos) -> u32 {
        self.metric.distance(a, b)
    }

    /// Occupied cells in scan order.
    pub fn occupants(&self) -> impl Iterator<Item = (GridPos, EntityId)> + '_ {
        let width = self.width as usize;
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.map(|id| (GridPos::new((i % width) as i32, (i / width) as i32), id))
        })
    }

    /// On-board cells one step away from `pos`, in movement order.
    pub fn neighbours(&self, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
        self.metric
            .step_offsets()
            .iter()
            .map(move |&(dx, dy)| GridPos::new(pos.x + dx, pos.y + dy))
            .filter(|next| self.in_bounds(*next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_get_remove() {
        let mut board = Board::new(4, 3, DistanceMetric::Chebyshev);
        let pos = GridPos::new(2, 1);
        board.place(pos, 7).unwrap();
        assert_eq!(board.get(pos), Some(7));
        assert!(!board.is_free(pos));

        let err = board.place(pos, 8).unwrap_err();
        assert!(matches!(err, GameError::CellOccupied { occupant: 7, .. }));

        assert_eq!(board.remove(pos), Some(7));
        assert!(board.is_free(pos));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut board = Board::new(4, 3, DistanceMetric::Chebyshev);
        assert_eq!(board.get(GridPos::NONE), None);
        assert_eq!(board.get(GridPos::new(4, 0)), None);
        assert!(!board.is_free(GridPos::new(0, 3)));
        assert!(matches!(
            board.place(GridPos::new(-1, 0), 1),
            Err(GameError::CellOutOfBounds(_))
        ));
    }

    #[test]
    fn test_occupants_follow_scan_order() {
        let mut board = Board::new(3, 3, DistanceMetric::Chebyshev);
        board.place(GridPos::new(2, 0), 1).unwrap();
        board.place(GridPos::new(0, 1), 2).unwrap();
        board.place(GridPos::new(1, 0), 3).unwrap();

        let order: Vec<_> = board.occupants().map(|(_, id)| id).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_move_occupant() {
        let mut board = Board::new(3, 3, DistanceMetric::Chebyshev);
        board.place(GridPos::new(0, 0), 5).unwrap();
        board.move_occupant(GridPos::new(0, 0), GridPos::new(1, 1)).unwrap();
        assert_eq!(board.get(GridPos::new(1, 1)), Some(5));
        assert_eq!(board.get(GridPos::new(0, 0)), None);
    }

    #[test]
    fn test_neighbours_stay_on_board() {
        let board = Board::new(3, 3, DistanceMetric::Chebyshev);
        assert_eq!(board.neighbours(GridPos::new(0, 0)).count(), 3);
        assert_eq!(board.neighbours(GridPos::new(1, 1)).count(), 8);

        let board = Board::new(3, 3, DistanceMetric::Manhattan);
        assert_eq!(board.neighbours(GridPos::new(1, 1)).count(), 4);
    }
}
