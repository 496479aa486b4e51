//! Error types for the combat core.
//!
//! The tick loop itself has almost nothing that can fail: degenerate data
//! (missing targets, bad timing metadata) is handled by policy inside the
//! states. What remains are configuration bugs and misuse of the room API.

use thiserror::Error;

use crate::abilities::AbilityId;
use crate::components::EntityId;
use crate::math::GridPos;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the combat core.
#[derive(Debug, Error)]
pub enum GameError {
    /// A combatant references an ability the dispatch table does not know.
    #[error("No ability strategy registered for '{ability}' (unit {unit})")]
    UnknownAbility {
        /// The missing ability identifier.
        ability: AbilityId,
        /// The combatant that referenced it.
        unit: EntityId,
    },

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// A coordinate outside the board was used for placement or movement.
    #[error("Cell {0} is outside the board")]
    CellOutOfBounds(GridPos),

    /// Placement or movement into a cell that already holds a unit.
    #[error("Cell {cell} is already occupied by unit {occupant}")]
    CellOccupied {
        /// The requested cell.
        cell: GridPos,
        /// The unit already standing there.
        occupant: EntityId,
    },

    /// Invalid room or combatant state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Data file parsing error.
    #[error("Failed to parse {source_name}: {message}")]
    ConfigParse {
        /// What was being parsed (file name or data kind).
        source_name: String,
        /// Error message.
        message: String,
    },
}
