// Error taxonomy for the puzzle core.
//
// Link-discipline errors (`SlotOccupied`, `AlreadyLinked`, `SelfLink`) are
// local and recoverable: the caller picks another slot or drops the
// insertion. `InvalidInsertion` is an illegal edge surfaced as a rejected
// action. `MalformedInstructionSet` aborts a build before any forest is
// exposed. `MovementLocked` / `InvalidTransition` come from the level map's
// state machine. Nothing here is retried automatically.

use crate::state::MapState;
use crate::types::{Direction, TileId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TileError>;

#[derive(Debug, Error)]
pub enum TileError {
    #[error("{tile} already has a neighbour in slot {direction:?}")]
    SlotOccupied { tile: TileId, direction: Direction },

    #[error("{tile} already has a neighbour in slot {direction:?} (reverse side of the link)")]
    AlreadyLinked { tile: TileId, direction: Direction },

    #[error("{0} cannot be linked to itself")]
    SelfLink(TileId),

    #[error("invalid insertion: {0}")]
    InvalidInsertion(String),

    #[error("malformed instruction set: {0}")]
    MalformedInstructionSet(String),

    #[error("{0} is not part of this forest")]
    UnknownTile(TileId),

    #[error("movement is locked while the map is in state {0:?}")]
    MovementLocked(MapState),

    #[error("illegal map state transition {from:?} -> {to:?}")]
    InvalidTransition { from: MapState, to: MapState },

    #[error("every tile id is in use")]
    IdsExhausted,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
