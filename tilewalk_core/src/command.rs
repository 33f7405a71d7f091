// Commands that mutate a loaded level map.
//
// All external mutations to a `LevelMap` can be expressed as a
// `MapCommand`, applied with `LevelMap::apply()`. Input handling, the
// editor UI and replay tooling build commands; the map validates them
// against its state machine and returns the resulting events.
//
// Current commands:
// - `RemoveTile`: player click on a tile (gameplay removal sequence).
// - `Pause` / `Resume` / `FinishLevel`: lock handling.
// - `EditorInsert` / `EditorAddRoot` / `EditorDelete`: editor geometry.
// - `EditorPlay` / `EditorStop`: play-test an editor map and come back.
// - `SetPowerUp`: hand a power-up to a tile (editor and debug tooling).
//
// See also: `level_map.rs` for the handlers.

use crate::types::{Direction, PowerUp, TileId, WalkRule};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapCommand {
    RemoveTile {
        tile: TileId,
    },
    Pause,
    Resume,
    FinishLevel,
    /// Attach a new tile next to `parent`.
    EditorInsert {
        parent: TileId,
        direction: Direction,
        rule: WalkRule,
    },
    /// Place a free-standing root at a world position.
    EditorAddRoot {
        position: [f32; 3],
    },
    EditorDelete {
        tile: TileId,
    },
    EditorPlay,
    EditorStop,
    SetPowerUp {
        tile: TileId,
        power_up: PowerUp,
    },
}
