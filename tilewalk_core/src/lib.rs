// tilewalk_core, the puzzle core of the tilewalk tile-matching game.
//
// This crate contains all puzzle logic: the tile forest and its mutation
// protocol, the path and region algorithms, the flat level format with its
// layered builder, and the level map state machine that sequences player
// removals, combos and power-ups. It has no rendering, audio or input
// dependencies and can be tested, benchmarked and run headless.
//
// Module overview:
// - `types.rs`:        TileId, TileIndex, Transform, Direction, WalkRule, TileColor, PowerUp.
// - `tile.rs`:         Tile node: link slots, puzzle state, memoized paths.
// - `forest.rs`:       Tile arena, link discipline, insert/remove with root reassignment, occupancy oracle.
// - `paths.rs`:        Shortest leaf path, colour patch, root connectivity, straight path, chain refresh.
// - `instructions.rs`: RootDescriptor / Instruction / LevelData, flatten and the layered builder.
// - `factory.rs`:      TileFactory trait and the seeded PaletteFactory.
// - `state.rs`:        MapState and the transition table.
// - `event.rs`:        MapEvent, StepResult and the per-kind EventBus.
// - `level_map.rs`:    LevelMap: load, player removal sequence, pause, editor operations.
// - `command.rs`:      MapCommand, every external mutation of a LevelMap.
// - `view.rs`:         TileViewTable, an id-keyed presentation lookup.
// - `config.rs`:       MapConfig with palette, combo thresholds, geometry, seed.
// - `error.rs`:        TileError.
//
// **Critical constraint: determinism.** All randomness comes from a seeded
// `tilewalk_prng::GameRng`. No `HashMap` iteration, no system time. Use
// `BTreeMap` for ordered collections.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod forest;
pub mod instructions;
pub mod level_map;
pub mod paths;
pub mod state;
pub mod tile;
pub mod types;
pub mod view;

pub use error::{Result, TileError};
pub use level_map::{LevelMap, MapMode};
