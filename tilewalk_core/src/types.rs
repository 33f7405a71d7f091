// Core vocabulary shared across the puzzle core.
//
// Defines the tile identifier (`TileId`), the discrete spatial cell
// (`TileIndex`), world-space transforms, the six cardinal link directions
// with their `opposite()` involution, the neighbour walk rule, and the
// colour / power-up enums. Everything derives `Serialize`/`Deserialize`
// because these types appear verbatim in level files and events.
//
// Axis conventions for `TileIndex` and `Transform`:
// - X: east  (positive) / west  (negative)
// - Y: up    (positive) / down  (negative)
// - Z: north (positive) / south (negative)
//
// **Critical constraint: determinism.** `Direction::ALL` fixes the order in
// which every algorithm enumerates links; tie-breaks depend on it.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers and spatial types
// ---------------------------------------------------------------------------

/// Stable integer id of a tile. Ids come from level files, so they are not
/// guaranteed to be dense or positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub i32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileId({})", self.0)
    }
}

/// The discrete cell a tile occupies. Trees placed close together can
/// compute the same cell for different tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TileIndex {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The cell reached by stepping once in `direction` under `rule`.
    pub fn step(self, direction: Direction, rule: WalkRule) -> Self {
        let [dx, dy, dz] = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy + rule.vertical_offset(),
            z: self.z + dz,
        }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// World-space placement of a tile: position plus Euler orientation in
/// degrees. Carried through root descriptors so a rebuilt level lands where
/// it was authored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub orientation: [f32; 3],
}

impl Transform {
    /// Unrotated transform at `position`.
    pub const fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            orientation: [0.0; 3],
        }
    }

    /// Squared world distance between the two positions.
    pub fn distance_squared(&self, other: &Transform) -> f32 {
        let dx = self.position[0] - other.position[0];
        let dy = self.position[1] - other.position[1];
        let dz = self.position[2] - other.position[2];
        dx * dx + dy * dy + dz * dz
    }
}

// ---------------------------------------------------------------------------
// Link vocabulary
// ---------------------------------------------------------------------------

/// A link slot on a tile. `None` marks an origin tile's insertion rule and is
/// never a valid slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
    None,
}

impl Direction {
    /// The six real slots in enumeration order.
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// The slot on the far side of a link. `None` maps to itself.
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::None => Direction::None,
        }
    }

    /// Position in `ALL`, or `None` for `Direction::None`.
    pub fn slot(self) -> Option<usize> {
        match self {
            Direction::North => Some(0),
            Direction::South => Some(1),
            Direction::East => Some(2),
            Direction::West => Some(3),
            Direction::Up => Some(4),
            Direction::Down => Some(5),
            Direction::None => None,
        }
    }

    /// Unit step in index space.
    pub fn offset(self) -> [i32; 3] {
        match self {
            Direction::North => [0, 0, 1],
            Direction::South => [0, 0, -1],
            Direction::East => [1, 0, 0],
            Direction::West => [-1, 0, 0],
            Direction::Up => [0, 1, 0],
            Direction::Down => [0, -1, 0],
            Direction::None => [0, 0, 0],
        }
    }
}

/// Geometric class of the step used to place a new neighbour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WalkRule {
    #[default]
    Plain,
    Up,
    Down,
}

impl WalkRule {
    /// Cells climbed (+1) or descended (-1) by one step under this rule.
    pub fn vertical_offset(self) -> i32 {
        match self {
            WalkRule::Plain => 0,
            WalkRule::Up => 1,
            WalkRule::Down => -1,
        }
    }

    /// The rule that walks the same edge from the other end.
    pub fn inverse(self) -> Self {
        match self {
            WalkRule::Plain => WalkRule::Plain,
            WalkRule::Up => WalkRule::Down,
            WalkRule::Down => WalkRule::Up,
        }
    }
}

// ---------------------------------------------------------------------------
// Puzzle enums
// ---------------------------------------------------------------------------

/// Puzzle colour. `None` is the sentinel for ungenerated (editor, ghost,
/// map-overview) tiles and never forms a combo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileColor {
    #[default]
    None,
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Orange,
}

impl TileColor {
    pub const PLAYABLE: [TileColor; 6] = [
        TileColor::Red,
        TileColor::Green,
        TileColor::Blue,
        TileColor::Yellow,
        TileColor::Purple,
        TileColor::Orange,
    ];
}

/// Special effect carried by a tile, fired when the tile is removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUp {
    #[default]
    None,
    /// Sweeps the straight line north and south of the tile.
    NorthSouthLine,
    /// Sweeps the straight line east and west of the tile.
    EastWestLine,
    /// Sweeps every tile sharing the tile's colour.
    ColorMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
        }
        assert_eq!(Direction::None.opposite(), Direction::None);
    }

    #[test]
    fn opposite_offsets_cancel() {
        for d in Direction::ALL {
            let a = d.offset();
            let b = d.opposite().offset();
            assert_eq!([a[0] + b[0], a[1] + b[1], a[2] + b[2]], [0, 0, 0]);
        }
    }

    #[test]
    fn slots_follow_enumeration_order() {
        for (i, d) in Direction::ALL.iter().enumerate() {
            assert_eq!(d.slot(), Some(i));
        }
        assert_eq!(Direction::None.slot(), None);
    }

    #[test]
    fn step_applies_rule_vertically() {
        let origin = TileIndex::new(0, 0, 0);
        assert_eq!(origin.step(Direction::North, WalkRule::Plain), TileIndex::new(0, 0, 1));
        assert_eq!(origin.step(Direction::East, WalkRule::Up), TileIndex::new(1, 1, 0));
        assert_eq!(origin.step(Direction::West, WalkRule::Down), TileIndex::new(-1, -1, 0));
    }

    #[test]
    fn transform_distance_squared() {
        let a = Transform::at([0.0, 0.0, 0.0]);
        let b = Transform::at([1.0, 2.0, 2.0]);
        assert_eq!(a.distance_squared(&b), 9.0);
    }

    #[test]
    fn direction_serializes_by_name() {
        let json = serde_json::to_string(&Direction::North).unwrap();
        assert_eq!(json, "\"North\"");
        let back: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Direction::North);
    }
}
