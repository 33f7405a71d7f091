// The tile node: one vertex of the puzzle forest.
//
// A `Tile` stores its own puzzle state (colour, power-up, root flag), its
// placement (`TileIndex` cell plus world `Transform`), a fixed six-slot link
// table addressed by `Direction::slot()`, and two memoized algorithm results.
//
// Tiles never hold references to other tiles, only `TileId`s into the arena
// owned by `Forest` (see `forest.rs`). Link symmetry is the forest's job:
// the raw slot setters here are `pub(crate)` so nothing outside the crate can
// create a one-sided link.
//
// The cached `shortest_leaf_path` / `matching_color_patch` are filled by
// `paths::chain_refresh` and cleared by `invalidate_caches`. They are skipped
// during serialization since they are derived data.

use crate::types::{Direction, PowerUp, TileColor, TileId, TileIndex, Transform, WalkRule};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Neighbour list in direction enumeration order. Never more than six.
pub type Neighbors = SmallVec<[(Direction, TileId); 6]>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub index: TileIndex,
    pub transform: Transform,
    pub color: TileColor,
    pub power_up: PowerUp,
    pub is_root: bool,
    /// Direction and rule used when this tile was attached to its parent.
    /// `(Direction::None, WalkRule::Plain)` for a tile that was never
    /// attached (roots and spawned-but-unlinked tiles).
    pub insertion_rule: (Direction, WalkRule),
    links: [Option<TileId>; 6],
    #[serde(skip)]
    shortest_leaf_path: Option<Vec<TileId>>,
    #[serde(skip)]
    matching_color_patch: Option<Vec<TileId>>,
}

impl Tile {
    /// An unlinked, non-root tile with no colour.
    pub fn new(id: TileId) -> Self {
        Self {
            id,
            index: TileIndex::default(),
            transform: Transform::default(),
            color: TileColor::None,
            power_up: PowerUp::None,
            is_root: false,
            insertion_rule: (Direction::None, WalkRule::Plain),
            links: [None; 6],
            shortest_leaf_path: None,
            matching_color_patch: None,
        }
    }

    /// Builder-style colour setter for fresh tiles.
    pub fn with_color(mut self, color: TileColor) -> Self {
        self.color = color;
        self
    }

    /// Neighbour in `direction`, if any. Always `None` for `Direction::None`.
    pub fn link(&self, direction: Direction) -> Option<TileId> {
        direction.slot().and_then(|slot| self.links[slot])
    }

    /// Occupied slots in `Direction::ALL` order.
    pub fn neighbors(&self) -> Neighbors {
        Direction::ALL
            .iter()
            .filter_map(|&d| self.link(d).map(|id| (d, id)))
            .collect()
    }

    /// Number of occupied slots.
    pub fn link_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    pub fn has_links(&self) -> bool {
        self.links.iter().any(Option::is_some)
    }

    /// At most one occupied link.
    pub fn is_leaf(&self) -> bool {
        self.link_count() <= 1
    }

    /// Direction in which `other` is linked, if it is a neighbour.
    pub fn direction_of(&self, other: TileId) -> Option<Direction> {
        Direction::ALL
            .iter()
            .copied()
            .find(|&d| self.link(d) == Some(other))
    }

    /// Memoized shortest leaf path from the last refresh, if still valid.
    pub fn cached_shortest_leaf_path(&self) -> Option<&[TileId]> {
        self.shortest_leaf_path.as_deref()
    }

    /// Memoized colour patch from the last refresh, if still valid.
    pub fn cached_color_patch(&self) -> Option<&[TileId]> {
        self.matching_color_patch.as_deref()
    }

    pub(crate) fn set_link(&mut self, direction: Direction, neighbor: Option<TileId>) {
        if let Some(slot) = direction.slot() {
            self.links[slot] = neighbor;
        }
    }

    pub(crate) fn set_cached_shortest_leaf_path(&mut self, path: Vec<TileId>) {
        self.shortest_leaf_path = Some(path);
    }

    pub(crate) fn set_cached_color_patch(&mut self, patch: Vec<TileId>) {
        self.matching_color_patch = Some(patch);
    }

    /// Forget both memoized results.
    pub fn invalidate_caches(&mut self) {
        self.shortest_leaf_path = None;
        self.matching_color_patch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tile_is_an_isolated_leaf() {
        let tile = Tile::new(TileId(4));
        assert!(tile.is_leaf());
        assert!(!tile.has_links());
        assert!(tile.neighbors().is_empty());
        assert_eq!(tile.insertion_rule, (Direction::None, WalkRule::Plain));
        assert_eq!(tile.color, TileColor::None);
    }

    #[test]
    fn neighbors_follow_direction_order() {
        let mut tile = Tile::new(TileId(1));
        tile.set_link(Direction::Down, Some(TileId(6)));
        tile.set_link(Direction::North, Some(TileId(2)));
        tile.set_link(Direction::East, Some(TileId(4)));
        let order: Vec<Direction> = tile.neighbors().iter().map(|(d, _)| *d).collect();
        assert_eq!(order, vec![Direction::North, Direction::East, Direction::Down]);
        assert_eq!(tile.direction_of(TileId(4)), Some(Direction::East));
        assert_eq!(tile.direction_of(TileId(9)), None);
        assert!(!tile.is_leaf());
    }

    #[test]
    fn none_direction_is_never_a_slot() {
        let mut tile = Tile::new(TileId(1));
        tile.set_link(Direction::None, Some(TileId(2)));
        assert!(!tile.has_links());
        assert_eq!(tile.link(Direction::None), None);
    }

    #[test]
    fn invalidate_clears_both_caches() {
        let mut tile = Tile::new(TileId(1));
        tile.set_cached_shortest_leaf_path(vec![TileId(1)]);
        tile.set_cached_color_patch(vec![TileId(1)]);
        tile.invalidate_caches();
        assert!(tile.cached_shortest_leaf_path().is_none());
        assert!(tile.cached_color_patch().is_none());
    }

    #[test]
    fn caches_are_not_serialized() {
        let mut tile = Tile::new(TileId(3)).with_color(TileColor::Blue);
        tile.set_cached_color_patch(vec![TileId(3)]);
        let json = serde_json::to_string(&tile).unwrap();
        let restored: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.color, TileColor::Blue);
        assert!(restored.cached_color_patch().is_none());
    }
}
