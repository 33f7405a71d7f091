// Tile arena and the mutation protocol.
//
// `Forest` exclusively owns every live `Tile` in a `BTreeMap<TileId, Tile>`
// arena, a spatial index (`TileIndex` -> `TileId`) and the log of committed
// edges as `Instruction`s. All structural changes go through four entry
// points:
//
// - `add_neighbor` / `remove_neighbor`: symmetric link discipline between two
//   tiles already in the arena.
// - `add_root` / `insert` / `editor_insert`: bring a new tile into the arena,
//   either as an anchor or attached to a live parent.
// - `remove`: detach a tile, drop its edges, and run root reassignment so
//   every remaining component keeps exactly one root.
//
// Placement is geometric: a child's cell is the parent's cell stepped once in
// the link direction plus the walk rule's vertical offset, and its world
// position is the parent's position plus the same step scaled by
// `Placement`. Orientation is inherited from the parent. Cells ignore the
// root's orientation, so two trees can compute the same cell without
// overlapping in the world.
//
// The spatial index is therefore best-effort: the first tile to claim a cell
// holds it, and `insert` / `add_root` never fail on a taken cell. Only the
// graph rule (one tile per slot) can reject a core insertion. Editor
// insertion layers an `OccupancyOracle` on top of `insert`; the default
// oracle (`BoundsOccupancy`) rejects an occupied cell or a world position
// whose scaled bounds overlap another tile.
//
// See also: `paths.rs` for the read-only algorithms (and the cache refresh
// that `remove` triggers), `instructions.rs` for flatten/build.
//
// **Critical constraint: determinism.** Iteration over tiles is in `TileId`
// order (BTreeMap) and over links in `Direction::ALL` order.

use crate::config::MapConfig;
use crate::error::{Result, TileError};
use crate::instructions::{Instruction, RootDescriptor};
use crate::paths;
use crate::tile::{Neighbors, Tile};
use crate::types::{Direction, PowerUp, TileColor, TileId, TileIndex, Transform, WalkRule};
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// World-space scale of one index step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub tile_spacing: f32,
    pub vertical_step: f32,
}

impl Placement {
    /// Spacing and vertical step taken from the map config.
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            tile_spacing: config.tile_spacing,
            vertical_step: config.vertical_step,
        }
    }

    /// World offset of one step in `direction` under `rule`.
    pub fn offset(&self, direction: Direction, rule: WalkRule) -> [f32; 3] {
        let [dx, dy, dz] = direction.offset();
        [
            dx as f32 * self.tile_spacing,
            (dy + rule.vertical_offset()) as f32 * self.vertical_step,
            dz as f32 * self.tile_spacing,
        ]
    }

    /// Nearest cell for a world position. Used to index free-standing roots.
    pub fn index_for(&self, position: [f32; 3]) -> TileIndex {
        TileIndex::new(
            (position[0] / self.tile_spacing).round() as i32,
            (position[1] / self.vertical_step).round() as i32,
            (position[2] / self.tile_spacing).round() as i32,
        )
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::from_config(&MapConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// Geometry check consulted by editor insertion before the graph rule.
pub trait OccupancyOracle {
    /// True when a tile at `index` / `transform` would collide with a live
    /// tile.
    fn is_blocked(&self, forest: &Forest, index: TileIndex, transform: &Transform) -> bool;
}

/// Spatial index lookup plus an axis-aligned bounds overlap test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundsOccupancy {
    pub extent: [f32; 3],
    pub separation_factor: f32,
}

impl BoundsOccupancy {
    /// Tile extent and separation factor taken from the map config.
    pub fn from_config(config: &MapConfig) -> Self {
        Self {
            extent: config.tile_extent,
            separation_factor: config.separation_bounds_factor,
        }
    }

    fn overlaps(&self, a: &Transform, b: &Transform) -> bool {
        (0..3).all(|axis| {
            let reach = 2.0 * self.extent[axis] * self.separation_factor;
            (a.position[axis] - b.position[axis]).abs() < reach
        })
    }
}

impl OccupancyOracle for BoundsOccupancy {
    fn is_blocked(&self, forest: &Forest, index: TileIndex, transform: &Transform) -> bool {
        forest.tile_at(index).is_some()
            || forest
                .tiles()
                .any(|tile| self.overlaps(&tile.transform, transform))
    }
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

/// What a `remove` did to the rest of the forest.
#[derive(Clone, Debug)]
pub struct Removal {
    /// The released tile, unlinked.
    pub tile: Tile,
    /// Former neighbours, keyed by the removed tile's link direction.
    pub detached: Neighbors,
    /// Neighbours promoted to root because they lost their path to one.
    pub promoted: Vec<RootDescriptor>,
}

#[derive(Clone, Debug, Default)]
pub struct Forest {
    tiles: BTreeMap<TileId, Tile>,
    spatial: BTreeMap<TileIndex, TileId>,
    instructions: Vec<Instruction>,
    placement: Placement,
}

impl Forest {
    /// An empty forest with the default placement.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty forest that places tiles with `placement`.
    pub fn with_placement(placement: Placement) -> Self {
        Self {
            placement,
            ..Self::default()
        }
    }

    // -- queries ------------------------------------------------------------

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// The live tile with `id`, if any.
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub(crate) fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(&id)
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: TileId) -> bool {
        self.tiles.contains_key(&id)
    }

    /// Tiles in id order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Live ids in ascending order.
    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles.keys().copied()
    }

    /// Number of live tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// The tile holding `index` in the spatial index. When several tiles
    /// compute the same cell, the one that claimed it first.
    pub fn tile_at(&self, index: TileIndex) -> Option<TileId> {
        self.spatial.get(&index).copied()
    }

    /// Root ids in id order.
    pub fn roots(&self) -> Vec<TileId> {
        self.tiles
            .values()
            .filter(|t| t.is_root)
            .map(|t| t.id)
            .collect()
    }

    /// Committed edges in commit order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// An id no live tile uses: one above the highest live id, 1 for an
    /// empty forest. When the highest id is `i32::MAX`, the lowest free id
    /// counting up from 1 (then through the negatives).
    pub fn next_free_id(&self) -> Result<TileId> {
        let Some(last) = self.tiles.keys().next_back() else {
            return Ok(TileId(1));
        };
        if let Some(next) = last.0.checked_add(1) {
            return Ok(TileId(next));
        }
        (1..=i32::MAX)
            .chain(i32::MIN..1)
            .map(TileId)
            .find(|id| !self.tiles.contains_key(id))
            .ok_or(TileError::IdsExhausted)
    }

    /// Cell and world transform a child would get at `parent`'s `direction`.
    pub fn placement_for(
        &self,
        parent: TileId,
        direction: Direction,
        rule: WalkRule,
    ) -> Result<(TileIndex, Transform)> {
        let parent_tile = self.tiles.get(&parent).ok_or(TileError::UnknownTile(parent))?;
        let offset = self.placement.offset(direction, rule);
        let p = parent_tile.transform.position;
        let transform = Transform {
            position: [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]],
            orientation: parent_tile.transform.orientation,
        };
        Ok((parent_tile.index.step(direction, rule), transform))
    }

    // -- link discipline ----------------------------------------------------

    /// Link `candidate` into `source`'s `direction` slot, both sides, and
    /// stamp the candidate's insertion rule. Both tiles must be live.
    pub fn add_neighbor(
        &mut self,
        source: TileId,
        direction: Direction,
        rule: WalkRule,
        candidate: TileId,
    ) -> Result<()> {
        if candidate == source {
            return Err(TileError::SelfLink(source));
        }
        if direction == Direction::None {
            return Err(TileError::InvalidInsertion(format!(
                "{source} cannot link {candidate} without a direction"
            )));
        }
        let source_tile = self.tiles.get(&source).ok_or(TileError::UnknownTile(source))?;
        let candidate_tile = self
            .tiles
            .get(&candidate)
            .ok_or(TileError::UnknownTile(candidate))?;
        if source_tile.link(direction).is_some() {
            return Err(TileError::SlotOccupied {
                tile: source,
                direction,
            });
        }
        if candidate_tile.link(direction.opposite()).is_some() {
            return Err(TileError::AlreadyLinked {
                tile: candidate,
                direction: direction.opposite(),
            });
        }

        if let Some(tile) = self.tiles.get_mut(&source) {
            tile.set_link(direction, Some(candidate));
        }
        if let Some(tile) = self.tiles.get_mut(&candidate) {
            tile.set_link(direction.opposite(), Some(source));
            tile.insertion_rule = (direction, rule);
        }
        Ok(())
    }

    /// Clear `source`'s `direction` link on both sides. No-op when empty.
    pub fn remove_neighbor(&mut self, source: TileId, direction: Direction) {
        let Some(neighbor) = self.tiles.get(&source).and_then(|t| t.link(direction)) else {
            return;
        };
        if let Some(tile) = self.tiles.get_mut(&source) {
            tile.set_link(direction, None);
            tile.invalidate_caches();
        }
        if let Some(tile) = self.tiles.get_mut(&neighbor) {
            tile.set_link(direction.opposite(), None);
            tile.invalidate_caches();
        }
    }

    // -- insertion ----------------------------------------------------------

    /// Register `tile` as a free-standing root at `transform`. Fails only
    /// when the id is already live.
    pub fn add_root(&mut self, mut tile: Tile, transform: Transform) -> Result<TileId> {
        let id = tile.id;
        if self.tiles.contains_key(&id) {
            return Err(TileError::InvalidInsertion(format!("{id} is already live")));
        }
        let index = self.placement.index_for(transform.position);
        tile.is_root = true;
        tile.index = index;
        tile.transform = transform;
        tile.insertion_rule = (Direction::None, WalkRule::Plain);
        tile.invalidate_caches();
        self.claim_cell(index, id);
        self.tiles.insert(id, tile);
        debug!(%id, %index, "root registered");
        Ok(id)
    }

    /// Attach `tile` to `parent` through `direction` and place it.
    ///
    /// Rejected with `InvalidInsertion` when the parent's slot is taken or
    /// `tile` is already part of the forest. A cell already claimed by
    /// another tile is not an error here; see `editor_insert`.
    pub fn insert(
        &mut self,
        parent: TileId,
        direction: Direction,
        rule: WalkRule,
        mut tile: Tile,
    ) -> Result<TileId> {
        let id = tile.id;
        let parent_tile = self.tiles.get(&parent).ok_or(TileError::UnknownTile(parent))?;
        if let Some(occupant) = parent_tile.link(direction) {
            return Err(TileError::InvalidInsertion(format!(
                "{parent} already holds {occupant} to the {direction:?}"
            )));
        }
        if self.tiles.contains_key(&id) || tile.has_links() {
            return Err(TileError::InvalidInsertion(format!(
                "{id} is already part of the forest"
            )));
        }
        let (index, transform) = self.placement_for(parent, direction, rule)?;

        tile.is_root = false;
        tile.index = index;
        tile.transform = transform;
        tile.invalidate_caches();
        self.tiles.insert(id, tile);
        if let Err(err) = self.add_neighbor(parent, direction, rule, id) {
            self.tiles.remove(&id);
            return Err(err);
        }
        self.claim_cell(index, id);
        self.instructions.push(Instruction {
            root: parent,
            tile: id,
            direction,
            rule,
        });
        if let Some(parent_tile) = self.tiles.get_mut(&parent) {
            parent_tile.invalidate_caches();
        }
        debug!(%parent, %id, ?direction, ?rule, "tile inserted");
        Ok(id)
    }

    /// `insert`, after asking `oracle` whether the target spot is free.
    pub fn editor_insert(
        &mut self,
        parent: TileId,
        direction: Direction,
        rule: WalkRule,
        tile: Tile,
        oracle: &dyn OccupancyOracle,
    ) -> Result<TileId> {
        let (index, transform) = self.placement_for(parent, direction, rule)?;
        if oracle.is_blocked(self, index, &transform) {
            return Err(TileError::InvalidInsertion(format!(
                "spot {index} next to {parent} is occupied"
            )));
        }
        self.insert(parent, direction, rule, tile)
    }

    // -- removal ------------------------------------------------------------

    /// Remove `id` from the forest and repair root coverage.
    ///
    /// Every former neighbour that is no longer connected to a root is
    /// promoted, and the caches of every affected component are rebuilt.
    pub fn remove(&mut self, id: TileId) -> Result<Removal> {
        let detached = self
            .tiles
            .get(&id)
            .ok_or(TileError::UnknownTile(id))?
            .neighbors();
        for &(direction, _) in &detached {
            self.remove_neighbor(id, direction);
        }
        self.instructions.retain(|i| i.root != id && i.tile != id);
        let Some(mut tile) = self.tiles.remove(&id) else {
            return Err(TileError::UnknownTile(id));
        };
        self.release_cell(tile.index, id);
        tile.invalidate_caches();

        let mut promoted = Vec::new();
        for &(_, neighbor) in &detached {
            let needs_root = self
                .tiles
                .get(&neighbor)
                .is_some_and(|n| !n.is_root)
                && !paths::is_connected_to_root(self, neighbor);
            if needs_root {
                if let Some(n) = self.tiles.get_mut(&neighbor) {
                    n.is_root = true;
                    n.insertion_rule = (Direction::None, WalkRule::Plain);
                    promoted.push(RootDescriptor::of(n));
                }
                debug!(removed = %id, promoted = %neighbor, "root reassigned");
            }
        }
        for &(_, neighbor) in &detached {
            paths::chain_refresh(self, neighbor, Direction::None, true, true);
        }
        debug!(%id, neighbors = detached.len(), "tile removed");
        Ok(Removal {
            tile,
            detached,
            promoted,
        })
    }

    fn claim_cell(&mut self, index: TileIndex, id: TileId) {
        self.spatial.entry(index).or_insert(id);
    }

    // Hand the cell to the lowest-id tile still sitting in it.
    fn release_cell(&mut self, index: TileIndex, id: TileId) {
        if self.spatial.get(&index) != Some(&id) {
            return;
        }
        self.spatial.remove(&index);
        if let Some(heir) = self.tiles.values().find(|t| t.index == index) {
            self.spatial.insert(index, heir.id);
        }
    }

    // -- tile state ---------------------------------------------------------

    /// Recolour a tile. Its memoized paths are dropped when the colour
    /// actually changes.
    pub fn set_color(&mut self, id: TileId, color: TileColor) -> Result<()> {
        let tile = self.tiles.get_mut(&id).ok_or(TileError::UnknownTile(id))?;
        if tile.color != color {
            tile.color = color;
            tile.invalidate_caches();
        }
        Ok(())
    }

    /// Attach (or clear, with `PowerUp::None`) a tile's power-up.
    pub fn set_power_up(&mut self, id: TileId, power_up: PowerUp) -> Result<()> {
        let tile = self.tiles.get_mut(&id).ok_or(TileError::UnknownTile(id))?;
        tile.power_up = power_up;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rooted(id: i32) -> Forest {
        let mut forest = Forest::new();
        forest
            .add_root(Tile::new(TileId(id)), Transform::default())
            .unwrap();
        forest
    }

    fn grow(forest: &mut Forest, parent: i32, direction: Direction, id: i32) {
        forest
            .insert(TileId(parent), direction, WalkRule::Plain, Tile::new(TileId(id)))
            .unwrap();
    }

    #[test]
    fn insert_links_both_sides() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::East, 2);
        let a = forest.tile(TileId(1)).unwrap();
        let b = forest.tile(TileId(2)).unwrap();
        assert_eq!(a.link(Direction::East), Some(TileId(2)));
        assert_eq!(b.link(Direction::West), Some(TileId(1)));
        assert!(!b.is_root);
        assert_eq!(b.insertion_rule, (Direction::East, WalkRule::Plain));
        assert_eq!(forest.instructions().len(), 1);
    }

    #[test]
    fn insert_places_child_geometrically() {
        let mut forest = rooted(1);
        forest
            .insert(TileId(1), Direction::North, WalkRule::Up, Tile::new(TileId(2)))
            .unwrap();
        let child = forest.tile(TileId(2)).unwrap();
        assert_eq!(child.index, TileIndex::new(0, 1, 1));
        let placement = forest.placement();
        assert_eq!(
            child.transform.position,
            [0.0, placement.vertical_step, placement.tile_spacing]
        );
        assert_eq!(forest.tile_at(TileIndex::new(0, 1, 1)), Some(TileId(2)));
    }

    #[test]
    fn insert_into_occupied_slot_is_rejected() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        let err = forest
            .insert(TileId(1), Direction::North, WalkRule::Plain, Tile::new(TileId(3)))
            .unwrap_err();
        assert!(matches!(err, TileError::InvalidInsertion(_)));
        assert!(!forest.contains(TileId(3)));
        assert_eq!(forest.tile(TileId(1)).unwrap().link_count(), 1);
    }

    #[test]
    fn insert_of_live_id_is_rejected() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        let err = forest
            .insert(TileId(1), Direction::South, WalkRule::Plain, Tile::new(TileId(2)))
            .unwrap_err();
        assert!(matches!(err, TileError::InvalidInsertion(_)));
    }

    #[test]
    fn add_neighbor_on_occupied_slot_leaves_links_untouched() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        forest
            .add_root(Tile::new(TileId(3)), Transform::at([5.0, 0.0, 0.0]))
            .unwrap();
        let before_a = forest.tile(TileId(1)).unwrap().neighbors();
        let before_c = forest.tile(TileId(3)).unwrap().neighbors();

        let err = forest
            .add_neighbor(TileId(1), Direction::North, WalkRule::Plain, TileId(3))
            .unwrap_err();
        assert!(matches!(
            err,
            TileError::SlotOccupied {
                tile: TileId(1),
                direction: Direction::North
            }
        ));
        assert_eq!(forest.tile(TileId(1)).unwrap().neighbors(), before_a);
        assert_eq!(forest.tile(TileId(3)).unwrap().neighbors(), before_c);
    }

    #[test]
    fn add_neighbor_checks_reverse_slot() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        forest
            .add_root(Tile::new(TileId(3)), Transform::at([5.0, 0.0, 0.0]))
            .unwrap();
        // Tile 2's South slot already points at 1.
        let err = forest
            .add_neighbor(TileId(3), Direction::North, WalkRule::Plain, TileId(2))
            .unwrap_err();
        assert!(matches!(err, TileError::AlreadyLinked { tile: TileId(2), .. }));
    }

    #[test]
    fn add_neighbor_rejects_self_and_none() {
        let mut forest = rooted(1);
        assert!(matches!(
            forest.add_neighbor(TileId(1), Direction::East, WalkRule::Plain, TileId(1)),
            Err(TileError::SelfLink(TileId(1)))
        ));
        forest
            .add_root(Tile::new(TileId(2)), Transform::at([5.0, 0.0, 0.0]))
            .unwrap();
        assert!(matches!(
            forest.add_neighbor(TileId(1), Direction::None, WalkRule::Plain, TileId(2)),
            Err(TileError::InvalidInsertion(_))
        ));
    }

    #[test]
    fn remove_neighbor_clears_both_sides_and_tolerates_empty() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::West, 2);
        forest.remove_neighbor(TileId(1), Direction::West);
        assert!(!forest.tile(TileId(1)).unwrap().has_links());
        assert!(!forest.tile(TileId(2)).unwrap().has_links());
        forest.remove_neighbor(TileId(1), Direction::West);
    }

    #[test]
    fn removing_middle_tile_promotes_orphan() {
        // A(root) -North-> B -North-> C
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        grow(&mut forest, 2, Direction::North, 3);

        let removal = forest.remove(TileId(2)).unwrap();
        assert_eq!(removal.detached.len(), 2);
        assert_eq!(removal.promoted.len(), 1);
        assert_eq!(removal.promoted[0].id, TileId(3));
        assert_eq!(forest.roots(), vec![TileId(1), TileId(3)]);
        assert!(forest.instructions().is_empty());
        assert!(forest.tiles().all(|t| !t.has_links()));
    }

    #[test]
    fn removing_root_promotes_one_root_per_subtree() {
        //        2
        //        |
        //   4 -- 1 -- 3      1 is the root
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        grow(&mut forest, 1, Direction::East, 3);
        grow(&mut forest, 1, Direction::West, 4);
        grow(&mut forest, 3, Direction::North, 5);

        let removal = forest.remove(TileId(1)).unwrap();
        let promoted: Vec<TileId> = removal.promoted.iter().map(|r| r.id).collect();
        assert_eq!(promoted, vec![TileId(2), TileId(3), TileId(4)]);
        for id in forest.tile_ids().collect::<Vec<_>>() {
            assert!(paths::is_connected_to_root(&forest, id));
        }
        assert!(!forest.tile(TileId(5)).unwrap().is_root);
    }

    #[test]
    fn removing_leaf_promotes_nothing() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        grow(&mut forest, 2, Direction::East, 3);
        let removal = forest.remove(TileId(3)).unwrap();
        assert!(removal.promoted.is_empty());
        assert_eq!(forest.roots(), vec![TileId(1)]);
        assert_eq!(forest.tile_at(TileIndex::new(1, 0, 1)), None);
    }

    #[test]
    fn remove_refreshes_neighbor_caches() {
        let mut forest = rooted(1);
        grow(&mut forest, 1, Direction::North, 2);
        grow(&mut forest, 2, Direction::North, 3);
        forest.remove(TileId(3)).unwrap();
        let b = forest.tile(TileId(2)).unwrap();
        assert_eq!(
            b.cached_shortest_leaf_path(),
            Some(&[TileId(1), TileId(2)][..])
        );
    }

    #[test]
    fn remove_unknown_tile_is_an_error() {
        let mut forest = rooted(1);
        assert!(matches!(
            forest.remove(TileId(42)),
            Err(TileError::UnknownTile(TileId(42)))
        ));
    }

    #[test]
    fn editor_insert_respects_bounds() {
        let config = MapConfig::default();
        let oracle = BoundsOccupancy::from_config(&config);
        let mut forest = Forest::with_placement(Placement::from_config(&config));
        forest
            .add_root(Tile::new(TileId(1)), Transform::default())
            .unwrap();
        // A second root sitting exactly where 1's north child would go.
        forest
            .add_root(
                Tile::new(TileId(9)),
                Transform::at([0.0, 0.0, config.tile_spacing]),
            )
            .unwrap();

        let err = forest
            .editor_insert(
                TileId(1),
                Direction::North,
                WalkRule::Plain,
                Tile::new(TileId(2)),
                &oracle,
            )
            .unwrap_err();
        assert!(matches!(err, TileError::InvalidInsertion(_)));

        forest
            .editor_insert(
                TileId(1),
                Direction::East,
                WalkRule::Plain,
                Tile::new(TileId(2)),
                &oracle,
            )
            .unwrap();
        assert!(forest.contains(TileId(2)));
    }

    #[test]
    fn next_free_id_follows_highest() {
        let mut forest = Forest::new();
        assert_eq!(forest.next_free_id().unwrap(), TileId(1));
        forest
            .add_root(Tile::new(TileId(7)), Transform::default())
            .unwrap();
        assert_eq!(forest.next_free_id().unwrap(), TileId(8));
    }

    #[test]
    fn next_free_id_at_i32_max_reuses_a_gap() {
        let mut forest = Forest::new();
        forest
            .add_root(Tile::new(TileId(i32::MAX)), Transform::default())
            .unwrap();
        assert_eq!(forest.next_free_id().unwrap(), TileId(1));

        forest
            .add_root(Tile::new(TileId(1)), Transform::at([4.0, 0.0, 0.0]))
            .unwrap();
        forest
            .add_root(Tile::new(TileId(2)), Transform::at([8.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(forest.next_free_id().unwrap(), TileId(3));
    }

    #[test]
    fn shared_cell_does_not_block_insert() {
        // Root 10 sits two cells east; 1's east child and 10's west child
        // both compute cell (1, 0, 0).
        let mut forest = rooted(1);
        forest
            .add_root(
                Tile::new(TileId(10)),
                Transform {
                    position: [2.0, 0.0, 0.0],
                    orientation: [0.0, 90.0, 0.0],
                },
            )
            .unwrap();
        grow(&mut forest, 1, Direction::East, 2);
        grow(&mut forest, 10, Direction::West, 11);

        let first = forest.tile(TileId(2)).unwrap().index;
        assert_eq!(forest.tile(TileId(11)).unwrap().index, first);
        assert_eq!(forest.tile_at(first), Some(TileId(2)));
        assert_eq!(forest.instructions().len(), 2);

        // The cell passes to the tile still standing in it.
        forest.remove(TileId(2)).unwrap();
        assert_eq!(forest.tile_at(first), Some(TileId(11)));
    }

    #[test]
    fn roots_may_share_a_cell() {
        let mut forest = rooted(1);
        forest
            .add_root(Tile::new(TileId(2)), Transform::at([0.2, 0.0, 0.0]))
            .unwrap();
        assert_eq!(forest.roots(), vec![TileId(1), TileId(2)]);
        assert_eq!(forest.tile_at(TileIndex::new(0, 0, 0)), Some(TileId(1)));
    }

    #[test]
    fn set_color_invalidates_caches() {
        let mut forest = rooted(1);
        paths::chain_refresh(&mut forest, TileId(1), Direction::None, true, true);
        assert!(forest.tile(TileId(1)).unwrap().cached_color_patch().is_some());
        forest.set_color(TileId(1), TileColor::Red).unwrap();
        assert!(forest.tile(TileId(1)).unwrap().cached_color_patch().is_none());
    }
}
