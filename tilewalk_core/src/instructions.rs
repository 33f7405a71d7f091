// Instruction serialization and the layered builder.
//
// A forest serializes to a flat form: one `RootDescriptor` per root and one
// `Instruction` per edge, written from the root side. `LevelData` wraps that
// pair with level metadata and is the JSON interchange format for authored
// levels.
//
// `flatten` walks each root breadth-first (roots in id order, links in
// `Direction::ALL` order), so the output is canonical: two forests with the
// same topology and root set flatten identically.
//
// `build` reverses it layer by layer:
//   1. every root descriptor becomes a root tile (layer 0);
//   2. each following layer is made of the children of the previous one,
//      spawned through the `TileFactory` and attached with `Forest::insert`;
//   3. layers are returned in build order for batching by callers.
// Any instruction whose parent is never produced, any duplicate id, and any
// slot conflict aborts the whole build with `MalformedInstructionSet`. Tiles
// of different trees landing on the same cell are fine. The partially built
// forest is dropped.
//
// Colours are not part of the flat form; the factory regenerates them.

use crate::error::{Result, TileError};
use crate::factory::{TileFactory, TileVariant};
use crate::forest::{Forest, Placement};
use crate::tile::Tile;
use crate::types::{Direction, TileId, Transform, WalkRule};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// "`tile` hangs off `root` in `direction`, placed with `rule`."
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Instruction {
    pub root: TileId,
    pub tile: TileId,
    pub direction: Direction,
    pub rule: WalkRule,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootDescriptor {
    pub id: TileId,
    pub position: [f32; 3],
    pub orientation: [f32; 3],
}

impl RootDescriptor {
    /// Descriptor for a live root, at its current transform.
    pub fn of(tile: &Tile) -> Self {
        Self {
            id: tile.id,
            position: tile.transform.position,
            orientation: tile.transform.orientation,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            orientation: self.orientation,
        }
    }
}

/// Presentation metadata carried through unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelMetadata {
    pub id: String,
    /// Score needed to clear the level.
    pub target: u32,
    /// Camera framing size for the map.
    pub map_size: f32,
    /// Stars needed to unlock the level.
    pub stars_required: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default)]
    pub metadata: LevelMetadata,
    pub roots: Vec<RootDescriptor>,
    pub instructions: Vec<Instruction>,
}

impl LevelData {
    /// Parse a level file.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed level JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot a live forest.
    pub fn from_forest(metadata: LevelMetadata, forest: &Forest) -> Self {
        let (roots, instructions) = flatten(forest);
        Self {
            metadata,
            roots,
            instructions,
        }
    }
}

// ---------------------------------------------------------------------------
// Flatten
// ---------------------------------------------------------------------------

/// Canonical flat form of `forest`: roots in id order, then every edge
/// once, breadth-first from its root.
pub fn flatten(forest: &Forest) -> (Vec<RootDescriptor>, Vec<Instruction>) {
    let mut roots = Vec::new();
    let mut instructions = Vec::new();
    for root in forest.roots() {
        let Some(tile) = forest.tile(root) else {
            continue;
        };
        roots.push(RootDescriptor::of(tile));

        let mut queue = VecDeque::from([(root, Direction::None)]);
        while let Some((id, arrived_from)) = queue.pop_front() {
            let Some(parent) = forest.tile(id) else {
                continue;
            };
            for (direction, child) in parent.neighbors() {
                if direction == arrived_from {
                    continue;
                }
                instructions.push(Instruction {
                    root: id,
                    tile: child,
                    direction,
                    rule: edge_rule(forest, parent, direction, child),
                });
                queue.push_back((child, direction.opposite()));
            }
        }
    }
    (roots, instructions)
}

// The rule was stamped on whichever end was attached. After root promotion
// an edge can be walked from its former child side, so invert in that case.
fn edge_rule(forest: &Forest, parent: &Tile, direction: Direction, child: TileId) -> WalkRule {
    match forest.tile(child) {
        Some(c) if c.insertion_rule.0 == direction => c.insertion_rule.1,
        _ if parent.insertion_rule.0 == direction.opposite() => parent.insertion_rule.1.inverse(),
        _ => WalkRule::Plain,
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

pub struct BuildOutput {
    pub forest: Forest,
    /// Tile ids per layer in build order; layer 0 is the root set.
    pub layers: Vec<Vec<TileId>>,
}

/// Rebuild a forest from its flat form, one layer at a time.
///
/// Fails with `MalformedInstructionSet` on duplicate ids, slot conflicts,
/// or instructions whose parent is never built.
pub fn build(
    roots: &[RootDescriptor],
    instructions: &[Instruction],
    factory: &mut dyn TileFactory,
    variant: TileVariant,
    placement: Placement,
) -> Result<BuildOutput> {
    check_ids(roots, instructions)?;

    let mut forest = Forest::with_placement(placement);
    let mut first_layer = Vec::with_capacity(roots.len());
    for root in roots {
        let tile = factory.new_tile(root.id, variant);
        forest
            .add_root(tile, root.transform())
            .map_err(|e| malformed(format!("root {}: {e}", root.id)))?;
        first_layer.push(root.id);
    }

    // Children grouped by parent, keeping instruction order within a parent.
    let mut pending: BTreeMap<TileId, Vec<&Instruction>> = BTreeMap::new();
    for instruction in instructions {
        pending.entry(instruction.root).or_default().push(instruction);
    }

    let mut layers = vec![first_layer];
    loop {
        let Some(current) = layers.last() else {
            break;
        };
        let mut next = Vec::new();
        for parent in current {
            let Some(children) = pending.remove(parent) else {
                continue;
            };
            for instruction in children {
                let tile = factory.new_tile(instruction.tile, variant);
                forest
                    .insert(*parent, instruction.direction, instruction.rule, tile)
                    .map_err(|e| malformed(format!("{instruction:?}: {e}")))?;
                next.push(instruction.tile);
            }
        }
        if next.is_empty() {
            break;
        }
        debug!(layer = layers.len(), tiles = next.len(), "build layer");
        layers.push(next);
    }

    if let Some((parent, children)) = pending.iter().next() {
        return Err(malformed(format!(
            "{} instruction(s) hang off {parent}, which is never built",
            children.len()
        )));
    }

    Ok(BuildOutput { forest, layers })
}

fn check_ids(roots: &[RootDescriptor], instructions: &[Instruction]) -> Result<()> {
    let mut seen = FxHashSet::default();
    for root in roots {
        if !seen.insert(root.id) {
            return Err(malformed(format!("root {} is listed twice", root.id)));
        }
    }
    for instruction in instructions {
        if !seen.insert(instruction.tile) {
            return Err(malformed(format!(
                "{} is produced more than once",
                instruction.tile
            )));
        }
    }
    Ok(())
}

fn malformed(message: String) -> TileError {
    TileError::MalformedInstructionSet(message)
}
