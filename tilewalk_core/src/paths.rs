// Path and region algorithms over the tile forest.
//
// Every function here reads a `&Forest` and walks links as an undirected
// tree, tracking the direction of arrival so the parent edge is never walked
// back. There is no visited set for the recursive walks: the forest
// invariant guarantees acyclicity.
//
// - `shortest_leaf_path`: minimum-length branch down to a leaf, source last.
//   Ties go to the first branch in `Direction::ALL` order.
// - `color_match_patch`: concatenation of every same-coloured branch, source
//   last. Branches are accumulated, not minimized.
// - `is_connected_to_root`: BFS until any root is reached.
// - `straight_path`: straight walks along given directions, merged and
//   sorted by squared world distance from the source.
// - `all_of_color`: every tile of one colour, sorted the same way.
//
// `chain_refresh` and `refresh_all` are the only writers: they store the two
// memoized results on each tile of a component. Cached values are computed
// with an empty ignore set so they describe the tile within its whole
// component, which makes a refresh idempotent.
//
// The recursive walks use one stack frame per tile of depth, and a full
// refresh runs them from every tile, so a refresh is quadratic in component
// size. Levels hold at most a few hundred tiles, which keeps both cheap.
//
// Passing an id that is not in the forest is a caller bug. Debug builds
// assert; release builds return an empty result.

use crate::forest::Forest;
use crate::types::{Direction, TileColor, TileId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Shortest branch from `source` down to a leaf, as `[leaf .. source]`,
/// skipping the slots in `ignore`.
pub fn shortest_leaf_path(forest: &Forest, source: TileId, ignore: &[Direction]) -> Vec<TileId> {
    let Some(tile) = forest.tile(source) else {
        debug_assert!(false, "shortest_leaf_path on dead tile {source}");
        return Vec::new();
    };
    let mut best: Option<Vec<TileId>> = None;
    for (direction, neighbor) in tile.neighbors() {
        if ignore.contains(&direction) {
            continue;
        }
        let candidate = shortest_leaf_path(forest, neighbor, &[direction.opposite()]);
        if best.as_ref().is_none_or(|b| candidate.len() < b.len()) {
            best = Some(candidate);
        }
    }
    let mut path = best.unwrap_or_default();
    path.push(source);
    path
}

/// `source` plus every tile reachable from it through same-coloured
/// links, source last. Colourless tiles match nothing.
pub fn color_match_patch(forest: &Forest, source: TileId, ignore: &[Direction]) -> Vec<TileId> {
    let Some(tile) = forest.tile(source) else {
        debug_assert!(false, "color_match_patch on dead tile {source}");
        return Vec::new();
    };
    let mut patch = Vec::new();
    if tile.color != TileColor::None {
        for (direction, neighbor) in tile.neighbors() {
            if ignore.contains(&direction) {
                continue;
            }
            let same = forest
                .tile(neighbor)
                .is_some_and(|n| n.color == tile.color);
            if same {
                patch.extend(color_match_patch(forest, neighbor, &[direction.opposite()]));
            }
        }
    }
    patch.push(source);
    patch
}

/// Whether any root (`source` included) is reachable from `source`.
pub fn is_connected_to_root(forest: &Forest, source: TileId) -> bool {
    debug_assert!(forest.contains(source), "is_connected_to_root on dead tile {source}");
    let mut visited = FxHashSet::default();
    let mut frontier = VecDeque::from([source]);
    visited.insert(source);
    while let Some(id) = frontier.pop_front() {
        let Some(tile) = forest.tile(id) else {
            continue;
        };
        if tile.is_root {
            return true;
        }
        for (_, neighbor) in tile.neighbors() {
            if visited.insert(neighbor) {
                frontier.push_back(neighbor);
            }
        }
    }
    false
}

/// Tiles met walking straight from `source` along each of `directions`
/// until an open slot, plus `source` itself, nearest first.
pub fn straight_path(forest: &Forest, source: TileId, directions: &[Direction]) -> Vec<TileId> {
    debug_assert!(forest.contains(source), "straight_path on dead tile {source}");
    let mut path = vec![source];
    for &direction in directions {
        let mut current = source;
        while let Some(next) = forest.tile(current).and_then(|t| t.link(direction)) {
            path.push(next);
            current = next;
        }
    }
    sort_by_distance(forest, source, &mut path);
    path
}

/// Every live tile coloured `color`, nearest to `source` first. Empty for
/// `TileColor::None`.
pub fn all_of_color(forest: &Forest, source: TileId, color: TileColor) -> Vec<TileId> {
    if color == TileColor::None {
        return Vec::new();
    }
    let mut matches: Vec<TileId> = forest
        .tiles()
        .filter(|t| t.color == color)
        .map(|t| t.id)
        .collect();
    sort_by_distance(forest, source, &mut matches);
    matches
}

// Stable, so equal distances keep walk order.
fn sort_by_distance(forest: &Forest, source: TileId, ids: &mut [TileId]) {
    let Some(origin) = forest.tile(source).map(|t| t.transform) else {
        return;
    };
    let distance = |id: &TileId| {
        forest
            .tile(*id)
            .map_or(f32::INFINITY, |t| origin.distance_squared(&t.transform))
    };
    ids.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// Recompute the selected caches for `source` and every tile reachable from
/// it without stepping through `ignore`.
pub fn chain_refresh(
    forest: &mut Forest,
    source: TileId,
    ignore: Direction,
    refresh_shortest: bool,
    refresh_patch: bool,
) {
    let mut stack = vec![(source, ignore)];
    while let Some((id, arrived_from)) = stack.pop() {
        let Some(neighbors) = forest.tile(id).map(|t| t.neighbors()) else {
            continue;
        };
        let shortest = refresh_shortest.then(|| shortest_leaf_path(forest, id, &[]));
        let patch = refresh_patch.then(|| color_match_patch(forest, id, &[]));
        if let Some(tile) = forest.tile_mut(id) {
            if let Some(path) = shortest {
                tile.set_cached_shortest_leaf_path(path);
            }
            if let Some(patch) = patch {
                tile.set_cached_color_patch(patch);
            }
        }
        for (direction, neighbor) in neighbors {
            if direction != arrived_from {
                stack.push((neighbor, direction.opposite()));
            }
        }
    }
}

/// `chain_refresh` from every root.
pub fn refresh_all(forest: &mut Forest, refresh_shortest: bool, refresh_patch: bool) {
    for root in forest.roots() {
        chain_refresh(forest, root, Direction::None, refresh_shortest, refresh_patch);
    }
}

/// First tile (id order) whose colour patch reaches `min_size`, with that
/// patch. Uses the cached patch when present.
pub fn find_combo(forest: &Forest, min_size: usize) -> Option<(TileId, Vec<TileId>)> {
    forest.tiles().find_map(|tile| {
        if tile.color == TileColor::None {
            return None;
        }
        let patch = match tile.cached_color_patch() {
            Some(cached) => cached.to_vec(),
            None => color_match_patch(forest, tile.id, &[]),
        };
        (patch.len() >= min_size).then_some((tile.id, patch))
    })
}

/// Whether `find_combo` would find anything.
pub fn any_combo_left(forest: &Forest, min_size: usize) -> bool {
    find_combo(forest, min_size).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;
    use crate::types::{Transform, WalkRule};

    fn line(colors: &[TileColor]) -> Forest {
        // 1 -North-> 2 -North-> 3 ...
        let mut forest = Forest::new();
        forest
            .add_root(Tile::new(TileId(1)).with_color(colors[0]), Transform::default())
            .unwrap();
        for (i, &color) in colors.iter().enumerate().skip(1) {
            let id = i as i32 + 1;
            forest
                .insert(
                    TileId(id - 1),
                    Direction::North,
                    WalkRule::Plain,
                    Tile::new(TileId(id)).with_color(color),
                )
                .unwrap();
        }
        forest
    }

    fn attach(forest: &mut Forest, parent: i32, direction: Direction, id: i32, color: TileColor) {
        forest
            .insert(
                TileId(parent),
                direction,
                WalkRule::Plain,
                Tile::new(TileId(id)).with_color(color),
            )
            .unwrap();
    }

    #[test]
    fn leaf_path_of_isolated_tile_is_itself() {
        let forest = line(&[TileColor::Red]);
        assert_eq!(shortest_leaf_path(&forest, TileId(1), &[]), vec![TileId(1)]);
    }

    #[test]
    fn leaf_path_ends_with_source() {
        let forest = line(&[TileColor::Red; 4]);
        let path = shortest_leaf_path(&forest, TileId(2), &[]);
        // South branch (1) is shorter than North (3, 4).
        assert_eq!(path, vec![TileId(1), TileId(2)]);
    }

    #[test]
    fn leaf_path_ties_go_to_first_direction() {
        //   2
        //   |
        //   1 -- 3
        let mut forest = line(&[TileColor::Red, TileColor::Red]);
        attach(&mut forest, 1, Direction::East, 3, TileColor::Red);
        assert_eq!(
            shortest_leaf_path(&forest, TileId(1), &[]),
            vec![TileId(2), TileId(1)]
        );
        // Ignoring North leaves only the East branch.
        assert_eq!(
            shortest_leaf_path(&forest, TileId(1), &[Direction::North]),
            vec![TileId(3), TileId(1)]
        );
    }

    #[test]
    fn leaf_path_length_grows_with_distance_from_leaf() {
        let forest = line(&[TileColor::Red; 7]);
        let lengths: Vec<usize> = (1..=4)
            .map(|id| shortest_leaf_path(&forest, TileId(id), &[]).len())
            .collect();
        assert_eq!(lengths, vec![1, 2, 3, 4]);
        for id in 1..=7 {
            assert!(!shortest_leaf_path(&forest, TileId(id), &[]).is_empty());
        }
    }

    #[test]
    fn color_patch_of_middle_tile_spans_the_line() {
        let forest = line(&[TileColor::Blue; 3]);
        let patch = color_match_patch(&forest, TileId(2), &[]);
        assert_eq!(patch, vec![TileId(3), TileId(1), TileId(2)]);
    }

    #[test]
    fn color_patch_stops_at_other_colours() {
        let forest = line(&[
            TileColor::Blue,
            TileColor::Blue,
            TileColor::Red,
            TileColor::Blue,
        ]);
        let patch = color_match_patch(&forest, TileId(2), &[]);
        assert_eq!(patch, vec![TileId(1), TileId(2)]);
    }

    #[test]
    fn colourless_tiles_never_match() {
        let forest = line(&[TileColor::None; 3]);
        assert_eq!(color_match_patch(&forest, TileId(2), &[]), vec![TileId(2)]);
        assert!(!any_combo_left(&forest, 3));
    }

    #[test]
    fn connectivity_sees_root_through_chain() {
        let mut forest = line(&[TileColor::Red; 3]);
        assert!(is_connected_to_root(&forest, TileId(3)));
        forest.remove_neighbor(TileId(2), Direction::North);
        assert!(!is_connected_to_root(&forest, TileId(3)));
        assert!(is_connected_to_root(&forest, TileId(2)));
    }

    #[test]
    fn straight_path_includes_source_and_sorts_by_distance() {
        //  3
        //  2
        //  1 -- 4 -- 5     (1 is root)
        let mut forest = line(&[TileColor::Red; 3]);
        attach(&mut forest, 1, Direction::East, 4, TileColor::Red);
        attach(&mut forest, 4, Direction::East, 5, TileColor::Red);

        let ns = straight_path(&forest, TileId(2), &[Direction::North, Direction::South]);
        // 3 and 1 are equally far; North was walked first.
        assert_eq!(ns, vec![TileId(2), TileId(3), TileId(1)]);

        let ew = straight_path(&forest, TileId(1), &[Direction::East, Direction::West]);
        assert_eq!(ew, vec![TileId(1), TileId(4), TileId(5)]);
    }

    #[test]
    fn all_of_color_is_sorted_nearest_first() {
        let forest = line(&[
            TileColor::Green,
            TileColor::Red,
            TileColor::Green,
            TileColor::Green,
        ]);
        assert_eq!(
            all_of_color(&forest, TileId(4), TileColor::Green),
            vec![TileId(4), TileId(3), TileId(1)]
        );
        assert!(all_of_color(&forest, TileId(1), TileColor::None).is_empty());
    }

    #[test]
    fn chain_refresh_is_idempotent() {
        let mut forest = line(&[TileColor::Red, TileColor::Red, TileColor::Blue, TileColor::Red]);
        attach(&mut forest, 2, Direction::East, 5, TileColor::Red);

        chain_refresh(&mut forest, TileId(2), Direction::None, true, true);
        let first: Vec<_> = forest.tiles().cloned().collect();
        chain_refresh(&mut forest, TileId(2), Direction::None, true, true);
        let second: Vec<_> = forest.tiles().cloned().collect();
        assert_eq!(first, second);
        for tile in &first {
            assert!(tile.cached_shortest_leaf_path().is_some());
            assert!(tile.cached_color_patch().is_some());
        }
    }

    #[test]
    fn chain_refresh_respects_ignore_direction() {
        let mut forest = line(&[TileColor::Red; 3]);
        chain_refresh(&mut forest, TileId(2), Direction::North, true, false);
        assert!(forest.tile(TileId(1)).unwrap().cached_shortest_leaf_path().is_some());
        assert!(forest.tile(TileId(2)).unwrap().cached_shortest_leaf_path().is_some());
        assert!(forest.tile(TileId(3)).unwrap().cached_shortest_leaf_path().is_none());
        assert!(forest.tile(TileId(2)).unwrap().cached_color_patch().is_none());
    }

    #[test]
    fn find_combo_reports_first_tile_in_id_order() {
        let forest = line(&[
            TileColor::Red,
            TileColor::Blue,
            TileColor::Blue,
            TileColor::Blue,
        ]);
        let (source, patch) = find_combo(&forest, 3).unwrap();
        assert_eq!(source, TileId(2));
        assert_eq!(patch.len(), 3);
        assert!(any_combo_left(&forest, 3));
        assert!(!any_combo_left(&forest, 4));
    }
}
