// Id-keyed lookup from domain tiles to presentation objects.
//
// The core never references views. The presentation layer owns a
// `TileViewTable<V>` and keeps it in step with the map by feeding it
// `MapEvent`s (`apply_event`) or by pruning against the forest.

use crate::event::MapEvent;
use crate::forest::Forest;
use crate::types::TileId;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct TileViewTable<V> {
    views: BTreeMap<TileId, V>,
}

impl<V> Default for TileViewTable<V> {
    fn default() -> Self {
        Self {
            views: BTreeMap::new(),
        }
    }
}

impl<V> TileViewTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the view previously registered for `id`, if any.
    pub fn register(&mut self, id: TileId, view: V) -> Option<V> {
        self.views.insert(id, view)
    }

    /// The view registered for `id`.
    pub fn get_tile_view(&self, id: TileId) -> Option<&V> {
        self.views.get(&id)
    }

    pub fn get_tile_view_mut(&mut self, id: TileId) -> Option<&mut V> {
        self.views.get_mut(&id)
    }

    /// Whether a view is registered for `id`.
    pub fn has_tile(&self, id: TileId) -> bool {
        self.views.contains_key(&id)
    }

    /// Drop the view for `id`, handing it back.
    pub fn remove(&mut self, id: TileId) -> Option<V> {
        self.views.remove(&id)
    }

    /// Number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Register or drop views as the map reports tiles coming and going.
    /// Gameplay removal recolours rather than deletes, so only
    /// `TileDeleted` drops a view.
    pub fn apply_event(&mut self, event: &MapEvent, make_view: impl FnOnce(TileId) -> V) {
        match event {
            MapEvent::TileRegistered { tile } => {
                self.views.entry(tile.id).or_insert_with(|| make_view(tile.id));
            }
            MapEvent::TileDeleted { tile } => {
                self.views.remove(tile);
            }
            _ => {}
        }
    }

    /// Drop views whose tile is no longer in `forest`. Returns them.
    pub fn prune(&mut self, forest: &Forest) -> Vec<(TileId, V)> {
        let dead: Vec<TileId> = self
            .views
            .keys()
            .copied()
            .filter(|id| !forest.contains(*id))
            .collect();
        dead.into_iter()
            .filter_map(|id| self.views.remove(&id).map(|v| (id, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;
    use crate::types::Transform;

    #[test]
    fn register_lookup_remove() {
        let mut table = TileViewTable::new();
        assert_eq!(table.register(TileId(1), "sprite-1"), None);
        assert_eq!(table.register(TileId(1), "sprite-1b"), Some("sprite-1"));
        assert!(table.has_tile(TileId(1)));
        assert_eq!(table.get_tile_view(TileId(1)), Some(&"sprite-1b"));
        assert_eq!(table.remove(TileId(1)), Some("sprite-1b"));
        assert!(table.is_empty());
    }

    #[test]
    fn events_register_and_drop_views() {
        let mut table = TileViewTable::new();
        table.apply_event(
            &MapEvent::TileRegistered {
                tile: Tile::new(TileId(5)),
            },
            |id| id.0 * 10,
        );
        assert_eq!(table.get_tile_view(TileId(5)), Some(&50));

        // A shuffle path is not a deletion.
        table.apply_event(
            &MapEvent::TileRemoved {
                tile: TileId(5),
                path: vec![TileId(6), TileId(5)],
            },
            |_| 0,
        );
        assert!(table.has_tile(TileId(5)));

        table.apply_event(&MapEvent::TileDeleted { tile: TileId(5) }, |_| 0);
        assert!(!table.has_tile(TileId(5)));
    }

    #[test]
    fn prune_drops_dead_tiles() {
        let mut forest = Forest::new();
        forest
            .add_root(Tile::new(TileId(1)), Transform::default())
            .unwrap();
        let mut table = TileViewTable::new();
        table.register(TileId(1), ());
        table.register(TileId(2), ());
        let dropped = table.prune(&forest);
        assert_eq!(dropped, vec![(TileId(2), ())]);
        assert_eq!(table.len(), 1);
    }
}
