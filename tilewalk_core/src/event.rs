// Level map change notifications.
//
// Every mutating `LevelMap` operation returns the events it produced in a
// `StepResult` and also publishes them, in the same order, to the map's
// `EventBus`. Presentation collaborators (views, audio, scoring) subscribe
// per `MapEventKind` and never touch the forest directly.
//
// Emission order inside one operation: path/region algorithms run first,
// then the forest mutation commits, then the events for that step go out.
// The bus is closed when the map is unloaded; a closed bus drops every
// listener and ignores later subscriptions and publishes.

use crate::state::MapState;
use crate::tile::Tile;
use crate::types::{PowerUp, TileId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    /// A tile joined the forest (build, editor insertion, new root).
    TileRegistered { tile: Tile },
    /// Player removal of `tile`. The forest keeps its shape: colours slide
    /// along `path` (`[leaf .. tile]`) and the leaf regrows.
    TileRemoved { tile: TileId, path: Vec<TileId> },
    /// A tile left the forest for good (editor deletion).
    TileDeleted { tile: TileId },
    /// A tile lost its path to a root and became one.
    RootPromoted { tile: TileId },
    ComboDetected { source: TileId, patch: Vec<TileId> },
    PowerUpTriggered {
        source: TileId,
        power_up: PowerUp,
        path: Vec<TileId>,
    },
    /// A combo earned its source tile a power-up.
    PowerUpAwarded { tile: TileId, power_up: PowerUp },
    MapStateChanged { from: MapState, to: MapState },
    BuildLayerCompleted { layer: usize, tiles: Vec<TileId> },
    MapFullyLoaded { tiles: usize, roots: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapEventKind {
    TileRegistered,
    TileRemoved,
    TileDeleted,
    RootPromoted,
    ComboDetected,
    PowerUpTriggered,
    PowerUpAwarded,
    MapStateChanged,
    BuildLayerCompleted,
    MapFullyLoaded,
}

impl MapEvent {
    /// The subscription key for this event.
    pub fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::TileRegistered { .. } => MapEventKind::TileRegistered,
            MapEvent::TileRemoved { .. } => MapEventKind::TileRemoved,
            MapEvent::TileDeleted { .. } => MapEventKind::TileDeleted,
            MapEvent::RootPromoted { .. } => MapEventKind::RootPromoted,
            MapEvent::ComboDetected { .. } => MapEventKind::ComboDetected,
            MapEvent::PowerUpTriggered { .. } => MapEventKind::PowerUpTriggered,
            MapEvent::PowerUpAwarded { .. } => MapEventKind::PowerUpAwarded,
            MapEvent::MapStateChanged { .. } => MapEventKind::MapStateChanged,
            MapEvent::BuildLayerCompleted { .. } => MapEventKind::BuildLayerCompleted,
            MapEvent::MapFullyLoaded { .. } => MapEventKind::MapFullyLoaded,
        }
    }
}

/// Output of one level map operation.
#[derive(Clone, Debug, Default)]
pub struct StepResult {
    pub events: Vec<MapEvent>,
}

impl StepResult {
    /// Events of one kind, in emission order.
    pub fn of_kind(&self, kind: MapEventKind) -> impl Iterator<Item = &MapEvent> {
        self.events.iter().filter(move |e| e.kind() == kind)
    }
}

// ---------------------------------------------------------------------------
// Observer registry
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&MapEvent)>;

#[derive(Default)]
pub struct EventBus {
    listeners: BTreeMap<MapEventKind, Vec<(SubscriptionId, Listener)>>,
    next_id: u64,
    closed: bool,
}

impl EventBus {
    /// An open bus with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for one event kind. On a closed bus the listener
    /// is dropped immediately.
    pub fn subscribe(
        &mut self,
        kind: MapEventKind,
        listener: impl FnMut(&MapEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        if !self.closed {
            self.listeners
                .entry(kind)
                .or_default()
                .push((id, Box::new(listener)));
        }
        id
    }

    /// `true` if the subscription was live.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver to every listener of the event's kind, in subscription order.
    pub fn publish(&mut self, event: &MapEvent) {
        if self.closed {
            return;
        }
        if let Some(list) = self.listeners.get_mut(&event.kind()) {
            for (_, listener) in list.iter_mut() {
                listener(event);
            }
        }
    }

    /// Drop every listener and refuse new ones.
    pub fn close(&mut self) {
        self.closed = true;
        self.listeners.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Live listeners across all kinds.
    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("closed", &self.closed)
            .finish()
    }
}
