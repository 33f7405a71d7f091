// Level map lifecycle state machine.
//
// `StateMachine` gates which mutations are legal when. It knows nothing
// about tiles; `level_map.rs` asks it for each transition and turns the
// returned `(from, to)` pair into a `MapStateChanged` event.
//
// Transition table (anything else is `InvalidTransition`):
//
//   Building       -> FreeMove (gameplay maps) | EditorMode (editor maps)
//   FreeMove       -> RemovingTile | ComboRemoval | EditorMode (editor stop)
//   RemovingTile   -> PowerUpRemoval | ComboRemoval | FreeMove
//   PowerUpRemoval -> ComboRemoval | FreeMove
//   ComboRemoval   -> ComboRemoval | FreeMove
//   EditorMode     -> FreeMove (editor play)
//   any            -> Locked via `lock` / `finish`, back via `resume`
//
// `FreeMove -> ComboRemoval` settles combos that exist right after a load.
// Gameplay states are unreachable on an editor map until the editor enters
// play mode, because `EditorMode` only leads to `FreeMove`.

use crate::error::{Result, TileError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapState {
    Locked,
    Building,
    FreeMove,
    RemovingTile,
    ComboRemoval,
    PowerUpRemoval,
    EditorMode,
}

/// A committed transition.
pub type Transition = (MapState, MapState);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateMachine {
    current: MapState,
    /// State to go back to on `resume`.
    resume_to: Option<MapState>,
    finished: bool,
    editor: bool,
}

impl StateMachine {
    /// A fresh machine in `Building`.
    pub fn new(editor: bool) -> Self {
        Self {
            current: MapState::Building,
            resume_to: None,
            finished: false,
            editor,
        }
    }

    /// The state the map is in now.
    pub fn current(&self) -> MapState {
        self.current
    }

    /// Whether this machine belongs to an editor map.
    pub fn is_editor(&self) -> bool {
        self.editor
    }

    /// Whether `finish()` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Everything but `FreeMove` locks player movement.
    pub fn is_movement_locked(&self) -> bool {
        self.current != MapState::FreeMove
    }

    /// Whether the transition table allows `current -> to`.
    pub fn can_transition(&self, to: MapState) -> bool {
        use MapState::*;
        match (self.current, to) {
            (Building, FreeMove) => !self.editor,
            (Building, EditorMode) => self.editor,
            (FreeMove, RemovingTile | ComboRemoval) => true,
            (FreeMove, EditorMode) => self.editor,
            (RemovingTile, PowerUpRemoval | ComboRemoval | FreeMove) => true,
            (PowerUpRemoval, ComboRemoval | FreeMove) => true,
            (ComboRemoval, ComboRemoval | FreeMove) => true,
            (EditorMode, FreeMove) => self.editor,
            _ => false,
        }
    }

    /// Move to `to`, or fail with `InvalidTransition`.
    pub fn transition(&mut self, to: MapState) -> Result<Transition> {
        if !self.can_transition(to) {
            return Err(TileError::InvalidTransition {
                from: self.current,
                to,
            });
        }
        let from = self.current;
        self.current = to;
        Ok((from, to))
    }

    /// Enter `Locked`, remembering where to resume. `None` when already
    /// locked.
    pub fn lock(&mut self) -> Option<Transition> {
        if self.current == MapState::Locked {
            return None;
        }
        let from = self.current;
        self.resume_to = Some(from);
        self.current = MapState::Locked;
        Some((from, MapState::Locked))
    }

    /// Leave `Locked` for the remembered state. A finished level stays
    /// locked.
    pub fn resume(&mut self) -> Option<Transition> {
        if self.current != MapState::Locked || self.finished {
            return None;
        }
        let to = self.resume_to.take()?;
        self.current = to;
        Some((MapState::Locked, to))
    }

    /// Lock for good.
    pub fn finish(&mut self) -> Option<Transition> {
        self.finished = true;
        self.lock()
    }
}
