// Loaded level: forest, state machine, events and the gameplay sequences.
//
// `LevelMap` is the single owner of everything a loaded level needs: the
// `Forest`, the `StateMachine`, the `EventBus`, the `TileFactory` (and with
// it the colour RNG) and the `MapConfig`. Every mutation goes through a
// method here (or `apply()` with a `MapCommand`) and returns a `StepResult`
// holding the events it published, in emission order.
//
// ## Loading
//
// `new()` creates an empty map in `Building`; listeners can subscribe before
// `load()` so they see the build. `load()` runs the layered builder, refreshes
// every cache, then emits `TileRegistered` per tile and `BuildLayerCompleted`
// per layer, moves to `FreeMove` (gameplay), `EditorMode` (editor) or
// `Locked` (map overview), and emits `MapFullyLoaded`. A failed build leaves
// the map in `Building` with an empty forest.
//
// ## Player removal
//
// Removal never changes the forest's shape. `remove_tile()`:
//
//   1. `FreeMove -> RemovingTile`, read the tile's shortest leaf path.
//   2. Shuffle: along `[leaf .. source]` every tile takes the colour and
//      power-up of its predecessor toward the leaf; the leaf regrows a fresh
//      colour. The source's own power-up is consumed.
//   3. If that power-up was set: `-> PowerUpRemoval`, recolour its sweep
//      (straight line or every tile of the source's colour).
//   4. Settle combos: while a patch reaches `combo_min_size` and the cascade
//      limit allows, `-> ComboRemoval`, award a power-up for large patches,
//      recolour the patch.
//   5. `-> FreeMove`.
//
// Everything happens synchronously; the events are the only trace an
// animation layer needs to replay the sequence.
//
// ## Editor
//
// Editor maps start in `EditorMode` with colourless tiles. Insert, add-root
// and delete are structural (`Forest::editor_insert` / `add_root` /
// `remove`). `editor_play()` colours every tile and enters `FreeMove`;
// `editor_stop()` restores the editor colours and returns to `EditorMode`.

use crate::command::MapCommand;
use crate::config::MapConfig;
use crate::error::{Result, TileError};
use crate::event::{EventBus, MapEvent, MapEventKind, StepResult, SubscriptionId};
use crate::factory::{PaletteFactory, TileFactory, TileVariant};
use crate::forest::{BoundsOccupancy, Forest, OccupancyOracle, Placement};
use crate::instructions::{self, LevelData, LevelMetadata};
use crate::paths;
use crate::state::{MapState, StateMachine, Transition};
use crate::tile::Tile;
use crate::types::{Direction, PowerUp, TileColor, TileId, Transform, WalkRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// What a map is loaded for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapMode {
    Gameplay,
    Editor,
    /// Read-only preview on the world map. Locked once built.
    Overview,
}

impl MapMode {
    pub fn tile_variant(self) -> TileVariant {
        match self {
            MapMode::Gameplay => TileVariant::Gameplay,
            MapMode::Editor => TileVariant::Editor,
            MapMode::Overview => TileVariant::MapOverview,
        }
    }
}

pub struct LevelMap {
    config: MapConfig,
    mode: MapMode,
    metadata: LevelMetadata,
    forest: Forest,
    layers: Vec<Vec<TileId>>,
    state: StateMachine,
    bus: EventBus,
    factory: Box<dyn TileFactory>,
    /// Editor colours and power-ups, kept while an editor map is play-tested.
    editor_snapshot: Option<BTreeMap<TileId, (TileColor, PowerUp)>>,
}

impl LevelMap {
    /// An empty map in `Building`, colouring tiles from the config palette.
    pub fn new(config: MapConfig, mode: MapMode) -> Self {
        let factory = PaletteFactory::from_config(&config);
        Self::with_factory(config, mode, Box::new(factory))
    }

    /// An empty map in `Building` that takes its tiles from `factory`.
    pub fn with_factory(config: MapConfig, mode: MapMode, factory: Box<dyn TileFactory>) -> Self {
        Self {
            forest: Forest::with_placement(Placement::from_config(&config)),
            config,
            mode,
            metadata: LevelMetadata::default(),
            layers: Vec::new(),
            state: StateMachine::new(mode == MapMode::Editor),
            bus: EventBus::new(),
            factory,
            editor_snapshot: None,
        }
    }

    /// `new()` followed by `load()`.
    pub fn from_level(level: &LevelData, config: MapConfig, mode: MapMode) -> Result<(Self, StepResult)> {
        let mut map = Self::new(config, mode);
        let step = map.load(level)?;
        Ok((map, step))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// What the map was created for.
    pub fn mode(&self) -> MapMode {
        self.mode
    }

    /// Metadata of the loaded level (empty before `load()`).
    pub fn metadata(&self) -> &LevelMetadata {
        &self.metadata
    }

    /// Read-only view of the live forest.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Build layers from the last `load()`; layer 0 is the root set.
    pub fn layers(&self) -> &[Vec<TileId>] {
        &self.layers
    }

    /// Current state of the map's state machine.
    pub fn state(&self) -> MapState {
        self.state.current()
    }

    /// True unless the map is in `FreeMove`.
    pub fn is_movement_locked(&self) -> bool {
        self.state.is_movement_locked()
    }

    pub fn has_tile(&self, id: TileId) -> bool {
        self.forest.contains(id)
    }

    /// The live tile with `id`, if any.
    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.forest.tile(id)
    }

    /// Cached shortest leaf path, computed on the spot if the cache is cold.
    pub fn shortest_leaf_path(&self, id: TileId) -> Result<Vec<TileId>> {
        let tile = self.forest.tile(id).ok_or(TileError::UnknownTile(id))?;
        Ok(match tile.cached_shortest_leaf_path() {
            Some(path) => path.to_vec(),
            None => paths::shortest_leaf_path(&self.forest, id, &[]),
        })
    }

    /// Cached colour patch, computed on the spot if the cache is cold.
    pub fn color_match_patch(&self, id: TileId) -> Result<Vec<TileId>> {
        let tile = self.forest.tile(id).ok_or(TileError::UnknownTile(id))?;
        Ok(match tile.cached_color_patch() {
            Some(patch) => patch.to_vec(),
            None => paths::color_match_patch(&self.forest, id, &[]),
        })
    }

    /// Whether some patch reaches the configured combo size.
    pub fn any_combo_left(&self) -> bool {
        paths::any_combo_left(&self.forest, self.combo_min_size())
    }

    /// Flat snapshot of the current forest with this level's metadata.
    pub fn to_level_data(&self) -> LevelData {
        LevelData::from_forest(self.metadata.clone(), &self.forest)
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Listen for one kind of event. Returns a handle for `unsubscribe`.
    pub fn subscribe(
        &mut self,
        kind: MapEventKind,
        listener: impl FnMut(&MapEvent) + 'static,
    ) -> SubscriptionId {
        self.bus.subscribe(kind, listener)
    }

    /// `true` if the subscription was live.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Tear the map down. Every listener is dropped.
    pub fn unload(mut self) {
        self.bus.close();
        info!(
            level = %self.metadata.id,
            tiles = self.forest.len(),
            "level unloaded"
        );
    }

    fn emit(&mut self, step: &mut StepResult, event: MapEvent) {
        self.bus.publish(&event);
        step.events.push(event);
    }

    fn enter(&mut self, step: &mut StepResult, to: MapState) -> Result<()> {
        let (from, to) = self.state.transition(to)?;
        self.emit(step, MapEvent::MapStateChanged { from, to });
        Ok(())
    }

    fn emit_transition(&mut self, step: &mut StepResult, transition: Option<Transition>) {
        if let Some((from, to)) = transition {
            self.emit(step, MapEvent::MapStateChanged { from, to });
        }
    }

    fn combo_min_size(&self) -> usize {
        self.config.combo_min_size.max(1)
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Build `level` into this map. Only valid once, from `Building`.
    pub fn load(&mut self, level: &LevelData) -> Result<StepResult> {
        if self.state.current() != MapState::Building {
            return Err(TileError::InvalidTransition {
                from: self.state.current(),
                to: MapState::Building,
            });
        }
        let output = instructions::build(
            &level.roots,
            &level.instructions,
            self.factory.as_mut(),
            self.mode.tile_variant(),
            Placement::from_config(&self.config),
        )
        .inspect_err(|e| warn!(level = %level.metadata.id, error = %e, "level build rejected"))?;

        self.forest = output.forest;
        self.layers = output.layers;
        self.metadata = level.metadata.clone();
        paths::refresh_all(&mut self.forest, true, true);

        let mut step = StepResult::default();
        let layers = self.layers.clone();
        for (layer, tiles) in layers.into_iter().enumerate() {
            for id in &tiles {
                if let Some(tile) = self.forest.tile(*id).cloned() {
                    self.emit(&mut step, MapEvent::TileRegistered { tile });
                }
            }
            self.emit(&mut step, MapEvent::BuildLayerCompleted { layer, tiles });
        }

        match self.mode {
            MapMode::Gameplay => self.enter(&mut step, MapState::FreeMove)?,
            MapMode::Editor => self.enter(&mut step, MapState::EditorMode)?,
            MapMode::Overview => {
                let transition = self.state.finish();
                self.emit_transition(&mut step, transition);
            }
        }
        let roots = self.forest.roots().len();
        self.emit(
            &mut step,
            MapEvent::MapFullyLoaded {
                tiles: self.forest.len(),
                roots,
            },
        );
        info!(
            level = %self.metadata.id,
            tiles = self.forest.len(),
            roots,
            layers = self.layers.len(),
            "level loaded"
        );

        if self.mode == MapMode::Gameplay && self.config.settle_combos_on_load {
            self.settle_combos(&mut step)?;
        }
        Ok(step)
    }

    // -----------------------------------------------------------------------
    // Gameplay
    // -----------------------------------------------------------------------

    /// Player click on `id`. Runs the whole removal sequence; see the
    /// module header. Rejected with `MovementLocked` outside `FreeMove`.
    pub fn remove_tile(&mut self, id: TileId) -> Result<StepResult> {
        let (color, power_up) = match self.forest.tile(id) {
            Some(tile) => (tile.color, tile.power_up),
            None => return Err(TileError::UnknownTile(id)),
        };
        if self.state.current() != MapState::FreeMove {
            warn!(%id, state = ?self.state.current(), "removal rejected");
            return Err(TileError::MovementLocked(self.state.current()));
        }

        let mut step = StepResult::default();
        let path = self.shortest_leaf_path(id)?;
        self.enter(&mut step, MapState::RemovingTile)?;
        self.shuffle(&path)?;
        self.emit(&mut step, MapEvent::TileRemoved { tile: id, path });

        if power_up != PowerUp::None {
            self.enter(&mut step, MapState::PowerUpRemoval)?;
            let sweep = self.power_up_path(id, power_up, color);
            self.recolor(&sweep)?;
            self.emit(
                &mut step,
                MapEvent::PowerUpTriggered {
                    source: id,
                    power_up,
                    path: sweep,
                },
            );
        }

        paths::refresh_all(&mut self.forest, true, true);
        let combos = self.settle_combos(&mut step)?;
        if self.state.current() != MapState::FreeMove {
            self.enter(&mut step, MapState::FreeMove)?;
        }
        debug!(%id, combos, ?power_up, "tile removed");
        Ok(step)
    }

    // Slide colours and power-ups one step toward the source; the leaf
    // regrows.
    fn shuffle(&mut self, path: &[TileId]) -> Result<()> {
        let contents: Vec<(TileColor, PowerUp)> = path
            .iter()
            .map(|id| {
                self.forest
                    .tile(*id)
                    .map(|t| (t.color, t.power_up))
                    .ok_or(TileError::UnknownTile(*id))
            })
            .collect::<Result<_>>()?;
        for i in (1..path.len()).rev() {
            let (color, power_up) = contents[i - 1];
            self.forest.set_color(path[i], color)?;
            self.forest.set_power_up(path[i], power_up)?;
        }
        if let (Some(&leaf), Some(&(old, _))) = (path.first(), contents.first()) {
            let regrown = self.factory.fresh_color_except(old);
            self.forest.set_color(leaf, regrown)?;
            self.forest.set_power_up(leaf, PowerUp::None)?;
        }
        Ok(())
    }

    fn recolor(&mut self, tiles: &[TileId]) -> Result<()> {
        for &id in tiles {
            let old = self.forest.tile(id).map_or(TileColor::None, |t| t.color);
            let color = self.factory.fresh_color_except(old);
            self.forest.set_color(id, color)?;
        }
        Ok(())
    }

    fn power_up_path(&self, source: TileId, power_up: PowerUp, color: TileColor) -> Vec<TileId> {
        match power_up {
            PowerUp::None => Vec::new(),
            PowerUp::NorthSouthLine => {
                paths::straight_path(&self.forest, source, &[Direction::North, Direction::South])
            }
            PowerUp::EastWestLine => {
                paths::straight_path(&self.forest, source, &[Direction::East, Direction::West])
            }
            PowerUp::ColorMatch => paths::all_of_color(&self.forest, source, color),
        }
    }

    /// Resolve combos until none is left or the cascade limit is hit.
    /// Returns how many were resolved.
    fn settle_combos(&mut self, step: &mut StepResult) -> Result<usize> {
        let mut resolved = 0;
        while resolved < self.config.max_combo_cascade {
            let Some((source, patch)) = paths::find_combo(&self.forest, self.combo_min_size()) else {
                break;
            };
            self.enter(step, MapState::ComboRemoval)?;
            self.emit(
                step,
                MapEvent::ComboDetected {
                    source,
                    patch: patch.clone(),
                },
            );
            self.recolor(&patch)?;
            let award = self.award_for(&patch);
            if award != PowerUp::None {
                self.forest.set_power_up(source, award)?;
                self.emit(
                    step,
                    MapEvent::PowerUpAwarded {
                        tile: source,
                        power_up: award,
                    },
                );
            }
            paths::chain_refresh(&mut self.forest, source, Direction::None, true, true);
            resolved += 1;
        }
        if resolved > 0 && resolved == self.config.max_combo_cascade && self.any_combo_left() {
            warn!(resolved, "combo cascade limit reached");
        }
        if resolved > 0 {
            self.enter(step, MapState::FreeMove)?;
        }
        Ok(resolved)
    }

    // Big patches earn a power-up. Lines run along the patch's longer
    // horizontal extent.
    fn award_for(&self, patch: &[TileId]) -> PowerUp {
        if patch.len() >= self.config.color_power_up_combo_size {
            return PowerUp::ColorMatch;
        }
        if patch.len() < self.config.line_power_up_combo_size {
            return PowerUp::None;
        }
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for tile in patch.iter().filter_map(|id| self.forest.tile(*id)) {
            for axis in 0..3 {
                min[axis] = min[axis].min(tile.transform.position[axis]);
                max[axis] = max[axis].max(tile.transform.position[axis]);
            }
        }
        if max[2] - min[2] >= max[0] - min[0] {
            PowerUp::NorthSouthLine
        } else {
            PowerUp::EastWestLine
        }
    }

    /// Hand `power_up` to a tile. Allowed in `FreeMove` and `EditorMode`.
    pub fn set_power_up(&mut self, id: TileId, power_up: PowerUp) -> Result<StepResult> {
        let state = self.state.current();
        if state != MapState::FreeMove && state != MapState::EditorMode {
            return Err(TileError::MovementLocked(state));
        }
        self.forest.set_power_up(id, power_up)?;
        Ok(StepResult::default())
    }

    // -----------------------------------------------------------------------
    // Pause / finish
    // -----------------------------------------------------------------------

    /// Lock the map. `resume()` returns to the current state.
    pub fn pause(&mut self) -> StepResult {
        let mut step = StepResult::default();
        let transition = self.state.lock();
        self.emit_transition(&mut step, transition);
        step
    }

    /// Back to the state before `pause()`. A finished level stays locked.
    pub fn resume(&mut self) -> StepResult {
        let mut step = StepResult::default();
        let transition = self.state.resume();
        self.emit_transition(&mut step, transition);
        step
    }

    /// Lock the map for good.
    pub fn finish_level(&mut self) -> StepResult {
        let mut step = StepResult::default();
        let transition = self.state.finish();
        self.emit_transition(&mut step, transition);
        info!(level = %self.metadata.id, "level finished");
        step
    }

    // -----------------------------------------------------------------------
    // Editor
    // -----------------------------------------------------------------------

    fn require_editor_mode(&self) -> Result<()> {
        match self.state.current() {
            MapState::EditorMode => Ok(()),
            other => {
                warn!(state = ?other, "editor action outside editor mode");
                Err(TileError::MovementLocked(other))
            }
        }
    }

    /// Grow a colourless tile off `parent`, checked against the default
    /// bounds oracle.
    pub fn editor_insert(
        &mut self,
        parent: TileId,
        direction: Direction,
        rule: WalkRule,
    ) -> Result<StepResult> {
        let oracle = BoundsOccupancy::from_config(&self.config);
        self.editor_insert_with(parent, direction, rule, &oracle)
    }

    /// `editor_insert` with a caller-provided geometry check.
    pub fn editor_insert_with(
        &mut self,
        parent: TileId,
        direction: Direction,
        rule: WalkRule,
        oracle: &dyn OccupancyOracle,
    ) -> Result<StepResult> {
        self.require_editor_mode()?;
        let id = self.forest.next_free_id()?;
        let tile = self.factory.new_tile(id, TileVariant::Editor);
        self.forest
            .editor_insert(parent, direction, rule, tile, oracle)
            .inspect_err(|e| warn!(%parent, ?direction, error = %e, "editor insertion rejected"))?;
        paths::chain_refresh(&mut self.forest, id, Direction::None, true, true);

        let mut step = StepResult::default();
        if let Some(tile) = self.forest.tile(id).cloned() {
            self.emit(&mut step, MapEvent::TileRegistered { tile });
        }
        Ok(step)
    }

    /// Place a new free-standing root at `position` if the spot is free.
    pub fn editor_add_root(&mut self, position: [f32; 3]) -> Result<StepResult> {
        self.require_editor_mode()?;
        let transform = Transform::at(position);
        let index = self.forest.placement().index_for(position);
        let oracle = BoundsOccupancy::from_config(&self.config);
        if oracle.is_blocked(&self.forest, index, &transform) {
            warn!(%index, "root placement rejected");
            return Err(TileError::InvalidInsertion(format!("spot {index} is occupied")));
        }
        let id = self.forest.next_free_id()?;
        let tile = self.factory.new_tile(id, TileVariant::Editor);
        self.forest.add_root(tile, transform)?;
        paths::chain_refresh(&mut self.forest, id, Direction::None, true, true);

        let mut step = StepResult::default();
        if let Some(tile) = self.forest.tile(id).cloned() {
            self.emit(&mut step, MapEvent::TileRegistered { tile });
        }
        Ok(step)
    }

    /// Delete a tile outright, promoting orphaned neighbours to roots.
    pub fn editor_delete(&mut self, id: TileId) -> Result<StepResult> {
        self.require_editor_mode()?;
        let removal = self.forest.remove(id)?;
        let mut step = StepResult::default();
        self.emit(&mut step, MapEvent::TileDeleted { tile: id });
        for root in removal.promoted {
            self.emit(&mut step, MapEvent::RootPromoted { tile: root.id });
        }
        Ok(step)
    }

    /// Play-test an editor map: colour every tile and enter `FreeMove`.
    pub fn editor_play(&mut self) -> Result<StepResult> {
        self.require_editor_mode()?;
        let mut step = StepResult::default();
        self.enter(&mut step, MapState::FreeMove)?;

        let snapshot: BTreeMap<TileId, (TileColor, PowerUp)> = self
            .forest
            .tiles()
            .map(|t| (t.id, (t.color, t.power_up)))
            .collect();
        for &id in snapshot.keys() {
            let color = self.factory.fresh_color();
            self.forest.set_color(id, color)?;
        }
        self.editor_snapshot = Some(snapshot);
        paths::refresh_all(&mut self.forest, true, true);
        if self.config.settle_combos_on_load {
            self.settle_combos(&mut step)?;
        }
        info!(tiles = self.forest.len(), "editor play-test started");
        Ok(step)
    }

    /// Leave play-testing and restore the editor colours.
    pub fn editor_stop(&mut self) -> Result<StepResult> {
        let mut step = StepResult::default();
        self.enter(&mut step, MapState::EditorMode)?;
        if let Some(snapshot) = self.editor_snapshot.take() {
            for (id, (color, power_up)) in snapshot {
                if self.forest.contains(id) {
                    self.forest.set_color(id, color)?;
                    self.forest.set_power_up(id, power_up)?;
                }
            }
        }
        paths::refresh_all(&mut self.forest, true, true);
        info!("editor play-test stopped");
        Ok(step)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Dispatch a `MapCommand` to the matching method.
    pub fn apply(&mut self, command: &MapCommand) -> Result<StepResult> {
        match *command {
            MapCommand::RemoveTile { tile } => self.remove_tile(tile),
            MapCommand::Pause => Ok(self.pause()),
            MapCommand::Resume => Ok(self.resume()),
            MapCommand::FinishLevel => Ok(self.finish_level()),
            MapCommand::EditorInsert {
                parent,
                direction,
                rule,
            } => self.editor_insert(parent, direction, rule),
            MapCommand::EditorAddRoot { position } => self.editor_add_root(position),
            MapCommand::EditorDelete { tile } => self.editor_delete(tile),
            MapCommand::EditorPlay => self.editor_play(),
            MapCommand::EditorStop => self.editor_stop(),
            MapCommand::SetPowerUp { tile, power_up } => self.set_power_up(tile, power_up),
        }
    }
}
