// Tile creation for the builder and the level map.
//
// The builder never constructs tiles directly; it asks a `TileFactory` for a
// fresh unlinked tile of a given `TileVariant`. Gameplay tiles come out
// coloured, editor and map-overview tiles come out colourless so the editor
// can show bare geometry and overview maps stay neutral.
//
// `PaletteFactory` is the stock implementation: it draws colours uniformly
// from a palette with a seeded `GameRng`, so a level loaded twice with the
// same seed gets the same colours.

use crate::config::MapConfig;
use crate::tile::Tile;
use crate::types::{TileColor, TileId};
use serde::{Deserialize, Serialize};
use tilewalk_prng::GameRng;

/// Which kind of tile a consumer is building.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileVariant {
    Gameplay,
    Editor,
    MapOverview,
}

pub trait TileFactory {
    /// A new unlinked, non-root tile.
    fn new_tile(&mut self, id: TileId, variant: TileVariant) -> Tile;

    /// A colour for a regrown or recoloured gameplay tile.
    fn fresh_color(&mut self) -> TileColor;

    /// A fresh colour different from the one it replaces whenever the
    /// palette allows. The default ignores the old colour.
    fn fresh_color_except(&mut self, _previous: TileColor) -> TileColor {
        self.fresh_color()
    }
}

#[derive(Clone, Debug)]
pub struct PaletteFactory {
    palette: Vec<TileColor>,
    rng: GameRng,
}

impl PaletteFactory {
    /// Draw from `palette` (with `TileColor::None` filtered out) using a
    /// generator seeded with `seed`.
    pub fn new(palette: Vec<TileColor>, seed: u64) -> Self {
        let palette = palette
            .into_iter()
            .filter(|&c| c != TileColor::None)
            .collect();
        Self {
            palette,
            rng: GameRng::new(seed),
        }
    }

    /// Palette and seed from the map config.
    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.palette.clone(), config.seed)
    }

    pub fn palette(&self) -> &[TileColor] {
        &self.palette
    }
}

impl TileFactory for PaletteFactory {
    fn new_tile(&mut self, id: TileId, variant: TileVariant) -> Tile {
        let color = match variant {
            TileVariant::Gameplay => self.fresh_color(),
            TileVariant::Editor | TileVariant::MapOverview => TileColor::None,
        };
        Tile::new(id).with_color(color)
    }

    fn fresh_color(&mut self) -> TileColor {
        self.rng.choose(&self.palette).unwrap_or(TileColor::None)
    }

    fn fresh_color_except(&mut self, previous: TileColor) -> TileColor {
        self.rng
            .choose_except(&self.palette, previous)
            .unwrap_or(TileColor::None)
    }
}
