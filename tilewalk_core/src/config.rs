// Data-driven puzzle configuration.
//
// All tunable gameplay parameters live in `MapConfig`, loaded from JSON next
// to the level files. The level map never uses magic numbers for combo sizes,
// cascade limits or tile geometry; it reads them from here.
//
// Geometry values (`tile_spacing`, `vertical_step`, `tile_extent`,
// `separation_bounds_factor`) only feed transform placement and the editor's
// bounds-overlap check. They never affect link topology.
//
// See also: `level_map.rs` which owns the `MapConfig`, `factory.rs` which
// draws colours from `palette`, `forest.rs` for placement.
//
// **Critical constraint: determinism.** `seed` drives every random colour.
// Two maps built from the same level data and config are identical.

use crate::error::Result;
use crate::types::TileColor;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Colours the factory draws from. Must not contain `TileColor::None`.
    pub palette: Vec<TileColor>,

    /// Smallest same-colour patch that counts as a combo.
    pub combo_min_size: usize,

    /// Upper bound on consecutive combo resolutions after one removal, so a
    /// pathological palette cannot loop forever.
    pub max_combo_cascade: usize,

    /// Patch size that awards a line power-up to the patch's source tile.
    pub line_power_up_combo_size: usize,

    /// Patch size that awards a colour-match power-up instead.
    pub color_power_up_combo_size: usize,

    /// World distance between horizontally adjacent tiles.
    pub tile_spacing: f32,

    /// World height of one `WalkRule::Up` / `WalkRule::Down` step.
    pub vertical_step: f32,

    /// Half-size of a tile's axis-aligned bounds.
    pub tile_extent: [f32; 3],

    /// Bounds scale used by the editor overlap check. Values below 1 allow
    /// touching tiles to sit side by side.
    pub separation_bounds_factor: f32,

    /// Resolve combos that already exist right after a gameplay load.
    pub settle_combos_on_load: bool,

    pub seed: u64,
}

impl MapConfig {
    /// Parse a config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty-printed JSON with every field spelled out.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            palette: vec![
                TileColor::Red,
                TileColor::Green,
                TileColor::Blue,
                TileColor::Yellow,
            ],
            combo_min_size: 3,
            max_combo_cascade: 32,
            line_power_up_combo_size: 5,
            color_power_up_combo_size: 7,
            tile_spacing: 1.0,
            vertical_step: 0.5,
            tile_extent: [0.5, 0.25, 0.5],
            separation_bounds_factor: 0.9,
            settle_combos_on_load: false,
            seed: 0x7157_1e5e_ed00_0001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrips() {
        let config = MapConfig::default();
        let json = config.to_json().unwrap();
        let restored = MapConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = MapConfig::from_json(r#"{ "combo_min_size": 4, "seed": 9 }"#).unwrap();
        assert_eq!(config.combo_min_size, 4);
        assert_eq!(config.seed, 9);
        assert_eq!(config.palette, MapConfig::default().palette);
    }

    #[test]
    fn default_palette_has_no_sentinel() {
        assert!(!MapConfig::default().palette.contains(&TileColor::None));
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(MapConfig::from_json("{ not json").is_err());
    }
}
