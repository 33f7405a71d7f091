// CLI entry point for the tilewalk level tool.
//
// Loads level JSON files through the same builder and level map the game
// uses, so a level that passes `inspect` here loads in the game. Nothing is
// rendered; output is text (inspect) or JSON (flatten, play).
//
// Usage:
//   tilewalk [--verbose | --quiet] <COMMAND>
//     inspect <LEVEL> [--config <FILE>] [--seed <N>]
//         Build the level and print its shape: tiles, roots, layers, edges.
//     flatten <LEVEL> [--output <FILE>]
//         Rebuild and write the canonical flat form (roots by id, edges
//         breadth-first from each root).
//     play <LEVEL> [--config <FILE>] [--seed <N>] [--commands <FILE>] [--remove <ID,...>]
//         Load for gameplay, apply commands, print every event as a JSON line.
//
// Logging goes to stderr through `tracing-subscriber`; `RUST_LOG` overrides
// the level picked by --verbose / --quiet.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tilewalk_core::command::MapCommand;
use tilewalk_core::config::MapConfig;
use tilewalk_core::instructions::LevelData;
use tilewalk_core::types::TileId;
use tilewalk_core::{LevelMap, MapMode};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tilewalk")]
#[command(about = "Inspect, normalize and replay tilewalk levels", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a level and print a summary
    Inspect {
        level: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
    /// Rebuild a level and write its canonical flat form
    Flatten {
        level: PathBuf,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a level for gameplay and replay removals
    Play {
        level: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
        /// JSON array of map commands
        #[arg(long)]
        commands: Option<PathBuf>,
        /// Tile ids to remove, applied after --commands
        #[arg(long, value_delimiter = ',')]
        remove: Vec<i32>,
    },
}

#[derive(Args)]
struct Tuning {
    /// Map config JSON (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the colour seed
    #[arg(long)]
    seed: Option<u64>,
}

impl Tuning {
    fn load(&self) -> Result<MapConfig> {
        let mut config = match &self.config {
            Some(path) => MapConfig::from_json(&read(path)?)
                .with_context(|| format!("invalid config {}", path.display()))?,
            None => MapConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Inspect { level, tuning } => inspect(&level, &tuning.load()?),
        Commands::Flatten { level, output } => flatten(&level, output.as_deref()),
        Commands::Play {
            level,
            tuning,
            commands,
            remove,
        } => play(&level, tuning.load()?, commands.as_deref(), &remove),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = match (verbose, quiet) {
        (true, _) => "tilewalk_core=debug,tilewalk_cli=debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn read_level(path: &Path) -> Result<LevelData> {
    LevelData::from_json(&read(path)?).with_context(|| format!("invalid level {}", path.display()))
}

fn load_map(path: &Path, config: MapConfig, mode: MapMode) -> Result<LevelMap> {
    let level = read_level(path)?;
    let (map, step) = LevelMap::from_level(&level, config, mode)
        .with_context(|| format!("level {} does not build", path.display()))?;
    debug!(events = step.events.len(), "load events");
    Ok(map)
}

fn inspect(path: &Path, config: &MapConfig) -> Result<()> {
    let map = load_map(path, config.clone(), MapMode::Gameplay)?;
    print!("{}", summarize(&map));
    Ok(())
}

fn summarize(map: &LevelMap) -> String {
    let forest = map.forest();
    let meta = map.metadata();
    let layer_sizes: Vec<String> = map.layers().iter().map(|l| l.len().to_string()).collect();
    let leaves = forest.tiles().filter(|t| t.is_leaf()).count();
    let mut out = String::new();
    out.push_str(&format!("level:   {}\n", if meta.id.is_empty() { "-" } else { &meta.id }));
    out.push_str(&format!("target:  {} ({} stars to unlock)\n", meta.target, meta.stars_required));
    out.push_str(&format!("tiles:   {} ({} leaves)\n", forest.len(), leaves));
    out.push_str(&format!("roots:   {}\n", forest.roots().len()));
    out.push_str(&format!("edges:   {}\n", forest.instructions().len()));
    out.push_str(&format!("layers:  {} [{}]\n", layer_sizes.len(), layer_sizes.join(", ")));
    out.push_str(&format!("combo:   {}\n", if map.any_combo_left() { "yes" } else { "no" }));
    out
}

fn flatten(path: &Path, output: Option<&Path>) -> Result<()> {
    let map = load_map(path, MapConfig::default(), MapMode::Overview)?;
    let json = map.to_level_data().to_json()?;
    match output {
        Some(out) => {
            fs::write(out, json + "\n").with_context(|| format!("cannot write {}", out.display()))?;
            info!(from = %path.display(), to = %out.display(), "level flattened");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn play(path: &Path, config: MapConfig, commands: Option<&Path>, remove: &[i32]) -> Result<()> {
    let mut script: Vec<MapCommand> = match commands {
        Some(file) => serde_json::from_str(&read(file)?)
            .with_context(|| format!("invalid command list {}", file.display()))?,
        None => Vec::new(),
    };
    script.extend(remove.iter().map(|&id| MapCommand::RemoveTile { tile: TileId(id) }));
    if script.is_empty() {
        bail!("nothing to play: pass --commands or --remove");
    }

    let mut map = load_map(path, config, MapMode::Gameplay)?;
    for (n, command) in script.iter().enumerate() {
        let step = map
            .apply(command)
            .with_context(|| format!("command #{n} ({command:?}) rejected"))?;
        for event in &step.events {
            println!("{}", serde_json::to_string(event)?);
        }
    }
    info!(commands = script.len(), state = ?map.state(), "replay finished");
    map.unload();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn remove_list_splits_on_commas() {
        let cli = Cli::parse_from(["tilewalk", "play", "level.json", "--remove", "3,5,8"]);
        match cli.command {
            Commands::Play { remove, .. } => assert_eq!(remove, vec![3, 5, 8]),
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn summary_lists_shape() {
        let level = LevelData::from_json(
            r#"{
                "metadata": { "id": "tiny", "target": 10, "map_size": 3.0, "stars_required": 0 },
                "roots": [{ "id": 1, "position": [0, 0, 0], "orientation": [0, 0, 0] }],
                "instructions": [
                    { "root": 1, "tile": 2, "direction": "North", "rule": "Plain" },
                    { "root": 1, "tile": 3, "direction": "East", "rule": "Plain" }
                ]
            }"#,
        )
        .unwrap();
        let (map, _) = LevelMap::from_level(&level, MapConfig::default(), MapMode::Gameplay).unwrap();
        let summary = summarize(&map);
        assert!(summary.contains("level:   tiny"));
        assert!(summary.contains("tiles:   3 (2 leaves)"));
        assert!(summary.contains("layers:  2 [1, 2]"));
    }
}
