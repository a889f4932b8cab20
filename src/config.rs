/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::movement::MovementParams;
use crate::domain::proximity::{TieBreak, DEFAULT_RADIUS};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tick_rate_ms: u64,
    pub movement: MovementParams,
    pub interaction: InteractionConfig,
    pub input: InputConfig,
    pub gamepad: GamepadConfig,
    pub assets: AssetConfig,
}

#[derive(Clone, Debug)]
pub struct InteractionConfig {
    pub radius: f32,
    pub tie_break: TieBreak,
    /// Close the overlay when the player walks out of range.
    pub close_on_leave: bool,
}

/// Which device class drives the player. Chosen once at startup.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputDevice {
    /// Gamepad if one is connected at startup, otherwise keyboard.
    #[default]
    Auto,
    Keyboard,
    Gamepad,
}

#[derive(Clone, Debug)]
pub struct InputConfig {
    pub device: InputDevice,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub interact: Vec<String>,
    pub close: Vec<String>,
    pub quit: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AssetConfig {
    pub map: PathBuf,
    pub sprite_sheet: PathBuf,
    /// Prefix POI image paths are normalized to.
    pub asset_root: String,
    /// Directory normalized POI image paths resolve from.
    pub base_dir: PathBuf,
    pub object_layer: String,
    pub spawn_name: String,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    interaction: TomlInteraction,
    #[serde(default)]
    input: TomlInput,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    assets: TomlAssets,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_base_speed")]
    base_speed: f32,
    #[serde(default = "default_run_multiplier")]
    run_multiplier: f32,
    #[serde(default = "default_walk_fps")]
    walk_fps: f32,
    #[serde(default = "default_run_fps")]
    run_fps: f32,
    #[serde(default = "default_stick_deadzone")]
    stick_deadzone: f32,
    #[serde(default = "default_stick_run_force")]
    stick_run_force: f32,
}

#[derive(Deserialize, Debug)]
struct TomlInteraction {
    #[serde(default = "default_radius")]
    radius: f32,
    #[serde(default)]
    tie_break: TieBreak,
    #[serde(default)]
    close_on_leave: bool,
}

#[derive(Deserialize, Debug, Default)]
struct TomlInput {
    #[serde(default)]
    device: InputDevice,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_interact")]
    interact: Vec<String>,
    #[serde(default = "default_close")]
    close: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlAssets {
    #[serde(default = "default_map")]
    map: String,
    #[serde(default = "default_sprite_sheet")]
    sprite_sheet: String,
    #[serde(default = "default_asset_root")]
    asset_root: String,
    #[serde(default = "default_object_layer")]
    object_layer: String,
    #[serde(default = "default_spawn_name")]
    spawn_name: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 33 }  // ~30 ticks per second
fn default_base_speed() -> f32 { 100.0 }
fn default_run_multiplier() -> f32 { 2.0 }
fn default_walk_fps() -> f32 { 6.0 }
fn default_run_fps() -> f32 { 12.0 }
fn default_stick_deadzone() -> f32 { 0.15 }
fn default_stick_run_force() -> f32 { 0.7 }
fn default_radius() -> f32 { DEFAULT_RADIUS }

fn default_interact() -> Vec<String> { vec!["A".into()] }
fn default_close() -> Vec<String> { vec!["B".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }

fn default_map() -> String { "assets/maps/plaza.json".into() }
fn default_sprite_sheet() -> String { "assets/player.png".into() }
fn default_asset_root() -> String { "assets/".into() }
fn default_object_layer() -> String { "Objects".into() }
fn default_spawn_name() -> String { "Spawn Point".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            base_speed: default_base_speed(),
            run_multiplier: default_run_multiplier(),
            walk_fps: default_walk_fps(),
            run_fps: default_run_fps(),
            stick_deadzone: default_stick_deadzone(),
            stick_run_force: default_stick_run_force(),
        }
    }
}

impl Default for TomlInteraction {
    fn default() -> Self {
        TomlInteraction {
            radius: default_radius(),
            tie_break: TieBreak::default(),
            close_on_leave: false,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            interact: default_interact(),
            close: default_close(),
            quit: default_quit(),
        }
    }
}

impl Default for TomlAssets {
    fn default() -> Self {
        TomlAssets {
            map: default_map(),
            sprite_sheet: default_sprite_sheet(),
            asset_root: default_asset_root(),
            object_layer: default_object_layer(),
            spawn_name: default_spawn_name(),
        }
    }
}

// ── Loading ──

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text. Relative asset paths resolve against `search_dirs`.
    pub fn parse(text: &str, search_dirs: &[PathBuf]) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, search_dirs))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        GameConfig {
            tick_rate_ms: cfg.speed.tick_rate_ms.max(1),
            movement: MovementParams {
                base_speed: cfg.movement.base_speed,
                run_multiplier: cfg.movement.run_multiplier,
                walk_fps: cfg.movement.walk_fps,
                run_fps: cfg.movement.run_fps,
                stick_deadzone: cfg.movement.stick_deadzone,
                stick_run_force: cfg.movement.stick_run_force,
            },
            interaction: InteractionConfig {
                radius: cfg.interaction.radius,
                tie_break: cfg.interaction.tie_break,
                close_on_leave: cfg.interaction.close_on_leave,
            },
            input: InputConfig { device: cfg.input.device },
            gamepad: GamepadConfig {
                interact: cfg.gamepad.interact,
                close: cfg.gamepad.close,
                quit: cfg.gamepad.quit,
            },
            assets: AssetConfig {
                map: resolve_path(&cfg.assets.map, search_dirs),
                sprite_sheet: resolve_path(&cfg.assets.sprite_sheet, search_dirs),
                base_dir: base_dir_for(&cfg.assets.asset_root, search_dirs),
                asset_root: cfg.assets.asset_root,
                object_layer: cfg.assets.object_layer,
                spawn_name: cfg.assets.spawn_name,
            },
        }
    }
}

/// Absolute paths pass through; relative ones resolve against the first
/// candidate dir where they exist, else stay relative to CWD.
fn resolve_path(path: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        return p.to_path_buf();
    }
    search_dirs.iter()
        .map(|d| d.join(p))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| p.to_path_buf())
}

/// First search dir that contains `asset_root`, else CWD.
fn base_dir_for(asset_root: &str, search_dirs: &[PathBuf]) -> PathBuf {
    search_dirs.iter()
        .find(|d| d.join(asset_root).is_dir())
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "config.toml parse error, using defaults: {e}");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    tracing::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    tracing::info!("no config.toml found, using defaults");
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::parse("", &[]).unwrap();
        assert_eq!(cfg.tick_rate_ms, 33);
        assert_eq!(cfg.interaction.radius, 40.0);
        assert_eq!(cfg.interaction.tie_break, TieBreak::First);
        assert!(!cfg.interaction.close_on_leave);
        assert_eq!(cfg.input.device, InputDevice::Auto);
        assert_eq!(cfg.assets.asset_root, "assets/");
        assert_eq!(cfg.assets.map, PathBuf::from("assets/maps/plaza.json"));
        assert_eq!(cfg.movement.run_multiplier, 2.0);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let text = include_str!("../config.toml");
        let cfg = GameConfig::parse(text, &[]).unwrap();
        let def = GameConfig::default();
        assert_eq!(cfg.tick_rate_ms, def.tick_rate_ms);
        assert_eq!(cfg.interaction.radius, def.interaction.radius);
        assert_eq!(cfg.interaction.tie_break, def.interaction.tie_break);
        assert_eq!(cfg.movement.stick_run_force, def.movement.stick_run_force);
        assert_eq!(cfg.gamepad.quit, def.gamepad.quit);
        assert_eq!(cfg.assets.map, def.assets.map);
        assert_eq!(cfg.assets.spawn_name, def.assets.spawn_name);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [interaction]
            tie_break = "nearest"
            close_on_leave = true

            [input]
            device = "gamepad"

            [movement]
            base_speed = 80.0
        "#;
        let cfg = GameConfig::parse(text, &[]).unwrap();
        assert_eq!(cfg.interaction.tie_break, TieBreak::Nearest);
        assert!(cfg.interaction.close_on_leave);
        assert_eq!(cfg.interaction.radius, 40.0);
        assert_eq!(cfg.input.device, InputDevice::Gamepad);
        assert_eq!(cfg.movement.base_speed, 80.0);
        assert_eq!(cfg.movement.walk_fps, 6.0);
        assert_eq!(cfg.gamepad.interact, vec!["A".to_string()]);
    }

    #[test]
    fn bad_enum_value_is_an_error() {
        assert!(GameConfig::parse("[input]\ndevice = \"joystick\"", &[]).is_err());
    }

    #[test]
    fn relative_paths_resolve_against_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("maps")).unwrap();
        std::fs::write(dir.path().join("maps/town.json"), "{}").unwrap();

        let text = "[assets]\nmap = \"maps/town.json\"\nsprite_sheet = \"missing.png\"";
        let cfg = GameConfig::parse(text, &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.assets.map, dir.path().join("maps/town.json"));
        assert_eq!(cfg.assets.sprite_sheet, PathBuf::from("missing.png"));
        assert_eq!(cfg.assets.base_dir, PathBuf::from("."));

        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        let cfg = GameConfig::parse("", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(cfg.assets.base_dir, dir.path().to_path_buf());
    }
}
