/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::camera::{CameraMode, OrbitLimits};
use crate::domain::geometry::GridDims;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tick_rate_ms: u64,
    pub levels_dir: PathBuf,
    pub level_extension: String,
    pub first_level: usize,
    /// Background track. `None` when the file could not be found.
    pub music: Option<PathBuf>,
    pub grid: GridConfig,
    pub physics: PhysicsConfig,
    pub camera: CameraConfig,
    pub level: LevelSettings,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_cols")]
    pub cols: usize,
    #[serde(default = "default_edge")]
    pub edge: f32,
}

/// Per-tick motion constants. Speeds are in world units per frame, so the
/// game runs faster or slower with `tick_rate_ms`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PhysicsConfig {
    #[serde(default = "default_unit")]
    pub walk_step: f32,
    #[serde(default = "default_unit")]
    pub turn_step: f32,
    #[serde(default = "default_unit")]
    pub fall_step: f32,
    #[serde(default = "default_jump_velocity")]
    pub jump_velocity: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_unit")]
    pub moving_block_step: f32,
    #[serde(default = "default_moving_limit")]
    pub moving_block_limit: f32,
    #[serde(default = "default_portal_rise")]
    pub portal_rise_step: f32,
    #[serde(default = "default_portal_max")]
    pub portal_max: f32,
    #[serde(default = "default_portal_start")]
    pub portal_start: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default = "default_camera")]
    pub initial: String,
    #[serde(default = "default_orbit_radius")]
    pub orbit_radius: f32,
    #[serde(default = "default_orbit_height")]
    pub orbit_height: f32,
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f32,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f32,
    #[serde(default = "default_scroll_max")]
    pub scroll_max: f32,
    #[serde(default = "default_drag_sensitivity")]
    pub drag_sensitivity: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LevelSettings {
    /// Keep entities from earlier levels when a new level is scanned.
    #[serde(default = "default_true")]
    pub cumulative_entities: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GamepadConfig {
    #[serde(default = "default_jump")]
    pub jump: Vec<String>,
    #[serde(default = "default_turn_left")]
    pub turn_left: Vec<String>,
    #[serde(default = "default_turn_right")]
    pub turn_right: Vec<String>,
    #[serde(default = "default_next_camera")]
    pub next_camera: Vec<String>,
    #[serde(default = "default_quit")]
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    grid: GridConfig,
    #[serde(default)]
    physics: PhysicsConfig,
    #[serde(default)]
    camera: CameraConfig,
    #[serde(default)]
    level: LevelSettings,
    #[serde(default)]
    gamepad: GamepadConfig,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_level_extension")]
    level_extension: String,
    #[serde(default = "default_first_level")]
    first_level: usize,
    #[serde(default = "default_music")]
    music: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 fps; all motion is per tick
fn default_levels_dir() -> String { "levels".into() }
fn default_level_extension() -> String { ".txt".into() }
fn default_first_level() -> usize { 1 }
fn default_music() -> String { "game.mp3".into() }

fn default_rows() -> usize { 10 }
fn default_cols() -> usize { 10 }
fn default_edge() -> f32 { 20.0 }

fn default_unit() -> f32 { 1.0 }
fn default_jump_velocity() -> f32 { 5.0 }
fn default_gravity() -> f32 { 0.5 }
fn default_moving_limit() -> f32 { 120.0 }
fn default_portal_rise() -> f32 { 0.2 }
fn default_portal_max() -> f32 { 10.0 }
fn default_portal_start() -> f32 { -10.0 }

fn default_camera() -> String { "tower".into() }
fn default_orbit_radius() -> f32 { 180.0 }
fn default_orbit_height() -> f32 { 200.0 }
fn default_zoom_min() -> f32 { 20.0 }
fn default_zoom_max() -> f32 { 180.0 }
fn default_scroll_max() -> f32 { 170.0 }
fn default_drag_sensitivity() -> f32 { 0.1 }

fn default_true() -> bool { true }

fn default_jump() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_turn_left() -> Vec<String> { vec!["L1".into()] }
fn default_turn_right() -> Vec<String> { vec!["R1".into()] }
fn default_next_camera() -> Vec<String> { vec!["Y".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            levels_dir: default_levels_dir(),
            level_extension: default_level_extension(),
            first_level: default_first_level(),
            music: default_music(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { rows: default_rows(), cols: default_cols(), edge: default_edge() }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            walk_step: default_unit(),
            turn_step: default_unit(),
            fall_step: default_unit(),
            jump_velocity: default_jump_velocity(),
            gravity: default_gravity(),
            moving_block_step: default_unit(),
            moving_block_limit: default_moving_limit(),
            portal_rise_step: default_portal_rise(),
            portal_max: default_portal_max(),
            portal_start: default_portal_start(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            initial: default_camera(),
            orbit_radius: default_orbit_radius(),
            orbit_height: default_orbit_height(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            scroll_max: default_scroll_max(),
            drag_sensitivity: default_drag_sensitivity(),
        }
    }
}

impl Default for LevelSettings {
    fn default() -> Self {
        LevelSettings { cumulative_entities: default_true() }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        GamepadConfig {
            jump: default_jump(),
            turn_left: default_turn_left(),
            turn_right: default_turn_right(),
            next_camera: default_next_camera(),
            quit: default_quit(),
        }
    }
}

// ── Derived views ──

impl GridConfig {
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.rows, self.cols, self.edge)
    }
}

impl CameraConfig {
    pub fn limits(&self) -> OrbitLimits {
        OrbitLimits {
            radius: self.orbit_radius,
            height: self.orbit_height,
            zoom_min: self.zoom_min,
            zoom_max: self.zoom_max,
            scroll_max: self.scroll_max,
            drag_sensitivity: self.drag_sensitivity,
        }
    }

    /// Starting camera. Unknown names fall back to the tower view.
    pub fn initial_mode(&self) -> CameraMode {
        CameraMode::from_name(&self.initial).unwrap_or_else(|| {
            warn!(name = %self.initial, "unknown camera mode in config, using tower");
            CameraMode::Tower
        })
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) ~/.local/share/adventura, (4) /usr/share/adventura.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let general = toml_cfg.general;
        let levels_dir = find_in(search_dirs, &general.levels_dir, Path::is_dir)
            .unwrap_or_else(|| PathBuf::from(&general.levels_dir));
        let music = find_in(search_dirs, &general.music, Path::is_file);
        if music.is_none() {
            warn!(file = %general.music, "music file not found, playing without it");
        }

        GameConfig {
            tick_rate_ms: general.tick_rate_ms.max(1),
            levels_dir,
            level_extension: general.level_extension,
            first_level: general.first_level,
            music,
            grid: toml_cfg.grid,
            physics: toml_cfg.physics,
            camera: toml_cfg.camera,
            level: toml_cfg.level,
            gamepad: toml_cfg.gamepad,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::resolve(TomlConfig::default(), &[])
    }
}

/// Resolve a configured path: absolute paths are taken as-is, relative ones
/// are looked up in each candidate directory.
fn find_in(search_dirs: &[PathBuf], name: &str, accept: fn(&Path) -> bool) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return accept(&path).then_some(path);
    }
    search_dirs.iter().map(|d| d.join(name)).find(|p| accept(p))
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
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

    // 3. XDG data home (~/.local/share/adventura)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/adventura");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/adventura)
    let sys = PathBuf::from("/usr/share/adventura");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn parse_toml(text: &str) -> Result<TomlConfig, toml::de::Error> {
    toml::from_str::<TomlConfig>(text)
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match parse_toml(&text) {
                    Ok(cfg) => {
                        info!(path = %path.display(), "loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "config.toml parse error, using defaults");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read config file");
                }
            }
        }
    }
    TomlConfig::default()
}
