/// GameState: the complete snapshot of a running game.
///
/// ## Layers
///
///   - `grid`     — the tile grid as loaded. Level files overlay it; nothing
///                  else writes to it.
///   - `registry` — entities derived from the grid (holes, blocks, treasures,
///                  moving blocks). Treasure pickup and block motion mutate
///                  only this layer.
///
/// Everything the controller, camera and renderer need lives here and is
/// passed by reference; there is no global state.

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::config::{GameConfig, LevelSettings, PhysicsConfig};
use crate::domain::camera::{CameraRig, View};
use crate::domain::entity::{Player, Portal};
use crate::domain::geometry::{Aabb, GridDims};
use crate::domain::physics::ground_rest;
use crate::domain::registry::EntityRegistry;
use crate::sim::level::{LevelError, LevelGrid, LevelSource};

pub struct GameState {
    // ── Level ──
    pub grid: LevelGrid,
    pub registry: EntityRegistry,
    pub source: LevelSource,
    pub level: usize,
    /// False while the current level index has no file and the previous
    /// grid is being replayed.
    pub level_loaded: bool,

    // ── Entities ──
    pub player: Player,
    pub portal: Portal,

    // ── View ──
    pub camera: CameraRig,

    // ── Tunables ──
    pub physics: PhysicsConfig,
    pub settings: LevelSettings,

    // ── Meta ──
    pub tick: u64,
    pub message: String,
    pub message_timer: u32,
}

impl GameState {
    /// Fresh state on an all-floor grid. Call `load_level` to populate it.
    pub fn new(config: &GameConfig) -> Self {
        let dims = config.grid.dims();
        let mut state = GameState {
            grid: LevelGrid::new(dims),
            registry: EntityRegistry::new(),
            source: LevelSource::new(&config.levels_dir, config.level_extension.clone()),
            level: config.first_level,
            level_loaded: false,
            player: Player::new(Vec3::ZERO),
            portal: Portal::closed(config.physics.portal_start),
            camera: CameraRig::new(config.camera.initial_mode(), config.camera.limits()),
            physics: config.physics.clone(),
            settings: config.level.clone(),
            tick: 0,
            message: String::new(),
            message_timer: 0,
        };
        state.reset_player();
        state
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.grid.dims
    }

    #[inline]
    pub fn edge(&self) -> f32 {
        self.grid.dims.edge
    }

    // ── Spawn / portal ──

    /// Bottom-left tile, standing on the ground plane.
    pub fn spawn_point(&self) -> Vec3 {
        let dims = self.dims();
        let (x, z) = dims.tile_center(dims.rows.saturating_sub(1), 0);
        Vec3::new(x, ground_rest(dims.edge), z)
    }

    /// Top-right tile.
    pub fn portal_tile(&self) -> (usize, usize) {
        (0, self.dims().cols.saturating_sub(1))
    }

    pub fn portal_bounds(&self) -> Aabb {
        let (row, col) = self.portal_tile();
        let (x, z) = self.dims().tile_center(row, col);
        Aabb::new(Vec3::new(x, self.portal.y, z), Vec3::splat(self.edge() / 2.0))
    }

    /// Back to spawn, facing forward, at rest. The registry is not touched.
    pub fn reset_player(&mut self) {
        self.player = Player::new(self.spawn_point());
    }

    pub fn reset_portal(&mut self) {
        self.portal = Portal::closed(self.physics.portal_start);
    }

    // ── Loading ──

    /// Overlay level `index` onto the grid and re-scan it.
    ///
    /// The scan runs even when the file is missing, so the previous grid is
    /// replayed (and, with cumulative entities, its entities doubled up).
    pub fn load_level(&mut self, index: usize) -> Result<(), LevelError> {
        self.level = index;
        let result = self.grid.load(&self.source, index);
        match &result {
            Ok(()) => {
                info!(level = index, path = %self.source.path_for(index).display(), "level loaded");
                self.level_loaded = true;
            }
            Err(e) => {
                warn!(level = index, error = %e, "level load failed, keeping previous grid");
                self.level_loaded = false;
            }
        }
        self.scan_grid();
        info!(
            holes = self.registry.holes.len(),
            blocks = self.registry.blocks.len(),
            treasures = self.registry.treasures.len(),
            moving = self.registry.moving.len(),
            "entities scanned"
        );
        debug!(rows = ?self.grid.rows_as_text(), "grid");
        result
    }

    /// Rebuild the registry from the grid, honoring `cumulative_entities`.
    pub fn scan_grid(&mut self) {
        if !self.settings.cumulative_entities {
            self.registry.clear();
        }
        self.registry.populate(&self.grid.cells, &self.grid.dims);
    }

    // ── View ──

    pub fn view(&self) -> View {
        self.camera.view(&self.player, self.edge())
    }

    // ── UI ──

    pub fn set_message(&mut self, msg: &str, ticks: u32) {
        self.message = msg.to_string();
        self.message_timer = ticks;
    }

    /// Count the message timer down; clears the message when it expires.
    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}
