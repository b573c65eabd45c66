/// Camera mode selector: (mode, player, orbit state) → view transform.
///
/// ## Modes
///
///   Top       — fixed ground plan, looking straight down
///   Tower     — fixed three-quarter view from the near edge
///   Advanced  — eye just ahead of the player, looking far ahead
///   Follow    — eye behind and above the player, same target
///   Heli      — orbits the origin; zoom and drag rotate it
///
/// `view()` is pure. Orbit bookkeeping (zoom flags, drag anchor) lives in
/// `OrbitState` and is advanced once per tick by `OrbitState::tick`.

use glam::{Mat4, Vec3};

use super::entity::{heading, Player};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CameraMode {
    Top,
    Tower,
    Advanced,
    Follow,
    Heli,
}

impl CameraMode {
    pub const ALL: [CameraMode; 5] = [
        CameraMode::Top,
        CameraMode::Advanced,
        CameraMode::Follow,
        CameraMode::Tower,
        CameraMode::Heli,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CameraMode::Top => "top",
            CameraMode::Tower => "tower",
            CameraMode::Advanced => "advanced",
            CameraMode::Follow => "follow",
            CameraMode::Heli => "heli",
        }
    }

    pub fn from_name(name: &str) -> Option<CameraMode> {
        CameraMode::ALL.into_iter().find(|m| m.name() == name.trim().to_ascii_lowercase())
    }

    /// Next mode in `ALL`, wrapping. Used by the gamepad cycle button.
    pub fn next(self) -> CameraMode {
        let idx = CameraMode::ALL.iter().position(|&m| m == self).unwrap_or(0);
        CameraMode::ALL[(idx + 1) % CameraMode::ALL.len()]
    }
}

/// Tunables for the orbiting camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitLimits {
    pub radius: f32,
    pub height: f32,
    /// Held zoom-in runs while the radius is at or above this.
    pub zoom_min: f32,
    /// Held zoom-out runs while the radius is at or below this.
    pub zoom_max: f32,
    /// Scroll-out stops here (scroll-in stops at `zoom_min`).
    pub scroll_max: f32,
    /// Degrees of orbit per column of drag.
    pub drag_sensitivity: f32,
}

impl Default for OrbitLimits {
    fn default() -> Self {
        OrbitLimits {
            radius: 180.0,
            height: 200.0,
            zoom_min: 20.0,
            zoom_max: 180.0,
            scroll_max: 170.0,
            drag_sensitivity: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrbitState {
    /// Degrees around the Y axis.
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub dragging: bool,
    pub anchor_angle: f32,
    pub anchor_x: f32,
    pub limits: OrbitLimits,
}

impl OrbitState {
    pub fn new(limits: OrbitLimits) -> Self {
        OrbitState {
            angle: 0.0,
            radius: limits.radius,
            height: limits.height,
            zoom_in: false,
            zoom_out: false,
            dragging: false,
            anchor_angle: 0.0,
            anchor_x: 0.0,
            limits,
        }
    }

    /// Held zoom. Radius and height move together, one unit per tick.
    pub fn tick(&mut self) {
        if self.zoom_in && self.radius >= self.limits.zoom_min {
            self.radius -= 1.0;
            self.height -= 1.0;
        }
        if self.zoom_out && self.radius <= self.limits.zoom_max {
            self.radius += 1.0;
            self.height += 1.0;
        }
    }

    /// One scroll notch. Positive = out, negative = in.
    pub fn scroll(&mut self, notches: i32) {
        if notches > 0 && self.radius <= self.limits.scroll_max {
            self.radius += 1.0;
            self.height += 1.0;
        } else if notches < 0 && self.radius >= self.limits.zoom_min {
            self.radius -= 1.0;
            self.height -= 1.0;
        }
    }

    pub fn begin_drag(&mut self, cursor_x: f32) {
        self.dragging = true;
        self.anchor_angle = self.angle;
        self.anchor_x = cursor_x;
    }

    /// Cursor left of the anchor swings the orbit one way, right the other.
    pub fn drag_to(&mut self, cursor_x: f32) {
        if !self.dragging {
            return;
        }
        let swing = (cursor_x - self.anchor_x).abs() * self.limits.drag_sensitivity;
        self.angle = if cursor_x < self.anchor_x {
            self.anchor_angle + swing
        } else {
            self.anchor_angle - swing
        };
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }
}

/// Camera selector state carried in the game aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraRig {
    pub mode: CameraMode,
    pub orbit: OrbitState,
}

impl CameraRig {
    pub fn new(mode: CameraMode, limits: OrbitLimits) -> Self {
        CameraRig { mode, orbit: OrbitState::new(limits) }
    }

    /// Switch modes. Choosing the orbit view re-centres its angle.
    pub fn select(&mut self, mode: CameraMode) {
        if mode == CameraMode::Heli {
            self.orbit.angle = 0.0;
        }
        self.mode = mode;
    }

    pub fn view(&self, player: &Player, edge: f32) -> View {
        view(self.mode, player, &self.orbit, edge)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct View {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl View {
    fn looking_at(eye: Vec3, target: Vec3) -> Self {
        View { eye, target, up: Vec3::Y }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }
}

/// Distance from the player to the follow cameras' look-at point.
const LOOK_AHEAD: f32 = 100.0;

pub fn view(mode: CameraMode, player: &Player, orbit: &OrbitState, edge: f32) -> View {
    let p = player.pos;
    let (s, c) = heading(player.angle);
    let ahead = Vec3::new(p.x + LOOK_AHEAD * s, 0.0, p.z - LOOK_AHEAD * c);

    match mode {
        CameraMode::Top => View::looking_at(Vec3::new(0.0, 250.0, 1.0), Vec3::ZERO),
        CameraMode::Tower => View::looking_at(Vec3::new(0.0, 200.0, 180.0), Vec3::ZERO),
        CameraMode::Advanced => {
            let half = edge / 2.0;
            View::looking_at(Vec3::new(p.x + half * s, p.y, p.z - half * c), ahead)
        }
        CameraMode::Follow => {
            View::looking_at(Vec3::new(p.x - edge * s, p.y + edge, p.z + edge * c), ahead)
        }
        CameraMode::Heli => {
            let (os, oc) = orbit.angle.to_radians().sin_cos();
            View::looking_at(
                Vec3::new(orbit.radius * os, orbit.height, orbit.radius * oc),
                Vec3::ZERO,
            )
        }
    }
}
