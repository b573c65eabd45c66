/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Walk (up/down) and strafe (left/right)
///   Right Stick X         →  Turn
///   A / B                 →  Jump
///   L1 / R1               →  Turn left / right
///   Y                     →  Next camera
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{debug, info};

use crate::config::GamepadConfig;

const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Held (continuous) plus pressed-this-frame (edge).
#[derive(Clone, Copy, Debug, Default)]
struct Key {
    held: bool,
    fresh: bool,
}

impl Key {
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn set(&mut self, down: bool) {
        self.held = down;
        self.fresh |= down;
    }
}

/// D-pad directions, stored after the ten face/shoulder buttons.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pad {
    Up = 10,
    Down,
    Left,
    Right,
}

const KEY_SLOTS: usize = 14;

/// Action-to-button mapping (loaded from config).
#[derive(Debug, PartialEq)]
struct ActionMap {
    jump: Vec<Btn>,
    turn_left: Vec<Btn>,
    turn_right: Vec<Btn>,
    next_camera: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            jump: vec![Btn::A, Btn::B],
            turn_left: vec![Btn::L1],
            turn_right: vec![Btn::R1],
            next_camera: vec![Btn::Y],
            quit: vec![Btn::Select],
        }
    }
}

impl ActionMap {
    /// Apply config. Lists with no recognizable button keep their default.
    fn apply(&mut self, cfg: &GamepadConfig) {
        let slots: [(&mut Vec<Btn>, &[String]); 5] = [
            (&mut self.jump, cfg.jump.as_slice()),
            (&mut self.turn_left, cfg.turn_left.as_slice()),
            (&mut self.turn_right, cfg.turn_right.as_slice()),
            (&mut self.next_camera, cfg.next_camera.as_slice()),
            (&mut self.quit, cfg.quit.as_slice()),
        ];
        for (slot, names) in slots {
            let parsed: Vec<Btn> = names.iter().filter_map(|n| Btn::from_name(n)).collect();
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
    }
}

/// Analog inputs after the last axis event.
#[derive(Clone, Copy, Debug, Default)]
struct Sticks {
    move_x: f32,
    move_y: f32,
    look_x: f32,
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    keys: [Key; KEY_SLOTS],
    sticks: Sticks,
    actions: ActionMap,
    connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                if has_pad {
                    info!("gamepad detected");
                }
                (Some(g), has_pad)
            }
            Err(e) => {
                debug!(error = %e, "gamepad support unavailable");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            keys: [Key::default(); KEY_SLOTS],
            sticks: Sticks::default(),
            actions: ActionMap::default(),
            connected,
        }
    }

    /// A pad has been seen since start-up and not unplugged since.
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.actions.apply(cfg);
    }

    /// Poll once per frame. Clears last frame's edges first.
    pub fn update(&mut self) {
        for key in &mut self.keys {
            key.fresh = false;
        }

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return;
        };
        let events: Vec<EventType> = std::iter::from_fn(|| gilrs.next_event()).map(|e| e.event).collect();

        for event in events {
            match event {
                EventType::ButtonPressed(btn, _) => self.on_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.on_button(btn, false),
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.sticks.move_x = value,
                        Axis::LeftStickY => self.sticks.move_y = value,
                        Axis::RightStickX => self.sticks.look_x = value,
                        _ => {}
                    }
                }
                EventType::Connected => self.connected = true,
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.connected = false;
                    self.keys = [Key::default(); KEY_SLOTS];
                    self.sticks = Sticks::default();
                }
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn on_button(&mut self, button: Button, down: bool) {
        self.connected = true;
        let slot = match button {
            Button::DPadUp => Some(Pad::Up as usize),
            Button::DPadDown => Some(Pad::Down as usize),
            Button::DPadLeft => Some(Pad::Left as usize),
            Button::DPadRight => Some(Pad::Right as usize),
            other => Btn::from_gilrs(other).map(|b| b as usize),
        };
        if let Some(i) = slot {
            self.keys[i].set(down);
        }
    }

    // ── Action queries (config-driven) ──

    fn pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.keys[b as usize].fresh)
    }

    fn held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.keys[b as usize].held)
    }

    fn pad(&self, dir: Pad) -> bool {
        self.keys[dir as usize].held
    }

    pub fn jump_pressed(&self) -> bool {
        self.pressed(&self.actions.jump)
    }
    pub fn next_camera_pressed(&self) -> bool {
        self.pressed(&self.actions.next_camera)
    }
    pub fn quit_pressed(&self) -> bool {
        self.pressed(&self.actions.quit)
    }

    pub fn turn_left_held(&self) -> bool {
        self.held(&self.actions.turn_left) || self.sticks.look_x < -STICK_DEADZONE
    }
    pub fn turn_right_held(&self) -> bool {
        self.held(&self.actions.turn_right) || self.sticks.look_x > STICK_DEADZONE
    }

    // Movement: d-pad or left stick
    pub fn forward_held(&self) -> bool {
        self.pad(Pad::Up) || self.sticks.move_y > STICK_DEADZONE
    }
    pub fn backward_held(&self) -> bool {
        self.pad(Pad::Down) || self.sticks.move_y < -STICK_DEADZONE
    }
    pub fn left_held(&self) -> bool {
        self.pad(Pad::Left) || self.sticks.move_x < -STICK_DEADZONE
    }
    pub fn right_held(&self) -> bool {
        self.pad(Pad::Right) || self.sticks.move_x > STICK_DEADZONE
    }
}
