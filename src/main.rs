/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::camera::CameraMode;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::step;
use sim::world::GameState;
use ui::gamepad::GamepadState;
use ui::input::{InputState, PointerAction};
use ui::renderer::Renderer;
use ui::sound::{MusicWorker, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "adventura.log";

fn main() {
    init_tracing();

    let config = GameConfig::load();
    let mut state = GameState::new(&config);
    if let Err(e) = state.load_level(config.first_level) {
        warn!(error = %e, "starting on an empty grid");
    }

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();
    let mut music = config.music.as_deref().and_then(MusicWorker::start);

    let result = game_loop(&mut state, &mut renderer, sound.as_ref(), &config);

    if let Some(worker) = music.as_mut() {
        worker.stop();
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    info!(level = state.level, ticks = state.tick, "exit");
    println!("Thanks for playing Adventura! Reached level {}.", state.level);
}

/// The terminal is in raw mode while playing, so logs go to a file.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing() {
    let Ok(file) = File::create(LOG_FILE) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn game_loop(
    state: &mut GameState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    // Jump is edge-triggered but only consumed on the next tick.
    let mut pending_jump = false;
    let mut pad_connected = gp.connected();

    loop {
        kb.drain_events();
        gp.update();
        if gp.connected() != pad_connected {
            pad_connected = gp.connected();
            let msg = if pad_connected { "Gamepad connected" } else { "Gamepad disconnected" };
            state.set_message(msg, 60);
        }

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) || gp.quit_pressed() {
            break;
        }
        handle_meta(state, &kb, &gp);

        if kb.any_pressed(KEYS_JUMP) || gp.jump_pressed() {
            pending_jump = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let mut input = detect_movement(&kb, &gp);
            input.jump = std::mem::take(&mut pending_jump);
            let events = step::step(state, input);
            process_sound_events(sound, &events);
            last_tick = Instant::now();
        }

        renderer.render(state)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::TreasureCollected { .. } => sfx.play_treasure(),
            GameEvent::PortalOpened => sfx.play_portal(),
            GameEvent::Jumped => sfx.play_jump(),
            GameEvent::FellIntoVoid => sfx.play_fall(),
            GameEvent::LevelCleared { .. } => sfx.play_clear(),
            GameEvent::Landed => {}
        }
    }
}

// ── Key Constants ──

const KEYS_FORWARD: &[KeyCode] = &[KeyCode::Up];
const KEYS_BACKWARD: &[KeyCode] = &[KeyCode::Down];
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right];
const KEYS_TURN_LEFT: &[KeyCode] = &[KeyCode::Char('4')];
const KEYS_TURN_RIGHT: &[KeyCode] = &[KeyCode::Char('6')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_ZOOM_IN: &[KeyCode] = &[KeyCode::Char('+')];
const KEYS_ZOOM_OUT: &[KeyCode] = &[KeyCode::Char('-')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

const CAMERA_KEYS: &[(char, CameraMode)] = &[
    ('w', CameraMode::Top),
    ('a', CameraMode::Advanced),
    ('s', CameraMode::Follow),
    ('d', CameraMode::Tower),
    ('e', CameraMode::Heli),
];

fn detect_movement(kb: &InputState, gp: &GamepadState) -> FrameInput {
    let held = |keys: &[KeyCode]| kb.any_held(keys) || kb.any_pressed(keys);
    FrameInput {
        forward: held(KEYS_FORWARD) || gp.forward_held(),
        backward: held(KEYS_BACKWARD) || gp.backward_held(),
        left: held(KEYS_LEFT) || gp.left_held(),
        right: held(KEYS_RIGHT) || gp.right_held(),
        turn_left: held(KEYS_TURN_LEFT) || gp.turn_left_held(),
        turn_right: held(KEYS_TURN_RIGHT) || gp.turn_right_held(),
        jump: false,
    }
}

/// Camera selection, orbit zoom and drag, restart. Runs every frame.
fn handle_meta(state: &mut GameState, kb: &InputState, gp: &GamepadState) {
    for &(key, mode) in CAMERA_KEYS {
        if kb.any_pressed(&[KeyCode::Char(key), KeyCode::Char(key.to_ascii_uppercase())]) {
            state.camera.select(mode);
            state.set_message(&format!("Camera: {}", mode.name()), 40);
        }
    }
    if gp.next_camera_pressed() {
        let mode = state.camera.mode.next();
        state.camera.select(mode);
        state.set_message(&format!("Camera: {}", mode.name()), 40);
    }

    let orbit = &mut state.camera.orbit;
    orbit.zoom_in = kb.any_held(KEYS_ZOOM_IN);
    orbit.zoom_out = kb.any_held(KEYS_ZOOM_OUT);
    for action in &kb.pointer {
        match *action {
            PointerAction::DragStart { column } => orbit.begin_drag(column as f32),
            PointerAction::DragMove { column } => orbit.drag_to(column as f32),
            PointerAction::DragEnd => orbit.end_drag(),
            PointerAction::Scroll(notches) => orbit.scroll(notches),
        }
    }

    if kb.any_pressed(KEYS_RESTART) {
        step::restart(state);
        state.set_message("Restarted", 30);
    }
}
