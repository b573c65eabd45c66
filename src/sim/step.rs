/// Simulation step: advances one tick.
///
/// ## Tick order
///
///   1. Moving blocks advance (unconditional), orbit camera zooms
///   2. Jump trigger (edge input)
///   3. Movement controller:
///        turn → fall check → jump integration → block drift →
///        treasure → translation
///   4. Portal rises (when open)
///   5. Portal reached → next level
///
/// The jump trigger is applied before the controller, so a jump pressed this
/// frame already integrates this tick and skips this tick's fall check.
///
/// ## Ground plane
///
/// Passive falls and jump descents that would carry the player from above the
/// ground plane to below it stop exactly on it, unless the player is over a
/// hole or off the grid. Riding a moving block is not clamped.

use tracing::{debug, info};

use crate::config::PhysicsConfig;
use crate::domain::camera::CameraMode;
use crate::domain::entity::{FrameInput, MoveDir, Player};
use crate::domain::physics::{self, ground_rest, Scene, Support};
use crate::sim::event::GameEvent;
use crate::sim::world::GameState;

// ══════════════════════════════════════════════════════════════
// Main entry
// ══════════════════════════════════════════════════════════════

pub fn step(state: &mut GameState, input: FrameInput) -> Vec<GameEvent> {
    let mut events = Vec::new();
    state.tick += 1;

    let limit = state.physics.moving_block_limit;
    state.registry.advance_moving_blocks(state.physics.moving_block_step, limit);
    if state.camera.mode == CameraMode::Heli {
        state.camera.orbit.tick();
    }

    if input.jump && try_jump(state) {
        events.push(GameEvent::Jumped);
    }

    move_player(state, &input, &mut events);

    let (rise, max) = (state.physics.portal_rise_step, state.physics.portal_max);
    state.portal.animate(rise, max);

    if portal_reached(state) {
        advance_level(state, &mut events);
    }

    state.tick_message();
    events
}

/// Start a jump if something is holding the player up.
pub fn try_jump(state: &mut GameState) -> bool {
    let GameState { grid, registry, player, physics: phys, .. } = state;
    let scene = Scene::new(&grid.dims, registry);

    let standing = physics::block_contact(player, &scene).is_some()
        || physics::support(player, &scene).is_some();
    if standing {
        player.jumping = true;
        player.vy = phys.jump_velocity;
    }
    standing
}

/// Is the player touching the open portal?
pub fn portal_reached(state: &GameState) -> bool {
    state.portal.open && state.portal_bounds().touches(&state.player.bounds(state.edge()))
}

/// Portal entered: back to spawn, portal closed, next level loaded.
pub fn advance_level(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let next = state.level + 1;
    info!(from = state.level, to = next, "portal reached");
    state.reset_player();
    state.reset_portal();
    match state.load_level(next) {
        Ok(()) => state.set_message(&format!("Level {}", next), 90),
        Err(_) => state.set_message(&format!("Level {} missing, replaying", next), 90),
    }
    events.push(GameEvent::LevelCleared { next });
}

/// Back to spawn. Collected treasures stay collected.
pub fn restart(state: &mut GameState) {
    debug!(level = state.level, "restart");
    state.reset_player();
}

// ══════════════════════════════════════════════════════════════
// Movement controller
// ══════════════════════════════════════════════════════════════

fn move_player(state: &mut GameState, input: &FrameInput, events: &mut Vec<GameEvent>) {
    let GameState { grid, registry, player, portal, physics: phys, .. } = state;
    let dims = grid.dims;
    let edge = dims.edge;

    // ── 1. Turn ──
    if input.turn_right {
        player.angle += phys.turn_step;
    }
    if input.turn_left {
        player.angle -= phys.turn_step;
    }

    let scene = Scene::new(&dims, registry);

    // ── 2. Fall check ──
    if !player.jumping {
        if physics::over_void(player, &scene) {
            if !player.falling {
                debug!(x = player.pos.x, z = player.pos.z, "fell into void");
                events.push(GameEvent::FellIntoVoid);
            }
            player.falling = true;
            player.pos.y -= phys.fall_step;
            return;
        }
        settle(player, &scene, phys);
    }

    // ── 3. Jump integration ──
    if player.jumping {
        let before = player.pos.y;
        player.pos.y += player.vy;
        clamp_to_ground(player, before, &scene);
        if jump_landed(player, &scene) {
            player.vy = 0.0;
            player.jumping = false;
            events.push(GameEvent::Landed);
        } else {
            player.vy -= phys.gravity;
        }
    }

    // ── 4. Block-riding drift ──
    if matches!(physics::block_contact(player, &scene), Some(Support::StaticBlock(_))) {
        player.angle -= phys.turn_step;
    }

    // ── 5. Treasure ──
    let had = registry.treasures_left();
    let all_taken = registry.collect_treasure_at(&player.bounds(edge), &dims);
    if registry.treasures_left() < had {
        events.push(GameEvent::TreasureCollected { remaining: registry.treasures_left() });
    }
    if all_taken && !portal.open {
        info!("all treasure collected, portal open");
        portal.open = true;
        events.push(GameEvent::PortalOpened);
    }

    // ── 6. Translation ──
    if player.falling {
        return;
    }
    let scene = Scene::new(&dims, registry);
    for dir in MoveDir::ALL {
        if input.held(dir) && !physics::is_blocked(player, dir, phys.walk_step, &scene) {
            player.pos += dir.step(player.angle) * phys.walk_step;
        }
    }
}

/// Fall check for a player that is over solid footing: snap onto what is
/// underneath, or drop one step.
fn settle(player: &mut Player, scene: &Scene, phys: &PhysicsConfig) {
    let edge = scene.dims.edge;
    match physics::block_contact(player, scene) {
        Some(Support::StaticBlock(_)) => {
            player.pos.y = physics::block_rest(edge);
        }
        Some(Support::MovingBlock(i)) => {
            let top = scene.registry.moving[i].height;
            // Digit tiles have no floor: a sinking block carries the
            // player down its shaft, past the ground plane.
            if player.base(edge) > top {
                player.pos.y -= phys.fall_step;
            } else {
                player.pos.y = top + edge / 2.0;
            }
        }
        Some(Support::Ground) | None => {
            if physics::support(player, scene).is_none() {
                let before = player.pos.y;
                player.pos.y -= phys.fall_step;
                clamp_to_ground(player, before, scene);
            }
            return;
        }
    }
    player.falling = false;
    player.vy = 0.0;
}

fn jump_landed(player: &mut Player, scene: &Scene) -> bool {
    let edge = scene.dims.edge;
    match physics::block_contact(player, scene) {
        Some(Support::StaticBlock(_)) => true,
        Some(Support::MovingBlock(i)) => {
            scene.registry.moving[i].height >= player.base(edge)
                || matches!(
                    physics::support(player, scene),
                    Some(Support::Ground | Support::StaticBlock(_))
                )
        }
        Some(Support::Ground) | None => physics::support(player, scene).is_some(),
    }
}

fn clamp_to_ground(player: &mut Player, before: f32, scene: &Scene) {
    let rest = ground_rest(scene.dims.edge);
    if before >= rest && player.pos.y < rest && !physics::over_void(player, scene) {
        player.pos.y = rest;
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::physics::support;
    use glam::Vec3;

    fn state_from(rows: &[&str]) -> GameState {
        let mut state = GameState::new(&GameConfig::default());
        state.grid.apply_text(&rows.join("\n"));
        state.scan_grid();
        state
    }

    fn empty_level() -> GameState {
        // One treasure far away so the portal stays shut
        state_from(&[".........T"])
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    fn forward() -> FrameInput {
        FrameInput { forward: true, ..FrameInput::default() }
    }

    fn place(state: &mut GameState, row: usize, col: usize, y: f32) {
        let (x, z) = state.dims().tile_center(row, col);
        state.player.pos = Vec3::new(x, y, z);
    }

    // ── Fall / support ──

    #[test]
    fn standing_on_floor_is_stable() {
        let mut state = empty_level();
        for _ in 0..50 {
            step(&mut state, idle());
        }
        assert_eq!(state.player.pos, Vec3::new(-90.0, 10.0, 90.0));
        assert!(!state.player.falling);
    }

    #[test]
    fn walk_north_then_jump_onto_static_block() {
        let mut state = state_from(&["B........T"]);

        // Walk until the block stops us
        for _ in 0..200 {
            step(&mut state, forward());
        }
        assert_eq!(state.player.pos.z, -75.0);
        assert_eq!(state.player.pos.y, 10.0);

        // Jump while pressing forward until we come down again
        let events = step(&mut state, FrameInput { jump: true, forward: true, ..idle() });
        assert!(events.contains(&GameEvent::Jumped));
        for _ in 0..40 {
            step(&mut state, forward());
            if !state.player.jumping {
                break;
            }
        }
        step(&mut state, idle());

        assert_eq!(state.player.pos.y, 30.0);
        let scene = Scene::new(&state.grid.dims, &state.registry);
        let mut p = state.player.clone();
        assert_eq!(support(&mut p, &scene), Some(Support::StaticBlock(0)));
    }

    #[test]
    fn static_block_drifts_facing() {
        let mut state = state_from(&["B........T"]);
        place(&mut state, 0, 0, 30.0);
        step(&mut state, idle());
        step(&mut state, idle());
        assert_eq!(state.player.angle, -2.0);
        assert_eq!(state.player.pos.y, 30.0);
    }

    #[test]
    fn walking_off_a_block_drops_to_ground() {
        let mut state = state_from(&["B........T"]);
        place(&mut state, 0, 0, 30.0);
        state.player.pos.x += 14.5; // footprint barely over the block's east face
        state.player.angle = 90.0;
        // Facing east; drift keeps nudging the angle but one step clears the block
        step(&mut state, forward());
        for _ in 0..40 {
            step(&mut state, idle());
        }
        assert_eq!(state.player.pos.y, 10.0);
        assert!(!state.player.falling);
    }

    #[test]
    fn void_has_no_recovery() {
        let mut rows = vec!["XXXXXXXXXX"; 9];
        rows.push(".XXXXXXXXX");
        let mut state = state_from(&rows);
        state.registry.treasures.push((5, 5)); // keep the portal shut

        let mut fell = 0;
        for _ in 0..30 {
            let events = step(&mut state, forward());
            fell += events.iter().filter(|e| **e == GameEvent::FellIntoVoid).count();
        }
        assert!(state.player.falling);
        assert_eq!(fell, 1);

        let mut last_y = state.player.pos.y;
        assert!(last_y < 10.0);
        for _ in 0..50 {
            step(&mut state, FrameInput { forward: true, jump: true, ..idle() });
            assert_eq!(state.player.pos.y, last_y - 1.0);
            last_y = state.player.pos.y;
        }
    }

    #[test]
    fn falling_player_cannot_walk() {
        let mut rows = vec![".........."; 9];
        rows.push("X........T");
        let mut state = state_from(&rows);
        step(&mut state, idle());
        let (x, z) = (state.player.pos.x, state.player.pos.z);
        step(&mut state, forward());
        assert_eq!((state.player.pos.x, state.player.pos.z), (x, z));
    }

    #[test]
    fn walking_off_the_grid_falls() {
        let mut state = empty_level();
        state.player.angle = -90.0; // face west, toward the grid edge at x = -100
        for _ in 0..20 {
            step(&mut state, forward());
        }
        assert!(state.player.falling);
        assert!(state.player.pos.y < 10.0);
    }

    // ── Jump ──

    #[test]
    fn jump_from_ground_returns_to_rest() {
        let mut state = empty_level();
        let events = step(&mut state, FrameInput { jump: true, ..idle() });
        assert!(events.contains(&GameEvent::Jumped));
        assert!(state.player.pos.y > 10.0);

        let mut landed = 0;
        for _ in 0..40 {
            let events = step(&mut state, idle());
            landed += events.iter().filter(|e| **e == GameEvent::Landed).count();
        }
        assert_eq!(landed, 1);
        assert_eq!(state.player.pos.y, 10.0);
        assert_eq!(state.player.vy, 0.0);
        assert!(!state.player.jumping);
    }

    #[test]
    fn jump_peak_height() {
        let mut state = empty_level();
        step(&mut state, FrameInput { jump: true, ..idle() });
        let mut peak = state.player.pos.y;
        for _ in 0..40 {
            step(&mut state, idle());
            peak = peak.max(state.player.pos.y);
        }
        // 5 + 4.5 + ... + 0.5
        assert_eq!(peak, 10.0 + 27.5);
    }

    #[test]
    fn no_jump_in_mid_air() {
        let mut state = empty_level();
        state.player.pos.y = 17.0;
        assert!(!try_jump(&mut state));
        assert!(!state.player.jumping);
    }

    #[test]
    fn jump_from_block_lands_on_ground() {
        let mut state = state_from(&["B........T"]);
        place(&mut state, 0, 0, 30.0);
        state.player.pos.z += 14.0; // south rim of the block, facing north
        state.player.angle = 180.0; // face south, off the block
        step(&mut state, FrameInput { jump: true, forward: true, ..idle() });
        for _ in 0..20 {
            step(&mut state, forward());
        }
        for _ in 0..60 {
            step(&mut state, idle());
        }
        assert_eq!(state.player.pos.y, 10.0);
        assert!(!state.player.jumping);
    }

    // ── Moving blocks ──

    #[test]
    fn rides_a_rising_block() {
        let mut state = state_from(&["1........T"]);
        // Block top at 20, player standing on it
        place(&mut state, 0, 0, 30.0);
        for _ in 0..10 {
            step(&mut state, idle());
        }
        let top = state.registry.moving[0].height;
        assert_eq!(top, 30.0);
        assert_eq!(state.player.pos.y, top + 10.0);
    }

    #[test]
    fn sinking_block_lowers_player() {
        let mut state = state_from(&["3........T"]);
        state.registry.moving[0].direction = -1.0;
        place(&mut state, 0, 0, 70.0);
        for _ in 0..5 {
            step(&mut state, idle());
        }
        assert_eq!(state.registry.moving[0].height, 55.0);
        assert_eq!(state.player.pos.y, 65.0);
    }

    #[test]
    fn raised_moving_block_blocks_walking() {
        let mut state = state_from(&["..........", "5........T"]);
        place(&mut state, 2, 0, 10.0);
        for _ in 0..40 {
            step(&mut state, forward());
        }
        // Stopped south of row 1's block: its south face is at z = -60
        assert_eq!(state.player.pos.z, -55.0);
    }

    #[test]
    fn sinking_block_carries_player_below_ground() {
        let mut state = state_from(&["0........T"]);
        state.registry.moving[0].direction = -1.0;
        place(&mut state, 0, 0, 10.0);
        for _ in 0..8 {
            step(&mut state, idle());
        }
        assert_eq!(state.registry.moving[0].height, -8.0);
        assert_eq!(state.player.pos.y, 2.0);
        assert!(!state.player.falling);
    }

    #[test]
    fn jump_from_moving_block_lands_back_on_it() {
        let mut state = state_from(&["1........T"]);
        state.physics.moving_block_step = 0.0;
        place(&mut state, 0, 0, 30.0);

        let events = step(&mut state, FrameInput { jump: true, ..idle() });
        assert!(events.contains(&GameEvent::Jumped));

        let mut landed = 0;
        for _ in 0..40 {
            let events = step(&mut state, idle());
            landed += events.iter().filter(|e| **e == GameEvent::Landed).count();
        }
        assert_eq!(landed, 1);
        assert_eq!(state.player.pos.y, 30.0);
        assert_eq!(state.player.vy, 0.0);
        assert!(!state.player.jumping);
    }

    #[test]
    fn rising_over_moving_block_does_not_land() {
        let mut state = state_from(&["1........T"]);
        state.physics.moving_block_step = 0.0;
        place(&mut state, 0, 0, 30.0);

        step(&mut state, FrameInput { jump: true, ..idle() });
        // Feet at 25, block top at 20: still in contact range, but below the feet
        assert_eq!(state.player.pos.y, 35.0);
        let scene = Scene::new(&state.grid.dims, &state.registry);
        assert_eq!(physics::block_contact(&state.player, &scene), Some(Support::MovingBlock(0)));
        assert!(state.player.jumping);
        assert_eq!(state.player.vy, 4.5);
    }

    // ── Treasure / portal ──

    #[test]
    fn single_treasure_opens_portal() {
        let mut state = state_from(&[".", ".", ".", ".", ".", ".....T"]);
        place(&mut state, 5, 5, 10.0);
        let events = step(&mut state, idle());
        assert!(events.contains(&GameEvent::TreasureCollected { remaining: 0 }));
        assert!(events.contains(&GameEvent::PortalOpened));
        assert!(state.portal.open);
        assert!((state.portal.y - -9.8).abs() < 1e-4);

        let events = step(&mut state, idle());
        assert!(events.is_empty());
        assert!((state.portal.y - -9.6).abs() < 1e-4);

        for _ in 0..200 {
            step(&mut state, idle());
        }
        assert_eq!(state.portal.y, 10.0);
    }

    #[test]
    fn portal_stays_shut_while_treasure_remains() {
        let mut state = state_from(&["T........T"]);
        place(&mut state, 0, 0, 10.0);
        let events = step(&mut state, idle());
        assert_eq!(events, vec![GameEvent::TreasureCollected { remaining: 1 }]);
        assert!(!state.portal.open);
    }

    #[test]
    fn level_without_treasure_opens_on_first_tick() {
        let mut state = state_from(&[".........."]);
        let events = step(&mut state, idle());
        assert_eq!(events, vec![GameEvent::PortalOpened]);
        // Already open: no second event
        assert!(step(&mut state, idle()).is_empty());
    }

    #[test]
    fn portal_needs_to_be_open() {
        let mut state = empty_level();
        place(&mut state, 0, 9, 10.0);
        state.portal.y = 10.0;
        assert!(!portal_reached(&state));
        state.portal.open = true;
        assert!(portal_reached(&state));
    }

    #[test]
    fn entering_portal_loads_next_level() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.txt"), "..........").unwrap();
        std::fs::write(dir.path().join("2.txt"), "TTTTTTTTTT").unwrap();
        let config = GameConfig { levels_dir: dir.path().to_path_buf(), ..GameConfig::default() };
        let mut state = GameState::new(&config);
        state.load_level(1).unwrap();

        // Portal opens at once (no treasure); wait for it to rise into reach
        let mut cleared = None;
        place(&mut state, 0, 9, 10.0);
        for _ in 0..100 {
            let events = step(&mut state, idle());
            if let Some(GameEvent::LevelCleared { next }) =
                events.iter().find(|e| matches!(e, GameEvent::LevelCleared { .. }))
            {
                cleared = Some(*next);
                break;
            }
        }
        assert_eq!(cleared, Some(2));
        assert_eq!(state.level, 2);
        assert!(state.level_loaded);
        assert!(!state.portal.open);
        assert_eq!(state.portal.y, -10.0);
        assert_eq!(state.player.pos, state.spawn_point());
        assert_eq!(state.registry.treasures_left(), 10);
    }

    #[test]
    fn restart_keeps_registry() {
        let mut state = state_from(&["T........T"]);
        place(&mut state, 0, 0, 10.0);
        step(&mut state, idle());
        assert_eq!(state.registry.treasures_left(), 1);
        restart(&mut state);
        assert_eq!(state.player.pos, state.spawn_point());
        assert_eq!(state.registry.treasures_left(), 1);
    }

    #[test]
    fn turning_accumulates_without_wrap() {
        let mut state = empty_level();
        let right = FrameInput { turn_right: true, ..idle() };
        for _ in 0..400 {
            step(&mut state, right);
        }
        assert_eq!(state.player.angle, 400.0);
    }
}
