/// Collision and support resolver — single source of truth.
///
/// ## Architecture
///
/// Three query families, all read-only except `support`:
///   1. VOID    — is the player over a hole or off the grid?
///   2. SUPPORT — what holds the player up (ground, static block, moving block)?
///   3. BLOCKING — would one step in a direction run into an obstacle?
///
/// ## Box sizes
///
///   Player        — half-extent edge/4 on X/Z, edge/2 on Y
///   Static block  — one edge cube, centre at Y = edge/2, top at Y = edge
///   Moving block  — one edge cube whose TOP is the animated height
///
/// ## Support rules
///
/// `block_contact` (no side effects):
///   - StaticBlock(i): footprint overlaps block i (strict) and the player's
///     feet are in [top - edge/4, top]
///   - MovingBlock(i): footprint overlaps block i (strict) and the block's
///     current top is within edge/2 of the feet (inclusive band)
///
/// `support` (snaps Y on static blocks):
///   - Ground:         Y == edge/2 exactly
///   - StaticBlock(i): footprint overlaps and feet <= top (inclusive);
///                     Y is snapped to top + edge/2
///   - otherwise:      the moving-block result of `block_contact`
///
/// ## Blocking rules
///
/// A direction is blocked when the player's box, moved one step along it,
/// overlaps (strict, XZ) a static block or a RAISED moving block (height > 0)
/// and `y - edge/4 < obstacle top`. Each direction is tested on its own, and
/// the box moves by the whole facing-relative step vector (both X and Z at
/// once), not by a single axis per direction.

use glam::Vec3;

use super::entity::{MoveDir, MovingBlock, Player};
use super::geometry::{Aabb, GridDims};
use super::registry::EntityRegistry;

/// What currently holds the player up.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Support {
    Ground,
    StaticBlock(usize),
    MovingBlock(usize),
}

/// Immutable view of the playfield for resolver queries.
pub struct Scene<'a> {
    pub dims: &'a GridDims,
    pub registry: &'a EntityRegistry,
}

impl<'a> Scene<'a> {
    pub fn new(dims: &'a GridDims, registry: &'a EntityRegistry) -> Self {
        Scene { dims, registry }
    }

    #[inline]
    fn edge(&self) -> f32 {
        self.dims.edge
    }
}

// ══════════════════════════════════════════════════════════════
// Heights and boxes
// ══════════════════════════════════════════════════════════════

/// Player Y when standing on the ground plane.
#[inline]
pub fn ground_rest(edge: f32) -> f32 {
    edge / 2.0
}

/// Player Y when standing on a static block.
#[inline]
pub fn block_rest(edge: f32) -> f32 {
    edge + edge / 2.0
}

pub fn static_block_bounds(dims: &GridDims, row: usize, col: usize) -> Aabb {
    let (x, z) = dims.tile_center(row, col);
    let e = dims.edge;
    Aabb::new(Vec3::new(x, e / 2.0, z), Vec3::splat(e / 2.0))
}

pub fn moving_block_bounds(dims: &GridDims, block: &MovingBlock) -> Aabb {
    let (x, z) = dims.tile_center(block.row, block.col);
    let e = dims.edge;
    Aabb::new(Vec3::new(x, block.height - e / 2.0, z), Vec3::splat(e / 2.0))
}

// ══════════════════════════════════════════════════════════════
// Void
// ══════════════════════════════════════════════════════════════

/// Has the player walked off the grid, or is it standing over a hole?
pub fn over_void(player: &Player, scene: &Scene) -> bool {
    let (x, z) = (player.pos.x, player.pos.z);
    if scene.dims.beyond_bounds(x, z) {
        return true;
    }
    scene
        .registry
        .holes
        .iter()
        .any(|&(row, col)| scene.dims.within_tile_core(row, col, x, z))
}

// ══════════════════════════════════════════════════════════════
// Support
// ══════════════════════════════════════════════════════════════

#[inline]
pub fn on_ground_plane(player: &Player, edge: f32) -> bool {
    player.pos.y == ground_rest(edge)
}

/// Which block, if any, the player is standing on right now. No side effects.
pub fn block_contact(player: &Player, scene: &Scene) -> Option<Support> {
    let e = scene.edge();
    let feet = player.base(e);
    let footprint = player.bounds(e);

    for (i, &(row, col)) in scene.registry.blocks.iter().enumerate() {
        let block = static_block_bounds(scene.dims, row, col);
        let top = block.max().y;
        if footprint.overlaps_xz(&block) && feet <= top && feet >= top - e / 4.0 {
            return Some(Support::StaticBlock(i));
        }
    }

    moving_contact(player, scene)
}

fn moving_contact(player: &Player, scene: &Scene) -> Option<Support> {
    let e = scene.edge();
    let feet = player.base(e);
    let footprint = player.bounds(e);

    scene.registry.moving.iter().enumerate().find_map(|(i, b)| {
        let block = moving_block_bounds(scene.dims, b);
        let near = (b.height - feet).abs() <= e / 2.0;
        (footprint.overlaps_xz(&block) && near).then_some(Support::MovingBlock(i))
    })
}

/// Full support query. Snaps the player onto a static block it has sunk into.
pub fn support(player: &mut Player, scene: &Scene) -> Option<Support> {
    let e = scene.edge();
    if on_ground_plane(player, e) {
        return Some(Support::Ground);
    }

    let footprint = player.bounds(e);
    for (i, &(row, col)) in scene.registry.blocks.iter().enumerate() {
        let block = static_block_bounds(scene.dims, row, col);
        let top = block.max().y;
        if footprint.overlaps_xz(&block) && player.base(e) <= top {
            player.pos.y = top + e / 2.0;
            return Some(Support::StaticBlock(i));
        }
    }

    moving_contact(player, scene)
}

// ══════════════════════════════════════════════════════════════
// Blocking
// ══════════════════════════════════════════════════════════════

/// Would one step of `walk_step` in `dir` run into a static or raised block?
pub fn is_blocked(player: &Player, dir: MoveDir, walk_step: f32, scene: &Scene) -> bool {
    let e = scene.edge();
    let next = player.bounds(e).translated(dir.step(player.angle) * walk_step);
    let probe_y = player.pos.y - e / 4.0;

    let hits = |obstacle: Aabb| next.overlaps_xz(&obstacle) && probe_y < obstacle.max().y;

    let statics = scene
        .registry
        .blocks
        .iter()
        .map(|&(row, col)| static_block_bounds(scene.dims, row, col));
    let raised = scene
        .registry
        .moving
        .iter()
        .filter(|b| b.is_raised())
        .map(|b| moving_block_bounds(scene.dims, b));

    statics.chain(raised).any(hits)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Tile;

    const EDGE: f32 = 20.0;

    fn dims() -> GridDims {
        GridDims::new(10, 10, EDGE)
    }

    fn registry_from(rows: &[&str]) -> EntityRegistry {
        let cells: Vec<Vec<Tile>> =
            rows.iter().map(|r| r.chars().map(Tile::from_char).collect()).collect();
        let mut reg = EntityRegistry::new();
        reg.populate(&cells, &dims());
        reg
    }

    fn player_at(row: usize, col: usize, y: f32) -> Player {
        let (x, z) = dims().tile_center(row, col);
        Player::new(Vec3::new(x, y, z))
    }

    // ── void ──

    #[test]
    fn hole_core_is_void() {
        let reg = registry_from(&["X"]);
        let d = dims();
        let scene = Scene::new(&d, &reg);
        assert!(over_void(&player_at(0, 0, 10.0), &scene));
        // Near the hole's rim (within a quarter edge) is still solid
        let mut p = player_at(0, 0, 10.0);
        p.pos.x += 6.0;
        assert!(!over_void(&p, &scene));
    }

    #[test]
    fn off_grid_is_void() {
        let reg = EntityRegistry::new();
        let d = dims();
        let scene = Scene::new(&d, &reg);
        let mut p = player_at(9, 0, 10.0);
        p.pos.x = -106.0;
        assert!(over_void(&p, &scene));
        p.pos.x = -104.0;
        assert!(!over_void(&p, &scene));
    }

    // ── support ──

    #[test]
    fn ground_plane_supports() {
        let reg = EntityRegistry::new();
        let d = dims();
        let mut p = player_at(3, 3, 10.0);
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), Some(Support::Ground));
    }

    #[test]
    fn airborne_over_floor_is_unsupported() {
        let reg = EntityRegistry::new();
        let d = dims();
        let mut p = player_at(3, 3, 17.5);
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), None);
        assert_eq!(p.pos.y, 17.5);
    }

    #[test]
    fn sunk_into_static_block_snaps_on_top() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let mut p = player_at(0, 0, 28.0); // feet at 18, top at 20
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), Some(Support::StaticBlock(0)));
        assert_eq!(p.pos.y, block_rest(EDGE));
    }

    #[test]
    fn feet_exactly_at_block_top_count_as_support() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let mut p = player_at(0, 0, 30.0);
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), Some(Support::StaticBlock(0)));
        assert_eq!(block_contact(&p, &Scene::new(&d, &reg)), Some(Support::StaticBlock(0)));
    }

    #[test]
    fn above_block_is_not_support() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let mut p = player_at(0, 0, 30.5);
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), None);
        assert_eq!(p.pos.y, 30.5);
    }

    #[test]
    fn contact_band_on_static_block() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let scene = Scene::new(&d, &reg);
        // feet in [15, 20] → contact
        assert_eq!(block_contact(&player_at(0, 0, 25.0), &scene), Some(Support::StaticBlock(0)));
        // feet at 14 → too deep for contact (support would snap instead)
        assert_eq!(block_contact(&player_at(0, 0, 24.0), &scene), None);
    }

    #[test]
    fn flush_against_block_edge_is_not_on_it() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let mut p = player_at(0, 0, 30.0);
        p.pos.x += 15.0; // footprint edge touches block edge exactly
        assert_eq!(block_contact(&p, &Scene::new(&d, &reg)), None);
        p.pos.x -= 0.01;
        assert_eq!(block_contact(&p, &Scene::new(&d, &reg)), Some(Support::StaticBlock(0)));
    }

    #[test]
    fn moving_block_needs_vertical_proximity() {
        let mut reg = registry_from(&["2"]); // top at 40
        let d = dims();
        // feet at 40 → on it
        assert_eq!(block_contact(&player_at(0, 0, 50.0), &Scene::new(&d, &reg)), Some(Support::MovingBlock(0)));
        // feet at 30.5 (9.5 below top) → about to be lifted, still in band
        assert_eq!(block_contact(&player_at(0, 0, 40.5), &Scene::new(&d, &reg)), Some(Support::MovingBlock(0)));
        // feet at 0, block far above → not supporting
        assert_eq!(block_contact(&player_at(0, 0, 10.0), &Scene::new(&d, &reg)), None);

        reg.moving[0].height = -60.0;
        let mut p = player_at(0, 0, 10.0);
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), Some(Support::Ground));
    }

    #[test]
    fn ground_wins_over_moving_block() {
        let mut reg = registry_from(&["0"]);
        reg.moving[0].height = 5.0;
        let d = dims();
        let mut p = player_at(0, 0, 10.0);
        assert_eq!(support(&mut p, &Scene::new(&d, &reg)), Some(Support::Ground));
        assert_eq!(block_contact(&p, &Scene::new(&d, &reg)), Some(Support::MovingBlock(0)));
    }

    // ── blocking ──

    #[test]
    fn step_into_static_block_is_blocked() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let scene = Scene::new(&d, &reg);
        // Directly south of the block, facing north (-Z), just touching
        let mut p = player_at(1, 0, 10.0);
        p.pos.z = -90.0 + 15.0; // flush: footprint edge on block face
        assert!(is_blocked(&p, MoveDir::Forward, 1.0, &scene));
        assert!(!is_blocked(&p, MoveDir::Backward, 1.0, &scene));
    }

    #[test]
    fn far_from_block_is_free() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let scene = Scene::new(&d, &reg);
        let mut p = player_at(1, 0, 10.0);
        // player-half + block-half = 15; plus the step of 1
        p.pos.z = -90.0 + 16.01;
        assert!(!is_blocked(&p, MoveDir::Forward, 1.0, &scene));
        p.pos.z = -90.0 + 15.99;
        assert!(is_blocked(&p, MoveDir::Forward, 1.0, &scene));
    }

    #[test]
    fn directions_are_facing_relative() {
        let reg = registry_from(&["B."]);
        let d = dims();
        let scene = Scene::new(&d, &reg);
        // Stand east of the block and face north: the block is to the left
        let mut p = player_at(0, 1, 10.0);
        p.pos.x = -90.0 + 15.5;
        assert!(is_blocked(&p, MoveDir::Left, 1.0, &scene));
        assert!(!is_blocked(&p, MoveDir::Right, 1.0, &scene));
        assert!(!is_blocked(&p, MoveDir::Forward, 1.0, &scene));
        // Turn to face west: now it's dead ahead
        p.angle = -90.0;
        assert!(is_blocked(&p, MoveDir::Forward, 1.0, &scene));
    }

    #[test]
    fn high_enough_player_passes_over_block() {
        let reg = registry_from(&["B"]);
        let d = dims();
        let scene = Scene::new(&d, &reg);
        let mut p = player_at(1, 0, 24.9);
        p.pos.z = -90.0 + 15.0;
        assert!(is_blocked(&p, MoveDir::Forward, 1.0, &scene));
        p.pos.y = 25.0;
        assert!(!is_blocked(&p, MoveDir::Forward, 1.0, &scene));
    }

    #[test]
    fn lowered_moving_block_does_not_block() {
        let mut reg = registry_from(&["0"]);
        let d = dims();
        let mut p = player_at(1, 0, 10.0);
        p.pos.z = -90.0 + 15.0;
        assert!(!is_blocked(&p, MoveDir::Forward, 1.0, &Scene::new(&d, &reg)));

        reg.moving[0].height = 40.0;
        assert!(is_blocked(&p, MoveDir::Forward, 1.0, &Scene::new(&d, &reg)));

        reg.moving[0].height = 3.0; // raised, but below the probe height of 5
        assert!(!is_blocked(&p, MoveDir::Forward, 1.0, &Scene::new(&d, &reg)));
    }
}
