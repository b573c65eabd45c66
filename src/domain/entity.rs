/// Entities: Player, MovingBlock, Portal, plus the per-frame input snapshot.
/// Everything here is plain data; the rules live in physics and step.

use glam::Vec3;

use super::geometry::Aabb;

/// Facing-relative movement direction (continuous while held).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Forward,
    Backward,
    Left,
    Right,
}

impl MoveDir {
    pub const ALL: [MoveDir; 4] = [MoveDir::Forward, MoveDir::Left, MoveDir::Right, MoveDir::Backward];

    /// One unit step along this direction for a player facing `angle_deg`.
    /// Angle 0 faces -Z; positive angles turn clockwise seen from above.
    pub fn step(self, angle_deg: f32) -> Vec3 {
        let (s, c) = heading(angle_deg);
        match self {
            MoveDir::Forward  => Vec3::new(s, 0.0, -c),
            MoveDir::Backward => Vec3::new(-s, 0.0, c),
            MoveDir::Right    => Vec3::new(c, 0.0, s),
            MoveDir::Left     => Vec3::new(-c, 0.0, -s),
        }
    }
}

/// (sin, cos) of a facing angle in degrees.
/// The stored angle is an unbounded accumulator; it is only reduced here.
#[inline]
pub fn heading(angle_deg: f32) -> (f32, f32) {
    angle_deg.rem_euclid(360.0).to_radians().sin_cos()
}

/// Frame input: held movement/turn flags plus the edge-triggered jump.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub jump: bool,
}

impl FrameInput {
    pub fn held(&self, dir: MoveDir) -> bool {
        match dir {
            MoveDir::Forward => self.forward,
            MoveDir::Backward => self.backward,
            MoveDir::Left => self.left,
            MoveDir::Right => self.right,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub pos: Vec3,
    /// Degrees. Accumulates without wraparound.
    pub angle: f32,
    pub vy: f32,
    pub jumping: bool,
    /// Dropping through a hole or off the grid: no horizontal control.
    pub falling: bool,
}

impl Player {
    pub fn new(pos: Vec3) -> Self {
        Player {
            pos,
            angle: 0.0,
            vy: 0.0,
            jumping: false,
            falling: false,
        }
    }

    /// Y of the player's feet.
    #[inline]
    pub fn base(&self, edge: f32) -> f32 {
        self.pos.y - edge / 2.0
    }

    /// Collision box: a quarter edge wide on X/Z, half an edge tall.
    #[inline]
    pub fn bounds(&self, edge: f32) -> Aabb {
        Aabb::new(self.pos, Vec3::new(edge / 4.0, edge / 2.0, edge / 4.0))
    }
}

/// A block whose top surface oscillates vertically every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct MovingBlock {
    pub row: usize,
    pub col: usize,
    /// World Y of the top surface.
    pub height: f32,
    /// +1.0 rising, -1.0 sinking.
    pub direction: f32,
}

impl MovingBlock {
    pub fn new(row: usize, col: usize, height: f32) -> Self {
        MovingBlock { row, col, height, direction: 1.0 }
    }

    /// Advance one tick. Reversal is decided on the current height, then the
    /// block moves, so it touches each bound for exactly one tick.
    pub fn advance(&mut self, step: f32, limit: f32) {
        if self.height >= limit {
            self.direction = -1.0;
        }
        if self.height <= -limit {
            self.direction = 1.0;
        }
        self.height += self.direction * step;
    }

    /// Is the block poking above the ground plane?
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.height > 0.0
    }
}

/// End-of-level trigger. Hidden below ground until every treasure is taken.
#[derive(Clone, Debug, PartialEq)]
pub struct Portal {
    pub open: bool,
    pub y: f32,
}

impl Portal {
    pub fn closed(start_y: f32) -> Self {
        Portal { open: false, y: start_y }
    }

    /// Rise toward `max` while open. No-op when closed.
    pub fn animate(&mut self, step: f32, max: f32) {
        if self.open {
            self.y = (self.y + step).min(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn steps_at_zero_angle() {
        assert!(approx(MoveDir::Forward.step(0.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(approx(MoveDir::Backward.step(0.0), Vec3::new(0.0, 0.0, 1.0)));
        assert!(approx(MoveDir::Right.step(0.0), Vec3::new(1.0, 0.0, 0.0)));
        assert!(approx(MoveDir::Left.step(0.0), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn steps_follow_facing() {
        // Facing +X after a quarter turn to the right
        assert!(approx(MoveDir::Forward.step(90.0), Vec3::new(1.0, 0.0, 0.0)));
        assert!(approx(MoveDir::Right.step(90.0), Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn unbounded_angle_reads_like_reduced() {
        assert!(approx(MoveDir::Forward.step(-270.0), MoveDir::Forward.step(90.0)));
        assert!(approx(MoveDir::Left.step(7230.0), MoveDir::Left.step(30.0)));
    }

    #[test]
    fn moving_block_turns_at_bounds() {
        let mut b = MovingBlock::new(0, 0, 119.0);
        b.advance(1.0, 120.0);
        assert_eq!((b.height, b.direction), (120.0, 1.0));
        b.advance(1.0, 120.0);
        assert_eq!((b.height, b.direction), (119.0, -1.0));

        let mut low = MovingBlock { row: 0, col: 0, height: -120.0, direction: -1.0 };
        low.advance(1.0, 120.0);
        assert_eq!((low.height, low.direction), (-119.0, 1.0));
    }

    #[test]
    fn moving_block_above_limit_comes_down() {
        let mut b = MovingBlock::new(0, 0, 180.0);
        b.advance(1.0, 120.0);
        assert_eq!((b.height, b.direction), (179.0, -1.0));
    }

    #[test]
    fn portal_only_rises_when_open() {
        let mut p = Portal::closed(-10.0);
        p.animate(0.2, 10.0);
        assert_eq!(p.y, -10.0);
        p.open = true;
        for _ in 0..200 {
            p.animate(0.2, 10.0);
        }
        assert_eq!(p.y, 10.0);
    }
}
