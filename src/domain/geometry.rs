/// Grid ↔ world mapping and box overlap tests.
///
/// ## World layout
///
/// The grid is centred on the world origin in the XZ plane:
///   - column `col` → X, measured against `cols`
///   - row `row`    → Z, measured against `rows` (row 0 is the far edge, -Z)
///   - Y is up; the ground plane is Y = 0
///
/// `world = edge * (-dimension / 2) + index * edge + edge / 2`
///
/// ## Overlap conventions
///
/// Two flavours are used on purpose and must not be merged:
///   - `overlaps_xz`  — strict (`<` / `>`). Standing flush against a block
///     face is NOT an overlap.
///   - `touches`      — inclusive (`<=` / `>=`) on all three axes. Used for
///     pickups and the portal, where grazing counts.

use glam::Vec3;

/// Dimensions of the playfield.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDims {
    pub rows: usize,
    pub cols: usize,
    /// World size of one tile edge.
    pub edge: f32,
}

impl GridDims {
    pub fn new(rows: usize, cols: usize, edge: f32) -> Self {
        GridDims { rows, cols, edge }
    }

    /// World X of the grid's left boundary.
    #[inline]
    pub fn min_x(&self) -> f32 {
        self.edge * -(self.cols as f32) / 2.0
    }

    /// World Z of the grid's far boundary.
    #[inline]
    pub fn min_z(&self) -> f32 {
        self.edge * -(self.rows as f32) / 2.0
    }

    #[inline]
    pub fn max_x(&self) -> f32 {
        self.min_x() + self.cols as f32 * self.edge
    }

    #[inline]
    pub fn max_z(&self) -> f32 {
        self.min_z() + self.rows as f32 * self.edge
    }

    /// World-space (x, z) centre of tile (row, col).
    #[inline]
    pub fn tile_center(&self, row: usize, col: usize) -> (f32, f32) {
        let x = self.min_x() + col as f32 * self.edge + self.edge / 2.0;
        let z = self.min_z() + row as f32 * self.edge + self.edge / 2.0;
        (x, z)
    }

    /// Tile containing world point (x, z), or None outside the grid.
    pub fn world_to_tile(&self, x: f32, z: f32) -> Option<(usize, usize)> {
        let fx = (x - self.min_x()) / self.edge;
        let fz = (z - self.min_z()) / self.edge;
        if fx < 0.0 || fz < 0.0 {
            return None;
        }
        let (col, row) = (fx.floor() as usize, fz.floor() as usize);
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some((row, col))
    }

    /// Has (x, z) drifted more than a quarter edge past any grid boundary?
    pub fn beyond_bounds(&self, x: f32, z: f32) -> bool {
        let margin = self.edge / 4.0;
        x < self.min_x() - margin
            || x > self.max_x() + margin
            || z < self.min_z() - margin
            || z > self.max_z() + margin
    }

    /// Is (x, z) inside tile (row, col) shrunk by a quarter edge per side?
    /// Inclusive on all four sides.
    pub fn within_tile_core(&self, row: usize, col: usize, x: f32, z: f32) -> bool {
        let margin = self.edge / 4.0;
        let x0 = self.min_x() + col as f32 * self.edge;
        let z0 = self.min_z() + row as f32 * self.edge;
        z >= z0 + margin
            && z <= z0 + self.edge - margin
            && x >= x0 + margin
            && x <= x0 + self.edge - margin
    }
}

/// Axis-aligned box stored as centre + half extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half: Vec3) -> Self {
        Aabb { center, half }
    }

    #[inline]
    pub fn min(&self) -> Vec3 {
        self.center - self.half
    }

    #[inline]
    pub fn max(&self) -> Vec3 {
        self.center + self.half
    }

    /// Strict overlap of the XZ footprints.
    pub fn overlaps_xz(&self, other: &Aabb) -> bool {
        let (a0, a1, b0, b1) = (self.min(), self.max(), other.min(), other.max());
        a1.x > b0.x && a0.x < b1.x && a1.z > b0.z && a0.z < b1.z
    }

    /// Inclusive intersection on all three axes.
    pub fn touches(&self, other: &Aabb) -> bool {
        let (a0, a1, b0, b1) = (self.min(), self.max(), other.min(), other.max());
        a1.x >= b0.x && a0.x <= b1.x
            && a1.z >= b0.z && a0.z <= b1.z
            && a1.y >= b0.y && a0.y <= b1.y
    }

    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb { center: self.center + offset, half: self.half }
    }
}
