/// Entity registry: per-category tile lists derived from the level grid,
/// plus the runtime state of moving blocks.
///
/// `populate` APPENDS. Re-scanning a grid without calling `clear` first
/// stacks the new entities on top of the old ones; the level loader decides
/// whether to clear (see `LevelSettings::cumulative_entities`).

use glam::Vec3;

use super::entity::MovingBlock;
use super::geometry::{Aabb, GridDims};
use super::tile::Tile;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityRegistry {
    pub holes: Vec<(usize, usize)>,
    pub blocks: Vec<(usize, usize)>,
    pub treasures: Vec<(usize, usize)>,
    pub moving: Vec<MovingBlock>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.holes.clear();
        self.blocks.clear();
        self.treasures.clear();
        self.moving.clear();
    }

    /// Classify every in-bounds cell in one row-major pass.
    /// Digit cells seed their block at `digit * edge`.
    pub fn populate(&mut self, cells: &[Vec<Tile>], dims: &GridDims) {
        for (row, line) in cells.iter().enumerate().take(dims.rows) {
            for (col, tile) in line.iter().enumerate().take(dims.cols) {
                match *tile {
                    Tile::Hole => self.holes.push((row, col)),
                    Tile::Block => self.blocks.push((row, col)),
                    Tile::Treasure => self.treasures.push((row, col)),
                    Tile::MovingBlock(d) => {
                        self.moving.push(MovingBlock::new(row, col, d as f32 * dims.edge));
                    }
                    Tile::Floor | Tile::Inert(_) => {}
                }
            }
        }
    }

    /// Step every moving block once. Runs every tick regardless of the player.
    pub fn advance_moving_blocks(&mut self, step: f32, limit: f32) {
        for block in &mut self.moving {
            block.advance(step, limit);
        }
    }

    /// Remove at most one treasure touching the player's box.
    /// Returns whether the treasure set is now empty.
    pub fn collect_treasure_at(&mut self, player: &Aabb, dims: &GridDims) -> bool {
        let hit = self.treasures.iter().position(|&(row, col)| {
            treasure_bounds(dims, row, col).touches(player)
        });
        if let Some(idx) = hit {
            self.treasures.remove(idx);
        }
        self.treasures.is_empty()
    }

    pub fn treasures_left(&self) -> usize {
        self.treasures.len()
    }

    /// Moving block standing on (row, col), if any.
    pub fn moving_at(&self, row: usize, col: usize) -> Option<&MovingBlock> {
        self.moving.iter().find(|b| b.row == row && b.col == col)
    }
}

/// Treasure pickup box: half an edge on every axis, centred a quarter edge up.
pub fn treasure_bounds(dims: &GridDims, row: usize, col: usize) -> Aabb {
    let (x, z) = dims.tile_center(row, col);
    let e = dims.edge;
    Aabb::new(Vec3::new(x, e / 4.0, z), Vec3::splat(e / 2.0))
}
