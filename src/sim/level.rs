/// Level loader.
///
/// ## Source
///
/// One plain-text file per level, named `<index><extension>` (default
/// `1.txt`, `2.txt`, ...) inside the configured levels directory.
///
/// ## Format
///
/// Each line is one grid row, each character one cell:
///   '.' = Floor            'X' = Hole
///   'B' = Static block     'T' = Treasure
///   '0'-'9' = Moving block, initial top at digit * edge
///   anything else = Inert (no floor, no entity)
///
/// ## Overlay semantics
///
/// A file is written ON TOP of the current grid, it does not replace it:
///   - short lines leave the tail of the row as it was
///   - missing rows leave whole rows as they were
///   - characters or rows beyond the grid bounds are dropped
///   - a missing file leaves the grid untouched and reports `LevelError`

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::geometry::GridDims;
use crate::domain::tile::Tile;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("could not read level file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where level files live and how they are named.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelSource {
    pub dir: PathBuf,
    pub extension: String,
}

impl LevelSource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        LevelSource { dir: dir.into(), extension: extension.into() }
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{}", index, self.extension))
    }

    /// Read the raw text of level `index`.
    pub fn read(&self, index: usize) -> Result<String, LevelError> {
        read_level_file(&self.path_for(index))
    }
}

fn read_level_file(path: &Path) -> Result<String, LevelError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LevelError::NotFound { path: path.to_path_buf() }
        } else {
            LevelError::Io { path: path.to_path_buf(), source }
        }
    })
}

/// Fixed-size tile grid. Starts as all floor.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelGrid {
    pub dims: GridDims,
    /// `cells[row][col]`, always `dims.rows` × `dims.cols`.
    pub cells: Vec<Vec<Tile>>,
}

impl LevelGrid {
    pub fn new(dims: GridDims) -> Self {
        LevelGrid { dims, cells: vec![vec![Tile::default(); dims.cols]; dims.rows] }
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<Tile> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Overlay level text onto the grid (see module docs).
    pub fn apply_text(&mut self, content: &str) {
        for (row, line) in content.lines().enumerate().take(self.dims.rows) {
            for (col, ch) in line.chars().enumerate().take(self.dims.cols) {
                self.cells[row][col] = Tile::from_char(ch);
            }
        }
    }

    /// Load level `index` from `source` into this grid.
    /// On error the grid is left exactly as it was.
    pub fn load(&mut self, source: &LevelSource, index: usize) -> Result<(), LevelError> {
        let content = source.read(index)?;
        self.apply_text(&content);
        Ok(())
    }

    /// Rows as legend characters.
    pub fn rows_as_text(&self) -> Vec<String> {
        self.cells.iter().map(|r| r.iter().map(|t| t.to_char()).collect()).collect()
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> GridDims {
        GridDims::new(4, 5, 20.0)
    }

    #[test]
    fn new_grid_is_all_floor() {
        let grid = LevelGrid::new(dims());
        assert_eq!(grid.cells.len(), 4);
        assert!(grid.cells.iter().all(|r| r.len() == 5 && r.iter().all(|&t| t == Tile::Floor)));
        assert_eq!(grid.tile(4, 0), None);
    }

    #[test]
    fn text_overlays_cells() {
        let mut grid = LevelGrid::new(dims());
        grid.apply_text("X.B.T\n..3..\n");
        assert_eq!(grid.tile(0, 0), Some(Tile::Hole));
        assert_eq!(grid.tile(0, 2), Some(Tile::Block));
        assert_eq!(grid.tile(0, 4), Some(Tile::Treasure));
        assert_eq!(grid.tile(1, 2), Some(Tile::MovingBlock(3)));
    }

    #[test]
    fn short_lines_keep_stale_cells() {
        let mut grid = LevelGrid::new(dims());
        grid.apply_text("BBBBB\nTTTTT");
        grid.apply_text("X\n..");
        assert_eq!(grid.rows_as_text()[0], "XBBBB");
        assert_eq!(grid.rows_as_text()[1], "..TTT");
    }

    #[test]
    fn overflow_is_ignored() {
        let mut grid = LevelGrid::new(dims());
        grid.apply_text("......BBB\n.\n.\n.\nXXXXX\nXXXXX");
        assert_eq!(grid.rows_as_text(), vec![".....", ".....", ".....", "....."]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let mut grid = LevelGrid::new(dims());
        grid.apply_text("T\r\nB\r\n");
        assert_eq!(grid.tile(0, 0), Some(Tile::Treasure));
        assert_eq!(grid.tile(0, 1), Some(Tile::Floor));
        assert_eq!(grid.tile(1, 0), Some(Tile::Block));
    }

    #[test]
    fn load_reads_numbered_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2.txt"), "T....\n....X\n").unwrap();
        let source = LevelSource::new(dir.path(), ".txt");

        let mut grid = LevelGrid::new(dims());
        grid.load(&source, 2).unwrap();
        assert_eq!(grid.tile(0, 0), Some(Tile::Treasure));
        assert_eq!(grid.tile(1, 4), Some(Tile::Hole));
    }

    #[test]
    fn custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("7.lvl"), "B").unwrap();
        let source = LevelSource::new(dir.path(), ".lvl");
        assert_eq!(source.path_for(7), dir.path().join("7.lvl"));

        let mut grid = LevelGrid::new(dims());
        grid.load(&source, 7).unwrap();
        assert_eq!(grid.tile(0, 0), Some(Tile::Block));
    }

    #[test]
    fn missing_file_leaves_grid_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let source = LevelSource::new(dir.path(), ".txt");

        let mut grid = LevelGrid::new(dims());
        grid.apply_text("BT");
        let before = grid.clone();

        let err = grid.load(&source, 9).unwrap_err();
        assert!(matches!(err, LevelError::NotFound { ref path } if path.ends_with("9.txt")));
        assert_eq!(grid, before);
    }

    #[test]
    fn unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be
        std::fs::create_dir(dir.path().join("3.txt")).unwrap();
        let source = LevelSource::new(dir.path(), ".txt");
        let err = LevelGrid::new(dims()).load(&source, 3).unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
    }
}
