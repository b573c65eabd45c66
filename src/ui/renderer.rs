/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// The level is drawn as a top-down plan (row 0 at the top, north up), with
/// a HUD above it reporting what the 3D camera would be looking at.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use tracing::debug;

use crate::domain::entity::{heading, MovingBlock, Portal};
use crate::sim::world::GameState;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every cell. Matching the Clear colour
    /// avoids visible seams between rows on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Never produced by composition, so an invalidated back buffer
    /// diffs against every position.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Clipped at the right edge.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    /// Two-column plan cell.
    fn put_pair(&mut self, x: usize, y: usize, glyph: [char; 2], fg: Color, bg: Color) {
        self.set(x, y, Cell::from_char(glyph[0], fg, bg));
        self.set(x + 1, y, Cell::from_char(glyph[1], fg, bg));
    }
}

// ── Renderer ──

/// Each grid tile is two terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const VIEW_ROW: usize = 1;
const MAP_ROW: usize = 3;
const MAP_COL: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const FLOOR_BG: Color = Color::Rgb { r: 40, g: 70, b: 40 };
const BLOCK_BG: Color = Color::Rgb { r: 100, g: 65, b: 30 };
const HELP: &str =
    " ←↑↓→ Move  4/6 Turn  Space Jump  W/A/S/D/E Camera  +/- Zoom  R Restart  Q Quit";

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    keyboard_enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            keyboard_enhanced: false,
        }
    }

    /// Raw mode, alternate screen, mouse capture and (when the terminal
    /// supports it) key release reporting.
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.keyboard_enhanced = true;
        }
        debug!(keyboard_enhanced = self.keyboard_enhanced, "terminal ready");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// Whether key Release events will be reported.
    pub fn keyboard_enhanced(&self) -> bool {
        self.keyboard_enhanced
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.keyboard_enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, state: &GameState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();
        compose_game(&mut self.front, state);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours, never ResetColor: the terminal default may
        // differ from BASE_BG.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.as_str()))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }
}

// ── Compose: build front buffer content ──

fn compose_game(buf: &mut FrameBuffer, s: &GameState) {
    let dims = s.dims();
    let buf_w = buf.width;

    // ── HUD ──
    let level = if s.level_loaded {
        format!("{}", s.level)
    } else {
        format!("{}?", s.level)
    };
    let hud = format!(
        " Level {:<4} Treasure {:<3} Portal {:<7} Camera {:<8} y {:>6.1} {}",
        level,
        s.registry.treasures_left(),
        portal_label(&s.portal, s.physics.portal_max),
        s.camera.mode.name(),
        s.player.pos.y,
        player_status(s),
    );
    buf.put_str(0, HUD_ROW, &format!("{:<w$}", hud, w = buf_w), Color::White, HUD_BG);

    let view = s.view();
    // Distance in front of the camera, in view space
    let depth = -view.matrix().transform_point3(s.player.pos).z;
    let eye_line = format!(
        " eye ({:>6.1},{:>6.1},{:>6.1})  target ({:>6.1},{:>6.1},{:>6.1})  depth {:>6.1}",
        view.eye.x, view.eye.y, view.eye.z, view.target.x, view.target.y, view.target.z, depth,
    );
    buf.put_str(0, VIEW_ROW, &eye_line, Color::DarkGrey, Color::Reset);

    // ── Plan ──
    let player_tile = dims.world_to_tile(s.player.pos.x, s.player.pos.z);
    let portal_tile = s.portal_tile();
    for row in 0..dims.rows {
        let y = MAP_ROW + row;
        for col in 0..dims.cols {
            let x = MAP_COL + col * CELL_W;
            if player_tile == Some((row, col)) {
                let fg = if s.player.falling { Color::Red } else { Color::Rgb { r: 255, g: 240, b: 120 } };
                let arrow = heading_glyph(s.player.angle);
                buf.put_pair(x, y, [arrow, if s.player.jumping { '^' } else { ' ' }], fg, FLOOR_BG);
                continue;
            }
            if (row, col) == portal_tile && s.portal.open {
                buf.put_pair(x, y, portal_glyph(&s.portal, s.physics.portal_max), Color::Cyan, FLOOR_BG);
                continue;
            }
            compose_tile(buf, s, row, col, x, y);
        }
    }

    // ── Message / help ──
    let msg_row = MAP_ROW + dims.rows + 1;
    if !s.message.is_empty() {
        let msg = format!(" {} ", s.message);
        buf.put_str(0, msg_row, &msg, Color::Black, Color::Rgb { r: 200, g: 180, b: 50 });
    }
    buf.put_str(0, msg_row + 1, HELP, Color::DarkGrey, Color::Reset);
}

fn compose_tile(buf: &mut FrameBuffer, s: &GameState, row: usize, col: usize, x: usize, y: usize) {
    if let Some(mb) = s.registry.moving_at(row, col) {
        let (glyph, fg) = moving_glyph(mb, s.edge());
        buf.put_pair(x, y, glyph, fg, FLOOR_BG);
        return;
    }
    if s.registry.treasures.contains(&(row, col)) {
        buf.put_pair(x, y, ['◆', ' '], Color::Rgb { r: 255, g: 210, b: 40 }, FLOOR_BG);
        return;
    }
    // Blocks come from the registry: with cumulative entities a block may
    // outlive the level that placed it.
    if s.registry.blocks.contains(&(row, col)) {
        buf.put_pair(x, y, ['▓', '▓'], Color::Rgb { r: 180, g: 120, b: 60 }, BLOCK_BG);
        return;
    }
    match s.grid.tile(row, col) {
        Some(t) if t.has_floor() => buf.put_pair(x, y, ['·', ' '], Color::Rgb { r: 70, g: 110, b: 70 }, FLOOR_BG),
        // Holes and unknown symbols: no floor
        _ => buf.put_pair(x, y, [' ', ' '], Color::Reset, Color::Black),
    }
}

/// Arrow for the facing angle. Angle 0 faces north (up the plan),
/// positive angles turn clockwise.
fn heading_glyph(angle: f32) -> char {
    let (s, c) = heading(angle);
    if c.abs() >= s.abs() {
        if c >= 0.0 { '↑' } else { '↓' }
    } else if s > 0.0 {
        '→'
    } else {
        '←'
    }
}

fn portal_label(portal: &Portal, max: f32) -> &'static str {
    if !portal.open {
        "closed"
    } else if portal.y < max {
        "rising"
    } else {
        "OPEN"
    }
}

fn portal_glyph(portal: &Portal, max: f32) -> [char; 2] {
    if portal.y < max { ['◌', ' '] } else { ['◎', ' '] }
}

/// Raised blocks show their height in edge units.
fn moving_glyph(mb: &MovingBlock, edge: f32) -> ([char; 2], Color) {
    if mb.is_raised() {
        let units = (mb.height / edge).round().clamp(0.0, 9.0) as u32;
        let digit = char::from_digit(units, 10).unwrap_or('+');
        (['▲', digit], Color::Rgb { r: 120, g: 200, b: 255 })
    } else {
        (['▽', ' '], Color::Rgb { r: 60, g: 90, b: 130 })
    }
}

fn player_status(s: &GameState) -> &'static str {
    if s.player.falling {
        "FALLING"
    } else if s.player.jumping {
        "jump"
    } else {
        ""
    }
}
