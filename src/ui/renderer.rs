/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into the `front` buffer
///   2. Compare each cell with `back` (previous frame)
///   3. Emit terminal commands only for cells that changed, batched with `queue!`
///   4. Swap front/back
///
/// One map cell is two terminal columns. A cell's colour is the topmost
/// layer drawn beneath the player; layers whose depth is above the
/// player's are painted after the sprite and hide it.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::InputDevice;
use crate::domain::entity::Facing;
use crate::domain::layer::LayerPlan;
use crate::sim::assets::{Assets, Rgb};
use crate::sim::world::Session;
use super::overlay::{wrap_text, ImagePreview, OverlayView};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for empty terminal cells, also used for Clear,
    /// so row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 22, b: 28 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never equal to a composed cell: forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = if bg == Color::Reset { Cell::BASE_BG } else { bg };
        Cell { ch, fg, bg }
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Renderer ──

/// Terminal columns per map cell.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap + message + help rows.
const RESERVED_ROWS: usize = MAP_ROW + 3;

const HUD_BG: Color = Color::Rgb { r: 30, g: 42, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 90 };
const PROMPT_BG: Color = Color::Rgb { r: 250, g: 245, b: 225 };
const PANEL_BG: Color = Color::Rgb { r: 36, g: 36, b: 44 };
const PANEL_EDGE: Color = Color::Rgb { r: 120, g: 110, b: 90 };
const POI_FG: Color = Color::Rgb { r: 255, g: 215, b: 80 };
const DUST_FG: Color = Color::Rgb { r: 190, g: 170, b: 140 };

/// Everything the renderer needs besides the session.
pub struct ViewContext<'a> {
    pub assets: &'a Assets,
    pub overlay: Option<&'a OverlayView>,
    pub device: InputDevice,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    /// Keyboard enhancement flags were pushed and must be popped.
    enhanced: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            enhanced: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether key
    /// Release events will be reported.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced = true;
        }
        tracing::debug!(enhanced = self.enhanced, "terminal initialized");
        // Size stays 0×0 so the first render sizes buffers and camera.
        Ok(self.enhanced)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, session: &mut Session, ctx: &ViewContext) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.set_size(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            fit_camera(session, self.term_w, self.term_h);
            let (cx, cy) = session.player_cell();
            let (w, h) = (session.map.width, session.map.height);
            session.camera.center_on(cx, cy, w, h);
        }

        self.compose(session, ctx);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn set_size(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, s: &Session, ctx: &ViewContext) {
        self.front.clear();
        self.compose_hud(s);
        self.compose_map(s, ctx);
        if s.prompt_visible {
            self.compose_prompt(s);
        }
        if let Some(view) = ctx.overlay {
            self.compose_overlay(view, ctx.device);
        }
        self.compose_footer(s, ctx.device);
    }

    fn compose_hud(&mut self, s: &Session) {
        let near = s.current().map(|p| p.title.as_str()).unwrap_or("-");
        let hud = format!(
            " STROLL  x:{:<5.0} y:{:<5.0} {:<4}  near: {}",
            s.player.pos.x,
            s.player.pos.y,
            if s.player.dust { "RUN" } else { "" },
            near,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_map(&mut self, s: &Session, ctx: &ViewContext) {
        let cam = &s.camera;
        let player_cell = s.player_cell();
        let depth = s.player.depth();
        let dust_cell = if s.player.dust { trailing_cell(s) } else { None };
        let poi_cells: Vec<(usize, usize)> = s.pois.iter().map(|p| s.map.cell_of(p.pos())).collect();

        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= self.front.width { break; }

                let (wx, wy) = (cam.x + vx as i32, cam.y + vy as i32);
                if wx < 0 || wy < 0 || wx as usize >= s.map.width || wy as usize >= s.map.height {
                    continue; // void stays BLANK
                }
                let cell = (wx as usize, wy as usize);

                let under = layer_colour(s, ctx.assets, cell, |plan| !plan.draws_over(depth));
                let over = layer_colour(s, ctx.assets, cell, |plan| plan.draws_over(depth));
                let bg = under.map(rgb).unwrap_or(Cell::BASE_BG);

                let (mut left, mut right) = (Cell::new(' ', Color::White, bg), Cell::new(' ', Color::White, bg));

                if poi_cells.contains(&cell) {
                    left = Cell::new('◆', POI_FG, bg);
                }
                if dust_cell == Some(cell) {
                    left = Cell::new('░', DUST_FG, bg);
                    right = Cell::new('░', DUST_FG, bg);
                }
                if cell == player_cell {
                    let fg = rgb(ctx.assets.sprite.frame_colour(s.player.anim.sprite_index()));
                    left = Cell::new(facing_glyph(s.player.facing), fg, bg);
                    right = Cell::new(STRIDE[s.player.anim.frame % STRIDE.len()], fg, bg);
                }
                if let Some(c) = over {
                    left = Cell::new(' ', Color::White, rgb(c));
                    right = left;
                }

                self.front.set(col, row, left);
                self.front.set(col + 1, row, right);
            }
        }
    }

    /// "E: <title>" bubble one row above the player.
    fn compose_prompt(&mut self, s: &Session) {
        let Some(poi) = s.interaction.prompt_poi().and_then(|i| s.pois.get(i)) else { return };
        let (px, py) = s.player_cell();
        let Some((vx, vy)) = s.camera.world_to_view(px, py) else { return };

        let text = format!(" E: {} ", poi.title);
        let len = text.chars().count();
        let row = MAP_ROW + vy.saturating_sub(1);
        let center = vx * CELL_W + 1;
        let max_x = self.front.width.saturating_sub(len);
        let x = center.saturating_sub(len / 2).min(max_x);
        self.front.put_str(x, row, &text, Color::Black, PROMPT_BG);
    }

    fn compose_overlay(&mut self, view: &OverlayView, device: InputDevice) {
        let area_w = self.front.width;
        let area_h = self.front.height.saturating_sub(RESERVED_ROWS).max(3);
        let box_w = 56usize.min(area_w.saturating_sub(2)).max(12);
        let inner = box_w - 4;

        let mut lines: Vec<(String, Color)> = Vec::new();
        lines.push((view.title.clone(), POI_FG));
        lines.push((String::new(), Color::White));
        match &view.image {
            Some(ImagePreview::Ready { path, summary }) => {
                lines.push((format!("[{}×{}] {}", summary.width, summary.height, path), Color::Grey));
            }
            Some(ImagePreview::Unavailable { path }) => {
                lines.push((format!("(image unavailable: {path})"), Color::DarkGrey));
            }
            None => {}
        }
        for l in wrap_text(&view.description, inner) {
            lines.push((l, Color::White));
        }
        lines.push((String::new(), Color::White));
        let hint = match device {
            InputDevice::Gamepad => "B: close",
            _ => "Esc: close",
        };
        lines.push((hint.to_string(), Color::DarkGrey));

        let box_h = (lines.len() + 2).min(area_h);
        let box_x = area_w.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + area_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                let edge = y == box_y || y + 1 == box_y + box_h || x == box_x || x + 1 == box_x + box_w;
                let bg = if edge { PANEL_EDGE } else { PANEL_BG };
                self.front.set(x, y, Cell::new(' ', Color::White, bg));
            }
        }

        for (i, (text, fg)) in lines.iter().take(box_h.saturating_sub(2)).enumerate() {
            let clipped: String = text.chars().take(inner).collect();
            self.front.put_str(box_x + 2, box_y + 1 + i, &clipped, *fg, PANEL_BG);
        }

        // Image swatch to the right of the caption.
        if let Some(ImagePreview::Ready { summary, .. }) = &view.image {
            if let Some(c) = summary.colour {
                let y = box_y + 3;
                let x = box_x + box_w - 4;
                if y + 1 < box_y + box_h {
                    self.front.set(x, y, Cell::new(' ', Color::White, rgb(c)));
                    self.front.set(x + 1, y, Cell::new(' ', Color::White, rgb(c)));
                }
            }
        }
    }

    fn compose_footer(&mut self, s: &Session, device: InputDevice) {
        let msg_row = MAP_ROW + s.camera.view_h;
        if msg_row < self.front.height && !s.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" {} ", s.message), Color::Black, MSG_BG);
        }

        let help_row = msg_row + 1;
        if help_row < self.front.height {
            let help = match device {
                InputDevice::Gamepad => " Stick/D-pad: move (push hard to run)  A: read  B: close  Select: quit",
                _ => " Arrows/WASD: move  Space/Shift: run  E/Enter: read  Esc: close  Q: quit",
            };
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }
}

// ── Helpers ──

/// Size the viewport to the terminal, capped to the map.
fn fit_camera(s: &mut Session, term_w: usize, term_h: usize) {
    let view_w = (term_w / CELL_W).max(1);
    let view_h = term_h.saturating_sub(RESERVED_ROWS).max(1);
    s.camera.view_w = view_w.min(s.map.width.max(1));
    s.camera.view_h = view_h.min(s.map.height.max(1));
}

/// Topmost coloured tile at `cell` among layers accepted by `pick`.
fn layer_colour(s: &Session, assets: &Assets, cell: (usize, usize), pick: impl Fn(&LayerPlan) -> bool) -> Option<Rgb> {
    s.map.layers
        .iter()
        .filter(|l| l.visible && pick(&l.plan))
        .filter_map(|l| assets.palette.colour(s.map.gid_at(l, cell.0, cell.1)))
        .last()
}

/// Cell just behind the player, where run dust shows.
fn trailing_cell(s: &Session) -> Option<(usize, usize)> {
    let (x, y) = s.player_cell();
    let (dx, dy): (i64, i64) = match s.player.facing {
        Facing::Left => (1, 0),
        Facing::Right => (-1, 0),
        Facing::Up => (0, 1),
        Facing::Down => (0, -1),
    };
    let (tx, ty) = (x as i64 + dx, y as i64 + dy);
    if tx < 0 || ty < 0 || tx as usize >= s.map.width || ty as usize >= s.map.height {
        return None;
    }
    Some((tx as usize, ty as usize))
}

fn facing_glyph(f: Facing) -> char {
    match f {
        Facing::Down => '▼',
        Facing::Left => '◀',
        Facing::Right => '▶',
        Facing::Up => '▲',
    }
}

/// Second column of the player cell, one char per animation frame.
const STRIDE: [char; 3] = ['╵', '│', '╷'];

fn rgb((r, g, b): Rgb) -> Color {
    Color::Rgb { r, g, b }
}
