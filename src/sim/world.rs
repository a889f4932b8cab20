/// Session: the complete state of a running exploration.
///
/// Owns the loaded map, the frozen POI registry, the player, and the
/// interaction controller. Nothing here is global; the step function
/// and the renderer both take a `&Session` / `&mut Session`.
///
/// ## Camera / Viewport
///
/// World coordinates are map pixels; the viewport works in map cells:
///   - `camera`: viewport into the map (top-left cell + size)
///   - Renderer maps: `screen(sx, sy) = cell(camera.x + sx, camera.y + sy)`
///   - Camera follows the player's cell with a dead zone
///   - Maps smaller than the viewport are centered

use crate::config::GameConfig;
use crate::domain::entity::Player;
use crate::domain::interaction::InteractionController;
use crate::domain::movement::MovementParams;
use crate::domain::physics::{Collider, CollisionGrid};
use crate::domain::poi::{PoiRegistry, PointOfInterest};
use crate::domain::proximity::TieBreak;
use super::map::{LoadedMap, TileMap};

/// Camera: a viewport into the map, in cells.
///
/// `(x, y)` is the top-left visible cell; `(view_w, view_h)` is how many
/// cells fit. Size is set from the terminal during `render()`.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Can be negative when a small map is centered.
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    /// Scroll only when the target nears the edge (20% margin per side).
    pub fn follow(&mut self, target_x: usize, target_y: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x as i32, self.view_w as i32, world_w as i32);
        self.y = follow_axis(self.y, target_y as i32, self.view_h as i32, world_h as i32);
    }

    /// Snap to center on a cell. Used on session start.
    pub fn center_on(&mut self, target_x: usize, target_y: usize, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target_x as i32, self.view_w as i32, world_w as i32);
        self.y = center_axis(target_y as i32, self.view_h as i32, world_h as i32);
    }

    /// None if the cell is outside the viewport.
    pub fn world_to_view(&self, wx: usize, wy: usize) -> Option<(usize, usize)> {
        let vx = wx as i32 - self.x;
        let vy = wy as i32 - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

fn follow_axis(pos: i32, target: i32, view: i32, world: i32) -> i32 {
    if world <= view {
        return -((view - world) / 2);
    }
    let margin = view / 5;
    let mut pos = pos;
    if target < pos + margin {
        pos = target - margin;
    } else if target > pos + view - margin - 1 {
        pos = target - view + margin + 1;
    }
    pos.clamp(0, world - view)
}

fn center_axis(target: i32, view: i32, world: i32) -> i32 {
    if world <= view {
        return -((view - world) / 2);
    }
    (target - view / 2).clamp(0, world - view)
}

/// Tuning that stays fixed for the whole session.
#[derive(Clone, Debug)]
pub struct SessionParams {
    pub movement: MovementParams,
    pub radius: f32,
    pub tie_break: TieBreak,
    pub close_on_leave: bool,
    pub collider: Collider,
    /// Keyboard sessions show the "press E" prompt; pointer/stick sessions do not.
    pub show_prompt: bool,
    /// Ignore steering while the overlay is open.
    pub overlay_blocks_steering: bool,
}

impl SessionParams {
    pub fn from_config(cfg: &GameConfig, show_prompt: bool, overlay_blocks_steering: bool) -> Self {
        SessionParams {
            movement: cfg.movement.clone(),
            radius: cfg.interaction.radius,
            tie_break: cfg.interaction.tie_break,
            close_on_leave: cfg.interaction.close_on_leave,
            collider: Collider::default(),
            show_prompt,
            overlay_blocks_steering,
        }
    }
}

pub struct Session {
    // ── Map ──
    pub map: TileMap,
    pub collision: CollisionGrid,
    pub pois: PoiRegistry,

    // ── Entities ──
    pub player: Player,

    // ── Interaction ──
    pub interaction: InteractionController,
    /// POI within radius after the latest step.
    pub current_poi: Option<usize>,
    pub prompt_visible: bool,

    pub params: SessionParams,

    // ── Meta ──
    pub tick: u64,
    pub message: String,
    pub message_timer: u32,

    pub camera: Camera,
}

impl Session {
    /// Place the player at the spawn point. Nothing is in range until the first step.
    pub fn new(loaded: LoadedMap, params: SessionParams) -> Self {
        tracing::info!(
            spawn_x = loaded.spawn.x,
            spawn_y = loaded.spawn.y,
            pois = loaded.pois.len(),
            "session started"
        );
        Session {
            map: loaded.map,
            collision: loaded.collision,
            pois: loaded.pois,
            player: Player::new(loaded.spawn),
            interaction: InteractionController::new(params.close_on_leave),
            current_poi: None,
            prompt_visible: false,
            params,
            tick: 0,
            message: String::new(),
            message_timer: 0,
            camera: Camera::default(),
        }
    }

    pub fn current(&self) -> Option<&PointOfInterest> {
        self.current_poi.and_then(|i| self.pois.get(i))
    }

    /// POI shown in the open overlay.
    pub fn overlay_poi(&self) -> Option<&PointOfInterest> {
        self.interaction.open_poi().and_then(|i| self.pois.get(i))
    }

    pub fn player_cell(&self) -> (usize, usize) {
        self.map.cell_of(self.player.pos)
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_map_is_centered() {
        let mut cam = Camera { view_w: 20, view_h: 10, ..Camera::default() };
        cam.center_on(3, 3, 10, 4);
        assert_eq!((cam.x, cam.y), (-5, -3));
        assert_eq!(cam.world_to_view(0, 0), Some((5, 3)));
    }

    #[test]
    fn follow_scrolls_past_margin_and_clamps() {
        let mut cam = Camera { view_w: 10, view_h: 10, ..Camera::default() };
        cam.center_on(0, 0, 40, 30);
        assert_eq!((cam.x, cam.y), (0, 0));

        // Inside the dead zone: no scroll.
        cam.follow(5, 5, 40, 30);
        assert_eq!((cam.x, cam.y), (0, 0));

        // Past the right margin (2 cells).
        cam.follow(9, 5, 40, 30);
        assert_eq!(cam.x, 2);

        cam.follow(39, 29, 40, 30);
        assert_eq!((cam.x, cam.y), (30, 20));
        assert_eq!(cam.world_to_view(0, 0), None);
    }

    #[test]
    fn new_session_starts_at_spawn_idle() {
        let loaded = crate::sim::map::tests::small_map();
        let spawn = loaded.spawn;
        let params = SessionParams::from_config(&GameConfig::default(), true, false);
        let s = Session::new(loaded, params);
        assert_eq!(s.player.pos, spawn);
        assert!(s.current().is_none());
        assert!(!s.interaction.is_open());
        assert!(!s.prompt_visible);
        assert_eq!(s.player_cell(), (0, 2));
    }
}
