/// Collision and velocity integration. All movement goes through here.
///
/// ## Architecture
///
/// Two distinct concepts:
///   1. MASK:     which map cells are solid (union of colliding layers)
///   2. COLLIDER: the player's feet box, anchored at the feet point
///
/// Movement = integrate velocity one axis at a time; an axis whose move
/// would overlap a solid cell or leave the map keeps its old coordinate.
/// Sliding along walls falls out of the axis split.
///
/// ## Collision Grid (O(1) lookup)
///
/// Solid cells live in a flat boolean grid built once at load.

// ══════════════════════════════════════════════════════════════
// Layer 1: Mask (what the map IS)
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct CollisionGrid {
    pub width: usize,
    pub height: usize,
    pub tile_w: f32,
    pub tile_h: f32,
    solid: Vec<bool>,
}

impl CollisionGrid {
    pub fn new(width: usize, height: usize, tile_w: f32, tile_h: f32) -> Self {
        CollisionGrid { width, height, tile_w, tile_h, solid: vec![false; width * height] }
    }

    /// Register every non-empty cell of a tile layer as solid.
    /// `gids` is row-major, `width * height` long; 0 means empty.
    pub fn add_layer(&mut self, gids: &[u32]) -> usize {
        let mut added = 0;
        for (cell, &gid) in self.solid.iter_mut().zip(gids) {
            if gid != 0 && !*cell {
                *cell = true;
                added += 1;
            }
        }
        added
    }

    /// Out of bounds = solid.
    #[inline]
    pub fn is_solid(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return true;
        }
        self.solid[y as usize * self.width + x as usize]
    }

    pub fn solid_count(&self) -> usize {
        self.solid.iter().filter(|&&s| s).count()
    }

    /// Does an axis-aligned box overlap any solid cell?
    pub fn blocks(&self, rect: Rect) -> bool {
        if self.tile_w <= 0.0 || self.tile_h <= 0.0 {
            return true;
        }
        // Half-open box: a right edge exactly on a cell boundary does not touch that cell.
        let x0 = (rect.left / self.tile_w).floor() as i64;
        let y0 = (rect.top / self.tile_h).floor() as i64;
        let x1 = ((rect.right / self.tile_w).ceil() as i64 - 1).max(x0);
        let y1 = ((rect.bottom / self.tile_h).ceil() as i64 - 1).max(y0);

        (y0..=y1).any(|y| (x0..=x1).any(|x| self.is_solid(x, y)))
    }
}

// ══════════════════════════════════════════════════════════════
// Layer 2: Collider (where the player IS)
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Feet box: `width` wide, centred on the feet point, `height` tall above it.
#[derive(Clone, Copy, Debug)]
pub struct Collider {
    pub width: f32,
    pub height: f32,
}

impl Default for Collider {
    fn default() -> Self {
        Collider { width: 10.0, height: 6.0 }
    }
}

impl Collider {
    pub fn rect_at(&self, x: f32, y: f32) -> Rect {
        let half = self.width / 2.0;
        Rect { left: x - half, top: y - self.height, right: x + half, bottom: y }
    }
}

// ══════════════════════════════════════════════════════════════
// Integration
// ══════════════════════════════════════════════════════════════

/// Move `(x, y)` by `velocity * dt`, x axis first, then y.
pub fn integrate(
    grid: &CollisionGrid,
    collider: &Collider,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    dt: f32,
) -> (f32, f32) {
    let mut nx = x;
    let mut ny = y;

    if vx != 0.0 {
        let tx = x + vx * dt;
        if !grid.blocks(collider.rect_at(tx, ny)) {
            nx = tx;
        }
    }
    if vy != 0.0 {
        let ty = y + vy * dt;
        if !grid.blocks(collider.rect_at(nx, ty)) {
            ny = ty;
        }
    }

    (nx, ny)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid from rows of '#' (solid) and ' ' (open), 16px tiles.
    fn grid_from(rows: &[&str]) -> CollisionGrid {
        let h = rows.len();
        let w = rows[0].len();
        let mut g = CollisionGrid::new(w, h, 16.0, 16.0);
        let gids: Vec<u32> = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| if c == '#' { 1 } else { 0 }))
            .collect();
        g.add_layer(&gids);
        g
    }

    #[test]
    fn out_of_bounds_is_solid() {
        let g = grid_from(&["  "]);
        assert!(g.is_solid(-1, 0));
        assert!(g.is_solid(2, 0));
        assert!(g.is_solid(0, 1));
        assert!(!g.is_solid(1, 0));
    }

    #[test]
    fn layers_union() {
        let mut g = CollisionGrid::new(3, 1, 16.0, 16.0);
        assert_eq!(g.add_layer(&[1, 0, 0]), 1);
        assert_eq!(g.add_layer(&[5, 0, 7]), 1); // first cell already solid
        assert_eq!(g.solid_count(), 2);
    }

    #[test]
    fn box_touching_cell_edge_is_not_blocked() {
        let g = grid_from(&["  #"]);
        // Right edge exactly at x=32 (boundary of the solid cell).
        let r = Rect { left: 20.0, top: 4.0, right: 32.0, bottom: 10.0 };
        assert!(!g.blocks(r));
        let r = Rect { left: 20.0, top: 4.0, right: 32.5, bottom: 10.0 };
        assert!(g.blocks(r));
    }

    #[test]
    fn free_move() {
        let g = grid_from(&[
            "     ",
            "     ",
            "     ",
        ]);
        let (x, y) = integrate(&g, &Collider::default(), 40.0, 30.0, 100.0, 0.0, 0.1);
        assert_eq!((x, y), (50.0, 30.0));
    }

    #[test]
    fn wall_stops_x_but_slides_y() {
        let g = grid_from(&[
            "   # ",
            "   # ",
            "   # ",
        ]);
        // Feet at x=40 (cell 2), wall at cell 3 (x 48..64).
        let (x, y) = integrate(&g, &Collider::default(), 40.0, 30.0, 100.0, 50.0, 0.1);
        assert_eq!(x, 40.0);
        assert_eq!(y, 35.0);
    }

    #[test]
    fn map_edge_blocks() {
        let g = grid_from(&["    "]);
        let (x, _) = integrate(&g, &Collider::default(), 6.0, 10.0, -100.0, 0.0, 0.1);
        assert_eq!(x, 6.0);
    }

    #[test]
    fn never_enters_solid_cell() {
        let g = grid_from(&[
            "        ",
            "  ####  ",
            "        ",
            "        ",
        ]);
        let c = Collider::default();
        let (mut x, mut y) = (64.0, 60.0);
        // Push upward into the block for many ticks.
        for _ in 0..50 {
            (x, y) = integrate(&g, &c, x, y, 0.0, -120.0, 1.0 / 30.0);
            assert!(!g.blocks(c.rect_at(x, y)));
        }
        assert!(y - c.height >= 32.0);
    }
}
