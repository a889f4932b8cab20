/// Entities and per-tick input: Player, facing, speed tier, animation,
/// and the FrameInput handed to the step function.
///
/// Positions are in map pixels. The player's position is the feet point:
/// collider and render depth are both anchored there.

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Facing direction. Doubles as the sprite-sheet row selector.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Down,
    Left,
    Right,
    Up,
}

impl Facing {
    /// Row in the 3×4 sprite sheet (rows: down, left, right, up).
    pub fn row(self) -> usize {
        match self {
            Facing::Down => 0,
            Facing::Left => 1,
            Facing::Right => 2,
            Facing::Up => 3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SpeedTier {
    Walk,
    Run,
}

/// Frames per facing row in the sprite sheet.
pub const FRAMES_PER_ROW: usize = 3;

/// Directional animation playback.
///
/// `advance` steps through the three frames of the facing row at the given
/// rate; `stop` freezes on the current frame.
#[derive(Clone, Debug)]
pub struct Animation {
    pub facing: Facing,
    pub frame: usize,
    pub playing: bool,
    elapsed: f32,
}

impl Animation {
    pub fn new(facing: Facing) -> Self {
        Animation { facing, frame: 0, playing: false, elapsed: 0.0 }
    }

    /// Play the row for `facing` at `fps`, advancing by `dt` seconds.
    /// Switching rows restarts from the first frame.
    pub fn advance(&mut self, facing: Facing, fps: f32, dt: f32) {
        if facing != self.facing {
            self.facing = facing;
            self.frame = 0;
            self.elapsed = 0.0;
        }
        self.playing = true;
        if fps <= 0.0 { return; }

        self.elapsed += dt;
        let period = 1.0 / fps;
        while self.elapsed >= period {
            self.elapsed -= period;
            self.frame = (self.frame + 1) % FRAMES_PER_ROW;
        }
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.elapsed = 0.0;
    }

    /// Index into the 12-frame sheet.
    pub fn sprite_index(&self) -> usize {
        self.facing.row() * FRAMES_PER_ROW + self.frame
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub facing: Facing,
    pub tier: SpeedTier,
    pub anim: Animation,
    /// Run dust particles are emitting.
    pub dust: bool,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Player {
            pos,
            velocity: Vec2::ZERO,
            facing: Facing::Down,
            tier: SpeedTier::Walk,
            anim: Animation::new(Facing::Down),
            dust: false,
        }
    }

    /// Render depth: sprites lower on the map draw over those above.
    pub fn depth(&self) -> f32 {
        self.pos.y
    }
}

// ── Per-tick input ──

/// Four directional controls plus the run modifier, as sampled this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct DirectionalKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub run: bool,
}

/// Virtual joystick reading: `force` in 0..=1, `angle` in radians
/// with 0 pointing right and positive angles turning towards screen-down.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct StickVector {
    pub force: f32,
    pub angle: f32,
}

/// Movement intent for one tick. Exactly one device class feeds it.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum Steering {
    #[default]
    Idle,
    Keys(DirectionalKeys),
    Stick(StickVector),
}

/// Frame input: continuous steering plus edge-triggered actions.
/// `trigger` and `close` fire once per press, never while held.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct FrameInput {
    pub steering: Steering,
    pub trigger: bool,
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_cycles_three_frames() {
        let mut a = Animation::new(Facing::Left);
        a.advance(Facing::Left, 10.0, 0.1);
        assert_eq!(a.frame, 1);
        a.advance(Facing::Left, 10.0, 0.1);
        assert_eq!(a.frame, 2);
        a.advance(Facing::Left, 10.0, 0.1);
        assert_eq!(a.frame, 0); // wrapped
        assert!(a.playing);
    }

    #[test]
    fn animation_restarts_on_new_row() {
        let mut a = Animation::new(Facing::Left);
        a.advance(Facing::Left, 10.0, 0.15);
        assert_eq!(a.frame, 1);
        a.advance(Facing::Up, 10.0, 0.0);
        assert_eq!(a.frame, 0);
        assert_eq!(a.sprite_index(), 9);
    }

    #[test]
    fn stop_freezes_frame() {
        let mut a = Animation::new(Facing::Right);
        a.advance(Facing::Right, 10.0, 0.25);
        let frozen = a.frame;
        a.stop();
        assert!(!a.playing);
        assert_eq!(a.frame, frozen);
        assert_eq!(a.sprite_index(), 2 * FRAMES_PER_ROW + frozen);
    }

    #[test]
    fn player_depth_tracks_y() {
        let mut p = Player::new(Vec2::new(10.0, 42.5));
        assert_eq!(p.depth(), 42.5);
        p.pos.y = 99.0;
        assert_eq!(p.depth(), 99.0);
    }
}
