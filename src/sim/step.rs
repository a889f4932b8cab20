/// The step function: advances the session by one tick.
///
/// Processing order:
///   1. Steering gate (overlay open on a device that freezes the player)
///   2. Movement driver (velocity, facing, speed tier, frame rate)
///   3. Integration against the collision grid
///   4. Animation and run dust
///   5. Proximity detection
///   6. Interaction transitions (proximity first, then trigger/close)
///   7. Prompt visibility and camera
///
/// Proximity reads the position *after* integration, so the prompt and
/// the trigger always agree with where the player is drawn.

use crate::domain::entity::{FrameInput, Steering, Vec2};
use crate::domain::interaction::Transition;
use crate::domain::movement::{self, Motion};
use crate::domain::physics;
use crate::domain::proximity;
use super::event::GameEvent;
use super::world::Session;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(session: &mut Session, input: FrameInput, dt: f32) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();
    session.tick += 1;

    if session.message_timer > 0 {
        session.message_timer -= 1;
        if session.message_timer == 0 { session.message.clear(); }
    }

    let steering = if session.interaction.is_open() && session.params.overlay_blocks_steering {
        Steering::Idle
    } else {
        input.steering
    };

    let motion = movement::drive(&steering, &session.params.movement);
    resolve_movement(session, &motion, dt);
    resolve_dust(session, &motion, &mut events);
    resolve_interaction(session, input, &mut events);

    session.prompt_visible = session.params.show_prompt && session.interaction.prompt_poi().is_some();

    let (cx, cy) = session.player_cell();
    let (w, h) = (session.map.width, session.map.height);
    session.camera.follow(cx, cy, w, h);

    events
}

// ══════════════════════════════════════════════════════════════
// Movement + animation
// ══════════════════════════════════════════════════════════════

fn resolve_movement(session: &mut Session, motion: &Motion, dt: f32) {
    let player = &mut session.player;
    player.velocity = motion.velocity;
    player.tier = motion.tier;

    if !motion.velocity.is_zero() {
        let (x, y) = physics::integrate(
            &session.collision,
            &session.params.collider,
            player.pos.x,
            player.pos.y,
            motion.velocity.x,
            motion.velocity.y,
            dt,
        );
        player.pos = Vec2::new(x, y);
    }

    match motion.facing {
        Some(facing) => {
            player.facing = facing;
            player.anim.advance(facing, motion.frame_rate, dt);
        }
        None => player.anim.stop(),
    }
}

fn resolve_dust(session: &mut Session, motion: &Motion, events: &mut Vec<GameEvent>) {
    let dust = motion.dust();
    if dust != session.player.dust {
        session.player.dust = dust;
        events.push(if dust { GameEvent::DustStarted } else { GameEvent::DustStopped });
    }
}

// ══════════════════════════════════════════════════════════════
// Proximity + interaction
// ══════════════════════════════════════════════════════════════

fn resolve_interaction(session: &mut Session, input: FrameInput, events: &mut Vec<GameEvent>) {
    let current = proximity::detect(
        session.player.pos,
        &session.pois,
        session.params.radius,
        session.params.tie_break,
    );
    session.current_poi = current;

    for t in session.interaction.update(current, input.trigger, input.close) {
        tracing::debug!(
            tick = session.tick,
            transition = ?t,
            state = ?session.interaction.state(),
            "interaction"
        );
        events.push(match t {
            Transition::EnteredRange { poi } | Transition::Retargeted { poi } => GameEvent::EnteredRange { poi },
            Transition::LeftRange => GameEvent::LeftRange,
            Transition::Opened { poi } => GameEvent::OverlayOpened { poi },
            Transition::Closed => GameEvent::OverlayClosed,
        });
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::{DirectionalKeys, Facing, SpeedTier, StickVector};
    use crate::domain::physics::CollisionGrid;
    use crate::domain::poi::{PoiRegistry, PointOfInterest, DEFAULT_DESCRIPTION};
    use crate::sim::map::{LoadedMap, TileMap};
    use crate::sim::world::SessionParams;

    const DT: f32 = 1.0 / 30.0;

    fn poi(title: &str, x: f32, y: f32) -> PointOfInterest {
        PointOfInterest {
            x,
            y,
            title: title.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            image: None,
        }
    }

    /// 20×20 open field of 16px cells.
    fn field(pois: Vec<PointOfInterest>, spawn: Vec2) -> LoadedMap {
        LoadedMap {
            map: TileMap { width: 20, height: 20, tile_w: 16.0, tile_h: 16.0, layers: vec![], tilesets: vec![] },
            collision: CollisionGrid::new(20, 20, 16.0, 16.0),
            pois: PoiRegistry::new(pois),
            spawn,
        }
    }

    fn keyboard_session(loaded: LoadedMap) -> Session {
        Session::new(loaded, SessionParams::from_config(&GameConfig::default(), true, false))
    }

    fn gamepad_session(loaded: LoadedMap) -> Session {
        Session::new(loaded, SessionParams::from_config(&GameConfig::default(), false, true))
    }

    fn keys(left: bool, right: bool, up: bool, down: bool, run: bool) -> FrameInput {
        FrameInput {
            steering: Steering::Keys(DirectionalKeys { left, right, up, down, run }),
            ..FrameInput::default()
        }
    }

    fn trigger() -> FrameInput {
        FrameInput { trigger: true, ..FrameInput::default() }
    }

    fn close() -> FrameInput {
        FrameInput { close: true, ..FrameInput::default() }
    }

    #[test]
    fn running_left_shows_dust_until_release() {
        let mut s = keyboard_session(field(vec![], Vec2::new(160.0, 160.0)));

        let mut started = 0;
        for _ in 0..3 {
            let ev = step(&mut s, keys(true, false, false, false, true), DT);
            started += ev.iter().filter(|e| **e == GameEvent::DustStarted).count();
            assert!(s.player.dust);
            assert_eq!(s.player.velocity, Vec2::new(-200.0, 0.0));
            assert_eq!(s.player.facing, Facing::Left);
            assert_eq!(s.player.tier, SpeedTier::Run);
        }
        assert_eq!(started, 1);
        assert!((s.player.pos.x - (160.0 - 3.0 * 200.0 * DT)).abs() < 1e-3);
        assert!(s.player.anim.playing);

        let ev = step(&mut s, FrameInput::default(), DT);
        assert_eq!(ev, vec![GameEvent::DustStopped]);
        assert!(!s.player.dust);
        assert!(s.player.velocity.is_zero());
        assert!(!s.player.anim.playing);
        assert_eq!(s.player.facing, Facing::Left);
    }

    #[test]
    fn walking_makes_no_dust() {
        let mut s = keyboard_session(field(vec![], Vec2::new(160.0, 160.0)));
        let ev = step(&mut s, keys(false, false, false, true, false), DT);
        assert!(ev.is_empty());
        assert!(!s.player.dust);
        assert_eq!(s.player.anim.facing, Facing::Down);
    }

    #[test]
    fn walls_stop_the_player() {
        let mut loaded = field(vec![], Vec2::new(40.0, 40.0));
        // Solid column at cell x = 3 (pixels 48..64).
        let mut gids = vec![0u32; 400];
        for y in 0..20 { gids[y * 20 + 3] = 1; }
        loaded.collision.add_layer(&gids);
        let mut s = keyboard_session(loaded);

        for _ in 0..30 {
            step(&mut s, keys(false, true, false, false, true), DT);
        }
        assert!(s.player.pos.x + s.params.collider.width / 2.0 <= 48.0);
        // Input still says "running right": dust follows input, not displacement.
        assert!(s.player.dust);
    }

    #[test]
    fn fontana_keyboard_prompt_and_default_overlay() {
        // 39 units away: just inside the 40-unit radius.
        let mut s = keyboard_session(field(vec![poi("Fontana", 100.0, 100.0)], Vec2::new(100.0, 139.0)));

        let ev = step(&mut s, FrameInput::default(), DT);
        assert_eq!(ev, vec![GameEvent::EnteredRange { poi: 0 }]);
        assert!(s.prompt_visible);
        assert_eq!(s.current().map(|p| p.title.as_str()), Some("Fontana"));

        let ev = step(&mut s, trigger(), DT);
        assert_eq!(ev, vec![GameEvent::OverlayOpened { poi: 0 }]);
        assert!(!s.prompt_visible);
        let shown = s.overlay_poi().unwrap();
        assert_eq!(shown.description, DEFAULT_DESCRIPTION);
        assert!(shown.image.is_none());

        let ev = step(&mut s, close(), DT);
        assert_eq!(ev, vec![GameEvent::OverlayClosed]);
        assert!(!s.interaction.is_open());
        assert!(!s.prompt_visible);

        // Still in range: next tick re-enters and the prompt returns.
        let ev = step(&mut s, FrameInput::default(), DT);
        assert_eq!(ev, vec![GameEvent::EnteredRange { poi: 0 }]);
        assert!(s.prompt_visible);
    }

    #[test]
    fn fontana_gamepad_has_no_prompt() {
        let mut s = gamepad_session(field(vec![poi("Fontana", 100.0, 100.0)], Vec2::new(100.0, 139.0)));
        step(&mut s, FrameInput::default(), DT);
        assert_eq!(s.current_poi, Some(0));
        assert!(!s.prompt_visible);

        let ev = step(&mut s, trigger(), DT);
        assert_eq!(ev, vec![GameEvent::OverlayOpened { poi: 0 }]);
    }

    #[test]
    fn trigger_out_of_range_does_nothing() {
        let mut s = keyboard_session(field(vec![poi("Far", 300.0, 300.0)], Vec2::new(20.0, 20.0)));
        let ev = step(&mut s, trigger(), DT);
        assert!(ev.is_empty());
        assert!(!s.interaction.is_open());
    }

    #[test]
    fn gamepad_overlay_freezes_steering() {
        let mut s = gamepad_session(field(vec![poi("Well", 100.0, 100.0)], Vec2::new(100.0, 120.0)));
        step(&mut s, trigger(), DT);
        assert!(s.interaction.is_open());

        let stick = FrameInput {
            steering: Steering::Stick(StickVector { force: 1.0, angle: 0.0 }),
            ..FrameInput::default()
        };
        let before = s.player.pos;
        step(&mut s, stick, DT);
        assert_eq!(s.player.pos, before);
        assert!(s.player.velocity.is_zero());
    }

    #[test]
    fn keyboard_overlay_stays_open_when_walking_away() {
        let mut s = keyboard_session(field(vec![poi("Well", 100.0, 100.0)], Vec2::new(100.0, 120.0)));
        step(&mut s, trigger(), DT);
        assert!(s.interaction.is_open());

        for _ in 0..30 {
            step(&mut s, keys(false, false, false, true, true), DT);
        }
        assert!(s.player.pos.y > 150.0);
        assert_eq!(s.current_poi, None);
        assert!(s.interaction.is_open());
    }

    #[test]
    fn close_on_leave_closes_overlay() {
        let mut cfg = GameConfig::default();
        cfg.interaction.close_on_leave = true;
        let loaded = field(vec![poi("Well", 100.0, 100.0)], Vec2::new(100.0, 120.0));
        let mut s = Session::new(loaded, SessionParams::from_config(&cfg, true, false));
        step(&mut s, trigger(), DT);

        let mut closed = false;
        for _ in 0..30 {
            let ev = step(&mut s, keys(false, false, false, true, true), DT);
            closed |= ev.contains(&GameEvent::OverlayClosed);
        }
        assert!(closed);
        assert!(!s.interaction.is_open());
    }

    #[test]
    fn walking_between_pois_retargets() {
        let pois = vec![poi("A", 100.0, 100.0), poi("B", 160.0, 100.0)];
        let mut s = keyboard_session(field(pois, Vec2::new(100.0, 110.0)));
        step(&mut s, FrameInput::default(), DT);
        assert_eq!(s.current_poi, Some(0));

        let mut seen = vec![];
        for _ in 0..20 {
            seen.extend(step(&mut s, keys(false, true, false, false, false), DT));
        }
        assert_eq!(s.current_poi, Some(1));
        assert!(seen.contains(&GameEvent::EnteredRange { poi: 1 }));
    }

    #[test]
    fn message_expires() {
        let mut s = keyboard_session(field(vec![], Vec2::new(100.0, 100.0)));
        s.set_message("hello", 2);
        step(&mut s, FrameInput::default(), DT);
        assert_eq!(s.message, "hello");
        step(&mut s, FrameInput::default(), DT);
        assert!(s.message.is_empty());
    }
}
