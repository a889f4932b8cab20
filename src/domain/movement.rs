/// Movement driver: steering → velocity, facing, speed tier, frame rate.
///
/// Keyboard and joystick are both handled here so the rest of the tick
/// never branches on device class.

use super::entity::{DirectionalKeys, Facing, SpeedTier, Steering, StickVector, Vec2};

#[derive(Clone, Debug)]
pub struct MovementParams {
    /// Walking speed in pixels per second.
    pub base_speed: f32,
    /// Speed factor while running; also the stick's full-deflection factor.
    pub run_multiplier: f32,
    pub walk_fps: f32,
    pub run_fps: f32,
    /// Stick force below this is treated as released.
    pub stick_deadzone: f32,
    /// Stick force at or above this counts as running.
    pub stick_run_force: f32,
}

impl Default for MovementParams {
    fn default() -> Self {
        MovementParams {
            base_speed: 100.0,
            run_multiplier: 2.0,
            walk_fps: 6.0,
            run_fps: 12.0,
            stick_deadzone: 0.15,
            stick_run_force: 0.7,
        }
    }
}

/// Result of driving one tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Motion {
    pub velocity: Vec2,
    /// None when idle: keep the previous facing and stop the animation.
    pub facing: Option<Facing>,
    pub tier: SpeedTier,
    pub frame_rate: f32,
}

impl Motion {
    pub const IDLE: Motion = Motion {
        velocity: Vec2::ZERO,
        facing: None,
        tier: SpeedTier::Walk,
        frame_rate: 0.0,
    };

    pub fn is_moving(&self) -> bool {
        self.facing.is_some()
    }

    /// Dust shows exactly while running with directional input.
    pub fn dust(&self) -> bool {
        self.tier == SpeedTier::Run && self.is_moving()
    }
}

pub fn drive(steering: &Steering, params: &MovementParams) -> Motion {
    match steering {
        Steering::Idle => Motion::IDLE,
        Steering::Keys(keys) => drive_keys(keys, params),
        Steering::Stick(stick) => drive_stick(stick, params),
    }
}

fn drive_keys(keys: &DirectionalKeys, params: &MovementParams) -> Motion {
    // Animation priority: left, right, up, down. No diagonal blend.
    let facing = if keys.left {
        Facing::Left
    } else if keys.right {
        Facing::Right
    } else if keys.up {
        Facing::Up
    } else if keys.down {
        Facing::Down
    } else {
        return Motion { tier: tier_for(keys.run), ..Motion::IDLE };
    };

    let tier = tier_for(keys.run);
    let speed = match tier {
        SpeedTier::Walk => params.base_speed,
        SpeedTier::Run => params.base_speed * params.run_multiplier,
    };

    let vx = if keys.left { -speed } else if keys.right { speed } else { 0.0 };
    let vy = if keys.up { -speed } else if keys.down { speed } else { 0.0 };

    Motion {
        velocity: Vec2::new(vx, vy),
        facing: Some(facing),
        tier,
        frame_rate: frame_rate(tier, params),
    }
}

fn drive_stick(stick: &StickVector, params: &MovementParams) -> Motion {
    if stick.force < params.stick_deadzone {
        return Motion::IDLE;
    }
    let force = stick.force.min(1.0);
    let speed = params.base_speed * params.run_multiplier * force;
    let (sin, cos) = stick.angle.sin_cos();

    let facing = if cos.abs() >= sin.abs() {
        if cos < 0.0 { Facing::Left } else { Facing::Right }
    } else if sin < 0.0 {
        Facing::Up
    } else {
        Facing::Down
    };

    let tier = tier_for(force >= params.stick_run_force);
    Motion {
        velocity: Vec2::new(cos * speed, sin * speed),
        facing: Some(facing),
        tier,
        frame_rate: frame_rate(tier, params),
    }
}

fn tier_for(run: bool) -> SpeedTier {
    if run { SpeedTier::Run } else { SpeedTier::Walk }
}

fn frame_rate(tier: SpeedTier, params: &MovementParams) -> f32 {
    match tier {
        SpeedTier::Walk => params.walk_fps,
        SpeedTier::Run => params.run_fps,
    }
}
