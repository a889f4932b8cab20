/// Gamepad input tracker using gilrs.
///
/// The left stick (or the D-pad as a full-deflection stick) becomes a
/// force/angle vector; buttons map to actions from `[gamepad]` in config.toml.
/// Default mapping:
///   Left Stick / D-pad  →  Move (force ≥ run threshold = run)
///   A                   →  Interact
///   B                   →  Close overlay
///   Select              →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::StickVector;
use crate::domain::interaction::Edge;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

const BTN_COUNT: usize = 14;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            Button::DPadUp    => Some(Btn::DPadUp),
            Button::DPadDown  => Some(Btn::DPadDown),
            Button::DPadLeft  => Some(Btn::DPadLeft),
            Button::DPadRight => Some(Btn::DPadRight),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge, until the next update).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    edge: Edge,
    held: bool,
    just_pressed: bool,
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    interact: Vec<Btn>,
    close: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            interact: vec![Btn::A],
            close:    vec![Btn::B],
            quit:     vec![Btn::Select],
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; BTN_COUNT],

    /// Raw left stick, gilrs convention (y up).
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    tracing::warn!("gamepad backend unavailable: {e}");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); BTN_COUNT],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config. Empty or unknown lists keep the defaults.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter()
                .filter_map(|s| {
                    let btn = Btn::from_name(s);
                    if btn.is_none() {
                        tracing::warn!(button = %s, "unknown gamepad button name");
                    }
                    btn
                })
                .collect()
        }
        let map = &mut self.action_map;
        let it = parse_list(&cfg.interact);
        if !it.is_empty() { map.interact = it; }
        let cl = parse_list(&cfg.close);
        if !cl.is_empty() { map.close = cl; }
        let qt = parse_list(&cfg.quit);
        if !qt.is_empty() { map.quit = qt; }
    }

    /// Call once per frame: clears edges, then drains backend events.
    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    if let Some(b) = Btn::from_gilrs(btn) { self.set_button(b, true); }
                }
                EventType::ButtonReleased(btn, _) => {
                    if let Some(b) = Btn::from_gilrs(btn) { self.set_button(b, false); }
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    tracing::info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    tracing::info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }
    }

    /// Record a press or release.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    pub fn set_button(&mut self, btn: Btn, held: bool) {
        let state = &mut self.buttons[btn_index(btn)];
        state.held = held;
        if state.edge.update(held) {
            state.just_pressed = true;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    pub fn set_stick(&mut self, x: f32, y: f32) {
        self.stick_x = x;
        self.stick_y = y;
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    fn held(&self, btn: Btn) -> bool {
        self.buttons[btn_index(btn)].held
    }

    pub fn interact_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.interact)
    }
    pub fn close_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.close)
    }
    pub fn quit_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.quit)
    }

    /// Stick as force/angle, screen convention (angle 0 = right, +π/2 = down).
    /// A held D-pad overrides the analog stick at full force.
    pub fn stick(&self) -> StickVector {
        let dx = self.held(Btn::DPadRight) as i8 - self.held(Btn::DPadLeft) as i8;
        let dy = self.held(Btn::DPadDown) as i8 - self.held(Btn::DPadUp) as i8;
        let (x, y) = if dx != 0 || dy != 0 {
            (dx as f32, dy as f32)
        } else {
            (self.stick_x, -self.stick_y)
        };
        let force = (x * x + y * y).sqrt().min(1.0);
        if force == 0.0 {
            return StickVector::default();
        }
        StickVector { force, angle: y.atan2(x) }
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in &mut self.buttons { b.just_pressed = false; }
    }

    fn release_all(&mut self) {
        for b in &mut self.buttons { *b = BtnState::default(); }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}
