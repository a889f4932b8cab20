/// Input sources: one device class drives the player for a whole session.
///
/// The main loop pumps the active source every frame and takes one
/// `FrameInput` per simulation tick. Presses between ticks are latched
/// so a quick tap is never lost, and taken exactly once.

use crate::config::{GameConfig, InputDevice};
use crate::domain::entity::{FrameInput, Steering};
use super::gamepad::GamepadState;
use super::input::{self, InputState};

pub trait InputSource {
    fn device(&self) -> InputDevice;

    /// Sample devices for this frame. Keyboard state is always passed in
    /// so quit keys work whatever drives the player.
    fn pump(&mut self, keys: &InputState);

    /// Steering as of now plus the edges latched since the last call.
    fn take_frame_input(&mut self) -> FrameInput;

    fn quit_requested(&self) -> bool;

    /// Show the "press E" prompt near the current POI.
    fn shows_prompt(&self) -> bool;

    /// Freeze steering while the overlay is open.
    fn overlay_blocks_steering(&self) -> bool;
}

/// Edges seen since the last tick.
#[derive(Clone, Copy, Debug, Default)]
struct Latch {
    trigger: bool,
    close: bool,
    quit: bool,
}

// ── Keyboard ──

#[derive(Default)]
pub struct KeyboardSource {
    steering: Steering,
    latch: Latch,
}

impl KeyboardSource {
    pub fn new() -> Self {
        KeyboardSource::default()
    }
}

impl InputSource for KeyboardSource {
    fn device(&self) -> InputDevice {
        InputDevice::Keyboard
    }

    fn pump(&mut self, keys: &InputState) {
        self.steering = Steering::Keys(keys.directional_keys());
        self.latch.trigger |= keys.any_pressed(input::TRIGGER);
        self.latch.close |= keys.any_pressed(input::CLOSE);
        self.latch.quit |= keys.quit_pressed();
    }

    fn take_frame_input(&mut self) -> FrameInput {
        let latch = std::mem::take(&mut self.latch);
        self.latch.quit = latch.quit;
        FrameInput { steering: self.steering, trigger: latch.trigger, close: latch.close }
    }

    fn quit_requested(&self) -> bool {
        self.latch.quit
    }

    fn shows_prompt(&self) -> bool { true }

    fn overlay_blocks_steering(&self) -> bool { false }
}

// ── Gamepad ──

pub struct GamepadSource {
    pad: GamepadState,
    steering: Steering,
    latch: Latch,
}

impl GamepadSource {
    pub fn new(pad: GamepadState) -> Self {
        GamepadSource { pad, steering: Steering::Idle, latch: Latch::default() }
    }
}

impl InputSource for GamepadSource {
    fn device(&self) -> InputDevice {
        InputDevice::Gamepad
    }

    fn pump(&mut self, keys: &InputState) {
        self.pad.update();
        self.steering = Steering::Stick(self.pad.stick());
        self.latch.trigger |= self.pad.interact_pressed();
        self.latch.close |= self.pad.close_pressed();
        self.latch.quit |= self.pad.quit_pressed() || keys.quit_pressed();
    }

    fn take_frame_input(&mut self) -> FrameInput {
        let latch = std::mem::take(&mut self.latch);
        self.latch.quit = latch.quit;
        FrameInput { steering: self.steering, trigger: latch.trigger, close: latch.close }
    }

    fn quit_requested(&self) -> bool {
        self.latch.quit
    }

    fn shows_prompt(&self) -> bool { false }

    fn overlay_blocks_steering(&self) -> bool { true }
}

/// Pick the session's input source once, at startup.
pub fn select_source(cfg: &GameConfig) -> Box<dyn InputSource> {
    let resolved = match cfg.input.device {
        InputDevice::Keyboard => InputDevice::Keyboard,
        InputDevice::Gamepad => InputDevice::Gamepad,
        InputDevice::Auto => {
            // Probing opens the gamepad backend; keep it if we use it.
            let pad = GamepadState::new();
            if pad.connected {
                return gamepad_source(pad, cfg);
            }
            InputDevice::Keyboard
        }
    };

    match resolved {
        InputDevice::Gamepad => {
            let pad = GamepadState::new();
            if !pad.connected {
                tracing::warn!("gamepad input requested but none connected yet");
            }
            gamepad_source(pad, cfg)
        }
        _ => {
            tracing::info!(device = "keyboard", "input source selected");
            Box::new(KeyboardSource::new())
        }
    }
}

fn gamepad_source(mut pad: GamepadState, cfg: &GameConfig) -> Box<dyn InputSource> {
    pad.load_button_config(&cfg.gamepad);
    tracing::info!(device = "gamepad", connected = pad.connected, "input source selected");
    Box::new(GamepadSource::new(pad))
}
