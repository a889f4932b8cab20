/// Keyboard state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a direction key is held
///   - Edge-triggered interact/close (only fire on initial press)
///   - Run modifier held together with a direction
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// Shift never arrives as a key of its own without enhancement, so a
/// shifted press (`W`, `Shift+←`) refreshes a synthetic run key instead.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode, poll};

use crate::domain::entity::DirectionalKeys;

/// Once a key is auto-repeating, this long without a Press/Repeat event
/// counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Before the first auto-repeat arrives. OS repeat delays run up to ~660 ms;
/// a held key must survive that gap, and its first repeat is not a new press.
const FIRST_PRESS_GRACE: Duration = Duration::from_millis(700);

/// Stands in for "shift is held".
const SHIFT: KeyCode = KeyCode::Modifier(ModifierKeyCode::LeftShift);

// ── Bindings ──

pub const LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a')];
pub const RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d')];
pub const UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w')];
pub const DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s')];
pub const RUN: &[KeyCode] = &[KeyCode::Char(' '), SHIFT];
pub const TRIGGER: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Enter];
pub const CLOSE: &[KeyCode] = &[KeyCode::Esc];
pub const QUIT: &[KeyCode] = &[KeyCode::Char('q')];

/// One held key: when it was last seen and whether it has repeated yet.
#[derive(Clone, Copy, Debug)]
struct Hold {
    last: Instant,
    repeated: bool,
}

impl Hold {
    fn timeout(&self) -> Duration {
        if self.repeated { HOLD_TIMEOUT } else { FIRST_PRESS_GRACE }
    }

    fn alive_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) < self.timeout()
    }
}

pub struct InputState {
    /// Last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Hold>,

    /// Keys that went from "not held" to "held" during the most recent
    /// drain. Used for edge-triggered actions.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before sampling an input source.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.apply(key, Instant::now()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("terminal event read failed: {e}");
                    break;
                }
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, h| h.alive_at(now));
    }

    /// Fold one key event into the held set.
    pub fn apply(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);
        let (code, shifted) = normalize(key);

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&code);
                if shifted {
                    self.last_active.remove(&SHIFT);
                }
            }
            KeyEventKind::Release => {
                // Not trusted without enhancement; timeout expiry handles it
            }
            _ => {
                if !self.touch(code, at) {
                    self.fresh_presses.push(code);
                }
                if shifted {
                    self.touch(SHIFT, at);
                }
            }
        }
    }

    /// Refresh a key's hold. Returns whether it was already held; a press
    /// on a held key is its auto-repeat and shortens the timeout from then on.
    fn touch(&mut self, code: KeyCode, at: Instant) -> bool {
        let was_held = self.is_held_at(code, at);
        self.last_active.insert(code, Hold { last: at, repeated: was_held });
        was_held
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Four directions plus run, as held right now.
    pub fn directional_keys(&self) -> DirectionalKeys {
        self.keys_at(Instant::now())
    }

    fn keys_at(&self, now: Instant) -> DirectionalKeys {
        let held = |codes: &[KeyCode]| codes.iter().any(|c| self.is_held_at(*c, now));
        DirectionalKeys {
            left: held(LEFT),
            right: held(RIGHT),
            up: held(UP),
            down: held(DOWN),
            run: held(RUN),
        }
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    pub fn quit_pressed(&self) -> bool {
        self.ctrl_c_pressed() || self.any_pressed(QUIT)
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map(|h| h.alive_at(now))
            .unwrap_or(false)
    }
}

/// Lowercase letters so `W` and `w` are one key; report whether shift was involved.
fn normalize(key: KeyEvent) -> (KeyCode, bool) {
    let shift_mod = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char(c) if c.is_ascii_uppercase() => (KeyCode::Char(c.to_ascii_lowercase()), true),
        KeyCode::Modifier(ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift) => (SHIFT, false),
        code => (code, shift_mod),
    }
}
