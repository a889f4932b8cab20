/// Interaction state machine.
///
///   Idle ──poi in range──▶ InRange ──trigger──▶ Open ──close──▶ Idle
///     ▲                       │
///     └────poi out of range───┘
///
/// Proximity is applied before actions within a tick, so a trigger in
/// the same tick the player steps into range opens immediately.
/// Open ignores proximity unless `close_on_leave` is set.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InteractionState {
    Idle,
    InRange { poi: usize },
    Open { poi: usize },
}

/// What changed this tick. The session turns these into events.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    EnteredRange { poi: usize },
    /// Still in range, but a different POI is now current.
    Retargeted { poi: usize },
    LeftRange,
    Opened { poi: usize },
    Closed,
}

#[derive(Clone, Debug)]
pub struct InteractionController {
    state: InteractionState,
    close_on_leave: bool,
}

impl InteractionController {
    pub fn new(close_on_leave: bool) -> Self {
        InteractionController { state: InteractionState::Idle, close_on_leave }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, InteractionState::Open { .. })
    }

    /// POI shown in the overlay, if open.
    pub fn open_poi(&self) -> Option<usize> {
        match self.state {
            InteractionState::Open { poi } => Some(poi),
            _ => None,
        }
    }

    /// POI the prompt refers to, if in range and not open.
    pub fn prompt_poi(&self) -> Option<usize> {
        match self.state {
            InteractionState::InRange { poi } => Some(poi),
            _ => None,
        }
    }

    /// Advance one tick with this tick's current POI and edge-triggered actions.
    pub fn update(&mut self, current: Option<usize>, trigger: bool, close: bool) -> Vec<Transition> {
        let mut out = Vec::new();

        match (self.state, current) {
            (InteractionState::Idle, Some(poi)) => {
                self.state = InteractionState::InRange { poi };
                out.push(Transition::EnteredRange { poi });
            }
            (InteractionState::InRange { poi: old }, Some(poi)) if old != poi => {
                self.state = InteractionState::InRange { poi };
                out.push(Transition::Retargeted { poi });
            }
            (InteractionState::InRange { .. }, None) => {
                self.state = InteractionState::Idle;
                out.push(Transition::LeftRange);
            }
            (InteractionState::Open { .. }, None) if self.close_on_leave => {
                self.state = InteractionState::Idle;
                out.push(Transition::Closed);
                return out;
            }
            _ => {}
        }

        match self.state {
            InteractionState::InRange { poi } if trigger => {
                self.state = InteractionState::Open { poi };
                out.push(Transition::Opened { poi });
            }
            InteractionState::Open { .. } if close => {
                self.state = InteractionState::Idle;
                out.push(Transition::Closed);
            }
            _ => {}
        }

        out
    }
}

/// Rising-edge detector for sampled button state.
///
/// Fires on the not-pressed → pressed transition only, so a control
/// held across many ticks yields one action.
#[derive(Clone, Copy, Debug, Default)]
pub struct Edge {
    was_down: bool,
}

impl Edge {
    pub fn update(&mut self, down: bool) -> bool {
        let fired = down && !self.was_down;
        self.was_down = down;
        fired
    }
}
