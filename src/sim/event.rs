/// Events emitted during a simulation step.
/// The presentation layer consumes these for status messages and sound.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    /// A POI became current (from nothing, or replacing another).
    EnteredRange { poi: usize },
    LeftRange,
    OverlayOpened { poi: usize },
    OverlayClosed,
    DustStarted,
    DustStopped,
}
