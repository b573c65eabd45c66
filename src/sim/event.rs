/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and the HUD.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    TreasureCollected { remaining: usize },
    /// Last treasure taken this tick; the portal starts to rise.
    PortalOpened,
    Jumped,
    Landed,
    /// First tick of a drop through a hole or off the grid.
    FellIntoVoid,
    /// Portal entered. `next` is the level index now being played.
    LevelCleared { next: usize },
}
