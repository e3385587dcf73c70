//! Disc colour (Red / Yellow) for game seats and board slots.

/// Seat colour in a game room, also used to mark occupied board slots.
///
/// Red always moves first; seat assignment is fixed for the lifetime
/// of a room.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Disc {
    Red,
    Yellow,
}

impl Disc {
    /// The colour that makes the opening move of every game.
    pub const STARTING: Disc = Disc::Red;

    /// The other seat.
    pub fn opponent(self) -> Self {
        match self {
            Disc::Red => Disc::Yellow,
            Disc::Yellow => Disc::Red,
        }
    }

    /// Index into a two-element seat array (`Red = 0`, `Yellow = 1`).
    pub fn seat_index(self) -> usize {
        match self {
            Disc::Red => 0,
            Disc::Yellow => 1,
        }
    }
}
