//! Player lifecycle state.
//!
//! ```text
//! InitialConnect -> InLobby <-> InQueue
//!                   InLobby  -> InGame -> InLobby
//! any non-terminal -> Disconnected
//! ```

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PlayerState {
    /// Connected, handshake not yet completed.
    InitialConnect,
    /// Idle in the lobby.
    InLobby,
    /// In the lobby and waiting in the matchmaking queue.
    InQueue,
    /// Seated in (or spectating) a game room.
    InGame,
    /// Terminal. The session is removed right after this is broadcast.
    Disconnected,
}

impl PlayerState {
    /// `true` while the player is a member of the lobby room.
    pub fn is_in_lobby_room(self) -> bool {
        matches!(self, PlayerState::InLobby | PlayerState::InQueue)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: PlayerState) -> bool {
        use PlayerState::*;

        match (self, next) {
            (Disconnected, _) => false,
            (_, Disconnected) => true,
            (InitialConnect, InLobby) => true,
            (InLobby, InQueue) | (InQueue, InLobby) => true,
            (InLobby, InGame) | (InQueue, InGame) => true,
            (InGame, InLobby) => true,
            _ => false,
        }
    }
}
