//! Per-connection protocol state machine.
//!
//! An unidentified connection may only `join`; an identified one gets the
//! full command set, gated on negotiated extensions and lifecycle state.
//! Gates run before argument errors are reported, so a client in the wrong
//! state is told about the state rather than its arguments.
//!
//! `error` reports from identified clients are logged and never answered.

use tracing::{debug, info, warn};

use crate::challenger::{ChallengeOutcome, ChallengeTarget, Resolution};
use crate::error::{CommandError, HubError};
use crate::extension::{Extension, ExtensionSet};
use crate::game_room::MoveOutcome;
use crate::hub::Hub;
use crate::messages::{
    ChatScope, ClientCommand, CommandKind, ErrorCode, LineRejection, ParsedLine, ServerMessage,
};
use crate::matchmaker::MatchOutcome;
use crate::player::{ConnectionId, Player, RoomRef, Session};
use crate::player_state::PlayerState;
use crate::registry::Handshake;

/// Extension and state requirements of `kind` for an identified player.
fn gate(player: &Player, kind: CommandKind) -> Result<(), CommandError> {
    let require_state = |state: PlayerState, wire: &'static str| {
        if player.state() == state {
            Ok(())
        } else {
            Err(CommandError::WrongState(wire))
        }
    };
    let require_ext = |ext: Extension| {
        if player.supports(ext) {
            Ok(())
        } else {
            Err(CommandError::ExtensionRequired(ext))
        }
    };

    match kind {
        CommandKind::Join => Err(CommandError::UnknownCommand),
        CommandKind::ReadyForGame => require_state(PlayerState::InLobby, "lobby"),
        CommandKind::DoMove => require_state(PlayerState::InGame, "game"),
        CommandKind::ChatLocal | CommandKind::ChatGlobal => require_ext(Extension::Chat),
        CommandKind::Challenge | CommandKind::ChallengeResponse => {
            require_ext(Extension::Challenge)?;
            require_state(PlayerState::InLobby, "lobby")
        }
        CommandKind::Error => Ok(()),
    }
}

impl Hub {
    /// Handle one decoded line from `conn`.
    ///
    /// Protocol errors are answered on the connection and return `Ok`; an
    /// `Err` means the transport and hub disagree about which connections
    /// exist.
    pub fn handle_line(&mut self, conn: ConnectionId, line: ParsedLine) -> Result<(), HubError> {
        let kind = match &line {
            Ok(cmd) => Some(cmd.kind()),
            Err(rejection) => rejection.kind,
        };

        let gated = match self.registry.session(conn) {
            None => return Err(HubError::UnknownConnection(conn)),
            Some(Session::Unidentified(_)) => None,
            Some(Session::Identified(player)) => {
                Some(kind.map_or(Ok(()), |kind| gate(player, kind)))
            }
        };

        let Some(gated) = gated else {
            return self.handle_unidentified(conn, line);
        };
        if let Err(err) = gated {
            return self.reply(conn, &err);
        }

        match line {
            Ok(cmd) => self.dispatch(conn, cmd),
            Err(LineRejection {
                kind: Some(CommandKind::Error),
                error,
            }) => {
                warn!("malformed error report from {}: {}", conn, error);
                Ok(())
            }
            Err(rejection) => self.reply(conn, &rejection.error),
        }
    }

    fn handle_unidentified(&mut self, conn: ConnectionId, line: ParsedLine) -> Result<(), HubError> {
        match line {
            Ok(ClientCommand::Join {
                name,
                group,
                extensions,
            }) => self.on_join(conn, &name, &group, &extensions),
            Err(LineRejection {
                kind: Some(CommandKind::Join),
                error,
            }) => self.reply(conn, &error),
            // Before the handshake even error reports are unknown commands.
            _ => self.reply(conn, &CommandError::UnknownCommand),
        }
    }

    fn dispatch(&mut self, conn: ConnectionId, cmd: ClientCommand) -> Result<(), HubError> {
        match cmd {
            ClientCommand::Join { .. } => self.reply(conn, &CommandError::UnknownCommand),
            ClientCommand::ReadyForGame => self.on_ready(conn),
            ClientCommand::DoMove { column } => self.on_do_move(conn, column),
            ClientCommand::ChatLocal { text } => self.on_chat(conn, ChatScope::Local, &text),
            ClientCommand::ChatGlobal { text } => self.on_chat(conn, ChatScope::Global, &text),
            ClientCommand::Challenge { name } => self.on_challenge(conn, &name),
            ClientCommand::ChallengeResponse { name, accept } => {
                self.on_challenge_response(conn, &name, accept)
            }
            ClientCommand::Error { code, message } => {
                self.on_client_error(conn, &code, &message);
                Ok(())
            }
        }
    }

    fn reply(&self, conn: ConnectionId, err: &CommandError) -> Result<(), HubError> {
        self.registry
            .session(conn)
            .ok_or(HubError::UnknownConnection(conn))?
            .send_error(err);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Command handlers
    // -------------------------------------------------------------------------

    fn on_join(
        &mut self,
        conn: ConnectionId,
        name: &str,
        group: &str,
        extensions: &[String],
    ) -> Result<(), HubError> {
        let negotiated = ExtensionSet::from_tokens(extensions.iter().map(String::as_str))
            .intersection(&self.settings.extensions);

        match self.registry.complete_handshake(conn, name, group, negotiated)? {
            Handshake::NameTaken => {
                debug!("{} tried to join as taken name {}", conn, name);
                return self.reply(conn, &CommandError::InvalidUsername("Name has already been taken"));
            }
            Handshake::Completed => {}
        }

        info!(
            "{} joined as {} (group {}, extensions {:?})",
            conn,
            name,
            group,
            negotiated.iter().map(Extension::name).collect::<Vec<_>>()
        );

        let accept = ServerMessage::Accept {
            group: self.settings.group.clone(),
            extensions: self
                .settings
                .extensions
                .iter()
                .map(|ext| ext.name().to_string())
                .collect(),
        };
        self.registry.player(conn)?.send(accept);

        self.move_to_lobby(conn)
    }

    fn on_ready(&mut self, conn: ConnectionId) -> Result<(), HubError> {
        self.set_state(conn, PlayerState::InQueue)?;

        match self.matchmaker.enqueue(conn) {
            MatchOutcome::Queued => Ok(()),
            MatchOutcome::Matched { opponent } => self.start_game(opponent, conn),
        }
    }

    fn on_do_move(&mut self, conn: ConnectionId, column: u8) -> Result<(), HubError> {
        let Some(RoomRef::Game(id)) = self.registry.player(conn)?.room().cloned() else {
            return self.reply(conn, &CommandError::WrongState("game"));
        };

        let outcome = self
            .rooms
            .get_mut(&id)
            .ok_or_else(|| HubError::UnknownRoom(id.to_string()))?
            .handle_move(conn, column);

        match outcome {
            MoveOutcome::Finished { .. } => self.end_game(&id, None),
            MoveOutcome::Rejected | MoveOutcome::Continued => Ok(()),
        }
    }

    fn on_chat(&mut self, conn: ConnectionId, scope: ChatScope, text: &str) -> Result<(), HubError> {
        let player = self.registry.player(conn)?;
        let sender = player.name().to_string();

        let recipients = match (scope, player.room()) {
            (ChatScope::Global, _) => self.registry.identified_except(conn),
            (ChatScope::Local, Some(RoomRef::Game(id))) => self
                .rooms
                .get(id)
                .ok_or_else(|| HubError::UnknownRoom(id.to_string()))?
                .member_conns()
                .into_iter()
                .filter(|member| *member != conn)
                .collect(),
            (ChatScope::Local, _) => self.rooms.lobby().others(conn),
        };

        debug!("{} chat ({:?}) to {} recipient(s)", sender, scope, recipients.len());
        for recipient in recipients {
            if let Some(player) = self.registry.get(recipient) {
                player.send_chat(&sender, scope, text);
            }
        }
        Ok(())
    }

    fn on_challenge(&mut self, conn: ConnectionId, target_name: &str) -> Result<(), HubError> {
        let from = self.registry.player(conn)?.name().to_string();

        let target = self
            .registry
            .get_by_name(target_name)
            .map(|player| ChallengeTarget {
                name: player.name(),
                state: player.state(),
                supports_challenge: player.supports(Extension::Challenge),
            });

        match self.challenger.challenge(&from, target) {
            Ok(ChallengeOutcome::Notify) => {
                info!("{} challenged {}", from, target_name);
                if let Some(target) = self.registry.get_by_name(target_name) {
                    target.send_challenge(&from);
                }
            }
            Ok(ChallengeOutcome::AlreadyPending) => {
                debug!("{} already challenged {}", from, target_name);
            }
            Err(reason) => {
                self.registry
                    .player(conn)?
                    .send(ServerMessage::error(ErrorCode::CannotChallenge, reason.to_string()));
            }
        }
        Ok(())
    }

    fn on_challenge_response(
        &mut self,
        conn: ConnectionId,
        from_name: &str,
        accept: bool,
    ) -> Result<(), HubError> {
        let challengee = self.registry.player(conn)?.name().to_string();
        let challenger = self
            .registry
            .get_by_name(from_name)
            .map(|player| (player.conn(), player.state()));

        let resolution = self.challenger.respond(
            &challengee,
            from_name,
            challenger.map(|(_, state)| state),
            accept,
        );

        match (resolution, challenger) {
            (Ok(Resolution::StartGame), Some((challenger_conn, _))) => {
                info!("{} accepted the challenge from {}", challengee, from_name);
                self.start_game(challenger_conn, conn)
            }
            (Ok(Resolution::StartGame), None) | (Ok(Resolution::Declined), _) => Ok(()),
            (Err(reason), _) => {
                debug!("challenge response from {} failed: {}", challengee, reason);
                self.registry
                    .player(conn)?
                    .send(ServerMessage::error(ErrorCode::InvalidParameter, reason.to_string()));
                Ok(())
            }
        }
    }

    fn on_client_error(&self, conn: ConnectionId, code: &str, message: &str) {
        let who = self
            .registry
            .get(conn)
            .map_or_else(|| conn.to_string(), |player| player.name().to_string());
        warn!("client {} reported error {}: {}", who, code, message);
    }
}
