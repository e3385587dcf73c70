use std::collections::HashMap;

use lobby_core::{
    ConnectionId, Disc, GameEngine, GameError, Hub, HubSettings, OutboundRx, PlayerState,
};
use lobby_protocol::{format_message, parse_line};
use tokio::sync::mpsc;

/// Drives a hub the way the server does and records every line sent back.
struct Harness {
    hub: Hub,
    next_id: u64,
    outboxes: HashMap<ConnectionId, OutboundRx>,
}

impl Harness {
    fn new() -> Self {
        Harness::with_hub(Hub::new(HubSettings::default()))
    }

    fn with_hub(hub: Hub) -> Self {
        Harness {
            hub,
            next_id: 1,
            outboxes: HashMap::new(),
        }
    }

    fn connect(&mut self) -> ConnectionId {
        let conn = ConnectionId(self.next_id);
        self.next_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        self.hub.connect(conn, tx).unwrap();
        self.outboxes.insert(conn, rx);
        conn
    }

    fn send(&mut self, conn: ConnectionId, line: &str) {
        if let Some(parsed) = parse_line(line) {
            self.hub.handle_line(conn, parsed).unwrap();
        }
    }

    fn lines(&mut self, conn: ConnectionId) -> Vec<String> {
        let rx = self.outboxes.get_mut(&conn).unwrap();
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(format_message(&msg));
        }
        out
    }

    /// Connect and join; the handshake replies are discarded.
    fn join(&mut self, name: &str, extensions: &str) -> ConnectionId {
        let conn = self.connect();
        self.send(conn, &format!("join {} 19 {}", name, extensions));
        assert_eq!(self.hub.player_state(name), Some(PlayerState::InLobby));
        self.lines(conn);
        conn
    }

    fn disconnect(&mut self, conn: ConnectionId) {
        self.hub.disconnect(conn).unwrap();
        self.outboxes.remove(&conn);
    }

    /// Two queued players; `first` waited longest and starts.
    fn start_game(&mut self, first: &str, second: &str) -> (ConnectionId, ConnectionId) {
        let a = self.join(first, "");
        let b = self.join(second, "");
        self.send(a, "ready_for_game");
        self.send(b, "ready_for_game");
        self.lines(a);
        self.lines(b);
        (a, b)
    }
}

#[test]
fn join_queue_and_start() {
    let mut h = Harness::new();

    let alice = h.connect();
    h.send(alice, "join alice 19 Chat");
    assert_eq!(h.lines(alice), vec!["accept 19 Lobby Chat Challenge"]);
    assert_eq!(h.hub.player_state("alice"), Some(PlayerState::InLobby));

    h.send(alice, "ready_for_game");
    assert!(h.lines(alice).is_empty());
    assert_eq!(h.hub.player_state("alice"), Some(PlayerState::InQueue));
    assert_eq!(h.hub.queue_len(), 1);

    let bob = h.join("bob", "Chat");
    h.send(bob, "ready_for_game");

    let expected = vec!["start_game alice bob", "request_move alice"];
    assert_eq!(h.lines(alice), expected);
    assert_eq!(h.lines(bob), expected);

    assert_eq!(h.hub.player_state("alice"), Some(PlayerState::InGame));
    assert_eq!(h.hub.player_state("bob"), Some(PlayerState::InGame));
    assert_eq!(h.hub.player_seat("alice"), Some(Disc::Red));
    assert_eq!(h.hub.player_seat("bob"), Some(Disc::Yellow));
    assert_eq!(h.hub.queue_len(), 0);
    assert_eq!(h.hub.lobby_len(), 0);
    let ids: Vec<String> = h.hub.room_ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(ids, vec!["alice-bob"]);
}

#[test]
fn duplicate_name_leaves_second_connection_unidentified() {
    let mut h = Harness::new();
    h.join("alice", "");

    let other = h.connect();
    h.send(other, "join alice 19");
    assert_eq!(h.lines(other), vec!["error 004 Name has already been taken"]);

    h.send(other, "ready_for_game");
    assert_eq!(h.lines(other), vec!["error 007 Unknown command"]);

    h.send(other, "join alice2 19");
    assert_eq!(h.lines(other), vec!["accept 19 Lobby Chat Challenge"]);
    assert_eq!(h.hub.player_count(), 2);
}

#[test]
fn name_is_free_again_after_disconnect() {
    let mut h = Harness::new();
    let alice = h.join("alice", "");
    h.disconnect(alice);

    assert_eq!(h.hub.player_state("alice"), None);
    h.join("alice", "");
}

#[test]
fn handshake_validation_errors() {
    let mut h = Harness::new();
    let conn = h.connect();

    h.send(conn, "join");
    h.send(conn, "join b@d 19");
    h.send(conn, "join bob 1");
    h.send(conn, "join bob 19 9lives");
    assert_eq!(
        h.lines(conn),
        vec![
            "error 009 Expected at least 2 parameter(s)",
            "error 004 player-name",
            "error 008 group-number",
            "error 008 extension-list",
        ]
    );
    assert_eq!(h.hub.player_count(), 0);
    assert_eq!(h.hub.connection_count(), 1);
}

#[test]
fn unknown_and_misplaced_commands() {
    let mut h = Harness::new();
    let alice = h.join("alice", "");

    h.send(alice, "fly away");
    h.send(alice, "join alice 19");
    h.send(alice, "do_move 3");
    h.send(alice, "do_move 9");
    h.send(alice, "chat_global hi");
    h.send(alice, "challenge bob");
    assert_eq!(
        h.lines(alice),
        vec![
            "error 007 Unknown command",
            "error 007 Unknown command",
            "error 007 You must be in the game state",
            "error 007 You must be in the game state",
            "error 007 Chat extension not specified during handshake",
            "error 007 Challenge extension not specified during handshake",
        ]
    );
}

#[test]
fn error_reports_before_join_are_unknown_commands() {
    let mut h = Harness::new();
    let conn = h.connect();
    h.send(conn, "error 002 boom");
    h.send(conn, "error x");
    assert_eq!(
        h.lines(conn),
        vec!["error 007 Unknown command", "error 007 Unknown command"]
    );
    assert_eq!(h.hub.player_count(), 0);
}

#[test]
fn client_error_reports_are_never_answered() {
    let mut h = Harness::new();
    let alice = h.join("alice", "");
    h.send(alice, "error 007 what");
    h.send(alice, "error");
    assert!(h.lines(alice).is_empty());
}

#[test]
fn out_of_range_column_changes_nothing() {
    let mut h = Harness::new();
    let (alice, bob) = h.start_game("alice", "bob");

    h.send(alice, "do_move 9");
    assert_eq!(h.lines(alice), vec!["error 008 column"]);
    assert!(h.lines(bob).is_empty());

    h.send(alice, "do_move 3");
    let expected = vec!["done_move alice 3", "request_move bob"];
    assert_eq!(h.lines(alice), expected);
    assert_eq!(h.lines(bob), expected);
}

#[test]
fn turns_alternate_until_a_win() {
    let mut h = Harness::new();
    let (alice, bob) = h.start_game("alice", "bob");

    h.send(bob, "do_move 0");
    assert_eq!(h.lines(bob), vec!["error 007 Not your move"]);
    assert!(h.lines(alice).is_empty());

    for (conn, col) in [(alice, 0), (bob, 1), (alice, 0), (bob, 1), (alice, 0), (bob, 1)] {
        h.send(conn, &format!("do_move {}", col));
    }
    h.send(alice, "do_move 0");

    let lines = h.lines(bob);
    let movers: Vec<&str> = lines
        .iter()
        .filter_map(|l| l.strip_prefix("done_move "))
        .map(|rest| rest.split(' ').next().unwrap())
        .collect();
    assert_eq!(
        movers,
        vec!["alice", "bob", "alice", "bob", "alice", "bob", "alice"]
    );
    assert_eq!(lines.last().unwrap(), "game_end alice");

    assert_eq!(h.hub.room_count(), 0);
    assert_eq!(h.hub.player_state("alice"), Some(PlayerState::InLobby));
    assert_eq!(h.hub.player_state("bob"), Some(PlayerState::InLobby));
    assert_eq!(h.hub.lobby_len(), 2);
}

#[test]
fn column_full_is_an_invalid_move() {
    let mut h = Harness::new();
    let (alice, bob) = h.start_game("alice", "bob");

    for i in 0..6 {
        let conn = if i % 2 == 0 { alice } else { bob };
        h.send(conn, "do_move 5");
    }
    h.lines(bob);
    h.send(alice, "do_move 5");

    assert_eq!(h.lines(alice).last().unwrap(), "error 002 Move is invalid");
    assert!(h.lines(bob).is_empty());
}

#[test]
fn opponent_disconnect_is_a_win() {
    let mut h = Harness::new();
    let (alice, bob) = h.start_game("alice", "bob");

    h.disconnect(bob);

    let lines = h.lines(alice);
    assert_eq!(lines, vec!["error 003 bob", "game_end alice"]);
    assert_eq!(lines.iter().filter(|l| l.starts_with("game_end")).count(), 1);
    assert_eq!(h.hub.room_count(), 0);
    assert_eq!(h.hub.player_state("alice"), Some(PlayerState::InLobby));
    assert_eq!(h.hub.player_seat("alice"), None);
    assert_eq!(h.hub.player_state("bob"), None);
}

#[test]
fn queue_head_is_paired_first() {
    let mut h = Harness::new();
    let p1 = h.join("p1", "");
    let p2 = h.join("p2", "");
    let p3 = h.join("p3", "");
    let p4 = h.join("p4", "");

    h.send(p1, "ready_for_game");
    h.send(p2, "ready_for_game");
    assert_eq!(h.lines(p2)[0], "start_game p1 p2");

    h.send(p3, "ready_for_game");
    assert_eq!(h.hub.queue_len(), 1);
    h.send(p4, "ready_for_game");
    assert_eq!(h.lines(p4)[0], "start_game p3 p4");
    assert_eq!(h.hub.room_count(), 2);
}

#[test]
fn queued_player_can_leave_by_disconnecting() {
    let mut h = Harness::new();
    let p1 = h.join("p1", "");
    let p2 = h.join("p2", "");

    h.send(p1, "ready_for_game");
    h.disconnect(p1);
    assert_eq!(h.hub.queue_len(), 0);

    h.send(p2, "ready_for_game");
    assert!(h.lines(p2).is_empty());
    assert_eq!(h.hub.queue_len(), 1);
}

#[test]
fn ready_twice_is_rejected() {
    let mut h = Harness::new();
    let p1 = h.join("p1", "");

    h.send(p1, "ready_for_game");
    h.send(p1, "ready_for_game");
    assert_eq!(h.lines(p1), vec!["error 007 You must be in the lobby state"]);
    assert_eq!(h.hub.queue_len(), 1);
}

#[test]
fn challenge_is_idempotent_and_accept_starts_a_game() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Challenge");
    let bob = h.join("bob", "Challenge");

    h.send(alice, "challenge bob");
    h.send(alice, "challenge bob");
    assert_eq!(h.lines(bob), vec!["challenge alice"]);
    assert!(h.lines(alice).is_empty());
    assert_eq!(h.hub.pending_challenge_count(), 1);

    h.send(bob, "challenge_response alice yes");
    let expected = vec!["start_game alice bob", "request_move alice"];
    assert_eq!(h.lines(alice), expected);
    assert_eq!(h.lines(bob), expected);
    assert_eq!(h.hub.pending_challenge_count(), 0);
}

#[test]
fn challenge_refusals() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Challenge");
    h.join("carol", "");

    h.send(alice, "challenge nobody");
    h.send(alice, "challenge carol");
    h.send(alice, "challenge alice");
    assert_eq!(
        h.lines(alice),
        vec![
            "error 005 Opponent does not exist",
            "error 005 Opponent does not support challenging",
            "error 005 You cannot challenge yourself",
        ]
    );
    assert_eq!(h.hub.pending_challenge_count(), 0);
}

#[test]
fn challenge_target_must_be_idle_in_lobby() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Challenge");
    let bob = h.join("bob", "Challenge");

    h.send(bob, "ready_for_game");
    h.send(alice, "challenge bob");
    assert_eq!(
        h.lines(alice),
        vec!["error 005 Opponent must be in the lobby state"]
    );
}

#[test]
fn declined_challenge_is_consumed_silently() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Challenge");
    let bob = h.join("bob", "Challenge");

    h.send(alice, "challenge bob");
    h.lines(bob);
    h.send(bob, "challenge_response alice no");

    assert!(h.lines(alice).is_empty());
    assert!(h.lines(bob).is_empty());
    assert_eq!(h.hub.pending_challenge_count(), 0);

    h.send(bob, "challenge_response alice yes");
    assert_eq!(
        h.lines(bob),
        vec!["error 008 The challenger has not challenged you"]
    );
}

#[test]
fn leaving_the_lobby_cancels_challenges() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Challenge");
    let bob = h.join("bob", "Challenge");

    h.send(alice, "challenge bob");
    h.send(alice, "ready_for_game");
    assert_eq!(h.hub.pending_challenge_count(), 0);

    h.lines(bob);
    h.send(bob, "challenge_response alice yes");
    assert_eq!(
        h.lines(bob),
        vec!["error 008 The challenger has not challenged you"]
    );
    assert_eq!(h.hub.room_count(), 0);
}

#[test]
fn challenger_disconnect_cancels_challenges() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Challenge");
    let bob = h.join("bob", "Challenge");

    h.send(alice, "challenge bob");
    h.disconnect(alice);
    assert_eq!(h.hub.pending_challenge_count(), 0);

    h.lines(bob);
    h.send(bob, "challenge_response alice yes");
    assert_eq!(h.lines(bob), vec!["error 008 Unknown challenger name"]);
}

#[test]
fn chat_fan_out() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Chat");
    let bob = h.join("bob", "Chat");
    let carol = h.join("carol", "");

    h.send(alice, "chat_global hi all");
    assert!(h.lines(alice).is_empty());
    assert_eq!(h.lines(bob), vec!["message alice [global]hi all"]);
    assert!(h.lines(carol).is_empty());

    h.send(bob, "chat_local psst");
    assert_eq!(h.lines(alice), vec!["message bob [local]psst"]);

    h.send(bob, "chat_local no way!");
    assert_eq!(
        h.lines(bob),
        vec!["error 006 Message contains invalid characters"]
    );

    h.send(carol, "chat_global hello");
    assert_eq!(
        h.lines(carol),
        vec!["error 007 Chat extension not specified during handshake"]
    );
}

#[test]
fn local_chat_stays_in_the_room() {
    let mut h = Harness::new();
    let watcher = h.join("watcher", "Chat");
    let a = h.join("a", "Chat");
    let b = h.join("b", "Chat");
    h.send(a, "ready_for_game");
    h.send(b, "ready_for_game");
    h.lines(a);
    h.lines(b);

    h.send(a, "chat_local gg");
    assert_eq!(h.lines(b), vec!["message a [local]gg"]);
    assert!(h.lines(watcher).is_empty());
}

#[test]
fn lobby_presence_is_delta_suppressed() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Lobby");

    let bob = h.connect();
    h.send(bob, "join bob 19 Lobby");
    assert_eq!(
        h.lines(bob),
        vec!["accept 19 Lobby Chat Challenge", "state_change alice lobby"]
    );
    assert_eq!(h.lines(alice), vec!["state_change bob lobby"]);

    h.send(bob, "ready_for_game");
    h.send(bob, "ready_for_game");
    assert_eq!(h.lines(alice), vec!["state_change bob lobby_ready"]);

    h.disconnect(bob);
    assert_eq!(h.lines(alice), vec!["state_change bob offline"]);
}

#[test]
fn lobby_sees_game_start_before_players_leave() {
    let mut h = Harness::new();
    let carol = h.join("carol", "Lobby");
    h.start_game("alice", "bob");

    let lines = h.lines(carol);
    assert_eq!(
        lines,
        vec![
            "state_change alice lobby",
            "state_change bob lobby",
            "state_change alice lobby_ready",
            "state_change bob lobby_ready",
            "state_change alice game",
            "state_change bob game",
        ]
    );
}

#[test]
fn returning_player_learns_who_left_meanwhile() {
    let mut h = Harness::new();
    let alice = h.join("alice", "Lobby");
    let bob = h.join("bob", "Lobby");
    let carol = h.join("carol", "Lobby");

    h.send(alice, "ready_for_game");
    h.send(bob, "ready_for_game");
    h.lines(alice);

    // carol leaves while alice is busy playing.
    h.disconnect(carol);
    assert!(h.lines(alice).is_empty());

    h.disconnect(bob);
    assert_eq!(
        h.lines(alice),
        vec![
            "error 003 bob",
            "game_end alice",
            "state_change carol offline",
            "state_change bob offline",
        ]
    );
}

/// Ends in a draw after a single move by each seat.
struct TwoMoveDraw {
    moves: u8,
    turn: Disc,
}

impl GameEngine for TwoMoveDraw {
    fn is_move_valid(&self, _column: u8, disc: Disc) -> bool {
        self.moves < 2 && disc == self.turn
    }

    fn apply_move(&mut self, column: u8, disc: Disc) -> Result<(), GameError> {
        if !self.is_move_valid(column, disc) {
            return Err(GameError::WrongTurn(disc));
        }
        self.moves += 1;
        self.turn = disc.opponent();
        Ok(())
    }

    fn current_turn(&self) -> Disc {
        self.turn
    }

    fn is_over(&self) -> bool {
        self.moves >= 2
    }

    fn winner(&self) -> Option<Disc> {
        None
    }
}

#[test]
fn draw_has_no_winner() {
    let hub = Hub::with_engine_factory(
        HubSettings::default(),
        Box::new(|| {
            Box::new(TwoMoveDraw {
                moves: 0,
                turn: Disc::STARTING,
            }) as Box<dyn GameEngine>
        }),
    );
    let mut h = Harness::with_hub(hub);
    let (alice, bob) = h.start_game("alice", "bob");

    h.send(alice, "do_move 1");
    h.send(bob, "do_move 2");

    assert_eq!(
        h.lines(alice),
        vec![
            "done_move alice 1",
            "request_move bob",
            "done_move bob 2",
            "game_end",
        ]
    );
    assert_eq!(h.hub.room_count(), 0);
}

#[test]
fn spectators_follow_the_game_and_return_to_the_lobby() {
    let mut h = Harness::new();
    let (alice, bob) = h.start_game("alice", "bob");
    let carol = h.join("carol", "");

    let id = h.hub.room_ids().pop().unwrap();
    h.hub.add_spectator(&id, carol).unwrap();
    assert_eq!(h.hub.player_state("carol"), Some(PlayerState::InGame));

    h.send(carol, "do_move 0");
    assert_eq!(h.lines(carol), vec!["error 007 Not your move"]);

    h.disconnect(alice);
    assert_eq!(h.lines(bob), vec!["error 003 alice", "game_end bob"]);
    assert_eq!(h.lines(carol), vec!["game_end bob"]);
    assert_eq!(h.hub.player_state("carol"), Some(PlayerState::InLobby));
}
