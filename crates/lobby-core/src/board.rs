//! Turn-game capability used by game rooms, plus the bundled
//! four-in-a-row engine.
//!
//! Rooms only ever talk to [`GameEngine`]; legality and win detection are
//! entirely the engine's business.

use crate::disc::Disc;
use crate::error::GameError;

/// Board state and rules for one room.
pub trait GameEngine: Send {
    /// Whether `disc` may drop into `column` right now.
    fn is_move_valid(&self, column: u8, disc: Disc) -> bool;

    /// Apply a move. Fails without mutating state if the move is invalid.
    fn apply_move(&mut self, column: u8, disc: Disc) -> Result<(), GameError>;

    /// Whose turn it is.
    fn current_turn(&self) -> Disc;

    /// Whether the game has reached a terminal position.
    fn is_over(&self) -> bool;

    /// The winning colour, or `None` for a draw / unfinished game.
    fn winner(&self) -> Option<Disc>;
}

/// Builds a fresh engine for every new room.
pub type EngineFactory = Box<dyn Fn() -> Box<dyn GameEngine> + Send>;

pub const COLUMNS: usize = 7;
pub const ROWS: usize = 6;
const CONNECT: usize = 4;

/// Classic 7x6 gravity board; four in a row wins.
///
/// Row 0 is the top row, discs fall towards `ROWS - 1`.
#[derive(Debug, Clone)]
pub struct FourInARow {
    grid: [[Option<Disc>; COLUMNS]; ROWS],
    turn: Disc,
    moves: usize,
    winner: Option<Disc>,
}

impl Default for FourInARow {
    fn default() -> Self {
        FourInARow::new()
    }
}

impl FourInARow {
    pub fn new() -> Self {
        FourInARow {
            grid: [[None; COLUMNS]; ROWS],
            turn: Disc::STARTING,
            moves: 0,
            winner: None,
        }
    }

    pub fn slot(&self, column: usize, row: usize) -> Option<Disc> {
        self.grid.get(row).and_then(|r| r.get(column)).copied().flatten()
    }

    /// Lowest free row in `column`, if any.
    fn next_free_row(&self, column: usize) -> Option<usize> {
        (0..ROWS).rev().find(|&row| self.grid[row][column].is_none())
    }

    fn is_full(&self) -> bool {
        self.moves == COLUMNS * ROWS
    }

    /// Does the disc just placed at `(column, row)` complete a line?
    fn completes_line(&self, column: usize, row: usize, disc: Disc) -> bool {
        const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

        DIRECTIONS.iter().any(|&(dc, dr)| {
            let count = 1
                + self.run_length(column, row, dc, dr, disc)
                + self.run_length(column, row, -dc, -dr, disc);
            count >= CONNECT
        })
    }

    fn run_length(&self, column: usize, row: usize, dc: isize, dr: isize, disc: Disc) -> usize {
        let mut count = 0;
        let mut c = column as isize + dc;
        let mut r = row as isize + dr;

        while c >= 0 && r >= 0 && (c as usize) < COLUMNS && (r as usize) < ROWS {
            if self.grid[r as usize][c as usize] != Some(disc) {
                break;
            }
            count += 1;
            c += dc;
            r += dr;
        }

        count
    }

    fn check_move(&self, column: u8, disc: Disc) -> Result<usize, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        if column as usize >= COLUMNS {
            return Err(GameError::ColumnOutOfRange(column));
        }
        if disc != self.turn {
            return Err(GameError::WrongTurn(disc));
        }
        self.next_free_row(column as usize)
            .ok_or(GameError::ColumnFull(column))
    }
}

impl GameEngine for FourInARow {
    fn is_move_valid(&self, column: u8, disc: Disc) -> bool {
        self.check_move(column, disc).is_ok()
    }

    fn apply_move(&mut self, column: u8, disc: Disc) -> Result<(), GameError> {
        let row = self.check_move(column, disc)?;
        let column = column as usize;

        self.grid[row][column] = Some(disc);
        self.moves += 1;

        if self.completes_line(column, row, disc) {
            self.winner = Some(disc);
        }
        self.turn = disc.opponent();

        Ok(())
    }

    fn current_turn(&self) -> Disc {
        self.turn
    }

    fn is_over(&self) -> bool {
        self.winner.is_some() || self.is_full()
    }

    fn winner(&self) -> Option<Disc> {
        self.winner
    }
}
