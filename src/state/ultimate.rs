//! Ultimate Tic-Tac-Toe rules.
//!
//! The board is nine 3x3 sub-boards. The cell a player picks sends the
//! opponent to the sub-board at the same index, unless that sub-board is
//! already decided, in which case the opponent may play in any open board.
//! Winning three sub-boards in a line wins the game.

use tracing::{debug, instrument};

use super::engine::{Completion, GameResult, MoveRejection, Transition};
use super::lifecycle::LifecycleEvent;
use super::outcome::{evaluate, evaluate_squares, Mark, Outcome, Square};
use super::room::{GameKind, Room, RoomError, ULTIMATE_CAPACITY};

/// One of the nine inner grids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubBoard {
    squares: [Square; 9],
    result: Outcome,
}

impl SubBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    pub fn square(&self, cell: usize) -> Option<Square> {
        self.squares.get(cell).copied()
    }

    pub fn result(&self) -> Outcome {
        self.result
    }

    pub fn is_decided(&self) -> bool {
        self.result.is_decided()
    }

    /// Place a mark and re-score. A decided result is never recomputed.
    fn place(&mut self, cell: usize, mark: Mark) {
        self.squares[cell] = Square::Marked(mark);
        if !self.result.is_decided() {
            self.result = evaluate_squares(&self.squares);
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let squares: Vec<serde_json::Value> = self.squares.iter().map(Square::to_json).collect();
        serde_json::json!({
            "winner": self.result.to_json(),
            "squares": squares
        })
    }
}

/// The composite board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UltimateBoard {
    boards: [SubBoard; 9],
    next_mark: Mark,
    active_board: Option<usize>,
    result: Outcome,
}

impl Default for UltimateBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl UltimateBoard {
    /// Empty board, X to move anywhere.
    pub fn new() -> Self {
        Self {
            boards: Default::default(),
            next_mark: Mark::X,
            active_board: None,
            result: Outcome::Undecided,
        }
    }

    pub fn boards(&self) -> &[SubBoard; 9] {
        &self.boards
    }

    pub fn sub_board(&self, index: usize) -> Option<&SubBoard> {
        self.boards.get(index)
    }

    /// Mark that moves next.
    pub fn next_mark(&self) -> Mark {
        self.next_mark
    }

    /// Sub-board the next move must land in; `None` means any open board.
    pub fn active_board(&self) -> Option<usize> {
        self.active_board
    }

    pub fn result(&self) -> Outcome {
        self.result
    }

    /// Number of marks placed so far.
    pub fn move_count(&self) -> usize {
        self.boards
            .iter()
            .flat_map(|b| b.squares.iter())
            .filter(|s| !s.is_empty())
            .count()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let boards: Vec<serde_json::Value> = self.boards.iter().map(SubBoard::to_json).collect();
        serde_json::json!({
            "board_state": boards,
            "x_is_next": self.next_mark == Mark::X,
            "active_board": self.active_board,
            "game_winner": self.result.to_json()
        })
    }
}

/// An Ultimate Tic-Tac-Toe game: room plus board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UltimateGame {
    pub room: Room,
    pub board: UltimateBoard,
}

impl UltimateGame {
    /// Fresh game with an empty two-seat room.
    pub fn new() -> Result<Self, RoomError> {
        Ok(Self {
            room: Room::new(GameKind::UltimateTicTacToe, ULTIMATE_CAPACITY)?,
            board: UltimateBoard::new(),
        })
    }

    /// Mark played by a participant, if seated.
    pub fn mark_of(&self, id: &str) -> Option<Mark> {
        self.room.role_of(id)?.slot().and_then(Mark::for_slot)
    }

    /// Validate and apply a move.
    #[instrument(skip(self), fields(next = %self.board.next_mark))]
    pub fn propose_move(
        &self,
        actor: &str,
        sub_board: usize,
        cell: usize,
    ) -> Result<Transition<Self>, MoveRejection> {
        if sub_board >= 9 || cell >= 9 {
            return Err(MoveRejection::OutOfBounds);
        }
        if self.board.result.is_decided() || self.room.status.is_terminal() {
            return Err(MoveRejection::GameOver);
        }
        let mark = self.mark_of(actor).ok_or(MoveRejection::NotAPlayer)?;
        if self.room.player_count() < ULTIMATE_CAPACITY {
            return Err(MoveRejection::WaitingForPlayers);
        }
        if mark != self.board.next_mark {
            return Err(MoveRejection::WrongTurn);
        }
        if let Some(required) = self.board.active_board {
            if required != sub_board {
                return Err(MoveRejection::WrongBoard { required });
            }
        }
        let target = &self.board.boards[sub_board];
        if target.is_decided() {
            return Err(MoveRejection::BoardLocked);
        }
        if !target.squares[cell].is_empty() {
            return Err(MoveRejection::CellOccupied);
        }

        let mut next = self.clone();
        next.board.boards[sub_board].place(cell, mark);

        next.board.active_board = if next.board.boards[cell].is_decided() {
            None
        } else {
            Some(cell)
        };

        let results: [Outcome; 9] = std::array::from_fn(|i| next.board.boards[i].result);
        next.board.result = evaluate(&results);
        next.board.next_mark = mark.opponent();

        let completion = match next.board.result {
            Outcome::Undecided => None,
            outcome => {
                next.room.status.apply_mut(LifecycleEvent::TerminalResult)?;
                next.board.active_board = None;
                Some(next.completion_for(outcome))
            }
        };

        debug!(
            sub_board,
            cell,
            active_board = ?next.board.active_board,
            result = next.board.result.as_str(),
            "Move accepted"
        );

        Ok(Transition {
            state: next,
            completion,
            claimed: Vec::new(),
        })
    }

    /// Reset a finished game. Only the host may restart; seats are kept.
    pub fn restart(&self, actor: &str) -> Result<Self, RoomError> {
        if !self.room.is_host(actor) {
            return Err(RoomError::NotHost);
        }

        let mut next = self.clone();
        next.room.status.apply_mut(LifecycleEvent::Restart)?;
        next.board = UltimateBoard::new();
        Ok(next)
    }

    fn completion_for(&self, outcome: Outcome) -> Completion {
        let result = match outcome.winner().and_then(|mark| self.room.seat(mark.slot())) {
            Some(seat) => GameResult::Winner(seat.id.clone()),
            None => GameResult::Draw,
        };
        Completion::settle(result, self.room.seats())
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = self.board.to_json();
        if let (Some(board), serde_json::Value::Object(room)) = (obj.as_object_mut(), self.room.to_json()) {
            board.extend(room);
        }
        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lifecycle::GameStatus;
    use crate::state::room::Identity;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn started() -> UltimateGame {
        let mut game = UltimateGame::new().unwrap();
        game.room.join(&Identity::new("alice", "Alice"), Utc::now()).unwrap();
        game.room.join(&Identity::new("bob", "Bob"), Utc::now()).unwrap();
        game
    }

    fn play(game: &UltimateGame, actor: &str, sub: usize, cell: usize) -> UltimateGame {
        game.propose_move(actor, sub, cell).unwrap().state
    }

    /// Build a position by writing marks directly, bypassing turn order.
    fn with_marks(mut game: UltimateGame, marks: &[(usize, usize, Mark)]) -> UltimateGame {
        for &(sub, cell, mark) in marks {
            game.board.boards[sub].place(cell, mark);
        }
        game
    }

    #[test]
    fn test_first_move_sends_opponent() {
        let game = started();
        let next = play(&game, "alice", 4, 4);

        assert_eq!(next.board.active_board(), Some(4));
        assert_eq!(next.board.next_mark(), Mark::O);
        assert_eq!(
            next.board.sub_board(4).unwrap().square(4),
            Some(Square::Marked(Mark::X))
        );
        assert_eq!(next.board.move_count(), 1);
    }

    #[test]
    fn test_rejections() {
        let game = started();

        assert_eq!(game.propose_move("alice", 9, 0), Err(MoveRejection::OutOfBounds));
        assert_eq!(game.propose_move("carol", 0, 0), Err(MoveRejection::NotAPlayer));
        assert_eq!(game.propose_move("bob", 0, 0), Err(MoveRejection::WrongTurn));

        let next = play(&game, "alice", 0, 4);
        assert_eq!(
            next.propose_move("bob", 3, 0),
            Err(MoveRejection::WrongBoard { required: 4 })
        );

        let next = play(&next, "bob", 4, 0);
        assert_eq!(next.propose_move("alice", 0, 4), Err(MoveRejection::CellOccupied));
    }

    #[test]
    fn test_waiting_for_opponent() {
        let mut game = UltimateGame::new().unwrap();
        game.room.join(&Identity::new("alice", "Alice"), Utc::now()).unwrap();
        assert_eq!(
            game.propose_move("alice", 0, 0),
            Err(MoveRejection::WaitingForPlayers)
        );
    }

    #[test]
    fn test_decided_board_is_locked() {
        let game = with_marks(
            started(),
            &[(2, 0, Mark::O), (2, 1, Mark::O), (2, 2, Mark::O)],
        );
        assert_eq!(game.board.sub_board(2).unwrap().result(), Outcome::Won(Mark::O));
        assert_eq!(game.propose_move("alice", 2, 5), Err(MoveRejection::BoardLocked));
    }

    #[test]
    fn test_sent_to_decided_board_frees_choice() {
        let game = with_marks(
            started(),
            &[(2, 0, Mark::O), (2, 1, Mark::O), (2, 2, Mark::O)],
        );
        let next = play(&game, "alice", 0, 2);
        assert_eq!(next.board.active_board(), None);

        // Bob may now play anywhere open.
        let next = play(&next, "bob", 7, 7);
        assert_eq!(next.board.active_board(), Some(7));
    }

    #[test]
    fn test_sub_board_result_is_monotonic() {
        let mut board = SubBoard::new();
        board.place(0, Mark::X);
        board.place(1, Mark::X);
        board.place(2, Mark::X);
        assert_eq!(board.result(), Outcome::Won(Mark::X));

        // Later marks never overturn the decided result.
        board.place(3, Mark::O);
        board.place(4, Mark::O);
        board.place(5, Mark::O);
        assert_eq!(board.result(), Outcome::Won(Mark::X));
    }

    #[test]
    fn test_column_win_finishes_game() {
        // Sub-boards 3 and 6 already belong to X; X needs 0,1,2 of board 0.
        let mut game = with_marks(
            started(),
            &[
                (3, 0, Mark::X), (3, 4, Mark::X), (3, 8, Mark::X),
                (6, 2, Mark::X), (6, 4, Mark::X), (6, 6, Mark::X),
                (0, 0, Mark::X), (0, 1, Mark::X),
                (5, 3, Mark::O), (8, 3, Mark::O), (4, 3, Mark::O),
                (1, 3, Mark::O), (7, 3, Mark::O), (1, 5, Mark::O),
            ],
        );
        game.board.active_board = Some(0);

        let transition = game.propose_move("alice", 0, 2).unwrap();
        let next = &transition.state;

        assert_eq!(next.board.sub_board(0).unwrap().result(), Outcome::Won(Mark::X));
        assert_eq!(next.board.result(), Outcome::Won(Mark::X));
        assert_eq!(next.room.status, GameStatus::Finished);

        let completion = transition.completion.unwrap();
        assert_eq!(completion.result, GameResult::Winner("alice".to_string()));
        assert_eq!(completion.stats[0].won, 1);
        assert_eq!(completion.stats[1].won, 0);
        assert!(completion.stats.iter().all(|s| s.played == 1));

        assert_eq!(next.propose_move("bob", 5, 0), Err(MoveRejection::GameOver));
    }

    #[test]
    fn test_drawn_game_settles_both_players() {
        // Sub-boards 0..8 except 8 drawn; X finishes a draw on board 8.
        let mut game = started();
        for sub in 0..8 {
            for (cell, mark) in [
                (0, Mark::X), (1, Mark::O), (2, Mark::X),
                (3, Mark::X), (4, Mark::O), (5, Mark::O),
                (6, Mark::O), (7, Mark::X), (8, Mark::X),
            ] {
                game.board.boards[sub].place(cell, mark);
            }
        }
        for (cell, mark) in [
            (0, Mark::X), (1, Mark::O), (2, Mark::X),
            (3, Mark::X), (4, Mark::O), (5, Mark::O),
            (6, Mark::O), (7, Mark::X),
        ] {
            game.board.boards[8].place(cell, mark);
        }

        let transition = game.propose_move("alice", 8, 8).unwrap();
        assert_eq!(transition.state.board.result(), Outcome::Draw);

        let completion = transition.completion.unwrap();
        assert_eq!(completion.result, GameResult::Draw);
        assert!(completion.stats.iter().all(|s| s.played == 1 && s.won == 0));
    }

    #[test]
    fn test_restart_by_host_only() {
        let mut game = started();
        game.room.status = GameStatus::Finished;
        game.board.result = Outcome::Won(Mark::O);

        assert_eq!(game.restart("bob"), Err(RoomError::NotHost));

        let restarted = game.restart("alice").unwrap();
        assert_eq!(restarted.board, UltimateBoard::new());
        assert_eq!(restarted.room.status, GameStatus::Active);
        assert_eq!(restarted.room.seats(), game.room.seats());
    }

    #[test]
    fn test_restart_needs_finished_game() {
        let game = started();
        assert!(matches!(game.restart("alice"), Err(RoomError::Lifecycle(_))));
    }

    #[test]
    fn test_to_json() {
        let game = play(&started(), "alice", 4, 4);
        let json = game.to_json();
        assert_eq!(json["active_board"], 4);
        assert_eq!(json["x_is_next"], false);
        assert_eq!(json["board_state"][4]["squares"][4], "X");
        assert_eq!(json["status"], "active");
    }
}
