//! Dots and Boxes rules.
//!
//! Lines are stored in two flattened grids:
//!
//! ```text
//!  h(0,0)  h(0,1)          horizontal: (rows + 1) x cols
//! ·──────·──────·
//! │      │      │          vertical:   rows x (cols + 1)
//! v(0,0) v(0,1) v(0,2)
//! │ box  │ box  │          boxes:      rows x cols
//! ·──────·──────·
//!  h(1,0)  h(1,1)
//! ```
//!
//! Closing a box scores it and keeps the turn; a move that closes nothing
//! passes the turn to the next seat.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, instrument};

use super::engine::{Completion, GameResult, MoveRejection, Transition};
use super::lifecycle::LifecycleEvent;
use super::room::{GameKind, ParticipantId, Room, RoomError, Seat};

/// Line direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line grid, box owners and scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotsBoard {
    rows: usize,
    cols: usize,
    horizontal: Vec<bool>,
    vertical: Vec<bool>,
    boxes: Vec<Option<ParticipantId>>,
    current_player: usize,
    scores: HashMap<ParticipantId, u32>,
    winner: Option<ParticipantId>,
}

impl DotsBoard {
    /// Empty board of `rows` x `cols` boxes.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            horizontal: vec![false; (rows + 1) * cols],
            vertical: vec![false; rows * (cols + 1)],
            boxes: vec![None; rows * cols],
            current_player: 0,
            scores: HashMap::new(),
            winner: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    pub fn claimed_count(&self) -> usize {
        self.boxes.iter().filter(|b| b.is_some()).count()
    }

    /// Every box has an owner.
    pub fn is_complete(&self) -> bool {
        self.boxes.iter().all(Option::is_some)
    }

    /// Flattened index of a line, if it lies on the board.
    pub fn line_index(&self, orientation: Orientation, row: usize, col: usize) -> Option<usize> {
        match orientation {
            Orientation::Horizontal if row <= self.rows && col < self.cols => {
                Some(row * self.cols + col)
            }
            Orientation::Vertical if row < self.rows && col <= self.cols => {
                Some(row * (self.cols + 1) + col)
            }
            _ => None,
        }
    }

    pub fn is_drawn(&self, orientation: Orientation, row: usize, col: usize) -> bool {
        let Some(index) = self.line_index(orientation, row, col) else {
            return false;
        };
        match orientation {
            Orientation::Horizontal => self.horizontal[index],
            Orientation::Vertical => self.vertical[index],
        }
    }

    pub fn box_owner(&self, row: usize, col: usize) -> Option<&str> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.boxes[row * self.cols + col].as_deref()
    }

    /// Boxes claimed by a participant.
    pub fn score(&self, id: &str) -> u32 {
        self.scores.get(id).copied().unwrap_or(0)
    }

    pub fn total_score(&self) -> u32 {
        self.scores.values().sum()
    }

    /// Index into the seat list of the participant to move.
    pub fn current_player(&self) -> usize {
        self.current_player
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Boxes bordering a line: one for edge lines, two for inner lines.
    fn adjacent_boxes(&self, orientation: Orientation, row: usize, col: usize) -> Vec<(usize, usize)> {
        let mut adjacent = Vec::with_capacity(2);
        match orientation {
            Orientation::Horizontal => {
                if row > 0 {
                    adjacent.push((row - 1, col));
                }
                if row < self.rows {
                    adjacent.push((row, col));
                }
            }
            Orientation::Vertical => {
                if col > 0 {
                    adjacent.push((row, col - 1));
                }
                if col < self.cols {
                    adjacent.push((row, col));
                }
            }
        }
        adjacent
    }

    fn is_closed(&self, row: usize, col: usize) -> bool {
        self.is_drawn(Orientation::Horizontal, row, col)
            && self.is_drawn(Orientation::Horizontal, row + 1, col)
            && self.is_drawn(Orientation::Vertical, row, col)
            && self.is_drawn(Orientation::Vertical, row, col + 1)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "grid_rows": self.rows,
            "grid_cols": self.cols,
            "horizontal_lines": self.horizontal,
            "vertical_lines": self.vertical,
            "boxes": self.boxes,
            "current_player_index": self.current_player,
            "scores": self.scores,
            "winner": self.winner
        })
    }
}

/// A Dots and Boxes game: room plus board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotsGame {
    pub room: Room,
    pub board: DotsBoard,
}

impl DotsGame {
    /// Fresh game with an empty room of `max_players` seats.
    pub fn new(rows: usize, cols: usize, max_players: usize) -> Result<Self, RoomError> {
        Ok(Self {
            room: Room::new(GameKind::DotsAndBoxes, max_players)?,
            board: DotsBoard::new(rows, cols),
        })
    }

    /// Seat whose turn it is.
    pub fn current_seat(&self) -> Option<&Seat> {
        self.room.seat(self.board.current_player)
    }

    /// Seats with their scores, highest first. Equal scores keep seat order.
    pub fn standings(&self) -> Vec<(&Seat, u32)> {
        let mut standings: Vec<(&Seat, u32)> = self
            .room
            .seats()
            .iter()
            .map(|seat| (seat, self.board.score(&seat.id)))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1));
        standings
    }

    /// Validate and apply a line.
    #[instrument(skip(self), fields(current = self.board.current_player))]
    pub fn propose_line(
        &self,
        actor: &str,
        orientation: Orientation,
        row: usize,
        col: usize,
    ) -> Result<Transition<Self>, MoveRejection> {
        let index = self
            .board
            .line_index(orientation, row, col)
            .ok_or(MoveRejection::OutOfBounds)?;
        if self.room.status.is_terminal() {
            return Err(MoveRejection::GameOver);
        }
        if !self.room.status.is_active() {
            return Err(MoveRejection::WaitingForPlayers);
        }
        if !self.room.is_player(actor) {
            return Err(MoveRejection::NotAPlayer);
        }
        if self.current_seat().map(|seat| seat.id.as_str()) != Some(actor) {
            return Err(MoveRejection::WrongTurn);
        }
        if self.board.is_drawn(orientation, row, col) {
            return Err(MoveRejection::LineDrawn);
        }

        let mut next = self.clone();
        match orientation {
            Orientation::Horizontal => next.board.horizontal[index] = true,
            Orientation::Vertical => next.board.vertical[index] = true,
        }

        let mut claimed = Vec::new();
        for (r, c) in next.board.adjacent_boxes(orientation, row, col) {
            let box_index = r * next.board.cols + c;
            if next.board.boxes[box_index].is_some() || !next.board.is_closed(r, c) {
                continue;
            }
            next.board.boxes[box_index] = Some(actor.to_string());
            *next.board.scores.entry(actor.to_string()).or_insert(0) += 1;
            claimed.push(box_index);
        }

        if claimed.is_empty() {
            next.board.current_player = (next.board.current_player + 1) % next.room.player_count();
        }

        let completion = if next.board.is_complete() {
            next.room.status.apply_mut(LifecycleEvent::TerminalResult)?;
            let result = next.final_result();
            next.board.winner = result.winner().map(str::to_string);
            Some(Completion::settle(result, next.room.seats()))
        } else {
            None
        };

        debug!(
            %orientation,
            row,
            col,
            boxes_completed = claimed.len(),
            next_player = next.board.current_player,
            "Line accepted"
        );

        Ok(Transition {
            state: next,
            completion,
            claimed,
        })
    }

    /// Strictly highest score wins; a shared top score is a tie.
    fn final_result(&self) -> GameResult {
        let top = self
            .room
            .seats()
            .iter()
            .map(|seat| self.board.score(&seat.id))
            .max()
            .unwrap_or(0);
        let mut leaders: Vec<ParticipantId> = self
            .room
            .seats()
            .iter()
            .filter(|seat| self.board.score(&seat.id) == top)
            .map(|seat| seat.id.clone())
            .collect();

        match leaders.len() {
            1 => GameResult::Winner(leaders.swap_remove(0)),
            _ => GameResult::Tie(leaders),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = self.board.to_json();
        if let (Some(board), serde_json::Value::Object(room)) = (obj.as_object_mut(), self.room.to_json()) {
            board.extend(room);
        }
        // Every seated player is listed, boxes or not.
        let scores: serde_json::Map<String, serde_json::Value> = self
            .room
            .seats()
            .iter()
            .map(|seat| (seat.id.clone(), self.board.score(&seat.id).into()))
            .collect();
        obj["scores"] = serde_json::Value::Object(scores);
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

    use Orientation::{Horizontal as H, Vertical as V};

    fn started(rows: usize, cols: usize, players: &[&str]) -> DotsGame {
        let mut game = DotsGame::new(rows, cols, players.len()).unwrap();
        for id in players {
            game.room.join(&Identity::new(*id, id.to_uppercase()), Utc::now()).unwrap();
        }
        game
    }

    fn draw(game: &DotsGame, actor: &str, o: Orientation, row: usize, col: usize) -> Transition<DotsGame> {
        game.propose_line(actor, o, row, col).unwrap()
    }

    #[test]
    fn test_board_dimensions() {
        let board = DotsBoard::new(2, 3);
        assert_eq!(board.horizontal.len(), 9);
        assert_eq!(board.vertical.len(), 8);
        assert_eq!(board.box_count(), 6);
        assert_eq!(board.line_index(H, 2, 2), Some(8));
        assert_eq!(board.line_index(H, 3, 0), None);
        assert_eq!(board.line_index(V, 1, 3), Some(7));
        assert_eq!(board.line_index(V, 2, 0), None);
    }

    #[test]
    fn test_adjacent_boxes_at_edges() {
        let board = DotsBoard::new(2, 2);
        assert_eq!(board.adjacent_boxes(H, 0, 1), vec![(0, 1)]);
        assert_eq!(board.adjacent_boxes(H, 1, 1), vec![(0, 1), (1, 1)]);
        assert_eq!(board.adjacent_boxes(H, 2, 0), vec![(1, 0)]);
        assert_eq!(board.adjacent_boxes(V, 0, 0), vec![(0, 0)]);
        assert_eq!(board.adjacent_boxes(V, 1, 2), vec![(1, 1)]);
    }

    #[test]
    fn test_turn_passes_without_box() {
        let game = started(2, 2, &["a", "b", "c"]);
        let t = draw(&game, "a", H, 0, 0);
        assert!(t.claimed.is_empty());
        assert_eq!(t.state.board.current_player(), 1);

        let t = draw(&t.state, "b", H, 0, 1);
        let t = draw(&t.state, "c", H, 1, 0);
        assert_eq!(t.state.board.current_player(), 0);
    }

    #[test]
    fn test_rejections() {
        let mut waiting = DotsGame::new(2, 2, 2).unwrap();
        waiting.room.join(&Identity::new("a", "A"), Utc::now()).unwrap();
        assert_eq!(
            waiting.propose_line("a", H, 0, 0),
            Err(MoveRejection::WaitingForPlayers)
        );

        let game = started(2, 2, &["a", "b"]);
        assert_eq!(game.propose_line("a", H, 0, 2), Err(MoveRejection::OutOfBounds));
        assert_eq!(game.propose_line("z", H, 0, 0), Err(MoveRejection::NotAPlayer));
        assert_eq!(game.propose_line("b", H, 0, 0), Err(MoveRejection::WrongTurn));

        let t = draw(&game, "a", H, 0, 0);
        assert_eq!(t.state.propose_line("b", H, 0, 0), Err(MoveRejection::LineDrawn));
    }

    #[test]
    fn test_extra_turn_on_completion() {
        // 3x3 board, box (1,1) has three sides; it is A's turn.
        let mut game = started(3, 3, &["a", "b"]);
        let top = game.board.line_index(H, 1, 1).unwrap();
        let bottom = game.board.line_index(H, 2, 1).unwrap();
        let left = game.board.line_index(V, 1, 1).unwrap();
        game.board.horizontal[top] = true;
        game.board.horizontal[bottom] = true;
        game.board.vertical[left] = true;

        let t = draw(&game, "a", V, 1, 2);
        assert_eq!(t.claimed, vec![4]);
        assert_eq!(t.state.board.box_owner(1, 1), Some("a"));
        assert_eq!(t.state.board.score("a"), 1);
        assert_eq!(t.state.board.current_player(), 0);
        assert!(t.completion.is_none());
    }

    #[test]
    fn test_one_line_closes_two_boxes() {
        let mut game = started(1, 2, &["a", "b"]);
        for (o, r, c) in [(H, 0, 0), (H, 0, 1), (H, 1, 0), (H, 1, 1), (V, 0, 0), (V, 0, 2)] {
            let i = game.board.line_index(o, r, c).unwrap();
            match o {
                H => game.board.horizontal[i] = true,
                V => game.board.vertical[i] = true,
            }
        }

        let t = draw(&game, "a", V, 0, 1);
        assert_eq!(t.claimed, vec![0, 1]);
        assert_eq!(t.state.board.score("a"), 2);
        assert_eq!(t.state.board.winner(), Some("a"));
        assert_eq!(t.state.room.status, GameStatus::Finished);
    }

    #[test]
    fn test_full_game_on_two_by_two() {
        let mut game = started(2, 2, &["a", "b"]);
        let moves = [
            ("a", H, 0, 0),
            ("b", H, 0, 1),
            ("a", H, 2, 0),
            ("b", H, 2, 1),
            ("a", V, 0, 0),
            ("b", V, 1, 2),
            ("a", V, 0, 2),
            ("b", V, 1, 0),
            ("a", H, 1, 0),  // no box: (0,0) lacks v(0,1), (1,0) lacks v(1,1)
            ("b", H, 1, 1),  // closes nothing either
            ("a", V, 0, 1),  // closes (0,0) and (0,1)
            ("a", V, 1, 1),  // closes (1,0) and (1,1)
        ];
        let mut completion = None;
        for (actor, o, r, c) in moves {
            let t = draw(&game, actor, o, r, c);
            game = t.state;
            completion = t.completion;
        }

        assert_eq!(game.board.claimed_count(), 4);
        assert_eq!(game.board.total_score(), 4);
        assert_eq!(game.room.status, GameStatus::Finished);

        let completion = completion.unwrap();
        assert_eq!(completion.result, GameResult::Winner("a".to_string()));
        assert_eq!(completion.stats.iter().map(|s| s.won).sum::<u32>(), 1);
        assert_eq!(game.propose_line("b", H, 0, 0), Err(MoveRejection::GameOver));
    }

    #[test]
    fn test_json_lists_every_seat_score() {
        let game = started(2, 2, &["a", "b", "c"]);
        assert_eq!(game.to_json()["scores"], serde_json::json!({"a": 0, "b": 0, "c": 0}));

        let mut game = started(1, 1, &["a", "b"]);
        for (actor, o, r, c) in [("a", H, 0, 0), ("b", H, 1, 0), ("a", V, 0, 0), ("b", V, 0, 1)] {
            game = draw(&game, actor, o, r, c).state;
        }
        assert_eq!(game.to_json()["scores"], serde_json::json!({"a": 0, "b": 1}));
    }

    #[test]
    fn test_tied_top_score_has_no_winner() {
        let mut game = started(1, 2, &["a", "b"]);
        game.board.boxes[0] = Some("b".to_string());
        game.board.scores.insert("b".to_string(), 1);
        for (o, r, c) in [(H, 0, 0), (H, 1, 0), (V, 0, 0), (V, 0, 1), (H, 0, 1), (H, 1, 1)] {
            let i = game.board.line_index(o, r, c).unwrap();
            match o {
                H => game.board.horizontal[i] = true,
                V => game.board.vertical[i] = true,
            }
        }

        let t = draw(&game, "a", V, 0, 2);
        let completion = t.completion.unwrap();
        assert_eq!(
            completion.result,
            GameResult::Tie(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(t.state.board.winner(), None);
        assert!(completion.stats.iter().all(|s| s.played == 1 && s.won == 0));
    }

    #[test]
    fn test_standings_order() {
        let mut game = started(2, 2, &["a", "b", "c"]);
        game.board.scores.insert("c".to_string(), 2);
        game.board.scores.insert("a".to_string(), 1);

        let ids: Vec<&str> = game.standings().iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
