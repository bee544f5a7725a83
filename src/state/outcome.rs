//! Three-in-a-row evaluation.
//!
//! The same detector scores a single 3x3 sub-board (over raw marks) and the
//! composite Ultimate board (over the nine sub-board results). A decided
//! sub-board counts as that player's mark on the composite board; a drawn
//! sub-board fills its cell but never completes a line.

use std::fmt;

/// The eight winning triples: rows, columns, diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A player's mark. X always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The other mark.
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// Mark played by a seat. Slot 0 plays X, slot 1 plays O.
    pub fn for_slot(slot: usize) -> Option<Self> {
        match slot {
            0 => Some(Self::X),
            1 => Some(Self::O),
            _ => None,
        }
    }

    /// Seat index that plays this mark.
    pub fn slot(self) -> usize {
        match self {
            Self::X => 0,
            Self::O => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single square of a 3x3 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Square {
    #[default]
    Empty,
    Marked(Mark),
}

impl Square {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// View the square as a detector cell.
    pub fn as_outcome(&self) -> Outcome {
        match self {
            Self::Empty => Outcome::Undecided,
            Self::Marked(mark) => Outcome::Won(*mark),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::Value::Null,
            Self::Marked(mark) => serde_json::json!(mark.as_str()),
        }
    }
}

/// Result of a sub-board or of the whole game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outcome {
    #[default]
    Undecided,
    Won(Mark),
    Draw,
}

impl Outcome {
    /// Won or drawn. A decided result is terminal.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Undecided)
    }

    pub fn winner(&self) -> Option<Mark> {
        match self {
            Self::Won(mark) => Some(*mark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undecided => "undecided",
            Self::Won(Mark::X) => "X",
            Self::Won(Mark::O) => "O",
            Self::Draw => "draw",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undecided => serde_json::Value::Null,
            other => serde_json::json!(other.as_str()),
        }
    }
}

/// Evaluate nine cells.
///
/// A triple wins when all three cells hold the same `Won` mark. With no
/// winning triple the grid is a draw once every cell is decided, otherwise
/// it stays undecided. At most one mark can own a line under legal play, so
/// the first winning triple found is returned.
pub fn evaluate(cells: &[Outcome; 9]) -> Outcome {
    for [a, b, c] in LINES {
        if let Outcome::Won(mark) = cells[a] {
            if cells[b] == Outcome::Won(mark) && cells[c] == Outcome::Won(mark) {
                return Outcome::Won(mark);
            }
        }
    }

    if cells.iter().all(Outcome::is_decided) {
        Outcome::Draw
    } else {
        Outcome::Undecided
    }
}

/// Evaluate a grid of raw squares.
pub fn evaluate_squares(squares: &[Square; 9]) -> Outcome {
    evaluate(&squares.map(|s| s.as_outcome()))
}
