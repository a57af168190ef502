//! The 5×10 cell-state grid shared by the own board and the mirrored enemy board.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::common::BoardError;
use crate::config::{BOARD_COLS, BOARD_ROWS, NUM_CELLS};

/// State of a single cell. The serialized names are the board-exchange wire format.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    #[serde(rename = " ")]
    Empty,
    #[serde(rename = "ship")]
    ShipPart,
    #[serde(rename = "shield")]
    ShieldedShipPart,
    #[serde(rename = "destroyed")]
    DestroyedShipPart,
}

/// 1-based linear cell index, `row * 10 + col + 1`. Always within `1..=50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct CellId(u8);

impl CellId {
    pub fn new(id: i64) -> Result<Self, BoardError> {
        if (1..=NUM_CELLS as i64).contains(&id) {
            Ok(CellId(id as u8))
        } else {
            Err(BoardError::CellOutOfRange(id))
        }
    }

    /// Panics if `(row, col)` is off the board.
    pub fn from_row_col(row: usize, col: usize) -> Self {
        assert!(
            row < BOARD_ROWS && col < BOARD_COLS,
            "cell ({row}, {col}) is off the board"
        );
        CellId((row * BOARD_COLS + col + 1) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn row(self) -> usize {
        (self.0 as usize - 1) / BOARD_COLS
    }

    pub fn col(self) -> usize {
        (self.0 as usize - 1) % BOARD_COLS
    }

    pub fn to_row_col(self) -> (usize, usize) {
        (self.row(), self.col())
    }

    /// All ids in ascending order.
    pub fn all() -> impl Iterator<Item = CellId> {
        (1..=NUM_CELLS as u8).map(CellId)
    }
}

impl TryFrom<i64> for CellId {
    type Error = BoardError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        CellId::new(id)
    }
}

impl From<CellId> for u8 {
    fn from(id: CellId) -> Self {
        id.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row-major grid of cell states.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[CellState; BOARD_COLS]; BOARD_ROWS],
}

impl Board {
    /// A board with every cell empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[row][col]
    }

    /// Panics when out of bounds.
    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        self.cells[row][col] = state;
    }

    pub fn cell(&self, id: CellId) -> CellState {
        self.get(id.row(), id.col())
    }

    pub fn set_cell(&mut self, id: CellId, state: CellState) {
        self.set(id.row(), id.col(), state);
    }

    /// Ids of every cell currently in `state`, ascending.
    pub fn cells_in_state(&self, state: CellState) -> Vec<CellId> {
        CellId::all().filter(|id| self.cell(*id) == state).collect()
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().flatten().filter(|c| **c == state).count()
    }

    pub fn to_json(&self) -> String {
        // A fixed-size array of unit variants cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for c in 0..BOARD_COLS {
            write!(f, "{:>2}", c)?;
        }
        writeln!(f)?;
        for (r, row) in self.cells.iter().enumerate() {
            write!(f, "{:>2} ", r)?;
            for cell in row {
                let ch = match cell {
                    CellState::Empty => '.',
                    CellState::ShipPart => 'S',
                    CellState::ShieldedShipPart => 'O',
                    CellState::DestroyedShipPart => 'X',
                };
                write!(f, " {}", ch)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
