//! Ship and fleet definitions plus the straight-line shape rule.

use serde::{Deserialize, Serialize};

use crate::board::{Board, CellId, CellState};
use crate::config::{BOARD_COLS, NUM_SHIPS, SHIP_SIZES};

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Classify a set of cells as a straight, gap-free line.
///
/// Returns `None` when the cells form neither shape or the set is empty. A
/// single cell satisfies both checks and is reported as horizontal.
pub fn ship_orientation(cells: &[CellId]) -> Option<Orientation> {
    if cells.is_empty() {
        return None;
    }
    let mut sorted = cells.to_vec();
    sorted.sort_unstable();

    let row = sorted[0].row();
    let horizontal = sorted
        .windows(2)
        .all(|w| w[1].get() == w[0].get() + 1 && w[1].row() == row);
    if horizontal {
        return Some(Orientation::Horizontal);
    }
    let vertical = sorted
        .windows(2)
        .all(|w| w[1].get() == w[0].get() + BOARD_COLS as u8);
    vertical.then_some(Orientation::Vertical)
}

/// True if `cells` lie on one row with consecutive ids, or one column with ids
/// stepping by a full row. Occupancy is not checked here.
pub fn is_valid_ship(cells: &[CellId]) -> bool {
    ship_orientation(cells).is_some()
}

/// Ordered set of cell ids making up one ship.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ship {
    cells: Vec<CellId>,
}

impl Ship {
    /// Stores the cells sorted ascending.
    pub fn new(mut cells: Vec<CellId>) -> Self {
        cells.sort_unstable();
        Self { cells }
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains(&id)
    }

    /// Every cell is destroyed on `board`. An empty ship is never sunk.
    pub fn is_destroyed_on(&self, board: &Board) -> bool {
        !self.cells.is_empty()
            && self
                .cells
                .iter()
                .all(|id| board.cell(*id) == CellState::DestroyedShipPart)
    }
}

/// The five ships of one side, indexed in placement order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fleet {
    ships: [Ship; NUM_SHIPS],
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ship(&self, index: usize) -> &Ship {
        &self.ships[index]
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub(crate) fn set_ship(&mut self, index: usize, ship: Ship) {
        self.ships[index] = ship;
    }

    /// Index of the ship owning `id`, if any.
    pub fn ship_index_of(&self, id: CellId) -> Option<usize> {
        self.ships.iter().position(|s| s.contains(id))
    }

    /// Ships whose length matches the configured size for their slot.
    pub fn is_complete(&self) -> bool {
        self.ships
            .iter()
            .zip(SHIP_SIZES)
            .all(|(ship, size)| ship.len() == size)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
