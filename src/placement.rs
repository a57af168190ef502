//! Ship-by-ship placement driven by cell claims and a per-ship deadline.
//!
//! The session never owns a timer. Callers open a window, feed claims, and
//! call [`PlacementSession::close_window`] when the deadline fires; the
//! returned [`WindowVerdict`] tells them whether to re-arm it.

use log::{debug, info};

use crate::board::{Board, CellId, CellState};
use crate::common::{PlacementFailure, PlacementRejection};
use crate::config::{NUM_SHIPS, SHIP_SIZES};
use crate::ship::{is_valid_ship, Fleet, Ship};

/// Observable phase of the placement state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPhase {
    /// Collecting cells for ship `index`; `window_open` reports the deadline.
    AwaitingCell { index: usize, window_open: bool },
    AllPlaced,
}

/// Result of evaluating the in-progress ship at its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowVerdict {
    /// Cells were discarded; the same ship must be placed again.
    Retry {
        index: usize,
        failure: PlacementFailure,
    },
    /// Ship committed to the board and fleet.
    Placed { index: usize, all_placed: bool },
    /// The deadline fired after every ship was placed.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct PlacementSession {
    index: usize,
    in_progress: Vec<CellId>,
    window_open: bool,
    fleet: Fleet,
}

impl PlacementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PlacementPhase {
        if self.index >= NUM_SHIPS {
            PlacementPhase::AllPlaced
        } else {
            PlacementPhase::AwaitingCell {
                index: self.index,
                window_open: self.window_open,
            }
        }
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn all_placed(&self) -> bool {
        self.index >= NUM_SHIPS
    }

    /// Expected size of the ship being placed, `None` once all are placed.
    pub fn expected_size(&self) -> Option<usize> {
        SHIP_SIZES.get(self.index).copied()
    }

    pub fn in_progress(&self) -> &[CellId] {
        &self.in_progress
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Open the placement window for the current ship. Returns `false` if a
    /// window is already open or nothing is left to place.
    pub fn open_window(&mut self) -> bool {
        if self.all_placed() || self.window_open {
            return false;
        }
        self.window_open = true;
        true
    }

    /// Claimed by a previously finalized ship or by the ship in progress.
    pub fn is_block_occupied(&self, id: CellId) -> bool {
        self.fleet.ships()[..self.index.min(NUM_SHIPS)]
            .iter()
            .any(|s| s.contains(id))
            || self.in_progress.contains(&id)
    }

    /// Add one cell to the ship in progress.
    pub fn claim(&mut self, id: CellId) -> Result<usize, PlacementRejection> {
        if self.all_placed() {
            return Err(PlacementRejection::AllShipsPlaced);
        }
        if self.is_block_occupied(id) {
            return Err(PlacementRejection::Occupied(id));
        }
        self.in_progress.push(id);
        debug!(
            "ship {} claimed cell {} ({} parts)",
            self.index,
            id,
            self.in_progress.len()
        );
        Ok(self.in_progress.len())
    }

    /// Evaluate the in-progress ship. On success every claimed cell becomes
    /// `ShipPart` on `board` and the index advances.
    pub fn close_window(&mut self, board: &mut Board) -> WindowVerdict {
        self.window_open = false;
        let Some(expected) = self.expected_size() else {
            return WindowVerdict::Ignored;
        };
        let found = self.in_progress.len();
        let failure = if found < expected {
            Some(PlacementFailure::TooFew { expected, found })
        } else if found > expected {
            Some(PlacementFailure::TooMany { expected, found })
        } else if !is_valid_ship(&self.in_progress) {
            Some(PlacementFailure::InvalidShape)
        } else {
            None
        };

        let index = self.index;
        if let Some(failure) = failure {
            info!("ship {index} rejected at deadline: {failure}");
            self.in_progress.clear();
            return WindowVerdict::Retry { index, failure };
        }

        let ship = Ship::new(std::mem::take(&mut self.in_progress));
        for id in ship.cells() {
            board.set_cell(*id, CellState::ShipPart);
        }
        self.fleet.set_ship(index, ship);
        self.index += 1;
        info!("ship {index} placed");
        WindowVerdict::Placed {
            index,
            all_placed: self.all_placed(),
        }
    }
}
