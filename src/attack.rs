//! Attack resolution on the own board and outcome mirroring on the enemy board.

use log::{debug, info};

use crate::board::{Board, CellId, CellState};
use crate::common::{ColorTag, Outcome, SessionError};
use crate::config::NUM_SHIPS;
use crate::ship::Fleet;

/// Result of one attacked cell, as reported back to the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellReport {
    pub cell: CellId,
    pub outcome: Outcome,
    pub score_delta: i64,
}

/// Apply an incoming attack batch to `board`.
///
/// Every id is resolved independently and in order; the result has exactly one
/// report per id in the batch.
pub fn resolve_incoming_attack(
    board: &mut Board,
    batch: &[CellId],
    attack_score: i64,
) -> Vec<CellReport> {
    batch
        .iter()
        .map(|&cell| {
            let (outcome, next, score_delta) = match board.cell(cell) {
                CellState::ShipPart => (Outcome::Hit, CellState::DestroyedShipPart, attack_score),
                CellState::ShieldedShipPart => (Outcome::Blocked, CellState::ShipPart, 0),
                CellState::DestroyedShipPart => {
                    (Outcome::AlreadyDestroyed, CellState::DestroyedShipPart, 0)
                }
                CellState::Empty => (Outcome::Miss, CellState::Empty, 0),
            };
            board.set_cell(cell, next);
            debug!("incoming attack on {cell}: {outcome:?}");
            CellReport {
                cell,
                outcome,
                score_delta,
            }
        })
        .collect()
}

/// Local copy of the opponent's board and fleet.
///
/// Both are replaced wholesale when the opponent broadcasts its layout and
/// then updated one cell at a time from outcome notifications.
#[derive(Debug, Clone, Default)]
pub struct EnemyMirror {
    board: Option<Board>,
    fleet: Option<Fleet>,
    sunk: [bool; NUM_SHIPS],
}

impl EnemyMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn fleet(&self) -> Option<&Fleet> {
        self.fleet.as_ref()
    }

    pub fn is_sunk(&self, index: usize) -> bool {
        self.sunk[index]
    }

    pub fn sunk_count(&self) -> usize {
        self.sunk.iter().filter(|s| **s).count()
    }

    pub fn replace(&mut self, board: Board, fleet: Fleet) {
        self.board = Some(board);
        self.fleet = Some(fleet);
        self.sunk = [false; NUM_SHIPS];
    }

    /// Mirror one outcome on the enemy board.
    ///
    /// Returns the index of a ship that became sunk through this update.
    /// Ships already reported sunk are never reported again.
    pub fn apply_update(
        &mut self,
        cell: CellId,
        tag: ColorTag,
    ) -> Result<Option<usize>, SessionError> {
        let board = self.board.as_mut().ok_or(SessionError::MissingEnemyBoard)?;
        match tag {
            ColorTag::Green => board.set_cell(cell, CellState::DestroyedShipPart),
            ColorTag::Orange => {
                board.set_cell(cell, CellState::ShipPart);
                return Ok(None);
            }
            ColorTag::Red => return Ok(None),
        }

        let fleet = self.fleet.as_ref().ok_or(SessionError::MissingEnemyFleet)?;
        let Some(index) = fleet.ship_index_of(cell) else {
            return Ok(None);
        };
        if self.sunk[index] || !fleet.ship(index).is_destroyed_on(board) {
            return Ok(None);
        }
        self.sunk[index] = true;
        info!("enemy ship {index} sunk");
        Ok(Some(index))
    }
}
