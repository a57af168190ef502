//! Common types: error enums and the per-cell attack outcome vocabulary.

use core::fmt;

use thiserror::Error;

use crate::board::CellId;

/// Classification of one attacked cell from the defender's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A bare ship part was destroyed.
    Hit,
    /// A shield absorbed the attack.
    Blocked,
    /// The part was already destroyed earlier.
    AlreadyDestroyed,
    Miss,
}

impl Outcome {
    /// Color tag used on the update channel. `AlreadyDestroyed` has none: it is
    /// reported on its own channel.
    pub fn color_tag(self) -> Option<ColorTag> {
        match self {
            Outcome::Hit => Some(ColorTag::Green),
            Outcome::Blocked => Some(ColorTag::Orange),
            Outcome::Miss => Some(ColorTag::Red),
            Outcome::AlreadyDestroyed => None,
        }
    }
}

/// Wire tag carried by `u` update messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTag {
    Green,
    Orange,
    Red,
}

impl ColorTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorTag::Green => "green",
            ColorTag::Orange => "orange",
            ColorTag::Red => "red",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "green" => Some(ColorTag::Green),
            "orange" => Some(ColorTag::Orange),
            "red" => Some(ColorTag::Red),
            _ => None,
        }
    }
}

impl fmt::Display for ColorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by board operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// Linear id outside `1..=50`.
    #[error("cell id {0} is out of range")]
    CellOutOfRange(i64),
}

/// Errors raised while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Well-formed but not part of the vocabulary for this channel.
    #[error("unrecognised message `{0}`")]
    UnknownMessage(String),
    #[error("malformed `{tag}` message: {reason}")]
    Malformed { tag: char, reason: String },
    #[error("`{0}` is not a number")]
    InvalidNumber(String),
    #[error(transparent)]
    Cell(#[from] BoardError),
    #[error("bad JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("unknown color tag `{0}`")]
    UnknownColor(String),
}

impl ProtocolError {
    /// Unknown messages are routine (we also hear our own broadcasts); the rest
    /// indicate a misbehaving peer.
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProtocolError::UnknownMessage(_))
    }
}

/// A cell claim that was refused without changing placement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementRejection {
    #[error("block {0} is already occupied")]
    Occupied(CellId),
    #[error("all ships are already placed")]
    AllShipsPlaced,
}

/// Why the ship in progress was discarded when its window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementFailure {
    #[error("incomplete ship: expected {expected}, found {found}")]
    TooFew { expected: usize, found: usize },
    #[error("too many blocks placed: expected {expected}, found {found}")]
    TooMany { expected: usize, found: usize },
    #[error("invalid shape: blocks must be connected and straight")]
    InvalidShape,
}

/// Failures of session operations that leave state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("enemy board has not been received")]
    MissingEnemyBoard,
    #[error("enemy fleet has not been received")]
    MissingEnemyFleet,
    #[error("cell {0} holds no healthy ship part to shield")]
    NotShieldable(CellId),
    #[error("cell {0} cannot be repaired")]
    NotRepairable(CellId),
    #[error("no puzzle is waiting for a selection")]
    NoPuzzlePending,
    #[error("the match is already decided")]
    MatchOver,
}

/// Startup configuration failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
