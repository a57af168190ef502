//! Text presentation layer: prints notices and turns typed lines into commands.
//!
//! Recognised input:
//! - `ready` once the intro has finished
//! - `shield <id>` after a shield puzzle
//! - `repair <id>` after a repair puzzle

use log::warn;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::board::CellId;
use crate::game::{Command, Notice};
use crate::score::{format_clock, MatchOutcome};

fn list(cells: &[CellId]) -> String {
    let ids: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
    ids.join(", ")
}

/// One human-readable line (or block) per notice.
pub fn describe(notice: &Notice) -> String {
    match notice {
        Notice::ResetRequested => "Reset requested, restarting...".into(),
        Notice::IntroStarted => "Intro playing. Type `ready` when it ends.".into(),
        Notice::IntroSkipped => "Intro skipped.".into(),
        Notice::PlacementWindowOpened { index, size } => {
            format!("Place ship {} ({size} blocks).", index + 1)
        }
        Notice::CellClaimed { cell, parts } => format!("Block {cell} claimed ({parts} so far)."),
        Notice::ClaimRejected { cell, reason } => format!("Block {cell} rejected: {reason}."),
        Notice::PlacementFailed { index, failure } => {
            format!("Ship {} not placed: {failure}. Try again.", index + 1)
        }
        Notice::ShipPlaced { index } => format!("Ship {} placed.", index + 1),
        Notice::AllShipsPlaced => "All ships placed. Waiting for the match to start.".into(),
        Notice::EnemyLayoutReceived => "Enemy fleet is in position.".into(),
        Notice::GameStarted { remaining } => format!("Match started! {}", format_clock(*remaining)),
        Notice::ClockTick { remaining } => format_clock(*remaining),
        Notice::TimeUp { score } => format!("Time's up! Final score {score}."),
        Notice::OwnCellAttacked { cell, outcome } => format!("Cell {cell} attacked: {outcome:?}."),
        Notice::EnemyCellUpdated { cell, tag } => format!("Enemy cell {cell}: {tag}."),
        Notice::ScoreChanged { score } => format!("Score: {score}"),
        Notice::EnemyShipSunk { index } => format!("Enemy ship {} sunk!", index + 1),
        Notice::ShieldPuzzle { candidates } => {
            format!("Shield puzzle solved. Pick a block: shield <id> [{}]", list(candidates))
        }
        Notice::RevealEnemyBoard { board, duration } => {
            format!("Enemy board for {:?}:\n{board}", duration)
        }
        Notice::RepairPuzzle { candidates } => {
            format!("Repair puzzle solved. Pick a block: repair <id> [{}]", list(candidates))
        }
        Notice::ShieldApplied { cell } => format!("Block {cell} shielded."),
        Notice::Repaired { cell } => format!("Block {cell} repaired."),
        Notice::ActionRejected(e) => format!("Not allowed: {e}."),
        Notice::MatchDecided {
            outcome,
            own,
            enemy,
        } => match outcome {
            MatchOutcome::Win => format!("You win, {own} to {enemy}!"),
            MatchOutcome::Lose => format!("You lose, {own} to {enemy}."),
        },
    }
}

/// Parse one typed line. Unknown input yields `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let arg = words.next();
    if words.next().is_some() {
        return None;
    }
    let cell = || arg.and_then(|a| a.parse::<i64>().ok()).and_then(|i| CellId::new(i).ok());
    match (verb.to_ascii_lowercase().as_str(), arg) {
        ("ready", None) => Some(Command::IntroFinished),
        ("shield", Some(_)) => cell().map(Command::ApplyShield),
        ("repair", Some(_)) => cell().map(Command::RepairCell),
        _ => None,
    }
}

/// Print notices and forward stdin commands until both sides close.
pub async fn run_console(
    mut notices: mpsc::UnboundedReceiver<Notice>,
    commands: mpsc::UnboundedSender<Command>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            notice = notices.recv() => match notice {
                Some(Notice::ClockTick { remaining }) if remaining % 10 != 0 => {}
                Some(notice) => println!("{}", describe(&notice)),
                None => return,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_command(&line) {
                    Some(cmd) => {
                        if commands.send(cmd).is_err() {
                            return;
                        }
                    }
                    None => println!("Unrecognised input `{}`", line.trim()),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {e}");
                    stdin_open = false;
                }
            },
        }
    }
}
