//! The game session: sole owner of boards, fleets, score and clock.
//!
//! Every entry point is synchronous and returns the [`Effect`]s the caller must
//! carry out (publishes, presentation notices, timer changes). Nothing here
//! blocks or touches the network, so all mutation happens in one place and in
//! the order events are fed in.

use std::time::Duration;

use log::{error, info, warn};

use crate::attack::{resolve_incoming_attack, EnemyMirror};
use crate::board::{Board, CellId, CellState};
use crate::common::{ColorTag, Outcome, PlacementFailure, PlacementRejection, SessionError};
use crate::config::AppConfig;
use crate::placement::{PlacementSession, WindowVerdict};
use crate::protocol::{Event, GameDataEvent, Outbound, PlayFlowEvent};
use crate::score::{ClockTick, MatchClock, MatchOutcome, ScoreTracker};

/// State changes surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ResetRequested,
    IntroStarted,
    IntroSkipped,
    PlacementWindowOpened { index: usize, size: usize },
    CellClaimed { cell: CellId, parts: usize },
    ClaimRejected { cell: CellId, reason: PlacementRejection },
    PlacementFailed { index: usize, failure: PlacementFailure },
    ShipPlaced { index: usize },
    AllShipsPlaced,
    EnemyLayoutReceived,
    GameStarted { remaining: u32 },
    ClockTick { remaining: u32 },
    TimeUp { score: i64 },
    OwnCellAttacked { cell: CellId, outcome: Outcome },
    EnemyCellUpdated { cell: CellId, tag: ColorTag },
    ScoreChanged { score: i64 },
    EnemyShipSunk { index: usize },
    ShieldPuzzle { candidates: Vec<CellId> },
    RevealEnemyBoard { board: Board, duration: Duration },
    RepairPuzzle { candidates: Vec<CellId> },
    ShieldApplied { cell: CellId },
    Repaired { cell: CellId },
    ActionRejected(SessionError),
    MatchDecided {
        outcome: MatchOutcome,
        own: i64,
        enemy: i64,
    },
}

/// User actions forwarded by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// The intro finished playing; start placing ships.
    IntroFinished,
    ApplyShield(CellId),
    RepairCell(CellId),
}

/// Work the session hands back to its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Publish(Outbound),
    Notify(Notice),
    /// (Re)start the placement deadline from now.
    ArmPlacementDeadline,
    /// Start ticking the match clock from now.
    StartClock,
    /// Relaunch the process and stop this instance.
    Relaunch,
}

pub struct GameSession {
    attack_score: i64,
    sunk_bonus: i64,
    reveal: Duration,
    own_board: Board,
    placement: PlacementSession,
    enemy: EnemyMirror,
    score: ScoreTracker,
    clock: MatchClock,
    /// Puzzles whose selection has not been made yet. Each allows one.
    shield_pending: bool,
    repair_pending: bool,
}

impl GameSession {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            attack_score: config.scores.attack,
            sunk_bonus: config.scores.sunk_bonus,
            reveal: config.timing.reveal(),
            own_board: Board::new(),
            placement: PlacementSession::new(),
            enemy: EnemyMirror::new(),
            score: ScoreTracker::new(),
            clock: MatchClock::new(config.timing.match_duration_ticks),
            shield_pending: false,
            repair_pending: false,
        }
    }

    pub fn own_board(&self) -> &Board {
        &self.own_board
    }

    pub fn placement(&self) -> &PlacementSession {
        &self.placement
    }

    pub fn enemy(&self) -> &EnemyMirror {
        &self.enemy
    }

    pub fn score(&self) -> &ScoreTracker {
        &self.score
    }

    pub fn clock(&self) -> &MatchClock {
        &self.clock
    }

    pub fn handle_event(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::PlayFlow(ev) => self.handle_play_flow(ev),
            Event::GameData(ev) => self.handle_game_data(ev),
        }
    }

    fn handle_play_flow(&mut self, event: PlayFlowEvent) -> Vec<Effect> {
        match event {
            PlayFlowEvent::Reset => {
                info!("reset requested");
                vec![Effect::Notify(Notice::ResetRequested), Effect::Relaunch]
            }
            PlayFlowEvent::StartIntro => vec![Effect::Notify(Notice::IntroStarted)],
            PlayFlowEvent::Skip => {
                let mut effects = vec![Effect::Notify(Notice::IntroSkipped)];
                effects.extend(self.open_placement_window());
                effects
            }
            PlayFlowEvent::GameStart => {
                if !self.clock.start() {
                    return Vec::new();
                }
                info!("match started, {} ticks on the clock", self.clock.remaining());
                vec![
                    Effect::Notify(Notice::GameStarted {
                        remaining: self.clock.remaining(),
                    }),
                    Effect::StartClock,
                ]
            }
        }
    }

    fn handle_game_data(&mut self, event: GameDataEvent) -> Vec<Effect> {
        match event {
            GameDataEvent::ShieldPuzzle => {
                self.shield_pending = true;
                vec![Effect::Notify(Notice::ShieldPuzzle {
                    candidates: self.own_board.cells_in_state(CellState::ShipPart),
                })]
            }
            GameDataEvent::StrategicPuzzle => match self.enemy.board() {
                Some(board) => vec![Effect::Notify(Notice::RevealEnemyBoard {
                    board: board.clone(),
                    duration: self.reveal,
                })],
                None => {
                    error!("spy puzzle: {}", SessionError::MissingEnemyBoard);
                    Vec::new()
                }
            },
            GameDataEvent::FixPartsPuzzle => {
                self.repair_pending = true;
                vec![Effect::Notify(Notice::RepairPuzzle {
                    candidates: self.repairable_cells(),
                })]
            }
            GameDataEvent::FinalScore(enemy) => self.finish_match(enemy),
            GameDataEvent::ClaimCell(cell) => match self.placement.claim(cell) {
                Ok(parts) => vec![Effect::Notify(Notice::CellClaimed { cell, parts })],
                Err(reason) => {
                    warn!("claim of cell {cell} rejected: {reason}");
                    vec![Effect::Notify(Notice::ClaimRejected { cell, reason })]
                }
            },
            GameDataEvent::EnemyLayout { board, fleet } => {
                info!("enemy layout received");
                self.enemy.replace(board, fleet);
                vec![Effect::Notify(Notice::EnemyLayoutReceived)]
            }
            GameDataEvent::Attack(batch) => self.defend(&batch),
            GameDataEvent::EnemyUpdate { score, cell, tag } => self.apply_enemy_update(score, cell, tag),
        }
    }

    /// Resolve an incoming attack batch. One publish per cell, in batch order.
    pub fn defend(&mut self, batch: &[CellId]) -> Vec<Effect> {
        let reports = resolve_incoming_attack(&mut self.own_board, batch, self.attack_score);
        let mut effects = Vec::with_capacity(reports.len() * 2);
        for report in reports {
            let publish = match report.outcome.color_tag() {
                Some(tag) => Outbound::Update {
                    score: report.score_delta,
                    cell: report.cell,
                    tag,
                },
                None => Outbound::AlreadyDestroyed(report.cell),
            };
            effects.push(Effect::Publish(publish));
            effects.push(Effect::Notify(Notice::OwnCellAttacked {
                cell: report.cell,
                outcome: report.outcome,
            }));
        }
        effects
    }

    /// Credit the score carried by an outcome of our attack and mirror it.
    pub fn apply_enemy_update(&mut self, score: i64, cell: CellId, tag: ColorTag) -> Vec<Effect> {
        let mut effects = Vec::new();
        let total = self.score.add(score);
        effects.push(Effect::Notify(Notice::ScoreChanged { score: total }));
        effects.push(Effect::Notify(Notice::EnemyCellUpdated { cell, tag }));
        match self.enemy.apply_update(cell, tag) {
            Ok(Some(index)) => {
                let total = self.score.add(self.sunk_bonus);
                effects.push(Effect::Notify(Notice::EnemyShipSunk { index }));
                effects.push(Effect::Notify(Notice::ScoreChanged { score: total }));
            }
            Ok(None) => {}
            Err(e) => error!("update for cell {cell}: {e}"),
        }
        effects
    }

    /// Called when the placement deadline fires.
    pub fn placement_deadline(&mut self) -> Vec<Effect> {
        match self.placement.close_window(&mut self.own_board) {
            WindowVerdict::Retry { index, failure } => {
                let mut effects = vec![Effect::Notify(Notice::PlacementFailed { index, failure })];
                effects.extend(self.open_placement_window());
                effects
            }
            WindowVerdict::Placed {
                index,
                all_placed: false,
            } => {
                let mut effects = vec![
                    Effect::Notify(Notice::ShipPlaced { index }),
                    Effect::Publish(Outbound::ShipPlaced),
                ];
                effects.extend(self.open_placement_window());
                effects
            }
            WindowVerdict::Placed {
                index,
                all_placed: true,
            } => {
                info!("all ships placed, broadcasting layout");
                vec![
                    Effect::Notify(Notice::ShipPlaced { index }),
                    Effect::Publish(Outbound::ShipPlaced),
                    Effect::Publish(Outbound::Layout {
                        board: self.own_board.clone(),
                        fleet: self.placement.fleet().clone(),
                    }),
                    Effect::Publish(Outbound::TeamReady),
                    Effect::Notify(Notice::AllShipsPlaced),
                ]
            }
            WindowVerdict::Ignored => Vec::new(),
        }
    }

    /// Called on every match clock tick.
    pub fn clock_tick(&mut self) -> Vec<Effect> {
        match self.clock.tick() {
            ClockTick::Running(remaining) => vec![Effect::Notify(Notice::ClockTick { remaining })],
            ClockTick::Expired => {
                let score = self.score.score();
                info!("time's up with score {score}");
                vec![
                    Effect::Notify(Notice::ClockTick { remaining: 0 }),
                    Effect::Notify(Notice::TimeUp { score }),
                    Effect::Publish(Outbound::FinalScore(score)),
                ]
            }
            ClockTick::Idle => Vec::new(),
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::IntroFinished => self.open_placement_window(),
            Command::ApplyShield(cell) => {
                if !self.shield_pending {
                    return rejected(SessionError::NoPuzzlePending);
                }
                if self.own_board.cell(cell) != CellState::ShipPart {
                    return rejected(SessionError::NotShieldable(cell));
                }
                self.shield_pending = false;
                self.own_board.set_cell(cell, CellState::ShieldedShipPart);
                vec![
                    Effect::Publish(Outbound::ShieldLed(cell)),
                    Effect::Notify(Notice::ShieldApplied { cell }),
                ]
            }
            Command::RepairCell(cell) => {
                if !self.repair_pending {
                    return rejected(SessionError::NoPuzzlePending);
                }
                if !self.repairable_cells().contains(&cell) {
                    return rejected(SessionError::NotRepairable(cell));
                }
                self.repair_pending = false;
                self.own_board.set_cell(cell, CellState::ShipPart);
                vec![Effect::Notify(Notice::Repaired { cell })]
            }
        }
    }

    /// Destroyed own parts whose ship still has at least one intact part.
    pub fn repairable_cells(&self) -> Vec<CellId> {
        let fleet = self.placement.fleet();
        self.own_board
            .cells_in_state(CellState::DestroyedShipPart)
            .into_iter()
            .filter(|cell| match fleet.ship_index_of(*cell) {
                Some(index) => !fleet.ship(index).is_destroyed_on(&self.own_board),
                None => false,
            })
            .collect()
    }

    fn open_placement_window(&mut self) -> Vec<Effect> {
        if !self.placement.open_window() {
            return Vec::new();
        }
        let index = self.placement.current_index();
        let size = self.placement.expected_size().unwrap_or_default();
        vec![
            Effect::Notify(Notice::PlacementWindowOpened { index, size }),
            Effect::ArmPlacementDeadline,
        ]
    }

    fn finish_match(&mut self, enemy: i64) -> Vec<Effect> {
        let own = self.score.score();
        match self.score.adjudicate(enemy) {
            Some(outcome) => {
                info!("match decided: {outcome:?} ({own} vs {enemy})");
                vec![
                    Effect::Publish(Outbound::Result(outcome)),
                    Effect::Notify(Notice::MatchDecided {
                        outcome,
                        own,
                        enemy,
                    }),
                ]
            }
            None => {
                warn!("ignoring repeated final score {enemy}: {}", SessionError::MatchOver);
                Vec::new()
            }
        }
    }
}

fn rejected(error: SessionError) -> Vec<Effect> {
    warn!("command rejected: {error}");
    vec![Effect::Notify(Notice::ActionRejected(error))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{test_config, TOTAL_SHIP_CELLS};
    use crate::ship::{Fleet, Ship};

    fn id(i: i64) -> CellId {
        CellId::new(i).unwrap()
    }

    fn session() -> GameSession {
        GameSession::new(&test_config())
    }

    fn publishes(effects: &[Effect]) -> Vec<Outbound> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Publish(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    fn place_fleet(s: &mut GameSession) -> Vec<Effect> {
        let layouts: [&[i64]; 5] = [
            &[1, 2, 3, 4, 5],
            &[11, 12, 13, 14],
            &[21, 22, 23],
            &[31, 32, 33],
            &[41, 42],
        ];
        let mut last = Vec::new();
        for cells in layouts {
            for c in cells {
                s.handle_event(Event::GameData(GameDataEvent::ClaimCell(id(*c))));
            }
            last = s.placement_deadline();
        }
        last
    }

    #[test]
    fn skip_opens_window_once() {
        let mut s = session();
        let effects = s.handle_event(Event::PlayFlow(PlayFlowEvent::Skip));
        assert!(effects.contains(&Effect::ArmPlacementDeadline));
        assert!(effects.contains(&Effect::Notify(Notice::PlacementWindowOpened {
            index: 0,
            size: 5
        })));
        let again = s.handle_command(Command::IntroFinished);
        assert!(again.is_empty());
    }

    #[test]
    fn failed_ship_rearms_deadline() {
        let mut s = session();
        s.handle_event(Event::PlayFlow(PlayFlowEvent::Skip));
        s.handle_event(Event::GameData(GameDataEvent::ClaimCell(id(1))));
        let effects = s.placement_deadline();
        assert_eq!(
            effects[0],
            Effect::Notify(Notice::PlacementFailed {
                index: 0,
                failure: PlacementFailure::TooFew {
                    expected: 5,
                    found: 1
                }
            })
        );
        assert!(effects.contains(&Effect::ArmPlacementDeadline));
        assert!(publishes(&effects).is_empty());
    }

    #[test]
    fn completing_fleet_broadcasts_layout_then_ready() {
        let mut s = session();
        let effects = place_fleet(&mut s);
        let out = publishes(&effects);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Outbound::ShipPlaced);
        match &out[1] {
            Outbound::Layout { board, fleet } => {
                assert_eq!(board.count(CellState::ShipPart), TOTAL_SHIP_CELLS);
                assert!(fleet.is_complete());
            }
            other => panic!("expected layout, got {other:?}"),
        }
        assert_eq!(out[2], Outbound::TeamReady);
        assert!(!effects.contains(&Effect::ArmPlacementDeadline));
    }

    #[test]
    fn attack_on_ship_part_reports_green_with_attack_score() {
        let mut s = session();
        place_fleet(&mut s);
        let effects = s.handle_event(Event::GameData(GameDataEvent::Attack(vec![id(5)])));
        assert_eq!(
            publishes(&effects),
            vec![Outbound::Update {
                score: 10,
                cell: id(5),
                tag: ColorTag::Green
            }]
        );
        assert_eq!(s.own_board().cell(id(5)), CellState::DestroyedShipPart);
        assert_eq!(s.score().score(), 0);
    }

    #[test]
    fn already_destroyed_uses_tablet_channel_and_is_idempotent() {
        let mut s = session();
        place_fleet(&mut s);
        s.defend(&[id(5)]);
        let before = s.own_board().clone();
        let first = s.defend(&[id(5)]);
        let second = s.defend(&[id(5)]);
        assert_eq!(publishes(&first), vec![Outbound::AlreadyDestroyed(id(5))]);
        assert_eq!(publishes(&first), publishes(&second));
        assert_eq!(s.own_board(), &before);
        assert_eq!(s.score().score(), 0);
    }

    fn with_enemy_destroyer(s: &mut GameSession) {
        let mut board = Board::new();
        board.set_cell(id(49), CellState::ShipPart);
        board.set_cell(id(50), CellState::ShipPart);
        let mut fleet = Fleet::new();
        fleet.set_ship(4, Ship::new(vec![id(49), id(50)]));
        s.handle_event(Event::GameData(GameDataEvent::EnemyLayout { board, fleet }));
    }

    #[test]
    fn sinking_awards_bonus_once() {
        let mut s = session();
        with_enemy_destroyer(&mut s);
        s.apply_enemy_update(10, id(49), ColorTag::Green);
        let effects = s.apply_enemy_update(10, id(50), ColorTag::Green);
        assert!(effects.contains(&Effect::Notify(Notice::EnemyShipSunk { index: 4 })));
        assert_eq!(s.score().score(), 70);
        s.apply_enemy_update(0, id(50), ColorTag::Green);
        assert_eq!(s.score().score(), 70);
    }

    #[test]
    fn update_without_layout_still_scores() {
        let mut s = session();
        s.apply_enemy_update(10, id(3), ColorTag::Green);
        assert_eq!(s.score().score(), 10);
        assert!(s.enemy().board().is_none());
    }

    #[test]
    fn clock_expiry_publishes_final_score() {
        let mut cfg = test_config();
        cfg.timing.match_duration_ticks = 2;
        let mut s = GameSession::new(&cfg);
        assert!(s.clock_tick().is_empty());
        s.handle_event(Event::PlayFlow(PlayFlowEvent::GameStart));
        s.score.add(120);
        assert_eq!(
            s.clock_tick(),
            vec![Effect::Notify(Notice::ClockTick { remaining: 1 })]
        );
        let effects = s.clock_tick();
        assert_eq!(publishes(&effects), vec![Outbound::FinalScore(120)]);
        assert!(s.clock_tick().is_empty());
    }

    #[test]
    fn final_score_decides_win_or_lose() {
        let mut s = session();
        s.score.add(120);
        let effects = s.handle_event(Event::GameData(GameDataEvent::FinalScore(90)));
        assert_eq!(publishes(&effects), vec![Outbound::Result(MatchOutcome::Win)]);

        let mut s = session();
        s.score.add(120);
        let effects = s.handle_event(Event::GameData(GameDataEvent::FinalScore(150)));
        assert_eq!(publishes(&effects), vec![Outbound::Result(MatchOutcome::Lose)]);
        assert!(s
            .handle_event(Event::GameData(GameDataEvent::FinalScore(1)))
            .is_empty());
    }

    fn puzzle(s: &mut GameSession, event: GameDataEvent) {
        s.handle_event(Event::GameData(event));
    }

    #[test]
    fn shield_only_on_healthy_parts() {
        let mut s = session();
        place_fleet(&mut s);
        puzzle(&mut s, GameDataEvent::ShieldPuzzle);
        let rejected = s.handle_command(Command::ApplyShield(id(50)));
        assert_eq!(
            rejected,
            vec![Effect::Notify(Notice::ActionRejected(
                SessionError::NotShieldable(id(50))
            ))]
        );

        let effects = s.handle_command(Command::ApplyShield(id(1)));
        assert_eq!(publishes(&effects), vec![Outbound::ShieldLed(id(1))]);
        assert_eq!(s.own_board().cell(id(1)), CellState::ShieldedShipPart);

        let reports = s.defend(&[id(1)]);
        assert_eq!(
            publishes(&reports),
            vec![Outbound::Update {
                score: 0,
                cell: id(1),
                tag: ColorTag::Orange
            }]
        );
        assert_eq!(s.own_board().cell(id(1)), CellState::ShipPart);
    }

    #[test]
    fn repair_only_parts_of_living_ships() {
        let mut s = session();
        place_fleet(&mut s);
        s.defend(&[id(41), id(42), id(1)]);
        assert_eq!(s.repairable_cells(), vec![id(1)]);
        puzzle(&mut s, GameDataEvent::FixPartsPuzzle);
        let rejected = s.handle_command(Command::RepairCell(id(41)));
        assert_eq!(
            rejected,
            vec![Effect::Notify(Notice::ActionRejected(
                SessionError::NotRepairable(id(41))
            ))]
        );
        s.handle_command(Command::RepairCell(id(1)));
        assert_eq!(s.own_board().cell(id(1)), CellState::ShipPart);
    }

    #[test]
    fn selections_need_a_pending_puzzle() {
        let mut s = session();
        place_fleet(&mut s);
        s.defend(&[id(1)]);
        let no_puzzle = vec![Effect::Notify(Notice::ActionRejected(
            SessionError::NoPuzzlePending,
        ))];
        assert_eq!(s.handle_command(Command::ApplyShield(id(2))), no_puzzle);
        assert_eq!(s.handle_command(Command::RepairCell(id(1))), no_puzzle);
        assert_eq!(s.own_board().cell(id(2)), CellState::ShipPart);
        assert_eq!(s.own_board().cell(id(1)), CellState::DestroyedShipPart);
    }

    #[test]
    fn each_puzzle_allows_one_selection() {
        let mut s = session();
        place_fleet(&mut s);
        puzzle(&mut s, GameDataEvent::ShieldPuzzle);
        let shielded = (2..=5)
            .filter(|c| {
                s.handle_command(Command::ApplyShield(id(*c)))
                    .contains(&Effect::Notify(Notice::ShieldApplied { cell: id(*c) }))
            })
            .count();
        assert_eq!(shielded, 1);
        assert_eq!(s.own_board().count(CellState::ShieldedShipPart), 1);

        s.defend(&[id(11), id(12)]);
        puzzle(&mut s, GameDataEvent::FixPartsPuzzle);
        s.handle_command(Command::RepairCell(id(11)));
        assert_eq!(
            s.handle_command(Command::RepairCell(id(12))),
            vec![Effect::Notify(Notice::ActionRejected(
                SessionError::NoPuzzlePending
            ))]
        );
        puzzle(&mut s, GameDataEvent::FixPartsPuzzle);
        s.handle_command(Command::RepairCell(id(12)));
        assert_eq!(s.own_board().cell(id(12)), CellState::ShipPart);
    }

    #[test]
    fn huge_enemy_scores_saturate() {
        let mut s = session();
        s.apply_enemy_update(i64::MAX, id(1), ColorTag::Red);
        let effects = s.apply_enemy_update(1, id(2), ColorTag::Red);
        assert!(effects.contains(&Effect::Notify(Notice::ScoreChanged { score: i64::MAX })));
        assert_eq!(s.score().score(), i64::MAX);
    }

    #[test]
    fn reset_requests_relaunch() {
        let mut s = session();
        let effects = s.handle_event(Event::PlayFlow(PlayFlowEvent::Reset));
        assert!(effects.contains(&Effect::Relaunch));
    }
}
