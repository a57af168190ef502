//! Two team clients and scripted tablets playing a full match on an in-memory
//! bus. Prints a JSON summary.

use battleship_bus::{
    format_attack, format_claim, init_logging, AppConfig, CellId, Command, InMemoryBus,
    MatchOutcome, Notice, TeamNode, Transport, BOARD_COLS, BOARD_ROWS, NUM_CELLS, SHIP_SIZES,
};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Duration;

const MATCH_TICKS: u32 = 100;

fn team_config(me: &str, enemy: &str) -> anyhow::Result<AppConfig> {
    let cfg = json!({
        "broker": "in-memory",
        "client_id": me,
        "topics": {
            "liveness": format!("{me}/alive"),
            "play_flow": format!("{me}/flow"),
            "game_data": format!("{me}/data"),
            "enemy_team": format!("{enemy}/data"),
            "enemy_team_tablet": format!("{enemy}/tablet"),
            "led": format!("{me}/led"),
        },
        "keywords": {
            "reset": "reset",
            "start_intro": "intro",
            "skip": "skip",
            "game_start": "start",
            "shield_puzzle": "shield",
            "strategic_puzzle": "spy",
            "fix_parts_puzzle": "fix",
            "ship_placed": "placed",
            "team_ready": "ready",
            "alive": "alive",
        },
        "scores": { "attack": 10 },
        "timing": {
            "placement_window_ms": 50,
            "match_duration_ticks": MATCH_TICKS,
            "clock_tick_ms": 10,
            "liveness_interval_ms": 500,
            "liveness_retry_ms": 250,
            "reveal_ms": 30,
        },
    });
    Ok(AppConfig::from_json(&cfg.to_string())?)
}

/// Random non-overlapping straight ships, in placement order.
fn random_layout(rng: &mut SmallRng) -> Vec<Vec<CellId>> {
    let mut taken = [false; NUM_CELLS + 1];
    let mut ships = Vec::with_capacity(SHIP_SIZES.len());
    for size in SHIP_SIZES {
        loop {
            let cells: Vec<CellId> = if rng.random_bool(0.5) {
                let row = rng.random_range(0..BOARD_ROWS);
                let col = rng.random_range(0..=BOARD_COLS - size);
                (0..size).map(|k| CellId::from_row_col(row, col + k)).collect()
            } else {
                let row = rng.random_range(0..=BOARD_ROWS - size);
                let col = rng.random_range(0..BOARD_COLS);
                (0..size).map(|k| CellId::from_row_col(row + k, col)).collect()
            };
            if cells.iter().all(|c| !taken[c.get() as usize]) {
                for c in &cells {
                    taken[c.get() as usize] = true;
                }
                ships.push(cells);
                break;
            }
        }
    }
    ships
}

#[derive(Debug, Default)]
struct TeamReport {
    outcome: Option<MatchOutcome>,
    score: i64,
    enemy_score: i64,
    sunk: usize,
    attacks: usize,
}

/// Plays the tablets of one team: places ships, fires one shot per tick and
/// answers puzzles.
async fn tablets(
    bus: InMemoryBus,
    config: AppConfig,
    mut rng: SmallRng,
    mut notices: mpsc::UnboundedReceiver<Notice>,
    commands: mpsc::UnboundedSender<Command>,
) -> TeamReport {
    let layout = random_layout(&mut rng);
    let mut targets: Vec<CellId> = CellId::all().collect();
    targets.shuffle(&mut rng);
    let topics = &config.topics;
    let keywords = &config.keywords;
    let mut report = TeamReport::default();

    while let Some(notice) = notices.recv().await {
        match notice {
            Notice::PlacementWindowOpened { index, .. } => {
                for cell in &layout[index] {
                    bus.publish(&topics.game_data, &format_claim(*cell));
                }
            }
            Notice::GameStarted { .. } => {
                bus.publish(&topics.game_data, &keywords.shield_puzzle);
            }
            Notice::ClockTick { remaining } => {
                if let Some(cell) = targets.pop() {
                    bus.publish(&topics.enemy_team, &format_attack(&[cell]));
                    report.attacks += 1;
                }
                if remaining == MATCH_TICKS / 2 {
                    bus.publish(&topics.game_data, &keywords.fix_parts_puzzle);
                    bus.publish(&topics.game_data, &keywords.strategic_puzzle);
                }
            }
            Notice::ShieldPuzzle { candidates } | Notice::RepairPuzzle { candidates }
                if candidates.is_empty() => {}
            Notice::ShieldPuzzle { candidates } => {
                let _ = commands.send(Command::ApplyShield(candidates[0]));
            }
            Notice::RepairPuzzle { candidates } => {
                let _ = commands.send(Command::RepairCell(candidates[0]));
            }
            Notice::ScoreChanged { score } => report.score = score,
            Notice::EnemyShipSunk { .. } => report.sunk += 1,
            Notice::MatchDecided {
                outcome,
                own,
                enemy,
            } => {
                report.outcome = Some(outcome);
                report.score = own;
                report.enemy_score = enemy;
            }
            _ => {}
        }
    }
    report
}

/// Plays the game master: skips intros, starts the match once both teams are
/// ready and resets both clients once both results are in.
async fn director(bus: InMemoryBus, blue: AppConfig, red: AppConfig) -> anyhow::Result<()> {
    let mut client = bus.connect();
    let flows = [blue.topics.play_flow.clone(), red.topics.play_flow.clone()];
    for flow in &flows {
        client.subscribe(flow).await?;
    }
    for (flow, cfg) in flows.iter().zip([&blue, &red]) {
        client.publish(flow, &cfg.keywords.skip).await?;
    }

    let mut ready = [false; 2];
    let mut decided = [false; 2];
    loop {
        let msg = client.recv().await?;
        let Some(team) = flows.iter().position(|f| *f == msg.topic) else {
            continue;
        };
        let keywords = if team == 0 { &blue.keywords } else { &red.keywords };
        if msg.payload == keywords.team_ready {
            ready[team] = true;
            if ready == [true, true] {
                for (flow, cfg) in flows.iter().zip([&blue, &red]) {
                    client.publish(flow, &cfg.keywords.game_start).await?;
                }
            }
        } else if msg.payload == keywords.win || msg.payload == keywords.lose {
            decided[team] = true;
            if decided == [true, true] {
                for (flow, cfg) in flows.iter().zip([&blue, &red]) {
                    client.publish(flow, &cfg.keywords.reset).await?;
                }
                return Ok(());
            }
        }
    }
}

fn summary(report: &TeamReport) -> serde_json::Value {
    json!({
        "outcome": report.outcome.map(|o| format!("{o:?}")),
        "score": report.score,
        "enemy_score": report.enemy_score,
        "sunk": report.sunk,
        "attacks": report.attacks,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <seed1> <seed2>", args[0]);
        std::process::exit(1);
    }
    let seed1: u64 = args[1].parse()?;
    let seed2: u64 = args[2].parse()?;

    let bus = InMemoryBus::new();
    let blue = team_config("blue", "red")?;
    let red = team_config("red", "blue")?;

    let mut nodes = Vec::new();
    let mut bots = Vec::new();
    for (cfg, seed) in [(&blue, seed1), (&red, seed2)] {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let mut node =
            TeamNode::connect(cfg, Box::new(bus.connect()), command_rx, notice_tx).await?;
        nodes.push(tokio::spawn(async move { node.run().await }));
        bots.push(tokio::spawn(tablets(
            bus.clone(),
            cfg.clone(),
            SmallRng::seed_from_u64(seed),
            notice_rx,
            command_tx,
        )));
    }

    tokio::time::timeout(Duration::from_secs(30), director(bus.clone(), blue, red))
        .await
        .map_err(|_| anyhow::anyhow!("match did not finish in time"))??;

    for node in nodes {
        node.await??;
    }
    let mut reports = Vec::new();
    for bot in bots {
        reports.push(bot.await?);
    }

    let winner = match (reports[0].outcome, reports[1].outcome) {
        (Some(MatchOutcome::Win), _) => Some("blue"),
        (_, Some(MatchOutcome::Win)) => Some("red"),
        _ => None,
    };
    let result = json!({
        "blue": summary(&reports[0]),
        "red": summary(&reports[1]),
        "winner": winner,
    });
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
