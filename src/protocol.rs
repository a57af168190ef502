//! Wire vocabulary of the game bus: typed inbound events, outbound messages and
//! the string codec between them.
//!
//! Payloads are short text messages. Lifecycle and puzzle messages are exact
//! keyword matches; data messages start with a one-character tag followed by a
//! separator (`|` when we send, any single character accepted on receipt):
//!
//! | shape                       | meaning                          |
//! |-----------------------------|----------------------------------|
//! | `score:<int>`               | opponent's final score           |
//! | `y<id>`                     | claim one placement cell         |
//! | `b|<board json>|<fleet json>` | full enemy layout              |
//! | `f|<id>_<id>_...`           | incoming attack batch            |
//! | `u|<score>,<id>,<tag>`      | outcome of one of our attacks    |

use crate::board::{Board, CellId};
use crate::common::{ColorTag, ProtocolError};
use crate::config::{Keywords, Topics};
use crate::score::MatchOutcome;
use crate::ship::Fleet;

/// Largest score magnitude accepted in `u` and `score:` messages.
pub const MAX_SCORE: i64 = 1_000_000_000;

/// Logical channel an inbound message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    PlayFlow,
    GameData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayFlowEvent {
    Reset,
    StartIntro,
    Skip,
    GameStart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameDataEvent {
    ShieldPuzzle,
    StrategicPuzzle,
    FixPartsPuzzle,
    FinalScore(i64),
    ClaimCell(CellId),
    EnemyLayout { board: Board, fleet: Fleet },
    Attack(Vec<CellId>),
    EnemyUpdate {
        score: i64,
        cell: CellId,
        tag: ColorTag,
    },
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PlayFlow(PlayFlowEvent),
    GameData(GameDataEvent),
}

/// Messages this team publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    ShipPlaced,
    TeamReady,
    Layout { board: Board, fleet: Fleet },
    Update {
        score: i64,
        cell: CellId,
        tag: ColorTag,
    },
    /// Attack landed on a part that was already destroyed.
    AlreadyDestroyed(CellId),
    /// Light the LED for a newly shielded cell.
    ShieldLed(CellId),
    FinalScore(i64),
    Result(MatchOutcome),
    Alive,
}

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub payload: String,
}

pub fn format_claim(cell: CellId) -> String {
    format!("y{cell}")
}

pub fn format_layout(board: &Board, fleet: &Fleet) -> String {
    format!("b|{}|{}", board.to_json(), fleet.to_json())
}

pub fn format_attack(batch: &[CellId]) -> String {
    let ids: Vec<String> = batch.iter().map(|c| c.to_string()).collect();
    format!("f|{}", ids.join("_"))
}

pub fn format_update(score: i64, cell: CellId, tag: ColorTag) -> String {
    format!("u|{score},{cell},{tag}")
}

pub fn format_score(score: i64) -> String {
    format!("score:{score}")
}

/// Maps topics and payloads to events and back, using the configured names.
#[derive(Debug, Clone)]
pub struct Codec {
    topics: Topics,
    keywords: Keywords,
}

impl Codec {
    pub fn new(topics: Topics, keywords: Keywords) -> Self {
        Self { topics, keywords }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    pub fn channel_of(&self, topic: &str) -> Option<Channel> {
        if topic == self.topics.play_flow {
            Some(Channel::PlayFlow)
        } else if topic == self.topics.game_data {
            Some(Channel::GameData)
        } else {
            None
        }
    }

    /// Decode a message received on `topic`. `Ok(None)` means the topic is
    /// not one we route.
    pub fn route(&self, topic: &str, payload: &str) -> Result<Option<Event>, ProtocolError> {
        match self.channel_of(topic) {
            Some(channel) => self.decode(channel, payload).map(Some),
            None => Ok(None),
        }
    }

    pub fn decode(&self, channel: Channel, payload: &str) -> Result<Event, ProtocolError> {
        match channel {
            Channel::PlayFlow => self.decode_play_flow(payload).map(Event::PlayFlow),
            Channel::GameData => self.decode_game_data(payload).map(Event::GameData),
        }
    }

    fn decode_play_flow(&self, payload: &str) -> Result<PlayFlowEvent, ProtocolError> {
        let k = &self.keywords;
        if payload == k.reset {
            Ok(PlayFlowEvent::Reset)
        } else if payload == k.start_intro {
            Ok(PlayFlowEvent::StartIntro)
        } else if payload == k.skip {
            Ok(PlayFlowEvent::Skip)
        } else if payload == k.game_start {
            Ok(PlayFlowEvent::GameStart)
        } else {
            Err(ProtocolError::UnknownMessage(payload.to_string()))
        }
    }

    fn decode_game_data(&self, payload: &str) -> Result<GameDataEvent, ProtocolError> {
        let k = &self.keywords;
        if payload == k.shield_puzzle {
            return Ok(GameDataEvent::ShieldPuzzle);
        }
        if payload == k.strategic_puzzle {
            return Ok(GameDataEvent::StrategicPuzzle);
        }
        if payload == k.fix_parts_puzzle {
            return Ok(GameDataEvent::FixPartsPuzzle);
        }
        if let Some(rest) = payload.strip_prefix("score") {
            let value = rest.strip_prefix(':').ok_or_else(|| ProtocolError::Malformed {
                tag: 's',
                reason: "expected `score:<int>`".into(),
            })?;
            return parse_score(value).map(GameDataEvent::FinalScore);
        }
        match payload.chars().next() {
            Some('y') => {
                let id = parse_int(&payload[1..])?;
                Ok(GameDataEvent::ClaimCell(CellId::new(id)?))
            }
            Some('b') => {
                let body = body_after_tag(payload, 'b')?;
                let (board, fleet) = body.split_once('|').ok_or_else(|| ProtocolError::Malformed {
                    tag: 'b',
                    reason: "expected `<board>|<fleet>`".into(),
                })?;
                Ok(GameDataEvent::EnemyLayout {
                    board: Board::from_json(board)?,
                    fleet: Fleet::from_json(fleet)?,
                })
            }
            Some('f') => {
                let body = body_after_tag(payload, 'f')?;
                let batch = body
                    .split('_')
                    .map(|part| -> Result<CellId, ProtocolError> {
                        Ok(CellId::new(parse_int(part)?)?)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GameDataEvent::Attack(batch))
            }
            Some('u') => {
                let body = body_after_tag(payload, 'u')?;
                let fields: Vec<&str> = body.split(',').collect();
                if fields.len() != 3 {
                    return Err(ProtocolError::FieldCount {
                        expected: 3,
                        found: fields.len(),
                    });
                }
                let score = parse_score(fields[0])?;
                let cell = CellId::new(parse_int(fields[1])?)?;
                let tag = ColorTag::parse(fields[2].trim())
                    .ok_or_else(|| ProtocolError::UnknownColor(fields[2].to_string()))?;
                Ok(GameDataEvent::EnemyUpdate { score, cell, tag })
            }
            _ => Err(ProtocolError::UnknownMessage(payload.to_string())),
        }
    }

    pub fn encode(&self, out: &Outbound) -> Publish {
        let t = &self.topics;
        let k = &self.keywords;
        let (topic, payload) = match out {
            Outbound::ShipPlaced => (&t.play_flow, k.ship_placed.clone()),
            Outbound::TeamReady => (&t.play_flow, k.team_ready.clone()),
            Outbound::Layout { board, fleet } => (&t.enemy_team, format_layout(board, fleet)),
            Outbound::Update { score, cell, tag } => {
                (&t.enemy_team, format_update(*score, *cell, *tag))
            }
            Outbound::AlreadyDestroyed(cell) => (&t.enemy_team_tablet, cell.to_string()),
            Outbound::ShieldLed(cell) => (&t.led, format_claim(*cell)),
            Outbound::FinalScore(score) => (&t.enemy_team, format_score(*score)),
            Outbound::Result(MatchOutcome::Win) => (&t.play_flow, k.win.clone()),
            Outbound::Result(MatchOutcome::Lose) => (&t.play_flow, k.lose.clone()),
            Outbound::Alive => (&t.liveness, k.alive.clone()),
        };
        Publish {
            topic: topic.clone(),
            payload,
        }
    }
}

/// Text after the tag and its one-character separator.
fn body_after_tag(payload: &str, tag: char) -> Result<&str, ProtocolError> {
    let mut chars = payload.char_indices().skip(1);
    match chars.next() {
        Some((i, sep)) => Ok(&payload[i + sep.len_utf8()..]),
        None => Err(ProtocolError::Malformed {
            tag,
            reason: "missing payload".into(),
        }),
    }
}

fn parse_int(s: &str) -> Result<i64, ProtocolError> {
    s.trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber(s.to_string()))
}

/// Scores outside `-MAX_SCORE..=MAX_SCORE` are rejected as invalid numbers.
fn parse_score(s: &str) -> Result<i64, ProtocolError> {
    let score = parse_int(s)?;
    if !(-MAX_SCORE..=MAX_SCORE).contains(&score) {
        return Err(ProtocolError::InvalidNumber(s.to_string()));
    }
    Ok(score)
}
