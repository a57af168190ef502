//! Running score, match countdown and end-of-match adjudication.

/// Result of comparing final scores. Only a strictly greater score wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreTracker {
    score: i64,
    enemy_final: Option<i64>,
    outcome: Option<MatchOutcome>,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Add `points`, saturating at the `i64` bounds.
    pub fn add(&mut self, points: i64) -> i64 {
        self.score = self.score.saturating_add(points);
        self.score
    }

    pub fn enemy_final(&self) -> Option<i64> {
        self.enemy_final
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Decide the match against the opponent's reported score. Only the first
    /// report counts; later ones return `None`.
    pub fn adjudicate(&mut self, enemy_score: i64) -> Option<MatchOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let outcome = if self.score > enemy_score {
            MatchOutcome::Win
        } else {
            MatchOutcome::Lose
        };
        self.enemy_final = Some(enemy_score);
        self.outcome = Some(outcome);
        Some(outcome)
    }
}

/// What a single clock tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// Still counting; carries remaining ticks.
    Running(u32),
    /// This tick reached zero. Reported exactly once.
    Expired,
    /// Not started, or already expired.
    Idle,
}

/// Countdown in whole ticks. Once expired it never moves again.
#[derive(Debug, Clone)]
pub struct MatchClock {
    remaining: u32,
    running: bool,
    expired: bool,
}

impl MatchClock {
    pub fn new(duration_ticks: u32) -> Self {
        Self {
            remaining: duration_ticks,
            running: false,
            expired: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns `false` if the clock was already running or has expired.
    pub fn start(&mut self) -> bool {
        if self.running || self.expired {
            return false;
        }
        self.running = true;
        true
    }

    pub fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            self.expired = true;
            ClockTick::Expired
        } else {
            ClockTick::Running(self.remaining)
        }
    }
}

/// `mm:ss` rendering of a tick count, one tick per second.
pub fn format_clock(ticks: u32) -> String {
    format!("{:02}:{:02}", ticks / 60, ticks % 60)
}
