use battleship_bus::{format_clock, ClockTick, MatchClock, MatchOutcome, ScoreTracker};

#[test]
fn higher_score_wins_and_tie_loses() {
    let mut t = ScoreTracker::new();
    t.add(120);
    assert_eq!(t.clone().adjudicate(90), Some(MatchOutcome::Win));
    assert_eq!(t.clone().adjudicate(150), Some(MatchOutcome::Lose));
    assert_eq!(t.adjudicate(120), Some(MatchOutcome::Lose));
    assert!(t.is_game_over());
    assert_eq!(t.adjudicate(0), None);
    assert_eq!(t.enemy_final(), Some(120));
}

#[test]
fn score_saturates_instead_of_overflowing() {
    let mut t = ScoreTracker::new();
    assert_eq!(t.add(i64::MAX), i64::MAX);
    assert_eq!(t.add(1), i64::MAX);
    assert_eq!(t.add(i64::MIN), -1);
    assert_eq!(t.add(i64::MIN), i64::MIN);
}

#[test]
fn clock_expires_once_and_freezes() {
    let mut clock = MatchClock::new(3);
    assert_eq!(clock.tick(), ClockTick::Idle);
    assert!(clock.start());
    assert!(!clock.start());
    assert_eq!(clock.tick(), ClockTick::Running(2));
    assert_eq!(clock.tick(), ClockTick::Running(1));
    assert_eq!(clock.tick(), ClockTick::Expired);
    assert_eq!(clock.tick(), ClockTick::Idle);
    assert_eq!(clock.remaining(), 0);
    assert!(!clock.is_running());
    assert!(!clock.start());
}

#[test]
fn clock_formats_minutes_and_seconds() {
    assert_eq!(format_clock(300), "05:00");
    assert_eq!(format_clock(59), "00:59");
}
