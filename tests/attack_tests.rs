use battleship_bus::{
    resolve_incoming_attack, Board, CellId, CellState, ColorTag, EnemyMirror, Fleet, Outcome,
    SessionError,
};

fn id(i: i64) -> CellId {
    CellId::new(i).unwrap()
}

#[test]
fn each_cell_state_maps_to_its_outcome() {
    let mut board = Board::new();
    board.set_cell(id(1), CellState::ShipPart);
    board.set_cell(id(2), CellState::ShieldedShipPart);
    board.set_cell(id(3), CellState::DestroyedShipPart);

    let reports = resolve_incoming_attack(&mut board, &[id(1), id(2), id(3), id(4)], 10);
    let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            Outcome::Hit,
            Outcome::Blocked,
            Outcome::AlreadyDestroyed,
            Outcome::Miss
        ]
    );
    assert_eq!(reports[0].score_delta, 10);
    assert!(reports[1..].iter().all(|r| r.score_delta == 0));
    assert_eq!(board.cell(id(1)), CellState::DestroyedShipPart);
    assert_eq!(board.cell(id(2)), CellState::ShipPart);
    assert_eq!(board.cell(id(3)), CellState::DestroyedShipPart);
    assert_eq!(board.cell(id(4)), CellState::Empty);
}

#[test]
fn repeated_cell_in_batch_is_resolved_in_order() {
    let mut board = Board::new();
    board.set_cell(id(7), CellState::ShieldedShipPart);
    let reports = resolve_incoming_attack(&mut board, &[id(7), id(7), id(7)], 5);
    let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![Outcome::Blocked, Outcome::Hit, Outcome::AlreadyDestroyed]
    );
}

fn mirror_with_destroyer() -> EnemyMirror {
    let fleet = Fleet::from_json("[[],[],[],[],[49,50]]").unwrap();
    let mut board = Board::new();
    board.set_cell(id(49), CellState::ShipPart);
    board.set_cell(id(50), CellState::ShipPart);
    let mut mirror = EnemyMirror::new();
    mirror.replace(board, fleet);
    mirror
}

#[test]
fn sinking_is_reported_once() {
    let mut mirror = mirror_with_destroyer();
    assert_eq!(mirror.apply_update(id(49), ColorTag::Green), Ok(None));
    assert!(!mirror.is_sunk(4));
    assert_eq!(mirror.apply_update(id(50), ColorTag::Green), Ok(Some(4)));
    assert_eq!(mirror.apply_update(id(50), ColorTag::Green), Ok(None));
    assert_eq!(mirror.apply_update(id(49), ColorTag::Green), Ok(None));
    assert!(mirror.is_sunk(4));
    assert_eq!(mirror.sunk_count(), 1);
}

#[test]
fn new_layout_clears_sunk_flags() {
    let mut mirror = mirror_with_destroyer();
    mirror.apply_update(id(49), ColorTag::Green).unwrap();
    mirror.apply_update(id(50), ColorTag::Green).unwrap();
    let fresh = mirror_with_destroyer();
    mirror.replace(
        fresh.board().unwrap().clone(),
        fresh.fleet().unwrap().clone(),
    );
    assert!(!mirror.is_sunk(4));
    assert_eq!(mirror.sunk_count(), 0);
}

#[test]
fn orange_and_red_do_not_destroy() {
    let mut mirror = mirror_with_destroyer();
    assert_eq!(mirror.apply_update(id(49), ColorTag::Orange), Ok(None));
    assert_eq!(mirror.apply_update(id(1), ColorTag::Red), Ok(None));
    let board = mirror.board().unwrap();
    assert_eq!(board.cell(id(49)), CellState::ShipPart);
    assert_eq!(board.cell(id(1)), CellState::Empty);
}

#[test]
fn updates_before_layout_are_errors() {
    let mut mirror = EnemyMirror::new();
    assert_eq!(
        mirror.apply_update(id(1), ColorTag::Green),
        Err(SessionError::MissingEnemyBoard)
    );
}
