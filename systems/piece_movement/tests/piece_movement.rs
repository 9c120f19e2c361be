use underpromotion_core::{
    Direction, EntityId, EntitySnapshot, EntityView, GridPosition, MoveMode, MoveRejection,
    RouteStep,
};
use underpromotion_system_piece_movement::{MoveRequest, PieceMovement};

fn request(origin: (i32, i32), destination: (i32, i32)) -> MoveRequest {
    MoveRequest {
        origin: GridPosition::new(origin.0, origin.1),
        destination: GridPosition::new(destination.0, destination.1),
        pushing: false,
        moving: false,
    }
}

fn wall_at(id: u32, x: i32, y: i32) -> EntitySnapshot {
    let mut snapshot = EntitySnapshot::plain(EntityId::new(id), GridPosition::new(x, y));
    snapshot.wall = true;
    snapshot
}

fn gate_at(id: u32, x: i32, y: i32, open: bool) -> EntitySnapshot {
    let mut snapshot = EntitySnapshot::plain(EntityId::new(id), GridPosition::new(x, y));
    snapshot.gate_open = Some(open);
    snapshot
}

#[test]
fn rook_rejects_interposed_wall_and_accepts_once_removed() {
    let movement = PieceMovement::new();
    let blocked = EntityView::from_snapshots(vec![wall_at(1, 2, 0)]);

    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (4, 0)), &blocked),
        Err(MoveRejection::LineOfSightBlocked),
    );

    let clear = EntityView::default();
    let planned = movement
        .plan(Some(MoveMode::Rook), request((0, 0), (4, 0)), &clear)
        .expect("rook move along an empty row");
    assert_eq!(planned.route.movement_count(), 4);
    assert!(planned
        .route
        .steps()
        .iter()
        .filter_map(RouteStep::direction)
        .all(|direction| direction == Direction::Right));
    assert!(!planned.immune);
}

#[test]
fn bishop_rejects_interposed_wall_and_accepts_once_removed() {
    let movement = PieceMovement::new();
    let blocked = EntityView::from_snapshots(vec![wall_at(1, 2, 2)]);

    assert_eq!(
        movement.plan(Some(MoveMode::Bishop), request((0, 0), (4, 4)), &blocked),
        Err(MoveRejection::LineOfSightBlocked),
    );

    let clear = EntityView::default();
    let planned = movement
        .plan(Some(MoveMode::Bishop), request((0, 0), (4, 4)), &clear)
        .expect("bishop move along an empty diagonal");
    assert_eq!(planned.route.movement_count(), 4);
    assert_eq!(planned.route.first_direction(), Some(Direction::LowerRight));
}

#[test]
fn walls_off_the_travelled_line_do_not_block() {
    let movement = PieceMovement::new();
    let view = EntityView::from_snapshots(vec![wall_at(1, 2, 1), wall_at(2, 1, 2)]);

    assert!(movement
        .plan(Some(MoveMode::Rook), request((0, 0), (4, 0)), &view)
        .is_ok());
    assert!(movement
        .plan(Some(MoveMode::Bishop), request((0, 0), (3, 3)), &view)
        .is_ok());
}

#[test]
fn knight_jumps_over_walls_but_not_onto_them() {
    let movement = PieceMovement::new();
    let origin = (2, 2);
    let over = EntityView::from_snapshots(vec![wall_at(1, 2, 3), wall_at(2, 1, 3)]);

    let planned = movement
        .plan(Some(MoveMode::Knight), request(origin, (1, 4)), &over)
        .expect("knight ignores intermediate tiles");
    assert_eq!(
        planned.route.steps(),
        &[
            RouteStep::ThroughOn,
            RouteStep::Jump { dx: -1, dy: 2 },
            RouteStep::ThroughOff,
        ],
    );
    assert!(planned.immune);

    let onto = EntityView::from_snapshots(vec![wall_at(3, 1, 4)]);
    assert_eq!(
        movement.plan(Some(MoveMode::Knight), request(origin, (1, 4)), &onto),
        Err(MoveRejection::DestinationBlocked),
    );
}

#[test]
fn geometry_mismatches_are_rejected() {
    let movement = PieceMovement::new();
    let view = EntityView::default();

    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (1, 1)), &view),
        Err(MoveRejection::NotOnPath(MoveMode::Rook)),
    );
    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (0, 0)), &view),
        Err(MoveRejection::NotOnPath(MoveMode::Rook)),
    );
    assert_eq!(
        movement.plan(Some(MoveMode::Bishop), request((0, 0), (1, 2)), &view),
        Err(MoveRejection::NotOnPath(MoveMode::Bishop)),
    );
    assert_eq!(
        movement.plan(Some(MoveMode::Knight), request((0, 0), (2, 2)), &view),
        Err(MoveRejection::NotOnPath(MoveMode::Knight)),
    );
}

#[test]
fn no_mode_and_busy_movers_produce_no_move() {
    let movement = PieceMovement::new();
    let view = EntityView::default();

    assert_eq!(
        movement.plan(None, request((0, 0), (0, 3)), &view),
        Err(MoveRejection::NoMoveMode),
    );

    let mut pushing = request((0, 0), (0, 3));
    pushing.pushing = true;
    assert_eq!(
        movement.plan(Some(MoveMode::Rook), pushing, &view),
        Err(MoveRejection::MoverPushing),
    );

    let mut moving = request((0, 0), (0, 3));
    moving.moving = true;
    assert_eq!(
        movement.plan(Some(MoveMode::Rook), moving, &view),
        Err(MoveRejection::MoverBusy),
    );
}

#[test]
fn closed_gates_block_and_open_gates_do_not() {
    let movement = PieceMovement::new();
    let closed = EntityView::from_snapshots(vec![gate_at(1, 0, 2, false)]);
    let open = EntityView::from_snapshots(vec![gate_at(1, 0, 2, true)]);

    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (0, 4)), &closed),
        Err(MoveRejection::LineOfSightBlocked),
    );
    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (0, 2)), &closed),
        Err(MoveRejection::DestinationBlocked),
    );
    assert!(movement
        .plan(Some(MoveMode::Rook), request((0, 0), (0, 4)), &open)
        .is_ok());
}

#[test]
fn pushable_that_cannot_slide_away_blocks_its_tile() {
    let movement = PieceMovement::new();
    let mut block = EntitySnapshot::plain(EntityId::new(1), GridPosition::new(3, 0));
    block.pushable = Some(vec![Direction::Right]);
    let view = EntityView::from_snapshots(vec![block]);

    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (3, 0)), &view),
        Err(MoveRejection::DestinationBlocked),
    );
    assert!(movement
        .plan(Some(MoveMode::Rook), request((3, 3), (3, 0)), &view)
        .is_ok());
}

#[test]
fn conveyor_feeding_a_stuck_pushable_blocks_its_tile() {
    let movement = PieceMovement::new();
    let mut conveyor = EntitySnapshot::plain(EntityId::new(1), GridPosition::new(0, 3));
    conveyor.conveyor = Some(Direction::Right);
    let mut block = EntitySnapshot::plain(EntityId::new(2), GridPosition::new(1, 3));
    block.pushable = Some(vec![Direction::Right]);
    let view = EntityView::from_snapshots(vec![conveyor, block]);

    assert_eq!(
        movement.plan(Some(MoveMode::Rook), request((0, 0), (0, 3)), &view),
        Err(MoveRejection::DestinationBlocked),
    );
}
