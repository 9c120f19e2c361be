#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that validates chess moves and builds the forced route for them.
//!
//! A move attempt starts idle, is validated against the active piece's
//! geometry and the entities currently on the map, and is then either
//! committed (a [`PlannedMove`] carrying the route the world forces on the
//! player) or rejected with a [`MoveRejection`].

use underpromotion_core::{
    Direction, EntityView, GridPosition, MoveMode, MoveRejection, MoveRoute, RouteStep,
};

/// The eight L-shaped knight offsets, in the order they are tried.
pub const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, 1),
    (-2, -1),
    (-1, 2),
    (-1, -2),
    (1, 2),
    (1, -2),
    (2, 1),
    (2, -1),
];

/// Everything the validator needs to know about the mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    /// Tile the mover currently occupies.
    pub origin: GridPosition,
    /// Tile the mover wants to reach.
    pub destination: GridPosition,
    /// Whether a push started by the mover is still resolving.
    pub pushing: bool,
    /// Whether the mover is still executing a forced route.
    pub moving: bool,
}

/// Committed move ready to be forced on the mover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedMove {
    /// Route the mover follows.
    pub route: MoveRoute,
    /// Whether hazards must ignore the mover until the route ends.
    pub immune: bool,
}

/// Validator for bishop, rook and knight moves.
#[derive(Debug, Default)]
pub struct PieceMovement;

impl PieceMovement {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates a move request and produces the route to force on success.
    pub fn plan(
        &self,
        mode: Option<MoveMode>,
        request: MoveRequest,
        entities: &EntityView,
    ) -> Result<PlannedMove, MoveRejection> {
        let mode = mode.ok_or(MoveRejection::NoMoveMode)?;
        if request.pushing {
            return Err(MoveRejection::MoverPushing);
        }
        if request.moving {
            return Err(MoveRejection::MoverBusy);
        }

        self.validate(mode, request.origin, request.destination, entities, || {
            line_of_sight_clear(request.origin, request.destination, entities)
        })?;

        let planned = match mode {
            MoveMode::Rook | MoveMode::Bishop => PlannedMove {
                route: slide_route(request.origin, request.destination),
                immune: false,
            },
            MoveMode::Knight => PlannedMove {
                route: knight_route(request.origin, request.destination),
                immune: true,
            },
        };
        Ok(planned)
    }

    /// Reports whether `destination` is a legal target, ignoring mover flags.
    ///
    /// `sightlines` must have been computed from the mover's tile over the
    /// same view; it lets a caller test many destinations in one pass.
    #[must_use]
    pub fn is_legal_target(
        &self,
        mode: MoveMode,
        sightlines: &Sightlines,
        destination: GridPosition,
        entities: &EntityView,
    ) -> bool {
        self.validate(mode, sightlines.origin(), destination, entities, || {
            sightlines.clear_to(destination)
        })
        .is_ok()
    }

    fn validate(
        &self,
        mode: MoveMode,
        origin: GridPosition,
        destination: GridPosition,
        entities: &EntityView,
        sight_clear: impl FnOnce() -> bool,
    ) -> Result<(), MoveRejection> {
        let on_path = match mode {
            MoveMode::Rook => origin.shares_axis_with(destination),
            MoveMode::Bishop => origin.is_diagonal_to(destination),
            MoveMode::Knight => is_knight_offset(origin, destination),
        };
        if !on_path {
            return Err(MoveRejection::NotOnPath(mode));
        }

        if destination_blocked(origin, destination, entities) {
            return Err(MoveRejection::DestinationBlocked);
        }

        if mode != MoveMode::Knight && !sight_clear() {
            return Err(MoveRejection::LineOfSightBlocked);
        }

        Ok(())
    }
}

/// Reports whether the destination tile refuses the mover.
///
/// A tile is refused when it holds a wall, an unopened gate, a pushable that
/// cannot slide away from the mover, or a conveyor whose outlet holds a
/// pushable that cannot slide in the conveyor's direction.
#[must_use]
pub fn destination_blocked(
    origin: GridPosition,
    destination: GridPosition,
    entities: &EntityView,
) -> bool {
    if entities.is_blocked(destination) {
        return true;
    }

    let (sx, sy) = origin.signum_towards(destination);
    let approach = Direction::from_offset(sx, sy);

    entities.at(destination).any(|entity| {
        let blocked_pushable = entity.pushable.is_some()
            && approach.is_some_and(|direction| entity.refuses_push(direction));

        let blocked_conveyor = entity.conveyor.is_some_and(|direction| {
            entities
                .at(entity.position.step(direction))
                .any(|outlet| outlet.refuses_push(direction))
        });

        blocked_pushable || blocked_conveyor
    })
}

/// Reports whether no blocking entity lies strictly between both tiles.
///
/// Tiles that share neither an axis nor a diagonal are never in sight.
#[must_use]
pub fn line_of_sight_clear(
    origin: GridPosition,
    destination: GridPosition,
    entities: &EntityView,
) -> bool {
    Sightlines::from_view(origin, entities).clear_to(destination)
}

/// Distance from a tile to the nearest blocker along each of the eight directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sightlines {
    origin: GridPosition,
    nearest: [Option<u32>; 8],
}

impl Sightlines {
    /// Scans the blocked tiles of `entities` once, as seen from `origin`.
    #[must_use]
    pub fn from_view(origin: GridPosition, entities: &EntityView) -> Self {
        let mut nearest = [None; 8];
        for tile in entities.blocked_tiles() {
            let Some(ray) = ray_index(origin, tile) else {
                continue;
            };
            let distance = origin.chebyshev_distance(tile);
            let slot = &mut nearest[ray];
            *slot = Some(slot.map_or(distance, |closest: u32| closest.min(distance)));
        }
        Self { origin, nearest }
    }

    /// Tile the sightlines were computed from.
    #[must_use]
    pub const fn origin(&self) -> GridPosition {
        self.origin
    }

    /// Reports whether nothing blocks the tiles strictly between the origin and `destination`.
    #[must_use]
    pub fn clear_to(&self, destination: GridPosition) -> bool {
        let Some(ray) = ray_index(self.origin, destination) else {
            return false;
        };
        let distance = self.origin.chebyshev_distance(destination);
        self.nearest[ray].map_or(true, |closest| closest >= distance)
    }
}

/// Index into `Direction::ALL` of the straight line from `origin` to `tile`.
fn ray_index(origin: GridPosition, tile: GridPosition) -> Option<usize> {
    if !(origin.shares_axis_with(tile) || origin.is_diagonal_to(tile)) {
        return None;
    }
    let (sx, sy) = origin.signum_towards(tile);
    let direction = Direction::from_offset(sx, sy)?;
    Direction::ALL.iter().position(|candidate| *candidate == direction)
}

fn is_knight_offset(origin: GridPosition, destination: GridPosition) -> bool {
    KNIGHT_OFFSETS
        .iter()
        .any(|&(dx, dy)| origin.offset_by(dx, dy) == destination)
}

fn slide_route(origin: GridPosition, destination: GridPosition) -> MoveRoute {
    let (sx, sy) = origin.signum_towards(destination);
    let mut steps = vec![RouteStep::ThroughOn];
    if let Some(direction) = Direction::from_offset(sx, sy) {
        let distance = origin.chebyshev_distance(destination);
        steps.extend((0..distance).map(|_| RouteStep::Step(direction)));
    }
    steps.push(RouteStep::ThroughOff);
    MoveRoute::new(steps, false)
}

fn knight_route(origin: GridPosition, destination: GridPosition) -> MoveRoute {
    MoveRoute::new(
        vec![
            RouteStep::ThroughOn,
            RouteStep::Jump {
                dx: destination.x - origin.x,
                dy: destination.y - origin.y,
            },
            RouteStep::ThroughOff,
        ],
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use underpromotion_core::{EntityId, EntitySnapshot};

    fn wall(id: u32, x: i32, y: i32) -> EntitySnapshot {
        let mut snapshot = EntitySnapshot::plain(EntityId::new(id), GridPosition::new(x, y));
        snapshot.wall = true;
        snapshot
    }

    #[test]
    fn line_of_sight_ignores_endpoints() {
        let view = EntityView::from_snapshots(vec![wall(1, 0, 0), wall(2, 3, 0)]);
        assert!(line_of_sight_clear(
            GridPosition::new(0, 0),
            GridPosition::new(3, 0),
            &view
        ));
        assert!(!line_of_sight_clear(
            GridPosition::new(0, 0),
            GridPosition::new(4, 0),
            &view
        ));
    }

    #[test]
    fn misaligned_tiles_are_never_in_sight() {
        let view = EntityView::default();
        assert!(!line_of_sight_clear(
            GridPosition::new(0, 0),
            GridPosition::new(1, 3),
            &view
        ));
        assert!(!line_of_sight_clear(
            GridPosition::new(2, 2),
            GridPosition::new(2, 2),
            &view
        ));
    }

    #[test]
    fn sightlines_keep_the_nearest_blocker_per_ray() {
        let view = EntityView::from_snapshots(vec![wall(1, 5, 0), wall(2, 3, 0), wall(3, 2, 2)]);
        let sightlines = Sightlines::from_view(GridPosition::new(0, 0), &view);

        assert!(sightlines.clear_to(GridPosition::new(3, 0)));
        assert!(!sightlines.clear_to(GridPosition::new(4, 0)));
        assert!(sightlines.clear_to(GridPosition::new(0, 9)));
        assert!(sightlines.clear_to(GridPosition::new(2, 2)));
        assert!(!sightlines.clear_to(GridPosition::new(3, 3)));
    }

    #[test]
    fn slide_route_counts_unit_steps() {
        let route = slide_route(GridPosition::new(4, 4), GridPosition::new(1, 1));
        assert_eq!(route.movement_count(), 3);
        assert_eq!(route.first_direction(), Some(Direction::UpperLeft));
        assert_eq!(route.steps().first(), Some(&RouteStep::ThroughOn));
        assert_eq!(route.steps().last(), Some(&RouteStep::ThroughOff));
    }

    #[test]
    fn knight_offsets_are_all_l_shaped() {
        for (dx, dy) in KNIGHT_OFFSETS {
            let mut magnitudes = [dx.abs(), dy.abs()];
            magnitudes.sort_unstable();
            assert_eq!(magnitudes, [1, 2]);
        }
    }
}
