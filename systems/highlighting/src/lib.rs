#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that recomputes the hover icons advertised on legal move targets.

use underpromotion_core::{EntityId, EntitySnapshot, EntityView, GridPosition, HoverIcon, MoveMode};
use underpromotion_system_piece_movement::{PieceMovement, Sightlines};

/// Icon change the world should apply to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoverAssignment {
    /// Entity whose icon changes.
    pub entity: EntityId,
    /// New icon, or `None` to clear it.
    pub icon: Option<HoverIcon>,
}

/// Highlighter that mirrors the validator's legality predicate.
#[derive(Debug, Default)]
pub struct Highlighting {
    movement: PieceMovement,
}

impl Highlighting {
    /// Creates a new highlighter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an assignment for every entity whose icon must change.
    ///
    /// Blockers are scanned once per pass, so a pass stays proportional to
    /// the number of entities. Walls and closed gates are never legal
    /// targets, so they only ever lose their icon. Nothing changes while no
    /// piece is selected.
    pub fn handle(
        &self,
        mode: Option<MoveMode>,
        player: GridPosition,
        entities: &EntityView,
        out: &mut Vec<HoverAssignment>,
    ) {
        let Some(mode) = mode else {
            return;
        };
        let sightlines = Sightlines::from_view(player, entities);

        for entity in entities.iter() {
            let icon = self
                .movement
                .is_legal_target(mode, &sightlines, entity.position, entities)
                .then(|| icon_for(entity));

            if icon != entity.hover_icon {
                out.push(HoverAssignment {
                    entity: entity.id,
                    icon,
                });
            }
        }
    }
}

/// Icon advertised for a legal target, by descending priority.
#[must_use]
pub fn icon_for(entity: &EntitySnapshot) -> HoverIcon {
    if entity.pushable.is_some() {
        HoverIcon::Push
    } else if entity.deadly {
        HoverIcon::Danger
    } else if entity.conveyor.is_some() {
        HoverIcon::Conveyor
    } else if entity.exit {
        HoverIcon::Exit
    } else if entity.button_activated == Some(false) {
        HoverIcon::Button
    } else {
        HoverIcon::Walk
    }
}
