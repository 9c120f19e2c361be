//! Frame-by-frame execution of forced move routes.

use underpromotion_core::{GridPosition, MoveRoute, RouteStep};

/// Observable movement state of an actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementState {
    /// No route is executing.
    Idle,
    /// A forced route is executing.
    Executing {
        /// Steps of the route that have not started yet.
        remaining_steps: usize,
    },
}

/// Tick cost of displacing steps.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepTiming {
    pub(crate) frames_per_step: u32,
    pub(crate) frames_per_jump: u32,
}

/// Outcome of advancing a motion by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Progress {
    Idle,
    Running,
    Completed,
}

#[derive(Clone, Debug)]
struct ActiveRoute {
    route: MoveRoute,
    cursor: usize,
    frames_left: u32,
}

/// Route executor owned by every actor.
#[derive(Clone, Debug, Default)]
pub(crate) struct Motion {
    active: Option<ActiveRoute>,
    through: bool,
}

impl Motion {
    pub(crate) fn force(&mut self, route: MoveRoute) {
        self.active = Some(ActiveRoute {
            route,
            cursor: 0,
            frames_left: 0,
        });
    }

    pub(crate) fn is_executing(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn through(&self) -> bool {
        self.through
    }

    pub(crate) fn route(&self) -> Option<&MoveRoute> {
        self.active.as_ref().map(|active| &active.route)
    }

    pub(crate) fn state(&self) -> MovementState {
        match &self.active {
            None => MovementState::Idle,
            Some(active) => MovementState::Executing {
                remaining_steps: active.route.steps().len().saturating_sub(active.cursor),
            },
        }
    }

    /// Runs the route for one tick; a displacing step moves `position` as it begins.
    pub(crate) fn advance(&mut self, position: &mut GridPosition, timing: StepTiming) -> Progress {
        let Some(active) = self.active.as_mut() else {
            return Progress::Idle;
        };

        if active.frames_left > 0 {
            active.frames_left -= 1;
            if active.frames_left > 0 {
                return Progress::Running;
            }
        }

        while let Some(step) = active.route.steps().get(active.cursor).copied() {
            active.cursor += 1;
            match step {
                RouteStep::ThroughOn => self.through = true,
                RouteStep::ThroughOff => self.through = false,
                RouteStep::Step(direction) => {
                    *position = position.step(direction);
                    active.frames_left = timing.frames_per_step;
                    return Progress::Running;
                }
                RouteStep::Jump { dx, dy } => {
                    *position = position.offset_by(dx, dy);
                    active.frames_left = timing.frames_per_jump;
                    return Progress::Running;
                }
            }
        }

        self.active = None;
        Progress::Completed
    }

    /// Splices a step in front of the next unstarted step and returns its index.
    pub(crate) fn insert_at_cursor(&mut self, step: RouteStep) -> Option<usize> {
        let active = self.active.as_mut()?;
        active.route.insert(active.cursor, step);
        Some(active.cursor)
    }

    /// Ends the route in place, restoring collision. Returns whether a route was running.
    pub(crate) fn abandon(&mut self) -> bool {
        self.through = false;
        self.active.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use underpromotion_core::Direction;

    const TIMING: StepTiming = StepTiming {
        frames_per_step: 2,
        frames_per_jump: 3,
    };

    #[test]
    fn steps_move_when_they_begin_and_cost_their_frames() {
        let mut motion = Motion::default();
        let mut position = GridPosition::new(0, 0);
        motion.force(MoveRoute::new(
            vec![
                RouteStep::ThroughOn,
                RouteStep::Step(Direction::Right),
                RouteStep::Step(Direction::Right),
                RouteStep::ThroughOff,
            ],
            false,
        ));

        assert_eq!(motion.advance(&mut position, TIMING), Progress::Running);
        assert_eq!(position, GridPosition::new(1, 0));
        assert!(motion.through());

        assert_eq!(motion.advance(&mut position, TIMING), Progress::Running);
        assert_eq!(position, GridPosition::new(1, 0));

        assert_eq!(motion.advance(&mut position, TIMING), Progress::Running);
        assert_eq!(position, GridPosition::new(2, 0));

        assert_eq!(motion.advance(&mut position, TIMING), Progress::Running);
        assert_eq!(motion.advance(&mut position, TIMING), Progress::Completed);
        assert!(!motion.through());
        assert_eq!(motion.state(), MovementState::Idle);
        assert_eq!(motion.advance(&mut position, TIMING), Progress::Idle);
    }

    #[test]
    fn inserted_jump_runs_before_the_remaining_steps() {
        let mut motion = Motion::default();
        let mut position = GridPosition::new(5, 5);
        motion.force(MoveRoute::new(
            vec![RouteStep::Step(Direction::Down), RouteStep::Step(Direction::Down)],
            false,
        ));
        let _ = motion.advance(&mut position, TIMING);

        assert_eq!(motion.insert_at_cursor(RouteStep::Jump { dx: 0, dy: 0 }), Some(1));
        assert_eq!(
            motion.state(),
            MovementState::Executing { remaining_steps: 2 }
        );

        let _ = motion.advance(&mut position, TIMING);
        assert_eq!(position, GridPosition::new(5, 6));
        for _ in 0..4 {
            let _ = motion.advance(&mut position, TIMING);
        }
        assert_eq!(position, GridPosition::new(5, 7));
    }

    #[test]
    fn abandoning_clears_route_and_through() {
        let mut motion = Motion::default();
        let mut position = GridPosition::new(0, 0);
        motion.force(MoveRoute::new(
            vec![RouteStep::ThroughOn, RouteStep::Step(Direction::Up)],
            false,
        ));
        let _ = motion.advance(&mut position, TIMING);

        assert!(motion.abandon());
        assert!(!motion.through());
        assert!(!motion.abandon());
    }
}
