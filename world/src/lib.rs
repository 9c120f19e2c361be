#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative per-map rule state for Underpromotion.
//!
//! A [`World`] owns everything the rules need between two host frames: the
//! classified entities of the current map, the virtual clock and its pending
//! timers, the player's route and flags, and the random number generator.
//! Hosts drive it exclusively through [`apply`].

mod config;
mod hazards;
mod mechanisms;
mod motion;
mod registry;
mod scheduler;

use std::time::Duration;

use rand::seq::SliceRandom;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use underpromotion_core::{
    ActorId, Command, EntityDescriptor, EntityId, Event, GridPosition, Hazard, MapId, MoveMode,
    MoveRejection, MoveRoute, SoundCue, SwitchSlot,
};
use underpromotion_system_highlighting::{HoverAssignment, Highlighting};
use underpromotion_system_piece_movement::{MoveRequest, PieceMovement};

pub use config::{Config, ConfigError};
pub use motion::MovementState;
pub use registry::{
    BoulderState, ButtonState, Capabilities, FlameState, GateState, PitState, PushableState,
    SpikeState,
};

use motion::{Motion, Progress, StepTiming};
use registry::Registry;
use scheduler::Scheduler;

#[derive(Debug, Default)]
struct Player {
    position: GridPosition,
    motion: Motion,
    pushing: bool,
    immune: bool,
}

impl Player {
    fn at(position: GridPosition) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Represents the authoritative rule state of the map currently loaded.
#[derive(Debug)]
pub struct World {
    config: Config,
    map: MapId,
    rng: ChaCha8Rng,
    clock: Duration,
    tick_index: u64,
    scheduler: Scheduler,
    registry: Registry,
    player: Player,
    move_mode: Option<MoveMode>,
    reload_pending: bool,
    movement: PieceMovement,
    highlighting: Highlighting,
    hover_scratch: Vec<HoverAssignment>,
}

impl World {
    /// Creates an empty world using the provided rule configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            map: MapId::new(0),
            clock: Duration::ZERO,
            tick_index: 0,
            scheduler: Scheduler::default(),
            registry: Registry::default(),
            player: Player::default(),
            move_mode: None,
            reload_pending: false,
            movement: PieceMovement::new(),
            highlighting: Highlighting::new(),
            hover_scratch: Vec::new(),
        }
    }

    fn step_timing(&self) -> StepTiming {
        StepTiming {
            frames_per_step: self.config.frames_per_step,
            frames_per_jump: self.config.frames_per_jump,
        }
    }

    fn can_die(&self) -> bool {
        !self.player.immune && !self.reload_pending
    }

    fn load_map(
        &mut self,
        map: MapId,
        player: GridPosition,
        entities: Vec<EntityDescriptor>,
        out: &mut Vec<Event>,
    ) {
        if self.registry.has_flames() {
            out.push(Event::SoundCueStopped {
                cue: SoundCue::FlameTriggered,
            });
            out.push(Event::SoundCueStopped {
                cue: SoundCue::FlameActive,
            });
        }

        self.map = map;
        self.clock = Duration::ZERO;
        self.tick_index = 0;
        self.scheduler.clear();
        self.registry.clear();
        self.player = Player::at(player);
        self.reload_pending = false;

        let mut classified = 0;
        for descriptor in entities {
            let capabilities =
                Capabilities::from_annotations(descriptor.id, &descriptor.annotations);
            if self
                .registry
                .register(descriptor.id, descriptor.position, capabilities)
            {
                classified += 1;
            }
        }
        for index in 0..self.registry.spikes.len() {
            let id = self.registry.spikes[index];
            self.schedule_spike_join(id);
        }
        self.registry.recompute_push_offsets();

        log::info!(
            "map {} loaded with {classified} classified entities",
            map.get()
        );
        out.push(Event::MapLoaded { map, classified });
        self.refresh_highlights(out);
    }

    fn reload_entity(&mut self, id: EntityId, annotations: &[String], out: &mut Vec<Event>) {
        let Some(previous) = self.registry.remove(id) else {
            log::debug!("reload requested for unknown entity {}", id.get());
            return;
        };
        self.scheduler.cancel_entity(id);
        self.hand_over_spike_lead(&previous);
        self.tear_down_flame(&previous, out);

        let capabilities = Capabilities::from_annotations(id, annotations);
        if capabilities.pushable.is_none() {
            self.release_push(&previous);
        }
        let _ = self.registry.register(id, previous.position, capabilities);
        if let Some(record) = self.registry.get_mut(id) {
            record.motion = previous.motion;
            record.hover_icon = previous.hover_icon;
        }
        self.schedule_spike_join(id);
        self.registry.recompute_push_offsets();
    }

    fn remove_entity(&mut self, id: EntityId, out: &mut Vec<Event>) {
        let Some(previous) = self.registry.remove(id) else {
            return;
        };
        self.scheduler.cancel_entity(id);
        self.hand_over_spike_lead(&previous);
        self.tear_down_flame(&previous, out);
        self.release_push(&previous);
        self.registry.recompute_push_offsets();
    }

    fn tick(&mut self, dt: Duration, out: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        while let Some(fired) = self.scheduler.pop_due(self.clock) {
            self.run_action(fired, out);
        }

        self.advance_routes(out);

        self.tick_index = self.tick_index.saturating_add(1);
        if self.tick_index % self.config.flame_selection_interval.max(1) == 0 {
            self.select_flames();
        }

        self.resolve_pushes(out);
        self.update_spikes(out);
        self.update_conveyors(out);
        self.update_buttons(out);
        self.check_flames(out);
        self.update_boulders(out);
        self.update_pits(out);
        self.refresh_highlights(out);
    }

    fn advance_routes(&mut self, out: &mut Vec<Event>) {
        let timing = self.step_timing();

        if self.player.motion.advance(&mut self.player.position, timing) == Progress::Completed {
            self.finish_player_route(out);
        }

        let mut pushable_settled = false;
        for record in self.registry.records.values_mut() {
            if record.motion.advance(&mut record.position, timing) == Progress::Completed {
                pushable_settled |= record.capabilities.pushable.is_some();
                out.push(Event::RouteCompleted {
                    actor: ActorId::Entity(record.id),
                    position: record.position,
                });
            }
        }

        if pushable_settled {
            self.registry.recompute_push_offsets();
            self.player.pushing = false;
        }
    }

    fn finish_player_route(&mut self, out: &mut Vec<Event>) {
        log::trace!(
            "player route ended at ({}, {})",
            self.player.position.x,
            self.player.position.y
        );
        out.push(Event::RouteCompleted {
            actor: ActorId::Player,
            position: self.player.position,
        });
        if let Some(&cue) = SoundCue::CHESS_MOVES.choose(&mut self.rng) {
            out.push(Event::SoundCueRequested { cue });
        }
        self.player.immune = false;
        self.refresh_highlights(out);
    }

    fn request_move(&mut self, destination: GridPosition, out: &mut Vec<Event>) {
        let request = MoveRequest {
            origin: self.player.position,
            destination,
            pushing: self.player.pushing,
            moving: self.player.motion.is_executing(),
        };
        let view = self.registry.view();

        match self.movement.plan(self.move_mode, request, &view) {
            Ok(planned) => {
                self.player.immune = planned.immune;
                self.force_route(ActorId::Player, planned.route, out);
            }
            Err(MoveRejection::NoMoveMode) => {}
            Err(reason) => {
                log::debug!(
                    "move to ({}, {}) rejected: {reason}",
                    destination.x,
                    destination.y
                );
                out.push(Event::MoveRejected {
                    destination,
                    reason,
                });
            }
        }
    }

    /// Starts a route on an actor and asks the host to play it.
    fn force_route(&mut self, actor: ActorId, route: MoveRoute, out: &mut Vec<Event>) {
        if self.assign_route(actor, route.clone()) {
            out.push(Event::MoveRouteForced { actor, route });
        }
    }

    fn assign_route(&mut self, actor: ActorId, route: MoveRoute) -> bool {
        match actor {
            ActorId::Player => {
                self.player.motion.force(route);
                true
            }
            ActorId::Entity(id) => match self.registry.get_mut(id) {
                Some(record) => {
                    record.motion.force(route);
                    true
                }
                None => {
                    log::debug!("route ignored for unknown entity {}", id.get());
                    false
                }
            },
        }
    }

    fn sync_position(&mut self, actor: ActorId, position: GridPosition) {
        match actor {
            ActorId::Player => self.player.position = position,
            ActorId::Entity(id) => {
                if let Some(record) = self.registry.get_mut(id) {
                    record.position = position;
                    self.registry.recompute_push_offsets();
                }
            }
        }
    }

    fn write_flag(&self, entity: EntityId, slot: SwitchSlot, value: bool, out: &mut Vec<Event>) {
        out.push(Event::SelfSwitchWritten {
            map: self.map,
            entity,
            slot,
            value,
        });
    }

    fn kill_player(&mut self, hazard: Hazard, out: &mut Vec<Event>) {
        log::info!(
            "player killed by {hazard:?} at ({}, {})",
            self.player.position.x,
            self.player.position.y
        );
        out.push(Event::SoundCueRequested {
            cue: hazard.death_cue(),
        });
        out.push(Event::PlayerDied { hazard });
        out.push(Event::CommonEventReserved {
            id: self.config.load_common_event,
        });
        out.push(Event::SwitchesCleared);
        self.move_mode = None;
        self.reload_pending = true;
    }

    fn refresh_highlights(&mut self, out: &mut Vec<Event>) {
        if self.move_mode.is_none() {
            return;
        }
        let view = self.registry.view();
        self.highlighting.handle(
            self.move_mode,
            self.player.position,
            &view,
            &mut self.hover_scratch,
        );
        for assignment in self.hover_scratch.drain(..) {
            if let Some(record) = self.registry.records.get_mut(&assignment.entity) {
                record.hover_icon = assignment.icon;
            }
            out.push(Event::HoverIconChanged {
                entity: assignment.entity,
                icon: assignment.icon,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadMap {
            map,
            player,
            entities,
        } => world.load_map(map, player, entities, out_events),
        Command::ReloadEntity {
            entity,
            annotations,
        } => world.reload_entity(entity, &annotations, out_events),
        Command::RemoveEntity { entity } => world.remove_entity(entity, out_events),
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SetMoveMode { mode } => {
            world.move_mode = mode;
            world.refresh_highlights(out_events);
        }
        Command::RequestMove { destination } => world.request_move(destination, out_events),
        Command::ForceRoute { actor, route } => {
            let _ = world.assign_route(actor, route);
        }
        Command::SyncPosition { actor, position } => world.sync_position(actor, position),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{collections::BTreeSet, time::Duration};

    use super::{Capabilities, Config, MovementState, World};
    use underpromotion_core::{EntityId, EntityView, GridPosition, MapId, MoveMode, PlayerSnapshot};

    /// Captures the player's rule-relevant state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            moving: world.player.motion.is_executing(),
            pushing: world.player.pushing,
            immune: world.player.immune,
            through: world.player.motion.through(),
        }
    }

    /// Reports the player's route execution state.
    #[must_use]
    pub fn player_movement(world: &World) -> MovementState {
        world.player.motion.state()
    }

    /// Captures a read-only view of every entity on the map.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        world.registry.view()
    }

    /// Rule components attached to an entity.
    #[must_use]
    pub fn capabilities(world: &World, entity: EntityId) -> Option<&Capabilities> {
        world.registry.get(entity).map(|record| &record.capabilities)
    }

    /// Tile an entity currently occupies.
    #[must_use]
    pub fn entity_position(world: &World, entity: EntityId) -> Option<GridPosition> {
        world.registry.get(entity).map(|record| record.position)
    }

    /// Reports an entity's route execution state.
    #[must_use]
    pub fn entity_movement(world: &World, entity: EntityId) -> Option<MovementState> {
        world.registry.get(entity).map(|record| record.motion.state())
    }

    /// Tiles currently holding a wall or a closed gate.
    #[must_use]
    pub fn blocked_tiles(world: &World) -> BTreeSet<GridPosition> {
        world.registry.blocked_tiles()
    }

    /// Number of ticks simulated since the map loaded.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Virtual time elapsed since the map loaded.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of timers that have not fired yet.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.scheduler.len()
    }

    /// Piece the player currently moves as.
    #[must_use]
    pub fn move_mode(world: &World) -> Option<MoveMode> {
        world.move_mode
    }

    /// Map currently loaded.
    #[must_use]
    pub fn map(world: &World) -> MapId {
        world.map
    }

    /// Whether the player died and the host has not reloaded the map yet.
    #[must_use]
    pub fn reload_pending(world: &World) -> bool {
        world.reload_pending
    }

    /// Rule configuration the world runs with.
    #[must_use]
    pub fn config(world: &World) -> &Config {
        &world.config
    }
}
