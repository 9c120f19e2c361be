#![allow(dead_code)]

use std::time::Duration;

use underpromotion_core::{
    ActorId, Command, EntityDescriptor, EntityId, Event, GridPosition, MapId, MoveMode, SoundCue,
};
use underpromotion_world::{apply, Config, World};

pub const FRAME: Duration = Duration::from_millis(16);

pub fn entity(id: u32, x: i32, y: i32, annotations: &[&str]) -> EntityDescriptor {
    EntityDescriptor {
        id: EntityId::new(id),
        position: GridPosition::new(x, y),
        annotations: annotations.iter().map(|text| (*text).to_owned()).collect(),
    }
}

pub struct Harness {
    pub world: World,
}

impl Harness {
    pub fn with_config(config: Config) -> Self {
        Self {
            world: World::new(config),
        }
    }

    pub fn loaded(player: (i32, i32), entities: Vec<EntityDescriptor>) -> (Self, Vec<Event>) {
        let mut harness = Self::with_config(Config::default());
        let events = harness.load(player, entities);
        (harness, events)
    }

    pub fn load(&mut self, player: (i32, i32), entities: Vec<EntityDescriptor>) -> Vec<Event> {
        self.apply(Command::LoadMap {
            map: MapId::new(1),
            player: GridPosition::new(player.0, player.1),
            entities,
        })
    }

    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(&mut self.world, command, &mut events);
        events
    }

    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_by(FRAME)
    }

    pub fn tick_by(&mut self, dt: Duration) -> Vec<Event> {
        self.apply(Command::Tick { dt })
    }

    pub fn ticks(&mut self, count: usize) -> Vec<Event> {
        (0..count).flat_map(|_| self.tick()).collect()
    }

    pub fn mode(&mut self, mode: MoveMode) -> Vec<Event> {
        self.apply(Command::SetMoveMode { mode: Some(mode) })
    }

    pub fn request(&mut self, x: i32, y: i32) -> Vec<Event> {
        self.apply(Command::RequestMove {
            destination: GridPosition::new(x, y),
        })
    }

    pub fn place_player(&mut self, x: i32, y: i32) -> Vec<Event> {
        self.apply(Command::SyncPosition {
            actor: ActorId::Player,
            position: GridPosition::new(x, y),
        })
    }
}

pub fn cues(events: &[Event]) -> Vec<SoundCue> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::SoundCueRequested { cue } => Some(*cue),
            _ => None,
        })
        .collect()
}

pub fn count_cue(events: &[Event], cue: SoundCue) -> usize {
    cues(events).into_iter().filter(|played| *played == cue).count()
}

pub fn deaths(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::PlayerDied { .. }))
        .count()
}
