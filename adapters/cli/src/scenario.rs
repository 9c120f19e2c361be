//! TOML puzzle scenarios replayed against the rules engine.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use underpromotion_core::{
    Command, EntityDescriptor, Event, GridPosition, Hazard, HoverIcon, MapId, MoveMode,
};
use underpromotion_world::{apply, query, Config, World};

const DEFAULT_FRAME_MS: u64 = 16;

/// Puzzle map together with the input script to replay on it.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_map")]
    map: u32,
    #[serde(default)]
    rules: Config,
    player: GridPosition,
    #[serde(default)]
    entities: Vec<EntityDescriptor>,
    #[serde(default)]
    script: Vec<ScriptStep>,
}

fn default_map() -> u32 {
    1
}

fn default_count() -> u32 {
    1
}

fn default_frame_ms() -> u64 {
    DEFAULT_FRAME_MS
}

/// Single host input of a scenario script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub(crate) enum ScriptStep {
    /// Advances the simulation by `count` frames of `dt_ms` each.
    Tick {
        #[serde(default = "default_count")]
        count: u32,
        #[serde(default = "default_frame_ms")]
        dt_ms: u64,
    },
    /// Selects the piece the player moves as; omit `piece` to disable movement.
    Mode {
        #[serde(default)]
        piece: Option<MoveMode>,
    },
    /// Requests a player move to a tile.
    Move { x: i32, y: i32 },
}

/// Outcome of a replayed scenario.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) events: usize,
    pub(crate) rejected_moves: usize,
    pub(crate) deaths: Vec<Hazard>,
    pub(crate) player: GridPosition,
    pub(crate) ticks: u64,
}

impl Scenario {
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load scenario {}", path.display()))
    }

    pub(crate) fn from_toml_str(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        scenario.rules.validate().context("invalid [rules] table")?;
        Ok(scenario)
    }

    fn commands(&self) -> Vec<Command> {
        let mut commands = vec![Command::LoadMap {
            map: MapId::new(self.map),
            player: self.player,
            entities: self.entities.clone(),
        }];
        for step in &self.script {
            match *step {
                ScriptStep::Tick { count, dt_ms } => {
                    let dt = Duration::from_millis(dt_ms);
                    commands.extend((0..count).map(|_| Command::Tick { dt }));
                }
                ScriptStep::Mode { piece } => commands.push(Command::SetMoveMode { mode: piece }),
                ScriptStep::Move { x, y } => commands.push(Command::RequestMove {
                    destination: GridPosition::new(x, y),
                }),
            }
        }
        commands
    }

    /// Replays the script on a fresh world, logging every emitted event.
    pub(crate) fn run(&self) -> Summary {
        let mut world = World::new(self.rules.clone());
        let mut summary = Summary {
            events: 0,
            rejected_moves: 0,
            deaths: Vec::new(),
            player: self.player,
            ticks: 0,
        };
        let mut events = Vec::new();

        for command in self.commands() {
            log::trace!("applying {command:?}");
            apply(&mut world, command, &mut events);
            for event in events.drain(..) {
                log_event(&event);
                summary.events += 1;
                match event {
                    Event::MoveRejected { .. } => summary.rejected_moves += 1,
                    Event::PlayerDied { hazard } => summary.deaths.push(hazard),
                    _ => {}
                }
            }
        }

        summary.player = query::player(&world).position;
        summary.ticks = query::tick_index(&world);
        summary
    }
}

fn log_event(event: &Event) {
    match event {
        Event::SoundCueRequested { cue } => log::info!(
            "play {} (volume {}, pitch {})",
            cue.name(),
            cue.volume(),
            cue.pitch()
        ),
        Event::SoundCueStopped { cue } => log::info!("stop {}", cue.name()),
        Event::HoverIconChanged { entity, icon } => log::debug!(
            "entity {} icon {:?}",
            entity.get(),
            icon.map(HoverIcon::icon_index)
        ),
        _ => log::info!("{event:?}"),
    }
}
