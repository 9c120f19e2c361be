#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Underpromotion rules engine.
//!
//! This crate defines the message surface that connects a host, the
//! authoritative per-map rule state, and pure systems. Hosts submit
//! [`Command`] values describing map loads, simulation ticks and move
//! requests; the world executes those commands via its `apply` entry point
//! and broadcasts [`Event`] values that the host turns into forced move
//! routes, sound playback, self-switch writes and hover icons. Systems query
//! immutable snapshots such as [`EntityView`] and never mutate state directly.

mod annotation;

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use annotation::{parse_annotation, Annotation, AnnotationError};

/// Interval on which every joined spike flips between raised and lowered.
pub const SPIKE_TIMING: Duration = Duration::from_millis(2_000);

/// Number of ticks between two flame selection passes.
pub const FLAME_SELECTION_INTERVAL: u64 = 50;

/// Shortest delay before a selected flame finishes its pre-warning.
pub const FLAME_TRIGGER_DELAY_MIN: Duration = Duration::from_millis(1_000);

/// Longest delay before a selected flame finishes its pre-warning.
pub const FLAME_TRIGGER_DELAY_MAX: Duration = Duration::from_millis(3_000);

/// Delay between a flame starting to activate and bursting into fire.
pub const FLAME_ACTIVATION_DELAY: Duration = Duration::from_millis(3_000);

/// Time an active flame keeps burning before it extinguishes.
pub const FLAME_BURN_DURATION: Duration = Duration::from_millis(3_000);

/// Common event the host runs to reload the puzzle after the player dies.
pub const LOAD_COMMON_EVENT: u32 = 6;

/// Commands that express every request a host may submit to the rules engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards all rule state and classifies the entities of a freshly loaded map.
    LoadMap {
        /// Identifier of the map being entered.
        map: MapId,
        /// Tile the player occupies after the transfer.
        player: GridPosition,
        /// Entities placed on the map together with their annotations.
        entities: Vec<EntityDescriptor>,
    },
    /// Rebuilds the capabilities of a single entity after its page changed.
    ReloadEntity {
        /// Entity whose behaviour page was reloaded.
        entity: EntityId,
        /// Annotations attached to the new page.
        annotations: Vec<String>,
    },
    /// Removes an erased entity from every rule collection.
    RemoveEntity {
        /// Entity erased by the host.
        entity: EntityId,
    },
    /// Advances the simulation by one host frame.
    Tick {
        /// Wall-clock time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Selects the piece the player currently moves as, if any.
    SetMoveMode {
        /// Active piece, or `None` when no chess movement is enabled.
        mode: Option<MoveMode>,
    },
    /// Requests that the player move to the provided destination tile.
    RequestMove {
        /// Tile the player selected as destination.
        destination: GridPosition,
    },
    /// Forces an arbitrary host-authored route on an actor.
    ForceRoute {
        /// Actor that should execute the route.
        actor: ActorId,
        /// Route the actor should follow.
        route: MoveRoute,
    },
    /// Overrides the logical position of an actor, e.g. after a host transfer.
    SyncPosition {
        /// Actor whose position changed outside the rules engine.
        actor: ActorId,
        /// New tile occupied by the actor.
        position: GridPosition,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a map finished classification.
    MapLoaded {
        /// Identifier of the loaded map.
        map: MapId,
        /// Number of entities that carry at least one capability.
        classified: usize,
    },
    /// Requests that the host play a forced move route for an actor.
    MoveRouteForced {
        /// Actor executing the route.
        actor: ActorId,
        /// Route to play.
        route: MoveRoute,
    },
    /// Reports that a step was spliced into an actor's running route.
    RouteStepInserted {
        /// Actor whose route was amended.
        actor: ActorId,
        /// Index of the inserted step within the route.
        index: usize,
        /// Step that was inserted.
        step: RouteStep,
    },
    /// Confirms that an actor finished or abandoned its forced route.
    RouteCompleted {
        /// Actor whose route ended.
        actor: ActorId,
        /// Tile the actor occupies after the route.
        position: GridPosition,
    },
    /// Reports that a move request was refused.
    MoveRejected {
        /// Destination that was requested.
        destination: GridPosition,
        /// Reason the move was refused.
        reason: MoveRejection,
    },
    /// Requests playback of a sound cue.
    SoundCueRequested {
        /// Cue to play.
        cue: SoundCue,
    },
    /// Requests that every playing instance of a cue stops.
    SoundCueStopped {
        /// Cue to silence.
        cue: SoundCue,
    },
    /// Requests that the host persist a self switch for an entity.
    SelfSwitchWritten {
        /// Map owning the entity.
        map: MapId,
        /// Entity owning the switch.
        entity: EntityId,
        /// Switch slot being written.
        slot: SwitchSlot,
        /// Value written into the slot.
        value: bool,
    },
    /// Requests that the host swap the sprite shown for an entity.
    EntityImageChanged {
        /// Entity whose sprite changes.
        entity: EntityId,
        /// Sprite to display.
        image: EntityImage,
    },
    /// Reports that the hover icon advertised for an entity changed.
    HoverIconChanged {
        /// Entity whose icon changed.
        entity: EntityId,
        /// New icon, or `None` when the entity is no longer a legal target.
        icon: Option<HoverIcon>,
    },
    /// Reports that a hazard killed the player.
    PlayerDied {
        /// Hazard responsible for the death.
        hazard: Hazard,
    },
    /// Requests that the host reserve a common event.
    CommonEventReserved {
        /// Identifier of the common event to run.
        id: u32,
    },
    /// Requests that the host clears every game switch.
    SwitchesCleared,
}

/// Piece the player currently moves as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveMode {
    /// Diagonal sliding moves.
    Bishop,
    /// Orthogonal sliding moves.
    Rook,
    /// L-shaped jumps.
    Knight,
}

/// Tile coordinate on the host map. The host defines the map bounds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPosition {
    /// Column index, growing to the right.
    pub x: i32,
    /// Row index, growing downward.
    pub y: i32,
}

impl GridPosition {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring tile in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Returns the tile displaced by an arbitrary offset.
    #[must_use]
    pub const fn offset_by(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Unit offset pointing from `self` towards `other` on each axis.
    #[must_use]
    pub const fn signum_towards(self, other: GridPosition) -> (i32, i32) {
        ((other.x - self.x).signum(), (other.y - self.y).signum())
    }

    /// Chebyshev distance between two positions.
    #[must_use]
    pub fn chebyshev_distance(self, other: GridPosition) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Reports whether both positions lie on a common diagonal and differ.
    #[must_use]
    pub fn is_diagonal_to(self, other: GridPosition) -> bool {
        self != other && self.x.abs_diff(other.x) == self.y.abs_diff(other.y)
    }

    /// Reports whether both positions share exactly one axis.
    #[must_use]
    pub fn shares_axis_with(self, other: GridPosition) -> bool {
        (self.x == other.x) != (self.y == other.y)
    }

    /// Reports whether `other` is one of the eight surrounding tiles.
    #[must_use]
    pub fn is_adjacent_to(self, other: GridPosition) -> bool {
        self.chebyshev_distance(other) == 1
    }
}

/// Movement directions available to forced routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards decreasing rows.
    Up,
    /// Towards increasing rows.
    Down,
    /// Towards decreasing columns.
    Left,
    /// Towards increasing columns.
    Right,
    /// Down and to the left.
    LowerLeft,
    /// Down and to the right.
    LowerRight,
    /// Up and to the left.
    UpperLeft,
    /// Up and to the right.
    UpperRight,
}

impl Direction {
    /// All directions in canonical scan order.
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::LowerLeft,
        Direction::LowerRight,
        Direction::UpperLeft,
        Direction::UpperRight,
    ];

    /// Unit tile offset travelled by one step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::LowerLeft => (-1, 1),
            Self::LowerRight => (1, 1),
            Self::UpperLeft => (-1, -1),
            Self::UpperRight => (1, -1),
        }
    }

    /// Resolves a unit offset back into a direction.
    #[must_use]
    pub const fn from_offset(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Self::Up),
            (0, 1) => Some(Self::Down),
            (-1, 0) => Some(Self::Left),
            (1, 0) => Some(Self::Right),
            (-1, 1) => Some(Self::LowerLeft),
            (1, 1) => Some(Self::LowerRight),
            (-1, -1) => Some(Self::UpperLeft),
            (1, -1) => Some(Self::UpperRight),
            _ => None,
        }
    }

    /// Parses the cardinal tokens accepted by annotations.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Reports whether the direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        let (dx, dy) = self.offset();
        dx != 0 && dy != 0
    }
}

/// Host-assigned identifier of a map entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Host-assigned identifier of a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(u32);

impl MapId {
    /// Creates a new map identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Anything able to execute a forced move route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActorId {
    /// The player character.
    Player,
    /// A map entity.
    Entity(EntityId),
}

/// Entity placed on a map together with its free-text annotations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Identifier assigned by the host.
    pub id: EntityId,
    /// Tile the entity occupies when the map loads.
    pub position: GridPosition,
    /// Annotations found on the entity's active page.
    #[serde(default)]
    pub annotations: Vec<String>,
}

/// Single instruction of a forced move route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteStep {
    /// Lets the actor ignore collision until switched off.
    ThroughOn,
    /// Restores normal collision.
    ThroughOff,
    /// Moves one tile in the given direction.
    Step(Direction),
    /// Jumps by the given tile offset; `(0, 0)` jumps in place.
    Jump {
        /// Horizontal displacement in tiles.
        dx: i32,
        /// Vertical displacement in tiles.
        dy: i32,
    },
}

impl RouteStep {
    /// Direction travelled by a single-tile step, if this is one.
    #[must_use]
    pub const fn direction(&self) -> Option<Direction> {
        match self {
            Self::Step(direction) => Some(*direction),
            _ => None,
        }
    }
}

/// Uninterruptible, collision-suppressed route the host plays frame by frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MoveRoute {
    steps: Vec<RouteStep>,
    wait: bool,
}

impl MoveRoute {
    /// Creates a route from the provided steps.
    #[must_use]
    pub fn new(steps: Vec<RouteStep>, wait: bool) -> Self {
        Self { steps, wait }
    }

    /// Steps of the route in execution order.
    #[must_use]
    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Whether the host should suspend its own interpreter while the route plays.
    #[must_use]
    pub const fn wait(&self) -> bool {
        self.wait
    }

    /// First directional step of the route, used to infer push direction.
    #[must_use]
    pub fn first_direction(&self) -> Option<Direction> {
        self.steps.iter().find_map(RouteStep::direction)
    }

    /// Number of steps that displace the actor.
    #[must_use]
    pub fn movement_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, RouteStep::Step(_) | RouteStep::Jump { .. }))
            .count()
    }

    /// Splices a step into the route at the provided index.
    pub fn insert(&mut self, index: usize, step: RouteStep) {
        let index = index.min(self.steps.len());
        self.steps.insert(index, step);
    }
}

/// Sound cues the engine asks the host to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Player impaled on a raised spike.
    SpikeDeath,
    /// First chess movement variation.
    ChessMove1,
    /// Second chess movement variation.
    ChessMove2,
    /// Third chess movement variation.
    ChessMove3,
    /// A pit collapsed behind the player.
    PitOpen,
    /// Player fell into an open pit.
    PitFall,
    /// Player burned by an active flame.
    FireBurn,
    /// A flame finished its pre-warning.
    FlameTriggered,
    /// A flame burst into fire.
    FlameActive,
    /// A pushable block slid.
    Pushing,
    /// Player crushed by a boulder.
    BoulderDeath,
    /// Spikes raised.
    SpikeOn,
    /// Spikes lowered.
    SpikeOff,
    /// A button was pressed.
    ButtonSwitch,
    /// A hold button was released.
    ButtonOff,
    /// A gate changed state.
    GateOpen,
}

impl SoundCue {
    /// The three interchangeable movement cues.
    pub const CHESS_MOVES: [SoundCue; 3] =
        [SoundCue::ChessMove1, SoundCue::ChessMove2, SoundCue::ChessMove3];

    /// Asset name of the cue.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SpikeDeath => "spikeDEATH",
            Self::ChessMove1 => "chessMOVEMENT",
            Self::ChessMove2 => "chessMOVEMENT2",
            Self::ChessMove3 => "chessMOVEMENT3",
            Self::PitOpen => "pitOPEN",
            Self::PitFall => "pitFALL",
            Self::FireBurn => "fireBURN",
            Self::FlameTriggered => "flameTRIGGERED",
            Self::FlameActive => "flameACTIVE",
            Self::Pushing => "Earth4",
            Self::BoulderDeath => "boulderDEATH",
            Self::SpikeOn => "spikeON",
            Self::SpikeOff => "spikeOFF",
            Self::ButtonSwitch => "buttonSWITCH",
            Self::ButtonOff => "buttonOFF",
            Self::GateOpen => "Open2",
        }
    }

    /// Playback volume in percent.
    #[must_use]
    pub const fn volume(self) -> u8 {
        match self {
            Self::ChessMove1 | Self::ChessMove2 | Self::ChessMove3 => 90,
            Self::PitOpen | Self::SpikeOn | Self::SpikeOff => 40,
            Self::FlameTriggered => 30,
            Self::FlameActive | Self::ButtonSwitch | Self::ButtonOff => 70,
            Self::Pushing => 20,
            Self::GateOpen => 60,
            Self::SpikeDeath | Self::PitFall | Self::FireBurn | Self::BoulderDeath => 100,
        }
    }

    /// Playback pitch in percent.
    #[must_use]
    pub const fn pitch(self) -> u8 {
        match self {
            Self::PitOpen | Self::FlameTriggered | Self::FlameActive | Self::ButtonSwitch => 110,
            Self::Pushing | Self::BoulderDeath => 140,
            Self::SpikeOn => 120,
            Self::SpikeOff => 80,
            Self::ButtonOff => 90,
            _ => 100,
        }
    }
}

/// Icons advertised on legal move targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HoverIcon {
    /// Plain walkable destination.
    Walk,
    /// Destination holds a block that would be pushed.
    Push,
    /// Destination is currently lethal.
    Danger,
    /// Destination is a conveyor.
    Conveyor,
    /// Destination leaves the puzzle.
    Exit,
    /// Destination presses an unpressed button.
    Button,
}

impl HoverIcon {
    /// Index of the icon within the host's icon sheet.
    #[must_use]
    pub const fn icon_index(self) -> u32 {
        match self {
            Self::Walk => 31,
            Self::Push => 77,
            Self::Danger => 1,
            Self::Conveyor => 82,
            Self::Exit => 72,
            Self::Button => 74,
        }
    }
}

/// Self-switch slot persisted by the host per entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwitchSlot {
    /// Slot `A`.
    A,
    /// Slot `B`.
    B,
    /// Slot `C`.
    C,
    /// Slot `D`.
    D,
}

impl SwitchSlot {
    /// Slot that records a gate reaching the provided open state (1 through 4).
    #[must_use]
    pub const fn for_gate_state(state: u8) -> Option<Self> {
        match state {
            1 => Some(Self::A),
            2 => Some(Self::B),
            3 => Some(Self::C),
            4 => Some(Self::D),
            _ => None,
        }
    }
}

/// Letter group linking buttons to gates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    /// Group `A`.
    A,
    /// Group `B`.
    B,
    /// Group `C`.
    C,
    /// Group `D`.
    D,
}

impl Group {
    /// Parses a case-insensitive group letter.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            "c" => Some(Self::C),
            "d" => Some(Self::D),
            _ => None,
        }
    }
}

/// Lifecycle of a flame trap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FlamePhase {
    /// Dormant and harmless.
    #[default]
    Idle,
    /// Selected; the pre-warning timer is running.
    Triggering,
    /// Pre-warning visible; waiting to activate.
    Triggered,
    /// Activation timer running.
    Activating,
    /// Burning and lethal.
    Active,
}

/// Hazards able to kill the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hazard {
    /// Raised spike.
    Spike,
    /// Active flame.
    Flame,
    /// Opened pit.
    Pit,
    /// Boulder.
    Boulder,
}

impl Hazard {
    /// Cue played when this hazard kills the player.
    #[must_use]
    pub const fn death_cue(self) -> SoundCue {
        match self {
            Self::Spike => SoundCue::SpikeDeath,
            Self::Flame => SoundCue::FireBurn,
            Self::Pit => SoundCue::PitFall,
            Self::Boulder => SoundCue::BoulderDeath,
        }
    }
}

/// Sprites the engine asks the host to show for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityImage {
    /// Flame pre-warning flare.
    SunFlare,
    /// Burning flame.
    Fire,
    /// No character sprite.
    Cleared,
    /// Scorched floor tile left behind by an extinguished flame.
    ScorchedTile,
}

/// Reasons a move request may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum MoveRejection {
    /// No piece is selected, so chess movement is disabled.
    #[error("no move mode is active")]
    NoMoveMode,
    /// The player is still pushing a block.
    #[error("mover is mid-push")]
    MoverPushing,
    /// The player is still executing a forced route.
    #[error("mover is already moving")]
    MoverBusy,
    /// The destination is not reachable with the active piece's geometry.
    #[error("destination is not on a {0:?} path")]
    NotOnPath(MoveMode),
    /// The destination tile itself is blocked.
    #[error("destination tile is blocked")]
    DestinationBlocked,
    /// A blocking entity lies between origin and destination.
    #[error("line of sight is blocked")]
    LineOfSightBlocked,
}

/// Immutable representation of a single entity's rule-relevant state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySnapshot {
    /// Identifier assigned by the host.
    pub id: EntityId,
    /// Tile currently occupied.
    pub position: GridPosition,
    /// Whether the entity is a wall.
    pub wall: bool,
    /// Open state of a gate, `None` for non-gates.
    pub gate_open: Option<bool>,
    /// Blocked push directions of a pushable, `None` for non-pushables.
    pub pushable: Option<Vec<Direction>>,
    /// Direction of a conveyor, `None` for non-conveyors.
    pub conveyor: Option<Direction>,
    /// Whether the entity is an exit.
    pub exit: bool,
    /// Whether touching the entity currently kills the player.
    pub deadly: bool,
    /// Activation state of a button, `None` for non-buttons.
    pub button_activated: Option<bool>,
    /// Icon currently advertised for the entity.
    pub hover_icon: Option<HoverIcon>,
}

impl EntitySnapshot {
    /// Creates a snapshot without any capability attached.
    #[must_use]
    pub const fn plain(id: EntityId, position: GridPosition) -> Self {
        Self {
            id,
            position,
            wall: false,
            gate_open: None,
            pushable: None,
            conveyor: None,
            exit: false,
            deadly: false,
            button_activated: None,
            hover_icon: None,
        }
    }

    /// Reports whether the entity currently renders its tile impassable.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.wall || self.gate_open == Some(false)
    }

    /// Reports whether a push in the provided direction is refused.
    #[must_use]
    pub fn refuses_push(&self, direction: Direction) -> bool {
        self.pushable
            .as_ref()
            .is_some_and(|invalid| invalid.contains(&direction))
    }
}

/// Read-only snapshot describing every entity on the map.
///
/// Snapshots are indexed by tile on construction, so per-tile lookups do not
/// scan the whole map.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
    by_tile: BTreeMap<GridPosition, Vec<usize>>,
    blocked: BTreeSet<GridPosition>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);

        let mut by_tile: BTreeMap<GridPosition, Vec<usize>> = BTreeMap::new();
        let mut blocked = BTreeSet::new();
        for (index, snapshot) in snapshots.iter().enumerate() {
            by_tile.entry(snapshot.position).or_default().push(index);
            if snapshot.is_blocking() {
                let _ = blocked.insert(snapshot.position);
            }
        }

        Self {
            snapshots,
            by_tile,
            blocked,
        }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Iterator over the entities standing on the provided tile, by id.
    pub fn at(&self, position: GridPosition) -> impl Iterator<Item = &EntitySnapshot> {
        self.by_tile
            .get(&position)
            .into_iter()
            .flatten()
            .filter_map(|index| self.snapshots.get(*index))
    }

    /// Reports whether a wall or closed gate occupies the tile.
    #[must_use]
    pub fn is_blocked(&self, position: GridPosition) -> bool {
        self.blocked.contains(&position)
    }

    /// Tiles occupied by a wall or closed gate, in ascending order.
    pub fn blocked_tiles(&self) -> impl Iterator<Item = GridPosition> + '_ {
        self.blocked.iter().copied()
    }
}

/// Immutable representation of the player's rule-relevant state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// Tile currently occupied.
    pub position: GridPosition,
    /// Whether a forced route is executing.
    pub moving: bool,
    /// Whether a push started by the player is still resolving.
    pub pushing: bool,
    /// Whether hazards currently ignore the player.
    pub immune: bool,
    /// Whether collision is currently suppressed.
    pub through: bool,
}
