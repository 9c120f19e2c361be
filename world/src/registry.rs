//! Tile classification: annotations become typed capabilities in per-kind collections.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use underpromotion_core::{
    parse_annotation, Annotation, Direction, EntityId, EntitySnapshot, EntityView, FlamePhase,
    GridPosition, Group, HoverIcon,
};

use crate::motion::Motion;

/// Rule components attached to an entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Impassable tile.
    pub wall: bool,
    /// Timed spike.
    pub spike: Option<SpikeState>,
    /// Collapsing pit.
    pub pit: Option<PitState>,
    /// Flame trap.
    pub flame: Option<FlameState>,
    /// Conveyor direction.
    pub conveyor: Option<Direction>,
    /// Floor button.
    pub button: Option<ButtonState>,
    /// Gate opened by buttons.
    pub gate: Option<GateState>,
    /// Deadly boulder.
    pub boulder: Option<BoulderState>,
    /// Block the player can push.
    pub pushable: Option<PushableState>,
    /// Puzzle exit.
    pub exit: bool,
}

impl Capabilities {
    /// Builds capabilities from annotation texts, skipping the ones that do not parse.
    #[must_use]
    pub fn from_annotations<S: AsRef<str>>(entity: EntityId, annotations: &[S]) -> Self {
        let mut capabilities = Self::default();
        for text in annotations {
            match parse_annotation(text.as_ref()) {
                Ok(annotation) => capabilities.attach(annotation),
                Err(error) => {
                    log::debug!("entity {} ignores annotation: {error}", entity.get());
                }
            }
        }
        capabilities
    }

    /// Reports whether no rule applies to the entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reports whether the entity currently blocks passage.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.wall || self.gate.is_some_and(|gate| !gate.is_open())
    }

    /// Reports whether the entity is currently lethal to touch.
    #[must_use]
    pub fn is_deadly(&self) -> bool {
        self.spike.is_some_and(|spike| spike.is_raised())
            || self
                .flame
                .is_some_and(|flame| flame.phase == FlamePhase::Active)
            || self.pit.is_some_and(|pit| pit.activated)
            || self.boulder.is_some()
    }

    fn attach(&mut self, annotation: Annotation) {
        match annotation {
            Annotation::Wall => self.wall = true,
            Annotation::Spike {
                initial_delay,
                start_down,
            } => self.spike = Some(SpikeState::new(initial_delay, start_down)),
            Annotation::Pit => self.pit = Some(PitState::default()),
            Annotation::Conveyor(direction) => self.conveyor = Some(direction),
            Annotation::Flame { group } => {
                self.flame = Some(FlameState {
                    group,
                    phase: FlamePhase::Idle,
                    lethal_contact: false,
                });
            }
            Annotation::Button { group, hold } => {
                self.button = Some(ButtonState {
                    activated: false,
                    group,
                    hold,
                });
            }
            Annotation::Gate { group, required } => {
                self.gate = Some(GateState {
                    state: 0,
                    group,
                    required,
                });
            }
            Annotation::Boulder { heading } => {
                self.boulder = Some(BoulderState {
                    heading,
                    touching_redirector: false,
                    lethal_contact: false,
                });
            }
            Annotation::Pushable { redirection } => {
                self.pushable = Some(PushableState {
                    redirection,
                    invalid_offsets: Vec::new(),
                });
            }
            Annotation::Exit => self.exit = true,
        }
    }
}

/// Spike cycling with every other spike of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpikeState {
    /// Whether the spike is raised.
    pub active: bool,
    /// Inverts the persisted flag for spikes that start lowered.
    pub opposite: bool,
    /// Whether a toggle timer is pending.
    pub scheduled: bool,
    /// Whether the spike joined the shared cycle.
    pub joined: bool,
    /// Whether this spike plays the shared on/off cue for its delay.
    pub audio_leader: bool,
    /// Delay before the spike joined the cycle.
    pub initial_delay: Duration,
    /// Latched once the spike killed the player during the current contact.
    pub lethal_contact: bool,
}

impl SpikeState {
    const fn new(initial_delay: Duration, start_down: bool) -> Self {
        Self {
            active: !start_down,
            opposite: start_down,
            scheduled: false,
            joined: false,
            audio_leader: false,
            initial_delay,
            lethal_contact: false,
        }
    }

    /// Reports whether the spike can currently kill.
    #[must_use]
    pub const fn is_raised(&self) -> bool {
        self.joined && self.active
    }
}

/// Pit that collapses once the player walks off it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PitState {
    /// Whether the pit collapsed; never reverts until the map reloads.
    pub activated: bool,
    /// Whether the player stood on the pit during the previous tick.
    pub player_present: bool,
    /// Latched once the pit killed the player during the current contact.
    pub lethal_contact: bool,
}

/// Flame trap cycling within its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlameState {
    /// Group sharing the exclusive cycle.
    pub group: u8,
    /// Current lifecycle phase.
    pub phase: FlamePhase,
    /// Latched once the flame killed the player during the current contact.
    pub lethal_contact: bool,
}

/// Floor button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonState {
    /// Whether the button is pressed.
    pub activated: bool,
    /// Gates driven by the button.
    pub group: Group,
    /// Whether releasing the button undoes its effect.
    pub hold: bool,
}

/// Gate opened by pressed buttons of its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateState {
    /// Number of presses received.
    pub state: u8,
    /// Group the gate listens to.
    pub group: Group,
    /// Presses needed to open the gate.
    pub required: u8,
}

impl GateState {
    /// Reports whether the gate lets the player through.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.state >= self.required
    }
}

/// Boulder rolling along a host-authored route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoulderState {
    /// Heading declared by the annotation.
    pub heading: Option<Direction>,
    /// Whether a redirecting pushable shared the tile last tick.
    pub touching_redirector: bool,
    /// Latched once the boulder killed the player during the current contact.
    pub lethal_contact: bool,
}

/// Block the player can push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushableState {
    /// Redirection applied to boulders meeting the block.
    pub redirection: Option<Direction>,
    /// Directions the block cannot slide towards.
    pub invalid_offsets: Vec<Direction>,
}

/// Rule state of a single classified entity.
#[derive(Clone, Debug)]
pub(crate) struct EntityRecord {
    pub(crate) id: EntityId,
    pub(crate) position: GridPosition,
    pub(crate) motion: Motion,
    pub(crate) capabilities: Capabilities,
    pub(crate) hover_icon: Option<HoverIcon>,
}

impl EntityRecord {
    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        let capabilities = &self.capabilities;
        EntitySnapshot {
            id: self.id,
            position: self.position,
            wall: capabilities.wall,
            gate_open: capabilities.gate.map(|gate| gate.is_open()),
            pushable: capabilities
                .pushable
                .as_ref()
                .map(|pushable| pushable.invalid_offsets.clone()),
            conveyor: capabilities.conveyor,
            exit: capabilities.exit,
            deadly: capabilities.is_deadly(),
            button_activated: capabilities.button.map(|button| button.activated),
            hover_icon: self.hover_icon,
        }
    }
}

/// Entities of the current map grouped by capability, in registration order.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    pub(crate) records: BTreeMap<EntityId, EntityRecord>,
    pub(crate) walls: Vec<EntityId>,
    pub(crate) spikes: Vec<EntityId>,
    pub(crate) pits: Vec<EntityId>,
    pub(crate) conveyors: Vec<EntityId>,
    pub(crate) flame_groups: BTreeMap<u8, Vec<EntityId>>,
    pub(crate) buttons: Vec<EntityId>,
    pub(crate) gates: Vec<EntityId>,
    pub(crate) boulders: Vec<EntityId>,
    pub(crate) pushables: Vec<EntityId>,
}

impl Registry {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Registers an entity and reports whether any rule applies to it.
    pub(crate) fn register(
        &mut self,
        id: EntityId,
        position: GridPosition,
        capabilities: Capabilities,
    ) -> bool {
        let _ = self.remove(id);
        let classified = !capabilities.is_empty();

        if capabilities.wall {
            self.walls.push(id);
        }
        if capabilities.spike.is_some() {
            self.spikes.push(id);
        }
        if capabilities.pit.is_some() {
            self.pits.push(id);
        }
        if capabilities.conveyor.is_some() {
            self.conveyors.push(id);
        }
        if let Some(flame) = capabilities.flame {
            self.flame_groups.entry(flame.group).or_default().push(id);
        }
        if capabilities.button.is_some() {
            self.buttons.push(id);
        }
        if capabilities.gate.is_some() {
            self.gates.push(id);
        }
        if capabilities.boulder.is_some() {
            self.boulders.push(id);
        }
        if capabilities.pushable.is_some() {
            self.pushables.push(id);
        }

        let _ = self.records.insert(
            id,
            EntityRecord {
                id,
                position,
                motion: Motion::default(),
                capabilities,
                hover_icon: None,
            },
        );
        classified
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityRecord> {
        let record = self.records.remove(&id)?;
        for ids in [
            &mut self.walls,
            &mut self.spikes,
            &mut self.pits,
            &mut self.conveyors,
            &mut self.buttons,
            &mut self.gates,
            &mut self.boulders,
            &mut self.pushables,
        ] {
            ids.retain(|candidate| *candidate != id);
        }
        self.flame_groups.retain(|_, members| {
            members.retain(|candidate| *candidate != id);
            !members.is_empty()
        });
        Some(record)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.records.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.records.get_mut(&id)
    }

    pub(crate) fn has_flames(&self) -> bool {
        !self.flame_groups.is_empty()
    }

    pub(crate) fn view(&self) -> EntityView {
        EntityView::from_snapshots(self.records.values().map(EntityRecord::snapshot).collect())
    }

    /// Tiles holding a wall or a closed gate.
    pub(crate) fn blocked_tiles(&self) -> BTreeSet<GridPosition> {
        self.walls
            .iter()
            .chain(self.gates.iter())
            .filter_map(|id| self.records.get(id))
            .filter(|record| record.capabilities.is_blocking())
            .map(|record| record.position)
            .collect()
    }

    /// Marks, for every pushable, the neighbours it cannot slide into.
    pub(crate) fn recompute_push_offsets(&mut self) {
        let blocked = self.blocked_tiles();
        for id in &self.pushables {
            let Some(record) = self.records.get_mut(id) else {
                continue;
            };
            let position = record.position;
            if let Some(pushable) = record.capabilities.pushable.as_mut() {
                pushable.invalid_offsets = Direction::ALL
                    .into_iter()
                    .filter(|direction| blocked.contains(&position.step(*direction)))
                    .collect();
            }
        }
    }
}
