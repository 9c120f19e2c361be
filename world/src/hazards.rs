//! Spike, flame and pit state machines.

use std::{collections::BTreeMap, time::Duration};

use rand::{seq::SliceRandom, Rng};
use underpromotion_core::{EntityId, EntityImage, Event, FlamePhase, Hazard, SoundCue, SwitchSlot};

use crate::{
    registry::EntityRecord,
    scheduler::{Action, Fired},
    World,
};

fn flame_phase(records: &BTreeMap<EntityId, EntityRecord>, id: &EntityId) -> Option<FlamePhase> {
    records
        .get(id)
        .and_then(|record| record.capabilities.flame)
        .map(|flame| flame.phase)
}

/// Tracks a hazard's lethal contact and reports whether it must kill now.
///
/// A contact kills at most once; the latch resets when the contact ends.
pub(crate) fn contact(latch: &mut bool, lethal: bool, can_die: bool) -> bool {
    if !lethal {
        *latch = false;
        return false;
    }
    if *latch || !can_die {
        return false;
    }
    *latch = true;
    true
}

impl World {
    pub(crate) fn run_action(&mut self, fired: Fired, out: &mut Vec<Event>) {
        log::debug!("timer {:?} fired at {:?}", fired.action, fired.due);
        match fired.action {
            Action::SpikeJoin(id) => self.join_spike(id),
            Action::SpikeToggle(id) => self.toggle_spike(id, out),
            Action::FlameTriggered(id) => {
                if self.set_flame_phase(id, FlamePhase::Triggering, FlamePhase::Triggered) {
                    out.push(Event::EntityImageChanged {
                        entity: id,
                        image: EntityImage::SunFlare,
                    });
                    out.push(Event::SoundCueRequested {
                        cue: SoundCue::FlameTriggered,
                    });
                }
            }
            Action::FlameIgnite(id) => {
                if self.set_flame_phase(id, FlamePhase::Activating, FlamePhase::Active) {
                    out.push(Event::SoundCueStopped {
                        cue: SoundCue::FlameTriggered,
                    });
                    out.push(Event::SoundCueRequested {
                        cue: SoundCue::FlameActive,
                    });
                    out.push(Event::EntityImageChanged {
                        entity: id,
                        image: EntityImage::Fire,
                    });
                    let due = fired.due.saturating_add(self.config.flame_burn());
                    self.scheduler.schedule(due, Action::FlameExtinguish(id));
                }
            }
            Action::FlameExtinguish(id) => {
                if self.set_flame_phase(id, FlamePhase::Active, FlamePhase::Idle) {
                    out.push(Event::EntityImageChanged {
                        entity: id,
                        image: EntityImage::Cleared,
                    });
                    out.push(Event::SoundCueStopped {
                        cue: SoundCue::FlameActive,
                    });
                    out.push(Event::EntityImageChanged {
                        entity: id,
                        image: EntityImage::ScorchedTile,
                    });
                }
            }
        }
    }

    pub(crate) fn schedule_spike_join(&mut self, id: EntityId) {
        let delay = self
            .registry
            .get(id)
            .and_then(|record| record.capabilities.spike)
            .map(|spike| spike.initial_delay);
        if let Some(delay) = delay {
            self.scheduler
                .schedule(self.clock.saturating_add(delay), Action::SpikeJoin(id));
        }
    }

    fn join_spike(&mut self, id: EntityId) {
        let Some(delay) = self
            .registry
            .get(id)
            .and_then(|record| record.capabilities.spike)
            .filter(|spike| !spike.joined)
            .map(|spike| spike.initial_delay)
        else {
            return;
        };

        let leader_exists = self.registry.spikes.iter().any(|other| {
            self.registry
                .get(*other)
                .and_then(|record| record.capabilities.spike)
                .is_some_and(|spike| {
                    spike.joined && spike.audio_leader && spike.initial_delay == delay
                })
        });

        if let Some(spike) = self
            .registry
            .get_mut(id)
            .and_then(|record| record.capabilities.spike.as_mut())
        {
            spike.joined = true;
            spike.audio_leader = !leader_exists;
        }
    }

    /// Passes a departed leader's cue duty to another joined spike with the same delay.
    pub(crate) fn hand_over_spike_lead(&mut self, departed: &EntityRecord) {
        let Some(delay) = departed
            .capabilities
            .spike
            .filter(|spike| spike.audio_leader)
            .map(|spike| spike.initial_delay)
        else {
            return;
        };

        let successor = self.registry.spikes.iter().copied().find(|id| {
            self.registry
                .get(*id)
                .and_then(|record| record.capabilities.spike)
                .is_some_and(|spike| spike.joined && spike.initial_delay == delay)
        });
        if let Some(spike) = successor
            .and_then(|id| self.registry.get_mut(id))
            .and_then(|record| record.capabilities.spike.as_mut())
        {
            spike.audio_leader = true;
        }
    }

    fn toggle_spike(&mut self, id: EntityId, out: &mut Vec<Event>) {
        let Some(spike) = self
            .registry
            .get_mut(id)
            .and_then(|record| record.capabilities.spike.as_mut())
            .filter(|spike| spike.scheduled)
        else {
            return;
        };

        spike.active = !spike.active;
        spike.scheduled = false;
        let value = spike.active ^ !spike.opposite;
        let cue = spike
            .audio_leader
            .then_some(if spike.active {
                SoundCue::SpikeOn
            } else {
                SoundCue::SpikeOff
            });

        out.push(Event::SelfSwitchWritten {
            map: self.map,
            entity: id,
            slot: SwitchSlot::A,
            value,
        });
        if let Some(cue) = cue {
            out.push(Event::SoundCueRequested { cue });
        }
    }

    /// Schedules the next flip of every joined spike and kills a player standing on a raised one.
    pub(crate) fn update_spikes(&mut self, out: &mut Vec<Event>) {
        let due = self.clock.saturating_add(self.config.spike_period());
        for index in 0..self.registry.spikes.len() {
            let id = self.registry.spikes[index];
            let can_die = self.can_die();
            let player = self.player.position;
            let Some(record) = self.registry.records.get_mut(&id) else {
                continue;
            };
            let position = record.position;
            let Some(spike) = record.capabilities.spike.as_mut() else {
                continue;
            };

            if spike.joined && !spike.scheduled {
                spike.scheduled = true;
                self.scheduler.schedule(due, Action::SpikeToggle(id));
            }

            let lethal = spike.is_raised() && position == player;
            if contact(&mut spike.lethal_contact, lethal, can_die) {
                self.kill_player(Hazard::Spike, out);
            }
        }
    }

    /// Starts a new cycle in every idle flame group and arms triggered flames.
    pub(crate) fn select_flames(&mut self) {
        let min = self.config.flame_trigger_delay_min_ms;
        let max = self.config.flame_trigger_delay_max_ms;
        let activation = self.config.flame_activation_delay();

        for members in self.registry.flame_groups.values() {
            let records = &mut self.registry.records;

            if members
                .iter()
                .all(|id| flame_phase(&*records, id) == Some(FlamePhase::Idle))
            {
                if let Some(&chosen) = members.choose(&mut self.rng) {
                    let delay = Duration::from_millis(self.rng.gen_range(min..=max));
                    if let Some(flame) = records
                        .get_mut(&chosen)
                        .and_then(|record| record.capabilities.flame.as_mut())
                    {
                        flame.phase = FlamePhase::Triggering;
                        self.scheduler.schedule(
                            self.clock.saturating_add(delay),
                            Action::FlameTriggered(chosen),
                        );
                    }
                }
            }

            if members
                .iter()
                .any(|id| flame_phase(&*records, id) == Some(FlamePhase::Activating))
            {
                continue;
            }

            for id in members {
                if let Some(flame) = records
                    .get_mut(id)
                    .and_then(|record| record.capabilities.flame.as_mut())
                    .filter(|flame| flame.phase == FlamePhase::Triggered)
                {
                    flame.phase = FlamePhase::Activating;
                    self.scheduler.schedule(
                        self.clock.saturating_add(activation),
                        Action::FlameIgnite(*id),
                    );
                }
            }
        }
    }

    /// Stops the sprite and cue of a flame that leaves mid-cycle.
    pub(crate) fn tear_down_flame(&self, departed: &EntityRecord, out: &mut Vec<Event>) {
        let Some(flame) = departed.capabilities.flame else {
            return;
        };
        let cue = match flame.phase {
            FlamePhase::Idle | FlamePhase::Triggering => return,
            FlamePhase::Triggered | FlamePhase::Activating => SoundCue::FlameTriggered,
            FlamePhase::Active => SoundCue::FlameActive,
        };

        out.push(Event::EntityImageChanged {
            entity: departed.id,
            image: EntityImage::Cleared,
        });
        out.push(Event::SoundCueStopped { cue });
        if flame.phase == FlamePhase::Active {
            out.push(Event::EntityImageChanged {
                entity: departed.id,
                image: EntityImage::ScorchedTile,
            });
        }
    }

    fn set_flame_phase(&mut self, id: EntityId, from: FlamePhase, to: FlamePhase) -> bool {
        match self
            .registry
            .get_mut(id)
            .and_then(|record| record.capabilities.flame.as_mut())
        {
            Some(flame) if flame.phase == from => {
                flame.phase = to;
                true
            }
            _ => false,
        }
    }

    /// Kills a player standing in an active flame.
    pub(crate) fn check_flames(&mut self, out: &mut Vec<Event>) {
        let flames: Vec<EntityId> = self
            .registry
            .flame_groups
            .values()
            .flatten()
            .copied()
            .collect();

        for id in flames {
            let can_die = self.can_die();
            let player = self.player.position;
            let Some(record) = self.registry.records.get_mut(&id) else {
                continue;
            };
            let position = record.position;
            let Some(flame) = record.capabilities.flame.as_mut() else {
                continue;
            };

            let lethal = flame.phase == FlamePhase::Active && position == player;
            if contact(&mut flame.lethal_contact, lethal, can_die) {
                self.kill_player(Hazard::Flame, out);
            }
        }
    }

    /// Collapses pits the player walked off and kills a player standing in an open one.
    pub(crate) fn update_pits(&mut self, out: &mut Vec<Event>) {
        for index in 0..self.registry.pits.len() {
            let id = self.registry.pits[index];
            let can_die = self.can_die();
            let player = self.player.position;
            let Some(record) = self.registry.records.get_mut(&id) else {
                continue;
            };
            let on = record.position == player;
            let Some(pit) = record.capabilities.pit.as_mut() else {
                continue;
            };

            if !pit.activated && pit.player_present && !on {
                pit.activated = true;
                out.push(Event::SoundCueRequested {
                    cue: SoundCue::PitOpen,
                });
                out.push(Event::SelfSwitchWritten {
                    map: self.map,
                    entity: id,
                    slot: SwitchSlot::A,
                    value: true,
                });
            }
            pit.player_present = on;

            let lethal = on && pit.activated;
            if contact(&mut pit.lethal_contact, lethal, can_die) {
                self.kill_player(Hazard::Pit, out);
            }
        }
    }
}
