//! Pushables, conveyors, buttons, gates and boulders.

use underpromotion_core::{
    ActorId, Direction, EntityId, Event, GridPosition, Group, Hazard, MoveRoute, RouteStep,
    SoundCue, SwitchSlot,
};

use crate::{hazards::contact, registry::EntityRecord, World};

fn conveyor_route(direction: Direction, wait: bool) -> MoveRoute {
    MoveRoute::new(
        vec![
            RouteStep::ThroughOn,
            RouteStep::Step(direction),
            RouteStep::ThroughOff,
        ],
        wait,
    )
}

impl World {
    /// Lets a moving player shove an idle pushable sharing its tile.
    pub(crate) fn resolve_pushes(&mut self, out: &mut Vec<Event>) {
        if !self.player.motion.is_executing() {
            return;
        }
        let Some(direction) = self
            .player
            .motion
            .route()
            .and_then(MoveRoute::first_direction)
        else {
            return;
        };
        let player = self.player.position;

        let pushed = self.registry.pushables.iter().copied().find(|id| {
            self.registry.get(*id).is_some_and(|record| {
                record.position == player
                    && !record.motion.is_executing()
                    && record
                        .capabilities
                        .pushable
                        .as_ref()
                        .is_some_and(|pushable| !pushable.invalid_offsets.contains(&direction))
            })
        });
        let Some(pushed) = pushed else {
            return;
        };

        self.force_route(
            ActorId::Entity(pushed),
            MoveRoute::new(vec![RouteStep::ThroughOn, RouteStep::Step(direction)], false),
            out,
        );
        out.push(Event::SoundCueRequested {
            cue: SoundCue::Pushing,
        });

        let _ = self.player.motion.abandon();
        self.finish_player_route(out);
        self.player.pushing = true;
    }

    /// Ends the player's push when the block being pushed leaves mid-slide.
    pub(crate) fn release_push(&mut self, departed: &EntityRecord) {
        if departed.capabilities.pushable.is_some() && departed.motion.is_executing() {
            self.player.pushing = false;
        }
    }

    /// Carries the idle player and idle pushables standing on conveyors.
    pub(crate) fn update_conveyors(&mut self, out: &mut Vec<Event>) {
        let mut riders: Vec<(ActorId, MoveRoute)> = Vec::new();

        for id in &self.registry.conveyors {
            let Some(record) = self.registry.get(*id) else {
                continue;
            };
            let Some(direction) = record.capabilities.conveyor else {
                continue;
            };
            let position = record.position;

            if self.player.position == position && !self.player.motion.is_executing() {
                riders.push((ActorId::Player, conveyor_route(direction, true)));
            }

            riders.extend(
                self.idle_pushables_at(position)
                    .map(|pushable| (ActorId::Entity(pushable), conveyor_route(direction, false))),
            );
        }

        for (actor, route) in riders {
            self.force_route(actor, route, out);
        }
    }

    fn idle_pushables_at(&self, position: GridPosition) -> impl Iterator<Item = EntityId> + '_ {
        self.registry.pushables.iter().copied().filter(move |id| {
            self.registry.get(*id).is_some_and(|record| {
                record.position == position && !record.motion.is_executing()
            })
        })
    }

    fn is_weighted(&self, position: GridPosition) -> bool {
        self.player.position == position
            || self
                .registry
                .pushables
                .iter()
                .chain(self.registry.boulders.iter())
                .filter_map(|id| self.registry.get(*id))
                .any(|record| record.position == position)
    }

    /// Presses and releases buttons, opening and closing the gates of their group.
    pub(crate) fn update_buttons(&mut self, out: &mut Vec<Event>) {
        let mut gates_changed = false;

        for index in 0..self.registry.buttons.len() {
            let id = self.registry.buttons[index];
            let Some(position) = self.registry.get(id).map(|record| record.position) else {
                continue;
            };
            let pressed = self.is_weighted(position);

            let Some(button) = self
                .registry
                .get_mut(id)
                .and_then(|record| record.capabilities.button.as_mut())
            else {
                continue;
            };

            if pressed && !button.activated {
                button.activated = true;
                let group = button.group;
                out.push(Event::SoundCueRequested {
                    cue: SoundCue::ButtonSwitch,
                });
                self.write_flag(id, SwitchSlot::A, true, out);
                gates_changed |= self.open_gates(group, out);
            } else if !pressed && button.hold && button.activated {
                button.activated = false;
                let group = button.group;
                out.push(Event::SoundCueRequested {
                    cue: SoundCue::ButtonOff,
                });
                self.write_flag(id, SwitchSlot::A, false, out);
                gates_changed |= self.close_gates(group, out);
            }
        }

        if gates_changed {
            self.registry.recompute_push_offsets();
        }
    }

    fn open_gates(&mut self, group: Group, out: &mut Vec<Event>) -> bool {
        let mut changed = false;
        for index in 0..self.registry.gates.len() {
            let id = self.registry.gates[index];
            let Some(gate) = self
                .registry
                .get_mut(id)
                .and_then(|record| record.capabilities.gate.as_mut())
                .filter(|gate| gate.group == group && gate.state < gate.required)
            else {
                continue;
            };
            gate.state += 1;
            let slot = SwitchSlot::for_gate_state(gate.state);
            changed = true;

            out.push(Event::SoundCueRequested {
                cue: SoundCue::GateOpen,
            });
            if let Some(slot) = slot {
                self.write_flag(id, slot, true, out);
            }
        }
        changed
    }

    fn close_gates(&mut self, group: Group, out: &mut Vec<Event>) -> bool {
        let mut changed = false;
        for index in 0..self.registry.gates.len() {
            let id = self.registry.gates[index];
            let Some(gate) = self
                .registry
                .get_mut(id)
                .and_then(|record| record.capabilities.gate.as_mut())
                .filter(|gate| gate.group == group && gate.state > 0)
            else {
                continue;
            };
            let slot = SwitchSlot::for_gate_state(gate.state);
            gate.state -= 1;
            changed = true;

            if let Some(slot) = slot {
                self.write_flag(id, slot, false, out);
            }
            out.push(Event::SoundCueRequested {
                cue: SoundCue::GateOpen,
            });
        }
        changed
    }

    /// Bounces rolling boulders off redirecting pushables and crushes the player.
    pub(crate) fn update_boulders(&mut self, out: &mut Vec<Event>) {
        for index in 0..self.registry.boulders.len() {
            let id = self.registry.boulders[index];
            let Some(position) = self.registry.get(id).map(|record| record.position) else {
                continue;
            };
            let touching = self.registry.pushables.iter().any(|pushable| {
                self.registry.get(*pushable).is_some_and(|record| {
                    record.position == position
                        && record
                            .capabilities
                            .pushable
                            .as_ref()
                            .is_some_and(|pushable| pushable.redirection.is_some())
                })
            });
            let can_die = self.can_die();
            let player = self.player.position;

            let Some(record) = self.registry.get_mut(id) else {
                continue;
            };
            let Some(boulder) = record.capabilities.boulder.as_mut() else {
                continue;
            };

            if touching && !boulder.touching_redirector {
                let step = RouteStep::Jump { dx: 0, dy: 0 };
                if let Some(at) = record.motion.insert_at_cursor(step) {
                    log::trace!("boulder {} bounces at step {at}", id.get());
                    out.push(Event::RouteStepInserted {
                        actor: ActorId::Entity(id),
                        index: at,
                        step,
                    });
                }
            }
            boulder.touching_redirector = touching;

            if contact(&mut boulder.lethal_contact, position == player, can_die) {
                self.kill_player(Hazard::Boulder, out);
            }
        }
    }
}
