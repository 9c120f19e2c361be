//! Virtual-clock timers replacing host-side deferred callbacks.

use std::time::Duration;

use underpromotion_core::EntityId;

/// Deferred rule transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    SpikeJoin(EntityId),
    SpikeToggle(EntityId),
    FlameTriggered(EntityId),
    FlameIgnite(EntityId),
    FlameExtinguish(EntityId),
}

impl Action {
    const fn entity(self) -> EntityId {
        match self {
            Self::SpikeJoin(id)
            | Self::SpikeToggle(id)
            | Self::FlameTriggered(id)
            | Self::FlameIgnite(id)
            | Self::FlameExtinguish(id) => id,
        }
    }
}

/// Action that became due, together with the instant it was due at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Fired {
    pub(crate) due: Duration,
    pub(crate) action: Action,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    due: Duration,
    sequence: u64,
    action: Action,
}

/// Pending timers fired in `(due, insertion)` order.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    entries: Vec<Entry>,
    next_sequence: u64,
}

impl Scheduler {
    pub(crate) fn schedule(&mut self, due: Duration, action: Action) {
        self.entries.push(Entry {
            due,
            sequence: self.next_sequence,
            action,
        });
        self.next_sequence = self.next_sequence.wrapping_add(1);
    }

    /// Removes and returns the earliest action due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<Fired> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= now)
            .min_by_key(|(_, entry)| (entry.due, entry.sequence))
            .map(|(index, _)| index)?;
        let entry = self.entries.swap_remove(index);
        Some(Fired {
            due: entry.due,
            action: entry.action,
        })
    }

    pub(crate) fn cancel_entity(&mut self, entity: EntityId) {
        self.entries.retain(|entry| entry.action.entity() != entity);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> EntityId {
        EntityId::new(value)
    }

    #[test]
    fn fires_in_due_then_insertion_order() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(Duration::from_millis(20), Action::SpikeToggle(id(1)));
        scheduler.schedule(Duration::from_millis(10), Action::SpikeToggle(id(2)));
        scheduler.schedule(Duration::from_millis(10), Action::SpikeToggle(id(3)));

        let now = Duration::from_millis(15);
        let first = scheduler.pop_due(now).expect("due entry");
        let second = scheduler.pop_due(now).expect("due entry");
        assert_eq!(first.action, Action::SpikeToggle(id(2)));
        assert_eq!(second.action, Action::SpikeToggle(id(3)));
        assert_eq!(scheduler.pop_due(now), None);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn cancelling_an_entity_drops_all_of_its_timers() {
        let mut scheduler = Scheduler::default();
        scheduler.schedule(Duration::ZERO, Action::FlameTriggered(id(4)));
        scheduler.schedule(Duration::ZERO, Action::FlameIgnite(id(4)));
        scheduler.schedule(Duration::ZERO, Action::SpikeJoin(id(5)));

        scheduler.cancel_entity(id(4));

        assert_eq!(scheduler.len(), 1);
        assert_eq!(
            scheduler.pop_due(Duration::ZERO).map(|fired| fired.action),
            Some(Action::SpikeJoin(id(5)))
        );
    }
}
