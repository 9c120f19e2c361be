mod common;

use common::{count_cue, entity, Harness};
use underpromotion_core::{Direction, EntityId, Event, GridPosition, MapId, SoundCue, SwitchSlot};
use underpromotion_world::query;

fn flag(entity: u32, slot: SwitchSlot, value: bool) -> Event {
    Event::SelfSwitchWritten {
        map: MapId::new(1),
        entity: EntityId::new(entity),
        slot,
        value,
    }
}

fn gate_state(harness: &Harness, id: u32) -> Option<u8> {
    query::capabilities(&harness.world, EntityId::new(id))
        .and_then(|caps| caps.gate)
        .map(|gate| gate.state)
}

#[test]
fn latching_button_keeps_its_gate_open() {
    let (mut harness, _) = Harness::loaded(
        (0, 0),
        vec![
            entity(1, 1, 0, &["<chess:button:a>"]),
            entity(2, 4, 4, &["<chess:gate:a>"]),
        ],
    );
    assert!(query::blocked_tiles(&harness.world).contains(&GridPosition::new(4, 4)));

    let _ = harness.place_player(1, 0);
    let pressed = harness.tick();
    assert_eq!(count_cue(&pressed, SoundCue::ButtonSwitch), 1);
    assert_eq!(count_cue(&pressed, SoundCue::GateOpen), 1);
    assert!(pressed.contains(&flag(1, SwitchSlot::A, true)));
    assert!(pressed.contains(&flag(2, SwitchSlot::A, true)));
    assert!(query::blocked_tiles(&harness.world).is_empty());

    let _ = harness.place_player(0, 0);
    let released = harness.ticks(3);
    assert_eq!(count_cue(&released, SoundCue::ButtonOff), 0);
    assert_eq!(gate_state(&harness, 2), Some(1));
}

#[test]
fn hold_button_closes_its_gate_on_release() {
    let (mut harness, _) = Harness::loaded(
        (0, 0),
        vec![
            entity(1, 1, 0, &["<chess:button:c:true>"]),
            entity(2, 4, 4, &["<chess:gate:c>"]),
        ],
    );

    let _ = harness.place_player(1, 0);
    let _ = harness.tick();
    assert_eq!(gate_state(&harness, 2), Some(1));

    let _ = harness.place_player(0, 0);
    let released = harness.tick();
    assert_eq!(count_cue(&released, SoundCue::ButtonOff), 1);
    assert!(released.contains(&flag(1, SwitchSlot::A, false)));
    assert!(released.contains(&flag(2, SwitchSlot::A, false)));
    assert_eq!(gate_state(&harness, 2), Some(0));
    assert!(query::blocked_tiles(&harness.world).contains(&GridPosition::new(4, 4)));
}

#[test]
fn gate_requiring_two_buttons_counts_presses() {
    let (mut harness, _) = Harness::loaded(
        (0, 0),
        vec![
            entity(1, 1, 0, &["<chess:button:b>"]),
            entity(2, 2, 0, &["<chess:button:b:true>"]),
            entity(3, 6, 6, &["<chess:gate:b:2>"]),
            entity(4, 7, 7, &["<chess:gate:d>"]),
        ],
    );

    let _ = harness.place_player(1, 0);
    let first = harness.tick();
    assert!(first.contains(&flag(3, SwitchSlot::A, true)));
    assert_eq!(gate_state(&harness, 3), Some(1));
    assert_eq!(gate_state(&harness, 4), Some(0));
    assert!(query::blocked_tiles(&harness.world).contains(&GridPosition::new(6, 6)));

    let _ = harness.place_player(2, 0);
    let second = harness.tick();
    assert!(second.contains(&flag(3, SwitchSlot::B, true)));
    assert!(!query::blocked_tiles(&harness.world).contains(&GridPosition::new(6, 6)));

    let _ = harness.place_player(0, 0);
    let released = harness.tick();
    assert!(released.contains(&flag(3, SwitchSlot::B, false)));
    assert_eq!(gate_state(&harness, 3), Some(1));
    assert!(query::blocked_tiles(&harness.world).contains(&GridPosition::new(6, 6)));
}

#[test]
fn pushables_weigh_buttons_down_and_gates_refresh_push_offsets() {
    let (mut harness, _) = Harness::loaded(
        (9, 9),
        vec![
            entity(1, 3, 3, &["<chess:button:a:true>"]),
            entity(2, 5, 5, &["<chess:pushable>"]),
            entity(3, 5, 6, &["<chess:gate:a>"]),
            entity(4, 3, 3, &["<chess:pushable>"]),
        ],
    );
    let offsets = |harness: &Harness| {
        query::entity_view(&harness.world)
            .iter()
            .find(|snapshot| snapshot.id == EntityId::new(2))
            .and_then(|snapshot| snapshot.pushable.clone())
            .unwrap_or_default()
    };
    assert_eq!(offsets(&harness), vec![Direction::Down]);

    let pressed = harness.tick();
    assert_eq!(count_cue(&pressed, SoundCue::ButtonSwitch), 1);
    assert!(offsets(&harness).is_empty());
}

#[test]
fn gates_stop_counting_once_fully_open() {
    let (mut harness, _) = Harness::loaded(
        (0, 0),
        vec![
            entity(1, 1, 0, &["<chess:button:b>"]),
            entity(2, 2, 0, &["<chess:button:b>"]),
            entity(3, 3, 0, &["<chess:button:b>"]),
            entity(4, 6, 6, &["<chess:gate:b:2>"]),
        ],
    );

    let mut opened = Vec::new();
    for x in 1..=2 {
        let _ = harness.place_player(x, 0);
        opened.extend(harness.tick());
    }
    assert_eq!(count_cue(&opened, SoundCue::GateOpen), 2);
    assert_eq!(gate_state(&harness, 4), Some(2));

    let _ = harness.place_player(3, 0);
    let third = harness.tick();
    assert_eq!(count_cue(&third, SoundCue::ButtonSwitch), 1);
    assert_eq!(count_cue(&third, SoundCue::GateOpen), 0);
    assert!(third
        .iter()
        .all(|event| !matches!(event, Event::SelfSwitchWritten { entity, .. } if *entity == EntityId::new(4))));
    assert_eq!(gate_state(&harness, 4), Some(2));
    assert!(!query::blocked_tiles(&harness.world).contains(&GridPosition::new(6, 6)));
}
