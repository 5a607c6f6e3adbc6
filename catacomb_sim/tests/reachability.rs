// Zone reachability through the core: walkers and flyers read different
// zone tables, and toggling the flip map switches every class to its
// flipped variant.

use catacomb_sim::config::CoreConfig;
use catacomb_sim::level::{Level, Room};
use catacomb_sim::nav::{NavBox, ZoneTables, link_boxes};
use catacomb_sim::sim::Core;
use catacomb_sim::slots::Mood;
use catacomb_sim::types::{BoxId, ItemId, ObjectId, RoomId, WorldPos, ZoneId};

const WOLF: ObjectId = ObjectId(1);
const BAT: ObjectId = ObjectId(2);

/// One corridor of three boxes with the given zone ids per box, as
/// `[normal, flipped]` for walkers and for flyers. Climbers share the
/// walker tables.
fn corridor(ground: [[u16; 3]; 2], flight: [[u16; 3]; 2]) -> Level {
    let mut room = Room::open(0, 0, 13, 3, 0, -4096);
    for ix in 1..12u16 {
        let b = match ix {
            1..=3 => 0,
            4..=7 => 1,
            _ => 2,
        };
        if let Some(s) = room.sector_mut(ix, 1) {
            s.box_id = Some(BoxId(b));
        }
    }
    let mut boxes = vec![
        NavBox::new(1024, 4095, 1024, 2047, 0),
        NavBox::new(4096, 8191, 1024, 2047, 0),
        NavBox::new(8192, 12287, 1024, 2047, 0),
    ];
    link_boxes(&mut boxes, BoxId(0), BoxId(1));
    link_boxes(&mut boxes, BoxId(1), BoxId(2));

    let z = |t: [[u16; 3]; 2]| t.map(|ids| ids.map(ZoneId).to_vec());
    let zones = ZoneTables::from_tables(z(ground), z(ground), z(flight));
    Level::new(vec![room], boxes, zones, Vec::new()).unwrap()
}

/// Walkers cannot get from the first two boxes into the third unless the
/// level is flipped; flyers always can.
fn setup() -> (Core, ItemId, ItemId) {
    setup_with([[0, 0, 1], [0, 0, 0]], [[0, 0, 0], [0, 0, 0]])
}

fn setup_with(ground: [[u16; 3]; 2], flight: [[u16; 3]; 2]) -> (Core, ItemId, ItemId) {
    let mut core = Core::new(CoreConfig::default(), corridor(ground, flight), 7).unwrap();
    let player = core.add_item(ObjectId(0), WorldPos::new(10000, 0, 1500), RoomId(0), 0);
    core.items.set_player(player);
    core.activate_item(player);

    let wolf = core.add_item(WOLF, WorldPos::new(2000, 0, 1500), RoomId(0), 0);
    let bat = core.add_item(BAT, WorldPos::new(3000, 0, 1500), RoomId(0), 0);
    for id in [wolf, bat] {
        core.activate_item(id);
        assert!(core.enable_creature_ai(id, false));
    }
    (core, wolf, bat)
}

#[test]
fn walker_cannot_reach_across_zones_but_flyer_can() {
    let (mut core, wolf, bat) = setup();

    let wolf_ai = core.creature_info(wolf).unwrap();
    assert_eq!(wolf_ai.creature_box, Some(BoxId(0)));
    assert_eq!(wolf_ai.enemy_box, Some(BoxId(2)));
    assert_ne!(wolf_ai.zone, wolf_ai.enemy_zone);
    assert!(!wolf_ai.enemy_reachable);

    let bat_ai = core.creature_info(bat).unwrap();
    assert_eq!(bat_ai.zone, bat_ai.enemy_zone);
    assert!(bat_ai.enemy_reachable);
}

#[test]
fn ground_shared_zone_with_split_flight_zone() {
    // The far box is walkable from the start, but sealed off for flyers.
    let (mut core, wolf, bat) = setup_with([[0, 0, 0], [0, 0, 0]], [[0, 0, 1], [0, 0, 1]]);
    assert!(core.creature_info(wolf).unwrap().enemy_reachable);
    let bat_ai = core.creature_info(bat).unwrap();
    assert_ne!(bat_ai.zone, bat_ai.enemy_zone);
    assert!(!bat_ai.enemy_reachable);
}

#[test]
fn activation_zone_covers_both_flip_states() {
    let (core, wolf, bat) = setup();
    let slot_of = |id: ItemId| core.items.get(id).unwrap().creature.unwrap();

    // The flipped table joins box 2 to the walker's zone, so the zone set
    // built at activation covers it.
    let wolf_lot = &core.slots.get(slot_of(wolf)).unwrap().lot;
    assert_eq!(wolf_lot.zone_boxes, vec![BoxId(0), BoxId(1), BoxId(2)]);
    let bat_lot = &core.slots.get(slot_of(bat)).unwrap().lot;
    assert_eq!(bat_lot.zone_boxes.len(), 3);
}

#[test]
fn flipping_the_map_opens_the_walker_route() {
    let (mut core, wolf, _) = setup();
    assert!(!core.creature_info(wolf).unwrap().enemy_reachable);

    core.toggle_flipmap();
    let ai = core.creature_info(wolf).unwrap();
    assert_eq!(ai.zone, ai.enemy_zone);
    assert!(ai.enemy_reachable);

    core.toggle_flipmap();
    assert!(!core.creature_info(wolf).unwrap().enemy_reachable);
}

#[test]
fn unreachable_wolf_only_wanders_inside_its_zone() {
    let (mut core, wolf, _) = setup();
    let slot = core.items.get(wolf).unwrap().creature.unwrap();
    for _ in 0..200 {
        let ai = core.creature_info(wolf).unwrap();
        core.creature_mood(wolf, &ai);
        let state = core.slots.get(slot).unwrap();
        assert_ne!(state.mood, Mood::Attack);
        assert_ne!(state.lot.required_box, Some(BoxId(2)));
    }
}
