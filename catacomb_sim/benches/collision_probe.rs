// Benchmarks for the per-tick spatial hot paths: the collision probe over
// an open room with a few pillars, and a full LOT search over a long box
// corridor.

use catacomb_sim::angle::ANGLE_90;
use catacomb_sim::collision::{CollisionInfo, probe};
use catacomb_sim::config::CollisionDefaults;
use catacomb_sim::level::{Level, Room};
use catacomb_sim::lot::Lot;
use catacomb_sim::nav::{LocomotionClass, NavBox, ZoneTables, link_boxes};
use catacomb_sim::statics::{StaticInfo, StaticMesh};
use catacomb_sim::types::{BoundingBox, BoxId, RoomId, StaticId, WALL_L, WorldPos};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn pillared_room() -> Level {
    let mut room = Room::open(0, 0, 24, 24, 0, -4096);
    for i in 0..6 {
        room.statics.push(StaticMesh {
            static_id: StaticId(0),
            pos: WorldPos::new(3 * WALL_L + i * 3 * WALL_L, 0, 12 * WALL_L),
            yaw: 0,
        });
    }
    let pillar = StaticInfo::solid(BoundingBox::new(-200, 200, -2048, 0, -200, 200));
    Level::new(vec![room], Vec::new(), ZoneTables::empty(), vec![pillar]).expect("valid level")
}

/// `count` boxes of one sector each, linked in a line along x.
fn corridor(count: u16) -> Level {
    let mut room = Room::open(0, 0, count + 2, 3, 0, -4096);
    let mut boxes = Vec::new();
    for i in 0..count {
        let x = (i as i32 + 1) * WALL_L;
        boxes.push(NavBox::new(x, x + WALL_L - 1, WALL_L, 2 * WALL_L - 1, 0));
        if let Some(s) = room.sector_mut(i + 1, 1) {
            s.box_id = Some(BoxId(i));
        }
    }
    for i in 1..count {
        link_boxes(&mut boxes, BoxId(i - 1), BoxId(i));
    }
    Level::with_flood_zones(vec![room], boxes, Vec::new(), &[]).expect("valid level")
}

fn bench_probe(c: &mut Criterion) {
    let level = pillared_room();
    let defaults = CollisionDefaults::default();
    let positions: Vec<WorldPos> = (0..256)
        .map(|i| WorldPos::new(1100 + (i % 16) * 1300, 0, 1100 + (i / 16) * 1300))
        .collect();

    c.bench_function("probe_256_positions", |b| {
        b.iter(|| {
            for &pos in &positions {
                let mut coll = CollisionInfo::from_defaults(&defaults);
                coll.old = pos;
                coll.facing = ANGLE_90;
                probe(&level, &mut coll, black_box(pos), RoomId(0), defaults.player_height);
                black_box(coll.coll_type);
            }
        })
    });
}

fn bench_lot_search(c: &mut Criterion) {
    let level = corridor(200);
    c.bench_function("lot_search_corridor_200", |b| {
        b.iter_batched(
            || {
                let mut lot = Lot::new(LocomotionClass::Walk, level.boxes.len());
                lot.create_zone(&level, Some(BoxId(0)));
                lot.required_box = Some(BoxId(199));
                lot
            },
            |mut lot| {
                black_box(lot.update(&level, u32::MAX, None));
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_probe, bench_lot_search);
criterion_main!(benches);
