//! Fire-turn benchmarks for salvo_core.
//!
//! Run with: `cargo bench -p salvo_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use salvo_core::catalog::{Candidate, CycleDirection, CycleFilter, TargetCatalog};
use salvo_core::prelude::*;
use salvo_test_utils::fixtures::{target_dummy, MockBattlefield};

fn candidates(count: u32) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_possible_wrap)]
            let position = HexCoord::new((i * 7 % 31) as i32, (i * 13 % 29) as i32);
            Candidate {
                target: Target::Unit(UnitId(i + 100)),
                position,
                hostile: i % 3 != 0,
            }
        })
        .collect()
}

/// A unit carrying `weapons` lasers, half of them rear-mounted.
fn battery(weapons: u32) -> Combatant {
    (0..weapons).fold(
        Combatant::new(UnitId(1), TeamId(1), HexCoord::new(15, 15), Facing::North),
        |unit, i| {
            let mount_facing = if i % 2 == 0 { 0 } else { 3 };
            unit.with_weapon(
                WeaponMount::new(WeaponId(i + 1), format!("Laser {i}"))
                    .with_mount_facing(mount_facing),
            )
        },
    )
}

/// Targets alternate between the front and the rear of the firer.
fn loaded_queue(firer: &mut Combatant, rules: &FireRules) -> AttackQueue {
    let mut queue = AttackQueue::new(firer.id);
    let mut ledger = PhaseOrdnance::default();
    let weapons: Vec<WeaponId> = firer.weapons.iter().map(|w| w.id).collect();
    for (i, weapon) in weapons.into_iter().enumerate() {
        let target = if i % 2 == 0 { UnitId(500) } else { UnitId(501) };
        let declaration = AttackDeclaration::weapon(firer.id, weapon, Target::Unit(target));
        let _ = queue.append(declaration, firer, &mut ledger, rules);
    }
    queue
}

pub fn catalog_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");
    for count in [16u32, 128, 512] {
        let pool = candidates(count);
        group.bench_with_input(BenchmarkId::new("cache", count), &pool, |b, pool| {
            b.iter(|| {
                let mut catalog = TargetCatalog::new();
                catalog.cache(HexCoord::new(15, 15), pool.iter().copied());
                black_box(catalog.len())
            });
        });

        let mut catalog = TargetCatalog::new();
        catalog.cache(HexCoord::new(15, 15), pool.iter().copied());
        let filter = CycleFilter {
            only_legal: true,
            ignore_allies: true,
        };
        group.bench_with_input(BenchmarkId::new("full_lap", count), &count, |b, &count| {
            b.iter(|| {
                catalog.reset_cursor();
                for _ in 0..count {
                    black_box(catalog.next(CycleDirection::Forward, filter, |t| {
                        t.unit().is_some_and(|id| id.0 % 5 != 0)
                    }));
                }
            });
        });
    }
    group.finish();
}

pub fn commit_benchmark(c: &mut Criterion) {
    let rules = FireRules::default();
    let mut group = c.benchmark_group("commit");
    for weapons in [4u32, 16, 64] {
        let mut firer = battery(weapons);
        let board = MockBattlefield::new()
            .with_unit(firer.clone())
            .with_unit(target_dummy(500, 2, HexCoord::new(15, 10)))
            .with_unit(target_dummy(501, 2, HexCoord::new(15, 20)));
        let queue = loaded_queue(&mut firer, &rules);

        group.bench_with_input(BenchmarkId::new("reorder", weapons), &queue, |b, queue| {
            b.iter(|| black_box(queue.commit(&firer, &board).attacks.len()));
        });
    }
    group.finish();
}

criterion_group!(benches, catalog_benchmark, commit_benchmark);
criterion_main!(benches);
