use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use box_halo::{CellBox, Copier, DisjointBoxLayout, IntVect, LevelData, NoComm, Periodic, Real, Trim};

/// A cubic domain of `boxes_per_dim` boxes with `cells_per_dim` cells each.
fn build_level(boxes_per_dim: i32, cells_per_dim: i32) -> (DisjointBoxLayout, LevelData<Real>) {
    let hi = boxes_per_dim * cells_per_dim - 1;
    let domain = CellBox::new(IntVect::ZERO, IntVect::splat(hi));
    let dbl = DisjointBoxLayout::new(domain, IntVect::splat(cells_per_dim), &NoComm)
        .expect("even partition");
    let mut ld = LevelData::new(&dbl, 1, 2);
    for (bidx, fab) in ld.iter_mut() {
        fab.set_val(bidx.global() as Real);
    }
    (dbl, ld)
}

fn bench_plan_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("copier_define");
    for &boxes in &[2i32, 4] {
        let (_dbl, ld) = build_level(boxes, 8);
        group.bench_with_input(BenchmarkId::from_parameter(boxes), &ld, |b, ld| {
            b.iter(|| {
                Copier::<NoComm>::for_exchange(ld, Periodic::ALL, Trim::NONE)
                    .expect("plan")
            })
        });
    }
    group.finish();
}

fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_serial");
    for &cells in &[8i32, 16] {
        let (_dbl, mut ld) = build_level(2, cells);
        let mut copier =
            Copier::<NoComm>::for_exchange(&ld, Periodic::ALL, Trim::NONE).expect("plan");
        group.bench_with_input(BenchmarkId::from_parameter(cells), &cells, |b, _| {
            b.iter(|| ld.exchange(&mut copier, &NoComm).expect("exchange"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan_construction, bench_exchange);
criterion_main!(benches);
