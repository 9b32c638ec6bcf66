//! Lifecycle benchmarks

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use phase_field_cells::config::Parameters;
use phase_field_cells::geometry::{Grid, NeighborTable};
use phase_field_cells::lifecycle::{proliferate, sweep, SimulationContext};
use phase_field_cells::mechanics::CrowdingStress;

fn bench_params() -> Parameters {
    let mut params = Parameters::default();
    params.domain.size = [48, 48, 12];
    params.domain.margin = 5;
    params.cell.radius = 4.0;
    params.cell.founders = 9;
    params.proliferation.warmup_step = 0;
    params.run.seed = Some(1);
    params
}

fn bench_neighbor_table(c: &mut Criterion) {
    let grid = Grid::new([64, 64, 32]);

    c.bench_function("neighbor_table_build", |b| {
        b.iter(|| NeighborTable::build(black_box(&grid)))
    });
}

fn bench_sweep(c: &mut Criterion) {
    let mut ctx = SimulationContext::on_host(bench_params()).unwrap();
    let mut stress = CrowdingStress::default();

    c.bench_function("host_sweep", |b| {
        b.iter(|| sweep(&mut ctx, &mut stress, black_box(1)).unwrap())
    });
}

fn bench_division_burst(c: &mut Criterion) {
    c.bench_function("division_burst", |b| {
        b.iter_batched(
            || {
                let mut ctx = SimulationContext::on_host(bench_params()).unwrap();
                for cell in ctx.cells.iter_mut() {
                    cell.clock.timer = 1.0e6;
                    cell.clock.threshold_mean = 1.0e5;
                }
                ctx
            },
            |mut ctx| proliferate(&mut ctx, black_box(1)).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_neighbor_table, bench_sweep, bench_division_burst);
criterion_main!(benches);
