//! Planner micro-benchmarks.
//!
//! Covers the per-grow cost of the tree and roadmap planners and the A*
//! query on a grown roadmap.
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/`

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use setu_plan::config::PlannerSettings;
use setu_plan::core::{
    AlwaysValid, GoalRegion, LevelSpace, ProblemDefinition, RealVectorSpace, State, StateSpace,
};
use setu_plan::scheduler::{BundleSequence, LevelSpec, PlannerKind};

fn unit_square_sequence(kind: PlannerKind, seed: u64) -> BundleSequence {
    let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
    let level = LevelSpace::with_discrete_motion(space.clone(), Arc::new(AlwaysValid), 0.01);
    let goal = Arc::new(GoalRegion::new(space, State::new(vec![0.9, 0.9]), 0.05));
    let problem = ProblemDefinition::new(State::new(vec![0.1, 0.1]), goal);
    BundleSequence::new(
        vec![LevelSpec::new(level, None)],
        problem,
        kind,
        PlannerSettings::new().with_seed(seed),
    )
    .unwrap()
}

fn bench_grow(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow");

    group.bench_function("qrrt_500_grows", |b| {
        b.iter(|| {
            let mut planner = unit_square_sequence(PlannerKind::Qrrt, 1);
            black_box(planner.solve_iterations(500))
        })
    });

    group.bench_function("qrrt_star_500_grows", |b| {
        b.iter(|| {
            let mut planner = unit_square_sequence(PlannerKind::QrrtStar, 1);
            black_box(planner.solve_iterations(500))
        })
    });

    group.bench_function("sqmp_500_grows", |b| {
        b.iter(|| {
            let mut planner = unit_square_sequence(PlannerKind::Sqmp, 1);
            black_box(planner.solve_iterations(500))
        })
    });

    group.finish();
}

fn bench_solution_extraction(c: &mut Criterion) {
    let mut planner = unit_square_sequence(PlannerKind::Qmp, 3);
    planner.solve_iterations(2000);

    c.bench_function("qmp_solution_astar", |b| {
        b.iter(|| black_box(planner.solution_path()))
    });
}

criterion_group!(benches, bench_grow, bench_solution_extraction);
criterion_main!(benches);
