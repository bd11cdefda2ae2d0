//! Single-level planning scenarios on the unit square.
//!
//! Covers the point robot in an open square (QRRT feasibility and path
//! quality) and the vertical-wall world (QRRT* optimality and obstacle
//! avoidance).

use std::sync::Arc;

use setu_plan::config::PlannerSettings;
use setu_plan::core::{
    AlwaysValid, FnValidityChecker, GoalRegion, LevelSpace, ProblemDefinition, RealVectorSpace,
    State, StateSpace, ValidityChecker,
};
use setu_plan::scheduler::{BundleSequence, LevelSpec, PlannerKind, SolveStatus};

const WALL_X: f64 = 0.5;
const WALL_TOP: f64 = 0.7;
const WALL_HALF_WIDTH: f64 = 0.01;

fn unit_square(validity: Arc<dyn ValidityChecker>) -> LevelSpace {
    let space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
    LevelSpace::with_discrete_motion(space, validity, 0.005)
}

fn corner_problem(space: Arc<dyn StateSpace>) -> ProblemDefinition {
    let goal = Arc::new(GoalRegion::new(space, State::new(vec![0.9, 0.9]), 0.05));
    ProblemDefinition::new(State::new(vec![0.1, 0.1]), goal)
}

fn wall_validity() -> Arc<dyn ValidityChecker> {
    Arc::new(FnValidityChecker(|s: &State| {
        let (x, y) = (s.values()[0], s.values()[1]);
        !((x - WALL_X).abs() < WALL_HALF_WIDTH && y <= WALL_TOP)
    }))
}

/// Whether a polyline segment crosses the wall segment.
fn crosses_wall(a: &State, b: &State) -> bool {
    let (xa, ya) = (a.values()[0], a.values()[1]);
    let (xb, yb) = (b.values()[0], b.values()[1]);
    if (xa - WALL_X).signum() == (xb - WALL_X).signum() {
        return false;
    }
    let t = (WALL_X - xa) / (xb - xa);
    let y_cross = ya + t * (yb - ya);
    y_cross <= WALL_TOP
}

#[test]
fn test_s1_open_square_qrrt() {
    for seed in 0..5 {
        let level = unit_square(Arc::new(AlwaysValid));
        let space = level.space.clone();
        let mut settings = PlannerSettings::new().with_seed(seed);
        settings.level.range = 0.2;
        settings.level.goal_bias = 0.05;

        let mut planner = BundleSequence::new(
            vec![LevelSpec::new(level, None)],
            corner_problem(space.clone()),
            PlannerKind::Qrrt,
            settings,
        )
        .unwrap();

        let status = planner.solve_iterations(1000);
        assert_eq!(status, SolveStatus::ExactSolution, "seed {seed}");

        let path = planner.solution_path().unwrap();
        assert_eq!(path.first().unwrap(), &State::new(vec![0.1, 0.1]));
        let length = path.length(space.as_ref());
        assert!(length <= 1.2, "seed {seed}: path length {length} > 1.2");
    }
}

#[test]
fn test_s2_wall_paths_avoid_wall() {
    for seed in [0, 3, 11] {
        let level = unit_square(wall_validity());
        let space = level.space.clone();
        let mut settings = PlannerSettings::new().with_seed(seed);
        settings.level.range = 0.2;

        let mut planner = BundleSequence::new(
            vec![LevelSpec::new(level, None)],
            corner_problem(space),
            PlannerKind::Qrrt,
            settings,
        )
        .unwrap();

        if planner.solve_iterations(5000) == SolveStatus::ExactSolution {
            let path = planner.solution_path().unwrap();
            for w in path.states().windows(2) {
                assert!(!crosses_wall(&w[0], &w[1]), "seed {seed}: path crosses wall");
            }
        }
    }
}

#[test]
fn test_s2_wall_qrrt_star_near_optimal() {
    // shortest detour hugs the wall top
    let detour = {
        let a = (0.1f64, 0.1f64);
        let top = (WALL_X, WALL_TOP + WALL_HALF_WIDTH);
        let b = (0.9f64, 0.9f64);
        ((top.0 - a.0).powi(2) + (top.1 - a.1).powi(2)).sqrt()
            + ((b.0 - top.0).powi(2) + (b.1 - top.1).powi(2)).sqrt()
    };

    let level = unit_square(wall_validity());
    let space = level.space.clone();
    let settings = PlannerSettings::new().with_seed(2);

    let mut planner = BundleSequence::new(
        vec![LevelSpec::new(level, None)],
        corner_problem(space),
        PlannerKind::QrrtStar,
        settings,
    )
    .unwrap();

    let status = planner.solve_iterations(5000);
    assert_eq!(status, SolveStatus::ExactSolution);
    let best = planner.level(0).base().best_cost.0;
    assert!(
        best <= 1.5 * detour,
        "cost {best} exceeds 1.5x detour {detour}"
    );

    let path = planner.solution_path().unwrap();
    for w in path.states().windows(2) {
        assert!(!crosses_wall(&w[0], &w[1]), "optimal path crosses wall");
    }
}

#[test]
fn test_s6_invalid_start_reported_and_roadmap_empty() {
    let level = unit_square(Arc::new(AlwaysValid));
    let space = level.space.clone();
    let goal = Arc::new(GoalRegion::new(space, State::new(vec![0.9, 0.9]), 0.05));
    let problem = ProblemDefinition::new(State::new(vec![1.5, 0.5]), goal);

    let mut planner = BundleSequence::new(
        vec![LevelSpec::new(level, None)],
        problem,
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(4),
    )
    .unwrap();

    assert_eq!(planner.solve_iterations(500), SolveStatus::InvalidStart);
    assert_eq!(planner.level(0).base().roadmap.num_vertices(), 0);
    assert!(planner.solution_path().is_none());
}

#[test]
fn test_qmp_solves_wall_world() {
    let level = unit_square(wall_validity());
    let space = level.space.clone();
    let settings = PlannerSettings::new().with_seed(19);

    let mut planner = BundleSequence::new(
        vec![LevelSpec::new(level, None)],
        corner_problem(space),
        PlannerKind::Qmp,
        settings,
    )
    .unwrap();

    let status = planner.solve_iterations(5000);
    assert_eq!(status, SolveStatus::ExactSolution);
    let path = planner.solution_path().unwrap();
    for w in path.states().windows(2) {
        assert!(!crosses_wall(&w[0], &w[1]));
    }
}

#[test]
fn test_planner_data_annotates_levels() {
    let level = unit_square(Arc::new(AlwaysValid));
    let space = level.space.clone();
    let mut planner = BundleSequence::new(
        vec![LevelSpec::new(level, None)],
        corner_problem(space),
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(8),
    )
    .unwrap();
    planner.solve_iterations(1000);

    let data = planner.planner_data();
    assert_eq!(data.levels.len(), 1);
    let level_data = &data.levels[0];
    assert_eq!(level_data.level, 0);
    assert!(!level_data.vertices.is_empty());
    assert_eq!(level_data.path_class.len(), 1);
    assert!(level_data.vertices.iter().any(|v| v.is_start));
}
