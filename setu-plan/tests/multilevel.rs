//! Multilevel scenarios: bundle sequences with two and three levels,
//! quotient sampling, the path-restriction shortcut and scheduler fairness.

use std::sync::Arc;

use setu_plan::Projection;
use setu_plan::config::PlannerSettings;
use setu_plan::core::{
    AlwaysValid, FnValidityChecker, GoalRegion, LevelSpace, ProblemDefinition, RealVectorSpace,
    State, StateSpace, ValidityChecker, se2_space,
};
use setu_plan::scheduler::{BundleSequence, LevelSpec, PlannerKind, SolveStatus};

/// Two rooms split by a wall at x in (0.45, 0.55) with a corridor at
/// y in (0.35, 0.65). Only position matters; headings are free.
fn corridor_validity() -> Arc<dyn ValidityChecker> {
    Arc::new(FnValidityChecker(|s: &State| {
        let (x, y) = (s.values()[0], s.values()[1]);
        !(x > 0.45 && x < 0.55 && !(y > 0.35 && y < 0.65))
    }))
}

fn se2_corridor_levels() -> Vec<LevelSpec> {
    let base_space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
    let base = LevelSpace::with_discrete_motion(base_space, corridor_validity(), 0.005);
    let top_space = se2_space([0.0, 0.0], [1.0, 1.0]);
    let top = LevelSpace::with_discrete_motion(top_space, corridor_validity(), 0.005);
    vec![
        LevelSpec::new(base, None),
        LevelSpec::new(top, Some(Projection::Se2ToR2)),
    ]
}

fn se2_corridor_problem() -> ProblemDefinition {
    let top_space = se2_space([0.0, 0.0], [1.0, 1.0]);
    let goal = Arc::new(GoalRegion::new(
        top_space,
        State::new(vec![0.9, 0.5, 0.0]),
        0.05,
    ));
    ProblemDefinition::new(State::new(vec![0.1, 0.5, 0.0]), goal)
}

#[test]
fn test_s3_se2_corridor_success_rate() {
    let mut successes = 0;
    let seeds = 20;
    for seed in 0..seeds {
        let mut planner = BundleSequence::new(
            se2_corridor_levels(),
            se2_corridor_problem(),
            PlannerKind::Qrrt,
            PlannerSettings::new().with_seed(seed),
        )
        .unwrap();
        if planner.solve_iterations(2000) == SolveStatus::ExactSolution {
            successes += 1;
        }
    }
    assert!(
        successes * 100 >= seeds * 95,
        "only {successes}/{seeds} seeds solved the corridor"
    );
}

#[test]
fn test_s3_path_restriction_lifts_base_solution() {
    // wide corridor: the lifted base path is collision-free, so the top
    // level should accept it without search
    let mut planner = BundleSequence::new(
        se2_corridor_levels(),
        se2_corridor_problem(),
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(5),
    )
    .unwrap();
    let status = planner.solve_iterations(2000);
    assert_eq!(status, SolveStatus::ExactSolution);

    // the top level found its solution the moment it was first scheduled:
    // its tree is exactly the lifted section, not a grown tree
    let base_vertices = planner.level(0).base().roadmap.num_vertices();
    let top_vertices = planner.level(1).base().roadmap.num_vertices();
    assert!(
        top_vertices <= planner.solution_path().unwrap().len() + 2,
        "top level grew a tree ({top_vertices} vertices) instead of lifting"
    );
    assert!(base_vertices > 0);
}

#[test]
fn test_sqmp_upper_level_accepts_lifted_solution() {
    // restriction is on by default, so the top SQMP level gets its solution
    // installed before its own init ever ran; it must still hand back a
    // real path and path stack, not just a solved flag
    let mut planner = BundleSequence::new(
        se2_corridor_levels(),
        se2_corridor_problem(),
        PlannerKind::Sqmp,
        PlannerSettings::new().with_seed(15),
    )
    .unwrap();
    let status = planner.solve_iterations(5000);
    assert_eq!(status, SolveStatus::ExactSolution);

    let path = planner
        .solution_path()
        .expect("exact status must come with a solution path");
    // the path lives on the top (SE(2)) level, not a lower one
    assert_eq!(path.first().unwrap().len(), 3);
    assert!(path.len() >= 2);

    let top = planner.level(1).base();
    assert!(top.has_solution);
    assert!(
        top.solution.is_some(),
        "solved level failed to extract its path"
    );
    assert!(
        !top.path_stack.is_empty(),
        "solved level must stack at least one path class"
    );
}

#[test]
fn test_s3_restriction_disabled_still_solves() {
    let mut settings = PlannerSettings::new().with_seed(5);
    settings.scheduler.feasible_path_restriction = false;
    let mut planner = BundleSequence::new(
        se2_corridor_levels(),
        se2_corridor_problem(),
        PlannerKind::Qrrt,
        settings,
    )
    .unwrap();
    assert_eq!(planner.solve_iterations(4000), SolveStatus::ExactSolution);
}

#[test]
fn test_s5_three_level_stack_r6_r3_r0() {
    let r0: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(0, 0.0, 1.0));
    let r3: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(3, 0.0, 1.0));
    let r6: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(6, 0.0, 1.0));

    let levels = vec![
        LevelSpec::new(
            LevelSpace::with_discrete_motion(r0, Arc::new(AlwaysValid), 0.01),
            None,
        ),
        LevelSpec::new(
            LevelSpace::with_discrete_motion(r3, Arc::new(AlwaysValid), 0.01),
            Some(Projection::DropTail {
                base_len: 0,
                fiber_len: 3,
            }),
        ),
        LevelSpec::new(
            LevelSpace::with_discrete_motion(r6.clone(), Arc::new(AlwaysValid), 0.01),
            Some(Projection::DropTail {
                base_len: 3,
                fiber_len: 3,
            }),
        ),
    ];

    let goal = Arc::new(GoalRegion::new(
        r6,
        State::new(vec![0.9, 0.9, 0.9, 0.9, 0.9, 0.9]),
        0.1,
    ));
    let problem = ProblemDefinition::new(State::new(vec![0.1; 6]), goal);

    let mut planner = BundleSequence::new(
        levels,
        problem,
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(3),
    )
    .unwrap();

    let status = planner.solve_iterations(10_000);
    assert_eq!(status, SolveStatus::ExactSolution);

    // the scheduler must have visited every level
    for k in 0..planner.num_levels() {
        assert!(
            planner.level(k).base().roadmap.num_vertices() > 0,
            "level {k} was never grown"
        );
    }
    let path = planner.solution_path().unwrap();
    assert_eq!(path.first().unwrap().len(), 6);
}

#[test]
fn test_quotient_sampling_biases_upper_level() {
    // narrow corridor: base-level bias should concentrate top-level samples
    // around the corridor, which shows up as a high solve rate
    let mut planner = BundleSequence::new(
        se2_corridor_levels(),
        se2_corridor_problem(),
        PlannerKind::QrrtStar,
        PlannerSettings::new().with_seed(12),
    )
    .unwrap();
    let status = planner.solve_iterations(6000);
    assert_eq!(status, SolveStatus::ExactSolution);
    // monotone best cost on the top level once solved
    assert!(planner.level(1).base().best_cost.is_finite());
}

#[test]
fn test_stop_at_level_halts_early() {
    let mut settings = PlannerSettings::new().with_seed(7);
    settings.scheduler.stop_at_level = Some(0);
    let mut planner = BundleSequence::new(
        se2_corridor_levels(),
        se2_corridor_problem(),
        PlannerKind::Qrrt,
        settings,
    )
    .unwrap();
    let status = planner.solve_iterations(4000);
    assert_eq!(status, SolveStatus::ExactSolution);
    // planning stopped at the base: the top level never grew
    assert_eq!(planner.level(1).base().roadmap.num_vertices(), 0);
    // the reported solution lives on the base level
    assert_eq!(planner.solution_path().unwrap().first().unwrap().len(), 2);
}

#[test]
fn test_approximate_solution_when_top_level_blocked() {
    // the base square is free, but the top level has a full-height wall:
    // the base section exists and never lifts
    let base_space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
    let base = LevelSpace::with_discrete_motion(base_space, Arc::new(AlwaysValid), 0.005);
    let top_space = se2_space([0.0, 0.0], [1.0, 1.0]);
    let top_validity = Arc::new(FnValidityChecker(|s: &State| {
        let x = s.values()[0];
        !(0.3..=0.7).contains(&x)
    }));
    let top = LevelSpace::with_discrete_motion(top_space, top_validity, 0.005);
    let levels = vec![
        LevelSpec::new(base, None),
        LevelSpec::new(top, Some(Projection::Se2ToR2)),
    ];

    let mut planner = BundleSequence::new(
        levels,
        se2_corridor_problem(),
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(9),
    )
    .unwrap();
    let status = planner.solve_iterations(1500);
    assert_eq!(status, SolveStatus::ApproximateSolution);
    // the reported path is the base-level section
    assert_eq!(planner.solution_path().unwrap().first().unwrap().len(), 2);
}

#[test]
fn test_invalid_goal_reported() {
    let base_space: Arc<dyn StateSpace> = Arc::new(RealVectorSpace::cube(2, 0.0, 1.0));
    let level = LevelSpace::with_discrete_motion(base_space.clone(), Arc::new(AlwaysValid), 0.005);
    // goal region centered outside the bounds
    let goal = Arc::new(GoalRegion::new(
        base_space,
        State::new(vec![1.8, 0.5]),
        0.01,
    ));
    let problem = ProblemDefinition::new(State::new(vec![0.1, 0.5]), goal);
    let mut planner = BundleSequence::new(
        vec![LevelSpec::new(level, None)],
        problem,
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(6),
    )
    .unwrap();
    assert_eq!(planner.solve_iterations(100), SolveStatus::InvalidGoal);
    assert_eq!(planner.level(0).base().roadmap.num_vertices(), 0);
}

#[test]
fn test_timeout_reported_when_nothing_solved() {
    let mut planner = BundleSequence::new(
        se2_corridor_levels(),
        se2_corridor_problem(),
        PlannerKind::Qrrt,
        PlannerSettings::new().with_seed(2),
    )
    .unwrap();
    // one iteration cannot solve anything
    assert_eq!(planner.solve_iterations(1), SolveStatus::Timeout);
}
