//! Path restriction: lifting a lower-level solution without search.
//!
//! Before a level starts sampling, the scheduler may try the cheapest move
//! available: take the parent's solution path, merge every waypoint with a
//! fiber that interpolates from the level's start fiber to its goal fiber
//! along arc length, and collision-check the lift. When the whole section is
//! valid it becomes the level's initial solution for free.

use log::{debug, info};

use crate::core::state::State;
use crate::planners::{BundleGraph, ParentView};

/// Attempt the lifted section; installs it as the level's solution tree and
/// returns `true` on success.
pub fn try_feasible_section(base: &mut BundleGraph, parent: &ParentView<'_>) -> bool {
    let Some(parent_solution) = parent.solution else {
        return false;
    };
    if parent_solution.len() < 2 {
        return false;
    }
    let Some(projection) = base.projection.clone() else {
        return false;
    };
    let (Some(start_state), Some(goal_state)) = (base.start_state.clone(), base.goal_state.clone())
    else {
        return false;
    };

    let space = base.space.space.clone();
    let parent_space = parent.level_space.space.as_ref();

    let mut fiber_start = projection.alloc_fiber();
    let mut fiber_goal = projection.alloc_fiber();
    projection.extract_fiber(&start_state, &mut fiber_start);
    projection.extract_fiber(&goal_state, &mut fiber_goal);

    let total_len = parent_solution.length(parent_space);
    let mut lifted: Vec<State> = Vec::with_capacity(parent_solution.len());
    let mut walked = 0.0;
    let mut prev: Option<&State> = None;
    for waypoint in parent_solution.states() {
        if let Some(p) = prev {
            walked += parent_space.distance(p, waypoint);
        }
        prev = Some(waypoint);
        let t = if total_len > f64::EPSILON {
            walked / total_len
        } else {
            0.0
        };
        // sweep the fiber from the start's to the goal's while the base part
        // follows the parent path
        let mut at_start_fiber = space.alloc_state();
        let mut at_goal_fiber = space.alloc_state();
        projection.merge(waypoint, &fiber_start, &mut at_start_fiber);
        projection.merge(waypoint, &fiber_goal, &mut at_goal_fiber);
        let mut out = space.alloc_state();
        space.interpolate(&at_start_fiber, &at_goal_fiber, t, &mut out);
        lifted.push(out);
    }
    // pin the endpoints exactly
    lifted[0] = start_state;
    let last = lifted.len() - 1;
    lifted[last] = goal_state;

    for w in lifted.windows(2) {
        if !base.space.check_motion(&w[0], &w[1]) {
            debug!(
                "[PathRestriction] lifted section infeasible (level {})",
                base.level
            );
            return false;
        }
    }

    // install the section as the level's tree
    if base.q_start.is_none() {
        base.init_start();
    }
    base.first_run = false;
    let mut prev_id = base.q_start.expect("start inserted above");
    for waypoint in lifted.into_iter().skip(1) {
        let id = base.add_configuration(waypoint);
        let line = base
            .objective
            .motion_cost(base.roadmap.state(prev_id), base.roadmap.state(id));
        let prev_cost = base.roadmap.config(prev_id).cost;
        {
            let config = base.roadmap.config_mut(id);
            config.parent = Some(prev_id);
            config.line_cost = line;
        }
        base.roadmap.config_mut(id).cost = base.objective.combine(prev_cost, line);
        base.roadmap.config_mut(prev_id).children.push(id);
        base.add_edge(prev_id, id);
        prev_id = id;
    }
    base.roadmap.config_mut(prev_id).is_goal = true;
    base.q_goal = Some(prev_id);
    base.best_cost = base.roadmap.config(prev_id).cost;
    base.has_solution = true;
    base.solution = None;
    info!(
        "[PathRestriction] accepted lifted section with cost {:.4} (level {})",
        base.best_cost.0, base.level
    );
    true
}
