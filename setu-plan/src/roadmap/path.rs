//! State paths: ordered waypoint sequences on one level.

use crate::bundle::Projection;
use crate::core::problem::LevelSpace;
use crate::core::space::StateSpace;
use crate::core::state::State;

/// An ordered sequence of states on a single bundle level.
#[derive(Debug, Clone, Default)]
pub struct Path {
    states: Vec<State>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states(states: Vec<State>) -> Self {
        Self { states }
    }

    pub fn push(&mut self, s: State) {
        self.states.push(s);
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    pub fn reverse(&mut self) {
        self.states.reverse();
    }

    /// Total geodesic length of the waypoint chain.
    pub fn length(&self, space: &dyn StateSpace) -> f64 {
        self.states
            .windows(2)
            .map(|w| space.distance(&w[0], &w[1]))
            .sum()
    }

    /// Write the state at arc-length fraction `t` in `[0, 1]` into `out`.
    ///
    /// Zero-length paths yield the single (or first) waypoint.
    pub fn sample_along(&self, space: &dyn StateSpace, t: f64, out: &mut State) {
        debug_assert!(!self.states.is_empty());
        if self.states.len() == 1 {
            out.copy_from(&self.states[0]);
            return;
        }
        let total = self.length(space);
        if total <= f64::EPSILON {
            out.copy_from(&self.states[0]);
            return;
        }
        let mut remaining = t.clamp(0.0, 1.0) * total;
        for w in self.states.windows(2) {
            let seg = space.distance(&w[0], &w[1]);
            if remaining <= seg || seg <= f64::EPSILON {
                let frac = if seg > f64::EPSILON { remaining / seg } else { 0.0 };
                space.interpolate(&w[0], &w[1], frac, out);
                return;
            }
            remaining -= seg;
        }
        out.copy_from(self.states.last().unwrap());
    }

    /// Resample to exactly `n >= 2` waypoints equally spaced in arc length.
    pub fn resample(&self, space: &dyn StateSpace, n: usize) -> Path {
        debug_assert!(n >= 2);
        let mut out = Vec::with_capacity(n);
        let mut probe = space.alloc_state();
        for i in 0..n {
            let t = i as f64 / (n - 1) as f64;
            self.sample_along(space, t, &mut probe);
            out.push(probe.clone());
        }
        Path::from_states(out)
    }

    /// Greedy line-of-sight shortcut: drop interior waypoints whenever the
    /// motion checker accepts the direct hop. Endpoints always survive. The
    /// result can land in a different path class, so class enumeration must
    /// not shortcut its candidates.
    pub fn shortcut(&self, space: &LevelSpace) -> Path {
        if self.states.len() <= 2 {
            return self.clone();
        }
        let mut kept = vec![self.states[0].clone()];
        let mut anchor = 0;
        while anchor + 1 < self.states.len() {
            let mut reach = anchor + 1;
            for candidate in (anchor + 2..self.states.len()).rev() {
                if space.check_motion(&self.states[anchor], &self.states[candidate]) {
                    reach = candidate;
                    break;
                }
            }
            kept.push(self.states[reach].clone());
            anchor = reach;
        }
        Path::from_states(kept)
    }

    /// Project every waypoint down through `projection`.
    pub fn project(&self, projection: &Projection) -> Path {
        let mut out = Vec::with_capacity(self.states.len());
        for s in &self.states {
            let mut base = projection.alloc_base();
            projection.project(s, &mut base);
            out.push(base);
        }
        Path::from_states(out)
    }
}
