//! State spaces: the geometric capability interface each bundle level plans in.
//!
//! A [`StateSpace`] knows how to measure, sample and interpolate states; it
//! does not know about obstacles. Levels of different dimension coexist in
//! one planner, so spaces are used through `Arc<dyn StateSpace>` handles and
//! states carry their coordinates in a flat slot vector (see
//! [`State`](super::State)).

use std::f64::consts::PI;
use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;

use super::state::State;

/// Geometric capabilities of a configuration space.
///
/// `dimension` is degrees of freedom; `value_count` is the number of slots a
/// state occupies (a unit quaternion has dimension 3 but four slots).
pub trait StateSpace {
    /// Degrees of freedom.
    fn dimension(&self) -> usize;

    /// Number of coordinate slots in a state of this space.
    fn value_count(&self) -> usize {
        self.dimension()
    }

    /// A fresh state at the space's identity/origin element.
    fn alloc_state(&self) -> State;

    /// Geodesic distance between two states.
    fn distance(&self, a: &State, b: &State) -> f64;

    /// Write the point at fraction `t` along the geodesic from `from` to
    /// `to` into `out`. `t` is clamped to `[0, 1]`.
    fn interpolate(&self, from: &State, to: &State, t: f64, out: &mut State);

    /// Sample uniformly over the space (within bounds).
    fn sample_uniform(&self, rng: &mut StdRng, out: &mut State);

    /// Sample uniformly within `radius` (in distance units) of `center`.
    fn sample_uniform_near(&self, center: &State, radius: f64, rng: &mut StdRng, out: &mut State);

    /// Whether the state lies within the space's bounds.
    fn satisfies_bounds(&self, s: &State) -> bool;

    /// Largest distance between any two states.
    fn maximum_extent(&self) -> f64;

    /// Lebesgue measure (volume) of the space.
    fn measure(&self) -> f64;

    /// True when `interpolate(a, b, t)` mirrors `interpolate(b, a, 1-t)`.
    fn has_symmetric_interpolate(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Euclidean boxes
// ---------------------------------------------------------------------------

/// Axis-aligned box in `R^n`.
#[derive(Debug, Clone)]
pub struct RealVectorSpace {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl RealVectorSpace {
    /// Box with per-axis bounds. Panics if the bound vectors disagree in
    /// length or any interval is inverted.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Self {
        assert_eq!(low.len(), high.len(), "bound vectors must match");
        for (l, h) in low.iter().zip(high.iter()) {
            assert!(l <= h, "inverted bound interval [{l}, {h}]");
        }
        Self { low, high }
    }

    /// Cube `[low, high]^n`.
    pub fn cube(n: usize, low: f64, high: f64) -> Self {
        Self::new(vec![low; n], vec![high; n])
    }

    pub fn bounds(&self) -> (&[f64], &[f64]) {
        (&self.low, &self.high)
    }
}

impl StateSpace for RealVectorSpace {
    fn dimension(&self) -> usize {
        self.low.len()
    }

    fn alloc_state(&self) -> State {
        State::zeros(self.low.len())
    }

    fn distance(&self, a: &State, b: &State) -> f64 {
        a.values()
            .iter()
            .zip(b.values())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    fn interpolate(&self, from: &State, to: &State, t: f64, out: &mut State) {
        let t = t.clamp(0.0, 1.0);
        for (i, o) in out.values_mut().iter_mut().enumerate() {
            let f = from.values()[i];
            *o = f + t * (to.values()[i] - f);
        }
    }

    fn sample_uniform(&self, rng: &mut StdRng, out: &mut State) {
        for (i, o) in out.values_mut().iter_mut().enumerate() {
            *o = if self.low[i] < self.high[i] {
                rng.random_range(self.low[i]..self.high[i])
            } else {
                self.low[i]
            };
        }
    }

    fn sample_uniform_near(&self, center: &State, radius: f64, rng: &mut StdRng, out: &mut State) {
        for (i, o) in out.values_mut().iter_mut().enumerate() {
            let c = center.values()[i];
            let lo = (c - radius).max(self.low[i]);
            let hi = (c + radius).min(self.high[i]);
            *o = if lo < hi { rng.random_range(lo..hi) } else { lo };
        }
    }

    fn satisfies_bounds(&self, s: &State) -> bool {
        s.values()
            .iter()
            .enumerate()
            .all(|(i, v)| *v >= self.low[i] - f64::EPSILON && *v <= self.high[i] + f64::EPSILON)
    }

    fn maximum_extent(&self) -> f64 {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| (h - l) * (h - l))
            .sum::<f64>()
            .sqrt()
    }

    fn measure(&self) -> f64 {
        self.low.iter().zip(&self.high).map(|(l, h)| h - l).product()
    }
}

// ---------------------------------------------------------------------------
// Planar rotations
// ---------------------------------------------------------------------------

/// Wrap an angle to `[-pi, pi]`.
#[inline]
pub fn normalize_angle(theta: f64) -> f64 {
    let mut a = theta % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// The circle `SO(2)`, one angle slot normalized to `[-pi, pi]`.
#[derive(Debug, Clone, Default)]
pub struct So2Space;

impl StateSpace for So2Space {
    fn dimension(&self) -> usize {
        1
    }

    fn alloc_state(&self) -> State {
        State::zeros(1)
    }

    fn distance(&self, a: &State, b: &State) -> f64 {
        let d = (a.values()[0] - b.values()[0]).abs() % (2.0 * PI);
        if d > PI { 2.0 * PI - d } else { d }
    }

    fn interpolate(&self, from: &State, to: &State, t: f64, out: &mut State) {
        let t = t.clamp(0.0, 1.0);
        let f = from.values()[0];
        let mut diff = to.values()[0] - f;
        // walk the short way around the circle
        if diff > PI {
            diff -= 2.0 * PI;
        } else if diff < -PI {
            diff += 2.0 * PI;
        }
        out.values_mut()[0] = normalize_angle(f + t * diff);
    }

    fn sample_uniform(&self, rng: &mut StdRng, out: &mut State) {
        out.values_mut()[0] = rng.random_range(-PI..PI);
    }

    fn sample_uniform_near(&self, center: &State, radius: f64, rng: &mut StdRng, out: &mut State) {
        if radius >= PI {
            self.sample_uniform(rng, out);
        } else {
            let c = center.values()[0];
            out.values_mut()[0] = normalize_angle(rng.random_range(c - radius..c + radius));
        }
    }

    fn satisfies_bounds(&self, s: &State) -> bool {
        let v = s.values()[0];
        (-PI..=PI).contains(&v)
    }

    fn maximum_extent(&self) -> f64 {
        PI
    }

    fn measure(&self) -> f64 {
        2.0 * PI
    }
}

// ---------------------------------------------------------------------------
// Spatial rotations
// ---------------------------------------------------------------------------

/// Quaternion dot product over the `[w, x, y, z]` slot layout.
#[inline]
pub(crate) fn quat_dot(a: &[f64], b: &[f64]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
pub(crate) fn quat_normalize(q: &mut [f64]) {
    let n = quat_dot(q, q).sqrt();
    if n > f64::EPSILON {
        for v in q.iter_mut() {
            *v /= n;
        }
    } else {
        q.copy_from_slice(&[1.0, 0.0, 0.0, 0.0]);
    }
}

/// Yaw (rotation about z) of a unit quaternion.
pub(crate) fn quat_yaw(q: &[f64]) -> f64 {
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);
    (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z))
}

/// ZYX Euler angles (roll, pitch, yaw) of a unit quaternion.
pub(crate) fn quat_to_euler(q: &[f64]) -> (f64, f64, f64) {
    let (w, x, y, z) = (q[0], q[1], q[2], q[3]);
    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let sp = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = sp.asin();
    let yaw = quat_yaw(q);
    (roll, pitch, yaw)
}

/// Unit quaternion from ZYX Euler angles.
pub(crate) fn quat_from_euler(roll: f64, pitch: f64, yaw: f64, out: &mut [f64]) {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();
    out[0] = cr * cp * cy + sr * sp * sy;
    out[1] = sr * cp * cy - cr * sp * sy;
    out[2] = cr * sp * cy + sr * cp * sy;
    out[3] = cr * cp * sy - sr * sp * cy;
}

/// The rotation group `SO(3)` as unit quaternions (`[w, x, y, z]` slots,
/// `q` and `-q` identified).
#[derive(Debug, Clone, Default)]
pub struct So3Space;

impl StateSpace for So3Space {
    fn dimension(&self) -> usize {
        3
    }

    fn value_count(&self) -> usize {
        4
    }

    fn alloc_state(&self) -> State {
        State::new(vec![1.0, 0.0, 0.0, 0.0])
    }

    fn distance(&self, a: &State, b: &State) -> f64 {
        let d = quat_dot(a.values(), b.values()).abs().clamp(0.0, 1.0);
        d.acos()
    }

    fn interpolate(&self, from: &State, to: &State, t: f64, out: &mut State) {
        let t = t.clamp(0.0, 1.0);
        let a = from.values();
        let mut b = [to.values()[0], to.values()[1], to.values()[2], to.values()[3]];
        let mut dot = quat_dot(a, &b);
        if dot < 0.0 {
            for v in b.iter_mut() {
                *v = -*v;
            }
            dot = -dot;
        }
        let o = out.values_mut();
        if dot > 1.0 - 1e-9 {
            // nearly parallel: linear blend is accurate and avoids 0/0
            for i in 0..4 {
                o[i] = a[i] + t * (b[i] - a[i]);
            }
        } else {
            let theta = dot.clamp(-1.0, 1.0).acos();
            let sin_theta = theta.sin();
            let wa = ((1.0 - t) * theta).sin() / sin_theta;
            let wb = (t * theta).sin() / sin_theta;
            for i in 0..4 {
                o[i] = wa * a[i] + wb * b[i];
            }
        }
        quat_normalize(o);
    }

    fn sample_uniform(&self, rng: &mut StdRng, out: &mut State) {
        // Shoemake subgroup algorithm
        let u1: f64 = rng.random();
        let u2: f64 = rng.random_range(0.0..2.0 * PI);
        let u3: f64 = rng.random_range(0.0..2.0 * PI);
        let (a, b) = ((1.0 - u1).sqrt(), u1.sqrt());
        let o = out.values_mut();
        o[0] = b * u3.cos();
        o[1] = a * u2.sin();
        o[2] = a * u2.cos();
        o[3] = b * u3.sin();
    }

    fn sample_uniform_near(&self, center: &State, radius: f64, rng: &mut StdRng, out: &mut State) {
        if radius >= self.maximum_extent() {
            self.sample_uniform(rng, out);
            return;
        }
        // rotation by angle phi moves a quaternion by phi/2 in this metric
        let phi = rng.random_range(-2.0 * radius..2.0 * radius);
        let axis = loop {
            let v = [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ];
            let n2: f64 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
            if n2 > 1e-12 && n2 <= 1.0 {
                let n = n2.sqrt();
                break [v[0] / n, v[1] / n, v[2] / n];
            }
        };
        let (s, c) = (phi * 0.5).sin_cos();
        let dq = [c, axis[0] * s, axis[1] * s, axis[2] * s];
        let q = center.values();
        let o = out.values_mut();
        // Hamilton product q * dq
        o[0] = q[0] * dq[0] - q[1] * dq[1] - q[2] * dq[2] - q[3] * dq[3];
        o[1] = q[0] * dq[1] + q[1] * dq[0] + q[2] * dq[3] - q[3] * dq[2];
        o[2] = q[0] * dq[2] - q[1] * dq[3] + q[2] * dq[0] + q[3] * dq[1];
        o[3] = q[0] * dq[3] + q[1] * dq[2] - q[2] * dq[1] + q[3] * dq[0];
        quat_normalize(o);
    }

    fn satisfies_bounds(&self, s: &State) -> bool {
        (quat_dot(s.values(), s.values()) - 1.0).abs() < 1e-6
    }

    fn maximum_extent(&self) -> f64 {
        PI / 2.0
    }

    fn measure(&self) -> f64 {
        PI * PI
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Weighted Cartesian product of subspaces; states are concatenated slots.
#[derive(Clone)]
pub struct CompoundSpace {
    subspaces: Vec<(Arc<dyn StateSpace>, f64)>,
    offsets: Vec<usize>,
    total_len: usize,
}

impl CompoundSpace {
    pub fn new(subspaces: Vec<(Arc<dyn StateSpace>, f64)>) -> Self {
        let mut offsets = Vec::with_capacity(subspaces.len());
        let mut total_len = 0;
        for (s, _) in &subspaces {
            offsets.push(total_len);
            total_len += s.value_count();
        }
        Self {
            subspaces,
            offsets,
            total_len,
        }
    }

    fn sub_slices<'a>(&self, s: &'a State, k: usize) -> &'a [f64] {
        let start = self.offsets[k];
        &s.values()[start..start + self.subspaces[k].0.value_count()]
    }

    /// Run `f` on each subspace with matching sub-states of `a`, `b`, `out`.
    fn for_each_sub(
        &self,
        a: &State,
        b: Option<&State>,
        out: &mut State,
        mut f: impl FnMut(&dyn StateSpace, &State, Option<&State>, &mut State),
    ) {
        for (k, (space, _)) in self.subspaces.iter().enumerate() {
            let sa = State::new(self.sub_slices(a, k).to_vec());
            let sb = b.map(|b| State::new(self.sub_slices(b, k).to_vec()));
            let mut so = State::zeros(space.value_count());
            f(space.as_ref(), &sa, sb.as_ref(), &mut so);
            let start = self.offsets[k];
            out.values_mut()[start..start + space.value_count()].copy_from_slice(so.values());
        }
    }
}

impl StateSpace for CompoundSpace {
    fn dimension(&self) -> usize {
        self.subspaces.iter().map(|(s, _)| s.dimension()).sum()
    }

    fn value_count(&self) -> usize {
        self.total_len
    }

    fn alloc_state(&self) -> State {
        let mut out = State::zeros(self.total_len);
        for (k, (space, _)) in self.subspaces.iter().enumerate() {
            let sub = space.alloc_state();
            let start = self.offsets[k];
            out.values_mut()[start..start + space.value_count()].copy_from_slice(sub.values());
        }
        out
    }

    fn distance(&self, a: &State, b: &State) -> f64 {
        self.subspaces
            .iter()
            .enumerate()
            .map(|(k, (space, w))| {
                let sa = State::new(self.sub_slices(a, k).to_vec());
                let sb = State::new(self.sub_slices(b, k).to_vec());
                w * space.distance(&sa, &sb)
            })
            .sum()
    }

    fn interpolate(&self, from: &State, to: &State, t: f64, out: &mut State) {
        self.for_each_sub(from, Some(to), out, |space, a, b, o| {
            space.interpolate(a, b.unwrap(), t, o);
        });
    }

    fn sample_uniform(&self, rng: &mut StdRng, out: &mut State) {
        let dummy = self.alloc_state();
        self.for_each_sub(&dummy, None, out, |space, _, _, o| {
            space.sample_uniform(rng, o);
        });
    }

    fn sample_uniform_near(&self, center: &State, radius: f64, rng: &mut StdRng, out: &mut State) {
        self.for_each_sub(center, None, out, |space, c, _, o| {
            space.sample_uniform_near(c, radius, rng, o);
        });
    }

    fn satisfies_bounds(&self, s: &State) -> bool {
        self.subspaces.iter().enumerate().all(|(k, (space, _))| {
            let sub = State::new(self.sub_slices(s, k).to_vec());
            space.satisfies_bounds(&sub)
        })
    }

    fn maximum_extent(&self) -> f64 {
        self.subspaces
            .iter()
            .map(|(s, w)| w * s.maximum_extent())
            .sum()
    }

    fn measure(&self) -> f64 {
        self.subspaces.iter().map(|(s, _)| s.measure()).product()
    }

    fn has_symmetric_interpolate(&self) -> bool {
        self.subspaces
            .iter()
            .all(|(s, _)| s.has_symmetric_interpolate())
    }
}

/// `SE(2)` = `R^2 x SO(2)`, slots `[x, y, theta]`.
pub fn se2_space(low: [f64; 2], high: [f64; 2]) -> Arc<dyn StateSpace> {
    Arc::new(CompoundSpace::new(vec![
        (
            Arc::new(RealVectorSpace::new(low.to_vec(), high.to_vec())),
            1.0,
        ),
        (Arc::new(So2Space), 0.5),
    ]))
}

/// `SE(3)` = `R^3 x SO(3)`, slots `[x, y, z, qw, qx, qy, qz]`.
pub fn se3_space(low: [f64; 3], high: [f64; 3]) -> Arc<dyn StateSpace> {
    Arc::new(CompoundSpace::new(vec![
        (
            Arc::new(RealVectorSpace::new(low.to_vec(), high.to_vec())),
            1.0,
        ),
        (Arc::new(So3Space), 1.0),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    #[test]
    fn test_real_vector_distance_and_extent() {
        let space = RealVectorSpace::cube(2, 0.0, 1.0);
        let a = State::new(vec![0.0, 0.0]);
        let b = State::new(vec![1.0, 1.0]);
        assert_relative_eq!(space.distance(&a, &b), 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(space.maximum_extent(), 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(space.measure(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_half_steps_reconstruct_endpoint() {
        let space = RealVectorSpace::cube(3, -1.0, 1.0);
        let a = State::new(vec![-0.5, 0.2, 0.9]);
        let b = State::new(vec![0.7, -0.3, -0.1]);
        let mut mid = space.alloc_state();
        let mut end = space.alloc_state();
        space.interpolate(&a, &b, 0.5, &mut mid);
        space.interpolate(&mid, &b, 1.0, &mut end);
        assert!(space.distance(&end, &b) < 1e-12);
    }

    #[test]
    fn test_so2_wraps_short_way() {
        let space = So2Space;
        let a = State::new(vec![3.0]);
        let b = State::new(vec![-3.0]);
        // short way crosses the pi seam
        assert!(space.distance(&a, &b) < 0.3);
        let mut mid = space.alloc_state();
        space.interpolate(&a, &b, 0.5, &mut mid);
        assert!(mid.values()[0].abs() > 3.0 || mid.values()[0].abs() < 1e-9);
    }

    #[test]
    fn test_so3_identity_distance_zero() {
        let space = So3Space;
        let a = space.alloc_state();
        let mut b = space.alloc_state();
        // -q is the same rotation
        for v in b.values_mut() {
            *v = -*v;
        }
        assert_relative_eq!(space.distance(&a, &b), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_so3_sampling_is_unit() {
        let space = So3Space;
        let mut rng = StdRng::seed_from_u64(7);
        let mut s = space.alloc_state();
        for _ in 0..50 {
            space.sample_uniform(&mut rng, &mut s);
            assert!(space.satisfies_bounds(&s));
        }
    }

    #[test]
    fn test_euler_round_trip() {
        let mut q = [0.0; 4];
        quat_from_euler(0.3, -0.4, 1.2, &mut q);
        let (r, p, y) = quat_to_euler(&q);
        assert_relative_eq!(r, 0.3, epsilon = 1e-9);
        assert_relative_eq!(p, -0.4, epsilon = 1e-9);
        assert_relative_eq!(y, 1.2, epsilon = 1e-9);
    }

    #[test]
    fn test_se2_layout() {
        let space = se2_space([0.0, 0.0], [1.0, 1.0]);
        assert_eq!(space.dimension(), 3);
        assert_eq!(space.value_count(), 3);
        let s = space.alloc_state();
        assert!(space.satisfies_bounds(&s));
    }

    #[test]
    fn test_se3_layout() {
        let space = se3_space([0.0; 3], [1.0; 3]);
        assert_eq!(space.dimension(), 6);
        assert_eq!(space.value_count(), 7);
    }

    #[test]
    fn test_compound_sampling_in_bounds() {
        let space = se2_space([-2.0, -2.0], [2.0, 2.0]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut s = space.alloc_state();
        for _ in 0..100 {
            space.sample_uniform(&mut rng, &mut s);
            assert!(space.satisfies_bounds(&s));
        }
    }
}
