//! Owned configuration-space states.

use serde::{Deserialize, Serialize};

/// A configuration-space state: a flat vector of coordinates.
///
/// The interpretation of each slot belongs to the space that allocated the
/// state (a unit quaternion occupies four slots, an angle one). States are
/// plain owned values; cloning one is the only way to alias it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    values: Vec<f64>,
}

impl State {
    /// Create a state from raw coordinate values.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// All-zero state with the given number of slots.
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// Coordinate slots.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable coordinate slots.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Number of coordinate slots (not degrees of freedom).
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overwrite this state with another of the same layout.
    #[inline]
    pub fn copy_from(&mut self, other: &State) {
        debug_assert_eq!(self.values.len(), other.values.len());
        self.values.copy_from_slice(&other.values);
    }
}

impl From<Vec<f64>> for State {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}
