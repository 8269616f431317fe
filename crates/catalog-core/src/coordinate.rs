//! Network coordinate values.
//!
//! A coordinate is produced elsewhere (by a Vivaldi-style estimator) and
//! only stored and validated here.

use serde::{Deserialize, Serialize};

/// Dimensionality of freshly created coordinates.
pub const DEFAULT_DIMENSIONALITY: usize = 8;

/// Error estimate assigned to a coordinate that has seen no samples.
pub const DEFAULT_ERROR: f64 = 1.5;

/// Smallest height a coordinate carries.
pub const HEIGHT_MIN: f64 = 10.0e-6;

/// A node's estimated position in network-latency space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Euclidean part of the position.
    #[serde(with = "crate::floats::lossless_vec")]
    pub vec: Vec<f64>,
    /// Confidence in the position; lower is better.
    #[serde(with = "crate::floats::lossless")]
    pub error: f64,
    /// Per-node offset applied on top of the euclidean distance.
    #[serde(with = "crate::floats::lossless")]
    pub adjustment: f64,
    /// Non-euclidean height component (access-link latency).
    #[serde(with = "crate::floats::lossless")]
    pub height: f64,
}

impl Coordinate {
    /// The origin coordinate with the given dimensionality.
    pub fn new(dimensionality: usize) -> Self {
        Self {
            vec: vec![0.0; dimensionality],
            error: DEFAULT_ERROR,
            adjustment: 0.0,
            height: HEIGHT_MIN,
        }
    }

    /// True when every numeric component is finite.
    ///
    /// Depends only on the value itself, so replicas replaying the same
    /// log accept and reject exactly the same coordinates.
    pub fn is_valid(&self) -> bool {
        self.vec.iter().all(|c| c.is_finite())
            && self.error.is_finite()
            && self.adjustment.is_finite()
            && self.height.is_finite()
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONALITY)
    }
}
