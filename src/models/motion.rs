// Angle time-series and windowed feature vectors
//
// Channel and dimension order are a contract with the teacher profile.
// Changing either invalidates every stored profile.

use crate::models::error::{ConformanceError, ConformanceResult};
use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::sync::OnceLock;

pub const BASIC_ANGLE_COUNT: usize = 8;
pub const EXTENDED_ANGLE_COUNT: usize = 20;

/// Statistics per angle channel: mean, range, variance, periodicity
pub const STATS_PER_CHANNEL: usize = 4;

pub const FEATURE_DIM: usize = EXTENDED_ANGLE_COUNT * STATS_PER_CHANNEL + 3;

pub const TRUNK_RANGE_INDEX: usize = EXTENDED_ANGLE_COUNT * STATS_PER_CHANNEL;
pub const TRUNK_VELOCITY_INDEX: usize = TRUNK_RANGE_INDEX + 1;
pub const HIP_SYMMETRY_INDEX: usize = TRUNK_RANGE_INDEX + 2;

// ==============================================================================
// Angle Series
// ==============================================================================

/// Per-frame angle vectors in degrees, `N` channels per frame
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSeries<const N: usize> {
    frames: Vec<[f64; N]>,
}

/// Shoulder/elbow/hip/knee flexion, used for onset detection
pub type BasicAngleSeries = AngleSeries<BASIC_ANGLE_COUNT>;

/// The 20-channel set that feeds scoring
pub type ExtendedAngleSeries = AngleSeries<EXTENDED_ANGLE_COUNT>;

impl<const N: usize> AngleSeries<N> {
    pub fn new(frames: Vec<[f64; N]>) -> Self {
        Self { frames }
    }

    /// Build from loosely-typed rows, rejecting rows of the wrong width
    pub fn from_rows(rows: Vec<Vec<f64>>) -> ConformanceResult<Self> {
        let frames = rows
            .into_iter()
            .map(|row| {
                <[f64; N]>::try_from(row).map_err(|row| ConformanceError::LengthMismatch {
                    field: "angles",
                    expected: N,
                    found: row.len(),
                })
            })
            .collect::<ConformanceResult<Vec<_>>>()?;
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[[f64; N]] {
        &self.frames
    }

    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            frames: indices.iter().map(|&i| self.frames[i]).collect(),
        }
    }
}

// ==============================================================================
// Feature Vector
// ==============================================================================

/// One window reduced to its 83 statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector([f64; FEATURE_DIM]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_DIM]) -> Self {
        Self(values)
    }

    pub fn zeros() -> Self {
        Self([0.0; FEATURE_DIM])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance to another vector
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Per-dimension absolute difference
    pub fn abs_diff(&self, other: &FeatureVector) -> [f64; FEATURE_DIM] {
        let mut out = [0.0; FEATURE_DIM];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = (self.0[i] - other.0[i]).abs();
        }
        out
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = ConformanceError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let found = values.len();
        <[f64; FEATURE_DIM]>::try_from(values)
            .map(Self)
            .map_err(|_| ConformanceError::InvalidFeatureDimension {
                expected: FEATURE_DIM,
                found,
            })
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(v: FeatureVector) -> Self {
        v.0.to_vec()
    }
}

/// Column names for window feature tables, in dimension order
pub fn feature_columns() -> &'static [String] {
    static COLUMNS: OnceLock<Vec<String>> = OnceLock::new();
    COLUMNS.get_or_init(|| {
        let mut cols = Vec::with_capacity(FEATURE_DIM);
        for i in 0..EXTENDED_ANGLE_COUNT {
            cols.push(format!("f{:02}_mean", i));
            cols.push(format!("f{:02}_range", i));
            cols.push(format!("f{:02}_var", i));
            cols.push(format!("f{:02}_periodicity", i));
        }
        cols.push("trunk_range".to_string());
        cols.push("trunk_vel".to_string());
        cols.push("symmetry".to_string());
        cols
    })
}
