// Sliding-window feature extraction - reduces angle/landmark windows to fixed-length vectors

use crate::models::error::{ConformanceError, ConformanceResult};
use crate::models::motion::{
    ExtendedAngleSeries, FeatureVector, EXTENDED_ANGLE_COUNT, FEATURE_DIM, HIP_SYMMETRY_INDEX,
    STATS_PER_CHANNEL, TRUNK_RANGE_INDEX, TRUNK_VELOCITY_INDEX,
};
use crate::models::pose::{pelvis_center, NormalizedPose, Point3, LANDMARK_COUNT};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub const DEFAULT_WINDOW_SIZE: usize = 30;
pub const DEFAULT_HOP: usize = 15;

/// Fewer samples than this and periodicity is reported as 0
const MIN_PERIODICITY_SAMPLES: usize = 4;

/// Hip-angle channels compared for left/right symmetry
const LEFT_HIP_CHANNEL: usize = 6;
const RIGHT_HIP_CHANNEL: usize = 7;

// ==============================================================================
// Channel statistics (NaN-ignoring)
// ==============================================================================

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Mean over non-NaN samples; NaN when there are none
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, n) = finite(values).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// max − min over non-NaN samples
pub fn nan_range(values: &[f64]) -> f64 {
    let (min, max) = finite(values).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min > max {
        f64::NAN
    } else {
        max - min
    }
}

/// Population variance over non-NaN samples
pub fn nan_variance(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let (sum_sq, n) = finite(values).fold((0.0, 0usize), |(s, n), v| {
        (s + (v - mean).powi(2), n + 1)
    });
    sum_sq / n as f64
}

/// Share of non-DC spectral magnitude held by the strongest frequency bin.
///
/// NaN samples count as zero. Returns 0.0 for fewer than 4 samples or a flat
/// spectrum.
pub fn periodicity(values: &[f64]) -> f64 {
    if values.len() < MIN_PERIODICITY_SAMPLES {
        return 0.0;
    }
    let fft = FftPlanner::new().plan_fft_forward(values.len());
    periodicity_with(fft.as_ref(), values)
}

fn periodicity_with(fft: &dyn Fft<f64>, values: &[f64]) -> f64 {
    let n = values.len();
    if n < MIN_PERIODICITY_SAMPLES {
        return 0.0;
    }

    let mut buffer: Vec<Complex64> = values
        .iter()
        .map(|&v| Complex64::new(if v.is_nan() { 0.0 } else { v }, 0.0))
        .collect();
    fft.process(&mut buffer);

    // one-sided spectrum: bins 1..=n/2
    let dc = buffer[0].norm();
    let (total, peak) = buffer[1..=n / 2]
        .iter()
        .map(|c| c.norm())
        .fold((0.0, 0.0_f64), |(sum, max), m| (sum + m, max.max(m)));

    // a flat channel leaves only round-off in the non-DC bins
    if total <= 1e-9 * (1.0 + dc) {
        return 0.0;
    }
    peak / total
}

// ==============================================================================
// Window Feature Builder
// ==============================================================================

/// Cuts an exercise interval into overlapping windows and reduces each one
/// to an 83-dimensional [`FeatureVector`].
pub struct WindowFeatureBuilder {
    window: usize,
    hop: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl WindowFeatureBuilder {
    /// `window` and `hop` must both be non-zero
    pub fn new(window: usize, hop: usize) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(window);
        Self { window, hop, fft }
    }

    /// Start frame of every full window over `len` frames
    pub fn window_starts(&self, len: usize) -> impl Iterator<Item = usize> {
        let window = self.window;
        (0..len)
            .step_by(self.hop.max(1))
            .take_while(move |start| start + window <= len)
    }

    /// `floor((len − W) / H) + 1` for `len ≥ W`, otherwise 0
    pub fn window_count(&self, len: usize) -> usize {
        if len < self.window {
            0
        } else {
            (len - self.window) / self.hop.max(1) + 1
        }
    }

    /// Feature vector for every window of one exercise interval.
    ///
    /// An interval shorter than one window yields an empty vector.
    pub fn build(
        &self,
        angles: &ExtendedAngleSeries,
        pose: &NormalizedPose,
    ) -> ConformanceResult<Vec<FeatureVector>> {
        if angles.len() != pose.len() {
            return Err(ConformanceError::LengthMismatch {
                field: "angles",
                expected: pose.len(),
                found: angles.len(),
            });
        }

        let angle_frames = angles.frames();
        let positions = pose.positions();

        Ok(self
            .window_starts(angles.len())
            .map(|start| {
                let end = start + self.window;
                self.extract(&angle_frames[start..end], &positions[start..end])
            })
            .collect())
    }

    /// Reduce a single window
    pub fn extract(
        &self,
        angles: &[[f64; EXTENDED_ANGLE_COUNT]],
        positions: &[[Point3; LANDMARK_COUNT]],
    ) -> FeatureVector {
        let mut values = [0.0; FEATURE_DIM];
        let mut channel = Vec::with_capacity(angles.len());

        for c in 0..EXTENDED_ANGLE_COUNT {
            channel.clear();
            channel.extend(angles.iter().map(|frame| frame[c]));

            let base = c * STATS_PER_CHANNEL;
            values[base] = nan_mean(&channel);
            values[base + 1] = nan_range(&channel);
            values[base + 2] = nan_variance(&channel);
            values[base + 3] = if channel.len() == self.fft.len() {
                periodicity_with(self.fft.as_ref(), &channel)
            } else {
                periodicity(&channel)
            };
        }

        let pelvis: Vec<Point3> = positions.iter().map(pelvis_center).collect();
        let pelvis_y: Vec<f64> = pelvis.iter().map(|p| p[1]).collect();
        values[TRUNK_RANGE_INDEX] = nan_range(&pelvis_y);
        values[TRUNK_VELOCITY_INDEX] = mean_step_length(&pelvis);

        let hip_gap: Vec<f64> = angles
            .iter()
            .map(|frame| (frame[LEFT_HIP_CHANNEL] - frame[RIGHT_HIP_CHANNEL]).abs())
            .collect();
        values[HIP_SYMMETRY_INDEX] = nan_mean(&hip_gap);

        FeatureVector::new(values)
    }
}

impl Default for WindowFeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_HOP)
    }
}

/// Mean Euclidean length of frame-to-frame displacement
fn mean_step_length(track: &[Point3]) -> f64 {
    if track.len() < 2 {
        return 0.0;
    }
    let steps: Vec<f64> = track
        .windows(2)
        .map(|w| {
            let dx = w[1][0] - w[0][0];
            let dy = w[1][1] - w[0][1];
            let dz = w[1][2] - w[0][2];
            (dx * dx + dy * dy + dz * dz).sqrt()
        })
        .collect();
    nan_mean(&steps)
}
