// Onset detection - finds where the routine's first movement starts in a session

use crate::models::error::{ConformanceError, ConformanceResult};
use crate::models::motion::BasicAngleSeries;

pub const DEFAULT_SMOOTHING: usize = 5;
pub const DEFAULT_SIGMA: f64 = 2.0;

/// Result of onset detection
#[derive(Debug, Clone, PartialEq)]
pub struct Onset {
    /// Seconds to subtract from every timestamp; 0.0 when no onset was found
    pub t0: f64,
    /// Frame whose smoothed speed first crossed the threshold
    pub frame: Option<usize>,
    pub threshold: f64,
}

impl Onset {
    fn none(threshold: f64) -> Self {
        Self {
            t0: 0.0,
            frame: None,
            threshold,
        }
    }
}

/// Flags the first frame where joint-angle speed rises clearly above the
/// session's own baseline.
pub struct OnsetDetector {
    smoothing: usize,
    sigma: f64,
}

impl OnsetDetector {
    /// Create a new onset detector
    ///
    /// # Arguments
    /// * `smoothing` - Moving-average length applied to the speed signal (odd)
    /// * `sigma` - Threshold in standard deviations above the mean smoothed speed
    pub fn new(smoothing: usize, sigma: f64) -> Self {
        Self {
            smoothing: smoothing.max(1),
            sigma,
        }
    }

    /// Detect the routine onset from the basic angle set.
    ///
    /// Speed per frame is the mean absolute first difference across channels.
    /// The speed is smoothed with a centred moving average (zero-padded edges),
    /// and the first sample strictly above `mean + sigma * std` marks t0.
    pub fn detect(
        &self,
        angles: &BasicAngleSeries,
        timestamps: &[f64],
    ) -> ConformanceResult<Onset> {
        if angles.len() != timestamps.len() {
            return Err(ConformanceError::LengthMismatch {
                field: "timestamps",
                expected: angles.len(),
                found: timestamps.len(),
            });
        }

        let speed = Self::angular_speed(angles);
        if speed.is_empty() {
            return Ok(Onset::none(0.0));
        }

        let smoothed = self.smooth(&speed);
        let n = smoothed.len() as f64;
        let mean = smoothed.iter().sum::<f64>() / n;
        let std = (smoothed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let threshold = mean + self.sigma * std;

        let onset = smoothed
            .iter()
            .position(|&v| v > threshold)
            .map(|frame| Onset {
                t0: timestamps[frame],
                frame: Some(frame),
                threshold,
            })
            .unwrap_or_else(|| Onset::none(threshold));

        Ok(onset)
    }

    /// Mean absolute frame-to-frame change across channels (length T − 1)
    fn angular_speed(angles: &BasicAngleSeries) -> Vec<f64> {
        angles
            .frames()
            .windows(2)
            .map(|w| {
                let total: f64 = w[0].iter().zip(w[1].iter()).map(|(a, b)| (b - a).abs()).sum();
                total / w[0].len() as f64
            })
            .collect()
    }

    /// Centred moving average, output the same length as the input
    fn smooth(&self, values: &[f64]) -> Vec<f64> {
        let half = self.smoothing / 2;
        let k = self.smoothing as f64;

        (0..values.len())
            .map(|i| {
                let lo = i.saturating_sub(half);
                let hi = (i + half + 1).min(values.len());
                values[lo..hi].iter().sum::<f64>() / k
            })
            .collect()
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING, DEFAULT_SIGMA)
    }
}
