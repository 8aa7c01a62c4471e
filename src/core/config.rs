// Scoring configuration - persisted as JSON, validated on load and save

use crate::models::error::{ConformanceError, ConformanceResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Exercise timing model built from teacher recordings
    pub timing_model_path: PathBuf,
    /// Teacher feature profile
    pub teacher_profile_path: PathBuf,
    /// Where `run` creates run directories when no output directory is given
    pub results_path: PathBuf,
    /// Capture rate assumed when a recording carries no timestamps
    pub capture_fps: f64,
    /// Frames per feature window
    pub window_size: usize,
    /// Frames between consecutive window starts
    pub hop: usize,
    /// Distance (after subtracting teacher spread) still scored as 100
    pub tolerance: f64,
    /// Decay scale of the score beyond the tolerance
    pub alpha: f64,
    /// Moving-average length for onset detection (odd)
    pub onset_smoothing: usize,
    /// Onset threshold in standard deviations above the mean speed
    pub onset_sigma: f64,
    /// Mean landmark visibility for a frame to count as confident (0.0-1.0)
    pub min_visibility: f64,
    /// Drop low-visibility frames from exercise selection
    pub apply_visibility_mask: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let reference = PathBuf::from("reference");

        Self {
            timing_model_path: reference.join("exercise_timing.json"),
            teacher_profile_path: reference.join("teacher_profile.json"),
            results_path: PathBuf::from("results"),
            capture_fps: 30.0,
            window_size: 30,
            hop: 15,
            tolerance: 3000.0,
            alpha: 7000.0,
            onset_smoothing: 5,
            onset_sigma: 2.0,
            min_visibility: 0.5,
            apply_visibility_mask: false,
        }
    }
}

impl ScoringConfig {
    /// Load configuration from `path`, creating it with defaults if missing
    pub fn load_from(path: &Path) -> ConformanceResult<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ScoringConfig = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> ConformanceResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConformanceResult<()> {
        let invalid =
            |msg: String| -> ConformanceResult<()> { Err(ConformanceError::InvalidConfig(msg)) };

        if self.window_size == 0 {
            return invalid("Window size must be at least 1 frame".to_string());
        }

        if self.hop == 0 || self.hop > self.window_size {
            return invalid(format!(
                "Invalid hop: {}. Must be between 1 and the window size ({})",
                self.hop, self.window_size
            ));
        }

        if !self.capture_fps.is_finite() || self.capture_fps <= 0.0 {
            return invalid(format!(
                "Invalid capture FPS: {}. Must be greater than 0",
                self.capture_fps
            ));
        }

        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return invalid(format!(
                "Invalid tolerance: {}. Must not be negative",
                self.tolerance
            ));
        }

        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return invalid(format!("Invalid alpha: {}. Must be greater than 0", self.alpha));
        }

        if self.onset_smoothing == 0 || self.onset_smoothing % 2 == 0 {
            return invalid(format!(
                "Invalid onset smoothing length: {}. Must be an odd number of frames",
                self.onset_smoothing
            ));
        }

        if self.onset_sigma.is_nan() || self.onset_sigma < 0.0 {
            return invalid(format!(
                "Invalid onset sigma: {}. Must not be negative",
                self.onset_sigma
            ));
        }

        if !(0.0..=1.0).contains(&self.min_visibility) {
            return invalid(format!(
                "Invalid minimum visibility: {}. Must be between 0.0 and 1.0",
                self.min_visibility
            ));
        }

        Ok(())
    }

    /// Reset the file at `path` to the default configuration
    pub fn reset(path: &Path) -> ConformanceResult<Self> {
        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }
}
