// Reference artifacts built from teacher recordings: exercise timing and feature profile

use crate::models::error::{ConformanceError, ConformanceResult};
use crate::models::motion::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ==============================================================================
// Exercise Timing Model
// ==============================================================================

/// Mean start/end of one exercise, seconds from routine onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseInterval {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl ExerciseInterval {
    /// Half-open membership: `[start_sec, end_sec)`
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_sec && t < self.end_sec
    }
}

/// Row of the timing model file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TimingEntry {
    exercise_id: String,
    mean_start_sec: f64,
    mean_end_sec: f64,
}

/// Exercise id → interval, ordered by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseTimingModel {
    intervals: BTreeMap<String, ExerciseInterval>,
}

impl ExerciseTimingModel {
    pub fn new(intervals: BTreeMap<String, ExerciseInterval>) -> ConformanceResult<Self> {
        for (id, interval) in &intervals {
            if !(interval.start_sec.is_finite() && interval.end_sec.is_finite())
                || interval.end_sec < interval.start_sec
            {
                return Err(ConformanceError::MalformedInput(format!(
                    "exercise {} has invalid interval [{}, {})",
                    id, interval.start_sec, interval.end_sec
                )));
            }
        }
        Ok(Self { intervals })
    }

    /// Parse the timing model JSON: `[{exercise_id, mean_start_sec, mean_end_sec}, ...]`
    pub fn from_json(json: &str) -> ConformanceResult<Self> {
        let entries: Vec<TimingEntry> = serde_json::from_str(json)?;
        let intervals = entries
            .into_iter()
            .map(|e| {
                (
                    e.exercise_id,
                    ExerciseInterval {
                        start_sec: e.mean_start_sec,
                        end_sec: e.mean_end_sec,
                    },
                )
            })
            .collect();
        Self::new(intervals)
    }

    pub fn load(path: &Path) -> ConformanceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn get(&self, exercise: &str) -> Option<&ExerciseInterval> {
        self.intervals.get(exercise)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExerciseInterval)> {
        self.intervals.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

// ==============================================================================
// Teacher Profile
// ==============================================================================

/// Exercise id → representative feature vector per canonical window position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeacherProfile {
    exercises: BTreeMap<String, Vec<FeatureVector>>,
}

impl TeacherProfile {
    pub fn new(exercises: BTreeMap<String, Vec<FeatureVector>>) -> Self {
        Self { exercises }
    }

    pub fn from_json(json: &str) -> ConformanceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> ConformanceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn get(&self, exercise: &str) -> Option<&[FeatureVector]> {
        self.exercises.get(exercise).map(Vec::as_slice)
    }

    pub fn exercises(&self) -> impl Iterator<Item = &str> {
        self.exercises.keys().map(String::as_str)
    }
}

// ==============================================================================
// Reference Data
// ==============================================================================

/// Immutable reference set loaded once per process and shared by every run
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub timing: ExerciseTimingModel,
    pub profile: TeacherProfile,
}

impl ReferenceData {
    pub fn new(timing: ExerciseTimingModel, profile: TeacherProfile) -> Self {
        Self { timing, profile }
    }

    pub fn load(timing_path: &Path, profile_path: &Path) -> ConformanceResult<Self> {
        let timing = ExerciseTimingModel::load(timing_path)?;
        let profile = TeacherProfile::load(profile_path)?;

        tracing::info!(
            exercises = timing.len(),
            profiled = profile.exercises().count(),
            "Loaded reference data"
        );

        Ok(Self { timing, profile })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::motion::FEATURE_DIM;

    #[test]
    fn test_timing_model_from_json() {
        let json = r#"[
            {"exercise_id": "E02", "mean_start_sec": 20.5, "mean_end_sec": 41.0},
            {"exercise_id": "E01", "mean_start_sec": 0.0, "mean_end_sec": 20.5}
        ]"#;

        let model = ExerciseTimingModel::from_json(json).unwrap();
        assert_eq!(model.len(), 2);

        let ids: Vec<&str> = model.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["E01", "E02"]);

        let e01 = model.get("E01").unwrap();
        assert!(e01.contains(0.0));
        assert!(e01.contains(20.4));
        assert!(!e01.contains(20.5));
    }

    #[test]
    fn test_timing_model_rejects_inverted_interval() {
        let json = r#"[{"exercise_id": "E01", "mean_start_sec": 5.0, "mean_end_sec": 1.0}]"#;
        assert!(ExerciseTimingModel::from_json(json).is_err());
    }

    #[test]
    fn test_profile_from_json() {
        let row = vec![0.0; FEATURE_DIM];
        let json = serde_json::json!({ "E01": [row.clone(), row] }).to_string();

        let profile = TeacherProfile::from_json(&json).unwrap();
        assert_eq!(profile.get("E01").map(|v| v.len()), Some(2));
        assert!(profile.get("E05").is_none());
    }

    #[test]
    fn test_profile_rejects_short_rows() {
        let json = serde_json::json!({ "E01": [[0.0, 1.0, 2.0]] }).to_string();
        assert!(TeacherProfile::from_json(&json).is_err());
    }
}
