// End-to-end scoring runs through the public API

use std::collections::BTreeMap;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use taiso_lib::core::storage::{ResultStorage, RESULTS_DIR, SUMMARY_FILE};
use taiso_lib::models::motion::{FeatureVector, FEATURE_DIM};
use taiso_lib::models::pose::LANDMARK_COUNT;
use taiso_lib::models::recording::{RecordingArtifact, RecordingInput, SessionRecording};
use taiso_lib::models::reference::{ExerciseInterval, ExerciseTimingModel, TeacherProfile};
use taiso_lib::{ReferenceData, ScoringConfig, ScoringPipeline};

fn timing(entries: &[(&str, f64, f64)]) -> ExerciseTimingModel {
    let intervals = entries
        .iter()
        .map(|(id, start_sec, end_sec)| {
            (
                id.to_string(),
                ExerciseInterval {
                    start_sec: *start_sec,
                    end_sec: *end_sec,
                },
            )
        })
        .collect();
    ExerciseTimingModel::new(intervals).unwrap()
}

fn pipeline(timing: ExerciseTimingModel, profile: TeacherProfile) -> ScoringPipeline {
    let reference = Arc::new(ReferenceData::new(timing, profile));
    ScoringPipeline::new(reference, ScoringConfig::default()).unwrap()
}

/// Motionless, already-normalized session at 30 fps
fn still_artifact(frames: usize) -> RecordingArtifact {
    let mut pose = vec![[0.0; 3]; LANDMARK_COUNT];
    pose[11] = [-0.5, 1.2, 0.0];
    pose[12] = [0.5, 1.2, 0.0];
    pose[13] = [-0.9, 0.8, 0.0];
    pose[14] = [0.9, 0.8, 0.0];
    pose[15] = [-1.0, 0.3, 0.0];
    pose[16] = [1.0, 0.3, 0.0];
    pose[23] = [-0.3, 0.0, 0.0];
    pose[24] = [0.3, 0.0, 0.0];
    pose[25] = [-0.3, -1.0, 0.0];
    pose[26] = [0.3, -1.0, 0.0];
    pose[27] = [-0.3, -2.0, 0.0];
    pose[28] = [0.3, -2.0, 0.0];

    RecordingArtifact {
        norm: vec![pose; frames],
        angles: vec![vec![120.0; 8]; frames],
        ts: (0..frames).map(|i| i as f64 / 30.0).collect(),
    }
}

fn single_window(exercise: &str, window: FeatureVector) -> BTreeMap<String, Vec<FeatureVector>> {
    BTreeMap::from([(exercise.to_string(), vec![window])])
}

#[test]
fn test_zero_student_against_zero_reference_scores_full() {
    let profile = TeacherProfile::new(single_window("E01", FeatureVector::zeros()));
    let pipeline = pipeline(ExerciseTimingModel::default(), profile);

    let report = pipeline.score(&single_window("E01", FeatureVector::zeros()));

    assert_eq!(report.details.len(), 1);
    assert_eq!(report.details[0].score, 100.0);
    assert_eq!(report.summary("E01").map(|s| s.mean_score), Some(100.0));
}

#[test]
fn test_far_student_decays_exponentially() {
    let profile = TeacherProfile::new(single_window("E01", FeatureVector::zeros()));
    let pipeline = pipeline(ExerciseTimingModel::default(), profile);

    // distance 10000 spread over every dimension
    let per_dim = 10_000.0 / (FEATURE_DIM as f64).sqrt();
    let student = FeatureVector::new([per_dim; FEATURE_DIM]);
    let report = pipeline.score(&single_window("E01", student));

    let expected = 100.0 * (-(10_000.0_f64 - 3000.0) / 7000.0).exp();
    assert_abs_diff_eq!(report.details[0].score, expected, epsilon = 1e-6);
    assert!(report.details[0].score > 36.0 && report.details[0].score < 37.0);
}

#[test]
fn test_still_session_keeps_raw_timeline() {
    let pipeline = pipeline(timing(&[("E01", 0.0, 2.0)]), TeacherProfile::default());
    let recording = SessionRecording::from_artifact(still_artifact(60)).unwrap();

    let features = pipeline.extract_features(&recording).unwrap();

    // all 60 frames land in E01: starts 0, 15, 30
    assert_eq!(features["E01"].len(), 3);
}

#[test]
fn test_short_exercise_absent_and_run_continues() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

    // E01: 60 frames, E02: exactly 29 frames (2.0 s up to just under 2.9667 s)
    let model = timing(&[("E01", 0.0, 2.0), ("E02", 2.0, 88.5 / 30.0)]);
    let builder = pipeline(model.clone(), TeacherProfile::default());
    let recording = SessionRecording::from_artifact(still_artifact(120)).unwrap();
    let features = builder.extract_features(&recording).unwrap();
    assert!(features.contains_key("E01"));
    assert!(!features.contains_key("E02"));

    // profile covers both exercises; only E01 can be scored
    let mut profile = features.clone();
    profile.insert("E02".to_string(), vec![FeatureVector::zeros()]);
    let scoring = pipeline(model, TeacherProfile::new(profile));

    let outcome = scoring
        .run_to_storage(RecordingInput::Artifact(still_artifact(120)), &storage)
        .unwrap();

    assert!(outcome.report.summary("E01").is_some());
    assert!(outcome.report.summary("E02").is_none());
    assert_eq!(outcome.report.overall_score(), Some(100.0));

    let summary =
        std::fs::read_to_string(outcome.run_path.join(RESULTS_DIR).join(SUMMARY_FILE)).unwrap();
    assert_eq!(summary.lines().count(), 2);
    assert!(summary.lines().nth(1).unwrap().starts_with("E01,"));
}

#[test]
fn test_recording_file_round_trip_through_storage() {
    let dir = tempfile::TempDir::new().unwrap();
    let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

    let path = dir.path().join("session.json");
    std::fs::write(&path, serde_json::to_string(&still_artifact(45)).unwrap()).unwrap();

    let pipeline = pipeline(timing(&[("E01", 0.0, 10.0)]), TeacherProfile::default());
    let recording = pipeline.prepare(storage.read_recording(&path).unwrap()).unwrap();
    let features = pipeline.extract_features(&recording).unwrap();

    let feature_dir = dir.path().join("features");
    storage.write_features(&feature_dir, "student", &features).unwrap();
    let loaded = storage.read_features(&feature_dir).unwrap();

    assert_eq!(loaded["E01"].len(), 2);
    assert_eq!(loaded, features);
}
