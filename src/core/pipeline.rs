// Scoring pipeline - recording in, score report out

use crate::core::angle_extractor::{basic_angle_series, extended_angle_series};
use crate::core::config::ScoringConfig;
use crate::core::normalizer::{normalize, visibility_mask};
use crate::core::onset_detector::OnsetDetector;
use crate::core::scorer::ConformanceScorer;
use crate::core::segmenter::TemporalSegmenter;
use crate::core::storage::{ResultStorage, RunManifest};
use crate::core::window_features::WindowFeatureBuilder;
use crate::models::error::ConformanceResult;
use crate::models::motion::FeatureVector;
use crate::models::pose::LandmarkSequence;
use crate::models::recording::{RecordingInput, SessionRecording};
use crate::models::reference::ReferenceData;
use crate::models::score::ScoreReport;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Window features per exercise id
pub type ExerciseFeatures = BTreeMap<String, Vec<FeatureVector>>;

/// Normalize a raw capture and compute the angles onset detection needs
pub fn prepare_recording(sequence: &LandmarkSequence) -> ConformanceResult<SessionRecording> {
    let pose = normalize(sequence);
    let angles = basic_angle_series(&pose);
    SessionRecording::new(pose, angles, sequence.timestamps().to_vec())
}

/// Outcome of a stored run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub run_path: PathBuf,
    pub report: ScoreReport,
}

pub struct ScoringPipeline {
    reference: Arc<ReferenceData>,
    config: ScoringConfig,
    segmenter: TemporalSegmenter,
    builder: WindowFeatureBuilder,
    scorer: ConformanceScorer,
}

impl ScoringPipeline {
    pub fn new(reference: Arc<ReferenceData>, config: ScoringConfig) -> ConformanceResult<Self> {
        config.validate()?;

        let detector = OnsetDetector::new(config.onset_smoothing, config.onset_sigma);
        let segmenter = TemporalSegmenter::new(detector, config.window_size);
        let builder = WindowFeatureBuilder::new(config.window_size, config.hop);
        let scorer = ConformanceScorer::new(config.tolerance, config.alpha);

        Ok(Self {
            reference,
            config,
            segmenter,
            builder,
            scorer,
        })
    }

    /// Turn either accepted input format into a session recording
    pub fn prepare(&self, input: RecordingInput) -> ConformanceResult<SessionRecording> {
        match input {
            RecordingInput::Artifact(artifact) => SessionRecording::from_artifact(artifact),
            RecordingInput::Landmarks(file) => {
                let sequence = LandmarkSequence::from_file(file, self.config.capture_fps)?;
                prepare_recording(&sequence)
            }
        }
    }

    /// Segment a session and build window features for every exercise long
    /// enough to hold one window.
    pub fn extract_features(
        &self,
        recording: &SessionRecording,
    ) -> ConformanceResult<ExerciseFeatures> {
        let mask = self
            .config
            .apply_visibility_mask
            .then(|| visibility_mask(recording.pose(), self.config.min_visibility));

        let segmentation = self
            .segmenter
            .segment(recording, &self.reference.timing, mask.as_deref())?;

        let mut features = ExerciseFeatures::new();
        for segment in segmentation.segments {
            let pose = recording.pose().select(&segment.frames);
            let angles = extended_angle_series(&pose);
            let windows = self.builder.build(&angles, &pose)?;

            tracing::debug!(
                exercise = segment.exercise.as_str(),
                frames = segment.frames.len(),
                windows = windows.len(),
                "Built exercise features"
            );
            features.insert(segment.exercise, windows);
        }

        Ok(features)
    }

    pub fn score(&self, features: &ExerciseFeatures) -> ScoreReport {
        let report = self.scorer.score(features, &self.reference.profile);

        match report.overall_score() {
            Some(mean) => tracing::info!(
                exercises = report.summaries.len(),
                mean_score = mean,
                "Scored session"
            ),
            None => tracing::warn!("No exercise could be scored"),
        }

        report
    }

    /// Features then scores for one session
    pub fn run(&self, recording: &SessionRecording) -> ConformanceResult<ScoreReport> {
        let features = self.extract_features(recording)?;
        Ok(self.score(&features))
    }

    /// Full run into a new run directory: score tables plus manifest.
    ///
    /// Nothing is written until scoring has finished, and the run directory is
    /// removed again if any of its files cannot be written.
    pub fn run_to_storage(
        &self,
        input: RecordingInput,
        storage: &ResultStorage,
    ) -> ConformanceResult<RunOutcome> {
        let recording = self.prepare(input)?;
        let report = self.run(&recording)?;

        let (run_id, run_path) = storage.create_run()?;
        write_run(storage, &run_id, &run_path, &report)?;

        Ok(RunOutcome {
            run_id,
            run_path,
            report,
        })
    }
}

fn write_run(
    storage: &ResultStorage,
    run_id: &str,
    run_path: &Path,
    report: &ScoreReport,
) -> ConformanceResult<()> {
    let written = storage
        .write_report(run_path, report)
        .and_then(|_| storage.write_manifest(run_path, &RunManifest::from_report(run_id, report)));

    if let Err(e) = written {
        tracing::warn!(run_id, error = %e, "Failed to write run, removing run directory");
        if let Err(cleanup) = std::fs::remove_dir_all(run_path) {
            tracing::warn!(
                path = %run_path.display(),
                error = %cleanup,
                "Failed to remove run directory"
            );
        }
        return Err(e);
    }

    Ok(())
}
