// Result storage - run directories, score tables, and per-exercise feature tables

use crate::models::error::{ConformanceError, ConformanceResult};
use crate::models::motion::{feature_columns, FeatureVector};
use crate::models::recording::RecordingInput;
use crate::models::score::{ExerciseSummary, PartError, ScoreRecord, ScoreReport};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const RESULTS_DIR: &str = "results_score";
pub const DETAIL_FILE: &str = "student_score_detail.csv";
pub const SUMMARY_FILE: &str = "student_score_summary.csv";
pub const PART_ERROR_FILE: &str = "student_part_error.csv";
pub const MANIFEST_FILE: &str = "run.json";

/// Summary of one scoring run, written next to its score tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub exercises: Vec<String>,
    pub mean_score: Option<f64>,
}

impl RunManifest {
    pub fn from_report(run_id: &str, report: &ScoreReport) -> Self {
        Self {
            run_id: run_id.to_string(),
            created_at: Utc::now(),
            exercises: report.summaries.iter().map(|s| s.exercise.clone()).collect(),
            mean_score: report.overall_score(),
        }
    }
}

/// Filesystem layout for scoring runs
pub struct ResultStorage {
    base_path: PathBuf,
}

impl ResultStorage {
    /// Create a storage rooted at `base_path`, creating the directory if needed
    pub fn new(base_path: PathBuf) -> ConformanceResult<Self> {
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create a fresh `student_<6 hex>` run directory
    pub fn create_run(&self) -> ConformanceResult<(String, PathBuf)> {
        let uuid = Uuid::new_v4().simple().to_string();
        let run_id = format!("student_{}", &uuid[..6]);
        let run_path = self.base_path.join(&run_id);
        std::fs::create_dir_all(&run_path)?;

        tracing::info!(
            run_id = run_id.as_str(),
            path = %run_path.display(),
            "Created scoring run"
        );

        Ok((run_id, run_path))
    }

    // ==========================================================================
    // Score tables
    // ==========================================================================

    /// Write the three score tables under `<dir>/results_score/`.
    ///
    /// Tables are staged under `.tmp` names and only renamed into place once
    /// all three are on disk; on failure the staged files are removed.
    pub fn write_report(&self, dir: &Path, report: &ScoreReport) -> ConformanceResult<PathBuf> {
        let tables = [
            (
                DETAIL_FILE,
                to_csv(&["exercise", "window_index", "score"], &report.details)?,
            ),
            (
                SUMMARY_FILE,
                to_csv(&["exercise", "mean_score"], &report.summaries)?,
            ),
            (
                PART_ERROR_FILE,
                to_csv(&["exercise", "part", "mean_abs_error"], &report.part_errors)?,
            ),
        ];

        let results = dir.join(RESULTS_DIR);
        std::fs::create_dir_all(&results)?;

        let mut staged = Vec::with_capacity(tables.len());
        for (name, contents) in &tables {
            let tmp = results.join(format!("{}.tmp", name));
            if let Err(e) = std::fs::write(&tmp, contents) {
                remove_staged(&staged);
                return Err(e.into());
            }
            staged.push((tmp, results.join(name)));
        }

        for (tmp, path) in &staged {
            if let Err(e) = std::fs::rename(tmp, path) {
                remove_staged(&staged);
                return Err(e.into());
            }
        }

        tracing::info!(
            path = %results.display(),
            windows = report.details.len(),
            exercises = report.summaries.len(),
            "Wrote score tables"
        );

        Ok(results)
    }

    /// Read back the tables written by [`write_report`](Self::write_report)
    pub fn read_report(&self, dir: &Path) -> ConformanceResult<ScoreReport> {
        let results = dir.join(RESULTS_DIR);
        Ok(ScoreReport {
            details: from_csv::<ScoreRecord>(&results.join(DETAIL_FILE))?,
            summaries: from_csv::<ExerciseSummary>(&results.join(SUMMARY_FILE))?,
            part_errors: from_csv::<PartError>(&results.join(PART_ERROR_FILE))?,
        })
    }

    pub fn write_manifest(&self, dir: &Path, manifest: &RunManifest) -> ConformanceResult<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(manifest)?)?;
        Ok(path)
    }

    pub fn read_manifest(&self, dir: &Path) -> ConformanceResult<RunManifest> {
        let contents = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        Ok(serde_json::from_str(&contents)?)
    }

    // ==========================================================================
    // Feature tables
    // ==========================================================================

    /// Write `<dir>/<exercise>/<name>_<exercise>.csv` for every exercise
    pub fn write_features(
        &self,
        dir: &Path,
        name: &str,
        features: &BTreeMap<String, Vec<FeatureVector>>,
    ) -> ConformanceResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(features.len());

        for (exercise, windows) in features {
            let exercise_dir = dir.join(exercise);
            std::fs::create_dir_all(&exercise_dir)?;
            let path = exercise_dir.join(format!("{}_{}.csv", name, exercise));

            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(feature_columns())?;
            for window in windows {
                writer.write_record(window.as_slice().iter().map(|v| v.to_string()))?;
            }
            writer.flush()?;

            tracing::debug!(
                exercise = exercise.as_str(),
                windows = windows.len(),
                "Wrote feature table"
            );
            written.push(path);
        }

        Ok(written)
    }

    /// Read every exercise's feature table from a directory laid out by
    /// [`write_features`](Self::write_features).
    ///
    /// Each `<exercise>` subdirectory should hold one `*_<exercise>.csv`; when
    /// several match, the first in name order is used. NaN or infinite values
    /// are rejected.
    pub fn read_features(
        &self,
        dir: &Path,
    ) -> ConformanceResult<BTreeMap<String, Vec<FeatureVector>>> {
        let mut features = BTreeMap::new();

        for exercise_dir in sorted_entries(dir)? {
            if !exercise_dir.is_dir() {
                continue;
            }
            let Some(exercise) = exercise_dir.file_name().and_then(|s| s.to_str()) else {
                continue;
            };

            let suffix = format!("_{}.csv", exercise);
            let table = sorted_entries(&exercise_dir)?.into_iter().find(|p| {
                p.file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.ends_with(&suffix))
            });

            match table {
                Some(path) => {
                    features.insert(exercise.to_string(), read_feature_table(&path)?);
                }
                None => {
                    tracing::warn!(exercise, "No feature table in exercise directory, skipping");
                }
            }
        }

        Ok(features)
    }

    // ==========================================================================
    // Recordings
    // ==========================================================================

    /// Load a landmark recording or a pre-processed recording artifact
    pub fn read_recording(&self, path: &Path) -> ConformanceResult<RecordingInput> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            ConformanceError::MalformedInput(format!(
                "{} is neither a landmark recording nor a recording artifact: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Header row is written explicitly so empty tables still carry it
fn to_csv<T: Serialize>(headers: &[&str], rows: &[T]) -> ConformanceResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ConformanceError::Io(e.into_error()))
}

fn from_csv<T: DeserializeOwned>(path: &Path) -> ConformanceResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    Ok(rows)
}

fn read_feature_table(path: &Path) -> ConformanceResult<Vec<FeatureVector>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?;
    if !headers.iter().eq(feature_columns().iter().map(String::as_str)) {
        return Err(ConformanceError::MalformedInput(format!(
            "{} does not have the expected feature columns",
            path.display()
        )));
    }

    let mut windows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let values = record
            .iter()
            .map(|field| match field.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(ConformanceError::MalformedInput(format!(
                    "{}: not a finite number: {:?}",
                    path.display(),
                    field
                ))),
            })
            .collect::<ConformanceResult<Vec<f64>>>()?;
        windows.push(FeatureVector::try_from(values)?);
    }

    Ok(windows)
}

/// Remove staged tables, logging any that cannot be removed
fn remove_staged(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if let Err(e) = std::fs::remove_file(tmp) {
            tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove staged table");
        }
    }
}

fn sorted_entries(dir: &Path) -> ConformanceResult<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, std::io::Error>>()?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::motion::FEATURE_DIM;
    use crate::models::score::BodyPart;
    use tempfile::TempDir;

    fn sample_report() -> ScoreReport {
        ScoreReport {
            details: vec![
                ScoreRecord {
                    exercise: "E01".into(),
                    window_index: 0,
                    score: 100.0,
                },
                ScoreRecord {
                    exercise: "E01".into(),
                    window_index: 1,
                    score: 80.5,
                },
            ],
            summaries: vec![ExerciseSummary {
                exercise: "E01".into(),
                mean_score: 90.25,
            }],
            part_errors: vec![PartError {
                exercise: "E01".into(),
                part: BodyPart::ArmOpening,
                mean_abs_error: 1.5,
            }],
        }
    }

    #[test]
    fn test_run_directory_naming() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().join("runs")).unwrap();

        let (run_id, path) = storage.create_run().unwrap();
        assert!(run_id.starts_with("student_"));
        assert_eq!(run_id.len(), "student_".len() + 6);
        assert!(path.is_dir());
        assert_eq!(path.parent(), Some(storage.base_path()));
    }

    #[test]
    fn test_report_tables() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        let results = storage.write_report(dir.path(), &sample_report()).unwrap();
        assert_eq!(results, dir.path().join(RESULTS_DIR));

        let detail = std::fs::read_to_string(results.join(DETAIL_FILE)).unwrap();
        assert!(detail.starts_with("exercise,window_index,score\n"));
        let parts = std::fs::read_to_string(results.join(PART_ERROR_FILE)).unwrap();
        assert!(parts.starts_with("exercise,part,mean_abs_error\n"));
        assert!(parts.contains("E01,arm_opening,1.5"));

        assert_eq!(storage.read_report(dir.path()).unwrap(), sample_report());
    }

    #[test]
    fn test_failed_report_leaves_no_tables() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        // a directory where the last staged table would go makes that write fail
        let results = dir.path().join(RESULTS_DIR);
        std::fs::create_dir_all(results.join(format!("{}.tmp", PART_ERROR_FILE))).unwrap();

        assert!(storage.write_report(dir.path(), &sample_report()).is_err());
        for name in [DETAIL_FILE, SUMMARY_FILE, PART_ERROR_FILE] {
            assert!(!results.join(name).exists());
        }
        assert!(!results.join(format!("{}.tmp", DETAIL_FILE)).exists());
        assert!(!results.join(format!("{}.tmp", SUMMARY_FILE)).exists());
    }

    #[test]
    fn test_empty_report_writes_headers_only() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        let results = storage.write_report(dir.path(), &ScoreReport::default()).unwrap();
        let summary = std::fs::read_to_string(results.join(SUMMARY_FILE)).unwrap();
        assert_eq!(summary, "exercise,mean_score\n");
        assert!(storage.read_report(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_manifest() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        let manifest = RunManifest::from_report("student_abc123", &sample_report());
        assert_eq!(manifest.exercises, vec!["E01".to_string()]);
        assert_eq!(manifest.mean_score, Some(90.25));

        storage.write_manifest(dir.path(), &manifest).unwrap();
        assert_eq!(storage.read_manifest(dir.path()).unwrap(), manifest);
    }

    #[test]
    fn test_feature_tables() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        let mut values = [0.25; FEATURE_DIM];
        values[3] = 0.5;
        let features = BTreeMap::from([
            (
                "E01".to_string(),
                vec![FeatureVector::new(values), FeatureVector::zeros()],
            ),
            ("E02".to_string(), vec![]),
        ]);

        let written = storage.write_features(dir.path(), "student", &features).unwrap();
        assert_eq!(written[0], dir.path().join("E01").join("student_E01.csv"));

        let loaded = storage.read_features(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded["E01"].len(), 2);
        assert_eq!(loaded["E01"][0][3], 0.5);
        assert_eq!(loaded["E01"][0][0], 0.25);
        assert_eq!(loaded["E01"][1], FeatureVector::zeros());
        assert!(loaded["E02"].is_empty());
    }

    #[test]
    fn test_feature_table_wrong_columns_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        let exercise_dir = dir.path().join("E01");
        std::fs::create_dir_all(&exercise_dir).unwrap();
        std::fs::write(exercise_dir.join("student_E01.csv"), "a,b\n1,2\n").unwrap();

        let err = storage.read_features(dir.path()).unwrap_err();
        assert!(matches!(err, ConformanceError::MalformedInput(_)));
    }

    #[test]
    fn test_non_finite_feature_value_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        for bad in ["NaN", "inf"] {
            let mut row = vec!["0".to_string(); FEATURE_DIM];
            row[5] = bad.to_string();
            let table = format!("{}\n{}\n", feature_columns().join(","), row.join(","));

            let exercise_dir = dir.path().join("E01");
            std::fs::create_dir_all(&exercise_dir).unwrap();
            std::fs::write(exercise_dir.join("student_E01.csv"), table).unwrap();

            let err = storage.read_features(dir.path()).unwrap_err();
            assert!(matches!(err, ConformanceError::MalformedInput(_)));
        }
    }

    #[test]
    fn test_unrecognized_recording_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = ResultStorage::new(dir.path().to_path_buf()).unwrap();

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"something": []}"#).unwrap();
        assert!(matches!(
            storage.read_recording(&path),
            Err(ConformanceError::MalformedInput(_))
        ));
    }
}
