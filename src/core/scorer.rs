// Conformance scoring - compares student windows with the teacher profile

use crate::models::motion::FeatureVector;
use crate::models::reference::TeacherProfile;
use crate::models::score::{ExerciseSummary, PartErrorAccumulator, ScoreRecord, ScoreReport};
use std::collections::BTreeMap;

pub const DEFAULT_TOLERANCE: f64 = 3000.0;
pub const DEFAULT_ALPHA: f64 = 7000.0;

/// Score one window pair.
///
/// The teacher's own adjacent-window spread `min_dist` is subtracted from the
/// raw distance first. Anything within `tolerance` after that scores 100, and
/// the score decays exponentially with scale `alpha` beyond it. A window
/// whose distance is not a number scores 0.
pub fn score_window(
    student: &FeatureVector,
    teacher: &FeatureVector,
    min_dist: f64,
    tolerance: f64,
    alpha: f64,
) -> f64 {
    let distance = student.distance(teacher) - min_dist;
    if distance.is_nan() {
        return 0.0;
    }
    let normalized = distance.max(0.0);
    if normalized <= tolerance {
        return 100.0;
    }
    (100.0 * (-(normalized - tolerance) / alpha).exp()).clamp(0.0, 100.0)
}

/// Smallest distance between consecutive teacher windows; 0 with fewer than two
pub fn teacher_min_dist(teacher: &[FeatureVector]) -> f64 {
    teacher
        .windows(2)
        .map(|w| w[0].distance(&w[1]))
        .min_by(f64::total_cmp)
        .unwrap_or(0.0)
}

pub struct ConformanceScorer {
    tolerance: f64,
    alpha: f64,
}

impl ConformanceScorer {
    pub fn new(tolerance: f64, alpha: f64) -> Self {
        Self { tolerance, alpha }
    }

    /// Score every exercise the student has windows for.
    ///
    /// Window `i` is paired with teacher window `i`; the shorter side bounds the
    /// comparison. Exercises with no teacher profile are skipped.
    pub fn score(
        &self,
        student: &BTreeMap<String, Vec<FeatureVector>>,
        profile: &TeacherProfile,
    ) -> ScoreReport {
        let mut report = ScoreReport::default();

        for (exercise, windows) in student {
            let Some(teacher) = profile.get(exercise) else {
                tracing::warn!(
                    exercise = exercise.as_str(),
                    "No teacher profile for exercise, skipping"
                );
                continue;
            };

            let min_dist = teacher_min_dist(teacher);
            tracing::debug!(
                exercise = exercise.as_str(),
                student_windows = windows.len(),
                teacher_windows = teacher.len(),
                min_dist,
                "Scoring exercise"
            );

            let mut parts = PartErrorAccumulator::new();
            let mut total = 0.0;
            let mut count = 0usize;

            for (window_index, (s, t)) in windows.iter().zip(teacher.iter()).enumerate() {
                let score = score_window(s, t, min_dist, self.tolerance, self.alpha);
                parts.add(&s.abs_diff(t));
                total += score;
                count += 1;

                report.details.push(ScoreRecord {
                    exercise: exercise.clone(),
                    window_index,
                    score,
                });
            }

            if count == 0 {
                continue;
            }

            report.summaries.push(ExerciseSummary {
                exercise: exercise.clone(),
                mean_score: total / count as f64,
            });
            report.part_errors.extend(parts.finish(exercise));
        }

        report
    }
}

impl Default for ConformanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_ALPHA)
    }
}
