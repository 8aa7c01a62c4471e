// Scoring outputs and body-part attribution tables

use crate::models::motion::{
    EXTENDED_ANGLE_COUNT, FEATURE_DIM, HIP_SYMMETRY_INDEX, STATS_PER_CHANNEL, TRUNK_RANGE_INDEX,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==============================================================================
// Body Parts
// ==============================================================================

/// Coarse body region used to report where a window deviated from the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Shoulder,
    Elbow,
    Wrist,
    Hip,
    Knee,
    Ankle,
    TrunkPosture,
    Twist,
    ArmOpening,
    LegOpening,
    /// Pelvis height range and speed
    Trunk,
    LeftRightBalance,
}

impl BodyPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyPart::Shoulder => "shoulder",
            BodyPart::Elbow => "elbow",
            BodyPart::Wrist => "wrist",
            BodyPart::Hip => "hip",
            BodyPart::Knee => "knee",
            BodyPart::Ankle => "ankle",
            BodyPart::TrunkPosture => "trunk_posture",
            BodyPart::Twist => "twist",
            BodyPart::ArmOpening => "arm_opening",
            BodyPart::LegOpening => "leg_opening",
            BodyPart::Trunk => "trunk",
            BodyPart::LeftRightBalance => "left_right_balance",
        }
    }
}

/// Extended angle channel → reported body part, following the channel order
/// of the extended angle set. Reordering either side invalidates stored profiles.
pub const ANGLE_PARTS: [BodyPart; EXTENDED_ANGLE_COUNT] = [
    // upper arm vs torso
    BodyPart::Shoulder,
    BodyPart::Shoulder,
    // upper arm vs forearm
    BodyPart::Elbow,
    BodyPart::Elbow,
    // forearm vs gravity
    BodyPart::Wrist,
    BodyPart::Wrist,
    // thigh vs torso
    BodyPart::Hip,
    BodyPart::Hip,
    // thigh vs calf
    BodyPart::Knee,
    BodyPart::Knee,
    // calf vs gravity
    BodyPart::Ankle,
    BodyPart::Ankle,
    // torso vs forward / right axis
    BodyPart::TrunkPosture,
    BodyPart::TrunkPosture,
    // shoulder line vs hip line
    BodyPart::Twist,
    BodyPart::Twist,
    // limb opening vs lateral axis
    BodyPart::ArmOpening,
    BodyPart::ArmOpening,
    BodyPart::LegOpening,
    BodyPart::LegOpening,
];

/// Feature dimension → reported body part
pub const FEATURE_PARTS: [BodyPart; FEATURE_DIM] = {
    let mut parts = [BodyPart::Trunk; FEATURE_DIM];
    let mut i = 0;
    while i < TRUNK_RANGE_INDEX {
        parts[i] = ANGLE_PARTS[i / STATS_PER_CHANNEL];
        i += 1;
    }
    parts[HIP_SYMMETRY_INDEX] = BodyPart::LeftRightBalance;
    parts
};

// ==============================================================================
// Score Records
// ==============================================================================

/// Score of one student window against the matching teacher window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub exercise: String,
    pub window_index: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub exercise: String,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartError {
    pub exercise: String,
    pub part: BodyPart,
    pub mean_abs_error: f64,
}

/// Running per-part absolute error for one exercise
#[derive(Debug, Clone, Default)]
pub struct PartErrorAccumulator {
    totals: BTreeMap<BodyPart, (f64, usize)>,
}

impl PartErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, abs_diff: &[f64; FEATURE_DIM]) {
        for (value, part) in abs_diff.iter().zip(FEATURE_PARTS.iter()) {
            let entry = self.totals.entry(*part).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    pub fn finish(self, exercise: &str) -> Vec<PartError> {
        self.totals
            .into_iter()
            .map(|(part, (sum, count))| PartError {
                exercise: exercise.to_string(),
                part,
                mean_abs_error: sum / count.max(1) as f64,
            })
            .collect()
    }
}

// ==============================================================================
// Score Report
// ==============================================================================

/// Everything one scoring run produces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub details: Vec<ScoreRecord>,
    pub summaries: Vec<ExerciseSummary>,
    pub part_errors: Vec<PartError>,
}

impl ScoreReport {
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn summary(&self, exercise: &str) -> Option<&ExerciseSummary> {
        self.summaries.iter().find(|s| s.exercise == exercise)
    }

    /// Mean of the per-exercise means
    pub fn overall_score(&self) -> Option<f64> {
        if self.summaries.is_empty() {
            return None;
        }
        let total: f64 = self.summaries.iter().map(|s| s.mean_score).sum();
        Some(total / self.summaries.len() as f64)
    }

    /// The `n` exercises with the lowest mean score, lowest first
    pub fn weakest_exercises(&self, n: usize) -> Vec<&ExerciseSummary> {
        let mut sorted: Vec<&ExerciseSummary> = self.summaries.iter().collect();
        sorted.sort_by(|a, b| a.mean_score.total_cmp(&b.mean_score));
        sorted.truncate(n);
        sorted
    }

    /// Parts ranked by mean error across exercises, largest first
    pub fn weakest_parts(&self, n: usize) -> Vec<(BodyPart, f64)> {
        let mut by_part: BTreeMap<BodyPart, (f64, usize)> = BTreeMap::new();
        for pe in &self.part_errors {
            let entry = by_part.entry(pe.part).or_insert((0.0, 0));
            entry.0 += pe.mean_abs_error;
            entry.1 += 1;
        }

        let mut ranked: Vec<(BodyPart, f64)> = by_part
            .into_iter()
            .map(|(part, (sum, count))| (part, sum / count as f64))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
