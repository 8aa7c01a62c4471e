// Session recordings ready for segmentation: normalized pose, basic angles, timestamps

use crate::models::error::{ConformanceError, ConformanceResult};
use crate::models::motion::BasicAngleSeries;
use crate::models::pose::{LandmarkFile, NormalizedPose, Point3};
use serde::{Deserialize, Serialize};

/// Pre-processed recording as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingArtifact {
    /// Normalized landmarks, T × 33 × 3
    pub norm: Vec<Vec<Point3>>,
    /// Basic angle set, T × 8
    pub angles: Vec<Vec<f64>>,
    /// Seconds since capture start, length T
    pub ts: Vec<f64>,
}

/// Any recording file the pipeline accepts, told apart by its keys
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordingInput {
    Artifact(RecordingArtifact),
    Landmarks(LandmarkFile),
}

/// Everything the segmenter needs from one session, with matching lengths
#[derive(Debug, Clone)]
pub struct SessionRecording {
    pose: NormalizedPose,
    basic_angles: BasicAngleSeries,
    timestamps: Vec<f64>,
}

impl SessionRecording {
    pub fn new(
        pose: NormalizedPose,
        basic_angles: BasicAngleSeries,
        timestamps: Vec<f64>,
    ) -> ConformanceResult<Self> {
        if basic_angles.len() != pose.len() {
            return Err(ConformanceError::LengthMismatch {
                field: "angles",
                expected: pose.len(),
                found: basic_angles.len(),
            });
        }
        if timestamps.len() != pose.len() {
            return Err(ConformanceError::LengthMismatch {
                field: "timestamps",
                expected: pose.len(),
                found: timestamps.len(),
            });
        }

        Ok(Self {
            pose,
            basic_angles,
            timestamps,
        })
    }

    pub fn from_artifact(artifact: RecordingArtifact) -> ConformanceResult<Self> {
        let pose = NormalizedPose::from_nested(artifact.norm)?;
        let basic_angles = BasicAngleSeries::from_rows(artifact.angles)?;
        Self::new(pose, basic_angles, artifact.ts)
    }

    pub fn len(&self) -> usize {
        self.pose.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pose.is_empty()
    }

    pub fn pose(&self) -> &NormalizedPose {
        &self.pose
    }

    pub fn basic_angles(&self) -> &BasicAngleSeries {
        &self.basic_angles
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
}
