// Data models for body pose landmark sequences (raw and normalized)

use crate::models::error::{ConformanceError, ConformanceResult};
use serde::{Deserialize, Serialize};

/// Landmarks per frame in the MediaPipe full-body topology
pub const LANDMARK_COUNT: usize = 33;

/// Capture rate used when a recording carries no timestamps
pub const DEFAULT_CAPTURE_FPS: f64 = 30.0;

pub type Point3 = [f64; 3];

// ==============================================================================
// Body Landmarks (33 keypoints)
// ==============================================================================

/// MediaPipe Pose Landmark indices (33 total)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A 3D keypoint with its visibility score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64, // [0, 1]
}

impl Keypoint3D {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }

    pub fn position(&self) -> Point3 {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 4]> for Keypoint3D {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

// ==============================================================================
// Landmark Sequence (raw capture)
// ==============================================================================

/// On-disk form of a captured recording: `[[x, y, z, visibility] x 33]` per frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFile {
    pub frames: Vec<Vec<[f64; 4]>>,
    #[serde(default)]
    pub timestamps: Option<Vec<f64>>,
}

/// Captured landmark frames in capture order, each with exactly 33 points
#[derive(Debug, Clone)]
pub struct LandmarkSequence {
    frames: Vec<[Keypoint3D; LANDMARK_COUNT]>,
    timestamps: Vec<f64>,
}

impl LandmarkSequence {
    pub fn new(frames: Vec<Vec<Keypoint3D>>, timestamps: Vec<f64>) -> ConformanceResult<Self> {
        if frames.len() != timestamps.len() {
            return Err(ConformanceError::LengthMismatch {
                field: "timestamps",
                expected: frames.len(),
                found: timestamps.len(),
            });
        }

        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(frame, points)| {
                <[Keypoint3D; LANDMARK_COUNT]>::try_from(points).map_err(|points| {
                    ConformanceError::InvalidLandmarkCount {
                        frame,
                        found: points.len(),
                    }
                })
            })
            .collect::<ConformanceResult<Vec<_>>>()?;

        Ok(Self { frames, timestamps })
    }

    /// Build from a landmark file, deriving timestamps from `fps` when absent
    pub fn from_file(file: LandmarkFile, fps: f64) -> ConformanceResult<Self> {
        let timestamps = match file.timestamps {
            Some(ts) => ts,
            None => (0..file.frames.len()).map(|i| i as f64 / fps).collect(),
        };

        let frames = file
            .frames
            .into_iter()
            .map(|frame| frame.into_iter().map(Keypoint3D::from).collect())
            .collect();

        Self::new(frames, timestamps)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[[Keypoint3D; LANDMARK_COUNT]] {
        &self.frames
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }
}

// ==============================================================================
// Normalized Pose
// ==============================================================================

/// Pelvis-centred, shoulder-width-scaled, shoulder-levelled landmark positions
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPose {
    positions: Vec<[Point3; LANDMARK_COUNT]>,
    visibility: Vec<[f64; LANDMARK_COUNT]>,
}

impl NormalizedPose {
    pub fn new(
        positions: Vec<[Point3; LANDMARK_COUNT]>,
        visibility: Vec<[f64; LANDMARK_COUNT]>,
    ) -> ConformanceResult<Self> {
        if positions.len() != visibility.len() {
            return Err(ConformanceError::LengthMismatch {
                field: "visibility",
                expected: positions.len(),
                found: visibility.len(),
            });
        }
        Ok(Self {
            positions,
            visibility,
        })
    }

    /// Build from per-frame `(positions, visibility)` pairs
    pub fn from_frames(frames: Vec<([Point3; LANDMARK_COUNT], [f64; LANDMARK_COUNT])>) -> Self {
        let (positions, visibility) = frames.into_iter().unzip();
        Self {
            positions,
            visibility,
        }
    }

    /// Wrap already-normalized coordinates (e.g. from a pre-processed artifact).
    /// Visibility is unknown and treated as fully visible.
    pub fn from_nested(frames: Vec<Vec<Point3>>) -> ConformanceResult<Self> {
        let positions = frames
            .into_iter()
            .enumerate()
            .map(|(frame, points)| {
                <[Point3; LANDMARK_COUNT]>::try_from(points).map_err(|points| {
                    ConformanceError::InvalidLandmarkCount {
                        frame,
                        found: points.len(),
                    }
                })
            })
            .collect::<ConformanceResult<Vec<_>>>()?;
        let visibility = vec![[1.0; LANDMARK_COUNT]; positions.len()];

        Ok(Self {
            positions,
            visibility,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[[Point3; LANDMARK_COUNT]] {
        &self.positions
    }

    pub fn visibility(&self) -> &[[f64; LANDMARK_COUNT]] {
        &self.visibility
    }

    /// Copy out the given frames, in the order given
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            positions: indices.iter().map(|&i| self.positions[i]).collect(),
            visibility: indices.iter().map(|&i| self.visibility[i]).collect(),
        }
    }
}

/// Midpoint of the two hip landmarks
pub fn pelvis_center(frame: &[Point3; LANDMARK_COUNT]) -> Point3 {
    midpoint(
        frame[BodyLandmark::LeftHip.index()],
        frame[BodyLandmark::RightHip.index()],
    )
}

pub fn midpoint(a: Point3, b: Point3) -> Point3 {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing_frame() -> Vec<Keypoint3D> {
        vec![Keypoint3D::new(0.5, 0.5, 0.0, 0.9); LANDMARK_COUNT]
    }

    #[test]
    fn test_sequence_rejects_wrong_landmark_count() {
        let mut short = standing_frame();
        short.pop();

        let err = LandmarkSequence::new(vec![standing_frame(), short], vec![0.0, 0.1]).unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::InvalidLandmarkCount { frame: 1, found: 32 }
        ));
    }

    #[test]
    fn test_sequence_rejects_missing_timestamps() {
        let err = LandmarkSequence::new(vec![standing_frame()], vec![]).unwrap_err();
        assert!(matches!(err, ConformanceError::LengthMismatch { .. }));
    }

    #[test]
    fn test_timestamps_derived_from_capture_rate() {
        let file = LandmarkFile {
            frames: vec![vec![[0.0, 0.0, 0.0, 1.0]; LANDMARK_COUNT]; 4],
            timestamps: None,
        };

        let seq = LandmarkSequence::from_file(file, DEFAULT_CAPTURE_FPS).unwrap();
        assert_eq!(seq.len(), 4);
        assert!((seq.timestamps()[3] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let frames: Vec<Vec<Point3>> = (0..3)
            .map(|i| vec![[i as f64, 0.0, 0.0]; LANDMARK_COUNT])
            .collect();
        let pose = NormalizedPose::from_nested(frames).unwrap();

        let picked = pose.select(&[2, 0]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.positions()[0][0][0], 2.0);
        assert_eq!(picked.positions()[1][0][0], 0.0);
    }
}
