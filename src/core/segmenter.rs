// Temporal segmentation - re-zeros a session at its onset and slices it into exercises

use crate::core::onset_detector::{Onset, OnsetDetector};
use crate::models::error::{ConformanceError, ConformanceResult};
use crate::models::recording::SessionRecording;
use crate::models::reference::ExerciseTimingModel;

/// Frames of one exercise, as indices into the session in capture order
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSegment {
    pub exercise: String,
    pub frames: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub onset: Onset,
    pub segments: Vec<ExerciseSegment>,
}

pub struct TemporalSegmenter {
    detector: OnsetDetector,
    min_frames: usize,
}

impl TemporalSegmenter {
    /// # Arguments
    /// * `detector` - Onset detector used to re-zero the timeline
    /// * `min_frames` - Intervals with fewer selected frames are skipped (one window)
    pub fn new(detector: OnsetDetector, min_frames: usize) -> Self {
        Self {
            detector,
            min_frames,
        }
    }

    /// Slice a session into the exercises of the timing model.
    ///
    /// Onset detection always sees every frame. `mask`, when given, then drops
    /// frames flagged `false` from exercise selection.
    pub fn segment(
        &self,
        recording: &SessionRecording,
        timing: &ExerciseTimingModel,
        mask: Option<&[bool]>,
    ) -> ConformanceResult<Segmentation> {
        if let Some(mask) = mask {
            if mask.len() != recording.len() {
                return Err(ConformanceError::LengthMismatch {
                    field: "visibility mask",
                    expected: recording.len(),
                    found: mask.len(),
                });
            }
        }

        let onset = self
            .detector
            .detect(recording.basic_angles(), recording.timestamps())?;
        tracing::info!(t0 = onset.t0, frame = ?onset.frame, "Detected routine onset");

        let shifted: Vec<f64> = recording.timestamps().iter().map(|t| t - onset.t0).collect();

        let mut segments = Vec::new();
        for (exercise, interval) in timing.iter() {
            let frames: Vec<usize> = shifted
                .iter()
                .enumerate()
                .filter(|(i, t)| interval.contains(**t) && mask.map_or(true, |m| m[*i]))
                .map(|(i, _)| i)
                .collect();

            if frames.len() < self.min_frames {
                tracing::warn!(
                    exercise,
                    frames = frames.len(),
                    required = self.min_frames,
                    "Not enough frames in exercise interval, skipping"
                );
                continue;
            }

            segments.push(ExerciseSegment {
                exercise: exercise.to_string(),
                frames,
            });
        }

        Ok(Segmentation { onset, segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::motion::{BasicAngleSeries, BASIC_ANGLE_COUNT};
    use crate::models::pose::{NormalizedPose, LANDMARK_COUNT};
    use crate::models::reference::ExerciseInterval;
    use std::collections::BTreeMap;

    fn still_recording(frames: usize) -> SessionRecording {
        let frame = vec![[0.0; 3]; LANDMARK_COUNT];
        let pose = NormalizedPose::from_nested(vec![frame; frames]).unwrap();
        let angles = BasicAngleSeries::new(vec![[90.0; BASIC_ANGLE_COUNT]; frames]);
        let ts = (0..frames).map(|i| i as f64 / 30.0).collect();
        SessionRecording::new(pose, angles, ts).unwrap()
    }

    fn timing(entries: &[(&str, f64, f64)]) -> ExerciseTimingModel {
        let intervals: BTreeMap<String, ExerciseInterval> = entries
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

    #[test]
    fn test_still_session_uses_raw_timeline() {
        let rec = still_recording(120);
        // frames 0..60 and 60..120 at 30 fps
        let model = timing(&[("E01", 0.0, 2.0), ("E02", 2.0, 4.0)]);

        let seg = TemporalSegmenter::new(OnsetDetector::default(), 30)
            .segment(&rec, &model, None)
            .unwrap();

        assert_eq!(seg.onset.t0, 0.0);
        assert_eq!(seg.segments.len(), 2);
        assert_eq!(seg.segments[0].frames, (0..60).collect::<Vec<_>>());
        assert_eq!(seg.segments[1].frames.first(), Some(&60));
    }

    #[test]
    fn test_short_interval_skipped_others_kept() {
        let rec = still_recording(120);
        // 29 frames: indices 0..29 have t < 29/30
        let model = timing(&[("E01", 0.0, 28.5 / 30.0), ("E02", 1.0, 3.0)]);

        let seg = TemporalSegmenter::new(OnsetDetector::default(), 30)
            .segment(&rec, &model, None)
            .unwrap();

        let ids: Vec<&str> = seg.segments.iter().map(|s| s.exercise.as_str()).collect();
        assert_eq!(ids, vec!["E02"]);
    }

    #[test]
    fn test_mask_removes_frames() {
        let rec = still_recording(60);
        let model = timing(&[("E01", 0.0, 2.0)]);
        let mut mask = vec![true; 60];
        mask[10] = false;

        let segmenter = TemporalSegmenter::new(OnsetDetector::default(), 30);
        let seg = segmenter.segment(&rec, &model, Some(&mask)).unwrap();
        assert_eq!(seg.segments[0].frames.len(), 59);
        assert!(!seg.segments[0].frames.contains(&10));

        assert!(segmenter.segment(&rec, &model, Some(&mask[..5])).is_err());
    }
}
