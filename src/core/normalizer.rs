// Pose normalization - moves raw landmarks into a body-centred canonical frame

use crate::models::pose::{
    pelvis_center, BodyLandmark, Keypoint3D, LandmarkSequence, NormalizedPose, Point3,
    LANDMARK_COUNT,
};

/// Added to the shoulder width before dividing
const SCALE_EPSILON: f64 = 1e-9;

/// Normalize every frame of a recording.
///
/// Per frame, in order:
/// 1. translate so the hip midpoint is the origin
/// 2. scale by `1 / (shoulder width + 1e-9)`
/// 3. rotate X/Y so the left→right shoulder line is horizontal (Z untouched)
///
/// A frame whose shoulders coincide ends up with a very large scale factor.
/// That is left as-is; callers wanting to drop such frames can use
/// [`visibility_mask`] or their own geometry check.
pub fn normalize(sequence: &LandmarkSequence) -> NormalizedPose {
    let frames = sequence
        .frames()
        .iter()
        .map(|frame| (normalize_frame(frame), frame.map(|kp| kp.visibility)))
        .collect();

    NormalizedPose::from_frames(frames)
}

fn normalize_frame(frame: &[Keypoint3D; LANDMARK_COUNT]) -> [Point3; LANDMARK_COUNT] {
    let mut points = frame.map(|kp| kp.position());

    // 1) translate
    let origin = pelvis_center(&points);
    for p in points.iter_mut() {
        p[0] -= origin[0];
        p[1] -= origin[1];
        p[2] -= origin[2];
    }

    // 2) scale
    let scale = 1.0 / (shoulder_width(&points) + SCALE_EPSILON);
    for p in points.iter_mut() {
        p[0] *= scale;
        p[1] *= scale;
        p[2] *= scale;
    }

    // 3) level the shoulder line about Z
    let left = points[BodyLandmark::LeftShoulder.index()];
    let right = points[BodyLandmark::RightShoulder.index()];
    let theta = (right[1] - left[1]).atan2(right[0] - left[0]);
    let (sin, cos) = (-theta).sin_cos();
    for p in points.iter_mut() {
        let (x, y) = (p[0], p[1]);
        p[0] = cos * x - sin * y;
        p[1] = sin * x + cos * y;
    }

    points
}

/// 3D distance between the two shoulder landmarks
pub fn shoulder_width(frame: &[Point3; LANDMARK_COUNT]) -> f64 {
    let l = frame[BodyLandmark::LeftShoulder.index()];
    let r = frame[BodyLandmark::RightShoulder.index()];
    ((l[0] - r[0]).powi(2) + (l[1] - r[1]).powi(2) + (l[2] - r[2]).powi(2)).sqrt()
}

/// Per-frame confidence flag: mean landmark visibility at or above `threshold`.
///
/// Advisory; the scoring path only applies it when configured to.
pub fn visibility_mask(pose: &NormalizedPose, threshold: f64) -> Vec<bool> {
    pose.visibility()
        .iter()
        .map(|vis| vis.iter().sum::<f64>() / LANDMARK_COUNT as f64 >= threshold)
        .collect()
}
