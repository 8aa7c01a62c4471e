// Joint and posture angle extraction from normalized landmarks
//
// Both angle sets are pure per-frame functions: no smoothing, no state carried
// between frames.

use crate::models::motion::{
    AngleSeries, BasicAngleSeries, ExtendedAngleSeries, BASIC_ANGLE_COUNT, EXTENDED_ANGLE_COUNT,
};
use crate::models::pose::{midpoint, BodyLandmark, NormalizedPose, Point3, LANDMARK_COUNT};

/// Added to vector norms before normalizing in [`angle_between`]
const ANGLE_EPSILON: f64 = 1e-6;

/// Added to vector norms in the three-point joint angle of the basic set
const JOINT_EPSILON: f64 = 1e-9;

const GRAVITY: Point3 = [0.0, -1.0, 0.0];
const FORWARD_AXIS: Point3 = [0.0, 1.0, 0.0];
const RIGHT_AXIS: Point3 = [1.0, 0.0, 0.0];

// ==============================================================================
// Vector helpers
// ==============================================================================

fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn neg(a: Point3) -> Point3 {
    [-a[0], -a[1], -a[2]]
}

fn norm(a: Point3) -> f64 {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

fn unit(a: Point3, eps: f64) -> Point3 {
    let n = norm(a) + eps;
    [a[0] / n, a[1] / n, a[2] / n]
}

fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn clamped_angle(a: Point3, b: Point3, eps: f64) -> f64 {
    dot(unit(a, eps), unit(b, eps)).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle between two vectors in degrees, in [0, 180].
///
/// Zero-length input gives 90° rather than NaN.
pub fn angle_between(a: Point3, b: Point3) -> f64 {
    clamped_angle(a, b, ANGLE_EPSILON)
}

/// Angle ABC at vertex `b`, in degrees
pub fn joint_angle(a: Point3, b: Point3, c: Point3) -> f64 {
    clamped_angle(sub(a, b), sub(c, b), JOINT_EPSILON)
}

// ==============================================================================
// Basic set (8 angles)
// ==============================================================================

/// `[shoulder flexion L, R, elbow L, R, hip L, R, knee L, R]`
pub fn basic_angles(frame: &[Point3; LANDMARK_COUNT]) -> [f64; BASIC_ANGLE_COUNT] {
    use BodyLandmark::*;
    let p = |lm: BodyLandmark| frame[lm.index()];

    [
        joint_angle(p(LeftElbow), p(LeftShoulder), p(LeftHip)),
        joint_angle(p(RightElbow), p(RightShoulder), p(RightHip)),
        joint_angle(p(LeftShoulder), p(LeftElbow), p(LeftWrist)),
        joint_angle(p(RightShoulder), p(RightElbow), p(RightWrist)),
        joint_angle(p(LeftKnee), p(LeftHip), p(LeftShoulder)),
        joint_angle(p(RightKnee), p(RightHip), p(RightShoulder)),
        joint_angle(p(LeftHip), p(LeftKnee), p(LeftAnkle)),
        joint_angle(p(RightHip), p(RightKnee), p(RightAnkle)),
    ]
}

// ==============================================================================
// Extended set (20 angles)
// ==============================================================================

/// The 20 scoring angles for one frame.
///
/// | idx   | angle                                   |
/// |-------|-----------------------------------------|
/// | 0–1   | upper arm vs inverted torso (L, R)      |
/// | 2–3   | elbow: upper arm vs forearm (L, R)      |
/// | 4–5   | forearm vs gravity (L, R)               |
/// | 6–7   | hip: thigh vs torso (L, R)              |
/// | 8–9   | knee: thigh vs calf (L, R)              |
/// | 10–11 | calf vs gravity (L, R)                  |
/// | 12    | torso vs forward axis                   |
/// | 13    | torso vs right axis                     |
/// | 14–15 | shoulder line vs hip line, both orders  |
/// | 16–19 | arm / leg opening vs lateral axis       |
pub fn extended_angles(frame: &[Point3; LANDMARK_COUNT]) -> [f64; EXTENDED_ANGLE_COUNT] {
    use BodyLandmark::*;
    let p = |lm: BodyLandmark| frame[lm.index()];

    let (l_sho, r_sho) = (p(LeftShoulder), p(RightShoulder));
    let (l_hip, r_hip) = (p(LeftHip), p(RightHip));

    let torso = sub(midpoint(l_sho, r_sho), midpoint(l_hip, r_hip));

    let l_up = sub(p(LeftElbow), l_sho);
    let r_up = sub(p(RightElbow), r_sho);
    let l_low = sub(p(LeftWrist), p(LeftElbow));
    let r_low = sub(p(RightWrist), p(RightElbow));

    let l_thigh = sub(p(LeftKnee), l_hip);
    let r_thigh = sub(p(RightKnee), r_hip);
    let l_calf = sub(p(LeftAnkle), p(LeftKnee));
    let r_calf = sub(p(RightAnkle), p(RightKnee));

    let shoulder_line = sub(r_sho, l_sho);
    let hip_line = sub(r_hip, l_hip);

    [
        // arms
        angle_between(l_up, neg(torso)),
        angle_between(r_up, neg(torso)),
        angle_between(l_up, l_low),
        angle_between(r_up, r_low),
        angle_between(l_low, GRAVITY),
        angle_between(r_low, GRAVITY),
        // legs
        angle_between(l_thigh, torso),
        angle_between(r_thigh, torso),
        angle_between(l_thigh, l_calf),
        angle_between(r_thigh, r_calf),
        angle_between(l_calf, GRAVITY),
        angle_between(r_calf, GRAVITY),
        // trunk
        angle_between(torso, FORWARD_AXIS),
        angle_between(torso, RIGHT_AXIS),
        // twist: both argument orders are kept as separate channels
        angle_between(shoulder_line, hip_line),
        angle_between(hip_line, shoulder_line),
        // opening, right side measured against the mirrored axis
        angle_between(l_up, RIGHT_AXIS),
        angle_between(r_up, neg(RIGHT_AXIS)),
        angle_between(l_thigh, RIGHT_AXIS),
        angle_between(r_thigh, neg(RIGHT_AXIS)),
    ]
}

fn series<const N: usize>(
    pose: &NormalizedPose,
    f: fn(&[Point3; LANDMARK_COUNT]) -> [f64; N],
) -> AngleSeries<N> {
    AngleSeries::new(pose.positions().iter().map(f).collect())
}

pub fn basic_angle_series(pose: &NormalizedPose) -> BasicAngleSeries {
    series(pose, basic_angles)
}

pub fn extended_angle_series(pose: &NormalizedPose) -> ExtendedAngleSeries {
    series(pose, extended_angles)
}
