//! Joint-angle extraction from pose landmarks.
//!
//! The classifier consumes a fixed-order vector of five left-side joint
//! angles in degrees. A zero component means the angle could not be computed
//! and the whole vector must be treated as "no valid pose".

use repsense_model::landmark::{LandmarkSet, Point2D, PoseLandmark};

/// Number of angles in an [`AngleVector`].
pub const ANGLE_COUNT: usize = 5;

/// Shoulder, elbow, hip, knee, and ankle angles in degrees, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleVector([f64; ANGLE_COUNT]);

impl AngleVector {
    /// The sentinel returned when extraction fails.
    pub const ZERO: AngleVector = AngleVector([0.0; ANGLE_COUNT]);

    pub fn new(angles: [f64; ANGLE_COUNT]) -> Self {
        Self(angles)
    }

    pub fn shoulder(&self) -> f64 {
        self.0[0]
    }

    pub fn elbow(&self) -> f64 {
        self.0[1]
    }

    pub fn hip(&self) -> f64 {
        self.0[2]
    }

    pub fn knee(&self) -> f64 {
        self.0[3]
    }

    pub fn ankle(&self) -> f64 {
        self.0[4]
    }

    /// Whether every component is a usable reading. Only valid vectors may
    /// be classified.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|a| *a != 0.0 && a.is_finite())
    }

    pub fn as_array(&self) -> &[f64; ANGLE_COUNT] {
        &self.0
    }
}

/// Angle at vertex `b` between rays `b→a` and `b→c`, in degrees.
///
/// The cosine is clamped to `[-1, 1]` before `acos`, so nearly collinear
/// points never produce a domain error. Returns `None` when either ray has
/// zero length.
pub fn calculate_angle(a: Point2D, b: Point2D, c: Point2D) -> Option<f64> {
    let ba = a.sub(b);
    let bc = c.sub(b);
    let denom = ba.norm() * bc.norm();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let cosine = (ba.dot(bc) / denom).clamp(-1.0, 1.0);
    Some(cosine.acos().to_degrees())
}

/// Compute the five joint angles for a pose.
///
/// Fails softly: a missing landmark or a degenerate joint yields
/// [`AngleVector::ZERO`].
pub fn extract_angles(landmarks: &LandmarkSet) -> AngleVector {
    match try_extract(landmarks) {
        Ok(angles) => AngleVector::new(angles),
        Err(reason) => {
            tracing::warn!(reason, landmarks = landmarks.len(), "Error calculating angles");
            AngleVector::ZERO
        }
    }
}

fn try_extract(landmarks: &LandmarkSet) -> Result<[f64; ANGLE_COUNT], &'static str> {
    let point = |landmark: PoseLandmark| {
        landmarks
            .point(landmark)
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .ok_or("required landmark missing")
    };

    let shoulder = point(PoseLandmark::LeftShoulder)?;
    let elbow = point(PoseLandmark::LeftElbow)?;
    let wrist = point(PoseLandmark::LeftWrist)?;
    let hip = point(PoseLandmark::LeftHip)?;
    let knee = point(PoseLandmark::LeftKnee)?;
    let ankle = point(PoseLandmark::LeftAnkle)?;
    // No toe landmark is used; a point straight below the ankle stands in.
    let below_ankle = Point2D::new(ankle.x, ankle.y + 1.0);

    let angle = |a, b, c| calculate_angle(a, b, c).ok_or("degenerate joint");
    Ok([
        angle(hip, shoulder, elbow)?,
        angle(shoulder, elbow, wrist)?,
        angle(shoulder, hip, knee)?,
        angle(hip, knee, ankle)?,
        angle(knee, ankle, below_ankle)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use repsense_model::landmark::{Landmark, POSE_LANDMARK_COUNT};

    fn standing_pose() -> LandmarkSet {
        let mut landmarks = vec![Landmark::new(0.5, 0.5); POSE_LANDMARK_COUNT];
        landmarks[PoseLandmark::LeftShoulder.index()] = Landmark::new(0.50, 0.30);
        landmarks[PoseLandmark::LeftElbow.index()] = Landmark::new(0.55, 0.42);
        landmarks[PoseLandmark::LeftWrist.index()] = Landmark::new(0.52, 0.52);
        landmarks[PoseLandmark::LeftHip.index()] = Landmark::new(0.50, 0.55);
        landmarks[PoseLandmark::LeftKnee.index()] = Landmark::new(0.53, 0.72);
        landmarks[PoseLandmark::LeftAnkle.index()] = Landmark::new(0.51, 0.90);
        LandmarkSet::new(landmarks)
    }

    #[test]
    fn test_right_angle() {
        let angle = calculate_angle(
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 1.0),
        )
        .unwrap();
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_is_straight() {
        let angle = calculate_angle(
            Point2D::new(0.0, 0.0),
            Point2D::new(0.5, 0.5),
            Point2D::new(1.0, 1.0),
        )
        .unwrap();
        assert!((angle - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_coincident_endpoints_are_zero_degrees() {
        let a = Point2D::new(0.2, 0.7);
        let angle = calculate_angle(a, Point2D::new(0.4, 0.1), a).unwrap();
        assert!(angle.abs() < 1e-6);
    }

    #[test]
    fn test_zero_length_ray_is_degenerate() {
        let b = Point2D::new(0.4, 0.4);
        assert_eq!(calculate_angle(b, b, Point2D::new(0.9, 0.1)), None);
    }

    #[test]
    fn test_standing_pose_is_valid() {
        let angles = extract_angles(&standing_pose());
        assert!(angles.is_valid());
        assert!(angles.knee() > 150.0, "knee={}", angles.knee());
        for angle in angles.as_array() {
            assert!((0.0..=180.0).contains(angle));
        }
    }

    #[test]
    fn test_missing_landmarks_yield_zero_vector() {
        let partial = LandmarkSet::new(vec![Landmark::new(0.5, 0.5); 20]);
        let angles = extract_angles(&partial);
        assert_eq!(angles, AngleVector::ZERO);
        assert!(!angles.is_valid());
    }

    #[test]
    fn test_degenerate_joint_yields_zero_vector() {
        let mut pose = standing_pose();
        let elbow = *pose.get(PoseLandmark::LeftElbow).unwrap();
        let mut landmarks: Vec<Landmark> = pose.iter().copied().collect();
        landmarks[PoseLandmark::LeftWrist.index()] = elbow;
        pose = LandmarkSet::new(landmarks);
        assert_eq!(extract_angles(&pose), AngleVector::ZERO);
    }

    proptest! {
        #[test]
        fn prop_angle_in_range(
            ax in 0.0f64..1.0, ay in 0.0f64..1.0,
            bx in 0.0f64..1.0, by in 0.0f64..1.0,
            cx in 0.0f64..1.0, cy in 0.0f64..1.0,
        ) {
            if let Some(angle) = calculate_angle(
                Point2D::new(ax, ay),
                Point2D::new(bx, by),
                Point2D::new(cx, cy),
            ) {
                prop_assert!((0.0..=180.0).contains(&angle));
            }
        }
    }
}
