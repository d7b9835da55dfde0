//! Line-delimited JSON protocol spoken with the pose sidecar.
//!
//! Each request is one line carrying a base64 rgb24 frame; each response is
//! one line carrying either 33 landmarks or `null` when no body was found.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_model::landmark::{Landmark, LandmarkSet, POSE_LANDMARK_COUNT};

/// One frame sent to the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRequest {
    pub width: u32,
    pub height: u32,
    /// Base64 of the packed rgb24 pixel buffer.
    pub rgb: String,
}

impl PoseRequest {
    pub fn from_frame(frame: &RgbImage) -> Self {
        Self {
            width: frame.width(),
            height: frame.height(),
            rgb: BASE64.encode(frame.as_raw()),
        }
    }

    /// Encode as a single newline-terminated line.
    pub fn to_line(&self) -> RepsenseResult<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// The sidecar's answer for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseResponse {
    pub landmarks: Option<Vec<Landmark>>,
    /// Set when the sidecar failed on this frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse one response line into a landmark set.
pub fn parse_response(line: &str) -> RepsenseResult<Option<LandmarkSet>> {
    let response: PoseResponse = serde_json::from_str(line.trim())
        .map_err(|e| RepsenseError::pose(format!("Malformed sidecar response: {e}")))?;

    if let Some(error) = response.error {
        return Err(RepsenseError::pose(format!("Sidecar reported: {error}")));
    }

    match response.landmarks {
        None => Ok(None),
        Some(landmarks) if landmarks.len() == POSE_LANDMARK_COUNT => {
            Ok(Some(LandmarkSet::new(landmarks)))
        }
        Some(landmarks) => Err(RepsenseError::pose(format!(
            "Expected {POSE_LANDMARK_COUNT} landmarks, got {}",
            landmarks.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encodes_pixels() {
        let mut frame = RgbImage::new(2, 1);
        frame.put_pixel(1, 0, image::Rgb([255, 0, 10]));
        let request = PoseRequest::from_frame(&frame);
        assert_eq!(request.width, 2);
        assert_eq!(request.height, 1);
        assert_eq!(BASE64.decode(&request.rgb).unwrap(), vec![0, 0, 0, 255, 0, 10]);

        let line = request.to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_null_landmarks_means_no_pose() {
        assert_eq!(parse_response(r#"{"landmarks": null}"#).unwrap(), None);
    }

    #[test]
    fn test_full_landmark_set() {
        let point = r#"{"x": 0.5, "y": 0.25, "z": -0.1, "visibility": 0.9}"#;
        let line = format!(
            r#"{{"landmarks": [{}]}}"#,
            vec![point; POSE_LANDMARK_COUNT].join(",")
        );
        let landmarks = parse_response(&line).unwrap().unwrap();
        assert_eq!(landmarks.len(), POSE_LANDMARK_COUNT);
        let first = landmarks.iter().next().unwrap();
        assert_eq!(first.x, 0.5);
        assert_eq!(first.visibility, Some(0.9));
    }

    #[test]
    fn test_wrong_landmark_count_is_error() {
        let line = r#"{"landmarks": [{"x": 0.1, "y": 0.2}]}"#;
        assert!(matches!(
            parse_response(line),
            Err(RepsenseError::Pose { .. })
        ));
    }

    #[test]
    fn test_sidecar_error_and_garbage() {
        assert!(parse_response(r#"{"landmarks": null, "error": "model missing"}"#).is_err());
        assert!(parse_response("not json").is_err());
    }
}
