//! Skeleton and status overlay drawn onto annotated frames.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;

use repsense_common::error::{RepsenseError, RepsenseResult};
use repsense_model::label::ExerciseLabel;
use repsense_model::landmark::LandmarkSet;
use repsense_model::summary::NO_CURRENT_STATE;

const BONE_COLOR: Rgb<u8> = Rgb([245, 117, 66]);
const JOINT_COLOR: Rgb<u8> = Rgb([245, 66, 230]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const PANEL_COLOR: Rgb<u8> = Rgb([20, 20, 20]);

/// Font used for the readout unless `video.overlay_font` names another.
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Draws pose skeletons and the exercise/calorie readout.
#[derive(Clone)]
pub struct OverlayRenderer {
    font: FontArc,
}

impl OverlayRenderer {
    /// A renderer using the bundled DejaVu Sans Mono font.
    pub fn new() -> RepsenseResult<Self> {
        let font = FontArc::try_from_slice(BUNDLED_FONT)
            .map_err(|e| RepsenseError::config(format!("Invalid bundled overlay font: {e}")))?;
        Ok(Self { font })
    }

    /// Load a TrueType/OpenType font for the text readout.
    pub fn with_font_file(path: &Path) -> RepsenseResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            RepsenseError::config(format!("Cannot read overlay font {}: {e}", path.display()))
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            RepsenseError::config(format!("Invalid overlay font {}: {e}", path.display()))
        })?;
        Ok(Self { font })
    }

    /// Draw landmarks and their connections.
    pub fn draw_skeleton(&self, frame: &mut RgbImage, landmarks: &LandmarkSet) {
        let (w, h) = (frame.width() as f64, frame.height() as f64);
        let scale = |x: f64, y: f64| ((x * w) as f32, (y * h) as f32);

        for (a, b) in landmarks.connections() {
            draw_line_segment_mut(frame, scale(a.x, a.y), scale(b.x, b.y), BONE_COLOR);
        }
        let radius = ((w.min(h) / 160.0).round() as i32).max(2);
        for landmark in landmarks.iter() {
            let (x, y) = scale(landmark.x, landmark.y);
            draw_filled_circle_mut(frame, (x as i32, y as i32), radius, JOINT_COLOR);
        }
    }

    /// Draw the `Exercise: …` and `Calories: …` lines in the top-left corner.
    pub fn draw_status(
        &self,
        frame: &mut RgbImage,
        current_state: Option<&ExerciseLabel>,
        calories: f64,
    ) {
        let lines = status_lines(current_state, calories);

        let px = (frame.height() as f32 / 24.0).max(12.0);
        let scale = PxScale::from(px);
        let line_height = (px * 1.3) as i32;
        let panel_width = (px * 16.0) as u32;
        let panel_height = (line_height * lines.len() as i32 + line_height / 2) as u32;
        let panel = Rect::at(0, 0).of_size(
            panel_width.clamp(1, frame.width().max(1)),
            panel_height.clamp(1, frame.height().max(1)),
        );
        draw_filled_rect_mut(frame, panel, PANEL_COLOR);
        for (i, line) in lines.iter().enumerate() {
            let y = line_height / 4 + line_height * i as i32;
            draw_text_mut(frame, TEXT_COLOR, 10, y, scale, &self.font, line);
        }
    }
}

impl std::fmt::Debug for OverlayRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayRenderer").finish_non_exhaustive()
    }
}

/// Text lines shown on each annotated frame.
pub fn status_lines(current_state: Option<&ExerciseLabel>, calories: f64) -> [String; 2] {
    [
        format!(
            "Exercise: {}",
            current_state.map_or(NO_CURRENT_STATE, ExerciseLabel::as_str)
        ),
        format!("Calories: {calories:.2}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use repsense_model::landmark::{Landmark, POSE_LANDMARK_COUNT};

    #[test]
    fn test_status_lines() {
        let [exercise, calories] = status_lines(Some(&ExerciseLabel::JumpingJacks), 12.3456);
        assert_eq!(exercise, "Exercise: Jumping Jacks");
        assert_eq!(calories, "Calories: 12.35");

        let [idle, _] = status_lines(None, 0.0);
        assert_eq!(idle, "Exercise: None");
    }

    #[test]
    fn test_skeleton_marks_joints() {
        let mut landmarks = vec![Landmark::new(0.5, 0.5); POSE_LANDMARK_COUNT];
        landmarks[0] = Landmark::new(0.25, 0.25);
        let set = LandmarkSet::new(landmarks);
        let mut frame = RgbImage::new(100, 100);

        OverlayRenderer::new()
            .unwrap()
            .draw_skeleton(&mut frame, &set);
        assert_eq!(*frame.get_pixel(25, 25), JOINT_COLOR);
        assert_eq!(*frame.get_pixel(50, 50), JOINT_COLOR);
        assert_eq!(*frame.get_pixel(90, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_status_text_is_drawn_with_bundled_font() {
        let mut frame = RgbImage::new(480, 360);
        OverlayRenderer::new()
            .unwrap()
            .draw_status(&mut frame, Some(&ExerciseLabel::Squats), 12.5);

        let text_pixels = frame
            .pixels()
            .filter(|p| p[1] > 100 && p[0] < 60 && p[2] < 60)
            .count();
        assert!(text_pixels > 20, "only {text_pixels} text pixels drawn");
        assert_eq!(*frame.get_pixel(2, 2), PANEL_COLOR);
        assert_eq!(*frame.get_pixel(470, 350), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_status_text_differs_by_state() {
        let renderer = OverlayRenderer::new().unwrap();
        let mut idle = RgbImage::new(480, 360);
        let mut squats = RgbImage::new(480, 360);
        renderer.draw_status(&mut idle, None, 0.0);
        renderer.draw_status(&mut squats, Some(&ExerciseLabel::Squats), 0.0);
        assert_ne!(idle, squats);
    }

    #[test]
    fn test_missing_font_file() {
        let err = OverlayRenderer::with_font_file(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, RepsenseError::Config { .. }));
    }
}
