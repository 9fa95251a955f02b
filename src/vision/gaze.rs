//! Gaze analysis
//!
//! Locates the iris inside each eye opening. With refined landmarks the iris
//! center comes straight from the mesh; without them it is approximated by the
//! centroid of the eye contour, which keeps the gaze near neutral and leaves
//! look-down detection to the head pose.

use super::landmarks::{guarded_ratio, EyeIndices, LEFT_EYE, RIGHT_EYE};
use crate::types::{GazeMetrics, Landmark, LandmarkFrame};

/// Compute gaze metrics for a well-formed frame.
pub fn analyze_gaze(landmarks: &LandmarkFrame, refine_landmarks: bool) -> GazeMetrics {
    let use_iris = refine_landmarks && landmarks.has_iris();
    let left = eye_gaze(landmarks, &LEFT_EYE, use_iris);
    let right = eye_gaze(landmarks, &RIGHT_EYE, use_iris);

    GazeMetrics {
        vertical: (left.vertical + right.vertical) / 2.0,
        horizontal: (left.horizontal + right.horizontal) / 2.0,
        openness: (left.openness + right.openness) / 2.0,
    }
}

fn eye_gaze(landmarks: &LandmarkFrame, eye: &EyeIndices, use_iris: bool) -> GazeMetrics {
    let a = landmarks[eye.corner_a];
    let b = landmarks[eye.corner_b];
    let top = landmarks[eye.lid_top];
    let bottom = landmarks[eye.lid_bottom];
    let iris = if use_iris {
        landmarks[eye.iris_center]
    } else {
        contour_centroid(landmarks, &eye.contour)
    };

    let inner_x = a.x.min(b.x);
    let width = (a.x - b.x).abs();
    let height = bottom.y - top.y;

    GazeMetrics {
        vertical: guarded_ratio(iris.y - top.y, height),
        horizontal: guarded_ratio(iris.x - inner_x, width),
        openness: guarded_ratio(height.abs(), width),
    }
}

fn contour_centroid(landmarks: &LandmarkFrame, contour: &[usize]) -> Landmark {
    let n = contour.len() as f32;
    let (sx, sy) = contour
        .iter()
        .map(|&i| landmarks[i])
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Landmark::new(sx / n, sy / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::simulated::SyntheticFace;

    #[test]
    fn centered_iris_reads_neutral() {
        let frame = SyntheticFace::default().frame();
        let gaze = analyze_gaze(&frame, true);
        assert!((gaze.vertical - 0.5).abs() < 1e-2, "vertical {}", gaze.vertical);
        assert!((gaze.horizontal - 0.5).abs() < 1e-2, "horizontal {}", gaze.horizontal);
        assert!(gaze.openness > 0.0);
    }

    #[test]
    fn lowered_iris_raises_vertical() {
        let frame = SyntheticFace {
            gaze_vertical: 0.8,
            ..SyntheticFace::default()
        }
        .frame();
        let gaze = analyze_gaze(&frame, true);
        assert!((gaze.vertical - 0.8).abs() < 1e-2, "vertical {}", gaze.vertical);
    }

    #[test]
    fn unrefined_mode_ignores_the_iris() {
        let frame = SyntheticFace {
            gaze_vertical: 0.9,
            gaze_horizontal: 0.1,
            ..SyntheticFace::default()
        }
        .frame();
        let gaze = analyze_gaze(&frame, false);
        assert!((gaze.vertical - 0.5).abs() < 1e-2);
        assert!((gaze.horizontal - 0.5).abs() < 1e-2);
    }

    #[test]
    fn closed_eyes_degrade_to_midpoint() {
        let mut points = SyntheticFace::default().frame().points().to_vec();
        for eye in [LEFT_EYE, RIGHT_EYE] {
            let y = points[eye.lid_top].y;
            points[eye.lid_bottom].y = y;
            points[eye.corner_b].x = points[eye.corner_a].x;
        }
        let gaze = analyze_gaze(&LandmarkFrame::new(points), true);
        assert_eq!(gaze.vertical, 0.5);
        assert_eq!(gaze.horizontal, 0.5);
        assert!(gaze.openness.is_finite());
    }
}
