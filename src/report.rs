//! Detection result assembly
//!
//! Turns a tick's classification and the numbers behind it into the
//! [`DetectionResult`] handed to consumers. No decisions are made here.

use crate::scoring::{ScoreBreakdown, Signal};
use crate::types::{
    CalibrationProgress, Classification, DebugMetrics, DetectionResult, FrameSize, GazeMetrics,
    HeadPoseMetrics, LandmarkFrame, PhoneSignal,
};

/// Everything a tick observed, as far as it got
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation<'a> {
    pub landmarks: Option<&'a LandmarkFrame>,
    pub gaze: Option<GazeMetrics>,
    pub head: Option<HeadPoseMetrics>,
    pub phone: PhoneSignal,
    pub breakdown: Option<ScoreBreakdown>,
    pub calibration: Option<CalibrationProgress>,
    pub fps: f32,
}

pub fn assemble(
    classification: Classification,
    obs: &Observation<'_>,
    frame_size: FrameSize,
) -> DetectionResult {
    let leading = if obs.phone.detected {
        Some(Signal::Phone)
    } else {
        obs.breakdown.as_ref().and_then(ScoreBreakdown::leading_signal)
    };

    DetectionResult {
        classification,
        reason: reason(classification, leading, obs.calibration),
        face_box: obs
            .landmarks
            .and_then(LandmarkFrame::bounds)
            .map(|b| b.scaled(frame_size)),
        phone_box: obs.phone.bbox.map(|b| b.scaled(frame_size)),
        debug: debug_metrics(obs),
    }
}

/// Human-readable explanation for a classification
pub fn reason(
    classification: Classification,
    leading: Option<Signal>,
    calibration: Option<CalibrationProgress>,
) -> String {
    match classification {
        Classification::Calibrating => match calibration {
            Some(p) => format!(
                "Calibrating {}/{} - sit the way you normally work",
                p.collected, p.required
            ),
            None => "Calibrating...".to_string(),
        },
        Classification::Monitoring => "Monitoring...".to_string(),
        Classification::Normal => "Good posture!".to_string(),
        Classification::Doomscrolling => match leading {
            Some(Signal::Phone) => "Phone detected! Put it down.".to_string(),
            Some(Signal::LookingDown) => "Doomscrolling detected! Eyes up.".to_string(),
            Some(Signal::GazeAway) => "Eyes off the screen".to_string(),
            Some(Signal::HeadTurned) => "Head turned away from the screen".to_string(),
            None => "Doomscrolling detected!".to_string(),
        },
        Classification::NoFace => "No face detected".to_string(),
        Classification::Error => "No landmark or object provider available".to_string(),
    }
}

fn debug_metrics(obs: &Observation<'_>) -> DebugMetrics {
    let b = obs.breakdown.unwrap_or_default();
    DebugMetrics {
        gaze_vertical_offset: b.gaze_vertical_offset,
        head_vertical_offset: b.head_vertical_offset,
        horizontal_offset: b.horizontal_offset,
        rotation_offset: b.rotation_offset,
        face_ratio: obs.head.map(|h| h.face_ratio).unwrap_or_default(),
        openness: obs.gaze.map(|g| g.openness).unwrap_or_default(),
        rule_score: b.rule_score,
        sensitivity_bonus: b.sensitivity_bonus,
        score: b.score,
        phone: obs.phone.detected,
        fps: obs.fps,
        calibration: obs.calibration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use crate::vision::simulated::SyntheticFace;

    #[test]
    fn boxes_are_scaled_to_pixels() {
        let frame = SyntheticFace::default().frame();
        let obs = Observation {
            landmarks: Some(&frame),
            phone: PhoneSignal {
                detected: true,
                bbox: Some(BoundingBox {
                    x: 0.5,
                    y: 0.5,
                    width: 0.25,
                    height: 0.25,
                }),
                score: 0.6,
            },
            ..Observation::default()
        };
        let result = assemble(Classification::Doomscrolling, &obs, FrameSize::new(640, 480));

        let face = result.face_box.expect("face box");
        assert!((face.x - 0.35 * 640.0).abs() < 1e-2);
        assert!((face.y - 0.25 * 480.0).abs() < 1e-2);
        assert!((face.height - 0.5 * 480.0).abs() < 1e-2);

        let phone = result.phone_box.expect("phone box");
        assert_eq!(phone.x, 320.0);
        assert_eq!(phone.height, 120.0);
        assert!(result.debug.phone);
    }

    #[test]
    fn phone_reason_takes_precedence() {
        let breakdown = ScoreBreakdown {
            look_down_points: 4.0,
            phone_points: 5.0,
            ..ScoreBreakdown::default()
        };
        let obs = Observation {
            breakdown: Some(breakdown),
            phone: PhoneSignal {
                detected: true,
                bbox: None,
                score: 0.5,
            },
            ..Observation::default()
        };
        let result = assemble(Classification::Doomscrolling, &obs, FrameSize::new(640, 480));
        assert_eq!(result.reason, "Phone detected! Put it down.");
        assert!(result.face_box.is_none());
    }

    #[test]
    fn calibration_reason_shows_progress() {
        let text = reason(
            Classification::Calibrating,
            None,
            Some(CalibrationProgress {
                collected: 12,
                required: 30,
            }),
        );
        assert!(text.starts_with("Calibrating 12/30"));
    }
}
