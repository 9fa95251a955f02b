//! Detection scoring
//!
//! Each signal family is checked on its own against a fixed tier table and
//! the points are summed, so no single noisy ratio can veto a detection. The
//! user's sensitivity shifts the whole sum by a linear bonus instead of
//! touching the tables.

use crate::calibration::Baseline;
use crate::config::DEFAULT_SENSITIVITY;
use crate::types::{GazeMetrics, HeadPoseMetrics, PhoneSignal};
use serde::{Deserialize, Serialize};

/// A tick counts as a raw detection at or above this score.
pub const RAW_DETECTION_CUTOFF: f32 = 3.0;
pub const PHONE_POINTS: f32 = 5.0;
const SENSITIVITY_SLOPE: f32 = 8.0;

/// (minimum offset, points), largest tier first
type TierTable = [(f32, f32); 3];

/// Downward offset of either the iris or the nose
const LOOK_DOWN_TIERS: TierTable = [(0.12, 4.0), (0.09, 3.0), (0.06, 2.0)];
const GAZE_AWAY_TIERS: TierTable = [(0.12, 4.0), (0.08, 3.0), (0.05, 2.0)];
const HEAD_TURN_TIERS: TierTable = [(0.08, 3.0), (0.05, 2.0), (0.03, 1.0)];

fn tier_points(offset: f32, tiers: &TierTable) -> f32 {
    tiers
        .iter()
        .find(|(at_least, _)| offset >= *at_least)
        .map(|(_, points)| *points)
        .unwrap_or(0.0)
}

/// Score shift for a sensitivity: positive below the default, negative above.
pub fn sensitivity_bonus(sensitivity: f32) -> f32 {
    (DEFAULT_SENSITIVITY - sensitivity) * SENSITIVITY_SLOPE
}

/// Evidence family that contributed to a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signal {
    Phone,
    LookingDown,
    GazeAway,
    HeadTurned,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub gaze_vertical_offset: f32,
    pub head_vertical_offset: f32,
    pub horizontal_offset: f32,
    pub rotation_offset: f32,
    pub look_down_points: f32,
    pub gaze_away_points: f32,
    pub head_turn_points: f32,
    pub phone_points: f32,
    /// Sum of the rule table, before the sensitivity bonus
    pub rule_score: f32,
    pub sensitivity_bonus: f32,
    pub score: f32,
}

impl ScoreBreakdown {
    pub fn is_detection(&self) -> bool {
        self.score >= RAW_DETECTION_CUTOFF
    }

    pub fn vertical_offset(&self) -> f32 {
        self.gaze_vertical_offset.max(self.head_vertical_offset)
    }

    /// The signal to explain the score with. A phone always wins; otherwise
    /// the geometry family with the most points, or none if nothing fired.
    pub fn leading_signal(&self) -> Option<Signal> {
        if self.phone_points > 0.0 {
            return Some(Signal::Phone);
        }
        [
            (Signal::LookingDown, self.look_down_points),
            (Signal::GazeAway, self.gaze_away_points),
            (Signal::HeadTurned, self.head_turn_points),
        ]
        .into_iter()
        .filter(|(_, points)| *points > 0.0)
        .fold(None, |best: Option<(Signal, f32)>, (signal, points)| match best {
            Some((_, best_points)) if best_points >= points => best,
            _ => Some((signal, points)),
        })
        .map(|(signal, _)| signal)
    }
}

/// Score one tick against the baseline.
pub fn score(
    baseline: &Baseline,
    gaze: &GazeMetrics,
    head: &HeadPoseMetrics,
    phone: &PhoneSignal,
    sensitivity: f32,
) -> ScoreBreakdown {
    let gaze_vertical_offset = gaze.vertical - baseline.gaze_vertical;
    let head_vertical_offset = head.nose_y - baseline.nose_y;
    let horizontal_offset = (gaze.horizontal - baseline.gaze_horizontal).abs();
    let rotation_offset = (head.horizontal_rotation - baseline.head_rotation).abs();

    let look_down_offset = gaze_vertical_offset.max(head_vertical_offset);
    let look_down_points = tier_points(look_down_offset, &LOOK_DOWN_TIERS);
    let gaze_away_points = tier_points(horizontal_offset, &GAZE_AWAY_TIERS);
    let head_turn_points = tier_points(rotation_offset, &HEAD_TURN_TIERS);
    let phone_points = if phone.detected { PHONE_POINTS } else { 0.0 };

    let rule_score = look_down_points + gaze_away_points + head_turn_points + phone_points;
    let bonus = sensitivity_bonus(sensitivity);

    ScoreBreakdown {
        gaze_vertical_offset,
        head_vertical_offset,
        horizontal_offset,
        rotation_offset,
        look_down_points,
        gaze_away_points,
        head_turn_points,
        phone_points,
        rule_score,
        sensitivity_bonus: bonus,
        score: rule_score + bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> Baseline {
        Baseline {
            gaze_vertical: 0.5,
            gaze_horizontal: 0.5,
            nose_y: 0.3,
            face_ratio: 1.0,
            head_rotation: 0.5,
        }
    }

    fn neutral() -> (GazeMetrics, HeadPoseMetrics) {
        (
            GazeMetrics {
                vertical: 0.5,
                horizontal: 0.5,
                openness: 0.3,
            },
            HeadPoseMetrics {
                nose_y: 0.3,
                face_ratio: 1.0,
                horizontal_rotation: 0.5,
                face_center_x: 0.5,
                face_center_y: 0.5,
            },
        )
    }

    #[test]
    fn baseline_posture_scores_zero() {
        let (gaze, head) = neutral();
        let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), DEFAULT_SENSITIVITY);
        assert_eq!(s.rule_score, 0.0);
        assert_eq!(s.score, 0.0);
        assert!(!s.is_detection());
        assert_eq!(s.leading_signal(), None);
    }

    #[test]
    fn look_down_tiers() {
        let (gaze, mut head) = neutral();
        for (nose, expected) in [(0.35, 0.0), (0.37, 2.0), (0.40, 3.0), (0.45, 4.0)] {
            head.nose_y = nose;
            let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), DEFAULT_SENSITIVITY);
            assert_eq!(s.look_down_points, expected, "nose_y {nose}");
        }
    }

    #[test]
    fn either_eyes_or_nose_qualifies_for_look_down() {
        let (mut gaze, head) = neutral();
        gaze.vertical = 0.63;
        let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), DEFAULT_SENSITIVITY);
        assert_eq!(s.look_down_points, 4.0);
        assert_eq!(s.leading_signal(), Some(Signal::LookingDown));

        // looking up is not looking down
        gaze.vertical = 0.3;
        let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), DEFAULT_SENSITIVITY);
        assert_eq!(s.look_down_points, 0.0);
    }

    #[test]
    fn sideways_gaze_and_head_turn_are_symmetric() {
        let (mut gaze, mut head) = neutral();
        gaze.horizontal = 0.41;
        head.horizontal_rotation = 0.56;
        let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), DEFAULT_SENSITIVITY);
        assert_eq!(s.gaze_away_points, 3.0);
        assert_eq!(s.head_turn_points, 2.0);
        assert_eq!(s.rule_score, 5.0);
        assert_eq!(s.leading_signal(), Some(Signal::GazeAway));

        gaze.horizontal = 0.59;
        head.horizontal_rotation = 0.44;
        let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), DEFAULT_SENSITIVITY);
        assert_eq!(s.rule_score, 5.0);
    }

    #[test]
    fn phone_adds_five_and_leads() {
        let (gaze, mut head) = neutral();
        head.nose_y = 0.45;
        let phone = PhoneSignal {
            detected: true,
            bbox: None,
            score: 0.5,
        };
        let s = score(&baseline(), &gaze, &head, &phone, DEFAULT_SENSITIVITY);
        assert_eq!(s.rule_score, 9.0);
        assert_eq!(s.leading_signal(), Some(Signal::Phone));
    }

    #[test]
    fn sensitivity_bonus_range() {
        assert_eq!(sensitivity_bonus(DEFAULT_SENSITIVITY), 0.0);
        assert!((sensitivity_bonus(0.4) - 1.2).abs() < 1e-5);
        assert!((sensitivity_bonus(0.7) + 1.2).abs() < 1e-5);
    }

    #[test]
    fn raising_sensitivity_never_raises_the_score() {
        let (mut gaze, head) = neutral();
        gaze.horizontal = 0.45;
        let mut last = f32::INFINITY;
        for step in 0..=30 {
            let sensitivity = 0.4 + step as f32 * 0.01;
            let s = score(&baseline(), &gaze, &head, &PhoneSignal::none(), sensitivity);
            assert!(s.score <= last);
            last = s.score;
        }
    }

    #[test]
    fn low_sensitivity_can_tip_a_borderline_frame() {
        let (mut gaze, head) = neutral();
        gaze.horizontal = 0.44;
        let eager = score(&baseline(), &gaze, &head, &PhoneSignal::none(), 0.4);
        let reluctant = score(&baseline(), &gaze, &head, &PhoneSignal::none(), 0.7);
        assert_eq!(eager.rule_score, 2.0);
        assert!(eager.is_detection());
        assert!(!reluctant.is_detection());
    }
}
