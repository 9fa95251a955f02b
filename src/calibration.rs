//! Personal baseline calibration
//!
//! The first [`CALIBRATION_FRAMES`] valid frames of a session are averaged into
//! a [`Baseline`] describing the user's neutral posture and gaze. All scoring
//! is relative to it, so the same physical posture reads the same across
//! users and camera placements.

use crate::types::{CalibrationProgress, GazeMetrics, HeadPoseMetrics};
use serde::{Deserialize, Serialize};

pub const CALIBRATION_FRAMES: usize = 30;

/// Frozen neutral reference. Never changes once built; start over with
/// [`Calibrator::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub gaze_vertical: f32,
    pub gaze_horizontal: f32,
    pub nose_y: f32,
    pub face_ratio: f32,
    pub head_rotation: f32,
}

impl Baseline {
    /// A baseline that reads exactly the given metrics as neutral
    pub fn from_metrics(gaze: &GazeMetrics, head: &HeadPoseMetrics) -> Self {
        Self {
            gaze_vertical: gaze.vertical,
            gaze_horizontal: gaze.horizontal,
            nose_y: head.nose_y,
            face_ratio: head.face_ratio,
            head_rotation: head.horizontal_rotation,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    sums: [f64; 5],
    collected: usize,
    baseline: Option<Baseline>,
}

impl Calibrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            collected: self.collected,
            required: CALIBRATION_FRAMES,
        }
    }

    /// Add one frame's metrics. Returns the baseline on the sample that completes it.
    /// Ignored once the baseline exists.
    pub fn add_sample(&mut self, gaze: &GazeMetrics, head: &HeadPoseMetrics) -> Option<Baseline> {
        if self.baseline.is_some() {
            return None;
        }

        let sample = [
            gaze.vertical,
            gaze.horizontal,
            head.nose_y,
            head.face_ratio,
            head.horizontal_rotation,
        ];
        for (sum, value) in self.sums.iter_mut().zip(sample) {
            *sum += f64::from(value);
        }
        self.collected += 1;

        if self.collected < CALIBRATION_FRAMES {
            return None;
        }

        let n = self.collected as f64;
        let mean = |i: usize| (self.sums[i] / n) as f32;
        let baseline = Baseline {
            gaze_vertical: mean(0),
            gaze_horizontal: mean(1),
            nose_y: mean(2),
            face_ratio: mean(3),
            head_rotation: mean(4),
        };
        log::info!(
            "Baseline calibrated: gaze=({:.3}, {:.3}) nose_y={:.3} face_ratio={:.3} rotation={:.3}",
            baseline.gaze_vertical,
            baseline.gaze_horizontal,
            baseline.nose_y,
            baseline.face_ratio,
            baseline.head_rotation
        );
        self.baseline = Some(baseline);
        self.baseline
    }

    /// Drop the baseline and the accumulator.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(nose_y: f32) -> HeadPoseMetrics {
        HeadPoseMetrics {
            nose_y,
            face_ratio: 1.0,
            horizontal_rotation: 0.5,
            face_center_x: 0.5,
            face_center_y: 0.5,
        }
    }

    fn gaze() -> GazeMetrics {
        GazeMetrics {
            vertical: 0.4,
            horizontal: 0.5,
            openness: 0.3,
        }
    }

    #[test]
    fn freezes_on_the_thirtieth_sample() {
        let mut cal = Calibrator::new();
        for i in 0..CALIBRATION_FRAMES - 1 {
            assert!(cal.add_sample(&gaze(), &head(0.3)).is_none());
            assert_eq!(cal.progress().collected, i + 1);
        }
        assert!(!cal.is_complete());

        let baseline = cal.add_sample(&gaze(), &head(0.3)).expect("complete");
        assert!((baseline.nose_y - 0.3).abs() < 1e-6);
        assert!((baseline.gaze_vertical - 0.4).abs() < 1e-6);
        assert!(cal.is_complete());
    }

    #[test]
    fn baseline_is_the_mean() {
        let mut cal = Calibrator::new();
        for i in 0..CALIBRATION_FRAMES {
            let nose = if i % 2 == 0 { 0.2 } else { 0.4 };
            cal.add_sample(&gaze(), &head(nose));
        }
        let baseline = cal.baseline().expect("baseline");
        assert!((baseline.nose_y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn frozen_baseline_ignores_further_samples() {
        let mut cal = Calibrator::new();
        for _ in 0..CALIBRATION_FRAMES {
            cal.add_sample(&gaze(), &head(0.3));
        }
        let before = *cal.baseline().expect("baseline");
        assert!(cal.add_sample(&gaze(), &head(0.9)).is_none());
        assert_eq!(*cal.baseline().expect("baseline"), before);
        assert_eq!(cal.progress().collected, CALIBRATION_FRAMES);
    }

    #[test]
    fn clear_restarts_the_window() {
        let mut cal = Calibrator::new();
        for _ in 0..CALIBRATION_FRAMES {
            cal.add_sample(&gaze(), &head(0.3));
        }
        cal.clear();
        assert!(cal.baseline().is_none());
        assert_eq!(cal.progress().collected, 0);
    }
}
