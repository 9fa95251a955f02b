//! Core data types for the detection engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// A single normalized face-mesh point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// X coordinate in the frame (normalized 0.0-1.0)
    pub x: f32,
    /// Y coordinate in the frame (normalized 0.0-1.0)
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Landmarks for the one tracked face in a frame.
///
/// Indices follow the 468-point face mesh topology. With iris refinement the
/// mesh grows to 478 points and the two iris rings are appended at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    /// Points in the base face mesh
    pub const FACE_MESH_POINTS: usize = 468;
    /// Points in the mesh once iris refinement is applied
    pub const REFINED_POINTS: usize = 478;

    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when the iris ring points are present
    pub fn has_iris(&self) -> bool {
        self.points.len() >= Self::REFINED_POINTS
    }

    /// A frame the extractors can consume: the full base mesh, all coordinates finite.
    pub fn is_well_formed(&self) -> bool {
        self.points.len() >= Self::FACE_MESH_POINTS && self.points.iter().all(Landmark::is_finite)
    }

    /// Normalized box spanning every landmark
    pub fn bounds(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}

impl Index<usize> for LandmarkFrame {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.points[index]
    }
}

/// Dimensions of the captured frame in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A detected object in the visual field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Object class/label
    pub label: String,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
    /// Bounding box (normalized coordinates)
    pub bbox: BoundingBox,
}

/// Bounding box, normalized or in pixels depending on where it is used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Scale a normalized box to frame pixels
    pub fn scaled(&self, size: FrameSize) -> BoundingBox {
        let (w, h) = (size.width as f32, size.height as f32);
        BoundingBox {
            x: self.x * w,
            y: self.y * h,
            width: self.width * w,
            height: self.height * h,
        }
    }
}

/// Where the eyes are pointing, relative to the eye openings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeMetrics {
    /// Iris height inside the eye box; larger means looking lower
    pub vertical: f32,
    /// Iris position across the eye box; 0.5 is centered
    pub horizontal: f32,
    /// Eye height over eye width
    pub openness: f32,
}

/// Coarse head orientation derived from the mesh outline
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPoseMetrics {
    pub nose_y: f32,
    /// Nose-to-chin over nose-to-forehead; grows as the chin turns toward the camera
    pub face_ratio: f32,
    /// Nose position between the face sides; 0.5 is facing the camera
    pub horizontal_rotation: f32,
    pub face_center_x: f32,
    pub face_center_y: f32,
}

/// Phone evidence from the object detector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhoneSignal {
    pub detected: bool,
    /// Normalized box of the accepted candidate
    pub bbox: Option<BoundingBox>,
    pub score: f32,
}

impl PhoneSignal {
    pub fn none() -> Self {
        Self::default()
    }
}

/// The attention state reported to consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// Baseline still being collected
    Calibrating,
    /// Not enough consecutive evidence either way
    #[default]
    Monitoring,
    Normal,
    Doomscrolling,
    NoFace,
    /// Neither provider could be initialized
    Error,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Calibrating => "calibrating",
            Classification::Monitoring => "monitoring",
            Classification::Normal => "normal",
            Classification::Doomscrolling => "doomscrolling",
            Classification::NoFace => "no-face",
            Classification::Error => "error",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// How far along the calibration window is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationProgress {
    pub collected: usize,
    pub required: usize,
}

/// Raw numbers behind a tick's classification
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DebugMetrics {
    pub gaze_vertical_offset: f32,
    pub head_vertical_offset: f32,
    pub horizontal_offset: f32,
    pub rotation_offset: f32,
    pub face_ratio: f32,
    pub openness: f32,
    /// Score from the rule table alone
    pub rule_score: f32,
    pub sensitivity_bonus: f32,
    /// `rule_score + sensitivity_bonus`
    pub score: f32,
    pub phone: bool,
    pub fps: f32,
    pub calibration: Option<CalibrationProgress>,
}

/// Output of one engine tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub classification: Classification,
    pub reason: String,
    /// Face box in frame pixels
    pub face_box: Option<BoundingBox>,
    /// Phone box in frame pixels
    pub phone_box: Option<BoundingBox>,
    pub debug: DebugMetrics,
}

impl DetectionResult {
    pub fn is_distracted(&self) -> bool {
        self.classification == Classification::Doomscrolling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_span_all_points() {
        let frame = LandmarkFrame::new(vec![
            Landmark::new(0.2, 0.3),
            Landmark::new(0.6, 0.1),
            Landmark::new(0.4, 0.9),
        ]);
        let b = frame.bounds().expect("bounds");
        assert!((b.x - 0.2).abs() < 1e-6);
        assert!((b.y - 0.1).abs() < 1e-6);
        assert!((b.width - 0.4).abs() < 1e-6);
        assert!((b.height - 0.8).abs() < 1e-6);

        let px = b.scaled(FrameSize::new(640, 480));
        assert!((px.x - 128.0).abs() < 1e-3);
        assert!((px.height - 384.0).abs() < 1e-3);
    }

    #[test]
    fn short_or_non_finite_frames_are_malformed() {
        let short = LandmarkFrame::new(vec![Landmark::new(0.5, 0.5); 10]);
        assert!(!short.is_well_formed());

        let mut points = vec![Landmark::new(0.5, 0.5); LandmarkFrame::FACE_MESH_POINTS];
        assert!(LandmarkFrame::new(points.clone()).is_well_formed());
        points[7].y = f32::NAN;
        assert!(!LandmarkFrame::new(points).is_well_formed());
    }

    #[test]
    fn classification_serializes_kebab_case() {
        let json = serde_json::to_string(&Classification::NoFace).expect("serialize");
        assert_eq!(json, "\"no-face\"");
        assert_eq!(Classification::default(), Classification::Monitoring);
    }
}
