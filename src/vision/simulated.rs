//! Simulated providers
//!
//! `SyntheticFace` renders a plausible face mesh from a handful of posture
//! knobs. The simulated providers replay a looping posture pattern when no
//! real feed is attached, and the scripted providers hand out a queue of
//! prepared results for demos and tests.

use super::landmarks::*;
use super::{LandmarkProvider, ObjectDetector};
use crate::error::ProviderError;
use crate::types::{BoundingBox, DetectedObject, Landmark, LandmarkFrame};
use async_trait::async_trait;
use image::RgbImage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

const FOREHEAD_Y: f32 = 0.25;
const CHIN_Y: f32 = 0.75;
const FACE_LEFT_X: f32 = 0.35;
const FACE_RIGHT_X: f32 = 0.65;
const EYE_Y: f32 = 0.42;
const EYE_HALF_HEIGHT: f32 = 0.01;
const EYE_WIDTH: f32 = 0.06;
const LEFT_EYE_X: f32 = 0.40;
const RIGHT_EYE_X: f32 = 0.54;
const IRIS_RADIUS: f32 = 0.004;

/// Posture knobs for a synthetic face. All values are normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticFace {
    pub nose_y: f32,
    /// Iris height inside the eye opening (0 = upper lid, 1 = lower lid)
    pub gaze_vertical: f32,
    /// Iris position across the eye opening (0.5 = centered)
    pub gaze_horizontal: f32,
    /// Nose position between the face sides (0.5 = facing the camera)
    pub rotation: f32,
    /// Emit the ten iris points
    pub refined: bool,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self {
            nose_y: 0.5,
            gaze_vertical: 0.5,
            gaze_horizontal: 0.5,
            rotation: 0.5,
            refined: true,
        }
    }
}

impl SyntheticFace {
    pub fn frame(&self) -> LandmarkFrame {
        let count = if self.refined {
            LandmarkFrame::REFINED_POINTS
        } else {
            LandmarkFrame::FACE_MESH_POINTS
        };

        // Fill the mesh with points spread inside the face oval; the named
        // points below overwrite their slots.
        let mut points: Vec<Landmark> = (0..count)
            .map(|i| {
                let t = i as f32 / count as f32;
                let angle = i as f32 * 2.399_963;
                let r = t.sqrt() * 0.9;
                Landmark::new(0.5 + 0.14 * r * angle.cos(), 0.5 + 0.23 * r * angle.sin())
            })
            .collect();

        points[FOREHEAD] = Landmark::new(0.5, FOREHEAD_Y);
        points[CHIN] = Landmark::new(0.5, CHIN_Y);
        points[FACE_LEFT] = Landmark::new(FACE_LEFT_X, 0.5);
        points[FACE_RIGHT] = Landmark::new(FACE_RIGHT_X, 0.5);
        points[NOSE_TIP] = Landmark::new(
            FACE_LEFT_X + self.rotation * (FACE_RIGHT_X - FACE_LEFT_X),
            self.nose_y,
        );

        self.place_eye(&mut points, &LEFT_EYE, &LEFT_IRIS_RING, LEFT_EYE_X);
        self.place_eye(&mut points, &RIGHT_EYE, &RIGHT_IRIS_RING, RIGHT_EYE_X);

        LandmarkFrame::new(points)
    }

    fn place_eye(&self, points: &mut [Landmark], eye: &EyeIndices, ring: &[usize; 4], x0: f32) {
        let top = EYE_Y - EYE_HALF_HEIGHT;
        let bottom = EYE_Y + EYE_HALF_HEIGHT;
        let third = EYE_WIDTH / 3.0;

        points[eye.corner_a] = Landmark::new(x0, EYE_Y);
        points[eye.corner_b] = Landmark::new(x0 + EYE_WIDTH, EYE_Y);
        points[eye.lid_top] = Landmark::new(x0 + EYE_WIDTH / 2.0, top);
        points[eye.lid_bottom] = Landmark::new(x0 + EYE_WIDTH / 2.0, bottom);

        // contour = [corner, top, top, corner, bottom, bottom]; its centroid is the eye center
        let [_, c1, c2, _, c4, c5] = eye.contour;
        points[c1] = Landmark::new(x0 + third, top);
        points[c2] = Landmark::new(x0 + 2.0 * third, top);
        points[c4] = Landmark::new(x0 + 2.0 * third, bottom);
        points[c5] = Landmark::new(x0 + third, bottom);

        if self.refined {
            let cx = x0 + self.gaze_horizontal * EYE_WIDTH;
            let cy = top + self.gaze_vertical * (bottom - top);
            points[eye.iris_center] = Landmark::new(cx, cy);
            let offsets = [
                (IRIS_RADIUS, 0.0),
                (0.0, -IRIS_RADIUS),
                (-IRIS_RADIUS, 0.0),
                (0.0, IRIS_RADIUS),
            ];
            for (&i, (dx, dy)) in ring.iter().zip(offsets) {
                points[i] = Landmark::new(cx + dx, cy + dy);
            }
        }
    }
}

/// A normalized phone detection for the given confidence
pub fn phone_object(label: &str, confidence: f32) -> DetectedObject {
    DetectedObject {
        label: label.to_string(),
        confidence,
        bbox: BoundingBox {
            x: 0.42,
            y: 0.62,
            width: 0.16,
            height: 0.3,
        },
    }
}

const CYCLE_SECS: f64 = 12.0;
const LOOK_DOWN_AT: f64 = 8.0;
const PHONE_AT: f64 = 10.0;

/// Position inside the looping posture pattern
fn cycle_phase(start: Instant) -> (u64, f64) {
    let t = start.elapsed().as_secs_f64();
    ((t / CYCLE_SECS) as u64, t % CYCLE_SECS)
}

/// Looping face pattern: eight seconds of neutral posture with a little sway,
/// then four seconds looking down.
pub struct SimulatedFace {
    start: Instant,
}

impl SimulatedFace {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SimulatedFace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LandmarkProvider for SimulatedFace {
    fn name(&self) -> &str {
        "simulated-face"
    }

    async fn detect(&mut self, _frame: &RgbImage) -> Result<Option<LandmarkFrame>, ProviderError> {
        let (_, phase) = cycle_phase(self.start);
        let sway = (phase * 1.3).sin() as f32 * 0.01;

        let face = if phase < LOOK_DOWN_AT {
            SyntheticFace {
                nose_y: 0.5 + sway,
                rotation: 0.5 + sway,
                ..SyntheticFace::default()
            }
        } else {
            SyntheticFace {
                nose_y: 0.64 + sway,
                gaze_vertical: 0.75,
                ..SyntheticFace::default()
            }
        };
        Ok(Some(face.frame()))
    }
}

/// A phone shows up near the end of every other cycle.
pub struct SimulatedPhone {
    start: Instant,
    label: String,
}

impl SimulatedPhone {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }
}

#[async_trait]
impl ObjectDetector for SimulatedPhone {
    fn name(&self) -> &str {
        "simulated-phone"
    }

    async fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<DetectedObject>, ProviderError> {
        let (cycle, phase) = cycle_phase(self.start);
        if cycle % 2 == 1 && phase >= PHONE_AT {
            Ok(vec![phone_object(&self.label, 0.6)])
        } else {
            Ok(vec![])
        }
    }
}

/// Queue of prepared provider outcomes, shared between the provider and the
/// code feeding it.
pub struct Script<T> {
    queue: Arc<Mutex<VecDeque<Result<T, String>>>>,
}

impl<T> Clone for Script<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl<T> Script<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.lock().push_back(Ok(item));
    }

    pub fn push_failure(&self, reason: impl Into<String>) {
        self.lock().push_back(Err(reason.into()));
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn pop(&self) -> Option<Result<T, String>> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Result<T, String>>> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// How a scripted provider answers `initialize`
#[derive(Debug, Clone, Default)]
enum Startup {
    #[default]
    Ready,
    /// Fails the first call, succeeds afterwards
    FailOnce(String),
    Unavailable(String),
}

impl Startup {
    fn initialize(&mut self) -> Result<(), ProviderError> {
        match std::mem::take(self) {
            Startup::Ready => Ok(()),
            Startup::FailOnce(reason) => Err(ProviderError::Unavailable(reason)),
            Startup::Unavailable(reason) => {
                *self = Startup::Unavailable(reason.clone());
                Err(ProviderError::Unavailable(reason))
            }
        }
    }
}

/// Landmark provider that replays a [`Script`]; an exhausted script means no face.
pub struct ScriptedLandmarks {
    script: Script<Option<LandmarkFrame>>,
    startup: Startup,
}

impl ScriptedLandmarks {
    pub fn new(script: Script<Option<LandmarkFrame>>) -> Self {
        Self {
            script,
            startup: Startup::Ready,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            script: Script::new(),
            startup: Startup::Unavailable(reason.into()),
        }
    }

    /// First `initialize` fails, later ones succeed.
    pub fn flaky(script: Script<Option<LandmarkFrame>>, reason: impl Into<String>) -> Self {
        Self {
            script,
            startup: Startup::FailOnce(reason.into()),
        }
    }
}

#[async_trait]
impl LandmarkProvider for ScriptedLandmarks {
    fn name(&self) -> &str {
        "scripted-landmarks"
    }

    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.startup.initialize()
    }

    async fn detect(&mut self, _frame: &RgbImage) -> Result<Option<LandmarkFrame>, ProviderError> {
        match self.script.pop() {
            Some(Ok(frame)) => Ok(frame),
            Some(Err(reason)) => Err(ProviderError::Inference(reason)),
            None => Ok(None),
        }
    }
}

/// Object detector that replays a [`Script`]; an exhausted script means nothing detected.
pub struct ScriptedObjects {
    script: Script<Vec<DetectedObject>>,
    startup: Startup,
}

impl ScriptedObjects {
    pub fn new(script: Script<Vec<DetectedObject>>) -> Self {
        Self {
            script,
            startup: Startup::Ready,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            script: Script::new(),
            startup: Startup::Unavailable(reason.into()),
        }
    }

    /// First `initialize` fails, later ones succeed.
    pub fn flaky(script: Script<Vec<DetectedObject>>, reason: impl Into<String>) -> Self {
        Self {
            script,
            startup: Startup::FailOnce(reason.into()),
        }
    }
}

#[async_trait]
impl ObjectDetector for ScriptedObjects {
    fn name(&self) -> &str {
        "scripted-objects"
    }

    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.startup.initialize()
    }

    async fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<DetectedObject>, ProviderError> {
        match self.script.pop() {
            Some(Ok(objects)) => Ok(objects),
            Some(Err(reason)) => Err(ProviderError::Inference(reason)),
            None => Ok(vec![]),
        }
    }
}
