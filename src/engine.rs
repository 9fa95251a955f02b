//! The detection engine
//!
//! [`step`] is the whole per-tick decision: geometry extraction, calibration
//! or scoring, then hysteresis, in that order. It takes the [`EngineState`] by
//! value and hands back the next one, so it can be driven and tested without
//! any providers. [`Detector`] wraps it with the landmark provider and the
//! phone tracker and is what applications talk to.

use crate::calibration::{Baseline, Calibrator};
use crate::config::{clamp_sensitivity, DetectorConfig, DEFAULT_DETECTION_THRESHOLD};
use crate::error::{DetectorError, Result};
use crate::hysteresis::Hysteresis;
use crate::report::{self, Observation};
use crate::scoring;
use crate::types::{
    CalibrationProgress, Classification, DetectionResult, FrameSize, GazeMetrics, HeadPoseMetrics,
    LandmarkFrame, PhoneSignal,
};
use crate::vision::{
    analyze_gaze, analyze_head_pose, LandmarkProvider, ObjectDetector, PhoneTracker,
};
use image::RgbImage;
use std::time::Instant;

/// Weight of the newest sample in the frame rate average
const FPS_SMOOTHING: f32 = 0.1;

/// Everything the engine remembers between ticks
#[derive(Debug, Clone)]
pub struct EngineState {
    calibrator: Calibrator,
    hysteresis: Hysteresis,
    last_tick: Option<Instant>,
    fps: f32,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_DETECTION_THRESHOLD)
    }
}

impl EngineState {
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_threshold(config.detection_threshold)
    }

    fn with_threshold(threshold: u32) -> Self {
        Self {
            calibrator: Calibrator::new(),
            hysteresis: Hysteresis::new(threshold),
            last_tick: None,
            fps: 0.0,
        }
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.calibrator.baseline()
    }

    pub fn calibration_progress(&self) -> CalibrationProgress {
        self.calibrator.progress()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.is_complete()
    }

    pub fn hysteresis(&self) -> &Hysteresis {
        &self.hysteresis
    }

    /// Last committed stable classification
    pub fn committed(&self) -> Classification {
        self.hysteresis.committed()
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Start a new calibration window. Runs in flight are dropped; the
    /// committed classification stays.
    pub fn recalibrate(&mut self) {
        self.calibrator.clear();
        self.hysteresis.restart_counters();
    }

    /// Back to a fresh session, keeping the configured threshold.
    pub fn reset(&mut self) {
        self.calibrator.clear();
        self.hysteresis.reset();
        self.last_tick = None;
        self.fps = 0.0;
    }

    fn record_tick(&mut self, now: Instant) {
        if let Some(last) = self.last_tick {
            let dt = now.saturating_duration_since(last).as_secs_f32();
            if dt > 0.0 {
                let instant = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    instant
                } else {
                    self.fps + FPS_SMOOTHING * (instant - self.fps)
                };
            }
        }
        self.last_tick = Some(now);
    }
}

/// One tick's worth of input, already checked for shape
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    landmarks: Option<&'a LandmarkFrame>,
    phone: PhoneSignal,
    frame_size: FrameSize,
    now: Instant,
}

impl<'a> TickInput<'a> {
    /// Fails with [`DetectorError::MalformedFrame`] when the landmarks are not
    /// a full, finite face mesh.
    pub fn new(
        landmarks: Option<&'a LandmarkFrame>,
        phone: PhoneSignal,
        frame_size: FrameSize,
        now: Instant,
    ) -> Result<Self> {
        if let Some(frame) = landmarks {
            if frame.len() < LandmarkFrame::FACE_MESH_POINTS {
                return Err(DetectorError::MalformedFrame(format!(
                    "expected at least {} landmarks, got {}",
                    LandmarkFrame::FACE_MESH_POINTS,
                    frame.len()
                )));
            }
            if !frame.is_well_formed() {
                return Err(DetectorError::MalformedFrame(
                    "non-finite landmark coordinate".to_string(),
                ));
            }
        }
        Ok(Self {
            landmarks,
            phone,
            frame_size,
            now,
        })
    }
}

fn metrics_are_finite(gaze: &GazeMetrics, head: &HeadPoseMetrics) -> bool {
    [
        gaze.vertical,
        gaze.horizontal,
        gaze.openness,
        head.nose_y,
        head.face_ratio,
        head.horizontal_rotation,
    ]
    .iter()
    .all(|v| v.is_finite())
}

/// Advance the engine by one tick.
pub fn step(
    mut state: EngineState,
    input: &TickInput<'_>,
    config: &DetectorConfig,
) -> (EngineState, DetectionResult) {
    state.record_tick(input.now);

    let mut obs = Observation {
        landmarks: input.landmarks,
        phone: input.phone,
        fps: state.fps,
        ..Observation::default()
    };

    let Some(frame) = input.landmarks else {
        // No face: the counters sit this tick out.
        if !state.calibrator.is_complete() {
            obs.calibration = Some(state.calibrator.progress());
        }
        let classification = if input.phone.detected {
            state.hysteresis.force(Classification::Doomscrolling);
            Classification::Doomscrolling
        } else {
            Classification::NoFace
        };
        let result = report::assemble(classification, &obs, input.frame_size);
        return (state, result);
    };

    let gaze = analyze_gaze(frame, config.refine_landmarks);
    let head = analyze_head_pose(frame);
    obs.gaze = Some(gaze);
    obs.head = Some(head);

    let classification = match state.calibrator.baseline().copied() {
        None => {
            if !input.phone.detected && metrics_are_finite(&gaze, &head) {
                state.calibrator.add_sample(&gaze, &head);
            }
            obs.calibration = Some(state.calibrator.progress());
            Classification::Calibrating
        }
        Some(baseline) => {
            let breakdown =
                scoring::score(&baseline, &gaze, &head, &input.phone, config.sensitivity);
            log::debug!(
                "score={:.2} (rules {:.2}, bonus {:+.2}) down={:.3} side={:.3} turn={:.3} phone={}",
                breakdown.score,
                breakdown.rule_score,
                breakdown.sensitivity_bonus,
                breakdown.vertical_offset(),
                breakdown.horizontal_offset,
                breakdown.rotation_offset,
                input.phone.detected
            );
            obs.breakdown = Some(breakdown);
            state.hysteresis.update(breakdown.is_detection())
        }
    };

    let result = report::assemble(classification, &obs, input.frame_size);
    (state, result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Uninitialized,
    Ready,
    /// Neither provider came up
    Failed,
}

/// Attention-state detector driving the providers once per tick.
pub struct Detector {
    config: DetectorConfig,
    landmarks: Box<dyn LandmarkProvider>,
    landmarks_ready: bool,
    phone: PhoneTracker,
    state: EngineState,
    status: Status,
}

impl Detector {
    pub fn new(
        config: DetectorConfig,
        landmarks: Box<dyn LandmarkProvider>,
        objects: Option<Box<dyn ObjectDetector>>,
    ) -> Result<Self> {
        config.validate()?;
        let phone = PhoneTracker::new(objects, config.phone_label.clone());
        let state = EngineState::new(&config);
        Ok(Self {
            config,
            landmarks,
            landmarks_ready: false,
            phone,
            state,
            status: Status::Uninitialized,
        })
    }

    /// Bring up both providers. Fails only when neither comes up; in that case
    /// every later tick reports [`Classification::Error`] until this succeeds.
    pub async fn initialize(&mut self) -> Result<()> {
        log::info!("Initializing landmark provider '{}'...", self.landmarks.name());
        let landmark_err = match self.landmarks.initialize().await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Landmark provider unavailable: {e}");
                Some(e.to_string())
            }
        };
        self.landmarks_ready = landmark_err.is_none();

        let object_err = self.phone.initialize().await.err().map(|e| e.to_string());

        if let (Some(landmarks), Some(objects)) = (landmark_err, object_err) {
            log::error!("Detector failed to initialize");
            self.status = Status::Failed;
            return Err(DetectorError::ProvidersUnavailable { landmarks, objects });
        }

        self.status = Status::Ready;
        log::info!(
            "Detector ready (landmarks: {}, phone detection: {}, sensitivity {:.2})",
            self.landmarks_ready,
            self.phone.is_available(),
            self.config.sensitivity
        );
        Ok(())
    }

    /// Run one tick against a captured frame.
    pub async fn process_tick(&mut self, frame: &RgbImage) -> Result<DetectionResult> {
        let frame_size = FrameSize::new(frame.width(), frame.height());
        match self.status {
            Status::Uninitialized => return Err(DetectorError::NotInitialized),
            Status::Failed => {
                return Ok(report::assemble(
                    Classification::Error,
                    &Observation::default(),
                    frame_size,
                ))
            }
            Status::Ready => {}
        }

        let now = Instant::now();
        let landmarks = if self.landmarks_ready {
            match self.landmarks.detect(frame).await {
                Ok(landmarks) => landmarks,
                Err(e) => {
                    log::warn!("Landmark detection failed this tick: {e}");
                    None
                }
            }
        } else {
            None
        };
        let phone = self.phone.poll(frame, now).await;

        let input = TickInput::new(landmarks.as_ref(), phone, frame_size, now)?;
        let state = std::mem::take(&mut self.state);
        let (state, result) = step(state, &input, &self.config);
        self.state = state;
        Ok(result)
    }

    pub fn set_sensitivity(&mut self, value: f32) {
        self.config.sensitivity = clamp_sensitivity(value);
        log::info!("Sensitivity set to {:.2}", self.config.sensitivity);
    }

    pub fn sensitivity(&self) -> f32 {
        self.config.sensitivity
    }

    pub fn recalibrate(&mut self) {
        log::info!("Recalibrating: collecting a new baseline");
        self.state.recalibrate();
    }

    pub fn reset(&mut self) {
        log::info!("Resetting detector");
        self.state.reset();
        self.phone.reset();
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }
}
