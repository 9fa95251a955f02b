//! # doomslayer
//!
//! Attention-state detection from face geometry. Every tick a face-mesh
//! frame is reduced to gaze and head-pose metrics, compared with a baseline
//! calibrated on the user's own neutral posture, fused with an optional phone
//! detection and debounced into one of a handful of classifications.
//!
//! The landmark model and object detector are external; see
//! [`vision::LandmarkProvider`] and [`vision::ObjectDetector`].

pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod hysteresis;
pub mod report;
pub mod scoring;
pub mod session;
pub mod types;
pub mod vision;

pub use config::DetectorConfig;
pub use engine::{step, Detector, EngineState, TickInput};
pub use error::{DetectorError, ProviderError};
pub use session::{Feedback, SessionStats};
pub use types::*;

use anyhow::Context;
use crossbeam_channel::Sender;
use image::RgbImage;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Drives a [`Detector`] at the configured cadence and keeps the session
/// bookkeeping around it.
pub struct Monitor {
    detector: Detector,
    stats: SessionStats,
    feedback: Feedback,
    sink: Option<Sender<DetectionResult>>,
    /// Frames come from the providers' own capture; the engine only needs the size.
    frame: RgbImage,
    tick_limit: Option<u64>,
    ticks: u64,
    last_classification: Option<Classification>,
    last_message: Option<&'static str>,
}

impl Monitor {
    pub fn new(detector: Detector) -> Self {
        let config = detector.config();
        let frame = RgbImage::new(config.frame_width, config.frame_height);
        Self {
            detector,
            stats: SessionStats::new(),
            feedback: Feedback::new(),
            sink: None,
            frame,
            tick_limit: None,
            ticks: 0,
            last_classification: None,
            last_message: None,
        }
    }

    /// Stop on its own after `ticks` ticks.
    pub fn with_tick_limit(mut self, ticks: u64) -> Self {
        self.tick_limit = Some(ticks);
        self
    }

    /// Forward every result to a downstream consumer
    pub fn connect_sink(&mut self, tx: Sender<DetectionResult>) {
        log::info!("Forwarding detection results to consumer");
        self.sink = Some(tx);
    }

    pub async fn start(&mut self) -> anyhow::Result<()> {
        log::info!("Starting attention monitor...");
        self.detector
            .initialize()
            .await
            .context("failed to initialize detector")
    }

    /// Run a single tick and do the bookkeeping for it.
    pub async fn tick(&mut self) -> anyhow::Result<DetectionResult> {
        let result = self
            .detector
            .process_tick(&self.frame)
            .await
            .context("tick failed")?;
        let now = Instant::now();
        self.ticks += 1;

        if self.stats.record(result.classification, now) {
            log::warn!("Doomscrolling alert #{}: {}", self.stats.alert_count, result.reason);
        }
        if self.last_classification != Some(result.classification) {
            log::info!("[{}] {}", result.classification, result.reason);
            self.last_classification = Some(result.classification);
        }

        let message = self.feedback.message(result.classification, now);
        // Encouragement changes every tick; only new roasts go to the log.
        let is_roast = result.classification == Classification::Doomscrolling;
        if is_roast && message != self.last_message {
            if let Some(line) = message {
                log::info!("{line}");
            }
        }
        self.last_message = message;

        if let Some(ref tx) = self.sink {
            if let Err(e) = tx.send(result.clone()) {
                log::warn!("Result consumer went away: {e}");
                self.sink = None;
            }
        }

        Ok(result)
    }

    /// Tick until `shutdown` fires or the tick limit is reached. Ticks with a
    /// malformed landmark frame are skipped and do not count toward the limit.
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> anyhow::Result<()> {
        let period = Duration::from_millis(self.detector.config().tick_interval_ms);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        log::info!("Monitoring at {:.1} Hz", 1000.0 / period.as_millis() as f64);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    log::info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    let result = match self.tick().await {
                        Ok(result) => result,
                        Err(e) if is_malformed_frame(&e) => {
                            log::warn!("Skipping tick: {e:#}");
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    log::debug!(
                        "{} score={:.2} fps={:.1}",
                        result.classification,
                        result.debug.score,
                        result.debug.fps
                    );
                    if self.tick_limit.is_some_and(|limit| self.ticks >= limit) {
                        log::info!("Tick limit reached");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Clear the session clock and start a fresh calibration.
    pub fn reset_stats(&mut self) {
        log::info!("Resetting session statistics");
        self.stats.reset();
        self.last_classification = None;
        self.detector.recalibrate();
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut Detector {
        &mut self.detector
    }

    pub async fn shutdown(self) -> anyhow::Result<SessionStats> {
        log::info!("Shutting down monitor after {} ticks", self.ticks);
        log::info!("Session: {}", self.stats);
        if let Some(ratio) = self.stats.focus_ratio() {
            log::info!("Focused {:.0}% of tracked time", ratio * 100.0);
        }
        Ok(self.stats)
    }
}

fn is_malformed_frame(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<DetectorError>(),
        Some(DetectorError::MalformedFrame(_))
    )
}
