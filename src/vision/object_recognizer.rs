//! Phone detection fused from an external object detector
//!
//! Object inference is far more expensive than the face mesh, so the detector
//! is polled at most once per [`PHONE_POLL_INTERVAL`] and the last signal is
//! reused in between. A missing, failing or not yet initialized detector
//! reads as "no phone".

use super::ObjectDetector;
use crate::error::ProviderError;
use crate::types::{DetectedObject, PhoneSignal};
use image::RgbImage;
use std::time::{Duration, Instant};

pub const PHONE_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Low bar on purpose: the phone is additive evidence, recall matters more.
pub const PHONE_MIN_CONFIDENCE: f32 = 0.25;

pub struct PhoneTracker {
    detector: Option<Box<dyn ObjectDetector>>,
    /// Set by the last successful `initialize`
    ready: bool,
    label: String,
    last_poll: Option<Instant>,
    signal: PhoneSignal,
}

impl PhoneTracker {
    pub fn new(detector: Option<Box<dyn ObjectDetector>>, label: impl Into<String>) -> Self {
        Self {
            detector,
            ready: false,
            label: label.into(),
            last_poll: None,
            signal: PhoneSignal::none(),
        }
    }

    /// Initialize the wrapped detector. Until a call succeeds the tracker
    /// reports no phone; every call retries.
    pub async fn initialize(&mut self) -> Result<(), ProviderError> {
        let Some(detector) = self.detector.as_mut() else {
            return Err(ProviderError::Unavailable("no object detector configured".to_string()));
        };

        log::info!("Initializing object detector '{}'...", detector.name());
        match detector.initialize().await {
            Ok(()) => {
                self.ready = true;
                Ok(())
            }
            Err(e) => {
                log::warn!("Object detector unavailable, continuing on face geometry alone: {e}");
                self.ready = false;
                Err(e)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.ready && self.detector.is_some()
    }

    /// Last signal handed out
    pub fn signal(&self) -> PhoneSignal {
        self.signal
    }

    /// Forget the last signal so the next poll goes straight to the detector.
    pub fn reset(&mut self) {
        self.last_poll = None;
        self.signal = PhoneSignal::none();
    }

    pub async fn poll(&mut self, frame: &RgbImage, now: Instant) -> PhoneSignal {
        if !self.ready {
            return PhoneSignal::none();
        }
        let Some(detector) = self.detector.as_mut() else {
            return PhoneSignal::none();
        };

        if let Some(last) = self.last_poll {
            if now.duration_since(last) < PHONE_POLL_INTERVAL {
                return self.signal;
            }
        }
        self.last_poll = Some(now);

        self.signal = match detector.detect(frame).await {
            Ok(objects) => select_phone(&objects, &self.label),
            Err(e) => {
                log::warn!("Object detection failed this tick: {e}");
                PhoneSignal::none()
            }
        };
        if self.signal.detected {
            log::debug!("Phone detected (score {:.2})", self.signal.score);
        }
        self.signal
    }
}

/// Pick the most confident candidate of the phone class above the confidence floor.
pub fn select_phone(objects: &[DetectedObject], label: &str) -> PhoneSignal {
    objects
        .iter()
        .filter(|obj| obj.label == label && obj.confidence > PHONE_MIN_CONFIDENCE)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        .map(|obj| PhoneSignal {
            detected: true,
            bbox: Some(obj.bbox),
            score: obj.confidence,
        })
        .unwrap_or_default()
}
