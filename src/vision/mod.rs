//! Vision pathway - geometry extraction and the provider seams
//!
//! The landmark model and the object detector live outside this crate. They
//! plug in through [`LandmarkProvider`] and [`ObjectDetector`]; everything
//! downstream of them (extractors, phone fusion) is implemented here.

use crate::error::ProviderError;
use crate::types::{DetectedObject, LandmarkFrame};
use async_trait::async_trait;
use image::RgbImage;

mod gaze;
mod head_pose;
pub mod landmarks;
mod object_recognizer;
pub mod simulated;
mod udp_landmarks;

pub use gaze::analyze_gaze;
pub use head_pose::analyze_head_pose;
pub use object_recognizer::{
    select_phone, PhoneTracker, PHONE_MIN_CONFIDENCE, PHONE_POLL_INTERVAL,
};
pub use udp_landmarks::{
    parse_feed_message, udp_feed_addr_from_env, FeedMessage, UdpFeed, UdpLandmarks, UdpObjects,
    FEED_STALE_AFTER,
};

/// Face-mesh model: one frame in, landmarks for at most one face out.
#[async_trait]
pub trait LandmarkProvider: Send {
    fn name(&self) -> &str;

    async fn initialize(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// `Ok(None)` when no face is in view.
    async fn detect(&mut self, frame: &RgbImage) -> Result<Option<LandmarkFrame>, ProviderError>;
}

/// Object detection model returning labelled, normalized boxes.
#[async_trait]
pub trait ObjectDetector: Send {
    fn name(&self) -> &str;

    async fn initialize(&mut self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn detect(&mut self, frame: &RgbImage) -> Result<Vec<DetectedObject>, ProviderError>;
}
