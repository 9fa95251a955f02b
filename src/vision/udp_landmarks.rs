//! Landmark and object feed over UDP
//!
//! Lets an out-of-process face-mesh/object model drive the engine. Each
//! datagram is one JSON document describing the latest frame:
//!
//! ```text
//! {"landmarks": [[0.51, 0.42], ...],
//!  "objects": [{"label": "cell phone", "confidence": 0.7,
//!               "bbox": {"x": 0.4, "y": 0.6, "width": 0.2, "height": 0.3}}]}
//! ```
//!
//! `landmarks` is `null` or missing when no face is in view. Data older than
//! [`FEED_STALE_AFTER`] is treated as absent.

use super::{LandmarkProvider, ObjectDetector};
use crate::error::ProviderError;
use crate::types::{DetectedObject, Landmark, LandmarkFrame};
use anyhow::Result;
use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;

pub const FEED_STALE_AFTER: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Deserialize)]
struct JsonFeedMsg {
    #[serde(default)]
    landmarks: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    objects: Vec<DetectedObject>,
}

/// One decoded feed datagram
#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub landmarks: Option<LandmarkFrame>,
    pub objects: Vec<DetectedObject>,
}

pub fn udp_feed_addr_from_env() -> Option<SocketAddr> {
    let raw = std::env::var("DOOMSLAYER_FEED_UDP_ADDR").ok()?;
    raw.parse::<SocketAddr>().ok()
}

pub fn parse_feed_message(msg: &str) -> Option<FeedMessage> {
    let msg = msg.trim();
    if msg.is_empty() {
        return None;
    }

    let j = serde_json::from_str::<JsonFeedMsg>(msg).ok()?;
    let landmarks = match j.landmarks {
        Some(points) => {
            // Each point is [x, y] or [x, y, z]; depth is not used.
            let points = points
                .iter()
                .map(|p| match p.as_slice() {
                    [x, y, ..] => Some(Landmark::new(*x, *y)),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            (!points.is_empty()).then(|| LandmarkFrame::new(points))
        }
        None => None,
    };

    Some(FeedMessage {
        landmarks,
        objects: j.objects,
    })
}

#[derive(Default)]
struct FeedState {
    latest: Option<FeedMessage>,
    received_at: Option<Instant>,
}

/// Shared UDP listener feeding both [`UdpLandmarks`] and [`UdpObjects`].
#[derive(Clone)]
pub struct UdpFeed {
    bind_addr: SocketAddr,
    state: Arc<Mutex<FeedState>>,
    started: Arc<OnceCell<SocketAddr>>,
}

impl UdpFeed {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            state: Arc::new(Mutex::new(FeedState::default())),
            started: Arc::new(OnceCell::new()),
        }
    }

    pub fn landmarks(&self) -> UdpLandmarks {
        UdpLandmarks { feed: self.clone() }
    }

    pub fn objects(&self) -> UdpObjects {
        UdpObjects { feed: self.clone() }
    }

    /// Bind the socket and spawn the receive loop. Idempotent; returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let addr = self
            .started
            .get_or_try_init(|| spawn_udp_feed_task(self.bind_addr, Arc::clone(&self.state)))
            .await?;
        Ok(*addr)
    }

    /// Latest message, unless it has gone stale
    fn latest(&self) -> Option<FeedMessage> {
        let state = self.lock();
        let fresh = state
            .received_at
            .map(|t| t.elapsed() < FEED_STALE_AFTER)
            .unwrap_or(false);
        if fresh {
            state.latest.clone()
        } else {
            None
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn spawn_udp_feed_task(
    bind_addr: SocketAddr,
    state: Arc<Mutex<FeedState>>,
) -> Result<SocketAddr> {
    let sock = UdpSocket::bind(bind_addr).await?;
    let local = sock.local_addr()?;
    log::info!("UDP landmark feed bound on {local}");

    tokio::spawn(async move {
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let (len, _src) = match sock.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("UDP feed recv error: {e}");
                    continue;
                }
            };

            let Ok(s) = std::str::from_utf8(&buf[..len]) else {
                continue;
            };
            match parse_feed_message(s) {
                Some(msg) => {
                    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    guard.latest = Some(msg);
                    guard.received_at = Some(Instant::now());
                }
                None => log::debug!("Dropping unparseable feed datagram ({len} bytes)"),
            }
        }
    });

    Ok(local)
}

pub struct UdpLandmarks {
    feed: UdpFeed,
}

#[async_trait]
impl LandmarkProvider for UdpLandmarks {
    fn name(&self) -> &str {
        "udp-landmarks"
    }

    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.feed
            .start()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Unavailable(e.to_string()))
    }

    async fn detect(&mut self, _frame: &RgbImage) -> Result<Option<LandmarkFrame>, ProviderError> {
        Ok(self.feed.latest().and_then(|m| m.landmarks))
    }
}

pub struct UdpObjects {
    feed: UdpFeed,
}

#[async_trait]
impl ObjectDetector for UdpObjects {
    fn name(&self) -> &str {
        "udp-objects"
    }

    async fn initialize(&mut self) -> Result<(), ProviderError> {
        self.feed
            .start()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::Unavailable(e.to_string()))
    }

    async fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<DetectedObject>, ProviderError> {
        Ok(self.feed.latest().map(|m| m.objects).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_landmarks_and_objects() {
        let msg = parse_feed_message(
            r#"{"landmarks":[[0.1,0.2],[0.3,0.4,-0.05]],
                "objects":[{"label":"cell phone","confidence":0.7,
                            "bbox":{"x":0.4,"y":0.6,"width":0.2,"height":0.3}}]}"#,
        )
        .expect("parse");
        let frame = msg.landmarks.expect("landmarks");
        assert_eq!(frame.len(), 2);
        assert!((frame[1].y - 0.4).abs() < 1e-6);
        assert_eq!(msg.objects.len(), 1);
        assert_eq!(msg.objects[0].label, "cell phone");
    }

    #[test]
    fn parse_no_face() {
        let msg = parse_feed_message(r#"{"landmarks":null}"#).expect("parse");
        assert!(msg.landmarks.is_none());
        assert!(msg.objects.is_empty());
    }

    #[test]
    fn reject_garbage() {
        assert!(parse_feed_message("").is_none());
        assert!(parse_feed_message("x=0.5 y=0.5").is_none());
        assert!(parse_feed_message(r#"{"landmarks":[[0.1]]}"#).is_none());
    }

    #[tokio::test]
    async fn datagrams_reach_the_providers() {
        let feed = UdpFeed::new("127.0.0.1:0".parse().expect("addr"));
        let mut landmarks = feed.landmarks();
        let mut objects = feed.objects();
        landmarks.initialize().await.expect("bind");
        objects.initialize().await.expect("idempotent start");
        let addr = feed.start().await.expect("addr");

        let sender = UdpSocket::bind("127.0.0.1:0").await.expect("sender");
        let payload = concat!(
            r#"{"landmarks":[[0.5,0.5]],"objects":[{"label":"cell phone","confidence":0.9,"#,
            r#""bbox":{"x":0.0,"y":0.0,"width":0.1,"height":0.1}}]}"#
        );
        sender.send_to(payload.as_bytes(), addr).await.expect("send");

        let frame = RgbImage::new(4, 4);
        let mut got = None;
        for _ in 0..50 {
            if let Some(f) = landmarks.detect(&frame).await.expect("detect") {
                got = Some(f);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(got.expect("landmarks arrived").len(), 1);
        assert_eq!(objects.detect(&frame).await.expect("objects").len(), 1);
    }
}
