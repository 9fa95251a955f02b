//! Example: drive the detector over the UDP landmark feed
//!
//! Binds the feed on a loopback port and plays the part of the external
//! face-mesh process from a second task.

use anyhow::{Context, Result};
use doomslayer::vision::simulated::SyntheticFace;
use doomslayer::vision::UdpFeed;
use doomslayer::{Detector, DetectorConfig};
use image::RgbImage;
use serde_json::json;
use tokio::net::UdpSocket;
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let feed = UdpFeed::new("127.0.0.1:0".parse()?);
    let addr = feed.start().await.context("bind feed")?;
    println!("Feed listening on {addr}");

    let mut detector = Detector::new(
        DetectorConfig::default(),
        Box::new(feed.landmarks()),
        Some(Box::new(feed.objects())),
    )?;
    detector.initialize().await?;

    let sender = tokio::spawn(async move {
        let sock = UdpSocket::bind("127.0.0.1:0").await?;
        for i in 0..80u32 {
            let face = if i < 50 {
                SyntheticFace::default()
            } else {
                SyntheticFace {
                    nose_y: 0.63,
                    ..SyntheticFace::default()
                }
            };
            let points: Vec<[f32; 2]> = face.frame().points().iter().map(|p| [p.x, p.y]).collect();
            let msg = json!({ "landmarks": points, "objects": [] });
            sock.send_to(msg.to_string().as_bytes(), addr).await?;
            sleep(Duration::from_millis(50)).await;
        }
        anyhow::Ok(())
    });

    let frame = RgbImage::new(640, 480);
    sleep(Duration::from_millis(60)).await;
    for _ in 0..80 {
        let result = detector.process_tick(&frame).await?;
        println!("{:<14} {}", result.classification, result.reason);
        sleep(Duration::from_millis(50)).await;
    }

    sender.await??;
    Ok(())
}
