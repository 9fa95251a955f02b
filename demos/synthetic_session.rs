//! Example: a scripted session through the full detector
//!
//! Calibrates on an upright posture, slumps over a phone, puts it away and
//! sits back up, printing each classification change.

use anyhow::Result;
use doomslayer::calibration::CALIBRATION_FRAMES;
use doomslayer::vision::simulated::{
    phone_object, Script, ScriptedLandmarks, ScriptedObjects, SyntheticFace,
};
use doomslayer::{Detector, DetectorConfig, SessionStats};
use image::RgbImage;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let landmarks = Script::new();
    let objects = Script::new();
    let upright = SyntheticFace::default();
    let slumped = SyntheticFace {
        nose_y: 0.62,
        gaze_vertical: 0.7,
        ..SyntheticFace::default()
    };

    for _ in 0..CALIBRATION_FRAMES + 10 {
        landmarks.push(Some(upright.frame()));
    }
    for _ in 0..10 {
        landmarks.push(Some(slumped.frame()));
    }
    // Face drops out of view with the phone still up
    for _ in 0..3 {
        landmarks.push(None);
    }
    for _ in 0..10 {
        landmarks.push(Some(upright.frame()));
    }
    objects.push(vec![phone_object("cell phone", 0.8)]);

    let mut detector = Detector::new(
        DetectorConfig::default(),
        Box::new(ScriptedLandmarks::new(landmarks.clone())),
        Some(Box::new(ScriptedObjects::new(objects))),
    )?;
    detector.initialize().await?;

    let frame = RgbImage::new(640, 480);
    let mut stats = SessionStats::new();
    let mut last = None;
    let mut tick = 0;
    while landmarks.remaining() > 0 {
        let result = detector.process_tick(&frame).await?;
        stats.record(result.classification, Instant::now());
        if last != Some(result.classification) {
            println!(
                "tick {:>3}: {:<14} {} (score {:.2})",
                tick, result.classification, result.reason, result.debug.score
            );
            last = Some(result.classification);
        }
        tick += 1;
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    }

    println!("{stats}");
    Ok(())
}
