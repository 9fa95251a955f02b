//! doomslayer - catch yourself doomscrolling
//!
//! Runs the attention monitor against a landmark feed:
//! - a UDP JSON feed from an external face-mesh process (`--udp` or
//!   `DOOMSLAYER_FEED_UDP_ADDR`)
//! - otherwise the built-in simulated face and phone

use anyhow::{Context, Result};
use clap::Parser;
use doomslayer::vision::simulated::{SimulatedFace, SimulatedPhone};
use doomslayer::vision::{udp_feed_addr_from_env, LandmarkProvider, ObjectDetector, UdpFeed};
use doomslayer::{DetectionResult, Detector, DetectorConfig, Monitor};
use log::LevelFilter;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doomslayer")]
#[command(
    about = "Attention-state detection from face geometry and phone sightings",
    long_about = None
)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Detection sensitivity, 0.4 (strict) to 0.7 (lenient)
    #[arg(short, long)]
    sensitivity: Option<f32>,

    /// Listen for landmark/object datagrams on this address
    #[arg(long, value_name = "ADDR")]
    udp: Option<SocketAddr>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Print every result as a JSON line on stdout
    #[arg(long)]
    json: bool,
}

fn providers(
    udp: Option<SocketAddr>,
    config: &DetectorConfig,
) -> (Box<dyn LandmarkProvider>, Box<dyn ObjectDetector>) {
    match udp {
        Some(addr) => {
            log::info!("Using UDP landmark feed on {addr}");
            let feed = UdpFeed::new(addr);
            (Box::new(feed.landmarks()), Box::new(feed.objects()))
        }
        None => {
            log::info!("No feed configured, using the simulated face");
            (
                Box::new(SimulatedFace::new()),
                Box::new(SimulatedPhone::new(config.phone_label.clone())),
            )
        }
    }
}

fn print_json(rx: crossbeam_channel::Receiver<DetectionResult>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for result in rx {
            match serde_json::to_string(&result) {
                Ok(line) => println!("{line}"),
                Err(e) => log::warn!("Failed to encode result: {e}"),
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => DetectorConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DetectorConfig::default(),
    };
    if let Some(sensitivity) = cli.sensitivity {
        config = config.with_sensitivity(sensitivity);
    }

    log::info!("═══════════════════════════════════════");
    log::info!("  doomslayer: eyes up");
    log::info!("═══════════════════════════════════════");

    let udp = cli.udp.or_else(udp_feed_addr_from_env);
    let (landmarks, objects) = providers(udp, &config);
    let detector = Detector::new(config, landmarks, Some(objects))?;

    let mut monitor = Monitor::new(detector);
    if let Some(ticks) = cli.ticks {
        monitor = monitor.with_tick_limit(ticks);
    }

    let printer = if cli.json {
        let (tx, rx) = crossbeam_channel::unbounded();
        monitor.connect_sink(tx);
        Some(print_json(rx))
    } else {
        None
    };

    monitor.start().await?;

    log::info!("Sit the way you normally work while the baseline is collected");
    log::info!("Press Ctrl+C to exit");
    log::info!("───────────────────────────────────────");

    let (tx, rx) = tokio::sync::mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal...");
        let _ = tx.blocking_send(());
    })?;

    let monitor_task = tokio::spawn(async move {
        if let Err(e) = monitor.run(rx).await {
            log::error!("Monitor error: {e:#}");
        }
        monitor
    });

    let monitor = monitor_task.await?;
    let stats = monitor.shutdown().await?;

    // Dropping the monitor closed the sink, so the printer drains and exits.
    if let Some(printer) = printer {
        if printer.join().is_err() {
            log::warn!("JSON printer thread panicked");
        }
    }

    log::info!("Done. {stats}");
    Ok(())
}
