//! Run detections in a loop and print a one-line summary for each.
//!
//! Usage: cargo run --example detect --features serial [count]
//! Set HVCP_IMAGE=small|large to also fetch the grayscale image.

use hvcp::config::SerialConfig;
use hvcp::transport::SerialTransport;
use hvcp::{DetectionFlags, FeatureMask, HvcError, ImageMode, Session, SessionConfig};
use std::time::Instant;

fn main() {
    env_logger::init();

    let count: u32 = std::env::args()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let image = match std::env::var("HVCP_IMAGE").as_deref() {
        Ok("small") => ImageMode::Small,
        Ok("large") => ImageMode::Large,
        _ => ImageMode::None,
    };
    let mask = FeatureMask::new(DetectionFlags::all(), image);

    let transport = match SerialTransport::open(&SerialConfig::from_env()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to open serial port: {}", e);
            std::process::exit(1);
        }
    };
    let mut session = Session::new(transport, &SessionConfig::from_env());

    let start = Instant::now();
    for i in 0..count {
        match session.detect(mask) {
            Ok(result) => {
                println!(
                    "#{:<4} bodies={} hands={} faces={}{}",
                    i,
                    result.body.len(),
                    result.hand.len(),
                    result.face.len(),
                    result
                        .image
                        .as_ref()
                        .map(|img| format!(" image={}x{}", img.width, img.height))
                        .unwrap_or_default()
                );
                for face in &result.face {
                    println!(
                        "      face ({:+}, {:+}) size={} age={:?} gender={:?} expression={:?}",
                        face.detection.x,
                        face.detection.y,
                        face.detection.size,
                        face.age.map(|a| a.age),
                        face.gender.map(|g| g.value),
                        face.expression.map(|e| e.kind),
                    );
                }
            }
            Err(e) if e.requires_resync() => {
                eprintln!("Stream lost alignment ({}), resyncing", e);
                if let Err(e) = session.resync() {
                    eprintln!("Resync failed: {}", e);
                    std::process::exit(1);
                }
            }
            Err(HvcError::ResponseError(code)) => {
                eprintln!("Device rejected detection: {}", code);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "\n{} detections in {:.1}s ({:.1} Hz)",
        count,
        elapsed,
        count as f64 / elapsed
    );
}
