//! Print version and settings of the sensor on `HVCP_PORT`.
//!
//! Usage: cargo run --example info --features serial

use hvcp::config::SerialConfig;
use hvcp::transport::SerialTransport;
use hvcp::{Session, SessionConfig};

fn main() {
    env_logger::init();

    let serial = SerialConfig::from_env();
    let transport = match SerialTransport::open(&serial) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to open {}: {}", serial.port, e);
            std::process::exit(1);
        }
    };
    let mut session = Session::new(transport, &SessionConfig::from_env());

    if let Err(e) = print_info(&mut session) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_info(session: &mut Session<SerialTransport>) -> hvcp::Result<()> {
    println!("Version:        {}", session.version()?);
    println!("Orientation:    {} deg", session.orientation()?.degrees());
    let t = session.thresholds()?;
    println!("Thresholds:     body={} hand={} face={}", t.body, t.hand, t.face);
    let s = session.detection_size()?;
    println!(
        "Detection size: body={}..{} hand={}..{} face={}..{}",
        s.body_min, s.body_max, s.hand_min, s.hand_max, s.face_min, s.face_max
    );
    let a = session.face_angle()?;
    println!("Face angle:     {:?} / {:?}", a.direction, a.inclination);
    Ok(())
}
