//! # hvcp - host driver for the Omron HVC-P vision sensor
//!
//! Binary request/response protocol over a serial link. Provides:
//! - Command framing for every settings and detection command
//! - A framing state machine for responses, with caller-driven resync
//! - Decoding of detection results (bodies, hands, faces with optional
//!   attributes, optional grayscale image) from the mask that requested them
//!
//! ## Quick Start
//! ```no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> hvcp::Result<()> {
//! use hvcp::{DetectionFlags, FeatureMask, ImageMode, Session, SessionConfig};
//! use hvcp::config::SerialConfig;
//! use hvcp::transport::SerialTransport;
//!
//! let transport = SerialTransport::open(&SerialConfig::from_env())?;
//! let mut session = Session::new(transport, &SessionConfig::from_env());
//! println!("{}", session.version()?);
//!
//! let mask = FeatureMask::new(DetectionFlags::FACE | DetectionFlags::AGE, ImageMode::None);
//! let result = session.detect(mask)?;
//! for face in &result.face {
//!     println!("face at ({}, {}) age {:?}", face.detection.x, face.detection.y, face.age);
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

pub mod error;
pub mod field;
pub mod types;
pub mod protocol;
pub mod reader;
pub mod detection;
pub mod transport;
pub mod events;
pub mod config;
pub mod session;

pub use config::SessionConfig;
pub use detection::{decode_detection, encode_detection, DetectionPayload};
pub use error::HvcError;
pub use protocol::{Command, Frame, ResponseCode};
pub use reader::{ReaderState, Response, ResponseReader};
pub use session::Session;
pub use transport::{MockTransport, Transport};
pub use types::*;

/// Result type alias for hvcp operations.
pub type Result<T> = std::result::Result<T, HvcError>;
