use crate::protocol::{Command, ResponseCode};

/// Errors that can occur when talking to the HVC-P sensor.
#[derive(Debug, thiserror::Error)]
pub enum HvcError {
    /// The first byte of a response was not the 0xFE sync byte.
    /// Flush the input buffer (`Session::resync`) before retrying.
    #[error("Framing error: expected sync byte 0xFE, got 0x{0:02x}")]
    FramingError(u8),

    #[error("Timeout reading {stage}: expected {expected} bytes, got {received}")]
    Timeout {
        stage: &'static str,
        expected: usize,
        received: usize,
    },

    /// The device answered with a non-OK response code.
    #[error("Device responded with {0}")]
    ResponseError(ResponseCode),

    #[error(
        "Malformed payload in {segment} at offset {offset}: need {needed} bytes, {remaining} remaining"
    )]
    MalformedPayload {
        segment: &'static str,
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Field width mismatch: expected {expected} bytes, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Unknown camera orientation value 0x{0:02x}")]
    UnknownOrientationValue(u8),

    #[error("Unknown face angle {field} value 0x{value:02x}")]
    UnknownFaceAngleValue { field: &'static str, value: u8 },

    #[error("Declared payload length {declared} exceeds limit {max}")]
    PayloadTooLarge { declared: u32, max: usize },

    /// The reader lost frame alignment and must be resynced before reuse.
    #[error("Response stream desynchronized, resync required")]
    Desynchronized,

    /// A command is still waiting for its response (lockstep violation).
    #[error("Command {0} is still awaiting its response")]
    CommandOutstanding(Command),

    #[error("No detection request is pending")]
    NoPendingDetection,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl HvcError {
    /// Whether the error left the response stream misaligned.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            HvcError::FramingError(_)
                | HvcError::Timeout { .. }
                | HvcError::PayloadTooLarge { .. }
                | HvcError::Desynchronized
        )
    }
}
