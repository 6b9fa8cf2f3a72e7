//! Structured protocol diagnostics.
//!
//! The session reports what crosses the wire as [`ProtocolEvent`]s to a
//! [`ProtocolObserver`]. [`LogObserver`] forwards them to the `log` facade.

use crate::protocol::{Command, ResponseCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    CommandSent {
        command: Command,
        bytes: Vec<u8>,
    },
    ResponseReceived {
        code: ResponseCode,
        /// Length from the header; `None` for non-OK responses.
        declared_len: Option<u32>,
        payload_len: usize,
    },
    /// The 4 filler bytes after a non-OK code were consumed.
    ErrorFillerDiscarded {
        code: ResponseCode,
    },
    /// The payload was read with a caller-supplied length.
    PayloadLengthForced {
        declared: u32,
        forced: usize,
    },
    /// Stream realigned; `discarded` is `None` when the input buffer was flushed.
    Resynced {
        discarded: Option<usize>,
    },
    ImageResolutionMismatch {
        expected: (u16, u16),
        actual: (u16, u16),
    },
}

pub trait ProtocolObserver {
    fn on_event(&self, event: &ProtocolEvent);
}

/// Default observer writing events through `log`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ProtocolObserver for LogObserver {
    fn on_event(&self, event: &ProtocolEvent) {
        match event {
            ProtocolEvent::CommandSent { command, bytes } => {
                log::debug!("--> {} [{}]", command, hex::encode(bytes));
            }
            ProtocolEvent::ResponseReceived {
                code,
                declared_len,
                payload_len,
            } => match declared_len {
                Some(len) => log::debug!("<-- {} ({} bytes declared, {} read)", code, len, payload_len),
                None => log::debug!("<-- {}", code),
            },
            ProtocolEvent::ErrorFillerDiscarded { code } => {
                log::debug!("Discarded error filler after {}", code);
            }
            ProtocolEvent::PayloadLengthForced { declared, forced } => {
                log::warn!(
                    "Forcing payload read of {} bytes instead of declared {}",
                    forced,
                    declared
                );
            }
            ProtocolEvent::Resynced { discarded: Some(n) } => {
                log::info!("Resynced response stream ({} bytes discarded)", n);
            }
            ProtocolEvent::Resynced { discarded: None } => {
                log::info!("Resynced response stream (input flushed)");
            }
            ProtocolEvent::ImageResolutionMismatch { expected, actual } => {
                log::warn!(
                    "Image is {}x{}, expected {}x{} for the requested mode",
                    actual.0,
                    actual.1,
                    expected.0,
                    expected.1
                );
            }
        }
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ProtocolObserver for NullObserver {
    fn on_event(&self, _event: &ProtocolEvent) {}
}
