//! Inbound frame reader.
//!
//! Response layout:
//! - OK:     `[0xFE][0x00][len:u32 LE][payload]`
//! - other:  `[0xFE][code][4 filler bytes]`
//!
//! The filler after a non-OK code is always consumed, otherwise the next
//! exchange would start mid-frame.

use crate::config::SessionConfig;
use crate::field;
use crate::protocol::{ResponseCode, ERROR_FILLER_SIZE, SYNC};
use crate::transport::Transport;
use crate::{HvcError, Result};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    AwaitHeader,
    AwaitCode,
    AwaitLength,
    AwaitPayload,
    Complete,
    /// Alignment lost. Only `resync` or `skip_to_sync` leave this state.
    Errored,
}

/// One framed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: ResponseCode,
    pub raw_code: u8,
    /// Length field from the header, present only for OK responses.
    pub declared_len: Option<u32>,
    /// Payload bytes, present only for OK responses.
    pub payload: Option<Vec<u8>>,
    /// Set when the payload was read with a caller-supplied length.
    pub forced_len: Option<usize>,
}

impl Response {
    /// Payload of an OK response, or the device-reported error.
    pub fn into_payload(self) -> Result<Vec<u8>> {
        self.code.into_result()?;
        Ok(self.payload.unwrap_or_default())
    }
}

#[derive(Debug)]
pub struct ResponseReader {
    state: ReaderState,
    timeout: Duration,
    max_payload_len: usize,
}

impl ResponseReader {
    pub fn new(timeout: Duration, max_payload_len: usize) -> Self {
        Self {
            state: ReaderState::AwaitHeader,
            timeout,
            max_payload_len,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.read_timeout, config.max_payload_len)
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn is_errored(&self) -> bool {
        self.state == ReaderState::Errored
    }

    /// Read one complete response.
    ///
    /// `override_len` replaces the declared payload length as the number of
    /// bytes consumed; the declared length is still reported.
    pub fn read_response<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        override_len: Option<usize>,
    ) -> Result<Response> {
        match self.state {
            ReaderState::Errored => return Err(HvcError::Desynchronized),
            // Sync byte already consumed by `skip_to_sync`.
            ReaderState::AwaitCode => {}
            _ => {
                self.state = ReaderState::AwaitHeader;
                let header = self.read_exact(transport, 1, "header")?[0];
                if header != SYNC {
                    self.state = ReaderState::Errored;
                    return Err(HvcError::FramingError(header));
                }
                self.state = ReaderState::AwaitCode;
            }
        }

        let raw_code = self.read_exact(transport, 1, "response code")?[0];
        let code = ResponseCode::classify(raw_code);

        if !code.is_ok() {
            self.read_exact(transport, ERROR_FILLER_SIZE, "error filler")?;
            self.state = ReaderState::Complete;
            return Ok(Response {
                code,
                raw_code,
                declared_len: None,
                payload: None,
                forced_len: None,
            });
        }

        self.state = ReaderState::AwaitLength;
        let len_bytes = self.read_exact(transport, 4, "length")?;
        let declared = field::read_u32le(&len_bytes)?;

        let to_read = match override_len {
            Some(forced) => forced,
            None => {
                if declared as usize > self.max_payload_len {
                    self.state = ReaderState::Errored;
                    return Err(HvcError::PayloadTooLarge {
                        declared,
                        max: self.max_payload_len,
                    });
                }
                declared as usize
            }
        };

        self.state = ReaderState::AwaitPayload;
        let payload = self.read_exact(transport, to_read, "payload")?;
        self.state = ReaderState::Complete;

        Ok(Response {
            code,
            raw_code,
            declared_len: Some(declared),
            payload: Some(payload),
            forced_len: override_len,
        })
    }

    /// Flush the transport's input buffer and start over at a frame boundary.
    pub fn resync<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<()> {
        transport.flush_input()?;
        self.state = ReaderState::AwaitHeader;
        Ok(())
    }

    /// Discard bytes until a sync byte is seen, reading at most `max_bytes`.
    ///
    /// On success the sync byte is consumed, the reader expects a response
    /// code next, and the number of discarded bytes is returned. If the limit
    /// is reached, the error carries the last byte discarded.
    pub fn skip_to_sync<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        max_bytes: usize,
    ) -> Result<usize> {
        if max_bytes == 0 {
            return Err(HvcError::InvalidParameter(
                "sync search needs a limit of at least one byte".into(),
            ));
        }
        self.state = ReaderState::Errored;
        // Always overwritten: the loop runs at least once.
        let mut last = 0u8;
        for discarded in 0..max_bytes {
            let byte = transport.read(1, self.timeout)?;
            let Some(&b) = byte.first() else {
                return Err(HvcError::Timeout {
                    stage: "sync search",
                    expected: 1,
                    received: 0,
                });
            };
            if b == SYNC {
                self.state = ReaderState::AwaitCode;
                return Ok(discarded);
            }
            last = b;
        }
        Err(HvcError::FramingError(last))
    }

    fn read_exact<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        n: usize,
        stage: &'static str,
    ) -> Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let bytes = match transport.read(n, self.timeout) {
            Ok(b) => b,
            Err(e) => {
                self.state = ReaderState::Errored;
                return Err(e);
            }
        };
        if bytes.len() < n {
            log::debug!("Short read at {}: asked {} bytes, got {}", stage, n, bytes.len());
            self.state = ReaderState::Errored;
            return Err(HvcError::Timeout {
                stage,
                expected: n,
                received: bytes.len(),
            });
        }
        Ok(bytes)
    }
}
