//! Byte transport to the sensor.
//!
//! The protocol layer only needs [`Transport`]. [`MockTransport`] scripts a
//! device for tests; [`SerialTransport`] (feature `serial`) talks to a real
//! UART.

use crate::{HvcError, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// Minimal blocking byte transport.
pub trait Transport {
    /// Read up to `n` bytes, waiting at most `timeout`.
    ///
    /// A result shorter than `n` means the timeout expired.
    fn read(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>>;

    /// Write all bytes.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Discard anything received but not yet read.
    fn flush_input(&mut self) -> Result<()>;

    /// Discard anything queued but not yet sent.
    fn flush_output(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>> {
        (**self).read(n, timeout)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush_input(&mut self) -> Result<()> {
        (**self).flush_input()
    }

    fn flush_output(&mut self) -> Result<()> {
        (**self).flush_output()
    }
}

#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// Scripted in-memory transport.
///
/// Inbound bytes come from a queue. Bytes can be queued directly with
/// [`MockTransport::push_inbound`], or attached to an expected request with
/// [`MockTransport::expect`], in which case they are queued when that exact
/// request is written.
#[derive(Debug, Default)]
pub struct MockTransport {
    inbound: VecDeque<u8>,
    expectations: VecDeque<Expectation>,
    written: Vec<Vec<u8>>,
    /// Every `read` call as (requested, returned).
    reads: Vec<(usize, usize)>,
    input_flushes: usize,
    output_flushes: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_inbound(&mut self, data: &[u8]) {
        self.inbound.extend(data.iter().copied());
    }

    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    pub fn reads(&self) -> &[(usize, usize)] {
        &self.reads
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    pub fn input_flushes(&self) -> usize {
        self.input_flushes
    }

    pub fn output_flushes(&self) -> usize {
        self.output_flushes
    }
}

impl Transport for MockTransport {
    fn read(&mut self, n: usize, _timeout: Duration) -> Result<Vec<u8>> {
        let take = n.min(self.inbound.len());
        let out: Vec<u8> = self.inbound.drain(..take).collect();
        self.reads.push((n, out.len()));
        Ok(out)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.written.push(data.to_vec());
        if let Some(exp) = self.expectations.pop_front() {
            if exp.request != data {
                return Err(HvcError::Transport(format!(
                    "unexpected write: expected {:02X?}, got {:02X?}",
                    exp.request, data
                )));
            }
            self.inbound.extend(exp.response);
        }
        Ok(())
    }

    fn flush_input(&mut self) -> Result<()> {
        self.input_flushes += 1;
        self.inbound.clear();
        Ok(())
    }

    fn flush_output(&mut self) -> Result<()> {
        self.output_flushes += 1;
        Ok(())
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use super::Transport;
    use crate::config::SerialConfig;
    use crate::Result;
    use serialport::{ClearBuffer, SerialPort};
    use std::io::{ErrorKind, Read, Write};
    use std::time::{Duration, Instant};

    /// UART link to the sensor (8N1, no flow control).
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        pub fn open(config: &SerialConfig) -> Result<Self> {
            let port = serialport::new(&config.port, config.baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .flow_control(serialport::FlowControl::None)
                .timeout(config.timeout)
                .open()?;
            log::info!(
                "Opened serial port {} at {} baud",
                config.port,
                config.baud_rate
            );
            Ok(Self { port })
        }
    }

    impl Transport for SerialTransport {
        fn read(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; n];
            let mut filled = 0;
            let deadline = Instant::now() + timeout;

            while filled < n {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                self.port.set_timeout(deadline - now)?;
                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(k) => filled += k,
                    Err(e) if e.kind() == ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }

            if filled < n {
                log::debug!("Serial read short: asked {} bytes, got {}", n, filled);
            }
            buf.truncate(filled);
            Ok(buf)
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            self.port.flush()?;
            Ok(())
        }

        fn flush_input(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::Input)?;
            Ok(())
        }

        fn flush_output(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::Output)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_short_read() {
        let mut mock = MockTransport::new();
        mock.push_inbound(&[1, 2, 3]);
        let got = mock.read(5, Duration::from_millis(10)).unwrap();
        assert_eq!(got, vec![1, 2, 3]);
        assert_eq!(mock.reads(), &[(5, 3)]);
    }

    #[test]
    fn test_mock_expectation() {
        let mut mock = MockTransport::new();
        mock.expect(&[0xFE, 0x02, 0x00, 0x00], &[0xFE, 0x00]);
        assert_eq!(mock.pending_inbound(), 0);
        mock.write(&[0xFE, 0x02, 0x00, 0x00]).unwrap();
        assert_eq!(mock.pending_inbound(), 2);
        assert_eq!(mock.remaining_expectations(), 0);

        mock.expect(&[0xAA], &[]);
        assert!(mock.write(&[0xBB]).is_err());
    }

    #[test]
    fn test_mock_flush_input() {
        let mut mock = MockTransport::new();
        mock.push_inbound(&[9; 8]);
        mock.flush_input().unwrap();
        assert_eq!(mock.pending_inbound(), 0);
        assert_eq!(mock.input_flushes(), 1);
    }
}
