use crate::config::SessionConfig;
use crate::detection::DetectionPayload;
use crate::events::{LogObserver, ProtocolEvent, ProtocolObserver};
use crate::protocol::{self, Command, Frame};
use crate::reader::{ReaderState, Response, ResponseReader};
use crate::transport::Transport;
use crate::types::{
    DetectionResult, DetectionSize, FaceAngle, FaceDirection, FaceInclination, FeatureMask,
    Orientation, Thresholds, Version,
};
use crate::{HvcError, Result};

/// A lockstep conversation with one sensor.
///
/// At most one command is in flight. Every response, including the filler
/// after an error code, is consumed before the next command may be sent.
/// After a framing failure the session refuses to send until
/// [`Session::resync`] or [`Session::skip_to_sync`] succeeds.
pub struct Session<T: Transport> {
    transport: T,
    reader: ResponseReader,
    observer: Box<dyn ProtocolObserver>,
    outstanding: Option<Command>,
    /// Mask of the detection request awaiting its response.
    pending_mask: Option<FeatureMask>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: &SessionConfig) -> Self {
        Self::with_observer(transport, config, Box::new(LogObserver))
    }

    pub fn with_observer(
        transport: T,
        config: &SessionConfig,
        observer: Box<dyn ProtocolObserver>,
    ) -> Self {
        Self {
            transport,
            reader: ResponseReader::from_config(config),
            observer,
            outstanding: None,
            pending_mask: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn reader_state(&self) -> ReaderState {
        self.reader.state()
    }

    /// Mask retained for the detection response not yet read, if any.
    pub fn pending_mask(&self) -> Option<FeatureMask> {
        self.pending_mask
    }

    fn send(&mut self, frame: &Frame) -> Result<()> {
        if let Some(cmd) = self.outstanding {
            return Err(HvcError::CommandOutstanding(cmd));
        }
        if self.reader.is_errored() {
            return Err(HvcError::Desynchronized);
        }
        self.transport.write(frame.as_bytes())?;
        self.observer.on_event(&ProtocolEvent::CommandSent {
            command: frame.command(),
            bytes: frame.as_bytes().to_vec(),
        });
        Ok(())
    }

    fn receive(&mut self, override_len: Option<usize>) -> Result<Response> {
        let response = self.reader.read_response(&mut self.transport, override_len)?;

        if let (Some(declared), Some(forced)) = (response.declared_len, response.forced_len) {
            self.observer
                .on_event(&ProtocolEvent::PayloadLengthForced { declared, forced });
        }
        if !response.code.is_ok() {
            self.observer.on_event(&ProtocolEvent::ErrorFillerDiscarded {
                code: response.code,
            });
        }
        self.observer.on_event(&ProtocolEvent::ResponseReceived {
            code: response.code,
            declared_len: response.declared_len,
            payload_len: response.payload.as_ref().map_or(0, Vec::len),
        });
        Ok(response)
    }

    fn transaction(&mut self, frame: &Frame, override_len: Option<usize>) -> Result<Response> {
        self.send(frame)?;
        self.outstanding = Some(frame.command());
        let response = self.receive(override_len);
        self.outstanding = None;
        response
    }

    fn exchange(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        self.transaction(frame, None)?.into_payload()
    }

    pub fn version(&mut self) -> Result<Version> {
        let payload = self.exchange(&protocol::version_request())?;
        protocol::parse_version(&payload)
    }

    /// Set the camera mounting angle: 0, 90, 180 or 270 degrees.
    pub fn set_orientation(&mut self, angle: u16) -> Result<()> {
        let frame = protocol::set_orientation(angle)?;
        self.exchange(&frame)?;
        Ok(())
    }

    pub fn orientation(&mut self) -> Result<Orientation> {
        let payload = self.exchange(&protocol::get_orientation())?;
        protocol::parse_orientation(&payload)
    }

    pub fn thresholds(&mut self) -> Result<Thresholds> {
        let payload = self.exchange(&protocol::get_thresholds())?;
        protocol::parse_thresholds(&payload)
    }

    pub fn set_thresholds(&mut self, t: &Thresholds) -> Result<()> {
        self.exchange(&protocol::set_thresholds(t.body, t.hand, t.face, t.reserved))?;
        Ok(())
    }

    pub fn detection_size(&mut self) -> Result<DetectionSize> {
        let payload = self.exchange(&protocol::get_detection_size())?;
        protocol::parse_detection_size(&payload)
    }

    pub fn set_detection_size(&mut self, s: &DetectionSize) -> Result<()> {
        let frame = protocol::set_detection_size(
            s.body_min, s.body_max, s.hand_min, s.hand_max, s.face_min, s.face_max,
        );
        self.exchange(&frame)?;
        Ok(())
    }

    pub fn face_angle(&mut self) -> Result<FaceAngle> {
        let payload = self.exchange(&protocol::get_face_angle())?;
        protocol::parse_face_angle(&payload)
    }

    pub fn set_face_angle(
        &mut self,
        direction: FaceDirection,
        inclination: FaceInclination,
    ) -> Result<()> {
        self.exchange(&protocol::set_face_angle(direction, inclination))?;
        Ok(())
    }

    /// Run one detection and decode it with the mask that was sent.
    pub fn detect(&mut self, mask: FeatureMask) -> Result<DetectionResult> {
        self.begin_detection(mask)?;
        self.finish_detection()
    }

    /// Send a detection request and retain its mask until the response is read.
    pub fn begin_detection(&mut self, mask: FeatureMask) -> Result<()> {
        self.send(&protocol::detection_request(&mask))?;
        self.outstanding = Some(Command::Detect);
        self.pending_mask = Some(mask);
        Ok(())
    }

    /// Read the pending detection response, paired with its mask.
    pub fn finish_detection_raw(&mut self) -> Result<DetectionPayload> {
        let mask = self.pending_mask.take().ok_or(HvcError::NoPendingDetection)?;
        let response = self.receive(None);
        self.outstanding = None;
        let payload = response?.into_payload()?;
        Ok(DetectionPayload::new(mask, payload))
    }

    pub fn finish_detection(&mut self) -> Result<DetectionResult> {
        let raw = self.finish_detection_raw()?;
        raw.decode_observed(self.observer.as_ref())
    }

    /// Send an opaque command (e.g. the face registration family) and return
    /// the framed response without decoding it.
    pub fn raw_command(&mut self, command: Command, payload: &[u8]) -> Result<Response> {
        let frame = Frame::passthrough(command, payload)?;
        self.transaction(&frame, None)
    }

    /// Like [`Session::raw_command`], but read exactly `payload_len` bytes of
    /// response payload regardless of the declared length.
    pub fn raw_command_with_length(
        &mut self,
        command: Command,
        payload: &[u8],
        payload_len: usize,
    ) -> Result<Response> {
        let frame = Frame::passthrough(command, payload)?;
        self.transaction(&frame, Some(payload_len))
    }

    /// Flush pending input and expect a fresh frame. Drops any pending detection.
    pub fn resync(&mut self) -> Result<()> {
        self.reader.resync(&mut self.transport)?;
        self.outstanding = None;
        self.pending_mask = None;
        self.observer
            .on_event(&ProtocolEvent::Resynced { discarded: None });
        Ok(())
    }

    /// Discard inbound bytes up to the next sync byte, reading at most
    /// `max_bytes`, then drain the stale frame that starts there.
    ///
    /// The stale response is returned for inspection. Any pending detection
    /// is dropped since its pairing with the stream is lost.
    pub fn skip_to_sync(&mut self, max_bytes: usize) -> Result<Response> {
        self.outstanding = None;
        self.pending_mask = None;
        let discarded = self.reader.skip_to_sync(&mut self.transport, max_bytes)?;
        self.observer.on_event(&ProtocolEvent::Resynced {
            discarded: Some(discarded),
        });
        self.receive(None)
    }

    pub fn clear_input(&mut self) -> Result<()> {
        self.transport.flush_input()
    }

    pub fn clear_output(&mut self) -> Result<()> {
        self.transport.flush_output()
    }
}
