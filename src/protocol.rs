use crate::field::{self, PayloadCursor};
use crate::types::{
    DetectionSize, FaceAngle, FaceDirection, FaceInclination, FeatureMask, Orientation,
    Thresholds, Version,
};
use crate::{HvcError, Result};
use std::fmt;

/// Sync byte opening every frame in both directions.
pub const SYNC: u8 = 0xFE;

/// Outbound header: sync, command, u16 LE length.
pub const COMMAND_HEADER_SIZE: usize = 4;

/// Filler bytes the device sends after a non-OK response code.
pub const ERROR_FILLER_SIZE: usize = 4;

// -- Fixed response payload sizes --
pub const VERSION_PAYLOAD_SIZE: usize = 19;
pub const MODEL_NAME_SIZE: usize = 12;
pub const ORIENTATION_PAYLOAD_SIZE: usize = 1;
pub const THRESHOLDS_PAYLOAD_SIZE: usize = 8;
pub const DETECTION_SIZE_PAYLOAD_SIZE: usize = 12;
pub const FACE_ANGLE_PAYLOAD_SIZE: usize = 2;

/// Command codes understood by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Version = 0x00,
    SetOrientation = 0x01,
    GetOrientation = 0x02,
    Detect = 0x03,
    SetThresholds = 0x05,
    GetThresholds = 0x06,
    SetDetectionSize = 0x07,
    GetDetectionSize = 0x08,
    SetFaceAngle = 0x09,
    GetFaceAngle = 0x0A,
    // Face registration family, passed through without decoding.
    RegisterFace = 0x10,
    DeleteAllFaces = 0x13,
    ReadUserData = 0x15,
    SaveAlbum = 0x20,
    LoadAlbum = 0x21,
    SaveAlbumToFlash = 0x22,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Command::Version,
            0x01 => Command::SetOrientation,
            0x02 => Command::GetOrientation,
            0x03 => Command::Detect,
            0x05 => Command::SetThresholds,
            0x06 => Command::GetThresholds,
            0x07 => Command::SetDetectionSize,
            0x08 => Command::GetDetectionSize,
            0x09 => Command::SetFaceAngle,
            0x0A => Command::GetFaceAngle,
            0x10 => Command::RegisterFace,
            0x13 => Command::DeleteAllFaces,
            0x15 => Command::ReadUserData,
            0x20 => Command::SaveAlbum,
            0x21 => Command::LoadAlbum,
            0x22 => Command::SaveAlbumToFlash,
            _ => return None,
        })
    }

    /// Commands outside the core decode scope.
    pub fn is_passthrough(self) -> bool {
        self.code() >= 0x10
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Version => "model/version read",
            Command::SetOrientation => "set camera orientation",
            Command::GetOrientation => "get camera orientation",
            Command::Detect => "detection execute",
            Command::SetThresholds => "set thresholds",
            Command::GetThresholds => "get thresholds",
            Command::SetDetectionSize => "set detection size",
            Command::GetDetectionSize => "get detection size",
            Command::SetFaceAngle => "set face detection angle",
            Command::GetFaceAngle => "get face detection angle",
            Command::RegisterFace => "register face",
            Command::DeleteAllFaces => "delete all faces",
            Command::ReadUserData => "read user data",
            Command::SaveAlbum => "save album",
            Command::LoadAlbum => "load album",
            Command::SaveAlbumToFlash => "save album to flash",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.code())
    }
}

/// A complete outbound frame: `[0xFE][cmd][len:u16 LE][payload]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    bytes: Vec<u8>,
}

impl Frame {
    fn build(command: Command, payload: &[u8]) -> Frame {
        // Core constructors never exceed a handful of bytes.
        let len = payload.len() as u16;
        let mut bytes = Vec::with_capacity(COMMAND_HEADER_SIZE + payload.len());
        bytes.push(SYNC);
        bytes.push(command.code());
        bytes.extend_from_slice(&field::write_u16le(len));
        bytes.extend_from_slice(payload);
        Frame { command, bytes }
    }

    /// Frame an opaque payload, e.g. for the face registration family.
    pub fn passthrough(command: Command, payload: &[u8]) -> Result<Frame> {
        if payload.len() > u16::MAX as usize {
            return Err(HvcError::InvalidParameter(format!(
                "payload of {} bytes does not fit a 16-bit length",
                payload.len()
            )));
        }
        Ok(Frame::build(command, payload))
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[COMMAND_HEADER_SIZE..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn version_request() -> Frame {
    Frame::build(Command::Version, &[])
}

/// Only 0, 90, 180 and 270 degrees are accepted.
pub fn set_orientation(angle: u16) -> Result<Frame> {
    let orientation = Orientation::from_degrees(angle)?;
    Ok(Frame::build(Command::SetOrientation, &[orientation.code()]))
}

pub fn get_orientation() -> Frame {
    Frame::build(Command::GetOrientation, &[])
}

pub fn detection_request(mask: &FeatureMask) -> Frame {
    Frame::build(Command::Detect, &mask.to_request_bytes())
}

pub fn get_thresholds() -> Frame {
    Frame::build(Command::GetThresholds, &[])
}

/// Range checking is left to the device, which answers with a device error.
pub fn set_thresholds(body: u16, hand: u16, face: u16, reserved: u16) -> Frame {
    let mut payload = Vec::with_capacity(THRESHOLDS_PAYLOAD_SIZE);
    for v in [body, hand, face, reserved] {
        payload.extend_from_slice(&field::write_u16le(v));
    }
    Frame::build(Command::SetThresholds, &payload)
}

pub fn get_detection_size() -> Frame {
    Frame::build(Command::GetDetectionSize, &[])
}

pub fn set_detection_size(
    body_min: u16,
    body_max: u16,
    hand_min: u16,
    hand_max: u16,
    face_min: u16,
    face_max: u16,
) -> Frame {
    let mut payload = Vec::with_capacity(DETECTION_SIZE_PAYLOAD_SIZE);
    for v in [body_min, body_max, hand_min, hand_max, face_min, face_max] {
        payload.extend_from_slice(&field::write_u16le(v));
    }
    Frame::build(Command::SetDetectionSize, &payload)
}

pub fn get_face_angle() -> Frame {
    Frame::build(Command::GetFaceAngle, &[])
}

pub fn set_face_angle(direction: FaceDirection, inclination: FaceInclination) -> Frame {
    Frame::build(
        Command::SetFaceAngle,
        &[direction.code(), inclination.code()],
    )
}

/// Response code of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Ok,
    UndefinedCommand,
    InternalError,
    IllegalCommand,
    CommunicationError,
    /// 0xF0..=0xF9, carrying the low nibble.
    DeviceError(u8),
    UnknownCode(u8),
}

impl ResponseCode {
    /// Classify a raw response byte. Never fails.
    pub fn classify(raw: u8) -> ResponseCode {
        match raw {
            0x00 => ResponseCode::Ok,
            0xFF => ResponseCode::UndefinedCommand,
            0xFE => ResponseCode::InternalError,
            0xFD => ResponseCode::IllegalCommand,
            0xFA..=0xFC => ResponseCode::CommunicationError,
            0xF0..=0xF9 => ResponseCode::DeviceError(raw - 0xF0),
            other => ResponseCode::UnknownCode(other),
        }
    }

    pub fn is_ok(self) -> bool {
        self == ResponseCode::Ok
    }

    /// Convert a non-OK code into the error surfaced to callers.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(HvcError::ResponseError(self))
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Ok => write!(f, "OK"),
            ResponseCode::UndefinedCommand => write!(f, "undefined command"),
            ResponseCode::InternalError => write!(f, "internal error"),
            ResponseCode::IllegalCommand => write!(f, "illegal command"),
            ResponseCode::CommunicationError => write!(f, "communication error"),
            ResponseCode::DeviceError(sub) => write!(f, "device error 0x{:x}", sub),
            ResponseCode::UnknownCode(raw) => write!(f, "unknown code 0x{:02x}", raw),
        }
    }
}

/// Parse the model/version response payload.
pub fn parse_version(payload: &[u8]) -> Result<Version> {
    let mut cur = PayloadCursor::new(payload);
    let model_raw = cur.take("version.model", MODEL_NAME_SIZE)?;
    let major = cur.u8("version.major")?;
    let minor = cur.u8("version.minor")?;
    let release = cur.u8("version.release")?;
    let mut revision = [0u8; 4];
    revision.copy_from_slice(cur.take("version.revision", 4)?);
    cur.finish("version")?;

    let end = model_raw.iter().position(|&b| b == 0).unwrap_or(model_raw.len());
    let model = String::from_utf8_lossy(&model_raw[..end])
        .trim_end()
        .to_string();

    Ok(Version {
        model,
        major,
        minor,
        release,
        revision,
    })
}

pub fn parse_orientation(payload: &[u8]) -> Result<Orientation> {
    Orientation::from_code(field::read_u8(payload)?)
}

pub fn parse_thresholds(payload: &[u8]) -> Result<Thresholds> {
    let mut cur = PayloadCursor::new(payload);
    let thresholds = Thresholds {
        body: cur.u16le("thresholds.body")?,
        hand: cur.u16le("thresholds.hand")?,
        face: cur.u16le("thresholds.face")?,
        reserved: cur.u16le("thresholds.reserved")?,
    };
    cur.finish("thresholds")?;
    Ok(thresholds)
}

pub fn parse_detection_size(payload: &[u8]) -> Result<DetectionSize> {
    let mut cur = PayloadCursor::new(payload);
    let size = DetectionSize {
        body_min: cur.u16le("size.body_min")?,
        body_max: cur.u16le("size.body_max")?,
        hand_min: cur.u16le("size.hand_min")?,
        hand_max: cur.u16le("size.hand_max")?,
        face_min: cur.u16le("size.face_min")?,
        face_max: cur.u16le("size.face_max")?,
    };
    cur.finish("detection size")?;
    Ok(size)
}

pub fn parse_face_angle(payload: &[u8]) -> Result<FaceAngle> {
    let mut cur = PayloadCursor::new(payload);
    let direction = FaceDirection::from_code(cur.u8("face_angle.direction")?)?;
    let inclination = FaceInclination::from_code(cur.u8("face_angle.inclination")?)?;
    cur.finish("face angle")?;
    Ok(FaceAngle {
        direction,
        inclination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectionFlags, ImageMode};

    #[test]
    fn test_set_orientation_frame() {
        let frame = set_orientation(90).unwrap();
        assert_eq!(frame.as_bytes(), &[0xFE, 0x01, 0x01, 0x00, 0x01]);
        assert!(matches!(
            set_orientation(45),
            Err(HvcError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_set_thresholds_frame() {
        let frame = set_thresholds(500, 500, 500, 0);
        assert_eq!(
            frame.as_bytes(),
            &[0xFE, 0x05, 0x08, 0x00, 0xF4, 0x01, 0xF4, 0x01, 0xF4, 0x01, 0x00, 0x00]
        );
        assert_eq!(frame.payload().len(), THRESHOLDS_PAYLOAD_SIZE);
    }

    #[test]
    fn test_out_of_range_sizes_are_still_encoded() {
        let frame = set_detection_size(1, 9000, 0, 0xFFFF, 20, 8192);
        assert_eq!(&frame.as_bytes()[..4], &[0xFE, 0x07, 0x0C, 0x00]);
        assert_eq!(&frame.payload()[2..4], &[0x28, 0x23]);
    }

    #[test]
    fn test_empty_requests() {
        assert_eq!(version_request().as_bytes(), &[0xFE, 0x00, 0x00, 0x00]);
        assert_eq!(get_orientation().as_bytes(), &[0xFE, 0x02, 0x00, 0x00]);
        assert_eq!(get_thresholds().as_bytes(), &[0xFE, 0x06, 0x00, 0x00]);
        assert_eq!(get_detection_size().as_bytes(), &[0xFE, 0x08, 0x00, 0x00]);
        assert_eq!(get_face_angle().as_bytes(), &[0xFE, 0x0A, 0x00, 0x00]);
    }

    #[test]
    fn test_detection_request_frame() {
        let mask = FeatureMask::new(DetectionFlags::FACE, ImageMode::None);
        assert_eq!(
            detection_request(&mask).as_bytes(),
            &[0xFE, 0x03, 0x03, 0x00, 0x04, 0x00, 0x00]
        );
    }

    #[test]
    fn test_set_face_angle_frame() {
        let frame = set_face_angle(FaceDirection::Profile, FaceInclination::Deg45);
        assert_eq!(frame.as_bytes(), &[0xFE, 0x09, 0x02, 0x00, 0x02, 0x01]);
    }

    #[test]
    fn test_classify() {
        assert_eq!(ResponseCode::classify(0x00), ResponseCode::Ok);
        assert_eq!(ResponseCode::classify(0xFD), ResponseCode::IllegalCommand);
        assert_eq!(ResponseCode::classify(0xF3), ResponseCode::DeviceError(3));
        assert_eq!(ResponseCode::classify(0xFB), ResponseCode::CommunicationError);
        assert_eq!(ResponseCode::classify(0xFF), ResponseCode::UndefinedCommand);
        assert_eq!(ResponseCode::classify(0xFE), ResponseCode::InternalError);
        assert_eq!(ResponseCode::classify(0x7A), ResponseCode::UnknownCode(0x7A));
    }

    #[test]
    fn test_passthrough_frame() {
        let frame = Frame::passthrough(Command::RegisterFace, &[0x01, 0x00, 0x00]).unwrap();
        assert_eq!(frame.as_bytes(), &[0xFE, 0x10, 0x03, 0x00, 0x01, 0x00, 0x00]);
        assert!(Command::RegisterFace.is_passthrough());
        assert!(!Command::Detect.is_passthrough());
        assert_eq!(Command::from_code(0x22), Some(Command::SaveAlbumToFlash));
        assert_eq!(Command::from_code(0x04), None);
    }

    #[test]
    fn test_parse_version() {
        let mut payload = b"HVC-P       ".to_vec();
        payload.extend_from_slice(&[1, 0, 10, 0x7b, 0x04, 0x00, 0x00]);
        let v = parse_version(&payload).unwrap();
        assert_eq!(v.model, "HVC-P");
        assert_eq!((v.major, v.minor, v.release), (1, 0, 10));
        assert_eq!(v.revision_hex(), "7b040000");

        assert!(matches!(
            parse_version(&payload[..10]),
            Err(HvcError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_parse_settings() {
        let t = parse_thresholds(&[0xFE, 0, 0xFE, 0, 0xFE, 0, 0xFE, 0]).unwrap();
        assert_eq!(t.body, 254);
        assert_eq!(t.reserved, 254);

        let s = parse_detection_size(&[30, 0, 0x40, 1, 40, 0, 0x40, 1, 64, 0, 0x40, 1]).unwrap();
        assert_eq!(s.body_min, 30);
        assert_eq!(s.face_max, 320);

        let a = parse_face_angle(&[0x01, 0x00]).unwrap();
        assert_eq!(a.direction, FaceDirection::Diagonal);
        assert_eq!(a.inclination, FaceInclination::Deg15);
        assert!(matches!(
            parse_face_angle(&[0x03, 0x00]),
            Err(HvcError::UnknownFaceAngleValue { field: "direction", value: 3 })
        ));

        assert_eq!(parse_orientation(&[0x02]).unwrap(), Orientation::Deg180);
        assert!(matches!(
            parse_orientation(&[0x09]),
            Err(HvcError::UnknownOrientationValue(9))
        ));
        assert!(matches!(
            parse_orientation(&[]),
            Err(HvcError::ArityMismatch { .. })
        ));
    }
}
