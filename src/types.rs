use crate::{HvcError, Result};
use std::fmt;
use std::str::FromStr;

bitflags::bitflags! {
    /// Detection functions requested in a detection-execute command.
    ///
    /// Bits 0-7 travel in the first payload byte, bit 8 in the second.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DetectionFlags: u16 {
        const HUMAN_BODY        = 1 << 0;
        const HAND              = 1 << 1;
        const FACE              = 1 << 2;
        const FACE_ORIENTATION  = 1 << 3;
        const AGE               = 1 << 4;
        const GENDER            = 1 << 5;
        const GAZE              = 1 << 6;
        const EYES_CLOSED       = 1 << 7;
        const FACIAL_EXPRESSION = 1 << 8;
    }
}

/// Optional image output appended to a detection result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageMode {
    #[default]
    None = 0,
    /// 320x240 grayscale.
    Large = 1,
    /// 160x120 grayscale.
    Small = 2,
}

impl ImageMode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Expected (width, height) of the image plane, if any.
    pub fn resolution(self) -> Option<(u16, u16)> {
        match self {
            ImageMode::None => None,
            ImageMode::Large => Some((320, 240)),
            ImageMode::Small => Some((160, 120)),
        }
    }
}

/// Everything requested in one detection command.
///
/// The response carries no description of its own layout, so the exact mask
/// that was sent is needed to decode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureMask {
    pub flags: DetectionFlags,
    pub image: ImageMode,
}

impl FeatureMask {
    pub fn new(flags: DetectionFlags, image: ImageMode) -> Self {
        Self { flags, image }
    }

    pub fn contains(&self, flag: DetectionFlags) -> bool {
        self.flags.contains(flag)
    }

    /// The three payload bytes of a detection-execute command.
    pub fn to_request_bytes(&self) -> [u8; 3] {
        let [lo, hi] = self.flags.bits().to_le_bytes();
        [lo, hi, self.image.code()]
    }
}

/// Position, size and confidence shared by body, hand and face detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub x: i16,
    pub y: i16,
    pub size: i16,
    pub confidence: u16,
}

pub type BodyRecord = Detection;
pub type HandRecord = Detection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceOrientation {
    pub yaw: i16,
    pub pitch: i16,
    pub roll: i16,
    pub confidence: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    pub age: i8,
    pub confidence: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenderKind {
    Female,
    Male,
    /// Any other wire code, kept verbatim.
    Unknown(i8),
}

impl GenderKind {
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => GenderKind::Female,
            1 => GenderKind::Male,
            other => GenderKind::Unknown(other),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            GenderKind::Female => 0,
            GenderKind::Male => 1,
            GenderKind::Unknown(c) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gender {
    pub value: GenderKind,
    pub confidence: u16,
}

/// Gaze direction in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gaze {
    pub left_right: i8,
    pub up_down: i8,
}

/// Eye closure degree per eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyesClosed {
    pub left: i16,
    pub right: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Expressionless,
    Joy,
    Surprise,
    Anger,
    Sadness,
    Unknown(i8),
}

impl ExpressionKind {
    pub fn from_code(code: i8) -> Self {
        match code {
            1 => ExpressionKind::Expressionless,
            2 => ExpressionKind::Joy,
            3 => ExpressionKind::Surprise,
            4 => ExpressionKind::Anger,
            5 => ExpressionKind::Sadness,
            other => ExpressionKind::Unknown(other),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            ExpressionKind::Expressionless => 1,
            ExpressionKind::Joy => 2,
            ExpressionKind::Surprise => 3,
            ExpressionKind::Anger => 4,
            ExpressionKind::Sadness => 5,
            ExpressionKind::Unknown(c) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub top_score: i8,
    /// Negative/positive degree of the expression, -100..100.
    pub neg_pos_degree: i8,
}

/// One detected face. Each optional field is present iff its flag was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRecord {
    pub detection: Detection,
    pub orientation: Option<FaceOrientation>,
    pub age: Option<Age>,
    pub gender: Option<Gender>,
    pub gaze: Option<Gaze>,
    pub eyes_closed: Option<EyesClosed>,
    pub expression: Option<Expression>,
}

/// Grayscale image plane returned after the detection records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u16,
    pub height: u16,
    /// Row-major, one byte per pixel, `width * height` long.
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetectionResult {
    pub body: Vec<BodyRecord>,
    pub hand: Vec<HandRecord>,
    pub face: Vec<FaceRecord>,
    pub image: Option<Image>,
}

/// Model and firmware version reported by the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    /// Model string with trailing padding removed, e.g. "HVC-P".
    pub model: String,
    pub major: u8,
    pub minor: u8,
    pub release: u8,
    pub revision: [u8; 4],
}

impl Version {
    pub fn revision_hex(&self) -> String {
        hex::encode(self.revision)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}.{} (rev {})",
            self.model,
            self.major,
            self.minor,
            self.release,
            self.revision_hex()
        )
    }
}

/// Camera mounting orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Deg0 = 0,
    Deg90 = 1,
    Deg180 = 2,
    Deg270 = 3,
}

impl Orientation {
    pub fn from_degrees(angle: u16) -> Result<Self> {
        match angle {
            0 => Ok(Orientation::Deg0),
            90 => Ok(Orientation::Deg90),
            180 => Ok(Orientation::Deg180),
            270 => Ok(Orientation::Deg270),
            other => Err(HvcError::InvalidParameter(format!(
                "orientation must be 0, 90, 180 or 270 degrees, got {}",
                other
            ))),
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(Orientation::Deg0),
            0x01 => Ok(Orientation::Deg90),
            0x02 => Ok(Orientation::Deg180),
            0x03 => Ok(Orientation::Deg270),
            other => Err(HvcError::UnknownOrientationValue(other)),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn degrees(self) -> u16 {
        self.code() as u16 * 90
    }
}

/// Detection confidence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub body: u16,
    pub hand: u16,
    pub face: u16,
    pub reserved: u16,
}

/// Minimum and maximum detectable sizes, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionSize {
    pub body_min: u16,
    pub body_max: u16,
    pub hand_min: u16,
    pub hand_max: u16,
    pub face_min: u16,
    pub face_max: u16,
}

/// Yaw range of faces to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceDirection {
    /// ±30°
    Front = 0,
    /// ±60°
    Diagonal = 1,
    /// ±90°
    Profile = 2,
}

impl FaceDirection {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FaceDirection::Front),
            1 => Ok(FaceDirection::Diagonal),
            2 => Ok(FaceDirection::Profile),
            value => Err(HvcError::UnknownFaceAngleValue {
                field: "direction",
                value,
            }),
        }
    }
}

impl FromStr for FaceDirection {
    type Err = HvcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "front" => Ok(FaceDirection::Front),
            "diagonal" => Ok(FaceDirection::Diagonal),
            "profile" => Ok(FaceDirection::Profile),
            other => Err(HvcError::InvalidParameter(format!(
                "face direction must be front, diagonal or profile, got {:?}",
                other
            ))),
        }
    }
}

/// Roll range of faces to detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceInclination {
    /// ±15°
    Deg15 = 0,
    /// ±45°
    Deg45 = 1,
}

impl FaceInclination {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(FaceInclination::Deg15),
            1 => Ok(FaceInclination::Deg45),
            value => Err(HvcError::UnknownFaceAngleValue {
                field: "inclination",
                value,
            }),
        }
    }
}

impl FromStr for FaceInclination {
    type Err = HvcError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "15" => Ok(FaceInclination::Deg15),
            "45" => Ok(FaceInclination::Deg45),
            other => Err(HvcError::InvalidParameter(format!(
                "face inclination must be \"15\" or \"45\", got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceAngle {
    pub direction: FaceDirection,
    pub inclination: FaceInclination,
}
