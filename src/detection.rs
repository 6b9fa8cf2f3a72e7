//! Detection result decoding.
//!
//! The detection payload has no tags. Its layout follows entirely from the
//! [`FeatureMask`] of the request:
//!
//! ```text
//! [body_count:u8][hand_count:u8][face_count:u8][reserved:u8]
//! body_count x [x:i16][y:i16][size:i16][conf:u16]
//! hand_count x [x:i16][y:i16][size:i16][conf:u16]
//! face_count x
//!     [x:i16][y:i16][size:i16][conf:u16]            always
//!     [yaw:i16][pitch:i16][roll:i16][conf:u16]      FACE_ORIENTATION
//!     [age:i8][conf:u16]                            AGE
//!     [gender:i8][conf:u16]                         GENDER
//!     [left_right:i8][up_down:i8]                   GAZE
//!     [left:i16][right:i16]                         EYES_CLOSED
//!     [kind:i8][top_score:i8][neg_pos:i8]           FACIAL_EXPRESSION
//! [width:u16][height:u16][width*height pixels]      image mode != None
//! ```
//!
//! All multi-byte fields are little-endian.

use crate::events::{ProtocolEvent, ProtocolObserver};
use crate::field::{self, PayloadCursor};
use crate::types::{
    Age, Detection, DetectionFlags, DetectionResult, EyesClosed, Expression, ExpressionKind,
    FaceOrientation, FaceRecord, FeatureMask, Gaze, Gender, GenderKind, Image,
};
use crate::{HvcError, Result};

pub const COUNTS_SIZE: usize = 4;
pub const DETECTION_RECORD_SIZE: usize = 8;
pub const ORIENTATION_SEGMENT_SIZE: usize = 8;
pub const AGE_SEGMENT_SIZE: usize = 3;
pub const GENDER_SEGMENT_SIZE: usize = 3;
pub const GAZE_SEGMENT_SIZE: usize = 2;
pub const EYES_CLOSED_SEGMENT_SIZE: usize = 4;
pub const EXPRESSION_SEGMENT_SIZE: usize = 3;
pub const IMAGE_HEADER_SIZE: usize = 4;

/// Bytes occupied by one face record under `mask`.
pub fn face_record_size(mask: &FeatureMask) -> usize {
    let f = mask.flags;
    let mut size = DETECTION_RECORD_SIZE;
    if f.contains(DetectionFlags::FACE_ORIENTATION) {
        size += ORIENTATION_SEGMENT_SIZE;
    }
    if f.contains(DetectionFlags::AGE) {
        size += AGE_SEGMENT_SIZE;
    }
    if f.contains(DetectionFlags::GENDER) {
        size += GENDER_SEGMENT_SIZE;
    }
    if f.contains(DetectionFlags::GAZE) {
        size += GAZE_SEGMENT_SIZE;
    }
    if f.contains(DetectionFlags::EYES_CLOSED) {
        size += EYES_CLOSED_SEGMENT_SIZE;
    }
    if f.contains(DetectionFlags::FACIAL_EXPRESSION) {
        size += EXPRESSION_SEGMENT_SIZE;
    }
    size
}

/// A detection response payload together with the mask that requested it.
///
/// Produced by the session at the moment the response is read, so the pair
/// cannot drift apart on its way to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionPayload {
    mask: FeatureMask,
    bytes: Vec<u8>,
}

impl DetectionPayload {
    pub(crate) fn new(mask: FeatureMask, bytes: Vec<u8>) -> Self {
        Self { mask, bytes }
    }

    pub fn mask(&self) -> FeatureMask {
        self.mask
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn decode(&self) -> Result<DetectionResult> {
        decode_detection(&self.bytes, &self.mask)
    }

    pub(crate) fn decode_observed(
        &self,
        observer: &dyn ProtocolObserver,
    ) -> Result<DetectionResult> {
        let result = self.decode()?;
        if let (Some(expected), Some(image)) = (self.mask.image.resolution(), &result.image) {
            let actual = (image.width, image.height);
            if actual != expected {
                observer.on_event(&ProtocolEvent::ImageResolutionMismatch { expected, actual });
            }
        }
        Ok(result)
    }
}

fn read_detection(cur: &mut PayloadCursor<'_>, segment: &'static str) -> Result<Detection> {
    cur.require(segment, DETECTION_RECORD_SIZE)?;
    Ok(Detection {
        x: cur.i16le(segment)?,
        y: cur.i16le(segment)?,
        size: cur.i16le(segment)?,
        confidence: cur.u16le(segment)?,
    })
}

fn read_face(cur: &mut PayloadCursor<'_>, flags: DetectionFlags) -> Result<FaceRecord> {
    let detection = read_detection(cur, "face")?;

    let orientation = if flags.contains(DetectionFlags::FACE_ORIENTATION) {
        cur.require("face orientation", ORIENTATION_SEGMENT_SIZE)?;
        Some(FaceOrientation {
            yaw: cur.i16le("face orientation")?,
            pitch: cur.i16le("face orientation")?,
            roll: cur.i16le("face orientation")?,
            confidence: cur.u16le("face orientation")?,
        })
    } else {
        None
    };

    let age = if flags.contains(DetectionFlags::AGE) {
        cur.require("age", AGE_SEGMENT_SIZE)?;
        Some(Age {
            age: cur.i8("age")?,
            confidence: cur.u16le("age")?,
        })
    } else {
        None
    };

    let gender = if flags.contains(DetectionFlags::GENDER) {
        cur.require("gender", GENDER_SEGMENT_SIZE)?;
        Some(Gender {
            value: GenderKind::from_code(cur.i8("gender")?),
            confidence: cur.u16le("gender")?,
        })
    } else {
        None
    };

    let gaze = if flags.contains(DetectionFlags::GAZE) {
        cur.require("gaze", GAZE_SEGMENT_SIZE)?;
        Some(Gaze {
            left_right: cur.i8("gaze")?,
            up_down: cur.i8("gaze")?,
        })
    } else {
        None
    };

    let eyes_closed = if flags.contains(DetectionFlags::EYES_CLOSED) {
        cur.require("eyes closed", EYES_CLOSED_SEGMENT_SIZE)?;
        Some(EyesClosed {
            left: cur.i16le("eyes closed")?,
            right: cur.i16le("eyes closed")?,
        })
    } else {
        None
    };

    let expression = if flags.contains(DetectionFlags::FACIAL_EXPRESSION) {
        cur.require("facial expression", EXPRESSION_SEGMENT_SIZE)?;
        Some(Expression {
            kind: ExpressionKind::from_code(cur.i8("facial expression")?),
            top_score: cur.i8("facial expression")?,
            neg_pos_degree: cur.i8("facial expression")?,
        })
    } else {
        None
    };

    Ok(FaceRecord {
        detection,
        orientation,
        age,
        gender,
        gaze,
        eyes_closed,
        expression,
    })
}

/// Decode a detection payload produced for `mask`.
///
/// Fails with [`crate::HvcError::MalformedPayload`] as soon as a segment does
/// not fit in what remains, or if bytes are left over after the last segment.
/// No partial result is returned.
pub fn decode_detection(payload: &[u8], mask: &FeatureMask) -> Result<DetectionResult> {
    decode_from(&mut PayloadCursor::new(payload), mask)
}

/// Decode through a caller-owned cursor; on failure `cur.position()` is the
/// end of the last byte handed to the decoder.
pub(crate) fn decode_from(
    cur: &mut PayloadCursor<'_>,
    mask: &FeatureMask,
) -> Result<DetectionResult> {
    cur.require("counts", COUNTS_SIZE)?;
    let body_count = cur.u8("counts")? as usize;
    let hand_count = cur.u8("counts")? as usize;
    let face_count = cur.u8("counts")? as usize;
    let _reserved = cur.u8("counts")?;

    // Reject impossible counts before allocating anything.
    let records_len = (body_count + hand_count) * DETECTION_RECORD_SIZE
        + face_count * face_record_size(mask);
    cur.require("records", records_len)?;

    let body = (0..body_count)
        .map(|_| read_detection(cur, "body"))
        .collect::<Result<Vec<_>>>()?;
    let hand = (0..hand_count)
        .map(|_| read_detection(cur, "hand"))
        .collect::<Result<Vec<_>>>()?;
    let face = (0..face_count)
        .map(|_| read_face(cur, mask.flags))
        .collect::<Result<Vec<_>>>()?;

    let image = if mask.image.resolution().is_some() {
        cur.require("image header", IMAGE_HEADER_SIZE)?;
        let width = cur.u16le("image header")?;
        let height = cur.u16le("image header")?;
        let pixels = cur
            .take("image pixels", width as usize * height as usize)?
            .to_vec();
        // Dimensions from the header win; a mismatch with the mode is
        // reported by `DetectionPayload::decode_observed`.
        Some(Image {
            width,
            height,
            pixels,
        })
    } else {
        None
    };

    cur.finish("trailing bytes")?;

    Ok(DetectionResult {
        body,
        hand,
        face,
        image,
    })
}

fn write_detection(out: &mut Vec<u8>, d: &Detection) {
    out.extend_from_slice(&field::write_i16le(d.x));
    out.extend_from_slice(&field::write_i16le(d.y));
    out.extend_from_slice(&field::write_i16le(d.size));
    out.extend_from_slice(&field::write_u16le(d.confidence));
}

fn count_byte(records: usize, kind: &str) -> Result<u8> {
    u8::try_from(records).map_err(|_| {
        HvcError::InvalidParameter(format!(
            "{} {} records do not fit the one-byte count",
            records, kind
        ))
    })
}

/// Build the payload the device would send for `result` under `mask`.
///
/// Sub-records are written iff their flag is set in `mask`; a flagged
/// sub-record missing from a face is written as zeros. Useful for device
/// emulation.
///
/// Fails with [`HvcError::InvalidParameter`] if a record list is longer than
/// 255 entries or the image pixel buffer is not `width * height` bytes.
pub fn encode_detection(result: &DetectionResult, mask: &FeatureMask) -> Result<Vec<u8>> {
    let body_count = count_byte(result.body.len(), "body")?;
    let hand_count = count_byte(result.hand.len(), "hand")?;
    let face_count = count_byte(result.face.len(), "face")?;
    if let Some(image) = &result.image {
        let expected = image.width as usize * image.height as usize;
        if image.pixels.len() != expected {
            return Err(HvcError::InvalidParameter(format!(
                "{}x{} image needs {} pixels, got {}",
                image.width,
                image.height,
                expected,
                image.pixels.len()
            )));
        }
    }

    let f = mask.flags;
    let mut out = Vec::with_capacity(
        COUNTS_SIZE
            + (result.body.len() + result.hand.len()) * DETECTION_RECORD_SIZE
            + result.face.len() * face_record_size(mask),
    );
    out.extend_from_slice(&[body_count, hand_count, face_count, 0]);

    for d in result.body.iter().chain(result.hand.iter()) {
        write_detection(&mut out, d);
    }

    for face in &result.face {
        write_detection(&mut out, &face.detection);
        if f.contains(DetectionFlags::FACE_ORIENTATION) {
            let o = face.orientation.unwrap_or(FaceOrientation {
                yaw: 0,
                pitch: 0,
                roll: 0,
                confidence: 0,
            });
            out.extend_from_slice(&field::write_i16le(o.yaw));
            out.extend_from_slice(&field::write_i16le(o.pitch));
            out.extend_from_slice(&field::write_i16le(o.roll));
            out.extend_from_slice(&field::write_u16le(o.confidence));
        }
        if f.contains(DetectionFlags::AGE) {
            let (age, conf) = face.age.map_or((0, 0), |a| (a.age, a.confidence));
            out.push(age as u8);
            out.extend_from_slice(&field::write_u16le(conf));
        }
        if f.contains(DetectionFlags::GENDER) {
            let (code, conf) = face
                .gender
                .map_or((0, 0), |g| (g.value.code(), g.confidence));
            out.push(code as u8);
            out.extend_from_slice(&field::write_u16le(conf));
        }
        if f.contains(DetectionFlags::GAZE) {
            let (lr, ud) = face.gaze.map_or((0, 0), |g| (g.left_right, g.up_down));
            out.push(lr as u8);
            out.push(ud as u8);
        }
        if f.contains(DetectionFlags::EYES_CLOSED) {
            let (l, r) = face.eyes_closed.map_or((0, 0), |e| (e.left, e.right));
            out.extend_from_slice(&field::write_i16le(l));
            out.extend_from_slice(&field::write_i16le(r));
        }
        if f.contains(DetectionFlags::FACIAL_EXPRESSION) {
            let (kind, top, np) = face
                .expression
                .map_or((0, 0, 0), |e| (e.kind.code(), e.top_score, e.neg_pos_degree));
            out.push(kind as u8);
            out.push(top as u8);
            out.push(np as u8);
        }
    }

    if mask.image.resolution().is_some() {
        if let Some(image) = &result.image {
            out.extend_from_slice(&field::write_u16le(image.width));
            out.extend_from_slice(&field::write_u16le(image.height));
            out.extend_from_slice(&image.pixels);
        } else {
            out.extend_from_slice(&[0, 0, 0, 0]);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMode;
    use proptest::prelude::*;

    fn record(x: i16, y: i16, size: i16, confidence: u16) -> Vec<u8> {
        let mut out = Vec::new();
        write_detection(
            &mut out,
            &Detection {
                x,
                y,
                size,
                confidence,
            },
        );
        out
    }

    #[test]
    fn test_body_and_base_face() {
        let mut payload = vec![1, 0, 1, 0];
        payload.extend(record(100, 120, 80, 700));
        payload.extend(record(160, 90, 40, 512));

        let mask = FeatureMask::new(DetectionFlags::FACE, ImageMode::None);
        let result = decode_detection(&payload, &mask).unwrap();

        assert_eq!(result.body.len(), 1);
        assert_eq!(result.hand.len(), 0);
        assert_eq!(result.face.len(), 1);
        assert_eq!(result.body[0].x, 100);
        assert_eq!(result.body[0].confidence, 700);

        let face = &result.face[0];
        assert_eq!(face.detection.size, 40);
        assert!(face.orientation.is_none());
        assert!(face.age.is_none());
        assert!(face.gender.is_none());
        assert!(face.gaze.is_none());
        assert!(face.eyes_closed.is_none());
        assert!(face.expression.is_none());
        assert!(result.image.is_none());
    }

    #[test]
    fn test_all_face_segments_in_order() {
        let mut payload = vec![0, 0, 1, 0];
        payload.extend(record(-5, 10, 64, 900));
        // orientation
        payload.extend_from_slice(&[0xF6, 0xFF, 0x05, 0x00, 0x00, 0x00, 0xE8, 0x03]);
        // age
        payload.extend_from_slice(&[34, 0x2C, 0x01]);
        // gender
        payload.extend_from_slice(&[1, 0xE8, 0x03]);
        // gaze
        payload.extend_from_slice(&[0xFB, 3]);
        // eyes closed
        payload.extend_from_slice(&[0x64, 0x00, 0x20, 0x03]);
        // expression
        payload.extend_from_slice(&[2, 87, 0xEC]);

        let mask = FeatureMask::new(DetectionFlags::all(), ImageMode::None);
        let result = decode_detection(&payload, &mask).unwrap();
        let face = &result.face[0];
        assert_eq!(face.detection.x, -5);
        let o = face.orientation.unwrap();
        assert_eq!((o.yaw, o.pitch, o.roll, o.confidence), (-10, 5, 0, 1000));
        assert_eq!(face.age.unwrap().age, 34);
        assert_eq!(face.age.unwrap().confidence, 300);
        assert_eq!(face.gender.unwrap().value, GenderKind::Male);
        assert_eq!(face.gaze.unwrap().left_right, -5);
        assert_eq!(face.gaze.unwrap().up_down, 3);
        assert_eq!(face.eyes_closed.unwrap().left, 100);
        assert_eq!(face.eyes_closed.unwrap().right, 800);
        let e = face.expression.unwrap();
        assert_eq!(e.kind, ExpressionKind::Joy);
        assert_eq!(e.top_score, 87);
        assert_eq!(e.neg_pos_degree, -20);
    }

    #[test]
    fn test_mask_changes_layout() {
        // Same bytes read with and without the gaze flag decode differently.
        let mut payload = vec![0, 0, 1, 0];
        payload.extend(record(1, 2, 3, 4));
        payload.extend_from_slice(&[7, 8]);

        let with_gaze = FeatureMask::new(DetectionFlags::FACE | DetectionFlags::GAZE, ImageMode::None);
        let face = decode_detection(&payload, &with_gaze).unwrap().face[0];
        assert_eq!(face.gaze, Some(Gaze { left_right: 7, up_down: 8 }));

        let without = FeatureMask::new(DetectionFlags::FACE, ImageMode::None);
        assert!(matches!(
            decode_detection(&payload, &without),
            Err(HvcError::MalformedPayload { segment: "trailing bytes", remaining: 2, .. })
        ));
    }

    /// Decode `backing[..declared_len]` and return the error plus how far the
    /// cursor got. Bytes past `declared_len` are sentinels.
    fn decode_truncated(
        backing: &[u8],
        declared_len: usize,
        mask: &FeatureMask,
    ) -> (HvcError, usize) {
        let mut cur = PayloadCursor::new(&backing[..declared_len]);
        let err = decode_from(&mut cur, mask).unwrap_err();
        (err, cur.position())
    }

    #[test]
    fn test_short_payload_never_reads_past_end() {
        let mut backing = vec![2, 0, 0, 0];
        backing.extend(record(1, 1, 1, 1));
        let declared_len = backing.len();
        backing.extend(record(9, 9, 9, 9));

        let (err, touched) = decode_truncated(&backing, declared_len, &FeatureMask::default());
        match err {
            HvcError::MalformedPayload {
                segment,
                offset,
                needed,
                remaining,
            } => {
                assert_eq!(segment, "records");
                assert_eq!((offset, needed, remaining), (4, 16, 8));
            }
            other => panic!("unexpected: {:?}", other),
        }
        // Only the counts were consumed; no record byte was read.
        assert_eq!(touched, COUNTS_SIZE);
        assert!(touched < declared_len);
    }

    #[test]
    fn test_truncated_image_never_reads_past_end() {
        let mut backing = vec![0, 0, 0, 0, 0xA0, 0x00, 0x78, 0x00];
        backing.extend(std::iter::repeat(0x11).take(100));
        let declared_len = backing.len();
        backing.extend(std::iter::repeat(0xEE).take(160 * 120));

        let mask = FeatureMask::new(DetectionFlags::empty(), ImageMode::Small);
        let (err, touched) = decode_truncated(&backing, declared_len, &mask);
        assert!(matches!(
            err,
            HvcError::MalformedPayload { segment: "image pixels", needed: 19200, remaining: 100, .. }
        ));
        assert_eq!(touched, COUNTS_SIZE + IMAGE_HEADER_SIZE);
        assert!(touched < declared_len);
    }

    #[test]
    fn test_encode_rejects_oversized_counts() {
        let result = DetectionResult {
            body: vec![
                Detection {
                    x: 0,
                    y: 0,
                    size: 0,
                    confidence: 0
                };
                256
            ],
            ..DetectionResult::default()
        };
        assert!(matches!(
            encode_detection(&result, &FeatureMask::default()),
            Err(HvcError::InvalidParameter(_))
        ));

        let mut fits = result.clone();
        fits.body.truncate(255);
        let payload = encode_detection(&fits, &FeatureMask::default()).unwrap();
        assert_eq!(payload[0], 255);
        assert_eq!(
            decode_detection(&payload, &FeatureMask::default()).unwrap(),
            fits
        );
    }

    #[test]
    fn test_encode_rejects_inconsistent_image() {
        let result = DetectionResult {
            image: Some(Image {
                width: 4,
                height: 2,
                pixels: vec![0; 7],
            }),
            ..DetectionResult::default()
        };
        let mask = FeatureMask::new(DetectionFlags::empty(), ImageMode::Small);
        assert!(matches!(
            encode_detection(&result, &mask),
            Err(HvcError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_truncated_segment() {
        let mut payload = vec![0, 0, 1, 0];
        payload.extend(record(1, 2, 3, 4));
        payload.extend_from_slice(&[30, 0x10]);
        let mask = FeatureMask::new(DetectionFlags::FACE | DetectionFlags::AGE, ImageMode::None);
        assert!(matches!(
            decode_detection(&payload, &mask),
            Err(HvcError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_empty_and_counts_only() {
        assert!(matches!(
            decode_detection(&[0, 0], &FeatureMask::default()),
            Err(HvcError::MalformedPayload { segment: "counts", .. })
        ));
        let result = decode_detection(&[0, 0, 0, 0], &FeatureMask::default()).unwrap();
        assert_eq!(result, DetectionResult::default());
    }

    #[test]
    fn test_small_image() {
        let mut payload = vec![0, 0, 0, 0];
        payload.extend_from_slice(&[0xA0, 0x00, 0x78, 0x00]);
        payload.extend(std::iter::repeat(0x80).take(160 * 120));
        let mask = FeatureMask::new(DetectionFlags::empty(), ImageMode::Small);
        let image = decode_detection(&payload, &mask).unwrap().image.unwrap();
        assert_eq!((image.width, image.height), (160, 120));
        assert_eq!(image.pixels.len(), 19200);
    }

    #[test]
    fn test_image_dimensions_trusted_over_mode() {
        let mut payload = vec![0, 0, 0, 0];
        payload.extend_from_slice(&[0x02, 0x00, 0x02, 0x00, 1, 2, 3, 4]);
        let mask = FeatureMask::new(DetectionFlags::empty(), ImageMode::Large);
        let image = decode_detection(&payload, &mask).unwrap().image.unwrap();
        assert_eq!(image.pixels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_truncated_image() {
        let mut payload = vec![0, 0, 0, 0];
        payload.extend_from_slice(&[0x40, 0x01, 0xF0, 0x00]);
        payload.extend(std::iter::repeat(0).take(1000));
        let mask = FeatureMask::new(DetectionFlags::empty(), ImageMode::Large);
        assert!(matches!(
            decode_detection(&payload, &mask),
            Err(HvcError::MalformedPayload { segment: "image pixels", needed: 76800, .. })
        ));
    }

    fn arb_detection() -> impl Strategy<Value = Detection> {
        (any::<i16>(), any::<i16>(), any::<i16>(), any::<u16>()).prop_map(
            |(x, y, size, confidence)| Detection {
                x,
                y,
                size,
                confidence,
            },
        )
    }

    fn arb_face(flags: DetectionFlags) -> impl Strategy<Value = FaceRecord> {
        (
            arb_detection(),
            (any::<i16>(), any::<i16>(), any::<i16>(), any::<u16>()),
            (any::<i8>(), any::<u16>()),
            (any::<i8>(), any::<u16>()),
            (any::<i8>(), any::<i8>()),
            (any::<i16>(), any::<i16>()),
            (any::<i8>(), any::<i8>(), any::<i8>()),
        )
            .prop_map(move |(detection, o, a, g, gz, ec, ex)| FaceRecord {
                detection,
                orientation: flags
                    .contains(DetectionFlags::FACE_ORIENTATION)
                    .then_some(FaceOrientation {
                        yaw: o.0,
                        pitch: o.1,
                        roll: o.2,
                        confidence: o.3,
                    }),
                age: flags.contains(DetectionFlags::AGE).then_some(Age {
                    age: a.0,
                    confidence: a.1,
                }),
                gender: flags.contains(DetectionFlags::GENDER).then_some(Gender {
                    value: GenderKind::from_code(g.0),
                    confidence: g.1,
                }),
                gaze: flags.contains(DetectionFlags::GAZE).then_some(Gaze {
                    left_right: gz.0,
                    up_down: gz.1,
                }),
                eyes_closed: flags
                    .contains(DetectionFlags::EYES_CLOSED)
                    .then_some(EyesClosed {
                        left: ec.0,
                        right: ec.1,
                    }),
                expression: flags
                    .contains(DetectionFlags::FACIAL_EXPRESSION)
                    .then_some(Expression {
                        kind: ExpressionKind::from_code(ex.0),
                        top_score: ex.1,
                        neg_pos_degree: ex.2,
                    }),
            })
    }

    fn arb_mask() -> impl Strategy<Value = FeatureMask> {
        (
            0u16..=DetectionFlags::all().bits(),
            prop_oneof![
                Just(ImageMode::None),
                Just(ImageMode::Large),
                Just(ImageMode::Small)
            ],
        )
            .prop_map(|(bits, image)| FeatureMask::new(DetectionFlags::from_bits_truncate(bits), image))
    }

    fn arb_result(mask: FeatureMask) -> impl Strategy<Value = DetectionResult> {
        let image = match mask.image.resolution() {
            Some((w, h)) => Just(Some(Image {
                width: w,
                height: h,
                pixels: (0..w as usize * h as usize).map(|i| i as u8).collect(),
            }))
            .boxed(),
            None => Just(None).boxed(),
        };
        (
            proptest::collection::vec(arb_detection(), 0..4),
            proptest::collection::vec(arb_detection(), 0..4),
            proptest::collection::vec(arb_face(mask.flags), 0..4),
            image,
        )
            .prop_map(|(body, hand, face, image)| DetectionResult {
                body,
                hand,
                face,
                image,
            })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            (mask, result) in arb_mask().prop_flat_map(|m| (Just(m), arb_result(m)))
        ) {
            let payload = encode_detection(&result, &mask).unwrap();
            prop_assert_eq!(
                payload.len(),
                COUNTS_SIZE
                    + (result.body.len() + result.hand.len()) * DETECTION_RECORD_SIZE
                    + result.face.len() * face_record_size(&mask)
                    + result.image.as_ref().map_or(0, |i| IMAGE_HEADER_SIZE + i.pixels.len())
            );
            let decoded = decode_detection(&payload, &mask).unwrap();
            prop_assert_eq!(decoded, result);
        }

        #[test]
        fn prop_truncation_is_malformed(
            (mask, result) in arb_mask().prop_flat_map(|m| (Just(m), arb_result(m))),
            cut in 1usize..64
        ) {
            let payload = encode_detection(&result, &mask).unwrap();
            let cut = cut.min(payload.len());
            let short = &payload[..payload.len() - cut];
            let is_malformed = matches!(
                decode_detection(short, &mask),
                Err(HvcError::MalformedPayload { .. })
            );
            prop_assert!(is_malformed);
        }
    }
}
