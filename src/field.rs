//! Fixed-width integer primitives and a bounds-checked payload cursor.
//!
//! Every `read_*` requires a slice of exactly the field's width. There is no
//! partial read: a wrong-sized slice is an [`HvcError::ArityMismatch`].

use crate::{HvcError, Result};

fn exact<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| HvcError::ArityMismatch {
        expected: N,
        actual: bytes.len(),
    })
}

pub fn read_u8(bytes: &[u8]) -> Result<u8> {
    Ok(exact::<1>(bytes)?[0])
}

pub fn read_i8(bytes: &[u8]) -> Result<i8> {
    Ok(exact::<1>(bytes)?[0] as i8)
}

/// Little-endian u16: `low + high * 256`.
pub fn read_u16le(bytes: &[u8]) -> Result<u16> {
    Ok(u16::from_le_bytes(exact(bytes)?))
}

pub fn read_i16le(bytes: &[u8]) -> Result<i16> {
    Ok(i16::from_le_bytes(exact(bytes)?))
}

pub fn read_u32le(bytes: &[u8]) -> Result<u32> {
    Ok(u32::from_le_bytes(exact(bytes)?))
}

pub fn write_u8(value: u8) -> [u8; 1] {
    [value]
}

pub fn write_u16le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn write_i16le(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

pub fn write_u32le(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Forward-only reader over a response payload.
///
/// Each `take` checks the remaining length first and fails with
/// [`HvcError::MalformedPayload`] instead of reading past the end.
#[derive(Debug)]
pub struct PayloadCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// End of the furthest byte handed out so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Verify that `needed` bytes are available for `segment` without consuming them.
    pub fn require(&self, segment: &'static str, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(HvcError::MalformedPayload {
                segment,
                offset: self.pos,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn take(&mut self, segment: &'static str, len: usize) -> Result<&'a [u8]> {
        self.require(segment, len)?;
        let data: &'a [u8] = self.data;
        let out = &data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn u8(&mut self, segment: &'static str) -> Result<u8> {
        read_u8(self.take(segment, 1)?)
    }

    pub fn i8(&mut self, segment: &'static str) -> Result<i8> {
        read_i8(self.take(segment, 1)?)
    }

    pub fn u16le(&mut self, segment: &'static str) -> Result<u16> {
        read_u16le(self.take(segment, 2)?)
    }

    pub fn i16le(&mut self, segment: &'static str) -> Result<i16> {
        read_i16le(self.take(segment, 2)?)
    }

    /// Fail if any bytes remain unconsumed.
    pub fn finish(&self, segment: &'static str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(HvcError::MalformedPayload {
                segment,
                offset: self.pos,
                needed: 0,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}
