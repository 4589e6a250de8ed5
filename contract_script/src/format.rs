// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Encoding/decoding primitives for the distributable artifact format.
//!
//! All multi-byte integers are little-endian. Collection lengths use the
//! compact var-size prefix common to blockchain wire formats: values below
//! `0xFD` are a single byte, then `0xFD u16`, `0xFE u32`, `0xFF u64`.

use alloc::vec::Vec;
use core::fmt;

/// A decode error for artifact and script binaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended unexpectedly.
    UnexpectedEof,
    /// A var-size prefix was not minimally encoded or overflowed.
    InvalidVarSize,
    /// A length/offset was out of bounds.
    OutOfBounds,
    /// A UTF-8 string was invalid.
    InvalidUtf8,
    /// A magic header mismatch.
    BadMagic,
    /// The binary format version is not supported by this decoder.
    UnsupportedVersion {
        /// Major format version.
        major: u16,
        /// Minor format version.
        minor: u16,
    },
    /// The artifact checksum did not match its contents.
    ChecksumMismatch,
    /// Bytes remained after the last expected field.
    TrailingBytes,
    /// A byte that is not an opcode in instruction position.
    UnknownOpcode {
        /// The unrecognized byte.
        byte: u8,
    },
    /// A field held a value outside its domain.
    InvalidValue,
    /// A token-call instruction referenced a non-existent table entry.
    InvalidTokenReference {
        /// The out-of-range id.
        id: u16,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::InvalidVarSize => write!(f, "invalid var-size prefix"),
            Self::OutOfBounds => write!(f, "out of bounds"),
            Self::InvalidUtf8 => write!(f, "invalid UTF-8"),
            Self::BadMagic => write!(f, "bad magic header"),
            Self::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported version {major}.{minor}")
            }
            Self::ChecksumMismatch => write!(f, "artifact checksum mismatch"),
            Self::TrailingBytes => write!(f, "trailing bytes after artifact"),
            Self::UnknownOpcode { byte } => write!(f, "unknown opcode 0x{byte:02X}"),
            Self::InvalidValue => write!(f, "field value outside its domain"),
            Self::InvalidTokenReference { id } => {
                write!(f, "token {id} does not exist in the table")
            }
        }
    }
}

impl core::error::Error for DecodeError {}

/// A simple byte reader with bounds checks.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Returns the current cursor offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(DecodeError::OutOfBounds)?;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(DecodeError::UnexpectedEof)?;
        self.offset = end;
        Ok(slice)
    }

    /// Reads a `u8`.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> Result<u64, DecodeError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Reads a little-endian `i8`.
    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32_le()? as i32)
    }

    /// Reads a compact var-size prefix.
    ///
    /// The prefix must be minimally encoded (a `0xFD u16` holding a value
    /// below `0xFD` is rejected) so every length has exactly one encoding.
    pub fn read_var_size(&mut self) -> Result<u64, DecodeError> {
        let tag = self.read_u8()?;
        let v = match tag {
            0xFD => {
                let v = u64::from(self.read_u16_le()?);
                if v < 0xFD {
                    return Err(DecodeError::InvalidVarSize);
                }
                v
            }
            0xFE => {
                let v = u64::from(self.read_u32_le()?);
                if v <= u64::from(u16::MAX) {
                    return Err(DecodeError::InvalidVarSize);
                }
                v
            }
            0xFF => {
                let v = self.read_u64_le()?;
                if v <= u64::from(u32::MAX) {
                    return Err(DecodeError::InvalidVarSize);
                }
                v
            }
            b => u64::from(b),
        };
        Ok(v)
    }

    /// Reads a var-size prefix and validates it fits in `usize`.
    pub fn read_var_len(&mut self) -> Result<usize, DecodeError> {
        usize::try_from(self.read_var_size()?).map_err(|_| DecodeError::OutOfBounds)
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.take(len)
    }

    /// Reads a var-size length prefix followed by that many raw bytes.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_var_len()?;
        self.take(len)
    }

    /// Reads a var-size length prefix followed by a UTF-8 string.
    pub fn read_var_str(&mut self) -> Result<&'a str, DecodeError> {
        let b = self.read_var_bytes()?;
        core::str::from_utf8(b).map_err(|_| DecodeError::InvalidUtf8)
    }
}

/// A simple byte writer.
#[derive(Clone, Debug, Default)]
pub struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Returns a reference to the written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the writer and returns the underlying byte buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Appends a `u8`.
    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    /// Appends a little-endian `u16`.
    pub fn write_u16_le(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a little-endian `u32`.
    pub fn write_u32_le(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a little-endian `u64`.
    pub fn write_u64_le(&mut self, v: u64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a compact var-size prefix.
    pub fn write_var_size(&mut self, v: u64) {
        if v < 0xFD {
            self.write_u8(v as u8);
        } else if v <= u64::from(u16::MAX) {
            self.write_u8(0xFD);
            self.write_u16_le(v as u16);
        } else if v <= u64::from(u32::MAX) {
            self.write_u8(0xFE);
            self.write_u32_le(v as u32);
        } else {
            self.write_u8(0xFF);
            self.write_u64_le(v);
        }
    }

    /// Appends raw bytes.
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.bytes.extend_from_slice(b);
    }

    /// Appends a var-size length prefix followed by the raw bytes.
    pub fn write_var_bytes(&mut self, b: &[u8]) {
        self.write_var_size(b.len() as u64);
        self.write_bytes(b);
    }

    /// Appends a var-size length prefix followed by a UTF-8 string.
    pub fn write_var_str(&mut self, s: &str) {
        self.write_var_bytes(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, Reader, Writer};

    #[test]
    fn var_size_round_trips_at_boundaries() {
        for v in [0u64, 1, 0xFC, 0xFD, 0xFFFF, 0x1_0000, 0xFFFF_FFFF, 1 << 40] {
            let mut w = Writer::new();
            w.write_var_size(v);
            let bytes = w.into_vec();
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_var_size(), Ok(v));
            assert_eq!(r.remaining(), 0);
        }
    }

    #[test]
    fn var_size_rejects_non_minimal_encodings() {
        let mut r = Reader::new(&[0xFD, 0x01, 0x00]);
        assert_eq!(r.read_var_size(), Err(DecodeError::InvalidVarSize));

        let mut r = Reader::new(&[0xFE, 0xFF, 0xFF, 0x00, 0x00]);
        assert_eq!(r.read_var_size(), Err(DecodeError::InvalidVarSize));
    }

    #[test]
    fn reader_bounds_are_checked() {
        let mut r = Reader::new(&[0x01, 0x02]);
        assert_eq!(r.read_u8(), Ok(0x01));
        assert_eq!(r.read_u32_le(), Err(DecodeError::UnexpectedEof));
        // The failed read does not consume anything.
        assert_eq!(r.read_u8(), Ok(0x02));
    }

    #[test]
    fn var_str_validates_utf8() {
        let mut w = Writer::new();
        w.write_var_bytes(&[0xFF, 0xFE]);
        let bytes = w.into_vec();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_var_str(), Err(DecodeError::InvalidUtf8));
    }
}
