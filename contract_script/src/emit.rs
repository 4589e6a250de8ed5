// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instruction emitter.
//!
//! [`CodeBuffer`] is an append-only byte stream with one escape hatch: an
//! operand range can be reserved at emission time and overwritten later with
//! exactly the reserved number of bytes. This is how branch displacements get
//! patched without ever shifting the stream.

use alloc::vec::Vec;
use core::fmt;

use crate::opcode::Opcode;

/// An emitter error. Every variant is an internal invariant violation and
/// aborts compilation of the enclosing contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmitError {
    /// An overwrite supplied a byte count different from the reserved width.
    PlaceholderWidthMismatch {
        /// Reserved width in bytes.
        expected: u8,
        /// Bytes supplied to the overwrite.
        got: usize,
    },
    /// A placeholder referenced bytes outside the buffer.
    PlaceholderOutOfBounds {
        /// Start address of the placeholder.
        at: u32,
    },
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceholderWidthMismatch { expected, got } => {
                write!(f, "placeholder overwrite: expected {expected} bytes, got {got}")
            }
            Self::PlaceholderOutOfBounds { at } => {
                write!(f, "placeholder at {at} is outside the buffer")
            }
        }
    }
}

impl core::error::Error for EmitError {}

/// A reserved operand range awaiting its final bytes.
///
/// Consumed by [`CodeBuffer::overwrite`]; the move makes a double overwrite a
/// compile error rather than a runtime one.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Placeholder {
    at: u32,
    width: u8,
}

impl Placeholder {
    /// Returns the start address of the reserved range.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.at
    }

    /// Returns the reserved width in bytes.
    #[must_use]
    pub fn width(&self) -> u8 {
        self.width
    }
}

/// Append-only instruction buffer.
#[derive(Clone, Debug, Default)]
pub struct CodeBuffer {
    bytes: Vec<u8>,
}

impl CodeBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current write address without emitting.
    #[must_use]
    pub fn mark(&self) -> u32 {
        u32::try_from(self.bytes.len()).unwrap_or(u32::MAX)
    }

    /// Returns the emitted bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer and returns the underlying bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Appends an operand-less instruction and returns its address.
    pub fn emit(&mut self, op: Opcode) -> u32 {
        let at = self.mark();
        self.bytes.push(op.byte());
        at
    }

    /// Appends an instruction with its operand bytes and returns the
    /// instruction address.
    ///
    /// Operand shape is the caller's contract with the [`Opcode`] catalog;
    /// the disassembler round-trip tests are the enforcement point.
    pub fn emit_with(&mut self, op: Opcode, operand: &[u8]) -> u32 {
        let at = self.emit(op);
        self.bytes.extend_from_slice(operand);
        at
    }

    /// Appends pre-encoded instruction bytes (spliced inline lowerings).
    pub fn emit_raw(&mut self, bytes: &[u8]) -> u32 {
        let at = self.mark();
        self.bytes.extend_from_slice(bytes);
        at
    }

    /// Reserves `width` zeroed operand bytes at the current address.
    pub fn reserve(&mut self, width: u8) -> Placeholder {
        let at = self.mark();
        self.bytes.resize(self.bytes.len() + usize::from(width), 0);
        Placeholder { at, width }
    }

    /// Overwrites a reserved range with exactly `width` bytes.
    pub fn overwrite(&mut self, ph: Placeholder, bytes: &[u8]) -> Result<(), EmitError> {
        if bytes.len() != usize::from(ph.width) {
            return Err(EmitError::PlaceholderWidthMismatch {
                expected: ph.width,
                got: bytes.len(),
            });
        }
        let start = ph.at as usize;
        let slot = self
            .bytes
            .get_mut(start..start + bytes.len())
            .ok_or(EmitError::PlaceholderOutOfBounds { at: ph.at })?;
        slot.copy_from_slice(bytes);
        Ok(())
    }

    /// Overwrites `len` bytes starting at `at` directly.
    ///
    /// Used by the final fixup sweep, which records raw operand addresses
    /// rather than holding placeholders across the whole emission pass.
    pub(crate) fn patch(&mut self, at: u32, bytes: &[u8]) -> Result<(), EmitError> {
        let start = at as usize;
        let slot = self
            .bytes
            .get_mut(start..start + bytes.len())
            .ok_or(EmitError::PlaceholderOutOfBounds { at })?;
        slot.copy_from_slice(bytes);
        Ok(())
    }

    /// Replaces `old_len` bytes at `at` with `replacement`, shifting the tail.
    ///
    /// Only the duplicate-preamble pass uses this, and only before final
    /// addresses are assigned; after the fixup sweep the stream is immutable.
    pub(crate) fn splice(&mut self, at: u32, old_len: u32, replacement: &[u8]) {
        let start = at as usize;
        let end = start + old_len as usize;
        self.bytes.splice(start..end, replacement.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeBuffer, EmitError};
    use crate::opcode::Opcode;

    #[test]
    fn emit_returns_instruction_addresses() {
        let mut buf = CodeBuffer::new();
        assert_eq!(buf.emit(Opcode::Nop), 0);
        assert_eq!(buf.emit_with(Opcode::PushInt8, &[7]), 1);
        assert_eq!(buf.emit(Opcode::Ret), 3);
        assert_eq!(buf.mark(), 4);
        assert_eq!(buf.as_slice(), &[0x21, 0x00, 0x07, 0x40]);
    }

    #[test]
    fn reserve_then_overwrite_patches_in_place() {
        let mut buf = CodeBuffer::new();
        buf.emit(Opcode::Jmp);
        let ph = buf.reserve(1);
        buf.emit(Opcode::Ret);
        assert_eq!(buf.as_slice(), &[0x22, 0x00, 0x40]);

        buf.overwrite(ph, &[0xFE]).unwrap();
        assert_eq!(buf.as_slice(), &[0x22, 0xFE, 0x40]);
    }

    #[test]
    fn overwrite_rejects_width_mismatch() {
        let mut buf = CodeBuffer::new();
        buf.emit(Opcode::JmpL);
        let ph = buf.reserve(4);
        let err = buf.overwrite(ph, &[0x01, 0x02]).unwrap_err();
        assert_eq!(
            err,
            EmitError::PlaceholderWidthMismatch {
                expected: 4,
                got: 2
            }
        );
    }

    #[test]
    fn splice_shifts_the_tail() {
        let mut buf = CodeBuffer::new();
        buf.emit_with(Opcode::PushData1, &[0x02, 0xAA, 0xBB]);
        buf.emit(Opcode::Ret);
        buf.splice(0, 4, &[Opcode::LdSFld0.byte()]);
        assert_eq!(buf.as_slice(), &[0x58, 0x40]);
    }
}
