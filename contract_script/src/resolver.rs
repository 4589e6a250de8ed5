// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Address and jump resolution.
//!
//! This is a two-pass, assembler-style resolver: branches are emitted with
//! reserved operand bytes during the single linear emission pass, and one
//! final sweep patches every recorded fixup once all labels are bound. There
//! is no iterative width-relaxation pass; widths are decided eagerly from the
//! already-known distance for backward references and pessimistically for
//! forward references unless the caller proves the span short (see
//! [`BranchMode`]).

use alloc::vec::Vec;
use core::fmt;

use crate::emit::{CodeBuffer, EmitError};
use crate::opcode::{Opcode, OperandEncoding};

/// The displacement base used by the target VM.
///
/// Displacements are measured from the address of the branch opcode byte.
/// This is a fixed wire convention; it lives here and nowhere else.
pub const BRANCH_BASE: FixupBase = FixupBase::OpcodeStart;

/// Where a branch displacement is measured from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FixupBase {
    /// From the address of the branch opcode byte.
    OpcodeStart,
    /// From the first byte past the branch instruction's operand.
    OperandEnd,
}

/// A label for control-flow targets.
///
/// Minted before its target address is known; bound exactly once; referenced
/// any number of times before or after binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    /// Returns the label's numeric id (diagnostics only).
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Caller-selected branch width policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BranchMode {
    /// Backward references take the smaller width that fits; forward
    /// references take the pessimistic 4-byte form.
    #[default]
    Auto,
    /// Force the 1-byte form. The caller asserts the displacement fits; a
    /// violation is the fatal [`ResolveError::ShortBranchOutOfRange`], never
    /// a truncation.
    Short,
    /// Force the 4-byte form.
    Long,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FixupWidth {
    I8,
    I32,
}

impl FixupWidth {
    fn bytes(self) -> u8 {
        match self {
            Self::I8 => 1,
            Self::I32 => 4,
        }
    }
}

/// A recorded branch operand awaiting its target address.
#[derive(Clone, Debug)]
struct PendingFixup {
    /// Address of the branch opcode byte.
    instr_at: u32,
    /// Address of the displacement operand bytes.
    operand_at: u32,
    /// First byte past the whole instruction (operand-end base).
    instr_end: u32,
    width: FixupWidth,
    base: FixupBase,
    label: Label,
}

/// A resolver error. All variants are fatal internal errors: the front end
/// and code generator violated their contract, and no partial bytecode is
/// produced for the enclosing contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// A fixup's label was never bound.
    UnresolvedLabel {
        /// The unbound label id.
        label: u32,
    },
    /// A label was bound twice.
    LabelRebound {
        /// The rebound label id.
        label: u32,
    },
    /// A label id did not belong to this resolver.
    UnknownLabel {
        /// The foreign label id.
        label: u32,
    },
    /// An explicitly-short branch's displacement does not fit in one signed
    /// byte.
    ShortBranchOutOfRange {
        /// Address of the branch opcode.
        at: u32,
        /// The displacement that did not fit.
        displacement: i64,
    },
    /// The opcode passed to a branch helper has no displacement operand.
    NotABranch {
        /// The offending opcode byte.
        opcode: u8,
    },
    /// An underlying emitter failure.
    Emit(EmitError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedLabel { label } => {
                write!(f, "label {label} was referenced but never bound")
            }
            Self::LabelRebound { label } => write!(f, "label {label} bound twice"),
            Self::UnknownLabel { label } => write!(f, "label {label} is not from this resolver"),
            Self::ShortBranchOutOfRange { at, displacement } => write!(
                f,
                "short branch at {at}: displacement {displacement} outside [-128, 127]"
            ),
            Self::NotABranch { opcode } => {
                write!(f, "opcode 0x{opcode:02X} has no branch operand")
            }
            Self::Emit(e) => write!(f, "emit failed: {e}"),
        }
    }
}

impl core::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Emit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EmitError> for ResolveError {
    fn from(e: EmitError) -> Self {
        Self::Emit(e)
    }
}

/// Label and fixup state for one method body.
#[derive(Clone, Debug, Default)]
pub struct JumpResolver {
    labels: Vec<Option<u32>>,
    fixups: Vec<PendingFixup>,
}

impl JumpResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new, unbound label.
    pub fn label(&mut self) -> Label {
        let id = u32::try_from(self.labels.len()).unwrap_or(u32::MAX);
        self.labels.push(None);
        Label(id)
    }

    /// Binds `label` to the current write address of `buf`.
    pub fn bind(&mut self, label: Label, buf: &CodeBuffer) -> Result<(), ResolveError> {
        let at = buf.mark();
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .ok_or(ResolveError::UnknownLabel { label: label.0 })?;
        if slot.is_some() {
            return Err(ResolveError::LabelRebound { label: label.0 });
        }
        *slot = Some(at);
        Ok(())
    }

    /// Returns the bound address of `label`, if bound.
    #[must_use]
    pub fn address_of(&self, label: Label) -> Option<u32> {
        self.labels.get(label.0 as usize).copied().flatten()
    }

    /// Emits a branch to `target`, choosing the encoding width per `mode`.
    ///
    /// `op` may be either form of a short/long pair; it is normalized to the
    /// width the policy selects. Returns the branch instruction's address.
    pub fn branch(
        &mut self,
        buf: &mut CodeBuffer,
        op: Opcode,
        target: Label,
        mode: BranchMode,
    ) -> Result<u32, ResolveError> {
        let short = op.short_form().unwrap_or(op);
        if short.operand_encoding() != OperandEncoding::Off8 {
            return Err(ResolveError::NotABranch { opcode: op.byte() });
        }
        let long = short.long_form().ok_or(ResolveError::NotABranch { opcode: op.byte() })?;

        let width = match mode {
            BranchMode::Short => FixupWidth::I8,
            BranchMode::Long => FixupWidth::I32,
            BranchMode::Auto => match self.address_of(target) {
                Some(addr) => {
                    let disp = i64::from(addr) - i64::from(buf.mark());
                    if i8::try_from(disp).is_ok() {
                        FixupWidth::I8
                    } else {
                        FixupWidth::I32
                    }
                }
                // Forward reference: width must be final now, so be
                // pessimistic rather than relax later.
                None => FixupWidth::I32,
            },
        };

        let opcode = match width {
            FixupWidth::I8 => short,
            FixupWidth::I32 => long,
        };
        let instr_at = buf.emit(opcode);
        let ph = buf.reserve(width.bytes());
        let operand_at = ph.address();
        let instr_end = buf.mark();
        self.fixups.push(PendingFixup {
            instr_at,
            operand_at,
            instr_end,
            width,
            base: BRANCH_BASE,
            label: target,
        });
        Ok(instr_at)
    }

    /// Emits a try-region header carrying catch and finally displacements.
    ///
    /// A `None` handler encodes a zero displacement, which the VM reads as
    /// "no such handler". Returns the instruction address.
    pub fn try_region(
        &mut self,
        buf: &mut CodeBuffer,
        catch: Option<Label>,
        finally: Option<Label>,
        mode: BranchMode,
    ) -> Result<u32, ResolveError> {
        let width = match mode {
            BranchMode::Short => FixupWidth::I8,
            // Handler entries are forward references by construction.
            BranchMode::Auto | BranchMode::Long => FixupWidth::I32,
        };
        let opcode = match width {
            FixupWidth::I8 => Opcode::Try,
            FixupWidth::I32 => Opcode::TryL,
        };
        let instr_at = buf.emit(opcode);
        let mut operand_ats = [0u32; 2];
        for (i, _) in [catch, finally].iter().enumerate() {
            let ph = buf.reserve(width.bytes());
            operand_ats[i] = ph.address();
        }
        let instr_end = buf.mark();
        for (target, operand_at) in [catch, finally].into_iter().zip(operand_ats) {
            if let Some(label) = target {
                self.fixups.push(PendingFixup {
                    instr_at,
                    operand_at,
                    instr_end,
                    width,
                    base: BRANCH_BASE,
                    label,
                });
            }
        }
        Ok(instr_at)
    }

    /// Runs the single patch sweep over all recorded fixups.
    ///
    /// After this returns, every address in `buf` is final and the stream is
    /// immutable.
    pub fn finish(&mut self, buf: &mut CodeBuffer) -> Result<(), ResolveError> {
        for f in &self.fixups {
            let target = self
                .labels
                .get(f.label.0 as usize)
                .copied()
                .flatten()
                .ok_or(ResolveError::UnresolvedLabel { label: f.label.0 })?;
            let base = match f.base {
                FixupBase::OpcodeStart => f.instr_at,
                FixupBase::OperandEnd => f.instr_end,
            };
            let disp = i64::from(target) - i64::from(base);
            match f.width {
                FixupWidth::I8 => {
                    let v = i8::try_from(disp).map_err(|_| {
                        ResolveError::ShortBranchOutOfRange {
                            at: f.instr_at,
                            displacement: disp,
                        }
                    })?;
                    buf.patch(f.operand_at, &v.to_le_bytes())?;
                }
                FixupWidth::I32 => {
                    // A 4-byte displacement always fits: addresses are u32
                    // and bodies are far below 2 GiB.
                    let v = disp as i32;
                    buf.patch(f.operand_at, &v.to_le_bytes())?;
                }
            }
        }
        self.fixups.clear();
        Ok(())
    }

    /// Shifts every recorded address strictly greater than `above` down by
    /// `by` bytes. Used by the duplicate-preamble pass when it shrinks a
    /// not-yet-finalized body.
    pub(crate) fn shift_down(&mut self, above: u32, by: u32) {
        for slot in self.labels.iter_mut().flatten() {
            if *slot > above {
                *slot -= by;
            }
        }
        for f in &mut self.fixups {
            if f.instr_at > above {
                f.instr_at -= by;
            }
            if f.operand_at > above {
                f.operand_at -= by;
            }
            if f.instr_end > above {
                f.instr_end -= by;
            }
        }
    }
}
