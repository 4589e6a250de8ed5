// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Script disassembly.
//!
//! Decodes a linked script back into instruction views using the opcode
//! catalog, resolves branch displacements to absolute targets, and derives
//! basic blocks. The block graph deliberately abstracts encoding widths:
//! two scripts that differ only in short/long branch forms produce the same
//! [`ControlFlowGraph::shape`], which is what the structural round-trip
//! tests compare.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Write as _;

use hashbrown::HashMap;

use crate::format::DecodeError;
use crate::opcode::{Opcode, OperandEncoding};

/// One decoded instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InstrView<'a> {
    /// Offset of the opcode byte within the script.
    pub offset: u32,
    /// The instruction.
    pub opcode: Opcode,
    /// All operand bytes, including any data length prefix.
    pub operand: &'a [u8],
}

impl<'a> InstrView<'a> {
    /// Total encoded length, opcode byte included.
    #[must_use]
    pub fn len(&self) -> u32 {
        1 + self.operand.len() as u32
    }

    /// Always false; present for the usual pairing with [`Self::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The data payload of a `pushdata` instruction.
    #[must_use]
    pub fn data(&self) -> Option<&'a [u8]> {
        let prefix = match self.opcode.operand_encoding() {
            OperandEncoding::Data1 => 1,
            OperandEncoding::Data2 => 2,
            OperandEncoding::Data4 => 4,
            _ => return None,
        };
        self.operand.get(prefix..)
    }

    /// The token id of a token-call instruction.
    #[must_use]
    pub fn token_id(&self) -> Option<u16> {
        if self.opcode == Opcode::CallT && self.operand.len() == 2 {
            Some(u16::from_le_bytes([self.operand[0], self.operand[1]]))
        } else {
            None
        }
    }

    /// Absolute branch targets, displacements resolved from the opcode
    /// offset. Zero displacements in a try header mean an absent handler
    /// and are skipped.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<i64> {
        let enc = self.opcode.operand_encoding();
        let (width, count) = match enc {
            OperandEncoding::Off8 => (1, 1),
            OperandEncoding::Off32 => (4, 1),
            OperandEncoding::Off8x2 => (1, 2),
            OperandEncoding::Off32x2 => (4, 2),
            _ => return Vec::new(),
        };
        let absent_is_zero = count == 2;
        let mut targets = Vec::with_capacity(count);
        for i in 0..count {
            let bytes = &self.operand[i * width..(i + 1) * width];
            let disp = if width == 1 {
                i64::from(bytes[0] as i8)
            } else {
                i64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            };
            if absent_is_zero && disp == 0 {
                continue;
            }
            targets.push(i64::from(self.offset) + disp);
        }
        targets
    }
}

impl fmt::Display for InstrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}: {}", self.offset, self.opcode.mnemonic())?;
        match self.opcode.operand_encoding() {
            OperandEncoding::None => Ok(()),
            OperandEncoding::I8 => write!(f, " {}", self.operand[0] as i8),
            OperandEncoding::I16 => write!(
                f,
                " {}",
                i16::from_le_bytes([self.operand[0], self.operand[1]])
            ),
            OperandEncoding::I32 => write!(
                f,
                " {}",
                i32::from_le_bytes([
                    self.operand[0],
                    self.operand[1],
                    self.operand[2],
                    self.operand[3]
                ])
            ),
            OperandEncoding::I64 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(self.operand);
                write!(f, " {}", i64::from_le_bytes(b))
            }
            OperandEncoding::I128 | OperandEncoding::I256 => {
                write!(f, " 0x")?;
                for byte in self.operand.iter().rev() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            OperandEncoding::U8 => write!(f, " {}", self.operand[0]),
            OperandEncoding::U16 => write!(
                f,
                " {}",
                u16::from_le_bytes([self.operand[0], self.operand[1]])
            ),
            OperandEncoding::U32 => write!(
                f,
                " {:#010x}",
                u32::from_le_bytes([
                    self.operand[0],
                    self.operand[1],
                    self.operand[2],
                    self.operand[3]
                ])
            ),
            OperandEncoding::Data1 | OperandEncoding::Data2 | OperandEncoding::Data4 => {
                let data = self.data().unwrap_or(&[]);
                write!(f, " [{}]", data.len())?;
                if !data.is_empty() {
                    write!(f, " 0x")?;
                    for byte in data {
                        write!(f, "{byte:02x}")?;
                    }
                }
                Ok(())
            }
            OperandEncoding::Off8
            | OperandEncoding::Off32
            | OperandEncoding::Off8x2
            | OperandEncoding::Off32x2 => {
                for t in self.branch_targets() {
                    write!(f, " -> {t:#06x}")?;
                }
                Ok(())
            }
            OperandEncoding::SlotPair => {
                write!(f, " locals={} args={}", self.operand[0], self.operand[1])
            }
        }
    }
}

/// Decodes the instruction starting at `offset`.
pub fn decode_instr(script: &[u8], offset: usize) -> Result<InstrView<'_>, DecodeError> {
    let byte = *script.get(offset).ok_or(DecodeError::UnexpectedEof)?;
    let opcode = Opcode::from_byte(byte).ok_or(DecodeError::UnknownOpcode { byte })?;
    let operand_start = offset + 1;
    let operand_len = match opcode.operand_encoding().fixed_width() {
        Some(w) => w,
        None => {
            let prefix = match opcode.operand_encoding() {
                OperandEncoding::Data1 => 1,
                OperandEncoding::Data2 => 2,
                _ => 4,
            };
            let raw = script
                .get(operand_start..operand_start + prefix)
                .ok_or(DecodeError::UnexpectedEof)?;
            let len = match prefix {
                1 => usize::from(raw[0]),
                2 => usize::from(u16::from_le_bytes([raw[0], raw[1]])),
                _ => usize::try_from(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
                    .map_err(|_| DecodeError::OutOfBounds)?,
            };
            prefix + len
        }
    };
    let operand = script
        .get(operand_start..operand_start + operand_len)
        .ok_or(DecodeError::UnexpectedEof)?;
    Ok(InstrView {
        offset: offset as u32,
        opcode,
        operand,
    })
}

/// Iterator over a script's instructions. Fuses after the first error.
pub struct InstrIter<'a> {
    script: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for InstrIter<'a> {
    type Item = Result<InstrView<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.script.len() {
            return None;
        }
        match decode_instr(self.script, self.offset) {
            Ok(view) => {
                self.offset += view.len() as usize;
                Some(Ok(view))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterates the instructions of `script` from its first byte.
#[must_use]
pub fn instructions(script: &[u8]) -> InstrIter<'_> {
    InstrIter {
        script,
        offset: 0,
        failed: false,
    }
}

/// One basic block of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasicBlock {
    /// Offset of the block's first instruction.
    pub start: u32,
    /// First offset past the block.
    pub end: u32,
    /// Successor blocks, as indices into [`ControlFlowGraph::blocks`].
    pub successors: Vec<usize>,
}

/// The basic-block graph of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlFlowGraph {
    /// Blocks in ascending start order.
    pub blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// The width-independent shape: per block, its successor indices.
    ///
    /// Two compilations of the same input that differ only in branch
    /// encoding widths have equal shapes.
    #[must_use]
    pub fn shape(&self) -> Vec<Vec<usize>> {
        self.blocks.iter().map(|b| b.successors.clone()).collect()
    }
}

/// Derives the basic-block graph of `script`.
///
/// Fails on undecodable instructions and on branch targets that are out of
/// range or not on an instruction boundary.
pub fn control_flow_graph(script: &[u8]) -> Result<ControlFlowGraph, DecodeError> {
    let mut instrs = Vec::new();
    for instr in instructions(script) {
        instrs.push(instr?);
    }

    let mut index_of = HashMap::with_capacity(instrs.len());
    for (i, instr) in instrs.iter().enumerate() {
        index_of.insert(instr.offset, i);
    }
    let check_target = |t: i64| -> Result<u32, DecodeError> {
        let t = u32::try_from(t).map_err(|_| DecodeError::OutOfBounds)?;
        if index_of.contains_key(&t) {
            Ok(t)
        } else {
            Err(DecodeError::OutOfBounds)
        }
    };

    let mut leaders = Vec::new();
    if !instrs.is_empty() {
        leaders.push(0u32);
    }
    for (i, instr) in instrs.iter().enumerate() {
        let targets = instr.branch_targets();
        for &t in &targets {
            leaders.push(check_target(t)?);
        }
        if !targets.is_empty() || instr.opcode.is_terminator() {
            if let Some(next) = instrs.get(i + 1) {
                leaders.push(next.offset);
            }
        }
    }
    leaders.sort_unstable();
    leaders.dedup();

    let block_index: HashMap<u32, usize> =
        leaders.iter().enumerate().map(|(i, &o)| (o, i)).collect();
    let mut blocks = Vec::with_capacity(leaders.len());
    for (i, &start) in leaders.iter().enumerate() {
        let end = leaders
            .get(i + 1)
            .copied()
            .unwrap_or(script.len() as u32);
        // Last instruction of the block decides the successors.
        let last = instrs[*index_of
            .get(&start)
            .unwrap_or(&0)..]
            .iter()
            .take_while(|ins| ins.offset < end)
            .last()
            .ok_or(DecodeError::OutOfBounds)?;
        let mut successors = Vec::new();
        for t in last.branch_targets() {
            successors.push(block_index[&check_target(t)?]);
        }
        if !last.opcode.is_terminator() {
            if let Some(&next) = block_index.get(&end) {
                successors.push(next);
            }
        }
        blocks.push(BasicBlock {
            start,
            end,
            successors,
        });
    }
    Ok(ControlFlowGraph { blocks })
}

/// Renders the whole script as one instruction per line.
pub fn disassemble(script: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::new();
    for instr in instructions(script) {
        let instr = instr?;
        // Infallible for String.
        let _ = writeln!(out, "{instr}");
    }
    Ok(out)
}
