// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Call-convention lowering and literal push selection.
//!
//! A call site lowers in two stages. [`plan_call`] decides, from the resolved
//! descriptor alone, which argument expressions to emit in which order and
//! which trailing arguments to synthesize; the compilation unit then emits
//! the arguments per that plan and hands control back to [`emit_call_tail`]
//! for the strategy-specific instructions. The first use of a contract-call
//! key emits the full inline dynamic-call preamble and mints a method token;
//! every later use collapses to the 3-byte token-call form.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use sha3::{Digest, Sha3_256};

use crate::descriptor::{LoweringStrategy, ResolvedDescriptor, ResolvedPack};
use crate::emit::CodeBuffer;
use crate::ir::Literal;
use crate::manifest::PermissionSet;
use crate::opcode::Opcode;
use crate::token::{MethodTokenKey, TokenError, TokenTable};

/// The interop service every inline dynamic contract call invokes.
pub const CONTRACT_CALL_INTEROP: &str = "System.Contract.Call";

/// A lowering error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LowerError {
    /// A call site supplied more arguments than the descriptor declares.
    TooManyArguments {
        /// Arguments at the call site.
        supplied: usize,
        /// Declared parameter count.
        arity: usize,
    },
    /// A forward chain survived catalog resolution.
    UnresolvedDelegation {
        /// The target the chain still points at.
        public_id: String,
    },
    /// Token-table failure.
    Token(TokenError),
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyArguments { supplied, arity } => {
                write!(f, "call supplies {supplied} arguments, descriptor declares {arity}")
            }
            Self::UnresolvedDelegation { public_id } => {
                write!(f, "delegation to {public_id:?} was not resolved")
            }
            Self::Token(e) => write!(f, "token table: {e}"),
        }
    }
}

impl core::error::Error for LowerError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Token(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TokenError> for LowerError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

/// One recorded literal push inside a call preamble, for the
/// duplicate-preamble pass. `payload` is the encoded push including its
/// opcode; equal payloads push equal values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreambleSite {
    /// Address of the push opcode within the body.
    pub at: u32,
    /// Encoded length of the push.
    pub len: u32,
    /// The encoded push bytes.
    pub payload: Vec<u8>,
}

/// One argument-emission step of a call plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgStep {
    /// Emit the call site's argument expression with this source index.
    Supplied(usize),
    /// Splice pre-encoded bytes (a parameter default or a null push).
    Synthesized(Vec<u8>),
}

/// The argument-emission plan for one call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallPlan {
    /// Steps in emission order.
    pub steps: Vec<ArgStep>,
    /// When present, the total argument count to collect with `PACK` after
    /// the last step.
    pub pack: Option<u8>,
}

fn synthesized(resolved: &ResolvedDescriptor, index: usize) -> Vec<u8> {
    match resolved
        .declared
        .params
        .get(index)
        .and_then(|p| p.default_bytecode.clone())
    {
        Some(bytes) => bytes,
        None => alloc::vec![Opcode::PushNull.byte()],
    }
}

/// Plans argument emission for one call site with `supplied` arguments.
///
/// Missing trailing parameters take their recorded default (or a null push),
/// and an `internal_call_arity` wider than the public arity pads with further
/// synthesized nulls so the native callee sees its full shape. Packed calls
/// emit in source order and collect with `PACK`; positional calls emit last
/// argument first.
pub fn plan_call(resolved: &ResolvedDescriptor, supplied: usize) -> Result<CallPlan, LowerError> {
    let arity = resolved.arity();
    if supplied > arity {
        return Err(LowerError::TooManyArguments { supplied, arity });
    }
    let total = resolved.total_arity();

    let mut steps = Vec::with_capacity(total);
    match resolved.pack {
        ResolvedPack::Packed => {
            for i in 0..supplied {
                steps.push(ArgStep::Supplied(i));
            }
            for i in supplied..total {
                steps.push(ArgStep::Synthesized(synthesized(resolved, i)));
            }
        }
        ResolvedPack::Positional => {
            for i in (supplied..total).rev() {
                steps.push(ArgStep::Synthesized(synthesized(resolved, i)));
            }
            for i in (0..supplied).rev() {
                steps.push(ArgStep::Supplied(i));
            }
        }
    }
    let pack = match resolved.pack {
        ResolvedPack::Packed => Some(total as u8),
        ResolvedPack::Positional => None,
    };
    Ok(CallPlan { steps, pack })
}

/// Emits everything after the arguments for one call site.
///
/// The unit has already emitted the arguments per the plan (including the
/// `PACK` collection for packed calls).
pub fn emit_call_tail(
    buf: &mut CodeBuffer,
    tokens: &mut TokenTable,
    permissions: &mut PermissionSet,
    sites: &mut Vec<PreambleSite>,
    resolved: &ResolvedDescriptor,
    strategy: &LoweringStrategy,
) -> Result<(), LowerError> {
    match strategy {
        LoweringStrategy::Syscall(name) => {
            buf.emit_with(Opcode::Syscall, &syscall_id(name).to_le_bytes());
            Ok(())
        }
        LoweringStrategy::Inline(bytes) => {
            buf.emit_raw(bytes);
            Ok(())
        }
        LoweringStrategy::ContractCall {
            hash,
            method,
            flags,
            token_eligible,
        } => {
            permissions.note(*hash, method);
            let inline = if *token_eligible {
                let key = MethodTokenKey {
                    hash: *hash,
                    method: method.clone(),
                    param_count: resolved.total_arity() as u8,
                    has_return: resolved.has_return(),
                    call_flags: *flags,
                };
                let (id, fresh) = tokens.intern(key)?;
                if fresh {
                    true
                } else {
                    buf.emit_with(Opcode::CallT, &id.0.to_le_bytes());
                    false
                }
            } else {
                true
            };
            if inline {
                push_int(buf, i128::from(flags.bits()));
                push_data_recorded(buf, sites, method.as_bytes());
                push_data_recorded(buf, sites, hash.as_bytes());
                buf.emit_with(
                    Opcode::Syscall,
                    &syscall_id(CONTRACT_CALL_INTEROP).to_le_bytes(),
                );
            }
            Ok(())
        }
        LoweringStrategy::Forward(next) => Err(LowerError::UnresolvedDelegation {
            public_id: next.clone(),
        }),
    }
}

/// Hashes an interop service name to its 4-byte id.
#[must_use]
pub fn syscall_id(name: &str) -> u32 {
    let digest = Sha3_256::digest(name.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

const SMALL_PUSH: [Opcode; 17] = [
    Opcode::Push0,
    Opcode::Push1,
    Opcode::Push2,
    Opcode::Push3,
    Opcode::Push4,
    Opcode::Push5,
    Opcode::Push6,
    Opcode::Push7,
    Opcode::Push8,
    Opcode::Push9,
    Opcode::Push10,
    Opcode::Push11,
    Opcode::Push12,
    Opcode::Push13,
    Opcode::Push14,
    Opcode::Push15,
    Opcode::Push16,
];

/// Pushes an integer with the narrowest encoding. Returns the instruction
/// address.
pub fn push_int(buf: &mut CodeBuffer, v: i128) -> u32 {
    if v == -1 {
        buf.emit(Opcode::PushM1)
    } else if (0..=16).contains(&v) {
        buf.emit(SMALL_PUSH[v as usize])
    } else if let Ok(b) = i8::try_from(v) {
        buf.emit_with(Opcode::PushInt8, &b.to_le_bytes())
    } else if let Ok(b) = i16::try_from(v) {
        buf.emit_with(Opcode::PushInt16, &b.to_le_bytes())
    } else if let Ok(b) = i32::try_from(v) {
        buf.emit_with(Opcode::PushInt32, &b.to_le_bytes())
    } else if let Ok(b) = i64::try_from(v) {
        buf.emit_with(Opcode::PushInt64, &b.to_le_bytes())
    } else {
        buf.emit_with(Opcode::PushInt128, &v.to_le_bytes())
    }
}

/// Pushes a boolean.
pub fn push_bool(buf: &mut CodeBuffer, v: bool) -> u32 {
    buf.emit(if v { Opcode::PushTrue } else { Opcode::PushFalse })
}

/// Pushes the null item.
pub fn push_null(buf: &mut CodeBuffer) -> u32 {
    buf.emit(Opcode::PushNull)
}

/// Pushes raw bytes with the narrowest length prefix.
pub fn push_data(buf: &mut CodeBuffer, data: &[u8]) -> u32 {
    let at = if data.len() <= usize::from(u8::MAX) {
        buf.emit_with(Opcode::PushData1, &[data.len() as u8])
    } else if data.len() <= usize::from(u16::MAX) {
        buf.emit_with(Opcode::PushData2, &(data.len() as u16).to_le_bytes())
    } else {
        buf.emit_with(Opcode::PushData4, &(data.len() as u32).to_le_bytes())
    };
    buf.emit_raw(data);
    at
}

/// Pushes any front-end literal.
pub fn push_literal(buf: &mut CodeBuffer, lit: &Literal) -> u32 {
    match lit {
        Literal::Int(v) => push_int(buf, *v),
        Literal::Bool(v) => push_bool(buf, *v),
        Literal::Bytes(b) => push_data(buf, b),
        Literal::Str(s) => push_data(buf, s.as_bytes()),
        Literal::Null => push_null(buf),
    }
}

fn push_data_recorded(buf: &mut CodeBuffer, sites: &mut Vec<PreambleSite>, data: &[u8]) {
    let at = push_data(buf, data);
    let end = buf.mark();
    let payload = buf.as_slice()[at as usize..end as usize].to_vec();
    sites.push(PreambleSite {
        at,
        len: end - at,
        payload,
    });
}
