// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The distributable artifact container.
//!
//! Layout: magic, format version, compiler name, the method-token table in
//! first-use order, the linked script, and a 4-byte checksum over everything
//! before it. Decoding verifies the checksum, validates every field against
//! its domain, and walks the script to reject token-call instructions that
//! reference a missing table entry.

use alloc::string::String;
use alloc::vec::Vec;

use sha3::{Digest, Sha3_256};

use crate::disasm::instructions;
use crate::format::{DecodeError, Reader, Writer};
use crate::token::{CallFlags, MethodTokenKey, ScriptHash};
use crate::unit::CompiledContract;

/// Artifact magic, `CSCR` little-endian.
pub const MAGIC: u32 = u32::from_le_bytes(*b"CSCR");

/// The format version this library writes.
pub const VERSION: (u16, u16) = (1, 0);

/// A decoded or to-be-encoded artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Name and version of the producing compiler.
    pub compiler: String,
    /// Method tokens in first-use order.
    pub tokens: Vec<MethodTokenKey>,
    /// The linked script.
    pub script: Vec<u8>,
}

/// Checksum over an encoded artifact body: the first four bytes of its
/// `Sha3_256` digest, read little-endian.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u32 {
    let digest = Sha3_256::digest(bytes);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

impl Artifact {
    /// Packages a compiled contract.
    #[must_use]
    pub fn new(compiler: &str, compiled: &CompiledContract) -> Self {
        Self {
            compiler: String::from(compiler),
            tokens: compiled.tokens.clone(),
            script: compiled.script.clone(),
        }
    }

    /// Encodes the artifact.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u32_le(MAGIC);
        w.write_u16_le(VERSION.0);
        w.write_u16_le(VERSION.1);
        w.write_var_str(&self.compiler);
        w.write_var_size(self.tokens.len() as u64);
        for token in &self.tokens {
            w.write_bytes(token.hash.as_bytes());
            w.write_var_str(&token.method);
            w.write_u8(token.param_count);
            w.write_u8(u8::from(token.has_return));
            w.write_u8(token.call_flags.bits());
        }
        w.write_var_bytes(&self.script);
        let sum = checksum(w.as_slice());
        w.write_u32_le(sum);
        w.into_vec()
    }

    /// Decodes and fully validates an artifact.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        if r.read_u32_le()? != MAGIC {
            return Err(DecodeError::BadMagic);
        }
        let major = r.read_u16_le()?;
        let minor = r.read_u16_le()?;
        if major != VERSION.0 {
            return Err(DecodeError::UnsupportedVersion { major, minor });
        }
        let compiler = String::from(r.read_var_str()?);

        let token_count = r.read_var_len()?;
        let mut tokens = Vec::new();
        for _ in 0..token_count {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(r.read_bytes(20)?);
            let method = String::from(r.read_var_str()?);
            let param_count = r.read_u8()?;
            let has_return = match r.read_u8()? {
                0 => false,
                1 => true,
                _ => return Err(DecodeError::InvalidValue),
            };
            let call_flags =
                CallFlags::from_bits(r.read_u8()?).ok_or(DecodeError::InvalidValue)?;
            tokens.push(MethodTokenKey {
                hash: ScriptHash(hash),
                method,
                param_count,
                has_return,
                call_flags,
            });
        }

        let script = r.read_var_bytes()?.to_vec();
        let declared = r.read_u32_le()?;
        if r.remaining() != 0 {
            return Err(DecodeError::TrailingBytes);
        }
        if checksum(&bytes[..bytes.len() - 4]) != declared {
            return Err(DecodeError::ChecksumMismatch);
        }

        for instr in instructions(&script) {
            let instr = instr?;
            if let Some(id) = instr.token_id() {
                if usize::from(id) >= tokens.len() {
                    return Err(DecodeError::InvalidTokenReference { id });
                }
            }
        }

        Ok(Self {
            compiler,
            tokens,
            script,
        })
    }
}
