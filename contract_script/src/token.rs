// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Method tokens for calls into platform-provided contracts.
//!
//! The token table deduplicates external-call descriptions into small `u16`
//! ids so later call sites can use the compact 3-byte token-call instruction
//! instead of re-emitting the full dynamic-call preamble. Table order is
//! first-use insertion order and ids never change once minted.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// The fixed-length identifier of a deployed contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScriptHash(pub [u8; 20]);

impl ScriptHash {
    /// Returns the hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A bit set restricting what a called contract may do.
///
/// Baked verbatim into emitted bytecode and token-table keys: two calls that
/// differ only in flags are distinct table entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CallFlags(u8);

impl core::ops::BitOr for CallFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign for CallFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl CallFlags {
    /// No permissions.
    pub const NONE: Self = Self(0);
    /// The callee may read chain state.
    pub const READ_STATES: Self = Self(1 << 0);
    /// The callee may write chain state.
    pub const WRITE_STATES: Self = Self(1 << 1);
    /// The callee may call further contracts.
    pub const ALLOW_CALL: Self = Self(1 << 2);
    /// The callee may emit notifications.
    pub const ALLOW_NOTIFY: Self = Self(1 << 3);
    /// Read and write state.
    pub const STATES: Self = Self(Self::READ_STATES.0 | Self::WRITE_STATES.0);
    /// Read state, call onward, notify.
    pub const READ_ONLY: Self =
        Self(Self::READ_STATES.0 | Self::ALLOW_CALL.0 | Self::ALLOW_NOTIFY.0);
    /// Every permission.
    pub const ALL: Self = Self(Self::STATES.0 | Self::ALLOW_CALL.0 | Self::ALLOW_NOTIFY.0);

    /// Returns the raw bit pattern as emitted into bytecode.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstructs flags from a raw bit pattern, rejecting unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 != 0 {
            return None;
        }
        Some(Self(bits))
    }

    /// Returns true if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A method-token id: an index into the token table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenId(pub u16);

/// The deduplication key (and stored record) for one external call shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodTokenKey {
    /// Target contract.
    pub hash: ScriptHash,
    /// Method name on the target contract.
    pub method: String,
    /// Number of arguments the call passes.
    pub param_count: u8,
    /// Whether the call leaves a return value on the stack.
    pub has_return: bool,
    /// Permissions granted to the callee.
    pub call_flags: CallFlags,
}

/// A token-table error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenError {
    /// More than `u16::MAX + 1` distinct tokens were requested.
    TableFull,
    /// A token-call instruction referenced a non-existent table entry.
    InvalidTokenReference {
        /// The out-of-range id.
        id: u16,
    },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => write!(f, "method token table is full"),
            Self::InvalidTokenReference { id } => {
                write!(f, "token {id} does not exist in the table")
            }
        }
    }
}

impl core::error::Error for TokenError {}

/// Insertion-ordered method-token table for one compilation unit.
#[derive(Clone, Debug, Default)]
pub struct TokenTable {
    tokens: Vec<MethodTokenKey>,
}

impl TokenTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `key`, returning its id and whether this call minted it.
    ///
    /// The first use of a key assigns the next id; every later use returns
    /// the same id. Ids are immutable once minted.
    pub fn intern(&mut self, key: MethodTokenKey) -> Result<(TokenId, bool), TokenError> {
        if let Some(i) = self.tokens.iter().position(|t| *t == key) {
            return Ok((TokenId(i as u16), false));
        }
        let id = u16::try_from(self.tokens.len()).map_err(|_| TokenError::TableFull)?;
        self.tokens.push(key);
        Ok((TokenId(id), true))
    }

    /// Looks up a token by id. A missing id is a fatal internal error.
    pub fn get(&self, id: TokenId) -> Result<&MethodTokenKey, TokenError> {
        self.tokens
            .get(usize::from(id.0))
            .ok_or(TokenError::InvalidTokenReference { id: id.0 })
    }

    /// Returns the number of minted tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no tokens were minted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates tokens in first-use insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MethodTokenKey> {
        self.tokens.iter()
    }

    /// Consumes the table into its insertion-ordered records.
    #[must_use]
    pub fn into_vec(self) -> Vec<MethodTokenKey> {
        self.tokens
    }
}
