// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The manifest fragment: public ABI plus the permission list.
//!
//! This is the machine-readable companion of the script, not the full
//! manifest document; downstream tooling merges it into whatever manifest
//! schema the deployment target wants. With the `serde` feature the types
//! serialize directly.

use alloc::string::String;
use alloc::vec::Vec;

use crate::ir::ParamType;
use crate::token::ScriptHash;

/// One ABI method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AbiParameter {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: ParamType,
}

/// One public method of the compiled contract.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AbiMethod {
    /// Method name.
    pub name: String,
    /// Parameters in declaration order.
    pub parameters: Vec<AbiParameter>,
    /// Return type.
    pub return_type: ParamType,
    /// Entry offset into the linked script.
    pub offset: u32,
    /// Whether the method is declared side-effect free.
    pub safe: bool,
}

/// The methods one called contract grants us, in first-call order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Permission {
    /// The called contract.
    pub contract: ScriptHash,
    /// Methods called on it, each listed once, in first-call order.
    pub methods: Vec<String>,
}

/// Accumulates distinct `(contract, method)` pairs across every call site,
/// token or inline, in first-use order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PermissionSet {
    entries: Vec<Permission>,
}

impl PermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a call of `method` on `contract`; repeats are ignored.
    pub fn note(&mut self, contract: ScriptHash, method: &str) {
        match self.entries.iter_mut().find(|e| e.contract == contract) {
            Some(entry) => {
                if !entry.methods.iter().any(|m| m == method) {
                    entry.methods.push(String::from(method));
                }
            }
            None => self.entries.push(Permission {
                contract,
                methods: alloc::vec![String::from(method)],
            }),
        }
    }

    /// The recorded permissions, in first-call order.
    #[must_use]
    pub fn entries(&self) -> &[Permission] {
        &self.entries
    }

    /// Returns true if no external call was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The manifest fragment of one compiled contract.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ManifestFragment {
    /// Contract name.
    pub name: String,
    /// Public methods, in declaration order.
    pub abi: Vec<AbiMethod>,
    /// External-call permissions, in first-call order.
    pub permissions: PermissionSet,
}
