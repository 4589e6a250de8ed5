// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The method-descriptor catalog: how each callable the front end resolved
//! against is lowered into bytecode.
//!
//! Registration is insertion-ordered and keyed by public id. Resolution is an
//! explicit phase: [`DescriptorCatalog::resolve`] follows every delegation
//! chain once, up front, and returns a frozen [`ResolvedCatalog`] that never
//! mutates during emission. Call-site order therefore cannot influence how a
//! descriptor lowers.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;

use crate::ir::ParamType;
use crate::token::{CallFlags, ScriptHash};

/// Index of a descriptor in registration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorId(pub u32);

/// One declared parameter of a descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorParam {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    pub ty: ParamType,
    /// Pre-encoded push sequence for the default value, if the parameter
    /// has one. Absent defaults synthesize a null push.
    pub default_bytecode: Option<Vec<u8>>,
}

/// How a call site for this descriptor turns into instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoweringStrategy {
    /// Invoke a platform interop service by name.
    Syscall(String),
    /// Call a method on a deployed contract.
    ContractCall {
        /// Target contract.
        hash: ScriptHash,
        /// Method name on the target.
        method: String,
        /// Permissions granted to the callee.
        flags: CallFlags,
        /// Whether the platform allows a static method token for this call.
        /// Ineligible calls lower inline at every site.
        token_eligible: bool,
    },
    /// Splice a pre-encoded instruction sequence directly.
    Inline(Vec<u8>),
    /// Lower exactly as the named descriptor does.
    Forward(String),
}

/// Whether arguments travel as one packed array or as positional pushes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackPolicy {
    /// Arguments are collected into a single array operand.
    Packed,
    /// Arguments are pushed individually, last first.
    Positional,
    /// Use the policy of the named descriptor.
    Inherit(String),
}

/// The packing decision after resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolvedPack {
    /// Arguments are collected into a single array operand.
    Packed,
    /// Arguments are pushed individually, last first.
    Positional,
}

/// A callable registered with the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// The id front-end code resolves against; unique within a catalog.
    pub public_id: String,
    /// Declared parameters, in order.
    pub params: Vec<DescriptorParam>,
    /// Return type (`Void` when nothing is left on the stack).
    pub return_type: ParamType,
    /// Lowering strategy.
    pub lowering: LoweringStrategy,
    /// Argument packing policy.
    pub pack: PackPolicy,
    /// Arity the native callee expects when it exceeds the public arity;
    /// the gap is filled with synthesized trailing arguments.
    pub internal_call_arity: Option<u8>,
}

/// A catalog-resolution error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// Two registrations used the same public id.
    DuplicateDescriptor {
        /// The repeated id.
        public_id: String,
    },
    /// A delegation named a descriptor that does not exist.
    UnknownDescriptor {
        /// The missing id.
        public_id: String,
    },
    /// A `Forward`/`Inherit` chain loops back on itself.
    DelegationCycle {
        /// The id whose chain loops.
        public_id: String,
    },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDescriptor { public_id } => {
                write!(f, "descriptor {public_id:?} registered twice")
            }
            Self::UnknownDescriptor { public_id } => {
                write!(f, "descriptor {public_id:?} does not exist")
            }
            Self::DelegationCycle { public_id } => {
                write!(f, "delegation chain of {public_id:?} is cyclic")
            }
        }
    }
}

impl core::error::Error for CatalogError {}

/// Mutable registration surface.
#[derive(Clone, Debug, Default)]
pub struct DescriptorCatalog {
    descriptors: Vec<MethodDescriptor>,
    by_id: HashMap<String, DescriptorId>,
}

impl DescriptorCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, returning its id.
    pub fn register(&mut self, desc: MethodDescriptor) -> Result<DescriptorId, CatalogError> {
        if self.by_id.contains_key(&desc.public_id) {
            return Err(CatalogError::DuplicateDescriptor {
                public_id: desc.public_id.clone(),
            });
        }
        let id = DescriptorId(self.descriptors.len() as u32);
        self.by_id.insert(desc.public_id.clone(), id);
        self.descriptors.push(desc);
        Ok(id)
    }

    /// Looks up a descriptor id by public id.
    #[must_use]
    pub fn id_of(&self, public_id: &str) -> Option<DescriptorId> {
        self.by_id.get(public_id).copied()
    }

    /// Follows a chain of ids starting at `start`, stepping via `next`,
    /// returning the terminal id. A chain longer than the catalog is cyclic.
    fn follow_chain(
        &self,
        start: DescriptorId,
        next: impl Fn(&MethodDescriptor) -> Option<&str>,
    ) -> Result<DescriptorId, CatalogError> {
        let mut current = start;
        for _ in 0..=self.descriptors.len() {
            let desc = &self.descriptors[current.0 as usize];
            let Some(target) = next(desc) else {
                return Ok(current);
            };
            current = self
                .id_of(target)
                .ok_or_else(|| CatalogError::UnknownDescriptor {
                    public_id: String::from(target),
                })?;
        }
        Err(CatalogError::DelegationCycle {
            public_id: self.descriptors[start.0 as usize].public_id.clone(),
        })
    }

    /// Resolves every delegation and freezes the catalog.
    ///
    /// After this, every descriptor has a terminal lowering target and a
    /// concrete pack policy; nothing about a descriptor depends on when or
    /// whether it is called.
    pub fn resolve(self) -> Result<ResolvedCatalog, CatalogError> {
        let mut resolved = Vec::with_capacity(self.descriptors.len());
        for (i, desc) in self.descriptors.iter().enumerate() {
            let id = DescriptorId(i as u32);
            let target = self.follow_chain(id, |d| match &d.lowering {
                LoweringStrategy::Forward(next) => Some(next),
                _ => None,
            })?;
            let pack_owner = self.follow_chain(target, |d| match &d.pack {
                PackPolicy::Inherit(next) => Some(next),
                _ => None,
            })?;
            let pack = match &self.descriptors[pack_owner.0 as usize].pack {
                PackPolicy::Packed => ResolvedPack::Packed,
                PackPolicy::Positional => ResolvedPack::Positional,
                // The chain terminated, so the owner's policy is concrete.
                PackPolicy::Inherit(_) => unreachable!(),
            };
            resolved.push(ResolvedDescriptor {
                declared: desc.clone(),
                target,
                pack,
            });
        }
        Ok(ResolvedCatalog { descriptors: resolved })
    }
}

/// A descriptor after resolution.
#[derive(Clone, Debug)]
pub struct ResolvedDescriptor {
    /// The descriptor as registered.
    pub declared: MethodDescriptor,
    /// Terminal target after following `Forward` chains; `self` when the
    /// declared strategy is not a forward.
    pub target: DescriptorId,
    /// Concrete pack policy after following `Inherit` chains.
    pub pack: ResolvedPack,
}

impl ResolvedDescriptor {
    /// The public arity: the number of declared parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.declared.params.len()
    }

    /// The arity the native callee sees: the public arity widened by
    /// `internal_call_arity` when the native shape is larger.
    #[must_use]
    pub fn total_arity(&self) -> usize {
        let declared = self.declared.params.len();
        match self.declared.internal_call_arity {
            Some(n) if usize::from(n) > declared => usize::from(n),
            _ => declared,
        }
    }

    /// Returns true if the call leaves a value on the stack.
    #[must_use]
    pub fn has_return(&self) -> bool {
        self.declared.return_type != crate::ir::ParamType::Void
    }
}

/// The frozen catalog used during emission. Immutable and shareable.
#[derive(Clone, Debug)]
pub struct ResolvedCatalog {
    descriptors: Vec<ResolvedDescriptor>,
}

impl ResolvedCatalog {
    /// Looks up a resolved descriptor.
    pub fn get(&self, id: DescriptorId) -> Result<&ResolvedDescriptor, CatalogError> {
        self.descriptors
            .get(id.0 as usize)
            .ok_or(CatalogError::UnknownDescriptor {
                public_id: String::from("<out of range>"),
            })
    }

    /// The strategy a call site for `id` actually lowers with: the terminal
    /// target's own (non-forward) strategy.
    pub fn strategy_of(&self, id: DescriptorId) -> Result<&ResolvedDescriptor, CatalogError> {
        let target = self.get(id)?.target;
        self.get(target)
    }

    /// Returns the number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
