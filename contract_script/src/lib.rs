// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `contract_script`: a bytecode backend for a stack-based smart-contract VM.
//!
//! The crate lowers a small typed program IR into VM bytecode: instruction
//! emission with two-pass jump resolution, call-convention lowering against a
//! descriptor catalog, a method-token table, duplicate-preamble hoisting, a
//! manifest fragment for the host, and the distributable artifact container.
//!
//! ## Example
//!
//! ```
//! extern crate alloc;
//!
//! use alloc::vec;
//!
//! use contract_script::artifact::Artifact;
//! use contract_script::descriptor::DescriptorCatalog;
//! use contract_script::ir::{BinaryOp, ContractDef, MethodDef, Op, Param, ParamType, Slot};
//! use contract_script::unit::{CompilationUnit, CompileOptions};
//!
//! let catalog = DescriptorCatalog::new().resolve()?;
//! let contract = ContractDef {
//!     name: "adder".into(),
//!     static_slots: 0,
//!     methods: vec![MethodDef {
//!         name: "add".into(),
//!         params: vec![
//!             Param { name: "a".into(), ty: ParamType::Integer },
//!             Param { name: "b".into(), ty: ParamType::Integer },
//!         ],
//!         return_type: ParamType::Integer,
//!         locals: 0,
//!         public: true,
//!         safe: true,
//!         body: vec![
//!             Op::Load(Slot::Arg(0)),
//!             Op::Load(Slot::Arg(1)),
//!             Op::Binary(BinaryOp::Add),
//!             Op::Return,
//!         ],
//!     }],
//! };
//!
//! let compiled = CompilationUnit::new(&catalog, CompileOptions::default())
//!     .compile(&contract)?;
//! assert_eq!(compiled.script, [0x57, 0x00, 0x02, 0x78, 0x79, 0x9E, 0x40]);
//!
//! let artifact = Artifact::new("contract-script 0.1", &compiled);
//! assert_eq!(Artifact::decode(&artifact.encode()).unwrap(), artifact);
//! # Ok::<(), contract_script::unit::CompileError>(())
//! ```

#![no_std]

extern crate alloc;

pub mod artifact;
pub mod descriptor;
pub mod disasm;
pub mod emit;
pub mod format;
pub mod ir;
pub mod lowering;
pub mod manifest;
pub mod opcode;
pub mod optimizer;
pub mod resolver;
pub mod token;
pub mod unit;
