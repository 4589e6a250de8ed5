// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compilation unit: per-contract emission context and linking.
//!
//! A [`CompilationUnit`] is created fresh for each contract against a frozen
//! catalog, lowers each method body in declaration order, optionally runs the
//! duplicate-preamble pass, and links the bodies into one contiguous script.
//! There is no process-wide state; sibling contracts compiled from the same
//! catalog are fully independent, and compiling the same input twice yields
//! byte-identical output.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::descriptor::{CatalogError, ResolvedCatalog};
use crate::emit::CodeBuffer;
use crate::ir::{BinaryOp, ContractDef, Literal, MethodDef, Op, ParamType, Slot, UnaryOp};
use crate::lowering::{
    ArgStep, LowerError, PreambleSite, emit_call_tail, plan_call, push_int, push_literal,
};
use crate::manifest::{AbiMethod, AbiParameter, ManifestFragment, PermissionSet};
use crate::opcode::{Opcode, OperandEncoding};
use crate::optimizer::{BodyView, Hoisted, hoist_duplicate_preambles};
use crate::resolver::{BranchMode, JumpResolver, Label, ResolveError};
use crate::token::{MethodTokenKey, TokenTable};

/// Per-unit compile options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run the duplicate-preamble pass. Encoding only; output semantics are
    /// identical either way.
    pub hoist_duplicate_preambles: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            hoist_duplicate_preambles: true,
        }
    }
}

/// A compile error. Everything here is fatal for the enclosing contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// Label or fixup failure.
    Resolve(ResolveError),
    /// Call-lowering failure.
    Lower(LowerError),
    /// Catalog lookup failure.
    Catalog(CatalogError),
    /// A `break` outside any loop.
    BreakOutsideLoop,
    /// A `continue` outside any loop.
    ContinueOutsideLoop,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "resolve: {e}"),
            Self::Lower(e) => write!(f, "lower: {e}"),
            Self::Catalog(e) => write!(f, "catalog: {e}"),
            Self::BreakOutsideLoop => write!(f, "break outside of a loop"),
            Self::ContinueOutsideLoop => write!(f, "continue outside of a loop"),
        }
    }
}

impl core::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Resolve(e) => Some(e),
            Self::Lower(e) => Some(e),
            Self::Catalog(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResolveError> for CompileError {
    fn from(e: ResolveError) -> Self {
        Self::Resolve(e)
    }
}

impl From<LowerError> for CompileError {
    fn from(e: LowerError) -> Self {
        Self::Lower(e)
    }
}

impl From<CatalogError> for CompileError {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

/// The output of one compilation.
#[derive(Clone, Debug)]
pub struct CompiledContract {
    /// The linked script.
    pub script: Vec<u8>,
    /// Method tokens in first-use order, for the artifact header.
    pub tokens: Vec<MethodTokenKey>,
    /// The manifest fragment.
    pub manifest: ManifestFragment,
    /// Entry offset of each declared method, in declaration order.
    pub method_offsets: Vec<u32>,
}

#[derive(Default)]
struct Body {
    buf: CodeBuffer,
    resolver: JumpResolver,
    sites: Vec<PreambleSite>,
}

struct LoopFrame {
    continue_to: Label,
    break_to: Label,
}

/// Per-contract emission context.
pub struct CompilationUnit<'a> {
    catalog: &'a ResolvedCatalog,
    options: CompileOptions,
    tokens: TokenTable,
    permissions: PermissionSet,
}

impl<'a> CompilationUnit<'a> {
    /// Creates a fresh unit against a frozen catalog.
    #[must_use]
    pub fn new(catalog: &'a ResolvedCatalog, options: CompileOptions) -> Self {
        Self {
            catalog,
            options,
            tokens: TokenTable::new(),
            permissions: PermissionSet::new(),
        }
    }

    /// Compiles one contract to its script, token table, and manifest.
    pub fn compile(mut self, contract: &ContractDef) -> Result<CompiledContract, CompileError> {
        let mut bodies = Vec::with_capacity(contract.methods.len());
        for method in &contract.methods {
            bodies.push(self.lower_method(method)?);
        }

        let hoisted = if self.options.hoist_duplicate_preambles {
            let mut views: Vec<BodyView<'_>> = bodies
                .iter_mut()
                .map(|b| BodyView {
                    buf: &mut b.buf,
                    resolver: &mut b.resolver,
                    sites: &mut b.sites,
                })
                .collect();
            hoist_duplicate_preambles(&mut views, contract.static_slots)
        } else {
            Hoisted::default()
        };

        let total_statics =
            usize::from(contract.static_slots) + hoisted.payloads.len();
        let initializer = if total_statics > 0 {
            Some(synthesize_initializer(
                contract.static_slots,
                total_statics as u8,
                &hoisted,
            ))
        } else {
            None
        };

        // Link: initializer first, then declared bodies in order. Branches
        // are body-relative, so each body is patched before placement and
        // never touched again.
        let mut script = Vec::new();
        if let Some(init) = &initializer {
            script.extend_from_slice(init.as_slice());
        }
        let mut method_offsets = Vec::with_capacity(bodies.len());
        let mut abi = Vec::new();
        for (method, mut body) in contract.methods.iter().zip(bodies) {
            body.resolver.finish(&mut body.buf)?;
            let offset = script.len() as u32;
            method_offsets.push(offset);
            if method.public {
                abi.push(AbiMethod {
                    name: method.name.clone(),
                    parameters: method
                        .params
                        .iter()
                        .map(|p| AbiParameter {
                            name: p.name.clone(),
                            ty: p.ty,
                        })
                        .collect(),
                    return_type: method.return_type,
                    offset,
                    safe: method.safe,
                });
            }
            script.extend_from_slice(body.buf.as_slice());
        }
        if initializer.is_some() {
            abi.push(AbiMethod {
                name: String::from("_initialize"),
                parameters: Vec::new(),
                return_type: ParamType::Void,
                offset: 0,
                safe: false,
            });
        }

        Ok(CompiledContract {
            script,
            tokens: self.tokens.into_vec(),
            manifest: ManifestFragment {
                name: contract.name.clone(),
                abi,
                permissions: self.permissions,
            },
            method_offsets,
        })
    }

    fn lower_method(&mut self, method: &MethodDef) -> Result<Body, CompileError> {
        let mut body = Body::default();
        if method.needs_slots() {
            body.buf
                .emit_with(Opcode::InitSlot, &[method.locals, method.arity()]);
        }
        let mut loops = Vec::new();
        self.lower_ops(&mut body, &method.body, &mut loops)?;
        if !matches!(
            method.body.last(),
            Some(Op::Return | Op::Throw | Op::Abort)
        ) {
            body.buf.emit(Opcode::Ret);
        }
        Ok(body)
    }

    fn lower_ops(
        &mut self,
        b: &mut Body,
        ops: &[Op],
        loops: &mut Vec<LoopFrame>,
    ) -> Result<(), CompileError> {
        for op in ops {
            self.lower_op(b, op, loops)?;
        }
        Ok(())
    }

    fn lower_op(
        &mut self,
        b: &mut Body,
        op: &Op,
        loops: &mut Vec<LoopFrame>,
    ) -> Result<(), CompileError> {
        match op {
            Op::Push(lit) => {
                push_literal(&mut b.buf, lit);
            }
            Op::Load(slot) => emit_slot(&mut b.buf, load_opcode(*slot), slot_index(*slot)),
            Op::Store(slot) => emit_slot(&mut b.buf, store_opcode(*slot), slot_index(*slot)),
            Op::Drop => {
                b.buf.emit(Opcode::Drop);
            }
            Op::Unary(u) => {
                b.buf.emit(unary_opcode(*u));
            }
            Op::Binary(bin) => {
                b.buf.emit(binary_opcode(*bin));
            }
            Op::Call { callee, args } => {
                let catalog = self.catalog;
                let resolved = catalog.get(*callee)?;
                let owner = catalog.strategy_of(*callee)?;
                let plan = plan_call(resolved, args.len())?;
                for step in &plan.steps {
                    match step {
                        ArgStep::Supplied(i) => self.lower_ops(b, &args[*i], loops)?,
                        ArgStep::Synthesized(bytes) => {
                            b.buf.emit_raw(bytes);
                        }
                    }
                }
                if let Some(total) = plan.pack {
                    push_int(&mut b.buf, i128::from(total));
                    b.buf.emit(Opcode::Pack);
                }
                emit_call_tail(
                    &mut b.buf,
                    &mut self.tokens,
                    &mut self.permissions,
                    &mut b.sites,
                    resolved,
                    &owner.declared.lowering,
                )?;
            }
            Op::Return => {
                b.buf.emit(Opcode::Ret);
            }
            Op::Throw => {
                b.buf.emit(Opcode::Throw);
            }
            Op::Abort => {
                b.buf.emit(Opcode::Abort);
            }
            Op::Assert => {
                b.buf.emit(Opcode::Assert);
            }
            Op::If {
                cond,
                then_body,
                else_body,
            } => {
                self.lower_ops(b, cond, loops)?;
                let end = b.resolver.label();
                if else_body.is_empty() {
                    let mode = skip_mode(static_len(then_body), 0);
                    b.resolver.branch(&mut b.buf, Opcode::JmpIfNot, end, mode)?;
                    self.lower_ops(b, then_body, loops)?;
                } else {
                    let else_label = b.resolver.label();
                    let else_span = static_len(else_body);
                    let exit_mode = skip_mode(else_span, 0);
                    let exit_width = match exit_mode {
                        BranchMode::Short => 2,
                        _ => 5,
                    };
                    let mode = skip_mode(static_len(then_body), exit_width);
                    b.resolver
                        .branch(&mut b.buf, Opcode::JmpIfNot, else_label, mode)?;
                    self.lower_ops(b, then_body, loops)?;
                    b.resolver.branch(&mut b.buf, Opcode::Jmp, end, exit_mode)?;
                    b.resolver.bind(else_label, &b.buf)?;
                    self.lower_ops(b, else_body, loops)?;
                }
                b.resolver.bind(end, &b.buf)?;
            }
            Op::While { cond, body } => {
                let top = b.resolver.label();
                let end = b.resolver.label();
                b.resolver.bind(top, &b.buf)?;
                self.lower_ops(b, cond, loops)?;
                b.resolver
                    .branch(&mut b.buf, Opcode::JmpIfNot, end, BranchMode::Auto)?;
                loops.push(LoopFrame {
                    continue_to: top,
                    break_to: end,
                });
                self.lower_ops(b, body, loops)?;
                loops.pop();
                b.resolver
                    .branch(&mut b.buf, Opcode::Jmp, top, BranchMode::Auto)?;
                b.resolver.bind(end, &b.buf)?;
            }
            Op::Break => {
                let frame = loops.last().ok_or(CompileError::BreakOutsideLoop)?;
                let target = frame.break_to;
                b.resolver
                    .branch(&mut b.buf, Opcode::Jmp, target, BranchMode::Auto)?;
            }
            Op::Continue => {
                let frame = loops.last().ok_or(CompileError::ContinueOutsideLoop)?;
                let target = frame.continue_to;
                b.resolver
                    .branch(&mut b.buf, Opcode::Jmp, target, BranchMode::Auto)?;
            }
            Op::TryCatch {
                body,
                catch,
                finally,
            } => {
                let catch_label = catch.as_ref().map(|_| b.resolver.label());
                let finally_label = finally.as_ref().map(|_| b.resolver.label());
                let end = b.resolver.label();
                b.resolver.try_region(
                    &mut b.buf,
                    catch_label,
                    finally_label,
                    BranchMode::Auto,
                )?;
                self.lower_ops(b, body, loops)?;
                b.resolver
                    .branch(&mut b.buf, Opcode::EndTry, end, BranchMode::Auto)?;
                if let (Some(ops), Some(label)) = (catch, catch_label) {
                    b.resolver.bind(label, &b.buf)?;
                    self.lower_ops(b, ops, loops)?;
                    b.resolver
                        .branch(&mut b.buf, Opcode::EndTry, end, BranchMode::Auto)?;
                }
                if let (Some(ops), Some(label)) = (finally, finally_label) {
                    b.resolver.bind(label, &b.buf)?;
                    self.lower_ops(b, ops, loops)?;
                    b.buf.emit(Opcode::EndFinally);
                }
                b.resolver.bind(end, &b.buf)?;
            }
        }
        Ok(())
    }
}

fn synthesize_initializer(first_hoist_slot: u8, total: u8, hoisted: &Hoisted) -> CodeBuffer {
    let mut buf = CodeBuffer::new();
    buf.emit_with(Opcode::InitSSlot, &[total]);
    for (i, payload) in hoisted.payloads.iter().enumerate() {
        let slot = first_hoist_slot + i as u8;
        buf.emit_raw(payload);
        emit_slot(&mut buf, Opcode::store_static(slot), slot);
    }
    buf.emit(Opcode::Ret);
    buf
}

fn emit_slot(buf: &mut CodeBuffer, op: Opcode, slot: u8) {
    match op.operand_encoding() {
        OperandEncoding::U8 => {
            buf.emit_with(op, &[slot]);
        }
        _ => {
            buf.emit(op);
        }
    }
}

fn slot_index(slot: Slot) -> u8 {
    match slot {
        Slot::Arg(i) | Slot::Local(i) | Slot::Static(i) => i,
    }
}

fn load_opcode(slot: Slot) -> Opcode {
    match slot {
        Slot::Arg(i) => Opcode::load_arg(i),
        Slot::Local(i) => Opcode::load_local(i),
        Slot::Static(i) => Opcode::load_static(i),
    }
}

fn store_opcode(slot: Slot) -> Opcode {
    match slot {
        Slot::Arg(i) => Opcode::store_arg(i),
        Slot::Local(i) => Opcode::store_local(i),
        Slot::Static(i) => Opcode::store_static(i),
    }
}

fn unary_opcode(op: UnaryOp) -> Opcode {
    match op {
        UnaryOp::Negate => Opcode::Negate,
        UnaryOp::Not => Opcode::Not,
        UnaryOp::Invert => Opcode::Invert,
        UnaryOp::Abs => Opcode::Abs,
        UnaryOp::Sign => Opcode::Sign,
        UnaryOp::Increment => Opcode::Inc,
        UnaryOp::Decrement => Opcode::Dec,
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Pow => Opcode::Pow,
        BinaryOp::BitAnd => Opcode::And,
        BinaryOp::BitOr => Opcode::Or,
        BinaryOp::BitXor => Opcode::Xor,
        BinaryOp::Shl => Opcode::Shl,
        BinaryOp::Shr => Opcode::Shr,
        BinaryOp::BoolAnd => Opcode::BoolAnd,
        BinaryOp::BoolOr => Opcode::BoolOr,
        BinaryOp::NumEqual => Opcode::NumEqual,
        BinaryOp::NumNotEqual => Opcode::NumNotEqual,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
    }
}

/// Picks the conditional-skip width: short only when the skipped span is
/// statically known to fit a one-byte displacement measured from the branch
/// opcode.
fn skip_mode(span: Option<u32>, extra: u32) -> BranchMode {
    match span {
        Some(n) if n + extra + 2 <= 127 => BranchMode::Short,
        _ => BranchMode::Auto,
    }
}

/// Statically measures the encoded length of `ops`, or `None` when the span
/// contains anything whose width is decided at emission time (calls, loops,
/// try regions, backward continues).
fn static_len(ops: &[Op]) -> Option<u32> {
    let mut n = 0u32;
    for op in ops {
        n += match op {
            Op::Push(lit) => literal_len(lit),
            Op::Load(s) | Op::Store(s) => {
                if slot_index(*s) <= 6 {
                    1
                } else {
                    2
                }
            }
            Op::Drop
            | Op::Unary(_)
            | Op::Binary(_)
            | Op::Return
            | Op::Throw
            | Op::Abort
            | Op::Assert => 1,
            // Breaks target an unbound forward label and always take the
            // pessimistic long form.
            Op::Break => 5,
            Op::Call { .. } | Op::While { .. } | Op::TryCatch { .. } | Op::Continue => {
                return None;
            }
            Op::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond_n = static_len(cond)?;
                let then_n = static_len(then_body)?;
                if else_body.is_empty() {
                    let skip = branch_width(skip_mode(Some(then_n), 0));
                    cond_n + skip + then_n
                } else {
                    let else_n = static_len(else_body)?;
                    let exit = branch_width(skip_mode(Some(else_n), 0));
                    let skip = branch_width(skip_mode(Some(then_n), exit));
                    cond_n + skip + then_n + exit + else_n
                }
            }
        };
    }
    Some(n)
}

fn branch_width(mode: BranchMode) -> u32 {
    match mode {
        BranchMode::Short => 2,
        _ => 5,
    }
}

fn literal_len(lit: &Literal) -> u32 {
    match lit {
        Literal::Int(v) => match v {
            -1..=16 => 1,
            v if i8::try_from(*v).is_ok() => 2,
            v if i16::try_from(*v).is_ok() => 3,
            v if i32::try_from(*v).is_ok() => 5,
            v if i64::try_from(*v).is_ok() => 9,
            _ => 17,
        },
        Literal::Bool(_) | Literal::Null => 1,
        Literal::Bytes(b) => data_len(b.len()),
        Literal::Str(s) => data_len(s.len()),
    }
}

fn data_len(payload: usize) -> u32 {
    let prefix = if payload <= usize::from(u8::MAX) {
        2
    } else if payload <= usize::from(u16::MAX) {
        3
    } else {
        5
    };
    prefix + payload as u32
}

#[cfg(test)]
mod tests {
    use super::{CompilationUnit, CompileError, CompileOptions};
    use crate::descriptor::{
        DescriptorCatalog, DescriptorParam, LoweringStrategy, MethodDescriptor, PackPolicy,
        ResolvedCatalog,
    };
    use crate::ir::{
        BinaryOp, ContractDef, Literal, MethodDef, Op, Param, ParamType, Slot,
    };
    use crate::opcode::Opcode;
    use crate::token::{CallFlags, ScriptHash};
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    fn method(name: &str, params: usize, locals: u8, body: Vec<Op>) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            params: (0..params)
                .map(|i| Param {
                    name: alloc::format!("p{i}"),
                    ty: ParamType::Integer,
                })
                .collect(),
            return_type: ParamType::Integer,
            locals,
            public: true,
            safe: false,
            body,
        }
    }

    fn contract(methods: Vec<MethodDef>) -> ContractDef {
        ContractDef {
            name: "example".to_string(),
            static_slots: 0,
            methods,
        }
    }

    fn empty_catalog() -> ResolvedCatalog {
        DescriptorCatalog::new().resolve().unwrap()
    }

    fn transfer_catalog() -> ResolvedCatalog {
        let mut cat = DescriptorCatalog::new();
        cat.register(MethodDescriptor {
            public_id: "token.transfer".to_string(),
            params: vec![DescriptorParam {
                name: "to".to_string(),
                ty: ParamType::Hash160,
                default_bytecode: None,
            }],
            return_type: ParamType::Boolean,
            lowering: LoweringStrategy::ContractCall {
                hash: ScriptHash([0xEE; 20]),
                method: "transfer".to_string(),
                flags: CallFlags::ALL,
                token_eligible: true,
            },
            pack: PackPolicy::Positional,
            internal_call_arity: None,
        })
        .unwrap();
        cat.resolve().unwrap()
    }

    #[test]
    fn two_arg_add_compiles_to_the_expected_frame() {
        let catalog = empty_catalog();
        let unit = CompilationUnit::new(&catalog, CompileOptions::default());
        let out = unit
            .compile(&contract(vec![method(
                "add",
                2,
                0,
                vec![
                    Op::Load(Slot::Arg(0)),
                    Op::Load(Slot::Arg(1)),
                    Op::Binary(BinaryOp::Add),
                    Op::Return,
                ],
            )]))
            .unwrap();

        assert_eq!(out.script, [0x57, 0x00, 0x02, 0x78, 0x79, 0x9E, 0x40]);
        assert_eq!(out.method_offsets, [0]);
        assert_eq!(out.manifest.abi.len(), 1);
        assert_eq!(out.manifest.abi[0].offset, 0);
    }

    #[test]
    fn if_else_takes_proven_short_branches() {
        let catalog = empty_catalog();
        let unit = CompilationUnit::new(&catalog, CompileOptions::default());
        let out = unit
            .compile(&contract(vec![method(
                "pick",
                1,
                1,
                vec![Op::If {
                    cond: vec![Op::Load(Slot::Arg(0))],
                    // Five bytes: a three-byte int push, a one-byte push,
                    // and a store.
                    then_body: vec![
                        Op::Push(Literal::Int(1000)),
                        Op::Push(Literal::Int(1)),
                        Op::Store(Slot::Local(0)),
                    ],
                    else_body: vec![Op::Push(Literal::Int(0))],
                }],
            )]))
            .unwrap();

        assert_eq!(
            out.script,
            [
                0x57, 0x01, 0x01, // initslot 1 local, 1 arg
                0x78, // ldarg0
                0x26, 0x09, // jmpifnot +9: over the then arm and its exit
                0x01, 0xE8, 0x03, // pushint16 1000
                0x11, // push1
                0x70, // stloc0
                0x22, 0x03, // jmp +3 over the else arm
                0x10, // push0
                0x40, // ret
            ]
        );
    }

    #[test]
    fn while_loop_jumps_back_short() {
        let catalog = empty_catalog();
        let unit = CompilationUnit::new(&catalog, CompileOptions::default());
        let out = unit
            .compile(&contract(vec![method(
                "spin",
                1,
                0,
                vec![Op::While {
                    cond: vec![Op::Load(Slot::Arg(0))],
                    body: vec![Op::Push(Literal::Int(1)), Op::Drop],
                }],
            )]))
            .unwrap();

        assert_eq!(
            out.script,
            [
                0x57, 0x00, 0x01, // initslot
                0x78, // ldarg0 (loop top)
                0x27, 0x09, 0x00, 0x00, 0x00, // jmpifnot_l +9 to the end
                0x11, // push1
                0x45, // drop
                0x22, 0xF8, // jmp -8 back to the top
                0x40, // ret
            ]
        );
    }

    #[test]
    fn break_and_continue_target_the_innermost_loop() {
        let catalog = empty_catalog();
        let unit = CompilationUnit::new(&catalog, CompileOptions::default());
        let out = unit
            .compile(&contract(vec![method(
                "scan",
                1,
                0,
                vec![Op::While {
                    cond: vec![Op::Load(Slot::Arg(0))],
                    body: vec![Op::If {
                        cond: vec![Op::Load(Slot::Arg(0))],
                        then_body: vec![Op::Break],
                        else_body: vec![],
                    }],
                }],
            )]))
            .unwrap();

        // The break is a pessimistic forward long jump to the loop end:
        // initslot(3) ldarg0 jmpifnot_l(5) ldarg0 jmpifnot(2) puts it at 12.
        let script = &out.script;
        let break_at = 12;
        assert_eq!(script[break_at], Opcode::JmpL.byte());
        let disp = i32::from_le_bytes([
            script[break_at + 1],
            script[break_at + 2],
            script[break_at + 3],
            script[break_at + 4],
        ]);
        let end = (break_at as i32 + disp) as usize;
        assert_eq!(script[end], Opcode::Ret.byte());
    }

    #[test]
    fn break_outside_a_loop_is_fatal() {
        let catalog = empty_catalog();
        let unit = CompilationUnit::new(&catalog, CompileOptions::default());
        let err = unit
            .compile(&contract(vec![method("bad", 0, 0, vec![Op::Break])]))
            .unwrap_err();
        assert_eq!(err, CompileError::BreakOutsideLoop);
    }

    #[test]
    fn try_with_finally_links_all_regions() {
        let catalog = empty_catalog();
        let unit = CompilationUnit::new(&catalog, CompileOptions::default());
        let out = unit
            .compile(&contract(vec![method(
                "guarded",
                0,
                0,
                vec![Op::TryCatch {
                    body: vec![Op::Push(Literal::Int(1)), Op::Drop],
                    catch: Some(vec![Op::Drop]),
                    finally: Some(vec![Op::Push(Literal::Int(0)), Op::Drop]),
                }],
            )]))
            .unwrap();

        let script = &out.script;
        assert_eq!(script[0], Opcode::TryL.byte());
        let catch_disp = i32::from_le_bytes([script[1], script[2], script[3], script[4]]);
        let finally_disp = i32::from_le_bytes([script[5], script[6], script[7], script[8]]);
        // Catch entry is a drop; finally entry is a push.
        assert_eq!(script[catch_disp as usize], Opcode::Drop.byte());
        assert_eq!(script[finally_disp as usize], Opcode::Push0.byte());
        assert_eq!(script[script.len() - 1], Opcode::Ret.byte());
        assert!(script.contains(&Opcode::EndFinally.byte()));
    }

    #[test]
    fn repeated_calls_share_one_token_and_compile_deterministically() {
        let catalog = transfer_catalog();
        let call = Op::Call {
            callee: catalog_id(&catalog),
            args: vec![vec![Op::Load(Slot::Arg(0))]],
        };
        let body = vec![call.clone(), Op::Drop, call, Op::Drop, Op::Return];
        let input = contract(vec![method("pay", 1, 0, body)]);

        let a = CompilationUnit::new(&catalog, CompileOptions::default())
            .compile(&input)
            .unwrap();
        let b = CompilationUnit::new(&catalog, CompileOptions::default())
            .compile(&input)
            .unwrap();

        assert_eq!(a.script, b.script);
        assert_eq!(a.tokens.len(), 1);
        assert_eq!(a.tokens[0].method, "transfer");
        // The second call site is the 3-byte token form.
        let callt = [Opcode::CallT.byte(), 0x00, 0x00];
        assert!(a.script.windows(3).any(|w| w == callt));
        assert_eq!(a.manifest.permissions.entries().len(), 1);
    }

    fn catalog_id(catalog: &ResolvedCatalog) -> crate::descriptor::DescriptorId {
        assert_eq!(catalog.len(), 1);
        crate::descriptor::DescriptorId(0)
    }

    #[test]
    fn hoisting_is_a_pure_encoding_change_when_nothing_recurs() {
        let catalog = transfer_catalog();
        let call = Op::Call {
            callee: crate::descriptor::DescriptorId(0),
            args: vec![vec![Op::Load(Slot::Arg(0))]],
        };
        // Body a inlines the preamble once; body b's call takes the token
        // form, so no payload recurs and the pass changes nothing.
        let input = ContractDef {
            name: "example".to_string(),
            static_slots: 0,
            methods: vec![
                method("a", 1, 0, vec![call.clone(), Op::Drop, Op::Return]),
                method("b", 1, 0, vec![call, Op::Drop, Op::Return]),
            ],
        };

        let with = CompilationUnit::new(&catalog, CompileOptions::default())
            .compile(&input)
            .unwrap();
        let without = CompilationUnit::new(
            &catalog,
            CompileOptions {
                hoist_duplicate_preambles: false,
            },
        )
        .compile(&input)
        .unwrap();

        assert_eq!(with.script, without.script);
        assert!(without.manifest.abi.iter().all(|m| m.name != "_initialize"));
    }

    #[test]
    fn recurring_inline_preambles_hoist_into_an_initializer() {
        // A token-ineligible call inlines its preamble at every site, so
        // two bodies produce recurring name and hash pushes.
        let mut cat = DescriptorCatalog::new();
        cat.register(MethodDescriptor {
            public_id: "native.notify".to_string(),
            params: vec![],
            return_type: ParamType::Void,
            lowering: LoweringStrategy::ContractCall {
                hash: ScriptHash([0xEE; 20]),
                method: "transfer".to_string(),
                flags: CallFlags::ALL,
                token_eligible: false,
            },
            pack: PackPolicy::Positional,
            internal_call_arity: None,
        })
        .unwrap();
        let catalog = cat.resolve().unwrap();

        let call = Op::Call {
            callee: crate::descriptor::DescriptorId(0),
            args: vec![],
        };
        let input = contract(vec![
            method("a", 0, 0, vec![call.clone(), Op::Return]),
            method("b", 0, 0, vec![call, Op::Return]),
        ]);

        let with = CompilationUnit::new(&catalog, CompileOptions::default())
            .compile(&input)
            .unwrap();
        let without = CompilationUnit::new(
            &catalog,
            CompileOptions {
                hoist_duplicate_preambles: false,
            },
        )
        .compile(&input)
        .unwrap();

        // Name and hash pushes hoist into slots 0 and 1.
        assert_eq!(&with.script[..2], &[0x56, 0x02]);
        assert!(with.script.len() < without.script.len());
        assert!(with.script.windows(2).any(|w| w == [0x58, 0x59]));
        let init = with
            .manifest
            .abi
            .iter()
            .find(|m| m.name == "_initialize")
            .unwrap();
        assert_eq!(init.offset, 0);
        assert!(with.tokens.is_empty());
    }

    #[test]
    fn static_slots_get_an_initializer_method() {
        let catalog = empty_catalog();
        let input = ContractDef {
            name: "example".to_string(),
            static_slots: 1,
            methods: vec![method(
                "set",
                0,
                0,
                vec![
                    Op::Push(Literal::Int(5)),
                    Op::Store(Slot::Static(0)),
                    Op::Return,
                ],
            )],
        };
        let out = CompilationUnit::new(&catalog, CompileOptions::default())
            .compile(&input)
            .unwrap();

        // initsslot 1; ret; then the method at offset 3.
        assert_eq!(&out.script[..3], &[0x56, 0x01, 0x40]);
        assert_eq!(out.method_offsets, [3]);
        let init = out
            .manifest
            .abi
            .iter()
            .find(|m| m.name == "_initialize")
            .unwrap();
        assert_eq!(init.offset, 0);
        assert_eq!(out.script[3..], [0x15, 0x60, 0x40]);
    }
}
