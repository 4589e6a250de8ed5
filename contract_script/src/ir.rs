// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The input surface: an ordered tree of semantic operations per method.
//!
//! The front end has already resolved names, types, and overloads; this crate
//! treats the tree as trusted and does not re-validate it. Nested bodies
//! (`If`, `While`, `TryCatch`, call arguments) are owned sub-sequences so the
//! lowering stage can order and measure them freely.

use alloc::string::String;
use alloc::vec::Vec;

use crate::descriptor::DescriptorId;

/// A parameter or return type in the target VM's type system.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ParamType {
    /// Any stack item.
    Any,
    /// Boolean.
    Boolean,
    /// Arbitrary-precision integer.
    Integer,
    /// Immutable byte string.
    ByteString,
    /// UTF-8 string.
    String,
    /// 160-bit hash (contract or account).
    Hash160,
    /// 256-bit hash.
    Hash256,
    /// Elliptic-curve public key.
    PublicKey,
    /// Signature bytes.
    Signature,
    /// Array of stack items.
    Array,
    /// Key-value map.
    Map,
    /// Opaque interop handle.
    InteropInterface,
    /// No value (return type only).
    Void,
}

/// A literal value pushed onto the evaluation stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    /// Signed integer, widened by the emitter to the narrowest push form.
    Int(i128),
    /// Boolean.
    Bool(bool),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTF-8 string (pushed as its byte encoding).
    Str(String),
    /// The null item.
    Null,
}

impl From<i128> for Literal {
    fn from(v: i128) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Self::Str(String::from(v))
    }
}

/// A storage slot within a method frame or the contract's static area.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Argument slot of the current frame.
    Arg(u8),
    /// Local slot of the current frame.
    Local(u8),
    /// Contract-level static slot.
    Static(u8),
}

/// A unary stack operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Negate,
    /// Boolean negation.
    Not,
    /// Bitwise complement.
    Invert,
    /// Absolute value.
    Abs,
    /// Sign (-1, 0, 1).
    Sign,
    /// Add one.
    Increment,
    /// Subtract one.
    Decrement,
}

/// A binary stack operator. Both operands are already on the stack,
/// left below right.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Truncated division.
    Div,
    /// Remainder.
    Mod,
    /// Exponentiation.
    Pow,
    /// Bitwise and.
    BitAnd,
    /// Bitwise or.
    BitOr,
    /// Bitwise xor.
    BitXor,
    /// Left shift.
    Shl,
    /// Arithmetic right shift.
    Shr,
    /// Boolean and.
    BoolAnd,
    /// Boolean or.
    BoolOr,
    /// Numeric equality.
    NumEqual,
    /// Numeric inequality.
    NumNotEqual,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

/// One semantic operation. Sequences of these form method bodies and the
/// nested bodies of structured constructs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Push a literal.
    Push(Literal),
    /// Load a slot onto the stack.
    Load(Slot),
    /// Store the top of stack into a slot.
    Store(Slot),
    /// Pop the top of stack.
    Drop,
    /// Apply a unary operator.
    Unary(UnaryOp),
    /// Apply a binary operator.
    Binary(BinaryOp),
    /// Call a catalog descriptor. Each argument is its own operation
    /// sequence, in source order; the call convention decides emission
    /// order and packing.
    Call {
        /// The resolved descriptor to call.
        callee: DescriptorId,
        /// Source-order argument expressions.
        args: Vec<Vec<Op>>,
    },
    /// Return from the method (the value, if any, is on the stack).
    Return,
    /// Throw the top of stack as an exception.
    Throw,
    /// Abort execution unconditionally.
    Abort,
    /// Abort execution unless the top of stack is true.
    Assert,
    /// Two-armed conditional. Either arm may be empty.
    If {
        /// Condition expression, leaves a boolean on the stack.
        cond: Vec<Op>,
        /// Taken when the condition is true.
        then_body: Vec<Op>,
        /// Taken when the condition is false.
        else_body: Vec<Op>,
    },
    /// Pre-tested loop.
    While {
        /// Condition expression, leaves a boolean on the stack.
        cond: Vec<Op>,
        /// Loop body.
        body: Vec<Op>,
    },
    /// Jump past the innermost enclosing loop.
    Break,
    /// Jump to the condition of the innermost enclosing loop.
    Continue,
    /// Protected region with optional handlers. At least one of `catch` and
    /// `finally` is present in well-formed input.
    TryCatch {
        /// Protected body.
        body: Vec<Op>,
        /// Catch handler; the thrown value is on the stack on entry.
        catch: Option<Vec<Op>>,
        /// Finally handler.
        finally: Option<Vec<Op>>,
    },
}

/// A named, typed method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, surfaced in the ABI.
    pub name: String,
    /// Parameter type.
    pub ty: ParamType,
}

/// One method of a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    /// Method name, surfaced in the ABI for public methods.
    pub name: String,
    /// Declared parameters, in order.
    pub params: Vec<Param>,
    /// Return type (`Void` when the method returns nothing).
    pub return_type: ParamType,
    /// Number of local slots the body uses.
    pub locals: u8,
    /// Whether the method appears in the public ABI.
    pub public: bool,
    /// Whether the method is side-effect free (ABI metadata only).
    pub safe: bool,
    /// The method body.
    pub body: Vec<Op>,
}

impl MethodDef {
    /// Returns the declared argument count.
    #[must_use]
    pub fn arity(&self) -> u8 {
        self.params.len() as u8
    }

    /// Returns true if the body needs a frame (any locals or arguments).
    #[must_use]
    pub fn needs_slots(&self) -> bool {
        self.locals > 0 || !self.params.is_empty()
    }
}

/// A whole contract handed over by the front end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractDef {
    /// Contract name, surfaced in the artifact's compiler metadata.
    pub name: String,
    /// Number of contract-level static slots the methods use.
    pub static_slots: u8,
    /// Methods in declaration order; declaration order fixes layout.
    pub methods: Vec<MethodDef>,
}

#[cfg(test)]
mod tests {
    use super::{ContractDef, Literal, MethodDef, Op, Param, ParamType, Slot};
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn method_arity_and_frame_needs() {
        let m = MethodDef {
            name: "add".to_string(),
            params: vec![
                Param { name: "a".to_string(), ty: ParamType::Integer },
                Param { name: "b".to_string(), ty: ParamType::Integer },
            ],
            return_type: ParamType::Integer,
            locals: 0,
            public: true,
            safe: true,
            body: vec![
                Op::Load(Slot::Arg(0)),
                Op::Load(Slot::Arg(1)),
                Op::Binary(super::BinaryOp::Add),
                Op::Return,
            ],
        };
        assert_eq!(m.arity(), 2);
        assert!(m.needs_slots());

        let empty = MethodDef {
            name: "noop".to_string(),
            params: vec![],
            return_type: ParamType::Void,
            locals: 0,
            public: false,
            safe: false,
            body: vec![Op::Return],
        };
        assert!(!empty.needs_slots());

        let c = ContractDef {
            name: "example".to_string(),
            static_slots: 0,
            methods: vec![m, empty],
        };
        assert_eq!(c.methods.len(), 2);
    }

    #[test]
    fn literal_conversions() {
        assert_eq!(Literal::from(42i128), Literal::Int(42));
        assert_eq!(Literal::from(true), Literal::Bool(true));
        assert_eq!(Literal::from("hi"), Literal::Str("hi".to_string()));
    }
}
