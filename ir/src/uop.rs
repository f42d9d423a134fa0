//! Linear instruction type.
//!
//! Operands are positions in the enclosing instruction sequence, never
//! pointers or ids, so two sequences are equal exactly when they describe the
//! same program.

use std::fmt;

use linfuzz_dtype::{ConstValue, DType};
use smallvec::SmallVec;

use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ops {
    /// Positional kernel parameter; `arg` is [`Arg::Buffer`].
    DefineGlobal,
    /// Scalar kernel parameter; `arg` is [`Arg::Var`].
    DefineVar,
    /// Register accumulator, reset to `arg` each time it executes.
    DefineAcc,
    Const,
    /// Loop header; `src[0]` is the trip count.
    Range,
    /// Loop footer; `src[0]` is the matching [`Ops::Range`].
    EndRange,
    /// `src = [buffer, index]`.
    Load,
    /// `src = [buffer, index, value]`.
    Store,
    /// `src = [accumulator, value]`.
    Assign,
    Cast,
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl Ops {
    /// Whether two instructions with equal fields always produce the same value
    /// and can therefore share one slot.
    pub const fn is_pure(&self) -> bool {
        matches!(self, Self::DefineGlobal | Self::DefineVar | Self::Const | Self::Cast | Self::Unary(_) | Self::Binary(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arg {
    None,
    Buffer(usize),
    Var(String),
    Value(ConstValue),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UOp {
    pub op: Ops,
    pub dtype: DType,
    pub src: SmallVec<[usize; 3]>,
    pub arg: Arg,
}

impl UOp {
    pub fn new(op: Ops, dtype: DType, src: &[usize], arg: Arg) -> Self {
        Self { op, dtype, src: SmallVec::from_slice(src), arg }
    }
}

impl fmt::Display for UOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<14} {:<16} {:?}", format!("{:?}", self.op), self.dtype.to_string(), self.src.as_slice())?;
        match &self.arg {
            Arg::None => Ok(()),
            Arg::Buffer(i) => write!(f, " buf{i}"),
            Arg::Var(name) => write!(f, " {name}"),
            Arg::Value(v) => write!(f, " {v}"),
        }
    }
}
