//! Computation description consumed by the kernel layer.
//!
//! An [`Ast`] is a single-output loop nest: every point of `shape` evaluates
//! `expr`, reduce dimensions fold into one output element, and the remaining
//! dimensions address the output contiguously (row-major).

use std::collections::BTreeSet;
use std::fmt;

use linfuzz_dtype::{ConstValue, DType, ScalarDType};
use snafu::ensure;

use crate::error::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOp {
    Neg,
    Sqrt,
    Exp2,
    Recip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Max,
    CmpLt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ReduceOp {
    Sum,
    Max,
}

impl ReduceOp {
    /// Binary operation that folds one more element into the accumulator.
    pub const fn combine(&self) -> BinaryOp {
        match self {
            Self::Sum => BinaryOp::Add,
            Self::Max => BinaryOp::Max,
        }
    }

    /// Accumulator start value for `dtype`.
    pub fn identity(&self, dtype: ScalarDType) -> ConstValue {
        match self {
            Self::Sum => ConstValue::zero(dtype),
            Self::Max if dtype.is_float() => ConstValue::Float(f64::NEG_INFINITY),
            Self::Max if dtype.is_bool() => ConstValue::Bool(false),
            Self::Max if dtype.is_unsigned() => ConstValue::Int(0),
            Self::Max if dtype == ScalarDType::Int32 => ConstValue::Int(i64::from(i32::MIN)),
            Self::Max => ConstValue::Int(i64::MIN),
        }
    }
}

/// Expression evaluated at every point of the iteration space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Read input buffer `buf` (1-based; buffer 0 is the output) at
    /// `sum(idx[d] * strides[d])`. A zero stride broadcasts along `d`.
    Load { buf: usize, strides: Vec<usize> },
    Const(ConstValue),
    /// Free variable, bound at execution time.
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn load(buf: usize, strides: impl Into<Vec<usize>>) -> Self {
        Self::Load { buf, strides: strides.into() }
    }

    pub fn constant(value: impl Into<ConstValue>) -> Self {
        Self::Const(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn unary(op: UnaryOp, src: Expr) -> Self {
        Self::Unary(op, Box::new(src))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Mul, lhs, rhs)
    }

    /// Result dtype of this expression inside `ast`.
    pub fn dtype(&self, ast: &Ast) -> ScalarDType {
        match self {
            Self::Load { buf, .. } => ast.inputs.get(buf.wrapping_sub(1)).map_or(ScalarDType::Float32, |b| b.dtype.base()),
            Self::Const(ConstValue::Float(_)) => ScalarDType::Float32,
            Self::Const(ConstValue::Int(_)) => ScalarDType::Int32,
            Self::Const(ConstValue::Bool(_)) => ScalarDType::Bool,
            Self::Var(_) => ScalarDType::Int32,
            Self::Unary(_, src) => match src.dtype(ast) {
                dt if dt.is_float() => dt,
                _ => ScalarDType::Float32,
            },
            Self::Binary(BinaryOp::CmpLt, _, _) => ScalarDType::Bool,
            Self::Binary(_, lhs, rhs) => promote(lhs.dtype(ast), rhs.dtype(ast)),
        }
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Self::Unary(_, src) => src.walk(visit),
            Self::Binary(_, lhs, rhs) => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            Self::Load { .. } | Self::Const(_) | Self::Var(_) => {}
        }
    }
}

/// Common dtype of two operands: floats win over ints, ints over bools, wider over narrower.
pub fn promote(lhs: ScalarDType, rhs: ScalarDType) -> ScalarDType {
    fn rank(dt: ScalarDType) -> u8 {
        match dt {
            ScalarDType::Void => 0,
            ScalarDType::Bool => 1,
            ScalarDType::UInt8 => 2,
            ScalarDType::Int32 => 3,
            ScalarDType::Int64 | ScalarDType::Index => 4,
            ScalarDType::Float32 => 5,
            ScalarDType::Float64 => 6,
        }
    }
    if rank(lhs) >= rank(rhs) { lhs } else { rhs }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { buf, strides } => write!(f, "buf{buf}{strides:?}"),
            Self::Const(v) => write!(f, "{v}"),
            Self::Var(name) => write!(f, "{name}"),
            Self::Unary(op, src) => write!(f, "{op}({src})"),
            Self::Binary(op, lhs, rhs) => write!(f, "{op}({lhs}, {rhs})"),
        }
    }
}

/// Input buffer declaration. Positional: the first declaration is buffer 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BufferDecl {
    pub dtype: DType,
    pub size: usize,
}

impl BufferDecl {
    pub fn new(dtype: impl Into<DType>, size: usize) -> Self {
        Self { dtype: dtype.into(), size }
    }

    pub fn image(size: usize) -> Self {
        Self { dtype: DType::Image, size }
    }
}

/// Free integer variable with an inclusive domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Variable {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

impl Variable {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self { name: name.into(), min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Reduce {
    pub op: ReduceOp,
    pub dims: BTreeSet<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Ast {
    pub name: String,
    /// Full iteration shape.
    pub shape: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<Reduce>,
    pub inputs: Vec<BufferDecl>,
    pub output: ScalarDType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<Variable>,
    pub expr: Expr,
}

impl Ast {
    /// Check structural consistency: buffers, strides, reduce dims and variables.
    pub fn validate(&self) -> Result<(), AstError> {
        ensure!(self.shape.iter().all(|&s| s > 0), EmptyShapeSnafu);

        let output = DType::Scalar(self.output);
        ensure!(is_storable(output), UnsupportedDTypeSnafu { buf: 0usize, dtype: output });
        for (i, decl) in self.inputs.iter().enumerate() {
            ensure!(is_storable(decl.dtype), UnsupportedDTypeSnafu { buf: i + 1, dtype: decl.dtype });
        }

        if let Some(reduce) = &self.reduce {
            for &dim in &reduce.dims {
                ensure!(dim < self.shape.len(), ReduceDimOutOfRangeSnafu { dim, rank: self.shape.len() });
            }
        }

        for var in &self.vars {
            ensure!(var.min <= var.max, EmptyDomainSnafu { name: var.name.clone(), min: var.min, max: var.max });
        }

        let mut result = Ok(());
        self.expr.walk(&mut |node| {
            if result.is_err() {
                return;
            }
            result = self.validate_node(node);
        });
        result
    }

    fn validate_node(&self, node: &Expr) -> Result<(), AstError> {
        match node {
            Expr::Load { buf, strides } => {
                let count = self.inputs.len();
                ensure!(*buf >= 1 && *buf <= count, UnknownBufferSnafu { buf: *buf, count });
                let (expected, actual) = (self.shape.len(), strides.len());
                ensure!(expected == actual, StrideRankSnafu { buf: *buf, expected, actual });

                let index: usize = self.shape.iter().zip(strides).map(|(s, st)| (s - 1) * st).sum();
                let size = self.inputs[buf - 1].size;
                ensure!(index < size, LoadOutOfBoundsSnafu { buf: *buf, index, size });
                Ok(())
            }
            Expr::Var(name) => {
                ensure!(self.vars.iter().any(|v| &v.name == name), UndeclaredVariableSnafu { name: name.clone() });
                Ok(())
            }
            Expr::Const(_) | Expr::Unary(..) | Expr::Binary(..) => Ok(()),
        }
    }

    pub fn is_reduce_dim(&self, dim: usize) -> bool {
        self.reduce.as_ref().is_some_and(|r| r.dims.contains(&dim))
    }

    /// Shape of the output: the full shape without reduce dimensions.
    pub fn output_shape(&self) -> Vec<usize> {
        self.shape.iter().enumerate().filter(|(d, _)| !self.is_reduce_dim(*d)).map(|(_, &s)| s).collect()
    }

    /// Number of output elements.
    pub fn output_size(&self) -> usize {
        self.output_shape().iter().product()
    }

    /// Row-major output stride of every full-shape dimension (0 for reduce dimensions).
    pub fn output_strides(&self) -> Vec<usize> {
        let mut strides = vec![0; self.shape.len()];
        let mut acc = 1;
        for d in (0..self.shape.len()).rev() {
            if !self.is_reduce_dim(d) {
                strides[d] = acc;
                acc *= self.shape[d];
            }
        }
        strides
    }

    /// Total work: number of points in the iteration space.
    pub fn work_size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn requires_images(&self) -> bool {
        self.inputs.iter().any(|b| b.dtype.is_image())
    }

    /// Image buffer indices (1-based, matching [`Expr::Load::buf`]).
    pub fn image_buffers(&self) -> impl Iterator<Item = usize> + '_ {
        self.inputs.iter().enumerate().filter(|(_, b)| b.dtype.is_image()).map(|(i, _)| i + 1)
    }

    /// Multi-line human readable rendering.
    pub fn tree(&self) -> String {
        let mut out = format!("{} shape={:?}", self.name, self.shape);
        if let Some(reduce) = &self.reduce {
            out.push_str(&format!(" reduce={}{:?}", reduce.op, reduce.dims));
        }
        for (i, buf) in self.inputs.iter().enumerate() {
            out.push_str(&format!("\n  buf{}: {}[{}]", i + 1, buf.dtype, buf.size));
        }
        for var in &self.vars {
            out.push_str(&format!("\n  var {}: [{}, {}]", var.name, var.min, var.max));
        }
        out.push_str(&format!("\n  out: {}[{}] = {}", self.output, self.output_size(), self.expr));
        out
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?} = ", self.name, self.shape)?;
        match &self.reduce {
            Some(reduce) => write!(f, "{}{:?}({})", reduce.op, reduce.dims, self.expr),
            None => write!(f, "{}", self.expr),
        }
    }
}

/// Element types a positional buffer can hold: value scalars and images.
fn is_storable(dtype: DType) -> bool {
    match dtype {
        DType::Scalar(s) => !matches!(s, ScalarDType::Void | ScalarDType::Index),
        DType::Image => true,
        DType::Ptr { .. } => false,
    }
}
