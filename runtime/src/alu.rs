//! Scalar arithmetic with C semantics for every supported dtype.
//!
//! Results are always rounded to the instruction dtype, so float32 programs
//! accumulate float32 rounding error the way native code would.

use linfuzz_dtype::{ConstValue, ScalarDType};
use linfuzz_ir::{BinaryOp, UnaryOp};

pub fn unary(op: UnaryOp, dtype: ScalarDType, x: ConstValue) -> ConstValue {
    if !dtype.is_float() && op == UnaryOp::Neg {
        return ConstValue::Int(x.as_i64().wrapping_neg()).cast(dtype);
    }
    let x = x.as_f64();
    let value = match op {
        UnaryOp::Neg => -x,
        UnaryOp::Sqrt => x.sqrt(),
        UnaryOp::Exp2 => x.exp2(),
        UnaryOp::Recip => 1.0 / x,
    };
    ConstValue::Float(value).cast(dtype)
}

pub fn binary(op: BinaryOp, dtype: ScalarDType, lhs: ConstValue, rhs: ConstValue) -> ConstValue {
    if op == BinaryOp::CmpLt {
        let less = match (lhs, rhs) {
            (ConstValue::Float(_), _) | (_, ConstValue::Float(_)) => lhs.as_f64() < rhs.as_f64(),
            _ => lhs.as_i64() < rhs.as_i64(),
        };
        return ConstValue::Bool(less);
    }

    if dtype.is_float() {
        let (a, b) = (lhs.as_f64(), rhs.as_f64());
        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Max => a.max(b),
            BinaryOp::CmpLt => unreachable!(),
        };
        return ConstValue::Float(value).cast(dtype);
    }

    if dtype.is_bool() {
        let (a, b) = (lhs.as_bool(), rhs.as_bool());
        let value = match op {
            BinaryOp::Add | BinaryOp::Max => a | b,
            BinaryOp::Mul => a & b,
            BinaryOp::Sub => a ^ b,
            BinaryOp::CmpLt => unreachable!(),
        };
        return ConstValue::Bool(value);
    }

    let (a, b) = (lhs.as_i64(), rhs.as_i64());
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Max => a.max(b),
        BinaryOp::CmpLt => unreachable!(),
    };
    ConstValue::Int(value).cast(dtype)
}
