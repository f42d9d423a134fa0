//! AST builders shared by the unit tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use linfuzz_dtype::ScalarDType;

use crate::*;

/// `out[i] = a[i] + b[i]` over `n` float elements.
pub fn add_ast(n: usize) -> Arc<Ast> {
    Arc::new(Ast {
        name: format!("add{n}"),
        shape: vec![n],
        reduce: None,
        inputs: vec![BufferDecl::new(ScalarDType::Float32, n), BufferDecl::new(ScalarDType::Float32, n)],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::add(Expr::load(1, [1]), Expr::load(2, [1])),
    })
}

/// `out[i, j] = a[i, j] * b[j]` (broadcast along rows).
pub fn broadcast_ast(rows: usize, cols: usize) -> Arc<Ast> {
    Arc::new(Ast {
        name: "bcast_mul".into(),
        shape: vec![rows, cols],
        reduce: None,
        inputs: vec![
            BufferDecl::new(ScalarDType::Float32, rows * cols),
            BufferDecl::new(ScalarDType::Float32, cols),
        ],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::mul(Expr::load(1, [cols, 1]), Expr::load(2, [0, 1])),
    })
}

/// `out[i] = sum_j a[i, j]`.
pub fn sum_ast(rows: usize, cols: usize) -> Arc<Ast> {
    Arc::new(Ast {
        name: "row_sum".into(),
        shape: vec![rows, cols],
        reduce: Some(Reduce { op: ReduceOp::Sum, dims: BTreeSet::from([1]) }),
        inputs: vec![BufferDecl::new(ScalarDType::Float32, rows * cols)],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::load(1, [cols, 1]),
    })
}

/// `out[i] = a[i] * n` with `n` a free variable.
pub fn scaled_ast(len: usize) -> Arc<Ast> {
    Arc::new(Ast {
        name: "scale".into(),
        shape: vec![len],
        reduce: None,
        inputs: vec![BufferDecl::new(ScalarDType::Float32, len)],
        output: ScalarDType::Float32,
        vars: vec![Variable::new("n", 1, 8)],
        expr: Expr::mul(Expr::load(1, [1]), Expr::var("n")),
    })
}

/// `out[i, j] = img[i, j] + 1` reading an image input.
pub fn image_ast(rows: usize, cols: usize) -> Arc<Ast> {
    Arc::new(Ast {
        name: "image_add".into(),
        shape: vec![rows, cols],
        reduce: None,
        inputs: vec![BufferDecl::image(rows * cols)],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::add(Expr::load(1, [cols, 1]), Expr::constant(1.0f32)),
    })
}
