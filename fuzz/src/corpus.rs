//! AST corpus loading.
//!
//! A corpus file holds one JSON-encoded [`Ast`] per line. Blank lines and
//! lines starting with `#` are ignored.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use linfuzz_dtype::ScalarDType;
use linfuzz_ir::{Ast, BinaryOp, BufferDecl, Expr, Reduce, ReduceOp, UnaryOp, Variable};
use snafu::ResultExt;

use crate::error::*;

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    asts: Vec<Arc<Ast>>,
}

impl Corpus {
    pub fn new(asts: impl IntoIterator<Item = Ast>) -> Self {
        Self { asts: asts.into_iter().map(Arc::new).collect() }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(ReadCorpusSnafu { path })?;
        let corpus = Self::parse(&text)?;
        tracing::info!(path = %path.display(), asts = corpus.len(), "corpus loaded");
        Ok(corpus)
    }

    /// Parse and validate JSON lines. Line numbers in errors are 1-based.
    pub fn parse(text: &str) -> Result<Self> {
        let mut asts = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let ast: Ast = serde_json::from_str(line).context(ParseAstSnafu { line: line_no })?;
            ast.validate().context(InvalidAstSnafu { line: line_no })?;
            asts.push(Arc::new(ast));
        }
        Ok(Self { asts })
    }

    /// A small corpus covering elementwise, broadcast, reduction, variable
    /// and image kernels, plus one kernel large enough to exercise size gating.
    pub fn builtin() -> Self {
        let f32 = ScalarDType::Float32;
        let sum = |dims: &[usize]| Some(Reduce { op: ReduceOp::Sum, dims: dims.iter().copied().collect() });

        Self::new([
            Ast {
                name: "add".into(),
                shape: vec![16],
                reduce: None,
                inputs: vec![BufferDecl::new(f32, 16), BufferDecl::new(f32, 16)],
                output: f32,
                vars: vec![],
                expr: Expr::add(Expr::load(1, [1]), Expr::load(2, [1])),
            },
            Ast {
                name: "bcast_mul".into(),
                shape: vec![8, 16],
                reduce: None,
                inputs: vec![BufferDecl::new(f32, 128), BufferDecl::new(f32, 16)],
                output: f32,
                vars: vec![],
                expr: Expr::mul(Expr::load(1, [16, 1]), Expr::load(2, [0, 1])),
            },
            Ast {
                name: "row_sum".into(),
                shape: vec![8, 16],
                reduce: sum(&[1]),
                inputs: vec![BufferDecl::new(f32, 128)],
                output: f32,
                vars: vec![],
                expr: Expr::load(1, [16, 1]),
            },
            Ast {
                name: "col_max".into(),
                shape: vec![32, 4],
                reduce: Some(Reduce { op: ReduceOp::Max, dims: BTreeSet::from([0]) }),
                inputs: vec![BufferDecl::new(f32, 128)],
                output: f32,
                vars: vec![],
                expr: Expr::unary(UnaryOp::Exp2, Expr::load(1, [4, 1])),
            },
            Ast {
                name: "matmul".into(),
                shape: vec![8, 8, 8],
                reduce: sum(&[2]),
                inputs: vec![BufferDecl::new(f32, 64), BufferDecl::new(f32, 64)],
                output: f32,
                vars: vec![],
                expr: Expr::mul(Expr::load(1, [8, 0, 1]), Expr::load(2, [0, 1, 8])),
            },
            Ast {
                name: "scaled_add".into(),
                shape: vec![4, 8],
                reduce: None,
                inputs: vec![BufferDecl::new(f32, 32), BufferDecl::new(f32, 32)],
                output: f32,
                vars: vec![Variable::new("n", 1, 4)],
                expr: Expr::add(Expr::mul(Expr::load(1, [8, 1]), Expr::var("n")), Expr::load(2, [8, 1])),
            },
            Ast {
                name: "int_relu".into(),
                shape: vec![24],
                reduce: None,
                inputs: vec![BufferDecl::new(ScalarDType::Int32, 24)],
                output: ScalarDType::Int32,
                vars: vec![],
                expr: Expr::binary(BinaryOp::Max, Expr::load(1, [1]), Expr::constant(0i32)),
            },
            Ast {
                name: "image_add".into(),
                shape: vec![4, 8],
                reduce: None,
                inputs: vec![BufferDecl::image(32)],
                output: f32,
                vars: vec![],
                expr: Expr::add(Expr::load(1, [8, 1]), Expr::constant(1.0f32)),
            },
            Ast {
                name: "large_sum".into(),
                shape: vec![256, 256],
                reduce: sum(&[1]),
                inputs: vec![BufferDecl::new(f32, 65536)],
                output: f32,
                vars: vec![],
                expr: Expr::load(1, [256, 1]),
            },
        ])
    }

    pub fn asts(&self) -> &[Arc<Ast>] {
        &self.asts
    }

    pub fn len(&self) -> usize {
        self.asts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asts.is_empty()
    }
}
