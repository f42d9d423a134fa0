//! Kernel to linear instruction sequence lowering.
//!
//! Global and local axes become loops around the whole body, reduce axes
//! become loops around the accumulation, and upcast/unroll axes are expanded
//! into one copy of the body per index combination. Pure instructions are
//! shared (hash-consed) so structurally identical kernels linearize to
//! identical sequences.

use std::collections::HashMap;

use itertools::Itertools;
use linfuzz_dtype::{AddrSpace, ConstValue, DType, ScalarDType};

use crate::ast::{Ast, BinaryOp, Expr, promote};
use crate::kernel::{AxisType, Kernel};
use crate::uop::{Arg, Ops, UOp};

/// Lower `kernel` into its instruction sequence.
#[tracing::instrument(skip_all, fields(kernel = %kernel))]
pub fn linearize(kernel: &Kernel) -> Vec<UOp> {
    let ast = kernel.ast().as_ref();
    let mut b = Builder::default();

    let out_dtype = DType::Scalar(ast.output).ptr(AddrSpace::Global);
    let mut globals = vec![b.push(UOp::new(Ops::DefineGlobal, out_dtype, &[], Arg::Buffer(0)))];
    for (i, decl) in ast.inputs.iter().enumerate() {
        let dtype = if decl.dtype.is_image() { DType::Image } else { decl.dtype.ptr(AddrSpace::Global) };
        globals.push(b.push(UOp::new(Ops::DefineGlobal, dtype, &[], Arg::Buffer(i + 1))));
    }
    let vars: HashMap<&str, usize> = ast
        .vars
        .iter()
        .map(|v| (v.name.as_str(), b.push(UOp::new(Ops::DefineVar, DType::Int32, &[], Arg::Var(v.name.clone())))))
        .collect();

    let axes = kernel.axes();
    let mut base = vec![AxisIndex::Fixed(0); axes.len()];
    let outer = b.open_loops(axes, &mut base, |k| matches!(k, AxisType::Global | AxisType::Local));

    let upcasts = combos(axes, AxisType::Upcast);
    let out_strides = ast.output_strides();
    let ctx = Ctx { ast, globals: &globals, vars: &vars };

    match &ast.reduce {
        Some(reduce) => {
            let out = ast.output;
            let init = reduce.op.identity(out);
            let accs: Vec<usize> = upcasts
                .iter()
                .map(|_| b.push_raw(UOp::new(Ops::DefineAcc, DType::Scalar(out), &[], Arg::Value(init))))
                .collect();

            let inner = b.open_loops(axes, &mut base, |k| k == AxisType::Reduce);
            let unrolls = combos(axes, AxisType::Unroll);
            for (acc, upcast) in accs.iter().zip(&upcasts) {
                for unroll in &unrolls {
                    let idx = bind(&base, upcast, unroll);
                    let (val, dtype) = b.expr(&ctx, &idx, kernel, &ast.expr);
                    let val = b.cast(val, dtype, out);
                    let combined =
                        b.push_raw(UOp::new(Ops::Binary(reduce.op.combine()), DType::Scalar(out), &[*acc, val], Arg::None));
                    b.push_raw(UOp::new(Ops::Assign, DType::Void, &[*acc, combined], Arg::None));
                }
            }
            b.close_loops(&inner);

            for (acc, upcast) in accs.iter().zip(&upcasts) {
                let idx = bind(&base, upcast, &[]);
                let offset = b.linear_index(kernel, &idx, &out_strides);
                b.push_raw(UOp::new(Ops::Store, DType::Void, &[globals[0], offset, *acc], Arg::None));
            }
        }
        None => {
            for upcast in &upcasts {
                let idx = bind(&base, upcast, &[]);
                let (val, dtype) = b.expr(&ctx, &idx, kernel, &ast.expr);
                let val = b.cast(val, dtype, ast.output);
                let offset = b.linear_index(kernel, &idx, &out_strides);
                b.push_raw(UOp::new(Ops::Store, DType::Void, &[globals[0], offset, val], Arg::None));
            }
        }
    }

    b.close_loops(&outer);
    tracing::trace!(uops = b.uops.len(), "linearized");
    b.uops
}

/// How an axis index is known at a program point.
#[derive(Debug, Clone, Copy)]
enum AxisIndex {
    /// Loop counter held by the instruction at this position.
    Loop(usize),
    /// Compile-time constant (expanded axis).
    Fixed(usize),
}

/// Index assignments for expanded axes: `(axis position, value)` pairs.
type Combo = Vec<(usize, usize)>;

fn combos(axes: &[crate::Axis], kind: AxisType) -> Vec<Combo> {
    let positions: Vec<usize> = axes.iter().positions(|a| a.kind == kind).collect();
    if positions.is_empty() {
        return vec![Vec::new()];
    }
    positions
        .iter()
        .map(|&p| 0..axes[p].size)
        .multi_cartesian_product()
        .map(|values| positions.iter().copied().zip(values).collect())
        .collect()
}

fn bind(base: &[AxisIndex], upcast: &[(usize, usize)], unroll: &[(usize, usize)]) -> Vec<AxisIndex> {
    let mut idx = base.to_vec();
    for &(pos, value) in upcast.iter().chain(unroll) {
        idx[pos] = AxisIndex::Fixed(value);
    }
    idx
}

struct Ctx<'a> {
    ast: &'a Ast,
    globals: &'a [usize],
    vars: &'a HashMap<&'a str, usize>,
}

#[derive(Default)]
struct Builder {
    uops: Vec<UOp>,
    cache: HashMap<UOp, usize>,
}

impl Builder {
    /// Append, reusing an existing slot for pure instructions.
    fn push(&mut self, uop: UOp) -> usize {
        if !uop.op.is_pure() {
            return self.push_raw(uop);
        }
        if let Some(&existing) = self.cache.get(&uop) {
            return existing;
        }
        let pos = self.uops.len();
        self.cache.insert(uop.clone(), pos);
        self.uops.push(uop);
        pos
    }

    /// Append without sharing.
    fn push_raw(&mut self, uop: UOp) -> usize {
        self.uops.push(uop);
        self.uops.len() - 1
    }

    fn index_const(&mut self, value: usize) -> usize {
        self.push(UOp::new(Ops::Const, DType::Index, &[], Arg::Value(ConstValue::Int(value as i64))))
    }

    fn open_loops(
        &mut self,
        axes: &[crate::Axis],
        base: &mut [AxisIndex],
        select: impl Fn(AxisType) -> bool,
    ) -> Vec<usize> {
        let mut ranges = Vec::new();
        for (pos, axis) in axes.iter().enumerate().filter(|(_, a)| select(a.kind)) {
            let end = self.index_const(axis.size);
            let range = self.push_raw(UOp::new(Ops::Range, DType::Index, &[end], Arg::None));
            base[pos] = AxisIndex::Loop(range);
            ranges.push(range);
        }
        ranges
    }

    fn close_loops(&mut self, ranges: &[usize]) {
        for &range in ranges.iter().rev() {
            self.push_raw(UOp::new(Ops::EndRange, DType::Void, &[range], Arg::None));
        }
    }

    fn cast(&mut self, src: usize, from: ScalarDType, to: ScalarDType) -> usize {
        if from == to {
            return src;
        }
        self.push(UOp::new(Ops::Cast, DType::Scalar(to), &[src], Arg::None))
    }

    /// `sum(axis_index * axis.stride * strides[axis.dim])` over all axes.
    fn linear_index(&mut self, kernel: &Kernel, idx: &[AxisIndex], strides: &[usize]) -> usize {
        let mut offset = 0;
        let mut sum: Option<usize> = None;

        for (axis, index) in kernel.axes().iter().zip(idx) {
            let coef = axis.stride * strides[axis.dim];
            if coef == 0 {
                continue;
            }
            match *index {
                AxisIndex::Fixed(value) => offset += value * coef,
                AxisIndex::Loop(range) => {
                    let term = if coef == 1 {
                        range
                    } else {
                        let c = self.index_const(coef);
                        self.push(UOp::new(Ops::Binary(BinaryOp::Mul), DType::Index, &[range, c], Arg::None))
                    };
                    sum = Some(match sum {
                        Some(acc) => self.push(UOp::new(Ops::Binary(BinaryOp::Add), DType::Index, &[acc, term], Arg::None)),
                        None => term,
                    });
                }
            }
        }

        match sum {
            Some(acc) if offset == 0 => acc,
            Some(acc) => {
                let c = self.index_const(offset);
                self.push(UOp::new(Ops::Binary(BinaryOp::Add), DType::Index, &[acc, c], Arg::None))
            }
            None => self.index_const(offset),
        }
    }

    fn expr(&mut self, ctx: &Ctx<'_>, idx: &[AxisIndex], kernel: &Kernel, expr: &Expr) -> (usize, ScalarDType) {
        let dtype = expr.dtype(ctx.ast);
        let slot = match expr {
            Expr::Load { buf, strides } => {
                let offset = self.linear_index(kernel, idx, strides);
                self.push(UOp::new(Ops::Load, DType::Scalar(dtype), &[ctx.globals[*buf], offset], Arg::None))
            }
            Expr::Const(value) => self.push(UOp::new(Ops::Const, DType::Scalar(dtype), &[], Arg::Value(value.cast(dtype)))),
            Expr::Var(name) => ctx.vars[name.as_str()],
            Expr::Unary(op, src) => {
                let (s, from) = self.expr(ctx, idx, kernel, src);
                let s = self.cast(s, from, dtype);
                self.push(UOp::new(Ops::Unary(*op), DType::Scalar(dtype), &[s], Arg::None))
            }
            Expr::Binary(op, lhs, rhs) => {
                let (l, ldt) = self.expr(ctx, idx, kernel, lhs);
                let (r, rdt) = self.expr(ctx, idx, kernel, rhs);
                let common = promote(ldt, rdt);
                let l = self.cast(l, ldt, common);
                let r = self.cast(r, rdt, common);
                self.push(UOp::new(Ops::Binary(*op), DType::Scalar(dtype), &[l, r], Arg::None))
            }
        };
        (slot, dtype)
    }
}
