//! Kernel variant: an AST plus the loop-nest state produced by applied actions.

use std::fmt;
use std::sync::Arc;

use linfuzz_dtype::DType;

use crate::ast::Ast;
use crate::error::OptError;
use crate::opt::{ACTIONS, Opt, apply_opt};

/// Axis kind. Declaration order is loop-nest order: axes are kept sorted by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum AxisType {
    /// Outer parallel loop over output elements.
    Global,
    /// Workgroup-local loop.
    Local,
    /// Reduction loop.
    Reduce,
    /// Reduction axis expanded into straight-line code.
    Unroll,
    /// Output axis expanded into straight-line code.
    Upcast,
}

impl AxisType {
    /// Whether the axis is expanded at lowering time instead of looping.
    pub const fn is_unrolled(&self) -> bool {
        matches!(self, Self::Unroll | Self::Upcast)
    }

    fn letter(&self) -> char {
        match self {
            Self::Global => 'g',
            Self::Local => 'l',
            Self::Reduce => 'r',
            Self::Unroll => 'u',
            Self::Upcast => 'U',
        }
    }
}

/// One loop-nest axis: a slice of original dimension `dim` that advances the
/// dimension index by `stride` per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Axis {
    pub size: usize,
    pub kind: AxisType,
    pub dim: usize,
    pub stride: usize,
}

/// Positional buffer requirement. Index 0 is the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferInfo {
    pub dtype: DType,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct Kernel {
    ast: Arc<Ast>,
    pub(crate) axes: Vec<Axis>,
    pub(crate) applied_opts: Vec<Opt>,
}

impl Kernel {
    /// Unoptimized kernel: one global or reduce axis per non-trivial dimension.
    pub fn new(ast: Arc<Ast>) -> Self {
        let mut axes: Vec<Axis> = ast
            .shape
            .iter()
            .enumerate()
            .filter(|&(_, &size)| size > 1)
            .map(|(dim, &size)| {
                let kind = if ast.is_reduce_dim(dim) { AxisType::Reduce } else { AxisType::Global };
                Axis { size, kind, dim, stride: 1 }
            })
            .collect();
        axes.sort_by_key(|a| a.kind);
        Self { ast, axes, applied_opts: Vec::new() }
    }

    pub fn ast(&self) -> &Arc<Ast> {
        &self.ast
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn applied_opts(&self) -> &[Opt] {
        &self.applied_opts
    }

    pub fn axes_of(&self, kind: AxisType) -> impl Iterator<Item = &Axis> {
        self.axes.iter().filter(move |a| a.kind == kind)
    }

    /// Product of the sizes of all unrolled (upcast or unroll) axes.
    pub fn upcast_size(&self) -> usize {
        self.axes.iter().filter(|a| a.kind.is_unrolled()).map(|a| a.size).product()
    }

    /// Apply the mandatory optimizations a backend needs to run this kernel
    /// at all: image inputs are read as float4 texels, so the innermost
    /// output axis must be upcast by 4.
    pub fn required_optimizations(mut self) -> Result<Self, OptError> {
        if self.ast.requires_images() && !self.has_image_upcast() {
            let globals = self.axes_of(AxisType::Global).count();
            let innermost = globals.checked_sub(1).ok_or(OptError::ValidationFailed {
                op: "UPCAST",
                reason: "image kernel has no output axis to vectorize",
            })?;
            apply_opt(&mut self, &Opt::upcast(innermost, 4))?;
        }
        Ok(self)
    }

    /// Whether an upcast axis vectorizes the output by a multiple of 4.
    pub fn has_image_upcast(&self) -> bool {
        self.axes_of(AxisType::Upcast).any(|a| a.size % 4 == 0)
    }

    /// Apply a single action to a copy of this kernel.
    pub fn apply(&self, opt: &Opt) -> Result<Self, OptError> {
        let mut next = self.clone();
        apply_opt(&mut next, opt)?;
        Ok(next)
    }

    /// Every catalogue action that applies cleanly, paired with its result.
    pub fn actions(&self, include_noop: bool) -> Vec<(Opt, Kernel)> {
        ACTIONS
            .iter()
            .filter(|opt| include_noop || opt.op != crate::OptOps::NOOP)
            .filter_map(|opt| self.apply(opt).ok().map(|k| (*opt, k)))
            .collect()
    }

    /// Buffer requirements in positional order (output first).
    pub fn buffers(&self) -> Vec<BufferInfo> {
        std::iter::once(BufferInfo { dtype: self.ast.output.into(), size: self.ast.output_size() })
            .chain(self.ast.inputs.iter().map(|b| BufferInfo { dtype: b.dtype, size: b.size }))
            .collect()
    }

    /// Compact shape rendering: axis sizes tagged with their kind letter.
    pub fn shape_str(&self) -> String {
        self.axes.iter().map(|a| format!("{}{}", a.size, a.kind.letter())).collect::<Vec<_>>().join("_")
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.ast.name, self.shape_str())
    }
}
