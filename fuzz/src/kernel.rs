//! Kernel representation contract.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use linfuzz_ir::{Ast, BufferInfo, Kernel, Opt, OptError, UOp, Variable};

/// What the fuzzer needs from a kernel representation.
///
/// A variant is an AST plus the ordered actions applied to it. The explorer
/// never inspects actions: it only enumerates them, applies them and compares
/// the canonical signatures of the results.
pub trait KernelVariant: Clone + fmt::Display {
    type Ast: fmt::Display;
    type Action: Clone + fmt::Debug + fmt::Display;
    /// Identity-free fingerprint of the lowered instruction sequence.
    type Signature: Eq + Hash;
    type Error: fmt::Display;

    /// Unoptimized variant of `ast`.
    fn new(ast: Arc<Self::Ast>) -> Self;

    /// Apply the optimizations a backend needs before the variant is runnable at all.
    fn required(self) -> Result<Self, Self::Error>;

    fn apply(&self, action: &Self::Action) -> Result<Self, Self::Error>;

    fn ast(&self) -> &Arc<Self::Ast>;

    fn applied_actions(&self) -> &[Self::Action];

    /// Legal next actions paired with their results, no-op excluded.
    fn actions(&self) -> Vec<(Self::Action, Self)>;

    fn signature(&self) -> Self::Signature;

    /// Positional buffer requirements; index 0 is the output.
    fn buffers(&self) -> Vec<BufferInfo>;

    fn vars(&self) -> Vec<Variable>;

    /// Total work measure used for size gating.
    fn work_size(&self) -> usize;

    fn requires_images(&self) -> bool;

    /// The trusted reference variant: required optimizations and nothing else.
    fn baseline(ast: Arc<Self::Ast>) -> Result<Self, Self::Error> {
        Self::new(ast).required()
    }

    /// Rebuild a variant from its AST and the actions applied on top of its baseline.
    fn replay(ast: Arc<Self::Ast>, actions: &[Self::Action]) -> Result<Self, Self::Error> {
        actions.iter().try_fold(Self::baseline(ast)?, |kernel, action| kernel.apply(action))
    }
}

impl KernelVariant for Kernel {
    type Ast = Ast;
    type Action = Opt;
    type Signature = Vec<UOp>;
    type Error = OptError;

    fn new(ast: Arc<Ast>) -> Self {
        Kernel::new(ast)
    }

    fn required(self) -> Result<Self, OptError> {
        self.required_optimizations()
    }

    fn apply(&self, action: &Opt) -> Result<Self, OptError> {
        Kernel::apply(self, action)
    }

    fn ast(&self) -> &Arc<Ast> {
        Kernel::ast(self)
    }

    fn applied_actions(&self) -> &[Opt] {
        self.applied_opts()
    }

    fn actions(&self) -> Vec<(Opt, Self)> {
        Kernel::actions(self, false)
    }

    fn signature(&self) -> Vec<UOp> {
        linfuzz_ir::linearize(self)
    }

    fn buffers(&self) -> Vec<BufferInfo> {
        Kernel::buffers(self)
    }

    fn vars(&self) -> Vec<Variable> {
        self.ast().vars.clone()
    }

    fn work_size(&self) -> usize {
        self.ast().work_size()
    }

    fn requires_images(&self) -> bool {
        self.ast().requires_images()
    }
}
