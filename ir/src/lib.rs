//! Reference kernel representation.
//!
//! A kernel starts from an [`Ast`] (what to compute) and accumulates
//! optimization actions ([`Opt`]) that reshape its loop nest. The
//! [`linearize`] pass lowers a [`Kernel`] into a flat [`UOp`] sequence whose
//! instructions reference their operands by position, which makes the
//! sequence itself a canonical, identity-free fingerprint of the variant.
//!
//! # Module Organization
//!
//! - [`ast`] - Computation description, free variables, buffer declarations
//! - [`opt`] - Optimization actions and the action catalogue
//! - [`kernel`] - Kernel variant (AST + axis state + applied actions)
//! - [`uop`] - Linear instruction type
//! - [`linearize`] - Kernel to instruction sequence lowering

pub mod ast;
pub mod error;
pub mod kernel;
pub mod linearize;
pub mod opt;
pub mod uop;


pub use ast::{Ast, BinaryOp, BufferDecl, Expr, Reduce, ReduceOp, UnaryOp, Variable};
pub use error::{AstError, OptError};
pub use kernel::{Axis, AxisType, BufferInfo, Kernel};
pub use linearize::linearize;
pub use opt::{ACTIONS, Opt, OptOps, apply_opt};
pub use uop::{Arg, Ops, UOp};
