//! Optimization actions.
//!
//! An [`Opt`] reshapes the loop nest of a [`Kernel`] without changing what it
//! computes. Axis arguments are logical: `UPCAST`, `LOCAL` and `SWAP` index the
//! kernel's global axes, `UNROLL` indexes its reduce axes. An amount of `0`
//! means "the whole axis".

use std::fmt;

use once_cell::sync::Lazy;
use snafu::ensure;

use crate::error::*;
use crate::kernel::{Axis, AxisType, Kernel};

/// Maximum product of upcast and unroll amounts in one kernel.
pub const MAX_UPCAST: usize = 32;
/// Maximum product of local amounts in one kernel.
pub const MAX_LOCAL: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, strum::Display)]
pub enum OptOps {
    /// Leave the kernel unchanged.
    NOOP,
    /// Split a global axis and unroll the inner part into straight-line code.
    UPCAST,
    /// Split a reduce axis and unroll the inner part.
    UNROLL,
    /// Split a global axis into a workgroup-local inner loop.
    LOCAL,
    /// Exchange the loop order of two global axes.
    SWAP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Opt {
    pub op: OptOps,
    pub axis: usize,
    /// Split amount, or the other axis for `SWAP`.
    pub arg: usize,
}

impl Opt {
    pub const fn new(op: OptOps, axis: usize, arg: usize) -> Self {
        Self { op, axis, arg }
    }

    pub const fn noop() -> Self {
        Self::new(OptOps::NOOP, 0, 0)
    }

    pub const fn upcast(axis: usize, amount: usize) -> Self {
        Self::new(OptOps::UPCAST, axis, amount)
    }

    pub const fn unroll(axis: usize, amount: usize) -> Self {
        Self::new(OptOps::UNROLL, axis, amount)
    }

    pub const fn local(axis: usize, amount: usize) -> Self {
        Self::new(OptOps::LOCAL, axis, amount)
    }

    pub const fn swap(axis: usize, other_axis: usize) -> Self {
        Self::new(OptOps::SWAP, axis, other_axis)
    }
}

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opt(op={}, axis={}, arg={})", self.op, self.axis, self.arg)
    }
}

/// Action catalogue, in the order actions are offered to the explorer.
///
/// The no-op is always entry 0.
pub static ACTIONS: Lazy<Vec<Opt>> = Lazy::new(|| {
    let mut actions = vec![Opt::noop()];

    for axis in 0..4 {
        for amt in [0, 2, 3, 4, 8] {
            actions.push(Opt::upcast(axis, amt));
        }
    }

    for axis in 0..3 {
        for amt in [0, 2, 4] {
            actions.push(Opt::unroll(axis, amt));
        }
    }

    for axis in 0..4 {
        for amt in [2, 4, 8, 16] {
            actions.push(Opt::local(axis, amt));
        }
    }

    for a0 in 0..3 {
        for a1 in (a0 + 1)..4 {
            actions.push(Opt::swap(a0, a1));
        }
    }

    actions
});

/// Apply `opt` to `kernel` in place, recording it in the applied list on success.
///
/// On error the kernel is left unchanged.
pub fn apply_opt(kernel: &mut Kernel, opt: &Opt) -> Result<(), OptError> {
    let mut axes = kernel.axes.clone();

    match opt.op {
        OptOps::NOOP => {}
        OptOps::UPCAST => split(&mut axes, AxisType::Global, opt, AxisType::Upcast, "UPCAST")?,
        OptOps::LOCAL => split(&mut axes, AxisType::Global, opt, AxisType::Local, "LOCAL")?,
        OptOps::UNROLL => split(&mut axes, AxisType::Reduce, opt, AxisType::Unroll, "UNROLL")?,
        OptOps::SWAP => {
            let globals = positions(&axes, AxisType::Global);
            ensure!(opt.axis < opt.arg, ValidationFailedSnafu { op: "SWAP", reason: "axes must be ordered" });
            ensure!(opt.arg < globals.len(), AxisOutOfBoundsSnafu { axis: opt.arg, count: globals.len() });
            axes.swap(globals[opt.axis], globals[opt.arg]);
        }
    }

    let upcast: usize = axes.iter().filter(|a| a.kind.is_unrolled()).map(|a| a.size).product();
    ensure!(upcast <= MAX_UPCAST, LimitExceededSnafu { limit_type: "upcast", value: upcast, max: MAX_UPCAST });
    let local: usize = axes.iter().filter(|a| a.kind == AxisType::Local).map(|a| a.size).product();
    ensure!(local <= MAX_LOCAL, LimitExceededSnafu { limit_type: "local", value: local, max: MAX_LOCAL });

    kernel.axes = axes;
    kernel.applied_opts.push(*opt);
    Ok(())
}

fn positions(axes: &[Axis], kind: AxisType) -> Vec<usize> {
    axes.iter().enumerate().filter(|(_, a)| a.kind == kind).map(|(i, _)| i).collect()
}

/// Split the `opt.axis`-th axis of kind `from` into an outer part (same kind)
/// and an inner part of kind `to` and size `opt.arg`.
fn split(axes: &mut Vec<Axis>, from: AxisType, opt: &Opt, to: AxisType, op: &'static str) -> Result<(), OptError> {
    let candidates = positions(axes, from);
    ensure!(opt.axis < candidates.len(), AxisOutOfBoundsSnafu { axis: opt.axis, count: candidates.len() });

    let pos = candidates[opt.axis];
    let target = axes[pos];
    let amount = if opt.arg == 0 { target.size } else { opt.arg };
    ensure!(amount > 1, ValidationFailedSnafu { op, reason: "split amount must exceed 1" });
    ensure!(target.size % amount == 0, DivisionSnafu { size: target.size, amount });

    let inner = Axis { size: amount, kind: to, dim: target.dim, stride: target.stride };
    let outer = Axis { size: target.size / amount, kind: from, dim: target.dim, stride: target.stride * amount };

    if outer.size == 1 {
        axes.remove(pos);
    } else {
        axes[pos] = outer;
    }
    axes.push(inner);
    axes.sort_by_key(|a| a.kind);
    Ok(())
}
