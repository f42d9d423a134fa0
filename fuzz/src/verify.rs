//! Differential verification.
//!
//! A [`Session`] carries the buffers, the variable assignment and the ground
//! truth from one verification to the next, so a whole AST's exploration
//! provisions inputs and runs the baseline once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use itertools::Itertools;
use linfuzz_device::{Buffer, Device, Program, VarVals};
use rand::Rng;

use crate::config::FuzzConfig;
use crate::kernel::KernelVariant;
use crate::outcome::Outcome;
use crate::provision::{fresh_like, provision};

/// Element-wise tolerance: `|actual - expected| <= atol + rtol * |expected|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { rtol: 1e-2, atol: 1e-2 }
    }
}

/// Whether every element of `actual` is within `tol` of `expected`.
///
/// Exactly equal values (including equal infinities) always match; NaN never does.
pub fn allclose(actual: &[f64], expected: &[f64], tol: Tolerance) -> bool {
    actual.len() == expected.len() && actual.iter().zip(expected).all(|(&a, &b)| close(a, b, tol))
}

fn close(a: f64, b: f64, tol: Tolerance) -> bool {
    a == b || (a - b).abs() <= tol.atol + tol.rtol * b.abs()
}

/// Per-AST verification state.
#[derive(Debug, Default)]
pub struct Session {
    buffers: Option<Vec<Buffer>>,
    vars: Option<VarVals>,
    ground_truth: Option<Vec<f64>>,
    baseline_runs: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `vars` instead of drawing an assignment.
    pub fn with_vars(mut self, vars: VarVals) -> Self {
        self.vars = Some(vars);
        self
    }

    /// Compare against `ground_truth` instead of running the baseline.
    pub fn with_ground_truth(mut self, ground_truth: Vec<f64>) -> Self {
        self.ground_truth = Some(ground_truth);
        self
    }

    pub fn buffers(&self) -> Option<&[Buffer]> {
        self.buffers.as_deref()
    }

    pub fn vars(&self) -> Option<&VarVals> {
        self.vars.as_ref()
    }

    pub fn ground_truth(&self) -> Option<&[f64]> {
        self.ground_truth.as_deref()
    }

    /// Number of times the baseline was executed in this session.
    pub fn baseline_runs(&self) -> usize {
        self.baseline_runs
    }
}

pub struct Verifier<'d, D> {
    device: &'d D,
    tolerance: Tolerance,
    red_zone: usize,
    check_red_zone: bool,
}

impl<'d, D> Verifier<'d, D>
where
    D: Device,
    D::Kernel: KernelVariant,
{
    pub fn new(device: &'d D, config: &FuzzConfig) -> Self {
        Self {
            device,
            tolerance: Tolerance { rtol: config.rtol, atol: config.atol },
            red_zone: config.red_zone,
            check_red_zone: config.check_red_zone,
        }
    }

    pub fn device(&self) -> &D {
        self.device
    }

    /// Run `kernel` and compare its output against the session's ground truth,
    /// filling in whatever the session is missing first.
    pub fn verify(&self, kernel: &D::Kernel, session: &mut Session, rng: &mut impl Rng) -> Outcome {
        if let Some(buffers) = session.buffers.as_mut() {
            if let Err(error) = self.reset_output(buffers) {
                tracing::error!(kernel = %kernel, %error, "failed to reallocate output");
                return Outcome::RawbufsError;
            }
        } else {
            match provision(kernel, self.device, self.red_zone, rng) {
                Ok(buffers) => session.buffers = Some(buffers),
                Err(error) => {
                    tracing::error!(kernel = %kernel, %error, "buffer provisioning failed");
                    return Outcome::RawbufsError;
                }
            }
        }
        let Some(buffers) = session.buffers.as_mut() else {
            return Outcome::RawbufsError;
        };

        let vars = session.vars.get_or_insert_with(|| {
            kernel.vars().iter().map(|v| (v.name.clone(), rng.gen_range(v.min..=v.max))).collect()
        });

        if session.ground_truth.is_none() {
            let truth = match self.baseline(kernel, buffers, vars) {
                Ok(truth) => truth,
                Err(outcome) => return outcome,
            };
            session.baseline_runs += 1;
            session.ground_truth = Some(truth);
        }

        let outcome = self.run(kernel, buffers, vars);
        if !outcome.is_pass() {
            return outcome;
        }

        let truth = session.ground_truth.as_deref().unwrap_or_default();
        let outcome = self.compare(kernel, &buffers[0], truth);
        if !outcome.is_pass() {
            return outcome;
        }

        if self.check_red_zone && buffers[0].tail_bytes().iter().any(|&b| b != 0) {
            let dirty = buffers[0].tail_bytes().iter().filter(|&&b| b != 0).count();
            tracing::warn!(kernel = %kernel, dirty_bytes = dirty, "write past the end of the output");
            return Outcome::RedzoneError;
        }
        Outcome::Pass
    }

    /// Compile and execute `kernel`, converting errors and panics into outcomes.
    pub fn run(&self, kernel: &D::Kernel, buffers: &mut [Buffer], vars: &VarVals) -> Outcome {
        let program = match guarded(|| self.device.compile(kernel)) {
            Ok(program) => program,
            Err(reason) => {
                tracing::error!(kernel = %kernel, %reason, "compile failed");
                return Outcome::CompileError;
            }
        };

        match guarded(|| program.execute(buffers, vars)) {
            Ok(()) => Outcome::Pass,
            Err(reason) => {
                tracing::error!(kernel = %kernel, program = program.name(), %reason, "execution failed");
                Outcome::ExecError
            }
        }
    }

    fn compare(&self, kernel: &D::Kernel, output: &Buffer, truth: &[f64]) -> Outcome {
        let actual = match output.to_f64() {
            Ok(values) => values,
            Err(error) => {
                tracing::error!(kernel = %kernel, %error, "failed to read output");
                return Outcome::ExecError;
            }
        };
        if allclose(&actual, truth, self.tolerance) {
            return Outcome::Pass;
        }

        let mismatches = actual.iter().zip(truth).filter(|&(&a, &b)| !close(a, b, self.tolerance)).count();
        if let Some((index, (got, expected))) =
            actual.iter().zip(truth).find_position(|&(&a, &b)| !close(a, b, self.tolerance))
        {
            tracing::warn!(kernel = %kernel, index, got, expected, mismatches, "output mismatch");
        }
        Outcome::CompareError
    }

    /// Execute the reference variant and capture its nominal output.
    ///
    /// Fails with `BaselineError` when the reference itself cannot run, and
    /// with `RawbufsError` when the output cannot be reallocated afterwards.
    fn baseline(&self, kernel: &D::Kernel, buffers: &mut [Buffer], vars: &VarVals) -> Result<Vec<f64>, Outcome> {
        let baseline = match <D::Kernel as KernelVariant>::baseline(kernel.ast().clone()) {
            Ok(baseline) => baseline,
            Err(error) => {
                tracing::error!(kernel = %kernel, %error, "cannot build baseline");
                return Err(Outcome::BaselineError);
            }
        };

        if !self.run(&baseline, buffers, vars).is_pass() {
            tracing::error!(baseline = %baseline, "baseline failed");
            return Err(Outcome::BaselineError);
        }

        let truth = buffers[0].to_f64().map_err(|error| {
            tracing::error!(baseline = %baseline, %error, "failed to read baseline output");
            Outcome::BaselineError
        })?;
        self.reset_output(buffers).map_err(|error| {
            tracing::error!(baseline = %baseline, %error, "failed to reallocate output");
            Outcome::RawbufsError
        })?;
        tracing::debug!(baseline = %baseline, elements = truth.len(), "ground truth captured");
        Ok(truth)
    }

    /// Replace the output with a zeroed buffer of the same shape so stale
    /// values cannot hide an under-write.
    fn reset_output(&self, buffers: &mut [Buffer]) -> linfuzz_device::Result<()> {
        buffers[0] = fresh_like(self.device.allocator(), &buffers[0], true, None)?;
        Ok(())
    }
}

fn guarded<T>(f: impl FnOnce() -> linfuzz_device::Result<T>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with a non-string payload".to_string()
    }
}
