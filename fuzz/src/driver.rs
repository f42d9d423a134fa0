//! Corpus-level driver: filters ASTs, explores each one and aggregates failures.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use linfuzz_device::Device;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::FuzzConfig;
use crate::explore::Explorer;
use crate::kernel::KernelVariant;
use crate::ledger::{FailureLedger, FailureRecord};
use crate::outcome::Outcome;
use crate::verify::{Session, Verifier};

pub struct Driver<'d, D> {
    device: &'d D,
    config: FuzzConfig,
}

impl<'d, D> Driver<'d, D>
where
    D: Device,
    D::Kernel: KernelVariant,
{
    pub fn new(device: &'d D, config: FuzzConfig) -> Self {
        Self { device, config }
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    /// Fuzz every selected AST of `asts` and collect the run-wide ledger.
    pub fn run(&self, asts: &[Arc<<D::Kernel as KernelVariant>::Ast>]) -> RunReport<D::Kernel> {
        let verifier = Verifier::new(self.device, &self.config);
        let explorer = Explorer::new(&verifier, &self.config);
        let mut report = RunReport::default();

        let limit = self.config.limit.unwrap_or(asts.len());
        tracing::info!(asts = asts.len(), limit, device = self.device.name(), "fuzzing corpus");

        for (i, ast) in asts.iter().enumerate().take(limit) {
            if self.config.nth.is_some_and(|nth| nth != i) {
                continue;
            }
            let kernel = <D::Kernel as KernelVariant>::new(ast.clone());
            if kernel.requires_images() && !self.device.supports_images() {
                tracing::debug!(index = i, device = self.device.name(), "skipping image kernel");
                continue;
            }

            tracing::info!(index = i, "testing ast");
            tracing::info!("{ast}");
            report.tested += 1;

            let ledger = self.fuzz(kernel, &explorer);
            if !ledger.is_empty() {
                report.failed_ids.push(i);
            }
            report.ledger.merge(ledger);
        }

        report
    }

    /// Explore one AST from its minimally optimized variant with a freshly seeded RNG.
    fn fuzz(&self, kernel: D::Kernel, explorer: &Explorer<'_, 'd, D>) -> FailureLedger<D::Kernel> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let initial = match kernel.clone().required() {
            Ok(initial) => initial,
            Err(error) => {
                tracing::warn!(kernel = %kernel, %error, "required optimizations failed");
                let mut ledger = FailureLedger::new();
                ledger.record(Outcome::BaselineError, FailureRecord::new(&kernel, &kernel));
                return ledger;
            }
        };
        tracing::info!(kernel = %initial, "initial kernel");

        let mut session = Session::new();
        explorer.explore(initial, &mut session, &mut rng)
    }
}

/// Aggregated result of a corpus run.
pub struct RunReport<K: KernelVariant> {
    pub tested: usize,
    /// Corpus indices that produced at least one failure.
    pub failed_ids: Vec<usize>,
    pub ledger: FailureLedger<K>,
}

impl<K: KernelVariant> Default for RunReport<K> {
    fn default() -> Self {
        Self { tested: 0, failed_ids: Vec::new(), ledger: FailureLedger::new() }
    }
}

impl<K: KernelVariant> RunReport<K> {
    pub fn passed(&self) -> bool {
        self.ledger.is_empty()
    }
}

impl<K: KernelVariant> fmt::Display for RunReport<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (outcome, records) in self.ledger.iter() {
            for (i, record) in records.iter().enumerate() {
                writeln!(f, "{outcome} {i} AST: {}", record.ast)?;
                writeln!(f, "{outcome} {i} OPTS: {}\n", record.actions_str())?;
            }
        }

        writeln!(f, "tested={}", self.tested)?;
        if self.passed() {
            return write!(f, "all passed");
        }
        writeln!(f, "failed_ids=[{}]", self.failed_ids.iter().join(", "))?;
        let counts = self.ledger.iter().map(|(outcome, records)| format!("{outcome}: {}", records.len()));
        write!(f, "{}", counts.format("\n"))
    }
}
