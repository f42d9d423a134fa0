//! Bounded-depth exploration of the optimization action graph.
//!
//! # Algorithm
//!
//! 1. Start with a frontier holding the initial variant
//! 2. For every frontier variant, enumerate legal actions (no-op excluded)
//! 3. Select children: all of them (exhaustive) or one at random (sampling)
//! 4. Skip children whose canonical signature was already seen
//! 5. Verify the rest; passing children form the next frontier
//! 6. Stop after `max_depth` levels

use std::collections::HashSet;

use itertools::Itertools;
use linfuzz_device::Device;
use rand::Rng;

use crate::config::{ExploreMode, FuzzConfig};
use crate::kernel::KernelVariant;
use crate::ledger::{FailureLedger, FailureRecord};
use crate::verify::{Session, Verifier};

pub struct Explorer<'v, 'd, D> {
    verifier: &'v Verifier<'d, D>,
    mode: ExploreMode,
    max_depth: usize,
    /// `0` disables size gating.
    max_size: usize,
}

impl<'v, 'd, D> Explorer<'v, 'd, D>
where
    D: Device,
    D::Kernel: KernelVariant,
{
    pub fn new(verifier: &'v Verifier<'d, D>, config: &FuzzConfig) -> Self {
        Self { verifier, mode: config.mode, max_depth: config.max_depth(), max_size: config.max_size }
    }

    /// Explore the action graph below `initial`, verifying every new variant
    /// against `session`. The initial variant itself is not verified.
    pub fn explore(
        &self,
        initial: D::Kernel,
        session: &mut Session,
        rng: &mut impl Rng,
    ) -> FailureLedger<D::Kernel> {
        let mut ledger = FailureLedger::new();

        if self.max_size > 0 && initial.work_size() > self.max_size {
            tracing::info!(kernel = %initial, work = initial.work_size(), max = self.max_size, "skipping large kernel");
            return ledger;
        }

        // Required optimizations already on `initial` do not count towards depth.
        let base = initial.applied_actions().len();
        let mut seen = HashSet::new();
        let mut frontier = vec![initial.clone()];

        for depth in 0..self.max_depth {
            let mut next = Vec::new();

            for kernel in &frontier {
                let mut actions = kernel.actions();
                if self.mode == ExploreMode::Exhaustive {
                    tracing::info!(
                        applied = %kernel.applied_actions().iter().join(", "),
                        actions = actions.len(),
                        "testing kernel"
                    );
                }
                if actions.is_empty() {
                    continue;
                }

                let children: Vec<D::Kernel> = match self.mode {
                    ExploreMode::Exhaustive => actions.into_iter().map(|(_, child)| child).collect(),
                    ExploreMode::Sampling => {
                        let pick = rng.gen_range(0..actions.len());
                        vec![actions.swap_remove(pick).1]
                    }
                };

                for child in children {
                    if self.mode == ExploreMode::Sampling {
                        let explored = child.applied_actions().get(base..).unwrap_or_default();
                        tracing::info!(applied = %explored.iter().join(", "), "applied opts");
                    }

                    if !seen.insert(child.signature()) {
                        tracing::debug!(kernel = %child, "duplicate signature, skipped");
                        continue;
                    }
                    if self.mode == ExploreMode::Sampling {
                        tracing::info!(kernel = %child, "testing");
                    }

                    let outcome = self.verifier.verify(&child, session, rng);
                    if outcome.is_pass() {
                        next.push(child);
                        continue;
                    }

                    let record = FailureRecord::new(&initial, &child);
                    tracing::warn!(
                        %outcome,
                        ast = %record.ast,
                        applied = %record.actions_str(),
                        "variant failed"
                    );
                    ledger.record(outcome, record);
                }
            }

            frontier = next;
            tracing::debug!(depth, frontier = frontier.len(), failures = ?ledger, "depth complete");
        }

        ledger
    }
}
