//! Failures grouped by outcome.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::kernel::KernelVariant;
use crate::outcome::Outcome;

/// A failing variant: the AST and the actions explored on top of its baseline.
///
/// Required optimizations are not part of `actions`; [`FailureRecord::replay`]
/// reapplies them.
pub struct FailureRecord<K: KernelVariant> {
    pub ast: Arc<K::Ast>,
    pub actions: Vec<K::Action>,
}

impl<K: KernelVariant> FailureRecord<K> {
    /// Record `kernel`, keeping only the actions applied after `baseline`.
    pub fn new(baseline: &K, kernel: &K) -> Self {
        let skip = baseline.applied_actions().len();
        let actions = kernel.applied_actions().get(skip..).unwrap_or_default().to_vec();
        Self { ast: kernel.ast().clone(), actions }
    }

    /// Rebuild the failing variant.
    pub fn replay(&self) -> Result<K, K::Error> {
        K::replay(self.ast.clone(), &self.actions)
    }

    pub fn actions_str(&self) -> String {
        format!("[{}]", self.actions.iter().join(", "))
    }
}

impl<K: KernelVariant> Clone for FailureRecord<K> {
    fn clone(&self) -> Self {
        Self { ast: self.ast.clone(), actions: self.actions.clone() }
    }
}

impl<K: KernelVariant> fmt::Debug for FailureRecord<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureRecord")
            .field("ast", &format_args!("{}", self.ast))
            .field("actions", &self.actions)
            .finish()
    }
}

pub struct FailureLedger<K: KernelVariant> {
    failures: BTreeMap<Outcome, Vec<FailureRecord<K>>>,
}

impl<K: KernelVariant> Default for FailureLedger<K> {
    fn default() -> Self {
        Self { failures: BTreeMap::new() }
    }
}

impl<K: KernelVariant> FailureLedger<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome, record: FailureRecord<K>) {
        debug_assert!(!outcome.is_pass());
        self.failures.entry(outcome).or_default().push(record);
    }

    /// Append every record of `other`, keeping per-outcome order.
    pub fn merge(&mut self, other: Self) {
        for (outcome, records) in other.failures {
            self.failures.entry(outcome).or_default().extend(records);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total number of failures.
    pub fn len(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }

    pub fn get(&self, outcome: Outcome) -> &[FailureRecord<K>] {
        self.failures.get(&outcome).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.get(outcome).len()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.failures.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, &[FailureRecord<K>])> {
        self.failures.iter().map(|(outcome, records)| (*outcome, records.as_slice()))
    }
}

impl<K: KernelVariant> fmt::Debug for FailureLedger<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.failures.iter().map(|(outcome, records)| (outcome, records.len()))).finish()
    }
}
