//! Differential fuzzing of kernel optimization actions.
//!
//! For every AST in a corpus the [`Driver`] builds the minimally optimized
//! kernel and hands it to the [`Explorer`], which walks the optimization
//! action graph breadth-first up to a fixed depth. Every structurally new
//! variant is compiled and executed by the [`Verifier`] and compared against
//! the output of the baseline kernel. Variants that fail are recorded in a
//! [`FailureLedger`] and pruned; variants that pass seed the next depth.
//!
//! The core only sees kernels through [`KernelVariant`] and backends through
//! [`linfuzz_device::Device`], so any representation/backend pair can be
//! fuzzed.

pub mod config;
pub mod corpus;
pub mod driver;
pub mod error;
pub mod explore;
pub mod kernel;
pub mod ledger;
pub mod outcome;
pub mod provision;
pub mod verify;

#[cfg(test)]
pub mod test;

pub use config::{ExploreMode, FuzzConfig};
pub use corpus::Corpus;
pub use driver::{Driver, RunReport};
pub use error::{Error, Result};
pub use explore::Explorer;
pub use kernel::KernelVariant;
pub use ledger::{FailureLedger, FailureRecord};
pub use outcome::Outcome;
pub use provision::{fresh_like, provision};
pub use verify::{Session, Tolerance, Verifier, allclose};
