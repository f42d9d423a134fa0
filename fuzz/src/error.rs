use std::path::PathBuf;

use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that end a fuzzing run. Variant-level failures are never errors;
/// they are reported as [`crate::Outcome`]s.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("failed to read corpus {}: {source}", path.display()))]
    ReadCorpus { path: PathBuf, source: std::io::Error },

    #[snafu(display("corpus line {line}: {source}"))]
    ParseAst { line: usize, source: serde_json::Error },

    #[snafu(display("corpus line {line}: invalid AST: {source}"))]
    InvalidAst { line: usize, source: linfuzz_ir::AstError },

    #[snafu(display("invalid value '{value}' for {name}"))]
    InvalidEnv { name: &'static str, value: String },
}
