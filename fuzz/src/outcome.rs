/// Result of one verification attempt. Exactly one tag applies per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Pass,
    /// Buffers could not be allocated or filled.
    RawbufsError,
    /// The minimally optimized reference kernel itself failed.
    BaselineError,
    CompileError,
    ExecError,
    /// Output differs from the baseline beyond tolerance.
    CompareError,
    /// Output matched but the guard region past the output was written.
    RedzoneError,
}

impl Outcome {
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}
