use linfuzz_dtype::DType;
use snafu::Snafu;

/// Reasons an AST is rejected before any kernel is built from it.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum AstError {
    #[snafu(display("load references buffer {buf}, but the AST declares {count} inputs"))]
    UnknownBuffer { buf: usize, count: usize },
    #[snafu(display("load of buffer {buf} has {actual} strides for a {expected}-d shape"))]
    StrideRank { buf: usize, expected: usize, actual: usize },
    #[snafu(display("load of buffer {buf} reaches element {index}, buffer holds {size}"))]
    LoadOutOfBounds { buf: usize, index: usize, size: usize },
    #[snafu(display("reduce dimension {dim} out of range for a {rank}-d shape"))]
    ReduceDimOutOfRange { dim: usize, rank: usize },
    #[snafu(display("variable '{name}' is used but not declared"))]
    UndeclaredVariable { name: String },
    #[snafu(display("variable '{name}' has an empty domain [{min}, {max}]"))]
    EmptyDomain { name: String, min: i64, max: i64 },
    #[snafu(display("shape contains a zero-sized dimension"))]
    EmptyShape,
    #[snafu(display("buffer {buf} has dtype {dtype:?}, which cannot be stored in a buffer"))]
    UnsupportedDType { buf: usize, dtype: DType },
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum OptError {
    #[snafu(display("axis out of bounds: axis {axis} >= {count} candidate axes"))]
    AxisOutOfBounds { axis: usize, count: usize },
    #[snafu(display("division constraint violated: {size} is not divisible by {amount}"))]
    DivisionError { size: usize, amount: usize },
    #[snafu(display("operation validation failed for {op}: {reason}"))]
    ValidationFailed { op: &'static str, reason: &'static str },
    #[snafu(display("optimization would exceed limit: {limit_type} {value} > max {max}"))]
    LimitExceeded { limit_type: &'static str, value: usize, max: usize },
}
