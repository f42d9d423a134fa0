use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("size mismatch: expected {expected}, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// Element access outside the allocated buffer.
    #[snafu(display("out of bounds access: element {index} of buffer {buffer} holding {size}"))]
    OutOfBounds { buffer: usize, index: i64, size: usize },

    #[snafu(display("failed to allocate {bytes} bytes on {device}"))]
    AllocationFailed { device: String, bytes: usize },

    #[snafu(display("buffer {buffer} has dtype {actual}, program expects {expected}"))]
    DTypeMismatch { buffer: usize, expected: String, actual: String },

    #[snafu(display("program expects {expected} buffers, got {actual}"))]
    BufferCount { expected: usize, actual: usize },

    #[snafu(display("no value bound for variable '{name}'"))]
    MissingVariable { name: String },

    /// Lowering the kernel into an executable program failed.
    #[snafu(display("compilation failed: {reason}"))]
    Compile { reason: String },

    #[snafu(display("runtime error: {message}"))]
    Runtime { message: String },
}
