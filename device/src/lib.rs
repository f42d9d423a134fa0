//! Device abstraction for running compiled kernels.
//!
//! A [`Device`] turns a kernel into an executable [`Program`] and owns an
//! [`Allocator`] for the positional [`Buffer`]s programs run against.
//! Execution is blocking: [`Program::execute`] returns once the device has
//! finished writing its outputs.

pub mod allocator;
pub mod buffer;
pub mod device;
pub mod error;


pub use allocator::{Allocator, BufferOptions, CpuAllocator, RawBuffer};
pub use buffer::Buffer;
pub use device::{Device, Program, VarVals};
pub use error::{Error, Result};
