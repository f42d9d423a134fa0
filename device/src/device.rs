//! Program and device traits.
//!
//! The fuzzing core never looks inside a kernel or a program: it asks the
//! device to compile a kernel, then runs the program against positional
//! buffers (buffer 0 is the output) and a variable assignment.

use std::collections::BTreeMap;

use crate::allocator::Allocator;
use crate::buffer::Buffer;
use crate::error::Result;

/// Concrete values for a kernel's free variables.
pub type VarVals = BTreeMap<String, i64>;

/// A compiled, executable kernel program.
pub trait Program {
    /// Execute against `buffers`, blocking until the device has finished.
    fn execute(&self, buffers: &mut [Buffer], vars: &VarVals) -> Result<()>;

    /// Get the kernel name (for debugging/profiling).
    fn name(&self) -> &str;
}

/// A compilation + execution unit for one backend.
pub trait Device {
    /// Kernel representation this device knows how to compile.
    type Kernel;
    type Program: Program;

    fn name(&self) -> &str;

    /// Whether kernels are lowered to native code with raw memory access.
    /// Out-of-bounds guard regions are only meaningful on such devices.
    fn is_compiled(&self) -> bool;

    fn supports_images(&self) -> bool;

    fn allocator(&self) -> &dyn Allocator;

    fn compile(&self, kernel: &Self::Kernel) -> Result<Self::Program>;
}
