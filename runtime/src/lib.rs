//! Runtime execution for linfuzz kernels.
//!
//! Provides the reference CPU device. Kernels are lowered with
//! [`linfuzz_ir::linearize`], validated, and executed by an instruction
//! interpreter that bounds-checks every memory access against the
//! allocation it touches.

pub mod alu;
pub mod devices;
pub mod program;


pub use devices::cpu::CpuDevice;
pub use program::CpuProgram;
