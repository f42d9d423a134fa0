//! CPU device implementation.
//!
//! Image support and the compiled/interpreted distinction are switchable so
//! the fuzzer can be pointed at device profiles with different capabilities.

use bon::bon;
use linfuzz_device::error::CompileSnafu;
use linfuzz_device::{Allocator, CpuAllocator, Device, Program, Result};
use linfuzz_ir::Kernel;
use snafu::ensure;

use crate::program::CpuProgram;

#[derive(Debug, Clone)]
pub struct CpuDevice {
    allocator: CpuAllocator,
    images: bool,
    compiled: bool,
}

#[bon]
impl CpuDevice {
    #[builder]
    pub fn new(
        /// Accept kernels that read image buffers.
        #[builder(default = false)]
        images: bool,
        /// Report as a compiled backend (enables out-of-bounds guard regions).
        #[builder(default = true)]
        compiled: bool,
        /// Cap on a single allocation in bytes.
        memory_limit: Option<usize>,
    ) -> Self {
        let allocator = memory_limit.map_or_else(CpuAllocator::new, CpuAllocator::with_limit);
        Self { allocator, images, compiled }
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Device for CpuDevice {
    type Kernel = Kernel;
    type Program = CpuProgram;

    fn name(&self) -> &str {
        "CPU"
    }

    fn is_compiled(&self) -> bool {
        self.compiled
    }

    fn supports_images(&self) -> bool {
        self.images
    }

    fn allocator(&self) -> &dyn Allocator {
        &self.allocator
    }

    fn compile(&self, kernel: &Kernel) -> Result<CpuProgram> {
        if kernel.ast().requires_images() {
            ensure!(self.images, CompileSnafu { reason: "device has no image support" });
            ensure!(kernel.has_image_upcast(), CompileSnafu { reason: "image loads must be float4 vectorized" });
        }

        let uops = linfuzz_ir::linearize(kernel);
        let program = CpuProgram::new(kernel.ast().name.clone(), uops)?;
        tracing::debug!(kernel.name = %program.name(), uops = program.len(), "CPU kernel compiled");
        Ok(program)
    }
}
