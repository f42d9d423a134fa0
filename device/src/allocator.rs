use snafu::ensure;

use crate::error::{AllocationFailedSnafu, Result};

/// Opaque handle to device memory.
#[derive(Debug)]
pub enum RawBuffer {
    Cpu { data: Box<[u8]> },
}

impl RawBuffer {
    /// Get the size of the buffer in bytes.
    pub fn size(&self) -> usize {
        match self {
            RawBuffer::Cpu { data } => data.len(),
        }
    }
}

/// Options for buffer allocation.
#[derive(Debug, Clone, Default)]
pub struct BufferOptions {
    /// Whether to zero-initialize the buffer.
    pub zero_init: bool,
}

impl BufferOptions {
    pub fn zeroed() -> Self {
        Self { zero_init: true }
    }
}

pub trait Allocator: std::fmt::Debug {
    fn alloc(&self, size: usize, options: &BufferOptions) -> Result<RawBuffer>;
    fn name(&self) -> &str;
}

/// CPU allocator using system memory, optionally capped.
#[derive(Debug, Clone, Default)]
pub struct CpuAllocator {
    limit: Option<usize>,
}

impl CpuAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any single allocation larger than `bytes`.
    pub fn with_limit(bytes: usize) -> Self {
        Self { limit: Some(bytes) }
    }
}

impl Allocator for CpuAllocator {
    fn alloc(&self, size: usize, _options: &BufferOptions) -> Result<RawBuffer> {
        // Host allocations are always zero-filled.
        ensure!(self.limit.is_none_or(|limit| size <= limit), AllocationFailedSnafu { device: "CPU", bytes: size });

        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|_| AllocationFailedSnafu { device: "CPU", bytes: size }.build())?;
        data.resize(size, 0u8);
        tracing::trace!(bytes = size, "CPU buffer allocated");
        Ok(RawBuffer::Cpu { data: data.into_boxed_slice() })
    }

    fn name(&self) -> &str {
        "CPU"
    }
}
