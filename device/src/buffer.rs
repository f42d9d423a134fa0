use linfuzz_dtype::{ConstValue, DType, HasDType};
use snafu::ensure;

use crate::allocator::{Allocator, BufferOptions, RawBuffer};
use crate::error::{OutOfBoundsSnafu, Result, SizeMismatchSnafu};

/// A device buffer of `size` elements of one dtype.
///
/// The allocation may be larger than `size` elements: [`Buffer::with_capacity`]
/// reserves trailing elements that programs can reach but that are not part
/// of the nominal contents.
#[derive(Debug)]
pub struct Buffer {
    raw: RawBuffer,
    dtype: DType,
    /// Nominal element count.
    size: usize,
    /// Allocated element count (>= size).
    capacity: usize,
    device: String,
}

impl Buffer {
    /// Allocate a buffer of exactly `size` elements.
    pub fn allocate(allocator: &dyn Allocator, dtype: DType, size: usize, options: BufferOptions) -> Result<Self> {
        Self::with_capacity(allocator, dtype, size, size, options)
    }

    /// Allocate `capacity` elements, of which the first `size` are nominal.
    pub fn with_capacity(
        allocator: &dyn Allocator,
        dtype: DType,
        size: usize,
        capacity: usize,
        options: BufferOptions,
    ) -> Result<Self> {
        let capacity = capacity.max(size);
        let bytes = capacity.checked_mul(dtype.bytes()).unwrap_or(usize::MAX);
        let raw = allocator.alloc(bytes, &options)?;
        Ok(Self { raw, dtype, size, capacity, device: allocator.name().to_string() })
    }

    /// Allocate a buffer holding `values`.
    pub fn from_slice<T: HasDType + Copy + Into<ConstValue>>(allocator: &dyn Allocator, values: &[T]) -> Result<Self> {
        let mut buffer = Self::allocate(allocator, T::DTYPE, values.len(), BufferOptions::default())?;
        for (i, v) in values.iter().enumerate() {
            buffer.write(i, (*v).into())?;
        }
        Ok(buffer)
    }

    /// Nominal element count.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocated element count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Nominal size in bytes.
    pub fn nbytes(&self) -> usize {
        self.size * self.dtype.bytes()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// The whole allocation, nominal contents first.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.raw {
            RawBuffer::Cpu { data } => data,
        }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.raw {
            RawBuffer::Cpu { data } => data,
        }
    }

    /// Bytes past the nominal contents.
    pub fn tail_bytes(&self) -> &[u8] {
        let nbytes = self.nbytes();
        &self.as_bytes()[nbytes..]
    }

    /// Copy data from host memory into the nominal contents.
    pub fn copyin(&mut self, src: &[u8]) -> Result<()> {
        let (expected, actual) = (self.nbytes(), src.len());
        ensure!(expected == actual, SizeMismatchSnafu { expected, actual });
        self.as_bytes_mut()[..expected].copy_from_slice(src);
        Ok(())
    }

    /// Copy the nominal contents to host memory.
    pub fn copyout(&self, dst: &mut [u8]) -> Result<()> {
        let (expected, actual) = (self.nbytes(), dst.len());
        ensure!(expected == actual, SizeMismatchSnafu { expected, actual });
        dst.copy_from_slice(&self.as_bytes()[..expected]);
        Ok(())
    }

    /// Read element `index`; any element of the allocation is addressable.
    pub fn read(&self, index: usize) -> Result<ConstValue> {
        let width = self.dtype.bytes();
        let bytes = self.element(index)?;
        ConstValue::decode(self.dtype.base(), &self.as_bytes()[bytes..bytes + width])
            .ok_or_else(|| SizeMismatchSnafu { expected: width, actual: 0usize }.build())
    }

    /// Write element `index`, converting `value` to the buffer dtype.
    pub fn write(&mut self, index: usize, value: ConstValue) -> Result<()> {
        let width = self.dtype.bytes();
        let bytes = self.element(index)?;
        let base = self.dtype.base();
        value
            .encode(base, &mut self.as_bytes_mut()[bytes..bytes + width])
            .ok_or_else(|| SizeMismatchSnafu { expected: width, actual: 0usize }.build())
    }

    /// Nominal contents as values.
    pub fn to_values(&self) -> Result<Vec<ConstValue>> {
        (0..self.size).map(|i| self.read(i)).collect()
    }

    /// Nominal contents widened to `f64`.
    pub fn to_f64(&self) -> Result<Vec<f64>> {
        Ok(self.to_values()?.iter().map(ConstValue::as_f64).collect())
    }

    fn element(&self, index: usize) -> Result<usize> {
        ensure!(index < self.capacity, OutOfBoundsSnafu { buffer: 0usize, index: index as i64, size: self.capacity });
        Ok(index * self.dtype.bytes())
    }
}
