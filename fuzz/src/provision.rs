//! Buffer provisioning.
//!
//! Inputs are filled with uniform random values of their element type. The
//! output is zero-filled and, on compiled devices, extended with a guard
//! region so an out-of-bounds write lands in memory the verifier can inspect.

use linfuzz_device::{Allocator, Buffer, BufferOptions, Device, Result};
use linfuzz_dtype::{ConstValue, ScalarDType};
use rand::Rng;
use tracing::Dispatch;

use crate::kernel::KernelVariant;

/// Allocate the positional buffers `kernel` needs.
///
/// The output gets `red_zone` trailing guard elements when `device` is
/// compiled; interpreted devices never get one.
pub fn provision<D>(kernel: &D::Kernel, device: &D, red_zone: usize, rng: &mut impl Rng) -> Result<Vec<Buffer>>
where
    D: Device,
    D::Kernel: KernelVariant,
{
    let allocator = device.allocator();
    let red_zone = if device.is_compiled() { red_zone } else { 0 };
    let infos = kernel.buffers();

    let mut buffers = Vec::with_capacity(infos.len());
    for (i, info) in infos.iter().enumerate() {
        if i == 0 {
            let capacity = info.size + red_zone;
            buffers.push(Buffer::with_capacity(allocator, info.dtype, info.size, capacity, BufferOptions::zeroed())?);
            continue;
        }
        let mut buffer = Buffer::allocate(allocator, info.dtype, info.size, BufferOptions::default())?;
        tracing::dispatcher::with_default(&Dispatch::none(), || fill_uniform(&mut buffer, rng))?;
        buffers.push(buffer);
    }

    tracing::debug!(buffers = buffers.len(), red_zone, "buffers provisioned");
    Ok(buffers)
}

/// Allocate a buffer shaped like `like`: same dtype and nominal size, with
/// `capacity` elements (or the same capacity when `None`).
pub fn fresh_like(allocator: &dyn Allocator, like: &Buffer, zero: bool, capacity: Option<usize>) -> Result<Buffer> {
    let capacity = capacity.unwrap_or(like.capacity());
    let options = BufferOptions { zero_init: zero };
    Buffer::with_capacity(allocator, like.dtype(), like.size().min(capacity), capacity, options)
}

fn fill_uniform(buffer: &mut Buffer, rng: &mut impl Rng) -> Result<()> {
    let dtype = buffer.dtype().base();
    for i in 0..buffer.size() {
        buffer.write(i, uniform(dtype, rng))?;
    }
    Ok(())
}

fn uniform(dtype: ScalarDType, rng: &mut impl Rng) -> ConstValue {
    match dtype {
        ScalarDType::Bool => ConstValue::Bool(rng.r#gen()),
        ScalarDType::UInt8 => ConstValue::Int(rng.gen_range(0..=255)),
        ScalarDType::Int32 | ScalarDType::Int64 | ScalarDType::Index => ConstValue::Int(rng.gen_range(-16..=16)),
        ScalarDType::Float32 | ScalarDType::Float64 => ConstValue::Float(rng.gen_range(-1.0..1.0)),
        ScalarDType::Void => ConstValue::Int(0),
    }
}
