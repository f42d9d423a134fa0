use std::collections::BTreeSet;
use std::sync::Arc;

use linfuzz_device::{Buffer, BufferOptions, Device};
use linfuzz_dtype::{ConstValue, DType, ScalarDType};
use linfuzz_ir::{Ast, BufferDecl, Expr, Kernel, Reduce, ReduceOp};
use linfuzz_runtime::CpuDevice;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{fresh_like, provision};

fn mixed_ast() -> Arc<Ast> {
    Arc::new(Ast {
        name: "mixed".into(),
        shape: vec![4, 8],
        reduce: Some(Reduce { op: ReduceOp::Sum, dims: BTreeSet::from([1]) }),
        inputs: vec![
            BufferDecl::new(ScalarDType::Float32, 32),
            BufferDecl::new(ScalarDType::Int32, 8),
            BufferDecl::new(ScalarDType::UInt8, 8),
        ],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::mul(Expr::load(1, [8, 1]), Expr::add(Expr::load(2, [0, 1]), Expr::load(3, [0, 1]))),
    })
}

#[test]
fn test_buffers_follow_kernel_layout() {
    let device = CpuDevice::default();
    let kernel = Kernel::new(mixed_ast());
    let buffers = provision(&kernel, &device, 16, &mut StdRng::seed_from_u64(1)).unwrap();

    let layout: Vec<(DType, usize)> = buffers.iter().map(|b| (b.dtype(), b.size())).collect();
    assert_eq!(
        layout,
        vec![(DType::Float32, 4), (DType::Float32, 32), (DType::Int32, 8), (DType::Scalar(ScalarDType::UInt8), 8)]
    );
    assert_eq!(buffers[0].capacity(), 4 + 16);
    assert!(buffers[0].as_bytes().iter().all(|&b| b == 0));
}

#[test]
fn test_inputs_are_uniform_per_dtype() {
    let device = CpuDevice::default();
    let buffers = provision(&Kernel::new(mixed_ast()), &device, 0, &mut StdRng::seed_from_u64(1)).unwrap();

    let floats = buffers[1].to_f64().unwrap();
    assert!(floats.iter().all(|x| (-1.0..1.0).contains(x)));
    assert!(floats.iter().any(|&x| x != floats[0]), "inputs should not be constant");

    for value in buffers[2].to_values().unwrap() {
        assert!(matches!(value, ConstValue::Int(v) if (-16..=16).contains(&v)));
    }
    for value in buffers[3].to_values().unwrap() {
        assert!(matches!(value, ConstValue::Int(v) if (0..=255).contains(&v)));
    }
}

#[test]
fn test_same_seed_same_inputs() {
    let device = CpuDevice::default();
    let kernel = Kernel::new(mixed_ast());
    let a = provision(&kernel, &device, 8, &mut StdRng::seed_from_u64(9)).unwrap();
    let b = provision(&kernel, &device, 8, &mut StdRng::seed_from_u64(9)).unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.as_bytes(), y.as_bytes());
    }
}

#[test]
fn test_interpreted_device_gets_no_red_zone() {
    let device = CpuDevice::builder().compiled(false).build();
    let buffers = provision(&Kernel::new(mixed_ast()), &device, 1024, &mut StdRng::seed_from_u64(1)).unwrap();
    assert_eq!(buffers[0].capacity(), buffers[0].size());
}

#[test]
fn test_fresh_like() {
    let device = CpuDevice::default();
    let mut old =
        Buffer::with_capacity(device.allocator(), DType::Float32, 4, 12, BufferOptions::zeroed()).unwrap();
    old.write(2, ConstValue::Float(3.0)).unwrap();
    old.write(9, ConstValue::Float(3.0)).unwrap();

    let fresh = fresh_like(device.allocator(), &old, true, None).unwrap();
    assert_eq!((fresh.dtype(), fresh.size(), fresh.capacity()), (DType::Float32, 4, 12));
    assert!(fresh.as_bytes().iter().all(|&b| b == 0));

    let grown = fresh_like(device.allocator(), &old, true, Some(64)).unwrap();
    assert_eq!((grown.size(), grown.capacity()), (4, 64));
}
