use std::sync::Arc;

use linfuzz_device::VarVals;
use linfuzz_ir::Variable;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use test_case::test_case;

use crate::test::mock::{MockAction, MockAst, MockDevice, MockKernel};
use crate::{FuzzConfig, KernelVariant, Outcome, Session, Tolerance, Verifier, allclose};

fn rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

fn child(ast: &Arc<MockAst>, action: MockAction) -> MockKernel {
    MockKernel::new(ast.clone()).apply(&action).unwrap()
}

#[test_case(&[1.0, 2.0], &[1.0, 2.0] => true; "equal")]
#[test_case(&[1.005], &[1.0] => true; "within rtol")]
#[test_case(&[0.0], &[0.009] => true; "within atol")]
#[test_case(&[1.05], &[1.0] => false; "outside")]
#[test_case(&[1.0], &[1.0, 2.0] => false; "length mismatch")]
#[test_case(&[f64::NAN], &[f64::NAN] => false; "nan")]
#[test_case(&[f64::INFINITY], &[f64::INFINITY] => true; "equal infinities")]
fn test_allclose(actual: &[f64], expected: &[f64]) -> bool {
    allclose(actual, expected, Tolerance::default())
}

proptest! {
    #[test]
    fn tolerance_law(
        values in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 1..16),
        rtol in 0.0f64..0.5,
        atol in 0.0f64..0.5,
    ) {
        let (a, b): (Vec<f64>, Vec<f64>) = values.into_iter().unzip();
        let law = a.iter().zip(&b).all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs());
        prop_assert_eq!(allclose(&a, &b, Tolerance { rtol, atol }), law);
    }
}

#[test]
fn test_passing_variant() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(16, 2));
    let mut session = Session::new();

    let outcome = verifier.verify(&child(&ast, MockAction::Tile(1)), &mut session, &mut rng());
    assert_eq!(outcome, Outcome::Pass);
    assert_eq!(session.baseline_runs(), 1);
    assert_eq!(session.buffers().unwrap()[0].capacity(), 16 + 1024);
    assert!(session.buffers().unwrap()[0].tail_bytes().iter().all(|&b| b == 0));
}

#[test]
fn test_session_is_reused() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(16, 2));
    let mut session = Session::new();
    let mut rng = rng();

    verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng);
    let truth = session.ground_truth().unwrap().to_vec();
    let inputs = session.buffers().unwrap()[1].as_bytes().to_vec();

    for tile in [1, 0, 1] {
        assert_eq!(verifier.verify(&child(&ast, MockAction::Tile(tile)), &mut session, &mut rng), Outcome::Pass);
        assert_eq!(session.ground_truth().unwrap(), truth.as_slice());
        assert_eq!(session.buffers().unwrap()[1].as_bytes(), inputs.as_slice());
    }
    assert_eq!(session.baseline_runs(), 1);
    assert_eq!(device.executions.get(), 1 + 4);
}

#[test]
fn test_output_is_reset_between_runs() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(16, 2));
    let mut session = Session::new();
    let mut rng = rng();

    assert_eq!(verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng), Outcome::Pass);
    // The previous run left correct values behind; an under-write must still be caught.
    assert_eq!(verifier.verify(&child(&ast, MockAction::Underwrite), &mut session, &mut rng), Outcome::CompareError);
    assert_eq!(session.buffers().unwrap()[0].to_f64().unwrap()[15], 0.0);
}

#[test]
fn test_first_run_under_write_is_caught() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(16, 2));
    let outcome = verifier.verify(&child(&ast, MockAction::Underwrite), &mut Session::new(), &mut rng());
    assert_eq!(outcome, Outcome::CompareError);
}

#[test]
fn test_caller_ground_truth_skips_baseline() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(4, 2));
    let mut session = Session::new().with_ground_truth(vec![1e9; 4]);

    let outcome = verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng());
    assert_eq!(outcome, Outcome::CompareError);
    assert_eq!(session.baseline_runs(), 0);
    assert!(device.compiles.borrow().iter().all(|applied| !applied.is_empty()));
}

#[test]
fn test_broken_baseline() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst { broken_baseline: true, ..MockAst::new(4, 2) });
    let mut session = Session::new();

    let outcome = verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng());
    assert_eq!(outcome, Outcome::BaselineError);
    assert!(session.ground_truth().is_none());
    assert_eq!(device.executions.get(), 0);
}

#[test]
fn test_allocation_failure() {
    let device = MockDevice::with_memory_limit(64);
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(32, 2));
    let mut session = Session::new();

    let outcome = verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng());
    assert_eq!(outcome, Outcome::RawbufsError);
    assert!(session.buffers().is_none());
}

#[test]
fn test_output_reset_failure_after_baseline() {
    // Provisioning takes both allocations, the post-baseline reset gets none.
    let device = MockDevice::with_allocation_budget(2);
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst::new(4, 2));
    let mut session = Session::new();

    let outcome = verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng());
    assert_eq!(outcome, Outcome::RawbufsError);
    assert_eq!(device.executions.get(), 1);
    assert!(session.ground_truth().is_none());
}

#[test]
fn test_vars_are_drawn_from_domain() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst { vars: vec![Variable::new("n", 3, 5)], ..MockAst::new(4, 2) });
    let mut session = Session::new();

    assert_eq!(verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng()), Outcome::Pass);
    let n = session.vars().unwrap()["n"];
    assert!((3..=5).contains(&n));
}

#[test]
fn test_caller_vars_are_used() {
    let device = MockDevice::new();
    let verifier = Verifier::new(&device, &FuzzConfig::default());
    let ast = Arc::new(MockAst { vars: vec![Variable::new("n", 3, 5)], ..MockAst::new(4, 2) });
    let mut session = Session::new().with_vars(VarVals::from([("n".to_string(), 4)]));

    assert_eq!(verifier.verify(&child(&ast, MockAction::Tile(0)), &mut session, &mut rng()), Outcome::Pass);
    let inputs = session.buffers().unwrap()[1].to_f64().unwrap();
    let expected: Vec<f64> = inputs.iter().map(|x| f64::from((2.0 * x + 4.0) as f32)).collect();
    assert_eq!(session.ground_truth().unwrap(), expected.as_slice());
}
