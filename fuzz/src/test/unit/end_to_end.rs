//! Fuzzing the reference kernel representation on the reference CPU device.

use std::collections::HashSet;
use std::sync::Arc;

use linfuzz_device::{Allocator, Buffer, Device, Program, Result, VarVals};
use linfuzz_dtype::{ConstValue, ScalarDType};
use linfuzz_ir::{Ast, BufferDecl, Expr, Kernel, Opt};
use linfuzz_runtime::{CpuDevice, CpuProgram};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::{Corpus, Driver, ExploreMode, Explorer, FuzzConfig, KernelVariant, Outcome, Session, Verifier};

fn add_ast() -> Arc<Ast> {
    Arc::new(Ast {
        name: "c_eq_a_plus_b".into(),
        shape: vec![4],
        reduce: None,
        inputs: vec![BufferDecl::new(ScalarDType::Float32, 4), BufferDecl::new(ScalarDType::Float32, 4)],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::add(Expr::load(1, [1]), Expr::load(2, [1])),
    })
}

fn exhaustive_config() -> FuzzConfig {
    FuzzConfig::builder().seed(42).mode(ExploreMode::Exhaustive).depth(3).build()
}

/// CPU device whose programs never write the last output element once
/// anything beyond the required optimizations has been applied.
struct UnderwritingDevice(CpuDevice);

struct UnderwritingProgram {
    inner: CpuProgram,
    optimized: bool,
}

impl Program for UnderwritingProgram {
    fn execute(&self, buffers: &mut [Buffer], vars: &VarVals) -> Result<()> {
        self.inner.execute(buffers, vars)?;
        if self.optimized {
            let last = buffers[0].size() - 1;
            buffers[0].write(last, ConstValue::Float(0.0))?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl Device for UnderwritingDevice {
    type Kernel = Kernel;
    type Program = UnderwritingProgram;

    fn name(&self) -> &str {
        "UNDERWRITE"
    }

    fn is_compiled(&self) -> bool {
        true
    }

    fn supports_images(&self) -> bool {
        self.0.supports_images()
    }

    fn allocator(&self) -> &dyn Allocator {
        self.0.allocator()
    }

    fn compile(&self, kernel: &Kernel) -> Result<UnderwritingProgram> {
        let required = Kernel::baseline(kernel.ast().clone()).map_or(0, |k| k.applied_opts().len());
        let optimized = kernel.applied_opts().len() > required;
        Ok(UnderwritingProgram { inner: self.0.compile(kernel)?, optimized })
    }
}

#[test]
fn test_add_passes_every_variant() {
    let device = CpuDevice::default();
    let config = exhaustive_config();
    let verifier = Verifier::new(&device, &config);
    let mut session = Session::new();

    let ledger =
        Explorer::new(&verifier, &config).explore(Kernel::new(add_ast()), &mut session, &mut StdRng::seed_from_u64(42));
    assert!(ledger.is_empty(), "{ledger:?}");

    let buffers = session.buffers().unwrap();
    let (a, b) = (buffers[1].to_f64().unwrap(), buffers[2].to_f64().unwrap());
    let expected: Vec<f64> = a.iter().zip(&b).map(|(x, y)| f64::from((x + y) as f32)).collect();
    assert_eq!(session.ground_truth().unwrap(), expected.as_slice());
    assert_eq!(session.baseline_runs(), 1);
}

#[test]
fn test_tiled_add_matches_ground_truth() {
    let device = CpuDevice::default();
    let config = exhaustive_config();
    let verifier = Verifier::new(&device, &config);
    let mut session = Session::new();
    let mut rng = StdRng::seed_from_u64(42);

    for opt in [Opt::upcast(0, 2), Opt::upcast(0, 4), Opt::local(0, 2), Opt::local(0, 4)] {
        let variant = Kernel::new(add_ast()).apply(&opt).unwrap();
        assert_eq!(verifier.verify(&variant, &mut session, &mut rng), Outcome::Pass, "{opt}");
    }
}

#[test]
fn test_under_write_is_a_compare_error() {
    let device = UnderwritingDevice(CpuDevice::default());
    let config = FuzzConfig { rtol: 0.0, atol: 0.0, ..exhaustive_config() };
    let verifier = Verifier::new(&device, &config);
    let mut session = Session::new();

    let ledger =
        Explorer::new(&verifier, &config).explore(Kernel::new(add_ast()), &mut session, &mut StdRng::seed_from_u64(42));

    // Upcasting by the full axis and by 0 converge, so count distinct first-level variants.
    let first_level: HashSet<_> = Kernel::new(add_ast()).actions(false).iter().map(|(_, k)| k.signature()).collect();
    assert_eq!(ledger.count(Outcome::CompareError), first_level.len());
    assert_eq!(ledger.len(), first_level.len(), "failing variants are not explored further");
    assert!(session.ground_truth().unwrap().iter().all(|&x| x != 0.0));
}

#[test]
fn test_builtin_corpus_passes() {
    let device = CpuDevice::builder().images(true).build();
    let config = FuzzConfig::builder().depth(3).max_size(10_000).build();
    let corpus = Corpus::builtin();

    let report = Driver::new(&device, config).run(corpus.asts());
    assert!(report.passed(), "{report}");
    assert_eq!(report.tested, corpus.len());
    assert!(report.to_string().ends_with("all passed"));
}

#[test]
fn test_driver_filters() {
    let corpus = Corpus::builtin();
    let image_index = corpus.asts().iter().position(|ast| ast.requires_images()).unwrap();

    let no_images = CpuDevice::default();
    let config = FuzzConfig::builder().depth(1).max_size(10_000).build();
    let report = Driver::new(&no_images, config).run(corpus.asts());
    assert_eq!(report.tested, corpus.len() - 1);

    let config = FuzzConfig::builder().depth(1).limit(2).build();
    assert_eq!(Driver::new(&no_images, config).run(corpus.asts()).tested, 2);

    let config = FuzzConfig::builder().depth(1).nth(image_index).build();
    assert_eq!(Driver::new(&no_images, config).run(corpus.asts()).tested, 0);

    let config = FuzzConfig::builder().depth(1).nth(0).build();
    assert_eq!(Driver::new(&no_images, config).run(corpus.asts()).tested, 1);
}

#[test]
fn test_driver_reports_failures() {
    let device = UnderwritingDevice(CpuDevice::default());
    let config = FuzzConfig::builder().depth(2).limit(3).rtol(0.0).atol(0.0).build();
    let report = Driver::new(&device, config).run(Corpus::builtin().asts());

    assert!(!report.passed());
    assert_eq!(report.failed_ids, vec![0, 1, 2]);
    let summary = report.to_string();
    assert!(summary.contains("COMPARE_ERROR 0 AST:"), "{summary}");
    assert!(summary.contains(&format!("COMPARE_ERROR: {}", report.ledger.count(Outcome::CompareError))));
}

#[test]
fn test_image_depth_counts_explored_actions() {
    let corpus = Corpus::builtin();
    let image_index = corpus.asts().iter().position(|ast| ast.requires_images()).unwrap();
    let device = UnderwritingDevice(CpuDevice::builder().images(true).build());
    let config = FuzzConfig::builder()
        .mode(ExploreMode::Exhaustive)
        .depth(1)
        .nth(image_index)
        .rtol(0.0)
        .atol(0.0)
        .build();

    let report = Driver::new(&device, config).run(corpus.asts());
    assert_eq!(report.failed_ids, vec![image_index]);
    for (_, records) in report.ledger.iter() {
        for record in records {
            assert_eq!(record.actions.len(), 1, "{}", record.actions_str());
            let replayed = record.replay().unwrap();
            assert_eq!(replayed.applied_opts().len(), 2);
            assert!(replayed.has_image_upcast());
        }
    }
}
