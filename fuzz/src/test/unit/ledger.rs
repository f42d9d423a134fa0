use std::sync::Arc;

use linfuzz_ir::Opt;

use crate::test::mock::{MockAction, MockAst, MockKernel};
use crate::{FailureLedger, FailureRecord, KernelVariant, Outcome};

fn record(actions: &[MockAction]) -> FailureRecord<MockKernel> {
    let ast = Arc::new(MockAst::new(4, 2));
    let kernel = MockKernel::replay(ast.clone(), actions).unwrap();
    FailureRecord::new(&MockKernel::new(ast), &kernel)
}

#[test]
fn test_record_and_count() {
    let mut ledger = FailureLedger::new();
    assert!(ledger.is_empty());

    ledger.record(Outcome::CompareError, record(&[MockAction::Underwrite]));
    ledger.record(Outcome::CompileError, record(&[MockAction::Reject]));
    ledger.record(Outcome::CompareError, record(&[MockAction::Tile(1), MockAction::Underwrite]));

    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.count(Outcome::CompareError), 2);
    assert_eq!(ledger.count(Outcome::ExecError), 0);
    assert!(ledger.get(Outcome::ExecError).is_empty());
    assert_eq!(ledger.outcomes().collect::<Vec<_>>(), vec![Outcome::CompileError, Outcome::CompareError]);
    assert_eq!(ledger.get(Outcome::CompareError)[1].actions_str(), "[tile1, Underwrite]");
}

#[test]
fn test_merge_keeps_order() {
    let mut run = FailureLedger::new();
    run.record(Outcome::ExecError, record(&[MockAction::Trap]));

    let mut ast_ledger = FailureLedger::new();
    ast_ledger.record(Outcome::ExecError, record(&[MockAction::Tile(0), MockAction::Trap]));
    ast_ledger.record(Outcome::RedzoneError, record(&[MockAction::Overflow]));
    run.merge(ast_ledger);

    assert_eq!(run.len(), 3);
    let execs: Vec<_> = run.get(Outcome::ExecError).iter().map(|r| r.actions.clone()).collect();
    assert_eq!(execs, vec![vec![MockAction::Trap], vec![MockAction::Tile(0), MockAction::Trap]]);
}

#[test]
fn test_replay_rebuilds_ir_kernel() {
    use linfuzz_dtype::ScalarDType;
    use linfuzz_ir::{Ast, BufferDecl, Expr, Kernel};

    let ast = Arc::new(Ast {
        name: "add".into(),
        shape: vec![4, 8],
        reduce: None,
        inputs: vec![BufferDecl::new(ScalarDType::Float32, 32)],
        output: ScalarDType::Float32,
        vars: vec![],
        expr: Expr::load(1, [8, 1]),
    });
    let baseline = Kernel::new(ast);
    let kernel = baseline.apply(&Opt::upcast(1, 4)).unwrap().apply(&Opt::local(0, 2)).unwrap();
    let record = FailureRecord::new(&baseline, &kernel);

    let replayed = record.replay().unwrap();
    assert_eq!(replayed.applied_opts(), kernel.applied_opts());
    assert_eq!(replayed.signature(), kernel.signature());
}

#[test]
fn test_required_actions_are_not_recorded() {
    let corpus = crate::Corpus::builtin();
    let ast = corpus.asts().iter().find(|ast| ast.requires_images()).unwrap().clone();
    let baseline = linfuzz_ir::Kernel::baseline(ast).unwrap();
    assert_eq!(baseline.applied_opts().len(), 1);

    let kernel = baseline.apply(&Opt::local(0, 2)).unwrap();
    let record = FailureRecord::new(&baseline, &kernel);
    assert_eq!(record.actions, vec![Opt::local(0, 2)]);

    let replayed = record.replay().unwrap();
    assert_eq!(replayed.applied_opts(), kernel.applied_opts());
    assert!(replayed.has_image_upcast());
}
