//! Interpreted CPU program.
//!
//! Every instruction owns one register. Loops are executed by jumping back
//! from an [`Ops::EndRange`] to the instruction after its [`Ops::Range`].
//! Loads and stores are checked against the full allocation of the buffer
//! they address, so writes into trailing guard elements succeed and are
//! visible to the caller afterwards.

use std::collections::HashMap;

use linfuzz_device::error::{
    BufferCountSnafu, CompileSnafu, DTypeMismatchSnafu, MissingVariableSnafu, OutOfBoundsSnafu, RuntimeSnafu,
};
use linfuzz_device::{Buffer, Program, Result, VarVals};
use linfuzz_dtype::{ConstValue, DType};
use linfuzz_ir::{Arg, Ops, UOp};
use snafu::{OptionExt, ensure};

#[derive(Debug, Clone)]
pub struct CpuProgram {
    name: String,
    uops: Vec<UOp>,
    /// Range position to matching EndRange position.
    loop_ends: HashMap<usize, usize>,
    /// Expected dtype of every positional buffer.
    params: Vec<DType>,
}

impl CpuProgram {
    /// Validate `uops` and prepare them for execution.
    pub fn new(name: String, uops: Vec<UOp>) -> Result<Self> {
        let mut loop_ends = HashMap::new();
        let mut open = Vec::new();
        let mut params: Vec<Option<DType>> = Vec::new();

        for (pos, uop) in uops.iter().enumerate() {
            if let Some(&src) = uop.src.iter().find(|&&s| s >= pos) {
                return CompileSnafu { reason: format!("instruction {pos} uses {src} before it is defined") }.fail();
            }
            match (uop.op, &uop.arg) {
                (Ops::DefineGlobal, Arg::Buffer(index)) => {
                    if params.len() <= *index {
                        params.resize(index + 1, None);
                    }
                    params[*index] = Some(uop.dtype);
                }
                (Ops::DefineGlobal, _) => {
                    return CompileSnafu { reason: format!("instruction {pos} defines a global without an index") }
                        .fail();
                }
                (Ops::DefineVar, arg) => {
                    ensure!(
                        matches!(arg, Arg::Var(_)),
                        CompileSnafu { reason: format!("instruction {pos} defines a variable without a name") }
                    );
                }
                (Ops::Range, _) => open.push(pos),
                (Ops::EndRange, _) => {
                    let range = open.pop().context(CompileSnafu { reason: format!("unmatched loop end at {pos}") })?;
                    ensure!(
                        uop.src.first() == Some(&range),
                        CompileSnafu { reason: format!("loop end at {pos} closes {:?}, innermost is {range}", uop.src) }
                    );
                    loop_ends.insert(range, pos);
                }
                (Ops::Load | Ops::Store, _) => {
                    let buffer = uop.src.first().map(|&s| uops[s].op);
                    ensure!(
                        buffer == Some(Ops::DefineGlobal),
                        CompileSnafu { reason: format!("memory access at {pos} does not address a global") }
                    );
                }
                _ => {}
            }
        }

        ensure!(open.is_empty(), CompileSnafu { reason: format!("{} loops left open", open.len()) });
        let params = params
            .into_iter()
            .enumerate()
            .map(|(i, dt)| dt.context(CompileSnafu { reason: format!("buffer {i} is never defined") }))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { name, uops, loop_ends, params })
    }

    pub fn uops(&self) -> &[UOp] {
        &self.uops
    }

    pub fn len(&self) -> usize {
        self.uops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uops.is_empty()
    }

    fn check_buffers(&self, buffers: &[Buffer]) -> Result<()> {
        let (expected, actual) = (self.params.len(), buffers.len());
        ensure!(expected == actual, BufferCountSnafu { expected, actual });

        for (i, (param, buffer)) in self.params.iter().zip(buffers).enumerate() {
            let actual = buffer.dtype();
            ensure!(
                param.base() == actual.base() && param.is_image() == actual.is_image(),
                DTypeMismatchSnafu { buffer: i, expected: param.to_string(), actual: actual.to_string() }
            );
        }
        Ok(())
    }
}

/// Element index of a memory access, checked against the whole allocation.
fn element(buffers: &[Buffer], buffer: usize, index: i64) -> Result<usize> {
    let size = buffers[buffer].capacity();
    ensure!(index >= 0 && (index as usize) < size, OutOfBoundsSnafu { buffer, index, size });
    Ok(index as usize)
}

impl Program for CpuProgram {
    fn execute(&self, buffers: &mut [Buffer], vars: &VarVals) -> Result<()> {
        self.check_buffers(buffers)?;

        let mut regs = vec![ConstValue::Int(0); self.uops.len()];
        let mut pc = 0;

        while let Some(uop) = self.uops.get(pc) {
            let src = |i: usize| regs[uop.src[i]];
            let mut next = pc + 1;

            let value = match uop.op {
                Ops::DefineGlobal => match uop.arg {
                    Arg::Buffer(index) => Some(ConstValue::Int(index as i64)),
                    _ => None,
                },
                Ops::DefineVar => match &uop.arg {
                    Arg::Var(name) => {
                        let value = vars.get(name).context(MissingVariableSnafu { name: name.clone() })?;
                        Some(ConstValue::Int(*value))
                    }
                    _ => None,
                },
                Ops::DefineAcc | Ops::Const => match uop.arg {
                    Arg::Value(value) => Some(value.cast(uop.dtype.base())),
                    _ => None,
                },
                Ops::Range => {
                    if src(0).as_i64() <= 0 {
                        next = self.loop_ends[&pc] + 1;
                    }
                    Some(ConstValue::Int(0))
                }
                Ops::EndRange => {
                    let range = uop.src[0];
                    let counter = regs[range].as_i64() + 1;
                    regs[range] = ConstValue::Int(counter);
                    if counter < regs[self.uops[range].src[0]].as_i64() {
                        next = range + 1;
                    }
                    None
                }
                Ops::Load => {
                    let buffer = src(0).as_i64() as usize;
                    let index = element(buffers, buffer, src(1).as_i64())?;
                    Some(buffers[buffer].read(index)?.cast(uop.dtype.base()))
                }
                Ops::Store => {
                    let buffer = src(0).as_i64() as usize;
                    let index = element(buffers, buffer, src(1).as_i64())?;
                    buffers[buffer].write(index, src(2))?;
                    None
                }
                Ops::Assign => {
                    let value = src(1);
                    regs[uop.src[0]] = value;
                    None
                }
                Ops::Cast => Some(src(0).cast(uop.dtype.base())),
                Ops::Unary(op) => Some(crate::alu::unary(op, uop.dtype.base(), src(0))),
                Ops::Binary(op) => Some(crate::alu::binary(op, uop.dtype.base(), src(0), src(1))),
            };

            if let Some(value) = value {
                regs[pc] = value;
            } else if matches!(uop.op, Ops::DefineGlobal | Ops::DefineVar | Ops::DefineAcc | Ops::Const) {
                return RuntimeSnafu { message: format!("instruction {pc} has a malformed argument") }.fail();
            }
            pc = next;
        }

        tracing::trace!(program = %self.name, buffers = buffers.len(), "CPU program finished");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
