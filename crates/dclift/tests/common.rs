#![allow(dead_code)]

use dclift::ir::{Function, Module, Op};
use dclift::isa::{DecodedBlock, DecodedFunction, DecodedInst, RegId};
use dclift::{BatchReport, Target, TranslateConfig, TranslationUnit, toy, translate_functions};

pub fn unit_for(target: &Target) -> TranslationUnit {
    TranslationUnit::new("test", target.registers().regset_type().clone())
}

/// Consecutive 4-byte instructions from `start`, each `(opcode, regs, imms)`.
pub fn block(start: u64, insts: &[(u32, &[RegId], &[i64])]) -> DecodedBlock {
    let mut address = start;
    let mut out = Vec::new();
    for &(opcode, regs, imms) in insts {
        let mut inst = DecodedInst::new(address, toy::INST_SIZE, opcode);
        for reg in regs {
            inst = inst.with_reg(reg.0);
        }
        for &imm in imms {
            inst = inst.with_imm(imm);
        }
        address = inst.next_address();
        out.push(inst);
    }
    DecodedBlock::new(start, out)
}

/// One function made of a single block.
pub fn single(start: u64, insts: &[(u32, &[RegId], &[i64])]) -> DecodedFunction {
    DecodedFunction::new(start, vec![block(start, insts)])
}

/// Lift `functions` with `target`.
pub fn lift_with(
    target: &Target,
    functions: &[DecodedFunction],
    config: &TranslateConfig,
) -> (Module, BatchReport) {
    let unit = unit_for(target);
    let report = translate_functions(&unit, target, config, functions).unwrap();
    (unit.into_module(), report)
}

/// Lift `functions` for the toy target.
pub fn lift(functions: &[DecodedFunction], config: &TranslateConfig) -> (Module, BatchReport) {
    lift_with(&toy::target().unwrap(), functions, config)
}

pub fn lift_sample(name: &str, config: &TranslateConfig) -> (Module, BatchReport) {
    lift(&toy::sample(name).unwrap().functions, config)
}

pub fn function_at(module: &Module, address: u64) -> &Function {
    module.function(module.lookup(address).unwrap())
}

pub fn ops<'a>(func: &'a Function, block: &str) -> Vec<&'a Op> {
    let block = func
        .find_block(block)
        .unwrap_or_else(|| panic!("no block {block}"));
    func.block_ops(block)
}

/// Constant values stored by the named block, in order.
pub fn stored_constants(func: &Function, block: &str) -> Vec<u128> {
    ops(func, block)
        .into_iter()
        .filter_map(|op| match op {
            Op::Store { value, .. } => func.const_int(*value),
            _ => None,
        })
        .collect()
}

pub fn is_placeholder(func: &Function, block: &str) -> bool {
    matches!(ops(func, block).as_slice(), [Op::Trap, Op::Unreachable])
}
