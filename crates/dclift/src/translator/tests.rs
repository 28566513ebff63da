use dclift_ir::{Callee, Op, verify_function};
use dclift_isa::{SemaOp, SemaProgram, SemanticsAssembler, ValueType};
use dclift_regs::{REGSET_DIFF_FN, RegisterSet};

use super::*;

const NOP: u32 = 0;
const MOVI: u32 = 1;
const ADD: u32 = 2;
const JR: u32 = 3;
const UDF: u32 = 4;
const PARTIAL: u32 = 5;
const SPLIT: u32 = 6;

fn test_target() -> Target {
    use ValueType::{I64, Other};

    let regs = RegisterSet::builder()
        .root("r0", Type::I64)
        .root("r1", Type::I64)
        .root("r2", Type::I64)
        .root("pc", Type::I64)
        .build("pc")
        .unwrap();
    let mut asm = SemanticsAssembler::new();
    asm.define(NOP, "NOP", &SemaProgram::new()).unwrap();
    asm.define(MOVI, "MOVI", &SemaProgram::new().constant_op(I64, 1).put_rc(0))
        .unwrap();
    asm.define(
        ADD,
        "ADD",
        &SemaProgram::new()
            .get_rc(I64, 1)
            .get_rc(I64, 2)
            .op(SemaOp::Add, I64)
            .put_rc(0),
    )
    .unwrap();
    asm.define(
        JR,
        "JR",
        &SemaProgram::new().get_rc(I64, 0).op(SemaOp::BrInd, Other),
    )
    .unwrap();
    asm.declare(UDF, "UDF");
    // writes r0, then needs a custom operand no hook provides
    asm.define(
        PARTIAL,
        "PARTIAL",
        &SemaProgram::new()
            .constant_op(I64, 1)
            .put_rc(0)
            .custom_op(I64, 99, 1),
    )
    .unwrap();
    asm.define(SPLIT, "SPLIT", &SemaProgram::new()).unwrap();
    Target::new("test", asm.build().unwrap(), regs)
}

fn unit_for(target: &Target) -> TranslationUnit {
    TranslationUnit::new("test", target.registers().regset_type().clone())
}

fn inst(address: u64, opcode: u32) -> DecodedInst {
    DecodedInst::new(address, 4, opcode)
}

fn is_placeholder(func: &Function, block: BlockRef) -> bool {
    matches!(func.block_ops(block).as_slice(), [Op::Trap, Op::Unreachable])
}

#[test]
fn test_scaffolding() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let func = t.function();

    assert_eq!(func.name(), "fn_100");
    assert!(func.param_attrs.noalias);
    assert!(func.param_attrs.nocapture);
    assert_eq!(func.block_name(t.entry_block()), "entry_fn_100");
    assert_eq!(func.block_name(t.exit_block()), "exit_fn_100");
    assert!(matches!(func.block_ops(t.exit_block()).as_slice(), [Op::Ret]));

    let first = func.find_block("bb_100").unwrap();
    assert!(is_placeholder(func, first));
    assert_eq!(t.block_state(0x100), Some(BlockState::Unclaimed));
    let br = func.terminator(t.entry_block()).unwrap();
    assert!(matches!(func.inst(br).op, Op::Br { target } if target == first));
}

#[test]
fn test_block_created_once() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();

    let a = t.get_or_create_block(0x180).unwrap();
    let count = t.function().block_count();
    let b = t.get_or_create_block(0x180).unwrap();
    assert_eq!(a, b);
    assert_eq!(t.function().block_count(), count);
    assert_eq!(t.block_state(0x200), None);
}

#[test]
fn test_claim_once() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let block = DecodedBlock::new(0x100, vec![inst(0x100, NOP)]);

    t.switch_to_block(&block).unwrap();
    assert_eq!(t.block_state(0x100), Some(BlockState::Claimed));
    t.translate_inst(&block.instructions[0]).unwrap();
    t.finalize_block().unwrap();

    let err = t.switch_to_block(&block).unwrap_err();
    assert!(matches!(err, Error::Invariant { .. }), "{err}");
}

#[test]
fn test_open_block_must_be_finalized() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();

    t.switch_to_block(&DecodedBlock::new(0x100, vec![inst(0x100, NOP)]))
        .unwrap();
    let err = t
        .switch_to_block(&DecodedBlock::new(0x104, vec![inst(0x104, NOP)]))
        .unwrap_err();
    assert!(err.to_string().contains("still open"), "{err}");
    assert!(t.finish().is_err());
    assert!(!unit.is_translated(unit.lookup(0x100).unwrap()));
}

#[test]
fn test_fallthrough() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let block = DecodedBlock::new(0x100, vec![inst(0x100, MOVI).with_reg(0).with_imm(7)]);

    t.switch_to_block(&block).unwrap();
    t.translate_inst(&block.instructions[0]).unwrap();
    assert!(!t.is_terminated());
    t.finalize_block().unwrap();

    let func = t.function();
    let bb = func.find_block("bb_100").unwrap();
    let next = func.find_block("bb_104").unwrap();
    let br = func.terminator(bb).unwrap();
    assert!(matches!(func.inst(br).op, Op::Br { target } if target == next));
    assert!(is_placeholder(func, next));
    assert_eq!(t.block_state(0x104), Some(BlockState::Unclaimed));
}

#[test]
fn test_pc_advanced_before_semantics() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let block = DecodedBlock::new(0x100, vec![inst(0x100, NOP)]);

    t.switch_to_block(&block).unwrap();
    t.translate_inst(&block.instructions[0]).unwrap();
    let func = t.function();
    let bb = func.find_block("bb_100").unwrap();
    let adds: Vec<_> = func
        .block_ops(bb)
        .into_iter()
        .filter_map(|op| match op {
            Op::Binary {
                op: dclift_ir::BinOp::Add,
                rhs,
                ..
            } => func.const_int(*rhs),
            _ => None,
        })
        .collect();
    assert_eq!(adds, vec![4]);
}

#[test]
fn test_indirect_branch_splits_and_exits() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x200).unwrap();
    let block = DecodedBlock::new(
        0x200,
        vec![inst(0x200, NOP), inst(0x204, JR).with_reg(1)],
    );

    t.switch_to_block(&block).unwrap();
    for i in &block.instructions {
        t.translate_inst(i).unwrap();
    }
    assert!(t.is_terminated());
    t.finalize_block().unwrap();

    let func = t.function();
    let call_block = func.find_block("bb_200_call").unwrap();
    let cont = func.find_block("bb_200_c204").unwrap();
    assert_eq!(t.call_blocks(), &[call_block]);
    match func.block_ops(call_block).as_slice() {
        [Op::Call { callee: Callee::Indirect(_), args }, Op::Br { target }] => {
            assert_eq!(args.as_slice(), &[func.regset_arg()]);
            assert_eq!(*target, cont);
        }
        ops => panic!("unexpected call block {ops:?}"),
    }
    let exit = t.exit_block();
    let br = func.terminator(cont).unwrap();
    assert!(matches!(func.inst(br).op, Op::Br { target } if target == exit));
}

#[test]
fn test_direct_call_declares_callee() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x200).unwrap();

    t.switch_to_block(&DecodedBlock::new(0x200, vec![inst(0x200, NOP)]))
        .unwrap();
    let callee = t.builder().const_i64(0x900);
    let call_block = t.insert_call(callee).unwrap();

    let id = unit.lookup(0x900).unwrap();
    assert!(!unit.is_translated(id));
    let func = t.function();
    assert!(matches!(
        func.block_ops(call_block).first(),
        Some(Op::Call { callee: Callee::Direct(c), .. }) if *c == id
    ));
    assert!(func.find_block("bb_200_c").is_some());
}

#[test]
fn test_finish_brackets_calls() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let decoded = DecodedFunction::new(
        0x200,
        vec![DecodedBlock::new(
            0x200,
            vec![inst(0x200, MOVI).with_reg(1).with_imm(0x40), inst(0x204, JR).with_reg(1)],
        )],
    );
    let id = translate_function(&unit, &target, &config, &decoded).unwrap();

    unit.with_module(|module| {
        let func = module.function(id);
        let call_block = func.find_block("bb_200_call").unwrap();
        let ops = func.block_ops(call_block);
        let call = ops.iter().position(|op| op.is_call()).unwrap();
        assert!(ops[..call].iter().any(|op| matches!(op, Op::Store { .. })));
        assert!(ops[call + 1..].iter().any(|op| matches!(op, Op::Load { .. })));
        assert!(matches!(ops.last(), Some(Op::Br { .. })));
        verify_function(func).unwrap();
    });
}

#[test]
fn test_external_tail_call() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();

    let block = t.create_external_tail_call(0x300).unwrap();
    let external = unit.lookup(0x300).unwrap();
    let func = t.function();
    assert_eq!(func.find_block("bb_300"), Some(block));
    let call_block = func.find_block("bb_300_call").unwrap();
    let cont = func.find_block("bb_300_c").unwrap();
    assert!(matches!(
        func.block_ops(call_block).first(),
        Some(Op::Call { callee: Callee::Direct(c), .. }) if *c == external
    ));
    assert!(matches!(func.block_ops(cont).as_slice(), [Op::Ret]));
    assert_eq!(t.block_state(0x300), Some(BlockState::Claimed));
}

#[test]
fn test_external_tail_call_inside_block() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let block = DecodedBlock::new(0x100, vec![inst(0x100, NOP)]);

    t.switch_to_block(&block).unwrap();
    t.translate_inst(&block.instructions[0]).unwrap();
    let tail = t.create_external_tail_call(0x300).unwrap();
    // still emitting into bb_100
    t.builder().br(tail).unwrap();
    t.finalize_block().unwrap();

    let func = t.function();
    let bb = func.find_block("bb_100").unwrap();
    assert!(matches!(func.block_ops(bb).last(), Some(Op::Br { target }) if *target == tail));
    assert!(matches!(func.block_ops(tail).last(), Some(Op::Br { .. })));
    assert_eq!(t.block_state(0x300), Some(BlockState::Claimed));

    let id = t.finish().unwrap();
    unit.with_module(|module| verify_function(module.function(id)).unwrap());
}

#[test]
fn test_register_diff_exit() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new().with_register_diff(true);
    let t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let func = t.function();

    let diff = func.find_block("diff_exit_fn_100").unwrap();
    match func.block_ops(diff).as_slice() {
        [Op::Call { callee: Callee::External(name), args }, Op::Ret] => {
            assert_eq!(name, REGSET_DIFF_FN);
            assert_eq!(args.len(), 3);
            assert_eq!(args[2], func.regset_arg());
        }
        ops => panic!("unexpected diff block {ops:?}"),
    }
    let br = func.terminator(t.exit_block()).unwrap();
    assert!(matches!(func.inst(br).op, Op::Br { target } if target == diff));
    assert!(
        func.block_ops(t.entry_block())
            .iter()
            .any(|op| matches!(op, Op::Alloca))
    );
}

#[test]
fn test_instruction_trace() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new().with_instruction_trace(0x8000);
    let mut t = Translator::new(&unit, &target, &config, 0x100).unwrap();
    let block = DecodedBlock::new(0x100, vec![inst(0x100, NOP)]);

    t.switch_to_block(&block).unwrap();
    t.translate_inst(&block.instructions[0]).unwrap();
    let func = t.function();
    let bb = func.find_block("bb_100").unwrap();
    let traced: Vec<_> = func
        .block_ops(bb)
        .into_iter()
        .filter_map(|op| match op {
            Op::Store {
                value,
                volatile: true,
                ..
            } => func.const_int(*value),
            _ => None,
        })
        .collect();
    assert_eq!(traced, vec![0x100]);
}

#[test]
fn test_unmapped_strict() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let decoded = DecodedFunction::new(
        0x100,
        vec![DecodedBlock::new(0x100, vec![inst(0x100, NOP), inst(0x104, UDF)])],
    );

    let err = translate_function(&unit, &target, &config, &decoded).unwrap_err();
    assert!(matches!(err, Error::UnmappedOpcode { .. }));
    let loc = err.location().unwrap();
    assert_eq!(loc.address, 0x104);
    assert_eq!(loc.mnemonic, "UDF");
    assert!(!unit.is_translated(unit.lookup(0x100).unwrap()));
}

#[test]
fn test_unmapped_permissive() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new().permissive();
    let decoded = DecodedFunction::new(
        0x100,
        vec![
            DecodedBlock::new(
                0x100,
                vec![
                    inst(0x100, UDF),
                    inst(0x104, ADD).with_reg(0).with_reg(1).with_reg(2),
                ],
            ),
            DecodedBlock::new(0x108, vec![inst(0x108, NOP)]),
        ],
    );

    let id = translate_function(&unit, &target, &config, &decoded).unwrap();
    unit.with_module(|module| {
        let func = module.function(id);
        let bb = func.find_block("bb_100").unwrap();
        let ops = func.block_ops(bb);
        assert!(matches!(ops.as_slice(), [.., Op::Trap, Op::Unreachable]));
        // the add after the trap was skipped
        assert!(!ops.iter().any(|op| matches!(op, Op::Binary { .. })));
        let next = func.find_block("bb_108").unwrap();
        assert!(!is_placeholder(func, next));
    });
}

#[test]
fn test_rejects_foreign_unit() {
    let target = test_target();
    let unit = TranslationUnit::new("other", Type::Struct(vec![Type::I32]));
    let config = TranslateConfig::new();
    let err = Translator::new(&unit, &target, &config, 0x100).err().unwrap();
    assert!(matches!(err, Error::Invariant { .. }));
}

#[test]
fn test_translate_twice() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let decoded = DecodedFunction::new(
        0x100,
        vec![DecodedBlock::new(0x100, vec![inst(0x100, JR).with_reg(0)])],
    );

    translate_function(&unit, &target, &config, &decoded).unwrap();
    let err = translate_function(&unit, &target, &config, &decoded).unwrap_err();
    assert!(matches!(err, Error::AlreadyTranslated { address: 0x100 }));
}

#[test]
fn test_empty_function_rejected() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let err = translate_function(&unit, &target, &config, &DecodedFunction::new(0x100, vec![]))
        .unwrap_err();
    assert!(matches!(err, Error::Invariant { .. }));
}

#[test]
fn test_empty_block_traps() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new();
    let decoded = DecodedFunction::new(0x100, vec![DecodedBlock::new(0x100, vec![])]);

    let id = translate_function(&unit, &target, &config, &decoded).unwrap();
    unit.with_module(|module| {
        let func = module.function(id);
        let bb = func.find_block("bb_100").unwrap();
        let ops = func.block_ops(bb);
        assert!(matches!(ops.as_slice(), [.., Op::Trap, Op::Unreachable]), "{ops:?}");
        assert!(!ops.iter().any(|op| matches!(op, Op::Br { .. })));
        verify_function(func).unwrap();
    });
}

#[test]
fn test_permissive_discards_partial_effects() {
    let target = test_target();
    let unit = unit_for(&target);
    let config = TranslateConfig::new().permissive();
    let decoded = DecodedFunction::new(
        0x100,
        vec![DecodedBlock::new(
            0x100,
            vec![inst(0x100, PARTIAL).with_reg(0).with_imm(42)],
        )],
    );

    let id = translate_function(&unit, &target, &config, &decoded).unwrap();
    unit.with_module(|module| {
        let func = module.function(id);
        let bb = func.find_block("bb_100").unwrap();
        let ops = func.block_ops(bb);
        assert!(matches!(ops.as_slice(), [.., Op::Trap, Op::Unreachable]));
        let stored: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                Op::Store { value, .. } => func.const_int(*value),
                _ => None,
            })
            .collect();
        // only the block's PC write survives; neither r0 = 42 nor the PC advance
        assert_eq!(stored, vec![0x100]);
        assert!(!ops.iter().any(|op| matches!(op, Op::Binary { .. })));
        verify_function(func).unwrap();
    });
}

/// Splits a call site, then fails.
struct FailAfterCall;

impl crate::target::TargetHooks for FailAfterCall {
    fn translate_whole(&self, t: &mut Translator<'_>, inst: &DecodedInst) -> Result<WholeInst> {
        if inst.opcode != SPLIT {
            return Ok(WholeInst::Declined);
        }
        let callee = t.builder().const_i64(0x400);
        t.insert_call(callee)?;
        Err(Error::semantic("after call"))
    }
}

#[test]
fn test_permissive_discards_call_split() {
    let target = test_target().with_hooks(FailAfterCall);
    let unit = unit_for(&target);
    let config = TranslateConfig::new().permissive();
    let decoded = DecodedFunction::new(
        0x100,
        vec![DecodedBlock::new(0x100, vec![inst(0x100, SPLIT)])],
    );

    let id = translate_function(&unit, &target, &config, &decoded).unwrap();
    unit.with_module(|module| {
        let func = module.function(id);
        let bb = func.find_block("bb_100").unwrap();
        let ops = func.block_ops(bb);
        assert!(matches!(ops.as_slice(), [.., Op::Trap, Op::Unreachable]));
        assert!(!ops.iter().any(|op| matches!(op, Op::Br { .. })));
        let cont = func.find_block("bb_100_c100").unwrap();
        assert!(matches!(func.block_ops(cont).as_slice(), [.., Op::Trap, Op::Unreachable]));
        verify_function(func).unwrap();
    });
}
