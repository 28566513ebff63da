//! Semantic operation behaviour, observed through constant folding and the
//! shape of the emitted IR.

mod common;

use common::{lift, lift_with, ops, single, stored_constants};
use dclift::ir::{BinOp, CastOp, Intrinsic, Op, Type};
use dclift::isa::{Predicate, RegId, SemaOp, SemaProgram, SemanticsAssembler, ValueType};
use dclift::toy::{d, h, op, w, x};
use dclift::{Error, Target, TranslateConfig, toy};

/// A toy-register target whose opcode 0 runs `program`.
fn one_op_target(program: &SemaProgram) -> Target {
    let mut asm = SemanticsAssembler::new();
    asm.define(0, "OP", program).unwrap();
    asm.define(1, "HALT", &SemaProgram::new().op(SemaOp::Trap, ValueType::Other))
        .unwrap();
    Target::new("one-op", asm.build().unwrap(), toy::registers().unwrap())
}

fn lift_one(program: &SemaProgram, regs: &[RegId], imms: &[i64]) -> dclift::ir::Module {
    let target = one_op_target(program);
    let f = single(0x100, &[(0, regs, imms), (1, &[], &[])]);
    let (module, report) = lift_with(&target, &[f], &TranslateConfig::new());
    assert!(report.is_complete(), "{:?}", report.failed);
    module
}

#[test]
fn test_operands_consumed_in_push_order() {
    use ValueType::I64;
    let program = SemaProgram::new()
        .constant_op(I64, 0)
        .constant_op(I64, 1)
        .op(SemaOp::Sub, I64)
        .put_reg(x(0).0);
    let module = lift_one(&program, &[], &[10, 3]);
    let stored = stored_constants(common::function_at(&module, 0x100), "bb_100");
    assert!(stored.contains(&7), "{stored:?}");
    assert!(!stored.contains(&(u128::from(u64::MAX) - 6)));
}

#[test]
fn test_unsigned_wide_multiply() {
    use ValueType::I32;
    let program = SemaProgram::new()
        .constant_op(I32, 2)
        .constant_op(I32, 3)
        .mul_lohi(SemaOp::UMulLoHi, I32, I32)
        .put_rc(0)
        .put_rc(1);
    let module = lift_one(&program, &[w(0), w(1)], &[0xFFFF_FFFF, 2]);
    let stored = stored_constants(common::function_at(&module, 0x100), "bb_100");
    assert!(stored.contains(&0xFFFF_FFFE), "{stored:?}");
    assert!(stored.contains(&1), "{stored:?}");
}

#[test]
fn test_signed_wide_multiply() {
    use ValueType::I32;
    let program = SemaProgram::new()
        .constant_op(I32, 2)
        .constant_op(I32, 3)
        .mul_lohi(SemaOp::SMulLoHi, I32, I32)
        .put_rc(0)
        .put_rc(1);
    // -1 * 2 = -2: lo 0xFFFFFFFE, hi 0xFFFFFFFF
    let module = lift_one(&program, &[w(0), w(1)], &[-1, 2]);
    let stored = stored_constants(common::function_at(&module, 0x100), "bb_100");
    assert!(stored.contains(&0xFFFF_FFFE), "{stored:?}");
    assert!(stored.contains(&0xFFFF_FFFF), "{stored:?}");
}

#[test]
fn test_rotate() {
    use ValueType::I64;
    let rotate = |amount: i64| {
        let program = SemaProgram::new()
            .constant_op(I64, 0)
            .constant_op(I64, 1)
            .op(SemaOp::Rotl, I64)
            .put_reg(x(0).0);
        let module = lift_one(&program, &[], &[0x8000_0000_0000_0001_u64 as i64, amount]);
        stored_constants(common::function_at(&module, 0x100), "bb_100")
    };
    assert!(rotate(1).contains(&3));
    assert!(rotate(0).contains(&0x8000_0000_0000_0001));
    assert!(rotate(64).contains(&0x8000_0000_0000_0001));
}

#[test]
fn test_shift_amount_resized() {
    use ValueType::{I8, I64};
    let program = SemaProgram::new()
        .constant_op(I64, 0)
        .constant_op(I8, 1)
        .op(SemaOp::Shl, I64)
        .put_reg(x(0).0);
    let module = lift_one(&program, &[], &[1, 4]);
    let stored = stored_constants(common::function_at(&module, 0x100), "bb_100");
    assert!(stored.contains(&16), "{stored:?}");
}

#[test]
fn test_put_rc_merges_narrow_values() {
    let (module, _) = lift(
        &[single(0x100, &[(op::MOVK, &[x(9)], &[0x1234]), (op::RET, &[], &[])])],
        &TranslateConfig::new(),
    );
    let func = common::function_at(&module, 0x100);
    let ops = ops(func, "bb_100");
    // merge keeps the upper 48 bits of the old value
    assert!(ops.iter().any(|op| matches!(op, Op::Binary { op: BinOp::And, .. })));
    assert!(ops.iter().any(|op| matches!(op, Op::Binary { op: BinOp::Or, .. })));
}

#[test]
fn test_get_rc_truncates_and_bitcasts() {
    let (module, _) = lift(
        &[single(
            0x100,
            &[
                (op::MOVH, &[h(1), h(2)], &[]),
                (op::FSQRT, &[d(0), d(1)], &[]),
                (op::RET, &[], &[]),
            ],
        )],
        &TranslateConfig::new(),
    );
    let func = common::function_at(&module, 0x100);
    let ops = ops(func, "bb_100");
    assert!(ops.iter().any(|op| matches!(op, Op::Cast { op: CastOp::Trunc, .. })));
    assert!(ops.iter().any(|op| matches!(op, Op::Cast { op: CastOp::BitCast, .. })));
    assert!(ops.iter().any(|op| matches!(
        op,
        Op::Intrinsic { intrinsic: Intrinsic::Sqrt, .. }
    )));
}

#[test]
fn test_memory_alignment_and_extension() {
    let (module, _) = common::lift_sample("memory", &TranslateConfig::new());
    let func = common::function_at(&module, 0x4000);
    let ops = ops(func, "bb_4000");

    let loads: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Load { ptr, align, .. } => Some((func.value_type(*ptr).pointee().cloned(), *align)),
            _ => None,
        })
        .collect();
    assert!(loads.contains(&(Some(Type::I64), 1)), "{loads:?}");
    assert!(loads.contains(&(Some(Type::I8), 1)), "{loads:?}");
    assert!(loads.contains(&(Some(Type::I16), 1)), "{loads:?}");
    assert!(ops.iter().any(|op| matches!(op, Op::Store { align: 1, .. })));
    assert!(ops.iter().any(|op| matches!(op, Op::Cast { op: CastOp::ZExt, .. })));
    assert!(ops.iter().any(|op| matches!(op, Op::Cast { op: CastOp::SExt, .. })));
    assert!(ops.iter().any(|op| matches!(op, Op::Fence { .. })));
}

#[test]
fn test_fence_scope_out_of_range() {
    let f = single(0x100, &[(op::FENCE, &[], &[7, 2])]);
    let target = toy::target().unwrap();
    let unit = common::unit_for(&target);
    let err = dclift::translate_function(&unit, &target, &TranslateConfig::new().permissive(), &f)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Encoding { what: "synchronization scope", value: 2, .. }
    ));
    assert!(!err.is_recoverable());
    assert_eq!(err.location().unwrap().mnemonic, "FENCE");
}

#[test]
fn test_and_predicate() {
    use ValueType::I64;
    let program = SemaProgram::new()
        .constant_op(I64, 0)
        .constant_op(I64, 1)
        .predicate(Predicate::AndSu, I64)
        .put_reg(x(0).0);
    let module = lift_one(&program, &[], &[0b1100, 0b1010]);
    let stored = stored_constants(common::function_at(&module, 0x100), "bb_100");
    assert!(stored.contains(&0b1000), "{stored:?}");
}

#[test]
fn test_literal_pool_constant() {
    let (module, _) = lift(
        &[single(0x100, &[(op::MOVW, &[x(1)], &[]), (op::RET, &[], &[])])],
        &TranslateConfig::new(),
    );
    let stored = stored_constants(common::function_at(&module, 0x100), "bb_100");
    assert!(stored.contains(&u128::from(toy::WIDE_LITERAL)));
}

#[test]
fn test_target_hooks() {
    let (module, report) = lift(
        &[single(
            0x100,
            &[
                (op::MADD, &[x(2), x(0), x(1)], &[]),
                (op::LDRX, &[x(3), x(0), x(1)], &[]),
                (op::ADDS, &[x(4), x(0)], &[1]),
                (op::HINT, &[], &[0]),
                (op::RET, &[], &[]),
            ],
        )],
        &TranslateConfig::new(),
    );
    assert!(report.is_complete(), "{:?}", report.failed);
    let func = common::function_at(&module, 0x100);
    let ops = ops(func, "bb_100");
    let binaries: Vec<_> = ops
        .iter()
        .filter_map(|op| match op {
            Op::Binary { op, rhs, .. } => Some((*op, func.const_int(*rhs))),
            _ => None,
        })
        .collect();
    assert!(binaries.contains(&(BinOp::Mul, None)));
    // scaled index and shifted immediate
    assert!(binaries.contains(&(BinOp::Shl, Some(3))));
    assert!(binaries.contains(&(BinOp::Add, Some(0x1000))));
    // flags = (x4 == 0)
    assert!(ops.iter().any(|op| matches!(op, Op::ICmp { .. })));
}

#[test]
fn test_unhandled_custom_operand_is_recoverable() {
    let f = single(0x100, &[(op::SYS, &[x(0)], &[3]), (op::RET, &[], &[])]);
    let target = toy::target().unwrap();
    let unit = common::unit_for(&target);
    let err = dclift::translate_function(&unit, &target, &TranslateConfig::new(), &f).unwrap_err();
    assert!(matches!(err, Error::SemanticOperation { .. }), "{err}");
    assert!(err.is_recoverable());

    let (module, report) = lift(&[f], &TranslateConfig::new().permissive());
    assert!(report.is_complete());
    let func = common::function_at(&module, 0x100);
    assert!(matches!(
        ops(func, "bb_100").as_slice(),
        [.., Op::Trap, Op::Unreachable]
    ));
}

#[test]
fn test_unhandled_hint_is_unmapped() {
    let f = single(0x100, &[(op::HINT, &[], &[5])]);
    let target = toy::target().unwrap();
    let unit = common::unit_for(&target);
    let err = dclift::translate_function(&unit, &target, &TranslateConfig::new(), &f).unwrap_err();
    assert!(matches!(err, Error::UnmappedOpcode { .. }));
}

#[test]
fn test_direct_branch_needs_constant() {
    use ValueType::{I64, Other};
    let program = SemaProgram::new().get_rc(I64, 0).op(SemaOp::Br, Other);
    let target = one_op_target(&program);
    let unit = common::unit_for(&target);
    let f = single(0x100, &[(0, &[x(1)], &[])]);
    let err = dclift::translate_function(&unit, &target, &TranslateConfig::new(), &f).unwrap_err();
    assert!(matches!(err, Error::Invariant { .. }), "{err}");
}

#[test]
fn test_unknown_semantic_opcode() {
    let program = SemaProgram::new().word(0x90).word(ValueType::I64.code());
    let target = one_op_target(&program);
    let unit = common::unit_for(&target);
    let f = single(0x100, &[(0, &[], &[])]);
    let err = dclift::translate_function(&unit, &target, &TranslateConfig::new(), &f).unwrap_err();
    assert!(matches!(err, Error::SemanticOperation { .. }), "{err}");
}
