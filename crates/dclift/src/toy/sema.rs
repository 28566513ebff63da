use dclift_isa::{
    Predicate, SemaError, SemaOp, SemaProgram, SemanticsAssembler, SemanticsTable,
    TARGET_OPCODE_START, ValueType,
};

use super::{FLAGS, op};

/// Target extension opcode: multiply-accumulate of three operands.
pub const MADD_OP: u32 = TARGET_OPCODE_START;

/// Complex pattern: `rs1 + (rs2 << 3)` from operands 1 and 2.
pub const SCALED_INDEX: u32 = 1;

/// Custom operand kind: immediate shifted left by 12.
pub const SHIFTED_IMM: u32 = 1;

/// Custom operand kind the hooks do not know.
const SYSTEM_REGISTER: u32 = 7;

/// The value `MOVW` materializes from the literal pool.
pub const WIDE_LITERAL: u64 = 0xdead_beef_cafe_f00d;

fn binary(op: SemaOp, vt: ValueType) -> SemaProgram {
    SemaProgram::new()
        .get_rc(vt, 1)
        .get_rc(vt, 2)
        .op(op, vt)
        .put_rc(0)
}

/// Semantics table for every toy opcode.
pub fn semantics() -> Result<SemanticsTable, SemaError> {
    use ValueType::{F64, I16, I32, I64, Other};

    let mut asm = SemanticsAssembler::new();
    let wide = asm.literal(WIDE_LITERAL);

    asm.define(op::NOP, "NOP", &SemaProgram::new())?;
    asm.define(op::MOVI, "MOVI", &SemaProgram::new().constant_op(I64, 1).put_rc(0))?;
    asm.define(op::MOVW, "MOVW", &SemaProgram::new().mov_constant(I64, wide).put_rc(0))?;
    asm.define(op::MOVK, "MOVK", &SemaProgram::new().constant_op(I16, 1).put_rc(0))?;
    asm.define(op::ADD, "ADD", &binary(SemaOp::Add, I64))?;
    asm.define(op::SUB, "SUB", &binary(SemaOp::Sub, I64))?;
    asm.define(op::MUL, "MUL", &binary(SemaOp::Mul, I64))?;
    asm.define(op::SHL, "SHL", &binary(SemaOp::Shl, I64))?;
    asm.define(op::ROTL, "ROTL", &binary(SemaOp::Rotl, I64))?;
    asm.define(op::ADDW, "ADDW", &binary(SemaOp::Add, I32))?;
    asm.define(
        op::UMULL,
        "UMULL",
        &SemaProgram::new()
            .get_rc(I32, 2)
            .get_rc(I32, 3)
            .mul_lohi(SemaOp::UMulLoHi, I32, I32)
            .put_rc(0)
            .put_rc(1),
    )?;
    asm.define(op::MOVH, "MOVH", &SemaProgram::new().get_rc(I16, 1).put_rc(0))?;

    asm.define(
        op::LDR,
        "LDR",
        &SemaProgram::new().get_rc(I64, 1).op(SemaOp::Load, I64).put_rc(0),
    )?;
    asm.define(
        op::STR,
        "STR",
        &SemaProgram::new()
            .get_rc(I64, 0)
            .get_rc(I64, 1)
            .op(SemaOp::Store, Other),
    )?;
    asm.define(
        op::LDRB,
        "LDRB",
        &SemaProgram::new()
            .get_rc(I64, 1)
            .predicate(Predicate::ZextLoadI8, I64)
            .put_rc(0),
    )?;
    asm.define(
        op::LDRSH,
        "LDRSH",
        &SemaProgram::new()
            .get_rc(I64, 1)
            .predicate(Predicate::SextLoadI16, I64)
            .put_rc(0),
    )?;
    asm.define(
        op::LDRX,
        "LDRX",
        &SemaProgram::new()
            .complex_pattern(I64, SCALED_INDEX)
            .op(SemaOp::Load, I64)
            .put_rc(0),
    )?;

    asm.define(
        op::B,
        "B",
        &SemaProgram::new().constant_op(I64, 0).op(SemaOp::Br, Other),
    )?;
    asm.define(
        op::BR,
        "BR",
        &SemaProgram::new().get_rc(I64, 0).op(SemaOp::BrInd, Other),
    )?;
    asm.define(op::TRAP, "TRAP", &SemaProgram::new().op(SemaOp::Trap, Other))?;
    asm.define(
        op::FENCE,
        "FENCE",
        &SemaProgram::new()
            .constant_op(I32, 0)
            .constant_op(I32, 1)
            .op(SemaOp::AtomicFence, Other),
    )?;

    asm.define(
        op::FSQRT,
        "FSQRT",
        &SemaProgram::new().get_rc(F64, 1).op(SemaOp::FSqrt, F64).put_rc(0),
    )?;
    asm.define(
        op::REV,
        "REV",
        &SemaProgram::new().get_rc(I64, 1).op(SemaOp::Bswap, I64).put_rc(0),
    )?;

    asm.define(
        op::MADD,
        "MADD",
        &SemaProgram::new()
            .get_rc(I64, 0)
            .get_rc(I64, 1)
            .get_rc(I64, 2)
            .target(MADD_OP, I64)
            .put_rc(0),
    )?;
    asm.define(
        op::ADDS,
        "ADDS",
        &SemaProgram::new()
            .get_rc(I64, 1)
            .custom_op(I64, SHIFTED_IMM, 2)
            .op(SemaOp::Add, I64)
            .put_rc(0)
            .implicit(FLAGS.0),
    )?;
    asm.define(
        op::SYS,
        "SYS",
        &SemaProgram::new()
            .custom_op(I64, SYSTEM_REGISTER, 1)
            .put_rc(0),
    )?;

    // Translated by the whole-instruction hook, or not at all.
    asm.declare(op::CALL, "CALL");
    asm.declare(op::RET, "RET");
    asm.declare(op::BEQ, "BEQ");
    asm.declare(op::TAIL, "TAIL");
    asm.declare(op::HINT, "HINT");
    asm.declare(op::UDF, "UDF");

    asm.build()
}
