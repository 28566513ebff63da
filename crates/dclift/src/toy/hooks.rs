use dclift_ir::{ICmpPred, ValueRef};
use dclift_isa::{DecodedInst, RegId};

use super::{FLAGS, LR, MADD_OP, SCALED_INDEX, SHIFTED_IMM, op};
use crate::error::{Error, Result};
use crate::target::{TargetHooks, WholeInst};
use crate::translator::Translator;

/// Hooks for the toy architecture.
///
/// Control transfers that need more than one semantic operation (calls,
/// returns, conditional branches) are emitted whole; everything else goes
/// through the semantics table.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToyHooks;

fn reg(inst: &DecodedInst, idx: usize) -> Result<RegId> {
    inst.reg(idx)
        .ok_or_else(|| Error::invariant(format!("operand {idx} is not a register")))
}

fn imm(inst: &DecodedInst, idx: usize) -> Result<u64> {
    inst.imm(idx)
        .map(|imm| imm as u64)
        .ok_or_else(|| Error::invariant(format!("operand {idx} is not an immediate")))
}

impl ToyHooks {
    /// `lr = next; pc = target; call target; pc = next`.
    fn call(t: &mut Translator<'_>, inst: &DecodedInst) -> Result<()> {
        let next = t.builder().const_i64(inst.next_address());
        t.set_reg(LR, next)?;
        let target = t.builder().const_i64(imm(inst, 0)?);
        let pc = t.program_counter();
        t.set_reg(pc, target)?;
        t.insert_call(target)?;
        let next = t.builder().const_i64(inst.next_address());
        t.set_reg(pc, next)
    }

    fn ret(t: &mut Translator<'_>) -> Result<()> {
        let lr = t.get_reg(LR)?;
        let pc = t.program_counter();
        t.set_reg(pc, lr)?;
        let exit = t.exit_block();
        t.builder().br(exit)?;
        Ok(())
    }

    /// `beq rs1, rs2, target`: both successors become address blocks.
    fn branch_if_equal(t: &mut Translator<'_>, inst: &DecodedInst) -> Result<()> {
        let lhs = t.get_reg(reg(inst, 0)?)?;
        let rhs = t.get_reg(reg(inst, 1)?)?;
        let taken = imm(inst, 2)?;
        let next = inst.next_address();

        let b = t.builder();
        let cond = b.icmp(ICmpPred::Eq, lhs, rhs)?;
        let taken_pc = b.const_i64(taken);
        let next_pc = b.const_i64(next);
        let pc_value = b.select(cond, taken_pc, next_pc)?;
        let pc = t.program_counter();
        t.set_reg(pc, pc_value)?;

        let taken_block = t.get_or_create_block(taken)?;
        let next_block = t.get_or_create_block(next)?;
        t.builder().cond_br(cond, taken_block, next_block)?;
        Ok(())
    }

    /// Call that never comes back here: branch to a block that calls the
    /// target and returns.
    fn tail(t: &mut Translator<'_>, inst: &DecodedInst) -> Result<()> {
        let block = t.create_external_tail_call(imm(inst, 0)?)?;
        t.builder().br(block)?;
        Ok(())
    }
}

impl TargetHooks for ToyHooks {
    fn translate_whole(&self, t: &mut Translator<'_>, inst: &DecodedInst) -> Result<WholeInst> {
        match inst.opcode {
            op::CALL => Self::call(t, inst)?,
            op::RET => Self::ret(t)?,
            op::BEQ => Self::branch_if_equal(t, inst)?,
            op::TAIL => Self::tail(t, inst)?,
            // hint #0 is the canonical nop
            op::HINT if inst.imm(0) == Some(0) => return Ok(WholeInst::Substitute(op::NOP)),
            _ => return Ok(WholeInst::Declined),
        }
        Ok(WholeInst::Handled)
    }

    fn translate_target_opcode(&self, t: &mut Translator<'_>, opcode: u32) -> Result<bool> {
        if opcode != MADD_OP {
            return Ok(false);
        }
        let acc = t.next_operand()?;
        let lhs = t.next_operand()?;
        let rhs = t.next_operand()?;
        let b = t.builder();
        let product = b.mul(lhs, rhs)?;
        let sum = b.add(acc, product)?;
        t.push_result(sum)?;
        Ok(true)
    }

    fn complex_pattern(&self, t: &mut Translator<'_>, pattern: u32) -> Result<Option<ValueRef>> {
        if pattern != SCALED_INDEX {
            return Ok(None);
        }
        let base = t.reg_operand(1)?;
        let index = t.reg_operand(2)?;
        let base = t.get_reg(base)?;
        let index = t.get_reg(index)?;
        let b = t.builder();
        let three = b.const_i64(3);
        let scaled = b.shl(index, three)?;
        Ok(Some(b.add(base, scaled)?))
    }

    fn custom_operand(
        &self,
        t: &mut Translator<'_>,
        kind: u32,
        operand: u32,
    ) -> Result<Option<ValueRef>> {
        if kind != SHIFTED_IMM {
            return Ok(None);
        }
        let imm = t.imm_operand(operand)? as u64;
        let ty = t.result_type();
        Ok(Some(t.builder().const_of(&ty, u128::from(imm) << 12)?))
    }

    /// `flags = (rd == 0)` after flag-setting arithmetic.
    fn implicit(&self, t: &mut Translator<'_>, reg: RegId) -> Result<()> {
        if reg != FLAGS {
            return Err(Error::semantic(format!("implicit register {reg}")));
        }
        let rd = t.reg_operand(0)?;
        let value = t.get_reg(rd)?;
        let flags_ty = t.reg_int_type(FLAGS)?;
        let b = t.builder();
        let zero = b.const_i64(0);
        let is_zero = b.icmp(ICmpPred::Eq, value, zero)?;
        let flags = b.zext(is_zero, &flags_ty)?;
        t.set_reg(FLAGS, flags)
    }
}
