//! Semantics bytecode interpreter.
//!
//! Each operation reads its result type, takes operands from the front of
//! the instruction's operand queue and pushes results to the back.

use dclift_ir::{AtomicOrdering, BinOp, CastOp, SyncScope, Type, ValueRef};
use dclift_isa::{Predicate, PredicateKind, RegId, SemaOp, ValueType, is_target_opcode};
use tracing::debug;

use crate::error::{Error, Result};
use crate::translator::Translator;

/// Memory accesses assume no alignment.
const ALIGN: u32 = 1;

impl Translator<'_> {
    /// Execute one semantic operation.
    pub(crate) fn translate_opcode(&mut self, word: u32) -> Result<()> {
        let vt = self.next_vt()?;
        self.set_result_vt(vt)?;
        if is_target_opcode(word) {
            let target = self.target();
            return if target.hooks().translate_target_opcode(self, word)? {
                Ok(())
            } else {
                Err(Error::semantic(format!("target opcode {word:#x}")))
            };
        }
        let Some(op) = SemaOp::from_word(word) else {
            debug!(opcode = word, "couldn't translate semantic opcode");
            return Err(Error::semantic(format!("semantic opcode {word}")));
        };

        match op {
            SemaOp::Add => self.binop(BinOp::Add),
            SemaOp::Sub => self.binop(BinOp::Sub),
            SemaOp::Mul => self.binop(BinOp::Mul),
            SemaOp::SDiv => self.binop(BinOp::SDiv),
            SemaOp::UDiv => self.binop(BinOp::UDiv),
            SemaOp::SRem => self.binop(BinOp::SRem),
            SemaOp::URem => self.binop(BinOp::URem),
            SemaOp::FAdd => self.binop(BinOp::FAdd),
            SemaOp::FSub => self.binop(BinOp::FSub),
            SemaOp::FMul => self.binop(BinOp::FMul),
            SemaOp::FDiv => self.binop(BinOp::FDiv),
            SemaOp::FRem => self.binop(BinOp::FRem),
            SemaOp::Shl => self.binop(BinOp::Shl),
            SemaOp::Srl => self.binop(BinOp::LShr),
            SemaOp::Sra => self.binop(BinOp::AShr),
            SemaOp::And => self.binop(BinOp::And),
            SemaOp::Or => self.binop(BinOp::Or),
            SemaOp::Xor => self.binop(BinOp::Xor),
            SemaOp::Rotl => self.rotl(),

            SemaOp::Truncate => self.cast(CastOp::Trunc),
            SemaOp::ZeroExtend => self.cast(CastOp::ZExt),
            SemaOp::SignExtend => self.cast(CastOp::SExt),
            SemaOp::Bitcast => self.cast(CastOp::BitCast),
            SemaOp::FpToUint => self.cast(CastOp::FpToUi),
            SemaOp::FpToSint => self.cast(CastOp::FpToSi),
            SemaOp::UintToFp => self.cast(CastOp::UiToFp),
            SemaOp::SintToFp => self.cast(CastOp::SiToFp),
            SemaOp::FpRound => self.cast(CastOp::FpTrunc),
            SemaOp::FpExtend => self.cast(CastOp::FpExt),

            SemaOp::FSqrt => {
                let value = self.next_operand()?;
                let root = self.builder().sqrt(value)?;
                self.push_result(root)
            }
            SemaOp::Bswap => {
                let value = self.next_operand()?;
                let swapped = self.builder().bswap(value)?;
                self.push_result(swapped)
            }
            SemaOp::InsertVectorElt => {
                let vector = self.next_operand()?;
                let element = self.next_operand()?;
                let index = self.next_operand()?;
                let result = self.builder().insert_element(vector, element, index)?;
                self.push_result(result)
            }
            SemaOp::ExtractVectorElt => {
                let vector = self.next_operand()?;
                let index = self.next_operand()?;
                let result = self.builder().extract_element(vector, index)?;
                self.push_result(result)
            }
            SemaOp::SMulLoHi => self.mul_lohi(true),
            SemaOp::UMulLoHi => self.mul_lohi(false),

            SemaOp::Load => {
                let ty = self.result_type();
                self.load(&ty)
            }
            SemaOp::Store => self.store(),
            SemaOp::BrInd => {
                let target = self.next_operand()?;
                let pc = self.program_counter();
                self.set_reg(pc, target)?;
                self.insert_call(target)?;
                let exit = self.exit_block();
                self.builder().br(exit)?;
                Ok(())
            }
            SemaOp::Br => {
                let target = self.next_operand()?;
                let address = self
                    .function()
                    .const_int(target)
                    .and_then(|a| u64::try_from(a).ok())
                    .ok_or_else(|| Error::invariant("direct branch target is not a constant"))?;
                let pc = self.program_counter();
                self.set_reg(pc, target)?;
                let block = self.get_or_create_block(address)?;
                self.builder().br(block)?;
                Ok(())
            }
            SemaOp::Trap => {
                self.builder().trap()?;
                Ok(())
            }
            SemaOp::AtomicFence => self.fence(),

            SemaOp::PutRc => {
                let operand = self.next_word()?;
                let reg = self.reg_operand(operand)?;
                let value = self.next_operand()?;
                self.put_rc(reg, value)
            }
            SemaOp::PutReg => {
                let reg = self.fixed_reg()?;
                let value = self.next_operand()?;
                self.set_reg(reg, value)
            }
            SemaOp::GetRc => {
                let operand = self.next_word()?;
                let reg = self.reg_operand(operand)?;
                self.get_rc(reg)
            }
            SemaOp::GetReg => {
                let reg = self.fixed_reg()?;
                let value = self.get_reg(reg)?;
                self.push_result(value)
            }
            SemaOp::CustomOp => {
                let kind = self.next_word()?;
                let operand = self.next_word()?;
                let target = self.target();
                let value = target
                    .hooks()
                    .custom_operand(self, kind, operand)?
                    .ok_or_else(|| Error::semantic(format!("custom operand kind {kind}")))?;
                self.push_result(value)
            }
            SemaOp::ComplexPattern => {
                let pattern = self.next_word()?;
                let target = self.target();
                let value = target
                    .hooks()
                    .complex_pattern(self, pattern)?
                    .ok_or_else(|| Error::semantic(format!("complex pattern {pattern}")))?;
                self.push_result(value)
            }
            SemaOp::Predicate => {
                let code = self.next_word()?;
                let pred = Predicate::from_code(code)
                    .ok_or_else(|| Error::semantic(format!("predicate {code}")))?;
                self.predicate(pred)
            }
            SemaOp::ConstantOp => {
                let operand = self.next_word()?;
                let imm = self.imm_operand(operand)?;
                let ty = self.result_type();
                let value = self.builder().const_of(&ty, u128::from(imm as u64))?;
                self.push_result(value)
            }
            SemaOp::MovConstant => {
                let index = self.next_word()?;
                let literal = self.literal(index)?;
                let ty = match self.result_vt() {
                    ValueType::IPtr => Type::I64,
                    vt => vt.to_type(),
                };
                let value = self.builder().const_of(&ty, u128::from(literal))?;
                self.push_result(value)
            }
            SemaOp::Implicit => {
                let reg = self.fixed_reg()?;
                let target = self.target();
                target.hooks().implicit(self, reg)
            }
        }
    }

    fn fixed_reg(&mut self) -> Result<RegId> {
        let word = self.next_word()?;
        u16::try_from(word)
            .map(RegId)
            .map_err(|_| Error::invariant(format!("register number {word} out of range")))
    }

    /// Shift amounts are resized to the shifted value's width.
    fn binop(&mut self, op: BinOp) -> Result<()> {
        let lhs = self.next_operand()?;
        let mut rhs = self.next_operand()?;
        if op.is_shift() {
            let ty = self.function().value_type(lhs).clone();
            rhs = self.builder().zext_or_trunc(rhs, &ty)?;
        }
        let result = self.builder().binop(op, lhs, rhs)?;
        self.push_result(result)
    }

    /// `(x << r) | (x >> (w - r))` with both amounts reduced modulo `w`.
    fn rotl(&mut self) -> Result<()> {
        let value = self.next_operand()?;
        let amount = self.next_operand()?;
        let ty = self.function().value_type(value).clone();
        let bits = ty
            .int_bits()
            .ok_or_else(|| Error::invariant("rotate of a non-integer"))?;
        let b = self.builder();
        let width = b.const_of(&ty, u128::from(bits))?;
        let amount = b.zext_or_trunc(amount, &ty)?;
        let left = b.binop(BinOp::URem, amount, width)?;
        let inverse = b.sub(width, left)?;
        let right = b.binop(BinOp::URem, inverse, width)?;
        let high = b.shl(value, left)?;
        let low = b.lshr(value, right)?;
        let result = b.or(high, low)?;
        self.push_result(result)
    }

    fn cast(&mut self, op: CastOp) -> Result<()> {
        let ty = self.result_type();
        let value = self.next_operand()?;
        let result = self.builder().cast(op, value, &ty)?;
        self.push_result(result)
    }

    /// Both operands widened to `lo + hi` bits, multiplied, then split.
    fn mul_lohi(&mut self, signed: bool) -> Result<()> {
        let lo_ty = self.result_type();
        let hi_ty = self.next_vt()?.to_type();
        let (Some(lo_bits), Some(hi_bits)) = (lo_ty.int_bits(), hi_ty.int_bits()) else {
            return Err(Error::invariant("wide multiply with non-integer results"));
        };
        let wide = Type::Int(lo_bits + hi_bits);
        let lhs = self.next_operand()?;
        let rhs = self.next_operand()?;
        let b = self.builder();
        let (lhs, rhs) = if signed {
            (b.sext(lhs, &wide)?, b.sext(rhs, &wide)?)
        } else {
            (b.zext(lhs, &wide)?, b.zext(rhs, &wide)?)
        };
        let full = b.mul(lhs, rhs)?;
        let lo = b.trunc(full, &lo_ty)?;
        let shift = b.const_of(&wide, u128::from(lo_bits))?;
        let high = b.lshr(full, shift)?;
        let hi = b.trunc(high, &hi_ty)?;
        self.push_result(lo)?;
        self.push_result(hi)
    }

    /// Address operand as a pointer to `pointee`.
    fn coerce_pointer(&mut self, address: ValueRef, pointee: &Type) -> Result<ValueRef> {
        let want = pointee.ptr_to();
        let b = self.builder();
        let ty = b.func().value_type(address);
        if !ty.is_ptr() {
            Ok(b.int_to_ptr(address, &want)?)
        } else if *ty != want {
            Ok(b.bitcast(address, &want)?)
        } else {
            Ok(address)
        }
    }

    fn load(&mut self, ty: &Type) -> Result<()> {
        let address = self.next_operand()?;
        let ptr = self.coerce_pointer(address, ty)?;
        let value = self.builder().load(ptr, ALIGN, false)?;
        self.push_result(value)
    }

    fn store(&mut self) -> Result<()> {
        let value = self.next_operand()?;
        let address = self.next_operand()?;
        let ty = self.function().value_type(value).clone();
        let ptr = self.coerce_pointer(address, &ty)?;
        self.builder().store(value, ptr, ALIGN, false)?;
        Ok(())
    }

    fn fence(&mut self) -> Result<()> {
        let ordering = self.next_operand()?;
        let scope = self.next_operand()?;
        let func = self.function();
        let (Some(ordering), Some(scope)) = (func.const_int(ordering), func.const_int(scope)) else {
            return Err(Error::invariant("fence operands must be constants"));
        };
        let ordering = match ordering {
            1 => AtomicOrdering::Unordered,
            2 => AtomicOrdering::Monotonic,
            // consume is strengthened to acquire
            3 | 4 => AtomicOrdering::Acquire,
            5 => AtomicOrdering::Release,
            6 => AtomicOrdering::AcqRel,
            7 => AtomicOrdering::SeqCst,
            value => {
                return Err(Error::Encoding {
                    at: None,
                    what: "atomic ordering",
                    value,
                });
            }
        };
        let scope = match scope {
            0 => SyncScope::SingleThread,
            1 => SyncScope::CrossThread,
            value => {
                return Err(Error::Encoding {
                    at: None,
                    what: "synchronization scope",
                    value,
                });
            }
        };
        self.builder().fence(ordering, scope)?;
        Ok(())
    }

    /// Register-class write: normalize to an integer, merge narrower values
    /// into the current register contents.
    fn put_rc(&mut self, reg: RegId, value: ValueRef) -> Result<()> {
        let reg_ty = self.reg_int_type(reg)?;
        let reg_bits = reg_ty.int_bits().unwrap_or(0);
        let mut value = value;
        let ty = self.function().value_type(value).clone();
        if ty.is_ptr() {
            value = self.builder().ptr_to_int(value, &reg_ty)?;
        } else if !ty.is_int() {
            let bits = ty
                .primitive_bits()
                .ok_or_else(|| Error::invariant(format!("cannot write {ty} to a register")))?;
            value = self.builder().bitcast(value, &Type::Int(bits))?;
        }
        let bits = self.function().value_type(value).int_bits().unwrap_or(0);
        if bits < reg_bits {
            let full = self.get_reg_as_int(reg)?;
            value = self.insert_bits_in_value(full, value)?;
        }
        let found = self.function().value_type(value);
        if *found != reg_ty {
            return Err(Error::invariant(format!(
                "register write of {found} to a {reg_ty} register"
            )));
        }
        self.set_reg(reg, value)
    }

    /// Register-class read: truncate to the result width, bitcast to
    /// non-integer result types.
    fn get_rc(&mut self, reg: RegId) -> Result<()> {
        let ty = self.result_type();
        let mut value = self.get_reg_as_int(reg)?;
        let reg_bits = self.function().value_type(value).int_bits().unwrap_or(0);
        if let Some(bits) = ty.primitive_bits() {
            if bits < reg_bits {
                value = self.builder().trunc(value, &Type::Int(bits))?;
            }
        }
        if !ty.is_int() {
            value = self.builder().bitcast(value, &ty)?;
        }
        self.push_result(value)
    }

    fn predicate(&mut self, pred: Predicate) -> Result<()> {
        match pred.kind() {
            PredicateKind::Load => {
                let ty = self.result_type();
                self.load(&ty)
            }
            PredicateKind::Store => self.store(),
            PredicateKind::ExtLoad { mem_bits, signed } => {
                let mem_ty = Type::Int(mem_bits);
                let address = self.next_operand()?;
                let ty = self.result_type();
                let b = self.builder();
                let ptr = b.bit_or_pointer_cast(address, &mem_ty.ptr_to())?;
                let narrow = b.load(ptr, ALIGN, false)?;
                let value = if signed {
                    b.sext(narrow, &ty)?
                } else {
                    b.zext(narrow, &ty)?
                };
                self.push_result(value)
            }
            PredicateKind::And => self.binop(BinOp::And),
        }
    }
}
