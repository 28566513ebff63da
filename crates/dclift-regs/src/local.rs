//! Default register semantics: one stack slot per root register.
//!
//! Reads and writes inside a function go through local slots. The
//! aggregate is only touched at function entry and exit and around calls,
//! which keeps the lifted code free of aliasing through the register file.

use std::sync::Arc;

use dclift_ir::{BlockRef, FunctionBuilder, IrError, InstId, Type, ValueRef};
use dclift_isa::{DecodedInst, RegId};
use tracing::trace;

use crate::error::{RegsError, RegsResult};
use crate::regset::{PartialWrite, RegisterSet};
use crate::sema::RegisterSema;

/// Register semantics backed by per-function `alloca` slots.
#[derive(Debug)]
pub struct LocalRegisterSema {
    regs: Arc<RegisterSet>,
    entry: Option<BlockRef>,
    /// Slot per root register, indexed by `RegId`.
    slots: Vec<Option<ValueRef>>,
    last_slot: Option<InstId>,
    current_block: Option<BlockRef>,
    current_inst: Option<u64>,
}

impl LocalRegisterSema {
    pub fn new(regs: Arc<RegisterSet>) -> Self {
        Self {
            regs,
            entry: None,
            slots: Vec::new(),
            last_slot: None,
            current_block: None,
            current_inst: None,
        }
    }

    /// Factory usable as a target's register-semantics constructor.
    pub fn boxed(regs: Arc<RegisterSet>) -> Box<dyn RegisterSema> {
        Box::new(Self::new(regs))
    }

    /// Slot of a root register, allocated in the entry block on first use.
    fn slot(&mut self, b: &mut FunctionBuilder, root: RegId) -> RegsResult<ValueRef> {
        let idx = usize::from(root.0);
        if let Some(Some(slot)) = self.slots.get(idx) {
            return Ok(*slot);
        }
        let entry = self.entry.ok_or(RegsError::NoFunction)?;
        let ty = self.regs.reg_int_type(root)?;
        let last_slot = self.last_slot;
        let slot = with_cursor(b, |b| {
            match last_slot {
                Some(inst) => b.position_after(inst)?,
                None => match b.func().block_insts(entry).first() {
                    Some(&first) => b.position_before(first)?,
                    None => b.position_at_end(entry),
                },
            }
            Ok(b.alloca(&ty)?)
        })?;
        self.last_slot = b.func().defining_inst(slot);
        if self.slots.len() <= idx {
            self.slots.resize(idx + 1, None);
        }
        self.slots[idx] = Some(slot);
        trace!(reg = self.regs.name(root), "allocated register slot");
        Ok(slot)
    }

    /// `(field index, slot, align)` of every allocated slot in register order.
    fn live_slots(&self) -> RegsResult<Vec<(u32, ValueRef, u32)>> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|slot| (RegId(i as u16), slot)))
            .map(|(root, slot)| {
                let field = self.regs.field_index(root)?;
                Ok((field, slot, natural_align(self.regs.desc(root)?.bits())))
            })
            .collect()
    }

    /// Convert `value` to an integer of `reg`'s width.
    fn to_int(&self, b: &mut FunctionBuilder, reg: RegId, value: ValueRef) -> RegsResult<ValueRef> {
        let expected = self.regs.reg_int_type(reg)?;
        let found = b.func().value_type(value).clone();
        let mismatch = || RegsError::WidthMismatch {
            reg,
            expected: expected.clone(),
            found: found.clone(),
        };
        if found.is_ptr() {
            return Ok(b.ptr_to_int(value, &expected)?);
        }
        if found.primitive_bits() != expected.primitive_bits() {
            return Err(mismatch());
        }
        if found.is_int() {
            Ok(value)
        } else {
            Ok(b.bitcast(value, &expected)?)
        }
    }

    fn load_slot(&mut self, b: &mut FunctionBuilder, root: RegId) -> RegsResult<ValueRef> {
        let slot = self.slot(b, root)?;
        let align = natural_align(self.regs.desc(root)?.bits());
        Ok(b.load(slot, align, false)?)
    }

    fn store_slot(&mut self, b: &mut FunctionBuilder, root: RegId, value: ValueRef) -> RegsResult<()> {
        let slot = self.slot(b, root)?;
        let align = natural_align(self.regs.desc(root)?.bits());
        b.store(value, slot, align, false)?;
        Ok(())
    }
}

impl RegisterSema for LocalRegisterSema {
    fn register_set(&self) -> &RegisterSet {
        &self.regs
    }

    fn switch_to_function(&mut self, _b: &mut FunctionBuilder, entry: BlockRef) -> RegsResult<()> {
        self.entry = Some(entry);
        self.slots.clear();
        self.last_slot = None;
        Ok(())
    }

    fn switch_to_block(&mut self, _b: &mut FunctionBuilder, block: BlockRef) -> RegsResult<()> {
        self.current_block = Some(block);
        Ok(())
    }

    fn switch_to_inst(&mut self, inst: &DecodedInst) {
        self.current_inst = Some(inst.address);
    }

    fn get_reg(&mut self, b: &mut FunctionBuilder, reg: RegId) -> RegsResult<ValueRef> {
        let value = self.get_reg_as_int(b, reg)?;
        let ty = self.regs.reg_type(reg)?.clone();
        if ty.is_int() {
            Ok(value)
        } else {
            Ok(b.bitcast(value, &ty)?)
        }
    }

    fn get_reg_as_int(&mut self, b: &mut FunctionBuilder, reg: RegId) -> RegsResult<ValueRef> {
        let desc = self.regs.desc(reg)?;
        let (alias, bits) = (desc.alias, desc.bits());
        let Some(sub) = alias else {
            return self.load_slot(b, reg);
        };
        let full = self.load_slot(b, sub.parent)?;
        let shifted = if sub.offset > 0 {
            let parent_ty = self.regs.reg_int_type(sub.parent)?;
            let amount = b.const_of(&parent_ty, u128::from(sub.offset))?;
            b.lshr(full, amount)?
        } else {
            full
        };
        Ok(b.trunc(shifted, &Type::Int(bits))?)
    }

    fn set_reg(&mut self, b: &mut FunctionBuilder, reg: RegId, value: ValueRef) -> RegsResult<()> {
        let value = self.to_int(b, reg, value)?;
        let desc = self.regs.desc(reg)?;
        let (alias, bits) = (desc.alias, desc.bits());
        let Some(sub) = alias else {
            return self.store_slot(b, reg, value);
        };
        let parent_ty = self.regs.reg_int_type(sub.parent)?;
        let wide = b.zext(value, &parent_ty)?;
        let placed = if sub.offset > 0 {
            let amount = b.const_of(&parent_ty, u128::from(sub.offset))?;
            b.shl(wide, amount)?
        } else {
            wide
        };
        let merged = match sub.write {
            PartialWrite::ZeroExtend => placed,
            PartialWrite::Merge => {
                let old = self.load_slot(b, sub.parent)?;
                let keep = b.const_of(&parent_ty, !(low_mask(bits) << sub.offset))?;
                let kept = b.and(old, keep)?;
                b.or(kept, placed)?
            }
        };
        self.store_slot(b, sub.parent, merged)
    }

    fn insert_bits_in_value(
        &mut self,
        b: &mut FunctionBuilder,
        full: ValueRef,
        bits: ValueRef,
    ) -> RegsResult<ValueRef> {
        let full_ty = b.func().value_type(full).clone();
        let narrow = b
            .func()
            .value_type(bits)
            .int_bits()
            .ok_or(IrError::InvalidOperand("insert bits"))?;
        let keep = b.const_of(&full_ty, !low_mask(narrow))?;
        let kept = b.and(full, keep)?;
        let wide = b.zext(bits, &full_ty)?;
        Ok(b.or(kept, wide)?)
    }

    fn save_all_local_regs(&mut self, b: &mut FunctionBuilder, call: InstId) -> RegsResult<()> {
        let live = self.live_slots()?;
        with_cursor(b, |b| {
            b.position_before(call)?;
            write_back(b, &live)
        })
    }

    fn restore_local_regs(&mut self, b: &mut FunctionBuilder, call: InstId) -> RegsResult<()> {
        let live = self.live_slots()?;
        with_cursor(b, |b| {
            b.position_after(call)?;
            reload(b, &live)
        })
    }

    fn finalize_block(&mut self, _b: &mut FunctionBuilder) -> RegsResult<()> {
        self.current_block = None;
        Ok(())
    }

    fn finalize_function(&mut self, b: &mut FunctionBuilder, exit: BlockRef) -> RegsResult<()> {
        let entry = self.entry.ok_or(RegsError::NoFunction)?;
        let live = self.live_slots()?;
        let entry_term = terminator(b, entry)?;
        let exit_term = terminator(b, exit)?;
        with_cursor(b, |b| {
            b.position_before(entry_term)?;
            reload(b, &live)?;
            b.position_before(exit_term)?;
            write_back(b, &live)
        })?;
        trace!(slots = live.len(), "finalized register slots");
        self.entry = None;
        self.current_inst = None;
        Ok(())
    }
}

/// Run `f` and put the builder's cursor back where it was.
fn with_cursor<T>(
    b: &mut FunctionBuilder,
    f: impl FnOnce(&mut FunctionBuilder) -> RegsResult<T>,
) -> RegsResult<T> {
    let saved = b.insertion_point();
    let result = f(b);
    b.set_insertion_point(saved);
    result
}

fn write_back(b: &mut FunctionBuilder, live: &[(u32, ValueRef, u32)]) -> RegsResult<()> {
    for &(field, slot, align) in live {
        let value = b.load(slot, align, false)?;
        let regset = b.func().regset_arg();
        let ptr = b.field_ptr(regset, field)?;
        b.store(value, ptr, align, false)?;
    }
    Ok(())
}

fn reload(b: &mut FunctionBuilder, live: &[(u32, ValueRef, u32)]) -> RegsResult<()> {
    for &(field, slot, align) in live {
        let regset = b.func().regset_arg();
        let ptr = b.field_ptr(regset, field)?;
        let value = b.load(ptr, align, false)?;
        b.store(value, slot, align, false)?;
    }
    Ok(())
}

fn terminator(b: &FunctionBuilder, block: BlockRef) -> RegsResult<InstId> {
    b.func()
        .terminator(block)
        .ok_or_else(|| IrError::MissingTerminator(b.func().block_name(block).to_string()).into())
}

const fn low_mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

fn natural_align(bits: u32) -> u32 {
    (bits / 8).next_power_of_two().clamp(1, 16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dclift_ir::{Callee, CastOp, FloatKind, Function, Op};

    fn regs() -> Arc<RegisterSet> {
        Arc::new(
            RegisterSet::builder()
                .root("x0", Type::I64)
                .root("x1", Type::I64)
                .sub("w0", 32, "x0", 0, PartialWrite::ZeroExtend)
                .sub("h0", 16, "x0", 0, PartialWrite::Merge)
                .sub("b1", 8, "x0", 8, PartialWrite::Merge)
                .root("d0", Type::Float(FloatKind::Double))
                .root("pc", Type::I64)
                .build("pc")
                .unwrap(),
        )
    }

    /// Function with `entry -> body -> exit` and the cursor in `body`.
    fn setup() -> (LocalRegisterSema, FunctionBuilder, BlockRef, BlockRef, BlockRef) {
        let regs = regs();
        let mut b = FunctionBuilder::new(Function::new("fn_0", 0, regs.regset_type()));
        let entry = b.create_block("entry");
        let body = b.create_block("body");
        let exit = b.create_block("exit");
        b.position_at_end(entry);
        b.br(body).unwrap();
        b.position_at_end(exit);
        b.ret().unwrap();
        let mut sema = LocalRegisterSema::new(regs);
        sema.switch_to_function(&mut b, entry).unwrap();
        b.position_at_end(body);
        sema.switch_to_block(&mut b, body).unwrap();
        (sema, b, entry, body, exit)
    }

    #[test]
    fn test_slots_live_in_entry() {
        let (mut sema, mut b, entry, body, _) = setup();
        let v = b.const_i64(5);
        sema.set_reg(&mut b, RegId(1), v).unwrap();
        sema.set_reg(&mut b, RegId(0), v).unwrap();
        let entry_ops = b.func().block_ops(entry);
        assert!(matches!(entry_ops[..], [Op::Alloca, Op::Alloca, Op::Br { .. }]));
        assert_eq!(b.func().block_ops(body).len(), 2);
        assert_eq!(b.current_block(), Some(body));
    }

    #[test]
    fn test_zero_extending_subregister_write() {
        let (mut sema, mut b, _, body, _) = setup();
        let slot = b.alloca(&Type::I32).unwrap();
        let v = b.load(slot, 4, false).unwrap();
        sema.set_reg(&mut b, RegId(2), v).unwrap();
        let ops = b.func().block_ops(body);
        assert!(matches!(ops[2], Op::Cast { op: CastOp::ZExt, .. }));
        assert!(matches!(ops[3], Op::Store { .. }));
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn test_merging_subregister_write() {
        let (mut sema, mut b, _, body, _) = setup();
        let slot = b.alloca(&Type::I8).unwrap();
        let v = b.load(slot, 1, false).unwrap();
        sema.set_reg(&mut b, RegId(4), v).unwrap();
        let ops = b.func().block_ops(body);
        let and = ops
            .iter()
            .find_map(|op| match op {
                Op::Binary {
                    op: dclift_ir::BinOp::And,
                    rhs,
                    ..
                } => Some(*rhs),
                _ => None,
            })
            .unwrap();
        assert_eq!(b.func().const_int(and), Some(u128::from(!0xFF00u64)));
        assert!(ops.iter().any(|op| matches!(op, Op::Binary { op: dclift_ir::BinOp::Shl, .. })));
    }

    #[test]
    fn test_subregister_read_at_offset() {
        let (mut sema, mut b, _, body, _) = setup();
        let v = sema.get_reg(&mut b, RegId(4)).unwrap();
        assert_eq!(b.func().value_type(v), &Type::I8);
        let ops = b.func().block_ops(body);
        assert!(matches!(ops[..], [Op::Load { .. }, Op::Binary { .. }, Op::Cast { op: CastOp::Trunc, .. }]));
    }

    #[test]
    fn test_float_register_bitcast() {
        let (mut sema, mut b, _, _, _) = setup();
        let d0 = sema.register_set().find("d0").unwrap();
        let v = sema.get_reg(&mut b, d0).unwrap();
        assert_eq!(b.func().value_type(v), &Type::Float(FloatKind::Double));
        sema.set_reg(&mut b, d0, v).unwrap();
    }

    #[test]
    fn test_width_mismatch() {
        let (mut sema, mut b, _, _, _) = setup();
        let v = b.const_int(32, 1);
        assert!(matches!(
            sema.set_reg(&mut b, RegId(0), v),
            Err(RegsError::WidthMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_bits_in_value() {
        let (mut sema, mut b, _, _, _) = setup();
        let full = sema.get_reg_as_int(&mut b, RegId(0)).unwrap();
        let slot = b.alloca(&Type::I16).unwrap();
        let low = b.load(slot, 2, false).unwrap();
        let merged = sema.insert_bits_in_value(&mut b, full, low).unwrap();
        assert_eq!(b.func().value_type(merged), &Type::I64);
    }

    #[test]
    fn test_call_bracketing_and_finalize() {
        let (mut sema, mut b, entry, body, exit) = setup();
        let v = b.const_i64(1);
        sema.set_reg(&mut b, RegId(0), v).unwrap();
        let call_block = b.create_block("body_call");
        b.br(call_block).unwrap();
        b.position_at_end(call_block);
        let regset = b.func().regset_arg();
        let call = b
            .call(Callee::External("callee".into()), &[regset])
            .unwrap();
        b.br(exit).unwrap();

        sema.save_all_local_regs(&mut b, call).unwrap();
        sema.restore_local_regs(&mut b, call).unwrap();
        let ops = b.func().block_ops(call_block);
        assert!(matches!(
            ops[..],
            [
                Op::Load { .. },
                Op::FieldPtr { index: 0, .. },
                Op::Store { .. },
                Op::Call { .. },
                Op::FieldPtr { index: 0, .. },
                Op::Load { .. },
                Op::Store { .. },
                Op::Br { .. },
            ]
        ));

        sema.finalize_function(&mut b, exit).unwrap();
        let entry_ops = b.func().block_ops(entry);
        assert!(matches!(entry_ops.last(), Some(Op::Br { .. })));
        assert_eq!(entry_ops.len(), 5);
        let exit_ops = b.func().block_ops(exit);
        assert!(matches!(exit_ops[..], [Op::Load { .. }, Op::FieldPtr { .. }, Op::Store { .. }, Op::Ret]));
        assert_eq!(b.func().block_ops(body).len(), 2);
        assert_eq!(dclift_ir::verify_function(b.func()), Ok(()));
    }
}
