//! Builder that places typed operations into a function.
//!
//! Every constructor validates operand types and returns an [`IrError`]
//! on mismatch. Integer operations on literal operands are folded.

use crate::error::{IrError, IrResult};
use crate::fold;
use crate::function::{Block, Function};
use crate::op::{BinOp, Callee, CastOp, ICmpPred, InstData, Intrinsic, Op};
use crate::types::{AtomicOrdering, SyncScope, Type};
use crate::value::{BlockRef, FuncId, InstId, ValueData, ValueKind, ValueRef};

/// Where the next operation goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPoint {
    /// Append to the block.
    End(BlockRef),
    /// Insert immediately before an operation.
    Before(InstId),
}

/// Owns a function under construction together with an insertion cursor.
#[derive(Debug)]
pub struct FunctionBuilder {
    func: Function,
    cursor: Option<InsertPoint>,
}

impl FunctionBuilder {
    pub const fn new(func: Function) -> Self {
        Self { func, cursor: None }
    }

    pub const fn func(&self) -> &Function {
        &self.func
    }

    pub const fn func_mut(&mut self) -> &mut Function {
        &mut self.func
    }

    /// Consume the builder, returning the function.
    pub fn finish(self) -> Function {
        self.func
    }

    // ---- Blocks and cursor ----

    /// Append a new empty block.
    pub fn create_block(&mut self, name: impl Into<String>) -> BlockRef {
        let block = BlockRef(self.func.blocks.len() as u32);
        self.func.blocks.push(Block {
            name: name.into(),
            insts: Vec::new(),
        });
        block
    }

    pub const fn position_at_end(&mut self, block: BlockRef) {
        self.cursor = Some(InsertPoint::End(block));
    }

    pub fn position_before(&mut self, inst: InstId) -> IrResult<()> {
        self.placed_block(inst)?;
        self.cursor = Some(InsertPoint::Before(inst));
        Ok(())
    }

    pub fn position_after(&mut self, inst: InstId) -> IrResult<()> {
        let (block, pos) = self.placement(inst)?;
        self.cursor = Some(match self.func.block_insts(block).get(pos + 1) {
            Some(&next) => InsertPoint::Before(next),
            None => InsertPoint::End(block),
        });
        Ok(())
    }

    pub const fn insertion_point(&self) -> Option<InsertPoint> {
        self.cursor
    }

    /// Restore a cursor saved with [`insertion_point`](Self::insertion_point).
    pub const fn set_insertion_point(&mut self, point: Option<InsertPoint>) {
        self.cursor = point;
    }

    /// Block the cursor is in.
    pub fn current_block(&self) -> Option<BlockRef> {
        match self.cursor? {
            InsertPoint::End(block) => Some(block),
            InsertPoint::Before(inst) => self.func.inst(inst).block,
        }
    }

    /// Remove a placed operation from its block.
    pub fn erase(&mut self, inst: InstId) -> IrResult<()> {
        let (block, pos) = self.placement(inst)?;
        if self.cursor == Some(InsertPoint::Before(inst)) {
            self.cursor = Some(match self.func.block_insts(block).get(pos + 1) {
                Some(&next) => InsertPoint::Before(next),
                None => InsertPoint::End(block),
            });
        }
        self.func.blocks[block.0 as usize].insts.remove(pos);
        self.func.insts[inst.0 as usize].block = None;
        Ok(())
    }

    fn placed_block(&self, inst: InstId) -> IrResult<BlockRef> {
        if !self.func.contains_inst(inst) {
            return Err(IrError::UnknownInst(inst.0));
        }
        self.func.inst(inst).block.ok_or(IrError::UnknownInst(inst.0))
    }

    fn placement(&self, inst: InstId) -> IrResult<(BlockRef, usize)> {
        let block = self.placed_block(inst)?;
        let pos = self
            .func
            .block_insts(block)
            .iter()
            .position(|&id| id == inst)
            .ok_or(IrError::UnknownInst(inst.0))?;
        Ok((block, pos))
    }

    // ---- Values ----

    fn new_value(&mut self, kind: ValueKind, ty: Type) -> ValueRef {
        let value = ValueRef(self.func.values.len() as u32);
        self.func.values.push(ValueData { kind, ty });
        value
    }

    /// Integer literal of the given width; `value` is truncated to fit.
    pub fn const_int(&mut self, bits: u32, value: u128) -> ValueRef {
        self.new_value(ValueKind::ConstInt(fold::mask(value, bits)), Type::Int(bits))
    }

    pub fn const_i64(&mut self, value: u64) -> ValueRef {
        self.const_int(64, u128::from(value))
    }

    /// Literal of an integer type.
    pub fn const_of(&mut self, ty: &Type, value: u128) -> IrResult<ValueRef> {
        let bits = ty.int_bits().ok_or(IrError::InvalidOperand("integer constant"))?;
        Ok(self.const_int(bits, value))
    }

    pub fn undef(&mut self, ty: Type) -> ValueRef {
        self.new_value(ValueKind::Undef, ty)
    }

    /// Address of a lifted function.
    pub fn func_ref(&mut self, func: FuncId) -> ValueRef {
        self.new_value(ValueKind::Func(func), Type::lifted_fn_ptr())
    }

    fn operand_type(&self, value: ValueRef) -> IrResult<Type> {
        if !self.func.contains_value(value) {
            return Err(IrError::InvalidOperand("unknown value"));
        }
        Ok(self.func.value_type(value).clone())
    }

    // ---- Placement ----

    fn place(&mut self, op: Op) -> IrResult<InstId> {
        let point = self.cursor.ok_or(IrError::NoInsertionPoint)?;
        let (block, pos) = match point {
            InsertPoint::End(block) => {
                if !self.func.contains_block(block) {
                    return Err(IrError::UnknownBlock(block.0));
                }
                (block, self.func.block_insts(block).len())
            }
            InsertPoint::Before(inst) => self.placement(inst)?,
        };
        let id = InstId(self.func.insts.len() as u32);
        self.func.insts.push(InstData {
            op,
            result: None,
            block: Some(block),
        });
        self.func.blocks[block.0 as usize].insts.insert(pos, id);
        Ok(id)
    }

    fn place_value(&mut self, op: Op, ty: Type) -> IrResult<ValueRef> {
        let id = self.place(op)?;
        let value = self.new_value(ValueKind::Inst(id), ty);
        self.func.insts[id.0 as usize].result = Some(value);
        Ok(value)
    }

    // ---- Arithmetic ----

    /// Binary operation; both operands must have the same type.
    pub fn binop(&mut self, op: BinOp, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        let ty = self.operand_type(lhs)?;
        let rhs_ty = self.operand_type(rhs)?;
        if ty != rhs_ty {
            return Err(IrError::TypeMismatch {
                context: op.mnemonic(),
                expected: ty,
                found: rhs_ty,
            });
        }
        let valid = if op.is_float() {
            ty.is_fp_or_fp_vector()
        } else {
            ty.is_int_or_int_vector()
        };
        if !valid {
            return Err(IrError::InvalidOperand(op.mnemonic()));
        }
        if let (Some(bits), Some(a), Some(b)) =
            (ty.int_bits(), self.func.const_int(lhs), self.func.const_int(rhs))
        {
            if let Some(folded) = fold::fold_binary(op, a, b, bits) {
                return Ok(self.const_int(bits, folded));
            }
        }
        self.place_value(Op::Binary { op, lhs, rhs }, ty)
    }

    pub fn add(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::Mul, lhs, rhs)
    }

    pub fn and(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::And, lhs, rhs)
    }

    pub fn or(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::Or, lhs, rhs)
    }

    pub fn shl(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::Shl, lhs, rhs)
    }

    pub fn lshr(&mut self, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        self.binop(BinOp::LShr, lhs, rhs)
    }

    /// Integer comparison, producing `i1`.
    pub fn icmp(&mut self, pred: ICmpPred, lhs: ValueRef, rhs: ValueRef) -> IrResult<ValueRef> {
        let ty = self.operand_type(lhs)?;
        let rhs_ty = self.operand_type(rhs)?;
        if ty != rhs_ty {
            return Err(IrError::TypeMismatch {
                context: "icmp",
                expected: ty,
                found: rhs_ty,
            });
        }
        if !ty.is_int() && !ty.is_ptr() {
            return Err(IrError::InvalidOperand("icmp"));
        }
        if let (Some(bits), Some(a), Some(b)) =
            (ty.int_bits(), self.func.const_int(lhs), self.func.const_int(rhs))
        {
            let folded = fold::fold_icmp(pred, a, b, bits);
            return Ok(self.const_int(1, folded));
        }
        self.place_value(Op::ICmp { pred, lhs, rhs }, Type::I1)
    }

    pub fn select(
        &mut self,
        cond: ValueRef,
        then_value: ValueRef,
        else_value: ValueRef,
    ) -> IrResult<ValueRef> {
        self.expect_type(cond, &Type::I1, "select")?;
        let ty = self.operand_type(then_value)?;
        self.expect_type(else_value, &ty, "select")?;
        if let Some(c) = self.func.const_int(cond) {
            return Ok(if c == 0 { else_value } else { then_value });
        }
        self.place_value(
            Op::Select {
                cond,
                then_value,
                else_value,
            },
            ty,
        )
    }

    fn expect_type(&self, value: ValueRef, expected: &Type, context: &'static str) -> IrResult<()> {
        let found = self.operand_type(value)?;
        if &found == expected {
            Ok(())
        } else {
            Err(IrError::TypeMismatch {
                context,
                expected: expected.clone(),
                found,
            })
        }
    }

    // ---- Casts ----

    /// Conversion to `to`. A cast to the value's own type returns the value.
    pub fn cast(&mut self, op: CastOp, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        let from = self.operand_type(value)?;
        if &from == to {
            return Ok(value);
        }
        if !cast_is_valid(op, &from, to) {
            return Err(IrError::InvalidCast {
                op: op.mnemonic(),
                from,
                to: to.clone(),
            });
        }
        if let (Some(from_bits), Some(to_bits), Some(c)) =
            (from.int_bits(), to.int_bits(), self.func.const_int(value))
        {
            if let Some(folded) = fold::fold_cast(op, c, from_bits, to_bits) {
                return Ok(self.const_int(to_bits, folded));
            }
        }
        self.place_value(Op::Cast { op, value }, to.clone())
    }

    pub fn trunc(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        self.cast(CastOp::Trunc, value, to)
    }

    pub fn zext(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        self.cast(CastOp::ZExt, value, to)
    }

    pub fn sext(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        self.cast(CastOp::SExt, value, to)
    }

    pub fn bitcast(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        self.cast(CastOp::BitCast, value, to)
    }

    pub fn int_to_ptr(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        self.cast(CastOp::IntToPtr, value, to)
    }

    pub fn ptr_to_int(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        self.cast(CastOp::PtrToInt, value, to)
    }

    /// Zero-extend or truncate an integer to the width of `to`.
    pub fn zext_or_trunc(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        let from = self.operand_type(value)?;
        match (from.int_bits(), to.int_bits()) {
            (Some(a), Some(b)) if a < b => self.zext(value, to),
            (Some(a), Some(b)) if a > b => self.trunc(value, to),
            (Some(_), Some(_)) => Ok(value),
            _ => Err(IrError::InvalidCast {
                op: "zext or trunc",
                from,
                to: to.clone(),
            }),
        }
    }

    /// Pointer/integer conversion, or a bitcast between same-sized types.
    pub fn bit_or_pointer_cast(&mut self, value: ValueRef, to: &Type) -> IrResult<ValueRef> {
        let from = self.operand_type(value)?;
        match (from.is_ptr(), to.is_ptr()) {
            (true, false) => self.ptr_to_int(value, to),
            (false, true) => self.int_to_ptr(value, to),
            _ => self.bitcast(value, to),
        }
    }

    // ---- Memory ----

    /// Load the pointee of `ptr`.
    pub fn load(&mut self, ptr: ValueRef, align: u32, volatile: bool) -> IrResult<ValueRef> {
        let ptr_ty = self.operand_type(ptr)?;
        let ty = match ptr_ty.pointee() {
            Some(ty) if ty.is_sized() => ty.clone(),
            _ => return Err(IrError::InvalidOperand("load")),
        };
        self.place_value(
            Op::Load {
                ptr,
                align,
                volatile,
            },
            ty,
        )
    }

    /// Store `value` through a pointer to its type.
    pub fn store(
        &mut self,
        value: ValueRef,
        ptr: ValueRef,
        align: u32,
        volatile: bool,
    ) -> IrResult<InstId> {
        let ty = self.operand_type(value)?;
        let ptr_ty = self.operand_type(ptr)?;
        if ptr_ty.pointee() != Some(&ty) {
            return Err(IrError::TypeMismatch {
                context: "store",
                expected: ty.ptr_to(),
                found: ptr_ty,
            });
        }
        self.place(Op::Store {
            value,
            ptr,
            align,
            volatile,
        })
    }

    /// Stack slot holding one `ty`.
    pub fn alloca(&mut self, ty: &Type) -> IrResult<ValueRef> {
        if !ty.is_sized() {
            return Err(IrError::InvalidOperand("alloca"));
        }
        self.place_value(Op::Alloca, ty.ptr_to())
    }

    /// Address of field `index` of the aggregate `base` points to.
    pub fn field_ptr(&mut self, base: ValueRef, index: u32) -> IrResult<ValueRef> {
        let base_ty = self.operand_type(base)?;
        let field = base_ty
            .pointee()
            .and_then(|agg| agg.field(index))
            .ok_or(IrError::InvalidOperand("field pointer"))?
            .ptr_to();
        self.place_value(Op::FieldPtr { base, index }, field)
    }

    // ---- Vectors ----

    pub fn insert_element(
        &mut self,
        vector: ValueRef,
        element: ValueRef,
        index: ValueRef,
    ) -> IrResult<ValueRef> {
        let vec_ty = self.operand_type(vector)?;
        let elem = vec_ty
            .element()
            .cloned()
            .ok_or(IrError::InvalidOperand("insertelement"))?;
        self.expect_type(element, &elem, "insertelement")?;
        if !self.operand_type(index)?.is_int() {
            return Err(IrError::InvalidOperand("insertelement index"));
        }
        self.place_value(
            Op::InsertElement {
                vector,
                element,
                index,
            },
            vec_ty,
        )
    }

    pub fn extract_element(&mut self, vector: ValueRef, index: ValueRef) -> IrResult<ValueRef> {
        let elem = self
            .operand_type(vector)?
            .element()
            .cloned()
            .ok_or(IrError::InvalidOperand("extractelement"))?;
        if !self.operand_type(index)?.is_int() {
            return Err(IrError::InvalidOperand("extractelement index"));
        }
        self.place_value(Op::ExtractElement { vector, index }, elem)
    }

    // ---- Intrinsics and calls ----

    pub fn sqrt(&mut self, value: ValueRef) -> IrResult<ValueRef> {
        let ty = self.operand_type(value)?;
        if !ty.is_fp_or_fp_vector() {
            return Err(IrError::InvalidOperand("sqrt"));
        }
        self.place_value(
            Op::Intrinsic {
                intrinsic: Intrinsic::Sqrt,
                args: vec![value],
            },
            ty,
        )
    }

    pub fn bswap(&mut self, value: ValueRef) -> IrResult<ValueRef> {
        let ty = self.operand_type(value)?;
        if !ty.int_bits().is_some_and(|bits| bits % 16 == 0) {
            return Err(IrError::InvalidOperand("bswap"));
        }
        self.place_value(
            Op::Intrinsic {
                intrinsic: Intrinsic::Bswap,
                args: vec![value],
            },
            ty,
        )
    }

    /// Runtime lookup of the lifted code for a native address (`i8*` to `i8*`).
    pub fn translate_at(&mut self, address: ValueRef) -> IrResult<ValueRef> {
        self.expect_type(address, &Type::byte_ptr(), "translate_at")?;
        self.place_value(
            Op::Intrinsic {
                intrinsic: Intrinsic::TranslateAt,
                args: vec![address],
            },
            Type::byte_ptr(),
        )
    }

    /// Call returning `void`.
    pub fn call(&mut self, callee: Callee, args: &[ValueRef]) -> IrResult<InstId> {
        if let Callee::Indirect(target) = &callee {
            self.expect_type(*target, &Type::lifted_fn_ptr(), "indirect call")?;
        }
        for &arg in args {
            self.operand_type(arg)?;
        }
        self.place(Op::Call {
            callee,
            args: args.to_vec(),
        })
    }

    pub fn fence(&mut self, ordering: AtomicOrdering, scope: SyncScope) -> IrResult<InstId> {
        self.place(Op::Fence { ordering, scope })
    }

    pub fn trap(&mut self) -> IrResult<InstId> {
        self.place(Op::Trap)
    }

    // ---- Terminators ----

    pub fn br(&mut self, target: BlockRef) -> IrResult<InstId> {
        self.check_block(target)?;
        self.place(Op::Br { target })
    }

    pub fn cond_br(
        &mut self,
        cond: ValueRef,
        then_block: BlockRef,
        else_block: BlockRef,
    ) -> IrResult<InstId> {
        self.expect_type(cond, &Type::I1, "conditional branch")?;
        self.check_block(then_block)?;
        self.check_block(else_block)?;
        self.place(Op::CondBr {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn ret(&mut self) -> IrResult<InstId> {
        self.place(Op::Ret)
    }

    pub fn unreachable(&mut self) -> IrResult<InstId> {
        self.place(Op::Unreachable)
    }

    fn check_block(&self, block: BlockRef) -> IrResult<()> {
        if self.func.contains_block(block) {
            Ok(())
        } else {
            Err(IrError::UnknownBlock(block.0))
        }
    }
}

fn lanes(ty: &Type) -> Option<u32> {
    match ty {
        Type::Vector { lanes, .. } => Some(*lanes),
        _ => None,
    }
}

fn cast_is_valid(op: CastOp, from: &Type, to: &Type) -> bool {
    let same_shape = lanes(from) == lanes(to);
    let (f, t) = (from.element().unwrap_or(from), to.element().unwrap_or(to));
    let widths = (f.primitive_bits(), t.primitive_bits());
    match op {
        CastOp::Trunc => same_shape && f.is_int() && t.is_int() && widths.0 > widths.1,
        CastOp::ZExt | CastOp::SExt => {
            same_shape && f.is_int() && t.is_int() && widths.0 < widths.1
        }
        CastOp::FpToUi | CastOp::FpToSi => same_shape && f.is_float() && t.is_int(),
        CastOp::UiToFp | CastOp::SiToFp => same_shape && f.is_int() && t.is_float(),
        CastOp::FpTrunc => same_shape && f.is_float() && t.is_float() && widths.0 > widths.1,
        CastOp::FpExt => same_shape && f.is_float() && t.is_float() && widths.0 < widths.1,
        CastOp::PtrToInt => from.is_ptr() && to.is_int(),
        CastOp::IntToPtr => from.is_int() && to.is_ptr(),
        CastOp::BitCast => match (from.is_ptr(), to.is_ptr()) {
            (true, true) => true,
            (false, false) => {
                from.primitive_bits().is_some() && from.primitive_bits() == to.primitive_bits()
            }
            _ => false,
        },
    }
}
