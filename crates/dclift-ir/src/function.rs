//! Lifted functions.

use crate::op::{InstData, Op};
use crate::types::Type;
use crate::value::{BlockRef, InstId, ValueData, ValueKind, ValueRef};

/// Attributes of the register-file parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamAttrs {
    /// No other pointer aliases the register file during the call.
    pub noalias: bool,
    /// The callee does not retain the pointer.
    pub nocapture: bool,
}

/// A basic block: a name and an ordered list of placed operations.
#[derive(Clone, Debug)]
pub struct Block {
    pub name: String,
    pub(crate) insts: Vec<InstId>,
}

/// A lifted function with signature `void (regset*)`.
///
/// Values, operations and blocks live in arenas owned by the function.
/// Parameter 0 is always the register-file pointer.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    address: u64,
    pub param_attrs: ParamAttrs,
    pub(crate) values: Vec<ValueData>,
    pub(crate) insts: Vec<InstData>,
    pub(crate) blocks: Vec<Block>,
}

impl Function {
    /// Create a body-less function for the code at `address`.
    pub fn new(name: impl Into<String>, address: u64, regset_ty: &Type) -> Self {
        Self {
            name: name.into(),
            address,
            param_attrs: ParamAttrs::default(),
            values: vec![ValueData {
                kind: ValueKind::Param(0),
                ty: regset_ty.ptr_to(),
            }],
            insts: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native address this function was lifted from.
    pub const fn address(&self) -> u64 {
        self.address
    }

    /// The register-file parameter.
    pub const fn regset_arg(&self) -> ValueRef {
        ValueRef(0)
    }

    /// Aggregate type the register-file parameter points to.
    pub fn regset_type(&self) -> &Type {
        self.values[0].ty.pointee().unwrap_or(&Type::Void)
    }

    /// A function without blocks is only a declaration.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// All blocks in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockRef> + '_ {
        (0..self.blocks.len()).map(|i| BlockRef(i as u32))
    }

    pub fn block(&self, block: BlockRef) -> &Block {
        &self.blocks[block.0 as usize]
    }

    pub fn block_name(&self, block: BlockRef) -> &str {
        &self.block(block).name
    }

    /// Operations placed in a block, in order.
    pub fn block_insts(&self, block: BlockRef) -> &[InstId] {
        &self.block(block).insts
    }

    /// Operation kinds placed in a block, in order.
    pub fn block_ops(&self, block: BlockRef) -> Vec<&Op> {
        self.block_insts(block)
            .iter()
            .map(|&id| &self.inst(id).op)
            .collect()
    }

    /// Look up a block by name.
    pub fn find_block(&self, name: &str) -> Option<BlockRef> {
        self.blocks
            .iter()
            .position(|b| b.name == name)
            .map(|i| BlockRef(i as u32))
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id.0 as usize]
    }

    pub fn value(&self, value: ValueRef) -> &ValueData {
        &self.values[value.0 as usize]
    }

    pub fn value_type(&self, value: ValueRef) -> &Type {
        &self.value(value).ty
    }

    /// Integer literal behind a value, if it is one.
    pub fn const_int(&self, value: ValueRef) -> Option<u128> {
        match self.value(value).kind {
            ValueKind::ConstInt(v) => Some(v),
            _ => None,
        }
    }

    /// Operation that produced a value, if any.
    pub fn defining_inst(&self, value: ValueRef) -> Option<InstId> {
        match self.value(value).kind {
            ValueKind::Inst(id) => Some(id),
            _ => None,
        }
    }

    /// Last operation of a block if it is a terminator.
    pub fn terminator(&self, block: BlockRef) -> Option<InstId> {
        self.block_insts(block)
            .last()
            .copied()
            .filter(|&id| self.inst(id).op.is_terminator())
    }

    /// Number of operations placed in blocks.
    pub fn inst_count(&self) -> usize {
        self.blocks.iter().map(|b| b.insts.len()).sum()
    }

    pub(crate) fn contains_value(&self, value: ValueRef) -> bool {
        (value.0 as usize) < self.values.len()
    }

    pub(crate) fn contains_block(&self, block: BlockRef) -> bool {
        (block.0 as usize) < self.blocks.len()
    }

    pub(crate) fn contains_inst(&self, id: InstId) -> bool {
        (id.0 as usize) < self.insts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration() {
        let regset = Type::Struct(vec![Type::I64]);
        let func = Function::new("fn_1000", 0x1000, &regset);
        assert!(func.is_empty());
        assert_eq!(func.address(), 0x1000);
        assert_eq!(func.regset_type(), &regset);
        assert_eq!(func.value_type(func.regset_arg()), &regset.ptr_to());
    }
}
