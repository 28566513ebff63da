//! Opaque handles for IR entities.
//!
//! All references into the IR are u32 indices into per-function arenas
//! (or the module's function list for `FuncId`), not pointers.

use crate::types::Type;

/// Reference to a value (parameter, constant or operation result).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef(pub(crate) u32);

impl ValueRef {
    /// Raw index into the value arena.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Reference to an operation in the instruction arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub(crate) u32);

impl InstId {
    /// Raw index into the instruction arena.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Reference to a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(pub(crate) u32);

impl BlockRef {
    /// Raw index into the block arena.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// Reference to a function in a [`Module`](crate::Module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    /// Raw index into the module's function list.
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// What a value is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Function parameter.
    Param(u32),
    /// Integer constant, already masked to its type's width.
    ConstInt(u128),
    /// Undefined value of a type.
    Undef,
    /// Address of a lifted function.
    Func(FuncId),
    /// Result of an operation.
    Inst(InstId),
}

/// A value together with its type.
#[derive(Debug, Clone)]
pub struct ValueData {
    pub kind: ValueKind,
    pub ty: Type,
}
