//! Operation definitions.

use crate::types::{AtomicOrdering, SyncScope};
use crate::value::{BlockRef, FuncId, ValueRef};

/// Binary arithmetic and bitwise operations.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinOp {
    /// Shift operations (amount is the right operand).
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::LShr | Self::AShr)
    }

    /// Floating point operations.
    pub const fn is_float(self) -> bool {
        matches!(
            self,
            Self::FAdd | Self::FSub | Self::FMul | Self::FDiv | Self::FRem
        )
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::UDiv => "udiv",
            Self::SDiv => "sdiv",
            Self::URem => "urem",
            Self::SRem => "srem",
            Self::Shl => "shl",
            Self::LShr => "lshr",
            Self::AShr => "ashr",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::FAdd => "fadd",
            Self::FSub => "fsub",
            Self::FMul => "fmul",
            Self::FDiv => "fdiv",
            Self::FRem => "frem",
        }
    }
}

/// Conversions. The destination type is the result value's type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    FpTrunc,
    FpExt,
    PtrToInt,
    IntToPtr,
    BitCast,
}

impl CastOp {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Trunc => "trunc",
            Self::ZExt => "zext",
            Self::SExt => "sext",
            Self::FpToUi => "fptoui",
            Self::FpToSi => "fptosi",
            Self::UiToFp => "uitofp",
            Self::SiToFp => "sitofp",
            Self::FpTrunc => "fptrunc",
            Self::FpExt => "fpext",
            Self::PtrToInt => "ptrtoint",
            Self::IntToPtr => "inttoptr",
            Self::BitCast => "bitcast",
        }
    }
}

/// Integer comparison predicates.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ICmpPred {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl ICmpPred {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Ugt => "ugt",
            Self::Uge => "uge",
            Self::Ult => "ult",
            Self::Ule => "ule",
            Self::Sgt => "sgt",
            Self::Sge => "sge",
            Self::Slt => "slt",
            Self::Sle => "sle",
        }
    }
}

/// Builtin operations lowered by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Intrinsic {
    /// Square root of a float or float vector.
    Sqrt,
    /// Byte swap of an integer.
    Bswap,
    /// Runtime lookup of the lifted function for a native address.
    TranslateAt,
}

impl Intrinsic {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sqrt => "llvm.sqrt",
            Self::Bswap => "llvm.bswap",
            Self::TranslateAt => "llvm.dc.translate.at",
        }
    }
}

/// Target of a call.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum Callee {
    /// Lifted function in the same module.
    Direct(FuncId),
    /// Computed lifted-function pointer.
    Indirect(ValueRef),
    /// Runtime helper resolved by name at link time.
    External(String),
}

/// Operation kinds.
///
/// Operations producing a value record it in [`InstData::result`].
/// Block targets use `BlockRef` directly.
#[derive(Clone, Debug)]
pub enum Op {
    Binary {
        op: BinOp,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    Cast {
        op: CastOp,
        value: ValueRef,
    },
    ICmp {
        pred: ICmpPred,
        lhs: ValueRef,
        rhs: ValueRef,
    },
    Select {
        cond: ValueRef,
        then_value: ValueRef,
        else_value: ValueRef,
    },
    Load {
        ptr: ValueRef,
        align: u32,
        volatile: bool,
    },
    Store {
        value: ValueRef,
        ptr: ValueRef,
        align: u32,
        volatile: bool,
    },
    /// Stack slot in the current frame.
    Alloca,
    /// Address of a field of the aggregate `base` points to.
    FieldPtr {
        base: ValueRef,
        index: u32,
    },
    InsertElement {
        vector: ValueRef,
        element: ValueRef,
        index: ValueRef,
    },
    ExtractElement {
        vector: ValueRef,
        index: ValueRef,
    },
    Intrinsic {
        intrinsic: Intrinsic,
        args: Vec<ValueRef>,
    },
    Call {
        callee: Callee,
        args: Vec<ValueRef>,
    },
    Fence {
        ordering: AtomicOrdering,
        scope: SyncScope,
    },
    /// Unconditional abort.
    Trap,

    // -- Terminators (placed last in a basic block) --
    Br {
        target: BlockRef,
    },
    CondBr {
        cond: ValueRef,
        then_block: BlockRef,
        else_block: BlockRef,
    },
    Ret,
    Unreachable,
}

impl Op {
    /// Check if this operation ends a basic block.
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Br { .. } | Self::CondBr { .. } | Self::Ret | Self::Unreachable
        )
    }

    /// Check if this operation is a call to a lifted or external function.
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    /// Blocks control may transfer to.
    pub fn successors(&self) -> Vec<BlockRef> {
        match self {
            Self::Br { target } => vec![*target],
            Self::CondBr {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            _ => Vec::new(),
        }
    }

    /// Values read by this operation.
    pub fn operands(&self) -> Vec<ValueRef> {
        match self {
            Self::Binary { lhs, rhs, .. } | Self::ICmp { lhs, rhs, .. } => vec![*lhs, *rhs],
            Self::Cast { value, .. } => vec![*value],
            Self::Select {
                cond,
                then_value,
                else_value,
            } => vec![*cond, *then_value, *else_value],
            Self::Load { ptr, .. } => vec![*ptr],
            Self::Store { value, ptr, .. } => vec![*value, *ptr],
            Self::FieldPtr { base, .. } => vec![*base],
            Self::InsertElement {
                vector,
                element,
                index,
            } => vec![*vector, *element, *index],
            Self::ExtractElement { vector, index } => vec![*vector, *index],
            Self::Intrinsic { args, .. } => args.clone(),
            Self::Call { callee, args } => {
                let mut ops = Vec::with_capacity(args.len() + 1);
                if let Callee::Indirect(target) = callee {
                    ops.push(*target);
                }
                ops.extend_from_slice(args);
                ops
            }
            Self::CondBr { cond, .. } => vec![*cond],
            Self::Alloca
            | Self::Fence { .. }
            | Self::Trap
            | Self::Br { .. }
            | Self::Ret
            | Self::Unreachable => Vec::new(),
        }
    }
}

/// An operation placed in a function.
#[derive(Clone, Debug)]
pub struct InstData {
    pub op: Op,
    /// Value produced, if any.
    pub result: Option<ValueRef>,
    /// Owning block, `None` once erased.
    pub block: Option<BlockRef>,
}
