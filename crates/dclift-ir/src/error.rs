//! IR construction and verification errors.

use thiserror::Error;

use crate::types::Type;

/// Errors raised while building or verifying IR.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("no insertion point set")]
    NoInsertionPoint,

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: Type,
        found: Type,
    },

    #[error("invalid operand for {0}")]
    InvalidOperand(&'static str),

    #[error("invalid {op} from {from} to {to}")]
    InvalidCast {
        op: &'static str,
        from: Type,
        to: Type,
    },

    #[error("unknown instruction #{0}")]
    UnknownInst(u32),

    #[error("unknown block #{0}")]
    UnknownBlock(u32),

    #[error("block {0} is empty")]
    EmptyBlock(String),

    #[error("block {0} does not end in a terminator")]
    MissingTerminator(String),

    #[error("terminator in the middle of block {0}")]
    TerminatorNotLast(String),

    #[error("branch in block {block} targets unknown block #{target}")]
    BadBranchTarget { block: String, target: u32 },

    #[error("instruction in block {block} uses unknown value %{value}")]
    BadOperand { block: String, value: u32 },
}

pub type IrResult<T> = std::result::Result<T, IrError>;
