//! Register model errors.

use dclift_ir::{IrError, Type};
use dclift_isa::RegId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegsError {
    #[error("unknown register {0}")]
    UnknownRegister(RegId),

    #[error("unknown register name '{0}'")]
    UnknownName(String),

    #[error("register '{0}' has an invalid alias")]
    BadAlias(String),

    #[error("program counter must be a root integer register")]
    BadProgramCounter,

    #[error("write to {reg} expects {expected}, got {found}")]
    WidthMismatch { reg: RegId, expected: Type, found: Type },

    #[error("no function is being translated")]
    NoFunction,

    #[error(transparent)]
    Ir(#[from] IrError),
}

pub type RegsResult<T> = std::result::Result<T, RegsError>;
