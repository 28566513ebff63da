//! Translation errors.

use std::fmt;

use dclift_ir::IrError;
use dclift_isa::SemaError;
use dclift_regs::RegsError;
use thiserror::Error;

/// Native instruction an error was raised for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub address: u64,
    pub opcode: u32,
    pub mnemonic: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (opcode {}) at {:#x}",
            self.mnemonic, self.opcode, self.address
        )
    }
}

fn site(at: &Option<Location>) -> String {
    at.as_ref().map_or_else(String::new, |loc| format!(" in {loc}"))
}

/// Translator errors.
///
/// Only [`UnmappedOpcode`](Error::UnmappedOpcode) and
/// [`SemanticOperation`](Error::SemanticOperation) are instruction-local;
/// everything else aborts the whole translation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no semantics{}", site(.at))]
    UnmappedOpcode { at: Option<Location> },

    #[error("{what} failed{}", site(.at))]
    SemanticOperation { at: Option<Location>, what: String },

    #[error("internal invariant violated: {message}{}", site(.at))]
    Invariant { at: Option<Location>, message: String },

    #[error("invalid {what} encoding {value}{}", site(.at))]
    Encoding {
        at: Option<Location>,
        what: &'static str,
        value: u128,
    },

    #[error("function at {address:#x} already has a body")]
    AlreadyTranslated { address: u64 },

    #[error("semantics table: {source}{}", site(.at))]
    Table {
        at: Option<Location>,
        source: SemaError,
    },

    #[error("IR: {source}{}", site(.at))]
    Ir {
        at: Option<Location>,
        source: IrError,
    },

    #[error("registers: {source}{}", site(.at))]
    Register {
        at: Option<Location>,
        source: RegsError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            at: None,
            message: message.into(),
        }
    }

    pub fn semantic(what: impl Into<String>) -> Self {
        Self::SemanticOperation {
            at: None,
            what: what.into(),
        }
    }

    /// Whether the unknown-instruction policy may neutralise this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnmappedOpcode { .. } | Self::SemanticOperation { .. }
        )
    }

    pub const fn location(&self) -> Option<&Location> {
        match self {
            Self::UnmappedOpcode { at }
            | Self::SemanticOperation { at, .. }
            | Self::Invariant { at, .. }
            | Self::Encoding { at, .. }
            | Self::Table { at, .. }
            | Self::Ir { at, .. }
            | Self::Register { at, .. } => at.as_ref(),
            Self::AlreadyTranslated { .. } => None,
        }
    }

    /// Attach `loc` unless a location is already recorded.
    #[must_use]
    pub fn at(mut self, loc: &Location) -> Self {
        match &mut self {
            Self::UnmappedOpcode { at }
            | Self::SemanticOperation { at, .. }
            | Self::Invariant { at, .. }
            | Self::Encoding { at, .. }
            | Self::Table { at, .. }
            | Self::Ir { at, .. }
            | Self::Register { at, .. } => {
                if at.is_none() {
                    *at = Some(loc.clone());
                }
            }
            Self::AlreadyTranslated { .. } => {}
        }
        self
    }
}

impl From<IrError> for Error {
    fn from(source: IrError) -> Self {
        Self::Ir { at: None, source }
    }
}

impl From<RegsError> for Error {
    fn from(source: RegsError) -> Self {
        Self::Register { at: None, source }
    }
}

impl From<SemaError> for Error {
    fn from(source: SemaError) -> Self {
        Self::Table { at: None, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location {
            address: 0x1004,
            opcode: 24,
            mnemonic: "UDF".into(),
        }
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::UnmappedOpcode { at: None }.is_recoverable());
        assert!(Error::semantic("complex pattern 3").is_recoverable());
        assert!(!Error::invariant("double claim").is_recoverable());
        assert!(!Error::from(IrError::NoInsertionPoint).is_recoverable());
        assert!(!Error::AlreadyTranslated { address: 0 }.is_recoverable());
    }

    #[test]
    fn test_location_is_attached_once() {
        let err = Error::UnmappedOpcode { at: None }.at(&loc());
        assert_eq!(err.to_string(), "no semantics in UDF (opcode 24) at 0x1004");
        let other = Location {
            address: 0,
            ..loc()
        };
        assert_eq!(err.at(&other).location(), Some(&loc()));
    }
}
