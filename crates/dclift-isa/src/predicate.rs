//! Predicates selecting specialised memory and logic operations.

/// Predicate tag of a `PREDICATE` semantic operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum Predicate {
    Load,
    Memop,
    LoadI16,
    LoadI32,
    AlignedLoad,
    AlignedLoad256,
    AlignedLoad512,
    Store,
    AlignedStore,
    AlignedStore256,
    AlignedStore512,
    NonTemporalStore,
    AlignedNonTemporalStore,
    ZextLoadI8,
    ZextLoadI16,
    SextLoadI8,
    SextLoadI16,
    SextLoadI32,
    AndSu,
}

/// What a predicate lowers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PredicateKind {
    /// Plain load of the result type.
    Load,
    /// Plain store of the operand's type.
    Store,
    /// Load of `mem_bits`, then zero or sign extension to the result type.
    ExtLoad { mem_bits: u32, signed: bool },
    /// Bitwise AND of two operands.
    And,
}

impl Predicate {
    const ALL: [Self; 19] = [
        Self::Load,
        Self::Memop,
        Self::LoadI16,
        Self::LoadI32,
        Self::AlignedLoad,
        Self::AlignedLoad256,
        Self::AlignedLoad512,
        Self::Store,
        Self::AlignedStore,
        Self::AlignedStore256,
        Self::AlignedStore512,
        Self::NonTemporalStore,
        Self::AlignedNonTemporalStore,
        Self::ZextLoadI8,
        Self::ZextLoadI16,
        Self::SextLoadI8,
        Self::SextLoadI16,
        Self::SextLoadI32,
        Self::AndSu,
    ];

    /// Bytecode word for this predicate.
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub const fn kind(self) -> PredicateKind {
        match self {
            Self::Load
            | Self::Memop
            | Self::LoadI16
            | Self::LoadI32
            | Self::AlignedLoad
            | Self::AlignedLoad256
            | Self::AlignedLoad512 => PredicateKind::Load,
            Self::Store
            | Self::AlignedStore
            | Self::AlignedStore256
            | Self::AlignedStore512
            | Self::NonTemporalStore
            | Self::AlignedNonTemporalStore => PredicateKind::Store,
            Self::ZextLoadI8 => PredicateKind::ExtLoad {
                mem_bits: 8,
                signed: false,
            },
            Self::ZextLoadI16 => PredicateKind::ExtLoad {
                mem_bits: 16,
                signed: false,
            },
            Self::SextLoadI8 => PredicateKind::ExtLoad {
                mem_bits: 8,
                signed: true,
            },
            Self::SextLoadI16 => PredicateKind::ExtLoad {
                mem_bits: 16,
                signed: true,
            },
            Self::SextLoadI32 => PredicateKind::ExtLoad {
                mem_bits: 32,
                signed: true,
            },
            Self::AndSu => PredicateKind::And,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Memop => "memop",
            Self::LoadI16 => "loadi16",
            Self::LoadI32 => "loadi32",
            Self::AlignedLoad => "alignedload",
            Self::AlignedLoad256 => "alignedload256",
            Self::AlignedLoad512 => "alignedload512",
            Self::Store => "store",
            Self::AlignedStore => "alignedstore",
            Self::AlignedStore256 => "alignedstore256",
            Self::AlignedStore512 => "alignedstore512",
            Self::NonTemporalStore => "nontemporalstore",
            Self::AlignedNonTemporalStore => "alignednontemporalstore",
            Self::ZextLoadI8 => "zextloadi8",
            Self::ZextLoadI16 => "zextloadi16",
            Self::SextLoadI8 => "sextloadi8",
            Self::SextLoadI16 => "sextloadi16",
            Self::SextLoadI32 => "sextloadi32",
            Self::AndSu => "and_su",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        for p in Predicate::ALL {
            assert_eq!(Predicate::from_code(p.code()), Some(p), "{}", p.name());
        }
        assert_eq!(Predicate::from_code(19), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Predicate::AlignedLoad512.kind(), PredicateKind::Load);
        assert_eq!(Predicate::NonTemporalStore.kind(), PredicateKind::Store);
        assert_eq!(
            Predicate::SextLoadI32.kind(),
            PredicateKind::ExtLoad {
                mem_bits: 32,
                signed: true
            }
        );
    }
}
