//! Result-type descriptors carried in the bytecode.

use dclift_ir::{FloatKind, Type};

/// Value type of a semantic operation's result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ValueType {
    /// No value (stores, branches, fences).
    Other,
    I1,
    I8,
    I16,
    I32,
    I64,
    I128,
    F16,
    F32,
    F64,
    F80,
    F128,
    V16I8,
    V8I16,
    V4I32,
    V2I64,
    V4F32,
    V2F64,
    /// Pointer-sized integer.
    IPtr,
}

impl ValueType {
    const ALL: [Self; 19] = [
        Self::Other,
        Self::I1,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::I128,
        Self::F16,
        Self::F32,
        Self::F64,
        Self::F80,
        Self::F128,
        Self::V16I8,
        Self::V8I16,
        Self::V4I32,
        Self::V2I64,
        Self::V4F32,
        Self::V2F64,
        Self::IPtr,
    ];

    /// Bytecode word for this type.
    pub const fn code(self) -> u32 {
        match self {
            Self::Other => 0,
            Self::I1 => 1,
            Self::I8 => 2,
            Self::I16 => 3,
            Self::I32 => 4,
            Self::I64 => 5,
            Self::I128 => 6,
            Self::F16 => 8,
            Self::F32 => 9,
            Self::F64 => 10,
            Self::F80 => 11,
            Self::F128 => 12,
            Self::V16I8 => 16,
            Self::V8I16 => 17,
            Self::V4I32 => 18,
            Self::V2I64 => 19,
            Self::V4F32 => 20,
            Self::V2F64 => 21,
            Self::IPtr => 32,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|vt| vt.code() == code)
    }

    /// IR type for this descriptor. `IPtr` is a 64-bit integer and `Other`
    /// is `void`.
    pub fn to_type(self) -> Type {
        let double = || Type::Float(FloatKind::Double);
        match self {
            Self::Other => Type::Void,
            Self::I1 => Type::I1,
            Self::I8 => Type::I8,
            Self::I16 => Type::I16,
            Self::I32 => Type::I32,
            Self::I64 | Self::IPtr => Type::I64,
            Self::I128 => Type::I128,
            Self::F16 => Type::Float(FloatKind::Half),
            Self::F32 => Type::Float(FloatKind::Single),
            Self::F64 => double(),
            Self::F80 => Type::Float(FloatKind::X87),
            Self::F128 => Type::Float(FloatKind::Quad),
            Self::V16I8 => Type::vector(16, Type::I8),
            Self::V8I16 => Type::vector(8, Type::I16),
            Self::V4I32 => Type::vector(4, Type::I32),
            Self::V2I64 => Type::vector(2, Type::I64),
            Self::V4F32 => Type::vector(4, Type::Float(FloatKind::Single)),
            Self::V2F64 => Type::vector(2, double()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        for vt in ValueType::ALL {
            assert_eq!(ValueType::from_code(vt.code()), Some(vt));
        }
        assert_eq!(ValueType::from_code(7), None);
    }

    #[test]
    fn test_iptr_is_i64() {
        assert_eq!(ValueType::IPtr.to_type(), Type::I64);
        assert_eq!(ValueType::V4I32.to_type().primitive_bits(), Some(128));
    }
}
