//! Type system for the lifted IR.
//!
//! Types:
//! - `Int(n)`: fixed-width integer of n bits
//! - `Float(kind)`: IEEE / x87 floating point
//! - `Vector { lanes, elem }`: fixed-length SIMD vector
//! - `Ptr(pointee)`: typed pointer
//! - `Struct(fields)`: aggregate (the register file is one)
//! - `LiftedFn`: the uniform `void (regset*)` signature of every lifted function

use std::fmt;

/// Floating point type variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    /// IEEE 754 half precision.
    Half,
    /// IEEE 754 single precision.
    Single,
    /// IEEE 754 double precision.
    Double,
    /// x87 80-bit extended precision.
    X87,
    /// IEEE 754 quad precision.
    Quad,
}

impl FloatKind {
    /// Storage width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Half => 16,
            Self::Single => 32,
            Self::Double => 64,
            Self::X87 => 80,
            Self::Quad => 128,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Single => "float",
            Self::Double => "double",
            Self::X87 => "x86_fp80",
            Self::Quad => "fp128",
        }
    }
}

/// A type in the lifted IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value.
    Void,
    /// Integer of the given bit width.
    Int(u32),
    /// Floating point value.
    Float(FloatKind),
    /// Fixed-length vector.
    Vector { lanes: u32, elem: Box<Type> },
    /// Pointer to a value of the given type.
    Ptr(Box<Type>),
    /// Aggregate with positional fields.
    Struct(Vec<Type>),
    /// Signature shared by every lifted function: `void (regset*)`.
    LiftedFn,
}

impl Type {
    pub const I1: Self = Self::Int(1);
    pub const I8: Self = Self::Int(8);
    pub const I16: Self = Self::Int(16);
    pub const I32: Self = Self::Int(32);
    pub const I64: Self = Self::Int(64);
    pub const I128: Self = Self::Int(128);

    /// Create a vector type.
    #[must_use]
    pub fn vector(lanes: u32, elem: Self) -> Self {
        Self::Vector {
            lanes,
            elem: Box::new(elem),
        }
    }

    /// Pointer to this type.
    #[must_use]
    pub fn ptr_to(&self) -> Self {
        Self::Ptr(Box::new(self.clone()))
    }

    /// `i8*`, the untyped byte pointer.
    #[must_use]
    pub fn byte_ptr() -> Self {
        Self::I8.ptr_to()
    }

    /// Pointer to a lifted function.
    #[must_use]
    pub fn lifted_fn_ptr() -> Self {
        Self::LiftedFn.ptr_to()
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr(_))
    }

    pub const fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    /// Integer width, if this is an integer type.
    pub const fn int_bits(&self) -> Option<u32> {
        match self {
            Self::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Size in bits of a first-class non-pointer value.
    ///
    /// Pointers, aggregates and `void` have no primitive size.
    pub fn primitive_bits(&self) -> Option<u32> {
        match self {
            Self::Int(bits) => Some(*bits),
            Self::Float(kind) => Some(kind.bits()),
            Self::Vector { lanes, elem } => elem.primitive_bits().map(|b| b * lanes),
            _ => None,
        }
    }

    /// Pointee type, if this is a pointer.
    pub fn pointee(&self) -> Option<&Self> {
        match self {
            Self::Ptr(pointee) => Some(pointee),
            _ => None,
        }
    }

    /// Lane type, if this is a vector.
    pub fn element(&self) -> Option<&Self> {
        match self {
            Self::Vector { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Field type of an aggregate.
    pub fn field(&self, index: u32) -> Option<&Self> {
        match self {
            Self::Struct(fields) => fields.get(index as usize),
            _ => None,
        }
    }

    /// Integer or vector of integers.
    pub fn is_int_or_int_vector(&self) -> bool {
        self.is_int() || self.element().is_some_and(Self::is_int)
    }

    /// Float or vector of floats.
    pub fn is_fp_or_fp_vector(&self) -> bool {
        self.is_float() || self.element().is_some_and(Self::is_float)
    }

    /// Whether values of this type can be loaded and stored.
    pub const fn is_sized(&self) -> bool {
        !matches!(self, Self::Void | Self::LiftedFn)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Float(kind) => write!(f, "{}", kind.name()),
            Self::Vector { lanes, elem } => write!(f, "<{lanes} x {elem}>"),
            Self::Ptr(pointee) => write!(f, "{pointee}*"),
            Self::Struct(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")
            }
            Self::LiftedFn => write!(f, "void (...)"),
        }
    }
}

/// Memory ordering for fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicOrdering {
    Unordered,
    Monotonic,
    Acquire,
    Release,
    AcqRel,
    SeqCst,
}

impl AtomicOrdering {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unordered => "unordered",
            Self::Monotonic => "monotonic",
            Self::Acquire => "acquire",
            Self::Release => "release",
            Self::AcqRel => "acq_rel",
            Self::SeqCst => "seq_cst",
        }
    }
}

/// Synchronization scope of a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncScope {
    /// Only orders against signal handlers on the same thread.
    SingleThread,
    /// Orders against all threads.
    CrossThread,
}
