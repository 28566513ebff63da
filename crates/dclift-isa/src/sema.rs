//! Semantic operation catalogue.
//!
//! A semantics program is a flat `u32` stream. Each operation is encoded as
//! `[opcode, result-type, (second result-type), inline words...]` and a
//! program ends with [`END_OF_INSTRUCTION`]. Opcode words in
//! `[TARGET_OPCODE_START, DC_OPCODE_START)` belong to the target.

/// Terminates one instruction's semantics program.
pub const END_OF_INSTRUCTION: u32 = 0;

/// First opcode word reserved for target extension operations.
pub const TARGET_OPCODE_START: u32 = 0x100;

/// First lifter-specific opcode word (register access, literals, hooks).
pub const DC_OPCODE_START: u32 = 0x1000;

/// Generic and lifter-specific semantic operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u32)]
pub enum SemaOp {
    // Binary arithmetic
    Add = 1,
    Sub = 2,
    Mul = 3,
    SDiv = 4,
    UDiv = 5,
    SRem = 6,
    URem = 7,
    FAdd = 8,
    FSub = 9,
    FMul = 10,
    FDiv = 11,
    FRem = 12,
    Shl = 13,
    Srl = 14,
    Sra = 15,
    And = 16,
    Or = 17,
    Xor = 18,
    Rotl = 19,

    // Conversions
    Truncate = 32,
    ZeroExtend = 33,
    SignExtend = 34,
    Bitcast = 35,
    FpToUint = 36,
    FpToSint = 37,
    UintToFp = 38,
    SintToFp = 39,
    FpRound = 40,
    FpExtend = 41,

    // Unary
    FSqrt = 48,
    Bswap = 49,

    // Vectors
    InsertVectorElt = 56,
    ExtractVectorElt = 57,

    /// Wide multiply; carries a second result-type word.
    SMulLoHi = 64,
    UMulLoHi = 65,

    // Memory and control
    Load = 72,
    Store = 73,
    BrInd = 74,
    Br = 75,
    Trap = 76,
    AtomicFence = 77,

    // Lifter operations
    /// Write a register named by a decoded operand: `[operand]`.
    PutRc = DC_OPCODE_START,
    /// Write a fixed register: `[reg]`.
    PutReg = DC_OPCODE_START + 1,
    /// Read a register named by a decoded operand: `[operand]`.
    GetRc = DC_OPCODE_START + 2,
    /// Read a fixed register: `[reg]`.
    GetReg = DC_OPCODE_START + 3,
    /// Target-decoded operand: `[kind, operand]`.
    CustomOp = DC_OPCODE_START + 4,
    /// Target addressing pattern: `[pattern]`.
    ComplexPattern = DC_OPCODE_START + 5,
    /// Predicate-guarded memory or logic operation: `[predicate]`.
    Predicate = DC_OPCODE_START + 6,
    /// Immediate from a decoded operand: `[operand]`.
    ConstantOp = DC_OPCODE_START + 7,
    /// Wide literal from the pool: `[index]`.
    MovConstant = DC_OPCODE_START + 8,
    /// Implicit register effect: `[reg]`.
    Implicit = DC_OPCODE_START + 9,
}

impl SemaOp {
    const ALL: [Self; 51] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::SDiv,
        Self::UDiv,
        Self::SRem,
        Self::URem,
        Self::FAdd,
        Self::FSub,
        Self::FMul,
        Self::FDiv,
        Self::FRem,
        Self::Shl,
        Self::Srl,
        Self::Sra,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Rotl,
        Self::Truncate,
        Self::ZeroExtend,
        Self::SignExtend,
        Self::Bitcast,
        Self::FpToUint,
        Self::FpToSint,
        Self::UintToFp,
        Self::SintToFp,
        Self::FpRound,
        Self::FpExtend,
        Self::FSqrt,
        Self::Bswap,
        Self::InsertVectorElt,
        Self::ExtractVectorElt,
        Self::SMulLoHi,
        Self::UMulLoHi,
        Self::Load,
        Self::Store,
        Self::BrInd,
        Self::Br,
        Self::Trap,
        Self::AtomicFence,
        Self::PutRc,
        Self::PutReg,
        Self::GetRc,
        Self::GetReg,
        Self::CustomOp,
        Self::ComplexPattern,
        Self::Predicate,
        Self::ConstantOp,
        Self::MovConstant,
        Self::Implicit,
    ];

    /// Decode an opcode word. Target range and unknown words yield `None`.
    pub fn from_word(word: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| *op as u32 == word)
    }

    pub const fn word(self) -> u32 {
        self as u32
    }

    /// Operations that read a second result-type word.
    pub const fn has_second_result(self) -> bool {
        matches!(self, Self::SMulLoHi | Self::UMulLoHi)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::SDiv => "SDIV",
            Self::UDiv => "UDIV",
            Self::SRem => "SREM",
            Self::URem => "UREM",
            Self::FAdd => "FADD",
            Self::FSub => "FSUB",
            Self::FMul => "FMUL",
            Self::FDiv => "FDIV",
            Self::FRem => "FREM",
            Self::Shl => "SHL",
            Self::Srl => "SRL",
            Self::Sra => "SRA",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Rotl => "ROTL",
            Self::Truncate => "TRUNCATE",
            Self::ZeroExtend => "ZERO_EXTEND",
            Self::SignExtend => "SIGN_EXTEND",
            Self::Bitcast => "BITCAST",
            Self::FpToUint => "FP_TO_UINT",
            Self::FpToSint => "FP_TO_SINT",
            Self::UintToFp => "UINT_TO_FP",
            Self::SintToFp => "SINT_TO_FP",
            Self::FpRound => "FP_ROUND",
            Self::FpExtend => "FP_EXTEND",
            Self::FSqrt => "FSQRT",
            Self::Bswap => "BSWAP",
            Self::InsertVectorElt => "INSERT_VECTOR_ELT",
            Self::ExtractVectorElt => "EXTRACT_VECTOR_ELT",
            Self::SMulLoHi => "SMUL_LOHI",
            Self::UMulLoHi => "UMUL_LOHI",
            Self::Load => "LOAD",
            Self::Store => "STORE",
            Self::BrInd => "BRIND",
            Self::Br => "BR",
            Self::Trap => "TRAP",
            Self::AtomicFence => "ATOMIC_FENCE",
            Self::PutRc => "PUT_RC",
            Self::PutReg => "PUT_REG",
            Self::GetRc => "GET_RC",
            Self::GetReg => "GET_REG",
            Self::CustomOp => "CUSTOM_OP",
            Self::ComplexPattern => "COMPLEX_PATTERN",
            Self::Predicate => "PREDICATE",
            Self::ConstantOp => "CONSTANT_OP",
            Self::MovConstant => "MOV_CONSTANT",
            Self::Implicit => "IMPLICIT",
        }
    }
}

/// Whether an opcode word is in the target extension range.
pub const fn is_target_opcode(word: u32) -> bool {
    word >= TARGET_OPCODE_START && word < DC_OPCODE_START
}
