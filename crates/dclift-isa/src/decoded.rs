//! Decoded native instructions, blocks and functions.
//!
//! Produced by a disassembler and consumed read-only by the lifter.

use std::fmt::{self, Display};

/// Architectural register number, as used by the target's register set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct RegId(pub u16);

impl Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One decoded operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Reg(RegId),
    Imm(i64),
    /// Floating point immediate as raw bits.
    FpImm(u64),
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg(reg) => write!(f, "{reg}"),
            Self::Imm(imm) => write!(f, "#{imm}"),
            Self::FpImm(bits) => write!(f, "#fp:{bits:#x}"),
        }
    }
}

/// A decoded machine instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInst {
    /// Address of the first byte.
    pub address: u64,
    /// Encoded size in bytes.
    pub size: u8,
    /// Native opcode number.
    pub opcode: u32,
    pub operands: Vec<Operand>,
}

impl DecodedInst {
    pub const fn new(address: u64, size: u8, opcode: u32) -> Self {
        Self {
            address,
            size,
            opcode,
            operands: Vec::new(),
        }
    }

    /// Append a register operand.
    #[must_use]
    pub fn with_reg(mut self, reg: u16) -> Self {
        self.operands.push(Operand::Reg(RegId(reg)));
        self
    }

    /// Append an immediate operand.
    #[must_use]
    pub fn with_imm(mut self, imm: i64) -> Self {
        self.operands.push(Operand::Imm(imm));
        self
    }

    /// Register at operand index `idx`.
    pub fn reg(&self, idx: usize) -> Option<RegId> {
        match self.operands.get(idx)? {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        }
    }

    /// Immediate at operand index `idx`.
    pub fn imm(&self, idx: usize) -> Option<i64> {
        match self.operands.get(idx)? {
            Operand::Imm(imm) => Some(*imm),
            Operand::FpImm(bits) => Some(*bits as i64),
            Operand::Reg(_) => None,
        }
    }

    /// Address of the following instruction.
    pub const fn next_address(&self) -> u64 {
        self.address.wrapping_add(self.size as u64)
    }
}

impl Display for DecodedInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{:#x}: op {}", self.address, self.opcode)?;
        for op in &self.operands {
            write!(f, " {op}")?;
        }
        write!(f, ">")
    }
}

/// A straight-line run of decoded instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedBlock {
    pub start: u64,
    /// Address just past the last instruction.
    pub end: u64,
    pub instructions: Vec<DecodedInst>,
}

impl DecodedBlock {
    /// Build a block; `end` is derived from the last instruction.
    pub fn new(start: u64, instructions: Vec<DecodedInst>) -> Self {
        let end = instructions.last().map_or(start, DecodedInst::next_address);
        Self {
            start,
            end,
            instructions,
        }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// A decoded function: blocks in stream order and an entry address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFunction {
    pub entry: u64,
    pub blocks: Vec<DecodedBlock>,
}

impl DecodedFunction {
    pub const fn new(entry: u64, blocks: Vec<DecodedBlock>) -> Self {
        Self { entry, blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total number of instructions.
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(DecodedBlock::len).sum()
    }
}
