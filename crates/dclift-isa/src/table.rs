//! Per-target semantics tables and the assembler that builds them.

use thiserror::Error;

use crate::predicate::Predicate;
use crate::sema::{END_OF_INSTRUCTION, SemaOp};
use crate::vt::ValueType;

/// Errors raised while building or reading a semantics table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemaError {
    #[error("opcode {opcode} maps to offset {offset} past the end of the bytecode")]
    OffsetOutOfRange { opcode: u32, offset: u32 },

    #[error("bytecode ends at word {0} without END_OF_INSTRUCTION")]
    Truncated(usize),

    #[error("literal index {0} is outside the pool")]
    LiteralOutOfRange(u32),

    #[error("unknown value type code {0}")]
    UnknownValueType(u32),

    #[error("opcode {0} is defined twice")]
    DuplicateOpcode(u32),
}

/// Immutable opcode index, bytecode and literal pool for one architecture.
#[derive(Clone, Debug, Default)]
pub struct SemanticsTable {
    opcode_index: Vec<u32>,
    bytecode: Vec<u32>,
    literals: Vec<u64>,
    mnemonics: Vec<String>,
}

impl SemanticsTable {
    /// Marker in the opcode index for opcodes without semantics.
    pub const UNMAPPED: u32 = u32::MAX;

    /// Wrap pre-built tables. Every mapped offset must point into `bytecode`.
    pub fn new(
        opcode_index: Vec<u32>,
        bytecode: Vec<u32>,
        literals: Vec<u64>,
        mnemonics: Vec<String>,
    ) -> Result<Self, SemaError> {
        for (opcode, &offset) in opcode_index.iter().enumerate() {
            if offset != Self::UNMAPPED && offset as usize >= bytecode.len() {
                return Err(SemaError::OffsetOutOfRange {
                    opcode: opcode as u32,
                    offset,
                });
            }
        }
        Ok(Self {
            opcode_index,
            bytecode,
            literals,
            mnemonics,
        })
    }

    /// Bytecode offset for a native opcode, `None` if unmapped.
    pub fn lookup(&self, opcode: u32) -> Option<usize> {
        match self.opcode_index.get(opcode as usize) {
            Some(&offset) if offset != Self::UNMAPPED => Some(offset as usize),
            _ => None,
        }
    }

    /// Reader positioned at `offset`.
    pub fn cursor(&self, offset: usize) -> SemaCursor<'_> {
        SemaCursor {
            words: &self.bytecode,
            pos: offset,
        }
    }

    pub fn literal(&self, index: u32) -> Result<u64, SemaError> {
        self.literals
            .get(index as usize)
            .copied()
            .ok_or(SemaError::LiteralOutOfRange(index))
    }

    /// Name of a native opcode, for diagnostics.
    pub fn mnemonic(&self, opcode: u32) -> &str {
        self.mnemonics
            .get(opcode as usize)
            .map_or("<unknown>", String::as_str)
    }

    pub fn bytecode(&self) -> &[u32] {
        &self.bytecode
    }

    pub fn literals(&self) -> &[u64] {
        &self.literals
    }

    /// Number of native opcodes covered by the index.
    pub fn opcode_count(&self) -> usize {
        self.opcode_index.len()
    }

    /// Number of native opcodes with semantics.
    pub fn mapped_count(&self) -> usize {
        self.opcode_index
            .iter()
            .filter(|&&o| o != Self::UNMAPPED)
            .count()
    }
}

/// Sequential reader over bytecode words.
#[derive(Clone, Debug)]
pub struct SemaCursor<'a> {
    words: &'a [u32],
    pos: usize,
}

impl SemaCursor<'_> {
    /// Fetch the next word.
    pub fn next_word(&mut self) -> Result<u32, SemaError> {
        let word = *self
            .words
            .get(self.pos)
            .ok_or(SemaError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(word)
    }

    /// Fetch the next word as a result-type descriptor.
    pub fn next_vt(&mut self) -> Result<ValueType, SemaError> {
        let code = self.next_word()?;
        ValueType::from_code(code).ok_or(SemaError::UnknownValueType(code))
    }

    pub const fn position(&self) -> usize {
        self.pos
    }
}

/// One instruction's semantics program under construction.
#[derive(Clone, Debug, Default)]
pub struct SemaProgram {
    words: Vec<u32>,
}

impl SemaProgram {
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Operation with a result type and no inline words.
    #[must_use]
    pub fn op(mut self, op: SemaOp, vt: ValueType) -> Self {
        self.words.extend([op.word(), vt.code()]);
        self
    }

    /// Wide multiply with low and high result types.
    #[must_use]
    pub fn mul_lohi(mut self, op: SemaOp, lo: ValueType, hi: ValueType) -> Self {
        self.words.extend([op.word(), lo.code(), hi.code()]);
        self
    }

    /// Raw word, for target opcodes and their inline operands.
    #[must_use]
    pub fn word(mut self, word: u32) -> Self {
        self.words.push(word);
        self
    }

    /// Target extension opcode with a result type.
    #[must_use]
    pub fn target(self, opcode: u32, vt: ValueType) -> Self {
        self.word(opcode).word(vt.code())
    }

    /// Read the register named by decoded operand `operand`.
    #[must_use]
    pub fn get_rc(self, vt: ValueType, operand: u32) -> Self {
        self.op(SemaOp::GetRc, vt).word(operand)
    }

    /// Write the register named by decoded operand `operand`.
    #[must_use]
    pub fn put_rc(self, operand: u32) -> Self {
        self.op(SemaOp::PutRc, ValueType::Other).word(operand)
    }

    #[must_use]
    pub fn get_reg(self, vt: ValueType, reg: u16) -> Self {
        self.op(SemaOp::GetReg, vt).word(u32::from(reg))
    }

    #[must_use]
    pub fn put_reg(self, reg: u16) -> Self {
        self.op(SemaOp::PutReg, ValueType::Other).word(u32::from(reg))
    }

    /// Immediate from decoded operand `operand`.
    #[must_use]
    pub fn constant_op(self, vt: ValueType, operand: u32) -> Self {
        self.op(SemaOp::ConstantOp, vt).word(operand)
    }

    /// Literal pool entry `index`.
    #[must_use]
    pub fn mov_constant(self, vt: ValueType, index: u32) -> Self {
        self.op(SemaOp::MovConstant, vt).word(index)
    }

    #[must_use]
    pub fn predicate(self, pred: Predicate, vt: ValueType) -> Self {
        self.op(SemaOp::Predicate, vt).word(pred.code())
    }

    #[must_use]
    pub fn custom_op(self, vt: ValueType, kind: u32, operand: u32) -> Self {
        self.op(SemaOp::CustomOp, vt).word(kind).word(operand)
    }

    #[must_use]
    pub fn complex_pattern(self, vt: ValueType, pattern: u32) -> Self {
        self.op(SemaOp::ComplexPattern, vt).word(pattern)
    }

    #[must_use]
    pub fn implicit(self, reg: u16) -> Self {
        self.op(SemaOp::Implicit, ValueType::Other).word(u32::from(reg))
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }
}

/// Builds a [`SemanticsTable`] from per-opcode programs.
#[derive(Debug, Default)]
pub struct SemanticsAssembler {
    opcode_index: Vec<u32>,
    bytecode: Vec<u32>,
    literals: Vec<u64>,
    mnemonics: Vec<String>,
}

impl SemanticsAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, opcode: u32, mnemonic: &str) -> &mut u32 {
        let idx = opcode as usize;
        if self.opcode_index.len() <= idx {
            self.opcode_index.resize(idx + 1, SemanticsTable::UNMAPPED);
            self.mnemonics.resize(idx + 1, String::new());
        }
        self.mnemonics[idx] = mnemonic.to_string();
        &mut self.opcode_index[idx]
    }

    /// Name an opcode without giving it semantics.
    pub fn declare(&mut self, opcode: u32, mnemonic: &str) {
        self.slot(opcode, mnemonic);
    }

    /// Give `opcode` the semantics in `program`.
    pub fn define(
        &mut self,
        opcode: u32,
        mnemonic: &str,
        program: &SemaProgram,
    ) -> Result<(), SemaError> {
        let offset = self.bytecode.len() as u32;
        let slot = self.slot(opcode, mnemonic);
        if *slot != SemanticsTable::UNMAPPED {
            return Err(SemaError::DuplicateOpcode(opcode));
        }
        *slot = offset;
        self.bytecode.extend_from_slice(program.words());
        self.bytecode.push(END_OF_INSTRUCTION);
        Ok(())
    }

    /// Add a wide literal, returning its pool index.
    pub fn literal(&mut self, value: u64) -> u32 {
        if let Some(idx) = self.literals.iter().position(|&v| v == value) {
            return idx as u32;
        }
        self.literals.push(value);
        (self.literals.len() - 1) as u32
    }

    pub fn build(self) -> Result<SemanticsTable, SemaError> {
        SemanticsTable::new(
            self.opcode_index,
            self.bytecode,
            self.literals,
            self.mnemonics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_and_read() {
        let mut asm = SemanticsAssembler::new();
        asm.declare(0, "NOP");
        let add = SemaProgram::new()
            .get_rc(ValueType::I64, 1)
            .get_rc(ValueType::I64, 2)
            .op(SemaOp::Add, ValueType::I64)
            .put_rc(0);
        asm.define(3, "ADD", &add).unwrap();
        let idx = asm.literal(0xDEAD_BEEF_0000);
        assert_eq!(asm.literal(0xDEAD_BEEF_0000), idx);
        let table = asm.build().unwrap();

        assert_eq!(table.lookup(0), None);
        assert_eq!(table.lookup(1), None);
        assert_eq!(table.lookup(99), None);
        assert_eq!(table.mnemonic(3), "ADD");
        assert_eq!(table.mnemonic(99), "<unknown>");
        assert_eq!(table.literal(idx), Ok(0xDEAD_BEEF_0000));
        assert_eq!(table.mapped_count(), 1);

        let mut cursor = table.cursor(table.lookup(3).unwrap());
        assert_eq!(cursor.next_word(), Ok(SemaOp::GetRc.word()));
        assert_eq!(cursor.next_vt(), Ok(ValueType::I64));
        assert_eq!(cursor.next_word(), Ok(1));
        let rest: Vec<u32> = std::iter::from_fn(|| cursor.next_word().ok()).collect();
        assert_eq!(rest.last(), Some(&END_OF_INSTRUCTION));
    }

    #[test]
    fn test_duplicate_definition() {
        let mut asm = SemanticsAssembler::new();
        asm.define(1, "A", &SemaProgram::new()).unwrap();
        assert_eq!(
            asm.define(1, "A", &SemaProgram::new()),
            Err(SemaError::DuplicateOpcode(1))
        );
    }

    #[test]
    fn test_offset_validation() {
        let err = SemanticsTable::new(vec![5], vec![0], Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(
            err,
            SemaError::OffsetOutOfRange {
                opcode: 0,
                offset: 5
            }
        );
    }

    #[test]
    fn test_truncated_cursor() {
        let table = SemanticsTable::new(vec![0], vec![SemaOp::Add.word()], Vec::new(), Vec::new())
            .unwrap();
        let mut cursor = table.cursor(0);
        cursor.next_word().unwrap();
        assert_eq!(cursor.next_vt(), Err(SemaError::Truncated(1)));
        assert_eq!(table.literal(0), Err(SemaError::LiteralOutOfRange(0)));
    }
}
