//! The register access seam used by the lifter.

use dclift_ir::{BlockRef, FunctionBuilder, InstId, Type, ValueRef};
use dclift_isa::{DecodedInst, RegId};

use crate::error::RegsResult;
use crate::regset::RegisterSet;

/// Name of the runtime helper that reports register-file differences.
pub const REGSET_DIFF_FN: &str = "dc_regset_diff";

/// How lifted code reads and writes architectural registers.
///
/// One instance serves one function translation. All IR is emitted through
/// the builder passed in; implementations restore the builder's cursor
/// when they insert elsewhere.
pub trait RegisterSema: Send {
    fn register_set(&self) -> &RegisterSet;

    /// The register-file aggregate.
    fn regset_type(&self) -> &Type {
        self.register_set().regset_type()
    }

    fn program_counter(&self) -> RegId {
        self.register_set().program_counter()
    }

    /// Integer type of a register's width.
    fn reg_int_type(&self, reg: RegId) -> RegsResult<Type> {
        self.register_set().reg_int_type(reg)
    }

    /// Start a function whose entry block is `entry`.
    fn switch_to_function(&mut self, b: &mut FunctionBuilder, entry: BlockRef) -> RegsResult<()>;

    /// Start emitting into `block`.
    fn switch_to_block(&mut self, b: &mut FunctionBuilder, block: BlockRef) -> RegsResult<()>;

    /// Start translating `inst`.
    fn switch_to_inst(&mut self, inst: &DecodedInst);

    /// Read a register with its declared type.
    fn get_reg(&mut self, b: &mut FunctionBuilder, reg: RegId) -> RegsResult<ValueRef>;

    /// Read a register as an integer of its width.
    fn get_reg_as_int(&mut self, b: &mut FunctionBuilder, reg: RegId) -> RegsResult<ValueRef>;

    /// Write a register. `value` must have the register's width.
    fn set_reg(&mut self, b: &mut FunctionBuilder, reg: RegId, value: ValueRef) -> RegsResult<()>;

    /// Merge the narrower integer `bits` into the low bits of `full`.
    fn insert_bits_in_value(
        &mut self,
        b: &mut FunctionBuilder,
        full: ValueRef,
        bits: ValueRef,
    ) -> RegsResult<ValueRef>;

    /// Write every live register back to the aggregate before `call`.
    fn save_all_local_regs(&mut self, b: &mut FunctionBuilder, call: InstId) -> RegsResult<()>;

    /// Reload every live register from the aggregate after `call`.
    fn restore_local_regs(&mut self, b: &mut FunctionBuilder, call: InstId) -> RegsResult<()>;

    /// The current block is complete.
    fn finalize_block(&mut self, b: &mut FunctionBuilder) -> RegsResult<()>;

    /// All blocks are complete; `exit` is the normal return path.
    fn finalize_function(&mut self, b: &mut FunctionBuilder, exit: BlockRef) -> RegsResult<()>;

    /// External function called with `(i8* fn_addr, regset* before, regset* after)`.
    fn regset_diff_function(&self) -> &str {
        REGSET_DIFF_FN
    }
}
