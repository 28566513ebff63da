//! Function translation.
//!
//! A [`Translator`] owns one output function while it is being built. Blocks
//! are created lazily per native address as `[trap, unreachable]`
//! placeholders and claimed exactly once when the instruction stream reaches
//! them. Calls are split into their own `[call, br]` blocks so register
//! save and restore can be bracketed around them at the end.

use std::collections::VecDeque;

use dclift_ir::{
    BlockRef, Callee, FuncId, Function, FunctionBuilder, InsertPoint, Module, Op, ParamAttrs,
    Type, ValueRef,
};
use dclift_isa::{
    DecodedBlock, DecodedFunction, DecodedInst, END_OF_INSTRUCTION, RegId, SemaCursor, ValueType,
};
use dclift_regs::RegisterSema;
use metrics::counter;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info_span, trace, warn};

use crate::config::TranslateConfig;
use crate::error::{Error, Location, Result};
use crate::target::{Target, WholeInst};
use crate::unit::TranslationUnit;

/// Lifecycle of an address-keyed block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// Placeholder `[trap, unreachable]` body.
    Unclaimed,
    /// Content is being or has been translated.
    Claimed,
}

#[derive(Clone, Copy, Debug)]
struct BlockEntry {
    block: BlockRef,
    state: BlockState,
}

/// The block instructions are currently emitted into.
#[derive(Debug)]
struct OpenBlock {
    block: BlockRef,
    /// Name of the claimed block, reused for continuation blocks.
    base: String,
    /// Fallthrough address; `None` for blocks that must terminate themselves.
    end: Option<u64>,
}

/// Position in the current block before an instruction was translated.
#[derive(Clone, Copy, Debug)]
struct Mark {
    block: BlockRef,
    len: usize,
}

/// Per-instruction scratch state, dropped when the instruction is done.
struct InstState<'a> {
    decoded: DecodedInst,
    cursor: Option<SemaCursor<'a>>,
    result_vt: ValueType,
    operands: VecDeque<ValueRef>,
}

/// Translates one decoded function into IR.
pub struct Translator<'a> {
    unit: &'a TranslationUnit,
    target: &'a Target,
    config: &'a TranslateConfig,
    func_id: FuncId,
    address: u64,
    b: FunctionBuilder,
    regs: Box<dyn RegisterSema>,
    blocks: FxHashMap<u64, BlockEntry>,
    entry: BlockRef,
    exit: BlockRef,
    call_blocks: Vec<BlockRef>,
    open: Option<OpenBlock>,
    inst: Option<InstState<'a>>,
}

impl<'a> Translator<'a> {
    /// Set up entry and exit scaffolding for the function at `address`.
    pub fn new(
        unit: &'a TranslationUnit,
        target: &'a Target,
        config: &'a TranslateConfig,
        address: u64,
    ) -> Result<Self> {
        let regs = target.new_register_sema();
        if &unit.regset_type() != regs.regset_type() {
            return Err(Error::invariant(
                "target register file does not match the translation unit",
            ));
        }
        let func_id = unit.get_or_create_function(address);
        if unit.is_translated(func_id) {
            return Err(Error::AlreadyTranslated { address });
        }

        let mut func = Function::new(Module::function_name(address), address, regs.regset_type());
        func.param_attrs = ParamAttrs {
            noalias: true,
            nocapture: true,
        };
        let mut b = FunctionBuilder::new(func);
        let entry = b.create_block(format!("entry_fn_{address:x}"));
        let exit = b.create_block(format!("exit_fn_{address:x}"));

        let mut t = Self {
            unit,
            target,
            config,
            func_id,
            address,
            b,
            regs,
            blocks: FxHashMap::default(),
            entry,
            exit,
            call_blocks: Vec::new(),
            open: None,
            inst: None,
        };
        t.b.position_at_end(entry);
        t.regs.switch_to_function(&mut t.b, entry)?;
        if config.register_diff {
            t.build_diff_exit()?;
        } else {
            t.b.position_at_end(exit);
            t.b.ret()?;
        }
        t.b.position_at_end(entry);
        let first = t.get_or_create_block(address)?;
        t.b.br(first)?;
        Ok(t)
    }

    /// Snapshot the register file in the entry block and report the diff
    /// from a dedicated block the exit block branches to.
    fn build_diff_exit(&mut self) -> Result<()> {
        let regset_ty = self.regs.regset_type().clone();
        let regset = self.b.func().regset_arg();
        self.b.position_at_end(self.entry);
        let snapshot = self.b.alloca(&regset_ty)?;
        let current = self.b.load(regset, 8, false)?;
        self.b.store(current, snapshot, 8, false)?;

        let diff_exit = self.b.create_block(format!("diff_exit_fn_{:x}", self.address));
        self.b.position_at_end(diff_exit);
        let address = self.b.const_i64(self.address);
        let fn_addr = self.b.int_to_ptr(address, &Type::byte_ptr())?;
        let diff = Callee::External(self.regs.regset_diff_function().to_string());
        self.b.call(diff, &[fn_addr, snapshot, regset])?;
        self.b.ret()?;

        self.b.position_at_end(self.exit);
        self.b.br(diff_exit)?;
        Ok(())
    }

    /// Translate every block of `decoded` in stream order, then finish.
    pub fn translate(mut self, decoded: &DecodedFunction) -> Result<FuncId> {
        for block in &decoded.blocks {
            self.switch_to_block(block)?;
            for inst in &block.instructions {
                if self.is_terminated() {
                    debug!(
                        address = format_args!("{:#x}", inst.address),
                        "block already terminated, skipping the rest"
                    );
                    break;
                }
                self.translate_inst(inst)?;
            }
            self.finalize_block()?;
        }
        self.finish()
    }

    // ---- Blocks ----

    /// Block for `address`, creating a placeholder on first reference.
    pub fn get_or_create_block(&mut self, address: u64) -> Result<BlockRef> {
        if let Some(entry) = self.blocks.get(&address) {
            return Ok(entry.block);
        }
        let block = self.b.create_block(format!("bb_{address:x}"));
        let saved = self.b.insertion_point();
        self.b.position_at_end(block);
        let placed = self.b.trap().and_then(|_| self.b.unreachable());
        self.b.set_insertion_point(saved);
        placed?;
        self.blocks.insert(
            address,
            BlockEntry {
                block,
                state: BlockState::Unclaimed,
            },
        );
        Ok(block)
    }

    pub fn block_state(&self, address: u64) -> Option<BlockState> {
        self.blocks.get(&address).map(|entry| entry.state)
    }

    /// Take ownership of the placeholder at `address`, emptying it.
    fn claim(&mut self, address: u64) -> Result<BlockRef> {
        let block = self.get_or_create_block(address)?;
        if self.block_state(address) == Some(BlockState::Claimed) {
            return Err(Error::invariant(format!(
                "block at {address:#x} claimed twice"
            )));
        }
        let func = self.b.func();
        let insts = func.block_insts(block).to_vec();
        let placeholder = match insts.as_slice() {
            [trap, unreachable] => {
                matches!(func.inst(*trap).op, Op::Trap)
                    && matches!(func.inst(*unreachable).op, Op::Unreachable)
            }
            _ => false,
        };
        if !placeholder {
            return Err(Error::invariant(format!(
                "placeholder at {address:#x} is not [trap, unreachable]"
            )));
        }
        for inst in insts {
            self.b.erase(inst)?;
        }
        if let Some(entry) = self.blocks.get_mut(&address) {
            entry.state = BlockState::Claimed;
        }
        Ok(block)
    }

    /// Start emitting the decoded block `block`.
    ///
    /// An empty block has nothing to fall through from and keeps trapping.
    pub fn switch_to_block(&mut self, block: &DecodedBlock) -> Result<()> {
        self.open_block(block.start, Some(block.end))?;
        if block.is_empty() {
            debug!(address = format_args!("{:#x}", block.start), "empty block");
            self.emit_trap()?;
        }
        Ok(())
    }

    fn open_block(&mut self, address: u64, end: Option<u64>) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(Error::invariant(format!(
                "block {} is still open",
                self.b.func().block_name(open.block)
            )));
        }
        let block = self.claim(address)?;
        self.b.position_at_end(block);
        self.regs.switch_to_block(&mut self.b, block)?;
        let pc = self.regs.program_counter();
        let pc_ty = self.regs.reg_int_type(pc)?;
        let start = self.b.const_of(&pc_ty, u128::from(address))?;
        self.regs.set_reg(&mut self.b, pc, start)?;
        self.open = Some(OpenBlock {
            block,
            base: self.b.func().block_name(block).to_string(),
            end,
        });
        debug!(address = format_args!("{address:#x}"), "claimed block");
        Ok(())
    }

    /// Close the current block, falling through to its end address when it
    /// has no terminator.
    pub fn finalize_block(&mut self) -> Result<()> {
        let open = self
            .open
            .take()
            .ok_or_else(|| Error::invariant("no block to finalize"))?;
        if self.b.func().terminator(open.block).is_none() {
            let next = open.end.ok_or_else(|| {
                Error::invariant(format!(
                    "block {} has no terminator and no fallthrough",
                    self.b.func().block_name(open.block)
                ))
            })?;
            let target = self.get_or_create_block(next)?;
            self.b.position_at_end(open.block);
            self.b.br(target)?;
        }
        self.regs.finalize_block(&mut self.b)?;
        Ok(())
    }

    /// Whether the current block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|open| self.b.func().terminator(open.block).is_some())
    }

    // ---- Calls ----

    /// Call the lifted code at `target`, splitting the current block.
    ///
    /// Constant targets resolve through the translation unit; anything else
    /// goes through the target's dynamic resolver.
    pub fn insert_call(&mut self, target: ValueRef) -> Result<BlockRef> {
        let callee = match self.b.func().const_int(target) {
            Some(address) => {
                let address = u64::try_from(address)
                    .map_err(|_| Error::invariant("call target wider than 64 bits"))?;
                Callee::Direct(self.unit.get_or_create_function(address))
            }
            None => {
                let bundle = self.target;
                Callee::Indirect(bundle.resolver().resolve(self, target)?)
            }
        };
        self.insert_call_block(callee)
    }

    /// `current: ... br call` / `call: call callee(regset); br cont` / `cont`.
    fn insert_call_block(&mut self, callee: Callee) -> Result<BlockRef> {
        let (block, base) = match &self.open {
            Some(open) => (open.block, open.base.clone()),
            None => return Err(Error::invariant("call outside of a block")),
        };
        if self.b.insertion_point() != Some(InsertPoint::End(block)) {
            return Err(Error::invariant(
                "call sites must be split at the end of the current block",
            ));
        }
        let name = format!("{}_call", self.b.func().block_name(block));
        let call_block = self.b.create_block(name);
        self.b.br(call_block)?;

        let suffix = self
            .inst
            .as_ref()
            .map(|state| format!("{:x}", state.decoded.address))
            .unwrap_or_default();
        let cont = self.b.create_block(format!("{base}_c{suffix}"));

        self.b.position_at_end(call_block);
        let regset = self.b.func().regset_arg();
        self.b.call(callee, &[regset])?;
        self.b.br(cont)?;

        self.regs.finalize_block(&mut self.b)?;
        self.b.position_at_end(cont);
        self.regs.switch_to_block(&mut self.b, cont)?;
        if let Some(open) = self.open.as_mut() {
            open.block = cont;
        }
        self.call_blocks.push(call_block);
        counter!("dclift_call_sites_total").increment(1);
        debug!(block = %self.b.func().block_name(call_block), "split call site");
        Ok(call_block)
    }

    /// Block at `address` that calls the function there and returns
    /// directly, bypassing the exit block.
    ///
    /// Hooks may call this while an instruction is being translated and
    /// branch to the returned block; the current block and insertion point
    /// are left as they were.
    pub fn create_external_tail_call(&mut self, address: u64) -> Result<BlockRef> {
        let open = self.open.take();
        let inst = self.inst.take();
        let point = self.b.insertion_point();
        let result = self.build_external_tail_call(address);
        self.open = open;
        self.inst = inst;
        self.b.set_insertion_point(point);
        if let Some(open) = &self.open {
            self.regs.switch_to_block(&mut self.b, open.block)?;
        }
        result
    }

    fn build_external_tail_call(&mut self, address: u64) -> Result<BlockRef> {
        self.open_block(address, None)?;
        let block = self.get_or_create_block(address)?;
        let callee = Callee::Direct(self.unit.get_or_create_function(address));
        self.insert_call_block(callee)?;
        self.b.ret()?;
        self.finalize_block()?;
        Ok(block)
    }

    // ---- Instructions ----

    fn location(&self, inst: &DecodedInst) -> Location {
        Location {
            address: inst.address,
            opcode: inst.opcode,
            mnemonic: self.target.table().mnemonic(inst.opcode).to_string(),
        }
    }

    /// Translate one instruction into the current block, applying the
    /// unknown-instruction policy on failure.
    pub fn translate_inst(&mut self, inst: &DecodedInst) -> Result<()> {
        let loc = self.location(inst);
        trace!(address = format_args!("{:#x}", inst.address), mnemonic = %loc.mnemonic, "instruction");
        self.inst = Some(InstState {
            decoded: inst.clone(),
            cursor: None,
            result_vt: ValueType::Other,
            operands: VecDeque::new(),
        });
        self.regs.switch_to_inst(inst);

        let result = self
            .trace_address(inst.address)
            .map_err(|err| (err, None))
            .and_then(|()| {
                let mark = self.mark();
                self.try_translate_inst(inst).map_err(|err| (err, mark))
            });
        let result = match result {
            Ok(()) => {
                counter!("dclift_instructions_translated_total").increment(1);
                Ok(())
            }
            Err((err, mark)) if err.is_recoverable() && self.config.is_permissive() => {
                let err = err.at(&loc);
                warn!(error = %err, "couldn't translate instruction, emitting trap");
                counter!("dclift_instructions_trapped_total").increment(1);
                self.discard_since(mark).and_then(|()| self.emit_trap())
            }
            Err((err, _)) => {
                let err = err.at(&loc);
                error!(
                    address = format_args!("{:#x}", loc.address),
                    opcode = loc.opcode,
                    mnemonic = %loc.mnemonic,
                    error = %err,
                    "aborting translation"
                );
                Err(err)
            }
        };
        self.inst = None;
        result
    }

    fn try_translate_inst(&mut self, inst: &DecodedInst) -> Result<()> {
        let target = self.target;
        let opcode = match target.hooks().translate_whole(self, inst)? {
            WholeInst::Handled => return Ok(()),
            WholeInst::Declined => inst.opcode,
            WholeInst::Substitute(opcode) => opcode,
        };
        let offset = target
            .table()
            .lookup(opcode)
            .ok_or(Error::UnmappedOpcode { at: None })?;

        self.advance_pc(inst.size)?;
        if let Some(state) = self.inst.as_mut() {
            state.cursor = Some(target.table().cursor(offset));
        }
        loop {
            let word = self.next_word()?;
            if word == END_OF_INSTRUCTION {
                return Ok(());
            }
            self.translate_opcode(word)?;
        }
    }

    /// PC already points past the instruction when its semantics run.
    fn advance_pc(&mut self, size: u8) -> Result<()> {
        let pc = self.regs.program_counter();
        let old = self.regs.get_reg(&mut self.b, pc)?;
        let ty = self.b.func().value_type(old).clone();
        let size = self.b.const_of(&ty, u128::from(size))?;
        let new = self.b.add(old, size)?;
        self.regs.set_reg(&mut self.b, pc, new)?;
        Ok(())
    }

    fn trace_address(&mut self, address: u64) -> Result<()> {
        let Some(sink) = self.config.instruction_trace else {
            return Ok(());
        };
        let value = self.b.const_i64(address);
        let slot = self.b.const_i64(sink.slot);
        let ptr = self.b.int_to_ptr(slot, &Type::I64.ptr_to())?;
        self.b.store(value, ptr, 8, true)?;
        Ok(())
    }

    /// Current block and its length, taken before an instruction runs.
    fn mark(&self) -> Option<Mark> {
        self.open.as_ref().map(|open| Mark {
            block: open.block,
            len: self.b.func().block_insts(open.block).len(),
        })
    }

    /// Erase what a failed instruction emitted after `mark`, so none of its
    /// effects run before the trap.
    fn discard_since(&mut self, mark: Option<Mark>) -> Result<()> {
        let (Some(mark), Some(current)) = (mark, self.open.as_ref().map(|open| open.block)) else {
            return Ok(());
        };
        if current != mark.block {
            // dead once the call split below is erased
            self.b.position_at_end(current);
            if self.b.func().terminator(current).is_none() {
                self.b.trap()?;
                self.b.unreachable()?;
            }
            self.regs.finalize_block(&mut self.b)?;
            self.regs.switch_to_block(&mut self.b, mark.block)?;
            if let Some(open) = self.open.as_mut() {
                open.block = mark.block;
            }
        }
        let emitted = self
            .b
            .func()
            .block_insts(mark.block)
            .get(mark.len..)
            .unwrap_or_default()
            .to_vec();
        for inst in emitted.into_iter().rev() {
            self.b.erase(inst)?;
        }
        self.b.position_at_end(mark.block);
        Ok(())
    }

    fn emit_trap(&mut self) -> Result<()> {
        if self.is_terminated() {
            return Ok(());
        }
        self.b.trap()?;
        self.b.unreachable()?;
        Ok(())
    }

    // ---- Semantics program access (used by the interpreter and hooks) ----

    fn inst_state(&mut self) -> Result<&mut InstState<'a>> {
        self.inst
            .as_mut()
            .ok_or_else(|| Error::invariant("no instruction is being translated"))
    }

    /// Next inline word of the running semantics program.
    pub fn next_word(&mut self) -> Result<u32> {
        let cursor = self
            .inst_state()?
            .cursor
            .as_mut()
            .ok_or_else(|| Error::invariant("no semantics program is running"))?;
        Ok(cursor.next_word()?)
    }

    pub(crate) fn next_vt(&mut self) -> Result<ValueType> {
        let cursor = self
            .inst_state()?
            .cursor
            .as_mut()
            .ok_or_else(|| Error::invariant("no semantics program is running"))?;
        Ok(cursor.next_vt()?)
    }

    pub(crate) fn set_result_vt(&mut self, vt: ValueType) -> Result<()> {
        self.inst_state()?.result_vt = vt;
        Ok(())
    }

    /// Result type descriptor of the running operation.
    pub fn result_vt(&self) -> ValueType {
        self.inst
            .as_ref()
            .map_or(ValueType::Other, |state| state.result_vt)
    }

    /// IR type of the running operation's result.
    pub fn result_type(&self) -> Type {
        self.result_vt().to_type()
    }

    /// Oldest value in the operand queue.
    pub fn next_operand(&mut self) -> Result<ValueRef> {
        self.inst_state()?
            .operands
            .pop_front()
            .ok_or_else(|| Error::invariant("operand queue is empty"))
    }

    /// Queue a value for later operations of the same instruction.
    pub fn push_result(&mut self, value: ValueRef) -> Result<()> {
        self.inst_state()?.operands.push_back(value);
        Ok(())
    }

    pub fn current_inst(&self) -> Option<&DecodedInst> {
        self.inst.as_ref().map(|state| &state.decoded)
    }

    /// Register named by operand `idx` of the current instruction.
    pub fn reg_operand(&self, idx: u32) -> Result<RegId> {
        self.current_inst()
            .and_then(|inst| inst.reg(idx as usize))
            .ok_or_else(|| Error::invariant(format!("operand {idx} is not a register")))
    }

    /// Immediate at operand `idx` of the current instruction.
    pub fn imm_operand(&self, idx: u32) -> Result<i64> {
        self.current_inst()
            .and_then(|inst| inst.imm(idx as usize))
            .ok_or_else(|| Error::invariant(format!("operand {idx} is not an immediate")))
    }

    pub fn literal(&self, index: u32) -> Result<u64> {
        Ok(self.target.table().literal(index)?)
    }

    // ---- Registers ----

    pub fn program_counter(&self) -> RegId {
        self.regs.program_counter()
    }

    pub fn reg_int_type(&self, reg: RegId) -> Result<Type> {
        Ok(self.regs.reg_int_type(reg)?)
    }

    pub fn get_reg(&mut self, reg: RegId) -> Result<ValueRef> {
        Ok(self.regs.get_reg(&mut self.b, reg)?)
    }

    pub fn get_reg_as_int(&mut self, reg: RegId) -> Result<ValueRef> {
        Ok(self.regs.get_reg_as_int(&mut self.b, reg)?)
    }

    pub fn set_reg(&mut self, reg: RegId, value: ValueRef) -> Result<()> {
        Ok(self.regs.set_reg(&mut self.b, reg, value)?)
    }

    pub fn insert_bits_in_value(&mut self, full: ValueRef, bits: ValueRef) -> Result<ValueRef> {
        Ok(self.regs.insert_bits_in_value(&mut self.b, full, bits)?)
    }

    // ---- Accessors ----

    pub const fn builder(&mut self) -> &mut FunctionBuilder {
        &mut self.b
    }

    pub const fn function(&self) -> &Function {
        self.b.func()
    }

    pub const fn target(&self) -> &'a Target {
        self.target
    }

    pub const fn entry_block(&self) -> BlockRef {
        self.entry
    }

    pub const fn exit_block(&self) -> BlockRef {
        self.exit
    }

    /// Call blocks recorded so far.
    pub fn call_blocks(&self) -> &[BlockRef] {
        &self.call_blocks
    }

    // ---- Teardown ----

    /// Bracket every call block with register save/restore, finalize the
    /// register model and install the body in the translation unit.
    pub fn finish(mut self) -> Result<FuncId> {
        if let Some(open) = &self.open {
            return Err(Error::invariant(format!(
                "block {} was never finalized",
                self.b.func().block_name(open.block)
            )));
        }
        for &call_block in &self.call_blocks {
            let func = self.b.func();
            let call = match *func.block_insts(call_block) {
                [call, _] if func.inst(call).op.is_call() => call,
                _ => {
                    return Err(Error::invariant(format!(
                        "call block {} lost its [call, br] shape",
                        func.block_name(call_block)
                    )));
                }
            };
            self.regs.save_all_local_regs(&mut self.b, call)?;
            self.regs.restore_local_regs(&mut self.b, call)?;
        }
        self.regs.finalize_function(&mut self.b, self.exit)?;

        let Self {
            unit, func_id, b, ..
        } = self;
        unit.commit(func_id, b.finish())?;
        Ok(func_id)
    }
}

/// Translate `decoded` into `unit`.
///
/// On error the function keeps whatever declaration it had; nothing
/// partially translated is committed.
pub fn translate_function(
    unit: &TranslationUnit,
    target: &Target,
    config: &TranslateConfig,
    decoded: &DecodedFunction,
) -> Result<FuncId> {
    let span = info_span!("translate_function", entry = format_args!("{:#x}", decoded.entry));
    let _guard = span.enter();
    if decoded.is_empty() {
        return Err(Error::invariant(format!(
            "function at {:#x} has no blocks",
            decoded.entry
        )));
    }
    let result =
        Translator::new(unit, target, config, decoded.entry).and_then(|t| t.translate(decoded));
    match &result {
        Ok(_) => counter!("dclift_functions_translated_total").increment(1),
        Err(err) => {
            counter!("dclift_functions_failed_total").increment(1);
            if err.location().is_none() {
                error!(error = %err, "function translation failed");
            }
        }
    }
    result
}

#[cfg(test)]
mod tests;
