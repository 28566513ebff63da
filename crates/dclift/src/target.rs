//! Per-architecture bundle: semantics table, registers and hooks.

use std::fmt;
use std::sync::Arc;

use dclift_ir::{Type, ValueRef};
use dclift_isa::{DecodedInst, RegId, SemanticsTable};
use dclift_regs::{LocalRegisterSema, RegisterSema, RegisterSet};

use crate::error::Result;
use crate::translator::Translator;

/// Outcome of the whole-instruction hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WholeInst {
    /// The hook emitted the instruction.
    Handled,
    /// Use the generic semantics for the instruction's opcode.
    Declined,
    /// Use the generic semantics of a different native opcode.
    Substitute(u32),
}

/// Target-specific translation entry points.
///
/// Every method has a declining default; a target overrides the ones its
/// semantics tables rely on.
pub trait TargetHooks: Send + Sync {
    /// First refusal on a whole instruction, before its semantics run.
    fn translate_whole(&self, t: &mut Translator<'_>, inst: &DecodedInst) -> Result<WholeInst> {
        let _ = (t, inst);
        Ok(WholeInst::Declined)
    }

    /// Extension opcode in the target range. The result type is already
    /// read; further inline words come from [`Translator::next_word`].
    fn translate_target_opcode(&self, t: &mut Translator<'_>, opcode: u32) -> Result<bool> {
        let _ = (t, opcode);
        Ok(false)
    }

    /// Target addressing pattern; `None` fails the operation.
    fn complex_pattern(&self, t: &mut Translator<'_>, pattern: u32) -> Result<Option<ValueRef>> {
        let _ = (t, pattern);
        Ok(None)
    }

    /// Target-encoded operand; `None` fails the operation.
    fn custom_operand(
        &self,
        t: &mut Translator<'_>,
        kind: u32,
        operand: u32,
    ) -> Result<Option<ValueRef>> {
        let _ = (t, kind, operand);
        Ok(None)
    }

    /// Implicit register effect of the current instruction.
    fn implicit(&self, t: &mut Translator<'_>, reg: RegId) -> Result<()> {
        let _ = (t, reg);
        Ok(())
    }
}

/// Hooks that decline everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl TargetHooks for NoHooks {}

/// Turns a computed native address into a callable lifted-function pointer.
pub trait DynamicResolver: Send + Sync {
    fn resolve(&self, t: &mut Translator<'_>, target: ValueRef) -> Result<ValueRef>;
}

/// Default resolver: `bitcast(translate_at(inttoptr target))`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TranslateAtResolver;

impl DynamicResolver for TranslateAtResolver {
    fn resolve(&self, t: &mut Translator<'_>, target: ValueRef) -> Result<ValueRef> {
        let b = t.builder();
        let ptr = b.bit_or_pointer_cast(target, &Type::byte_ptr())?;
        let code = b.translate_at(ptr)?;
        Ok(b.bitcast(code, &Type::lifted_fn_ptr())?)
    }
}

/// Builds the register semantics for one function translation.
pub type RegisterSemaFactory = fn(Arc<RegisterSet>) -> Box<dyn RegisterSema>;

/// Everything the translator needs to know about one architecture.
///
/// Shared read-only by all translators for that architecture.
pub struct Target {
    name: String,
    table: Arc<SemanticsTable>,
    registers: Arc<RegisterSet>,
    hooks: Box<dyn TargetHooks>,
    resolver: Box<dyn DynamicResolver>,
    register_sema: RegisterSemaFactory,
}

impl Target {
    pub fn new(name: impl Into<String>, table: SemanticsTable, registers: RegisterSet) -> Self {
        Self {
            name: name.into(),
            table: Arc::new(table),
            registers: Arc::new(registers),
            hooks: Box::new(NoHooks),
            resolver: Box::new(TranslateAtResolver),
            register_sema: LocalRegisterSema::boxed,
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl TargetHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: impl DynamicResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    #[must_use]
    pub fn with_register_sema(mut self, factory: RegisterSemaFactory) -> Self {
        self.register_sema = factory;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &SemanticsTable {
        &self.table
    }

    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    pub fn hooks(&self) -> &dyn TargetHooks {
        self.hooks.as_ref()
    }

    pub fn resolver(&self) -> &dyn DynamicResolver {
        self.resolver.as_ref()
    }

    /// Fresh register semantics for one function.
    pub fn new_register_sema(&self) -> Box<dyn RegisterSema> {
        (self.register_sema)(Arc::clone(&self.registers))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("opcodes", &self.table.opcode_count())
            .field("registers", &self.registers.len())
            .finish_non_exhaustive()
    }
}
