//! Translation configuration.

/// What to do with an instruction that cannot be translated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownInstructionPolicy {
    /// Abort the enclosing function.
    #[default]
    Strict,
    /// Replace the instruction with `trap; unreachable` and keep going.
    EmitTrap,
}

/// Host cell receiving the address of each instruction as it executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceSink {
    /// Address of a 64-bit cell in the host.
    pub slot: u64,
}

/// Translator configuration.
#[derive(Clone, Debug, Default)]
pub struct TranslateConfig {
    pub unknown_instruction_policy: UnknownInstructionPolicy,
    /// Snapshot the register file at entry and report differences at exit.
    pub register_diff: bool,
    /// Volatile store of every instruction address (off by default).
    pub instruction_trace: Option<TraceSink>,
}

impl TranslateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unknown-instruction policy.
    #[must_use]
    pub const fn with_unknown_instruction_policy(mut self, policy: UnknownInstructionPolicy) -> Self {
        self.unknown_instruction_policy = policy;
        self
    }

    /// Shorthand for [`UnknownInstructionPolicy::EmitTrap`].
    #[must_use]
    pub const fn permissive(self) -> Self {
        self.with_unknown_instruction_policy(UnknownInstructionPolicy::EmitTrap)
    }

    /// Set register-diff instrumentation.
    #[must_use]
    pub const fn with_register_diff(mut self, enabled: bool) -> Self {
        self.register_diff = enabled;
        self
    }

    /// Trace instruction addresses into the cell at `slot`.
    #[must_use]
    pub const fn with_instruction_trace(mut self, slot: u64) -> Self {
        self.instruction_trace = Some(TraceSink { slot });
        self
    }

    pub const fn is_permissive(&self) -> bool {
        matches!(
            self.unknown_instruction_policy,
            UnknownInstructionPolicy::EmitTrap
        )
    }
}
