//! `toy`: a small 64-bit reference architecture.
//!
//! Sixteen 64-bit GPRs `x0..x15` with 32-bit views `w0..w15` (writes
//! zero-extend) and 16-bit views `h0..h15` (writes merge), a flags register,
//! `pc`, a link register `lr` and four double-precision registers
//! `d0..d3`. Every instruction is 4 bytes.
//!
//! The target exists to drive the translator end to end: its semantics
//! table and hooks touch every operation kind and hook point.

mod hooks;
mod samples;
mod sema;

pub use hooks::ToyHooks;
pub use samples::{Sample, sample, samples};
pub use sema::{MADD_OP, SCALED_INDEX, SHIFTED_IMM, WIDE_LITERAL, semantics};

use dclift_ir::{FloatKind, Type};
use dclift_isa::RegId;
use dclift_regs::{PartialWrite, RegisterSet};

use crate::error::Result;
use crate::target::Target;

/// Instruction size in bytes.
pub const INST_SIZE: u8 = 4;

pub const NUM_GPRS: u16 = 16;
pub const NUM_FPRS: u16 = 4;

pub const FLAGS: RegId = RegId(16);
pub const PC: RegId = RegId(17);
pub const LR: RegId = RegId(18);

const FPR_BASE: u16 = 19;
const W_BASE: u16 = FPR_BASE + NUM_FPRS;
const H_BASE: u16 = W_BASE + NUM_GPRS;

pub const fn x(n: u16) -> RegId {
    RegId(n)
}

pub const fn d(n: u16) -> RegId {
    RegId(FPR_BASE + n)
}

pub const fn w(n: u16) -> RegId {
    RegId(W_BASE + n)
}

pub const fn h(n: u16) -> RegId {
    RegId(H_BASE + n)
}

/// Native opcodes.
pub mod op {
    pub const NOP: u32 = 0;
    pub const MOVI: u32 = 1;
    pub const MOVW: u32 = 2;
    pub const ADD: u32 = 3;
    pub const SUB: u32 = 4;
    pub const MUL: u32 = 5;
    pub const UMULL: u32 = 6;
    pub const SHL: u32 = 7;
    pub const ROTL: u32 = 8;
    pub const ADDW: u32 = 9;
    pub const MOVH: u32 = 10;
    pub const LDR: u32 = 11;
    pub const STR: u32 = 12;
    pub const LDRB: u32 = 13;
    pub const LDRSH: u32 = 14;
    pub const B: u32 = 15;
    pub const BR: u32 = 16;
    pub const CALL: u32 = 17;
    pub const RET: u32 = 18;
    pub const BEQ: u32 = 19;
    pub const TRAP: u32 = 20;
    pub const FENCE: u32 = 21;
    pub const FSQRT: u32 = 22;
    pub const REV: u32 = 23;
    pub const UDF: u32 = 24;
    pub const MADD: u32 = 25;
    pub const LDRX: u32 = 26;
    pub const ADDS: u32 = 27;
    pub const HINT: u32 = 28;
    pub const SYS: u32 = 29;
    pub const MOVK: u32 = 30;
    pub const TAIL: u32 = 31;
}

/// The toy register file.
pub fn registers() -> Result<RegisterSet> {
    let mut builder = RegisterSet::builder();
    for n in 0..NUM_GPRS {
        builder = builder.root(&format!("x{n}"), Type::I64);
    }
    builder = builder
        .root("flags", Type::I64)
        .root("pc", Type::I64)
        .root("lr", Type::I64);
    for n in 0..NUM_FPRS {
        builder = builder.root(&format!("d{n}"), Type::Float(FloatKind::Double));
    }
    for n in 0..NUM_GPRS {
        builder = builder.sub(&format!("w{n}"), 32, &format!("x{n}"), 0, PartialWrite::ZeroExtend);
    }
    for n in 0..NUM_GPRS {
        builder = builder.sub(&format!("h{n}"), 16, &format!("x{n}"), 0, PartialWrite::Merge);
    }
    Ok(builder.build("pc")?)
}

/// The complete toy target.
pub fn target() -> Result<Target> {
    Ok(Target::new("toy", semantics()?, registers()?).with_hooks(ToyHooks))
}
