//! Input model and semantics tables for the instruction lifter.
//!
//! This crate describes what the lifter consumes: decoded native
//! instructions grouped into blocks and functions, and the per-target
//! semantics program (opcode index, bytecode and literal pool) that says
//! what each native opcode does. It knows nothing about how IR is built.

mod decoded;
mod predicate;
mod sema;
mod table;
mod vt;

pub use decoded::*;
pub use predicate::*;
pub use sema::*;
pub use table::*;
pub use vt::*;
