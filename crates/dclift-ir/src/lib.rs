//! Intermediate representation for the instruction lifter.
//!
//! This crate provides pure IR types with no architecture-specific knowledge:
//! a typed SSA function made of basic blocks, a module that owns lifted
//! functions by code address, and a builder that places operations.
//! Lifting native instructions into this IR is implemented in `dclift`.

mod builder;
mod display;
mod error;
mod fold;
mod function;
mod module;
mod op;
mod types;
mod value;
mod verify;

pub use builder::*;
pub use error::*;
pub use function::*;
pub use module::*;
pub use op::*;
pub use types::*;
pub use value::*;
pub use verify::*;
