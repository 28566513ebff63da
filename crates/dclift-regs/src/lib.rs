//! Register file model.
//!
//! Architectural registers live in one aggregate passed by pointer to every
//! lifted function. This crate describes that aggregate ([`RegisterSet`])
//! and provides the [`RegisterSema`] seam the lifter reads and writes
//! registers through, with [`LocalRegisterSema`] as the default.

mod error;
mod local;
mod regset;
mod sema;

pub use error::*;
pub use local::*;
pub use regset::*;
pub use sema::*;
