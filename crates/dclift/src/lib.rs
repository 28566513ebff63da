//! dclift - semantics-driven instruction lifter
//!
//! Translates decoded native machine code into IR functions by
//! interpreting a per-target semantics bytecode. Each lifted function takes
//! a pointer to the architectural register file and is named after its
//! native entry address.
//!
//! # Example
//!
//! ```ignore
//! use dclift::{TranslateConfig, TranslationUnit, toy, translate_functions};
//!
//! let target = toy::target()?;
//! let unit = TranslationUnit::new("demo", target.registers().regset_type().clone());
//! let sample = toy::sample("calls").unwrap();
//! let report = translate_functions(&unit, &target, &TranslateConfig::new(), &sample.functions)?;
//! println!("{}", unit.into_module());
//! ```

mod batch;
mod config;
mod error;
mod interp;
pub mod metrics;
mod target;
pub mod toy;
mod translator;
mod unit;

pub use batch::*;
pub use config::*;
pub use error::*;
pub use target::*;
pub use translator::*;
pub use unit::*;

pub use dclift_ir as ir;
pub use dclift_isa as isa;
pub use dclift_regs as regs;
