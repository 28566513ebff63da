//! CLI definitions and argument types.

use clap::{Parser, Subcommand};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "dclift")]
#[command(about = "Semantics-driven lifter - translates decoded machine code to IR")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in toy samples
    List,

    /// Lift a built-in toy sample and print the module
    Lift {
        /// Sample name (see `dclift list`)
        #[arg(value_name = "SAMPLE")]
        sample: String,

        /// Replace untranslatable instructions with traps instead of failing
        #[arg(long)]
        permissive: bool,

        /// Snapshot registers at entry and report differences at exit
        #[arg(long)]
        regset_diff: bool,

        /// Store each instruction address into this host cell (hex or decimal)
        #[arg(long, value_name = "ADDR", value_parser = parse_address)]
        trace_slot: Option<u64>,

        /// Run the IR verifier on the result
        #[arg(long)]
        verify: bool,
    },
}

/// Parse an address as `0x`-prefixed hex or decimal.
pub fn parse_address(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}
