//! Command implementations.

use dclift::ir::verify_module;
use dclift::{TranslateConfig, TranslationUnit, toy, translate_functions};
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands, EXIT_FAILURE, EXIT_SUCCESS};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::List => cmd_list(),
        Commands::Lift {
            sample,
            permissive,
            regset_diff,
            trace_slot,
            verify,
        } => {
            let mut config = TranslateConfig::new().with_register_diff(*regset_diff);
            if *permissive {
                config = config.permissive();
            }
            if let Some(slot) = trace_slot {
                config = config.with_instruction_trace(*slot);
            }
            cmd_lift(sample, &config, *verify)
        }
    }
}

fn cmd_list() -> i32 {
    for sample in toy::samples() {
        println!("{:<12} {}", sample.name, sample.description);
    }
    EXIT_SUCCESS
}

/// Handle the `lift` command.
fn cmd_lift(name: &str, config: &TranslateConfig, verify: bool) -> i32 {
    let Some(sample) = toy::sample(name) else {
        error!(sample = name, "unknown sample, see `dclift list`");
        return EXIT_FAILURE;
    };
    let target = match toy::target() {
        Ok(target) => target,
        Err(e) => {
            error!(error = %e, "failed to build target");
            return EXIT_FAILURE;
        }
    };

    info!(sample = name, functions = sample.functions.len(), "lifting");
    let unit = TranslationUnit::new(sample.name, target.registers().regset_type().clone());
    let report = match translate_functions(&unit, &target, config, &sample.functions) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "lifting failed");
            return EXIT_FAILURE;
        }
    };
    for failed in &report.failed {
        warn!(
            entry = format_args!("{:#x}", failed.entry),
            error = %failed.error,
            "left as declaration"
        );
    }

    let module = unit.into_module();
    if verify {
        if let Err(e) = verify_module(&module) {
            error!(error = %e, "verification failed");
            return EXIT_FAILURE;
        }
        info!("module verified");
    }
    print!("{module}");

    if report.is_complete() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}
