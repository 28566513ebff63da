//! Parallel translation of many functions into one unit.

use dclift_ir::FuncId;
use dclift_isa::DecodedFunction;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::TranslateConfig;
use crate::error::{Error, Result};
use crate::target::Target;
use crate::translator::translate_function;
use crate::unit::TranslationUnit;

/// A function whose translation was abandoned.
#[derive(Debug)]
pub struct FailedFunction {
    pub entry: u64,
    pub error: Error,
}

/// Outcome of [`translate_functions`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// `(entry, id)` of every committed function, in input order.
    pub translated: Vec<(u64, FuncId)>,
    /// Functions left as declarations.
    pub failed: Vec<FailedFunction>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Translate `functions` in parallel.
///
/// Recoverable failures (untranslatable instructions under the strict
/// policy) discard only the affected function. Any other error aborts the
/// batch and is returned.
pub fn translate_functions(
    unit: &TranslationUnit,
    target: &Target,
    config: &TranslateConfig,
    functions: &[DecodedFunction],
) -> Result<BatchReport> {
    let results: Vec<(u64, Result<FuncId>)> = functions
        .par_iter()
        .map(|func| (func.entry, translate_function(unit, target, config, func)))
        .collect();

    let mut report = BatchReport::default();
    for (entry, result) in results {
        match result {
            Ok(id) => report.translated.push((entry, id)),
            Err(error) if error.is_recoverable() => {
                warn!(entry = format_args!("{entry:#x}"), error = %error, "discarding function");
                report.failed.push(FailedFunction { entry, error });
            }
            Err(error) => return Err(error),
        }
    }
    info!(
        arch = target.name(),
        translated = report.translated.len(),
        failed = report.failed.len(),
        "batch done"
    );
    Ok(report)
}
