//! Structural checks on finished functions.

use crate::error::{IrError, IrResult};
use crate::function::Function;
use crate::module::Module;
use crate::op::{Callee, Op};
use crate::value::ValueKind;

/// Check block structure and operand references of a defined function.
///
/// Every block must be non-empty and end in exactly one terminator,
/// branches must target existing blocks, and operands must refer to
/// values whose defining operation is still placed.
pub fn verify_function(func: &Function) -> IrResult<()> {
    for block in func.blocks() {
        let name = || func.block_name(block).to_string();
        let insts = func.block_insts(block);
        let Some((&last, body)) = insts.split_last() else {
            return Err(IrError::EmptyBlock(name()));
        };
        if !func.inst(last).op.is_terminator() {
            return Err(IrError::MissingTerminator(name()));
        }
        if body.iter().any(|&id| func.inst(id).op.is_terminator()) {
            return Err(IrError::TerminatorNotLast(name()));
        }
        for &id in insts {
            let op = &func.inst(id).op;
            for target in op.successors() {
                if !func.contains_block(target) {
                    return Err(IrError::BadBranchTarget {
                        block: name(),
                        target: target.index(),
                    });
                }
            }
            for value in op.operands() {
                let placed = func.contains_value(value)
                    && match func.value(value).kind {
                        ValueKind::Inst(def) => func.inst(def).block.is_some(),
                        _ => true,
                    };
                if !placed {
                    return Err(IrError::BadOperand {
                        block: name(),
                        value: value.index(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Verify every defined function and check direct callees exist.
pub fn verify_module(module: &Module) -> IrResult<()> {
    for (_, func) in module.functions() {
        if func.is_empty() {
            continue;
        }
        verify_function(func)?;
        for block in func.blocks() {
            for op in func.block_ops(block) {
                if let Op::Call {
                    callee: Callee::Direct(id),
                    ..
                } = op
                {
                    if id.index() as usize >= module.len() {
                        return Err(IrError::InvalidOperand("direct callee"));
                    }
                }
            }
        }
    }
    Ok(())
}
