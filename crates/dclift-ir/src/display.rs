//! Textual form of functions and modules, modelled on LLVM assembly.

use std::fmt::{self, Display, Formatter, Write};

use crate::fold::sign_extend;
use crate::function::Function;
use crate::module::Module;
use crate::op::{Callee, Op};
use crate::types::{SyncScope, Type};
use crate::value::{BlockRef, FuncId, ValueKind, ValueRef};

/// Printer for a function, optionally resolving callee names via a module.
pub struct FunctionDisplay<'a> {
    func: &'a Function,
    module: Option<&'a Module>,
}

impl Function {
    /// Print without a module; direct callees are shown by index.
    pub const fn display(&self) -> FunctionDisplay<'_> {
        FunctionDisplay {
            func: self,
            module: None,
        }
    }

    /// Print with callee names taken from `module`.
    pub const fn display_in<'a>(&'a self, module: &'a Module) -> FunctionDisplay<'a> {
        FunctionDisplay {
            func: self,
            module: Some(module),
        }
    }
}

impl FunctionDisplay<'_> {
    fn func_name(&self, id: FuncId) -> String {
        match self.module {
            Some(module) if (id.index() as usize) < module.len() => {
                format!("@{}", module.function(id).name())
            }
            _ => format!("@func.{}", id.index()),
        }
    }

    fn value(&self, value: ValueRef) -> String {
        let data = self.func.value(value);
        match data.kind {
            ValueKind::Param(_) => "%regset".to_string(),
            ValueKind::ConstInt(c) => match data.ty.int_bits() {
                Some(1) => (if c == 0 { "false" } else { "true" }).to_string(),
                Some(bits) => sign_extend(c, bits).to_string(),
                None => c.to_string(),
            },
            ValueKind::Undef => "undef".to_string(),
            ValueKind::Func(id) => self.func_name(id),
            ValueKind::Inst(_) => format!("%{}", value.index()),
        }
    }

    fn typed(&self, value: ValueRef) -> String {
        format!("{} {}", self.func.value_type(value), self.value(value))
    }

    fn typed_list(&self, values: &[ValueRef]) -> String {
        values
            .iter()
            .map(|&v| self.typed(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn write_op(&self, out: &mut String, op: &Op, result: Option<ValueRef>) -> fmt::Result {
        let result_ty = result.map_or(Type::Void, |r| self.func.value_type(r).clone());
        if let Some(r) = result {
            write!(out, "%{} = ", r.index())?;
        }
        let block = |b: BlockRef| self.func.block_name(b).to_string();
        match op {
            Op::Binary { op, lhs, rhs } => {
                write!(out, "{} {}, {}", op.mnemonic(), self.typed(*lhs), self.value(*rhs))
            }
            Op::Cast { op, value } => {
                write!(out, "{} {} to {result_ty}", op.mnemonic(), self.typed(*value))
            }
            Op::ICmp { pred, lhs, rhs } => write!(
                out,
                "icmp {} {}, {}",
                pred.mnemonic(),
                self.typed(*lhs),
                self.value(*rhs)
            ),
            Op::Select {
                cond,
                then_value,
                else_value,
            } => write!(
                out,
                "select {}, {}, {}",
                self.typed(*cond),
                self.typed(*then_value),
                self.typed(*else_value)
            ),
            Op::Load {
                ptr,
                align,
                volatile,
            } => write!(
                out,
                "load {}{result_ty}, {}, align {align}",
                if *volatile { "volatile " } else { "" },
                self.typed(*ptr)
            ),
            Op::Store {
                value,
                ptr,
                align,
                volatile,
            } => write!(
                out,
                "store {}{}, {}, align {align}",
                if *volatile { "volatile " } else { "" },
                self.typed(*value),
                self.typed(*ptr)
            ),
            Op::Alloca => write!(out, "alloca {}", result_ty.pointee().unwrap_or(&Type::Void)),
            Op::FieldPtr { base, index } => write!(
                out,
                "getelementptr {}, {}, i32 0, i32 {index}",
                self.func.value_type(*base).pointee().unwrap_or(&Type::Void),
                self.typed(*base)
            ),
            Op::InsertElement {
                vector,
                element,
                index,
            } => write!(
                out,
                "insertelement {}, {}, {}",
                self.typed(*vector),
                self.typed(*element),
                self.typed(*index)
            ),
            Op::ExtractElement { vector, index } => write!(
                out,
                "extractelement {}, {}",
                self.typed(*vector),
                self.typed(*index)
            ),
            Op::Intrinsic { intrinsic, args } => write!(
                out,
                "call {result_ty} @{}({})",
                intrinsic.name(),
                self.typed_list(args)
            ),
            Op::Call { callee, args } => {
                let target = match callee {
                    Callee::Direct(id) => self.func_name(*id),
                    Callee::Indirect(v) => self.value(*v),
                    Callee::External(name) => format!("@{name}"),
                };
                write!(out, "call void {target}({})", self.typed_list(args))
            }
            Op::Fence { ordering, scope } => match scope {
                SyncScope::SingleThread => {
                    write!(out, "fence syncscope(\"singlethread\") {}", ordering.name())
                }
                SyncScope::CrossThread => write!(out, "fence {}", ordering.name()),
            },
            Op::Trap => write!(out, "call void @llvm.trap()"),
            Op::Br { target } => write!(out, "br label %{}", block(*target)),
            Op::CondBr {
                cond,
                then_block,
                else_block,
            } => write!(
                out,
                "br {}, label %{}, label %{}",
                self.typed(*cond),
                block(*then_block),
                block(*else_block)
            ),
            Op::Ret => write!(out, "ret void"),
            Op::Unreachable => write!(out, "unreachable"),
        }
    }
}

impl Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let mut attrs = String::new();
        if func.param_attrs.noalias {
            attrs.push_str(" noalias");
        }
        if func.param_attrs.nocapture {
            attrs.push_str(" nocapture");
        }
        let param = func.value_type(func.regset_arg());
        if func.is_empty() {
            return writeln!(f, "declare void @{}({param}{attrs})", func.name());
        }
        writeln!(
            f,
            "define void @{}({param}{attrs} %regset) {{ ; 0x{:x}",
            func.name(),
            func.address()
        )?;
        for (i, block) in func.blocks().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", func.block_name(block))?;
            for &id in func.block_insts(block) {
                let inst = func.inst(id);
                let mut line = String::new();
                self.write_op(&mut line, &inst.op, inst.result)?;
                writeln!(f, "  {line}")?;
            }
        }
        writeln!(f, "}}")
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.display().fmt(f)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name())?;
        writeln!(f, "%regset = type {}", self.regset_type())?;
        for (_, func) in self.functions() {
            writeln!(f)?;
            write!(f, "{}", func.display_in(self))?;
        }
        Ok(())
    }
}
