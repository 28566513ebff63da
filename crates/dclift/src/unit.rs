//! Module-level function registry shared by concurrent translators.

use dclift_ir::{FuncId, Function, Module, Type};
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Output module plus the address to function map.
///
/// Every access goes through one lock, so concurrent first references to an
/// address resolve to the same declaration.
#[derive(Debug)]
pub struct TranslationUnit {
    module: Mutex<Module>,
}

impl TranslationUnit {
    pub fn new(name: impl Into<String>, regset_ty: Type) -> Self {
        Self {
            module: Mutex::new(Module::new(name, regset_ty)),
        }
    }

    /// Function for `address`, forward-declaring it on first reference.
    pub fn get_or_create_function(&self, address: u64) -> FuncId {
        self.module.lock().get_or_declare(address)
    }

    pub fn lookup(&self, address: u64) -> Option<FuncId> {
        self.module.lock().lookup(address)
    }

    /// Whether the function has a body.
    pub fn is_translated(&self, id: FuncId) -> bool {
        !self.module.lock().function(id).is_empty()
    }

    pub fn regset_type(&self) -> Type {
        self.module.lock().regset_type().clone()
    }

    /// Install a translated body. A function is defined at most once.
    pub fn commit(&self, id: FuncId, func: Function) -> Result<()> {
        let mut module = self.module.lock();
        let current = module.function(id);
        if !current.is_empty() {
            return Err(Error::AlreadyTranslated {
                address: current.address(),
            });
        }
        module.define(id, func);
        Ok(())
    }

    /// Run `f` with the module locked.
    pub fn with_module<R>(&self, f: impl FnOnce(&Module) -> R) -> R {
        f(&self.module.lock())
    }

    pub fn into_module(self) -> Module {
        self.module.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use dclift_ir::FunctionBuilder;

    fn unit() -> TranslationUnit {
        TranslationUnit::new("test", Type::Struct(vec![Type::I64]))
    }

    fn body(unit: &TranslationUnit, address: u64) -> Function {
        let regset = unit.regset_type();
        let mut b = FunctionBuilder::new(Function::new(Module::function_name(address), address, &regset));
        let entry = b.create_block("entry");
        b.position_at_end(entry);
        b.ret().unwrap();
        b.finish()
    }

    #[test]
    fn test_concurrent_first_reference() {
        let unit = Arc::new(unit());
        let ids: Vec<FuncId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let unit = Arc::clone(&unit);
                    s.spawn(move || unit.get_or_create_function(0x4000))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(unit.with_module(Module::len), 1);
    }

    #[test]
    fn test_commit_once() {
        let unit = unit();
        let id = unit.get_or_create_function(0x1000);
        assert!(!unit.is_translated(id));
        unit.commit(id, body(&unit, 0x1000)).unwrap();
        assert!(unit.is_translated(id));
        assert!(matches!(
            unit.commit(id, body(&unit, 0x1000)),
            Err(Error::AlreadyTranslated { address: 0x1000 })
        ));
        assert_eq!(unit.lookup(0x1000), Some(id));
        assert_eq!(unit.into_module().len(), 1);
    }
}
