//! Module of lifted functions keyed by native address.

use rustc_hash::FxHashMap;

use crate::function::Function;
use crate::types::Type;
use crate::value::FuncId;

/// Collection of lifted functions.
///
/// Functions are created on first reference (a declaration without
/// blocks) and filled in when translated.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    regset_ty: Type,
    functions: Vec<Function>,
    by_address: FxHashMap<u64, FuncId>,
}

impl Module {
    pub fn new(name: impl Into<String>, regset_ty: Type) -> Self {
        Self {
            name: name.into(),
            regset_ty,
            functions: Vec::new(),
            by_address: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register-file aggregate shared by every function.
    pub const fn regset_type(&self) -> &Type {
        &self.regset_ty
    }

    /// Symbol given to the function lifted from `address`.
    pub fn function_name(address: u64) -> String {
        format!("fn_{address:x}")
    }

    /// Function for `address`, declaring it if unseen.
    pub fn get_or_declare(&mut self, address: u64) -> FuncId {
        if let Some(&id) = self.by_address.get(&address) {
            return id;
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(Function::new(
            Self::function_name(address),
            address,
            &self.regset_ty,
        ));
        self.by_address.insert(address, id);
        id
    }

    /// Function for `address` if it was ever referenced.
    pub fn lookup(&self, address: u64) -> Option<FuncId> {
        self.by_address.get(&address).copied()
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// Replace the body of a declared function.
    pub fn define(&mut self, id: FuncId, func: Function) {
        self.functions[id.0 as usize] = func;
    }

    /// All functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncId(i as u32), f))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
