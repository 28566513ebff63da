//! Register set description.

use dclift_ir::Type;
use dclift_isa::RegId;

use crate::error::{RegsError, RegsResult};

/// How a write to a sub-register affects the rest of its parent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PartialWrite {
    /// Bits outside the sub-register are preserved.
    Merge,
    /// The parent is replaced by the zero-extended value.
    ZeroExtend,
}

/// A register that names a bit range of another register.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SubRegister {
    pub parent: RegId,
    /// Bit offset of the low bit in the parent.
    pub offset: u32,
    pub write: PartialWrite,
}

/// One architectural register.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RegisterDesc {
    pub name: String,
    /// Type seen by semantics (integer, float or vector).
    pub ty: Type,
    /// Set for sub-registers.
    pub alias: Option<SubRegister>,
}

impl RegisterDesc {
    /// Width in bits.
    pub fn bits(&self) -> u32 {
        self.ty.primitive_bits().unwrap_or(0)
    }
}

/// All registers of a target plus the aggregate layout.
///
/// Root registers become fields of the aggregate in declaration order,
/// each stored as an integer of its width.
#[derive(Clone, Debug)]
pub struct RegisterSet {
    regs: Vec<RegisterDesc>,
    fields: Vec<Option<u32>>,
    program_counter: RegId,
    regset_ty: Type,
}

impl RegisterSet {
    pub fn builder() -> RegisterSetBuilder {
        RegisterSetBuilder { regs: Vec::new() }
    }

    /// Validate and lay out `regs`.
    pub fn new(regs: Vec<RegisterDesc>, program_counter: RegId) -> RegsResult<Self> {
        let mut fields = Vec::with_capacity(regs.len());
        let mut layout = Vec::new();
        for desc in &regs {
            if desc.bits() == 0 {
                return Err(RegsError::BadAlias(desc.name.clone()));
            }
            match desc.alias {
                None => {
                    fields.push(Some(layout.len() as u32));
                    layout.push(Type::Int(desc.bits()));
                }
                Some(sub) => {
                    let parent = regs
                        .get(usize::from(sub.parent.0))
                        .filter(|p| p.alias.is_none())
                        .ok_or_else(|| RegsError::BadAlias(desc.name.clone()))?;
                    let fits = sub.offset + desc.bits() <= parent.bits();
                    let write_ok = sub.write == PartialWrite::Merge || sub.offset == 0;
                    if !fits || !write_ok {
                        return Err(RegsError::BadAlias(desc.name.clone()));
                    }
                    fields.push(None);
                }
            }
        }
        match regs.get(usize::from(program_counter.0)) {
            Some(pc) if pc.alias.is_none() && pc.ty.is_int() => {}
            _ => return Err(RegsError::BadProgramCounter),
        }
        Ok(Self {
            regs,
            fields,
            program_counter,
            regset_ty: Type::Struct(layout),
        })
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    pub fn desc(&self, reg: RegId) -> RegsResult<&RegisterDesc> {
        self.regs
            .get(usize::from(reg.0))
            .ok_or(RegsError::UnknownRegister(reg))
    }

    /// Register by name.
    pub fn find(&self, name: &str) -> RegsResult<RegId> {
        self.regs
            .iter()
            .position(|r| r.name == name)
            .map(|i| RegId(i as u16))
            .ok_or_else(|| RegsError::UnknownName(name.to_string()))
    }

    pub fn name(&self, reg: RegId) -> &str {
        self.desc(reg).map_or("?", |d| d.name.as_str())
    }

    /// Root register containing `reg`.
    pub fn root(&self, reg: RegId) -> RegsResult<RegId> {
        Ok(self.desc(reg)?.alias.map_or(reg, |sub| sub.parent))
    }

    /// Aggregate field index of a root register.
    pub fn field_index(&self, root: RegId) -> RegsResult<u32> {
        self.fields
            .get(usize::from(root.0))
            .copied()
            .flatten()
            .ok_or(RegsError::UnknownRegister(root))
    }

    /// Root registers in layout order.
    pub fn roots(&self) -> impl Iterator<Item = RegId> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| RegId(i as u16))
    }

    pub const fn program_counter(&self) -> RegId {
        self.program_counter
    }

    /// The register-file aggregate.
    pub const fn regset_type(&self) -> &Type {
        &self.regset_ty
    }

    /// Type semantics see for a register.
    pub fn reg_type(&self, reg: RegId) -> RegsResult<&Type> {
        Ok(&self.desc(reg)?.ty)
    }

    /// Integer type of the register's width.
    pub fn reg_int_type(&self, reg: RegId) -> RegsResult<Type> {
        Ok(Type::Int(self.desc(reg)?.bits()))
    }
}

/// Chained construction of a [`RegisterSet`].
#[derive(Debug, Default)]
pub struct RegisterSetBuilder {
    regs: Vec<RegisterDesc>,
}

impl RegisterSetBuilder {
    /// Add a root register.
    #[must_use]
    pub fn root(mut self, name: &str, ty: Type) -> Self {
        self.regs.push(RegisterDesc {
            name: name.to_string(),
            ty,
            alias: None,
        });
        self
    }

    /// Add a `bits`-wide sub-register of `parent` at `offset`.
    ///
    /// A `parent` not declared earlier is reported by [`build`](Self::build).
    #[must_use]
    pub fn sub(mut self, name: &str, bits: u32, parent: &str, offset: u32, write: PartialWrite) -> Self {
        let parent = self
            .regs
            .iter()
            .position(|r| r.name == parent)
            .map_or(RegId(u16::MAX), |i| RegId(i as u16));
        self.regs.push(RegisterDesc {
            name: name.to_string(),
            ty: Type::Int(bits),
            alias: Some(SubRegister {
                parent,
                offset,
                write,
            }),
        });
        self
    }

    pub fn build(self, program_counter: &str) -> RegsResult<RegisterSet> {
        let pc = self
            .regs
            .iter()
            .position(|r| r.name == program_counter)
            .map(|i| RegId(i as u16))
            .ok_or(RegsError::BadProgramCounter)?;
        RegisterSet::new(self.regs, pc)
    }
}
