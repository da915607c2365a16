//! The SSA-form input IR, as produced by the upstream loader.

pub mod func;
pub mod inst;
pub mod ty;
mod uses;

use slotmap::{new_key_type, SlotMap};

use crate::util::try_match;

pub use self::func::{Block, FuncBody, Function, Param, Terminator};
pub use self::inst::{BinOp, Callee, CastOp, CmpPred, Inst, InstKind};
pub use self::ty::{DataLayout, Type};
pub use self::uses::{User, Uses};

new_key_type! {
    pub struct FuncId;
    pub struct GlobalId;
    pub struct BlockId;
    pub struct InstId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntConst {
    pub bits: u32,
    pub value: i128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Inst(InstId),
    Arg(u32),
    Global(GlobalId),
    Func(FuncId),
    Int(IntConst),
    Null,

    /// An undefined value. Undefined integers keep their width.
    Undef(Option<u32>),
}

impl Value {
    pub fn int(bits: u32, value: i128) -> Self {
        Self::Int(IntConst { bits, value })
    }

    pub fn bool(value: bool) -> Self {
        Self::int(1, value.into())
    }

    pub fn undef_int(bits: u32) -> Self {
        Self::Undef(Some(bits))
    }

    pub fn to_inst(&self) -> Option<InstId> {
        try_match!(*self, Self::Inst(inst_id) => inst_id)
    }

    pub fn to_int(&self) -> Option<i128> {
        try_match!(*self, Self::Int(IntConst { value, .. }) => value)
    }

    /// Literal constants: they denote a value but have no definition site.
    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Null | Self::Undef(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initializer {
    /// An aggregate with every byte zero.
    Zero,
    Int(i128),
    /// A sequence of elements of type `elem`.
    Data { elem: Type, values: Vec<i128> },
    Alias(GlobalId),
    Other,
}

#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub init: Option<Initializer>,
}

#[derive(Debug, Default, Clone)]
pub struct Module {
    pub layout: DataLayout,
    pub funcs: SlotMap<FuncId, Function>,
    pub globals: SlotMap<GlobalId, Global>,
}

impl Module {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn add_func(&mut self, func: Function) -> FuncId {
        self.funcs.insert(func)
    }

    pub fn add_global(
        &mut self,
        name: impl Into<String>,
        ty: Type,
        init: Option<Initializer>,
    ) -> GlobalId {
        self.globals.insert(Global {
            name: name.into(),
            ty,
            init,
        })
    }

    /// The static type of `value` as seen from inside `func`.
    pub fn value_ty(&self, func: &Function, value: Value) -> Type {
        match value {
            Value::Inst(inst_id) => match func.body() {
                Some(body) => body.insts[inst_id].ty.clone(),
                None => Type::Opaque,
            },

            Value::Arg(idx) => func
                .params
                .get(idx as usize)
                .map(|param| param.ty.clone())
                .unwrap_or(Type::Opaque),

            Value::Global(_) | Value::Func(_) | Value::Null => Type::Ptr,
            Value::Int(c) => Type::Int(c.bits),
            Value::Undef(Some(bits)) => Type::Int(bits),
            Value::Undef(None) => Type::Opaque,
        }
    }
}
