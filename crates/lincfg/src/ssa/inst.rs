use strum::Display;

use super::{BlockId, FuncId, Type, Value};

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum CmpPred {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl CmpPred {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, Self::Ugt | Self::Uge | Self::Ult | Self::Ule)
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    FpTrunc,
    FpExt,
    PtrToInt,
    IntToPtr,
    BitCast,
}

impl CastOp {
    pub fn is_extension(&self) -> bool {
        matches!(self, Self::ZExt | Self::SExt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee {
    Direct(FuncId),
    Indirect(Value),
}

#[derive(Debug, Clone)]
pub enum InstKind {
    /// Incoming values keyed by predecessor block.
    Phi(Vec<(BlockId, Value)>),
    Binary(BinOp, Value, Value),
    Cmp(CmpPred, Value, Value),
    Cast(CastOp, Value),

    /// Address computation: `base` points to values of type `source_ty`; the first index
    /// steps over whole `source_ty` objects, the rest descend into aggregates.
    Gep {
        base: Value,
        source_ty: Type,
        indices: Vec<Value>,
    },

    Load(Value),
    Store {
        value: Value,
        ptr: Value,
    },
    Alloca(Type),
    Select {
        cond: Value,
        on_true: Value,
        on_false: Value,
    },
    Call {
        callee: Callee,
        args: Vec<Value>,
    },

    /// An instruction with no dedicated translation rule.
    Opaque(Vec<Value>),
}

impl InstKind {
    pub fn for_each_operand(&self, mut f: impl FnMut(Value)) {
        match self {
            Self::Phi(incoming) => incoming.iter().for_each(|&(_, value)| f(value)),
            Self::Binary(_, lhs, rhs) | Self::Cmp(_, lhs, rhs) => {
                f(*lhs);
                f(*rhs);
            }
            Self::Cast(_, value) | Self::Load(value) => f(*value),

            Self::Gep { base, indices, .. } => {
                f(*base);
                indices.iter().copied().for_each(f);
            }

            Self::Store { value, ptr } => {
                f(*value);
                f(*ptr);
            }

            Self::Alloca(_) => {}

            Self::Select {
                cond,
                on_true,
                on_false,
            } => {
                f(*cond);
                f(*on_true);
                f(*on_false);
            }

            Self::Call { callee, args } => {
                if let Callee::Indirect(value) = callee {
                    f(*value);
                }

                args.iter().copied().for_each(f);
            }

            Self::Opaque(operands) => operands.iter().copied().for_each(f),
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, Self::Phi(_))
    }
}

#[derive(Debug, Clone)]
pub struct Inst {
    pub name: Option<String>,
    pub ty: Type,
    pub kind: InstKind,
    pub block: BlockId,
}
