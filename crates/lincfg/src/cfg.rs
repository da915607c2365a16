//! The analysis CFG: a flat control-flow graph of linear statements over symbolic
//! integer variables and array cells.

pub mod lin;
mod merge_blocks;
mod predecessors;
mod printer;
mod remove_unreachable_blocks;
mod rpo;

use hashbrown::HashMap;
use log::trace;
use slotmap::{new_key_type, SlotMap};
use strum::Display;

use crate::util::try_match;

pub use self::lin::{CstKind, CstSystem, LinCst, LinExpr, Number, Var};
pub use self::predecessors::Predecessors;
pub use self::rpo::Rpo;

new_key_type! {
    pub struct BlockId;
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    #[strum(serialize = "int")]
    Int,

    #[strum(serialize = "ptr")]
    Ptr,

    #[strum(serialize = "arr")]
    Arr,

    #[strum(serialize = "unk")]
    Unknown,
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    #[strum(serialize = "+")]
    Add,

    #[strum(serialize = "-")]
    Sub,

    #[strum(serialize = "*")]
    Mul,

    #[strum(serialize = "/")]
    SDiv,

    #[strum(serialize = "/_u")]
    UDiv,

    #[strum(serialize = "%")]
    SRem,

    #[strum(serialize = "%_u")]
    URem,
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    #[strum(serialize = "&")]
    And,

    #[strum(serialize = "|")]
    Or,

    #[strum(serialize = "^")]
    Xor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectCond {
    /// Guarded by a single linear constraint.
    Cst(LinCst),

    /// Guarded by a materialized boolean: non-zero selects the first operand.
    Var(Var),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub ret: Option<(Var, VarType)>,
    pub func: Var,
    pub args: Vec<(Var, VarType)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Assign(Var, LinExpr),
    Havoc(Var),
    Assume(LinCst),

    Arith {
        op: ArithOp,
        lhs: Var,
        args: [LinExpr; 2],
    },

    Bitwise {
        op: BitwiseOp,
        lhs: Var,
        args: [LinExpr; 2],
    },

    Select {
        lhs: Var,
        cond: SelectCond,
        on_true: LinExpr,
        on_false: LinExpr,
    },

    ArrayLoad {
        lhs: Var,
        array: Var,
        index: LinExpr,
        elem_size: u64,
    },

    ArrayStore {
        array: Var,
        index: LinExpr,
        value: LinExpr,
        elem_size: u64,
    },

    ArrayInit {
        array: Var,
        values: Vec<Number>,
    },

    /// Every element of the cell holds `value`.
    AssumeArray {
        array: Var,
        value: Number,
    },

    CallSite(CallSite),
    Ret(Var, VarType),
    Unreachable,
}

impl Stmt {
    pub fn to_assume(&self) -> Option<&LinCst> {
        try_match!(self, Self::Assume(cst) => cst)
    }

    pub fn to_call_site(&self) -> Option<&CallSite> {
        try_match!(self, Self::CallSite(call) => call)
    }

    /// The scalar variable this statement writes, if any.
    pub fn def(&self) -> Option<&Var> {
        match self {
            Self::Assign(lhs, _)
            | Self::Havoc(lhs)
            | Self::Arith { lhs, .. }
            | Self::Bitwise { lhs, .. }
            | Self::Select { lhs, .. }
            | Self::ArrayLoad { lhs, .. } => Some(lhs),
            Self::CallSite(call) => call.ret.as_ref().map(|(var, _)| var),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub label: String,
    pub stmts: Vec<Stmt>,
    pub succs: Vec<BlockId>,
}

impl Block {
    fn new(label: String) -> Self {
        Self {
            label,
            stmts: vec![],
            succs: vec![],
        }
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.succs
    }

    pub fn successors_mut(&mut self) -> &mut [BlockId] {
        &mut self.succs
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    /// Inserts statements before the existing ones, preserving their order.
    pub fn prepend(&mut self, stmts: impl IntoIterator<Item = Stmt>) {
        let tail = std::mem::take(&mut self.stmts);
        self.stmts.extend(stmts);
        self.stmts.extend(tail);
    }

    pub fn assign(&mut self, lhs: Var, rhs: LinExpr) {
        self.push(Stmt::Assign(lhs, rhs));
    }

    pub fn havoc(&mut self, var: Var) {
        self.push(Stmt::Havoc(var));
    }

    pub fn assume(&mut self, cst: LinCst) {
        self.push(Stmt::Assume(cst));
    }

    pub fn arith(&mut self, op: ArithOp, lhs: Var, a: LinExpr, b: LinExpr) {
        self.push(Stmt::Arith {
            op,
            lhs,
            args: [a, b],
        });
    }

    pub fn bitwise(&mut self, op: BitwiseOp, lhs: Var, a: LinExpr, b: LinExpr) {
        self.push(Stmt::Bitwise {
            op,
            lhs,
            args: [a, b],
        });
    }

    pub fn unreachable(&mut self) {
        self.push(Stmt::Unreachable);
    }

    pub fn is_unreachable(&self) -> bool {
        self.stmts.iter().any(|stmt| matches!(stmt, Stmt::Unreachable))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: Var,

    /// `None` for procedures returning nothing.
    pub ret: Option<VarType>,
    pub params: Vec<(Var, VarType)>,
}

#[derive(Debug, Clone)]
pub struct Cfg {
    pub blocks: SlotMap<BlockId, Block>,
    pub entry: BlockId,
    pub exit: BlockId,
    pub decl: Option<FuncDecl>,
    labels: HashMap<String, usize>,
}

impl Cfg {
    pub fn new(entry_label: impl Into<String>) -> Self {
        let mut cfg = Self {
            blocks: Default::default(),
            entry: Default::default(),
            exit: Default::default(),
            decl: None,
            labels: Default::default(),
        };
        cfg.entry = cfg.insert_block(entry_label);
        cfg.exit = cfg.entry;

        cfg
    }

    /// Creates an empty block. Clashing labels get a numeric suffix.
    pub fn insert_block(&mut self, label: impl Into<String>) -> BlockId {
        let base = label.into();
        let mut label = base.clone();

        if let Some(mut count) = self.labels.get(&base).copied() {
            // a suffixed label may itself have been requested earlier
            while self.labels.contains_key(&label) {
                count += 1;
                label = format!("{base}.{count}");
            }

            self.labels.insert(base, count);
        }

        self.labels.insert(label.clone(), 0);
        self.blocks.insert(Block::new(label))
    }

    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        let succs = &mut self.blocks[from].succs;

        if !succs.contains(&to) {
            succs.push(to);
        }
    }

    pub fn block_by_label(&self, label: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, block)| block.label == label)
            .map(|(block_id, _)| block_id)
    }

    /// Removes unreachable blocks and collapses straight-line chains.
    pub fn simplify(&mut self) {
        trace!("simplifying a cfg of {} blocks", self.blocks.len());
        self.remove_unreachable_blocks();
        self.merge_blocks();
        trace!("simplified down to {} blocks", self.blocks.len());
    }
}
