use std::slice;

use slotmap::SlotMap;

use super::{BlockId, Inst, InstId, InstKind, Type, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Default, Clone)]
pub enum Terminator {
    #[default]
    Unreachable,
    Br(BlockId),
    CondBr(Value, [BlockId; 2]),

    /// `targets[0]` is the default destination; `targets[i + 1]` is taken when the value
    /// equals `cases[i]`.
    Switch {
        value: Value,
        cases: Vec<i128>,
        targets: Vec<BlockId>,
    },

    Ret(Option<Value>),
}

impl Terminator {
    pub fn successors(&self) -> &[BlockId] {
        match self {
            Self::Unreachable | Self::Ret(_) => &[],
            Self::Br(block_id) => slice::from_ref(block_id),
            Self::CondBr(_, successors) => successors,
            Self::Switch { targets, .. } => targets,
        }
    }

    pub fn operand(&self) -> Option<Value> {
        match *self {
            Self::Unreachable | Self::Br(_) | Self::Ret(None) => None,
            Self::CondBr(value, _) | Self::Switch { value, .. } | Self::Ret(Some(value)) => {
                Some(value)
            }
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Block {
    pub name: String,
    pub insts: Vec<InstId>,
    pub term: Terminator,
}

impl Block {
    pub fn successors(&self) -> &[BlockId] {
        self.term.successors()
    }
}

#[derive(Debug, Clone)]
pub struct FuncBody {
    pub blocks: SlotMap<BlockId, Block>,
    pub insts: SlotMap<InstId, Inst>,

    /// Layout order of the blocks; the first one is the entry.
    pub order: Vec<BlockId>,
}

impl FuncBody {
    pub fn new(entry_name: impl Into<String>) -> Self {
        let mut body = Self {
            blocks: Default::default(),
            insts: Default::default(),
            order: vec![],
        };
        body.add_block(entry_name);

        body
    }

    pub fn entry(&self) -> BlockId {
        self.order[0]
    }

    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let block_id = self.blocks.insert(Block {
            name: name.into(),
            ..Default::default()
        });
        self.order.push(block_id);

        block_id
    }

    pub fn push(
        &mut self,
        block_id: BlockId,
        name: Option<&str>,
        ty: Type,
        kind: InstKind,
    ) -> Value {
        let inst_id = self.insts.insert(Inst {
            name: name.map(str::to_owned),
            ty,
            kind,
            block: block_id,
        });
        self.blocks[block_id].insts.push(inst_id);

        Value::Inst(inst_id)
    }

    pub fn set_term(&mut self, block_id: BlockId, term: Terminator) {
        self.blocks[block_id].term = term;
    }

    /// Iterates over the phi-merges at the entry of the block.
    pub fn phis(&self, block_id: BlockId) -> impl Iterator<Item = (InstId, &Inst)> + '_ {
        self.blocks[block_id]
            .insts
            .iter()
            .map(|&inst_id| (inst_id, &self.insts[inst_id]))
            .take_while(|(_, inst)| inst.kind.is_phi())
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub var_arg: bool,
    pub body: Option<FuncBody>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<Param>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            var_arg: false,
            body: None,
        }
    }

    pub fn with_body(mut self, body: FuncBody) -> Self {
        self.body = Some(body);

        self
    }

    pub fn is_declaration(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_intrinsic(&self) -> bool {
        self.name.starts_with("llvm.")
    }

    pub fn body(&self) -> Option<&FuncBody> {
        self.body.as_ref()
    }
}
