use slotmap::SecondaryMap;

use super::{BlockId, FuncBody, InstId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum User {
    Inst(InstId),
    Term(BlockId),
}

/// Use lists of instruction results, one entry per operand occurrence.
pub type Uses = SecondaryMap<InstId, Vec<User>>;

impl FuncBody {
    pub fn uses(&self) -> Uses {
        let mut uses = self
            .insts
            .keys()
            .map(|inst_id| (inst_id, vec![]))
            .collect::<Uses>();

        for &block_id in &self.order {
            let block = &self.blocks[block_id];

            for &inst_id in &block.insts {
                self.insts[inst_id].kind.for_each_operand(|value| {
                    if let Some(users) = value.to_inst().and_then(|def_id| uses.get_mut(def_id)) {
                        users.push(User::Inst(inst_id));
                    }
                });
            }

            if let Some(users) = block
                .term
                .operand()
                .and_then(|value| value.to_inst())
                .and_then(|def_id| uses.get_mut(def_id))
            {
                users.push(User::Term(block_id));
            }
        }

        uses
    }
}
