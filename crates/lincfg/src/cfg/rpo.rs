use slotmap::SecondaryMap;

use super::{BlockId, Cfg};

#[derive(Debug, Default, Clone)]
pub struct Rpo {
    pub order: Vec<BlockId>,
    pub idx: SecondaryMap<BlockId, usize>,
}

impl Rpo {
    pub fn contains(&self, block_id: BlockId) -> bool {
        self.idx.contains_key(block_id)
    }
}

enum Visit {
    Enter(BlockId),
    Finish(BlockId),
}

impl Cfg {
    /// Reverse postorder of the blocks reachable from the entry. Successors are explored in
    /// edge order, so the first successor of a block comes first among its children.
    pub fn rpo(&self) -> Rpo {
        let mut postorder = vec![];
        let mut visited = SecondaryMap::<BlockId, ()>::new();
        let mut worklist = vec![Visit::Enter(self.entry)];

        while let Some(visit) = worklist.pop() {
            match visit {
                Visit::Enter(block_id) => {
                    if visited.insert(block_id, ()).is_some() {
                        continue;
                    }

                    worklist.push(Visit::Finish(block_id));
                    worklist.extend(
                        self.blocks[block_id]
                            .successors()
                            .iter()
                            .rev()
                            .filter(|&&succ_block_id| !visited.contains_key(succ_block_id))
                            .map(|&succ_block_id| Visit::Enter(succ_block_id)),
                    );
                }

                Visit::Finish(block_id) => postorder.push(block_id),
            }
        }

        let order = postorder.into_iter().rev().collect::<Vec<_>>();
        let idx = order
            .iter()
            .enumerate()
            .map(|(idx, &block_id)| (block_id, idx))
            .collect();

        Rpo { order, idx }
    }

    /// Blocks the entry cannot reach, in arena order.
    pub fn unreached<'a>(&'a self, rpo: &'a Rpo) -> impl Iterator<Item = BlockId> + 'a {
        self.blocks
            .keys()
            .filter(move |&block_id| !rpo.contains(block_id))
    }
}
