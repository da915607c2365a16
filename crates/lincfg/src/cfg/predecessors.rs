use slotmap::SecondaryMap;

use super::{BlockId, Cfg};

pub type Predecessors = SecondaryMap<BlockId, Vec<BlockId>>;

impl Cfg {
    /// Sorted, deduplicated predecessor lists. Every block has an entry.
    pub fn predecessors(&self) -> Predecessors {
        let mut preds = self
            .blocks
            .keys()
            .map(|block_id| (block_id, vec![]))
            .collect::<Predecessors>();

        for (block_id, block) in &self.blocks {
            for &succ_block_id in block.successors() {
                if let Some(succ_preds) = preds.get_mut(succ_block_id) {
                    succ_preds.push(block_id);
                }
            }
        }

        for preds in preds.values_mut() {
            preds.sort_unstable();
            preds.dedup();
        }

        preds
    }
}
