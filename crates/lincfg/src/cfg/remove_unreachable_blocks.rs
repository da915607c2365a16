use log::trace;
use slotmap::SecondaryMap;

use super::{BlockId, Cfg};

impl Cfg {
    /// Drops every block not reachable from the entry. The exit block always survives so
    /// that the graph keeps its single exit.
    pub fn remove_unreachable_blocks(&mut self) {
        let mut stack = vec![self.entry];
        let mut reachable = SecondaryMap::<BlockId, ()>::new();
        reachable.insert(self.entry, ());

        while let Some(block_id) = stack.pop() {
            for &succ_block_id in self.blocks[block_id].successors() {
                if reachable.insert(succ_block_id, ()).is_none() {
                    stack.push(succ_block_id);
                }
            }
        }

        reachable.insert(self.exit, ());

        self.blocks.retain(|block_id, block| {
            let keep = reachable.contains_key(block_id);

            if !keep {
                trace!("removing unreachable block {}", block.label);
            }

            keep
        });
    }
}
