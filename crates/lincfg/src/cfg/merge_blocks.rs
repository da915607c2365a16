use std::collections::BTreeSet;

use log::trace;

use super::{BlockId, Cfg};

fn dedup_successors(succs: &mut Vec<BlockId>) {
    let mut seen = BTreeSet::new();
    succs.retain(|&block_id| seen.insert(block_id));
}

impl Cfg {
    /// Eliminates empty forwarding blocks and merges a block with its sole successor when
    /// it is that successor's only predecessor.
    pub fn merge_blocks(&mut self) {
        let mut preds = self.predecessors();
        let mut block_ids = self.blocks.keys().collect::<BTreeSet<_>>();

        while let Some(block_id) = block_ids.pop_first() {
            let &[target_block_id] = self.blocks[block_id].successors() else {
                continue;
            };

            if target_block_id == self.entry || block_id == target_block_id {
                continue;
            }

            if self.blocks[block_id].stmts.is_empty()
                && block_id != self.entry
                && block_id != self.exit
            {
                let Some([&mut ref block_preds, target_preds]) =
                    preds.get_disjoint_mut([block_id, target_block_id])
                else {
                    continue;
                };

                trace!(
                    "eliminating empty {} in favor of {}",
                    self.blocks[block_id].label,
                    self.blocks[target_block_id].label,
                );
                self.blocks.remove(block_id);

                // make predecessors pointing to block_id refer to target_block_id
                for &pred_block_id in block_preds {
                    let pred_block = &mut self.blocks[pred_block_id];

                    for pred_succ_block_id in pred_block.successors_mut() {
                        if *pred_succ_block_id == block_id {
                            *pred_succ_block_id = target_block_id;
                        }
                    }

                    dedup_successors(&mut pred_block.succs);
                }

                if let Ok(idx) = target_preds.binary_search(&block_id) {
                    target_preds.remove(idx);
                }

                // add block_id's predecessors to target_block_id's predecessor list
                for &pred_block_id in block_preds {
                    if let Err(idx) = target_preds.binary_search(&pred_block_id) {
                        target_preds.insert(idx, pred_block_id);
                    }
                }

                preds.remove(block_id);
            } else if preds[target_block_id].len() == 1 {
                let Some(target_block) = self.blocks.remove(target_block_id) else {
                    continue;
                };

                trace!(
                    "merging {} into {}",
                    target_block.label,
                    self.blocks[block_id].label,
                );
                block_ids.remove(&target_block_id);
                block_ids.insert(block_id);
                let block = &mut self.blocks[block_id];

                block.stmts.extend(target_block.stmts);
                block.succs = target_block.succs;

                preds.remove(target_block_id);

                for &succ_block_id in block.successors() {
                    let succ_preds = &mut preds[succ_block_id];

                    if let Ok(idx) = succ_preds.binary_search(&target_block_id) {
                        succ_preds.remove(idx);
                    }

                    if let Err(idx) = succ_preds.binary_search(&block_id) {
                        succ_preds.insert(idx, block_id);
                    }
                }

                if self.exit == target_block_id {
                    self.exit = block_id;
                }
            }
        }

        debug_assert!(self.blocks.contains_key(self.entry));
        debug_assert!(self.blocks.contains_key(self.exit));

        for block in self.blocks.values() {
            for &succ_block_id in block.successors() {
                debug_assert!(self.blocks.contains_key(succ_block_id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cfg::{Cfg, LinExpr, Stmt, Var};

    fn assign(id: u32, value: i128) -> Stmt {
        Stmt::Assign(Var::new(id, format!("v{id}")), LinExpr::constant(value))
    }

    #[test]
    fn test_chain_collapses_into_entry() {
        let mut cfg = Cfg::new("entry");
        let mid = cfg.insert_block("mid");
        let exit = cfg.insert_block("exit");
        cfg.exit = exit;

        cfg.blocks[cfg.entry].push(assign(0, 1));
        cfg.blocks[mid].push(assign(1, 2));
        cfg.blocks[exit].push(assign(2, 3));
        cfg.add_edge(cfg.entry, mid);
        cfg.add_edge(mid, exit);

        cfg.merge_blocks();

        assert_eq!(cfg.blocks.len(), 1);
        assert_eq!(cfg.entry, cfg.exit);
        assert_eq!(
            cfg.blocks[cfg.entry].stmts,
            [assign(0, 1), assign(1, 2), assign(2, 3)]
        );
    }

    #[test]
    fn test_empty_forwarders_are_bypassed() {
        // entry -> {a, b} -> join, with a and b empty
        let mut cfg = Cfg::new("entry");
        let a = cfg.insert_block("a");
        let b = cfg.insert_block("b");
        let join = cfg.insert_block("join");
        cfg.exit = join;

        cfg.add_edge(cfg.entry, a);
        cfg.add_edge(cfg.entry, b);
        cfg.add_edge(a, join);
        cfg.add_edge(b, join);
        cfg.blocks[join].push(assign(0, 0));

        cfg.merge_blocks();

        assert!(!cfg.blocks.contains_key(a));
        assert!(!cfg.blocks.contains_key(b));
        assert_eq!(cfg.blocks[cfg.entry].succs, [join]);
        assert_eq!(cfg.predecessors()[join], [cfg.entry]);
    }

    #[test]
    fn test_empty_entry_before_loop_is_kept() {
        // entry -> head <-> head, head -> exit, with entry empty
        let mut cfg = Cfg::new("entry");
        let entry = cfg.entry;
        let head = cfg.insert_block("head");
        let exit = cfg.insert_block("exit");
        cfg.exit = exit;

        cfg.blocks[head].push(assign(0, 0));
        cfg.blocks[exit].push(assign(1, 0));

        cfg.add_edge(entry, head);
        cfg.add_edge(head, head);
        cfg.add_edge(head, exit);

        cfg.merge_blocks();

        assert_eq!(cfg.entry, entry);
        assert_eq!(cfg.blocks[cfg.entry].label, "entry");
        assert_eq!(cfg.blocks[cfg.entry].succs, [head]);
        assert!(cfg.predecessors()[cfg.entry].is_empty());
    }

    #[test]
    fn test_loop_header_is_kept() {
        // entry -> head <-> body, head -> exit
        let mut cfg = Cfg::new("entry");
        let head = cfg.insert_block("head");
        let body = cfg.insert_block("body");
        let exit = cfg.insert_block("exit");
        cfg.exit = exit;

        cfg.blocks[cfg.entry].push(assign(0, 0));
        cfg.blocks[head].push(assign(1, 0));
        cfg.blocks[body].push(assign(2, 0));
        cfg.blocks[exit].push(assign(3, 0));

        cfg.add_edge(cfg.entry, head);
        cfg.add_edge(head, body);
        cfg.add_edge(head, exit);
        cfg.add_edge(body, head);

        cfg.merge_blocks();

        assert!(cfg.blocks.contains_key(head));
        assert!(cfg.blocks.contains_key(body));
        assert!(cfg.blocks.contains_key(exit));
        assert_eq!(cfg.blocks.len(), 4);
    }
}
