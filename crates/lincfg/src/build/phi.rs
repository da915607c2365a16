use hashbrown::HashMap;
use log::trace;

use crate::cfg::{Block, LinExpr};
use crate::ssa::{BlockId, Inst, InstId, InstKind, Value};

use super::sym::SymEval;
use super::BuildError;

impl SymEval<'_> {
    /// Emits the phi-merges at the entry of `block_id` as assignments for the edge coming
    /// from `pred_id`. The merges are simultaneous: a phi reading another phi of the same
    /// block sees its value from before the edge.
    pub fn resolve_phis(
        &mut self,
        bb: &mut Block,
        block_id: BlockId,
        pred_id: BlockId,
    ) -> Result<(), BuildError> {
        let body = self.body;
        let phis = body
            .phis(block_id)
            .map(|(inst_id, inst)| Ok((inst_id, inst, self.incoming(inst_id, inst, pred_id)?)))
            .collect::<Result<Vec<(InstId, &Inst, Value)>, BuildError>>()?;

        if phis.is_empty() {
            return Ok(());
        }

        trace!(
            "resolving {} phis of {} along the edge from {}",
            phis.len(),
            body.blocks[block_id].name,
            body.blocks[pred_id].name,
        );

        let mut old_values = HashMap::<Value, LinExpr>::new();

        for &(_, inst, incoming) in &phis {
            if !self.is_tracked(incoming) || (self.no_ptr_arith() && !inst.ty.is_int()) {
                continue;
            }

            let same_block_phi = self
                .inst(incoming)
                .is_some_and(|def| def.kind.is_phi() && def.block == block_id);

            if !same_block_phi || old_values.contains_key(&incoming) {
                continue;
            }

            if let Some(expr) = self.lookup(incoming) {
                let old = self.fresh();
                bb.assign(old.clone(), expr);
                old_values.insert(incoming, old.into());
            }
        }

        for &(inst_id, inst, incoming) in &phis {
            if !self.is_tracked_inst(inst_id) || (self.no_ptr_arith() && !inst.ty.is_int()) {
                continue;
            }

            let lhs = self.sym_var(Value::Inst(inst_id));

            match old_values.get(&incoming).cloned().or_else(|| self.lookup(incoming)) {
                Some(rhs) => bb.assign(lhs, rhs),
                None => bb.havoc(lhs),
            }
        }

        Ok(())
    }

    fn incoming(&self, inst_id: InstId, inst: &Inst, pred_id: BlockId) -> Result<Value, BuildError> {
        let InstKind::Phi(incoming) = &inst.kind else {
            unreachable!("{inst_id:?} is not a phi");
        };

        incoming
            .iter()
            .find(|&&(block_id, _)| block_id == pred_id)
            .map(|&(_, value)| value)
            .ok_or_else(|| BuildError::MissingIncoming {
                func: self.func.name.clone(),
                phi: self.inst_label(inst_id),
                pred: self.body.blocks[pred_id].name.clone(),
            })
    }
}
