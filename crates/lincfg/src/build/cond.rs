use crate::cfg::{Block, CstSystem, LinCst, LinExpr};
use crate::ssa::{BinOp, CmpPred, InstKind, Value};

use super::sym::SymEval;

/// Rewrites `>` and `>=` into `<` and `<=` by swapping the operands.
fn normalize(pred: CmpPred, lhs: Value, rhs: Value) -> (CmpPred, Value, Value) {
    match pred {
        CmpPred::Ugt => (CmpPred::Ult, rhs, lhs),
        CmpPred::Uge => (CmpPred::Ule, rhs, lhs),
        CmpPred::Sgt => (CmpPred::Slt, rhs, lhs),
        CmpPred::Sge => (CmpPred::Sle, rhs, lhs),
        _ => (pred, lhs, rhs),
    }
}

/// Adds `cst` to the block, or marks the block unreachable if it is trivially false.
pub(crate) fn assume_or_unreachable(bb: &mut Block, cst: LinCst) {
    match cst.to_bool() {
        Some(true) => {}
        Some(false) => bb.unreachable(),
        None => bb.assume(cst),
    }
}

impl SymEval<'_> {
    /// The constraints that hold when `lhs pred rhs` evaluates to `!negated`.
    /// Empty if either operand is not linearly expressible.
    pub fn cmp_constraints(
        &mut self,
        pred: CmpPred,
        lhs: Value,
        rhs: Value,
        negated: bool,
    ) -> CstSystem {
        let (pred, lhs, rhs) = normalize(pred, lhs, rhs);
        let mut csts = CstSystem::new();

        let (Some(op1), Some(op2)) = (self.lookup(lhs), self.lookup(rhs)) else {
            return csts;
        };

        if pred.is_unsigned() {
            for op in [&op1, &op2] {
                if op.is_var() {
                    csts.push(LinCst::ge(op.clone(), LinExpr::constant(0)));
                }
            }
        }

        csts.push(match (pred, negated) {
            (CmpPred::Eq, false) | (CmpPred::Ne, true) => LinCst::eq(op1, op2),
            (CmpPred::Eq, true) | (CmpPred::Ne, false) => LinCst::ne(op1, op2),
            (CmpPred::Slt | CmpPred::Ult, false) => LinCst::le(op1, op2 - 1),
            (CmpPred::Slt | CmpPred::Ult, true) => LinCst::ge(op1, op2),
            (CmpPred::Sle | CmpPred::Ule, false) => LinCst::le(op1, op2),
            (CmpPred::Sle | CmpPred::Ule, true) => LinCst::ge(op1, op2 + 1),
            (CmpPred::Ugt | CmpPred::Uge | CmpPred::Sgt | CmpPred::Sge, _) => {
                unreachable!("predicate {pred} survived normalization")
            }
        });

        csts
    }

    /// Constrains `bb` with `cond` evaluating to `!negated`.
    pub fn assume_condition(&mut self, bb: &mut Block, cond: Value, negated: bool) {
        if let Some(value) = cond.to_int() {
            if (value != 0) == negated {
                bb.unreachable();
            }

            return;
        }

        match self.inst(cond).map(|inst| &inst.kind) {
            Some(&InstKind::Cmp(pred, lhs, rhs)) => self.assume_cmp(bb, cond, pred, lhs, rhs, negated),
            Some(&InstKind::Binary(op, _, _)) => self.assume_logic(bb, cond, op, negated),
            _ => self.assume_bool(bb, cond, negated),
        }
    }

    fn assume_cmp(
        &mut self,
        bb: &mut Block,
        cond: Value,
        pred: CmpPred,
        lhs: Value,
        rhs: Value,
        negated: bool,
    ) {
        if self.no_ptr_arith() && !(self.is_int(lhs) && self.is_int(rhs)) {
            return;
        }

        for cst in self.cmp_constraints(pred, lhs, rhs, negated) {
            bb.assume(cst);
        }

        // one use is the branch itself; any other consumer reads the materialized boolean
        let use_count = cond
            .to_inst()
            .map_or(0, |inst_id| self.users(inst_id).len());

        if use_count >= 2 && self.is_tracked(cond) {
            let var = self.sym_var(cond);
            bb.assume(LinCst::eq(var.into(), LinExpr::constant((!negated).into())));
        }
    }

    /// Only `c1 && c2` taken and `c1 || c2` not taken are conjunctions; every other
    /// combination would need a disjunction and contributes nothing.
    fn assume_logic(&mut self, bb: &mut Block, cond: Value, op: BinOp, negated: bool) {
        match (op, negated) {
            (BinOp::And, false) | (BinOp::Or, true) => {}
            (BinOp::And | BinOp::Or, _) => return,

            _ => {
                if self.include_havoc() && self.is_tracked(cond) {
                    let var = self.sym_var(cond);
                    bb.havoc(var);
                }

                return;
            }
        }

        let Some((_, lhs, rhs)) = self.logic_operands(cond) else {
            return;
        };

        let (Some(c1), Some(c2)) = (self.int_cmp(lhs), self.int_cmp(rhs)) else {
            return;
        };

        for (pred, a, b) in [c1, c2] {
            for cst in self.cmp_constraints(pred, a, b, negated) {
                bb.assume(cst);
            }
        }
    }

    fn int_cmp(&self, value: Value) -> Option<(CmpPred, Value, Value)> {
        match self.inst(value).map(|inst| &inst.kind) {
            Some(&InstKind::Cmp(pred, lhs, rhs)) if self.is_int(value) => Some((pred, lhs, rhs)),
            _ => None,
        }
    }

    /// An opaque boolean: constrain its materialized variable to 1 (or 0).
    fn assume_bool(&mut self, bb: &mut Block, cond: Value, negated: bool) {
        if !self.is_tracked(cond) {
            return;
        }

        let var = self.sym_var(cond);
        bb.assume(LinCst::eq(var.into(), LinExpr::constant((!negated).into())));
    }
}
