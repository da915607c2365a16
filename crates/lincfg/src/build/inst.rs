use log::warn;

use crate::cfg::{
    ArithOp, BitwiseOp, Block, CallSite, LinCst, LinExpr, Number, SelectCond, Stmt, Var, VarType,
};
use crate::mem::CellId;
use crate::ssa::{BinOp, BlockId, Callee, InstId, InstKind, Terminator, Type, Value};

use super::sym::{narrow, SymEval};
use super::BuildError;

const HEAP_ALLOCATORS: &[&str] = &["calloc", "malloc", "valloc", "palloc"];

/// One step of an address computation.
enum GepStep {
    /// A byte offset known up front: a field, or a constant index already scaled.
    Offset(Number),

    /// An index scaled by the element size.
    Scaled(Value, u64),
}

impl GepStep {
    /// Folds constant indices into an offset unless the product is not expressible.
    fn scaled(index: Value, size: u64) -> Self {
        index
            .to_int()
            .and_then(narrow)
            .and_then(|value| value.checked_mul(size.into()))
            .map_or(Self::Scaled(index, size), Self::Offset)
    }
}

/// Translates the non-phi instructions of one source block into a CFG block.
pub(crate) struct Translator<'s, 'a> {
    sym: &'s mut SymEval<'a>,
    bb: &'s mut Block,
}

impl<'s, 'a> Translator<'s, 'a> {
    pub fn new(sym: &'s mut SymEval<'a>, bb: &'s mut Block) -> Self {
        Self { sym, bb }
    }

    pub fn translate_block(mut self, block_id: BlockId) -> Result<(), BuildError> {
        let body = self.sym.body;
        let block = &body.blocks[block_id];

        for &inst_id in &block.insts {
            self.translate_inst(inst_id)?;
        }

        if let Terminator::Ret(Some(value)) = block.term {
            self.translate_ret(value);
        }

        Ok(())
    }

    fn havoc(&mut self, var: Var) {
        if self.sym.include_havoc() {
            self.bb.havoc(var);
        }
    }

    fn havoc_inst(&mut self, inst_id: InstId) {
        if self.sym.is_tracked_inst(inst_id) {
            let var = self.sym.sym_var(Value::Inst(inst_id));
            self.havoc(var);
        }
    }

    fn cell(&self, ptr: Value) -> Option<CellId> {
        self.sym.mem.array_id(self.sym.func_id, ptr)
    }

    fn alloc_size(&self, ty: &Type) -> u64 {
        self.sym.module.layout.alloc_size(ty)
    }

    /// The scalar variable of the object a singleton cell stands for.
    fn singleton_var(&mut self, cell: CellId) -> Option<Var> {
        let object = self
            .sym
            .mem
            .singleton(cell)
            .filter(|&object| !object.is_constant() && self.sym.is_tracked(object))?;

        Some(self.sym.sym_var(object))
    }

    fn translate_inst(&mut self, inst_id: InstId) -> Result<(), BuildError> {
        let body = self.sym.body;
        let inst = &body.insts[inst_id];

        match inst.kind {
            // phis are resolved on the incoming edges, comparisons where they are consumed
            InstKind::Phi(_) | InstKind::Cmp(..) => {}

            InstKind::Binary(op, lhs, rhs) => self.translate_binary(inst_id, op, lhs, rhs),

            InstKind::Cast(op, value) => {
                if !op.is_extension() || !self.sym.all_uses_are_geps(inst_id) {
                    self.translate_cast(inst_id, value);
                }
            }

            InstKind::Gep {
                base,
                ref source_ty,
                ref indices,
            } => self.translate_gep(inst_id, base, source_ty, indices)?,

            InstKind::Load(ptr) => self.translate_load(inst_id, ptr),
            InstKind::Store { value, ptr } => self.translate_store(value, ptr),
            InstKind::Alloca(_) => self.translate_alloca(inst_id),

            InstKind::Select {
                cond,
                on_true,
                on_false,
            } => self.translate_select(inst_id, cond, on_true, on_false),

            InstKind::Call { callee, ref args } => self.translate_call(inst_id, callee, args),
            InstKind::Opaque(_) => self.havoc_inst(inst_id),
        }

        Ok(())
    }

    fn translate_binary(&mut self, inst_id: InstId, op: BinOp, lhs: Value, rhs: Value) {
        if !self.sym.is_tracked_inst(inst_id) {
            return;
        }

        let dst = self.sym.sym_var(Value::Inst(inst_id));

        let arith_op = match op {
            BinOp::Add => ArithOp::Add,
            BinOp::Sub => ArithOp::Sub,
            BinOp::Mul => ArithOp::Mul,
            BinOp::SDiv | BinOp::AShr => ArithOp::SDiv,
            BinOp::UDiv => ArithOp::UDiv,
            BinOp::SRem => ArithOp::SRem,
            BinOp::URem => ArithOp::URem,
            BinOp::Shl => ArithOp::Mul,

            BinOp::And => return self.translate_bitwise(dst, BitwiseOp::And, lhs, rhs),
            BinOp::Or => return self.translate_bitwise(dst, BitwiseOp::Or, lhs, rhs),
            BinOp::Xor => return self.translate_bitwise(dst, BitwiseOp::Xor, lhs, rhs),

            BinOp::LShr | BinOp::FAdd | BinOp::FSub | BinOp::FMul | BinOp::FDiv | BinOp::FRem => {
                return self.havoc(dst)
            }
        };

        let (Some(a), Some(b)) = (self.sym.lookup(lhs), self.sym.lookup(rhs)) else {
            return self.havoc(dst);
        };

        match op {
            BinOp::Shl | BinOp::AShr => match b.to_constant() {
                Some(shift @ 0..=126) => {
                    let factor: Number = 1 << shift;
                    self.bb.arith(arith_op, dst, a, LinExpr::constant(factor));
                }

                Some(shift) => {
                    warn!("ignored {op} by an out-of-range amount {shift}");
                    self.havoc(dst);
                }

                None => self.havoc(dst),
            },

            BinOp::UDiv | BinOp::URem if a.is_constant() && b.is_constant() => {
                warn!("ignored {op} with both operands constant");
                self.havoc(dst);
            }

            // the first operand of a non-commutative operation must be a variable
            BinOp::Sub | BinOp::SDiv | BinOp::UDiv | BinOp::SRem | BinOp::URem
                if a.is_constant() =>
            {
                self.bb.assign(dst.clone(), a);
                self.bb.arith(arith_op, dst.clone(), dst.into(), b);
            }

            _ => self.bb.arith(arith_op, dst, a, b),
        }
    }

    fn translate_bitwise(&mut self, dst: Var, op: BitwiseOp, lhs: Value, rhs: Value) {
        match (self.sym.lookup(lhs), self.sym.lookup(rhs)) {
            (Some(a), Some(b)) => self.bb.bitwise(op, dst, a, b),
            _ => self.havoc(dst),
        }
    }

    fn translate_cast(&mut self, inst_id: InstId, value: Value) {
        let body = self.sym.body;
        let inst = &body.insts[inst_id];

        if !self.sym.is_tracked_inst(inst_id)
            || (self.sym.no_ptr_arith() && !inst.ty.is_int())
            || self.sym.all_uses_are_non_tracked_mem(inst_id)
        {
            return;
        }

        let dst = self.sym.sym_var(Value::Inst(inst_id));

        match self.sym.lookup(value) {
            Some(src) => self.bb.assign(dst, src),

            None if self.sym.ty(value).is_bool() => {
                self.bb.assume(LinCst::ge(dst.clone().into(), LinExpr::constant(0)));
                self.bb.assume(LinCst::le(dst.into(), LinExpr::constant(1)));
            }

            None => self.havoc(dst),
        }
    }

    fn gep_steps(
        &self,
        inst_id: InstId,
        source_ty: &Type,
        indices: &[Value],
    ) -> Result<Vec<GepStep>, BuildError> {
        let mut steps = Vec::with_capacity(indices.len());
        let mut ty = source_ty;

        for (pos, &index) in indices.iter().enumerate() {
            let index = self.sym.strip_ext(index);

            if pos == 0 {
                steps.push(GepStep::scaled(index, self.alloc_size(ty)));
                continue;
            }

            match ty {
                Type::Struct(fields) => {
                    let field = index
                        .to_int()
                        .and_then(|field| usize::try_from(field).ok())
                        .filter(|&field| field < fields.len())
                        .ok_or_else(|| BuildError::NonConstStructIndex {
                            func: self.sym.func.name.clone(),
                            inst: self.sym.inst_label(inst_id),
                        })?;

                    steps.push(GepStep::Offset(
                        self.sym.module.layout.field_offset(fields, field).into(),
                    ));
                    ty = &fields[field];
                }

                Type::Array(elem, _) => {
                    steps.push(GepStep::scaled(index, self.alloc_size(elem)));
                    ty = elem.as_ref();
                }

                _ => {
                    return Err(BuildError::NonAggregateIndex {
                        func: self.sym.func.name.clone(),
                        inst: self.sym.inst_label(inst_id),
                        ty: ty.to_string(),
                    })
                }
            }
        }

        Ok(steps)
    }

    fn translate_gep(
        &mut self,
        inst_id: InstId,
        base: Value,
        source_ty: &Type,
        indices: &[Value],
    ) -> Result<(), BuildError> {
        if !self.sym.is_tracked_inst(inst_id) {
            return Ok(());
        }

        let res = self.sym.sym_var(Value::Inst(inst_id));

        if self.sym.no_ptr_arith() || self.sym.all_uses_are_non_tracked_mem(inst_id) {
            self.havoc(res);

            return Ok(());
        }

        let Some(ptr) = self.sym.lookup(base) else {
            self.havoc(res);

            return Ok(());
        };

        let steps = self.gep_steps(inst_id, source_ty, indices)?;

        let Some(offset) = steps.iter().try_fold(0, |acc: Number, step| match *step {
            GepStep::Offset(offset) => acc.checked_add(offset),
            GepStep::Scaled(..) => Some(acc),
        }) else {
            self.havoc(res);

            return Ok(());
        };

        if steps.iter().all(|step| matches!(step, GepStep::Offset(_))) {
            self.bb
                .arith(ArithOp::Add, res, ptr, LinExpr::constant(offset));

            return Ok(());
        }

        self.bb.assign(res.clone(), ptr);

        for step in steps {
            let GepStep::Scaled(index, size) = step else {
                continue;
            };

            let Some(index) = self.sym.lookup(index) else {
                self.havoc(res);

                return Ok(());
            };

            let scaled = self.sym.fresh();
            self.bb.arith(
                ArithOp::Mul,
                scaled.clone(),
                index,
                LinExpr::constant(size.into()),
            );
            self.bb
                .arith(ArithOp::Add, res.clone(), res.clone().into(), scaled.into());
        }

        if offset != 0 {
            self.bb.arith(
                ArithOp::Add,
                res.clone(),
                res.into(),
                LinExpr::constant(offset),
            );
        }

        Ok(())
    }

    fn translate_load(&mut self, inst_id: InstId, ptr: Value) {
        let body = self.sym.body;
        let ty = &body.insts[inst_id].ty;

        if ty.is_int() && self.sym.tracks_arrays() {
            if let Some((cell, index)) = self.cell(ptr).zip(self.sym.lookup(ptr)) {
                let dst = self.sym.sym_var(Value::Inst(inst_id));

                match self.singleton_var(cell) {
                    Some(object) => self.bb.assign(dst, object.into()),

                    None => {
                        let elem_size = self.alloc_size(ty);
                        let array = self.sym.cell_var(cell);

                        self.bb.push(Stmt::ArrayLoad {
                            lhs: dst,
                            array,
                            index,
                            elem_size,
                        });
                    }
                }

                return;
            }
        }

        self.havoc_inst(inst_id);
    }

    fn translate_store(&mut self, value: Value, ptr: Value) {
        let ty = self.sym.ty(value);

        if !ty.is_int() || !self.sym.tracks_arrays() {
            return;
        }

        let Some(cell) = self.cell(ptr) else {
            return;
        };

        let (Some(index), Some(value)) = (self.sym.lookup(ptr), self.sym.lookup(value)) else {
            return;
        };

        match self.singleton_var(cell) {
            Some(object) => self.bb.assign(object, value),

            None => {
                let elem_size = self.alloc_size(&ty);
                let array = self.sym.cell_var(cell);

                self.bb.push(Stmt::ArrayStore {
                    array,
                    index,
                    value,
                    elem_size,
                });
            }
        }
    }

    /// Stack cells start out zeroed.
    fn translate_alloca(&mut self, inst_id: InstId) {
        if !self.sym.tracks_arrays() {
            return;
        }

        if let Some(cell) = self.cell(Value::Inst(inst_id)) {
            self.assume_array(cell, 0);
        }
    }

    fn assume_array(&mut self, cell: CellId, value: Number) {
        let array = self.sym.cell_var(cell);
        self.bb.push(Stmt::AssumeArray { array, value });
    }

    fn translate_select(&mut self, inst_id: InstId, cond: Value, on_true: Value, on_false: Value) {
        if !self.sym.is_tracked_inst(inst_id)
            || (self.sym.no_ptr_arith() && !(self.sym.is_int(on_true) && self.sym.is_int(on_false)))
        {
            return;
        }

        let dst = self.sym.sym_var(Value::Inst(inst_id));

        let (Some(on_true), Some(on_false)) = (self.sym.lookup(on_true), self.sym.lookup(on_false))
        else {
            return self.havoc(dst);
        };

        if let Some(value) = cond.to_int() {
            let src = if value != 0 { on_true } else { on_false };
            return self.bb.assign(dst, src);
        }

        let cmp = match self.sym.inst(cond).map(|inst| &inst.kind) {
            Some(&InstKind::Cmp(pred, lhs, rhs)) => Some((pred, lhs, rhs)),
            _ => None,
        };

        if let Some((pred, lhs, rhs)) = cmp {
            let csts = self.sym.cmp_constraints(pred, lhs, rhs, false);

            // a single constraint is negated exactly; a conjunction would not be
            if csts.len() == 1 {
                if let Some(cst) = csts.into_iter().next() {
                    return self.push_select(dst, SelectCond::Cst(cst), on_true, on_false);
                }
            }
        }

        if self.sym.is_tracked(cond) {
            let var = self.sym.sym_var(cond);
            self.push_select(dst, SelectCond::Var(var), on_true, on_false);
        } else {
            self.havoc(dst);
        }
    }

    fn push_select(&mut self, lhs: Var, cond: SelectCond, on_true: LinExpr, on_false: LinExpr) {
        self.bb.push(Stmt::Select {
            lhs,
            cond,
            on_true,
            on_false,
        });
    }

    fn translate_ret(&mut self, value: Value) {
        if !self.sym.inter_proc() || self.sym.is_entry_func() || !self.sym.is_tracked(value) {
            return;
        }

        if self.sym.no_ptr_arith() && !self.sym.is_int(value) {
            return;
        }

        let (var, ty) = self.normalize_param(value);
        self.bb.push(Stmt::Ret(var, ty));
    }

    /// Constants are materialized into fresh temporaries so that parameter lists hold
    /// only variables.
    fn normalize_param(&mut self, value: Value) -> (Var, VarType) {
        if !value.is_constant() {
            let ty = self.sym.ty(value);

            return (self.sym.sym_var(value), self.sym.var_type(&ty));
        }

        let tmp = self.sym.fresh();

        match value.to_int().and_then(|_| self.sym.lookup(value)) {
            Some(expr) => {
                self.bb.assign(tmp.clone(), expr);

                (tmp, VarType::Int)
            }

            None => {
                self.bb.havoc(tmp.clone());

                (tmp, VarType::Unknown)
            }
        }
    }

    fn translate_call(&mut self, inst_id: InstId, callee: Callee, args: &[Value]) {
        let Callee::Direct(callee_id) = callee else {
            return self.havoc_inst(inst_id);
        };

        let Some(callee) = self.sym.callee(callee_id) else {
            return self.havoc_inst(inst_id);
        };

        let name = callee.name.as_str();

        if name.starts_with("shadow.mem") || name == "seahorn.fn.enter" {
            return;
        }

        if callee.is_declaration() && self.sym.is_entry_func() && HEAP_ALLOCATORS.contains(&name) {
            // heap cells start out zeroed as well
            if let Some(cell) = self.cell(Value::Inst(inst_id)) {
                self.assume_array(cell, 0);
            }

            return;
        }

        if callee.is_intrinsic() {
            return self.translate_intrinsic(name, args);
        }

        if name == "verifier.assume" || name == "verifier.assume.not" {
            if let Some(&cond) = args.first() {
                let cond = self.sym.strip_zext(cond);
                self.sym
                    .assume_condition(self.bb, cond, name == "verifier.assume.not");
            }

            return;
        }

        if !self.sym.inter_proc() || callee.var_arg {
            if self.sym.inter_proc() {
                warn!("call to the variadic function {name} is not modeled");
            }

            self.havoc_inst(inst_id);

            if self.sym.tracks_arrays() {
                let effects = self.sym.mem.call_ref_mod_new(self.sym.func_id, inst_id);

                for cell in effects.modified {
                    let array = self.sym.cell_var(cell);
                    self.bb.havoc(array);
                }
            }

            return;
        }

        let mut actuals = vec![];

        for &arg in args {
            if !self.sym.is_tracked(arg) || (self.sym.no_ptr_arith() && !self.sym.is_int(arg)) {
                continue;
            }

            actuals.push(self.normalize_param(arg));
        }

        if self.sym.tracks_arrays() {
            let effects = self.sym.mem.call_ref_mod_new(self.sym.func_id, inst_id);
            let cells = effects.read_or_modified();

            // the callee receives a copy of each cell and may rewrite the original
            for &cell in &cells {
                let array = self.sym.cell_var(cell);
                let array_in = self.sym.fresh();
                self.bb.assign(array_in.clone(), array.clone().into());
                self.bb.havoc(array);
                actuals.push((array_in, VarType::Arr));
            }

            for &cell in cells.iter().chain(&effects.new) {
                actuals.push((self.sym.cell_var(cell), VarType::Arr));
            }
        }

        let ret_ty = self.sym.body.insts[inst_id].ty.clone();
        let ret_var_ty = self.sym.var_type(&ret_ty);

        let ret = (ret_var_ty != VarType::Unknown
            && self.sym.is_tracked_inst(inst_id)
            && (!self.sym.no_ptr_arith() || ret_ty.is_int()))
        .then(|| (self.sym.sym_var(Value::Inst(inst_id)), ret_var_ty));

        let func = self.sym.func_var(callee_id);

        self.bb.push(Stmt::CallSite(CallSite {
            ret,
            func,
            args: actuals,
        }));
    }

    fn translate_intrinsic(&mut self, name: &str, args: &[Value]) {
        if name.starts_with("llvm.memset") {
            let (Some(&ptr), Some(&value)) = (args.first(), args.get(1)) else {
                return;
            };

            let Some(cell) = self.cell(ptr) else {
                return;
            };

            if let Some(value) = self.sym.lookup(value).and_then(|expr| expr.to_constant()) {
                let array = self.sym.cell_var(cell);
                self.bb.havoc(array);
                self.assume_array(cell, value);
            }
        } else if name.starts_with("llvm.memcpy") {
            let (Some(&dst), Some(&src)) = (args.first(), args.get(1)) else {
                return;
            };

            let (Some(dst), Some(src)) = (self.cell(dst), self.cell(src)) else {
                return;
            };

            let dst = self.sym.cell_var(dst);
            let src = self.sym.cell_var(src);
            self.bb.havoc(dst.clone());
            self.bb.assign(dst, src.into());
        }

        // llvm.memmove may overlap source and destination, which cells cannot express
    }
}
