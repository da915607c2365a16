use hashbrown::{HashMap, HashSet};

use crate::cfg::{LinExpr, Number, Var, VarType};
use crate::mem::{CellId, MemAnalysis, TrackLevel};
use crate::ssa::{
    BinOp, Callee, CastOp, FuncBody, FuncId, Function, GlobalId, Inst, InstId, InstKind, Module,
    Type, User, Uses, Value,
};

use super::{Config, ConfigFlags};

/// What a symbolic variable stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKey {
    /// An instruction result or a formal argument of a function.
    Value(FuncId, Value),
    Global(GlobalId),
    Func(FuncId),
    Cell(CellId),
}

/// Mints symbolic variables. Each key maps to exactly one variable for the lifetime of
/// the factory; ids are never reused and no two variables print the same.
#[derive(Debug, Default)]
pub struct VarFactory {
    vars: HashMap<VarKey, Var>,
    names: HashSet<String>,
    next_id: u32,
}

impl VarFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        id
    }

    /// Claims `name`, suffixing it with the id if another variable already prints that way.
    fn unique_name(&mut self, id: u32, mut name: String) -> String {
        while self.names.contains(&name) {
            name = format!("{name}.{id}");
        }

        self.names.insert(name.clone());

        name
    }

    /// A temporary not tied to any source value.
    pub fn fresh(&mut self) -> Var {
        let id = self.next_id();
        let name = self.unique_name(id, format!("_{id}"));

        Var::new(id, name)
    }

    pub fn get_or_insert_with(&mut self, key: VarKey, name: impl FnOnce() -> Option<String>) -> Var {
        if let Some(var) = self.vars.get(&key) {
            return var.clone();
        }

        let id = self.next_id();
        let name = name().unwrap_or_else(|| format!("_{id}"));
        let var = Var::new(id, self.unique_name(id, name));
        self.vars.insert(key, var.clone());

        var
    }

    /// The number of variables minted so far, temporaries included.
    pub fn len(&self) -> usize {
        self.next_id as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }
}

/// Constants wider than 64 bits are not expressible; keeping operands narrow keeps the
/// `i128` arithmetic on linear expressions from overflowing.
pub(crate) fn narrow(value: Number) -> Option<Number> {
    i64::try_from(value).ok().map(Number::from)
}

const SHADOW_MEM_PREFIX: &str = "shadow.mem";

/// Maps the values of one function to symbolic variables and linear expressions.
pub(crate) struct SymEval<'a> {
    pub module: &'a Module,
    pub func_id: FuncId,
    pub func: &'a Function,
    pub body: &'a FuncBody,
    pub uses: Uses,
    pub mem: &'a dyn MemAnalysis,
    pub config: &'a Config,
    pub vfac: &'a mut VarFactory,
}

impl<'a> SymEval<'a> {
    pub fn flag(&self, flag: ConfigFlags) -> bool {
        self.config.flags.contains(flag)
    }

    pub fn include_havoc(&self) -> bool {
        self.flag(ConfigFlags::INCLUDE_HAVOC)
    }

    pub fn no_ptr_arith(&self) -> bool {
        self.flag(ConfigFlags::NO_PTR_ARITH)
    }

    pub fn inter_proc(&self) -> bool {
        self.flag(ConfigFlags::INTER_PROC)
    }

    pub fn tracks_arrays(&self) -> bool {
        self.mem.track_level() == TrackLevel::Array
    }

    pub fn is_entry_func(&self) -> bool {
        self.func.name == self.config.entry_func
    }

    pub fn ty(&self, value: Value) -> Type {
        self.module.value_ty(self.func, value)
    }

    pub fn is_int(&self, value: Value) -> bool {
        self.ty(value).is_int()
    }

    pub fn inst(&self, value: Value) -> Option<&'a Inst> {
        value.to_inst().and_then(|inst_id| self.body.insts.get(inst_id))
    }

    pub fn callee(&self, func_id: FuncId) -> Option<&'a Function> {
        self.module.funcs.get(func_id)
    }

    /// A printable name of an instruction for diagnostics.
    pub fn inst_label(&self, inst_id: InstId) -> String {
        match self.body.insts.get(inst_id).and_then(|inst| inst.name.as_deref()) {
            Some(name) => format!("%{name}"),
            None => format!("{inst_id:?}"),
        }
    }

    fn name(&self, value: Value) -> Option<&'a str> {
        match value {
            Value::Inst(_) => self.inst(value).and_then(|inst| inst.name.as_deref()),
            Value::Arg(idx) => self.func.params.get(idx as usize).map(|param| param.name.as_str()),
            Value::Global(global_id) => self.module.globals.get(global_id).map(|g| g.name.as_str()),
            Value::Func(func_id) => self.callee(func_id).map(|func| func.name.as_str()),
            Value::Int(_) | Value::Null | Value::Undef(_) => None,
        }
    }

    /// Integer values are always tracked; pointers only when memory is modeled.
    pub fn is_tracked(&self, value: Value) -> bool {
        if matches!(value, Value::Undef(_)) {
            return false;
        }

        if self
            .name(value)
            .is_some_and(|name| name.starts_with(SHADOW_MEM_PREFIX))
        {
            return false;
        }

        match self.ty(value) {
            Type::Int(_) => true,
            Type::Ptr => self.tracks_arrays(),
            _ => false,
        }
    }

    pub fn is_tracked_inst(&self, inst_id: InstId) -> bool {
        self.is_tracked(Value::Inst(inst_id))
    }

    fn key(&self, value: Value) -> Option<VarKey> {
        match value {
            Value::Inst(_) | Value::Arg(_) => Some(VarKey::Value(self.func_id, value)),
            Value::Global(global_id) => Some(VarKey::Global(global_id)),
            Value::Func(func_id) => Some(VarKey::Func(func_id)),
            Value::Int(_) | Value::Null | Value::Undef(_) => None,
        }
    }

    /// The variable of a tracked, non-constant value.
    ///
    /// # Panics
    /// Panics if the value is untracked or a literal constant.
    pub fn sym_var(&mut self, value: Value) -> Var {
        assert!(
            self.is_tracked(value),
            "requested a variable for an untracked value {value:?}"
        );

        let key = self
            .key(value)
            .unwrap_or_else(|| panic!("requested a variable for a constant {value:?}"));

        let name = match value {
            Value::Global(_) => self.name(value).map(|name| format!("@{name}")),
            _ => self.name(value).map(str::to_owned),
        };

        self.vfac.get_or_insert_with(key, || name)
    }

    pub fn cell_var(&mut self, cell: CellId) -> Var {
        self.vfac
            .get_or_insert_with(VarKey::Cell(cell), || Some(cell.to_string()))
    }

    pub fn func_var(&mut self, func_id: FuncId) -> Var {
        let name = self.callee(func_id).map(|func| func.name.clone());

        self.vfac.get_or_insert_with(VarKey::Func(func_id), || name)
    }

    pub fn fresh(&mut self) -> Var {
        self.vfac.fresh()
    }

    /// The linear expression denoting `value`, or `None` if it cannot be expressed.
    pub fn lookup(&mut self, value: Value) -> Option<LinExpr> {
        match value {
            Value::Int(c) if c.bits == 1 => Some(LinExpr::constant((c.value != 0).into())),
            Value::Int(c) => narrow(c.value).map(LinExpr::constant),
            Value::Null if self.tracks_arrays() => Some(LinExpr::constant(0)),
            Value::Null | Value::Undef(_) => None,
            _ if self.is_tracked(value) => Some(self.sym_var(value).into()),
            _ => None,
        }
    }

    pub fn var_type(&self, ty: &Type) -> VarType {
        match ty {
            Type::Int(_) => VarType::Int,
            Type::Ptr => VarType::Ptr,
            _ => VarType::Unknown,
        }
    }

    pub fn users(&self, inst_id: InstId) -> &[User] {
        self.uses.get(inst_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the value is consumed only by memory accesses that are not modeled or by
    /// bookkeeping calls. Values with no users qualify.
    pub fn all_uses_are_non_tracked_mem(&self, inst_id: InstId) -> bool {
        self.users(inst_id).iter().all(|user| {
            let User::Inst(user_id) = *user else {
                return false;
            };

            let Some(user) = self.body.insts.get(user_id) else {
                return false;
            };

            match &user.kind {
                InstKind::Store { value, .. } => !self.is_int(*value),
                InstKind::Load(_) => !user.ty.is_int(),

                InstKind::Call {
                    callee: Callee::Direct(func_id),
                    ..
                } => self.callee(*func_id).is_some_and(|func| {
                    func.name.starts_with("llvm.dbg") || func.name.starts_with(SHADOW_MEM_PREFIX)
                }),

                _ => false,
            }
        })
    }

    pub fn all_uses_are_geps(&self, inst_id: InstId) -> bool {
        self.users(inst_id).iter().all(|user| match *user {
            User::Inst(user_id) => self
                .body
                .insts
                .get(user_id)
                .is_some_and(|user| matches!(user.kind, InstKind::Gep { .. })),
            User::Term(_) => false,
        })
    }

    /// Peels a zero- or sign-extension off `value`.
    pub fn strip_ext(&self, value: Value) -> Value {
        match self.inst(value).map(|inst| &inst.kind) {
            Some(&InstKind::Cast(op, operand)) if op.is_extension() => operand,
            _ => value,
        }
    }

    pub fn strip_zext(&self, value: Value) -> Value {
        match self.inst(value).map(|inst| &inst.kind) {
            Some(&InstKind::Cast(CastOp::ZExt, operand)) => operand,
            _ => value,
        }
    }

    /// The operands of `value` if it is an `and`/`or` instruction.
    pub fn logic_operands(&self, value: Value) -> Option<(BinOp, Value, Value)> {
        match self.inst(value).map(|inst| &inst.kind) {
            Some(&InstKind::Binary(op @ (BinOp::And | BinOp::Or), lhs, rhs)) => Some((op, lhs, rhs)),
            _ => None,
        }
    }
}
