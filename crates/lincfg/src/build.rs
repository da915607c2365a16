//! Translation of one SSA function into an analysis [`Cfg`].

mod cond;
mod inst;
mod phi;
mod sym;

use bitflags::bitflags;
use hashbrown::HashSet;
use log::{debug, trace};
use slotmap::SecondaryMap;
use thiserror::Error;

use crate::cfg::{self, Cfg, FuncDecl, LinCst, LinExpr, Stmt, VarType};
use crate::mem::{CellId, MemAnalysis};
use crate::ssa::{self, FuncId, Initializer, Module, Terminator, Value};

use self::cond::assume_or_unreachable;
use self::inst::Translator;
use self::sym::{narrow, SymEval};

pub use self::sym::{VarFactory, VarKey};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConfigFlags: u8 {
        /// Remove unreachable blocks and merge straight-line chains after building.
        const SIMPLIFY = 1 << 0;

        /// Print every built CFG to stdout.
        const PRINT = 1 << 1;

        /// Do not translate pointer arithmetic; only integer values flow into the CFG.
        const NO_PTR_ARITH = 1 << 2;

        /// Emit havocs even where SSA already leaves the variable unconstrained.
        const INCLUDE_HAVOC = 1 << 3;

        /// Emit call sites, returns, and function declarations.
        const INTER_PROC = 1 << 4;
    }
}

impl Default for ConfigFlags {
    fn default() -> Self {
        Self::INCLUDE_HAVOC
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub flags: ConfigFlags,

    /// The program's entry procedure.
    pub entry_func: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flags: Default::default(),
            entry_func: "main".into(),
        }
    }
}

impl Config {
    pub fn with_flags(flags: ConfigFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("the function does not belong to the module")]
    UnknownFunction,

    #[error("function `{func}` has no body")]
    NoBody { func: String },

    #[error("variadic function `{func}` cannot be declared for interprocedural analysis")]
    VarArgDefinition { func: String },

    #[error("function `{func}` branches to a block outside its body")]
    UnknownBlock { func: String },

    #[error("phi {phi} in function `{func}` has no incoming value for block `{pred}`")]
    MissingIncoming {
        func: String,
        phi: String,
        pred: String,
    },

    #[error("address computation {inst} in function `{func}` indexes a struct with a non-constant or out-of-range field")]
    NonConstStructIndex { func: String, inst: String },

    #[error("address computation {inst} in function `{func}` indexes into a non-aggregate type `{ty}`")]
    NonAggregateIndex {
        func: String,
        inst: String,
        ty: String,
    },
}

/// Builds the analysis CFG of a single function.
pub struct CfgBuilder<'a> {
    sym: SymEval<'a>,
    cfg: Cfg,
    block_map: SecondaryMap<ssa::BlockId, cfg::BlockId>,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(
        module: &'a Module,
        func_id: FuncId,
        vfac: &'a mut VarFactory,
        mem: &'a dyn MemAnalysis,
        config: &'a Config,
    ) -> Result<Self, BuildError> {
        let func = module
            .funcs
            .get(func_id)
            .ok_or(BuildError::UnknownFunction)?;

        let body = func.body().ok_or_else(|| BuildError::NoBody {
            func: func.name.clone(),
        })?;

        if config.flags.contains(ConfigFlags::INTER_PROC) && func.var_arg {
            return Err(BuildError::VarArgDefinition {
                func: func.name.clone(),
            });
        }

        let mut cfg = Cfg::new(body.blocks[body.entry()].name.clone());
        let mut block_map = SecondaryMap::new();

        for (idx, &block_id) in body.order.iter().enumerate() {
            let bb_id = match idx {
                0 => cfg.entry,
                _ => cfg.insert_block(body.blocks[block_id].name.clone()),
            };

            block_map.insert(block_id, bb_id);
        }

        Ok(Self {
            sym: SymEval {
                module,
                func_id,
                func,
                body,
                uses: body.uses(),
                mem,
                config,
                vfac,
            },
            cfg,
            block_map,
        })
    }

    fn bb_id(&self, block_id: ssa::BlockId) -> Result<cfg::BlockId, BuildError> {
        self.block_map
            .get(block_id)
            .copied()
            .ok_or_else(|| BuildError::UnknownBlock {
                func: self.sym.func.name.clone(),
            })
    }

    pub fn build(mut self) -> Result<Cfg, BuildError> {
        let body = self.sym.body;
        let mut rets = vec![];

        for &block_id in &body.order {
            let bb_id = self.bb_id(block_id)?;
            let block = &body.blocks[block_id];
            trace!("translating block {}", block.name);

            Translator::new(&mut self.sym, &mut self.cfg.blocks[bb_id]).translate_block(block_id)?;

            match block.term {
                Terminator::Ret(_) => rets.push(bb_id),
                Terminator::Unreachable => self.cfg.blocks[bb_id].unreachable(),

                Terminator::Br(succ_id) => {
                    let succ_bb_id = self.bb_id(succ_id)?;
                    self.cfg.add_edge(bb_id, succ_bb_id);
                    self.sym
                        .resolve_phis(&mut self.cfg.blocks[bb_id], succ_id, block_id)?;
                }

                Terminator::CondBr(..) | Terminator::Switch { .. } => {
                    for (succ_idx, &succ_id) in block.successors().iter().enumerate() {
                        self.translate_edge(block_id, succ_idx, succ_id)?;
                    }
                }
            }
        }

        self.unify_exits(rets);

        let mut entry_stmts = vec![];

        if self.sym.inter_proc() {
            self.declare(&mut entry_stmts);
        }

        if self.sym.tracks_arrays() {
            let effects = self.sym.mem.func_ref_mod_new(self.sym.func_id);

            for cell in effects.new {
                let array = self.sym.cell_var(cell);
                entry_stmts.push(Stmt::AssumeArray { array, value: 0 });
            }

            if self.sym.is_entry_func() {
                self.init_globals(&mut entry_stmts);
            }
        }

        let entry = self.cfg.entry;
        self.cfg.blocks[entry].prepend(entry_stmts);

        let flags = self.sym.config.flags;
        let mut cfg = self.cfg;

        if flags.contains(ConfigFlags::SIMPLIFY) {
            cfg.simplify();
        }

        debug!(
            "built the cfg of {}: {} blocks, {} variables minted so far",
            self.sym.func.name,
            cfg.blocks.len(),
            self.sym.vfac.len(),
        );

        if flags.contains(ConfigFlags::PRINT) {
            println!("{cfg}");
        }

        Ok(cfg)
    }

    /// Inserts a block on the edge to the `succ_idx`-th successor holding the branch
    /// constraint and the successor's phi assignments.
    fn translate_edge(
        &mut self,
        block_id: ssa::BlockId,
        succ_idx: usize,
        succ_id: ssa::BlockId,
    ) -> Result<(), BuildError> {
        let body = self.sym.body;
        let bb_id = self.bb_id(block_id)?;
        let succ_bb_id = self.bb_id(succ_id)?;

        let label = format!(
            "{}_{}",
            body.blocks[block_id].name, body.blocks[succ_id].name
        );
        trace!("inserting edge block {label}");

        let mid_id = self.cfg.insert_block(label);
        self.cfg.add_edge(bb_id, mid_id);
        self.cfg.add_edge(mid_id, succ_bb_id);
        let mid = &mut self.cfg.blocks[mid_id];

        match body.blocks[block_id].term {
            Terminator::CondBr(cond, _) => self.sym.assume_condition(mid, cond, succ_idx == 1),

            Terminator::Switch {
                value, ref cases, ..
            } => {
                if let Some(expr) = self.sym.lookup(value) {
                    match succ_idx {
                        // wide case values constrain nothing
                        0 => {
                            for case in cases.iter().filter_map(|&case| narrow(case)) {
                                assume_or_unreachable(
                                    mid,
                                    LinCst::ne(expr.clone(), LinExpr::constant(case)),
                                );
                            }
                        }

                        _ => {
                            let case = cases.get(succ_idx - 1).and_then(|&case| narrow(case));

                            if let Some(case) = case {
                                assume_or_unreachable(
                                    mid,
                                    LinCst::eq(expr, LinExpr::constant(case)),
                                );
                            }
                        }
                    }
                }
            }

            _ => {}
        }

        self.sym.resolve_phis(mid, succ_id, block_id)
    }

    /// Gives the CFG a single exit block.
    fn unify_exits(&mut self, rets: Vec<cfg::BlockId>) {
        if let [ret] = rets[..] {
            self.cfg.exit = ret;

            return;
        }

        trace!("unifying {} return blocks", rets.len());
        let exit = self.cfg.insert_block("exit");

        for ret in rets {
            self.cfg.add_edge(ret, exit);
        }

        self.cfg.exit = exit;
    }

    /// Records the function signature. Every cell the function may touch is received
    /// twice, as an input copy and as the output version; new cells come last.
    fn declare(&mut self, entry_stmts: &mut Vec<Stmt>) {
        let func = self.sym.func;
        let no_ptr_arith = self.sym.no_ptr_arith();
        let mut params = vec![];

        for (idx, param) in func.params.iter().enumerate() {
            let arg = Value::Arg(idx as u32);

            if !self.sym.is_tracked(arg) || (no_ptr_arith && !param.ty.is_int()) {
                continue;
            }

            params.push((self.sym.sym_var(arg), self.sym.var_type(&param.ty)));
        }

        if self.sym.tracks_arrays() && !self.sym.is_entry_func() {
            let effects = self.sym.mem.func_ref_mod_new(self.sym.func_id);
            let cells = effects.read_or_modified();

            for &cell in &cells {
                let array = self.sym.cell_var(cell);
                let array_in = self.sym.fresh();
                entry_stmts.push(Stmt::Assign(array, array_in.clone().into()));
                params.push((array_in, VarType::Arr));
            }

            for &cell in cells.iter().chain(&effects.new) {
                params.push((self.sym.cell_var(cell), VarType::Arr));
            }
        }

        let ret = match &func.ret {
            ty if ty.is_void() => None,
            ty if no_ptr_arith && !ty.is_int() => Some(VarType::Unknown),
            ty => Some(self.sym.var_type(ty)),
        };

        let name = self.sym.func_var(self.sym.func_id);
        self.cfg.decl = Some(FuncDecl { name, ret, params });
    }

    /// Materializes the initial contents of global cells.
    fn init_globals(&mut self, entry_stmts: &mut Vec<Stmt>) {
        let module = self.sym.module;

        for (global_id, global) in &module.globals {
            let Some(init) = &global.init else {
                continue;
            };

            let Some(cell) = self
                .sym
                .mem
                .array_id(self.sym.func_id, Value::Global(global_id))
            else {
                continue;
            };

            if let Some(stmt) = self.init_stmt(cell, init) {
                entry_stmts.push(stmt);
            }
        }
    }

    fn init_stmt(&mut self, cell: CellId, mut init: &'a Initializer) -> Option<Stmt> {
        let module = self.sym.module;
        let mut seen = HashSet::new();

        // aliases resolve to the aliasee's initializer
        while let Initializer::Alias(global_id) = *init {
            if !seen.insert(global_id) {
                return None;
            }

            init = module.globals.get(global_id)?.init.as_ref()?;
        }

        match init {
            Initializer::Zero => Some(Stmt::AssumeArray {
                array: self.sym.cell_var(cell),
                value: 0,
            }),

            Initializer::Data { elem, values } if elem.is_int() => Some(Stmt::ArrayInit {
                array: self.sym.cell_var(cell),
                values: values.clone(),
            }),

            // scalar globals live in registers
            Initializer::Int(_) | Initializer::Data { .. } | Initializer::Other => None,
            Initializer::Alias(_) => None,
        }
    }
}

/// Translates every function with a body, sharing one variable namespace.
pub fn translate_module(
    module: &Module,
    mem: &dyn MemAnalysis,
    config: &Config,
) -> Result<Vec<(FuncId, Cfg)>, BuildError> {
    let mut vfac = VarFactory::new();
    let mut cfgs = vec![];

    for (func_id, func) in &module.funcs {
        if func.is_declaration() {
            continue;
        }

        let cfg = CfgBuilder::new(module, func_id, &mut vfac, mem, config)?.build()?;
        cfgs.push((func_id, cfg));
    }

    Ok(cfgs)
}
