use lincfg::build::{BuildError, CfgBuilder, Config, VarFactory};
use lincfg::cfg::Cfg;
use lincfg::mem::MemAnalysis;
use lincfg::ssa::{BlockId, FuncBody, FuncId, InstKind, Module, Param, Type, Value};

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

pub fn i1() -> Type {
    Type::Int(1)
}

pub fn i32() -> Type {
    Type::Int(32)
}

pub fn param(name: &str, ty: Type) -> Param {
    Param {
        name: name.into(),
        ty,
    }
}

/// Phis that refer to values defined later are pushed empty and filled in afterwards.
pub fn set_incoming(body: &mut FuncBody, phi: Value, incoming: Vec<(BlockId, Value)>) {
    let inst_id = phi.to_inst().expect("not an instruction");
    body.insts[inst_id].kind = InstKind::Phi(incoming);
}

pub fn try_build(
    module: &Module,
    func_id: FuncId,
    mem: &dyn MemAnalysis,
    config: &Config,
) -> Result<Cfg, BuildError> {
    init_logger();
    let mut vfac = VarFactory::new();

    CfgBuilder::new(module, func_id, &mut vfac, mem, config).and_then(|builder| builder.build())
}

pub fn build(module: &Module, func_id: FuncId, mem: &dyn MemAnalysis, config: &Config) -> Cfg {
    match try_build(module, func_id, mem, config) {
        Ok(cfg) => cfg,
        Err(e) => panic!("translation failed: {e}"),
    }
}

pub fn stmts(cfg: &Cfg, label: &str) -> Vec<String> {
    let block_id = cfg
        .block_by_label(label)
        .unwrap_or_else(|| panic!("no block labeled `{label}`"));

    cfg.blocks[block_id]
        .stmts
        .iter()
        .map(ToString::to_string)
        .collect()
}

pub fn succ_labels<'a>(cfg: &'a Cfg, label: &str) -> Vec<&'a str> {
    let block_id = cfg
        .block_by_label(label)
        .unwrap_or_else(|| panic!("no block labeled `{label}`"));

    cfg.blocks[block_id]
        .succs
        .iter()
        .map(|&succ_id| cfg.blocks[succ_id].label.as_str())
        .collect()
}
