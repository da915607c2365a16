//! Translation of SSA-form procedures into a linear-arithmetic control-flow graph
//! suitable for abstract interpretation.

pub mod build;
pub mod cfg;
pub mod mem;
pub mod ssa;

mod util;

pub use build::{translate_module, BuildError, CfgBuilder, Config, ConfigFlags, VarFactory};
pub use cfg::Cfg;
