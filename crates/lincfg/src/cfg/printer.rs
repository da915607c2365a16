use std::fmt::{self, Display};

use super::{CallSite, Cfg, FuncDecl, LinExpr, SelectCond, Stmt};

struct Operand<'a>(&'a LinExpr);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_atomic() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl Display for SelectCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cst(cst) => write!(f, "{cst}"),
            Self::Var(var) => write!(f, "{var}"),
        }
    }
}

impl Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((var, ty)) = &self.ret {
            write!(f, "{var}:{ty} = ")?;
        }

        write!(f, "call {}(", self.func)?;

        for (idx, (var, ty)) in self.args.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }

            write!(f, "{var}:{ty}")?;
        }

        write!(f, ")")
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign(lhs, rhs) => write!(f, "{lhs} = {rhs}"),
            Self::Havoc(var) => write!(f, "havoc({var})"),
            Self::Assume(cst) => write!(f, "assume({cst})"),

            Self::Arith { op, lhs, args } => {
                write!(f, "{lhs} = {} {op} {}", Operand(&args[0]), Operand(&args[1]))
            }

            Self::Bitwise { op, lhs, args } => {
                write!(f, "{lhs} = {} {op} {}", Operand(&args[0]), Operand(&args[1]))
            }

            Self::Select {
                lhs,
                cond,
                on_true,
                on_false,
            } => write!(f, "{lhs} = ite({cond}, {on_true}, {on_false})"),

            Self::ArrayLoad {
                lhs,
                array,
                index,
                elem_size,
            } => write!(f, "{lhs} = array_load({array}, {index}, {elem_size})"),

            Self::ArrayStore {
                array,
                index,
                value,
                elem_size,
            } => write!(f, "array_store({array}, {index}, {value}, {elem_size})"),

            Self::ArrayInit { array, values } => {
                write!(f, "array_init({array}, [")?;

                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{value}")?;
                }

                write!(f, "])")
            }

            Self::AssumeArray { array, value } => write!(f, "assume_array({array}, {value})"),
            Self::CallSite(call) => write!(f, "{call}"),
            Self::Ret(var, _) => write!(f, "return {var}"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl Display for FuncDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ret {
            Some(ty) => write!(f, "{ty} ")?,
            None => write!(f, "void ")?,
        }

        write!(f, "{}(", self.name)?;

        for (idx, (var, ty)) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }

            write!(f, "{var}:{ty}")?;
        }

        write!(f, ")")
    }
}

impl Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rpo = self.rpo();

        if let Some(decl) = &self.decl {
            writeln!(f, "decl {decl}")?;
        }

        writeln!(
            f,
            "entry {}, exit {}",
            self.blocks[self.entry].label, self.blocks[self.exit].label,
        )?;

        for block_id in rpo.order.iter().copied().chain(self.unreached(&rpo)) {
            let block = &self.blocks[block_id];
            writeln!(f, "\n{}:", block.label)?;

            for stmt in &block.stmts {
                writeln!(f, "  {stmt};")?;
            }

            if !block.succs.is_empty() {
                write!(f, "  goto ")?;

                for (idx, &succ_block_id) in block.succs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{}", self.blocks[succ_block_id].label)?;
                }

                writeln!(f, ";")?;
            }
        }

        Ok(())
    }
}
