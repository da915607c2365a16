use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

pub type Number = i128;

/// A symbolic variable. Identity is the id; the name is only for printing.
#[derive(Debug, Clone)]
pub struct Var {
    id: u32,
    name: Arc<str>,
}

impl Var {
    pub(crate) fn new(id: u32, name: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Var {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// `Σ cᵢ·xᵢ + c₀`. Terms with a zero coefficient are never stored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct LinExpr {
    terms: BTreeMap<Var, Number>,
    constant: Number,
}

impl LinExpr {
    pub fn constant(value: Number) -> Self {
        Self {
            terms: Default::default(),
            constant: value,
        }
    }

    pub fn var(var: Var) -> Self {
        Self {
            terms: [(var, 1)].into(),
            constant: 0,
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Var, Number)> + '_ {
        self.terms.iter().map(|(var, &coeff)| (var, coeff))
    }

    pub fn constant_term(&self) -> Number {
        self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn to_constant(&self) -> Option<Number> {
        self.is_constant().then_some(self.constant)
    }

    /// Returns the variable if the expression is exactly `x`.
    pub fn to_var(&self) -> Option<&Var> {
        match self.terms.iter().next() {
            Some((var, 1)) if self.terms.len() == 1 && self.constant == 0 => Some(var),
            _ => None,
        }
    }

    pub fn is_var(&self) -> bool {
        self.to_var().is_some()
    }

    fn add_term(&mut self, var: &Var, coeff: Number) {
        if coeff == 0 {
            return;
        }

        let entry = self.terms.entry(var.clone()).or_insert(0);
        *entry += coeff;

        if *entry == 0 {
            self.terms.remove(var);
        }
    }

    fn scale(mut self, factor: Number) -> Self {
        if factor == 0 {
            return Self::constant(0);
        }

        for coeff in self.terms.values_mut() {
            *coeff *= factor;
        }

        self.constant *= factor;

        self
    }

    pub(crate) fn is_atomic(&self) -> bool {
        self.is_constant() || self.is_var()
    }
}

impl From<Var> for LinExpr {
    fn from(var: Var) -> Self {
        Self::var(var)
    }
}

impl From<&Var> for LinExpr {
    fn from(var: &Var) -> Self {
        Self::var(var.clone())
    }
}

impl From<Number> for LinExpr {
    fn from(value: Number) -> Self {
        Self::constant(value)
    }
}

impl Add for LinExpr {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        for (var, coeff) in rhs.terms() {
            self.add_term(var, coeff);
        }

        self.constant += rhs.constant;

        self
    }
}

impl Add<Number> for LinExpr {
    type Output = Self;

    fn add(mut self, rhs: Number) -> Self {
        self.constant += rhs;

        self
    }
}

impl Neg for LinExpr {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-1)
    }
}

impl Sub for LinExpr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + -rhs
    }
}

impl Sub<Number> for LinExpr {
    type Output = Self;

    fn sub(self, rhs: Number) -> Self {
        self + -rhs
    }
}

impl Mul<Number> for LinExpr {
    type Output = Self;

    fn mul(self, rhs: Number) -> Self {
        self.scale(rhs)
    }
}

fn fmt_terms(expr: &LinExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (idx, (var, coeff)) in expr.terms().enumerate() {
        let abs = coeff.abs();

        match (idx, coeff < 0) {
            (0, false) => {}
            (0, true) => write!(f, "-")?,
            (_, false) => write!(f, " + ")?,
            (_, true) => write!(f, " - ")?,
        }

        if abs != 1 {
            write!(f, "{abs}*")?;
        }

        write!(f, "{var}")?;
    }

    Ok(())
}

impl Display for LinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constant() {
            return write!(f, "{}", self.constant);
        }

        fmt_terms(self, f)?;

        match self.constant.cmp(&0) {
            Ordering::Greater => write!(f, " + {}", self.constant),
            Ordering::Less => write!(f, " - {}", self.constant.unsigned_abs()),
            Ordering::Equal => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CstKind {
    Eq,
    Ne,
    Le,
}

/// A linear constraint `expr ⋈ 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinCst {
    pub expr: LinExpr,
    pub kind: CstKind,
}

impl LinCst {
    pub fn eq(lhs: LinExpr, rhs: LinExpr) -> Self {
        Self {
            expr: lhs - rhs,
            kind: CstKind::Eq,
        }
    }

    pub fn ne(lhs: LinExpr, rhs: LinExpr) -> Self {
        Self {
            expr: lhs - rhs,
            kind: CstKind::Ne,
        }
    }

    pub fn le(lhs: LinExpr, rhs: LinExpr) -> Self {
        Self {
            expr: lhs - rhs,
            kind: CstKind::Le,
        }
    }

    pub fn ge(lhs: LinExpr, rhs: LinExpr) -> Self {
        Self::le(rhs, lhs)
    }

    pub fn negate(&self) -> Self {
        match self.kind {
            CstKind::Eq => Self {
                expr: self.expr.clone(),
                kind: CstKind::Ne,
            },

            CstKind::Ne => Self {
                expr: self.expr.clone(),
                kind: CstKind::Eq,
            },

            // !(e <= 0) <=> e >= 1 <=> -e + 1 <= 0
            CstKind::Le => Self {
                expr: -self.expr.clone() + 1,
                kind: CstKind::Le,
            },
        }
    }

    /// Evaluates a constraint without variables.
    pub fn to_bool(&self) -> Option<bool> {
        let value = self.expr.to_constant()?;

        Some(match self.kind {
            CstKind::Eq => value == 0,
            CstKind::Ne => value != 0,
            CstKind::Le => value <= 0,
        })
    }
}

impl Display for LinCst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expr.is_constant() {
            write!(f, "0")?;
        } else {
            fmt_terms(&self.expr, f)?;
        }

        let op = match self.kind {
            CstKind::Eq => "=",
            CstKind::Ne => "!=",
            CstKind::Le => "<=",
        };

        // the right-hand side is the negated constant term
        match self.expr.constant_term() {
            c if c > 0 => write!(f, " {op} -{c}"),
            c => write!(f, " {op} {}", c.unsigned_abs()),
        }
    }
}

/// A conjunction of linear constraints. Empty means `true`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CstSystem(Vec<LinCst>);

impl CstSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cst: LinCst) {
        self.0.push(cst);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for CstSystem {
    type Item = LinCst;
    type IntoIter = std::vec::IntoIter<LinCst>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
