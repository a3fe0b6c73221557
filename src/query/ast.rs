//! Query syntax tree.

use crate::store::document::Document;

/// A parsed `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub distinct: bool,
    pub projection: Projection,
    /// Iterators in binding order. The first always names a region.
    pub from: Vec<FromItem>,
    pub filter: Option<Expr>,
}

impl Query {
    /// Name of the region the query reads.
    pub fn region(&self) -> &str {
        match self.from.first().map(|item| &item.source) {
            Some(Source::Region(name)) => name,
            _ => "",
        }
    }

    /// Number of positional parameters, taken as the highest `$n` used.
    pub fn parameter_count(&self) -> usize {
        self.filter.as_ref().map_or(0, Expr::max_param)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    All,
    Path(Path),
}

/// One `FROM` iterator.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub source: Source,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Entries of a region.
    Region(String),
    /// Collection reached from an earlier binding.
    Path(Path),
}

/// Dotted member path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<String>,
}

impl Path {
    pub fn new<S: Into<String>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Predicate and value expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Document),
    /// Positional parameter, 1-based.
    Param(usize),
    Path(Path),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    fn max_param(&self) -> usize {
        match self {
            Self::Param(n) => *n,
            Self::Literal(_) | Self::Path(_) => 0,
            Self::Compare { lhs, rhs, .. } | Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.max_param().max(rhs.max_param())
            }
            Self::IsNull { expr, .. } | Self::Not(expr) => expr.max_param(),
        }
    }
}
