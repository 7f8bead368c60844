//! Condition algebra for WHERE clauses.
//!
//! A [`Cond`] is an immutable expression tree. Compiling it yields a SQL fragment
//! with `?` placeholders and the bound values in placeholder order. Empty leaves
//! (no field, no values, empty raw text) compile to an empty fragment and vanish from
//! their parent without leaving a dangling connective.
//!
//! # Example
//! ```ignore
//! use dbx::Cond;
//!
//! let cond = Cond::and([
//!     Cond::eq("x", 1),
//!     Cond::or([Cond::eq("name", "a"), Cond::eq("age", 10)]),
//! ]);
//! let (sql, values) = cond.compile();
//! assert_eq!(sql, "`x`=? AND (`name`=? OR `age`=?)");
//! assert_eq!(values.len(), 3);
//! ```

use crate::dialect::Dialect;
use crate::value::{IntoValues, Value};

/// Condition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// `field=?`
    Eq { field: String, value: Value },
    /// `field <op> ?`
    Op {
        field: String,
        op: String,
        value: Value,
    },
    /// `field=<expr>`, nothing bound
    EqExpr { field: String, expr: String },
    /// `field <op> <expr>`, nothing bound
    OpExpr {
        field: String,
        op: String,
        expr: String,
    },
    /// `field IN (?,...)`
    In { field: String, values: Vec<Value> },
    /// `field NOT IN (?,...)`
    NotIn { field: String, values: Vec<Value> },
    /// Verbatim fragment, nothing bound
    Raw(String),
    And(Vec<Cond>),
    Or(Vec<Cond>),
    /// `NOT (<children joined with AND>)`
    Not(Vec<Cond>),
}

impl Cond {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Cond::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Comparison with a caller-supplied operator (`=`, `!=`, `<>`, `>`, `like`, ...).
    ///
    /// `in` / `not in` (any case) build the list forms, flattening a list value.
    pub fn op(field: impl Into<String>, op: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        let op = op.into();
        let value = value.into();
        match op.trim().to_ascii_lowercase().as_str() {
            "in" => Cond::In {
                field,
                values: value.into_values(),
            },
            "not in" => Cond::NotIn {
                field,
                values: value.into_values(),
            },
            _ => Cond::Op { field, op, value },
        }
    }

    pub fn eq_expr(field: impl Into<String>, expr: impl Into<String>) -> Self {
        Cond::EqExpr {
            field: field.into(),
            expr: expr.into(),
        }
    }

    pub fn op_expr(
        field: impl Into<String>,
        op: impl Into<String>,
        expr: impl Into<String>,
    ) -> Self {
        Cond::OpExpr {
            field: field.into(),
            op: op.into(),
            expr: expr.into(),
        }
    }

    /// `field IN (...)`. `Cond::in_list("age", (1, 3, 10))` and
    /// `Cond::in_list("age", vec![1, 3, 10])` are the same condition.
    pub fn in_list(field: impl Into<String>, values: impl IntoValues) -> Self {
        Cond::In {
            field: field.into(),
            values: values.into_values(),
        }
    }

    pub fn not_in(field: impl Into<String>, values: impl IntoValues) -> Self {
        Cond::NotIn {
            field: field.into(),
            values: values.into_values(),
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Cond::Raw(sql.into())
    }

    pub fn and(children: impl IntoIterator<Item = Cond>) -> Self {
        Cond::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Cond>) -> Self {
        Cond::Or(children.into_iter().collect())
    }

    pub fn not(children: impl IntoIterator<Item = Cond>) -> Self {
        Cond::Not(children.into_iter().collect())
    }

    /// Compile with the default dialect.
    pub fn compile(&self) -> (String, Vec<Value>) {
        self.compile_with(&Dialect::default())
    }

    /// Compile into a fragment with `?` placeholders plus bound values.
    pub fn compile_with(&self, dialect: &Dialect) -> (String, Vec<Value>) {
        let mut values = Vec::new();
        let fragment = self.build(dialect, &mut values);
        (fragment.sql, values)
    }

    pub(crate) fn build(&self, d: &Dialect, values: &mut Vec<Value>) -> Fragment {
        match self {
            Cond::Eq { field, value } => {
                if field.is_empty() {
                    return Fragment::empty();
                }
                values.push(value.clone());
                Fragment::leaf(format!("{}=?", d.quote_field(field)))
            }
            Cond::Op { field, op, value } => {
                if field.is_empty() {
                    return Fragment::empty();
                }
                values.push(value.clone());
                Fragment::leaf(format!("{} {} ?", d.quote_field(field), op.trim()))
            }
            Cond::EqExpr { field, expr } => {
                if field.is_empty() {
                    return Fragment::empty();
                }
                Fragment::opaque(format!("{}={}", d.quote_field(field), expr))
            }
            Cond::OpExpr { field, op, expr } => {
                if field.is_empty() {
                    return Fragment::empty();
                }
                Fragment::opaque(format!("{} {} {}", d.quote_field(field), op.trim(), expr))
            }
            Cond::In { field, values: list } => in_fragment(d, field, "IN", list, values),
            Cond::NotIn { field, values: list } => in_fragment(d, field, "NOT IN", list, values),
            Cond::Raw(sql) => {
                if sql.trim().is_empty() {
                    Fragment::empty()
                } else {
                    Fragment::opaque(sql.clone())
                }
            }
            Cond::And(children) => join(d, children, " AND ", values),
            Cond::Or(children) => join(d, children, " OR ", values),
            Cond::Not(children) => {
                let inner = join(d, children, " AND ", values);
                if inner.is_empty() {
                    Fragment::empty()
                } else {
                    Fragment::leaf(format!("NOT ({})", inner.sql))
                }
            }
        }
    }
}

/// Compiled piece of a condition tree.
///
/// `compound` marks a fragment made of two or more connected parts; it gets
/// parenthesized when it becomes one part of a larger join.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fragment {
    pub(crate) sql: String,
    pub(crate) compound: bool,
}

impl Fragment {
    fn empty() -> Self {
        Self::default()
    }

    fn leaf(sql: String) -> Self {
        Self {
            sql,
            compound: false,
        }
    }

    /// Caller-written SQL may carry its own `OR`; it is parenthesized among siblings.
    fn opaque(sql: String) -> Self {
        Self {
            sql,
            compound: true,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

fn in_fragment(
    d: &Dialect,
    field: &str,
    keyword: &str,
    list: &[Value],
    values: &mut Vec<Value>,
) -> Fragment {
    if field.is_empty() || list.is_empty() {
        return Fragment::empty();
    }
    values.extend(list.iter().cloned());
    let placeholders = vec!["?"; list.len()].join(",");
    Fragment::leaf(format!("{} {} ({})", d.quote_field(field), keyword, placeholders))
}

/// Join the non-empty compiled children with `sep`.
///
/// Values of a child are only kept when its fragment survives.
pub(crate) fn join(d: &Dialect, children: &[Cond], sep: &str, values: &mut Vec<Value>) -> Fragment {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        let mut child_values = Vec::new();
        let fragment = child.build(d, &mut child_values);
        if fragment.is_empty() {
            continue;
        }
        values.extend(child_values);
        parts.push(fragment);
    }

    match parts.len() {
        0 => Fragment::empty(),
        1 => parts.pop().unwrap_or_default(),
        _ => {
            let sql = parts
                .iter()
                .map(|p| {
                    if p.compound {
                        format!("({})", p.sql)
                    } else {
                        p.sql.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(sep);
            Fragment {
                sql,
                compound: true,
            }
        }
    }
}
