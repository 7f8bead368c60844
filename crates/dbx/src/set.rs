//! SET clauses for `UPDATE ... SET` statements.

use crate::dialect::Dialect;
use crate::value::Value;

/// One assignment of a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Set {
    /// `field=?`
    Value { field: String, value: Value },
    /// `field=<expr>`, inlined into the SQL text
    Expr { field: String, expr: String },
}

impl Set {
    pub fn value(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Set::Value {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Expression assignment, e.g. `Set::expr("stock", "stock - 1")`.
    pub fn expr(field: impl Into<String>, expr: impl Into<String>) -> Self {
        Set::Expr {
            field: field.into(),
            expr: expr.into(),
        }
    }

    fn field(&self) -> &str {
        match self {
            Set::Value { field, .. } | Set::Expr { field, .. } => field,
        }
    }
}

/// Compile a SET list into `a=?,b=expr` plus the values it binds, in list order.
///
/// Assignments with an empty field are skipped.
pub fn compile_sets(sets: &[Set], d: &Dialect) -> (String, Vec<Value>) {
    let mut values = Vec::new();
    let parts: Vec<String> = sets
        .iter()
        .filter(|s| !s.field().is_empty())
        .map(|s| match s {
            Set::Value { field, value } => {
                values.push(value.clone());
                format!("{}=?", d.quote_field(field))
            }
            Set::Expr { field, expr } => format!("{}={}", d.quote_field(field), expr),
        })
        .collect();
    (parts.join(","), values)
}
