//! Statement builder.
//!
//! A [`Stmt`] accumulates table, conditions, projection, joins, ordering, grouping,
//! limit and SET clauses through by-value builder calls. Nothing is compiled until
//! a terminal call (`get`, `list`, `insert`, `update`, `update_set`, `delete`,
//! `count`, `sum`, `iterate`, `iter`) compiles a frozen [`Compiled`] statement in
//! the session's dialect and executes it.
//!
//! # Usage
//!
//! ```ignore
//! use dbx::{Cond, table};
//!
//! let users: Vec<User> = table("users")
//!     .eq("status", "active")
//!     .cond(Cond::or([Cond::eq("role", "admin"), Cond::op("age", ">", 30)]))
//!     .desc(&["created_at"])
//!     .limit(20)
//!     .list(&db)
//!     .await?;
//!
//! let affected = table("goods")
//!     .set_expr("stock", "stock - 1")
//!     .eq("id", 7)
//!     .update_set(&db)
//!     .await?;
//! ```

mod compile;
mod exec;
mod iter;

pub use compile::Compiled;
pub use iter::RowIter;

use crate::cond::Cond;
use crate::row::FromRow;
use crate::session::Session;
use crate::set::Set;
use crate::value::{IntoValues, Value};
use crate::DbxResult;

/// Join type of a [`Join`] clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Order {
    field: String,
    desc: bool,
}

/// Accumulated statement configuration.
#[derive(Debug, Clone, Default)]
pub struct Stmt {
    table: String,
    conds: Vec<Cond>,
    cols: Vec<String>,
    selection: Option<String>,
    raw: Option<(String, Vec<Value>)>,
    joins: Vec<Join>,
    orders: Vec<Order>,
    group_by: Vec<String>,
    limit: Option<(i64, i64)>,
    sets: Vec<Set>,
}

/// Start a statement on a table.
pub fn table(name: impl Into<String>) -> Stmt {
    Stmt::new(name)
}

/// Start a raw SQL query with bound values.
pub fn raw_sql(sql: impl Into<String>, args: impl IntoValues) -> Stmt {
    Stmt::default().sql(sql, args)
}

/// Point lookup of one row by a single column.
pub async fn get_by<T: FromRow>(
    conn: &impl Session,
    table_name: &str,
    column: &str,
    value: impl Into<Value>,
) -> DbxResult<Option<T>> {
    table(table_name).eq(column, value).get(conn).await
}

impl Stmt {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = name.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    // ==================== JOIN ====================

    pub fn inner_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Inner,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    pub fn left_join(mut self, table: impl Into<String>, on: impl Into<String>) -> Self {
        self.joins.push(Join {
            kind: JoinKind::Left,
            table: table.into(),
            on: on.into(),
        });
        self
    }

    // ==================== WHERE ====================

    /// Add a condition. Top-level conditions are joined with AND.
    pub fn cond(mut self, cond: Cond) -> Self {
        self.conds.push(cond);
        self
    }

    pub fn conds(mut self, conds: impl IntoIterator<Item = Cond>) -> Self {
        self.conds.extend(conds);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cond(Cond::eq(field, value))
    }

    pub fn op(
        self,
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.cond(Cond::op(field, op, value))
    }

    pub fn in_list(self, field: impl Into<String>, values: impl IntoValues) -> Self {
        self.cond(Cond::in_list(field, values))
    }

    pub fn not_in(self, field: impl Into<String>, values: impl IntoValues) -> Self {
        self.cond(Cond::not_in(field, values))
    }

    /// Add a raw WHERE fragment (binds nothing).
    pub fn where_raw(self, fragment: impl Into<String>) -> Self {
        self.cond(Cond::raw(fragment))
    }

    pub fn and(self, children: impl IntoIterator<Item = Cond>) -> Self {
        self.cond(Cond::and(children))
    }

    pub fn or(self, children: impl IntoIterator<Item = Cond>) -> Self {
        self.cond(Cond::or(children))
    }

    pub fn not(self, children: impl IntoIterator<Item = Cond>) -> Self {
        self.cond(Cond::not(children))
    }

    /// Drop all accumulated conditions.
    pub fn clear_conds(mut self) -> Self {
        self.conds.clear();
        self
    }

    // ==================== Projection ====================

    /// Column list. Used as the projection of reads and the allow-list of `update`.
    pub fn cols(mut self, cols: &[&str]) -> Self {
        self.cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Explicit projection expression, e.g. `"u.id, COUNT(o.id) AS orders"`.
    pub fn select(mut self, expr: impl Into<String>) -> Self {
        self.selection = Some(expr.into());
        self
    }

    /// Use raw SQL text as the source of a query; table, conditions and the other
    /// clauses are ignored.
    pub fn sql(mut self, sql: impl Into<String>, args: impl IntoValues) -> Self {
        self.raw = Some((sql.into(), args.into_values()));
        self
    }

    // ==================== ORDER / GROUP / LIMIT ====================

    pub fn asc(mut self, fields: &[&str]) -> Self {
        self.orders.extend(fields.iter().map(|f| Order {
            field: f.to_string(),
            desc: false,
        }));
        self
    }

    pub fn desc(mut self, fields: &[&str]) -> Self {
        self.orders.extend(fields.iter().map(|f| Order {
            field: f.to_string(),
            desc: true,
        }));
        self
    }

    pub fn group_by(mut self, fields: &[&str]) -> Self {
        self.group_by = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Limit the row count. `count <= 0` means no limit.
    pub fn limit(self, count: i64) -> Self {
        self.limit_offset(count, 0)
    }

    /// Limit with offset. The offset only applies when `count > 0`.
    pub fn limit_offset(mut self, count: i64, offset: i64) -> Self {
        self.limit = Some((count, offset));
        self
    }

    // ==================== SET ====================

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.push(Set::value(field, value));
        self
    }

    pub fn set_expr(mut self, field: impl Into<String>, expr: impl Into<String>) -> Self {
        self.sets.push(Set::expr(field, expr));
        self
    }

    pub fn sets(mut self, sets: impl IntoIterator<Item = Set>) -> Self {
        self.sets.extend(sets);
        self
    }
}

#[cfg(test)]
mod tests;
