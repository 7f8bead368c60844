//! SQL assembly for [`Stmt`].

use super::Stmt;
use crate::cond::join;
use crate::dialect::{Dialect, Placeholder};
use crate::error::{DbxError, DbxResult};
use crate::row::Record;
use crate::set::compile_sets;
use crate::value::Value;

/// A frozen statement: final SQL text and its bound values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Compiled {
    fn finish(d: &Dialect, sql: String, values: Vec<Value>) -> Self {
        Self {
            sql: d.finish(&sql),
            values,
        }
    }
}

impl Stmt {
    fn require_table(&self) -> DbxResult<()> {
        if self.table.trim().is_empty() {
            return Err(DbxError::config("statement has no table"));
        }
        Ok(())
    }

    /// `WHERE ...` (with leading space) or nothing.
    fn where_clause(&self, d: &Dialect, values: &mut Vec<Value>) -> String {
        let fragment = join(d, &self.conds, " AND ", values);
        if fragment.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", fragment.sql)
        }
    }

    fn from_clause(&self, d: &Dialect) -> String {
        let mut sql = format!(" FROM {}", d.quote_ident_if_plain(&self.table));
        for j in &self.joins {
            sql.push_str(&format!(
                " {} {} ON {}",
                j.kind.keyword(),
                d.quote_ident_if_plain(&j.table),
                j.on
            ));
        }
        sql
    }

    fn group_clause(&self, d: &Dialect) -> String {
        if self.group_by.is_empty() {
            return String::new();
        }
        let fields: Vec<String> = self
            .group_by
            .iter()
            .map(|f| d.quote_ident_if_plain(f))
            .collect();
        format!(" GROUP BY {}", fields.join(", "))
    }

    fn order_clause(&self, d: &Dialect) -> String {
        if self.orders.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .orders
            .iter()
            .map(|o| {
                let dir = if o.desc { "DESC" } else { "ASC" };
                format!("{} {}", d.quote_ident_if_plain(&o.field), dir)
            })
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    }

    fn limit_clause(limit: Option<(i64, i64)>) -> String {
        match limit {
            Some((count, offset)) if count > 0 => {
                if offset > 0 {
                    format!(" LIMIT {count} OFFSET {offset}")
                } else {
                    format!(" LIMIT {count}")
                }
            }
            _ => String::new(),
        }
    }

    fn projection(&self, d: &Dialect) -> String {
        if let Some(selection) = &self.selection {
            return selection.clone();
        }
        if !self.cols.is_empty() {
            let cols: Vec<String> = self.cols.iter().map(|c| d.quote_ident_if_plain(c)).collect();
            return cols.join(", ");
        }
        if !self.joins.is_empty() {
            let mut parts = vec![format!("{}.*", reference_name(&self.table))];
            parts.extend(self.joins.iter().map(|j| format!("{}.*", reference_name(&j.table))));
            return parts.join(", ");
        }
        "*".to_string()
    }

    /// SELECT for `list`/`iter`/`iterate`.
    pub fn compile_select(&self, d: &Dialect) -> DbxResult<Compiled> {
        self.compile_select_limited(d, self.limit)
    }

    pub(crate) fn compile_select_limited(
        &self,
        d: &Dialect,
        limit: Option<(i64, i64)>,
    ) -> DbxResult<Compiled> {
        if let Some((sql, args)) = &self.raw {
            return Ok(Compiled::finish(d, sql.clone(), args.clone()));
        }
        self.require_table()?;

        let mut values = Vec::new();
        let sql = format!(
            "SELECT {}{}{}{}{}{}",
            self.projection(d),
            self.from_clause(d),
            self.where_clause(d, &mut values),
            self.group_clause(d),
            self.order_clause(d),
            Self::limit_clause(limit),
        );
        Ok(Compiled::finish(d, sql, values))
    }

    /// SELECT for `get`: the list query limited to one row.
    pub fn compile_get(&self, d: &Dialect) -> DbxResult<Compiled> {
        if self.raw.is_some() {
            return self.compile_select(d);
        }
        let offset = match self.limit {
            Some((count, offset)) if count > 0 => offset,
            _ => 0,
        };
        self.compile_select_limited(d, Some((1, offset)))
    }

    pub fn compile_count(&self, d: &Dialect) -> DbxResult<Compiled> {
        if let Some((sql, args)) = &self.raw {
            let sql = format!("SELECT COUNT(*) FROM ({sql}) AS dbx_count");
            return Ok(Compiled::finish(d, sql, args.clone()));
        }
        self.require_table()?;

        let mut values = Vec::new();
        let from = self.from_clause(d);
        let where_sql = self.where_clause(d, &mut values);
        let sql = if self.group_by.is_empty() {
            format!("SELECT COUNT(*){from}{where_sql}")
        } else {
            format!(
                "SELECT COUNT(*) FROM (SELECT 1{from}{where_sql}{}) AS dbx_count",
                self.group_clause(d)
            )
        };
        Ok(Compiled::finish(d, sql, values))
    }

    pub fn compile_sum(&self, d: &Dialect, column: &str) -> DbxResult<Compiled> {
        if column.trim().is_empty() {
            return Err(DbxError::config("sum needs a column"));
        }
        self.require_table()?;

        let mut values = Vec::new();
        let expr = format!("COALESCE(SUM({}),0)", d.quote_ident_if_plain(column));
        // Postgres returns NUMERIC for SUM over integers.
        let expr = match d.placeholder {
            Placeholder::Numbered => format!("CAST({expr} AS DOUBLE PRECISION)"),
            Placeholder::Question => expr,
        };
        let sql = format!(
            "SELECT {expr}{}{}",
            self.from_clause(d),
            self.where_clause(d, &mut values)
        );
        Ok(Compiled::finish(d, sql, values))
    }

    /// INSERT of one record. Accumulated conditions never apply.
    pub fn compile_insert(&self, d: &Dialect, record: &Record) -> DbxResult<Compiled> {
        self.require_table()?;
        if record.is_empty() {
            return Err(DbxError::config("insert with no columns"));
        }

        let (cols, values): (Vec<String>, Vec<Value>) = record
            .fields()
            .iter()
            .map(|(c, v)| (d.quote_ident_if_plain(c), v.clone()))
            .unzip();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            d.quote_ident_if_plain(&self.table),
            cols.join(","),
            vec!["?"; values.len()].join(",")
        );
        Ok(Compiled::finish(d, sql, values))
    }

    /// UPDATE from a record, restricted to `cols` when set.
    ///
    /// `None` when nothing is left to update.
    pub fn compile_update(&self, d: &Dialect, record: &Record) -> DbxResult<Option<Compiled>> {
        self.require_table()?;
        let record = record.only(&self.cols);
        if record.is_empty() {
            return Ok(None);
        }

        let mut values = Vec::new();
        let assignments: Vec<String> = record
            .fields()
            .iter()
            .map(|(c, v)| {
                values.push(v.clone());
                format!("{}=?", d.quote_field(c))
            })
            .collect();
        let where_sql = self.where_clause(d, &mut values);
        let sql = format!(
            "UPDATE {} SET {}{}",
            d.quote_ident_if_plain(&self.table),
            assignments.join(","),
            where_sql
        );
        Ok(Some(Compiled::finish(d, sql, values)))
    }

    /// UPDATE from the SET clauses: SET values bind before WHERE values.
    ///
    /// `None` when the table or the SET list is empty.
    pub fn compile_update_set(&self, d: &Dialect) -> Option<Compiled> {
        if self.table.trim().is_empty() {
            return None;
        }
        let (set_sql, mut values) = compile_sets(&self.sets, d);
        if set_sql.is_empty() {
            return None;
        }
        let where_sql = self.where_clause(d, &mut values);
        let sql = format!(
            "UPDATE {} SET {}{}",
            d.quote_ident_if_plain(&self.table),
            set_sql,
            where_sql
        );
        Some(Compiled::finish(d, sql, values))
    }

    /// DELETE. A statement without conditions is rejected.
    pub fn compile_delete(&self, d: &Dialect) -> DbxResult<Compiled> {
        self.require_table()?;
        let mut values = Vec::new();
        let where_sql = self.where_clause(d, &mut values);
        if where_sql.is_empty() {
            return Err(DbxError::config(format!(
                "refusing to delete from {} without conditions",
                self.table
            )));
        }
        let sql = format!("DELETE FROM {}{}", d.quote_ident_if_plain(&self.table), where_sql);
        Ok(Compiled::finish(d, sql, values))
    }
}

/// Name a table is referred to by in a projection: its alias when one is given.
fn reference_name(table: &str) -> &str {
    table.split_whitespace().last().unwrap_or(table)
}
