//! Terminal calls: compile against the session's dialect and execute.

use super::{Compiled, RowIter, Stmt};
use crate::error::{DbxError, DbxResult};
use crate::row::{FromRow, Row, ToRecord};
use crate::session::Session;
use futures_util::StreamExt;
use std::ops::ControlFlow;

fn log_sql(op: &'static str, compiled: &Compiled) {
    tracing::debug!(
        target: "dbx.sql",
        op,
        sql = %compiled.sql,
        param_count = compiled.values.len(),
        "execute"
    );
}

async fn query(conn: &impl Session, op: &'static str, compiled: &Compiled) -> DbxResult<Vec<Row>> {
    log_sql(op, compiled);
    conn.query(&compiled.sql, &compiled.values).await
}

async fn execute(conn: &impl Session, op: &'static str, compiled: &Compiled) -> DbxResult<u64> {
    log_sql(op, compiled);
    conn.execute(&compiled.sql, &compiled.values).await
}

impl Stmt {
    /// Point lookup: the first matching row, if any.
    pub async fn get<T: FromRow>(&self, conn: &impl Session) -> DbxResult<Option<T>> {
        self.get_row(conn).await?.map(|row| T::from_row(&row)).transpose()
    }

    pub(crate) async fn get_row(&self, conn: &impl Session) -> DbxResult<Option<Row>> {
        let compiled = self.compile_get(&conn.dialect())?;
        let rows = query(conn, "get", &compiled).await?;
        Ok(rows.into_iter().next())
    }

    /// Like [`Stmt::get`], but a missing row is [`DbxError::NotFound`].
    pub async fn get_one<T: FromRow>(&self, conn: &impl Session) -> DbxResult<T> {
        self.get(conn)
            .await?
            .ok_or_else(|| DbxError::not_found(format!("no row in {}", self.table)))
    }

    /// All matching rows.
    pub async fn list<T: FromRow>(&self, conn: &impl Session) -> DbxResult<Vec<T>> {
        self.list_rows(conn).await?.iter().map(T::from_row).collect()
    }

    pub(crate) async fn list_rows(&self, conn: &impl Session) -> DbxResult<Vec<Row>> {
        let compiled = self.compile_select(&conn.dialect())?;
        query(conn, "list", &compiled).await
    }

    /// Insert one record; returns the affected row count.
    pub async fn insert<R: ToRecord + ?Sized>(
        &self,
        conn: &impl Session,
        bean: &R,
    ) -> DbxResult<u64> {
        let record = bean.to_record()?;
        let compiled = self.compile_insert(&conn.dialect(), &record)?;
        execute(conn, "insert", &compiled).await
    }

    /// Update from a record, restricted to the `cols` allow-list when one is set.
    pub async fn update<R: ToRecord + ?Sized>(
        &self,
        conn: &impl Session,
        bean: &R,
    ) -> DbxResult<u64> {
        let record = bean.to_record()?;
        match self.compile_update(&conn.dialect(), &record)? {
            Some(compiled) => execute(conn, "update", &compiled).await,
            None => Ok(0),
        }
    }

    /// Update from the SET clauses. An empty table or SET list affects nothing.
    pub async fn update_set(&self, conn: &impl Session) -> DbxResult<u64> {
        match self.compile_update_set(&conn.dialect()) {
            Some(compiled) => execute(conn, "update_set", &compiled).await,
            None => {
                tracing::debug!(target: "dbx.sql", table = %self.table, "update_set skipped");
                Ok(0)
            }
        }
    }

    /// Delete the matching rows. A statement without conditions is rejected.
    pub async fn delete(&self, conn: &impl Session) -> DbxResult<()> {
        let compiled = self.compile_delete(&conn.dialect())?;
        execute(conn, "delete", &compiled).await?;
        Ok(())
    }

    pub async fn count(&self, conn: &impl Session) -> DbxResult<i64> {
        let compiled = self.compile_count(&conn.dialect())?;
        let rows = query(conn, "count", &compiled).await?;
        match rows.first() {
            Some(row) => row.get_idx(0),
            None => Ok(0),
        }
    }

    pub async fn sum(&self, conn: &impl Session, column: &str) -> DbxResult<f64> {
        let compiled = self.compile_sum(&conn.dialect(), column)?;
        let rows = query(conn, "sum", &compiled).await?;
        match rows.first() {
            Some(row) => Ok(row.get_idx::<Option<f64>>(0)?.unwrap_or(0.0)),
            None => Ok(0.0),
        }
    }

    /// Call `f` with each row and its index until it returns `ControlFlow::Break`.
    pub async fn iterate<T, F>(&self, conn: &impl Session, mut f: F) -> DbxResult<()>
    where
        T: FromRow,
        F: FnMut(usize, T) -> ControlFlow<()>,
    {
        let compiled = self.compile_select(&conn.dialect())?;
        log_sql("iterate", &compiled);
        let mut stream = conn.query_stream(&compiled.sql, &compiled.values).await?;
        let mut idx = 0;
        while let Some(row) = stream.next().await {
            let item = T::from_row(&row?)?;
            if f(idx, item).is_break() {
                break;
            }
            idx += 1;
        }
        Ok(())
    }

    /// Pull-based row sequence. Single pass; close it or drop it to release the cursor.
    pub async fn iter<T: FromRow>(&self, conn: &impl Session) -> DbxResult<RowIter<T>> {
        let compiled = self.compile_select(&conn.dialect())?;
        log_sql("iter", &compiled);
        let stream = conn.query_stream(&compiled.sql, &compiled.values).await?;
        Ok(RowIter::new(stream))
    }
}
