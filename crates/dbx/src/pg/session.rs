//! [`Session`] for tokio-postgres clients and transactions.

use super::value::decode_row;
use crate::dialect::Dialect;
use crate::error::{DbxError, DbxResult};
use crate::row::Row;
use crate::session::{RowStream, Session};
use crate::value::Value;
use futures_core::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_postgres::types::ToSql;

pub(crate) fn bind(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn decode_all(rows: Vec<tokio_postgres::Row>) -> DbxResult<Vec<Row>> {
    rows.iter().map(decode_row).collect()
}

/// Decodes driver rows as they arrive; `guard` lives as long as the stream.
pub(crate) struct PgRows<S, G = ()> {
    inner: Pin<Box<S>>,
    _guard: G,
}

impl<S, G> PgRows<S, G> {
    pub(crate) fn new(stream: S, guard: G) -> Self {
        Self {
            inner: Box::pin(stream),
            _guard: guard,
        }
    }
}

impl<S, G> Stream for PgRows<S, G>
where
    S: Stream<Item = Result<tokio_postgres::Row, tokio_postgres::Error>>,
    G: Unpin,
{
    type Item = DbxResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(decode_row(&row))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(DbxError::from_db_error(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Session for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbxResult<Vec<Row>> {
        let rows = tokio_postgres::Client::query(self, sql, &bind(params))
            .await
            .map_err(DbxError::from_db_error)?;
        decode_all(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbxResult<u64> {
        tokio_postgres::Client::execute(self, sql, &bind(params))
            .await
            .map_err(DbxError::from_db_error)
    }

    async fn query_stream(&self, sql: &str, params: &[Value]) -> DbxResult<RowStream> {
        let params = bind(params);
        let stream = tokio_postgres::Client::query_raw(self, sql, params.iter().copied())
            .await
            .map_err(DbxError::from_db_error)?;
        Ok(RowStream::new(PgRows::new(stream, ())))
    }
}

impl Session for tokio_postgres::Transaction<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbxResult<Vec<Row>> {
        let rows = tokio_postgres::Transaction::query(self, sql, &bind(params))
            .await
            .map_err(DbxError::from_db_error)?;
        decode_all(rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbxResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, &bind(params))
            .await
            .map_err(DbxError::from_db_error)
    }

    async fn query_stream(&self, sql: &str, params: &[Value]) -> DbxResult<RowStream> {
        let params = bind(params);
        let stream = tokio_postgres::Transaction::query_raw(self, sql, params.iter().copied())
            .await
            .map_err(DbxError::from_db_error)?;
        Ok(RowStream::new(PgRows::new(stream, ())))
    }
}

#[cfg(feature = "pool")]
impl Session for deadpool_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::POSTGRES
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbxResult<Vec<Row>> {
        let client: &tokio_postgres::Client = self;
        Session::query(client, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbxResult<u64> {
        let client: &tokio_postgres::Client = self;
        Session::execute(client, sql, params).await
    }

    async fn query_stream(&self, sql: &str, params: &[Value]) -> DbxResult<RowStream> {
        let client: &tokio_postgres::Client = self;
        Session::query_stream(client, sql, params).await
    }
}
