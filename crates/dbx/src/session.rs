//! Session contract: the database access a statement or transaction runs against.

use crate::dialect::Dialect;
use crate::error::DbxResult;
use crate::row::Row;
use crate::value::Value;
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Executes compiled SQL.
///
/// SQL handed to a session is already rendered in the session's [`Dialect`];
/// `params` bind to its placeholders in order.
pub trait Session: Send + Sync {
    /// Dialect statements must be compiled in for this session.
    fn dialect(&self) -> Dialect {
        Dialect::MYSQL
    }

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbxResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = DbxResult<u64>> + Send;

    /// Execute a query and return its rows as a stream.
    ///
    /// The default implementation buffers [`Session::query`].
    fn query_stream(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DbxResult<RowStream>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(RowStream::new(futures_util::stream::iter(
                rows.into_iter().map(Ok),
            )))
        }
    }
}

impl<S: Session> Session for &S {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbxResult<Vec<Row>> {
        (**self).query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbxResult<u64> {
        (**self).execute(sql, params).await
    }

    async fn query_stream(&self, sql: &str, params: &[Value]) -> DbxResult<RowStream> {
        (**self).query_stream(sql, params).await
    }
}

/// A transaction-scoped session.
///
/// `close` releases the session; when the transaction was begun and never committed
/// it is rolled back.
pub trait TxSession: Session {
    fn begin(&mut self) -> impl Future<Output = DbxResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = DbxResult<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = DbxResult<()>> + Send;

    fn close(self) -> impl Future<Output = DbxResult<()>> + Send
    where
        Self: Sized;
}

/// Hands out fresh transaction-scoped sessions.
pub trait Connector: Send + Sync {
    type Tx: TxSession + 'static;

    fn session(&self) -> impl Future<Output = DbxResult<Self::Tx>> + Send;
}

impl<C: Connector> Connector for &C {
    type Tx = C::Tx;

    async fn session(&self) -> DbxResult<Self::Tx> {
        (**self).session().await
    }
}

/// A stream of rows.
///
/// Type-erased so every session can return the same stream type. Dropping it
/// releases the underlying cursor.
#[must_use]
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = DbxResult<Row>> + Send>>,
}

impl RowStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = DbxResult<Row>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for RowStream {
    type Item = DbxResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}
