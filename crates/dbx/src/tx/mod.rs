//! Step-driven transactions.
//!
//! A pipeline runs a chain of [`Step`]s against one transaction-scoped session:
//! it begins, executes each step's statement, hands the result and the step's
//! carried [`Args`] to the step's continuation, and follows the [`Flow`] it returns
//! until the chain commits or rolls back.
//!
//! - A statement or continuation error stops the chain and is returned; nothing is
//!   committed.
//! - A panic inside a step is recovered. A [`DbxError`] payload (see [`abort`]) is
//!   returned as-is; any other payload becomes [`DbxError::Internal`]. Either way the
//!   transaction is not committed.
//! - The session is closed exactly once on every exit path.
//!
//! # Example
//!
//! ```ignore
//! use dbx::tx::{Flow, Step, run_tx};
//! use dbx::table;
//!
//! let outcome = run_tx(&db, Step::get(table("goods").eq("id", 7)).arg("qty", 2).then(|ctx| {
//!     Box::pin(async move {
//!         let Some(goods) = ctx.result().row() else {
//!             return Ok(Flow::Rollback);
//!         };
//!         let qty: i64 = ctx.arg_as("qty")?;
//!         if goods.get::<i64>("stock")? < qty {
//!             return Ok(Flow::Rollback);
//!         }
//!         Ok(Flow::Next(Step::update_set(
//!             table("goods").set_expr("stock", format!("stock - {qty}")).eq("id", 7),
//!         )))
//!     })
//! }))
//! .await?;
//! ```

mod args;
mod step;

pub use args::Args;
pub use step::{Continuation, Flow, Step, StepCtx, StepResult, TxStmt};

use crate::error::{DbxError, DbxResult};
use crate::session::{Connector, TxSession};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use step::{StepKind, Then};

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    RolledBack,
}

/// Abort the running transaction step with a typed error.
///
/// For helper code nested deep inside a continuation; the pipeline returns `err`
/// from its entry point.
pub fn abort(err: DbxError) -> ! {
    std::panic::panic_any(err)
}

/// Runs step chains, resolving named continuations from its handler table.
pub struct TxRunner<S> {
    handlers: Arc<HashMap<String, Continuation<S>>>,
}

impl<S> Clone for TxRunner<S> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<S> Default for TxRunner<S> {
    fn default() -> Self {
        Self {
            handlers: Arc::new(HashMap::new()),
        }
    }
}

impl<S: TxSession + 'static> TxRunner<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a continuation under `key` (see [`Step::then_named`]).
    pub fn handler<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(StepCtx<'a, S>) -> BoxFuture<'a, DbxResult<Flow<S>>> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.handlers).insert(key.into(), Arc::new(f));
        self
    }

    pub fn has_handler(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Run a step chain inside one transaction.
    pub async fn run<C>(&self, db: &C, first: Step<S>) -> DbxResult<TxOutcome>
    where
        C: Connector<Tx = S>,
    {
        let runner = self.clone();
        scoped(db, move |tx| {
            Box::pin(async move {
                let outcome = runner.drive(&*tx, first).await?;
                match outcome {
                    TxOutcome::Committed => tx.commit().await?,
                    TxOutcome::RolledBack => tx.rollback().await?,
                }
                tracing::debug!(target: "dbx.tx", ?outcome, "transaction finished");
                Ok(outcome)
            })
        })
        .await
    }

    async fn drive(&self, tx: &S, first: Step<S>) -> DbxResult<TxOutcome> {
        let mut step = first;
        loop {
            let Step { kind, args, then } = step;
            let stmt = match kind {
                StepKind::CommitNow => return Ok(TxOutcome::Committed),
                StepKind::RollbackNow => return Ok(TxOutcome::RolledBack),
                StepKind::Exec(stmt) => stmt,
            };

            let next = match then {
                Then::Commit => None,
                Then::Call(f) => Some(f),
                Then::Named(key) => match self.handlers.get(&key) {
                    Some(f) => Some(Arc::clone(f)),
                    None => {
                        return Err(DbxError::config(format!(
                            "no step handler registered for '{key}'"
                        )));
                    }
                },
            };

            let result = stmt.exec(tx).await?;
            let Some(next) = next else {
                return Ok(TxOutcome::Committed);
            };

            let ctx = StepCtx {
                session: tx,
                stmt: &stmt,
                result,
                args,
            };
            match next(ctx).await? {
                Flow::Next(following) => step = following,
                Flow::Commit => return Ok(TxOutcome::Committed),
                Flow::Rollback => return Ok(TxOutcome::RolledBack),
            }
        }
    }
}

/// Run a step chain inside one transaction, without named handlers.
pub async fn run_tx<C>(db: &C, first: Step<C::Tx>) -> DbxResult<TxOutcome>
where
    C: Connector,
{
    TxRunner::new().run(db, first).await
}

/// Run a bolt-style chain: a void first step carrying `args`, continued by `f`,
/// which issues its own statements against the transaction session.
pub async fn pipe_tx<C, F>(db: &C, args: Args, f: F) -> DbxResult<TxOutcome>
where
    C: Connector,
    F: for<'a> Fn(StepCtx<'a, C::Tx>) -> BoxFuture<'a, DbxResult<Flow<C::Tx>>>
        + Send
        + Sync
        + 'static,
{
    run_tx(db, Step::void().args(args).then(f)).await
}

/// Run a fixed list of statements in one transaction, stopping at the first error.
pub async fn run_all<C>(db: &C, stmts: Vec<TxStmt>) -> DbxResult<Vec<StepResult>>
where
    C: Connector,
{
    scoped(db, move |tx| {
        Box::pin(async move {
            let mut results = Vec::with_capacity(stmts.len());
            for stmt in &stmts {
                results.push(stmt.exec(&*tx).await?);
            }
            tx.commit().await?;
            tracing::debug!(target: "dbx.tx", steps = results.len(), "transaction committed");
            Ok(results)
        })
    })
    .await
}

/// Run `f` inside a transaction: commit on `Ok`, roll back on `Err` or panic.
pub async fn transaction<C, T, F>(db: &C, f: F) -> DbxResult<T>
where
    C: Connector,
    T: Send + 'static,
    F: for<'s> FnOnce(&'s C::Tx) -> BoxFuture<'s, DbxResult<T>> + Send + 'static,
{
    scoped(db, move |tx| {
        Box::pin(async move {
            let value = f(&*tx).await?;
            tx.commit().await?;
            tracing::debug!(target: "dbx.tx", "transaction committed");
            Ok(value)
        })
    })
    .await
}

/// Acquire a session, begin, run `body`, and close the session exactly once.
///
/// `body` is responsible for committing. Errors and panics leave the transaction
/// uncommitted; closing it rolls it back.
async fn scoped<C, T, F>(db: &C, body: F) -> DbxResult<T>
where
    C: Connector,
    T: Send + 'static,
    F: for<'s> FnOnce(&'s mut C::Tx) -> BoxFuture<'s, DbxResult<T>> + Send,
{
    let mut tx = db.session().await?;
    if let Err(err) = tx.begin().await {
        tracing::debug!(target: "dbx.tx", error = %err, "begin failed");
        close(tx).await;
        return Err(err);
    }
    tracing::debug!(target: "dbx.tx", "transaction begun");

    let result = match AssertUnwindSafe(async { body(&mut tx).await })
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(payload) => {
            let err = DbxError::from_panic(payload);
            tracing::error!(target: "dbx.tx", error = %err, "panic recovered in transaction");
            Err(err)
        }
    };

    if let Err(err) = &result {
        tracing::debug!(target: "dbx.tx", error = %err, "transaction aborted");
    }
    close(tx).await;
    result
}

async fn close<S: TxSession>(tx: S) {
    if let Err(err) = tx.close().await {
        tracing::warn!(target: "dbx.tx", error = %err, "failed to close transaction session");
    }
}
