use super::args::Args;
use crate::error::DbxResult;
use crate::row::{Record, Row};
use crate::session::Session;
use crate::stmt::Stmt;
use crate::value::{FromValue, IntoValues, Value};
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// The statement a step executes.
#[derive(Debug, Clone)]
pub enum TxStmt {
    /// Executes nothing; the continuation runs with [`StepResult::None`].
    Void,
    Get(Stmt),
    List(Stmt),
    /// Insert the record (the step's bean).
    Insert(Stmt, Record),
    /// Update from the record (the step's bean).
    Update(Stmt, Record),
    UpdateSet(Stmt),
    Delete(Stmt),
    Count(Stmt),
    /// Sum of a column.
    Sum(Stmt, String),
    /// Raw SQL with `?` placeholders.
    Exec { sql: String, args: Vec<Value> },
}

impl TxStmt {
    pub fn exec_sql(sql: impl Into<String>, args: impl IntoValues) -> Self {
        TxStmt::Exec {
            sql: sql.into(),
            args: args.into_values(),
        }
    }

    /// The record an insert/update writes.
    pub fn bean(&self) -> Option<&Record> {
        match self {
            TxStmt::Insert(_, record) | TxStmt::Update(_, record) => Some(record),
            _ => None,
        }
    }

    /// Execute against a session.
    pub async fn exec<S: Session>(&self, session: &S) -> DbxResult<StepResult> {
        Ok(match self {
            TxStmt::Void => StepResult::None,
            TxStmt::Get(stmt) => StepResult::Found(stmt.get_row(session).await?),
            TxStmt::List(stmt) => StepResult::Rows(stmt.list_rows(session).await?),
            TxStmt::Insert(stmt, record) => StepResult::Affected(stmt.insert(session, record).await?),
            TxStmt::Update(stmt, record) => StepResult::Affected(stmt.update(session, record).await?),
            TxStmt::UpdateSet(stmt) => StepResult::Affected(stmt.update_set(session).await?),
            TxStmt::Delete(stmt) => {
                stmt.delete(session).await?;
                StepResult::None
            }
            TxStmt::Count(stmt) => StepResult::Count(stmt.count(session).await?),
            TxStmt::Sum(stmt, column) => StepResult::Sum(stmt.sum(session, column).await?),
            TxStmt::Exec { sql, args } => {
                let sql = session.dialect().finish(sql);
                tracing::debug!(target: "dbx.sql", op = "exec", sql = %sql, param_count = args.len(), "execute");
                StepResult::Affected(session.execute(&sql, args).await?)
            }
        })
    }
}

/// What a step's statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    None,
    /// Point lookup: the row, if found.
    Found(Option<Row>),
    Rows(Vec<Row>),
    Affected(u64),
    Count(i64),
    Sum(f64),
}

impl StepResult {
    pub fn found(&self) -> bool {
        matches!(self, StepResult::Found(Some(_)))
    }

    pub fn row(&self) -> Option<&Row> {
        match self {
            StepResult::Found(row) => row.as_ref(),
            _ => None,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            StepResult::Rows(rows) => rows,
            StepResult::Found(Some(row)) => std::slice::from_ref(row),
            _ => &[],
        }
    }

    pub fn affected(&self) -> u64 {
        match self {
            StepResult::Affected(n) => *n,
            _ => 0,
        }
    }
}

/// What a continuation asks the pipeline to do next.
pub enum Flow<S> {
    Next(Step<S>),
    Commit,
    Rollback,
}

impl<S> fmt::Debug for Flow<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Next(step) => f.debug_tuple("Next").field(step).finish(),
            Flow::Commit => f.write_str("Commit"),
            Flow::Rollback => f.write_str("Rollback"),
        }
    }
}

/// A step continuation: inspects the finished step and decides what runs next.
pub type Continuation<S> =
    Arc<dyn for<'a> Fn(StepCtx<'a, S>) -> BoxFuture<'a, DbxResult<Flow<S>>> + Send + Sync>;

pub(crate) enum StepKind {
    Exec(TxStmt),
    CommitNow,
    RollbackNow,
}

pub(crate) enum Then<S> {
    /// No continuation: commit after the statement.
    Commit,
    Call(Continuation<S>),
    /// Continuation registered on the runner under a key.
    Named(String),
}

/// One unit of work in a transaction pipeline.
pub struct Step<S> {
    pub(crate) kind: StepKind,
    pub(crate) args: Args,
    pub(crate) then: Then<S>,
}

impl<S> Step<S> {
    pub fn new(stmt: TxStmt) -> Self {
        Self {
            kind: StepKind::Exec(stmt),
            args: Args::new(),
            then: Then::Commit,
        }
    }

    /// A step that executes nothing.
    pub fn void() -> Self {
        Self::new(TxStmt::Void)
    }

    pub fn get(stmt: Stmt) -> Self {
        Self::new(TxStmt::Get(stmt))
    }

    pub fn list(stmt: Stmt) -> Self {
        Self::new(TxStmt::List(stmt))
    }

    pub fn insert(stmt: Stmt, bean: Record) -> Self {
        Self::new(TxStmt::Insert(stmt, bean))
    }

    pub fn update(stmt: Stmt, bean: Record) -> Self {
        Self::new(TxStmt::Update(stmt, bean))
    }

    pub fn update_set(stmt: Stmt) -> Self {
        Self::new(TxStmt::UpdateSet(stmt))
    }

    pub fn delete(stmt: Stmt) -> Self {
        Self::new(TxStmt::Delete(stmt))
    }

    pub fn exec_sql(sql: impl Into<String>, args: impl IntoValues) -> Self {
        Self::new(TxStmt::exec_sql(sql, args))
    }

    /// Marker: commit when reached, without executing anything.
    pub fn commit_now() -> Self {
        Self {
            kind: StepKind::CommitNow,
            args: Args::new(),
            then: Then::Commit,
        }
    }

    /// Marker: roll back when reached, without executing anything.
    pub fn rollback_now() -> Self {
        Self {
            kind: StepKind::RollbackNow,
            args: Args::new(),
            then: Then::Commit,
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.set(key, value);
        self
    }

    /// Merge `args` into this step's arguments.
    pub fn args(mut self, args: Args) -> Self {
        self.args.merge(&args);
        self
    }

    /// Continue with `f` once the statement has run.
    ///
    /// ```ignore
    /// Step::get(table("users").eq("id", 1)).then(|ctx| {
    ///     Box::pin(async move {
    ///         if !ctx.result().found() {
    ///             return Ok(Flow::Rollback);
    ///         }
    ///         Ok(Flow::Next(Step::update_set(table("users").set("seen", true).eq("id", 1))))
    ///     })
    /// })
    /// ```
    pub fn then<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(StepCtx<'a, S>) -> BoxFuture<'a, DbxResult<Flow<S>>> + Send + Sync + 'static,
    {
        self.then = Then::Call(Arc::new(f));
        self
    }

    /// Continue with the handler registered under `key` on the runner.
    pub fn then_named(mut self, key: impl Into<String>) -> Self {
        self.then = Then::Named(key.into());
        self
    }
}

impl<S> From<TxStmt> for Step<S> {
    fn from(stmt: TxStmt) -> Self {
        Step::new(stmt)
    }
}

impl<S> fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind: &dyn fmt::Debug = match &self.kind {
            StepKind::Exec(stmt) => stmt,
            StepKind::CommitNow => &"CommitNow",
            StepKind::RollbackNow => &"RollbackNow",
        };
        let then = match &self.then {
            Then::Commit => "commit".to_string(),
            Then::Call(_) => "<continuation>".to_string(),
            Then::Named(key) => format!("handler '{key}'"),
        };
        f.debug_struct("Step")
            .field("kind", kind)
            .field("args", &self.args)
            .field("then", &then)
            .finish()
    }
}

/// Read-only view of a finished step handed to its continuation.
pub struct StepCtx<'a, S> {
    pub(crate) session: &'a S,
    pub(crate) stmt: &'a TxStmt,
    pub(crate) result: StepResult,
    pub(crate) args: Args,
}

impl<'a, S> StepCtx<'a, S> {
    /// The active transaction session.
    pub fn session(&self) -> &'a S {
        self.session
    }

    pub fn result(&self) -> &StepResult {
        &self.result
    }

    pub fn into_result(self) -> StepResult {
        self.result
    }

    pub fn stmt(&self) -> &TxStmt {
        self.stmt
    }

    /// The record the step wrote, for insert/update steps.
    pub fn bean(&self) -> Option<&Record> {
        self.stmt.bean()
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn arg_as<T: FromValue>(&self, key: &str) -> DbxResult<T> {
        self.args.get_as(key)
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Every argument of this step, for carrying forward.
    pub fn copy_args(&self) -> Args {
        self.args.clone()
    }
}
