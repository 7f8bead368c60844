//! Recording session doubles for unit tests.

use crate::dialect::Dialect;
use crate::error::{DbxError, DbxResult};
use crate::row::Row;
use crate::session::{Connector, Session, TxSession};
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    calls: Vec<(String, Vec<Value>)>,
    events: Vec<String>,
    rows: VecDeque<Vec<Row>>,
    affected: VecDeque<u64>,
    fail_on: Vec<String>,
    fail_begin: bool,
}

/// Records every statement; replies with queued rows / affected counts.
///
/// Without a queued reply a query returns no rows and an execute affects one row.
/// SQL containing a `fail_on` fragment fails with a driver error.
#[derive(Clone, Default)]
pub(crate) struct MockSession {
    state: Arc<Mutex<MockState>>,
    dialect: Dialect,
}

impl MockSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().rows.push_back(rows);
        self
    }

    pub(crate) fn push_affected(&self, n: u64) -> &Self {
        self.state().affected.push_back(n);
        self
    }

    pub(crate) fn fail_on(&self, fragment: &str) -> &Self {
        self.state().fail_on.push(fragment.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.state().calls.clone()
    }

    pub(crate) fn sqls(&self) -> Vec<String> {
        self.state().calls.iter().map(|(s, _)| s.clone()).collect()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    fn record(&self, sql: &str, params: &[Value]) -> DbxResult<()> {
        let mut state = self.state();
        state.calls.push((sql.to_string(), params.to_vec()));
        if state.fail_on.iter().any(|f| sql.contains(f.as_str())) {
            return Err(DbxError::driver(format!("failed: {sql}")));
        }
        Ok(())
    }

    fn event(&self, name: &str) {
        self.state().events.push(name.to_string());
    }
}

impl Session for MockSession {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbxResult<Vec<Row>> {
        self.record(sql, params)?;
        Ok(self.state().rows.pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbxResult<u64> {
        self.record(sql, params)?;
        Ok(self.state().affected.pop_front().unwrap_or(1))
    }
}

/// Transaction session over a shared [`MockSession`].
pub(crate) struct MockTx {
    inner: MockSession,
}

impl Session for MockTx {
    fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbxResult<Vec<Row>> {
        self.inner.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> DbxResult<u64> {
        self.inner.execute(sql, params).await
    }
}

impl TxSession for MockTx {
    async fn begin(&mut self) -> DbxResult<()> {
        if self.inner.state().fail_begin {
            return Err(DbxError::Connection("begin refused".into()));
        }
        self.inner.event("begin");
        Ok(())
    }

    async fn commit(&mut self) -> DbxResult<()> {
        self.inner.event("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> DbxResult<()> {
        self.inner.event("rollback");
        Ok(())
    }

    async fn close(self) -> DbxResult<()> {
        self.inner.event("close");
        Ok(())
    }
}

/// Connector handing out [`MockTx`] sessions that share one recording state.
#[derive(Clone, Default)]
pub(crate) struct MockDb {
    pub(crate) session: MockSession,
}

impl MockDb {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_begin(&self) {
        self.session.state().fail_begin = true;
    }

    pub(crate) fn sqls(&self) -> Vec<String> {
        self.session.sqls()
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.session.events()
    }
}

impl Connector for MockDb {
    type Tx = MockTx;

    async fn session(&self) -> DbxResult<MockTx> {
        Ok(MockTx {
            inner: self.session.clone(),
        })
    }
}
