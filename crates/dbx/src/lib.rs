//! # dbx
//!
//! Composable SQL conditions, a by-value statement builder, and step-driven
//! transactions over an explicit session.
//!
//! ## Features
//!
//! - **Condition trees**: [`Cond`] nodes compile to a parenthesized `WHERE` fragment
//!   plus ordered bind values; empty combinators vanish instead of producing `()`
//! - **Statement builder**: [`Stmt`] carries table, conditions, joins, ordering,
//!   grouping, limits and SET clauses, and compiles in the executing session's [`Dialect`]
//! - **Transaction pipelines**: chains of [`tx::Step`]s run in one transaction, each
//!   continuation deciding what runs next; errors and panics never commit
//! - **No global connection**: every terminal call takes a [`Session`] or [`Connector`]
//!
//! ## Statements
//!
//! ```ignore
//! use dbx::{Cond, table};
//!
//! let active: Vec<dbx::Row> = table("users")
//!     .eq("status", "active")
//!     .cond(Cond::or([Cond::eq("role", "admin"), Cond::op("age", ">", 30)]))
//!     .limit(10)
//!     .list(&db)
//!     .await?;
//! ```
//!
//! ## Transactions
//!
//! ```ignore
//! use dbx::tx::{Flow, Step, run_tx};
//!
//! run_tx(&db, Step::get(table("goods").eq("id", 7)).then(|ctx| {
//!     Box::pin(async move {
//!         if !ctx.result().found() {
//!             return Ok(Flow::Rollback);
//!         }
//!         Ok(Flow::Next(Step::update_set(
//!             table("goods").set_expr("stock", "stock - 1").eq("id", 7),
//!         )))
//!     })
//! }))
//! .await?;
//! ```

pub mod cond;
pub mod config;
pub mod dialect;
pub mod error;
pub mod row;
pub mod session;
pub mod set;
pub mod stmt;
pub mod tx;
pub mod value;

#[cfg(feature = "postgres")]
pub mod pg;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
mod test_support;

pub use cond::Cond;
pub use config::DbxConfig;
pub use dialect::{Dialect, Placeholder};
pub use error::{DbxError, DbxResult};
pub use row::{FromRow, Record, Row, ToRecord};
pub use session::{Connector, RowStream, Session, TxSession};
pub use set::{Set, compile_sets};
pub use stmt::{Compiled, Join, JoinKind, RowIter, Stmt, get_by, raw_sql, table};
pub use tx::{Args, Flow, Step, StepCtx, StepResult, TxOutcome, TxRunner, TxStmt, run_tx, transaction};
pub use value::{FromValue, IntoValues, Value};

#[cfg(feature = "pool")]
pub use pool::{PgDb, PgTx, create_pool, create_pool_with_config, create_pool_with_tls};
