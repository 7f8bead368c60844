//! tokio-postgres backend.
//!
//! [`Value`](crate::Value) binds as a `ToSql` parameter, driver rows decode into
//! [`Row`](crate::Row) by column type, and tokio-postgres clients and transactions
//! implement [`Session`](crate::Session) with [`Dialect::POSTGRES`](crate::Dialect::POSTGRES).

mod session;
mod value;

#[cfg(feature = "pool")]
pub(crate) use session::{PgRows, bind};
