//! A pure-Rust MySQL wire protocol client and fiber-friendly connection pool.
//!
//! This crate speaks the MySQL client/server protocol directly over a socket
//! capability (no native MySQL library is linked) and exposes a SQL execution
//! API (`Commander`) plus a lock-free connection pool (`pool::Pool`).
//!
//! Out of scope: LOAD DATA LOCAL, the GEOMETRY type family, replication /
//! binlog protocol, X Protocol, server-role failover, and XA transactions.

#![forbid(unsafe_code)]
#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod error;

#[macro_use]
mod io;

pub mod auth;
pub mod circuit_breaker;
pub mod column;
pub mod commander;
pub mod connection;
pub mod net;
pub mod options;
pub mod pool;
pub mod protocol;
pub mod result_set;
pub mod statement;
pub mod types;

pub use column::ColumnDefinition;
pub use commander::Commander;
pub use connection::MySqlConnection;
pub use error::{Error, Result};
pub use options::{DataSourceOptions, SslMode};
pub use pool::{DataSource, Pool};
pub use result_set::ResultSet;
pub use statement::{CallableStatement, PreparedStatement, Savepoint};

// Named lifetimes used across the crate:
//   'c: the connection borrow held for the duration of a single command
//   'q: the SQL text and bound arguments passed into a query
