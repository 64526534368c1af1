//! The `Commander` trait: one SQL-execution surface covering all three
//! statement flavours from §4.6 (direct, client-prepared, server-prepared),
//! implemented by [`crate::connection::MySqlConnection`] — the crate's only
//! backend, so this stays a single trait rather than the three
//! flavour-specific traits a multi-backend driver would need (REDESIGN
//! FLAGS: "one interface, one backend").
//!
//! Methods are native `async fn`s in the trait (stabilised in 1.75, this
//! crate's MSRV) rather than `#[async_trait]`-boxed futures: `Commander` is
//! never used as a trait object, so there's no need to pay the allocation
//! `async-trait` exists to work around.

use crate::result_set::ResultSet;
use crate::statement::{CallableStatement, PreparedStatement, StatementOutcome};

pub trait Commander: Send {
    /// Runs `sql` as a direct statement (§4.6, no placeholders) and returns
    /// its result set. Fails with `Error::Misuse` if the server reports an
    /// update count instead of rows.
    async fn query(&mut self, sql: &str) -> crate::Result<ResultSet>;

    /// Like [`Commander::query`], but requires exactly one row and
    /// positions the cursor on it. Fails with `Error::RowNotFound` if the
    /// result set is empty.
    async fn query_one(&mut self, sql: &str) -> crate::Result<ResultSet>;

    /// Runs `sql` as a direct statement and returns the affected-row count.
    /// Fails with `Error::Misuse` if the server returned rows instead.
    async fn execute(&mut self, sql: &str) -> crate::Result<u64>;

    /// `COM_STMT_PREPARE`s `sql` server-side (§4.6 "server prepared").
    async fn prepare(&mut self, sql: &str) -> crate::Result<PreparedStatement>;

    /// Prepares `sql`, lets `bind` set its parameters, and executes it in
    /// one call — the common case where a prepared statement is used once.
    async fn prepare_and_execute<F>(
        &mut self,
        sql: &str,
        bind: F,
    ) -> crate::Result<StatementOutcome>
    where
        F: FnOnce(&mut PreparedStatement) -> crate::Result<()> + Send;

    /// Executes a `CALL procedure(...)` statement, returning every result
    /// set the procedure produced plus, if `SERVER_PS_OUT_PARAMS` was
    /// negotiated, a synthetic final result set of OUT/INOUT values (§4.6).
    async fn call(&mut self, stmt: &mut CallableStatement) -> crate::Result<Vec<ResultSet>>;

    /// Runs every row `stmt` accumulated via
    /// [`PreparedStatement::add_batch`]. Fails fast: the first failing
    /// statement and every statement after it are reported as `-3` in the
    /// returned error's `update_counts`.
    async fn batch(&mut self, stmt: &mut PreparedStatement) -> crate::Result<Vec<i64>>;
}
