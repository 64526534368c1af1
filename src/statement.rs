//! §3/§4.6: the three statement flavours, callable statements, and
//! savepoints. Execution itself is driven by [`crate::connection::MySqlConnection`]
//! (the only backend this crate has); this module owns parameter binding and
//! the request-side state the three flavours share.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::connection::MySqlConnection;
use crate::protocol::{statement::ComStmtPrepareOk, TypeId};
use crate::result_set::ResultSet;
use crate::types::{Codec, MySqlTypeInfo};

/// A single bound parameter, already encoded to wire bytes. `bytes == None`
/// means SQL NULL: every [`Codec`] impl in this crate encodes to a non-empty
/// buffer for a non-NULL value (even an empty string costs one length byte),
/// so an empty encode is NULL's signature rather than a distinct case to
/// track.
#[derive(Debug, Clone)]
pub(crate) struct BoundParam {
    pub(crate) type_id: TypeId,
    pub(crate) unsigned: bool,
    pub(crate) bytes: Option<Vec<u8>>,
}

impl BoundParam {
    fn bind<T: Codec>(value: &T) -> Self {
        let mut buf = Vec::new();
        value.encode(&mut buf);
        let MySqlTypeInfo {
            type_id,
            is_unsigned,
            ..
        } = T::type_info();

        BoundParam {
            type_id,
            unsigned: is_unsigned,
            bytes: if buf.is_empty() { None } else { Some(buf) },
        }
    }
}

/// Which request shape a [`PreparedStatement`] will use on the wire (§4.6).
/// Selected by how the statement was constructed, not exposed as a public
/// choice the caller threads through every call.
#[derive(Debug, Clone)]
pub(crate) enum StatementKind {
    /// `COM_QUERY`, no placeholders.
    Direct,
    /// `?`-placeholders substituted into literal SQL client-side, sent as
    /// `COM_QUERY`.
    ClientPrepared,
    /// `COM_STMT_PREPARE` once, `COM_STMT_EXECUTE` per call.
    ServerPrepared {
        statement_id: u32,
        param_count: u16,
        column_count: u16,
    },
}

/// What executing a statement produced: either an update count (INSERT,
/// UPDATE, DELETE, DDL) or a result set (SELECT, SHOW, …).
#[derive(Debug)]
pub enum StatementOutcome {
    Update {
        affected_rows: u64,
        last_insert_id: u64,
    },
    Rows(ResultSet),
}

/// One of the three statement flavours from §4.6, sharing one parameter-
/// binding surface and one batch mechanism.
pub struct PreparedStatement {
    pub(crate) kind: StatementKind,
    pub(crate) sql: String,
    pub(crate) params: Vec<Option<BoundParam>>,
    pub(crate) batch: Vec<Vec<Option<BoundParam>>>,
    pub(crate) want_generated_keys: bool,
}

impl PreparedStatement {
    /// A direct statement: `sql` is sent verbatim, no placeholders.
    pub fn direct(sql: impl Into<String>) -> Self {
        PreparedStatement {
            kind: StatementKind::Direct,
            sql: sql.into(),
            params: Vec::new(),
            batch: Vec::new(),
            want_generated_keys: false,
        }
    }

    /// A client-prepared statement: `sql` may contain `?` placeholders,
    /// substituted into literal SQL before the request is sent. No server
    /// round trip is spent preparing it.
    pub fn client_side(sql: impl Into<String>) -> Self {
        PreparedStatement {
            kind: StatementKind::ClientPrepared,
            sql: sql.into(),
            params: Vec::new(),
            batch: Vec::new(),
            want_generated_keys: false,
        }
    }

    pub(crate) fn from_prepare_ok(sql: String, ok: ComStmtPrepareOk) -> Self {
        PreparedStatement {
            kind: StatementKind::ServerPrepared {
                statement_id: ok.statement_id,
                param_count: ok.num_params,
                column_count: ok.num_columns,
            },
            sql,
            params: Vec::new(),
            batch: Vec::new(),
            want_generated_keys: false,
        }
    }

    pub fn is_server_prepared(&self) -> bool {
        matches!(self.kind, StatementKind::ServerPrepared { .. })
    }

    pub(crate) fn statement_id(&self) -> Option<u32> {
        match self.kind {
            StatementKind::ServerPrepared { statement_id, .. } => Some(statement_id),
            _ => None,
        }
    }

    /// Binds `value` to the 1-based parameter `index`. Setting the same
    /// index twice replaces the prior value, including its type code.
    pub fn set<T: Codec>(&mut self, index: usize, value: T) -> crate::Result<&mut Self> {
        if index == 0 {
            return Err(crate::Error::misuse("parameter index is 1-based; 0 is invalid"));
        }
        let slot = index - 1;
        if self.params.len() <= slot {
            self.params.resize_with(slot + 1, || None);
        }
        self.params[slot] = Some(BoundParam::bind(&value));
        Ok(self)
    }

    pub fn request_generated_keys(&mut self, yes: bool) -> &mut Self {
        self.want_generated_keys = yes;
        self
    }

    /// Snapshots the current bindings as one row of a batch; current
    /// bindings are left in place so the caller can overwrite only the
    /// parameters that differ before the next `add_batch`/`execute`.
    pub fn add_batch(&mut self) {
        self.batch.push(self.params.clone());
    }

    pub(crate) fn params_for_execute(&self) -> crate::Result<Vec<BoundParam>> {
        materialize(&self.params)
    }

    pub async fn execute(&mut self, conn: &mut MySqlConnection) -> crate::Result<StatementOutcome> {
        conn.execute_statement(self).await
    }

    /// Runs every row added via [`PreparedStatement::add_batch`]. Fails fast:
    /// on the first statement that fails, the returned error's
    /// `update_counts` marks that row and every row after it with `-3`
    /// (§9 open question resolution).
    pub async fn execute_batch(&mut self, conn: &mut MySqlConnection) -> crate::Result<Vec<i64>> {
        conn.execute_batch(self).await
    }

    /// Deallocates a server-side statement. A no-op for the other two
    /// flavours. Must be called before the owning connection returns to a
    /// pool (§3 PreparedStatement lifetime note).
    pub async fn close(self, conn: &mut MySqlConnection) -> crate::Result<()> {
        conn.close_statement(self).await
    }
}

pub(crate) fn materialize(params: &[Option<BoundParam>]) -> crate::Result<Vec<BoundParam>> {
    params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            p.clone()
                .ok_or_else(|| crate::Error::misuse(format!("parameter {} was not set", i + 1)))
        })
        .collect()
}

/// Whichever of [`CallableStatement::register_out_parameter`] or
/// [`CallableStatement::set`] was called most recently for a given index
/// decides both whether it is an OUT parameter and, if registered, its
/// declared type (§4.6).
enum OutDirective {
    Registered(TypeId),
    BoundAsIn,
}

/// `CALL proc(...)` with IN/OUT/INOUT parameters (§4.6). Built on a
/// server-prepared statement: MySQL reports OUT/INOUT values as a synthetic
/// final result set when `SERVER_PS_OUT_PARAMS` is negotiated, which this
/// crate always requests (see [`crate::protocol::Capabilities::client_default`]).
pub struct CallableStatement {
    pub(crate) inner: PreparedStatement,
    out: std::collections::HashMap<usize, OutDirective>,
    out_values: Vec<Option<BoundParam>>,
}

impl CallableStatement {
    pub(crate) fn new(inner: PreparedStatement) -> Self {
        CallableStatement {
            inner,
            out: std::collections::HashMap::new(),
            out_values: Vec::new(),
        }
    }

    /// Builds a `CALL procedure(...)` statement. Server-prepared on first
    /// [`CallableStatement::execute`]: `SERVER_PS_OUT_PARAMS` only applies to
    /// prepared statements, so unlike plain queries there is no direct-`COM_QUERY`
    /// flavour to fall back to.
    pub fn call(sql: impl Into<String>) -> Self {
        CallableStatement::new(PreparedStatement::client_side(sql))
    }

    pub fn set<T: Codec>(&mut self, index: usize, value: T) -> crate::Result<&mut Self> {
        self.inner.set(index, value)?;
        self.out.insert(index, OutDirective::BoundAsIn);
        Ok(self)
    }

    pub fn register_out_parameter(&mut self, index: usize, type_id: TypeId) -> &mut Self {
        self.out.insert(index, OutDirective::Registered(type_id));
        self
    }

    /// 1-based indices of every OUT/INOUT parameter, in ascending order —
    /// the order MySQL appends them to the synthetic OUT-parameter result set.
    pub(crate) fn out_param_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.out.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Parameters to send with `COM_STMT_EXECUTE`: bound IN/INOUT values as
    /// set, and a NULL placeholder for any registered-but-unbound OUT-only
    /// index (MySQL still expects a value in its slot on the wire).
    pub(crate) fn params_for_call(&self) -> crate::Result<Vec<BoundParam>> {
        let mut indices: Vec<usize> = self
            .inner
            .params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_some())
            .map(|(i, _)| i)
            .collect();
        for &index in self.out.keys() {
            if index == 0 {
                return Err(crate::Error::misuse("parameter index is 1-based; 0 is invalid"));
            }
            indices.push(index - 1);
        }
        indices.sort_unstable();
        indices.dedup();

        let len = indices.len();
        let mut params = vec![None; len];
        for (slot, index0) in indices.iter().enumerate() {
            params[slot] = match self.inner.params.get(*index0).cloned().flatten() {
                Some(bound) => Some(bound),
                None => Some(BoundParam {
                    type_id: TypeId::NULL,
                    unsigned: false,
                    bytes: None,
                }),
            };
        }

        materialize(&params)
    }

    pub async fn execute(&mut self, conn: &mut MySqlConnection) -> crate::Result<Vec<ResultSet>> {
        conn.call(self).await
    }

    pub(crate) fn store_out_values(&mut self, values: Vec<Option<BoundParam>>) {
        self.out_values = values;
    }

    /// 1-based. Only meaningful after [`CallableStatement::execute`] has run.
    pub fn get_out<T: Codec>(&self, index: usize) -> crate::Result<T> {
        if index == 0 || index > self.out_values.len() {
            return Err(crate::Error::ColumnIndexOutOfBounds {
                index,
                len: self.out_values.len(),
            });
        }

        let bound = &self.out_values[index - 1];
        let info = T::type_info();
        let raw = crate::types::RawValue {
            info,
            format: crate::types::Format::Binary,
            bytes: bound.as_ref().and_then(|b| b.bytes.as_deref()),
        };
        T::decode(&raw)
    }
}

static SAVEPOINT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// A `SAVEPOINT` name plus a private identity token, so two savepoints
/// constructed with the same textual name still compare unequal (§8
/// "savepoint distinctness").
#[derive(Debug, Clone)]
pub struct Savepoint {
    identity: u64,
    name: String,
}

impl Savepoint {
    /// Generates a UUID v4 name (`sp_<32 hex chars>`, spec §3) when `name`
    /// is `None`.
    pub fn new(name: Option<String>) -> Self {
        let name = name.unwrap_or_else(random_savepoint_name);
        Savepoint {
            identity: SAVEPOINT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always fails: this client does not assign numeric savepoint ids.
    pub fn id(&self) -> crate::Result<u64> {
        Err(crate::Error::feature_not_supported(
            "numeric savepoint identifiers are not supported",
        ))
    }
}

impl PartialEq for Savepoint {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Savepoint {}

fn random_savepoint_name() -> String {
    // `simple()` omits the hyphens a bare `SAVEPOINT <name>` statement can't
    // carry as an unquoted identifier.
    format!("sp_{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_same_index_twice_replaces_value() {
        let mut stmt = PreparedStatement::client_side("update t set a = ? where id = ?");
        stmt.set(1, 10i32).unwrap();
        stmt.set(1, 20i32).unwrap();
        let params = stmt.params_for_execute();
        assert!(params.is_err(), "index 2 was never set");

        stmt.set(2, 1i32).unwrap();
        let params = stmt.params_for_execute().unwrap();
        assert_eq!(params[0].bytes.as_deref(), Some(&20i32.to_le_bytes()[..]));
    }

    #[test]
    fn unset_parameter_fails_materialize() {
        let mut stmt = PreparedStatement::client_side("select ?");
        stmt.set(2, 1i32).unwrap();
        let err = stmt.params_for_execute().unwrap_err();
        assert!(matches!(err, crate::Error::Misuse { .. }));
    }

    #[test]
    fn savepoints_with_same_name_are_distinct() {
        let a = Savepoint::new(Some("s".into()));
        let b = Savepoint::new(Some("s".into()));
        assert_eq!(a.name(), b.name());
        assert_ne!(a, b);
    }

    #[test]
    fn savepoint_numeric_id_is_unsupported() {
        let s = Savepoint::new(None);
        assert!(s.id().is_err());
    }

    #[test]
    fn generated_savepoint_name_is_nonempty() {
        let s = Savepoint::new(None);
        assert!(s.name().starts_with("sp_"));
    }
}
