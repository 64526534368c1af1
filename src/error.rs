//! Error taxonomy.
//!
//! Every variant carries enough context to reconstruct a SQLSTATE class for
//! callers that bridge into JDBC-style error handling: `invalid_authorization`
//! (28xxx), `transient_connection` (08xxx), `data` (22xxx),
//! `integrity_constraint_violation` (23xxx), `transaction_rollback` (40xxx),
//! `feature_not_supported` (0Axxx), `syntax` (42xxx), `batch_update`,
//! `protocol_violation`, `timeout`, `misuse`, and `configuration`.

use std::fmt;
use std::io;
use std::time::Duration;

/// A specialized [`Result`](std::result::Result) for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// SQL state, the server's vendor-specific numeric code, and (when the
/// caller had one in hand) the SQL text responsible — spec §7's "each error
/// kind carries SQL state, vendor code, SQL text, and the parameter table
/// when available". Every field is `None` for errors this client raises
/// itself rather than learns from a server ERR packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerErrorDetail {
    pub sql_state: Option<String>,
    pub vendor_code: Option<u16>,
    pub sql_text: Option<String>,
}

/// The error type produced by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `28xxx` — the server rejected our credentials.
    #[error("access denied: {message}")]
    InvalidAuthorization {
        message: String,
        detail: ServerErrorDetail,
    },

    /// `08xxx` — the connection could not be established, reset, or the
    /// circuit breaker is refusing new work.
    #[error("connection error: {message}")]
    TransientConnection {
        message: String,
        detail: ServerErrorDetail,
    },

    /// `22xxx` — truncation, an out-of-range value, or an invalid datetime.
    #[error("data error: {message}")]
    Data {
        message: String,
        detail: ServerErrorDetail,
    },

    /// `23xxx` — a constraint (unique, foreign key, not-null, check) was violated.
    #[error("integrity constraint violation ({}): {message}", detail.sql_state.as_deref().unwrap_or(""))]
    IntegrityConstraintViolation {
        message: String,
        detail: ServerErrorDetail,
    },

    /// `40xxx` — the server rolled the transaction back (deadlock, lock-wait timeout).
    #[error("transaction rolled back ({}): {message}", detail.sql_state.as_deref().unwrap_or(""))]
    TransactionRollback {
        message: String,
        detail: ServerErrorDetail,
    },

    /// `0Axxx` — the caller asked for functionality this client does not implement
    /// (GEOMETRY types, numeric savepoint ids, LOAD DATA LOCAL, …).
    #[error("feature not supported: {message}")]
    FeatureNotSupported {
        message: String,
        detail: ServerErrorDetail,
    },

    /// `42xxx` — the server rejected the SQL text itself.
    #[error("syntax error ({}): {message}", detail.sql_state.as_deref().unwrap_or(""))]
    Syntax {
        message: String,
        detail: ServerErrorDetail,
    },

    /// A batch failed partway through; `update_counts[i] == -3` marks the failed
    /// statement and every statement after it that was abandoned. `detail`
    /// is copied from the error that stopped the batch.
    #[error("batch update failed: {message}")]
    BatchUpdate {
        message: String,
        update_counts: Vec<i64>,
        detail: ServerErrorDetail,
    },

    /// The server sent a packet we did not expect for the current protocol
    /// state. The owning connection is poisoned and must not return to a pool.
    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },

    /// A deadline elapsed. `kind` distinguishes read/validation/acquisition
    /// timeouts since callers often need to react differently to each.
    #[error("{kind} timed out after {elapsed:?}")]
    Timeout {
        kind: TimeoutKind,
        elapsed: Duration,
    },

    /// The caller asked for something that is never valid, independent of
    /// server state: a savepoint while auto-commit is on, an unset parameter,
    /// an empty host, reading a textual savepoint's id, and so on. Raised
    /// entirely client-side before any server round trip, so there is no
    /// SQLSTATE/vendor code to carry.
    #[error("misuse: {message}")]
    Misuse { message: String },

    /// A `DataSourceOptions` value could not be turned into a connection
    /// attempt: a malformed URL, an out-of-range port, an unsupported TLS
    /// mode. Raised by `DataSourceOptionsBuilder::build()` before a
    /// connection is ever attempted, so there is no SQLSTATE/vendor code to
    /// carry.
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// Low-level I/O failure underneath the socket capability.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The circuit breaker is open and is failing calls fast.
    #[error("circuit breaker is open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// No rows were returned by a query that expected exactly one.
    #[error("no rows returned")]
    RowNotFound,

    /// A column was not present in a row by that name.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A column index was out of bounds for the row's arity.
    #[error("column index {index} out of bounds (row has {len} columns)")]
    ColumnIndexOutOfBounds { index: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Read,
    Validation,
    Acquisition,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeoutKind::Read => "read",
            TimeoutKind::Validation => "validation",
            TimeoutKind::Acquisition => "connection acquisition",
        })
    }
}

impl Error {
    pub(crate) fn protocol(message: impl Into<String>) -> Error {
        Error::ProtocolViolation {
            message: message.into(),
        }
    }

    pub(crate) fn misuse(message: impl Into<String>) -> Error {
        Error::Misuse {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Error {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// A `22xxx`-shaped error this client raises itself (an invalid literal,
    /// a malformed column value) rather than learns from the server, so
    /// `detail` is empty.
    pub(crate) fn data(message: impl Into<String>) -> Error {
        Error::Data {
            message: message.into(),
            detail: ServerErrorDetail::default(),
        }
    }

    pub(crate) fn transient_connection(message: impl Into<String>) -> Error {
        Error::TransientConnection {
            message: message.into(),
            detail: ServerErrorDetail::default(),
        }
    }

    pub(crate) fn feature_not_supported(message: impl Into<String>) -> Error {
        Error::FeatureNotSupported {
            message: message.into(),
            detail: ServerErrorDetail::default(),
        }
    }

    /// Wraps the error that stopped a batch partway through, carrying its
    /// message and server detail (if any) alongside the partial counts.
    pub(crate) fn batch_update(cause: Error, update_counts: Vec<i64>) -> Error {
        let detail = cause.detail().cloned().unwrap_or_default();
        Error::BatchUpdate {
            message: cause.to_string(),
            update_counts,
            detail,
        }
    }

    /// Attaches the SQL text that produced this error, for the variants that
    /// carry one (spec §7's "parameter table when available" is `BatchUpdate`'s
    /// own `update_counts`, already present on that variant). A no-op on
    /// variants with no `detail` field.
    pub fn with_sql_text(mut self, sql_text: impl Into<String>) -> Error {
        if let Some(detail) = self.detail_mut() {
            detail.sql_text = Some(sql_text.into());
        }
        self
    }

    fn detail_mut(&mut self) -> Option<&mut ServerErrorDetail> {
        match self {
            Error::InvalidAuthorization { detail, .. }
            | Error::TransientConnection { detail, .. }
            | Error::Data { detail, .. }
            | Error::IntegrityConstraintViolation { detail, .. }
            | Error::TransactionRollback { detail, .. }
            | Error::FeatureNotSupported { detail, .. }
            | Error::Syntax { detail, .. }
            | Error::BatchUpdate { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// The server's SQLSTATE for this error, when it originated from an ERR
    /// packet.
    pub fn sql_state(&self) -> Option<&str> {
        self.detail().and_then(|d| d.sql_state.as_deref())
    }

    /// The server's vendor-specific numeric error code, when it originated
    /// from an ERR packet.
    pub fn vendor_code(&self) -> Option<u16> {
        self.detail().and_then(|d| d.vendor_code)
    }

    /// The SQL text that produced this error, when the caller attached one
    /// via [`Error::with_sql_text`].
    pub fn sql_text(&self) -> Option<&str> {
        self.detail().and_then(|d| d.sql_text.as_deref())
    }

    fn detail(&self) -> Option<&ServerErrorDetail> {
        match self {
            Error::InvalidAuthorization { detail, .. }
            | Error::TransientConnection { detail, .. }
            | Error::Data { detail, .. }
            | Error::IntegrityConstraintViolation { detail, .. }
            | Error::TransactionRollback { detail, .. }
            | Error::FeatureNotSupported { detail, .. }
            | Error::Syntax { detail, .. }
            | Error::BatchUpdate { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// `true` if a connection that produced this error must be evicted from
    /// the pool rather than released back to it.
    pub fn poisons_connection(&self) -> bool {
        matches!(
            self,
            Error::ProtocolViolation { .. } | Error::TransientConnection { .. } | Error::Io(_)
        )
    }

    /// Classifies a server-reported `(error_code, sql_state)` pair from an
    /// ERR packet into the corresponding variant, attaching both to `detail`.
    pub(crate) fn from_server(error_code: u16, sql_state: &str, message: &str) -> Error {
        let class = sql_state.get(0..2).unwrap_or("");
        let detail = ServerErrorDetail {
            sql_state: Some(sql_state.to_owned()),
            vendor_code: Some(error_code),
            sql_text: None,
        };
        match class {
            "28" => Error::InvalidAuthorization {
                message: message.to_owned(),
                detail,
            },
            "08" => Error::TransientConnection {
                message: message.to_owned(),
                detail,
            },
            "22" => Error::Data {
                message: message.to_owned(),
                detail,
            },
            "23" => Error::IntegrityConstraintViolation {
                message: message.to_owned(),
                detail,
            },
            "40" => Error::TransactionRollback {
                message: message.to_owned(),
                detail,
            },
            "0A" => Error::FeatureNotSupported {
                message: message.to_owned(),
                detail,
            },
            "42" => Error::Syntax {
                message: message.to_owned(),
                detail,
            },
            _ => Error::Data {
                message: format!("[{error_code}] {message}"),
                detail,
            },
        }
    }
}

/// Lazily formats a [`Error::ProtocolViolation`] so the macro can be used in
/// `.ok_or_else()` chains without constructing the `String` eagerly.
macro_rules! protocol_err {
    ($($arg:tt)*) => {
        $crate::error::Error::protocol(format!($($arg)*))
    };
}
