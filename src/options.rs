//! Connection and pool configuration (§6.2), gathered onto one immutable
//! struct so a [`crate::pool::DataSource`] and every connection it opens
//! share exactly one configuration snapshot.

use std::str::FromStr;
use std::time::Duration;

use crate::auth::AuthPlugin;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::net::SocketOptions;

/// Desired security state of the connection to the server. Mirrors
/// `MySqlSslMode` from the teacher driver; `Disabled`/`Preferred` are the
/// `None`/`Trusted` the spec's configuration table names in prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    /// Never attempt TLS, even if the server advertises it.
    Disabled,
    /// Upgrade to TLS if the server supports it; fall back to plaintext
    /// otherwise. This is the default.
    Preferred,
    /// Upgrade to TLS; fail the connection if the server doesn't support it.
    /// Accepts any server certificate.
    Required,
    /// Like `Required`, and additionally verify the server's certificate
    /// against the configured root store.
    VerifyCa,
    /// Like `VerifyCa`, and additionally verify the server's hostname
    /// against the certificate's identity.
    VerifyIdentity,
}

impl Default for SslMode {
    fn default() -> Self {
        SslMode::Preferred
    }
}

impl FromStr for SslMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "DISABLED" => SslMode::Disabled,
            "PREFERRED" => SslMode::Preferred,
            "REQUIRED" => SslMode::Required,
            "VERIFY_CA" => SslMode::VerifyCa,
            "VERIFY_IDENTITY" => SslMode::VerifyIdentity,
            other => {
                return Err(crate::Error::configuration(format!(
                    "unknown ssl mode: {other:?}"
                )))
            }
        })
    }
}

/// Immutable connection + pool configuration, validated eagerly at
/// [`DataSourceOptionsBuilder::build`] time (§8 scenario 6: an empty host or
/// an out-of-range port is rejected before any socket work happens).
#[derive(Clone)]
pub struct DataSourceOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: Option<String>,
    pub ssl: SslMode,
    pub socket_options: SocketOptions,

    pub read_timeout: Option<Duration>,
    pub allow_public_key_retrieval: bool,

    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub keepalive_time: Duration,
    pub validation_timeout: Duration,
    pub alive_bypass_window: Duration,

    pub min_connections: u32,
    pub max_connections: u32,

    pub leak_detection_threshold: Option<Duration>,
    pub maintenance_interval: Duration,
    pub adaptive_sizing: bool,
    pub adaptive_interval: Duration,

    pub connection_test_query: Option<String>,

    /// §4.12 circuit breaker tuning. Not part of the spec's §6.2
    /// configuration table (which covers the pool/connection knobs only);
    /// exposed here since the breaker wraps pool acquisition and has no
    /// other natural home.
    pub circuit_breaker: CircuitBreakerConfig,

    pub(crate) plugins: Vec<std::sync::Arc<dyn AuthPlugin>>,
}

impl std::fmt::Debug for DataSourceOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("ssl", &self.ssl)
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

impl DataSourceOptions {
    pub fn builder() -> DataSourceOptionsBuilder {
        DataSourceOptionsBuilder::new()
    }
}

/// Builder for [`DataSourceOptions`]; every setter mirrors a row of the §6.2
/// configuration table.
#[derive(Clone)]
pub struct DataSourceOptionsBuilder {
    host: String,
    port: i64,
    user: String,
    password: Option<String>,
    database: Option<String>,
    ssl: SslMode,
    socket_options: SocketOptions,
    read_timeout: Option<Duration>,
    allow_public_key_retrieval: bool,
    connection_timeout: Duration,
    idle_timeout: Option<Duration>,
    max_lifetime: Option<Duration>,
    keepalive_time: Duration,
    validation_timeout: Duration,
    alive_bypass_window: Duration,
    min_connections: u32,
    max_connections: u32,
    leak_detection_threshold: Option<Duration>,
    maintenance_interval: Duration,
    adaptive_sizing: bool,
    adaptive_interval: Duration,
    connection_test_query: Option<String>,
    circuit_breaker: CircuitBreakerConfig,
    plugins: Vec<std::sync::Arc<dyn AuthPlugin>>,
}

impl Default for DataSourceOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSourceOptionsBuilder {
    pub fn new() -> Self {
        Self {
            host: String::from("localhost"),
            port: 3306,
            user: String::from("root"),
            password: None,
            database: None,
            ssl: SslMode::default(),
            socket_options: SocketOptions::default(),
            read_timeout: None,
            allow_public_key_retrieval: false,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
            keepalive_time: Duration::from_secs(2 * 60),
            validation_timeout: Duration::from_secs(5),
            alive_bypass_window: Duration::from_millis(500),
            min_connections: 5,
            max_connections: 10,
            leak_detection_threshold: None,
            maintenance_interval: Duration::from_secs(30),
            adaptive_sizing: false,
            adaptive_interval: Duration::from_secs(60),
            connection_test_query: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            plugins: Vec::new(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Accepts an out-of-`u16`-range value so the §8 scenario 6 validation
    /// ("port -1 and port 65536 fail") can be expressed without the caller
    /// having to pre-truncate.
    pub fn port(mut self, port: impl Into<i64>) -> Self {
        self.port = port.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn ssl(mut self, mode: SslMode) -> Self {
        self.ssl = mode;
        self
    }

    pub fn socket_options(mut self, options: SocketOptions) -> Self {
        self.socket_options = options;
        self
    }

    pub fn read_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.read_timeout = timeout.into();
        self
    }

    pub fn allow_public_key_retrieval(mut self, allow: bool) -> Self {
        self.allow_public_key_retrieval = allow;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.idle_timeout = timeout.into();
        self
    }

    pub fn max_lifetime(mut self, lifetime: impl Into<Option<Duration>>) -> Self {
        self.max_lifetime = lifetime.into();
        self
    }

    pub fn keepalive_time(mut self, interval: Duration) -> Self {
        self.keepalive_time = interval;
        self
    }

    pub fn validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    pub fn alive_bypass_window(mut self, window: Duration) -> Self {
        self.alive_bypass_window = window;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn leak_detection_threshold(mut self, threshold: impl Into<Option<Duration>>) -> Self {
        self.leak_detection_threshold = threshold.into();
        self
    }

    pub fn maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    pub fn adaptive_sizing(mut self, enabled: bool, interval: Duration) -> Self {
        self.adaptive_sizing = enabled;
        self.adaptive_interval = interval;
        self
    }

    pub fn connection_test_query(mut self, query: impl Into<String>) -> Self {
        self.connection_test_query = Some(query.into());
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Registers a custom authentication plug-in. During the handshake, the
    /// first registered plug-in (custom ones take priority, then the four
    /// built-ins) whose name matches the server's requested plug-in is used.
    pub fn plugin(mut self, plugin: impl AuthPlugin + 'static) -> Self {
        self.plugins.push(std::sync::Arc::new(plugin));
        self
    }

    pub fn build(self) -> crate::Result<DataSourceOptions> {
        if self.host.trim().is_empty() {
            return Err(crate::Error::misuse("host must not be empty"));
        }

        if self.port < 1 || self.port > i64::from(u16::MAX) {
            return Err(crate::Error::configuration(format!(
                "port {} is out of range (must be 1-65535)",
                self.port
            )));
        }

        if self.user.trim().is_empty() {
            return Err(crate::Error::misuse("user must not be empty"));
        }

        if self.min_connections > self.max_connections {
            return Err(crate::Error::configuration(format!(
                "min_connections ({}) must not exceed max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }

        if self.max_connections == 0 {
            return Err(crate::Error::configuration(
                "max_connections must be at least 1",
            ));
        }

        Ok(DataSourceOptions {
            host: self.host,
            port: self.port as u16,
            user: self.user,
            password: self.password,
            database: self.database,
            ssl: self.ssl,
            socket_options: self.socket_options,
            read_timeout: self.read_timeout,
            allow_public_key_retrieval: self.allow_public_key_retrieval,
            connection_timeout: self.connection_timeout,
            idle_timeout: self.idle_timeout,
            max_lifetime: self.max_lifetime,
            keepalive_time: self.keepalive_time,
            validation_timeout: self.validation_timeout,
            alive_bypass_window: self.alive_bypass_window,
            min_connections: self.min_connections,
            max_connections: self.max_connections,
            leak_detection_threshold: self.leak_detection_threshold,
            maintenance_interval: self.maintenance_interval,
            adaptive_sizing: self.adaptive_sizing,
            adaptive_interval: self.adaptive_interval,
            connection_test_query: self.connection_test_query,
            circuit_breaker: self.circuit_breaker,
            plugins: self.plugins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_host() {
        let err = DataSourceOptions::builder()
            .host("")
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::Misuse { .. }));
    }

    #[test]
    fn rejects_negative_port() {
        let err = DataSourceOptions::builder()
            .host("localhost")
            .port(-1)
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::Configuration { .. }));
    }

    #[test]
    fn rejects_port_above_u16_range() {
        let err = DataSourceOptions::builder()
            .host("localhost")
            .port(65536)
            .build()
            .unwrap_err();
        assert!(matches!(err, crate::Error::Configuration { .. }));
    }

    #[test]
    fn accepts_sane_defaults() {
        let opts = DataSourceOptions::builder().build().unwrap();
        assert_eq!(opts.host, "localhost");
        assert_eq!(opts.port, 3306);
        assert_eq!(opts.min_connections, 5);
        assert_eq!(opts.max_connections, 10);
    }
}
