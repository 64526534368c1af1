//! §3/§4.1-§4.9: a single MySQL connection — handshake, authentication,
//! command dispatch, and the [`Commander`] surface. One `MySqlConnection`
//! owns one TCP/TLS socket and one packet sequence at a time; the pool
//! (`crate::pool`) is what gives callers more than one of these at once.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::auth::{self, caching_sha2_status};
use crate::column::ColumnDefinition;
use crate::commander::Commander;
use crate::error::TimeoutKind;
use crate::io::BufStream;
use crate::net::MaybeTlsStream;
use crate::options::{DataSourceOptions, SslMode};
use crate::protocol::{
    self, marker, AuthMoreData, AuthSwitchRequest, BinaryRow, Capabilities, ColumnCount,
    ComChangeUser, ComInitDb, ComPing, ComQuery, ComQuit, ComResetConnection, ComSetOption,
    ComStatistics, ComStmtClose, ComStmtExecute, ComStmtPrepare, ComStmtPrepareOk, CursorType,
    Decode, EofPacket, Encode, ErrPacket, FieldFlags, Handshake, HandshakeResponse, OkPacket,
    PacketReader, PacketWriter, ParamType, RawColumnDefinition, ServerStatus, SetOption,
    SslRequest, TextRow, TypeId,
};
use crate::protocol::command as cmd;
use crate::result_set::ResultSet;
use crate::statement::{
    materialize, BoundParam, CallableStatement, PreparedStatement, StatementKind, StatementOutcome,
};
use crate::types::Format;

/// Default client-side cap on a single protocol payload (16 MiB), applied
/// before the wire even sees it. The handshake carries no field for the
/// server's actual `max_allowed_packet`, so this is a conservative
/// client-only ceiling rather than a negotiated value.
const DEFAULT_MAX_ALLOWED_PACKET: u32 = 16 * 1024 * 1024;

/// `utf8mb4_general_ci`, used for the handshake response and `COM_CHANGE_USER`.
const DEFAULT_COLLATION: u8 = 45;

/// A header byte of `0xFE` with a payload shorter than this is a row
/// terminator (legacy `EOF` or, with `CLIENT_DEPRECATE_EOF`, an `OK` packet
/// shaped to stay distinguishable from a row) rather than a data row whose
/// first column happens to encode a length prefix of `0xFE`.
const TERMINATOR_MAX_LEN: usize = 9;

unsafe impl Send for MySqlConnection {}

/// One live connection to a MySQL server (§3).
pub struct MySqlConnection {
    stream: BufStream,
    reader: PacketReader,
    writer: PacketWriter,
    capabilities: Capabilities,
    status: ServerStatus,
    options: Arc<DataSourceOptions>,
    server_version: String,
    connection_id: u32,
    auto_commit: bool,
    multi_statements: bool,
    /// The nonce the currently-active auth plugin should hash against —
    /// either the handshake's or the most recent `AuthSwitchRequest`'s.
    handshake_nonce: Vec<u8>,
    current_auth_plugin: String,
    max_allowed_packet: u32,
}

/// `SET SESSION TRANSACTION ISOLATION LEVEL` values (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Parsed `COM_STATISTICS` response (§4.9) — the single-line
/// `key: value  key: value  ...` string MySQL returns for `mysqladmin status`.
#[derive(Debug, Clone, Default)]
pub struct ServerStatistics {
    pub uptime: u64,
    pub threads: u64,
    pub questions: u64,
    pub slow_queries: u64,
    pub opens: u64,
    pub flush_tables: u64,
    pub open_tables: u64,
    pub queries_per_second_avg: f64,
}

impl ServerStatistics {
    fn parse(line: &str) -> Self {
        ServerStatistics {
            uptime: field_u64(line, "Uptime:"),
            threads: field_u64(line, "Threads:"),
            questions: field_u64(line, "Questions:"),
            slow_queries: field_u64(line, "Slow queries:"),
            opens: field_u64(line, "Opens:"),
            flush_tables: field_u64(line, "Flush tables:"),
            open_tables: field_u64(line, "Open tables:"),
            queries_per_second_avg: field_f64(line, "Queries per second avg:"),
        }
    }
}

fn field_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let start = line.find(label)? + label.len();
    let rest = line[start..].trim_start();
    let end = rest.find("  ").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn field_u64(line: &str, label: &str) -> u64 {
    field_value(line, label).and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn field_f64(line: &str, label: &str) -> f64 {
    field_value(line, label).and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

fn root_store_for(mode: SslMode) -> crate::Result<rustls::RootCertStore> {
    match mode {
        SslMode::VerifyCa | SslMode::VerifyIdentity => Err(crate::Error::configuration(
            "SslMode::VerifyCa/VerifyIdentity require a configured root certificate store, \
             which this client does not currently expose through DataSourceOptions",
        )),
        _ => Ok(rustls::RootCertStore::empty()),
    }
}

impl MySqlConnection {
    /// Opens a TCP connection, performs the handshake, optionally upgrades
    /// to TLS, and authenticates (§4.1-§4.3).
    pub async fn establish(options: Arc<DataSourceOptions>) -> crate::Result<Self> {
        let socket_options = options.socket_options;

        let tcp = tokio::time::timeout(
            options.connection_timeout,
            TcpStream::connect((options.host.as_str(), options.port)),
        )
        .await
        .map_err(|_| {
            crate::Error::transient_connection(format!(
                "connecting to {}:{} timed out after {:?}",
                options.host, options.port, options.connection_timeout
            ))
        })??;

        if socket_options.tcp_nodelay {
            tcp.set_nodelay(true)?;
        }

        Self::establish_over(Box::new(tcp), options).await
    }

    /// The handshake/TLS-upgrade/authentication sequence, factored out of
    /// [`Self::establish`] so it can run over any [`AsyncSocket`] — a real
    /// `TcpStream`, or (in `tests/`) an in-memory duplex pipe standing in for
    /// a server. Not part of the crate's stable API.
    #[doc(hidden)]
    pub async fn establish_over(
        socket: Box<dyn crate::net::AsyncSocket>,
        options: Arc<DataSourceOptions>,
    ) -> crate::Result<Self> {
        let mut stream = BufStream::new(MaybeTlsStream::raw(socket));
        let mut reader = PacketReader::new();
        let mut writer = PacketWriter::new();

        let handshake_payload = reader.recv(&mut stream).await?;
        let handshake = Handshake::decode(&mut &handshake_payload[..])?;
        writer.set_sequence(reader.sequence());

        debug!(
            server_version = %handshake.server_version,
            connection_id = handshake.connection_id,
            "received MySQL handshake"
        );

        let mut capabilities = Capabilities::client_default() & handshake.server_capabilities;
        if options.database.is_some() {
            capabilities |= Capabilities::CONNECT_WITH_DB;
        }

        let wants_tls = !matches!(options.ssl, SslMode::Disabled);
        let server_supports_tls = handshake.server_capabilities.contains(Capabilities::SSL);
        let requires_tls = matches!(
            options.ssl,
            SslMode::Required | SslMode::VerifyCa | SslMode::VerifyIdentity
        );

        if requires_tls && !server_supports_tls {
            return Err(crate::Error::configuration(
                "the server does not advertise SSL support, but the configured SslMode requires it",
            ));
        }

        let use_tls = wants_tls && server_supports_tls;
        if use_tls {
            capabilities |= Capabilities::SSL;

            let ssl_request = SslRequest {
                capabilities,
                max_packet_size: DEFAULT_MAX_ALLOWED_PACKET,
                collation: DEFAULT_COLLATION,
            };
            let mut payload = Vec::new();
            ssl_request.encode(&mut payload);
            writer.send(&mut stream, &payload);
            stream.flush().await?;
            reader.set_sequence(writer.sequence());

            let root_store = root_store_for(options.ssl)?;
            let upgrade_mode = if options.ssl == SslMode::Preferred {
                SslMode::Required
            } else {
                options.ssl
            };
            let (socket, _leftover) = stream.into_parts();
            let upgraded = socket.upgrade(&options.host, upgrade_mode, root_store).await?;
            stream = BufStream::new(upgraded);
            debug!("upgraded connection to TLS");
        }

        let plugin_name = handshake
            .auth_plugin_name
            .clone()
            .unwrap_or_else(|| "mysql_native_password".to_owned());
        let plugin = auth::by_name(&plugin_name, &options.plugins)?;
        let nonce = handshake.auth_plugin_data.clone();

        if plugin.requires_confidentiality() && !use_tls {
            return Err(crate::Error::configuration(format!(
                "authentication plugin {plugin_name:?} requires an encrypted connection"
            )));
        }

        let password = options.password.as_deref().unwrap_or("");
        let auth_response = if plugin.name() == "sha256_password" && use_tls {
            password.bytes().chain(std::iter::once(0)).collect::<Vec<u8>>()
        } else {
            plugin.hash_password(password, &nonce)?
        };

        let connect_attrs = vec![("_client_name".to_owned(), "squall".to_owned())];

        let response = HandshakeResponse {
            capabilities,
            max_packet_size: DEFAULT_MAX_ALLOWED_PACKET,
            collation: DEFAULT_COLLATION,
            username: &options.user,
            auth_response: &auth_response,
            database: options.database.as_deref(),
            auth_plugin_name: plugin.name(),
            connect_attrs: &connect_attrs,
        };
        let mut payload = Vec::new();
        response.encode(&mut payload);
        writer.send(&mut stream, &payload);
        stream.flush().await?;
        reader.set_sequence(writer.sequence());

        let mut conn = MySqlConnection {
            stream,
            reader,
            writer,
            capabilities,
            status: ServerStatus::empty(),
            options,
            server_version: handshake.server_version,
            connection_id: handshake.connection_id,
            auto_commit: true,
            multi_statements: capabilities.contains(Capabilities::MULTI_STATEMENTS),
            handshake_nonce: nonce,
            current_auth_plugin: plugin.name().to_owned(),
            max_allowed_packet: DEFAULT_MAX_ALLOWED_PACKET,
        };

        conn.finish_auth_exchange(password).await?;
        conn.auto_commit = conn.status.autocommit();

        debug!(connection_id = conn.connection_id, "authenticated");
        Ok(conn)
    }

    /// Drives the `AuthSwitchRequest`/`AuthMoreData` loop to completion,
    /// starting from whatever packet comes after the client's first
    /// authentication response (the handshake response or a `COM_CHANGE_USER`).
    async fn finish_auth_exchange(&mut self, password: &str) -> crate::Result<()> {
        loop {
            let payload = self.reader.recv(&mut self.stream).await?;
            self.writer.set_sequence(self.reader.sequence());

            match payload.first().copied() {
                Some(marker::OK) => {
                    let ok = OkPacket::decode(&mut &payload[..])?;
                    self.status = ok.status;
                    return Ok(());
                }
                Some(marker::ERR) => return Err(ErrPacket::decode(&mut &payload[..])?.into_error()),
                Some(marker::AUTH_SWITCH) => {
                    let req = AuthSwitchRequest::decode(&mut &payload[..])?;
                    let plugin = auth::by_name(&req.plugin_name, &self.options.plugins)?;
                    trace!(plugin = %req.plugin_name, "server requested an auth plugin switch");

                    self.current_auth_plugin = req.plugin_name.clone();
                    self.handshake_nonce = req.plugin_data.clone();

                    if plugin.requires_confidentiality() && !self.stream.is_tls() {
                        return Err(crate::Error::configuration(format!(
                            "authentication plugin {:?} requires an encrypted connection",
                            plugin.name()
                        )));
                    }

                    let response = if plugin.name() == "sha256_password" && self.stream.is_tls() {
                        password.bytes().chain(std::iter::once(0)).collect::<Vec<u8>>()
                    } else {
                        plugin.hash_password(password, &req.plugin_data)?
                    };

                    self.send_raw(&response).await?;
                    self.reader.set_sequence(self.writer.sequence());
                }
                Some(marker::AUTH_MORE_DATA) => {
                    let more = AuthMoreData::decode(&mut &payload[..])?;
                    self.handle_auth_more_data(&more.data, password).await?;
                }
                Some(other) => {
                    return Err(protocol_err!("unexpected packet 0x{:X} during authentication", other));
                }
                None => return Err(protocol_err!("empty packet during authentication")),
            }
        }
    }

    async fn handle_auth_more_data(&mut self, data: &[u8], password: &str) -> crate::Result<()> {
        if data.len() == 1 {
            match data[0] {
                caching_sha2_status::FAST_AUTH_SUCCESS => {
                    // Next packet is the real OK; nothing to send back.
                }
                caching_sha2_status::FULL_AUTHENTICATION_REQUIRED => {
                    if self.stream.is_tls() {
                        let response: Vec<u8> = password.bytes().chain(std::iter::once(0)).collect();
                        self.send_raw(&response).await?;
                    } else {
                        self.send_raw(&[auth::REQUEST_PUBLIC_KEY]).await?;
                    }
                    self.reader.set_sequence(self.writer.sequence());
                }
                other => {
                    return Err(protocol_err!("unexpected AuthMoreData status byte 0x{:X}", other));
                }
            }
        } else {
            if !self.stream.is_tls() && !self.options.allow_public_key_retrieval {
                return Err(crate::Error::configuration(
                    "server requested its RSA public key, but allow_public_key_retrieval is disabled",
                ));
            }
            let pem = String::from_utf8_lossy(data).into_owned();
            let encrypted = auth::encrypt_password_rsa(password, &self.handshake_nonce, &pem)?;
            self.send_raw(&encrypted).await?;
            self.reader.set_sequence(self.writer.sequence());
        }
        Ok(())
    }

    fn check_packet_size(&self, len: usize) -> crate::Result<()> {
        if len as u64 > self.max_allowed_packet as u64 {
            return Err(crate::Error::misuse(format!(
                "payload of {len} bytes exceeds max_allowed_packet ({} bytes)",
                self.max_allowed_packet
            )));
        }
        Ok(())
    }

    /// Writes `payload` at the writer's current sequence id without
    /// resetting it first — used mid-exchange (authentication), where the
    /// sequence must keep incrementing rather than restart at 0.
    async fn send_raw(&mut self, payload: &[u8]) -> crate::Result<()> {
        self.check_packet_size(payload.len())?;
        self.writer.send(&mut self.stream, payload);
        self.stream.flush().await
    }

    fn begin_command(&mut self) {
        self.reader.reset_sequence();
        self.writer.reset_sequence();
    }

    /// Starts a new top-level command: resets the sequence to 0, encodes
    /// `command`, and sends it.
    async fn send_command<E: Encode>(&mut self, command: E) -> crate::Result<()> {
        self.begin_command();
        let mut payload = Vec::new();
        command.encode(&mut payload);
        trace!(len = payload.len(), "sending command packet");
        self.send_raw(&payload).await
    }

    async fn recv_packet(&mut self) -> crate::Result<Vec<u8>> {
        if let Some(timeout) = self.options.read_timeout {
            tokio::time::timeout(timeout, self.reader.recv(&mut self.stream))
                .await
                .map_err(|_| crate::Error::Timeout {
                    kind: TimeoutKind::Read,
                    elapsed: timeout,
                })?
        } else {
            self.reader.recv(&mut self.stream).await
        }
    }

    async fn read_ok(&mut self) -> crate::Result<OkPacket> {
        let payload = self.recv_packet().await?;
        match payload.first().copied() {
            Some(marker::OK) => {
                let ok = OkPacket::decode(&mut &payload[..])?;
                self.status = ok.status;
                Ok(ok)
            }
            Some(marker::ERR) => Err(ErrPacket::decode(&mut &payload[..])?.into_error()),
            Some(other) => Err(protocol_err!("expected an OK packet; received 0x{:X}", other)),
            None => Err(protocol_err!("empty response packet")),
        }
    }

    /// Reads one logical response: an OK/ERR packet, or a full
    /// column-definitions-then-rows result set decoded in `format`.
    async fn read_one_response(&mut self, format: Format, scrollable: bool) -> crate::Result<StatementOutcome> {
        let payload = self.recv_packet().await?;

        match payload.first().copied() {
            Some(marker::OK) => {
                let ok = OkPacket::decode(&mut &payload[..])?;
                self.status = ok.status;
                return Ok(StatementOutcome::Update {
                    affected_rows: ok.affected_rows,
                    last_insert_id: ok.last_insert_id,
                });
            }
            Some(marker::ERR) => return Err(ErrPacket::decode(&mut &payload[..])?.into_error()),
            _ => {}
        }

        let mut buf = &payload[..];
        let column_count = ColumnCount::decode(&mut buf)?.0 as usize;

        let mut raw_columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            let p = self.recv_packet().await?;
            raw_columns.push(RawColumnDefinition::decode(&mut &p[..])?);
        }

        if column_count > 0 && !self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
            let p = self.recv_packet().await?;
            EofPacket::decode(&mut &p[..])?;
        }

        let columns: Vec<ColumnDefinition> = raw_columns.iter().map(ColumnDefinition::from_raw).collect();
        let column_types: Vec<TypeId> = columns.iter().map(|c| c.type_id).collect();

        let mut rows = Vec::new();
        loop {
            let p = self.recv_packet().await?;
            match p.first().copied() {
                Some(marker::ERR) => return Err(ErrPacket::decode(&mut &p[..])?.into_error()),
                Some(marker::EOF) if p.len() < TERMINATOR_MAX_LEN => {
                    let status = if self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
                        OkPacket::decode(&mut &p[..])?.status
                    } else {
                        EofPacket::decode(&mut &p[..])?.status
                    };
                    self.status = status;
                    break;
                }
                _ => {
                    let row = match format {
                        Format::Text => TextRow::decode(&p, column_count)?,
                        Format::Binary => BinaryRow::decode(&p, &column_types)?,
                    };
                    rows.push(row);
                }
            }
        }

        Ok(StatementOutcome::Rows(ResultSet::new(columns, rows, format, scrollable)))
    }

    /// Drains any extra result sets `SERVER_MORE_RESULTS_EXISTS` announces,
    /// discarding them. Used after a single-statement execute that should
    /// not itself have produced more than one response.
    async fn drain_extra_results(&mut self, format: Format) -> crate::Result<()> {
        while self.status.has_more_results() {
            self.read_one_response(format, false).await?;
        }
        Ok(())
    }

    fn build_null_bitmap(params: &[BoundParam]) -> Vec<u8> {
        let mut bitmap = vec![0u8; (params.len() + 7) / 8];
        for (i, p) in params.iter().enumerate() {
            if p.bytes.is_none() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }
        bitmap
    }

    async fn send_stmt_execute(
        &mut self,
        statement_id: u32,
        params: &[BoundParam],
        cursor_type: CursorType,
    ) -> crate::Result<()> {
        let null_bitmap = Self::build_null_bitmap(params);
        let param_types: Option<Vec<ParamType>> = if params.is_empty() {
            None
        } else {
            Some(
                params
                    .iter()
                    .map(|p| ParamType {
                        type_id: p.type_id,
                        unsigned: p.unsigned,
                    })
                    .collect(),
            )
        };
        let mut value_bytes = Vec::new();
        for p in params {
            if let Some(b) = &p.bytes {
                value_bytes.extend_from_slice(b);
            }
        }

        let command = ComStmtExecute {
            statement_id,
            cursor_type,
            null_bitmap: &null_bitmap,
            param_types: param_types.as_deref(),
            params: &value_bytes,
        };
        self.send_command(command).await
    }

    async fn stmt_execute_by_id(&mut self, statement_id: u32, params: &[BoundParam]) -> crate::Result<StatementOutcome> {
        self.send_stmt_execute(statement_id, params, CursorType::NO_CURSOR).await?;
        let outcome = self.read_one_response(Format::Binary, false).await?;
        self.drain_extra_results(Format::Binary).await?;
        Ok(outcome)
    }

    /// `COM_STMT_PREPARE`s `sql`, draining the parameter/column metadata
    /// packets that follow the prepare-ok (unused: every execute re-sends its
    /// own parameter types, so the server's declared ones aren't needed).
    async fn prepare_statement(&mut self, sql: &str) -> crate::Result<PreparedStatement> {
        self.send_command(ComStmtPrepare { sql }).await?;
        let payload = self.recv_packet().await?;

        if payload.first().copied() == Some(marker::ERR) {
            return Err(ErrPacket::decode(&mut &payload[..])?.into_error());
        }
        let ok = ComStmtPrepareOk::decode(&mut &payload[..])?;

        for _ in 0..ok.num_params {
            self.recv_packet().await?;
        }
        if ok.num_params > 0 && !self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
            self.recv_packet().await?;
        }
        for _ in 0..ok.num_columns {
            self.recv_packet().await?;
        }
        if ok.num_columns > 0 && !self.capabilities.contains(Capabilities::DEPRECATE_EOF) {
            self.recv_packet().await?;
        }

        Ok(PreparedStatement::from_prepare_ok(sql.to_owned(), ok))
    }

    /// Executes one of the three statement flavours (§4.6). Called by
    /// [`PreparedStatement::execute`], not part of [`Commander`].
    pub(crate) async fn execute_statement(&mut self, stmt: &mut PreparedStatement) -> crate::Result<StatementOutcome> {
        match &stmt.kind {
            StatementKind::Direct => {
                self.send_command(ComQuery { sql: &stmt.sql }).await?;
                let outcome = self.read_one_response(Format::Text, false).await?;
                self.drain_extra_results(Format::Text).await?;
                Ok(outcome)
            }
            StatementKind::ClientPrepared => {
                let params = stmt.params_for_execute()?;
                let sql = if params.is_empty() {
                    stmt.sql.clone()
                } else {
                    substitute_placeholders(&stmt.sql, &params)?
                };
                self.send_command(ComQuery { sql: &sql }).await?;
                let outcome = self.read_one_response(Format::Text, false).await?;
                self.drain_extra_results(Format::Text).await?;
                Ok(outcome)
            }
            StatementKind::ServerPrepared { statement_id, .. } => {
                let statement_id = *statement_id;
                let params = stmt.params_for_execute()?;
                self.stmt_execute_by_id(statement_id, &params).await
            }
        }
    }

    /// Runs every row of `stmt.batch`, failing fast (§9 open question
    /// resolution): once a row errors, that row and every row after it are
    /// reported as `-3` in the returned `BatchUpdate` error.
    pub(crate) async fn execute_batch(&mut self, stmt: &mut PreparedStatement) -> crate::Result<Vec<i64>> {
        if stmt.batch.is_empty() {
            return Ok(Vec::new());
        }

        match &stmt.kind {
            StatementKind::Direct => {
                let n = stmt.batch.len();
                if n > 1 && !self.multi_statements {
                    return Err(crate::Error::misuse(
                        "batching more than one statement requires multi-statement support; \
                         call MySqlConnection::enable_multi_queries first",
                    ));
                }
                let joined = vec![stmt.sql.clone(); n].join("; ");
                self.send_command(ComQuery { sql: &joined }).await?;
                self.collect_batch_responses(n).await
            }
            StatementKind::ClientPrepared => {
                let mut rendered = Vec::with_capacity(stmt.batch.len());
                for row in &stmt.batch {
                    let params = materialize(row)?;
                    rendered.push(substitute_placeholders(&stmt.sql, &params)?);
                }
                if rendered.len() > 1 && !self.multi_statements {
                    return Err(crate::Error::misuse(
                        "batching more than one statement requires multi-statement support; \
                         call MySqlConnection::enable_multi_queries first",
                    ));
                }
                let joined = rendered.join("; ");
                self.send_command(ComQuery { sql: &joined }).await?;
                self.collect_batch_responses(rendered.len()).await
            }
            StatementKind::ServerPrepared { statement_id, .. } => {
                let statement_id = *statement_id;
                if is_insert(&stmt.sql) {
                    if let Some(rewritten) = rewrite_multi_values_insert(&stmt.sql, &stmt.batch)? {
                        return self.rewritten_insert_batch(&rewritten, stmt.batch.len()).await;
                    }
                }
                self.prepared_batch(statement_id, &stmt.batch).await
            }
        }
    }

    async fn collect_batch_responses(&mut self, n: usize) -> crate::Result<Vec<i64>> {
        let mut counts = Vec::with_capacity(n);
        for _ in 0..n {
            match self.read_one_response(Format::Text, false).await {
                Ok(StatementOutcome::Update { affected_rows, .. }) => counts.push(affected_rows as i64),
                Ok(StatementOutcome::Rows(rs)) => counts.push(rs.row_count() as i64),
                Err(e) => {
                    counts.resize(n, -3);
                    return Err(crate::Error::batch_update(e, counts));
                }
            }
        }
        Ok(counts)
    }

    async fn prepared_batch(&mut self, statement_id: u32, batch: &[Vec<Option<BoundParam>>]) -> crate::Result<Vec<i64>> {
        let mut counts = Vec::with_capacity(batch.len());
        for row in batch {
            let params = match materialize(row) {
                Ok(p) => p,
                Err(e) => {
                    counts.resize(batch.len(), -3);
                    return Err(crate::Error::batch_update(e, counts));
                }
            };
            match self.stmt_execute_by_id(statement_id, &params).await {
                Ok(StatementOutcome::Update { affected_rows, .. }) => counts.push(affected_rows as i64),
                Ok(StatementOutcome::Rows(rs)) => counts.push(rs.row_count() as i64),
                Err(e) => {
                    counts.resize(batch.len(), -3);
                    return Err(crate::Error::batch_update(e, counts));
                }
            }
        }
        Ok(counts)
    }

    async fn rewritten_insert_batch(&mut self, sql: &str, n: usize) -> crate::Result<Vec<i64>> {
        self.send_command(ComQuery { sql }).await?;
        match self.read_one_response(Format::Text, false).await {
            Ok(StatementOutcome::Update { affected_rows, .. }) => {
                self.drain_extra_results(Format::Text).await?;
                if affected_rows as usize == n {
                    Ok(vec![1i64; n])
                } else {
                    Ok(vec![-2i64; n])
                }
            }
            Ok(StatementOutcome::Rows(_)) => Err(crate::Error::protocol(
                "rewritten multi-row INSERT batch unexpectedly returned rows",
            )),
            Err(e) => Err(crate::Error::batch_update(e, vec![-3i64; n])),
        }
    }

    /// Deallocates a server-side statement. A no-op for the other two
    /// flavours.
    pub(crate) async fn close_statement(&mut self, stmt: PreparedStatement) -> crate::Result<()> {
        if let Some(statement_id) = stmt.statement_id() {
            self.begin_command();
            let mut payload = Vec::new();
            ComStmtClose { statement_id }.encode(&mut payload);
            self.send_raw(&payload).await?;
        }
        Ok(())
    }

    /// Executes a `CALL procedure(...)` statement (§4.6): server-prepares it
    /// on first use, sends the bound IN/INOUT values plus NULL placeholders
    /// for OUT-only slots, and collects every result set the procedure
    /// produced. If `SERVER_PS_OUT_PARAMS` was negotiated and OUT parameters
    /// were registered, the last result set is consumed as the synthetic
    /// OUT-value row rather than returned to the caller.
    pub async fn call(&mut self, stmt: &mut CallableStatement) -> crate::Result<Vec<ResultSet>> {
        if !stmt.inner.is_server_prepared() {
            let prepared = self.prepare_statement(&stmt.inner.sql).await?;
            stmt.inner.kind = prepared.kind;
        }
        let Some(statement_id) = stmt.inner.statement_id() else {
            return Err(crate::Error::protocol("CALL statement failed to prepare"));
        };

        let params = stmt.params_for_call()?;
        self.send_stmt_execute(statement_id, &params, CursorType::NO_CURSOR).await?;

        let mut result_sets = Vec::new();
        loop {
            match self.read_one_response(Format::Binary, false).await? {
                StatementOutcome::Rows(rs) => result_sets.push(rs),
                StatementOutcome::Update { .. } => {}
            }
            if !self.status.has_more_results() {
                break;
            }
        }

        let out_indices = stmt.out_param_indices();
        if !out_indices.is_empty() && self.status.contains(ServerStatus::SERVER_PS_OUT_PARAMS) {
            if let Some(mut synthetic) = result_sets.pop() {
                synthetic.next();
                let mut out_values = Vec::with_capacity(out_indices.len());
                for col0 in 0..out_indices.len() {
                    let bytes = synthetic.raw_bytes_at(col0)?;
                    out_values.push(Some(BoundParam {
                        type_id: TypeId::VAR_STRING,
                        unsigned: false,
                        bytes,
                    }));
                }
                stmt.store_out_values(out_values);
            }
        }

        Ok(result_sets)
    }

    /// Synthesizes a one-column result set of generated keys from an
    /// `Update` outcome's `last_insert_id`/`affected_rows`, the way JDBC
    /// drivers do for `AUTO_INCREMENT` bulk inserts: MySQL only reports the
    /// first id, and the rest are assumed contiguous.
    pub fn generated_keys(outcome: &StatementOutcome) -> crate::Result<ResultSet> {
        let StatementOutcome::Update {
            affected_rows,
            last_insert_id,
        } = outcome
        else {
            return Err(crate::Error::misuse(
                "generated keys are only available for an update outcome",
            ));
        };

        let column = ColumnDefinition {
            catalog: "def".to_owned(),
            schema: String::new(),
            table: String::new(),
            original_table: String::new(),
            name: "GENERATED_KEY".to_owned(),
            original_name: "GENERATED_KEY".to_owned(),
            char_set: 63,
            byte_length: 20,
            type_id: TypeId::LONGLONG,
            flags: FieldFlags::UNSIGNED | FieldFlags::NOT_NULL,
            decimals: 0,
        };

        let mut rows = Vec::new();
        if *last_insert_id != 0 && *affected_rows != 0 {
            for key in *last_insert_id..(*last_insert_id + *affected_rows) {
                let text = key.to_string();
                let mut buf = Vec::with_capacity(text.len() + 1);
                buf.push(text.len() as u8);
                buf.extend_from_slice(text.as_bytes());
                rows.push(TextRow::decode(&buf, 1)?);
            }
        }

        Ok(ResultSet::new(vec![column], rows, Format::Text, false))
    }

    async fn run_set(&mut self, sql: &str) -> crate::Result<()> {
        self.send_command(ComQuery { sql }).await?;
        self.read_ok().await?;
        Ok(())
    }

    pub async fn commit(&mut self) -> crate::Result<()> {
        self.run_set("COMMIT").await
    }

    pub async fn rollback(&mut self) -> crate::Result<()> {
        self.run_set("ROLLBACK").await
    }

    pub async fn set_auto_commit(&mut self, enabled: bool) -> crate::Result<()> {
        self.run_set(if enabled { "SET autocommit=1" } else { "SET autocommit=0" }).await?;
        self.auto_commit = enabled;
        Ok(())
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub async fn set_transaction_isolation(&mut self, level: IsolationLevel) -> crate::Result<()> {
        self.run_set(&format!("SET SESSION TRANSACTION ISOLATION LEVEL {}", level.as_sql()))
            .await
    }

    pub async fn set_savepoint(&mut self, name: Option<String>) -> crate::Result<crate::statement::Savepoint> {
        if self.auto_commit {
            return Err(crate::Error::misuse("cannot create a savepoint while auto-commit is enabled"));
        }
        let savepoint = crate::statement::Savepoint::new(name);
        self.run_set(&format!("SAVEPOINT {}", savepoint.name())).await?;
        Ok(savepoint)
    }

    pub async fn rollback_to_savepoint(&mut self, savepoint: &crate::statement::Savepoint) -> crate::Result<()> {
        if self.auto_commit {
            return Err(crate::Error::misuse("cannot use a savepoint while auto-commit is enabled"));
        }
        self.run_set(&format!("ROLLBACK TO SAVEPOINT {}", savepoint.name())).await
    }

    pub async fn release_savepoint(&mut self, savepoint: &crate::statement::Savepoint) -> crate::Result<()> {
        if self.auto_commit {
            return Err(crate::Error::misuse("cannot use a savepoint while auto-commit is enabled"));
        }
        self.run_set(&format!("RELEASE SAVEPOINT {}", savepoint.name())).await
    }

    /// Probes liveness (§4.9): runs `options.connection_test_query` if one
    /// is configured, else a bare `COM_PING`, within `timeout`.
    pub async fn is_valid(&mut self, timeout: Duration) -> bool {
        let probe = async {
            if let Some(query) = self.options.connection_test_query.clone() {
                self.send_command(ComQuery { sql: &query }).await?;
                self.read_one_response(Format::Text, false).await?;
                self.drain_extra_results(Format::Text).await?;
            } else {
                self.send_command(ComPing).await?;
                self.read_ok().await?;
            }
            Ok::<(), crate::Error>(())
        };
        tokio::time::timeout(timeout, probe).await.map(|r| r.is_ok()).unwrap_or(false)
    }

    pub async fn get_statistics(&mut self) -> crate::Result<ServerStatistics> {
        self.send_command(ComStatistics).await?;
        let payload = self.recv_packet().await?;
        let line = std::str::from_utf8(&payload)
            .map_err(|e| crate::Error::protocol(format!("non-UTF-8 COM_STATISTICS response: {e}")))?;
        Ok(ServerStatistics::parse(line))
    }

    pub async fn enable_multi_queries(&mut self) -> crate::Result<()> {
        self.send_command(ComSetOption {
            option: SetOption::MultiStatementsOn,
        })
        .await?;
        self.read_ok().await?;
        self.multi_statements = true;
        Ok(())
    }

    pub async fn disable_multi_queries(&mut self) -> crate::Result<()> {
        self.send_command(ComSetOption {
            option: SetOption::MultiStatementsOff,
        })
        .await?;
        self.read_ok().await?;
        self.multi_statements = false;
        Ok(())
    }

    pub fn multi_queries_enabled(&self) -> bool {
        self.multi_statements
    }

    pub async fn set_schema(&mut self, schema: &str) -> crate::Result<()> {
        self.send_command(ComInitDb { schema }).await?;
        self.read_ok().await?;
        Ok(())
    }

    /// `COM_CHANGE_USER` (§4.9): re-authenticates the same socket as a
    /// different user/database without reconnecting, resetting session state
    /// (autocommit, multi-statement mode) the way a fresh connection would.
    pub async fn change_user(&mut self, username: &str, password: &str, database: Option<&str>) -> crate::Result<()> {
        let plugin = auth::by_name(&self.current_auth_plugin, &self.options.plugins)?;
        let use_tls = self.stream.is_tls();

        if plugin.requires_confidentiality() && !use_tls {
            return Err(crate::Error::configuration(
                "the active authentication plugin requires an encrypted connection",
            ));
        }

        let auth_response = if plugin.name() == "sha256_password" && use_tls {
            password.bytes().chain(std::iter::once(0)).collect::<Vec<u8>>()
        } else {
            plugin.hash_password(password, &self.handshake_nonce)?
        };

        self.begin_command();
        let mut payload = Vec::new();
        ComChangeUser {
            username,
            auth_response: &auth_response,
            database,
            collation: DEFAULT_COLLATION,
            auth_plugin_name: plugin.name(),
            connect_attrs: &[],
        }
        .encode(&mut payload);
        self.send_raw(&payload).await?;
        self.reader.set_sequence(self.writer.sequence());

        self.finish_auth_exchange(password).await?;
        self.auto_commit = true;
        self.multi_statements = self.capabilities.contains(Capabilities::MULTI_STATEMENTS);
        Ok(())
    }

    /// `COM_RESET_CONNECTION` (§4.9): resets session state (transactions
    /// rolled back, temp tables dropped, autocommit re-enabled) while
    /// keeping the same authenticated socket — far cheaper than reconnecting,
    /// which is exactly why the pool uses it between checkouts.
    pub async fn reset_server_state(&mut self) -> crate::Result<()> {
        self.send_command(ComResetConnection).await?;
        self.read_ok().await?;
        self.auto_commit = true;
        self.multi_statements = self.capabilities.contains(Capabilities::MULTI_STATEMENTS);
        Ok(())
    }

    /// `COM_QUIT` then drop: a graceful variant of just dropping the
    /// connection, giving the server a chance to close things down on its
    /// side instead of discovering the peer vanished.
    pub async fn close(mut self) -> crate::Result<()> {
        self.begin_command();
        let mut payload = Vec::new();
        ComQuit.encode(&mut payload);
        self.writer.send(&mut self.stream, &payload);
        self.stream.flush().await
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }
}

impl Commander for MySqlConnection {
    async fn query(&mut self, sql: &str) -> crate::Result<ResultSet> {
        let mut stmt = PreparedStatement::direct(sql);
        match stmt.execute(self).await? {
            StatementOutcome::Rows(rs) => Ok(rs),
            StatementOutcome::Update { .. } => Err(crate::Error::misuse(
                "statement returned an update count, not a result set",
            )),
        }
    }

    async fn query_one(&mut self, sql: &str) -> crate::Result<ResultSet> {
        let mut rs = self.query(sql).await?;
        if !rs.next() {
            return Err(crate::Error::RowNotFound);
        }
        Ok(rs)
    }

    async fn execute(&mut self, sql: &str) -> crate::Result<u64> {
        let mut stmt = PreparedStatement::direct(sql);
        match stmt.execute(self).await? {
            StatementOutcome::Update { affected_rows, .. } => Ok(affected_rows),
            StatementOutcome::Rows(_) => Err(crate::Error::misuse("statement returned rows, not an update count")),
        }
    }

    async fn prepare(&mut self, sql: &str) -> crate::Result<PreparedStatement> {
        self.prepare_statement(sql).await
    }

    async fn prepare_and_execute<F>(&mut self, sql: &str, bind: F) -> crate::Result<StatementOutcome>
    where
        F: FnOnce(&mut PreparedStatement) -> crate::Result<()> + Send,
    {
        let mut stmt = self.prepare_statement(sql).await?;
        bind(&mut stmt)?;
        stmt.execute(self).await
    }

    async fn call(&mut self, stmt: &mut CallableStatement) -> crate::Result<Vec<ResultSet>> {
        self.call(stmt).await
    }

    async fn batch(&mut self, stmt: &mut PreparedStatement) -> crate::Result<Vec<i64>> {
        self.execute_batch(stmt).await
    }
}

/// Splices `params` into `sql`'s `?` placeholders as SQL literals, skipping
/// over quoted string/identifier spans so a `?` inside a literal is never
/// mistaken for a placeholder (§4.6 client-prepared statements).
pub(crate) fn substitute_placeholders(sql: &str, params: &[BoundParam]) -> crate::Result<String> {
    let bytes = sql.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() + params.len() * 4);
    let mut params = params.iter();
    let mut in_quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match in_quote {
            Some(q) => {
                out.push(b);
                if b == b'\\' && i + 1 < bytes.len() {
                    i += 1;
                    out.push(bytes[i]);
                } else if b == q {
                    in_quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => {
                    in_quote = Some(b);
                    out.push(b);
                }
                b'?' => {
                    let param = params
                        .next()
                        .ok_or_else(|| crate::Error::misuse("fewer parameters bound than placeholders in the statement"))?;
                    out.extend_from_slice(render_literal(param)?.as_bytes());
                }
                _ => out.push(b),
            },
        }
        i += 1;
    }

    if params.next().is_some() {
        return Err(crate::Error::misuse(
            "more parameters bound than placeholders in the statement",
        ));
    }

    String::from_utf8(out).map_err(|e| crate::Error::protocol(format!("substituted SQL is not valid UTF-8: {e}")))
}

fn bytes_as_lenenc_payload(bytes: &[u8]) -> crate::Result<&[u8]> {
    use crate::io::Buf;
    let mut b = bytes;
    b.get_bytes_lenenc()?
        .ok_or_else(|| crate::Error::protocol("expected a non-NULL length-encoded value"))
}

fn quote_sql_string(bytes: &[u8]) -> crate::Result<String> {
    let s = std::str::from_utf8(bytes)
        .map_err(|e| crate::Error::data(format!("literal is not valid UTF-8: {e}")))?;
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
    Ok(out)
}

#[cfg(feature = "chrono")]
fn render_date_literal(bytes: &[u8]) -> crate::Result<String> {
    use crate::types::{Codec, RawValue};
    let raw = RawValue {
        info: crate::types::MySqlTypeInfo::new(TypeId::DATE),
        format: Format::Binary,
        bytes: Some(bytes),
    };
    let date = <chrono::NaiveDate as Codec>::decode(&raw)?;
    Ok(format!("'{}'", date.format("%Y-%m-%d")))
}

#[cfg(feature = "chrono")]
fn render_datetime_literal(bytes: &[u8], type_id: TypeId) -> crate::Result<String> {
    use crate::types::{Codec, RawValue};
    let raw = RawValue {
        info: crate::types::MySqlTypeInfo::new(type_id),
        format: Format::Binary,
        bytes: Some(bytes),
    };
    let dt = <chrono::NaiveDateTime as Codec>::decode(&raw)?;
    Ok(format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.6f")))
}

#[cfg(feature = "chrono")]
fn render_time_literal(bytes: &[u8]) -> crate::Result<String> {
    use crate::types::{Codec, RawValue};
    let raw = RawValue {
        info: crate::types::MySqlTypeInfo::new(TypeId::TIME),
        format: Format::Binary,
        bytes: Some(bytes),
    };
    let t = <chrono::NaiveTime as Codec>::decode(&raw)?;
    Ok(format!("'{}'", t.format("%H:%M:%S%.6f")))
}

fn render_literal(param: &BoundParam) -> crate::Result<String> {
    let Some(bytes) = &param.bytes else {
        return Ok("NULL".to_owned());
    };

    match param.type_id {
        TypeId::TINY if param.unsigned => Ok(bytes[0].to_string()),
        TypeId::TINY => Ok((bytes[0] as i8).to_string()),
        TypeId::SHORT | TypeId::YEAR if param.unsigned => {
            Ok(u16::from_le_bytes(bytes[..2].try_into().unwrap()).to_string())
        }
        TypeId::SHORT | TypeId::YEAR => Ok(i16::from_le_bytes(bytes[..2].try_into().unwrap()).to_string()),
        TypeId::LONG | TypeId::INT24 if param.unsigned => {
            Ok(u32::from_le_bytes(bytes[..4].try_into().unwrap()).to_string())
        }
        TypeId::LONG | TypeId::INT24 => Ok(i32::from_le_bytes(bytes[..4].try_into().unwrap()).to_string()),
        TypeId::LONGLONG if param.unsigned => Ok(u64::from_le_bytes(bytes[..8].try_into().unwrap()).to_string()),
        TypeId::LONGLONG => Ok(i64::from_le_bytes(bytes[..8].try_into().unwrap()).to_string()),
        TypeId::FLOAT => Ok(f32::from_le_bytes(bytes[..4].try_into().unwrap()).to_string()),
        TypeId::DOUBLE => Ok(f64::from_le_bytes(bytes[..8].try_into().unwrap()).to_string()),
        #[cfg(feature = "chrono")]
        TypeId::DATE => render_date_literal(bytes),
        #[cfg(feature = "chrono")]
        TypeId::DATETIME | TypeId::TIMESTAMP => render_datetime_literal(bytes, param.type_id),
        #[cfg(feature = "chrono")]
        TypeId::TIME => render_time_literal(bytes),
        #[cfg(not(feature = "chrono"))]
        TypeId::DATE | TypeId::DATETIME | TypeId::TIMESTAMP | TypeId::TIME => Err(
            crate::Error::feature_not_supported("temporal literals require the \"chrono\" feature"),
        ),
        t if t.is_geometry() => Err(crate::Error::feature_not_supported(
            "the GEOMETRY type family is not supported by this client",
        )),
        _ => Ok(quote_sql_string(bytes_as_lenenc_payload(bytes)?)?),
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(0..6)
        .map(|s| s.eq_ignore_ascii_case("insert"))
        .unwrap_or(false)
}

fn find_matching_paren(s: &str, open_idx: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut in_quote: Option<u8> = None;
    let mut i = open_idx;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = in_quote {
            if b == b'\\' {
                i += 1;
            } else if b == q {
                in_quote = None;
            }
        } else {
            match b {
                b'\'' | b'"' | b'`' => in_quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Rewrites `INSERT INTO t (...) VALUES (?, ?)` plus a batch of bound rows
/// into one `INSERT ... VALUES (1,2), (3,4), ...` statement with literal
/// values, the way JDBC's `rewriteBatchedStatements` does — one round trip
/// for the whole batch instead of one per row. Returns `None` (falls back to
/// one `COM_STMT_EXECUTE` per row) if no `VALUES (...)` clause is found.
fn rewrite_multi_values_insert(sql: &str, batch: &[Vec<Option<BoundParam>>]) -> crate::Result<Option<String>> {
    let upper = sql.to_ascii_uppercase();
    let Some(values_pos) = upper.find("VALUES") else {
        return Ok(None);
    };
    let after_values = &sql[values_pos + "VALUES".len()..];
    let Some(open) = after_values.find('(') else {
        return Ok(None);
    };
    let Some(close) = find_matching_paren(after_values, open) else {
        return Ok(None);
    };

    let template = &after_values[open..=close];
    let prefix = &sql[..values_pos + "VALUES".len()];
    let suffix = &after_values[close + 1..];

    let mut tuples = Vec::with_capacity(batch.len());
    for row in batch {
        let params = materialize(row)?;
        tuples.push(substitute_placeholders(template, &params)?);
    }

    Ok(Some(format!("{prefix} {}{suffix}", tuples.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param_i32(value: i32) -> BoundParam {
        BoundParam {
            type_id: TypeId::LONG,
            unsigned: false,
            bytes: Some(value.to_le_bytes().to_vec()),
        }
    }

    fn param_str(value: &str) -> BoundParam {
        use crate::io::BufMut;
        let mut buf = Vec::new();
        buf.put_str_lenenc(value);
        BoundParam {
            type_id: TypeId::VARCHAR,
            unsigned: false,
            bytes: Some(buf),
        }
    }

    fn param_null() -> BoundParam {
        BoundParam {
            type_id: TypeId::NULL,
            unsigned: false,
            bytes: None,
        }
    }

    #[test]
    fn substitutes_placeholders_in_order() {
        let sql = substitute_placeholders("select * from t where a = ? and b = ?", &[param_i32(1), param_str("x")]).unwrap();
        assert_eq!(sql, "select * from t where a = 1 and b = 'x'");
    }

    #[test]
    fn placeholder_inside_quotes_is_not_substituted() {
        let sql = substitute_placeholders("select '?' from t where a = ?", &[param_i32(7)]).unwrap();
        assert_eq!(sql, "select '?' from t where a = 7");
    }

    #[test]
    fn escaped_quote_inside_string_is_preserved() {
        let sql = substitute_placeholders("select 'it''s' where a = ?", &[param_i32(1)]).unwrap();
        assert_eq!(sql, "select 'it''s' where a = 1");
    }

    #[test]
    fn null_param_renders_as_null_literal() {
        let sql = substitute_placeholders("select ?", &[param_null()]).unwrap();
        assert_eq!(sql, "select NULL");
    }

    #[test]
    fn too_few_params_is_an_error() {
        assert!(substitute_placeholders("select ?, ?", &[param_i32(1)]).is_err());
    }

    #[test]
    fn too_many_params_is_an_error() {
        assert!(substitute_placeholders("select ?", &[param_i32(1), param_i32(2)]).is_err());
    }

    #[test]
    fn quote_sql_string_escapes_quotes_and_backslashes() {
        assert_eq!(quote_sql_string(b"a'b\\c").unwrap(), "'a''b\\\\c'");
    }

    #[test]
    fn is_insert_is_case_insensitive_and_ignores_leading_space() {
        assert!(is_insert("  INSERT into t values (1)"));
        assert!(is_insert("insert into t values (1)"));
        assert!(!is_insert("select 1"));
    }

    #[test]
    fn rewrite_multi_values_insert_combines_rows() {
        let batch = vec![
            vec![Some(param_i32(1)), Some(param_str("a"))],
            vec![Some(param_i32(2)), Some(param_str("b"))],
        ];
        let rewritten = rewrite_multi_values_insert("INSERT INTO t (a, b) VALUES (?, ?)", &batch)
            .unwrap()
            .unwrap();
        assert_eq!(rewritten, "INSERT INTO t (a, b) VALUES (1, 'a'), (2, 'b')");
    }

    #[test]
    fn rewrite_multi_values_insert_returns_none_without_values_clause() {
        let batch: Vec<Vec<Option<BoundParam>>> = vec![vec![Some(param_i32(1))]];
        let rewritten = rewrite_multi_values_insert("INSERT INTO t SET a = ?", &batch).unwrap();
        assert!(rewritten.is_none());
    }

    #[test]
    fn server_statistics_parses_standard_line() {
        let line = "Uptime: 7  Threads: 1  Questions: 25  Slow queries: 0  Opens: 116  \
                     Flush tables: 3  Open tables: 8  Queries per second avg: 3.571";
        let stats = ServerStatistics::parse(line);
        assert_eq!(stats.uptime, 7);
        assert_eq!(stats.threads, 1);
        assert_eq!(stats.questions, 25);
        assert_eq!(stats.opens, 116);
        assert_eq!(stats.open_tables, 8);
        assert!((stats.queries_per_second_avg - 3.571).abs() < 1e-9);
    }

    #[test]
    fn build_null_bitmap_marks_null_params() {
        let bitmap = MySqlConnection::build_null_bitmap(&[param_i32(1), param_null(), param_i32(2)]);
        assert_eq!(bitmap, vec![0b0000_0010]);
    }
}
