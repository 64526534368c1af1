//! A scripted fake MySQL server over an in-memory duplex pipe, standing in
//! for a real socket in [`squall::MySqlConnection::establish_over`]. Wire
//! bytes are hand-built the same way `src/protocol`'s own packet unit tests
//! build their fixtures, just stitched into whole command/response exchanges
//! rather than single packets.
//!
//! Kept deliberately simple: no `CLIENT_DEPRECATE_EOF` (classic EOF
//! terminators instead of OK-shaped ones) and no `CLIENT_SSL` (plaintext
//! only), so the handshake only has one auth round trip to script.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};

use squall::net::AsyncSocket;
use squall::{DataSourceOptions, MySqlConnection, SslMode};

/// One half of an in-memory duplex pipe, wrapped so it satisfies
/// [`AsyncSocket`] (tests/ is a separate crate, so it can't impl a foreign
/// trait directly on tokio's `DuplexStream`).
pub struct FakeSocket(pub DuplexStream);

impl AsyncRead for FakeSocket {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

impl AsyncWrite for FakeSocket {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
    }
}

impl AsyncSocket for FakeSocket {
    fn poll_shutdown_both(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_shutdown(self, cx)
    }
}

// ---- length-encoded primitives (mirrors src/io/buf_mut.rs) ----

pub fn put_uint_lenenc(buf: &mut Vec<u8>, n: u64) {
    if n < 251 {
        buf.push(n as u8);
    } else if n < (1 << 16) {
        buf.push(0xFC);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n < (1 << 24) {
        buf.push(0xFD);
        buf.extend_from_slice(&(n as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xFE);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

pub fn put_bytes_lenenc(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_uint_lenenc(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn put_str_lenenc(buf: &mut Vec<u8>, s: &str) {
    put_bytes_lenenc(buf, s.as_bytes());
}

// ---- packet framing ----

pub async fn write_packet(io: &mut DuplexStream, seq: u8, payload: &[u8]) {
    let mut header = [0u8; 4];
    header[..3].copy_from_slice(&(payload.len() as u32).to_le_bytes()[..3]);
    header[3] = seq;
    io.write_all(&header).await.unwrap();
    io.write_all(payload).await.unwrap();
}

/// Reads one framed packet and discards its payload's contents — the fake
/// server never needs to decode what the client actually sent, since the
/// next response is fixed by the script regardless.
pub async fn read_and_discard_packet(io: &mut DuplexStream) {
    let mut header = [0u8; 4];
    io.read_exact(&mut header).await.unwrap();
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let mut payload = vec![0u8; len];
    io.read_exact(&mut payload).await.unwrap();
}

/// Reads the one client command packet that opens a top-level exchange, then
/// writes `packets` back. `begin_command` resets the connection's reader and
/// writer sequence counters independently (not kept in sync the way the
/// handshake/auth exchange does), so the response's own sequence restarts at
/// 0 regardless of what the client's request packet carried.
pub async fn respond(io: &mut DuplexStream, packets: &[Vec<u8>]) {
    read_and_discard_packet(io).await;
    let mut seq = 0u8;
    for packet in packets {
        write_packet(io, seq, packet).await;
        seq = seq.wrapping_add(1);
    }
}

// ---- capability/status bits the fake server negotiates ----

/// `PROTOCOL_41 | TRANSACTIONS | SECURE_CONNECTION | PLUGIN_AUTH`. Neither
/// `DEPRECATE_EOF` nor `SSL` is advertised, so the client falls back to
/// classic `EOF` terminators over plaintext.
const FAKE_SERVER_CAPABILITIES: u32 = (1 << 9) | (1 << 13) | (1 << 15) | (1 << 19);

pub const AUTOCOMMIT_STATUS: u16 = 1 << 1;

fn handshake_payload() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(10); // protocol_version
    buf.extend_from_slice(b"8.0.34-fake\0");
    buf.extend_from_slice(&1u32.to_le_bytes()); // connection_id

    let scramble = b"01234567890123456789"; // 20-byte nonce, unused: auth isn't validated
    buf.extend_from_slice(&scramble[..8]);
    buf.push(0); // filler

    buf.extend_from_slice(&(FAKE_SERVER_CAPABILITIES as u16).to_le_bytes());
    buf.push(45); // utf8mb4_general_ci
    buf.extend_from_slice(&AUTOCOMMIT_STATUS.to_le_bytes());
    buf.extend_from_slice(&((FAKE_SERVER_CAPABILITIES >> 16) as u16).to_le_bytes());

    buf.push(21); // auth_plugin_data_len: 20-byte scramble + 1
    buf.extend_from_slice(&[0u8; 10]); // reserved

    buf.extend_from_slice(&scramble[8..20]);
    buf.push(0); // the second scramble part is always NUL-terminated
    buf.extend_from_slice(b"mysql_native_password\0");
    buf
}

fn ok_packet_bytes() -> Vec<u8> {
    let mut buf = vec![0x00];
    put_uint_lenenc(&mut buf, 0); // affected_rows
    put_uint_lenenc(&mut buf, 0); // last_insert_id
    buf.extend_from_slice(&AUTOCOMMIT_STATUS.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes()); // warnings
    buf
}

/// `mysql_native_password` with an empty configured password hashes to an
/// empty auth response, so the handshake response's contents never need to
/// be checked — this plays back the handshake unconditionally.
pub async fn handshake_and_auth(io: &mut DuplexStream) {
    write_packet(io, 0, &handshake_payload()).await;
    read_and_discard_packet(io).await; // HandshakeResponse41
    write_packet(io, 2, &ok_packet_bytes()).await;
}

/// `OK_Packet` for a non-SELECT command (`SET`, `SAVEPOINT`, `COMMIT`, ...).
pub fn ok_response() -> Vec<Vec<u8>> {
    vec![ok_packet_bytes()]
}

// ---- column definitions and rows ----

pub const TYPE_LONG: u8 = 3;
pub const TYPE_VAR_STRING: u8 = 253;

pub fn column_def_bytes(name: &str, type_id: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    put_str_lenenc(&mut buf, "def");
    put_str_lenenc(&mut buf, ""); // schema
    put_str_lenenc(&mut buf, ""); // table_alias
    put_str_lenenc(&mut buf, ""); // table
    put_str_lenenc(&mut buf, name); // column_alias
    put_str_lenenc(&mut buf, name); // column
    put_uint_lenenc(&mut buf, 0x0c); // fixed-length fields marker
    buf.extend_from_slice(&33u16.to_le_bytes()); // utf8_general_ci
    buf.extend_from_slice(&255u32.to_le_bytes()); // max_size
    buf.push(type_id);
    buf.extend_from_slice(&0u16.to_le_bytes()); // flags
    buf.push(0); // decimals
    buf.extend_from_slice(&[0, 0]); // filler
    buf
}

fn eof_bytes(status: u16) -> Vec<u8> {
    let mut buf = vec![0xFE];
    buf.extend_from_slice(&0u16.to_le_bytes()); // warnings
    buf.extend_from_slice(&status.to_le_bytes());
    buf
}

/// A `COM_QUERY` text result set: column count, one definition per column,
/// a classic `EOF`, the row payloads, and a terminating `EOF` carrying
/// `terminator_status`.
pub fn text_result_set(columns: &[(&str, u8)], rows: &[Vec<&str>], terminator_status: u16) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();

    let mut count = Vec::new();
    put_uint_lenenc(&mut count, columns.len() as u64);
    packets.push(count);

    for (name, type_id) in columns {
        packets.push(column_def_bytes(name, *type_id));
    }
    packets.push(eof_bytes(0));

    for row in rows {
        let mut payload = Vec::new();
        for value in row {
            put_str_lenenc(&mut payload, value);
        }
        packets.push(payload);
    }
    packets.push(eof_bytes(terminator_status));

    packets
}

/// One binary-protocol column value: `None` is SQL NULL, `Some` is the
/// already-encoded wire bytes (lenenc-prefixed for variable-width types,
/// raw fixed-width bytes otherwise — the same shape `Row::get` would hand a
/// `Codec::decode` for each).
pub enum BinaryCol {
    Int(i32),
    Str(&'static str),
}

fn binary_row_bytes(values: &[BinaryCol]) -> Vec<u8> {
    let mut buf = vec![0x00]; // header
    let null_len = (values.len() + 9) / 8;
    buf.extend_from_slice(&vec![0u8; null_len]); // no NULLs in any §8 scenario row

    for value in values {
        match value {
            BinaryCol::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            BinaryCol::Str(s) => put_str_lenenc(&mut buf, s),
        }
    }
    buf
}

fn binary_type_id(value: &BinaryCol) -> u8 {
    match value {
        BinaryCol::Int(_) => TYPE_LONG,
        BinaryCol::Str(_) => TYPE_VAR_STRING,
    }
}

/// A `COM_STMT_EXECUTE` binary result set, analogous to [`text_result_set`].
pub fn binary_result_set(names: &[&str], row: &[BinaryCol], terminator_status: u16) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();

    let mut count = Vec::new();
    put_uint_lenenc(&mut count, names.len() as u64);
    packets.push(count);

    for (name, value) in names.iter().zip(row) {
        packets.push(column_def_bytes(name, binary_type_id(value)));
    }
    packets.push(eof_bytes(0));
    packets.push(binary_row_bytes(row));
    packets.push(eof_bytes(terminator_status));

    packets
}

/// `COM_STMT_PREPARE_OK` plus its parameter/column metadata packets. Their
/// contents never get decoded by the client (only counted and drained), so
/// they're left empty.
pub fn prepare_ok_response(statement_id: u32, num_params: u16, num_columns: u16) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();

    let mut ok = vec![0x00];
    ok.extend_from_slice(&statement_id.to_le_bytes());
    ok.extend_from_slice(&num_columns.to_le_bytes());
    ok.extend_from_slice(&num_params.to_le_bytes());
    ok.push(0); // filler
    ok.extend_from_slice(&0u16.to_le_bytes()); // warning_count
    packets.push(ok);

    for _ in 0..num_params {
        packets.push(Vec::new());
    }
    if num_params > 0 {
        packets.push(eof_bytes(0));
    }
    for _ in 0..num_columns {
        packets.push(Vec::new());
    }
    if num_columns > 0 {
        packets.push(eof_bytes(0));
    }

    packets
}

const SERVER_MORE_RESULTS_EXISTS: u16 = 1 << 3;
const SERVER_PS_OUT_PARAMS: u16 = 1 << 12;

pub fn more_results_status() -> u16 {
    AUTOCOMMIT_STATUS | SERVER_MORE_RESULTS_EXISTS
}

pub fn out_params_status() -> u16 {
    AUTOCOMMIT_STATUS | SERVER_PS_OUT_PARAMS
}

/// Spawns `server` driving the opposite end of a fresh duplex pipe, then
/// establishes a [`MySqlConnection`] over the client end. `server` is handed
/// a ready-to-script `DuplexStream` — it's expected to call
/// [`handshake_and_auth`] first, then [`respond`] once per subsequent
/// top-level command the test drives.
pub async fn connect_with_server<F, Fut>(server: F) -> MySqlConnection
where
    F: FnOnce(DuplexStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (client, server_half) = tokio::io::duplex(64 * 1024);
    tokio::spawn(server(server_half));

    let options = Arc::new(
        DataSourceOptions::builder()
            .ssl(SslMode::Disabled)
            .build()
            .expect("default options with SSL disabled are valid"),
    );

    MySqlConnection::establish_over(Box::new(FakeSocket(client)), options)
        .await
        .expect("handshake against the fake server should succeed")
}
