//! Wire-level packet framing and the MySQL client/server protocol packets.
//!
//! Conforms to the MySQL 5.7.x / 8.x client/server protocol: Handshake V10,
//! SSL Request, Handshake Response 41, the `COM_*` command family, and the
//! OK / ERR / EOF / AuthSwitchRequest / AuthMoreData / ColumnCount /
//! ColumnDefinition 41 response packets.

mod capabilities;
mod column_count;
mod column_def;
mod commands;
mod eof;
mod err;
mod field;
mod handshake;
mod handshake_response;
mod ok;
mod packet;
mod row;
mod statement;
mod status;
mod type_id;

pub use capabilities::Capabilities;
pub use column_count::ColumnCount;
pub use column_def::RawColumnDefinition;
pub use commands::{
    ComChangeUser, ComInitDb, ComPing, ComQuery, ComQuit, ComResetConnection, ComSetOption,
    ComStatistics, SetOption,
};
pub use eof::EofPacket;
pub use err::ErrPacket;
pub use field::FieldFlags;
pub use handshake::{caching_sha2_status, AuthMoreData, AuthSwitchRequest, Handshake};
pub use handshake_response::{HandshakeResponse, SslRequest};
pub use ok::OkPacket;
pub use packet::{Decode, Encode, PacketReader, PacketWriter};
pub use row::{BinaryRow, Row, TextRow};
pub use statement::{
    ComStmtClose, ComStmtExecute, ComStmtFetch, ComStmtPrepare, ComStmtPrepareOk,
    ComStmtReset, ComStmtSendLongData, CursorType, ParamType,
};
pub use status::ServerStatus;
pub use type_id::TypeId;

/// First byte of a generic response packet.
pub mod marker {
    pub const OK: u8 = 0x00;
    pub const EOF: u8 = 0xFE;
    pub const ERR: u8 = 0xFF;
    pub const AUTH_SWITCH: u8 = 0xFE;
    pub const AUTH_MORE_DATA: u8 = 0x01;
    pub const LOCAL_INFILE: u8 = 0xFB;
}

/// Command bytes from §6.1.
pub mod command {
    pub const QUIT: u8 = 0x01;
    pub const INIT_DB: u8 = 0x02;
    pub const QUERY: u8 = 0x03;
    pub const STATISTICS: u8 = 0x09;
    pub const PING: u8 = 0x0E;
    pub const CHANGE_USER: u8 = 0x11;
    pub const RESET_CONNECTION: u8 = 0x1F;
    pub const SET_OPTION: u8 = 0x1B;
    pub const STMT_PREPARE: u8 = 0x16;
    pub const STMT_EXECUTE: u8 = 0x17;
    pub const STMT_SEND_LONG_DATA: u8 = 0x18;
    pub const STMT_CLOSE: u8 = 0x19;
    pub const STMT_RESET: u8 = 0x1A;
    pub const STMT_FETCH: u8 = 0x1C;
}
