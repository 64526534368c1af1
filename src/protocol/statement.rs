use crate::io::{Buf, BufMut};
use crate::protocol::{command, TypeId};

bitflags::bitflags! {
    /// Cursor mode requested in `COM_STMT_EXECUTE`. Only `NO_CURSOR` and
    /// `READ_ONLY` are meaningful here: `READ_ONLY` asks the server to keep
    /// server-side state alive so a later `COM_STMT_FETCH` can page through
    /// the result set instead of returning it all at once, which backs the
    /// scrollable `ResultSet` variant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CursorType: u8 {
        const NO_CURSOR = 0;
        const READ_ONLY = 1;
        const FOR_UPDATE = 2;
        const SCROLLABLE = 4;
    }
}

/// `COM_STMT_PREPARE`: asks the server to parse `sql` and allocate a
/// server-side statement handle.
#[derive(Debug, Clone, Copy)]
pub struct ComStmtPrepare<'a> {
    pub sql: &'a str,
}

impl super::Encode for ComStmtPrepare<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STMT_PREPARE);
        buf.put_bytes(self.sql.as_bytes());
    }
}

/// `COM_STMT_PREPARE_OK`: acknowledges a prepare, naming the statement
/// handle and how many columns/parameters definitions to expect next.
#[derive(Debug, Clone, Copy)]
pub struct ComStmtPrepareOk {
    pub statement_id: u32,
    pub num_columns: u16,
    pub num_params: u16,
    pub warning_count: u16,
}

impl<'a> super::Decode<'a> for ComStmtPrepareOk {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let status = buf.get_u8()?;
        if status != 0 {
            return Err(protocol_err!(
                "expected COM_STMT_PREPARE_OK status 0x00; received 0x{:X}",
                status
            ));
        }

        let statement_id = buf.get_u32()?;
        let num_columns = buf.get_u16()?;
        let num_params = buf.get_u16()?;
        buf.advance(1); // filler
        let warning_count = buf.get_u16()?;

        Ok(Self {
            statement_id,
            num_columns,
            num_params,
            warning_count,
        })
    }
}

/// A single bound parameter's declared type, sent alongside its value only
/// on the first execution of a statement (the "new params bind flag").
#[derive(Debug, Clone, Copy)]
pub struct ParamType {
    pub type_id: TypeId,
    pub unsigned: bool,
}

/// `COM_STMT_EXECUTE`: runs a previously prepared statement with bound
/// parameters, binary protocol. `params` is the already-encoded parameter
/// value stream; `null_bitmap` marks which parameters are NULL (and are
/// therefore absent from `params`).
#[derive(Debug, Clone, Copy)]
pub struct ComStmtExecute<'a> {
    pub statement_id: u32,
    pub cursor_type: CursorType,
    pub null_bitmap: &'a [u8],
    pub param_types: Option<&'a [ParamType]>,
    pub params: &'a [u8],
}

impl super::Encode for ComStmtExecute<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STMT_EXECUTE);
        buf.put_u32(self.statement_id);
        buf.put_u8(self.cursor_type.bits());
        buf.put_u32(1); // iteration count, always 1

        if let Some(param_types) = self.param_types {
            buf.put_bytes(self.null_bitmap);
            buf.put_u8(1); // new params bind flag

            for ty in param_types {
                buf.put_u8(ty.type_id.0);
                buf.put_u8(if ty.unsigned { 0x80 } else { 0 });
            }
        }

        buf.put_bytes(self.params);
    }
}

/// `COM_STMT_FETCH`: pages `row_count` more rows from a statement executed
/// with a `READ_ONLY` cursor.
#[derive(Debug, Clone, Copy)]
pub struct ComStmtFetch {
    pub statement_id: u32,
    pub row_count: u32,
}

impl super::Encode for ComStmtFetch {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STMT_FETCH);
        buf.put_u32(self.statement_id);
        buf.put_u32(self.row_count);
    }
}

/// `COM_STMT_SEND_LONG_DATA`: streams part of a large parameter value (a
/// BLOB/TEXT too big to want buffered in memory) ahead of `COM_STMT_EXECUTE`.
/// The server never acknowledges this command.
#[derive(Debug, Clone, Copy)]
pub struct ComStmtSendLongData<'a> {
    pub statement_id: u32,
    pub param_id: u16,
    pub data: &'a [u8],
}

impl super::Encode for ComStmtSendLongData<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STMT_SEND_LONG_DATA);
        buf.put_u32(self.statement_id);
        buf.put_u16(self.param_id);
        buf.put_bytes(self.data);
    }
}

/// `COM_STMT_RESET`: clears long-data buffers and any open cursor for a
/// statement, without discarding the prepared handle itself.
#[derive(Debug, Clone, Copy)]
pub struct ComStmtReset {
    pub statement_id: u32,
}

impl super::Encode for ComStmtReset {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STMT_RESET);
        buf.put_u32(self.statement_id);
    }
}

/// `COM_STMT_CLOSE`: deallocates a server-side prepared statement. No
/// response is sent.
#[derive(Debug, Clone, Copy)]
pub struct ComStmtClose {
    pub statement_id: u32,
}

impl super::Encode for ComStmtClose {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STMT_CLOSE);
        buf.put_u32(self.statement_id);
    }
}
