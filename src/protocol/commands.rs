use crate::io::BufMut;
use crate::protocol::command;

/// `COM_QUERY`: run a SQL statement directly, text protocol.
#[derive(Debug, Clone, Copy)]
pub struct ComQuery<'a> {
    pub sql: &'a str,
}

impl super::Encode for ComQuery<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::QUERY);
        buf.put_bytes(self.sql.as_bytes());
    }
}

/// `COM_INIT_DB`: changes the default schema for the session, equivalent to
/// `USE <schema>` but without a round-trip through the SQL parser.
#[derive(Debug, Clone, Copy)]
pub struct ComInitDb<'a> {
    pub schema: &'a str,
}

impl super::Encode for ComInitDb<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::INIT_DB);
        buf.put_bytes(self.schema.as_bytes());
    }
}

/// `COM_PING`: round-trip to confirm the connection is alive; always
/// answered with `OK_Packet` regardless of server state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComPing;

impl super::Encode for ComPing {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::PING);
    }
}

/// `COM_QUIT`: tells the server this side is closing the connection. No
/// response is expected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComQuit;

impl super::Encode for ComQuit {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::QUIT);
    }
}

/// `COM_STATISTICS`: returns a single human-readable status line (uptime,
/// threads, queries per second, …), not a structured result set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComStatistics;

impl super::Encode for ComStatistics {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::STATISTICS);
    }
}

/// `COM_RESET_CONNECTION`: resets session state (transaction, temp tables,
/// prepared statements, user variables) while keeping the TCP connection and
/// authentication open. Cheaper than a full reconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComResetConnection;

impl super::Encode for ComResetConnection {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::RESET_CONNECTION);
    }
}

/// `COM_SET_OPTION`: server-side toggle for the multi-statements protocol
/// capability, independent of what was negotiated at handshake time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOption {
    MultiStatementsOn = 0,
    MultiStatementsOff = 1,
}

#[derive(Debug, Clone, Copy)]
pub struct ComSetOption {
    pub option: SetOption,
}

impl super::Encode for ComSetOption {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::SET_OPTION);
        buf.put_u16(self.option as u16);
    }
}

/// `COM_CHANGE_USER`: re-authenticates the existing connection as a
/// different user (and optionally a different default schema) without
/// tearing down the TCP connection.
#[derive(Debug, Clone)]
pub struct ComChangeUser<'a> {
    pub username: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub collation: u8,
    pub auth_plugin_name: &'a str,
    pub connect_attrs: &'a [(String, String)],
}

impl super::Encode for ComChangeUser<'_> {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(command::CHANGE_USER);
        buf.put_str_nul(self.username);
        buf.put_u8(self.auth_response.len() as u8);
        buf.put_bytes(self.auth_response);
        buf.put_str_nul(self.database.unwrap_or(""));
        buf.put_u16(self.collation as u16);
        buf.put_str_nul(self.auth_plugin_name);

        let mut attrs = Vec::new();
        for (key, value) in self.connect_attrs {
            attrs.put_str_lenenc(key);
            attrs.put_str_lenenc(value);
        }
        buf.put_bytes_lenenc(&attrs);
    }
}
