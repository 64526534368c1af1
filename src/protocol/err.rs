use crate::io::Buf;

/// `ERR_Packet`. The server can send this in place of any other response;
/// [`crate::Error::from_server`] classifies it into the crate's taxonomy by
/// SQLSTATE class.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_err_packet.html>
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: String,
    pub error_message: String,
}

impl<'a> super::Decode<'a> for ErrPacket {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let header = buf.get_u8()?;
        if header != crate::protocol::marker::ERR {
            return Err(protocol_err!("expected 0xFF; received 0x{:X}", header));
        }

        let error_code = buf.get_u16()?;

        // SQL state marker ('#') followed by the 5-character state itself;
        // both are only present with CLIENT_PROTOCOL_41, which this client
        // always negotiates.
        let _marker = buf.get_u8()?;
        let sql_state = buf.get_str(5)?.to_owned();
        let error_message = buf.get_str(buf.len())?.to_owned();

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

impl ErrPacket {
    pub fn into_error(self) -> crate::Error {
        crate::error::Error::from_server(self.error_code, &self.sql_state, &self.error_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Decode;

    const ERR_UNKNOWN_DB: &[u8] = b"\xff\x19\x04#42000Unknown database 'unknown'";

    #[test]
    fn decodes_err_unknown_database() {
        let mut buf = ERR_UNKNOWN_DB;
        let p = ErrPacket::decode(&mut buf).unwrap();

        assert_eq!(p.error_code, 1049);
        assert_eq!(p.sql_state, "42000");
        assert_eq!(p.error_message, "Unknown database 'unknown'");
    }
}
