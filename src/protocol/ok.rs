use crate::io::Buf;
use crate::protocol::ServerStatus;

/// `OK_Packet`, sent in response to most commands that do not return a
/// result set, and also used to terminate a binary/text result set when the
/// server advertises `CLIENT_DEPRECATE_EOF`.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_basic_ok_packet.html>
#[derive(Debug, Clone)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status: ServerStatus,
    pub warnings: u16,
    pub info: String,
}

impl<'a> super::Decode<'a> for OkPacket {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let header = buf.get_u8()?;
        if header != crate::protocol::marker::OK && header != crate::protocol::marker::EOF {
            return Err(protocol_err!(
                "expected OK (0x00) or 0xFE; received 0x{:X}",
                header
            ));
        }

        let affected_rows = buf.get_uint_lenenc()?.unwrap_or(0);
        let last_insert_id = buf.get_uint_lenenc()?.unwrap_or(0);
        let status = ServerStatus::from_bits_truncate(buf.get_u16()?);
        let warnings = buf.get_u16()?;
        let info = buf.get_str(buf.len())?.to_owned();

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Decode;

    const OK_HANDSHAKE: &[u8] = b"\x00\x00\x00\x02\x00\x00\x00";

    #[test]
    fn decodes_ok_after_handshake() {
        let mut buf = OK_HANDSHAKE;
        let p = OkPacket::decode(&mut buf).unwrap();

        assert_eq!(p.affected_rows, 0);
        assert_eq!(p.last_insert_id, 0);
        assert_eq!(p.warnings, 0);
        assert!(p.status.contains(ServerStatus::SERVER_STATUS_AUTOCOMMIT));
        assert!(p.info.is_empty());
    }
}
