use crate::io::Buf;
use crate::protocol::ServerStatus;

/// `EOF_Packet`, only seen when the server has not advertised
/// `CLIENT_DEPRECATE_EOF` (this client always requests it, but must still be
/// able to parse it from servers that ignore the request).
#[derive(Debug, Clone)]
pub struct EofPacket {
    pub warnings: u16,
    pub status: ServerStatus,
}

impl<'a> super::Decode<'a> for EofPacket {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let header = buf.get_u8()?;
        if header != crate::protocol::marker::EOF {
            return Err(protocol_err!("expected 0xFE; received 0x{:X}", header));
        }

        let warnings = buf.get_u16()?;
        let status = ServerStatus::from_bits_truncate(buf.get_u16()?);

        Ok(Self { warnings, status })
    }
}
