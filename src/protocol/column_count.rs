use crate::io::Buf;

/// The lone length-encoded integer that opens a `COM_QUERY`/`COM_STMT_EXECUTE`
/// result set response, naming how many `ColumnDefinition41` packets follow.
#[derive(Debug, Clone, Copy)]
pub struct ColumnCount(pub u64);

impl<'a> super::Decode<'a> for ColumnCount {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let n = buf
            .get_uint_lenenc()?
            .ok_or_else(|| protocol_err!("unexpected NULL column count"))?;
        Ok(ColumnCount(n))
    }
}
