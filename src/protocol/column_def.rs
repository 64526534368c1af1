use crate::io::Buf;
use crate::protocol::{FieldFlags, TypeId};

/// `ColumnDefinition41`, decoded once per column of a result set and cached
/// for the lifetime of that result set's metadata.
///
/// Named `Raw` to distinguish it from [`crate::column::ColumnDefinition`],
/// the public-facing type that derives `full_name` and exposes flag queries
/// as named predicates rather than a bitset.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/page_protocol_com_query_response_text_resultset_column_definition.html>
#[derive(Debug, Clone)]
pub struct RawColumnDefinition {
    pub schema: Option<String>,
    pub table_alias: Option<String>,
    pub table: Option<String>,
    pub column_alias: Option<String>,
    pub column: Option<String>,
    pub char_set: u16,
    pub max_size: u32,
    pub type_id: TypeId,
    pub flags: FieldFlags,
    pub decimals: u8,
}

impl<'a> super::Decode<'a> for RawColumnDefinition {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self> {
        let catalog = buf.get_str_lenenc()?;
        if catalog != Some("def") {
            return Err(protocol_err!(
                "expected catalog \"def\"; received {:?}",
                catalog
            ));
        }

        let schema = buf.get_str_lenenc()?.map(str::to_owned);
        let table_alias = buf.get_str_lenenc()?.map(str::to_owned);
        let table = buf.get_str_lenenc()?.map(str::to_owned);
        let column_alias = buf.get_str_lenenc()?.map(str::to_owned);
        let column = buf.get_str_lenenc()?.map(str::to_owned);

        let len_fixed_fields = buf.get_uint_lenenc()?.unwrap_or(0);
        if len_fixed_fields != 0x0c {
            return Err(protocol_err!(
                "expected fixed-length fields marker (0x0c); received {}",
                len_fixed_fields
            ));
        }

        let char_set = buf.get_u16()?;
        let max_size = buf.get_u32()?;
        let type_id = TypeId(buf.get_u8()?);
        let flags = FieldFlags::from_bits_truncate(buf.get_u16()?);
        let decimals = buf.get_u8()?;
        buf.advance(2); // filler

        Ok(Self {
            schema,
            table_alias,
            table,
            column_alias,
            column,
            char_set,
            max_size,
            type_id,
            flags,
            decimals,
        })
    }
}

impl RawColumnDefinition {
    /// The name a client should use to look a column up by name: the
    /// column's alias if one was given, else its real name.
    pub fn name(&self) -> Option<&str> {
        self.column_alias.as_deref().or(self.column.as_deref())
    }
}
