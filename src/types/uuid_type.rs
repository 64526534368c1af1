use uuid::Uuid;

use crate::protocol::TypeId;
use crate::types::{Codec, Format, MySqlTypeInfo, RawValue};

/// MySQL has no native UUID column type; servers store one as a `BINARY(16)`
/// or `CHAR(36)` column, so this accepts either wire shape and dispatches on
/// whether the bytes look like raw binary or a hyphenated string.
impl Codec for Uuid {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::binary(TypeId::BLOB)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(
            info.type_id,
            TypeId::BLOB
                | TypeId::TINY_BLOB
                | TypeId::MEDIUM_BLOB
                | TypeId::LONG_BLOB
                | TypeId::VARCHAR
                | TypeId::VAR_STRING
                | TypeId::STRING
        )
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        crate::io::BufMut::put_bytes_lenenc(buf, self.as_bytes());
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        let bytes = value.as_bytes()?;
        match value.format {
            Format::Binary if bytes.len() == 16 => Uuid::from_slice(bytes)
                .map_err(|e| crate::Error::data(format!("invalid UUID bytes: {e}"))),
            _ => {
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| crate::Error::data(format!("column is not valid UTF-8: {e}")))?;
                s.parse()
                    .map_err(|e| crate::Error::data(format!("{s:?} is not a valid UUID: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_binary_lenenc_wire_format() {
        let value = Uuid::new_v4();
        let mut encoded = Vec::new();
        value.encode(&mut encoded);
        let mut cursor = &encoded[..];
        let content = crate::io::Buf::get_bytes_lenenc(&mut cursor).unwrap();
        let raw = RawValue {
            info: Uuid::type_info(),
            format: Format::Binary,
            bytes: content,
        };
        assert_eq!(Uuid::decode(&raw).unwrap(), value);
    }

    #[test]
    fn reads_a_hyphenated_text_representation() {
        let value = Uuid::new_v4();
        let text = value.to_string();
        let raw = RawValue {
            info: MySqlTypeInfo::new(TypeId::VARCHAR),
            format: Format::Text,
            bytes: Some(text.as_bytes()),
        };
        assert_eq!(Uuid::decode(&raw).unwrap(), value);
    }
}
