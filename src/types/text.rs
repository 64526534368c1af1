use crate::io::BufMut;
use crate::protocol::TypeId;
use crate::types::{Codec, MySqlTypeInfo, RawValue};

impl Codec for String {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::VARCHAR)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        !info.is_binary()
            && matches!(
                info.type_id,
                TypeId::VARCHAR
                    | TypeId::VAR_STRING
                    | TypeId::STRING
                    | TypeId::TINY_BLOB
                    | TypeId::MEDIUM_BLOB
                    | TypeId::LONG_BLOB
                    | TypeId::BLOB
                    | TypeId::ENUM
                    | TypeId::SET
            )
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_lenenc(self);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        Ok(value.as_str()?.to_owned())
    }
}

impl Codec for Vec<u8> {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::binary(TypeId::BLOB)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(
            info.type_id,
            TypeId::VARCHAR
                | TypeId::VAR_STRING
                | TypeId::STRING
                | TypeId::TINY_BLOB
                | TypeId::MEDIUM_BLOB
                | TypeId::LONG_BLOB
                | TypeId::BLOB
        )
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_bytes_lenenc(self);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        Ok(value.as_bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Buf;
    use crate::types::Format;

    fn lenenc_roundtrip<T: Codec + PartialEq + std::fmt::Debug>(value: T) {
        let mut encoded = Vec::new();
        value.encode(&mut encoded);
        let mut cursor = &encoded[..];
        let content = Buf::get_bytes_lenenc(&mut cursor).unwrap();
        let raw = RawValue {
            info: T::type_info(),
            format: Format::Binary,
            bytes: content,
        };
        assert_eq!(T::decode(&raw).unwrap(), value);
    }

    #[test]
    fn string_round_trips_through_the_lenenc_wire_format() {
        // §8 scenario 1's literal string value.
        lenenc_roundtrip("varchar value".to_owned());
        lenenc_roundtrip(String::new());
        lenenc_roundtrip("x".repeat(300));
    }

    #[test]
    fn bytes_round_trip_through_the_lenenc_wire_format() {
        lenenc_roundtrip(vec![0u8, 1, 2, 255, 254]);
        lenenc_roundtrip(Vec::<u8>::new());
    }

    #[test]
    fn string_accepts_matches_textual_and_enum_columns_but_not_binary() {
        assert!(String::accepts(&MySqlTypeInfo::new(TypeId::VARCHAR)));
        assert!(String::accepts(&MySqlTypeInfo::new(TypeId::ENUM)));
        assert!(!String::accepts(&MySqlTypeInfo::binary(TypeId::VARCHAR)));
    }
}
