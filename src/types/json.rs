use serde::{de::DeserializeOwned, Serialize};

use crate::io::BufMut;
use crate::protocol::TypeId;
use crate::types::{Codec, MySqlTypeInfo, RawValue};

/// Wraps a `Serialize + DeserializeOwned` value so it can be bound as a
/// statement parameter or read from a result set column backed by MySQL's
/// `JSON` type, which the server always sends as a text string regardless of
/// the row format in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize + DeserializeOwned> Codec for Json<T> {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::JSON)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(info.type_id, TypeId::JSON | TypeId::VARCHAR | TypeId::VAR_STRING | TypeId::STRING)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let text = serde_json::to_string(&self.0).expect("T's Serialize impl cannot fail");
        buf.put_str_lenenc(&text);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        let text = value.as_str()?;
        serde_json::from_str(text)
            .map(Json)
            .map_err(|e| crate::Error::data(format!("invalid JSON value: {e}")))
    }
}

impl Codec for serde_json::Value {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::JSON)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(info.type_id, TypeId::JSON | TypeId::VARCHAR | TypeId::VAR_STRING | TypeId::STRING)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_str_lenenc(&self.to_string());
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        serde_json::from_str(value.as_str()?)
            .map_err(|e| crate::Error::data(format!("invalid JSON value: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Buf;
    use crate::types::Format;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

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
    fn json_wrapper_round_trips_a_struct() {
        lenenc_roundtrip(Json(Point { x: 1, y: -2 }));
    }

    #[test]
    fn serde_json_value_round_trips_through_the_lenenc_wire_format() {
        lenenc_roundtrip(serde_json::json!({ "a": [1, 2, 3], "b": null }));
    }

    #[test]
    fn invalid_json_text_is_a_data_error() {
        let raw = RawValue {
            info: Json::<Point>::type_info(),
            format: Format::Binary,
            bytes: Some(b"not json"),
        };
        assert!(matches!(Json::<Point>::decode(&raw), Err(crate::Error::Data { .. })));
    }
}
