use crate::io::BufMut;
use crate::protocol::TypeId;
use crate::types::{Codec, Format, MySqlTypeInfo, RawValue};

macro_rules! impl_integer_codec {
    ($ty:ty, $type_id:expr, $unsigned:expr, $put:ident) => {
        impl Codec for $ty {
            fn type_info() -> MySqlTypeInfo {
                if $unsigned {
                    MySqlTypeInfo::unsigned($type_id)
                } else {
                    MySqlTypeInfo::new($type_id)
                }
            }

            fn encode(&self, buf: &mut Vec<u8>) {
                buf.$put(*self);
            }

            fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
                match value.format {
                    Format::Text => {
                        let s = value.as_str()?;
                        atoi::atoi(s.as_bytes())
                            .ok_or_else(|| crate::Error::data(format!("{s:?} is not a valid integer")))
                    }
                    Format::Binary => {
                        let bytes = value.as_bytes()?;
                        decode_fixed_int(bytes)
                    }
                }
            }
        }
    };
}

fn decode_fixed_int<T: TryFromLeBytes>(bytes: &[u8]) -> crate::Result<T> {
    T::from_le_bytes(bytes).ok_or_else(|| crate::Error::protocol(format!(
        "expected {} bytes for a fixed-width integer, found {}",
        std::mem::size_of::<T>(),
        bytes.len()
    )))
}

trait TryFromLeBytes: Sized {
    fn from_le_bytes(bytes: &[u8]) -> Option<Self>;
}

macro_rules! impl_try_from_le_bytes {
    ($ty:ty) => {
        impl TryFromLeBytes for $ty {
            fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
                Some(<$ty>::from_le_bytes(bytes.try_into().ok()?))
            }
        }
    };
}

impl_try_from_le_bytes!(i8);
impl_try_from_le_bytes!(i16);
impl_try_from_le_bytes!(i32);
impl_try_from_le_bytes!(i64);
impl_try_from_le_bytes!(u8);
impl_try_from_le_bytes!(u16);
impl_try_from_le_bytes!(u32);
impl_try_from_le_bytes!(u64);

impl_integer_codec!(i8, TypeId::TINY, false, put_i8);
impl_integer_codec!(u8, TypeId::TINY, true, put_u8);
impl_integer_codec!(i16, TypeId::SHORT, false, put_i16);
impl_integer_codec!(u16, TypeId::SHORT, true, put_u16);
impl_integer_codec!(i32, TypeId::LONG, false, put_i32);
impl_integer_codec!(u32, TypeId::LONG, true, put_u32);
impl_integer_codec!(i64, TypeId::LONGLONG, false, put_i64);
impl_integer_codec!(u64, TypeId::LONGLONG, true, put_u64);

impl Codec for bool {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::TINY)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(*self as u8);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        match value.format {
            Format::Binary => Ok(value.as_bytes()?.first().copied().unwrap_or(0) != 0),
            Format::Text => match value.as_str()? {
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(crate::Error::data(format!("{other:?} is not a valid boolean"))),
            },
        }
    }
}

impl Codec for f32 {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::FLOAT)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(info.type_id, TypeId::FLOAT | TypeId::DOUBLE)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_f32(*self);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        match value.format {
            Format::Text => value
                .as_str()?
                .parse()
                .map_err(|_| crate::Error::data("invalid floating point literal")),
            Format::Binary => {
                let bytes = value.as_bytes()?;
                Ok(if bytes.len() == 8 {
                    // a DOUBLE column read as f32 narrows, matching the
                    // server's own behavior for a FLOAT-typed placeholder.
                    f64::from_le_bytes(bytes.try_into().unwrap()) as f32
                } else {
                    f32::from_le_bytes(bytes.try_into().map_err(|_| {
                        crate::Error::protocol("expected 4 bytes for FLOAT")
                    })?)
                })
            }
        }
    }
}

impl Codec for f64 {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::DOUBLE)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(info.type_id, TypeId::FLOAT | TypeId::DOUBLE)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_f64(*self);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        match value.format {
            Format::Text => value
                .as_str()?
                .parse()
                .map_err(|_| crate::Error::data("invalid floating point literal")),
            Format::Binary => {
                let bytes = value.as_bytes()?;
                let array: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| crate::Error::protocol("expected 8 bytes for DOUBLE"))?;
                Ok(f64::from_le_bytes(array))
            }
        }
    }
}

#[cfg(feature = "rust_decimal")]
mod decimal {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    impl Codec for Decimal {
        fn type_info() -> MySqlTypeInfo {
            MySqlTypeInfo::new(TypeId::NEWDECIMAL)
        }

        fn accepts(info: &MySqlTypeInfo) -> bool {
            matches!(info.type_id, TypeId::NEWDECIMAL | TypeId::DECIMAL)
        }

        fn encode(&self, buf: &mut Vec<u8>) {
            crate::io::BufMut::put_str_lenenc(buf, &self.to_string());
        }

        fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
            let s = match value.format {
                Format::Text => value.as_str()?,
                Format::Binary => {
                    let bytes = value.as_bytes()?;
                    let len = *bytes.first().ok_or_else(|| {
                        crate::Error::protocol("empty DECIMAL value")
                    })? as usize;
                    std::str::from_utf8(&bytes[1..1 + len]).map_err(|e| {
                        crate::Error::data(format!("DECIMAL is not valid UTF-8: {e}"))
                    })?
                }
            };

            Decimal::from_str(s)
                .map_err(|e| crate::Error::data(format!("{s:?} is not a valid DECIMAL: {e}")))
        }
    }
}

#[cfg(feature = "rust_decimal")]
pub use decimal::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_roundtrip<T: Codec + PartialEq + std::fmt::Debug>(value: T) {
        let mut buf = Vec::new();
        value.encode(&mut buf);
        let raw = RawValue {
            info: T::type_info(),
            format: Format::Binary,
            bytes: Some(&buf),
        };
        assert_eq!(T::decode(&raw).unwrap(), value);
    }

    fn text_roundtrip<T: Codec + PartialEq + std::fmt::Debug>(text: &str, expected: T) {
        let raw = RawValue {
            info: T::type_info(),
            format: Format::Text,
            bytes: Some(text.as_bytes()),
        };
        assert_eq!(T::decode(&raw).unwrap(), expected);
    }

    #[test]
    fn integers_round_trip_through_the_binary_wire_format() {
        binary_roundtrip(-42i8);
        binary_roundtrip(200u8);
        binary_roundtrip(-1000i16);
        binary_roundtrip(60000u16);
        // §8 scenario 1's literal int value.
        binary_roundtrip(2147483647i32);
        binary_roundtrip(4_000_000_000u32);
        binary_roundtrip(-9_000_000_000_000i64);
        binary_roundtrip(18_000_000_000_000_000_000u64);
    }

    #[test]
    fn integers_round_trip_through_the_text_wire_format() {
        text_roundtrip("2147483647", 2147483647i32);
        text_roundtrip("255", 255u8);
        text_roundtrip("-17", -17i64);
    }

    #[test]
    fn bool_reads_text_zero_one_and_binary_nonzero() {
        binary_roundtrip(true);
        binary_roundtrip(false);
        text_roundtrip("1", true);
        text_roundtrip("0", false);
    }

    #[test]
    fn floats_round_trip_through_the_binary_wire_format() {
        binary_roundtrip(3.5f32);
        binary_roundtrip(-2.25f64);
    }

    #[test]
    fn float_reads_widen_from_a_double_column() {
        let mut buf = Vec::new();
        1.5f64.encode(&mut buf);
        let raw = RawValue {
            info: MySqlTypeInfo::new(TypeId::DOUBLE),
            format: Format::Binary,
            bytes: Some(&buf),
        };
        assert_eq!(f32::decode(&raw).unwrap(), 1.5f32);
    }

    #[test]
    fn invalid_integer_text_is_a_data_error() {
        let raw = RawValue {
            info: i32::type_info(),
            format: Format::Text,
            bytes: Some(b"not-a-number"),
        };
        assert!(matches!(i32::decode(&raw), Err(crate::Error::Data { .. })));
    }
}
