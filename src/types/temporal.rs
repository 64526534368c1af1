use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::io::{Buf, BufMut};
use crate::protocol::TypeId;
use crate::types::{Codec, Format, MySqlTypeInfo, RawValue};

fn encode_date(date: &NaiveDate, buf: &mut Vec<u8>) {
    buf.put_u16(date.year() as u16);
    buf.put_u8(date.month() as u8);
    buf.put_u8(date.day() as u8);
}

fn decode_date(bytes: &[u8]) -> crate::Result<NaiveDate> {
    let mut buf = bytes;
    let year = buf.get_u16()? as i32;
    let month = buf.get_u8()? as u32;
    let day = buf.get_u8()? as u32;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        crate::Error::data(format!("invalid date {year:04}-{month:02}-{day:02}"))
    })
}

impl Codec for NaiveDate {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::DATE)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(info.type_id, TypeId::DATE | TypeId::NEWDATE)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_u8(4);
        encode_date(self, buf);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        match value.format {
            Format::Text => parse_date(value.as_str()?),
            Format::Binary => {
                let bytes = value.as_bytes()?;
                if bytes.is_empty() {
                    return Err(crate::Error::data(
                        "zero dates (0000-00-00) are not representable",
                    ));
                }
                decode_date(&bytes[1..])
            }
        }
    }
}

fn parse_date(s: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| crate::Error::data(format!("{s:?} is not a valid DATE: {e}")))
}

impl Codec for NaiveDateTime {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::DATETIME)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        matches!(info.type_id, TypeId::DATETIME | TypeId::TIMESTAMP)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let micros = self.and_utc().timestamp_subsec_micros();
        let len: u8 = if self.hour() == 0 && self.minute() == 0 && self.second() == 0 && micros == 0
        {
            4
        } else if micros == 0 {
            7
        } else {
            11
        };

        buf.put_u8(len);
        encode_date(&self.date(), buf);

        if len >= 7 {
            buf.put_u8(self.hour() as u8);
            buf.put_u8(self.minute() as u8);
            buf.put_u8(self.second() as u8);
        }

        if len == 11 {
            buf.put_u32(micros);
        }
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        match value.format {
            Format::Text => parse_datetime(value.as_str()?),
            Format::Binary => {
                let bytes = value.as_bytes()?;
                if bytes.is_empty() {
                    return Err(crate::Error::data("zero datetimes are not representable"));
                }

                let len = bytes[0];
                let date = decode_date(&bytes[1..5])?;

                let (hour, minute, second, micros) = if len >= 7 {
                    let mut rest = &bytes[5..];
                    let h = rest.get_u8()? as u32;
                    let m = rest.get_u8()? as u32;
                    let s = rest.get_u8()? as u32;
                    let us = if len == 11 { rest.get_u32()? } else { 0 };
                    (h, m, s, us)
                } else {
                    (0, 0, 0, 0)
                };

                date.and_hms_micro_opt(hour, minute, second, micros)
                    .ok_or_else(|| crate::Error::data("invalid time-of-day in DATETIME"))
            }
        }
    }
}

#[cfg(test)]
mod roundtrip_tests {
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

    #[test]
    fn date_round_trips_through_the_binary_wire_format() {
        binary_roundtrip(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn datetime_round_trips_at_every_length_variant() {
        binary_roundtrip(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
        binary_roundtrip(
            NaiveDate::from_ymd_opt(2024, 6, 15)
                .unwrap()
                .and_hms_opt(13, 45, 9)
                .unwrap(),
        );
        binary_roundtrip(
            NaiveDate::from_ymd_opt(2024, 6, 15)
                .unwrap()
                .and_hms_micro_opt(13, 45, 9, 123_456)
                .unwrap(),
        );
    }

    #[test]
    fn time_round_trips_with_and_without_microseconds() {
        binary_roundtrip(NaiveTime::from_hms_opt(23, 59, 1).unwrap());
        binary_roundtrip(NaiveTime::from_hms_micro_opt(1, 2, 3, 987_654).unwrap());
    }

    #[test]
    fn zero_date_is_not_representable() {
        let raw = RawValue {
            info: NaiveDate::type_info(),
            format: Format::Binary,
            bytes: Some(&[]),
        };
        assert!(matches!(NaiveDate::decode(&raw), Err(crate::Error::Data { .. })));
    }
}

fn parse_datetime(s: &str) -> crate::Result<NaiveDateTime> {
    let format = if s.contains('.') {
        "%Y-%m-%d %H:%M:%S%.f"
    } else if s.contains(':') {
        "%Y-%m-%d %H:%M:%S"
    } else {
        "%Y-%m-%d"
    };

    NaiveDateTime::parse_from_str(s, format)
        .or_else(|_| parse_date(s).map(|d| d.and_hms_opt(0, 0, 0).unwrap()))
        .map_err(|e| crate::Error::data(format!("{s:?} is not a valid DATETIME: {e}")))
}

impl Codec for NaiveTime {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::new(TypeId::TIME)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let micros = self.nanosecond() / 1000;
        let len: u8 = if micros == 0 { 8 } else { 12 };

        buf.put_u8(len);
        buf.put_u8(0); // is_negative
        buf.put_u32(0); // days
        buf.put_u8(self.hour() as u8);
        buf.put_u8(self.minute() as u8);
        buf.put_u8(self.second() as u8);

        if len == 12 {
            buf.put_u32(micros);
        }
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        match value.format {
            Format::Text => NaiveTime::parse_from_str(value.as_str()?, "%H:%M:%S")
                .map_err(|e| crate::Error::data(format!("invalid TIME literal: {e}"))),
            Format::Binary => {
                let bytes = value.as_bytes()?;
                if bytes.is_empty() {
                    return Ok(NaiveTime::from_hms_opt(0, 0, 0).unwrap());
                }

                let mut rest = &bytes[1..];
                let is_negative = rest.get_u8()?;
                if is_negative != 0 {
                    return Err(crate::Error::feature_not_supported(
                        "negative TIME values are not supported",
                    ));
                }
                let _days = rest.get_u32()?;
                let hour = rest.get_u8()? as u32;
                let minute = rest.get_u8()? as u32;
                let second = rest.get_u8()? as u32;
                let micros = if rest.len() >= 4 { rest.get_u32()? } else { 0 };

                NaiveTime::from_hms_micro_opt(hour, minute, second, micros)
                    .ok_or_else(|| crate::Error::data("invalid TIME value"))
            }
        }
    }
}
