use crate::io::BufMut;
use crate::protocol::TypeId;
use crate::types::{Codec, MySqlTypeInfo, RawValue};

/// A `BIT(M)` value, carried as the raw big-endian byte string the wire
/// protocol uses for it in both directions (there is no dedicated binary
/// layout distinct from the length-encoded string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bits(pub Vec<u8>);

impl Bits {
    pub fn get(&self, index: usize) -> bool {
        let byte = index / 8;
        let bit = 7 - (index % 8);
        self.0
            .get(self.0.len().wrapping_sub(1).wrapping_sub(byte))
            .map(|b| b & (1 << bit) != 0)
            .unwrap_or(false)
    }
}

impl Codec for Bits {
    fn type_info() -> MySqlTypeInfo {
        MySqlTypeInfo::binary(TypeId::BIT)
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        info.type_id == TypeId::BIT
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.put_bytes_lenenc(&self.0);
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        Ok(Bits(value.as_bytes()?.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Buf;
    use crate::types::Format;

    #[test]
    fn bits_round_trip_through_the_lenenc_wire_format() {
        let value = Bits(vec![0b1010_0000, 0b0000_0001]);
        let mut encoded = Vec::new();
        value.encode(&mut encoded);
        let mut cursor = &encoded[..];
        let content = Buf::get_bytes_lenenc(&mut cursor).unwrap();
        let raw = RawValue {
            info: Bits::type_info(),
            format: Format::Binary,
            bytes: content,
        };
        assert_eq!(Bits::decode(&raw).unwrap(), value);
    }

    #[test]
    fn get_reads_bits_most_significant_first() {
        let bits = Bits(vec![0b0000_0101]);
        assert!(!bits.get(0));
        assert!(bits.get(5));
        assert!(bits.get(7));
    }
}
