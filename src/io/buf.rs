use crate::error::Error;
use byteorder::{ByteOrder, LittleEndian};
use memchr::memchr;

/// Read-side cursor over a packet payload.
///
/// All multi-byte integers in the MySQL wire protocol are little-endian, so
/// every accessor here is hard-wired to `LittleEndian` rather than taking a
/// `ByteOrder` type parameter; the protocol never varies this.
pub trait Buf {
    fn get_u8(&mut self) -> crate::Result<u8>;
    fn get_u16(&mut self) -> crate::Result<u16>;
    fn get_u24(&mut self) -> crate::Result<u32>;
    fn get_u32(&mut self) -> crate::Result<u32>;
    fn get_u64(&mut self) -> crate::Result<u64>;
    fn get_i8(&mut self) -> crate::Result<i8>;
    fn get_i16(&mut self) -> crate::Result<i16>;
    fn get_i32(&mut self) -> crate::Result<i32>;
    fn get_i64(&mut self) -> crate::Result<i64>;
    fn get_f32(&mut self) -> crate::Result<f32>;
    fn get_f64(&mut self) -> crate::Result<f64>;

    fn get_bytes(&mut self, n: usize) -> crate::Result<&[u8]>;
    fn get_str(&mut self, n: usize) -> crate::Result<&str>;
    fn get_str_nul(&mut self) -> crate::Result<&str>;

    fn advance(&mut self, n: usize);

    /// Length-encoded integer: `0xFB` = NULL, `< 0xFB` = literal, `0xFC` + u16,
    /// `0xFD` + u24, `0xFE` + u64.
    fn get_uint_lenenc(&mut self) -> crate::Result<Option<u64>>;
    fn get_bytes_lenenc(&mut self) -> crate::Result<Option<&[u8]>>;
    fn get_str_lenenc(&mut self) -> crate::Result<Option<&str>>;
}

impl Buf for &'_ [u8] {
    fn get_u8(&mut self) -> crate::Result<u8> {
        let (&byte, rest) = self
            .split_first()
            .ok_or_else(|| protocol_err!("expected 1 more byte, buffer was empty"))?;
        *self = rest;
        Ok(byte)
    }

    fn get_u16(&mut self) -> crate::Result<u16> {
        let bytes = self.get_bytes(2)?;
        Ok(LittleEndian::read_u16(bytes))
    }

    fn get_u24(&mut self) -> crate::Result<u32> {
        let bytes = self.get_bytes(3)?;
        Ok(LittleEndian::read_u24(bytes))
    }

    fn get_u32(&mut self) -> crate::Result<u32> {
        let bytes = self.get_bytes(4)?;
        Ok(LittleEndian::read_u32(bytes))
    }

    fn get_u64(&mut self) -> crate::Result<u64> {
        let bytes = self.get_bytes(8)?;
        Ok(LittleEndian::read_u64(bytes))
    }

    fn get_i8(&mut self) -> crate::Result<i8> {
        Ok(self.get_u8()? as i8)
    }

    fn get_i16(&mut self) -> crate::Result<i16> {
        Ok(self.get_u16()? as i16)
    }

    fn get_i32(&mut self) -> crate::Result<i32> {
        Ok(self.get_u32()? as i32)
    }

    fn get_i64(&mut self) -> crate::Result<i64> {
        Ok(self.get_u64()? as i64)
    }

    fn get_f32(&mut self) -> crate::Result<f32> {
        let bytes = self.get_bytes(4)?;
        Ok(LittleEndian::read_f32(bytes))
    }

    fn get_f64(&mut self) -> crate::Result<f64> {
        let bytes = self.get_bytes(8)?;
        Ok(LittleEndian::read_f64(bytes))
    }

    fn get_bytes(&mut self, n: usize) -> crate::Result<&[u8]> {
        if self.len() < n {
            return Err(protocol_err!(
                "expected {} more bytes, only {} remain",
                n,
                self.len()
            ));
        }
        let (head, tail) = self.split_at(n);
        *self = tail;
        Ok(head)
    }

    fn get_str(&mut self, n: usize) -> crate::Result<&str> {
        let bytes = self.get_bytes(n)?;
        std::str::from_utf8(bytes).map_err(|e| protocol_err!("invalid utf-8: {}", e))
    }

    fn get_str_nul(&mut self) -> crate::Result<&str> {
        let end = memchr(b'\0', self).ok_or_else(|| protocol_err!("expected NUL terminator"))?;
        let s = self.get_str(end)?;
        self.advance(1);
        Ok(s)
    }

    fn advance(&mut self, n: usize) {
        *self = &self[n.min(self.len())..];
    }

    fn get_uint_lenenc(&mut self) -> crate::Result<Option<u64>> {
        Ok(match self.get_u8()? {
            0xFB => None,
            0xFC => Some(self.get_u16()? as u64),
            0xFD => Some(self.get_u24()? as u64),
            0xFE => Some(self.get_u64()?),
            small => Some(small as u64),
        })
    }

    fn get_bytes_lenenc(&mut self) -> crate::Result<Option<&[u8]>> {
        match self.get_uint_lenenc()? {
            Some(len) => Ok(Some(self.get_bytes(len as usize)?)),
            None => Ok(None),
        }
    }

    fn get_str_lenenc(&mut self) -> crate::Result<Option<&str>> {
        match self.get_bytes_lenenc()? {
            Some(bytes) => {
                Ok(Some(std::str::from_utf8(bytes).map_err(|e| {
                    protocol_err!("invalid utf-8: {}", e)
                })?))
            }
            None => Ok(None),
        }
    }
}

/// Number of bytes [`put_uint_lenenc`](super::BufMut::put_uint_lenenc) will
/// use to encode `n`. Exposed so the null-bitmap/packet-size arithmetic in
/// callers can pre-size buffers without re-running the encoder.
pub fn lenenc_width(n: u64) -> usize {
    if n < 251 {
        1
    } else if n < 1 << 16 {
        3
    } else if n < 1 << 24 {
        4
    } else {
        9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufMut;

    #[test]
    fn lenenc_width_matches_encoded_length() {
        for n in [0u64, 250, 251, 65535, 65536, 1 << 24, u64::MAX] {
            let mut buf = Vec::new();
            buf.put_uint_lenenc(n);
            assert_eq!(buf.len(), lenenc_width(n), "n = {n}");
        }
    }

    #[test]
    fn lenenc_int_round_trips() {
        for n in [0u64, 1, 250, 251, 65535, 65536, 1 << 24, u64::MAX] {
            let mut buf = Vec::new();
            buf.put_uint_lenenc(n);
            let mut read = &buf[..];
            assert_eq!(read.get_uint_lenenc().unwrap(), Some(n));
        }
    }

    #[test]
    fn lenenc_string_round_trips() {
        let mut buf = Vec::new();
        buf.put_str_lenenc("hello, world");
        let mut read = &buf[..];
        assert_eq!(read.get_str_lenenc().unwrap(), Some("hello, world"));
    }

    #[test]
    fn nul_terminated_string_stops_at_first_zero() {
        let mut buf = b"abc\0def".to_vec();
        let mut read = &buf[..];
        assert_eq!(read.get_str_nul().unwrap(), "abc");
        assert_eq!(read, b"def");
        buf.clear();
    }
}
