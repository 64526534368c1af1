use byteorder::{ByteOrder, LittleEndian};

/// Write-side counterpart of [`Buf`](super::Buf). Implemented for `Vec<u8>`
/// so encoders can append directly to the stream's write buffer.
pub trait BufMut {
    fn put_u8(&mut self, v: u8);
    fn put_u16(&mut self, v: u16);
    fn put_u24(&mut self, v: u32);
    fn put_u32(&mut self, v: u32);
    fn put_u64(&mut self, v: u64);
    fn put_i8(&mut self, v: i8) {
        self.put_u8(v as u8);
    }
    fn put_i16(&mut self, v: i16) {
        self.put_u16(v as u16);
    }
    fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }
    fn put_i64(&mut self, v: i64) {
        self.put_u64(v as u64);
    }
    fn put_f32(&mut self, v: f32);
    fn put_f64(&mut self, v: f64);

    fn put_bytes(&mut self, bytes: &[u8]);
    fn put_str_nul(&mut self, s: &str);

    /// Encode `n` as a length-encoded integer: 1 byte if `< 251`, else a
    /// marker byte (`0xFC`/`0xFD`/`0xFE`) followed by a fixed-width integer.
    fn put_uint_lenenc(&mut self, n: u64);
    fn put_bytes_lenenc(&mut self, bytes: &[u8]);
    fn put_str_lenenc(&mut self, s: &str);
}

impl BufMut for Vec<u8> {
    fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, v);
        self.extend_from_slice(&buf);
    }

    fn put_u24(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, v);
        self.extend_from_slice(&buf[..3]);
    }

    fn put_u32(&mut self, v: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, v);
        self.extend_from_slice(&buf);
    }

    fn put_u64(&mut self, v: u64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, v);
        self.extend_from_slice(&buf);
    }

    fn put_f32(&mut self, v: f32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_f32(&mut buf, v);
        self.extend_from_slice(&buf);
    }

    fn put_f64(&mut self, v: f64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_f64(&mut buf, v);
        self.extend_from_slice(&buf);
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }

    fn put_str_nul(&mut self, s: &str) {
        self.extend_from_slice(s.as_bytes());
        self.push(0);
    }

    fn put_uint_lenenc(&mut self, n: u64) {
        if n < 251 {
            self.put_u8(n as u8);
        } else if n < 1 << 16 {
            self.put_u8(0xFC);
            self.put_u16(n as u16);
        } else if n < 1 << 24 {
            self.put_u8(0xFD);
            self.put_u24(n as u32);
        } else {
            self.put_u8(0xFE);
            self.put_u64(n);
        }
    }

    fn put_bytes_lenenc(&mut self, bytes: &[u8]) {
        self.put_uint_lenenc(bytes.len() as u64);
        self.put_bytes(bytes);
    }

    fn put_str_lenenc(&mut self, s: &str) {
        self.put_bytes_lenenc(s.as_bytes());
    }
}
