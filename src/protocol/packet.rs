//! Packet framing: a generic MySQL packet is `payload.len()` as a 3-byte
//! little-endian integer, a 1-byte sequence number, and the payload itself.
//! Payloads at or above `0xFFFFFF` bytes are split across further packets
//! with consecutive sequence numbers; the split always ends with a packet
//! shorter than `0xFFFFFF` bytes, including a trailing empty one if the
//! payload's length happens to be an exact multiple of it.

use crate::io::BufStream;

/// Largest payload a single physical frame can carry before the next chunk
/// must be sent as a separate packet with the next sequence number.
const MAX_PACKET_SIZE: usize = 0xFF_FFFF;

/// A packet payload that can be parsed out of a reassembled packet body.
///
/// Implementations borrow from the input rather than copying, mirroring the
/// lifetime of the reassembled buffer the caller owns.
pub trait Decode<'a>: Sized {
    fn decode(buf: &mut &'a [u8]) -> crate::Result<Self>;
}

/// A packet payload that can be serialized into an outgoing packet body.
pub trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);
}

/// Reassembles logical packets from a [`BufStream`], tracking the sequence
/// number the server is expected to echo back.
#[derive(Debug, Default)]
pub struct PacketReader {
    seq_no: u8,
}

impl PacketReader {
    pub fn new() -> Self {
        Self { seq_no: 0 }
    }

    /// Every new command restarts the sequence id at 0.
    pub fn reset_sequence(&mut self) {
        self.seq_no = 0;
    }

    pub fn sequence(&self) -> u8 {
        self.seq_no
    }

    pub fn set_sequence(&mut self, seq_no: u8) {
        self.seq_no = seq_no;
    }

    /// Reads one logical packet, reassembling split frames, and returns its
    /// payload. The sequence counter is left pointing at the next id this
    /// side should send.
    pub async fn recv(&mut self, stream: &mut BufStream) -> crate::Result<Vec<u8>> {
        let mut payload = Vec::new();

        loop {
            let header = stream.peek(4).await?;
            let mut hdr = [0u8; 4];
            hdr.copy_from_slice(header);
            stream.consume(4);

            let len = u32::from_le_bytes([hdr[0], hdr[1], hdr[2], 0]) as usize;
            let seq_no = hdr[3];

            if seq_no != self.seq_no {
                return Err(protocol_err!(
                    "out-of-order packet: expected sequence {}, got {}",
                    self.seq_no,
                    seq_no
                ));
            }
            self.seq_no = self.seq_no.wrapping_add(1);

            let chunk = stream.peek(len).await?;
            payload.extend_from_slice(chunk);
            stream.consume(len);

            if len < MAX_PACKET_SIZE {
                break;
            }
        }

        Ok(payload)
    }
}

/// Splits an outgoing payload across one or more physical frames, writing
/// directly into the stream's write buffer.
#[derive(Debug, Default)]
pub struct PacketWriter {
    seq_no: u8,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self { seq_no: 0 }
    }

    pub fn reset_sequence(&mut self) {
        self.seq_no = 0;
    }

    pub fn sequence(&self) -> u8 {
        self.seq_no
    }

    /// Used when a response (e.g. `AuthSwitchRequest`) dictates the sequence
    /// id our next packet must carry, rather than the one we'd compute.
    pub fn set_sequence(&mut self, seq_no: u8) {
        self.seq_no = seq_no;
    }

    pub fn send(&mut self, stream: &mut BufStream, payload: &[u8]) {
        let mut remaining = payload;

        loop {
            let chunk_len = remaining.len().min(MAX_PACKET_SIZE);
            let (chunk, rest) = remaining.split_at(chunk_len);

            let buf = stream.buffer_mut();
            buf.extend_from_slice(&(chunk_len as u32).to_le_bytes()[..3]);
            buf.push(self.seq_no);
            buf.extend_from_slice(chunk);

            self.seq_no = self.seq_no.wrapping_add(1);
            remaining = rest;

            if chunk_len < MAX_PACKET_SIZE {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_under_limit() {
        let mut writer = PacketWriter::new();
        let mut stream_buf = Vec::new();
        let payload = b"select 1";
        stream_buf.extend_from_slice(&(payload.len() as u32).to_le_bytes()[..3]);
        stream_buf.push(0);
        stream_buf.extend_from_slice(payload);

        let mut buf = Vec::new();
        writer.send_into(&mut buf, payload);
        assert_eq!(buf, stream_buf);
    }

    #[test]
    fn exact_multiple_of_max_gets_trailing_empty_frame() {
        let mut writer = PacketWriter::new();
        let payload = vec![0u8; MAX_PACKET_SIZE];
        let mut buf = Vec::new();
        writer.send_into(&mut buf, &payload);

        // header + payload, then a zero-length terminator frame.
        assert_eq!(buf.len(), 4 + MAX_PACKET_SIZE + 4);
        assert_eq!(&buf[buf.len() - 4..buf.len() - 1], &[0, 0, 0]);
        assert_eq!(buf[buf.len() - 1], 1);
    }

    impl PacketWriter {
        fn send_into(&mut self, buf: &mut Vec<u8>, payload: &[u8]) {
            let mut remaining = payload;
            loop {
                let chunk_len = remaining.len().min(MAX_PACKET_SIZE);
                let (chunk, rest) = remaining.split_at(chunk_len);
                buf.extend_from_slice(&(chunk_len as u32).to_le_bytes()[..3]);
                buf.push(self.seq_no);
                buf.extend_from_slice(chunk);
                self.seq_no = self.seq_no.wrapping_add(1);
                remaining = rest;
                if chunk_len < MAX_PACKET_SIZE {
                    break;
                }
            }
        }
    }
}
