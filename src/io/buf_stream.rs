use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::net::MaybeTlsStream;

const READ_CHUNK: usize = 4096;

/// Buffers reads and writes around a [`MaybeTlsStream`] so the packet codec
/// can build up a whole frame in memory before touching the socket, and so a
/// `send()` of several packets only issues one `write`/`flush` pair.
pub struct BufStream {
    socket: MaybeTlsStream,
    rbuf: Vec<u8>,
    rpos: usize,
    wbuf: Vec<u8>,
}

impl BufStream {
    pub fn new(socket: MaybeTlsStream) -> Self {
        Self {
            socket,
            rbuf: Vec::with_capacity(READ_CHUNK),
            rpos: 0,
            wbuf: Vec::with_capacity(READ_CHUNK),
        }
    }

    pub fn is_tls(&self) -> bool {
        self.socket.is_tls()
    }

    pub fn into_parts(self) -> (MaybeTlsStream, Vec<u8>) {
        (self.socket, self.wbuf)
    }

    pub fn replace_socket(&mut self, socket: MaybeTlsStream) {
        self.socket = socket;
        self.rbuf.clear();
        self.rpos = 0;
    }

    /// Mutable handle to the outgoing buffer; packet encoders append to this
    /// directly and the packet writer patches the 4-byte header back in.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.wbuf
    }

    pub async fn flush(&mut self) -> crate::Result<()> {
        if !self.wbuf.is_empty() {
            self.socket.write_all(&self.wbuf).await?;
            self.wbuf.clear();
        }
        Ok(())
    }

    /// Returns at least `n` bytes without consuming them, reading more from
    /// the socket as needed. A call to `peek` with a larger `n` than the last
    /// invalidates any previously returned slice, matching the single active
    /// in-flight read the protocol state machine keeps per command.
    pub async fn peek(&mut self, n: usize) -> crate::Result<&[u8]> {
        while self.rbuf.len() - self.rpos < n {
            if self.rpos > 0 && self.rbuf.len() == self.rpos {
                self.rbuf.clear();
                self.rpos = 0;
            }

            let mut chunk = [0u8; READ_CHUNK];
            let read = self.socket.read(&mut chunk).await?;
            if read == 0 {
                return Err(crate::Error::transient_connection(
                    "connection closed by server while reading a packet",
                ));
            }
            self.rbuf.extend_from_slice(&chunk[..read]);
        }

        Ok(&self.rbuf[self.rpos..self.rpos + n])
    }

    pub fn consume(&mut self, n: usize) {
        self.rpos = (self.rpos + n).min(self.rbuf.len());
    }

    pub fn shutdown(&mut self) {
        // Best-effort; the socket is being discarded either way.
        let _ = &self.socket;
    }
}
