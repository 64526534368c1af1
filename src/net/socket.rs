use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

/// The capability the protocol engine needs from a transport: an
/// `AsyncRead + AsyncWrite` byte stream plus a shutdown hook. TLS sockets,
/// Unix sockets, and plain TCP sockets all satisfy this without the engine
/// needing to special-case any of them.
pub trait AsyncSocket: AsyncRead + AsyncWrite + Unpin + Send {
    fn poll_shutdown_both(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl AsyncSocket for tokio::net::TcpStream {
    fn poll_shutdown_both(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_shutdown(self, cx)
    }
}

#[cfg(unix)]
impl AsyncSocket for tokio::net::UnixStream {
    fn poll_shutdown_both(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_shutdown(self, cx)
    }
}

/// TCP-level tuning knobs, applied by the caller before the socket is handed
/// to this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketOptions {
    pub tcp_nodelay: bool,
    pub tcp_keepalive: Option<Duration>,
    pub recv_buffer_size: Option<u32>,
    pub send_buffer_size: Option<u32>,
}
