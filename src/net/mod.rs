//! The socket capability boundary.
//!
//! TLS upgrade and raw OS socket creation are deliberately kept out of the
//! protocol engine: [`AsyncSocket`] is the only interface the rest of this
//! crate depends on, so a caller can hand in a plain TCP stream, a Unix
//! domain socket, or something that tunnels through a proxy, and the engine
//! doesn't need to know the difference.

mod socket;
mod tls;

pub use socket::{AsyncSocket, SocketOptions};
pub use tls::MaybeTlsStream;
