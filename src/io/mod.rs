//! Buffer primitives shared by every packet codec: length-encoded integers,
//! length-encoded and NUL-terminated strings, and a peekable buffered stream
//! over the socket capability.

mod buf;
mod buf_mut;
mod buf_stream;

pub use buf::Buf;
pub use buf_mut::BufMut;
pub use buf_stream::BufStream;
