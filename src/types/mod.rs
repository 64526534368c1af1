//! Conversions between Rust types and the MySQL wire representations used by
//! prepared-statement parameters and result set columns.

mod bit;
mod codec;
#[cfg(feature = "json")]
mod json;
mod numeric;
#[cfg(feature = "chrono")]
mod temporal;
mod text;
mod type_info;
#[cfg(feature = "uuid")]
mod uuid_type;
mod value;

pub use bit::Bits;
pub use codec::{reject_geometry, Codec};
#[cfg(feature = "json")]
pub use json::Json;
pub use type_info::MySqlTypeInfo;
pub use value::{Format, RawValue};
