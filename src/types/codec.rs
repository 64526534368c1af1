use crate::protocol::TypeId;
use crate::types::{MySqlTypeInfo, RawValue};

/// Converts between a Rust type and its MySQL wire representation.
///
/// This is the seam the rest of the crate (`PreparedStatement::set_x`,
/// `ResultSet::get_x`, `CallableStatement`'s parameter registry) is written
/// against, rather than against any single row/statement implementation —
/// adding a new mapped type means adding one more `impl Codec for T`, not
/// touching the executor or result set code.
pub trait Codec: Sized {
    /// The wire type this Rust type encodes as when bound as a statement
    /// parameter. Decoding accepts this type and, where the MySQL type
    /// system allows implicit widening (e.g. any integer type into `i64`),
    /// whatever [`Codec::accepts`] allows.
    fn type_info() -> MySqlTypeInfo;

    fn accepts(info: &MySqlTypeInfo) -> bool {
        info.type_id == Self::type_info().type_id
    }

    fn encode(&self, buf: &mut Vec<u8>);

    fn decode(value: &RawValue<'_>) -> crate::Result<Self>;
}

/// Type IDs this client refuses to decode or encode at all; attempting to
/// bind or read one surfaces as `Error::FeatureNotSupported` rather than a
/// confusing data error.
pub fn reject_geometry(type_id: TypeId) -> crate::Result<()> {
    if type_id.is_geometry() {
        return Err(crate::Error::feature_not_supported(
            "the GEOMETRY type family is not supported by this client",
        ));
    }
    Ok(())
}

impl<T: Codec> Codec for Option<T> {
    fn type_info() -> MySqlTypeInfo {
        T::type_info()
    }

    fn accepts(info: &MySqlTypeInfo) -> bool {
        T::accepts(info)
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Some(value) => value.encode(buf),
            None => {}
        }
    }

    fn decode(value: &RawValue<'_>) -> crate::Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::decode(value).map(Some)
        }
    }
}
