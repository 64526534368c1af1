/// The one-byte SQL type code used in `ColumnDefinition`, `COM_STMT_EXECUTE`
/// parameter types, and `COM_STMT_PREPARE_OK` parameter definitions.
///
/// See <https://dev.mysql.com/doc/dev/mysql-server/latest/binary__log__types_8h.html>.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub u8);

impl TypeId {
    pub const DECIMAL: TypeId = TypeId(0);
    pub const TINY: TypeId = TypeId(1);
    pub const SHORT: TypeId = TypeId(2);
    pub const LONG: TypeId = TypeId(3);
    pub const FLOAT: TypeId = TypeId(4);
    pub const DOUBLE: TypeId = TypeId(5);
    pub const NULL: TypeId = TypeId(6);
    pub const TIMESTAMP: TypeId = TypeId(7);
    pub const LONGLONG: TypeId = TypeId(8);
    pub const INT24: TypeId = TypeId(9);
    pub const DATE: TypeId = TypeId(10);
    pub const TIME: TypeId = TypeId(11);
    pub const DATETIME: TypeId = TypeId(12);
    pub const YEAR: TypeId = TypeId(13);
    pub const NEWDATE: TypeId = TypeId(14);
    pub const VARCHAR: TypeId = TypeId(15);
    pub const BIT: TypeId = TypeId(16);
    pub const JSON: TypeId = TypeId(245);
    pub const NEWDECIMAL: TypeId = TypeId(246);
    pub const ENUM: TypeId = TypeId(247);
    pub const SET: TypeId = TypeId(248);
    pub const TINY_BLOB: TypeId = TypeId(249);
    pub const MEDIUM_BLOB: TypeId = TypeId(250);
    pub const LONG_BLOB: TypeId = TypeId(251);
    pub const BLOB: TypeId = TypeId(252);
    pub const VAR_STRING: TypeId = TypeId(253);
    pub const STRING: TypeId = TypeId(254);
    /// The GEOMETRY family (POINT, LINESTRING, POLYGON, …) is explicitly
    /// out of scope; any attempt to encode or decode it must surface as
    /// `Error::FeatureNotSupported` rather than silently corrupting bytes.
    pub const GEOMETRY: TypeId = TypeId(255);

    pub fn is_geometry(self) -> bool {
        self == TypeId::GEOMETRY
    }
}

impl Default for TypeId {
    fn default() -> TypeId {
        TypeId::NULL
    }
}
