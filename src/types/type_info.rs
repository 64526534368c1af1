use crate::protocol::{FieldFlags, RawColumnDefinition, TypeId};

/// Everything a value needs to be decoded correctly: its wire type, whether
/// it is declared `UNSIGNED`, and (for strings/blobs) its character set —
/// MySQL tells binary data apart from text by giving it collation 63
/// (`binary`) rather than a distinct wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlTypeInfo {
    pub type_id: TypeId,
    pub is_unsigned: bool,
    pub char_set: u16,
}

impl MySqlTypeInfo {
    pub const fn new(type_id: TypeId) -> Self {
        MySqlTypeInfo {
            type_id,
            is_unsigned: false,
            char_set: 45, // utf8mb4_general_ci
        }
    }

    pub const fn unsigned(type_id: TypeId) -> Self {
        MySqlTypeInfo {
            type_id,
            is_unsigned: true,
            char_set: 45,
        }
    }

    pub const fn binary(type_id: TypeId) -> Self {
        MySqlTypeInfo {
            type_id,
            is_unsigned: false,
            char_set: 63, // binary
        }
    }

    pub fn is_binary(&self) -> bool {
        self.char_set == 63
    }

    pub(crate) fn from_column(def: &RawColumnDefinition) -> Self {
        MySqlTypeInfo {
            type_id: def.type_id,
            is_unsigned: def.flags.contains(FieldFlags::UNSIGNED),
            char_set: def.char_set,
        }
    }
}
