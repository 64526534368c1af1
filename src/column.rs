//! The public-facing column metadata type (§3 `ColumnDefinition`), derived
//! once per result set from the wire-level [`crate::protocol::RawColumnDefinition`].

use crate::protocol::{FieldFlags, RawColumnDefinition, TypeId};

/// One column's metadata, frozen for the lifetime of the [`crate::ResultSet`]
/// that owns it.
///
/// Invariant: `full_name()` is `"{table}.{name}"` when both `table` and
/// `name` are non-empty, else just `name`.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub original_table: String,
    pub name: String,
    pub original_name: String,
    pub char_set: u16,
    pub byte_length: u32,
    pub type_id: TypeId,
    pub flags: FieldFlags,
    pub decimals: u8,
}

impl ColumnDefinition {
    pub(crate) fn from_raw(raw: &RawColumnDefinition) -> Self {
        ColumnDefinition {
            catalog: "def".to_owned(),
            schema: raw.schema.clone().unwrap_or_default(),
            table: raw.table_alias.clone().unwrap_or_default(),
            original_table: raw.table.clone().unwrap_or_default(),
            name: raw.name().unwrap_or_default().to_owned(),
            original_name: raw.column.clone().unwrap_or_default(),
            char_set: raw.char_set,
            byte_length: raw.max_size,
            type_id: raw.type_id,
            flags: raw.flags,
            decimals: raw.decimals,
        }
    }

    /// `"{table}.{name}"`, or just `name` if either half is empty.
    pub fn full_name(&self) -> String {
        if self.table.is_empty() || self.name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }

    pub fn is_not_null(&self) -> bool {
        self.flags.contains(FieldFlags::NOT_NULL)
    }

    pub fn is_primary_key(&self) -> bool {
        self.flags.contains(FieldFlags::PRIMARY_KEY)
    }

    pub fn is_unsigned(&self) -> bool {
        self.flags.contains(FieldFlags::UNSIGNED)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.flags.contains(FieldFlags::AUTO_INCREMENT)
    }

    pub fn is_blob(&self) -> bool {
        self.flags.contains(FieldFlags::BLOB)
    }

    pub fn is_enum(&self) -> bool {
        self.flags.contains(FieldFlags::ENUM)
    }

    pub fn is_set(&self) -> bool {
        self.flags.contains(FieldFlags::SET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(table: Option<&str>, name: Option<&str>) -> RawColumnDefinition {
        RawColumnDefinition {
            schema: Some("db".into()),
            table_alias: table.map(str::to_owned),
            table: table.map(str::to_owned),
            column_alias: name.map(str::to_owned),
            column: name.map(str::to_owned),
            char_set: 45,
            max_size: 20,
            type_id: TypeId::LONG,
            flags: FieldFlags::empty(),
            decimals: 0,
        }
    }

    #[test]
    fn full_name_joins_table_and_name() {
        let col = ColumnDefinition::from_raw(&raw(Some("users"), Some("id")));
        assert_eq!(col.full_name(), "users.id");
    }

    #[test]
    fn full_name_falls_back_to_bare_name() {
        let col = ColumnDefinition::from_raw(&raw(None, Some("count(*)")));
        assert_eq!(col.full_name(), "count(*)");
    }
}
