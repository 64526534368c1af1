use crate::types::MySqlTypeInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Binary,
}

/// A single cell's raw bytes plus enough metadata for a [`super::Codec`] to
/// interpret them: which wire format produced them (text rows are always
/// ASCII-decimal/ISO-ish strings regardless of declared type; binary rows
/// use each type's fixed encoding), and the column's declared type.
#[derive(Debug, Clone, Copy)]
pub struct RawValue<'a> {
    pub info: MySqlTypeInfo,
    pub format: Format,
    pub bytes: Option<&'a [u8]>,
}

impl<'a> RawValue<'a> {
    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn as_bytes(&self) -> crate::Result<&'a [u8]> {
        self.bytes
            .ok_or_else(|| crate::Error::misuse("unexpected NULL value"))
    }

    pub fn as_str(&self) -> crate::Result<&'a str> {
        std::str::from_utf8(self.as_bytes()?)
            .map_err(|e| crate::Error::data(format!("column is not valid UTF-8: {e}")))
    }
}
