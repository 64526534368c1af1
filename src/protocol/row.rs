use std::ops::Range;

use crate::io::Buf;
use crate::protocol::TypeId;

/// Scans past one length-encoded value in `buf` without decoding it, for
/// indexing text-protocol rows where every column is textual regardless of
/// its declared type.
fn lenenc_span(buf: &[u8]) -> usize {
    match buf[0] {
        0xFB => 1,
        0xFC => 3 + u16::from_le_bytes([buf[1], buf[2]]) as usize,
        0xFD => 4 + u32::from_le_bytes([buf[1], buf[2], buf[3], 0]) as usize,
        0xFE => 9 + u64::from_le_bytes(buf[1..9].try_into().unwrap()) as usize,
        n => 1 + n as usize,
    }
}

/// Fixed width of a non-NULL binary-protocol value, for the types whose size
/// doesn't depend on its own content; `None` means the value is itself
/// length-prefixed (either a 1-byte temporal length or a length-encoded
/// string) and must be measured rather than looked up.
fn fixed_binary_width(type_id: TypeId) -> Option<usize> {
    Some(match type_id {
        TypeId::TINY => 1,
        TypeId::SHORT | TypeId::YEAR => 2,
        TypeId::LONG | TypeId::INT24 | TypeId::FLOAT => 4,
        TypeId::LONGLONG | TypeId::DOUBLE => 8,
        _ => return None,
    })
}

/// A decoded row's columns as byte ranges into one shared buffer, so the
/// crate never copies a row's cell values until the caller actually asks for
/// one as a typed `get`.
#[derive(Debug, Clone)]
pub struct Row {
    buffer: Box<[u8]>,
    values: Box<[Option<Range<usize>>]>,
}

impl Row {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        let range = self.values.get(index)?.as_ref()?;
        Some(&self.buffer[range.start..range.end])
    }
}

/// `COM_QUERY` result row: every column is a length-encoded string (or NULL,
/// marked with `0xFB`), independent of its declared SQL type.
pub struct TextRow;

impl TextRow {
    pub fn decode(buf: &[u8], num_columns: usize) -> crate::Result<Row> {
        let buffer: Box<[u8]> = buf.into();
        let mut values = Vec::with_capacity(num_columns);
        let mut index = 0;

        for _ in 0..num_columns {
            if index >= buffer.len() {
                return Err(protocol_err!("row ended before all columns were read"));
            }

            if buffer[index] == 0xFB {
                values.push(None);
                index += 1;
                continue;
            }

            let span = lenenc_span(&buffer[index..]);
            // drop the length prefix itself; callers index into the value.
            let prefix = span - data_len(&buffer[index..]);
            values.push(Some((index + prefix)..(index + span)));
            index += span;
        }

        Ok(Row {
            buffer,
            values: values.into_boxed_slice(),
        })
    }
}

fn data_len(buf: &[u8]) -> usize {
    match buf[0] {
        0xFC => u16::from_le_bytes([buf[1], buf[2]]) as usize,
        0xFD => u32::from_le_bytes([buf[1], buf[2], buf[3], 0]) as usize,
        0xFE => u64::from_le_bytes(buf[1..9].try_into().unwrap()) as usize,
        n => n as usize,
    }
}

/// `COM_STMT_EXECUTE` result row: a leading NULL-bitmap followed by each
/// non-NULL column packed according to its declared binary type.
pub struct BinaryRow;

impl BinaryRow {
    pub fn decode(mut buf: &[u8], column_types: &[TypeId]) -> crate::Result<Row> {
        let header = buf.get_u8()?;
        if header != 0 {
            return Err(protocol_err!(
                "expected binary row header 0x00; received 0x{:X}",
                header
            ));
        }

        // offset by 2 per the protocol's "(columns + 9) / 8" formula.
        let null_len = (column_types.len() + 9) / 8;
        let null_bitmap = buf.get_bytes(null_len)?.to_vec();

        let buffer: Box<[u8]> = buf.into();
        let mut values = Vec::with_capacity(column_types.len());
        let mut index = 0;

        for (i, type_id) in column_types.iter().enumerate() {
            let byte = null_bitmap[(i + 2) / 8];
            let is_null = byte & (1 << ((i + 2) % 8)) != 0;

            if is_null {
                values.push(None);
                continue;
            }

            let size = if let Some(width) = fixed_binary_width(*type_id) {
                width
            } else if matches!(type_id, &TypeId::DATE | &TypeId::DATETIME | &TypeId::TIMESTAMP | &TypeId::TIME)
            {
                1 + buffer[index] as usize
            } else {
                lenenc_span(&buffer[index..])
            };

            let prefix = if fixed_binary_width(*type_id).is_some()
                || matches!(type_id, &TypeId::DATE | &TypeId::DATETIME | &TypeId::TIMESTAMP | &TypeId::TIME)
            {
                0
            } else {
                size - data_len(&buffer[index..])
            };

            values.push(Some((index + prefix)..(index + size)));
            index += size;
        }

        Ok(Row {
            buffer,
            values: values.into_boxed_slice(),
        })
    }
}
