//! Conversion between name-keyed [`RecordObject`]s and positional [`Record`]s.

use std::collections::BTreeMap;

use crate::column_index::ColumnIndex;
use crate::store::Record;
use crate::value::CellValue;

/// A record keyed by column name; the caller-facing representation of a row.
pub type RecordObject = BTreeMap<String, CellValue>;

/// Lay `obj` out positionally.
///
/// Keys with no column are ignored and columns missing from `obj` become
/// [`CellValue::Empty`]. The result is always exactly `columns.len()` wide.
pub fn encode(obj: &RecordObject, columns: &ColumnIndex) -> Record {
    let mut record = vec![CellValue::Empty; columns.len()];
    for (name, value) in obj {
        if let Some(idx) = columns.position(name) {
            record[idx] = value.clone();
        }
    }
    record
}

/// Key every addressable column of `record` by name.
///
/// Cells past the end of a short record decode as [`CellValue::Empty`].
pub fn decode(record: &[CellValue], columns: &ColumnIndex) -> RecordObject {
    columns
        .iter()
        .map(|(name, idx)| {
            (
                name.to_string(),
                record.get(idx).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

/// Pad or truncate a stored row to exactly `width` cells.
pub(crate) fn normalize(mut record: Record, width: usize) -> Record {
    record.resize(width, CellValue::Empty);
    record
}
