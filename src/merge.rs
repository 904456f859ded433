use crate::{EditBuffer, Row, RowId, statics};

/// Overlays the pending edits for `(entity, id)` on a copy of the canonical row.
///
/// When the canonical row has not been loaded yet the result starts from `{ id }`.
/// Fields without a pending edit pass through unchanged; the canonical row is never
/// touched.
pub fn merge(buffer: &EditBuffer, entity: &str, id: &RowId, canonical: Option<&Row>) -> Row {
    let mut merged = match canonical {
        Some(row) => row.clone(),
        None => {
            let mut row = Row::new();
            row.insert(statics::FIELD_ID.to_string(), id.to_value());
            row
        }
    };

    if let Some(edits) = buffer.row_edits(entity, id) {
        for (field, value) in edits {
            merged.insert(field.clone(), value.clone());
        }
    }
    merged
}

/// [`merge`] for a canonical row that carries its own id. Rows without an id come back
/// unchanged since no edit can be addressed to them.
pub fn merge_row(buffer: &EditBuffer, entity: &str, canonical: &Row) -> Row {
    match RowId::of_row(canonical) {
        Some(id) => merge(buffer, entity, &id, Some(canonical)),
        None => canonical.clone(),
    }
}
