use crate::{RowId, Value};
use indexmap::IndexMap;

type FieldEdits = IndexMap<String, Value>;

/// Pending field edits that have not been persisted yet, keyed by
/// (entity type, row id, field).
///
/// Writes are last-write-wins. A row id may be present before its canonical row has
/// been loaded. No validation happens here.
#[derive(Debug, Clone, Default)]
pub struct EditBuffer {
    entities: IndexMap<String, IndexMap<RowId, FieldEdits>>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, entity: &str, id: &RowId, field: &str, value: Value) {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .entry(id.clone())
            .or_default()
            .insert(field.to_string(), value);
    }

    pub fn get_field(&self, entity: &str, id: &RowId, field: &str) -> Option<&Value> {
        self.row_edits(entity, id)?.get(field)
    }

    /// Removes every pending edit for one row.
    pub fn clear(&mut self, entity: &str, id: &RowId) {
        let Some(rows) = self.entities.get_mut(entity) else {
            return;
        };
        rows.shift_remove(id);
        if rows.is_empty() {
            self.entities.shift_remove(entity);
        }
    }

    /// True when the row has at least one pending edit, even one equal to the canonical
    /// value. Use the diff count to decide whether a row is actually dirty.
    pub fn has_any(&self, entity: &str, id: &RowId) -> bool {
        self.row_edits(entity, id).is_some_and(|edits| !edits.is_empty())
    }

    pub fn row_edits(&self, entity: &str, id: &RowId) -> Option<&IndexMap<String, Value>> {
        self.entities.get(entity)?.get(id)
    }

    /// Row ids with pending edits, in the order they were first edited.
    pub fn dirty_ids(&self, entity: &str) -> Vec<RowId> {
        self.entities
            .get(entity)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn discard_entity(&mut self, entity: &str) {
        self.entities.shift_remove(entity);
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::EditBuffer;
    use crate::{RowId, Value};

    #[test]
    fn last_write_wins_per_field() {
        let mut buf = EditBuffer::new();
        let id = RowId::from(1_i64);
        buf.set_field("realms", &id, "code", Value::from("a"));
        buf.set_field("realms", &id, "code", Value::from("b"));
        assert_eq!(buf.get_field("realms", &id, "code"), Some(&Value::from("b")));
        assert_eq!(buf.row_edits("realms", &id).map(|e| e.len()), Some(1));
    }

    #[test]
    fn entity_types_are_separate_partitions() {
        let mut buf = EditBuffer::new();
        let id = RowId::from(1_i64);
        buf.set_field("realms", &id, "code", Value::from("a"));
        assert!(buf.has_any("realms", &id));
        assert!(!buf.has_any("skills", &id));
        assert_eq!(buf.get_field("skills", &id, "code"), None);
    }

    #[test]
    fn clear_removes_only_that_row() {
        let mut buf = EditBuffer::new();
        buf.set_field("realms", &RowId::from(1_i64), "code", Value::from("a"));
        buf.set_field("realms", &RowId::from(2_i64), "code", Value::from("b"));
        buf.clear("realms", &RowId::from(1_i64));
        assert!(!buf.has_any("realms", &RowId::from(1_i64)));
        assert_eq!(buf.dirty_ids("realms"), vec![RowId::from(2_i64)]);

        buf.clear("realms", &RowId::from(2_i64));
        assert!(buf.is_empty());
        // Clearing an unknown row is a no-op.
        buf.clear("realms", &RowId::from(3_i64));
    }

    #[test]
    fn discard_entity_drops_all_rows_of_one_type() {
        let mut buf = EditBuffer::new();
        buf.set_field("realms", &RowId::from(1_i64), "code", Value::from("a"));
        buf.set_field("skills", &RowId::from(1_i64), "name", Value::from("b"));
        buf.discard_entity("realms");
        assert!(buf.dirty_ids("realms").is_empty());
        assert!(buf.has_any("skills", &RowId::from(1_i64)));
    }
}
