use crate::merge::merge;
use crate::{EditBuffer, EntitySchema, Row, RowId, Value, statics};
use std::fmt;

/// One changed field of one row, with display-ready values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: String,
    pub before: String,
    pub after: String,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {} -> {}", self.field, self.before, self.after)
    }
}

/// A [`FieldDiff`] flattened into a multi-row preview; `field` reads `#<id> <field>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDiff {
    pub row_id: RowId,
    pub field: String,
    pub before: String,
    pub after: String,
}

/// Changed whitelisted fields of `canonical`, in whitelist order.
///
/// Values compare by display string, so an edit that only changes the type (`100` to
/// `"100"`) is not a change.
pub fn diff_row(
    buffer: &EditBuffer,
    entity: &str,
    canonical: &Row,
    schema: &EntitySchema,
) -> Vec<FieldDiff> {
    let Some(id) = RowId::of_row(canonical) else {
        return Vec::new();
    };
    if !buffer.has_any(entity, &id) {
        return Vec::new();
    }

    let merged = merge(buffer, entity, &id, Some(canonical));
    let null = Value::Null;
    schema
        .fields()
        .iter()
        .filter_map(|spec| {
            let before = canonical.get(&spec.name).unwrap_or(&null);
            let after = merged.get(&spec.name).unwrap_or(&null);
            if before.loosely_eq(after) {
                return None;
            }
            Some(FieldDiff {
                field: spec.name.clone(),
                before: spec.display(before),
                after: spec.display(after),
            })
        })
        .collect()
}

/// Diffs of every given row, concatenated in row order.
pub fn batch_diff(
    buffer: &EditBuffer,
    entity: &str,
    rows: &[Row],
    schema: &EntitySchema,
) -> Vec<BatchDiff> {
    rows.iter()
        .filter_map(|row| RowId::of_row(row).map(|id| (id, row)))
        .flat_map(|(id, row)| {
            diff_row(buffer, entity, row, schema)
                .into_iter()
                .map(move |d| BatchDiff {
                    field: format!("{}{} {}", statics::BATCH_FIELD_PREFIX, id, d.field),
                    row_id: id.clone(),
                    before: d.before,
                    after: d.after,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FieldDiff, batch_diff, diff_row};
    use crate::{EditBuffer, EntitySchema, ForeignKeyLabels, Row, RowId, Value};

    fn resource(id: i64, amount: i64, code: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(id));
        row.insert("code".to_string(), Value::from(code));
        row.insert("amount".to_string(), Value::from(amount));
        row
    }

    fn schema() -> EntitySchema {
        EntitySchema::new().number("amount").text("code")
    }

    #[test]
    fn reports_changed_fields_in_whitelist_order() {
        let mut buf = EditBuffer::new();
        let id = RowId::from(7_i64);
        buf.set_field("resources", &id, "code", Value::from("silver"));
        buf.set_field("resources", &id, "amount", Value::from("75"));

        let diffs = diff_row(&buf, "resources", &resource(7, 50, "gold"), &schema());
        assert_eq!(
            diffs,
            vec![
                FieldDiff {
                    field: "amount".into(),
                    before: "50".into(),
                    after: "75".into(),
                },
                FieldDiff {
                    field: "code".into(),
                    before: "gold".into(),
                    after: "silver".into(),
                },
            ]
        );
        assert_eq!(diffs[0].to_string(), "'amount': 50 -> 75");
    }

    #[test]
    fn no_op_edits_produce_no_diff() {
        let mut buf = EditBuffer::new();
        let id = RowId::from(7_i64);
        buf.set_field("resources", &id, "amount", Value::from("50"));
        let diffs = diff_row(&buf, "resources", &resource(7, 50, "gold"), &schema());
        assert!(diffs.is_empty());
        // Still present at the buffer level.
        assert!(buf.has_any("resources", &id));
    }

    #[test]
    fn edits_outside_the_whitelist_are_ignored() {
        let mut buf = EditBuffer::new();
        buf.set_field("resources", &RowId::from(7_i64), "secret", Value::from("x"));
        assert!(diff_row(&buf, "resources", &resource(7, 50, "gold"), &schema()).is_empty());
    }

    #[test]
    fn label_resolver_is_used_for_before_and_after() {
        let mut realms = Vec::new();
        for (id, code, name) in [(1_i64, "N", "North"), (2_i64, "S", "South")] {
            let mut r = Row::new();
            r.insert("id".to_string(), Value::from(id));
            r.insert("code".to_string(), Value::from(code));
            r.insert("name".to_string(), Value::from(name));
            realms.push(r);
        }
        let labels = ForeignKeyLabels::from_rows(&realms, "code", "name");
        let schema = EntitySchema::new()
            .number("realm_id")
            .with_label("realm_id", labels.resolver());

        let mut factory = Row::new();
        factory.insert("id".to_string(), Value::from(10_i64));
        factory.insert("realm_id".to_string(), Value::from(1_i64));

        let mut buf = EditBuffer::new();
        buf.set_field("factories", &RowId::from(10_i64), "realm_id", Value::from("2"));
        let diffs = diff_row(&buf, "factories", &factory, &schema);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].before, "N - North (#1)");
        assert_eq!(diffs[0].after, "S - South (#2)");
    }

    #[test]
    fn batch_diff_prefixes_row_ids_and_keeps_order() {
        let mut buf = EditBuffer::new();
        buf.set_field("resources", &RowId::from(2_i64), "code", Value::from("b2"));
        buf.set_field("resources", &RowId::from(1_i64), "amount", Value::from(11_i64));
        buf.set_field("resources", &RowId::from(1_i64), "code", Value::from("a2"));

        let rows = vec![resource(1, 10, "a"), resource(2, 20, "b"), resource(3, 30, "c")];
        let fields: Vec<String> = batch_diff(&buf, "resources", &rows, &schema())
            .into_iter()
            .map(|d| d.field)
            .collect();
        assert_eq!(fields, vec!["#1 amount", "#1 code", "#2 code"]);
    }
}
