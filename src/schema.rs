//! Per-entity configuration of editable fields.
//!
//! The core never hardcodes a schema: callers describe which fields of an entity type
//! are editable (in display order), how each should be coerced on import, and how its
//! value should be labelled in a diff.

use crate::{Row, RowId, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns a raw value into a human label, e.g. a foreign key id into `CODE - Name (#3)`.
/// Returning `None` falls back to the raw value.
pub type LabelResolver = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Text,
    Number,
    Bool,
}

#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub label: Option<LabelResolver>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
        }
    }

    /// Display form of `value` for this field.
    pub fn display(&self, value: &Value) -> String {
        self.label
            .as_ref()
            .and_then(|resolve| resolve(value))
            .unwrap_or_else(|| value.display_string())
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("label", &self.label.is_some())
            .finish()
    }
}

/// Ordered whitelist of editable fields for one entity type.
#[derive(Debug, Clone, Default)]
pub struct EntitySchema {
    fields: Vec<FieldSpec>,
}

impl EntitySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::new(name, kind));
        self
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text)
    }

    pub fn number(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Number)
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Bool)
    }

    /// Attaches a label resolver to an already declared field. Unknown names are ignored.
    pub fn with_label(mut self, name: &str, resolver: LabelResolver) -> Self {
        if let Some(spec) = self.fields.iter_mut().find(|f| f.name == name) {
            spec.label = Some(resolver);
        }
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Labels for rows referenced by id from another table, built once from that table's
/// canonical rows.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyLabels {
    by_id: HashMap<RowId, String>,
}

impl ForeignKeyLabels {
    /// Labels each row as `CODE - Name (#id)`. Missing parts are left out, so a row with
    /// only a name becomes `Name (#id)`.
    pub fn from_rows(rows: &[Row], code_field: &str, name_field: &str) -> Self {
        let mut by_id = HashMap::new();
        for row in rows {
            let Some(id) = RowId::of_row(row) else {
                continue;
            };
            let part = |field: &str| {
                row.get(field)
                    .map(Value::display_string)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            };
            let head = match (part(code_field), part(name_field)) {
                (Some(code), Some(name)) => format!("{code} - {name} "),
                (Some(one), None) | (None, Some(one)) => format!("{one} "),
                (None, None) => String::new(),
            };
            by_id.insert(id.clone(), format!("{head}(#{id})"));
        }
        Self { by_id }
    }

    pub fn label(&self, value: &Value) -> Option<String> {
        let id = RowId::from_value(value)?;
        self.by_id.get(&id).cloned()
    }

    pub fn resolver(self) -> LabelResolver {
        Arc::new(move |value: &Value| self.label(value))
    }
}
