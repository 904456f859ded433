//! Applies uploaded JSON or CSV files to the edit buffer.
//!
//! The whole payload is decoded and checked before the first record is applied, so a
//! structurally broken file never leaves half of its edits behind.

use crate::csv::parse_csv;
use crate::export::has_gz_extension;
use crate::schema::FieldKind;
use crate::{
    EditBuffer, EditError, EditResult, EditSession, EntitySchema, Row, RowId, Value, statics,
};
use anyhow::Context;
use flate2::read::GzDecoder;
use std::collections::HashSet;
use std::{fs, io::Read, path::Path};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    known_ids: Option<HashSet<RowId>>,
}

impl ImportOptions {
    /// Only apply records whose id is among `rows` (the rows currently visible).
    pub fn restrict_to(rows: &[Row]) -> Self {
        Self {
            known_ids: Some(rows.iter().filter_map(RowId::of_row).collect()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub applied: usize,
    pub missing_id: usize,
    pub unknown: usize,
}

impl ImportReport {
    pub fn not_applied(&self) -> usize {
        self.missing_id + self.unknown
    }

    /// e.g. `2 applied` or `2 applied, 1 without id`.
    pub fn summary(&self) -> String {
        let mut out = format!("{} {}", self.applied, statics::EN_REPORT_APPLIED);
        if self.missing_id > 0 {
            out.push_str(&format!(", {} {}", self.missing_id, statics::EN_REPORT_MISSING_ID));
        }
        if self.unknown > 0 {
            out.push_str(&format!(", {} {}", self.unknown, statics::EN_REPORT_UNKNOWN_ID));
        }
        out
    }
}

fn is_csv_name(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    let name = lower
        .strip_suffix(&format!(".{}", statics::EXT_GZ))
        .unwrap_or(&lower);
    name.ends_with(&format!(".{}", statics::EXT_CSV))
}

/// Decodes file text into records: CSV when `filename` ends in `.csv`, JSON otherwise.
pub fn decode_records(text: &str, filename: &str) -> EditResult<Vec<Row>> {
    if is_csv_name(filename) {
        return decode_csv(text);
    }
    decode_json(text)
}

/// A header with no data lines is a valid, empty file (like `[]` in JSON); a file
/// without a header is not.
fn decode_csv(text: &str) -> EditResult<Vec<Row>> {
    if text.trim().is_empty() {
        return Err(EditError::InvalidImport("CSV file has no header".into()));
    }
    Ok(parse_csv(text))
}

fn decode_json(text: &str) -> EditResult<Vec<Row>> {
    let value = json5::from_str::<Value>(text).map_err(|e| EditError::InvalidJson(e.to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(EditError::InvalidImport(format!(
                "expected a JSON array, found {}",
                other.type_name()
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(EditError::InvalidImport(format!(
                "element {i} is {}, expected an object",
                other.type_name()
            ))),
        })
        .collect()
}

fn record_id(record: &Row) -> Option<RowId> {
    statics::ID_FIELD_VARIANTS
        .iter()
        .find_map(|key| record.get(*key).and_then(RowId::from_value))
}

fn coerce(kind: FieldKind, value: &Value) -> Value {
    if kind != FieldKind::Bool {
        return value.clone();
    }
    let word = value.display_string().trim().to_lowercase();
    if statics::BOOL_TRUE_WORDS.contains(&word.as_str()) {
        Value::Bool(true)
    } else if statics::BOOL_FALSE_WORDS.contains(&word.as_str()) {
        Value::Bool(false)
    } else {
        value.clone()
    }
}

/// Copies whitelisted fields of each record into the buffer. Records without an id (or,
/// with [`ImportOptions::restrict_to`], with an id not on screen) are skipped and counted.
pub fn import_records(
    buffer: &mut EditBuffer,
    entity: &str,
    records: &[Row],
    schema: &EntitySchema,
    options: &ImportOptions,
) -> ImportReport {
    let mut report = ImportReport::default();
    for record in records {
        let Some(id) = record_id(record) else {
            report.missing_id += 1;
            continue;
        };
        if let Some(known) = options.known_ids.as_ref()
            && !known.contains(&id)
        {
            debug!(entity, id = %id, "import record skipped, row not loaded");
            report.unknown += 1;
            continue;
        }

        for spec in schema.fields() {
            if let Some(value) = record.get(&spec.name) {
                buffer.set_field(entity, &id, &spec.name, coerce(spec.kind, value));
            }
        }
        report.applied += 1;
    }
    report
}

impl EditSession {
    /// Decodes `text` (format picked from `filename`) and applies it. Decoding errors are
    /// returned before anything is applied.
    pub fn import_text(
        &self,
        entity: &str,
        text: &str,
        filename: &str,
        schema: &EntitySchema,
        options: &ImportOptions,
    ) -> EditResult<ImportReport> {
        let records = decode_records(text, filename)?;
        let report = import_records(&mut self.buffer_mut(), entity, &records, schema, options);
        info!(entity, filename, summary = %report.summary(), "import applied");
        Ok(report)
    }

    /// Reads and applies a file from disk; `.gz` files (or gzip content) are decompressed.
    pub fn import_path(
        &self,
        entity: &str,
        path: &Path,
        schema: &EntitySchema,
        options: &ImportOptions,
    ) -> anyhow::Result<ImportReport> {
        let bytes = fs::read(path).with_context(|| format!("reading {path:?}"))?;
        let text_bytes = if is_gzip(path, &bytes) {
            let mut decoder = GzDecoder::new(&bytes[..]);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out).context("gzip decompress")?;
            out
        } else {
            bytes
        };
        let text = String::from_utf8(text_bytes).context("import file is not valid UTF-8")?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let report = self
            .import_text(entity, &text, filename, schema, options)
            .with_context(|| format!("importing {path:?}"))?;
        Ok(report)
    }
}

fn is_gzip(path: &Path, bytes: &[u8]) -> bool {
    has_gz_extension(path) || bytes.starts_with(&statics::GZIP_MAGIC)
}
