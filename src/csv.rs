//! CSV text <-> rows.
//!
//! Writing quotes every cell, so embedded commas, quotes and newlines survive without
//! any extra handling. Reading is a single pass over the characters with one bit of
//! state (inside quotes or not).

use crate::statics::{CSV_DELIMITER, CSV_LINE_END, CSV_QUOTE};
use crate::{Row, Value};
use indexmap::IndexSet;

/// Serializes rows to CSV. Columns are the union of all keys in first-seen order.
/// An empty slice produces an empty string (no header).
pub fn to_csv(records: &[Row]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut columns: IndexSet<&str> = IndexSet::new();
    for record in records {
        columns.extend(record.keys().map(String::as_str));
    }

    let mut out = String::new();
    write_line(&mut out, columns.iter().map(|c| (*c).to_string()));
    for record in records {
        out.push(CSV_LINE_END);
        write_line(
            &mut out,
            columns
                .iter()
                .map(|c| record.get(*c).map(cell_text).unwrap_or_default()),
        );
    }
    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_json_compact(),
        other => other.display_string(),
    }
}

fn write_line(out: &mut String, cells: impl Iterator<Item = String>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(CSV_DELIMITER);
        }
        write_quoted(out, &cell);
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push(CSV_QUOTE);
    for ch in s.chars() {
        if ch == CSV_QUOTE {
            out.push(CSV_QUOTE);
        }
        out.push(ch);
    }
    out.push(CSV_QUOTE);
}

/// Splits CSV text into lines of cells, honouring quotes.
///
/// A `\r` directly before a line-ending `\n` is dropped so CRLF files read the same as
/// LF files. Completely empty lines are skipped.
pub fn parse_lines(text: &str) -> Vec<Vec<String>> {
    let mut lines = Vec::new();
    let mut line: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    // Set once the line has any character at all, so `""` is a record and not a blank line.
    let mut touched = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if !in_quotes && ch == '\r' && chars.peek() == Some(&CSV_LINE_END) {
            // Swallowed; the '\n' ends the line on the next iteration.
            continue;
        }
        if !in_quotes && ch == CSV_LINE_END {
            if touched {
                line.push(std::mem::take(&mut cell));
                lines.push(std::mem::take(&mut line));
            }
            touched = false;
            continue;
        }

        touched = true;
        if in_quotes && ch == CSV_QUOTE && chars.peek() == Some(&CSV_QUOTE) {
            cell.push(CSV_QUOTE);
            chars.next();
        } else if ch == CSV_QUOTE {
            in_quotes = !in_quotes;
        } else if !in_quotes && ch == CSV_DELIMITER {
            line.push(std::mem::take(&mut cell));
        } else {
            cell.push(ch);
        }
    }

    if touched {
        line.push(cell);
        lines.push(line);
    }

    lines
}

/// Parses CSV text into rows keyed by the header line. Every cell is a string value;
/// cells missing at the end of a line read as empty strings.
pub fn parse_csv(text: &str) -> Vec<Row> {
    let mut lines = parse_lines(text).into_iter();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    lines
        .map(|cells| {
            header
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let cell = cells.get(i).cloned().unwrap_or_default();
                    (name.clone(), Value::String(cell))
                })
                .collect()
        })
        .collect()
}
