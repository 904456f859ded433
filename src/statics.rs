// Central place for field names, file conventions and report strings.
// Keep these out of the logic modules to reduce duplication and make tweaks safer.

// Row identity
pub const FIELD_ID: &str = "id";
// Import files come from spreadsheets and other tools; accept the usual casings.
pub const ID_FIELD_VARIANTS: [&str; 3] = ["id", "ID", "Id"];

// Boolean coercion for bool-kind fields on import (compared lowercased, trimmed).
pub const BOOL_TRUE_WORDS: [&str; 4] = ["1", "true", "yes", "oui"];
pub const BOOL_FALSE_WORDS: [&str; 4] = ["0", "false", "no", "non"];

// File conventions
pub const EXT_CSV: &str = "csv";
pub const EXT_JSON: &str = "json";
pub const EXT_GZ: &str = "gz";
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
pub const DEFAULT_EXPORT_PREFIX: &str = "export";
pub const DATE_SUFFIX_FORMAT: &str = "%Y-%m-%d";

// Formatting
pub const JSON_INDENT: usize = 2;
pub const CSV_DELIMITER: char = ',';
pub const CSV_QUOTE: char = '"';
pub const CSV_LINE_END: char = '\n';

// Batch diff rows are labelled "#<id> <field>".
pub const BATCH_FIELD_PREFIX: &str = "#";

// English report strings (EN_ prefix to make future localization easier)
pub const EN_REPORT_SAVED: &str = "saved";
pub const EN_REPORT_FAILED: &str = "failed";
pub const EN_REPORT_SKIPPED: &str = "already saving";
pub const EN_REPORT_NOTHING_TO_SAVE: &str = "Nothing to save";
pub const EN_REPORT_APPLIED: &str = "applied";
pub const EN_REPORT_MISSING_ID: &str = "without id";
pub const EN_REPORT_UNKNOWN_ID: &str = "unknown id";
