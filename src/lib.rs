//! Core of an editable back-office table: pending field edits per entity type, diffs
//! against the last known server rows, batch saves with per-row outcomes, and JSON/CSV
//! import and export.
//!
//! Fetching rows and persisting them are left to the caller; rows come in as plain
//! ordered maps and saves go out through a [`RowPersister`].

mod buffer;
mod config;
pub mod csv;
mod diff;
mod error;
mod export;
mod import;
mod merge;
mod schema;
mod session;
pub mod statics;
mod value;

pub use buffer::EditBuffer;
pub use config::SessionConfig;
pub use diff::{BatchDiff, FieldDiff, batch_diff, diff_row};
pub use error::{EditError, EditResult};
pub use export::{ExportFormat, date_suffix, export_bytes, export_filename, write_export};
pub use import::{ImportOptions, ImportReport, decode_records, import_records};
pub use merge::{merge, merge_row};
pub use schema::{EntitySchema, FieldKind, FieldSpec, ForeignKeyLabels, LabelResolver};
pub use session::{
    BatchReport, EditSession, RowPersister, RowSaveResult, RowState, SaveOutcome,
};
pub use value::{Number, Row, RowId, Value};
