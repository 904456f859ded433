//! The editing session: owns the pending edits and the per-row saving flags for one
//! admin view, and drives saves through a caller-supplied persister.
//!
//! Each row moves through `Clean -> Dirty -> Saving -> Clean` (saved) or back to
//! `Dirty` (failed, edits kept). A row that is already saving ignores further save
//! requests until the first one settles.

use crate::diff::{BatchDiff, FieldDiff, batch_diff, diff_row};
use crate::merge::merge;
use crate::{
    EditBuffer, EditError, EditResult, EntitySchema, Row, RowId, SessionConfig, Value, statics,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Persists one merged row. Supplied by the surrounding application (HTTP call, database
/// write, ...).
#[async_trait]
pub trait RowPersister: Send + Sync {
    async fn persist(&self, entity: &str, row: &Row) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Clean,
    Dirty,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Persisting failed; the row's edits are still in the buffer.
    Failed {
        error: String,
    },
    /// A save for this row was already in flight; nothing was submitted.
    AlreadySaving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSaveResult {
    pub row_id: RowId,
    pub outcome: SaveOutcome,
}

impl RowSaveResult {
    pub fn is_saved(&self) -> bool {
        self.outcome == SaveOutcome::Saved
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SaveOutcome::Failed { .. })
    }
}

/// Per-row outcomes of one batch save. Rows are independent: a failure does not roll
/// back or block the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub entity: String,
    /// Field changes covered by the rows that were attempted.
    pub changes: usize,
    pub results: Vec<RowSaveResult>,
}

impl BatchReport {
    pub fn saved_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_saved()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == SaveOutcome::AlreadySaving)
            .count()
    }

    pub fn failed_ids(&self) -> Vec<RowId> {
        self.results
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.row_id.clone())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// One line for a toast or status bar, e.g. `2 saved, 1 failed`.
    pub fn summary(&self) -> String {
        if self.results.is_empty() {
            return statics::EN_REPORT_NOTHING_TO_SAVE.to_string();
        }
        let mut out = format!(
            "{} {}, {} {}",
            self.saved_count(),
            statics::EN_REPORT_SAVED,
            self.failed_count(),
            statics::EN_REPORT_FAILED
        );
        let skipped = self.skipped_count();
        if skipped > 0 {
            out.push_str(&format!(", {skipped} {}", statics::EN_REPORT_SKIPPED));
        }
        out
    }
}

/// Pending edits plus saving flags for one admin view. Create it when the view mounts
/// and drop it when the view goes away.
///
/// Methods take `&self`; state sits behind short-lived locks that are never held across
/// an await, so one session can serve several in-flight saves at once.
pub struct EditSession {
    buffer: Mutex<EditBuffer>,
    saving: Mutex<HashSet<(String, RowId)>>,
    persister: Option<Arc<dyn RowPersister>>,
    config: SessionConfig,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl EditSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            buffer: Mutex::new(EditBuffer::new()),
            saving: Mutex::new(HashSet::new()),
            persister: None,
            config,
        }
    }

    pub fn with_persister(mut self, persister: Arc<dyn RowPersister>) -> Self {
        self.persister = Some(persister);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn buffer_mut(&self) -> MutexGuard<'_, EditBuffer> {
        lock(&self.buffer)
    }

    pub fn set_field(&self, entity: &str, id: &RowId, field: &str, value: impl Into<Value>) {
        let value = value.into();
        debug!(entity, id = %id, field, value = %value, "field edited");
        lock(&self.buffer).set_field(entity, id, field, value);
    }

    pub fn get_field(&self, entity: &str, id: &RowId, field: &str) -> Option<Value> {
        lock(&self.buffer).get_field(entity, id, field).cloned()
    }

    /// Drops every pending edit for a row.
    pub fn discard(&self, entity: &str, id: &RowId) {
        lock(&self.buffer).clear(entity, id);
    }

    pub fn discard_entity(&self, entity: &str) {
        lock(&self.buffer).discard_entity(entity);
    }

    pub fn has_any(&self, entity: &str, id: &RowId) -> bool {
        lock(&self.buffer).has_any(entity, id)
    }

    pub fn dirty_ids(&self, entity: &str) -> Vec<RowId> {
        lock(&self.buffer).dirty_ids(entity)
    }

    /// A copy of the current pending edits.
    pub fn snapshot(&self) -> EditBuffer {
        lock(&self.buffer).clone()
    }

    pub fn merge(&self, entity: &str, id: &RowId, canonical: Option<&Row>) -> Row {
        merge(&lock(&self.buffer), entity, id, canonical)
    }

    pub fn diff(&self, entity: &str, canonical: &Row, schema: &EntitySchema) -> Vec<FieldDiff> {
        diff_row(&lock(&self.buffer), entity, canonical, schema)
    }

    pub fn batch_diff(&self, entity: &str, rows: &[Row], schema: &EntitySchema) -> Vec<BatchDiff> {
        batch_diff(&lock(&self.buffer), entity, rows, schema)
    }

    /// Dirtiness follows the diff count, not mere presence in the buffer, so a no-op
    /// edit does not enable a save.
    pub fn row_state(&self, entity: &str, canonical: &Row, schema: &EntitySchema) -> RowState {
        let Some(id) = RowId::of_row(canonical) else {
            return RowState::Clean;
        };
        if self.is_row_saving(entity, &id) {
            RowState::Saving
        } else if self.diff(entity, canonical, schema).is_empty() {
            RowState::Clean
        } else {
            RowState::Dirty
        }
    }

    pub fn is_row_saving(&self, entity: &str, id: &RowId) -> bool {
        lock(&self.saving).contains(&(entity.to_string(), id.clone()))
    }

    fn persister(&self, entity: &str) -> EditResult<&Arc<dyn RowPersister>> {
        self.persister.as_ref().ok_or_else(|| EditError::NoPersister {
            entity: entity.to_string(),
        })
    }

    fn begin_saving(&self, entity: &str, id: &RowId) -> Option<SavingGuard<'_>> {
        let key = (entity.to_string(), id.clone());
        if !lock(&self.saving).insert(key.clone()) {
            return None;
        }
        Some(SavingGuard {
            saving: &self.saving,
            key,
        })
    }

    /// Persists one row (canonical row with its pending edits applied).
    ///
    /// On success the row's edits are cleared; on failure they are kept so the operator
    /// can retry. Either way the failure is returned in the result, not swallowed.
    pub async fn request_save(&self, entity: &str, row: &Row) -> EditResult<RowSaveResult> {
        let persister = self.persister(entity)?;
        let row_id = RowId::of_row(row).ok_or_else(|| EditError::MissingRowId {
            entity: entity.to_string(),
        })?;

        let Some(_saving) = self.begin_saving(entity, &row_id) else {
            debug!(entity, id = %row_id, "save already in flight, request ignored");
            return Ok(RowSaveResult {
                row_id,
                outcome: SaveOutcome::AlreadySaving,
            });
        };

        let merged = self.merge(entity, &row_id, Some(row));
        debug!(entity, id = %row_id, "saving row");
        let outcome = match persister.persist(entity, &merged).await {
            Ok(()) => {
                lock(&self.buffer).clear(entity, &row_id);
                SaveOutcome::Saved
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(entity, id = %row_id, %error, "save failed, edits kept");
                SaveOutcome::Failed { error }
            }
        };

        Ok(RowSaveResult { row_id, outcome })
    }

    /// Saves every row in `rows` that has at least one entry in `diffs`.
    ///
    /// Rows are persisted independently, `save_concurrency` at a time; results come back
    /// in row order. Diffs for rows that are not in `rows` are ignored, and a row id
    /// listed more than once is saved once.
    pub async fn request_batch_save(
        &self,
        entity: &str,
        rows: &[Row],
        diffs: &[BatchDiff],
    ) -> EditResult<BatchReport> {
        self.persister(entity)?;

        let dirty: HashSet<RowId> = diffs.iter().map(|d| d.row_id.clone()).collect();
        // First occurrence wins when the same id is listed twice.
        let mut attempted: HashSet<RowId> = HashSet::new();
        let targets: Vec<&Row> = rows
            .iter()
            .filter(|row| {
                RowId::of_row(row)
                    .is_some_and(|id| dirty.contains(&id) && attempted.insert(id))
            })
            .collect();

        let mut report = BatchReport {
            entity: entity.to_string(),
            changes: diffs
                .iter()
                .filter(|d| attempted.contains(&d.row_id))
                .count(),
            results: Vec::with_capacity(targets.len()),
        };
        if targets.is_empty() {
            debug!(entity, "batch save: nothing to save");
            return Ok(report);
        }

        info!(
            entity,
            rows = targets.len(),
            changes = report.changes,
            "batch save started"
        );
        let results: Vec<EditResult<RowSaveResult>> = stream::iter(targets)
            .map(|row| self.request_save(entity, row))
            .buffered(self.config.save_concurrency.max(1))
            .collect()
            .await;
        for result in results {
            report.results.push(result?);
        }

        if report.is_success() {
            info!(entity, summary = %report.summary(), "batch save finished");
        } else {
            warn!(entity, summary = %report.summary(), "batch save finished with failures");
        }
        Ok(report)
    }

    /// Saves again only the rows that failed in `report`, using their current diffs.
    pub async fn retry_failed(
        &self,
        entity: &str,
        report: &BatchReport,
        rows: &[Row],
        schema: &EntitySchema,
    ) -> EditResult<BatchReport> {
        let failed: HashSet<RowId> = report.failed_ids().into_iter().collect();
        let subset: Vec<Row> = rows
            .iter()
            .filter(|row| RowId::of_row(row).is_some_and(|id| failed.contains(&id)))
            .cloned()
            .collect();
        let diffs = self.batch_diff(entity, &subset, schema);
        self.request_batch_save(entity, &subset, &diffs).await
    }
}

/// Clears the saving flag when the save settles (or its future is dropped).
struct SavingGuard<'a> {
    saving: &'a Mutex<HashSet<(String, RowId)>>,
    key: (String, RowId),
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        lock(self.saving).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{BatchReport, RowSaveResult, SaveOutcome};
    use crate::RowId;

    fn result(id: i64, outcome: SaveOutcome) -> RowSaveResult {
        RowSaveResult {
            row_id: RowId::from(id),
            outcome,
        }
    }

    #[test]
    fn summary_counts_each_outcome() {
        let report = BatchReport {
            entity: "skills".into(),
            changes: 4,
            results: vec![
                result(1, SaveOutcome::Saved),
                result(2, SaveOutcome::Failed {
                    error: "500".into(),
                }),
                result(3, SaveOutcome::Saved),
            ],
        };
        assert_eq!(report.summary(), "2 saved, 1 failed");
        assert_eq!(report.failed_ids(), vec![RowId::from(2_i64)]);
        assert!(!report.is_success());
    }

    #[test]
    fn summary_mentions_skipped_rows() {
        let report = BatchReport {
            entity: "skills".into(),
            changes: 1,
            results: vec![result(1, SaveOutcome::AlreadySaving)],
        };
        assert_eq!(report.summary(), "0 saved, 0 failed, 1 already saving");
        assert!(report.is_success());
    }

    #[test]
    fn empty_report_has_nothing_to_save() {
        assert_eq!(BatchReport::default().summary(), "Nothing to save");
    }
}
