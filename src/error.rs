//! Errors surfaced by the editing core.
//!
//! Expected conditions (a record without an id, a row with nothing to save, a row that
//! is already saving) are reported through result structs instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    /// A save was requested but no persister was configured for the session.
    #[error("no persist function configured; cannot save {entity}")]
    NoPersister { entity: String },

    /// A canonical row handed to the save path carries no usable `id`.
    #[error("{entity} row has no id")]
    MissingRowId { entity: String },

    /// The import payload is structurally invalid; nothing was applied.
    #[error("invalid import file: {0}")]
    InvalidImport(String),

    /// The import payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
}

pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::EditError;

    #[test]
    fn messages_name_the_entity() {
        let err = EditError::NoPersister {
            entity: "realms".into(),
        };
        assert!(err.to_string().contains("realms"));

        let err = EditError::MissingRowId {
            entity: "skills".into(),
        };
        assert_eq!(err.to_string(), "skills row has no id");
    }

    #[test]
    fn import_errors_carry_the_reason() {
        let err = EditError::InvalidImport("expected an array".into());
        assert!(err.to_string().contains("expected an array"));
    }
}
