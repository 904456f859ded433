use flate2::{Compression, GzBuilder};
use pretty_assertions::assert_eq;
use rowedit::{
    EditError, EditSession, EntitySchema, ExportFormat, ImportOptions, Row, RowId, Value,
    write_export,
};
use std::io::Write;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn realm_schema() -> EntitySchema {
    EntitySchema::new().text("code").boolean("is_active")
}

#[test]
fn mixed_validity_records_apply_only_those_with_ids() -> Result<()> {
    let session = EditSession::default();
    let text = r#"[{"id": 1, "code": "a"}, {"code": "b"}, {"id": 3, "is_active": "oui"}]"#;

    let report = session.import_text(
        "realms",
        text,
        "realms.json",
        &realm_schema(),
        &ImportOptions::default(),
    )?;

    assert_eq!(report.applied, 2);
    assert_eq!(report.missing_id, 1);
    assert_eq!(report.not_applied(), 1);
    assert_eq!(report.summary(), "2 applied, 1 without id");
    assert_eq!(
        session.get_field("realms", &RowId::from(1_i64), "code"),
        Some(Value::from("a"))
    );
    assert_eq!(
        session.get_field("realms", &RowId::from(3_i64), "is_active"),
        Some(Value::Bool(true))
    );
    assert_eq!(session.dirty_ids("realms"), vec![RowId::from(1_i64), RowId::from(3_i64)]);
    Ok(())
}

#[test]
fn fields_outside_the_whitelist_are_not_imported() -> Result<()> {
    let session = EditSession::default();
    let text = "ID,code,owner\n4,north,mallory\n";
    let report = session.import_text(
        "realms",
        text,
        "realms.csv",
        &realm_schema(),
        &ImportOptions::default(),
    )?;
    assert_eq!(report.applied, 1);
    assert_eq!(
        session.get_field("realms", &RowId::from(4_i64), "code"),
        Some(Value::from("north"))
    );
    assert_eq!(session.get_field("realms", &RowId::from(4_i64), "owner"), None);
    Ok(())
}

#[test]
fn invalid_payload_applies_nothing() {
    let session = EditSession::default();
    // The first element is fine, the second is not an object: nothing may be applied.
    let text = r#"[{"id": 1, "code": "a"}, "oops"]"#;
    let err = session
        .import_text(
            "realms",
            text,
            "realms.json",
            &realm_schema(),
            &ImportOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EditError::InvalidImport(_)));
    assert!(session.snapshot().is_empty());

    let err = session
        .import_text(
            "realms",
            "not json at all",
            "realms.json",
            &realm_schema(),
            &ImportOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EditError::InvalidJson(_)));
    assert!(session.snapshot().is_empty());
}

#[test]
fn crlf_csv_from_a_spreadsheet_imports_cleanly() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("realms.csv");
    std::fs::write(&path, b"id,code,is_active\r\n1,north,yes\r\n2,south,non\r\n")?;

    let session = EditSession::default();
    let report = session.import_path("realms", &path, &realm_schema(), &ImportOptions::default())?;
    assert_eq!(report.applied, 2);
    assert_eq!(
        session.get_field("realms", &RowId::from(1_i64), "is_active"),
        Some(Value::Bool(true))
    );
    assert_eq!(
        session.get_field("realms", &RowId::from(2_i64), "is_active"),
        Some(Value::Bool(false))
    );
    Ok(())
}

#[test]
fn gzip_json_is_detected_by_magic_bytes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    // Compressed, but without a .gz extension.
    let path = dir.path().join("realms.json");
    let gz = {
        let mut encoder = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::default());
        encoder.write_all(br#"[{"id": 9, "code": "zz"}]"#)?;
        encoder.finish()?
    };
    std::fs::write(&path, &gz)?;

    let session = EditSession::default();
    let report = session.import_path("realms", &path, &realm_schema(), &ImportOptions::default())?;
    assert_eq!(report.applied, 1);
    assert_eq!(
        session.get_field("realms", &RowId::from(9_i64), "code"),
        Some(Value::from("zz"))
    );
    Ok(())
}

#[test]
fn exported_csv_gz_imports_back_into_another_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("export_realms.csv.gz");

    let mut row = Row::new();
    row.insert("id".to_string(), Value::from(5_i64));
    row.insert("code".to_string(), Value::from("east, \"old\""));
    row.insert("is_active".to_string(), Value::from(true));
    let format = write_export(&path, &[row], true)?;
    assert_eq!(format, ExportFormat::Csv);

    let session = EditSession::default();
    let report = session.import_path("realms", &path, &realm_schema(), &ImportOptions::default())?;
    assert_eq!(report.applied, 1);
    assert_eq!(
        session.get_field("realms", &RowId::from(5_i64), "code"),
        Some(Value::from("east, \"old\""))
    );
    assert_eq!(
        session.get_field("realms", &RowId::from(5_i64), "is_active"),
        Some(Value::Bool(true))
    );
    Ok(())
}

#[test]
fn missing_file_reports_the_path() {
    let session = EditSession::default();
    let err = session
        .import_path(
            "realms",
            std::path::Path::new("/nonexistent/realms.csv"),
            &realm_schema(),
            &ImportOptions::default(),
        )
        .unwrap_err();
    assert!(format!("{err:#}").contains("realms.csv"));
}
