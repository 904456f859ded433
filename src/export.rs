use crate::csv::to_csv;
use crate::{EditSession, Row, Value, statics};
use anyhow::Context;
use flate2::{Compression, GzBuilder};
use std::{fs, io::Write, path::Path};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => statics::EXT_JSON,
            ExportFormat::Csv => statics::EXT_CSV,
        }
    }

    /// `.csv` (optionally followed by `.gz`) means CSV; anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        let inner = if has_gz_extension(path) {
            path.file_stem().map(Path::new).unwrap_or(path)
        } else {
            path
        };
        match inner.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case(statics::EXT_CSV) => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }
}

/// `.gz` in any letter case.
pub(crate) fn has_gz_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(statics::EXT_GZ))
}

/// The exported file contents: a JSON array of row objects, or CSV text.
pub fn export_bytes(rows: &[Row], format: ExportFormat, pretty: bool) -> Vec<u8> {
    let text = match format {
        ExportFormat::Csv => to_csv(rows),
        ExportFormat::Json => {
            let array = Value::Array(rows.iter().cloned().map(Value::Object).collect());
            if pretty {
                array.to_json_pretty()
            } else {
                array.to_json_compact()
            }
        }
    };
    text.into_bytes()
}

/// `<prefix>_<suffix>.<ext>`, where the suffix is usually the entity type or a date.
pub fn export_filename(prefix: &str, suffix: &str, format: ExportFormat) -> String {
    format!("{prefix}_{suffix}.{}", format.extension())
}

/// Today's local date as used in export filenames.
pub fn date_suffix() -> String {
    chrono::Local::now()
        .format(statics::DATE_SUFFIX_FORMAT)
        .to_string()
}

/// Writes rows to `path`, picking the format from the extension and gzip-compressing
/// `.gz` paths. The gzip header carries no timestamp so identical rows give identical
/// bytes.
pub fn write_export(path: &Path, rows: &[Row], pretty: bool) -> anyhow::Result<ExportFormat> {
    let format = ExportFormat::from_path(path);
    let text_bytes = export_bytes(rows, format, pretty);

    let bytes = if has_gz_extension(path) {
        let mut encoder = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::default());
        encoder.write_all(&text_bytes).context("gzip compress")?;
        encoder.finish().context("gzip finish")?
    } else {
        text_bytes
    };

    fs::write(path, &bytes).with_context(|| format!("writing {path:?}"))?;
    info!(path = %path.display(), rows = rows.len(), ?format, "export written");
    Ok(format)
}

impl EditSession {
    /// Export bytes using the session's JSON formatting preference.
    pub fn export(&self, rows: &[Row], format: ExportFormat) -> Vec<u8> {
        export_bytes(rows, format, self.config().pretty_json)
    }

    /// Filename with the configured prefix, suffixed by the entity type or, without one,
    /// today's date.
    pub fn export_filename(&self, entity: Option<&str>, format: ExportFormat) -> String {
        let suffix = entity.map(str::to_string).unwrap_or_else(date_suffix);
        export_filename(&self.config().export_prefix, &suffix, format)
    }
}
