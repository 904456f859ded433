use crate::statics;
use anyhow::Context;
use serde::Deserialize;
use std::{fs, path::Path};

/// Session settings. Every field has a default, so `{}` is a valid config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Rows persisted at the same time during a batch save; 1 saves one row after another.
    pub save_concurrency: usize,
    /// First part of export filenames (`<prefix>_<suffix>.<ext>`).
    pub export_prefix: String,
    pub pretty_json: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_concurrency: 1,
            export_prefix: statics::DEFAULT_EXPORT_PREFIX.to_string(),
            pretty_json: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json5(text: &str) -> anyhow::Result<Self> {
        let config: Self = json5::from_str(text).context("parsing session config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
        Self::from_json5(&text).with_context(|| format!("loading {path:?}"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.save_concurrency >= 1, "saveConcurrency must be at least 1");
        anyhow::ensure!(
            !self.export_prefix.trim().is_empty(),
            "exportPrefix must not be empty"
        );
        Ok(())
    }
}
