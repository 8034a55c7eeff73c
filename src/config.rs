//! Pipeline configuration.
//!
//! Every setting has a default, so a config file only needs the keys it changes:
//!
//! ```json
//! { "source_dir": "data", "windows": ["1h", "1D", "1w"], "csv_dir": "out" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::ingestion::{CollectOptions, ExtractOptions, RepeatedTextPolicy, Severity};

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the event documents.
    pub source_dir: PathBuf,
    /// File extension (without the dot) of event documents.
    pub extension: String,
    /// How deep to descend into `source_dir`; `1` reads only the directory itself.
    pub max_depth: usize,
    /// Window specs (`<n><m|h|D|w>`), one output table each.
    pub windows: Vec<String>,
    /// SQLite database file the tables are written to.
    pub database: PathBuf,
    /// Also write one CSV file per window into this directory.
    pub csv_dir: Option<PathBuf>,
    pub repeated_text: RepeatedTextPolicy,
    /// Failures at or above this severity are raised as alerts.
    pub alert_at_or_above: Severity,
    /// Append stage events to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data"),
            extension: "xml".to_string(),
            max_depth: 1,
            windows: vec!["1D".to_string()],
            database: PathBuf::from("repair_orders.db"),
            csv_dir: None,
            repeated_text: RepeatedTextPolicy::default(),
            alert_at_or_above: Severity::Critical,
            log_file: None,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            extension: self.extension.clone(),
            max_depth: self.max_depth,
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            repeated_text: self.repeated_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::PipelineConfig;
    use crate::error::PipelineError;
    use crate::ingestion::{RepeatedTextPolicy, Severity};

    #[test]
    fn missing_keys_take_defaults() {
        let cfg = PipelineConfig::from_json_str(r#"{ "windows": ["1h", "1w"] }"#).unwrap();
        assert_eq!(cfg.windows, vec!["1h", "1w"]);
        assert_eq!(cfg.database, PathBuf::from("repair_orders.db"));
        assert_eq!(cfg.extension, "xml");
        assert_eq!(cfg.repeated_text, RepeatedTextPolicy::LastWins);
    }

    #[test]
    fn reads_every_setting() {
        let cfg = PipelineConfig::from_json_str(
            r#"{
                "source_dir": "events",
                "extension": "XML",
                "max_depth": 3,
                "windows": ["30m"],
                "database": "out.db",
                "csv_dir": "csv",
                "repeated_text": "accumulate",
                "alert_at_or_above": "error",
                "log_file": "pipeline.log"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.source_dir, PathBuf::from("events"));
        assert_eq!(cfg.collect_options().max_depth, 3);
        assert_eq!(cfg.collect_options().extension, "XML");
        assert_eq!(cfg.extract_options().repeated_text, RepeatedTextPolicy::Accumulate);
        assert_eq!(cfg.alert_at_or_above, Severity::Error);
        assert_eq!(cfg.csv_dir, Some(PathBuf::from("csv")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = PipelineConfig::from_json_str(r#"{ "window": "1D" }"#).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PipelineConfig::from_json_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, PipelineError::Read { .. }));
    }
}
