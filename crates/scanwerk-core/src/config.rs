// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration. Loaded from an optional JSON file, then overridden by
// command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanwerkError};
use crate::types::Orientation;

/// Environment variable naming the device used when none is given.
pub const DEFAULT_DEVICE_ENV: &str = "SCANWERK_DEFAULT_DEVICE";

/// Rows fetched from the device per read.
pub const DEFAULT_CHUNK_ROWS: usize = 50;

/// Settings for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Device to open; falls back to `SCANWERK_DEFAULT_DEVICE`, then the first device listed.
    pub device: Option<String>,
    pub output: OutputConfig,
    pub tags: TagConfig,
    pub batch: BatchConfig,
    /// Paper name used to set the scanning area.
    pub paper: Option<String>,
    /// Print progress while streaming.
    pub progress: bool,
    pub capture: CaptureConfig,
}

/// Where and how pages are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output path; `%d` (or `%04d` etc.) is replaced by the page number.
    pub template: Option<String>,
    /// Put every page of a batch in one file.
    pub multi_page: bool,
    /// Use lossless compression.
    pub compress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            template: None,
            multi_page: true,
            compress: true,
        }
    }
}

/// Descriptive tags copied into every page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub document_name: Option<String>,
    pub image_description: Option<String>,
    pub orientation: Option<Orientation>,
}

/// Multi-page capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub enabled: bool,
    /// Pages to capture; `None` keeps going until the feeder is empty.
    pub count: Option<u32>,
    /// Number of the first page.
    pub start: i32,
    /// Page number increment.
    pub increment: i32,
    /// Wait for the operator before every page.
    pub prompt: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: None,
            start: 1,
            increment: 1,
            prompt: false,
        }
    }
}

/// Streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Rows per device read.
    pub chunk_rows: usize,
    /// Delay between warm-up retries, in seconds.
    pub warmup_delay_secs: u64,
    /// Start attempts before a warming-up device is declared frozen.
    pub warmup_attempts: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            warmup_delay_secs: 15,
            warmup_attempts: 4,
        }
    }
}

impl RunConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise start from defaults.
    pub fn load_or_default(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the capture pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.capture.chunk_rows == 0 {
            return Err(ScanwerkError::Config("chunk_rows must be at least 1".into()));
        }
        if self.capture.warmup_attempts == 0 {
            return Err(ScanwerkError::Config(
                "warmup_attempts must be at least 1".into(),
            ));
        }
        if self.batch.count == Some(0) {
            return Err(ScanwerkError::Config("batch count must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_command_line_defaults() {
        let config = RunConfig::default();
        assert!(config.output.multi_page);
        assert!(config.output.compress);
        assert!(!config.batch.enabled);
        assert_eq!(config.batch.start, 1);
        assert_eq!(config.batch.increment, 1);
        assert_eq!(config.batch.count, None);
        assert_eq!(config.capture.chunk_rows, DEFAULT_CHUNK_ROWS);
        assert_eq!(config.capture.warmup_attempts, 4);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "batch": {{ "enabled": true, "count": 3 }}, "tags": {{ "orientation": "botleft" }} }}"#
        )
        .unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert!(config.batch.enabled);
        assert_eq!(config.batch.count, Some(3));
        assert_eq!(config.batch.increment, 1);
        assert_eq!(config.tags.orientation, Some(Orientation::BotLeft));
        assert!(config.output.compress);
    }

    #[test]
    fn zero_batch_count_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "batch": {{ "enabled": true, "count": 0 }} }}"#).unwrap();
        assert!(matches!(
            RunConfig::load(file.path()),
            Err(ScanwerkError::Config(msg)) if msg.contains("batch count")
        ));
    }

    #[test]
    fn zero_chunk_rows_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "capture": {{ "chunk_rows": 0 }} }}"#).unwrap();
        assert!(matches!(
            RunConfig::load(file.path()),
            Err(ScanwerkError::Config(_))
        ));
    }
}
