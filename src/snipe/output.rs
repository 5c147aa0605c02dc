//! Result log shown to the user and its text export

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Result, SniperError};
use crate::types::{LookupResult, LookupStatus};

/// Displayed result lines, in arrival order
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    lines: Vec<String>,
    include_claimed: bool,
}

impl ResultLog {
    pub fn new(include_claimed: bool) -> Self {
        Self {
            lines: Vec::new(),
            include_claimed,
        }
    }

    /// Append the display line for `result`, unless it is filtered out.
    ///
    /// Claimed names are only kept with `include_claimed`; available names and
    /// failed lookups are always kept.
    pub fn record(&mut self, result: &LookupResult) -> Option<&str> {
        if matches!(result.status, LookupStatus::Claimed { .. }) && !self.include_claimed {
            return None;
        }

        self.lines.push(result.to_string());
        self.lines.last().map(String::as_str)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Newline-delimited log contents
    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Write the log into `dir` under a timestamped name, returning the file path
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        self.export_at(dir, Utc::now())
    }

    pub fn export_at(&self, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
        if self.is_empty() {
            return Err(SniperError::validation("Result log is empty. Nothing to save."));
        }

        std::fs::create_dir_all(dir).map_err(|e| {
            SniperError::io(e.to_string(), Some(dir.to_string_lossy().to_string()))
        })?;

        let path = dir.join(export_file_name(now));
        let mut content = self.to_text();
        content.push('\n');

        std::fs::write(&path, content).map_err(|e| {
            SniperError::io(e.to_string(), Some(path.to_string_lossy().to_string()))
        })?;

        tracing::info!(path = %path.display(), lines = self.lines.len(), "Result log exported");
        Ok(path)
    }
}

/// `2024-05-01T12-30-05-123Z_Output.txt`: ISO-8601 with `:` and `.` made file-safe
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-");
    format!("{}_Output.txt", stamp)
}
