//! Daily flood occurrence reports stored as JSON files.
//!
//! Files live at `<root>/<year>/<MM>/<year>_<MM>_<DD>.json` and are served
//! verbatim.

use std::path::PathBuf;

use tracing::debug;

/// Errors reading an occurrence report.
#[derive(Debug, thiserror::Error)]
pub enum OccurrenceError {
    #[error("invalid date {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only store of daily occurrence reports.
#[derive(Debug, Clone)]
pub struct OccurrenceStore {
    root: PathBuf,
}

impl OccurrenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the report for a day.
    pub fn path_for(&self, year: i32, month: u32, day: u32) -> PathBuf {
        self.root
            .join(year.to_string())
            .join(format!("{month:02}"))
            .join(format!("{year}_{month:02}_{day:02}.json"))
    }

    /// The report for a day, or `None` if there is no file for it.
    pub async fn load(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<Option<serde_json::Value>, OccurrenceError> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || year < 0 {
            return Err(OccurrenceError::InvalidDate { year, month, day });
        }

        let path = self.path_for(year, month, day);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no occurrence report");
                return Ok(None);
            }
            Err(source) => return Err(OccurrenceError::Io { path, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| OccurrenceError::Parse { path, source })
    }
}
