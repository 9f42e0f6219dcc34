//! Log source loading.
//!
//! A [`LogSource`] is the whole debug log held in memory as lines. Blank lines
//! are kept so that line positions match the file; the cursor skips them.

use logstep_core::CoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Header categories a log needs for a faithful replay
static LOG_LEVEL_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{2}.*APEX_CODE,FINEST;.*VISUALFORCE,(?:FINER|FINEST);")
        .expect("log level header pattern is valid")
});

/// Errors while loading a log
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// No file at the path
    #[error("Log file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be read as UTF-8 text
    #[error("Unable to read {}: {reason}", path.display())]
    Unreadable {
        /// Path that failed to load
        path: PathBuf,
        /// Underlying I/O or decoding error
        reason: String,
    },

    /// No non-blank lines
    #[error("No log lines found in {0}")]
    Empty(String),

    /// Header does not enable the required categories
    #[error("Insufficient log levels in {0}")]
    IncorrectLogLevels(String),
}

impl From<SourceError> for CoreError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => CoreError::LogNotFound { path },
            SourceError::Unreadable { path, reason } => CoreError::LogUnreadable { path, reason },
            SourceError::Empty(name) => CoreError::EmptyLog { name },
            SourceError::IncorrectLogLevels(name) => CoreError::IncorrectLogLevels { name },
        }
    }
}

/// An entire debug log, loaded once at launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    path: PathBuf,
    name: String,
    lines: Vec<String>,
    size: usize,
}

impl LogSource {
    /// Read a log from disk
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] if the path does not exist and
    /// [`SourceError::Unreadable`] if it cannot be read as text.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|err| SourceError::Unreadable {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "loaded debug log");
        Ok(Self::from_contents(path, &contents))
    }

    /// Build a log from text already in memory
    #[must_use]
    pub fn from_contents(path: impl AsRef<Path>, contents: &str) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            name,
            lines: contents.lines().map(str::to_string).collect(),
            size: contents.len(),
        }
    }

    /// Override the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check that the log can start a session
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Empty`] when no line has content, and
    /// [`SourceError::IncorrectLogLevels`] when `check_levels` is set and the
    /// header lacks the required categories.
    pub fn validate(&self, check_levels: bool) -> Result<(), SourceError> {
        if self.non_blank_count() == 0 {
            return Err(SourceError::Empty(self.name.clone()));
        }
        if check_levels && !self.meets_log_level_requirements() {
            return Err(SourceError::IncorrectLogLevels(self.name.clone()));
        }
        Ok(())
    }

    /// Whether the header enables `APEX_CODE,FINEST` and `VISUALFORCE` at `FINER` or above
    #[must_use]
    pub fn meets_log_level_requirements(&self) -> bool {
        self.lines
            .first()
            .is_some_and(|header| LOG_LEVEL_HEADER.is_match(header))
    }

    /// Path the log was read from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display name, the file name by default
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line at a zero-based position
    #[must_use]
    pub fn line(&self, position: usize) -> Option<&str> {
        self.lines.get(position).map(String::as_str)
    }

    /// All lines, blanks included
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Total line count, blanks included
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the log has no lines at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines with content
    #[must_use]
    pub fn non_blank_count(&self) -> usize {
        self.lines.iter().filter(|l| !l.is_empty()).count()
    }

    /// Size of the log text in bytes
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}
