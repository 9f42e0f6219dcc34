//! Core error types for logstep.

use std::path::PathBuf;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
///
/// Malformed log content never surfaces here. Only launch-time problems
/// and protocol misuse are errors; everything inside a replay degrades.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Log file does not exist
    #[error("Log file not found: {}", path.display())]
    LogNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Log file exists but could not be read
    #[error("Unable to read log file {}: {reason}", path.display())]
    LogUnreadable {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// Log has no non-blank lines
    #[error("No log lines found in {name}")]
    EmptyLog {
        /// Display name of the log
        name: String,
    },

    /// Log header does not enable the categories replay depends on
    #[error(
        "Log levels in {name} are insufficient for replay; set APEX_CODE to FINEST and VISUALFORCE to FINER or FINEST"
    )]
    IncorrectLogLevels {
        /// Display name of the log
        name: String,
    },

    /// Line breakpoint information could not be decoded
    #[error("Invalid line breakpoint info: {reason}")]
    InvalidBreakpointInfo {
        /// Decoder message
        reason: String,
    },

    /// Request needs a launched session
    #[error("No active replay session")]
    NoSession,

    /// Request arguments were missing or malformed
    #[error("Invalid arguments for {command}: {reason}")]
    InvalidArguments {
        /// Protocol command name
        command: String,
        /// What was wrong
        reason: String,
    },

    /// Framing or encoding problem on the protocol stream
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// I/O error outside log loading
    #[error("I/O error: {message}")]
    Io {
        /// Error message
        message: String,
    },
}

impl CoreError {
    /// Short tag used for structured logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LogNotFound { .. } => "log_not_found",
            Self::LogUnreadable { .. } => "log_unreadable",
            Self::EmptyLog { .. } => "empty_log",
            Self::IncorrectLogLevels { .. } => "incorrect_log_levels",
            Self::InvalidBreakpointInfo { .. } => "invalid_breakpoint_info",
            Self::NoSession => "no_session",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Protocol { .. } => "protocol",
            Self::Io { .. } => "io",
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_errors_have_distinct_messages() {
        let missing = CoreError::LogNotFound {
            path: PathBuf::from("/tmp/a.log"),
        };
        let empty = CoreError::EmptyLog {
            name: "a.log".to_string(),
        };
        assert_ne!(missing.to_string(), empty.to_string());
        assert!(missing.to_string().contains("/tmp/a.log"));
        assert!(empty.to_string().contains("a.log"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(CoreError::NoSession.kind(), "no_session");
        let err = CoreError::InvalidArguments {
            command: "launch".to_string(),
            reason: "missing logFile".to_string(),
        };
        assert_eq!(err.kind(), "invalid_arguments");
        assert!(err.to_string().contains("launch"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: CoreError = parse.unwrap_err().into();
        assert!(matches!(err, CoreError::Protocol { .. }));
    }
}
