//! Error types.
//!
//! Two layers:
//!
//! - `IndexError`: typed failures raised by the index/wage engine. Callers match on
//!   these to decide between "fall back and keep going" and "abort".
//! - `AppError`: what the binary ultimately reports (message + process exit code).

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Failures of the index-reconciliation and wage computation engine.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The bulletin bytes are not a spreadsheet, or the expected sheet/row is absent.
    #[error("invalid bulletin '{artifact}': {reason}")]
    Parse { artifact: String, reason: String },

    /// Download failed (network error, non-success status, empty body).
    #[error("failed to fetch '{artifact}': {reason}")]
    Fetch { artifact: String, reason: String },

    #[error("cursor file '{}' is unreadable: {reason}", path.display())]
    MissingCursor { path: PathBuf, reason: String },

    #[error("cursor value '{value}' is not a bulletin filename of the form prefix_MM_YY.ext")]
    MalformedCursor { value: String },

    #[error("no valid bulletin available (tried '{cursor}' and '{next}')")]
    NoBulletinAvailable { cursor: String, next: String },

    /// A date required as an anchor (first, pivot, last) has no usable index or wage value.
    #[error("unresolved {anchor} anchor at {date}: {reason}")]
    UnresolvedIndex {
        anchor: &'static str,
        date: NaiveDate,
        reason: String,
    },

    #[error("need at least two index points to extrapolate, found {found}")]
    InsufficientHistory { found: usize },

    #[error("index series has a gap between {after} and {before}")]
    NonContiguous { after: NaiveDate, before: NaiveDate },

    #[error("invalid input '{}': {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("i/o error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the update protocol may recover from this error by falling back to
    /// the last known-good bulletin.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Fetch { .. })
    }

    /// Process exit code used when this error escapes to the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingCursor { .. }
            | Self::MalformedCursor { .. }
            | Self::NoBulletinAvailable { .. }
            | Self::InvalidInput { .. } => 2,
            Self::UnresolvedIndex { .. } | Self::InsufficientHistory { .. } | Self::NonContiguous { .. } => 3,
            Self::Parse { .. } | Self::Fetch { .. } | Self::Io { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_parse_and_fetch_are_recoverable() {
        let parse = IndexError::Parse {
            artifact: "sh_ipc_07_25.xls".to_string(),
            reason: "not a workbook".to_string(),
        };
        let fetch = IndexError::Fetch {
            artifact: "sh_ipc_07_25.xls".to_string(),
            reason: "404".to_string(),
        };
        let cursor = IndexError::MissingCursor {
            path: PathBuf::from("version_IPC.txt"),
            reason: "not found".to_string(),
        };

        assert!(parse.is_recoverable());
        assert!(fetch.is_recoverable());
        assert!(!cursor.is_recoverable());
        assert!(!IndexError::InsufficientHistory { found: 1 }.is_recoverable());
    }

    #[test]
    fn app_error_keeps_exit_code_and_message() {
        let err: AppError = IndexError::InsufficientHistory { found: 1 }.into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("at least two"));
    }
}
