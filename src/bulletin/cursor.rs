//! Persisted pointer to the latest known-good bulletin.
//!
//! The cursor file holds one bulletin filename of the form `prefix_MM_YY.ext`
//! (e.g. `sh_ipc_06_25.xls`). It is the only state carried between runs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::error::IndexError;
use crate::io::write_atomic;

/// A bulletin filename decoded into its month/year parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinName {
    prefix: String,
    month: u32,
    /// Two-digit year.
    year: u32,
    extension: String,
}

impl BulletinName {
    /// The bulletin published one month later.
    pub fn next(&self) -> Self {
        let (month, year) = if self.month == 12 {
            (1, (self.year + 1) % 100)
        } else {
            (self.month + 1, self.year)
        };
        Self {
            prefix: self.prefix.clone(),
            month,
            year,
            extension: self.extension.clone(),
        }
    }

    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BulletinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:02}_{:02}", self.prefix, self.month, self.year)?;
        if !self.extension.is_empty() {
            write!(f, ".{}", self.extension)?;
        }
        Ok(())
    }
}

impl FromStr for BulletinName {
    type Err = IndexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || IndexError::MalformedCursor {
            value: value.to_string(),
        };

        let (stem, extension) = match value.rsplit_once('.') {
            Some((stem, ext)) => (stem, ext),
            None => (value, ""),
        };

        let mut parts = stem.rsplitn(3, '_');
        let year = parts.next().ok_or_else(malformed)?;
        let month = parts.next().ok_or_else(malformed)?;
        let prefix = parts.next().filter(|p| !p.is_empty()).ok_or_else(malformed)?;

        let is_two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
        if !is_two_digits(month) || !is_two_digits(year) {
            return Err(malformed());
        }

        let month: u32 = month.parse().map_err(|_| malformed())?;
        let year: u32 = year.parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&month) {
            return Err(malformed());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            month,
            year,
            extension: extension.to_string(),
        })
    }
}

/// The cursor together with the file it was loaded from.
///
/// Advancing consumes the old value and returns the new one; the file is only
/// rewritten by `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinCursor {
    path: PathBuf,
    current: BulletinName,
}

impl BulletinCursor {
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let raw = fs::read_to_string(path).map_err(|e| IndexError::MissingCursor {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let value = raw.trim();
        if value.is_empty() {
            return Err(IndexError::MissingCursor {
                path: path.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            current: value.parse()?,
        })
    }

    pub fn current(&self) -> &BulletinName {
        &self.current
    }

    /// Persist `next` as the new cursor value.
    pub fn advance(self, next: BulletinName) -> Result<Self, IndexError> {
        write_atomic(&self.path, next.filename().as_bytes())?;
        info!(from = %self.current, to = %next, cursor = %self.path.display(), "Advanced bulletin cursor");
        Ok(Self {
            path: self.path,
            current: next,
        })
    }
}
