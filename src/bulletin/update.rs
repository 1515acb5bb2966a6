//! Fetch-validate-commit protocol for CPI bulletins.
//!
//! Each run looks for the bulletin that follows the cursor. The cursor moves
//! only after that bulletin has been downloaded, decoded, and written to the data
//! directory. A valid copy of that bulletin already in the data directory (left
//! by a run that stopped between writing the file and moving the cursor) also
//! counts and completes the commit. Otherwise the run falls back to the
//! cursor's own bulletin, which is fetched first if it is not available locally.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::bulletin::cursor::{BulletinCursor, BulletinName};
use crate::bulletin::fetch::BulletinSource;
use crate::bulletin::parser::BulletinDecoder;
use crate::domain::IndexPoint;
use crate::error::IndexError;
use crate::io::write_atomic;

/// How the run obtained its bulletin.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// A newer bulletin was validated and the cursor advanced to it.
    Committed {
        previous: BulletinName,
        bulletin: BulletinName,
    },
    /// No newer bulletin; the cursor's bulletin was used and the cursor left alone.
    Stale { bulletin: BulletinName, reason: String },
}

impl UpdateOutcome {
    pub fn bulletin(&self) -> &BulletinName {
        match self {
            Self::Committed { bulletin, .. } | Self::Stale { bulletin, .. } => bulletin,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Result of one protocol run.
#[derive(Debug, Clone)]
pub struct BulletinUpdate {
    pub cursor: BulletinCursor,
    pub outcome: UpdateOutcome,
    /// Decoded (not yet rebased) values of the bulletin in use.
    pub points: Vec<IndexPoint>,
}

/// Run the protocol once.
pub fn refresh_bulletin(
    cursor: BulletinCursor,
    source: &dyn BulletinSource,
    decoder: &dyn BulletinDecoder,
    data_dir: &Path,
) -> Result<BulletinUpdate, IndexError> {
    let current = cursor.current().clone();
    let next = current.next();
    info!(cursor = %current, candidate = %next, "Checking for a newer bulletin");

    let reason = match fetch_validated(source, decoder, &next) {
        Ok((bytes, points)) => {
            write_atomic(&data_dir.join(next.filename()), &bytes)?;
            return commit(cursor, next, points);
        }
        Err(e) if e.is_recoverable() => e.to_string(),
        Err(e) => return Err(e),
    };

    if let Some(points) = decode_local(decoder, data_dir, &next)? {
        info!(bulletin = %next, reason = %reason, "Newer bulletin already on disk, completing commit");
        return commit(cursor, next, points);
    }

    warn!(
        candidate = %next,
        reason = %reason,
        fallback = %current,
        "Newer bulletin not available, using current"
    );

    let points = load_known_good(source, decoder, data_dir, &current).map_err(|e| {
        if e.is_recoverable() {
            warn!(bulletin = %current, error = %e, "Current bulletin unavailable");
            IndexError::NoBulletinAvailable {
                cursor: current.filename(),
                next: next.filename(),
            }
        } else {
            e
        }
    })?;

    Ok(BulletinUpdate {
        cursor,
        outcome: UpdateOutcome::Stale {
            bulletin: current,
            reason,
        },
        points,
    })
}

/// Move the cursor to `next`, whose bytes are already persisted.
fn commit(
    cursor: BulletinCursor,
    next: BulletinName,
    points: Vec<IndexPoint>,
) -> Result<BulletinUpdate, IndexError> {
    let previous = cursor.current().clone();
    let cursor = cursor.advance(next.clone())?;
    info!(bulletin = %next, months = points.len(), "Committed newer bulletin");
    Ok(BulletinUpdate {
        cursor,
        outcome: UpdateOutcome::Committed {
            previous,
            bulletin: next,
        },
        points,
    })
}

/// Download `name` and decode it in memory; nothing touches disk here.
fn fetch_validated(
    source: &dyn BulletinSource,
    decoder: &dyn BulletinDecoder,
    name: &BulletinName,
) -> Result<(Vec<u8>, Vec<IndexPoint>), IndexError> {
    let filename = name.filename();
    let bytes = source.fetch(&filename)?;
    let points = decoder.decode(&filename, &bytes)?;
    Ok((bytes, points))
}

/// Decode the cursor's bulletin from disk, downloading it first if it is
/// missing or unreadable locally.
fn load_known_good(
    source: &dyn BulletinSource,
    decoder: &dyn BulletinDecoder,
    data_dir: &Path,
    name: &BulletinName,
) -> Result<Vec<IndexPoint>, IndexError> {
    if let Some(points) = decode_local(decoder, data_dir, name)? {
        return Ok(points);
    }

    info!(bulletin = %name, "Current bulletin not usable locally, downloading");
    let (bytes, points) = fetch_validated(source, decoder, name)?;
    write_atomic(&data_dir.join(name.filename()), &bytes)?;
    Ok(points)
}

/// Decode `name` from the data directory. `None` when the file is absent or
/// not a valid bulletin.
fn decode_local(
    decoder: &dyn BulletinDecoder,
    data_dir: &Path,
    name: &BulletinName,
) -> Result<Option<Vec<IndexPoint>>, IndexError> {
    let filename = name.filename();
    let path = data_dir.join(&filename);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = fs::read(&path).map_err(|e| IndexError::io(&path, e))?;
    match decoder.decode(&filename, &bytes) {
        Ok(points) => Ok(Some(points)),
        Err(e) if e.is_recoverable() => {
            warn!(file = %path.display(), error = %e, "Local bulletin is invalid");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::NaiveDate;

    use crate::bulletin::parser::assign_months;

    /// In-memory source: filename -> bytes. Missing names fail like a 404.
    struct FakeSource(HashMap<String, Vec<u8>>);

    impl FakeSource {
        fn with(files: &[(&str, &str)]) -> Self {
            Self(
                files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
            )
        }
    }

    impl BulletinSource for FakeSource {
        fn fetch(&self, filename: &str) -> Result<Vec<u8>, IndexError> {
            self.0.get(filename).cloned().ok_or_else(|| IndexError::Fetch {
                artifact: filename.to_string(),
                reason: "404 Not Found".to_string(),
            })
        }
    }

    /// Accepts `VALID:v1,v2,...`; anything else is an invalid artifact.
    struct FakeDecoder;

    impl BulletinDecoder for FakeDecoder {
        fn decode(&self, artifact: &str, bytes: &[u8]) -> Result<Vec<IndexPoint>, IndexError> {
            let text = String::from_utf8_lossy(bytes);
            let body = text.strip_prefix("VALID:").ok_or_else(|| IndexError::Parse {
                artifact: artifact.to_string(),
                reason: "not a workbook".to_string(),
            })?;
            let values: Vec<f64> = body.split(',').map(|v| v.trim().parse().unwrap()).collect();
            Ok(assign_months(&values, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()))
        }
    }

    fn setup(cursor_value: &str) -> (tempfile::TempDir, BulletinCursor) {
        let dir = tempfile::tempdir().unwrap();
        let cursor_path = dir.path().join("version_IPC.txt");
        fs::write(&cursor_path, cursor_value).unwrap();
        let cursor = BulletinCursor::load(&cursor_path).unwrap();
        (dir, cursor)
    }

    #[test]
    fn commits_when_next_bulletin_is_valid() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        let source = FakeSource::with(&[("sh_ipc_07_25.xls", "VALID:100,101,102")]);

        let update = refresh_bulletin(cursor, &source, &FakeDecoder, dir.path()).unwrap();

        assert!(update.outcome.is_committed());
        assert_eq!(update.outcome.bulletin().filename(), "sh_ipc_07_25.xls");
        assert_eq!(update.points.len(), 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("version_IPC.txt")).unwrap(),
            "sh_ipc_07_25.xls"
        );
        assert!(dir.path().join("sh_ipc_07_25.xls").exists());
    }

    #[test]
    fn fetch_failure_leaves_cursor_byte_identical() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls\n");
        fs::write(dir.path().join("sh_ipc_06_25.xls"), "VALID:100,101").unwrap();
        let before = fs::read(dir.path().join("version_IPC.txt")).unwrap();

        let update = refresh_bulletin(cursor, &FakeSource::with(&[]), &FakeDecoder, dir.path()).unwrap();

        assert!(!update.outcome.is_committed());
        assert_eq!(update.points.len(), 2);
        assert_eq!(fs::read(dir.path().join("version_IPC.txt")).unwrap(), before);
    }

    #[test]
    fn invalid_download_is_discarded_and_cursor_kept() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        fs::write(dir.path().join("sh_ipc_06_25.xls"), "VALID:100").unwrap();
        let source = FakeSource::with(&[("sh_ipc_07_25.xls", "<html>maintenance</html>")]);

        let update = refresh_bulletin(cursor, &source, &FakeDecoder, dir.path()).unwrap();

        assert!(matches!(update.outcome, UpdateOutcome::Stale { .. }));
        assert!(!dir.path().join("sh_ipc_07_25.xls").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("version_IPC.txt")).unwrap(),
            "sh_ipc_06_25.xls"
        );
    }

    #[test]
    fn bootstraps_missing_current_bulletin_without_moving_cursor() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        let source = FakeSource::with(&[("sh_ipc_06_25.xls", "VALID:100,101")]);

        let update = refresh_bulletin(cursor, &source, &FakeDecoder, dir.path()).unwrap();

        assert_eq!(update.outcome.bulletin().filename(), "sh_ipc_06_25.xls");
        assert!(dir.path().join("sh_ipc_06_25.xls").exists());
        assert_eq!(update.cursor.current().filename(), "sh_ipc_06_25.xls");
    }

    #[test]
    fn corrupt_local_bulletin_is_replaced_by_valid_download() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        fs::write(dir.path().join("sh_ipc_06_25.xls"), "truncated").unwrap();
        let source = FakeSource::with(&[("sh_ipc_06_25.xls", "VALID:100,101")]);

        let update = refresh_bulletin(cursor, &source, &FakeDecoder, dir.path()).unwrap();

        assert_eq!(update.points.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("sh_ipc_06_25.xls")).unwrap(),
            "VALID:100,101"
        );
    }

    #[test]
    fn newer_bulletin_left_on_disk_completes_the_commit() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        fs::write(dir.path().join("sh_ipc_07_25.xls"), "VALID:100,101,102").unwrap();

        let update = refresh_bulletin(cursor, &FakeSource::with(&[]), &FakeDecoder, dir.path()).unwrap();

        assert!(matches!(
            &update.outcome,
            UpdateOutcome::Committed { previous, bulletin }
                if previous.filename() == "sh_ipc_06_25.xls" && bulletin.filename() == "sh_ipc_07_25.xls"
        ));
        assert_eq!(update.points.len(), 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("version_IPC.txt")).unwrap(),
            "sh_ipc_07_25.xls"
        );
        assert!(!dir.path().join("sh_ipc_06_25.xls").exists());
    }

    #[test]
    fn invalid_newer_bulletin_on_disk_is_ignored() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        fs::write(dir.path().join("sh_ipc_07_25.xls"), "partial download").unwrap();
        fs::write(dir.path().join("sh_ipc_06_25.xls"), "VALID:100,101").unwrap();

        let update = refresh_bulletin(cursor, &FakeSource::with(&[]), &FakeDecoder, dir.path()).unwrap();

        assert_eq!(update.outcome.bulletin().filename(), "sh_ipc_06_25.xls");
        assert!(!update.outcome.is_committed());
        assert_eq!(
            fs::read_to_string(dir.path().join("version_IPC.txt")).unwrap(),
            "sh_ipc_06_25.xls"
        );
    }

    #[test]
    fn no_bulletin_anywhere_is_fatal() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");

        let err = refresh_bulletin(cursor, &FakeSource::with(&[]), &FakeDecoder, dir.path()).unwrap_err();

        assert!(matches!(err, IndexError::NoBulletinAvailable { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn rerun_without_new_bulletin_is_idempotent() {
        let (dir, cursor) = setup("sh_ipc_06_25.xls");
        fs::write(dir.path().join("sh_ipc_06_25.xls"), "VALID:100,101").unwrap();
        let source = FakeSource::with(&[]);

        let first = refresh_bulletin(cursor, &source, &FakeDecoder, dir.path()).unwrap();
        let snapshot = |dir: &Path| {
            let mut entries: Vec<_> = fs::read_dir(dir)
                .unwrap()
                .map(|e| {
                    let path = e.unwrap().path();
                    (path.clone(), fs::read(path).unwrap())
                })
                .collect();
            entries.sort();
            entries
        };
        let before = snapshot(dir.path());

        let second = refresh_bulletin(first.cursor, &source, &FakeDecoder, dir.path()).unwrap();

        assert_eq!(snapshot(dir.path()), before);
        assert_eq!(second.points, first.points);
    }
}
