use std::{io::Write, path::Path};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{error::AppError, models::trip::Record, services::time::timestamp_token};

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    trips: &'a [Record],
}

/// A rendered export, ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub file_name: String,
    pub body: String,
}

/// Serializes the current list as `{ "trips": [...] }`. Elements that were
/// loaded unrecognised are written back exactly as stored.
pub fn export_snapshot(trips: &[Record], now: DateTime<Utc>, tz: Tz) -> Result<Snapshot, AppError> {
    if trips.is_empty() {
        return Err(AppError::NothingToExport);
    }
    let body = serde_json::to_string_pretty(&SnapshotDocument { trips })?;
    Ok(Snapshot {
        file_name: format!("itin-{}.json", timestamp_token(now, tz)),
        body,
    })
}

/// A snapshot staged in a temporary file. The file is removed when the
/// value is dropped, whichever way `hand_off` returns.
pub struct TransientDownload {
    file_name: String,
    file: NamedTempFile,
}

impl TransientDownload {
    pub fn stage(snapshot: &Snapshot, dir: &Path) -> Result<Self, AppError> {
        let mut file = tempfile::Builder::new()
            .prefix("itin-")
            .suffix(".json")
            .tempfile_in(dir)?;
        file.write_all(snapshot.body.as_bytes())?;
        file.flush()?;
        debug!(path = %file.path().display(), "staged {}", snapshot.file_name);
        Ok(Self {
            file_name: snapshot.file_name.clone(),
            file,
        })
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        self.file.path()
    }

    /// Gives the staged file to `use_once`, then releases it.
    pub fn hand_off<T>(
        self,
        use_once: impl FnOnce(&str, &Path) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        use_once(&self.file_name, self.file.path())
    }
}

impl Drop for TransientDownload {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "released {}", self.file_name);
    }
}

/// Convenience for callers that just want the staged bytes back.
pub fn read_staged(snapshot: &Snapshot, dir: &Path) -> Result<(String, Vec<u8>), AppError> {
    TransientDownload::stage(snapshot, dir)?
        .hand_off(|name, path| Ok((name.to_string(), std::fs::read(path)?)))
}
