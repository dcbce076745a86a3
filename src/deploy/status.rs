// ABOUTME: Currently-deployed pointer, previous record, and deployment history.
// ABOUTME: Pointer updates are atomic (temp file + rename); history is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::types::ChangesetId;

/// Canonical "currently deployed" pointer inside the deployment cache.
pub const CURRENT_RECORD: &str = "current.json";

/// Last successfully deployed changeset before the current one; kept so an
/// operator can roll back by hand.
pub const PREVIOUS_RECORD: &str = "previous.json";

/// Append-only log of run outcomes, one JSON record per line.
pub const HISTORY_LOG: &str = "history.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Succeeded,
    Failed,
}

/// One deployment outcome as recorded on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub changeset: ChangesetId,
    pub deployed_at: DateTime<Utc>,
    pub status: DeploymentStatus,
}

impl DeploymentRecord {
    pub fn succeeded(changeset: ChangesetId) -> Self {
        Self {
            changeset,
            deployed_at: Utc::now(),
            status: DeploymentStatus::Succeeded,
        }
    }

    pub fn failed(changeset: ChangesetId) -> Self {
        Self {
            changeset,
            deployed_at: Utc::now(),
            status: DeploymentStatus::Failed,
        }
    }
}

/// Read the currently-deployed pointer, if any.
pub fn read_current(cache: &Path) -> std::io::Result<Option<DeploymentRecord>> {
    read_record(&cache.join(CURRENT_RECORD))
}

/// Read the previous-deployment record, if any.
pub fn read_previous(cache: &Path) -> std::io::Result<Option<DeploymentRecord>> {
    read_record(&cache.join(PREVIOUS_RECORD))
}

fn read_record(path: &Path) -> std::io::Result<Option<DeploymentRecord>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let record = serde_json::from_str(&content).map_err(std::io::Error::other)?;
    Ok(Some(record))
}

/// Atomically install `record` as the currently-deployed pointer, rotating
/// the old pointer into the previous record. An observer reading the pointer
/// concurrently sees either the old record or the new one, never a torn file.
pub fn write_current(cache: &Path, record: &DeploymentRecord) -> std::io::Result<()> {
    std::fs::create_dir_all(cache)?;

    if let Some(old) = read_current(cache)? {
        if old.changeset != record.changeset {
            write_record(&cache.join(PREVIOUS_RECORD), &old)?;
        }
    }

    write_record(&cache.join(CURRENT_RECORD), record)
}

fn write_record(path: &Path, record: &DeploymentRecord) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(record).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}

/// Append a run outcome to the history log.
pub fn append_history(cache: &Path, record: &DeploymentRecord) -> std::io::Result<()> {
    std::fs::create_dir_all(cache)?;
    let json = serde_json::to_string(record).map_err(std::io::Error::other)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(cache.join(HISTORY_LOG))?;
    writeln!(file, "{json}")
}

/// Point the web root at an artifact directory.
///
/// The link is created beside the web root and renamed over it, so the live
/// path flips in one step and never dangles. An existing empty directory
/// (freshly provisioned root) is replaced; a non-empty real directory is
/// refused rather than destroyed.
#[cfg(unix)]
pub fn point_web_root(web_root: &Path, artifact: &Path) -> std::io::Result<()> {
    let staged_link = web_root.with_extension("new");
    if staged_link.exists() || staged_link.symlink_metadata().is_ok() {
        std::fs::remove_file(&staged_link)?;
    }
    std::os::unix::fs::symlink(artifact, &staged_link)?;

    match web_root.symlink_metadata() {
        Ok(metadata) if metadata.file_type().is_dir() => {
            // A real directory: only an empty placeholder may be replaced.
            if std::fs::read_dir(web_root)?.next().is_some() {
                let _ = std::fs::remove_file(&staged_link);
                return Err(std::io::Error::other(format!(
                    "web root {} is a non-empty directory, refusing to replace it",
                    web_root.display()
                )));
            }
            std::fs::remove_dir(web_root)?;
        }
        Ok(_) | Err(_) => {}
    }

    std::fs::rename(&staged_link, web_root)
}

#[cfg(not(unix))]
pub fn point_web_root(_web_root: &Path, _artifact: &Path) -> std::io::Result<()> {
    // The pointer record stays canonical on platforms without cheap symlink
    // swaps; the web root link is simply not maintained there.
    tracing::warn!("web root link not supported on this platform; relying on the pointer record");
    Ok(())
}
