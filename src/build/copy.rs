// ABOUTME: Pass-through builder for trees that deploy as-is.
// ABOUTME: Copies the working tree into staging, skipping VCS and orchestrator state.

use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::logger::Logger;

use super::error::BuildError;
use super::{BuildOutcome, BuildRequest, Builder};
use async_trait::async_trait;

/// Directories never staged into an artifact.
const EXCLUDED: &[&str] = &[".git", ".stevedore"];

/// Stages a ready-to-serve source tree by copying it verbatim.
pub struct CopyBuilder;

impl CopyBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CopyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Builder for CopyBuilder {
    fn name(&self) -> &'static str {
        "copy"
    }

    async fn build(
        &self,
        request: &BuildRequest<'_>,
        logger: &dyn Logger,
    ) -> Result<BuildOutcome, BuildError> {
        std::fs::create_dir_all(request.output)?;
        let files_staged = copy_tree(request.source, request.output)?;
        logger.message(&format!("Staged {files_staged} files from the working tree"));
        Ok(BuildOutcome { files_staged })
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| EXCLUDED.contains(&name))
        .unwrap_or(false)
}

fn copy_tree(source: &Path, dest: &Path) -> Result<usize, BuildError> {
    let mut copied = 0;

    for entry in WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_excluded(e))
    {
        let entry = entry.map_err(|e| BuildError::Stage(e.to_string()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| BuildError::Stage(e.to_string()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
        // Symlinks are not staged; artifacts must be self-contained.
    }

    Ok(copied)
}
