// ABOUTME: Builder that runs the project's own build script.
// ABOUTME: Properties flow in as environment; diagnostics flow out via the Logger.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::logger::Logger;

use super::error::BuildError;
use super::{BuildOutcome, BuildRequest, Builder};
use async_trait::async_trait;

/// Runs an external build tool discovered in the source tree.
///
/// The script receives the build properties plus `STEVEDORE_SOURCE_PATH` and
/// `STEVEDORE_OUTPUT_PATH`, runs with the source tree as its working
/// directory, and must populate the output path itself. Exit status is
/// captured faithfully; stdout and stderr are replayed through the shared
/// logger so build diagnostics interleave with orchestration ones.
pub struct ScriptBuilder {
    script: PathBuf,
}

impl ScriptBuilder {
    pub fn new(script: PathBuf) -> Self {
        Self { script }
    }
}

#[async_trait]
impl Builder for ScriptBuilder {
    fn name(&self) -> &'static str {
        "script"
    }

    async fn build(
        &self,
        request: &BuildRequest<'_>,
        logger: &dyn Logger,
    ) -> Result<BuildOutcome, BuildError> {
        std::fs::create_dir_all(request.output)?;

        let output = Command::new(&self.script)
            .current_dir(request.source)
            .envs(request.properties.to_env())
            .env("STEVEDORE_SOURCE_PATH", request.source)
            .env("STEVEDORE_OUTPUT_PATH", request.output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| BuildError::ScriptSpawn {
                script: self.script.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            logger.message(line);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            logger.warning(line);
        }

        if !output.status.success() {
            return match output.status.code() {
                Some(status) => Err(BuildError::ScriptFailed {
                    status,
                    stderr: stderr.trim().to_string(),
                }),
                None => Err(BuildError::ScriptKilled),
            };
        }

        let files_staged = WalkDir::new(request.output)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .count();

        if files_staged == 0 {
            logger.warning("build script succeeded but staged no files");
        }

        Ok(BuildOutcome { files_staged })
    }
}
