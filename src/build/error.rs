// ABOUTME: Error types for builder selection and build execution.
// ABOUTME: Selection failures use SNAFU selectors; build failures use thiserror.

use snafu::Snafu;
use std::path::PathBuf;
use thiserror::Error;

/// Errors while choosing a build strategy for a source tree.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SelectError {
    #[snafu(display("source path does not exist: {}", path.display()))]
    MissingSource { path: PathBuf },

    #[snafu(display("failed to inspect source tree: {source}"))]
    Inspect { source: std::io::Error },
}

/// Errors from running a build into the staging directory.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No builder could be selected for the source tree.
    #[error("builder selection failed: {0}")]
    Select(#[from] SelectError),

    /// The external build tool exited non-zero.
    #[error("build script failed with status {status}: {stderr}")]
    ScriptFailed { status: i32, stderr: String },

    /// The external build tool was terminated by a signal.
    #[error("build script was terminated by a signal")]
    ScriptKilled,

    /// The build tool could not be started at all.
    #[error("failed to run build script {script}: {source}")]
    ScriptSpawn {
        script: PathBuf,
        source: std::io::Error,
    },

    /// Staging the build output failed.
    #[error("failed to stage build output: {0}")]
    Stage(String),

    /// Filesystem failure during the build.
    #[error("I/O error during build: {0}")]
    Io(#[from] std::io::Error),
}
