// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Two positional parameters plus lock and output mode flags.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(about = "Deploy an application root from its versioned source repository")]
#[command(version)]
pub struct Cli {
    /// Application root containing the deployment repository and cache
    pub app_root: PathBuf,

    /// Path used to resolve build-tool extension properties
    pub extensions_path: PathBuf,

    /// Wait up to this many seconds for the deployment lock instead of
    /// failing immediately
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,

    /// Break an existing deployment lock even if it is not stale
    #[arg(long)]
    pub force: bool,

    /// Enable debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print errors and the final result
    #[arg(long, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    pub json: bool,
}
