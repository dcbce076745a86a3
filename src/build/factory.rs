// ABOUTME: Build strategy selection by project marker inspection.
// ABOUTME: An executable build script selects ScriptBuilder, else CopyBuilder.

use snafu::ResultExt;
use std::path::{Path, PathBuf};

use super::error::{InspectSnafu, MissingSourceSnafu, SelectError};
use super::{Builder, BuildProperties, CopyBuilder, ScriptBuilder};

/// Project-local build script, committed with the source.
const BUILD_SCRIPT: &str = ".stevedore/build";

/// Fallback marker for trees that keep the script at the root.
const BUILD_SCRIPT_FALLBACK: &str = "build.sh";

/// Selects a build strategy for a source tree.
pub struct BuilderFactory {
    properties: BuildProperties,
}

impl BuilderFactory {
    pub fn new(properties: BuildProperties) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &BuildProperties {
        &self.properties
    }

    /// Pick a builder for the given source tree.
    ///
    /// A tree carrying an executable build script is built by running that
    /// script; anything else is treated as a ready-to-serve tree and staged
    /// by copy.
    pub fn create_builder(&self, source: &Path) -> Result<Box<dyn Builder>, SelectError> {
        if !source.exists() {
            return MissingSourceSnafu { path: source }.fail();
        }

        if let Some(script) = self.find_build_script(source)? {
            return Ok(Box::new(ScriptBuilder::new(script)));
        }

        Ok(Box::new(CopyBuilder::new()))
    }

    fn find_build_script(&self, source: &Path) -> Result<Option<PathBuf>, SelectError> {
        for candidate in [BUILD_SCRIPT, BUILD_SCRIPT_FALLBACK] {
            let path = source.join(candidate);
            if is_executable_file(&path).context(InspectSnafu)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }
}

fn is_executable_file(path: &Path) -> std::io::Result<bool> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if !metadata.is_file() {
        return Ok(false);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(metadata.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    Ok(true)
}
