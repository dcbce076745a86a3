// ABOUTME: Opaque build property map forwarded verbatim to builders.
// ABOUTME: Properties reach external build tools as environment variables.

use std::collections::HashMap;
use std::path::Path;

/// Recognized key naming the build-tool extensions path.
pub const EXTENSIONS_PATH_KEY: &str = "extensions_path";

/// Prefix for the environment variables properties are forwarded under.
const ENV_PREFIX: &str = "STEVEDORE_BUILD_";

/// Configuration map handed through to the selected builder. Keys are
/// build-tool specific; the orchestrator only guarantees delivery.
#[derive(Debug, Clone, Default)]
pub struct BuildProperties {
    values: HashMap<String, String>,
}

impl BuildProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Properties carrying the extensions path from the process invocation.
    pub fn with_extensions_path(path: &Path) -> Self {
        let mut properties = Self::new();
        properties.set(EXTENSIONS_PATH_KEY, path.display().to_string());
        properties
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Convert properties to environment variables for a build subprocess:
    /// `extensions_path` becomes `STEVEDORE_BUILD_EXTENSIONS_PATH`.
    pub fn to_env(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{}", k.to_ascii_uppercase()), v.clone()))
            .collect()
    }
}
