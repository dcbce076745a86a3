// ABOUTME: Builder abstraction turning a source snapshot into a deployable artifact.
// ABOUTME: A factory inspects project markers and picks the build strategy.

mod copy;
mod error;
mod factory;
mod properties;
mod script;

pub use copy::CopyBuilder;
pub use error::{BuildError, SelectError};
pub use factory::BuilderFactory;
pub use properties::{BuildProperties, EXTENSIONS_PATH_KEY};
pub use script::ScriptBuilder;

use crate::logger::Logger;
use async_trait::async_trait;
use std::path::Path;

/// One build invocation: where to read, where to stage, and the opaque
/// property map forwarded to the tool.
pub struct BuildRequest<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub properties: &'a BuildProperties,
}

/// What a completed build produced.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Files staged into the output directory.
    pub files_staged: usize,
}

/// A strategy that compiles or packages a source snapshot into a deployable
/// output directory. Builders write only inside the request's output path;
/// the previously promoted artifact is never touched.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Strategy name for log lines and traces.
    fn name(&self) -> &'static str;

    async fn build(
        &self,
        request: &BuildRequest<'_>,
        logger: &dyn Logger,
    ) -> Result<BuildOutcome, BuildError>;
}
