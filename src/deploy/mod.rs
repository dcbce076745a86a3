// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the lock, state markers, manager, and error taxonomy.

mod deployment;
mod error;
mod lock;
mod manager;
mod report;
mod state;
pub mod status;
mod transitions;

pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use lock::{DeployLock, LockInfo, LockPolicy};
pub use manager::DeploymentManager;
pub use report::{DeploymentReport, Outcome};
pub use state::{Built, Locked, Pending, Promoted, Resolved};
pub use transitions::TransitionResult;
