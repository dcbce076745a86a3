// ABOUTME: Core value types shared across the deployment pipeline.
// ABOUTME: Exports the validated changeset identifier and changeset metadata.

mod changeset;

pub use changeset::{Changeset, ChangesetId, ChangesetIdError};
