// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Zero-sized types enforce valid phase ordering at compile time.

/// Initial state: nothing done yet.
/// Available actions: `acquire_lock()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pending;

/// Lock acquired: this run owns the application root.
/// Available actions: `resolve()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Locked;

/// Changeset resolved: the target of this run is known.
/// Available actions: `build()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolved;

/// Build finished: the staged artifact is complete and self-contained.
/// Available actions: `promote()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Built;

/// Promoted: the staged artifact is live and recorded as current.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Promoted;
