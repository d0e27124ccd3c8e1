//! Action-level error type.

use thiserror::Error;

/// Errors returned by an action handler or executor.
///
/// The engine uses the variant to decide how much of the attempt survives:
/// - `Failed`: recorded against this action only; sibling actions still run.
/// - `Unexpected`: the whole attempt is treated as failed and its results dropped.
///
/// Both are retryable under the rule's retry policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The action ran and did not achieve its effect.
    #[error("action failed: {0}")]
    Failed(String),

    /// The executor itself broke while running the action.
    #[error("unexpected executor error: {0}")]
    Unexpected(String),
}
