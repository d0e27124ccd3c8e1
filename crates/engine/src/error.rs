//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the rule engine (workflow validation + trigger matching).
///
/// Rule execution itself never fails: its terminal states are reported as
/// [`crate::ExecutionStatus`] values.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Workflow validation errors ------

    /// The value stream has no statuses at all.
    #[error("workflow '{0}' has no statuses")]
    EmptyWorkflow(String),

    /// Two or more statuses share the same ID.
    #[error("duplicate status ID: '{0}'")]
    DuplicateStatusId(String),

    /// Two steps of a workflow, or two statuses of a step, share a
    /// `sort_order`, so the linear order is ambiguous.
    #[error("{scope} has more than one entry with sort order {sort_order}")]
    DuplicateSortOrder { scope: String, sort_order: i32 },

    /// A status referenced by a move is not part of the workflow.
    #[error("status '{status_id}' is not part of workflow '{workflow}'")]
    UnknownStatus {
        status_id: String,
        workflow: String,
    },

    // ------ Collaborator errors ------

    /// Rule cache, workflow source or card store failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
