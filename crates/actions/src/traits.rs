//! The `ActionHandler` and `ActionExecutor` traits: the contracts every
//! action implementation and executor must fulfil.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Action, ActionError, ActionExecutionResult, RuleExecutionContext};

/// What a handler reports after a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutput {
    pub affected_entity_ids: Vec<Uuid>,
}

impl ActionOutput {
    pub fn affecting(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self { affected_entity_ids: ids.into_iter().collect() }
    }
}

/// Runs one kind of action.
///
/// Implementations are registered per [`crate::ActionKind`] in an
/// [`crate::ActionRegistry`].  Timeouts on external calls are the handler's
/// responsibility.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(
        &self,
        action: &Action,
        ctx: &RuleExecutionContext,
    ) -> Result<ActionOutput, ActionError>;
}

/// Executes an arbitrary action and reports a per-action result.
///
/// `Ok` results may themselves be failures.  `Err(ActionError::Failed)` is
/// recorded against the action; `Err(ActionError::Unexpected)` aborts the
/// whole attempt.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute_action(
        &self,
        index: usize,
        action: &Action,
        ctx: &RuleExecutionContext,
    ) -> Result<ActionExecutionResult, ActionError>;
}
