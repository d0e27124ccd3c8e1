//! Kind → handler lookup table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    Action, ActionError, ActionExecutionResult, ActionExecutor, ActionHandler, ActionKind,
    RuleExecutionContext,
};

/// Maps each [`ActionKind`] to the handler that runs it.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for `kind`.
    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) -> &mut Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Register one handler for every action kind.
    pub fn with_handler_for_all(handler: Arc<dyn ActionHandler>) -> Self {
        let mut registry = Self::new();
        for kind in ActionKind::ALL {
            registry.register(kind, Arc::clone(&handler));
        }
        registry
    }
}

#[async_trait]
impl ActionExecutor for ActionRegistry {
    async fn execute_action(
        &self,
        index: usize,
        action: &Action,
        ctx: &RuleExecutionContext,
    ) -> Result<ActionExecutionResult, ActionError> {
        let kind = action.kind();

        let Some(handler) = self.handlers.get(&kind) else {
            warn!(action = %kind, index, "no handler registered");
            return Ok(ActionExecutionResult::failed(
                kind,
                index,
                format!("no handler registered for action '{kind}'"),
            ));
        };

        match handler.handle(action, ctx).await {
            Ok(output) => {
                debug!(action = %kind, index, "action succeeded");
                Ok(ActionExecutionResult::succeeded(kind, index, output.affected_entity_ids))
            }
            Err(ActionError::Failed(msg)) => Ok(ActionExecutionResult::failed(kind, index, msg)),
            Err(unexpected) => Err(unexpected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHandler;
    use crate::{CardSnapshot, CardTarget, TriggerEvent};
    use uuid::Uuid;

    fn ctx() -> RuleExecutionContext {
        RuleExecutionContext::new(
            CardSnapshot::new(Uuid::new_v4(), Uuid::new_v4()),
            Uuid::new_v4(),
            TriggerEvent::OnCreate,
        )
    }

    fn archive() -> Action {
        Action::ArchiveCard { target: CardTarget::TriggerCard }
    }

    #[tokio::test]
    async fn dispatches_to_the_handler_for_the_action_kind() {
        let archive_handler = Arc::new(MockHandler::succeeding());
        let comment_handler = Arc::new(MockHandler::succeeding());
        let mut registry = ActionRegistry::new();
        registry
            .register(ActionKind::ArchiveCard, archive_handler.clone())
            .register(ActionKind::AddComment, comment_handler.clone());

        let result = registry.execute_action(0, &archive(), &ctx()).await.expect("no executor error");

        assert!(result.success);
        assert_eq!(result.action_type, ActionKind::ArchiveCard);
        assert_eq!(archive_handler.call_count(), 1);
        assert_eq!(comment_handler.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_handler_is_a_failed_action_not_an_executor_error() {
        let registry = ActionRegistry::new();
        let result = registry.execute_action(3, &archive(), &ctx()).await.expect("no executor error");

        assert!(!result.success);
        assert_eq!(result.index, 3);
        assert!(result.error_message.unwrap().contains("archive_card"));
    }

    #[tokio::test]
    async fn handler_failure_becomes_a_failed_result() {
        let registry = ActionRegistry::with_handler_for_all(Arc::new(MockHandler::failing("card locked")));
        let result = registry.execute_action(1, &archive(), &ctx()).await.expect("no executor error");

        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("card locked"));
    }

    #[tokio::test]
    async fn unexpected_handler_error_propagates() {
        let registry = ActionRegistry::with_handler_for_all(Arc::new(MockHandler::unexpected("pool closed")));
        let result = registry.execute_action(0, &archive(), &ctx()).await;

        assert_eq!(result, Err(ActionError::Unexpected("pool closed".into())));
    }
}
