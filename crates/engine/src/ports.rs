//! Collaborators the engine consumes.
//!
//! Each one is injected into [`crate::TriggerMatcher`] or
//! [`crate::RuleExecutor`] at construction.  Implementations own their own
//! concurrency safety.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use actions::CardSnapshot;

use crate::{
    models::{RuleDefinition, WorkflowDefinition},
    result::RuleExecutionLog,
    EngineError,
};

/// Source of enabled rule definitions, keyed by card type.
#[async_trait]
pub trait RuleCache: Send + Sync {
    async fn enabled_rules(&self, card_type_id: Uuid) -> Result<Vec<RuleDefinition>, EngineError>;
}

/// Source of the value stream for a card type.
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn workflow_for(
        &self,
        card_type_id: Uuid,
    ) -> Result<Option<WorkflowDefinition>, EngineError>;
}

/// Card lookup for events delivered without a snapshot.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn find_by_id(&self, card_id: Uuid) -> Result<Option<CardSnapshot>, EngineError>;
}

/// Append-only sink for execution logs.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn save(&self, log: &RuleExecutionLog) -> Result<(), EngineError>;
}

/// Waits between retry attempts.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
