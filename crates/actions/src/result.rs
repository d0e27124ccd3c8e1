//! Per-action outcome.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ActionKind;

/// Outcome of one action within one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExecutionResult {
    pub action_type: ActionKind,
    /// Position of the action in the rule's action list.
    pub index: usize,
    pub success: bool,
    /// Cards (or other entities) the action touched.
    #[serde(default)]
    pub affected_entity_ids: Vec<Uuid>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ActionExecutionResult {
    pub fn succeeded(action_type: ActionKind, index: usize, affected_entity_ids: Vec<Uuid>) -> Self {
        Self {
            action_type,
            index,
            success: true,
            affected_entity_ids,
            error_message: None,
        }
    }

    pub fn failed(action_type: ActionKind, index: usize, message: impl Into<String>) -> Self {
        Self {
            action_type,
            index,
            success: false,
            affected_entity_ids: Vec::new(),
            error_message: Some(message.into()),
        }
    }
}
