//! Core domain models for the rule engine.
//!
//! Rule definitions and value streams are authored elsewhere; the engine only
//! ever reads them.  Both serialise to/from the JSONB `definition` columns the
//! `db` crate stores them in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use actions::{Action, TriggerEvent};

use crate::condition::Condition;

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Per-rule retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    /// Wait between attempts (base wait when backoff is exponential).
    pub retry_interval_ms: u64,
    #[serde(default)]
    pub exponential_backoff: bool,
}

// ---------------------------------------------------------------------------
// RuleDefinition
// ---------------------------------------------------------------------------

/// A tenant-configured automation rule bound to one card type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub id: Uuid,
    pub name: String,
    pub card_type_id: Uuid,
    pub trigger_event: TriggerEvent,
    pub enabled: bool,
    /// `None` matches every status.
    #[serde(default)]
    pub target_status_id: Option<String>,
    /// `None` or empty matches every field change.
    #[serde(default)]
    pub listen_field_list: Option<BTreeSet<String>>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub retry_config: Option<RetryConfig>,
}

impl RuleDefinition {
    /// Convenience constructor: an enabled rule with no filters, condition
    /// or actions.
    pub fn new(name: impl Into<String>, card_type_id: Uuid, trigger_event: TriggerEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            card_type_id,
            trigger_event,
            enabled: true,
            target_status_id: None,
            listen_field_list: None,
            condition: None,
            actions: Vec::new(),
            retry_config: None,
        }
    }

    /// Whether this rule cares about a change to any of `changed`.
    pub fn listens_to_any(&self, changed: &BTreeSet<String>) -> bool {
        match &self.listen_field_list {
            None => true,
            Some(fields) if fields.is_empty() => true,
            Some(fields) => !fields.is_disjoint(changed),
        }
    }
}

// ---------------------------------------------------------------------------
// Value stream (workflow)
// ---------------------------------------------------------------------------

/// Whether a status represents queued or active work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkType {
    Waiting,
    Working,
}

/// A single workflow status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: String,
    pub name: String,
    pub work_type: WorkType,
    pub sort_order: i32,
}

/// A group of statuses within a value stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    pub sort_order: i32,
    pub statuses: Vec<Status>,
}

/// The value stream of a card type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    pub card_type_id: Uuid,
    pub steps: Vec<Step>,
}
