//! Per-invocation context handed to every action.
//!
//! Defined here (in the actions crate) so both the engine and individual
//! handlers can import it without a circular dependency.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TriggerEvent
// ---------------------------------------------------------------------------

/// The lifecycle transition a rule listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerEvent {
    OnCreate,
    OnDiscard,
    OnArchive,
    OnRestore,
    OnStatusMove,
    OnStatusRollback,
    OnFieldChange,
    OnSchedule,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnCreate => write!(f, "ON_CREATE"),
            Self::OnDiscard => write!(f, "ON_DISCARD"),
            Self::OnArchive => write!(f, "ON_ARCHIVE"),
            Self::OnRestore => write!(f, "ON_RESTORE"),
            Self::OnStatusMove => write!(f, "ON_STATUS_MOVE"),
            Self::OnStatusRollback => write!(f, "ON_STATUS_ROLLBACK"),
            Self::OnFieldChange => write!(f, "ON_FIELD_CHANGE"),
            Self::OnSchedule => write!(f, "ON_SCHEDULE"),
        }
    }
}

// ---------------------------------------------------------------------------
// CardSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of a card at the moment its event was consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub id: Uuid,
    pub card_type_id: Uuid,
    /// Current workflow status, if the card type has a value stream.
    #[serde(default)]
    pub status_id: Option<String>,
    /// Field id → current value.
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl CardSnapshot {
    pub fn new(id: Uuid, card_type_id: Uuid) -> Self {
        Self { id, card_type_id, status_id: None, fields: HashMap::new() }
    }

    pub fn with_status(mut self, status_id: impl Into<String>) -> Self {
        self.status_id = Some(status_id.into());
        self
    }

    pub fn with_field(mut self, field_id: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field_id.into(), value);
        self
    }

    pub fn field(&self, field_id: &str) -> Option<&Value> {
        self.fields.get(field_id)
    }
}

// ---------------------------------------------------------------------------
// RuleExecutionContext
// ---------------------------------------------------------------------------

/// Everything an action may need about the trigger.
///
/// Built once per lifecycle event and shared, unchanged, by every matched
/// rule and every retry attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExecutionContext {
    /// Correlates all rule executions caused by one lifecycle event.
    pub trace_id: Uuid,
    pub card: CardSnapshot,
    pub operator_id: Uuid,
    pub trigger_event: TriggerEvent,
    /// Populated for `ON_FIELD_CHANGE` only.
    #[serde(default)]
    pub changed_field_ids: BTreeSet<String>,
    /// Populated for status moves and rollbacks.
    #[serde(default)]
    pub from_status_id: Option<String>,
    #[serde(default)]
    pub to_status_id: Option<String>,
}

impl RuleExecutionContext {
    pub fn new(card: CardSnapshot, operator_id: Uuid, trigger_event: TriggerEvent) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            card,
            operator_id,
            trigger_event,
            changed_field_ids: BTreeSet::new(),
            from_status_id: None,
            to_status_id: None,
        }
    }
}
