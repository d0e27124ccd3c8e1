//! Inbound card lifecycle events.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use actions::CardSnapshot;

/// Who produced an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventOrigin {
    /// A user acting through the UI or API.
    User,
    /// An integration or background job.
    System,
    /// A side effect of a rule's action.  Never matched again.
    RuleExecution { rule_id: Uuid },
}

impl EventOrigin {
    pub fn is_rule_execution(&self) -> bool {
        matches!(self, Self::RuleExecution { .. })
    }
}

/// What happened to the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Created,
    Discarded {
        #[serde(default)]
        reason: Option<String>,
    },
    Archived,
    Restored,
    StatusMoved {
        from_status_id: String,
        to_status_id: String,
    },
    FieldsChanged {
        field_ids: BTreeSet<String>,
    },
    /// Fired by an external scheduler for `ON_SCHEDULE` rules.
    Scheduled,
}

/// A lifecycle event as delivered by the transport.
///
/// `card` may be omitted, in which case the matcher loads it by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub card_id: Uuid,
    pub card_type_id: Uuid,
    pub operator_id: Uuid,
    pub origin: EventOrigin,
    pub kind: LifecycleEventKind,
    #[serde(default)]
    pub card: Option<CardSnapshot>,
}

impl LifecycleEvent {
    /// A user-originated event carrying a pre-loaded snapshot.
    pub fn for_card(card: CardSnapshot, operator_id: Uuid, kind: LifecycleEventKind) -> Self {
        Self {
            card_id: card.id,
            card_type_id: card.card_type_id,
            operator_id,
            origin: EventOrigin::User,
            kind,
            card: Some(card),
        }
    }

    pub fn with_origin(mut self, origin: EventOrigin) -> Self {
        self.origin = origin;
        self
    }
}
