//! The closed set of actions a rule can run.
//!
//! Actions are stored inside rule definitions as JSON and deserialised into
//! [`Action`].  Dispatch goes through [`ActionKind`] so every kind needs an
//! entry in the registry rather than a method on the action itself.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CardTarget
// ---------------------------------------------------------------------------

/// Which card an action operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardTarget {
    /// The card whose lifecycle event triggered the rule.
    #[default]
    TriggerCard,
    /// A specific card by id.
    Card { id: Uuid },
    /// Every card linked to the trigger card through the given link type.
    LinkedCards { link_type_id: String },
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A single configured step in a rule's action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Overwrite field values on the target card(s).
    UpdateCard {
        #[serde(default)]
        target: CardTarget,
        fields: HashMap<String, Value>,
    },
    /// Move the target card(s) to another workflow status.
    MoveCard {
        #[serde(default)]
        target: CardTarget,
        status_id: String,
    },
    /// Create a new card of the given type.
    CreateCard {
        card_type_id: Uuid,
        title: String,
        #[serde(default)]
        fields: HashMap<String, Value>,
        /// Link the new card back to the trigger card with this link type.
        #[serde(default)]
        link_type_id: Option<String>,
    },
    /// Archive the target card(s).
    ArchiveCard {
        #[serde(default)]
        target: CardTarget,
    },
    /// Append a comment to the target card(s).
    AddComment {
        #[serde(default)]
        target: CardTarget,
        content: String,
    },
    /// Notify users.  Receivers are user ids or field ids holding user ids.
    SendNotification {
        receivers: Vec<String>,
        title: String,
        content: String,
    },
    /// Call an external HTTP endpoint.
    CallWebhook {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        body: Option<Value>,
    },
}

fn default_method() -> String {
    "POST".to_string()
}

impl Action {
    /// The registry key this action dispatches on.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::UpdateCard { .. } => ActionKind::UpdateCard,
            Self::MoveCard { .. } => ActionKind::MoveCard,
            Self::CreateCard { .. } => ActionKind::CreateCard,
            Self::ArchiveCard { .. } => ActionKind::ArchiveCard,
            Self::AddComment { .. } => ActionKind::AddComment,
            Self::SendNotification { .. } => ActionKind::SendNotification,
            Self::CallWebhook { .. } => ActionKind::CallWebhook,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// Tag of an [`Action`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    UpdateCard,
    MoveCard,
    CreateCard,
    ArchiveCard,
    AddComment,
    SendNotification,
    CallWebhook,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::UpdateCard,
        ActionKind::MoveCard,
        ActionKind::CreateCard,
        ActionKind::ArchiveCard,
        ActionKind::AddComment,
        ActionKind::SendNotification,
        ActionKind::CallWebhook,
    ];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateCard => write!(f, "update_card"),
            Self::MoveCard => write!(f, "move_card"),
            Self::CreateCard => write!(f, "create_card"),
            Self::ArchiveCard => write!(f, "archive_card"),
            Self::AddComment => write!(f, "add_comment"),
            Self::SendNotification => write!(f, "send_notification"),
            Self::CallWebhook => write!(f, "call_webhook"),
        }
    }
}
