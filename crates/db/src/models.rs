//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models: they carry no domain behaviour.
//! Domain types live in the `engine` and `actions` crates; the adapters
//! convert between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// automation_rules
// ---------------------------------------------------------------------------

/// A persisted rule definition row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RuleRow {
    pub id: Uuid,
    pub card_type_id: Uuid,
    pub enabled: bool,
    /// Full JSON rule definition.
    pub definition: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// value_streams
// ---------------------------------------------------------------------------

/// A persisted value stream row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ValueStreamRow {
    pub card_type_id: Uuid,
    /// Full JSON value stream (steps and statuses).
    pub definition: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// cards
// ---------------------------------------------------------------------------

/// A persisted card row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CardRow {
    pub id: Uuid,
    pub card_type_id: Uuid,
    pub status_id: Option<String>,
    /// Field id → value object.
    pub fields: serde_json::Value,
}

// ---------------------------------------------------------------------------
// rule_execution_logs
// ---------------------------------------------------------------------------

/// A persisted rule execution log row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionLogRow {
    pub id: Uuid,
    pub trace_id: Uuid,
    pub rule_id: Uuid,
    pub card_type_id: Uuid,
    pub card_id: Uuid,
    pub operator_id: Uuid,
    /// `ON_CREATE`, `ON_STATUS_MOVE`, …
    pub trigger_event: String,
    /// `SUCCESS`, `PARTIAL_SUCCESS` or `FAILED`.
    pub status: String,
    pub retry_count: i32,
    pub action_results: serde_json::Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}
