//! Rule execution outcomes and the log record persisted for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use actions::{ActionExecutionResult, TriggerEvent};

// ---------------------------------------------------------------------------
// ExecutionStatus
// ---------------------------------------------------------------------------

/// Aggregate outcome of a rule execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Success,
    PartialSuccess,
    Failed,
    Skipped,
}

impl ExecutionStatus {
    /// Aggregate one attempt's per-action results.
    ///
    /// No actions counts as success.
    pub fn aggregate(results: &[ActionExecutionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        match succeeded {
            n if n == results.len() => Self::Success,
            0 => Self::Failed,
            _ => Self::PartialSuccess,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success        => write!(f, "SUCCESS"),
            Self::PartialSuccess => write!(f, "PARTIAL_SUCCESS"),
            Self::Failed         => write!(f, "FAILED"),
            Self::Skipped        => write!(f, "SKIPPED"),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleExecutionResult
// ---------------------------------------------------------------------------

/// What one `execute` call returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecutionResult {
    pub rule_id: Uuid,
    pub status: ExecutionStatus,
    /// Results of the final attempt only.  Empty when skipped.
    pub action_results: Vec<ActionExecutionResult>,
    /// Attempts beyond the first.
    pub retry_count: u32,
}

impl RuleExecutionResult {
    pub fn skipped(rule_id: Uuid) -> Self {
        Self {
            rule_id,
            status: ExecutionStatus::Skipped,
            action_results: Vec::new(),
            retry_count: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// RuleExecutionLog
// ---------------------------------------------------------------------------

/// Append-only record of a non-skipped execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecutionLog {
    pub id: Uuid,
    pub trace_id: Uuid,
    pub rule_id: Uuid,
    pub card_type_id: Uuid,
    pub card_id: Uuid,
    pub operator_id: Uuid,
    pub trigger_event: TriggerEvent,
    pub status: ExecutionStatus,
    pub retry_count: u32,
    pub action_results: Vec<ActionExecutionResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RuleExecutionLog {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
