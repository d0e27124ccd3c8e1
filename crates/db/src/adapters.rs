//! Postgres-backed implementations of the engine's collaborator traits.
//!
//! Conversions between rows and domain types live here so the repository
//! functions stay pure SQL.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use actions::CardSnapshot;
use engine::{
    CardStore, EngineError, LogStore, RuleCache, RuleDefinition, RuleExecutionLog,
    WorkflowDefinition, WorkflowSource,
};

use crate::{
    models::{CardRow, ExecutionLogRow, RuleRow},
    repository::{cards, execution_logs, rules, value_streams},
    DbError, DbPool,
};

fn decode<T: serde::de::DeserializeOwned>(
    column: &'static str,
    value: serde_json::Value,
) -> Result<T, DbError> {
    serde_json::from_value(value).map_err(|source| DbError::Decode { column, source })
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Decode a rule row.  Columns win over the JSON body for the fields the
/// query filters on.
pub fn rule_from_row(row: RuleRow) -> Result<RuleDefinition, DbError> {
    let mut rule: RuleDefinition = decode("automation_rules.definition", row.definition)?;
    rule.id = row.id;
    rule.card_type_id = row.card_type_id;
    rule.enabled = row.enabled;
    Ok(rule)
}

pub fn card_from_row(row: CardRow) -> Result<CardSnapshot, DbError> {
    let fields: HashMap<String, serde_json::Value> = decode("cards.fields", row.fields)?;
    Ok(CardSnapshot {
        id: row.id,
        card_type_id: row.card_type_id,
        status_id: row.status_id,
        fields,
    })
}

pub fn log_to_row(log: &RuleExecutionLog) -> Result<ExecutionLogRow, DbError> {
    let action_results = serde_json::to_value(&log.action_results).map_err(|source| DbError::Decode {
        column: "rule_execution_logs.action_results",
        source,
    })?;

    Ok(ExecutionLogRow {
        id: log.id,
        trace_id: log.trace_id,
        rule_id: log.rule_id,
        card_type_id: log.card_type_id,
        card_id: log.card_id,
        operator_id: log.operator_id,
        trigger_event: log.trigger_event.to_string(),
        status: log.status.to_string(),
        retry_count: i32::try_from(log.retry_count).unwrap_or(i32::MAX),
        action_results,
        started_at: log.started_at,
        finished_at: log.finished_at,
        duration_ms: log.duration_ms(),
    })
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Reads enabled rules straight from `automation_rules` on every call.
#[derive(Debug, Clone)]
pub struct PgRuleCache {
    pool: DbPool,
}

impl PgRuleCache {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleCache for PgRuleCache {
    async fn enabled_rules(&self, card_type_id: Uuid) -> Result<Vec<RuleDefinition>, EngineError> {
        let rows = rules::list_enabled_rules(&self.pool, card_type_id).await?;

        // One malformed rule must not hide the others.
        let mut definitions = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match rule_from_row(row) {
                Ok(rule) => definitions.push(rule),
                Err(e) => warn!("skipping undecodable rule {}: {}", id, e),
            }
        }
        Ok(definitions)
    }
}

#[derive(Debug, Clone)]
pub struct PgWorkflowSource {
    pool: DbPool,
}

impl PgWorkflowSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowSource for PgWorkflowSource {
    async fn workflow_for(
        &self,
        card_type_id: Uuid,
    ) -> Result<Option<WorkflowDefinition>, EngineError> {
        let Some(row) = value_streams::find_value_stream(&self.pool, card_type_id).await? else {
            return Ok(None);
        };
        let workflow: WorkflowDefinition = decode("value_streams.definition", row.definition)?;
        Ok(Some(workflow))
    }
}

#[derive(Debug, Clone)]
pub struct PgCardStore {
    pool: DbPool,
}

impl PgCardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CardStore for PgCardStore {
    async fn find_by_id(&self, card_id: Uuid) -> Result<Option<CardSnapshot>, EngineError> {
        match cards::find_card(&self.pool, card_id).await? {
            Some(row) => Ok(Some(card_from_row(row)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgLogStore {
    pool: DbPool,
}

impl PgLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn save(&self, log: &RuleExecutionLog) -> Result<(), EngineError> {
        let row = log_to_row(log)?;
        execution_logs::insert_execution_log(&self.pool, &row).await?;
        Ok(())
    }
}
