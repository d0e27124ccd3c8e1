//! Rule execution log persistence.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ExecutionLogRow, DbError};

/// Append one execution log row.
pub async fn insert_execution_log(pool: &PgPool, row: &ExecutionLogRow) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO rule_execution_logs
            (id, trace_id, rule_id, card_type_id, card_id, operator_id, trigger_event,
             status, retry_count, action_results, started_at, finished_at, duration_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(row.id)
    .bind(row.trace_id)
    .bind(row.rule_id)
    .bind(row.card_type_id)
    .bind(row.card_id)
    .bind(row.operator_id)
    .bind(&row.trigger_event)
    .bind(&row.status)
    .bind(row.retry_count)
    .bind(&row.action_results)
    .bind(row.started_at)
    .bind(row.finished_at)
    .bind(row.duration_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent executions of a rule, newest first.
pub async fn list_rule_executions(
    pool: &PgPool,
    rule_id: Uuid,
    limit: i64,
) -> Result<Vec<ExecutionLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionLogRow>(
        r#"
        SELECT id, trace_id, rule_id, card_type_id, card_id, operator_id, trigger_event,
               status, retry_count, action_results, started_at, finished_at, duration_ms
        FROM rule_execution_logs
        WHERE rule_id = $1
        ORDER BY started_at DESC
        LIMIT $2
        "#,
    )
    .bind(rule_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
