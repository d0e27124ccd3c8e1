//! Rule definition queries.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::RuleRow, DbError};

/// Insert or replace a rule definition.
///
/// `definition` must be a JSON object produced by serialising the engine's
/// `RuleDefinition`.
pub async fn upsert_rule(
    pool: &PgPool,
    id: Uuid,
    card_type_id: Uuid,
    enabled: bool,
    definition: serde_json::Value,
) -> Result<RuleRow, DbError> {
    let row = sqlx::query_as::<_, RuleRow>(
        r#"
        INSERT INTO automation_rules (id, card_type_id, enabled, definition, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
            SET card_type_id = EXCLUDED.card_type_id,
                enabled      = EXCLUDED.enabled,
                definition   = EXCLUDED.definition,
                updated_at   = EXCLUDED.updated_at
        RETURNING id, card_type_id, enabled, definition, updated_at
        "#,
    )
    .bind(id)
    .bind(card_type_id)
    .bind(enabled)
    .bind(definition)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// All enabled rules for a card type, oldest update first.
pub async fn list_enabled_rules(pool: &PgPool, card_type_id: Uuid) -> Result<Vec<RuleRow>, DbError> {
    let rows = sqlx::query_as::<_, RuleRow>(
        r#"
        SELECT id, card_type_id, enabled, definition, updated_at
        FROM automation_rules
        WHERE card_type_id = $1 AND enabled
        ORDER BY updated_at ASC
        "#,
    )
    .bind(card_type_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
