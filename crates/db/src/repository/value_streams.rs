//! Value stream queries.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::ValueStreamRow, DbError};

/// Fetch the value stream of a card type, if it has one.
pub async fn find_value_stream(
    pool: &PgPool,
    card_type_id: Uuid,
) -> Result<Option<ValueStreamRow>, DbError> {
    let row = sqlx::query_as::<_, ValueStreamRow>(
        r#"SELECT card_type_id, definition, updated_at FROM value_streams WHERE card_type_id = $1"#,
    )
    .bind(card_type_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
