//! Card lookups.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::CardRow, DbError};

/// Fetch a single card by its primary key.
pub async fn find_card(pool: &PgPool, id: Uuid) -> Result<Option<CardRow>, DbError> {
    let row = sqlx::query_as::<_, CardRow>(
        r#"SELECT id, card_type_id, status_id, fields FROM cards WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
