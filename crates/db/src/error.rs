//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSONB column did not match the domain type it stores.
    #[error("cannot decode {column}: {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<DbError> for engine::EngineError {
    fn from(err: DbError) -> Self {
        engine::EngineError::Collaborator(err.into())
    }
}
