//! `db` crate: Postgres persistence for the rule engine.
//!
//! Provides a connection pool, typed row structs, repository functions for
//! every table in the card-automation schema, and adapters that plug those
//! repositories into the engine's collaborator traits.

pub mod adapters;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;

pub use adapters::{PgCardStore, PgLogStore, PgRuleCache, PgWorkflowSource};
pub use error::DbError;
pub use pool::DbPool;
