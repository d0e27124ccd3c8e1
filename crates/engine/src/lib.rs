//! `engine` crate: rule and value-stream models, status path resolution,
//! trigger matching and the retry-aware rule execution engine.

pub mod condition;
pub mod error;
pub mod event;
pub mod executor;
pub mod matcher;
pub mod memory;
pub mod models;
pub mod ports;
pub mod result;
pub mod workflow;

pub use condition::{Condition, ConditionEvaluator, FieldConditionEvaluator};
pub use error::EngineError;
pub use event::{EventOrigin, LifecycleEvent, LifecycleEventKind};
pub use executor::{ExecutorConfig, RuleExecutor};
pub use matcher::{Dispatch, MatchedRules, TriggerMatcher};
pub use models::{RetryConfig, RuleDefinition, Status, Step, WorkType, WorkflowDefinition};
pub use ports::{CardStore, Delay, LogStore, RuleCache, TokioDelay, WorkflowSource};
pub use result::{ExecutionStatus, RuleExecutionLog, RuleExecutionResult};
pub use workflow::{is_rollback, linear_order, resolve_path, validate_workflow};

#[cfg(test)]
mod executor_tests;
