//! Rule execution engine.
//!
//! `RuleExecutor` runs a single matched rule:
//! 1. Skips disabled rules and rules whose condition does not hold.
//! 2. Runs the rule's actions in order through the `ActionExecutor`.
//! 3. Aggregates each attempt into SUCCESS / PARTIAL_SUCCESS / FAILED.
//! 4. Retries non-successful attempts per the rule's `RetryConfig`.
//! 5. Persists the final outcome through the `LogStore` (best effort).
//!
//! `execute` never fails; every terminal state is a `RuleExecutionResult`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use actions::{ActionError, ActionExecutionResult, ActionExecutor, RuleExecutionContext};

use crate::condition::ConditionEvaluator;
use crate::models::{RetryConfig, RuleDefinition};
use crate::ports::{Delay, LogStore, TokioDelay};
use crate::result::{ExecutionStatus, RuleExecutionLog, RuleExecutionResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for exponential backoff.
///
/// Rules with `exponentialBackoff = false` wait exactly `retryIntervalMs`
/// between attempts and ignore these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Growth factor applied per attempt.
    pub backoff_multiplier: u32,
    /// Upper bound on a single backoff wait.  Never lowers a rule's own
    /// `retryIntervalMs`.
    pub max_backoff_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            backoff_multiplier: 2,
            max_backoff_ms: 300_000,
        }
    }
}

impl ExecutorConfig {
    /// Wait before the attempt following `attempt` (0-based).
    ///
    /// Exponential: `min(interval * multiplier^attempt, max(cap, interval))`.
    pub fn retry_delay(&self, retry: &RetryConfig, attempt: u32) -> Duration {
        let interval = retry.retry_interval_ms;
        if !retry.exponential_backoff {
            return Duration::from_millis(interval);
        }

        let factor = u64::from(self.backoff_multiplier.max(1)).saturating_pow(attempt);
        let cap = self.max_backoff_ms.max(interval);
        Duration::from_millis(interval.saturating_mul(factor).min(cap))
    }
}

// ---------------------------------------------------------------------------
// Attempt outcome
// ---------------------------------------------------------------------------

struct Attempt {
    status: ExecutionStatus,
    results: Vec<ActionExecutionResult>,
}

// ---------------------------------------------------------------------------
// RuleExecutor
// ---------------------------------------------------------------------------

/// Stateless runner for one rule against one trigger context.
///
/// Holds no per-execution state, so one instance serves every concurrent
/// execution in the process.
pub struct RuleExecutor {
    conditions: Arc<dyn ConditionEvaluator>,
    actions: Arc<dyn ActionExecutor>,
    logs: Arc<dyn LogStore>,
    delay: Arc<dyn Delay>,
    config: ExecutorConfig,
}

impl RuleExecutor {
    /// Create a new executor that sleeps on the tokio timer between retries.
    pub fn new(
        conditions: Arc<dyn ConditionEvaluator>,
        actions: Arc<dyn ActionExecutor>,
        logs: Arc<dyn LogStore>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            conditions,
            actions,
            logs,
            delay: Arc::new(TokioDelay),
            config,
        }
    }

    /// Replace the inter-attempt delay.
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Run `rule` against `ctx` to a terminal outcome.
    #[instrument(
        skip(self, rule, ctx),
        fields(rule_id = %rule.id, card_id = %ctx.card.id, trace_id = %ctx.trace_id)
    )]
    pub async fn execute(&self, rule: &RuleDefinition, ctx: &RuleExecutionContext) -> RuleExecutionResult {
        // ------------------------------------------------------------------
        // Gate and precondition.
        // ------------------------------------------------------------------
        if !rule.enabled {
            debug!("rule '{}' is disabled, skipping", rule.name);
            return RuleExecutionResult::skipped(rule.id);
        }

        if let Some(condition) = &rule.condition {
            if !self.conditions.evaluate(condition, &ctx.card) {
                debug!("rule '{}' condition not met, skipping", rule.name);
                return RuleExecutionResult::skipped(rule.id);
            }
        }

        // ------------------------------------------------------------------
        // Attempt loop.
        // ------------------------------------------------------------------
        let started_at = Utc::now();
        let max_retries = rule.retry_config.map_or(0, |r| r.max_retries);
        let mut attempt = 0u32;

        let last = loop {
            let outcome = self.run_attempt(rule, ctx).await;

            if outcome.status == ExecutionStatus::Success || attempt >= max_retries {
                break outcome;
            }

            let delay = rule
                .retry_config
                .map(|retry| self.config.retry_delay(&retry, attempt))
                .unwrap_or_default();

            warn!(
                "rule '{}' attempt {}/{} ended {}, retrying in {:?}",
                rule.name,
                attempt + 1,
                max_retries + 1,
                outcome.status,
                delay
            );

            self.delay.wait(delay).await;
            attempt += 1;
        };

        let result = RuleExecutionResult {
            rule_id: rule.id,
            status: last.status,
            action_results: last.results,
            retry_count: attempt,
        };

        info!(
            "rule '{}' finished {} after {} retr{}",
            rule.name,
            result.status,
            result.retry_count,
            if result.retry_count == 1 { "y" } else { "ies" }
        );

        // ------------------------------------------------------------------
        // Persist the outcome; a failure here never changes the result.
        // ------------------------------------------------------------------
        let log = RuleExecutionLog {
            id: Uuid::new_v4(),
            trace_id: ctx.trace_id,
            rule_id: rule.id,
            card_type_id: ctx.card.card_type_id,
            card_id: ctx.card.id,
            operator_id: ctx.operator_id,
            trigger_event: ctx.trigger_event,
            status: result.status,
            retry_count: result.retry_count,
            action_results: result.action_results.clone(),
            started_at,
            finished_at: Utc::now(),
        };

        if let Err(e) = self.logs.save(&log).await {
            error!("failed to persist execution log for rule '{}': {}", rule.name, e);
        }

        result
    }

    // -----------------------------------------------------------------------
    // Internal: one pass through the action list.
    // -----------------------------------------------------------------------

    async fn run_attempt(&self, rule: &RuleDefinition, ctx: &RuleExecutionContext) -> Attempt {
        let mut results = Vec::with_capacity(rule.actions.len());

        for (index, action) in rule.actions.iter().enumerate() {
            let outcome = AssertUnwindSafe(self.actions.execute_action(index, action, ctx))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(ActionError::Unexpected(panic_message(&*panic))));

            match outcome {
                Ok(result) => {
                    if let Some(msg) = &result.error_message {
                        warn!("action #{} ({}) failed: {}", index, result.action_type, msg);
                    }
                    results.push(result);
                }

                Err(ActionError::Failed(msg)) => {
                    warn!("action #{} ({}) failed: {}", index, action.kind(), msg);
                    results.push(ActionExecutionResult::failed(action.kind(), index, msg));
                }

                Err(ActionError::Unexpected(msg)) => {
                    error!(
                        "executor broke on action #{} ({}), abandoning attempt: {}",
                        index,
                        action.kind(),
                        msg
                    );
                    return Attempt {
                        status: ExecutionStatus::Failed,
                        results: Vec::new(),
                    };
                }
            }
        }

        Attempt {
            status: ExecutionStatus::aggregate(&results),
            results,
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string payload".to_string());
    format!("action handler panicked: {detail}")
}
