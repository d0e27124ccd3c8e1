//! Tests for the rule execution engine.
//!
//! Actions run through `MockHandler`s registered in a real `ActionRegistry`;
//! logs go to `InMemoryLogStore` and retry waits to `RecordingDelay`, so no
//! test ever sleeps.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use actions::mock::{MockBehaviour, MockHandler};
use actions::{Action, ActionKind, ActionRegistry, CardSnapshot, CardTarget, RuleExecutionContext, TriggerEvent};

use crate::condition::{Condition, FieldConditionEvaluator};
use crate::executor::{ExecutorConfig, RuleExecutor};
use crate::memory::{InMemoryLogStore, RecordingDelay};
use crate::models::{RetryConfig, RuleDefinition};
use crate::result::ExecutionStatus;

struct Harness {
    executor: RuleExecutor,
    logs: Arc<InMemoryLogStore>,
    delay: Arc<RecordingDelay>,
}

fn harness_with(registry: ActionRegistry, logs: InMemoryLogStore, config: ExecutorConfig) -> Harness {
    let logs = Arc::new(logs);
    let delay = Arc::new(RecordingDelay::new());
    let executor = RuleExecutor::new(
        Arc::new(FieldConditionEvaluator),
        Arc::new(registry),
        logs.clone(),
        config,
    )
    .with_delay(delay.clone());
    Harness { executor, logs, delay }
}

fn harness(registry: ActionRegistry) -> Harness {
    harness_with(registry, InMemoryLogStore::new(), ExecutorConfig::default())
}

fn all_kinds(handler: &Arc<MockHandler>) -> ActionRegistry {
    ActionRegistry::with_handler_for_all(handler.clone())
}

fn ctx() -> RuleExecutionContext {
    let card = CardSnapshot::new(Uuid::new_v4(), Uuid::new_v4())
        .with_status("doing")
        .with_field("priority", json!("high"));
    RuleExecutionContext::new(card, Uuid::new_v4(), TriggerEvent::OnCreate)
}

fn update() -> Action {
    Action::UpdateCard { target: CardTarget::TriggerCard, fields: [("owner".to_string(), json!("ops"))].into() }
}

fn comment() -> Action {
    Action::AddComment { target: CardTarget::TriggerCard, content: "automated".into() }
}

fn rule(actions: Vec<Action>) -> RuleDefinition {
    let mut rule = RuleDefinition::new("test-rule", Uuid::new_v4(), TriggerEvent::OnCreate);
    rule.actions = actions;
    rule
}

fn retrying(actions: Vec<Action>, max_retries: u32, interval_ms: u64) -> RuleDefinition {
    let mut rule = rule(actions);
    rule.retry_config = Some(RetryConfig {
        max_retries,
        retry_interval_ms: interval_ms,
        exponential_backoff: false,
    });
    rule
}

// ============================================================
// Gate and condition
// ============================================================

#[tokio::test]
async fn disabled_rule_is_skipped_without_running_or_logging() {
    let handler = Arc::new(MockHandler::succeeding());
    let h = harness(all_kinds(&handler));
    let mut rule = rule(vec![update()]);
    rule.enabled = false;

    let result = h.executor.execute(&rule, &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Skipped);
    assert!(result.action_results.is_empty());
    assert_eq!(handler.call_count(), 0);
    assert_eq!(h.logs.save_calls(), 0);
}

#[tokio::test]
async fn unmet_condition_is_skipped_without_logging() {
    let handler = Arc::new(MockHandler::succeeding());
    let h = harness(all_kinds(&handler));
    let mut rule = rule(vec![update()]);
    rule.condition = Some(Condition::FieldEquals { field_id: "priority".into(), value: json!("low") });

    let result = h.executor.execute(&rule, &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Skipped);
    assert_eq!(handler.call_count(), 0);
    assert_eq!(h.logs.save_calls(), 0);
}

#[tokio::test]
async fn met_condition_runs_actions() {
    let handler = Arc::new(MockHandler::succeeding());
    let h = harness(all_kinds(&handler));
    let mut rule = rule(vec![update()]);
    rule.condition = Some(Condition::StatusIs { status_id: "doing".into() });

    let result = h.executor.execute(&rule, &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(handler.call_count(), 1);
}

#[tokio::test]
async fn rule_without_actions_succeeds_and_is_logged() {
    let h = harness(ActionRegistry::new());
    let rule = rule(vec![]);

    let result = h.executor.execute(&rule, &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert!(result.action_results.is_empty());
    assert_eq!(result.retry_count, 0);
    assert_eq!(h.logs.logs().len(), 1);
}

// ============================================================
// Aggregation
// ============================================================

#[tokio::test]
async fn all_actions_succeeding_is_success() {
    let handler = Arc::new(MockHandler::succeeding());
    let h = harness(all_kinds(&handler));
    let context = ctx();

    let result = h.executor.execute(&rule(vec![update(), comment()]), &context).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.action_results.len(), 2);
    assert_eq!(result.action_results[1].index, 1);
    assert_eq!(result.action_results[1].action_type, ActionKind::AddComment);
    assert_eq!(result.action_results[0].affected_entity_ids, vec![context.card.id]);
}

#[tokio::test]
async fn all_actions_failing_is_failed() {
    let handler = Arc::new(MockHandler::failing("nope"));
    let h = harness(all_kinds(&handler));

    let result = h.executor.execute(&rule(vec![update(), comment()]), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.action_results.len(), 2);
    assert!(result.action_results.iter().all(|r| r.error_message.as_deref() == Some("nope")));
}

#[tokio::test]
async fn failed_action_does_not_stop_siblings() {
    let failing = Arc::new(MockHandler::failing("locked"));
    let succeeding = Arc::new(MockHandler::succeeding());
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionKind::UpdateCard, failing.clone())
        .register(ActionKind::AddComment, succeeding.clone());
    let h = harness(registry);

    let result = h.executor.execute(&rule(vec![update(), comment()]), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::PartialSuccess);
    assert!(!result.action_results[0].success);
    assert!(result.action_results[1].success);
    assert_eq!(succeeding.call_count(), 1);
}

#[tokio::test]
async fn unexpected_executor_error_fails_the_attempt_and_drops_its_results() {
    let broken = Arc::new(MockHandler::unexpected("connection reset"));
    let succeeding = Arc::new(MockHandler::succeeding());
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionKind::AddComment, succeeding.clone())
        .register(ActionKind::UpdateCard, broken.clone());
    let h = harness(registry);

    // comment succeeds, update breaks the executor, the trailing comment never runs
    let result = h.executor.execute(&rule(vec![comment(), update(), comment()]), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result.action_results.is_empty());
    assert_eq!(succeeding.call_count(), 1);
    assert_eq!(h.logs.logs()[0].status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn panicking_handler_fails_the_attempt_and_is_retried() {
    let handler = Arc::new(MockHandler::panicking("plugin bug"));
    let h = harness(all_kinds(&handler));

    let result = h.executor.execute(&retrying(vec![update()], 2, 50), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.retry_count, 2);
    assert!(result.action_results.is_empty());
    assert_eq!(handler.call_count(), 3);

    let logs = h.logs.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, ExecutionStatus::Failed);
}

#[tokio::test]
async fn panicking_handler_does_not_escape_a_spawned_execution() {
    let handler = Arc::new(MockHandler::panicking("plugin bug"));
    let h = Arc::new(harness(all_kinds(&handler)));

    let task = {
        let h = h.clone();
        tokio::spawn(async move { h.executor.execute(&rule(vec![update()]), &ctx()).await })
    };

    let result = task.await.expect("execution task must not panic");
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(h.logs.save_calls(), 1);
}

// ============================================================
// Retry policy
// ============================================================

#[tokio::test]
async fn no_retry_config_means_a_single_attempt() {
    let handler = Arc::new(MockHandler::failing("down"));
    let h = harness(all_kinds(&handler));

    let result = h.executor.execute(&rule(vec![update()]), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.retry_count, 0);
    assert_eq!(handler.call_count(), 1);
    assert!(h.delay.waits().is_empty());
}

#[tokio::test]
async fn zero_max_retries_means_a_single_attempt() {
    let handler = Arc::new(MockHandler::failing("down"));
    let h = harness(all_kinds(&handler));

    let result = h.executor.execute(&retrying(vec![update()], 0, 500), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.retry_count, 0);
    assert_eq!(handler.call_count(), 1);
    assert!(h.delay.waits().is_empty());
}

#[tokio::test]
async fn success_on_second_attempt_stops_retrying() {
    let handler = Arc::new(MockHandler::scripted(vec![
        MockBehaviour::Fail("transient".into()),
        MockBehaviour::Succeed,
    ]));
    let h = harness(all_kinds(&handler));

    let result = h.executor.execute(&retrying(vec![update()], 3, 250), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.retry_count, 1);
    assert_eq!(handler.call_count(), 2);
    assert_eq!(h.delay.waits(), vec![Duration::from_millis(250)]);
}

#[tokio::test]
async fn exhausted_retries_report_last_failure() {
    let handler = Arc::new(MockHandler::failing("still down"));
    let h = harness(all_kinds(&handler));

    let result = h.executor.execute(&retrying(vec![update()], 3, 100), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.retry_count, 3);
    assert_eq!(handler.call_count(), 4);
    assert_eq!(h.delay.waits(), vec![Duration::from_millis(100); 3]);

    let logs = h.logs.logs();
    assert_eq!(logs.len(), 1, "one log per execution, not per attempt");
    assert_eq!(logs[0].retry_count, 3);
}

#[tokio::test]
async fn partial_success_is_retried_like_failure() {
    let flaky = Arc::new(MockHandler::scripted(vec![
        MockBehaviour::Fail("transient".into()),
        MockBehaviour::Succeed,
    ]));
    let stable = Arc::new(MockHandler::succeeding());
    let mut registry = ActionRegistry::new();
    registry
        .register(ActionKind::UpdateCard, stable.clone())
        .register(ActionKind::AddComment, flaky.clone());
    let h = harness(registry);

    let result = h.executor.execute(&retrying(vec![update(), comment()], 2, 10), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.retry_count, 1);
    // every action reruns on retry
    assert_eq!(stable.call_count(), 2);
    assert_eq!(flaky.call_count(), 2);
}

#[tokio::test]
async fn exponential_backoff_grows_per_attempt() {
    let handler = Arc::new(MockHandler::failing("down"));
    let h = harness(all_kinds(&handler));
    let mut rule = retrying(vec![update()], 4, 100);
    if let Some(retry) = rule.retry_config.as_mut() {
        retry.exponential_backoff = true;
    }

    let result = h.executor.execute(&rule, &ctx()).await;

    assert_eq!(result.retry_count, 4);
    assert_eq!(
        h.delay.waits(),
        [100, 200, 400, 800].map(Duration::from_millis).to_vec()
    );
}

#[test]
fn backoff_is_capped_but_never_below_the_interval() {
    let config = ExecutorConfig { backoff_multiplier: 2, max_backoff_ms: 1_000 };
    let retry = RetryConfig { max_retries: 10, retry_interval_ms: 300, exponential_backoff: true };

    let waits: Vec<u64> = (0..5).map(|a| config.retry_delay(&retry, a).as_millis() as u64).collect();
    assert_eq!(waits, vec![300, 600, 1_000, 1_000, 1_000]);

    let slow = RetryConfig { retry_interval_ms: 5_000, ..retry };
    assert_eq!(config.retry_delay(&slow, 3), Duration::from_millis(5_000));

    let linear = RetryConfig { exponential_backoff: false, ..retry };
    assert_eq!(config.retry_delay(&linear, 7), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn default_delay_waits_on_the_tokio_timer() {
    let handler = Arc::new(MockHandler::failing("down"));
    let executor = RuleExecutor::new(
        Arc::new(FieldConditionEvaluator),
        Arc::new(all_kinds(&handler)),
        Arc::new(InMemoryLogStore::new()),
        ExecutorConfig::default(),
    );

    let started = tokio::time::Instant::now();
    let result = executor.execute(&retrying(vec![update()], 2, 1_000), &ctx()).await;

    assert_eq!(result.retry_count, 2);
    assert!(started.elapsed() >= Duration::from_millis(2_000));
}

// ============================================================
// Logging
// ============================================================

#[tokio::test]
async fn log_failure_does_not_change_the_result() {
    let handler = Arc::new(MockHandler::succeeding());
    let h = harness_with(all_kinds(&handler), InMemoryLogStore::failing(), ExecutorConfig::default());

    let result = h.executor.execute(&rule(vec![update()]), &ctx()).await;

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(h.logs.save_calls(), 1);
    assert!(h.logs.logs().is_empty());
}

#[tokio::test]
async fn log_captures_rule_context_and_outcome() {
    let handler = Arc::new(MockHandler::succeeding());
    let h = harness(all_kinds(&handler));
    let context = ctx();
    let rule = rule(vec![update()]);

    let result = h.executor.execute(&rule, &context).await;

    let log = &h.logs.logs()[0];
    assert_eq!(log.rule_id, rule.id);
    assert_eq!(log.card_id, context.card.id);
    assert_eq!(log.trace_id, context.trace_id);
    assert_eq!(log.operator_id, context.operator_id);
    assert_eq!(log.trigger_event, TriggerEvent::OnCreate);
    assert_eq!(log.status, result.status);
    assert_eq!(log.action_results, result.action_results);
    assert!(log.finished_at >= log.started_at);
}
