//! Offline scenarios for `card-automation simulate`.
//!
//! A scenario file bundles value streams, rules, cards and a list of events.
//! Events are replayed in order against in-memory collaborators and dry-run
//! action handlers; each event's executions finish before the next event.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use actions::{logging::LoggingHandler, ActionRegistry, CardSnapshot};
use engine::memory::{
    InMemoryCardStore, InMemoryLogStore, InMemoryRuleCache, InMemoryWorkflowSource, RecordingDelay,
};
use engine::{
    validate_workflow, ExecutorConfig, FieldConditionEvaluator, LifecycleEvent, RuleDefinition,
    RuleExecutionResult, RuleExecutor, TriggerMatcher, WorkflowDefinition,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub workflows: Vec<WorkflowDefinition>,
    pub rules: Vec<RuleDefinition>,
    pub cards: Vec<CardSnapshot>,
    pub events: Vec<LifecycleEvent>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read scenario {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid scenario {}", path.display()))
    }
}

/// Outcome of replaying one event.
#[derive(Debug, Serialize)]
pub struct EventReport {
    pub event: usize,
    pub results: Vec<RuleExecutionResult>,
}

/// Replay every event in `scenario`.
///
/// With `wait_between_retries = false` retry delays are recorded but not
/// slept.
pub async fn run(
    scenario: Scenario,
    config: ExecutorConfig,
    wait_between_retries: bool,
) -> Result<Vec<EventReport>> {
    for workflow in &scenario.workflows {
        validate_workflow(workflow)
            .with_context(|| format!("value stream '{}' is invalid", workflow.id))?;
    }

    let logs = Arc::new(InMemoryLogStore::new());
    let mut executor = RuleExecutor::new(
        Arc::new(FieldConditionEvaluator),
        Arc::new(ActionRegistry::with_handler_for_all(Arc::new(LoggingHandler))),
        logs.clone(),
        config,
    );
    if !wait_between_retries {
        executor = executor.with_delay(Arc::new(RecordingDelay::new()));
    }

    let matcher = TriggerMatcher::new(
        Arc::new(InMemoryRuleCache::new(scenario.rules)),
        Arc::new(InMemoryWorkflowSource::new(scenario.workflows)),
        Arc::new(InMemoryCardStore::new(scenario.cards)),
        Arc::new(executor),
    );

    let mut reports = Vec::with_capacity(scenario.events.len());
    for (index, event) in scenario.events.into_iter().enumerate() {
        let dispatch = matcher
            .on_lifecycle_event(event)
            .await
            .with_context(|| format!("event #{index} could not be matched"))?;
        reports.push(EventReport { event: index, results: dispatch.join().await });
    }

    tracing::info!("scenario finished, {} execution log(s) written", logs.logs().len());
    Ok(reports)
}
