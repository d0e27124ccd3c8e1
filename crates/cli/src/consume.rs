//! `card-automation consume`: JSON-lines lifecycle events from stdin.
//!
//! Each line is matched as soon as it is read. Rule executions run in the
//! background and finished events are reaped while reading continues, so a
//! long-lived consumer only holds what is still executing.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use actions::{logging::LoggingHandler, ActionRegistry};
use engine::{
    ExecutorConfig, FieldConditionEvaluator, LifecycleEvent, RuleExecutionResult, RuleExecutor,
    TriggerMatcher,
};

/// Counters reported once the input is exhausted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeStats {
    pub events: usize,
    pub executions: usize,
    /// Most events with executions in flight at once.
    pub peak_in_flight: usize,
}

/// Consume stdin against a matcher wired to Postgres, with dry-run actions.
pub async fn run(database_url: &str, max_connections: u32, config: ExecutorConfig) -> Result<()> {
    let pool = db::pool::create_pool(database_url, max_connections)
        .await
        .context("failed to connect to database")?;

    let executor = RuleExecutor::new(
        Arc::new(FieldConditionEvaluator),
        Arc::new(ActionRegistry::with_handler_for_all(Arc::new(LoggingHandler))),
        Arc::new(db::PgLogStore::new(pool.clone())),
        config,
    );
    let matcher = TriggerMatcher::new(
        Arc::new(db::PgRuleCache::new(pool.clone())),
        Arc::new(db::PgWorkflowSource::new(pool.clone())),
        Arc::new(db::PgCardStore::new(pool)),
        Arc::new(executor),
    );

    let (tx, rx) = mpsc::channel::<String>(64);
    let reader = tokio::task::spawn_blocking(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    let stats = drain(&matcher, rx).await;
    reader.await.context("stdin reader panicked")?;

    info!(
        "stdin closed, {} event(s) consumed, {} rule execution(s) finished",
        stats.events, stats.executions
    );
    Ok(())
}

/// Match every line received on `lines` until the channel closes, then wait
/// for the executions still running.
pub async fn drain(matcher: &TriggerMatcher, mut lines: mpsc::Receiver<String>) -> ConsumeStats {
    let mut stats = ConsumeStats::default();
    let mut pending = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let event: LifecycleEvent = match serde_json::from_str(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("skipping malformed event: {}", e);
                        continue;
                    }
                };
                stats.events += 1;

                match matcher.on_lifecycle_event(event).await {
                    Ok(dispatch) if !dispatch.is_empty() => {
                        pending.spawn(dispatch.join());
                        stats.peak_in_flight = stats.peak_in_flight.max(pending.len());
                    }
                    Ok(_) => {}
                    Err(e) => warn!("event could not be matched: {}", e),
                }
            }
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                stats.executions += reap(joined);
            }
        }
    }

    while let Some(joined) = pending.join_next().await {
        stats.executions += reap(joined);
    }
    stats
}

fn reap(joined: Result<Vec<RuleExecutionResult>, JoinError>) -> usize {
    match joined {
        Ok(results) => {
            debug!("event finished with {} rule execution(s)", results.len());
            results.len()
        }
        Err(e) => {
            warn!("dispatch task failed: {}", e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use actions::{Action, CardSnapshot, CardTarget, TriggerEvent};
    use engine::memory::{
        InMemoryCardStore, InMemoryLogStore, InMemoryRuleCache, InMemoryWorkflowSource,
        RecordingDelay,
    };
    use engine::{LifecycleEventKind, RuleDefinition};
    use uuid::Uuid;

    fn matcher(card_type_id: Uuid, logs: Arc<InMemoryLogStore>) -> TriggerMatcher {
        let mut rule = RuleDefinition::new("comment on create", card_type_id, TriggerEvent::OnCreate);
        rule.actions = vec![Action::AddComment { target: CardTarget::TriggerCard, content: "hi".into() }];

        let executor = RuleExecutor::new(
            Arc::new(FieldConditionEvaluator),
            Arc::new(ActionRegistry::with_handler_for_all(Arc::new(LoggingHandler))),
            logs,
            ExecutorConfig::default(),
        )
        .with_delay(Arc::new(RecordingDelay::new()));

        TriggerMatcher::new(
            Arc::new(InMemoryRuleCache::new(vec![rule])),
            Arc::new(InMemoryWorkflowSource::default()),
            Arc::new(InMemoryCardStore::default()),
            Arc::new(executor),
        )
    }

    fn created_line(card_type_id: Uuid) -> String {
        let card = CardSnapshot::new(Uuid::new_v4(), card_type_id);
        let event = LifecycleEvent::for_card(card, Uuid::new_v4(), LifecycleEventKind::Created);
        serde_json::to_string(&event).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn finished_events_are_reaped_while_reading() {
        let card_type_id = Uuid::new_v4();
        let logs = Arc::new(InMemoryLogStore::new());
        let matcher = matcher(card_type_id, logs.clone());

        let (tx, rx) = mpsc::channel(8);
        let sender = tokio::spawn(async move {
            for _ in 0..5 {
                tx.send(created_line(card_type_id)).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        let stats = drain(&matcher, rx).await;
        sender.await.unwrap();

        assert_eq!(stats.events, 5);
        assert_eq!(stats.executions, 5);
        assert_eq!(stats.peak_in_flight, 1);
        assert_eq!(logs.logs().len(), 5);
    }

    #[tokio::test]
    async fn malformed_and_blank_lines_are_skipped() {
        let card_type_id = Uuid::new_v4();
        let logs = Arc::new(InMemoryLogStore::new());
        let matcher = matcher(card_type_id, logs.clone());

        let (tx, rx) = mpsc::channel(8);
        tx.send("not json".to_string()).await.unwrap();
        tx.send("   ".to_string()).await.unwrap();
        tx.send(created_line(card_type_id)).await.unwrap();
        drop(tx);

        let stats = drain(&matcher, rx).await;

        assert_eq!(stats.events, 1);
        assert_eq!(stats.executions, 1);
        assert_eq!(logs.logs().len(), 1);
    }
}
