//! In-process implementations of the collaborator traits.
//!
//! Backed by `std` collections behind a `RwLock`/`Mutex`.  The CLI `simulate`
//! command and the engine tests run on these; production wiring uses the
//! Postgres adapters in the `db` crate.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use actions::CardSnapshot;

use crate::{
    models::{RuleDefinition, WorkflowDefinition},
    ports::{CardStore, Delay, LogStore, RuleCache, WorkflowSource},
    result::RuleExecutionLog,
    EngineError,
};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryRuleCache {
    rules: RwLock<Vec<RuleDefinition>>,
}

impl InMemoryRuleCache {
    pub fn new(rules: Vec<RuleDefinition>) -> Self {
        Self { rules: RwLock::new(rules) }
    }
}

#[async_trait]
impl RuleCache for InMemoryRuleCache {
    async fn enabled_rules(&self, card_type_id: Uuid) -> Result<Vec<RuleDefinition>, EngineError> {
        let rules = self.rules.read().map_err(|_| anyhow!("rule cache lock poisoned"))?;
        Ok(rules
            .iter()
            .filter(|r| r.enabled && r.card_type_id == card_type_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryWorkflowSource {
    workflows: RwLock<HashMap<Uuid, WorkflowDefinition>>,
}

impl InMemoryWorkflowSource {
    pub fn new(workflows: impl IntoIterator<Item = WorkflowDefinition>) -> Self {
        let source = Self::default();
        for workflow in workflows {
            source.insert(workflow);
        }
        source
    }

    pub fn insert(&self, workflow: WorkflowDefinition) {
        self.workflows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(workflow.card_type_id, workflow);
    }
}

#[async_trait]
impl WorkflowSource for InMemoryWorkflowSource {
    async fn workflow_for(
        &self,
        card_type_id: Uuid,
    ) -> Result<Option<WorkflowDefinition>, EngineError> {
        let workflows = self.workflows.read().map_err(|_| anyhow!("workflow lock poisoned"))?;
        Ok(workflows.get(&card_type_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryCardStore {
    cards: RwLock<HashMap<Uuid, CardSnapshot>>,
}

impl InMemoryCardStore {
    pub fn new(cards: impl IntoIterator<Item = CardSnapshot>) -> Self {
        let store = Self::default();
        for card in cards {
            store.insert(card);
        }
        store
    }

    pub fn insert(&self, card: CardSnapshot) {
        self.cards.write().unwrap_or_else(PoisonError::into_inner).insert(card.id, card);
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn find_by_id(&self, card_id: Uuid) -> Result<Option<CardSnapshot>, EngineError> {
        let cards = self.cards.read().map_err(|_| anyhow!("card store lock poisoned"))?;
        Ok(cards.get(&card_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Keeps every saved log.  Can be switched into a failing mode to exercise
/// the engine's best-effort logging.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: Mutex<Vec<RuleExecutionLog>>,
    save_calls: Mutex<usize>,
    fail_saves: bool,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every `save` fails.
    pub fn failing() -> Self {
        Self { fail_saves: true, ..Self::default() }
    }

    pub fn logs(&self) -> Vec<RuleExecutionLog> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of `save` calls, including failed ones.
    pub fn save_calls(&self) -> usize {
        *self.save_calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn save(&self, log: &RuleExecutionLog) -> Result<(), EngineError> {
        *self.save_calls.lock().map_err(|_| anyhow!("log store lock poisoned"))? += 1;
        if self.fail_saves {
            return Err(anyhow!("log store unavailable").into());
        }
        self.logs
            .lock()
            .map_err(|_| anyhow!("log store lock poisoned"))?
            .push(log.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

/// Records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}
