//! Trigger matching and dispatch.
//!
//! `TriggerMatcher` turns one lifecycle event into at most one execution per
//! rule.  Matching is done up front on the caller's task; each matched rule is
//! then spawned onto the tokio runtime so a slow or retrying rule never holds
//! up event consumption.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use actions::{CardSnapshot, RuleExecutionContext, TriggerEvent};

use crate::event::{LifecycleEvent, LifecycleEventKind};
use crate::executor::RuleExecutor;
use crate::models::RuleDefinition;
use crate::ports::{CardStore, RuleCache, WorkflowSource};
use crate::result::RuleExecutionResult;
use crate::workflow::{is_rollback, resolve_path};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Event-kind specific filter applied on top of the trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleFilter {
    /// Create / discard / archive / restore / schedule.
    None,
    /// Destination plus every status skipped over, in traversal order.
    Crossed(Vec<String>),
    Fields(BTreeSet<String>),
}

impl RuleFilter {
    fn accepts(&self, rule: &RuleDefinition) -> bool {
        match self {
            Self::None => true,
            Self::Crossed(crossed) => match &rule.target_status_id {
                None => true,
                Some(target) => crossed.iter().any(|s| s == target),
            },
            Self::Fields(changed) => rule.listens_to_any(changed),
        }
    }
}

// ---------------------------------------------------------------------------
// Match outcome
// ---------------------------------------------------------------------------

/// Rules selected for one event, together with the shared context.
#[derive(Debug, Clone)]
pub struct MatchedRules {
    pub context: Arc<RuleExecutionContext>,
    pub rules: Vec<RuleDefinition>,
}

/// Handles to the executions spawned for one event.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub trace_id: Option<Uuid>,
    pub rule_ids: Vec<Uuid>,
    handles: Vec<JoinHandle<RuleExecutionResult>>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.rule_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rule_ids.len()
    }

    /// Wait for every spawned execution.  Executions that panicked are
    /// logged and left out.
    pub async fn join(self) -> Vec<RuleExecutionResult> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => error!("rule execution task failed: {}", e),
            }
        }
        results
    }
}

// ---------------------------------------------------------------------------
// TriggerMatcher
// ---------------------------------------------------------------------------

pub struct TriggerMatcher {
    rules: Arc<dyn RuleCache>,
    workflows: Arc<dyn WorkflowSource>,
    cards: Arc<dyn CardStore>,
    executor: Arc<RuleExecutor>,
}

impl TriggerMatcher {
    pub fn new(
        rules: Arc<dyn RuleCache>,
        workflows: Arc<dyn WorkflowSource>,
        cards: Arc<dyn CardStore>,
        executor: Arc<RuleExecutor>,
    ) -> Self {
        Self { rules, workflows, cards, executor }
    }

    /// Match `event` and spawn one execution per matched rule.
    ///
    /// Returns as soon as the executions are spawned.  Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    /// Only collaborator failures (rule cache, workflow source, card store).
    #[instrument(skip(self, event), fields(card_id = %event.card_id))]
    pub async fn on_lifecycle_event(&self, event: LifecycleEvent) -> Result<Dispatch, EngineError> {
        let Some(matched) = self.match_rules(&event).await? else {
            return Ok(Dispatch::default());
        };

        let mut dispatch = Dispatch {
            trace_id: Some(matched.context.trace_id),
            ..Dispatch::default()
        };

        for rule in matched.rules {
            let executor = Arc::clone(&self.executor);
            let ctx = Arc::clone(&matched.context);
            dispatch.rule_ids.push(rule.id);
            dispatch.handles.push(tokio::spawn(async move {
                executor.execute(&rule, &ctx).await
            }));
        }

        info!(
            "dispatched {} rule(s) for {} on card {}",
            dispatch.len(),
            matched.context.trigger_event,
            event.card_id
        );

        Ok(dispatch)
    }

    /// Select the rules `event` triggers, without executing anything.
    ///
    /// `Ok(None)` means the event triggers nothing: it came from a rule, the
    /// card no longer exists, no field changed, or the status did not change.
    pub async fn match_rules(&self, event: &LifecycleEvent) -> Result<Option<MatchedRules>, EngineError> {
        if event.origin.is_rule_execution() {
            debug!("ignoring rule-originated event for card {}", event.card_id);
            return Ok(None);
        }

        let card = match &event.card {
            Some(card) => card.clone(),
            None => match self.cards.find_by_id(event.card_id).await? {
                Some(card) => card,
                None => {
                    debug!("card {} not found, nothing to trigger", event.card_id);
                    return Ok(None);
                }
            },
        };

        let mut from_status_id = None;
        let mut to_status_id = None;
        let mut changed_field_ids = BTreeSet::new();

        let (trigger_event, filter) = match &event.kind {
            LifecycleEventKind::Created => (TriggerEvent::OnCreate, RuleFilter::None),
            LifecycleEventKind::Discarded { .. } => (TriggerEvent::OnDiscard, RuleFilter::None),
            LifecycleEventKind::Archived => (TriggerEvent::OnArchive, RuleFilter::None),
            LifecycleEventKind::Restored => (TriggerEvent::OnRestore, RuleFilter::None),
            LifecycleEventKind::Scheduled => (TriggerEvent::OnSchedule, RuleFilter::None),

            LifecycleEventKind::FieldsChanged { field_ids } => {
                if field_ids.is_empty() {
                    debug!("no changed fields on card {}", event.card_id);
                    return Ok(None);
                }
                changed_field_ids = field_ids.clone();
                (TriggerEvent::OnFieldChange, RuleFilter::Fields(field_ids.clone()))
            }

            LifecycleEventKind::StatusMoved { from_status_id: from, to_status_id: to } => {
                if from == to {
                    debug!("card {} stayed in status '{}'", event.card_id, to);
                    return Ok(None);
                }
                from_status_id = Some(from.clone());
                to_status_id = Some(to.clone());
                self.classify_move(&card, from, to).await?
            }
        };

        let candidates = self.rules.enabled_rules(card.card_type_id).await?;
        let mut seen = HashSet::new();
        let rules: Vec<RuleDefinition> = candidates
            .into_iter()
            .filter(|rule| rule.enabled && rule.trigger_event == trigger_event)
            .filter(|rule| filter.accepts(rule))
            .filter(|rule| seen.insert(rule.id))
            .collect();

        if rules.is_empty() {
            debug!("no {} rules match card {}", trigger_event, card.id);
            return Ok(None);
        }

        let context = RuleExecutionContext {
            changed_field_ids,
            from_status_id,
            to_status_id,
            ..RuleExecutionContext::new(card, event.operator_id, trigger_event)
        };

        Ok(Some(MatchedRules { context: Arc::new(context), rules }))
    }

    // -----------------------------------------------------------------------
    // Internal: decide move vs rollback and which statuses were crossed.
    // -----------------------------------------------------------------------

    async fn classify_move(
        &self,
        card: &CardSnapshot,
        from: &str,
        to: &str,
    ) -> Result<(TriggerEvent, RuleFilter), EngineError> {
        let destination_only = (TriggerEvent::OnStatusMove, RuleFilter::Crossed(vec![to.to_owned()]));

        let Some(workflow) = self.workflows.workflow_for(card.card_type_id).await? else {
            warn!("card type {} has no value stream, matching destination '{}' only", card.card_type_id, to);
            return Ok(destination_only);
        };

        let path = match resolve_path(&workflow, from, to) {
            Ok(path) => path,
            Err(e) => {
                warn!("cannot resolve move {} -> {}: {}; matching destination only", from, to, e);
                return Ok(destination_only);
            }
        };

        let trigger_event = if is_rollback(&workflow, from, to)? {
            TriggerEvent::OnStatusRollback
        } else {
            TriggerEvent::OnStatusMove
        };

        let crossed: Vec<String> = path.iter().skip(1).map(|s| s.id.clone()).collect();
        debug!("{} {} -> {} crossed {:?}", trigger_event, from, to, crossed);

        Ok((trigger_event, RuleFilter::Crossed(crossed)))
    }
}
