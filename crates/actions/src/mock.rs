//! `MockHandler`: a test double for `ActionHandler`.
//!
//! Useful in unit and integration tests where a real handler implementation
//! is either unavailable or irrelevant.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{Action, ActionError, ActionHandler, ActionKind, ActionOutput, RuleExecutionContext};

/// Behaviour injected into `MockHandler` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed, reporting the trigger card as affected.
    Succeed,
    /// Fail with `ActionError::Failed`.
    Fail(String),
    /// Fail with `ActionError::Unexpected`.
    Unexpected(String),
    /// Panic inside `handle`, like a buggy plugin.
    Panic(String),
}

/// A mock handler that records every call it receives and replays a
/// programmer-specified script of outcomes.
///
/// Each call consumes the next scripted behaviour; the last one repeats once
/// the script is exhausted.
pub struct MockHandler {
    script: Mutex<VecDeque<MockBehaviour>>,
    last: Mutex<MockBehaviour>,
    /// Kinds of every action seen by this handler (in call order).
    pub calls: Arc<Mutex<Vec<ActionKind>>>,
}

impl MockHandler {
    /// Replay `script` in order, then keep repeating its last entry.
    pub fn scripted(script: Vec<MockBehaviour>) -> Self {
        let last = script.last().cloned().unwrap_or(MockBehaviour::Succeed);
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds.
    pub fn succeeding() -> Self {
        Self::scripted(vec![MockBehaviour::Succeed])
    }

    /// Create a mock that always fails with `ActionError::Failed`.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self::scripted(vec![MockBehaviour::Fail(msg.into())])
    }

    /// Create a mock that always fails with `ActionError::Unexpected`.
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::scripted(vec![MockBehaviour::Unexpected(msg.into())])
    }

    /// Create a mock that panics on every call.
    pub fn panicking(msg: impl Into<String>) -> Self {
        Self::scripted(vec![MockBehaviour::Panic(msg.into())])
    }

    /// Number of times this handler has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_behaviour(&self) -> MockBehaviour {
        match self.script.lock().unwrap().pop_front() {
            Some(behaviour) => {
                *self.last.lock().unwrap() = behaviour.clone();
                behaviour
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl ActionHandler for MockHandler {
    async fn handle(
        &self,
        action: &Action,
        ctx: &RuleExecutionContext,
    ) -> Result<ActionOutput, ActionError> {
        self.calls.lock().unwrap().push(action.kind());

        match self.next_behaviour() {
            MockBehaviour::Succeed => Ok(ActionOutput::affecting([ctx.card.id])),
            MockBehaviour::Fail(msg) => Err(ActionError::Failed(msg)),
            MockBehaviour::Unexpected(msg) => Err(ActionError::Unexpected(msg)),
            MockBehaviour::Panic(msg) => panic!("{msg}"),
        }
    }
}
