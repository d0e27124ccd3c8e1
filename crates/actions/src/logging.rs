//! Dry-run handler that only records what it would have done.

use async_trait::async_trait;
use tracing::info;

use crate::{Action, ActionError, ActionHandler, ActionOutput, CardTarget, RuleExecutionContext};

/// Logs each action through `tracing` and reports success.
///
/// Used by the CLI `simulate` command so scenarios can run without any card
/// store or outbound HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl ActionHandler for LoggingHandler {
    async fn handle(
        &self,
        action: &Action,
        ctx: &RuleExecutionContext,
    ) -> Result<ActionOutput, ActionError> {
        info!(
            trace_id = %ctx.trace_id,
            card_id = %ctx.card.id,
            action = %action.kind(),
            "dry run: {}",
            describe(action),
        );

        let affected = match action {
            Action::UpdateCard { target, .. }
            | Action::MoveCard { target, .. }
            | Action::ArchiveCard { target }
            | Action::AddComment { target, .. } => match target {
                CardTarget::TriggerCard => vec![ctx.card.id],
                CardTarget::Card { id } => vec![*id],
                CardTarget::LinkedCards { .. } => Vec::new(),
            },
            Action::CreateCard { .. } | Action::SendNotification { .. } | Action::CallWebhook { .. } => {
                Vec::new()
            }
        };

        Ok(ActionOutput::affecting(affected))
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::UpdateCard { fields, .. } => {
            let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            keys.sort_unstable();
            format!("update fields {keys:?}")
        }
        Action::MoveCard { status_id, .. } => format!("move to status '{status_id}'"),
        Action::CreateCard { card_type_id, title, .. } => {
            format!("create card '{title}' of type {card_type_id}")
        }
        Action::ArchiveCard { .. } => "archive".to_string(),
        Action::AddComment { content, .. } => format!("comment '{content}'"),
        Action::SendNotification { receivers, title, .. } => {
            format!("notify {} receiver(s): '{title}'", receivers.len())
        }
        Action::CallWebhook { url, method, .. } => format!("{method} {url}"),
    }
}
