//! Value-stream linear order and status path resolution.
//!
//! A value stream flattens into one linear status chain: steps ordered by
//! `sort_order`, then each step's statuses ordered by `sort_order`.  That
//! chain is the only basis for deciding whether a move is a rollback and
//! which statuses a multi-step move crossed.
//!
//! Everything here is pure.

use std::collections::HashSet;

use crate::{
    models::{Status, WorkflowDefinition},
    EngineError,
};

/// Flatten the workflow into its linear status order.
pub fn linear_order(workflow: &WorkflowDefinition) -> Vec<&Status> {
    let mut steps: Vec<_> = workflow.steps.iter().collect();
    steps.sort_by_key(|step| step.sort_order);

    steps
        .into_iter()
        .flat_map(|step| {
            let mut statuses: Vec<&Status> = step.statuses.iter().collect();
            statuses.sort_by_key(|status| status.sort_order);
            statuses
        })
        .collect()
}

/// Validate the workflow and return its status IDs in linear order.
///
/// # Errors
/// - [`EngineError::EmptyWorkflow`] if no step holds a status.
/// - [`EngineError::DuplicateStatusId`] if a status ID appears twice.
/// - [`EngineError::DuplicateSortOrder`] if two steps, or two statuses of
///   one step, share a `sort_order`.
pub fn validate_workflow(workflow: &WorkflowDefinition) -> Result<Vec<String>, EngineError> {
    let order = linear_order(workflow);
    if order.is_empty() {
        return Err(EngineError::EmptyWorkflow(workflow.id.clone()));
    }

    ensure_unique_sort_orders(
        workflow.steps.iter().map(|step| step.sort_order),
        || format!("workflow '{}'", workflow.id),
    )?;
    for step in &workflow.steps {
        ensure_unique_sort_orders(
            step.statuses.iter().map(|status| status.sort_order),
            || format!("step '{}'", step.id),
        )?;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for status in &order {
        if !seen.insert(status.id.as_str()) {
            return Err(EngineError::DuplicateStatusId(status.id.clone()));
        }
    }

    Ok(order.into_iter().map(|s| s.id.clone()).collect())
}

/// Position of `status_id` in the linear order.
pub fn linear_index(workflow: &WorkflowDefinition, status_id: &str) -> Result<usize, EngineError> {
    linear_order(workflow)
        .iter()
        .position(|s| s.id == status_id)
        .ok_or_else(|| unknown(workflow, status_id))
}

/// Whether moving from `from` to `to` goes backwards in the linear order.
pub fn is_rollback(workflow: &WorkflowDefinition, from: &str, to: &str) -> Result<bool, EngineError> {
    Ok(linear_index(workflow, to)? < linear_index(workflow, from)?)
}

/// Statuses traversed moving from `from` to `to`, both endpoints included,
/// in traversal order (reversed for rollbacks).
pub fn resolve_path<'a>(
    workflow: &'a WorkflowDefinition,
    from: &str,
    to: &str,
) -> Result<Vec<&'a Status>, EngineError> {
    let order = linear_order(workflow);
    let position = |id: &str| {
        order
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| unknown(workflow, id))
    };
    let from_idx = position(from)?;
    let to_idx = position(to)?;

    let path = if to_idx >= from_idx {
        order[from_idx..=to_idx].to_vec()
    } else {
        order[to_idx..=from_idx].iter().rev().copied().collect()
    };

    Ok(path)
}

fn ensure_unique_sort_orders(
    sort_orders: impl Iterator<Item = i32>,
    scope: impl FnOnce() -> String,
) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for sort_order in sort_orders {
        if !seen.insert(sort_order) {
            return Err(EngineError::DuplicateSortOrder { scope: scope(), sort_order });
        }
    }
    Ok(())
}

fn unknown(workflow: &WorkflowDefinition, status_id: &str) -> EngineError {
    EngineError::UnknownStatus {
        status_id: status_id.to_owned(),
        workflow: workflow.id.clone(),
    }
}
