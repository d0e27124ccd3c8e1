//! Rule preconditions.
//!
//! A condition is a closed tree of predicates over the trigger card's
//! snapshot.  Evaluation goes through the [`ConditionEvaluator`] trait so a
//! tenant-specific evaluator can replace [`FieldConditionEvaluator`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use actions::CardSnapshot;

/// Predicate tree stored on a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    And { conditions: Vec<Condition> },
    Or { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
    FieldEquals { field_id: String, value: Value },
    FieldNotEquals { field_id: String, value: Value },
    FieldIn { field_id: String, values: Vec<Value> },
    FieldEmpty { field_id: String },
    FieldNotEmpty { field_id: String },
    StatusIs { status_id: String },
}

/// Decides whether a rule's condition holds for a card.
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, condition: &Condition, card: &CardSnapshot) -> bool;
}

/// Evaluates [`Condition`] trees directly against the snapshot's fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldConditionEvaluator;

impl ConditionEvaluator for FieldConditionEvaluator {
    fn evaluate(&self, condition: &Condition, card: &CardSnapshot) -> bool {
        match condition {
            // An empty AND holds, an empty OR does not.
            Condition::And { conditions } => conditions.iter().all(|c| self.evaluate(c, card)),
            Condition::Or { conditions } => conditions.iter().any(|c| self.evaluate(c, card)),
            Condition::Not { condition } => !self.evaluate(condition, card),
            Condition::FieldEquals { field_id, value } => card.field(field_id) == Some(value),
            Condition::FieldNotEquals { field_id, value } => card.field(field_id) != Some(value),
            Condition::FieldIn { field_id, values } => card
                .field(field_id)
                .is_some_and(|current| values.contains(current)),
            Condition::FieldEmpty { field_id } => is_empty(card.field(field_id)),
            Condition::FieldNotEmpty { field_id } => !is_empty(card.field(field_id)),
            Condition::StatusIs { status_id } => card.status_id.as_deref() == Some(status_id.as_str()),
        }
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn card() -> CardSnapshot {
        CardSnapshot::new(Uuid::new_v4(), Uuid::new_v4())
            .with_status("review")
            .with_field("priority", json!("high"))
            .with_field("assignees", json!([]))
            .with_field("estimate", json!(5))
    }

    fn eval(condition: Condition) -> bool {
        FieldConditionEvaluator.evaluate(&condition, &card())
    }

    #[test]
    fn field_predicates() {
        assert!(eval(Condition::FieldEquals { field_id: "priority".into(), value: json!("high") }));
        assert!(!eval(Condition::FieldEquals { field_id: "priority".into(), value: json!("low") }));
        assert!(eval(Condition::FieldNotEquals { field_id: "missing".into(), value: json!(1) }));
        assert!(eval(Condition::FieldIn { field_id: "estimate".into(), values: vec![json!(3), json!(5)] }));
        assert!(!eval(Condition::FieldIn { field_id: "missing".into(), values: vec![json!(null)] }));
        assert!(eval(Condition::FieldEmpty { field_id: "assignees".into() }));
        assert!(eval(Condition::FieldEmpty { field_id: "missing".into() }));
        assert!(eval(Condition::FieldNotEmpty { field_id: "estimate".into() }));
        assert!(eval(Condition::StatusIs { status_id: "review".into() }));
    }

    #[test]
    fn boolean_composition() {
        let high = Condition::FieldEquals { field_id: "priority".into(), value: json!("high") };
        let done = Condition::StatusIs { status_id: "done".into() };

        assert!(!eval(Condition::And { conditions: vec![high.clone(), done.clone()] }));
        assert!(eval(Condition::Or { conditions: vec![high.clone(), done.clone()] }));
        assert!(eval(Condition::Not { condition: Box::new(done) }));
        assert!(eval(Condition::And { conditions: vec![] }));
        assert!(!eval(Condition::Or { conditions: vec![] }));
    }

    #[test]
    fn condition_deserialises_from_tagged_json() {
        let parsed: Condition = serde_json::from_value(json!({
            "type": "and",
            "conditions": [
                { "type": "status_is", "status_id": "review" },
                { "type": "not", "condition": { "type": "field_empty", "field_id": "estimate" } }
            ]
        }))
        .expect("valid condition");

        assert!(FieldConditionEvaluator.evaluate(&parsed, &card()));
    }
}
