//! # Identifier Policy
//!
//! Decides whether a document already has a remote identity.
//!
//! An identifier counts as **present** when it is a number greater than zero or
//! a non-empty string. Everything else is **absent**: a missing field, `null`,
//! `0`, negative numbers, `""`, booleans, arrays and objects. The rule is not a
//! truthiness test: `"0"` is present while `0` is not.

use crate::error::Result;
use crate::step::{self, Predicate, Step, Verdict};
use serde_json::Value;
use std::sync::Arc;

/// Extracts the candidate identifier from a document.
///
/// Id extraction is synchronous so that [`Model::has_id`](crate::Model::has_id)
/// can answer without a runtime; pipelines lift it with [`extract`].
pub type IdFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Id hook reading the field at `path`; dots separate nested keys.
///
/// A missing field (or a document that is not an object) yields `null`.
pub fn field(path: impl Into<String>) -> IdFn {
    let pointer: String = path
        .into()
        .split('.')
        .map(|key| format!("/{}", key.replace('~', "~0").replace('/', "~1")))
        .collect();
    Arc::new(move |data: &Value| Ok(data.pointer(&pointer).cloned().unwrap_or(Value::Null)))
}

/// Classifies an extracted identifier.
pub fn is_present(id: &Value) -> bool {
    match id {
        Value::Number(n) => n.as_f64().is_some_and(|n| n > 0.0),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Branch predicate: does `data` carry a present identifier?
pub fn has_id(id: IdFn) -> Predicate<Value> {
    Arc::new(move |data: &Value| Verdict::Ready(id(data).map(|id| is_present(&id))))
}

/// The id hook as a pipeline step.
pub fn extract(id: IdFn) -> Step<Value, Value> {
    step::from_fn(move |data: Value| id(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn present(data: Value) -> bool {
        let id = field("id");
        is_present(&id(&data).unwrap())
    }

    #[test]
    fn test_positive_numbers_and_non_empty_strings_are_present() {
        assert!(present(json!({"id": 5})));
        assert!(present(json!({"id": 0.5})));
        assert!(present(json!({"id": "x"})));
        assert!(present(json!({"id": "0"})));
    }

    #[test]
    fn test_everything_else_is_absent() {
        assert!(!present(json!({"id": 0})));
        assert!(!present(json!({"id": -1})));
        assert!(!present(json!({"id": ""})));
        assert!(!present(json!({"id": null})));
        assert!(!present(json!({"id": true})));
        assert!(!present(json!({"id": {"nested": 1}})));
        assert!(!present(json!({"id": [1]})));
        assert!(!present(json!({"name": "no id"})));
    }

    #[test]
    fn test_bare_identifiers_have_no_id_field() {
        // by_id(12) passes the number itself through instead of extracting from it.
        assert!(!present(json!(12)));
        assert!(!present(json!("abc")));
    }

    #[test]
    fn test_field_follows_dotted_paths() {
        let id = field("meta._id");
        assert_eq!(id(&json!({"meta": {"_id": "a1"}})).unwrap(), json!("a1"));
        assert_eq!(id(&json!({"meta": {}})).unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_predicate_and_step() {
        let id = field("id");
        match has_id(id.clone())(&json!({"id": 3})) {
            Verdict::Ready(Ok(found)) => assert!(found),
            _ => panic!("Expected an immediate verdict"),
        }
        assert_eq!(extract(id)(json!({"id": 3})).await.unwrap(), json!(3));
    }
}
