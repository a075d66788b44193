//! Node configuration and the reconciler that merges partial updates.
//!
//! A configuration is an open key/value map; most keys are block-kind
//! specific and opaque to the edit engine. Three reserved keys carry
//! special merge semantics:
//!
//! - `fields`: an ordered sequence of field descriptors. An update that
//!   contains the key replaces the base's sequence outright, even when the
//!   new sequence is empty.
//! - `input_refs`: the complete wiring of a node's inputs. Always replaced
//!   wholesale, never merged entry by entry.
//! - `output_schema`: nullable structured-output schema. An absent key
//!   leaves the base untouched; an explicit `null` clears it.
//!
//! The rule underneath all three: presence of a key in the update decides
//! the merge, never the truthiness of its value.

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key for the ordered field-descriptor sequence.
pub const FIELDS_KEY: &str = "fields";
/// Reserved key for the node's input wiring map.
pub const INPUT_REFS_KEY: &str = "input_refs";
/// Reserved key for the nullable structured-output schema.
pub const OUTPUT_SCHEMA_KEY: &str = "output_schema";

/// A node's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Map<String, Value>);

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Creates a configuration from an existing object.
    #[must_use]
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(object)
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if the key is present, regardless of its value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Sets a key to a value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Returns true if the configuration has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the ordered field descriptors, if the key is present and a
    /// sequence.
    #[must_use]
    pub fn fields(&self) -> Option<&Vec<Value>> {
        self.0.get(FIELDS_KEY).and_then(Value::as_array)
    }

    /// Returns the input wiring map, if the key is present and an object.
    #[must_use]
    pub fn input_refs(&self) -> Option<&Map<String, Value>> {
        self.0.get(INPUT_REFS_KEY).and_then(Value::as_object)
    }

    /// Returns the raw structured-output schema entry.
    ///
    /// `Some(Value::Null)` means the schema was explicitly cleared;
    /// `None` means the key has never been set.
    #[must_use]
    pub fn output_schema(&self) -> Option<&Value> {
        self.0.get(OUTPUT_SCHEMA_KEY)
    }

    /// Produces a new configuration from this one and a partial update.
    ///
    /// Every key present in the update replaces the corresponding base
    /// entry; absent keys leave the base untouched. Key presence is the
    /// merge trigger — an update carrying `fields: []` lands as an empty
    /// sequence, and `input_refs` is replaced as one unit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfigShape` when the update is not an object.
    /// A malformed update is never partially applied.
    pub fn reconciled_with(&self, update: &Value) -> Result<Self, GraphError> {
        let Some(patch) = update.as_object() else {
            return Err(GraphError::InvalidConfigShape {
                reason: format!("config update must be an object, got {}", kind_of(update)),
            });
        };

        let mut merged = self.0.clone();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        Ok(Self(merged))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Config {
        let mut config = Config::new();
        config.insert(FIELDS_KEY, json!([{"name": "a"}]));
        config.insert("other", json!(1));
        config
    }

    #[test]
    fn update_overwrites_present_keys() {
        let config = base();
        let next = config
            .reconciled_with(&json!({"other": 2, "added": "x"}))
            .expect("merge");

        assert_eq!(next.get("other"), Some(&json!(2)));
        assert_eq!(next.get("added"), Some(&json!("x")));
        assert_eq!(next.fields(), Some(&vec![json!({"name": "a"})]));
    }

    #[test]
    fn empty_fields_sequence_survives_merge() {
        let config = base();
        let next = config.reconciled_with(&json!({"fields": []})).expect("merge");

        assert_eq!(next.fields(), Some(&Vec::new()));
        assert_eq!(next.get("other"), Some(&json!(1)));
    }

    #[test]
    fn empty_update_object_changes_nothing() {
        let config = base();
        let next = config.reconciled_with(&json!({})).expect("merge");
        assert_eq!(next, config);
    }

    #[test]
    fn input_refs_replaced_wholesale() {
        let mut config = Config::new();
        config.insert(INPUT_REFS_KEY, json!({"query": "step1.output", "limit": "step2.count"}));

        let next = config
            .reconciled_with(&json!({"input_refs": {"query": "step3.output"}}))
            .expect("merge");

        let refs = next.input_refs().expect("input_refs present");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs.get("query"), Some(&json!("step3.output")));
        assert!(refs.get("limit").is_none());
    }

    #[test]
    fn absent_output_schema_leaves_base_untouched() {
        let mut config = Config::new();
        config.insert(OUTPUT_SCHEMA_KEY, json!({"type": "object"}));

        let next = config.reconciled_with(&json!({"other": 1})).expect("merge");
        assert_eq!(next.output_schema(), Some(&json!({"type": "object"})));
    }

    #[test]
    fn explicit_null_clears_output_schema() {
        let mut config = Config::new();
        config.insert(OUTPUT_SCHEMA_KEY, json!({"type": "object"}));

        let next = config
            .reconciled_with(&json!({"output_schema": null}))
            .expect("merge");
        assert_eq!(next.output_schema(), Some(&Value::Null));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let config = base();
        let update = json!({"fields": [{"name": "b"}], "other": 5});

        let once = config.reconciled_with(&update).expect("first merge");
        let twice = once.reconciled_with(&update).expect("second merge");
        assert_eq!(once, twice);
    }

    #[test]
    fn non_object_update_rejected_without_applying() {
        let config = base();
        let err = config.reconciled_with(&json!("nope")).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfigShape { .. }));
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn null_update_rejected() {
        let config = base();
        let err = config.reconciled_with(&Value::Null).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfigShape { .. }));
    }

    #[test]
    fn config_serde_is_transparent() {
        let config = base();
        let json = serde_json::to_value(&config).expect("serialize");
        assert!(json.is_object());
        let parsed: Config = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
