//! Per-operation key/value context shared by pipeline stages.

use std::collections::HashMap;

use serde_json::Value;

/// Context key holding the model name of a completion.
pub const MODEL_KEY: &str = "model";

/// Mutable bag of values created for one logical operation.
///
/// Stages read hints from the context (such as the model name) and may
/// record values for later stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformationContext {
    values: HashMap<String, Value>,
}

impl TransformationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context carrying the given model name.
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        let mut context = Self::new();
        context.insert(MODEL_KEY, Value::String(model.to_owned()));
        context
    }

    /// Returns the model name, if recorded as a string.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.get(MODEL_KEY).and_then(Value::as_str)
    }

    /// Looks up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores a value, returning the one it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
