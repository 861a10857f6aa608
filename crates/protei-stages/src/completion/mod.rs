//! Local completion client.
//!
//! The client performs no inference. It echoes the transformed prompt so that
//! stage pipelines can be exercised end to end without a model service.

use protei_plugins::{MODEL_KEY, Pipeline, TransformationContext};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Log target for completion operations.
const COMPLETION_TARGET: &str = "protei_stages::completion";

/// Result of one completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    model: String,
    prompt: String,
    text: String,
}

impl Completion {
    /// Returns the model the completion was requested for.
    #[must_use]
    pub const fn model(&self) -> &str {
        self.model.as_str()
    }

    /// Returns the prompt after prompt stages ran.
    #[must_use]
    pub const fn prompt(&self) -> &str {
        self.prompt.as_str()
    }

    /// Returns the response text after response stages ran.
    #[must_use]
    pub const fn text(&self) -> &str {
        self.text.as_str()
    }
}

/// Runs prompts and responses through a [`Pipeline`] around a stubbed
/// completion.
#[derive(Debug, Default)]
pub struct CompletionClient {
    pipeline: Pipeline,
}

impl CompletionClient {
    /// Creates a client around `pipeline`.
    #[must_use]
    pub const fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// Returns the pipeline used for every request.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Completes `prompt` with a fresh context holding only the model name.
    #[must_use]
    pub fn create(&self, model: &str, prompt: &str) -> Completion {
        let mut context = TransformationContext::for_model(model);
        self.create_with_context(model, prompt, &mut context)
    }

    /// Completes `prompt` using a caller-supplied context.
    ///
    /// The model name is recorded in `context` before any stage runs.
    #[must_use]
    pub fn create_with_context(
        &self,
        model: &str,
        prompt: &str,
        context: &mut TransformationContext,
    ) -> Completion {
        context.insert(MODEL_KEY, Value::String(model.to_owned()));
        let transformed = self.pipeline.apply_on_prompt(prompt, context);
        let raw = format!("Echo (model={model}): {transformed}");
        let text = self.pipeline.apply_on_response(&raw, context);
        debug!(
            target: COMPLETION_TARGET,
            model,
            stages = self.pipeline.len(),
            "completion produced"
        );
        Completion {
            model: model.to_owned(),
            prompt: transformed,
            text,
        }
    }

    /// Completes `prompt` and yields the response as whitespace-separated
    /// tokens, each followed by a single space.
    #[must_use]
    pub fn stream(&self, model: &str, prompt: &str) -> Vec<String> {
        let mut context = TransformationContext::for_model(model);
        self.stream_with_context(model, prompt, &mut context)
    }

    /// Streaming counterpart of [`Self::create_with_context`].
    #[must_use]
    pub fn stream_with_context(
        &self,
        model: &str,
        prompt: &str,
        context: &mut TransformationContext,
    ) -> Vec<String> {
        self.create_with_context(model, prompt, context)
            .text
            .split_whitespace()
            .map(|token| format!("{token} "))
            .collect()
    }
}
