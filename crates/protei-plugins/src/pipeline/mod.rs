//! Ordered in-process text transformation.
//!
//! A [`Pipeline`] folds prompt and response text through its [`Stage`]s in
//! registration order. A stage that fails, by returning [`StageError`] or by
//! panicking, leaves the text unchanged at its position and is told about the
//! failure through [`Stage::on_error`]. No stage failure reaches the caller.

mod context;

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::{debug, warn};

pub use self::context::{MODEL_KEY, TransformationContext};

/// Log target for pipeline operations.
const PIPELINE_TARGET: &str = "protei_plugins::pipeline";

/// Failure raised by one stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage '{stage}' failed: {message}")]
pub struct StageError {
    stage: String,
    message: String,
}

impl StageError {
    /// Creates a stage failure.
    #[must_use]
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Returns the failing stage's name.
    #[must_use]
    pub const fn stage(&self) -> &str {
        self.stage.as_str()
    }

    /// Returns the failure description.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A transformation applied to prompts before and responses after a
/// completion.
///
/// Every hook has a pass-through default, so a stage overrides only what it
/// changes.
///
/// # Example
///
/// ```
/// use protei_plugins::{Pipeline, Stage, StageError, TransformationContext};
///
/// struct Shout;
///
/// impl Stage for Shout {
///     fn name(&self) -> &str {
///         "shout"
///     }
///
///     fn on_response(
///         &self,
///         text: &str,
///         _context: &mut TransformationContext,
///     ) -> Result<String, StageError> {
///         Ok(text.to_uppercase())
///     }
/// }
///
/// let pipeline = Pipeline::new().with_stage(Shout);
/// let mut context = TransformationContext::new();
/// assert_eq!(pipeline.apply_on_response("hi", &mut context), "HI");
/// assert_eq!(pipeline.apply_on_prompt("hi", &mut context), "hi");
/// ```
pub trait Stage: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Rewrites a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] when the stage cannot transform the text.
    fn on_prompt(
        &self,
        text: &str,
        context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        let _ = context;
        Ok(text.to_owned())
    }

    /// Rewrites a response.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] when the stage cannot transform the text.
    fn on_response(
        &self,
        text: &str,
        context: &mut TransformationContext,
    ) -> Result<String, StageError> {
        let _ = context;
        Ok(text.to_owned())
    }

    /// Observes a failure of this stage.
    ///
    /// # Errors
    ///
    /// Errors returned here are logged and discarded.
    fn on_error(
        &self,
        error: &StageError,
        context: &mut TransformationContext,
    ) -> Result<(), StageError> {
        let _ = (error, context);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Prompt,
    Response,
}

impl Hook {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "on_prompt",
            Self::Response => "on_response",
        }
    }
}

/// Ordered chain of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `stage` and returns the pipeline.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.register(stage);
        self
    }

    /// Appends `stage`.
    pub fn register(&mut self, stage: impl Stage + 'static) {
        self.register_boxed(Box::new(stage));
    }

    /// Appends an already boxed stage.
    pub fn register_boxed(&mut self, stage: Box<dyn Stage>) {
        debug!(target: PIPELINE_TARGET, stage = stage.name(), "stage registered");
        self.stages.push(stage);
    }

    /// Returns stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns whether no stage is registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `text` through every stage's prompt hook.
    #[must_use]
    pub fn apply_on_prompt(&self, text: &str, context: &mut TransformationContext) -> String {
        self.apply(Hook::Prompt, text, context)
    }

    /// Runs `text` through every stage's response hook.
    #[must_use]
    pub fn apply_on_response(&self, text: &str, context: &mut TransformationContext) -> String {
        self.apply(Hook::Response, text, context)
    }

    fn apply(&self, hook: Hook, text: &str, context: &mut TransformationContext) -> String {
        let mut current = text.to_owned();
        for stage in &self.stages {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match hook {
                Hook::Prompt => stage.on_prompt(&current, context),
                Hook::Response => stage.on_response(&current, context),
            }))
            .unwrap_or_else(|payload| Err(StageError::new(stage.name(), panic_message(&*payload))));

            match outcome {
                Ok(rewritten) => current = rewritten,
                Err(failure) => {
                    warn!(
                        target: PIPELINE_TARGET,
                        stage = stage.name(),
                        hook = hook.as_str(),
                        error = %failure,
                        "stage failed, keeping text unchanged"
                    );
                    notify_failure(stage.as_ref(), &failure, context);
                }
            }
        }
        current
    }
}

/// Calls the stage's error hook, absorbing its failures.
fn notify_failure(stage: &dyn Stage, failure: &StageError, context: &mut TransformationContext) {
    let hook_result = panic::catch_unwind(AssertUnwindSafe(|| stage.on_error(failure, context)))
        .unwrap_or_else(|payload| Err(StageError::new(stage.name(), panic_message(&*payload))));
    if let Err(hook_failure) = hook_result {
        debug!(
            target: PIPELINE_TARGET,
            stage = stage.name(),
            error = %hook_failure,
            "stage error hook failed"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || String::from("stage panicked"),
            |message| format!("stage panicked: {message}"),
        )
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
