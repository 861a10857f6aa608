//! Text transformation stages and the local completion client.
//!
//! Each stage implements [`protei_plugins::Stage`] and can be registered on a
//! [`protei_plugins::Pipeline`]. [`StageKind`] names the bundled stages so
//! front ends can assemble a pipeline from configuration.

mod completion;
mod gamedev;
mod ide;
mod neutral;
mod space;

#[cfg(test)]
mod tests;

use protei_plugins::{Pipeline, Stage};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use self::completion::{Completion, CompletionClient};
pub use self::gamedev::{GAMEDEV_CONTEXT_KEY, GameDevStage};
pub use self::ide::IdeStage;
pub use self::neutral::NeutralToneStage;
pub use self::space::SpaceStage;

/// Bundled stages selectable by name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StageKind {
    /// Code fence balancing, see [`IdeStage`].
    Ide,
    /// Units reminders, see [`SpaceStage`].
    Space,
    /// Game development context, see [`GameDevStage`].
    #[serde(rename = "gamedev")]
    #[strum(serialize = "gamedev")]
    GameDev,
    /// Neutral tone guard, see [`NeutralToneStage`].
    Neutral,
}

impl StageKind {
    /// Creates the stage this kind names.
    #[must_use]
    pub fn build(self) -> Box<dyn Stage> {
        match self {
            Self::Ide => Box::new(IdeStage),
            Self::Space => Box::new(SpaceStage),
            Self::GameDev => Box::new(GameDevStage),
            Self::Neutral => Box::new(NeutralToneStage),
        }
    }
}

/// Builds a pipeline running `kinds` in the given order.
#[must_use]
pub fn pipeline_from(kinds: &[StageKind]) -> Pipeline {
    let mut pipeline = Pipeline::new();
    for kind in kinds {
        pipeline.register_boxed(kind.build());
    }
    pipeline
}
