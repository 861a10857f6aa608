//! Plugin orchestration over process-based JSON-RPC.
//!
//! The `protei-plugins` crate starts independently executable plugin
//! processes, talks to each of them over a line-delimited JSON-RPC protocol on
//! standard I/O, and exposes a single tool-invocation surface that routes calls
//! by declared capability. It also hosts the in-process transformation
//! pipeline used to rewrite prompts and responses.
//!
//! # Architecture
//!
//! - [`protocol`]: the single-line request and response records.
//! - [`client`]: [`ProcessRpcClient`] owns one child process and performs one
//!   correlated call at a time.
//! - [`orchestrator`]: [`Orchestrator`] starts a roster of
//!   [`PluginDescriptor`]s, performs the `get_meta` handshake, and routes
//!   invocations to the first plugin declaring the requested capability.
//! - [`pipeline`]: [`Pipeline`] folds text through ordered [`Stage`]s with
//!   per-stage failure isolation.
//! - [`server`]: the plugin-side serve loop for plugins written in Rust.
//!
//! # Example
//!
//! ```rust,no_run
//! use protei_plugins::{Orchestrator, PluginDescriptor};
//! use serde_json::json;
//!
//! let roster = vec![PluginDescriptor::process(
//!     "node-basic",
//!     vec!["node".into(), "basic.js".into(), "--serve".into()],
//! )];
//!
//! let mut orchestrator = Orchestrator::new();
//! orchestrator.start(&roster).expect("roster starts");
//! let reversed = orchestrator.invoke("string.reverse", json!({"text": "abc"}));
//! orchestrator.stop();
//! # drop(reversed);
//! ```

pub mod client;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod protocol;
pub mod server;

#[cfg(test)]
mod tests;

pub use self::client::ProcessRpcClient;
pub use self::descriptor::{PluginDescriptor, PluginKind, PluginMeta};
pub use self::error::PluginError;
pub use self::orchestrator::{
    Orchestrator, PluginClient, PluginLauncher, ProcessLauncher, StartOutcome,
};
pub use self::pipeline::{MODEL_KEY, Pipeline, Stage, StageError, TransformationContext};
pub use self::protocol::{RpcError, RpcRequest, RpcResponse};
pub use self::server::{ServeError, ToolError, ToolHandler};
