//! Crate-level test doubles and BDD tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Value, json};

use crate::descriptor::{PluginDescriptor, PluginMeta};
use crate::error::PluginError;
use crate::orchestrator::{PluginClient, PluginLauncher};


/// Shared record of every client operation, in call order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, entry: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// How a stub plugin behaves once prepared.
#[derive(Debug, Clone)]
pub(crate) enum StubBehaviour {
    /// Completes the handshake and answers every invocation.
    Serve(PluginMeta),
    /// Fails in `start`.
    FailLaunch,
    /// Starts but dies during the handshake.
    FailHandshake,
    /// Completes the handshake then dies on the first invocation.
    ExitAfterHandshake(PluginMeta),
    /// Serves normally but panics when stopped.
    PanicOnStop(PluginMeta),
}

/// Launcher handing out scripted in-memory clients keyed by descriptor id.
#[derive(Debug, Default)]
pub(crate) struct StubLauncher {
    behaviours: HashMap<String, StubBehaviour>,
    log: CallLog,
}

impl StubLauncher {
    pub(crate) fn with_plugin(mut self, id: &str, behaviour: StubBehaviour) -> Self {
        self.behaviours.insert(id.to_owned(), behaviour);
        self
    }

    pub(crate) fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl PluginLauncher for StubLauncher {
    type Client = StubClient;

    fn prepare(&self, descriptor: &PluginDescriptor, command: Vec<String>) -> StubClient {
        let id = descriptor.id().to_owned();
        self.log
            .record(format!("prepare:{id}:{}", command.join(" ")));
        let behaviour = self
            .behaviours
            .get(&id)
            .cloned()
            .unwrap_or(StubBehaviour::FailLaunch);
        StubClient {
            id,
            behaviour,
            log: self.log.clone(),
        }
    }
}

/// In-memory client following a [`StubBehaviour`] script.
#[derive(Debug)]
pub(crate) struct StubClient {
    id: String,
    behaviour: StubBehaviour,
    log: CallLog,
}

impl StubClient {
    fn terminated(&self, method: &str) -> PluginError {
        PluginError::Terminated {
            id: self.id.clone(),
            method: method.to_owned(),
        }
    }
}

impl PluginClient for StubClient {
    fn start(&self) -> Result<(), PluginError> {
        self.log.record(format!("start:{}", self.id));
        match self.behaviour {
            StubBehaviour::FailLaunch => Err(PluginError::Launch {
                id: self.id.clone(),
                message: String::from("executable not found: stub"),
                source: None,
            }),
            _ => Ok(()),
        }
    }

    fn fetch_meta(&self) -> Result<PluginMeta, PluginError> {
        self.log.record(format!("get_meta:{}", self.id));
        match &self.behaviour {
            StubBehaviour::Serve(meta)
            | StubBehaviour::ExitAfterHandshake(meta)
            | StubBehaviour::PanicOnStop(meta) => Ok(meta.clone()),
            StubBehaviour::FailLaunch | StubBehaviour::FailHandshake => {
                Err(self.terminated("get_meta"))
            }
        }
    }

    fn invoke(&self, tool: &str, args: Value) -> Result<Value, PluginError> {
        self.log.record(format!("invoke:{}:{tool}", self.id));
        match self.behaviour {
            StubBehaviour::Serve(_) | StubBehaviour::PanicOnStop(_) => {
                Ok(json!({"plugin": self.id, "tool": tool, "args": args}))
            }
            _ => Err(self.terminated("invoke")),
        }
    }

    fn stop(&self) {
        self.log.record(format!("stop:{}", self.id));
        if matches!(self.behaviour, StubBehaviour::PanicOnStop(_)) {
            panic!("stub client {} refuses to stop", self.id);
        }
    }
}

/// Metadata for a stub plugin declaring `capabilities`.
pub(crate) fn stub_meta(name: &str, capabilities: &[&str]) -> PluginMeta {
    PluginMeta::new(name, "1.0.0", "stub", capabilities.iter().copied())
}
