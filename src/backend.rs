//! # Execution Backends
//!
//! A backend takes a task graph plus a validated configuration and runs it
//! somewhere, handing back a [`RunHandle`] whose `url` identifies the run.
//!
//! - [`Backend`] - async submission trait
//! - [`LocalBackend`] - in-process execution on the tokio runtime
//!
//! Use [`create_backend`] to instantiate a backend by name:
//!
//! ```rust
//! use hyperflow::backend::create_backend;
//!
//! assert!(create_backend("local").is_ok());
//! assert!(create_backend("remote").is_err());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::{HyperflowError, Result};
use crate::event_log::EventLog;
use crate::model::Configuration;
use crate::output::OutputFormat;
use crate::runner::{RunSummary, Runner};
use crate::workflow::TaskGraph;

pub const DEFAULT_DOMAIN: &str = "development";
pub const DEFAULT_PROJECT: &str = "default";

/// Where and how a run is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOptions {
    pub domain: String,
    pub project: String,
    pub format: OutputFormat,
    /// Print progress and payloads while running
    pub echo: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            format: OutputFormat::default(),
            echo: true,
        }
    }
}

/// Identifies a submitted run
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub run_id: String,
    /// Opaque locator, meant to be printed
    pub url: String,
    pub summary: RunSummary,
    pub events: EventLog,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the backend name (e.g., "local")
    fn name(&self) -> &str;

    /// Run `graph` against `config`
    async fn submit(
        &self,
        graph: &TaskGraph,
        config: Arc<Configuration>,
        options: &SubmitOptions,
    ) -> Result<RunHandle>;
}

/// Runs the graph in this process
#[derive(Debug, Default, Clone)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn submit(
        &self,
        graph: &TaskGraph,
        config: Arc<Configuration>,
        options: &SubmitOptions,
    ) -> Result<RunHandle> {
        let invocations = graph.expand(&config)?;
        let run_id = Uuid::new_v4().to_string();
        let url = format!("local://{}/{}/{}", options.domain, options.project, run_id);
        info!(%run_id, domain = %options.domain, project = %options.project, "submitting run");

        let events = EventLog::new();
        let summary = Runner::new(invocations, options.format, events.clone())
            .echo(options.echo)
            .run(&run_id)
            .await?;

        Ok(RunHandle {
            run_id,
            url,
            summary,
            events,
        })
    }
}

/// Create a backend by name
pub fn create_backend(name: &str) -> Result<Box<dyn Backend>> {
    match name.to_lowercase().as_str() {
        "local" => Ok(Box::new(LocalBackend::new())),
        _ => Err(HyperflowError::UnknownBackend {
            name: name.to_string(),
        }),
    }
}
