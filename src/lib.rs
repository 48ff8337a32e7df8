//! Hyperflow - validated configuration for a gradient boosting training workflow

pub mod backend;
pub mod error;
pub mod errors;
pub mod event_log;
mod extract;
pub mod loader;
pub mod model;
pub mod output;
pub mod path;
pub mod runner;
pub mod workflow;

pub use backend::{create_backend, Backend, LocalBackend, RunHandle, SubmitOptions};
pub use error::{FixSuggestion, HyperflowError};
pub use errors::{ValidationError, ValidationReport, ValidationWarning};
pub use event_log::{Event, EventKind, EventLog};
pub use loader::{ConfigLoader, Override, SetMode};
pub use model::{Column, Configuration, Connection, Hyperparameters, Loss, Structure};
pub use output::OutputFormat;
pub use path::FieldPath;
pub use runner::{RunSummary, Runner};
pub use workflow::{Step, TaskGraph, TaskInvocation};
