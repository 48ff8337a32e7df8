//! Task graph definition
//!
//! The graph is two steps, neither depending on the other:
//!
//! ```text
//! show_config            (whole configuration, or one selected sub-part)
//! show_column[0..n]      (one invocation per feature column)
//! ```
//!
//! [`TaskGraph::expand`] turns the steps into concrete invocations for one
//! configuration. Payloads are built from the redacted configuration, so the
//! password never reaches a task.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{HyperflowError, Result};
use crate::model::Configuration;
use crate::path::FieldPath;

pub const SHOW_CONFIG: &str = "show_config";
pub const SHOW_COLUMN: &str = "show_column";

/// One node of the task graph
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Display the configuration, or the part at `selector`
    Show {
        id: String,
        selector: Option<FieldPath>,
    },
    /// Display each feature column, one invocation per item
    MapColumns { id: String },
}

impl Step {
    pub fn id(&self) -> &str {
        match self {
            Step::Show { id, .. } | Step::MapColumns { id } => id,
        }
    }
}

/// A unit of work ready to run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskInvocation {
    pub task_id: Arc<str>,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    steps: Vec<Step>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl TaskGraph {
    /// `show_config` over everything, `show_column` over `structure.features`
    pub fn standard() -> Self {
        Self {
            steps: vec![
                Step::Show {
                    id: SHOW_CONFIG.to_string(),
                    selector: None,
                },
                Step::MapColumns {
                    id: SHOW_COLUMN.to_string(),
                },
            ],
        }
    }

    /// Narrow every show step to the sub-part at `selector`
    pub fn with_selector(mut self, selector: FieldPath) -> Self {
        for step in &mut self.steps {
            if let Step::Show { selector: current, .. } = step {
                *current = (!selector.is_root()).then(|| selector.clone());
            }
        }
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Concrete invocations for `config`, in step order
    pub fn expand(&self, config: &Configuration) -> Result<Vec<TaskInvocation>> {
        let display = config.to_display_value()?;
        let mut invocations = Vec::new();

        for step in &self.steps {
            match step {
                Step::Show { id, selector } => {
                    let payload = match selector {
                        None => display.clone(),
                        Some(path) => path.resolve(&display).cloned().ok_or_else(|| {
                            HyperflowError::InvalidSelector {
                                selector: path.to_string(),
                            }
                        })?,
                    };
                    invocations.push(TaskInvocation {
                        task_id: Arc::from(id.as_str()),
                        payload,
                    });
                }
                Step::MapColumns { id } => {
                    let columns = FieldPath::root()
                        .field("structure")
                        .field("features")
                        .resolve(&display)
                        .and_then(Value::as_array)
                        .map(Vec::as_slice)
                        .unwrap_or_default();

                    invocations.extend(columns.iter().enumerate().map(|(idx, column)| {
                        TaskInvocation {
                            task_id: Arc::from(format!("{}[{}]", id, idx)),
                            payload: column.clone(),
                        }
                    }));
                }
            }
        }

        debug!(count = invocations.len(), "expanded task graph");
        Ok(invocations)
    }
}
