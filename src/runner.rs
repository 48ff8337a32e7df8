//! Local task runner
//!
//! Executes expanded invocations concurrently on tokio:
//! - Arc for cheap task id sharing
//! - JoinSet to collect results as they finish
//! - No ordering guarantee across fan-out items
//!
//! A task's only side effect is displaying its payload: it renders the
//! payload, prints it (when echo is on) and records a `Displayed` event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{HyperflowError, Result};
use crate::event_log::{EventKind, EventLog};
use crate::output::OutputFormat;
use crate::workflow::TaskInvocation;

/// Result of one invocation
struct TaskOutcome {
    task_id: Arc<str>,
    error: Option<String>,
    duration: Duration,
}

/// Counters for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct Runner {
    invocations: Vec<TaskInvocation>,
    format: OutputFormat,
    event_log: EventLog,
    echo: bool,
}

impl Runner {
    pub fn new(invocations: Vec<TaskInvocation>, format: OutputFormat, event_log: EventLog) -> Self {
        Self {
            invocations,
            format,
            event_log,
            echo: true,
        }
    }

    /// Print progress and payloads to stdout (on by default)
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    async fn execute(
        invocation: TaskInvocation,
        format: OutputFormat,
        event_log: EventLog,
        echo: bool,
    ) -> TaskOutcome {
        let start = Instant::now();
        let TaskInvocation { task_id, payload } = invocation;

        event_log.emit(EventKind::TaskStarted {
            task_id: Arc::clone(&task_id),
            inputs: payload.clone(),
        });

        let error = match format.render(&payload) {
            Ok(rendered) => {
                if echo {
                    // One call per task so concurrent output never interleaves
                    println!("  {} {}\n{}", "▸".cyan(), &*task_id, indent(&rendered));
                }
                event_log.emit(EventKind::Displayed {
                    task_id: Arc::clone(&task_id),
                    rendered,
                });
                event_log.emit(EventKind::TaskCompleted {
                    task_id: Arc::clone(&task_id),
                    duration_ms: start.elapsed().as_millis() as u64,
                });
                None
            }
            Err(e) => {
                event_log.emit(EventKind::TaskFailed {
                    task_id: Arc::clone(&task_id),
                    error: e.to_string(),
                });
                Some(e.to_string())
            }
        };

        TaskOutcome {
            task_id,
            error,
            duration: start.elapsed(),
        }
    }

    /// Run every invocation; fails if any task fails
    #[instrument(skip(self), fields(tasks = self.invocations.len()))]
    pub async fn run(&self, run_id: &str) -> Result<RunSummary> {
        let run_start = Instant::now();
        let total = self.invocations.len();
        info!("starting run");

        self.event_log.emit(EventKind::RunStarted {
            run_id: run_id.to_string(),
            task_count: total,
        });

        if self.echo {
            println!("{} Running {} tasks...\n", "→".cyan(), total);
        }

        let mut join_set = JoinSet::new();
        for invocation in self.invocations.iter().cloned() {
            debug!(task_id = %invocation.task_id, "spawning task");
            join_set.spawn(Self::execute(
                invocation,
                self.format,
                self.event_log.clone(),
                self.echo,
            ));
        }

        let mut completed = 0;
        let mut failed = 0;

        while let Some(joined) = join_set.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let error = format!("Task panicked: {}", e);
                    self.event_log.emit(EventKind::RunFailed {
                        error: error.clone(),
                    });
                    return Err(HyperflowError::Execution(error));
                }
            };

            completed += 1;
            let status = format!("[{}/{}]", completed, total);
            let duration = format!("({:.1}s)", outcome.duration.as_secs_f32()).dimmed();

            match &outcome.error {
                None => {
                    if self.echo {
                        println!("  {} {} {} {}", status.green(), &*outcome.task_id, "✓".green(), duration);
                    }
                }
                Some(err) => {
                    failed += 1;
                    warn!(task_id = %outcome.task_id, error = %err, "task failed");
                    if self.echo {
                        println!("  {} {} {} {}", status.red(), &*outcome.task_id, "✗".red(), duration);
                        println!("      {} {}", "Error:".red(), err);
                    }
                }
            }
        }

        let summary = RunSummary {
            completed: completed - failed,
            failed,
            duration: run_start.elapsed(),
        };

        if failed > 0 {
            let error = format!("{} of {} tasks failed", failed, total);
            self.event_log.emit(EventKind::RunFailed {
                error: error.clone(),
            });
            return Err(HyperflowError::Execution(error));
        }

        self.event_log.emit(EventKind::RunCompleted {
            total_duration_ms: summary.duration.as_millis() as u64,
        });
        info!(duration_ms = summary.duration.as_millis() as u64, "run completed");
        Ok(summary)
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("      {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
