// src/dashboard.rs

//! Progress sink abstraction.
//!
//! The driver reports per-action lifecycle through a [`Dashboard`], one
//! [`Task`] per action. Production embeds can use [`LogDashboard`]; tests
//! plug in a recording implementation.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done,
    Passed,
    Failed,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    Normal,
}

/// One action's progress channel.
pub trait Task {
    fn set_state(&mut self, state: TaskState);
    fn add_output(&mut self, text: &str);
}

pub trait Dashboard {
    fn begin_task(&mut self, verb: &str, noun: &str, verbosity: Verbosity) -> Box<dyn Task>;
}

/// Dashboard that forwards task transitions to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDashboard;

impl Dashboard for LogDashboard {
    fn begin_task(&mut self, verb: &str, noun: &str, verbosity: Verbosity) -> Box<dyn Task> {
        Box::new(LogTask {
            verb: verb.to_string(),
            noun: noun.to_string(),
            silent: verbosity == Verbosity::Silent,
        })
    }
}

struct LogTask {
    verb: String,
    noun: String,
    silent: bool,
}

impl Task for LogTask {
    fn set_state(&mut self, state: TaskState) {
        match state {
            TaskState::Failed | TaskState::Blocked => {
                warn!(verb = %self.verb, task = %self.noun, ?state, "task state");
            }
            _ if self.silent => {}
            _ => {
                info!(verb = %self.verb, task = %self.noun, ?state, "task state");
            }
        }
    }

    fn add_output(&mut self, text: &str) {
        for line in text.lines() {
            info!(verb = %self.verb, task = %self.noun, "{line}");
        }
    }
}
