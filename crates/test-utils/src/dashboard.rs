// crates/test-utils/src/dashboard.rs

use std::sync::{Arc, Mutex};

use tagforge::dashboard::{Dashboard, Task, TaskState, Verbosity};

/// A dashboard that:
/// - records every task state transition, keyed by the task's label
/// - records all task output
///
/// Clones share the same records, so tests can keep a handle while the
/// driver owns the dashboard.
#[derive(Debug, Clone, Default)]
pub struct MemoryDashboard {
    states: Arc<Mutex<Vec<(String, TaskState)>>>,
    outputs: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded states for tasks with the given label, in order.
    pub fn states_of(&self, label: &str) -> Vec<TaskState> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, s)| *s)
            .collect()
    }

    pub fn last_state_of(&self, label: &str) -> Option<TaskState> {
        self.states_of(label).last().copied()
    }

    /// Labels in the order their tasks were begun, including repeats when a
    /// label is begun more than once.
    pub fn begun_labels(&self) -> Vec<String> {
        self.states
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s)| *s == TaskState::Pending)
            .map(|(l, _)| l.clone())
            .collect()
    }

    /// Concatenated output of tasks with the given label.
    pub fn output_of(&self, label: &str) -> String {
        self.outputs
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| l == label)
            .map(|(_, t)| t.as_str())
            .collect()
    }
}

impl Dashboard for MemoryDashboard {
    fn begin_task(&mut self, _verb: &str, noun: &str, _verbosity: Verbosity) -> Box<dyn Task> {
        // Record the begin itself as a Pending marker so tests can count
        // how many tasks were created per label.
        self.states
            .lock()
            .unwrap()
            .push((noun.to_string(), TaskState::Pending));
        Box::new(MemoryTask {
            label: noun.to_string(),
            states: self.states.clone(),
            outputs: self.outputs.clone(),
        })
    }
}

struct MemoryTask {
    label: String,
    states: Arc<Mutex<Vec<(String, TaskState)>>>,
    outputs: Arc<Mutex<Vec<(String, String)>>>,
}

impl Task for MemoryTask {
    fn set_state(&mut self, state: TaskState) {
        self.states.lock().unwrap().push((self.label.clone(), state));
    }

    fn add_output(&mut self, text: &str) {
        self.outputs
            .lock()
            .unwrap()
            .push((self.label.clone(), text.to_string()));
    }
}
