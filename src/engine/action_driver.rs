// src/engine/action_driver.rs

//! Per-action state machine and the build context handed to running actions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::action::{Action, ActionFactory, RunningAction};
use crate::dashboard::Task;
use crate::errors::{DriverError, Result};
use crate::fs::BuildFile;
use crate::tags::{ActionId, ContentHash, ProvisionId, Tag};

use super::driver::Driver;
use super::ActionHandle;

/// Terminal verdict of one action run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran out of events without an explicit verdict.
    Done,
    Passed,
    Failed,
}

/// Lifecycle of an action driver.
///
/// A completion signal while running only records the outcome; the action
/// stays `Running` (and its build context stays live) until the deferred
/// done event performs the end-of-run bookkeeping and finalizes the state to
/// `Completed`. Dropping `op` is the cancellation signal for any external
/// work.
pub enum ActionState {
    Pending,
    Running {
        outcome: Option<Outcome>,
        op: Option<Box<dyn RunningAction>>,
    },
    Completed {
        outcome: Outcome,
    },
}

impl fmt::Debug for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionState::Pending => write!(f, "Pending"),
            ActionState::Running { outcome, op } => f
                .debug_struct("Running")
                .field("outcome", outcome)
                .field("op", &op.is_some())
                .finish(),
            ActionState::Completed { outcome } => {
                f.debug_struct("Completed").field("outcome", outcome).finish()
            }
        }
    }
}

/// One action plus everything the driver tracks about it.
pub(crate) struct ActionDriver {
    /// Taken out of the slot while `Action::start` runs.
    pub(crate) action: Option<Box<dyn Action>>,
    pub(crate) src: BuildFile,
    pub(crate) src_hash: ContentHash,
    pub(crate) task: Box<dyn Task>,
    pub(crate) state: ActionState,
    /// Scheduling generation. Bumped whenever queued events for this action
    /// must be cancelled (reset, forced failure); events carrying an older
    /// epoch are dropped by the dispatcher.
    pub(crate) epoch: u64,
    /// Provisions owned by this action, not yet (or already) published.
    pub(crate) provisions: Vec<ProvisionId>,
    /// Tags accumulated per provision; published in one go at end of run.
    pub(crate) provided_tags: HashMap<ProvisionId, Vec<Tag>>,
    pub(crate) outputs: Vec<BuildFile>,
}

impl ActionDriver {
    pub(crate) fn new(
        action: Box<dyn Action>,
        src: BuildFile,
        src_hash: ContentHash,
        task: Box<dyn Task>,
    ) -> Self {
        Self {
            action: Some(action),
            src,
            src_hash,
            task,
            state: ActionState::Pending,
            epoch: 0,
            provisions: Vec::new(),
            provided_tags: HashMap::new(),
            outputs: Vec::new(),
        }
    }

    /// True from the moment scheduling commits until end-of-run bookkeeping
    /// has finished.
    pub(crate) fn is_active(&self) -> bool {
        matches!(self.state, ActionState::Running { .. })
    }

    pub(crate) fn outcome(&self) -> Option<Outcome> {
        match self.state {
            ActionState::Pending => None,
            ActionState::Running { outcome, .. } => outcome,
            ActionState::Completed { outcome } => Some(outcome),
        }
    }
}

/// The capability a running action uses to read inputs and publish outputs.
///
/// Every operation requires the action to be live; once its run has been
/// accounted for, all of these fail with [`DriverError::ActionNotRunning`].
pub struct BuildContext<'a> {
    driver: &'a mut Driver,
    action: ActionId,
    deferred: bool,
}

impl<'a> BuildContext<'a> {
    pub(crate) fn new(driver: &'a mut Driver, action: ActionId) -> Self {
        Self {
            driver,
            action,
            deferred: false,
        }
    }

    pub(crate) fn took_handle(&self) -> bool {
        self.deferred
    }

    fn ensure_running(&self) -> Result<()> {
        if self.driver.action_is_active(self.action) {
            Ok(())
        } else {
            Err(DriverError::ActionNotRunning)
        }
    }

    /// The file this action was created from.
    pub fn source(&self) -> Result<BuildFile> {
        self.ensure_running()?;
        self.driver
            .action_source(self.action)
            .ok_or(DriverError::ActionNotRunning)
    }

    /// Consult the tag table for the preferred provider of `tag`, recording
    /// the dependency either way.
    pub fn find_provider(&mut self, tag: &Tag) -> Result<Option<BuildFile>> {
        self.ensure_running()?;
        Ok(self.driver.find_provider_for(self.action, tag))
    }

    /// Shorthand for [`find_provider`](Self::find_provider) on the exact-file
    /// tag of `path`.
    pub fn find_input(&mut self, path: &str) -> Result<Option<BuildFile>> {
        self.find_provider(&Tag::from_file(path))
    }

    /// Declare that `file` supplies `tags`. Tags accumulate on an existing
    /// provision for the same file; publication happens when the run ends.
    pub fn provide(&mut self, file: &BuildFile, tags: Vec<Tag>) -> Result<()> {
        self.ensure_running()?;
        self.driver.provide_for(self.action, file, tags);
        Ok(())
    }

    /// Resolve `path` under the output root, create parent directories, and
    /// provide it with the default tag.
    pub fn new_output(&mut self, path: &str) -> Result<BuildFile> {
        self.ensure_running()?;
        let file = self.driver.tmp().relative(path);
        if let Some(parent) = file.parent() {
            parent.create_directory()?;
        }
        self.driver
            .provide_for(self.action, &file, vec![Tag::default_tag()]);
        self.driver.record_output(self.action, file.clone());
        Ok(file)
    }

    /// Append to the action's dashboard output.
    pub fn log(&mut self, text: &str) -> Result<()> {
        self.ensure_running()?;
        self.driver.task_output(self.action, text);
        Ok(())
    }

    /// Register a factory discovered mid-build and immediately offer it
    /// every existing provider of its trigger tags.
    pub fn add_action_type(&mut self, factory: Arc<dyn ActionFactory>) -> Result<()> {
        self.ensure_running()?;
        let idx = self.driver.register_factory(factory);
        self.driver.rescan_for_new_factory(idx);
        Ok(())
    }

    pub fn passed(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.driver.signal_passed(self.action);
        Ok(())
    }

    /// Report failure. Erroring after a success verdict is a misuse and is
    /// returned as such.
    pub fn failed(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.driver.signal_failed(self.action)
    }

    /// Obtain a handle for deferred completion. Taking a handle tells the
    /// driver not to conclude the run when `start` returns without a
    /// verdict.
    pub fn handle(&mut self) -> ActionHandle {
        self.deferred = true;
        self.driver.make_handle(self.action)
    }
}
