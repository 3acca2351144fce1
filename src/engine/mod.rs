// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the fact tables (tag table, dependency table, trigger map)
//! - the per-action state machine and its build context
//! - the event loop that reacts to:
//!   - scheduled action starts
//!   - completion signals from actions and their deferred work
//!   - source-change notifications
//!
//! All driver state is mutated from exactly one place: [`Driver::dispatch`],
//! fed by the [`runtime`] event loop. Everything that the original design
//! did with injected callback objects is a [`DriverEvent`] here; the
//! "one async callback slot per action" rule is enforced by the per-action
//! epoch carried in every event.

use tokio::sync::mpsc::UnboundedSender;

use crate::tags::ActionId;

pub mod action_driver;
pub mod driver;
pub mod prefer;
pub mod runtime;

pub use action_driver::{ActionState, BuildContext, Outcome};
pub use driver::Driver;
pub use runtime::{Runtime, RuntimeOptions};

/// Completion signals an action (or its deferred work) sends back to the
/// driver.
#[derive(Debug, Clone)]
pub enum ActionSignal {
    Passed,
    Failed { message: Option<String> },
    /// The action's work ran dry without an explicit verdict.
    Finished,
    Log(String),
}

/// Events flowing into the driver's event loop.
///
/// `epoch` is the action's scheduling generation at enqueue time; an event
/// whose epoch no longer matches was cancelled by a reset and is dropped on
/// receipt.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// Deferred start scheduled by the pump.
    StartAction { action: ActionId, epoch: u64 },
    /// Deferred end-of-run bookkeeping scheduled by a completion signal.
    ActionDone { action: ActionId, epoch: u64 },
    /// Completion or log traffic from the action side.
    Signal {
        action: ActionId,
        epoch: u64,
        signal: ActionSignal,
    },
    /// A source file was added, modified, or deleted.
    SourceChanged { name: String },
}

/// Cloneable, Send handle through which an action's deferred work reports
/// back. Obtained from [`BuildContext::handle`].
#[derive(Debug, Clone)]
pub struct ActionHandle {
    tx: UnboundedSender<DriverEvent>,
    action: ActionId,
    epoch: u64,
}

impl ActionHandle {
    pub(crate) fn new(tx: UnboundedSender<DriverEvent>, action: ActionId, epoch: u64) -> Self {
        Self { tx, action, epoch }
    }

    fn send(&self, signal: ActionSignal) {
        // The runtime may already be gone; a dropped signal is then moot.
        let _ = self.tx.send(DriverEvent::Signal {
            action: self.action,
            epoch: self.epoch,
            signal,
        });
    }

    pub fn passed(&self) {
        self.send(ActionSignal::Passed);
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.send(ActionSignal::Failed {
            message: Some(message.into()),
        });
    }

    /// Report that the work ran to completion without a verdict; the action
    /// finishes as `Done` unless a verdict already landed.
    pub fn finished(&self) {
        self.send(ActionSignal::Finished);
    }

    pub fn log(&self, text: impl Into<String>) {
        self.send(ActionSignal::Log(text.into()));
    }
}
