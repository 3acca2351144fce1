// src/action.rs

//! Pluggable build steps.
//!
//! An [`ActionFactory`] declares which tags interest it and, offered a
//! (tag, file) pair, may mint an [`Action`]. The driver wraps each action in
//! its own state machine and calls [`Action::start`] with a
//! [`BuildContext`](crate::engine::BuildContext) once a concurrency slot is
//! free.

use crate::engine::BuildContext;
use crate::fs::BuildFile;
use crate::tags::Tag;

/// Handle to an action's in-flight external work.
///
/// Dropping the handle is the cancellation signal: implementations abort
/// their task or kill their process on drop. See [`crate::exec`] for the
/// stock implementations.
pub trait RunningAction {}

pub trait Action {
    /// Short verb for dashboards, e.g. "compile".
    fn verb(&self) -> &str;

    fn is_silent(&self) -> bool {
        false
    }

    /// Kick off the work.
    ///
    /// Synchronous actions resolve inputs, declare outputs, signal
    /// `ctx.passed()` / `ctx.failed()`, and return `Ok(None)`. Actions with
    /// deferred work take an [`ActionHandle`](crate::engine::ActionHandle)
    /// via `ctx.handle()`, hand back a cancellable [`RunningAction`], and
    /// signal completion through the handle later. Returning `Err` is the
    /// "threw during run" path: the action fails and its outputs are
    /// discarded.
    fn start(
        &mut self,
        ctx: &mut BuildContext<'_>,
    ) -> anyhow::Result<Option<Box<dyn RunningAction>>>;
}

pub trait ActionFactory {
    /// Tags whose registration should offer files to this factory.
    fn trigger_tags(&self) -> Vec<Tag>;

    /// Offered a newly registered (tag, file); may produce an action.
    fn try_make_action(&self, tag: &Tag, file: &BuildFile) -> Option<Box<dyn Action>>;
}
