// src/exec.rs

//! Cancellation plumbing for actions with deferred work.
//!
//! The driver never launches processes itself; actions do. What the driver
//! needs is a uniform way to cancel whatever an action left running when the
//! action is reset. Both helpers here cancel on drop, which is the only
//! signal the driver sends.

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::action::RunningAction;

/// Aborts the wrapped tokio task when dropped.
pub struct AbortOnDrop(JoinHandle<()>);

impl AbortOnDrop {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl RunningAction for AbortOnDrop {}

/// Guard half of a cancel channel.
///
/// The worker holds the receiver and treats its completion (the guard was
/// dropped) as a request to stop, e.g. by killing a child process. Actions
/// that spawn processes should pair this with `kill_on_drop` on the child.
pub struct CancelGuard {
    _tx: oneshot::Sender<()>,
}

impl RunningAction for CancelGuard {}

/// Create a cancel guard plus the receiver the worker should select on.
pub fn cancel_pair() -> (CancelGuard, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    (CancelGuard { _tx: tx }, rx)
}

/// Spawn deferred work for an action. Dropping the returned guard aborts
/// the task.
pub fn spawn_deferred<F>(future: F) -> Box<dyn RunningAction>
where
    F: Future<Output = ()> + Send + 'static,
{
    Box::new(AbortOnDrop(tokio::spawn(future)))
}
