// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::errors::Result;

use super::driver::Driver;
use super::DriverEvent;

/// Runtime options used by the event loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, exit once no actions are pending or active (one-shot build).
    /// Otherwise keep waiting for external events such as
    /// [`DriverEvent::SourceChanged`] (watch mode).
    pub exit_when_idle: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_idle: true,
        }
    }
}

/// The IO shell around [`Driver`].
///
/// Reads events from the channel and feeds them into the driver, which is
/// the single mutator of all build state. This loop runs as one task; the
/// parallelism of a build is external work (processes, IO) reporting back
/// through [`super::ActionHandle`]s.
pub struct Runtime {
    driver: Driver,
    events: UnboundedReceiver<DriverEvent>,
    options: RuntimeOptions,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        driver: Driver,
        events: UnboundedReceiver<DriverEvent>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            driver,
            events,
            options,
        }
    }

    /// Main event loop. Returns the driver so callers can inspect the final
    /// state of the build.
    pub async fn run(mut self) -> Result<Driver> {
        info!("build runtime started");

        loop {
            // Settle everything already queued without blocking.
            loop {
                match self.events.try_recv() {
                    Ok(event) => self.driver.dispatch(event)?,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        info!("event channel closed; exiting");
                        return Ok(self.driver);
                    }
                }
            }

            if self.options.exit_when_idle && self.driver.is_idle() {
                debug!("driver idle; stopping runtime");
                break;
            }

            match self.events.recv().await {
                Some(event) => self.driver.dispatch(event)?,
                None => break,
            }
        }

        info!("build runtime exiting");
        Ok(self.driver)
    }
}
