// src/lib.rs

pub mod action;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod tags;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::action::ActionFactory;
use crate::config::BuildConfig;
use crate::dashboard::Dashboard;
use crate::engine::{Driver, Runtime, RuntimeOptions};
use crate::errors::Result;
use crate::fs::{BuildFile, FileSystem};

pub use crate::engine::driver::BuildSummary;

/// High-level one-shot build entry point.
///
/// This wires together:
/// - the driver (tables, queues, scanning)
/// - the registered action factories
/// - the event loop
///
/// and runs until the build is idle, returning per-outcome counts.
pub async fn run_build(
    filesystem: Arc<dyn FileSystem>,
    dashboard: Box<dyn Dashboard>,
    config: &BuildConfig,
    factories: Vec<Arc<dyn ActionFactory>>,
) -> Result<BuildSummary> {
    let src = BuildFile::new(filesystem.clone(), config.src_dir.clone());
    let tmp = BuildFile::new(filesystem.clone(), config.tmp_dir.clone());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut driver = Driver::new(
        dashboard,
        src,
        tmp,
        config.max_concurrent_actions,
        events_tx,
    )?;
    for factory in factories {
        driver.add_action_factory(factory);
    }
    driver.start()?;

    let runtime = Runtime::new(
        driver,
        events_rx,
        RuntimeOptions {
            exit_when_idle: true,
        },
    );
    let driver = runtime.run().await?;

    let summary = driver.summary();
    info!(?summary, "build finished");
    Ok(summary)
}
