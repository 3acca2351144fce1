// crates/test-utils/src/fixtures.rs

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use tagforge::dashboard::Dashboard;
use tagforge::engine::{Driver, DriverEvent};
use tagforge::errors::Result;
use tagforge::fs::{mock::MockFileSystem, BuildFile, FileSystem};

use crate::dashboard::MemoryDashboard;

/// Build a mock source tree. Paths are workspace-relative, e.g.
/// `("src/a.in", "contents")`.
pub fn mock_tree(files: &[(&str, &str)]) -> (Arc<MockFileSystem>, BuildFile, BuildFile) {
    let mock = Arc::new(MockFileSystem::new());
    mock.add_dir("src");
    for (path, content) in files {
        mock.add_file(path, content.as_bytes().to_vec());
    }
    let fs: Arc<dyn FileSystem> = mock.clone();
    let src = BuildFile::new(fs.clone(), "src");
    let tmp = BuildFile::new(fs, "tmp");
    (mock, src, tmp)
}

/// A driver plus its event channel and recording dashboard, stepped
/// synchronously. Used by scenario tests that want deterministic control
/// over event order; runtime-level tests go through
/// [`tagforge::engine::Runtime`] instead.
pub struct TestDriver {
    pub driver: Driver,
    pub events: UnboundedReceiver<DriverEvent>,
    pub dashboard: MemoryDashboard,
    pub mock: Arc<MockFileSystem>,
}

impl TestDriver {
    pub fn new(files: &[(&str, &str)], max_concurrent: usize) -> Result<Self> {
        let (mock, src, tmp) = mock_tree(files);
        let dashboard = MemoryDashboard::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(
            Box::new(dashboard.clone()) as Box<dyn Dashboard>,
            src,
            tmp,
            max_concurrent,
            tx,
        )?;
        Ok(Self {
            driver,
            events: rx,
            dashboard,
            mock,
        })
    }

    /// Dispatch queued events until the channel runs dry.
    pub fn drain(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.driver.dispatch(event)?;
        }
        Ok(())
    }

    /// Start the driver and settle the whole (synchronous) build.
    pub fn run_to_idle(&mut self) -> Result<()> {
        self.driver.start()?;
        self.drain()
    }

    /// Notify the driver of a source change and settle the fallout.
    pub fn source_changed(&mut self, name: &str) -> Result<()> {
        self.driver.dispatch(DriverEvent::SourceChanged {
            name: name.to_string(),
        })?;
        self.drain()
    }
}
