//! Shared harness for the integration suites.

use std::sync::Arc;

use ribbon_core::{
    AxisSpecProvider, ErrorReporter, HostContainer, LayoutEngine, SizeSpec, TaskExecutor,
};
use ribbon_testing::{FakeLayoutEngine, ManualExecutor, RecordingHost, RecordingReporter};
use ribbon_window::{DefaultHolderFactory, WindowConfig, WindowedList};

pub struct Harness {
    pub list: WindowedList,
    pub engine: Arc<FakeLayoutEngine>,
    pub executor: Arc<ManualExecutor>,
    pub host: Arc<RecordingHost>,
    pub reporter: Arc<RecordingReporter>,
}

/// Builds an engine over a vertical list of 100-extent items.
pub fn harness(config: WindowConfig) -> Harness {
    let engine = Arc::new(FakeLayoutEngine::with_extent(100.0));
    let executor = Arc::new(ManualExecutor::new());
    let host = Arc::new(RecordingHost::new());
    let reporter = Arc::new(RecordingReporter::new());
    let list = WindowedList::with_collaborators(
        config,
        Arc::clone(&engine) as Arc<dyn LayoutEngine>,
        Arc::new(AxisSpecProvider::vertical()),
        Arc::clone(&executor) as Arc<dyn TaskExecutor>,
        Arc::clone(&host) as Arc<dyn HostContainer>,
        Arc::new(DefaultHolderFactory),
        Arc::clone(&reporter) as Arc<dyn ErrorReporter>,
    )
    .expect("config should be valid");
    Harness {
        list,
        engine,
        executor,
        host,
        reporter,
    }
}

/// Container specs: 320 wide, 300 on the scroll axis. With 100-extent
/// items this derives a per-viewport estimate of 3, and with the default
/// ratio of 2.0 a window of `[reference - 6, reference + 9]`.
pub fn container_specs() -> (SizeSpec, SizeSpec) {
    (SizeSpec::exactly(320.0), SizeSpec::exactly(300.0))
}

/// Positions whose holders are currently valid.
pub fn valid_positions(list: &WindowedList) -> Vec<usize> {
    (0..list.len())
        .filter(|&p| list.holder(p).is_some_and(|h| h.is_valid()))
        .collect()
}
