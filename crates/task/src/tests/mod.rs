use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use mts_core::{TraceHook, TraceRecord};

use crate::task::{TaskBehavior, TaskContext};

mod connect;
mod manager;

/// Behavior that does nothing.
struct Idle;

impl TaskBehavior for Idle {
    fn run(&mut self, _ctx: &mut TaskContext<'_>) {}
}

fn recording_hook() -> (TraceHook, Arc<Mutex<Vec<TraceRecord>>>) {
    let records = Arc::new(Mutex::new(Vec::new()));
    let probe = records.clone();
    let hook: TraceHook = Arc::new(move |record: &TraceRecord| probe.lock().push(record.clone()));
    (hook, records)
}

/// Polls `condition` every millisecond until it holds or `timeout` passes.
fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
