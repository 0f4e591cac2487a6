//! The tracking worker: consumes the event stream, reconciles leaks.

use std::io::BufRead;
use std::thread;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::channel::EventReader;
use crate::error::TrackError;
use crate::error::TrackResult;
use crate::event::Event;
use crate::registry::ResourceRegistry;
use crate::unlink::ResourceUnlinker;

/// Outcome of shutdown-time reconciliation, returned through the worker
/// thread's join handle.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Names still registered when the channel closed, in cleanup order.
    pub leaked: Vec<String>,
    /// Subset of `leaked` whose OS-level unlink failed.
    pub failed: Vec<String>,
}

impl ReconcileReport {
    /// True when nothing leaked.
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty()
    }
}

/// Single-owner consumer of the event channel.
///
/// Lifecycle: read until end-of-stream, reconcile once, terminate. The
/// registry never escapes the worker; the rest of the process only sees
/// the final [`ReconcileReport`], post-join.
pub struct TrackingWorker<U> {
    registry: ResourceRegistry,
    unlinker: U,
}

impl<U: ResourceUnlinker> TrackingWorker<U> {
    pub fn new(unlinker: U) -> Self {
        Self {
            registry: ResourceRegistry::new(),
            unlinker,
        }
    }

    /// Consumes the stream until end-of-stream, then reconciles.
    ///
    /// Event-level failures (parse errors, unknown unregisters) are
    /// reported and never end the loop; only transport EOF or a
    /// transport read error does.
    pub fn run(mut self, reader: impl BufRead) -> ReconcileReport {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if let Err(err) = self.apply_line(&line) {
                        warn!(line = %line, error = %err, "dropping event");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "event channel read failed, reconciling early");
                    break;
                }
            }
        }
        debug!("event channel closed");
        self.reconcile()
    }

    fn apply_line(&mut self, line: &str) -> TrackResult<()> {
        match Event::parse(line)? {
            Event::Register(name) => {
                if self.registry.add(&name) {
                    debug!(name = %name, "registered");
                } else {
                    debug!(name = %name, "duplicate register, already tracked");
                }
                Ok(())
            }
            Event::Unregister(name) => {
                if self.registry.remove(&name) {
                    debug!(name = %name, "unregistered");
                    Ok(())
                } else {
                    Err(TrackError::UntrackedName(name))
                }
            }
        }
    }

    /// Shutdown-time cleanup: every name still registered is a leak and
    /// gets exactly one unlink attempt. A failure for one name must not
    /// stop the attempts for the rest.
    fn reconcile(mut self) -> ReconcileReport {
        let leaked = self.registry.drain();
        if leaked.is_empty() {
            return ReconcileReport::default();
        }

        warn!(
            count = leaked.len(),
            "tracked processes appear to have leaked semaphores"
        );

        let mut failed = Vec::new();
        for name in &leaked {
            match self.unlinker.unlink(name) {
                Ok(()) => info!(name = %name, "unlinked leaked semaphore"),
                Err(err) => {
                    warn!(name = %name, error = %err, "failed to unlink leaked semaphore");
                    failed.push(name.clone());
                }
            }
        }

        ReconcileReport { leaked, failed }
    }
}

/// Spawns the worker on a named thread bound to the channel's read end.
pub fn spawn<U>(
    reader: EventReader,
    unlinker: U,
    thread_name: &str,
) -> std::io::Result<JoinHandle<ReconcileReport>>
where
    U: ResourceUnlinker + 'static,
{
    thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || TrackingWorker::new(unlinker).run(reader.into_buffered()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::Mutex;

    use test_log::test;

    use super::*;

    /// Records every unlink attempt; fails the names it is told to.
    #[derive(Default)]
    struct RecordingUnlinker {
        calls: Mutex<Vec<String>>,
        fail: Mutex<HashSet<String>>,
    }

    impl RecordingUnlinker {
        fn fail_on(&self, name: &str) {
            self.fail.lock().expect("not poisoned").insert(name.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("not poisoned").clone()
        }
    }

    impl ResourceUnlinker for RecordingUnlinker {
        fn unlink(&self, name: &str) -> io::Result<()> {
            self.calls.lock().expect("not poisoned").push(name.to_string());
            if self.fail.lock().expect("not poisoned").contains(name) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "mock failure"));
            }
            Ok(())
        }
    }

    fn run_script(script: &str, unlinker: Arc<RecordingUnlinker>) -> ReconcileReport {
        TrackingWorker::new(unlinker).run(Cursor::new(script.as_bytes()))
    }

    #[test]
    fn balanced_traffic_leaves_nothing() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        let report = run_script(
            "REGISTER:sem_a\nUNREGISTER:sem_a\n",
            Arc::clone(&unlinker),
        );
        assert!(report.is_clean());
        assert!(unlinker.calls().is_empty());
    }

    #[test]
    fn leaked_name_unlinked_exactly_once() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        let report = run_script(
            "REGISTER:sem_a\nREGISTER:sem_b\nUNREGISTER:sem_a\n",
            Arc::clone(&unlinker),
        );
        assert_eq!(report.leaked, vec!["sem_b"]);
        assert!(report.failed.is_empty());
        // sem_b cleaned exactly once, sem_a never touched.
        assert_eq!(unlinker.calls(), vec!["sem_b"]);
    }

    #[test]
    fn malformed_line_does_not_end_the_loop() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        let report = run_script(
            "GARBAGE:x\nnot a line\nREGISTER:sem_a\n",
            Arc::clone(&unlinker),
        );
        assert_eq!(report.leaked, vec!["sem_a"]);
        assert_eq!(unlinker.calls(), vec!["sem_a"]);
    }

    #[test]
    fn unknown_unregister_is_reported_not_fatal() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        let report = run_script(
            "UNREGISTER:sem_c\nREGISTER:sem_d\n",
            Arc::clone(&unlinker),
        );
        assert_eq!(report.leaked, vec!["sem_d"]);
    }

    #[test]
    fn duplicate_register_collapses_to_one_entry() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        let report = run_script(
            "REGISTER:sem_shared\nREGISTER:sem_shared\nUNREGISTER:sem_shared\n",
            Arc::clone(&unlinker),
        );
        assert!(report.is_clean());
        assert!(unlinker.calls().is_empty());
    }

    #[test]
    fn unlink_failure_does_not_stop_remaining_names() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        unlinker.fail_on("sem_bad");
        let report = run_script(
            "REGISTER:sem_bad\nREGISTER:sem_good\n",
            Arc::clone(&unlinker),
        );
        assert_eq!(report.leaked, vec!["sem_bad", "sem_good"]);
        assert_eq!(report.failed, vec!["sem_bad"]);
        assert_eq!(unlinker.calls(), vec!["sem_bad", "sem_good"]);
    }

    #[test]
    fn order_across_names_does_not_matter() {
        let unlinker = Arc::new(RecordingUnlinker::default());
        let report = run_script(
            "REGISTER:b\nREGISTER:a\nUNREGISTER:b\nREGISTER:c\n",
            Arc::clone(&unlinker),
        );
        assert_eq!(report.leaked, vec!["a", "c"]);
    }
}
