//! Process-wide tracker facade.

use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::info;

use crate::channel;
use crate::channel::EventWriter;
use crate::config::TrackerConfig;
use crate::error::TrackError;
use crate::error::TrackResult;
use crate::event;
use crate::event::Event;
use crate::unlink::ResourceUnlinker;
use crate::unlink::SemUnlinker;
use crate::worker;
use crate::worker::ReconcileReport;

enum State {
    Idle,
    Running {
        writer: EventWriter,
        worker: JoinHandle<ReconcileReport>,
    },
    Terminated,
}

/// Facade over the event channel and the tracking worker.
///
/// One instance per process, or per process-tree root with descendants
/// inheriting the write end. Start is lazy and idempotent; teardown
/// happens implicitly when every write end closes, or explicitly via
/// [`shutdown`](SemTracker::shutdown).
pub struct SemTracker {
    config: TrackerConfig,
    unlinker: Arc<dyn ResourceUnlinker>,
    state: Mutex<State>,
}

impl Default for SemTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SemTracker {
    /// Tracker with default config and the POSIX semaphore unlinker.
    pub fn new() -> Self {
        Self::with_unlinker(TrackerConfig::default(), SemUnlinker)
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self::with_unlinker(config, SemUnlinker)
    }

    /// Dependency-injecting constructor for composition roots and tests.
    pub fn with_unlinker<U>(config: TrackerConfig, unlinker: U) -> Self
    where
        U: ResourceUnlinker + 'static,
    {
        Self {
            config,
            unlinker: Arc::new(unlinker),
            state: Mutex::new(State::Idle),
        }
    }

    /// Lazily starts the channel and the tracking worker.
    ///
    /// Safe to call from any number of threads; every call after the
    /// first observes the already-running instance and returns without
    /// creating a second channel or thread.
    pub fn ensure_running(&self) -> TrackResult<()> {
        let mut state = self.lock_state();
        match *state {
            State::Running { .. } => return Ok(()),
            State::Terminated => return Err(TrackError::Terminated),
            State::Idle => {}
        }

        let (reader, writer) = channel::channel()?;
        let worker = worker::spawn(reader, Arc::clone(&self.unlinker), &self.config.thread_name)?;
        info!(
            write_fd = writer.as_raw_fd(),
            thread = %self.config.thread_name,
            "semaphore tracker started"
        );
        *state = State::Running { writer, worker };
        Ok(())
    }

    /// Announces that `name` is about to be created.
    pub fn register(&self, name: &str) -> TrackResult<()> {
        self.send(Event::Register(name.to_string()))
    }

    /// Announces that `name` has been released by its owner.
    pub fn unregister(&self, name: &str) -> TrackResult<()> {
        self.send(Event::Unregister(name.to_string()))
    }

    fn send(&self, event: Event) -> TrackResult<()> {
        event::validate_name(event.name())?;
        match &*self.lock_state() {
            State::Running { writer, .. } => writer.send(&event),
            State::Idle => Err(TrackError::NotRunning),
            State::Terminated => Err(TrackError::Terminated),
        }
    }

    /// Numeric write-end handle for worker processes to inherit.
    /// `None` until [`ensure_running`](SemTracker::ensure_running).
    pub fn getfd(&self) -> Option<RawFd> {
        match &*self.lock_state() {
            State::Running { writer, .. } => Some(writer.as_raw_fd()),
            _ => None,
        }
    }

    /// Closes this process's write end and joins the worker.
    ///
    /// When this was the last write end in the process tree, the worker
    /// observes end-of-stream, reconciles, and its report is returned.
    /// The tracker is terminated afterwards; construct a new instance to
    /// resume tracking.
    pub fn shutdown(&self) -> Option<ReconcileReport> {
        let previous = {
            let mut state = self.lock_state();
            std::mem::replace(&mut *state, State::Terminated)
        };
        match previous {
            State::Running { writer, worker } => {
                drop(writer);
                match worker.join() {
                    Ok(report) => Some(report),
                    Err(_) => {
                        debug!("tracking worker panicked before reporting");
                        None
                    }
                }
            }
            _ => None,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-wide tracker for callers without a composition root.
pub fn global() -> &'static SemTracker {
    static GLOBAL_TRACKER: OnceLock<SemTracker> = OnceLock::new();
    GLOBAL_TRACKER.get_or_init(SemTracker::new)
}
