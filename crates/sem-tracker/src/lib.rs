//! Cross-process leak tracking for named POSIX semaphores.
//!
//! A pool of worker processes shares one pipe-backed event channel with
//! a single tracking thread in the root process. Before creating a named
//! semaphore a process sends `REGISTER:<name>`; before destroying it,
//! `UNREGISTER:<name>`. When every write end closes, the tracking thread
//! treats the names still registered as leaks and `sem_unlink`s each
//! one, so a worker that crashed without cleaning up cannot leave
//! primitives behind in the OS namespace.
//!
//! # Examples
//!
//! ```no_run
//! use sem_tracker::SemTracker;
//!
//! # fn main() -> Result<(), sem_tracker::TrackError> {
//! let tracker = SemTracker::new();
//! tracker.ensure_running()?;
//!
//! tracker.register("/job-42")?;
//! // ... create and use the semaphore; hand tracker.getfd() to
//! // spawned workers so they can report over the same channel ...
//! tracker.unregister("/job-42")?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod registry;
pub mod tracker;
pub mod unlink;
pub mod worker;

pub use channel::EventWriter;
pub use config::TrackerConfig;
pub use error::TrackError;
pub use error::TrackResult;
pub use event::Event;
pub use registry::ResourceRegistry;
pub use tracker::global;
pub use tracker::SemTracker;
pub use unlink::ResourceUnlinker;
pub use unlink::SemUnlinker;
pub use worker::ReconcileReport;
pub use worker::TrackingWorker;
