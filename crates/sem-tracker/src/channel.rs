//! Pipe transport carrying events to the tracking worker.
//!
//! One read end, owned exclusively by the worker; a write end shared by
//! any number of producers, in-process or inherited across `exec`. The
//! reader observes end-of-stream exactly when every write end in every
//! process has closed.

use std::fs::File;
use std::io;
use std::io::BufReader;
use std::os::fd::AsRawFd;
use std::os::fd::FromRawFd;
use std::os::fd::OwnedFd;
use std::os::fd::RawFd;

use tracing::debug;

use crate::error::TrackError;
use crate::error::TrackResult;
use crate::event::Event;

/// Read end of the event channel.
#[derive(Debug)]
pub struct EventReader {
    fd: OwnedFd,
}

/// Write end of the event channel.
#[derive(Debug)]
pub struct EventWriter {
    fd: OwnedFd,
}

/// Creates the unidirectional event channel.
///
/// The fds are left inheritable (no `O_CLOEXEC`) so a spawned worker can
/// receive the write end without extra plumbing; each end closes when
/// its owning half is dropped.
pub fn channel() -> io::Result<(EventReader, EventWriter)> {
    let mut fds = [0; 2];
    // Safety: fds points at a valid 2-element array for the whole call.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    debug!(read_fd = fds[0], write_fd = fds[1], "created event channel pipe");
    // Safety: both fds were just returned by pipe(2) and are owned here.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((EventReader { fd: read }, EventWriter { fd: write }))
}

impl EventReader {
    /// Consumes the read end into a buffered line reader for the worker.
    pub fn into_buffered(self) -> BufReader<File> {
        BufReader::new(File::from(self.fd))
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl EventWriter {
    /// Writes one event as a single `write(2)` call.
    ///
    /// Encoded lines are bounded by `PIPE_BUF`, so concurrent writers
    /// never interleave within one event. The write completes as soon as
    /// the kernel buffers the line; there is no acknowledgment from the
    /// consumer.
    pub fn send(&self, event: &Event) -> TrackResult<()> {
        let buf = event.encode();
        // Safety: buf is valid for buf.len() bytes for the whole call.
        let written = unsafe { libc::write(self.fd.as_raw_fd(), buf.as_ptr().cast(), buf.len()) };
        if written < 0 {
            return Err(io::Error::last_os_error().into());
        }
        let written = written as usize;
        if written != buf.len() {
            return Err(TrackError::ShortWrite {
                written,
                expected: buf.len(),
            });
        }
        Ok(())
    }

    /// Duplicates the write end for an additional producer.
    pub fn try_clone(&self) -> io::Result<EventWriter> {
        Ok(EventWriter {
            fd: self.fd.try_clone()?,
        })
    }

    /// Numeric handle for passing to a spawned worker process.
    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Re-attaches a write end inherited from the parent process.
    ///
    /// # Safety
    ///
    /// `fd` must be an open, writable pipe fd owned by the caller, and
    /// nothing else may close it afterwards.
    pub unsafe fn from_raw_fd(fd: RawFd) -> EventWriter {
        EventWriter {
            fd: OwnedFd::from_raw_fd(fd),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufRead;

    use super::*;

    #[test]
    fn events_cross_the_pipe() {
        let (reader, writer) = channel().expect("should create pipe");
        writer
            .send(&Event::Register("sem_a".to_string()))
            .expect("should send");
        writer
            .send(&Event::Unregister("sem_a".to_string()))
            .expect("should send");
        drop(writer);

        let lines: Vec<String> = reader
            .into_buffered()
            .lines()
            .map(|line| line.expect("should read line"))
            .collect();
        assert_eq!(lines, vec!["REGISTER:sem_a", "UNREGISTER:sem_a"]);
    }

    #[test]
    fn reader_sees_eof_only_after_every_writer_closes() {
        let (reader, writer) = channel().expect("should create pipe");
        let clone = writer.try_clone().expect("should dup write end");
        drop(writer);

        clone
            .send(&Event::Register("sem_b".to_string()))
            .expect("clone should still write");
        drop(clone);

        let lines: Vec<String> = reader
            .into_buffered()
            .lines()
            .map(|line| line.expect("should read line"))
            .collect();
        assert_eq!(lines, vec!["REGISTER:sem_b"]);
    }
}
