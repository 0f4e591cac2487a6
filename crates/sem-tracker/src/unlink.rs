//! OS-level release of leaked primitives.

use std::ffi::CString;
use std::io;
use std::sync::Arc;

/// Strategy for releasing a named OS primitive.
///
/// Selected when the tracker is constructed, never patched in at
/// runtime. The production implementation unlinks POSIX semaphores;
/// tests substitute a recording mock so cleanup invariants can be
/// asserted without touching the OS namespace.
pub trait ResourceUnlinker: Send + Sync {
    /// Releases the primitive named `name`. May fail when the name does
    /// not exist or the caller lacks permission; callers report such
    /// failures and keep going.
    fn unlink(&self, name: &str) -> io::Result<()>;
}

impl<T: ResourceUnlinker + ?Sized> ResourceUnlinker for Arc<T> {
    fn unlink(&self, name: &str) -> io::Result<()> {
        (**self).unlink(name)
    }
}

/// Unlinks named POSIX semaphores via `sem_unlink(3)`.
///
/// Names follow the OS convention for `sem_open`, normally a leading
/// `/` followed by the identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemUnlinker;

impl ResourceUnlinker for SemUnlinker {
    fn unlink(&self, name: &str) -> io::Result<()> {
        let name = CString::new(name)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"))?;
        // Safety: name is a valid NUL-terminated string for the call.
        if unsafe { libc::sem_unlink(name.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
