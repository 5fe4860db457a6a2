//! Best-effort crash-correlation data.
//!
//! Platform crash handlers may record a faulting address and an opaque blob on
//! an error while it is owned by someone else. Nothing in this module ever
//! blocks: a write that loses a race is dropped, and a read that loses a race
//! sees nothing.

use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use triomphe::Arc;

/// An immutable, shareable blob of crash-correlation bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CrashBlob(Arc<[u8]>);

impl CrashBlob {
    /// Wraps the given bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` if both blobs share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &CrashBlob) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<&[u8]> for CrashBlob {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl From<alloc::vec::Vec<u8>> for CrashBlob {
    fn from(bytes: alloc::vec::Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for CrashBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashBlob")
            .field("len", &self.0.len())
            .finish()
    }
}

/// The crash-correlation cell of an error.
///
/// Holds a faulting address and an optional [`CrashBlob`]. Both may be
/// updated through a shared reference. The address is process-local and is
/// zeroed whenever the error crosses a process boundary.
///
/// # Examples
///
/// ```
/// use raisetrace::crash::{CrashBlob, CrashCorrelation};
///
/// let crash = CrashCorrelation::new();
/// crash.record(0xdead_beef, Some(CrashBlob::from(&b"minidump"[..])));
///
/// assert_eq!(crash.address(), 0xdead_beef);
/// assert_eq!(crash.blob().map(|b| b.as_bytes().len()), Some(8));
/// ```
#[derive(Default)]
pub struct CrashCorrelation {
    address: AtomicUsize,
    blob: spin::RwLock<Option<CrashBlob>>,
}

impl CrashCorrelation {
    /// Creates an empty cell.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            address: AtomicUsize::new(0),
            blob: spin::RwLock::new(None),
        }
    }

    /// Creates a cell pre-populated with the given values.
    #[must_use]
    pub fn with_values(address: usize, blob: Option<CrashBlob>) -> Self {
        Self {
            address: AtomicUsize::new(address),
            blob: spin::RwLock::new(blob),
        }
    }

    /// Returns the recorded address, or `0` if none was recorded.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address.load(Ordering::Relaxed)
    }

    /// Sets the recorded address.
    pub fn set_address(&self, address: usize) {
        self.address.store(address, Ordering::Relaxed);
    }

    /// Returns the recorded blob.
    ///
    /// Returns `None` if no blob was recorded or if a writer currently holds
    /// the cell.
    #[must_use]
    pub fn blob(&self) -> Option<CrashBlob> {
        self.blob.try_read().and_then(|blob| blob.clone())
    }

    /// Replaces the recorded blob.
    ///
    /// Returns `false` if the cell was contended and the write was dropped.
    pub fn set_blob(&self, blob: Option<CrashBlob>) -> bool {
        match self.blob.try_write() {
            Some(mut slot) => {
                *slot = blob;
                true
            }
            None => false,
        }
    }

    /// Records both values. The blob is dropped on contention; the address
    /// always lands.
    pub fn record(&self, address: usize, blob: Option<CrashBlob>) -> bool {
        self.set_address(address);
        self.set_blob(blob)
    }
}

impl fmt::Debug for CrashCorrelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashCorrelation")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("blob", &self.blob())
            .finish()
    }
}
