//! Preallocated, process-wide error instances.
//!
//! Some failures must be reportable without allocating, for example running
//! out of memory. The runtime keeps one shared instance per such kind. These
//! instances are never written to: every mutator on
//! [`ErrorInstance`](crate::ErrorInstance) silently does nothing when called
//! on one.

use core::fmt;

/// The kinds of failure that have a shared, preallocated instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SingletonKind {
    /// The process ran out of memory.
    OutOfMemory,
    /// A thread was aborted.
    ThreadAbort,
    /// A thread was interrupted while waiting.
    ThreadInterrupted,
}

impl SingletonKind {
    /// All singleton kinds.
    pub const ALL: [SingletonKind; 3] = [
        SingletonKind::OutOfMemory,
        SingletonKind::ThreadAbort,
        SingletonKind::ThreadInterrupted,
    ];

    /// Returns the fixed message of this kind.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            SingletonKind::OutOfMemory => "insufficient memory to continue the execution of the program",
            SingletonKind::ThreadAbort => "thread was being aborted",
            SingletonKind::ThreadInterrupted => "thread was interrupted from a waiting state",
        }
    }

    /// Returns the shared instance of this kind.
    #[must_use]
    pub const fn instance(self) -> &'static SingletonError {
        match self {
            SingletonKind::OutOfMemory => &OUT_OF_MEMORY,
            SingletonKind::ThreadAbort => &THREAD_ABORT,
            SingletonKind::ThreadInterrupted => &THREAD_INTERRUPTED,
        }
    }
}

/// A preallocated error instance.
///
/// Only obtainable as a `&'static` reference through
/// [`SingletonKind::instance`].
#[allow(
    missing_copy_implementations,
    reason = "instances are only handed out as `&'static` references"
)]
pub struct SingletonError {
    kind: SingletonKind,
}

static OUT_OF_MEMORY: SingletonError = SingletonError {
    kind: SingletonKind::OutOfMemory,
};
static THREAD_ABORT: SingletonError = SingletonError {
    kind: SingletonKind::ThreadAbort,
};
static THREAD_INTERRUPTED: SingletonError = SingletonError {
    kind: SingletonKind::ThreadInterrupted,
};

impl SingletonError {
    /// Returns the kind of this instance.
    #[must_use]
    pub const fn kind(&self) -> SingletonKind {
        self.kind
    }

    /// Returns the fixed message of this instance.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.kind.message()
    }
}

impl fmt::Debug for SingletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SingletonError").field(&self.kind).finish()
    }
}

impl fmt::Display for SingletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
