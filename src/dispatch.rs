//! Snapshots of diagnostic state for rethrowing an error elsewhere.
//!
//! A [`DispatchSnapshot`] is taken where an error is caught and restored onto
//! the instance that is raised again, possibly on another thread. The
//! snapshot is immutable; the frozen trace inside it stays valid no matter
//! what happens to the error it was taken from.

use alloc::string::String;

use crate::{
    ErrorInstance, TraceHandle,
    crash::CrashBlob,
    unwinder::{self, Unwinder},
};

/// An immutable capture of the transportable part of an error's diagnostic
/// state.
///
/// # Examples
///
/// ```
/// use raisetrace::{DispatchSnapshot, ErrorInstance, TraceHandle, unwinder::Unwinder};
///
/// struct FixedUnwinder;
///
/// impl Unwinder for FixedUnwinder {
///     fn capture_current(&self) -> Option<TraceHandle> {
///         Some(TraceHandle::from_text("   at worker::run\n"))
///     }
/// }
///
/// let mut error = ErrorInstance::new("job failed");
/// error.record_raise_with(&FixedUnwinder);
///
/// let snapshot = DispatchSnapshot::capture_with(&error, &FixedUnwinder);
/// let handle = std::thread::spawn(move || {
///     let mut error = ErrorInstance::new("job failed");
///     error.restore_dispatch_state_with(&snapshot, &FixedUnwinder);
///     error.local_trace().map(TraceHandle::render)
/// });
///
/// assert_eq!(handle.join().unwrap().as_deref(), Some("   at worker::run\n"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct DispatchSnapshot {
    frozen_trace: Option<TraceHandle>,
    remote_trace_text: Option<String>,
    crash_address: usize,
    crash_blob: Option<CrashBlob>,
}

impl DispatchSnapshot {
    /// Builds a snapshot from its parts.
    #[must_use]
    pub fn from_parts(
        frozen_trace: Option<TraceHandle>,
        remote_trace_text: Option<String>,
        crash_address: usize,
        crash_blob: Option<CrashBlob>,
    ) -> Self {
        Self {
            frozen_trace,
            remote_trace_text,
            crash_address,
            crash_blob,
        }
    }

    /// Captures the dispatch state of `error`, freezing its trace with
    /// `unwinder`. The error is not modified.
    #[must_use]
    pub fn capture_with(error: &ErrorInstance, unwinder: &dyn Unwinder) -> Self {
        Self {
            frozen_trace: unwinder.capture_frozen_trace(error),
            remote_trace_text: error.remote_trace_text().map(String::from),
            crash_address: error.crash_address(),
            crash_blob: error.crash_blob(),
        }
    }

    /// Returns the frozen trace.
    #[must_use]
    pub fn frozen_trace(&self) -> Option<&TraceHandle> {
        self.frozen_trace.as_ref()
    }

    /// Returns the remote trace text at the time of capture.
    #[must_use]
    pub fn remote_trace_text(&self) -> Option<&str> {
        self.remote_trace_text.as_deref()
    }

    /// Returns the crash address at the time of capture.
    #[must_use]
    pub fn crash_address(&self) -> usize {
        self.crash_address
    }

    /// Returns the crash blob at the time of capture.
    #[must_use]
    pub fn crash_blob(&self) -> Option<&CrashBlob> {
        self.crash_blob.as_ref()
    }
}

impl ErrorInstance {
    /// Captures the dispatch state of this error using the installed
    /// unwinder.
    #[must_use]
    pub fn capture_dispatch_state(&self) -> DispatchSnapshot {
        DispatchSnapshot::capture_with(self, unwinder::current())
    }

    /// Restores a snapshot onto this error using the installed unwinder.
    pub fn restore_dispatch_state(&mut self, snapshot: &DispatchSnapshot) {
        self.restore_dispatch_state_with(snapshot, unwinder::current());
    }

    /// Restores a snapshot onto this error.
    ///
    /// Overwrites the local trace, remote trace text and crash data, clears
    /// the trace text, and marks the error so that its next raise keeps the
    /// restored trace. Does nothing on a singleton.
    pub fn restore_dispatch_state_with(
        &mut self,
        snapshot: &DispatchSnapshot,
        unwinder: &dyn Unwinder,
    ) {
        let Some(state) = self.state_mut() else {
            return;
        };

        state.local_trace = snapshot.frozen_trace.clone();
        state.remote_trace_text = snapshot.remote_trace_text.clone();
        state.trace_text = None;
        state.crash.set_address(snapshot.crash_address);
        if !state.crash.set_blob(snapshot.crash_blob.clone()) {
            tracing::debug!(target: "raisetrace", "dropped contended crash blob on restore");
        }
        state.foreign_dispatch_restored = true;

        tracing::debug!(
            target: "raisetrace",
            has_trace = snapshot.frozen_trace.is_some(),
            "restored dispatch state"
        );
        unwinder.mark_restored_foreign_dispatch(self);
    }
}
