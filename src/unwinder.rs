//! The seam to the runtime's stack unwinder.
//!
//! Capturing a call stack, freezing it, and rendering it are platform
//! concerns this crate deliberately does not own. They are delegated to an
//! [`Unwinder`], which is either passed explicitly to the `*_with` methods of
//! [`ErrorInstance`] or installed globally through [`Hooks`].
//!
//! When no unwinder is installed, [`NoopUnwinder`] is used: errors never get
//! a fresh trace at raise time, but traces attached by other means (restored
//! snapshots, imported text) are still frozen and rendered normally.
//!
//! [`ErrorInstance`]: crate::ErrorInstance
//! [`Hooks`]: crate::hooks::Hooks

use alloc::string::String;

use crate::{ErrorInstance, TraceHandle};

/// A provider of trace capture, freezing, and rendering.
///
/// Only [`capture_current`](Unwinder::capture_current) is required. The
/// remaining methods have defaults that are correct for any unwinder whose
/// handles are immutable, which every [`TraceHandle`] is.
///
/// # Examples
///
/// ```
/// use raisetrace::{ErrorInstance, TraceHandle, unwinder::Unwinder};
///
/// struct FixedUnwinder;
///
/// impl Unwinder for FixedUnwinder {
///     fn capture_current(&self) -> Option<TraceHandle> {
///         Some(TraceHandle::from_text("   at jobs::run\n"))
///     }
/// }
///
/// let mut error = ErrorInstance::new("job failed");
/// error.record_raise_with(&FixedUnwinder);
/// assert_eq!(error.stack_trace_with(&FixedUnwinder).as_deref(), Some("   at jobs::run\n"));
/// ```
pub trait Unwinder: 'static + Send + Sync {
    /// Captures the call stack of the current thread, or `None` if capture is
    /// unavailable.
    fn capture_current(&self) -> Option<TraceHandle>;

    /// Returns a handle to the trace of `error` that remains valid and
    /// renderable regardless of what later happens to `error`.
    fn capture_frozen_trace(&self, error: &ErrorInstance) -> Option<TraceHandle> {
        error.local_trace().cloned()
    }

    /// Renders a trace handle to text.
    fn render_trace_text(&self, handle: &TraceHandle) -> String {
        handle.render()
    }

    /// Advisory signal that `error` now carries foreign dispatch information
    /// and should keep it the next time it is raised.
    fn mark_restored_foreign_dispatch(&self, error: &ErrorInstance) {
        let _ = error;
    }
}

/// An [`Unwinder`] that never captures anything.
///
/// This is what the crate falls back to when no unwinder has been installed.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopUnwinder;

impl Unwinder for NoopUnwinder {
    fn capture_current(&self) -> Option<TraceHandle> {
        None
    }
}

/// Returns the globally installed unwinder, or [`NoopUnwinder`].
pub(crate) fn current() -> &'static dyn Unwinder {
    static NOOP: NoopUnwinder = NoopUnwinder;

    crate::hooks::HookData::fetch()
        .and_then(|hooks| hooks.unwinder.as_deref())
        .unwrap_or(&NOOP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_unwinder_defaults() {
        let mut error = ErrorInstance::new("boom");
        assert!(NoopUnwinder.capture_current().is_none());
        assert!(NoopUnwinder.capture_frozen_trace(&error).is_none());

        let trace = TraceHandle::from_text("   at a::b\n");
        let snapshot = crate::DispatchSnapshot::from_parts(Some(trace.clone()), None, 0, None);
        error.restore_dispatch_state_with(&snapshot, &NoopUnwinder);

        let frozen = NoopUnwinder.capture_frozen_trace(&error);
        assert!(frozen.is_some_and(|frozen| frozen.ptr_eq(&trace)));
        assert_eq!(NoopUnwinder.render_trace_text(&trace), "   at a::b\n");
    }

    #[test]
    fn test_unwinder_is_object_safe() {
        let unwinder: &dyn Unwinder = &NoopUnwinder;
        assert!(unwinder.capture_current().is_none());
    }
}
