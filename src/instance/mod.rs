//! The error object and its diagnostic state.
//!
//! An [`ErrorInstance`] is either a preallocated singleton, which is shared
//! process-wide and never written to, or an owned instance carrying a
//! [`DiagnosticState`]. All mutators take `&mut self` and silently do nothing
//! on a singleton.
//!
//! # Traces
//!
//! An owned instance carries up to three kinds of trace:
//!
//! - a *local trace*: a process-local [`TraceHandle`] attached at the first
//!   raise,
//! - its *trace text*: the cached rendering of the local trace,
//! - the *remote trace text*: renderings of traces from earlier raise sites,
//!   oldest first, accumulated by [`preserve_for_rethrow`] or imported with
//!   [`set_remote_trace`].
//!
//! [`preserve_for_rethrow`]: ErrorInstance::preserve_for_rethrow
//! [`set_remote_trace`]: ErrorInstance::set_remote_trace

mod raise;
mod state;

use alloc::{
    boxed::Box,
    string::{String, ToString},
};
use core::fmt;

pub use self::state::{DiagnosticState, END_OF_PREVIOUS_LOCATION};
use crate::{
    TraceHandle,
    crash::{CrashBlob, CrashCorrelation},
    data::{self, DataMap},
    singleton::{SingletonError, SingletonKind},
    unwinder::{self, Unwinder},
};

/// An error object with a write-once diagnostic-state lifecycle.
///
/// # Examples
///
/// ```
/// use raisetrace::{ErrorInstance, singleton::SingletonKind};
///
/// let mut error = ErrorInstance::new("connection reset");
/// error.set_remote_trace("   at net::read\n")?;
/// assert!(error.set_remote_trace("   at net::write\n").is_err());
///
/// let mut oom = ErrorInstance::singleton(SingletonKind::OutOfMemory);
/// assert!(oom.set_remote_trace("   at net::read\n").is_ok());
/// assert_eq!(oom.remote_trace_text(), None);
/// # Ok::<(), raisetrace::AlreadyHasTraceError>(())
/// ```
pub enum ErrorInstance {
    /// A shared, process-wide instance. Never written to.
    Singleton(&'static SingletonError),
    /// An ordinary instance.
    Owned(Box<DiagnosticState>),
}

/// Returned when a trace is set directly on an error that already has one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct AlreadyHasTraceError;

impl fmt::Display for AlreadyHasTraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the error already has a stack trace")
    }
}

impl core::error::Error for AlreadyHasTraceError {}

impl ErrorInstance {
    /// Creates an owned error with the given message and no traces.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::Owned(Box::new(DiagnosticState::new(message.into())))
    }

    /// Creates an owned error whose message is the [`Display`] output of
    /// `error`.
    ///
    /// [`Display`]: core::fmt::Display
    #[must_use]
    pub fn from_error<E>(error: &E) -> Self
    where
        E: core::error::Error + ?Sized,
    {
        Self::new(error.to_string())
    }

    /// Returns the shared instance of the given kind.
    #[must_use]
    pub const fn singleton(kind: SingletonKind) -> Self {
        Self::Singleton(kind.instance())
    }

    /// Returns `true` for a shared, preallocated instance.
    #[must_use]
    pub const fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton(_))
    }

    /// Returns the singleton kind, or `None` for an owned instance.
    #[must_use]
    pub fn singleton_kind(&self) -> Option<SingletonKind> {
        match self {
            Self::Singleton(singleton) => Some(singleton.kind()),
            Self::Owned(_) => None,
        }
    }

    /// Returns the diagnostic state of an owned instance.
    #[must_use]
    pub fn state(&self) -> Option<&DiagnosticState> {
        match self {
            Self::Singleton(_) => None,
            Self::Owned(state) => Some(state),
        }
    }

    pub(crate) fn state_mut(&mut self) -> Option<&mut DiagnosticState> {
        match self {
            Self::Singleton(_) => None,
            Self::Owned(state) => Some(state),
        }
    }

    /// Returns the human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Singleton(singleton) => singleton.message(),
            Self::Owned(state) => state.message(),
        }
    }

    /// Returns the process-local trace, if one is attached.
    #[must_use]
    pub fn local_trace(&self) -> Option<&TraceHandle> {
        self.state()?.local_trace()
    }

    /// Returns the cached rendering of the local trace.
    #[must_use]
    pub fn trace_text(&self) -> Option<&str> {
        self.state()?.trace_text()
    }

    /// Returns the traces accumulated from earlier raise sites, oldest first.
    #[must_use]
    pub fn remote_trace_text(&self) -> Option<&str> {
        self.state()?.remote_trace_text()
    }

    /// Returns the crash-correlation cell. Singletons have none.
    #[must_use]
    pub fn crash_correlation(&self) -> Option<&CrashCorrelation> {
        Some(self.state()?.crash())
    }

    /// Returns the recorded crash address, or `0`.
    #[must_use]
    pub fn crash_address(&self) -> usize {
        self.crash_correlation().map_or(0, CrashCorrelation::address)
    }

    /// Returns the recorded crash blob.
    #[must_use]
    pub fn crash_blob(&self) -> Option<CrashBlob> {
        self.crash_correlation()?.blob()
    }

    /// Records crash-correlation data through a shared reference.
    ///
    /// Returns `false` if the blob could not be stored because the cell was
    /// contended, or if this is a singleton.
    pub fn record_crash(&self, address: usize, blob: Option<CrashBlob>) -> bool {
        match self.crash_correlation() {
            Some(crash) => crash.record(address, blob),
            None => false,
        }
    }

    /// Returns the help locator.
    #[must_use]
    pub fn help_locator(&self) -> Option<&str> {
        self.state()?.help_locator()
    }

    /// Sets the help locator.
    pub fn set_help_locator(&mut self, locator: impl Into<String>) {
        if let Some(state) = self.state_mut() {
            state.help_locator = Some(locator.into());
        }
    }

    /// Returns the help locator split into its link and numeric context.
    ///
    /// See [`parse_help_locator`](crate::parse_help_locator).
    #[must_use]
    pub fn help_context(&self) -> Option<(String, Option<u32>)> {
        self.help_locator().map(crate::parse_help_locator)
    }

    /// Returns the frame the failure originated in.
    ///
    /// Derived from the local trace the first time it is available, then
    /// kept for the lifetime of the error.
    #[must_use]
    pub fn target_site(&self) -> Option<&str> {
        self.state()?.target_site()
    }

    /// Returns the source of the failure.
    ///
    /// Unless set explicitly, this is the leading path segment of the
    /// [target site](Self::target_site).
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.state()?.source()
    }

    /// Overrides the source of the failure. `None` restores derivation.
    pub fn set_source(&mut self, source: Option<String>) {
        if let Some(state) = self.state_mut() {
            state.set_source(source);
        }
    }

    /// Returns the attached key/value diagnostics.
    ///
    /// Singletons always return the same empty map.
    #[must_use]
    pub fn data(&self) -> &DataMap {
        match self {
            Self::Singleton(_) => data::empty(),
            Self::Owned(state) => state.data(),
        }
    }

    /// Returns the attached key/value diagnostics for writing, or `None` for a
    /// singleton.
    pub fn data_mut(&mut self) -> Option<&mut DataMap> {
        Some(&mut self.state_mut()?.data)
    }

    /// Returns `true` if restored dispatch state is waiting to be kept by the
    /// next raise.
    #[must_use]
    pub fn is_foreign_dispatch_restored(&self) -> bool {
        self.state()
            .is_some_and(|state| state.foreign_dispatch_restored)
    }

    /// Returns the full stack trace: remote text followed by the rendered
    /// local trace, rendered with the installed unwinder.
    #[must_use]
    pub fn stack_trace(&self) -> Option<String> {
        self.stack_trace_with(unwinder::current())
    }

    /// Like [`stack_trace`](Self::stack_trace), rendering with `unwinder`.
    #[must_use]
    pub fn stack_trace_with(&self, unwinder: &dyn Unwinder) -> Option<String> {
        let state = self.state()?;
        let local = state.rendered_local_trace(unwinder);

        match (state.remote_trace_text(), local) {
            (None, None) => None,
            (Some(remote), None) => Some(remote.to_string()),
            (None, Some(local)) => Some(local.into_owned()),
            (Some(remote), Some(local)) => {
                let mut trace = String::with_capacity(remote.len() + local.len());
                trace.push_str(remote);
                trace.push_str(&local);
                Some(trace)
            }
        }
    }

    /// Renders the local trace into the trace-text cache and returns it.
    pub fn render_trace_text(&mut self) -> Option<&str> {
        self.render_trace_text_with(unwinder::current())
    }

    /// Like [`render_trace_text`](Self::render_trace_text), rendering with
    /// `unwinder`.
    pub fn render_trace_text_with(&mut self, unwinder: &dyn Unwinder) -> Option<&str> {
        let state = self.state_mut()?;
        if state.trace_text.is_none()
            && let Some(trace) = &state.local_trace
        {
            state.trace_text = Some(unwinder.render_trace_text(trace));
        }
        state.trace_text.as_deref()
    }
}

impl From<SingletonKind> for ErrorInstance {
    fn from(kind: SingletonKind) -> Self {
        Self::singleton(kind)
    }
}

impl fmt::Display for ErrorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())?;
        if f.alternate()
            && let Some(trace) = self.stack_trace()
        {
            write!(f, "\n{}", trace.trim_end())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton(singleton) => fmt::Debug::fmt(singleton, f),
            Self::Owned(state) => fmt::Debug::fmt(state, f),
        }
    }
}

impl core::error::Error for ErrorInstance {}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;
    use crate::unwinder::NoopUnwinder;

    #[test]
    fn test_error_instance_send_sync() {
        static_assertions::assert_impl_all!(ErrorInstance: Send, Sync, core::error::Error);
        static_assertions::assert_impl_all!(AlreadyHasTraceError: Send, Sync, Copy);
        static_assertions::assert_not_impl_any!(ErrorInstance: Clone, Copy);
    }

    #[test]
    fn test_singleton_has_no_state() {
        let mut error = ErrorInstance::singleton(SingletonKind::ThreadAbort);
        assert!(error.is_singleton());
        assert_eq!(error.singleton_kind(), Some(SingletonKind::ThreadAbort));
        assert_eq!(error.message(), SingletonKind::ThreadAbort.message());
        assert!(error.data().is_empty());
        assert!(error.data_mut().is_none());
        assert!(!error.record_crash(1, None));
        assert_eq!(error.crash_address(), 0);

        error.set_help_locator("file.html#1");
        error.set_source(Some("x".into()));
        assert_eq!(error.help_context(), None);
        assert_eq!(error.source(), None);
        assert_eq!(error.render_trace_text_with(&NoopUnwinder), None);
        assert_eq!(error.stack_trace_with(&NoopUnwinder), None);
    }

    #[test]
    fn test_stack_trace_concatenation() {
        let mut error = ErrorInstance::new("boom");
        assert_eq!(error.stack_trace_with(&NoopUnwinder), None);

        if let Some(state) = error.state_mut() {
            state.remote_trace_text = Some("   at old::site\n".into());
            state.local_trace = Some(TraceHandle::from_text("   at new::site\n"));
        }
        assert_eq!(
            error.stack_trace_with(&NoopUnwinder).as_deref(),
            Some("   at old::site\n   at new::site\n")
        );

        assert_eq!(error.trace_text(), None);
        assert_eq!(
            error.render_trace_text_with(&NoopUnwinder),
            Some("   at new::site\n")
        );
        assert_eq!(error.trace_text(), Some("   at new::site\n"));
    }

    #[test]
    fn test_help_context_and_data() {
        let mut error = ErrorInstance::new("boom");
        error.set_help_locator("manual.html#42 see also");
        assert_eq!(
            error.help_context(),
            Some(("manual.html".to_string(), Some(42)))
        );

        if let Some(data) = error.data_mut() {
            data.insert("request".into(), "17".into());
        }
        assert_eq!(error.data().get("request").map(String::as_str), Some("17"));
    }

    #[test]
    fn test_display() {
        let mut error = ErrorInstance::new("disk full");
        assert_eq!(format!("{error}"), "disk full");
        assert_eq!(format!("{error:#}"), "disk full");

        error.set_remote_trace("   at fs::write").ok();
        assert_eq!(format!("{error}"), "disk full");
        assert_eq!(
            format!("{error:#}"),
            format!("disk full\n   at fs::write\n{END_OF_PREVIOUS_LOCATION}")
        );

        let debug = format!("{error:?}");
        assert!(debug.starts_with("DiagnosticState"));
        assert_eq!(
            format!("{:?}", ErrorInstance::singleton(SingletonKind::OutOfMemory)),
            "SingletonError(OutOfMemory)"
        );
    }
}
