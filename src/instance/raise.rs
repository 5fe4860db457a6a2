use alloc::string::String;

use super::{AlreadyHasTraceError, END_OF_PREVIOUS_LOCATION, ErrorInstance};
use crate::{
    TraceHandle,
    unwinder::{self, Unwinder},
};

fn with_end_marker(text: &str) -> String {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut remote = String::with_capacity(text.len() + END_OF_PREVIOUS_LOCATION.len() + 2);
    remote.push_str(text);
    remote.push('\n');
    remote.push_str(END_OF_PREVIOUS_LOCATION);
    remote.push('\n');
    remote
}

impl ErrorInstance {
    /// Checks whether a trace may be set directly on this error.
    ///
    /// Returns `Ok(false)` for a singleton, which silently ignores the write,
    /// and `Ok(true)` for an owned error that has no trace of any kind yet.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyHasTraceError`] if a local trace, trace text, or
    /// remote trace text is already present.
    pub fn can_accept_remote_trace(&self) -> Result<bool, AlreadyHasTraceError> {
        match self {
            Self::Singleton(_) => Ok(false),
            Self::Owned(state) if state.has_any_trace() => Err(AlreadyHasTraceError),
            Self::Owned(_) => Ok(true),
        }
    }

    fn guard_remote_trace(&self) -> Result<bool, AlreadyHasTraceError> {
        self.can_accept_remote_trace().inspect_err(|_| {
            tracing::warn!(
                target: "raisetrace",
                error = self.message(),
                "rejected setting a trace on an error that already has one"
            );
        })
    }

    /// Sets the remote trace of an error that has not been raised yet.
    ///
    /// The text is followed by a line marking the end of the previous
    /// location. Does nothing on a singleton.
    ///
    /// # Errors
    ///
    /// See [`can_accept_remote_trace`](Self::can_accept_remote_trace).
    pub fn set_remote_trace(&mut self, text: impl AsRef<str>) -> Result<(), AlreadyHasTraceError> {
        if !self.guard_remote_trace()? {
            return Ok(());
        }
        if let Some(state) = self.state_mut() {
            state.remote_trace_text = Some(with_end_marker(text.as_ref()));
            tracing::debug!(target: "raisetrace", "attached remote trace");
        }
        Ok(())
    }

    /// Captures the current call stack with the installed unwinder and stores
    /// its rendering as the remote trace.
    ///
    /// # Errors
    ///
    /// See [`can_accept_remote_trace`](Self::can_accept_remote_trace).
    pub fn set_current_trace(&mut self) -> Result<(), AlreadyHasTraceError> {
        self.set_current_trace_with(unwinder::current())
    }

    /// Like [`set_current_trace`](Self::set_current_trace), capturing with
    /// `unwinder`.
    ///
    /// # Errors
    ///
    /// See [`can_accept_remote_trace`](Self::can_accept_remote_trace).
    pub fn set_current_trace_with(
        &mut self,
        unwinder: &dyn Unwinder,
    ) -> Result<(), AlreadyHasTraceError> {
        if !self.guard_remote_trace()? {
            return Ok(());
        }
        let Some(trace) = unwinder.capture_current() else {
            return Ok(());
        };
        let text = unwinder.render_trace_text(&trace);
        if let Some(state) = self.state_mut() {
            state.remote_trace_text = Some(with_end_marker(&text));
            tracing::debug!(target: "raisetrace", "attached current trace as remote trace");
        }
        Ok(())
    }

    /// Records that the error is being raised, using the installed unwinder.
    pub fn record_raise(&mut self) {
        self.record_raise_with(unwinder::current());
    }

    /// Records that the error is being raised.
    ///
    /// If dispatch state was restored since the last raise, the restored
    /// trace is kept and the marker consumed. Otherwise a fresh trace is
    /// captured with `unwinder` and replaces the local trace. Does nothing on
    /// a singleton.
    pub fn record_raise_with(&mut self, unwinder: &dyn Unwinder) {
        let Some(state) = self.state_mut() else {
            return;
        };

        if core::mem::take(&mut state.foreign_dispatch_restored) {
            tracing::trace!(target: "raisetrace", "raised with restored dispatch trace");
            return;
        }

        state.local_trace = unwinder.capture_current();
        state.trace_text = None;
        tracing::trace!(
            target: "raisetrace",
            captured = state.local_trace.is_some(),
            "raised"
        );
    }

    /// Builder form of [`record_raise`](Self::record_raise).
    ///
    /// # Examples
    ///
    /// ```
    /// use raisetrace::ErrorInstance;
    ///
    /// fn open(path: &str) -> Result<(), ErrorInstance> {
    ///     Err(ErrorInstance::new(format!("cannot open {path}")).raised())
    /// }
    ///
    /// assert!(open("/missing").is_err());
    /// ```
    #[must_use]
    pub fn raised(mut self) -> Self {
        self.record_raise();
        self
    }

    /// Moves the local trace into the remote trace text so that the error can
    /// be raised again without losing where it came from, using the installed
    /// unwinder for rendering.
    pub fn preserve_for_rethrow(&mut self) {
        self.preserve_for_rethrow_with(unwinder::current());
    }

    /// Like [`preserve_for_rethrow`](Self::preserve_for_rethrow), rendering
    /// with `unwinder`.
    ///
    /// The source and target site are materialized first, while the trace is
    /// still present. The rendered trace is appended to the remote text
    /// followed by a newline, unless the rendering is empty or the trace's
    /// handler reports it as empty. The local trace and its text are
    /// then cleared. Does nothing on a singleton.
    pub fn preserve_for_rethrow_with(&mut self, unwinder: &dyn Unwinder) {
        let Some(state) = self.state_mut() else {
            return;
        };

        let _ = state.source();

        let reported_empty = state.local_trace.as_ref().is_some_and(TraceHandle::is_empty);
        let rendered = state
            .rendered_local_trace(unwinder)
            .filter(|text| !reported_empty && !text.is_empty())
            .map(|text| {
                let mut text = text.into_owned();
                text.push('\n');
                text
            });
        if let Some(text) = &rendered {
            state.append_remote_trace_text(text);
        }

        state.local_trace = None;
        state.trace_text = None;
        tracing::trace!(
            target: "raisetrace",
            appended = rendered.is_some(),
            "preserved trace for rethrow"
        );
    }
}
