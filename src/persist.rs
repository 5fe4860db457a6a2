//! Persisting errors and bringing them back.
//!
//! The wire format is up to the caller. [`PersistedError`] is a neutral
//! carrier holding only portable data; every format rebuilds an error through
//! [`ErrorInstance::from_persisted`], which always scrubs process-local
//! state with [`ErrorInstance::on_deserialize`].

use alloc::{
    boxed::Box,
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    ErrorInstance,
    crash::{CrashBlob, CrashCorrelation},
    data::DataMap,
    instance::DiagnosticState,
    unwinder::{self, Unwinder},
};

/// The portable form of an [`ErrorInstance`].
///
/// With the `serde` feature enabled this implements `Serialize` and
/// `Deserialize`; missing fields take their default values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PersistedError {
    /// The human readable message.
    pub message: String,
    /// The help locator, possibly carrying a `#<context>` suffix.
    pub help_locator: Option<String>,
    /// The source of the failure.
    pub source: Option<String>,
    /// The rendered local trace.
    pub trace_text: Option<String>,
    /// Traces from earlier raise sites, oldest first.
    pub remote_trace_text: Option<String>,
    /// Always written as `0`; any other value read back is discarded.
    pub crash_address: usize,
    /// Crash-correlation bytes.
    pub crash_blob: Option<Vec<u8>>,
    /// Key/value diagnostics in insertion order.
    pub data: Vec<(String, String)>,
}

/// Where a persisted error is being rebuilt.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DeserializeContext {
    /// Read back from storage.
    #[default]
    Persisted,
    /// Received from another process or domain. The persisted trace text
    /// becomes part of the remote trace, as if the error had been rethrown.
    CrossDomain,
}

impl ErrorInstance {
    /// Scrubs process-local state after deserialization.
    ///
    /// Clears the local trace and zeroes the crash address. The crash blob
    /// and remote trace text are kept. Does nothing on a singleton.
    pub fn on_deserialize(&mut self) {
        let Some(state) = self.state_mut() else {
            return;
        };
        let had_trace = state.local_trace.take().is_some();
        let had_address = state.crash.address() != 0;
        state.crash.set_address(0);
        tracing::debug!(
            target: "raisetrace",
            had_trace,
            had_address,
            "scrubbed process-local state after deserialization"
        );
    }

    /// Converts this error to its portable form using the installed unwinder
    /// to render the trace.
    #[must_use]
    pub fn to_persisted(&self) -> PersistedError {
        self.to_persisted_with(unwinder::current())
    }

    /// Like [`to_persisted`](Self::to_persisted), rendering with `unwinder`.
    #[must_use]
    pub fn to_persisted_with(&self, unwinder: &dyn Unwinder) -> PersistedError {
        let Some(state) = self.state() else {
            return PersistedError {
                message: self.message().to_string(),
                ..PersistedError::default()
            };
        };

        PersistedError {
            message: state.message.clone(),
            help_locator: state.help_locator.clone(),
            source: state.source().map(String::from),
            trace_text: state
                .rendered_local_trace(unwinder)
                .map(alloc::borrow::Cow::into_owned),
            remote_trace_text: state.remote_trace_text.clone(),
            crash_address: 0,
            crash_blob: state.crash.blob().map(|blob| blob.as_bytes().to_vec()),
            data: state
                .data
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Rebuilds an owned error from its portable form.
    ///
    /// Always ends with [`on_deserialize`](Self::on_deserialize).
    ///
    /// # Examples
    ///
    /// ```
    /// use raisetrace::{ErrorInstance, persist::{DeserializeContext, PersistedError}};
    ///
    /// let persisted = PersistedError {
    ///     message: "quota exceeded".into(),
    ///     trace_text: Some("   at quota::check\n".into()),
    ///     remote_trace_text: Some("   at api::call\n".into()),
    ///     crash_address: 0xbad,
    ///     ..Default::default()
    /// };
    ///
    /// let error = ErrorInstance::from_persisted(persisted, DeserializeContext::CrossDomain);
    /// assert_eq!(error.remote_trace_text(), Some("   at api::call\n   at quota::check\n"));
    /// assert_eq!(error.trace_text(), None);
    /// assert_eq!(error.crash_address(), 0);
    /// ```
    #[must_use]
    pub fn from_persisted(persisted: PersistedError, context: DeserializeContext) -> Self {
        let PersistedError {
            message,
            help_locator,
            source,
            trace_text,
            remote_trace_text,
            crash_address,
            crash_blob,
            data,
        } = persisted;

        let mut state = DiagnosticState::new(message);
        state.help_locator = help_locator;
        state.set_source(source);
        state.trace_text = trace_text;
        state.remote_trace_text = remote_trace_text;
        state.crash = CrashCorrelation::with_values(crash_address, crash_blob.map(CrashBlob::from));
        state.data = data.into_iter().collect::<DataMap>();

        if context == DeserializeContext::CrossDomain
            && let Some(text) = state.trace_text.take()
        {
            state.append_remote_trace_text(&text);
        }

        let mut error = Self::Owned(Box::new(state));
        error.on_deserialize();
        error
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{TraceHandle, singleton::SingletonKind, unwinder::NoopUnwinder};

    struct FixedUnwinder(&'static str);

    impl Unwinder for FixedUnwinder {
        fn capture_current(&self) -> Option<TraceHandle> {
            Some(TraceHandle::from_text(self.0))
        }
    }

    #[test]
    fn test_on_deserialize_scrubs_pointers() {
        let mut error = ErrorInstance::new("boom");
        error.record_raise_with(&FixedUnwinder("   at a::b\n"));
        error.render_trace_text_with(&NoopUnwinder);
        error.record_crash(0xdead, Some(CrashBlob::from(vec![7u8])));
        if let Some(state) = error.state_mut() {
            state.remote_trace_text = Some("R\n".into());
        }

        error.on_deserialize();
        assert!(error.local_trace().is_none());
        assert_eq!(error.crash_address(), 0);
        assert_eq!(error.crash_blob().map(|b| b.as_bytes().to_vec()), Some(vec![7u8]));
        assert_eq!(error.remote_trace_text(), Some("R\n"));
        assert_eq!(error.trace_text(), Some("   at a::b\n"));

        let mut singleton = ErrorInstance::singleton(SingletonKind::OutOfMemory);
        singleton.on_deserialize();
        assert!(singleton.is_singleton());
    }

    #[test]
    fn test_to_persisted_never_writes_address() {
        let mut error = ErrorInstance::new("boom");
        error.set_help_locator("help.html#3");
        error.record_raise_with(&FixedUnwinder("   at store::save\n"));
        error.record_crash(0x1234, Some(CrashBlob::from(vec![1u8, 2])));
        if let Some(data) = error.data_mut() {
            data.insert("b".into(), "2".into());
            data.insert("a".into(), "1".into());
        }

        let persisted = error.to_persisted_with(&NoopUnwinder);
        assert_eq!(persisted.message, "boom");
        assert_eq!(persisted.help_locator.as_deref(), Some("help.html#3"));
        assert_eq!(persisted.source.as_deref(), Some("store"));
        assert_eq!(persisted.trace_text.as_deref(), Some("   at store::save\n"));
        assert_eq!(persisted.crash_address, 0);
        assert_eq!(persisted.crash_blob, Some(vec![1u8, 2]));
        assert_eq!(
            persisted.data,
            vec![("b".into(), "2".into()), ("a".into(), "1".into())]
        );

        let singleton = ErrorInstance::singleton(SingletonKind::ThreadAbort).to_persisted_with(&NoopUnwinder);
        assert_eq!(singleton.message, SingletonKind::ThreadAbort.message());
        assert_eq!(singleton.trace_text, None);
    }

    #[test]
    fn test_from_persisted_contexts() {
        let persisted = PersistedError {
            message: "boom".into(),
            source: Some("svc".into()),
            trace_text: Some("T\n".into()),
            remote_trace_text: Some("R\n".into()),
            crash_address: 99,
            ..PersistedError::default()
        };

        let stored = ErrorInstance::from_persisted(persisted.clone(), DeserializeContext::Persisted);
        assert_eq!(stored.trace_text(), Some("T\n"));
        assert_eq!(stored.remote_trace_text(), Some("R\n"));
        assert_eq!(stored.crash_address(), 0);
        assert_eq!(stored.source(), Some("svc"));
        assert_eq!(stored.stack_trace_with(&NoopUnwinder).as_deref(), Some("R\nT\n"));

        let received = ErrorInstance::from_persisted(persisted, DeserializeContext::CrossDomain);
        assert_eq!(received.trace_text(), None);
        assert_eq!(received.remote_trace_text(), Some("R\nT\n"));

        let bare = ErrorInstance::from_persisted(
            PersistedError {
                trace_text: Some("T\n".into()),
                ..PersistedError::default()
            },
            DeserializeContext::CrossDomain,
        );
        assert_eq!(bare.remote_trace_text(), Some("T\n"));
        assert_eq!(bare.can_accept_remote_trace(), Err(crate::AlreadyHasTraceError));
    }
}
