use raisetrace::{
    ErrorInstance, TraceHandle,
    crash::CrashBlob,
    persist::{DeserializeContext, PersistedError},
    singleton::SingletonKind,
    unwinder::{NoopUnwinder, Unwinder},
};

struct FixedUnwinder;

impl Unwinder for FixedUnwinder {
    fn capture_current(&self) -> Option<TraceHandle> {
        Some(TraceHandle::from_text("   at storage::flush\n   at storage::run\n"))
    }
}

fn raised_error() -> ErrorInstance {
    let mut error = ErrorInstance::new("flush failed");
    error.set_help_locator("storage.html#17");
    error.record_raise_with(&FixedUnwinder);
    error.record_crash(0x7fff_0000, Some(CrashBlob::from(vec![0xde, 0xad])));
    if let Some(data) = error.data_mut() {
        data.insert("volume".into(), "sda1".into());
        data.insert("attempt".into(), "2".into());
    }
    error
}

#[test]
fn test_json_round_trip_scrubs_pointers() {
    let error = raised_error();
    assert_ne!(error.crash_address(), 0);

    let json = serde_json::to_string(&error.to_persisted_with(&NoopUnwinder)).expect("serialize");
    let persisted: PersistedError = serde_json::from_str(&json).expect("deserialize");
    let restored = ErrorInstance::from_persisted(persisted, DeserializeContext::Persisted);

    assert_eq!(restored.message(), "flush failed");
    assert!(restored.local_trace().is_none());
    assert_eq!(restored.crash_address(), 0);
    assert_eq!(
        restored.crash_blob().map(|blob| blob.as_bytes().to_vec()),
        Some(vec![0xde, 0xad])
    );
    assert_eq!(
        restored.trace_text(),
        Some("   at storage::flush\n   at storage::run\n")
    );
    assert_eq!(restored.source(), Some("storage"));
    assert_eq!(
        restored.help_context(),
        Some(("storage.html".to_string(), Some(17)))
    );
    let keys: Vec<_> = restored.data().keys().cloned().collect();
    assert_eq!(keys, ["volume", "attempt"]);
}

#[test]
fn test_forged_address_is_discarded() {
    let json = r#"{"message":"forged","crash_address":4096,"trace_text":"   at evil::frame\n"}"#;
    let persisted: PersistedError = serde_json::from_str(json).expect("deserialize");
    assert_eq!(persisted.crash_address, 4096);
    assert_eq!(persisted.data, Vec::new());

    let restored = ErrorInstance::from_persisted(persisted, DeserializeContext::CrossDomain);
    assert_eq!(restored.crash_address(), 0);
    assert_eq!(restored.trace_text(), None);
    assert_eq!(restored.remote_trace_text(), Some("   at evil::frame\n"));
}

#[test]
fn test_cross_domain_then_rethrow() {
    let json = serde_json::to_value(raised_error().to_persisted_with(&NoopUnwinder))
        .expect("serialize");
    assert_eq!(json["crash_address"], 0);

    let persisted: PersistedError = serde_json::from_value(json).expect("deserialize");
    let mut error = ErrorInstance::from_persisted(persisted, DeserializeContext::CrossDomain);
    assert_eq!(
        error.set_remote_trace("   at other::site\n"),
        Err(raisetrace::AlreadyHasTraceError)
    );

    error.record_raise_with(&FixedUnwinder);
    assert_eq!(
        error.stack_trace_with(&NoopUnwinder).as_deref(),
        Some("   at storage::flush\n   at storage::run\n   at storage::flush\n   at storage::run\n")
    );
}

#[test]
fn test_singleton_persists_message_only() {
    let persisted = ErrorInstance::singleton(SingletonKind::OutOfMemory).to_persisted_with(&NoopUnwinder);
    let json = serde_json::to_string(&persisted).expect("serialize");
    let back: PersistedError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, persisted);

    let rebuilt = ErrorInstance::from_persisted(back, DeserializeContext::Persisted);
    assert!(!rebuilt.is_singleton());
    assert_eq!(rebuilt.message(), SingletonKind::OutOfMemory.message());
}
