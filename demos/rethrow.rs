//! Walks one error through its whole diagnostic lifecycle.
//!
//! 1. Raising with `raise!()` records a local trace
//! 2. `preserve_for_rethrow()` moves it into the remote trace text
//! 3. A `DispatchSnapshot` carries the trace to another thread
//! 4. Persisting and loading the error drops process-local pointers

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use raisetrace::{
    hooks::Hooks,
    persist::{DeserializeContext, PersistedError},
    prelude::*,
};

/// Pretends to walk the stack: every capture reports a new frame.
struct StageUnwinder;

static STAGE: AtomicUsize = AtomicUsize::new(0);

impl Unwinder for StageUnwinder {
    fn capture_current(&self) -> Option<TraceHandle> {
        let stage = STAGE.fetch_add(1, Ordering::Relaxed);
        Some(TraceHandle::from_text(format!(
            "   at pipeline::stage_{stage}\n"
        )))
    }
}

fn parse_record(line: &str) -> Result<u32, ErrorInstance> {
    line.trim().parse::<u32>().map_err(|error| {
        let mut error = raise!(error);
        error.set_help_locator("https://docs.example.com/records#12");
        error
    })
}

fn import(line: &str) -> Result<u32, ErrorInstance> {
    parse_record(line).map_err(|mut error| {
        // Keep where it failed first, then raise it again from here.
        error.preserve_for_rethrow();
        error.raised()
    })
}

fn main() {
    Hooks::new()
        .unwinder(StageUnwinder)
        .install()
        .expect("failed to install hooks");

    println!("=== Raise and rethrow ===\n");
    let error = import("forty-two").unwrap_err();
    println!("{error:#}");
    println!("help: {:?}", error.help_context());
    println!();

    println!("=== Dispatch across threads ===\n");
    let snapshot = error.capture_dispatch_state();
    let worker = thread::spawn(move || {
        let mut error = ErrorInstance::new("import failed on worker");
        error.restore_dispatch_state(&snapshot);
        // The restored trace survives this raise.
        error.record_raise();
        error
    });
    let restored = worker.join().expect("worker panicked");
    println!("{restored:#}");
    println!();

    println!("=== Persist and load ===\n");
    error.record_crash(0x7ffd_0000_1000, None);
    let persisted: PersistedError = error.to_persisted();
    println!("persisted crash address: {:#x}", persisted.crash_address);

    let loaded = ErrorInstance::from_persisted(persisted, DeserializeContext::CrossDomain);
    println!("loaded crash address: {:#x}", loaded.crash_address());
    println!("{loaded:#}");
}
