//! Integration tests for the type-erased trace handles of
//! raisetrace-internals.
//!
//! ## Coverage
//! - `test_handler_selection`: the handler chosen at creation drives rendering
//! - `test_default_handler_methods`: `target_site`/`is_empty` defaults
//! - `test_frozen_clone_outlives_original`: clones keep the trace alive
//! - `test_drop_exactly_once`: the trace value is dropped with the last handle
//! - `test_clone_across_threads_via_wrapper`: a `Send` wrapper can move clones
//!   to other threads

use std::{
    any::TypeId,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use raisetrace_internals::{RawTrace, RawTraceRef, handlers::TraceHandler};

struct Rendered<'a>(RawTraceRef<'a>);

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.render(f)
    }
}

fn render(trace: &RawTrace) -> String {
    Rendered(trace.as_ref()).to_string()
}

#[derive(Debug)]
struct Frames(Vec<String>);

struct PlainFrames;
impl TraceHandler<Frames> for PlainFrames {
    fn render(value: &Frames, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &value.0 {
            writeln!(f, "{frame}")?;
        }
        Ok(())
    }

    fn target_site(value: &Frames) -> Option<&str> {
        value.0.first().map(String::as_str)
    }

    fn is_empty(value: &Frames) -> bool {
        value.0.is_empty()
    }
}

struct IndentedFrames;
impl TraceHandler<Frames> for IndentedFrames {
    fn render(value: &Frames, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &value.0 {
            writeln!(f, "   at {frame}")?;
        }
        Ok(())
    }
}

fn frames(names: &[&str]) -> Frames {
    Frames(names.iter().map(|name| name.to_string()).collect())
}

#[test]
fn test_handler_selection() {
    let plain = RawTrace::new::<Frames, PlainFrames>(frames(&["app::load", "app::main"]));
    let indented = RawTrace::new::<Frames, IndentedFrames>(frames(&["app::load", "app::main"]));

    assert_eq!(render(&plain), "app::load\napp::main\n");
    assert_eq!(render(&indented), "   at app::load\n   at app::main\n");

    assert_eq!(plain.as_ref().trace_type_id(), TypeId::of::<Frames>());
    assert_eq!(indented.as_ref().trace_type_id(), TypeId::of::<Frames>());
    assert_ne!(
        plain.as_ref().handler_type_id(),
        indented.as_ref().handler_type_id()
    );
    assert!(plain.as_ref().trace_type_name().ends_with("Frames"));
}

#[test]
fn test_default_handler_methods() {
    let indented = RawTrace::new::<Frames, IndentedFrames>(frames(&[]));
    assert_eq!(indented.as_ref().target_site(), None);
    assert!(!indented.as_ref().is_empty());

    let plain = RawTrace::new::<Frames, PlainFrames>(frames(&[]));
    assert!(plain.as_ref().is_empty());

    let plain = RawTrace::new::<Frames, PlainFrames>(frames(&["db::connect"]));
    assert_eq!(plain.as_ref().target_site(), Some("db::connect"));

    let downcast = unsafe { plain.as_ref().trace_downcast_unchecked::<Frames>() };
    assert_eq!(downcast.0, vec!["db::connect".to_string()]);
}

#[test]
fn test_frozen_clone_outlives_original() {
    let original = RawTrace::new::<Frames, PlainFrames>(frames(&["net::recv"]));
    let frozen = original.clone();
    assert!(frozen.as_ref().ptr_eq(original.as_ref()));
    assert_eq!(frozen.as_ref().strong_count(), 2);

    drop(original);

    assert_eq!(frozen.as_ref().strong_count(), 1);
    assert_eq!(render(&frozen), "net::recv\n");
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct CounterHandler;
impl TraceHandler<DropCounter> for CounterHandler {
    fn render(_value: &DropCounter, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("counter")
    }
}

#[test]
fn test_drop_exactly_once() {
    let drops = Arc::new(AtomicUsize::new(0));
    let trace = RawTrace::new::<DropCounter, CounterHandler>(DropCounter(drops.clone()));
    let clones: Vec<RawTrace> = (0..5).map(|_| trace.clone()).collect();

    drop(trace);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    for (index, clone) in clones.into_iter().enumerate() {
        assert_eq!(clone.as_ref().strong_count(), 5 - index);
        drop(clone);
    }
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

struct SendTrace(RawTrace);

// SAFETY: the stored `Frames` value is `Send + Sync` and is never mutated, and
// the reference count is atomic.
unsafe impl Send for SendTrace {}

#[test]
fn test_clone_across_threads_via_wrapper() {
    let trace = RawTrace::new::<Frames, PlainFrames>(frames(&["worker::run"]));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let moved = SendTrace(trace.clone());
            std::thread::spawn(move || {
                let moved = moved;
                render(&moved.0)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "worker::run\n");
    }
    assert_eq!(trace.as_ref().strong_count(), 1);
}
