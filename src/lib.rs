#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Write-once stack traces, rethrow snapshots, and pointer-safe persistence
//! for error objects.
//!
//! ## Overview
//!
//! An [`ErrorInstance`] accumulates diagnostic state describing where it was
//! raised: a process-local trace, renderings of traces from earlier raise
//! sites, crash-correlation data, a help locator, and key/value diagnostics.
//! This crate governs how that state is recorded, frozen, transported, and
//! restored across four kinds of boundary:
//!
//! - **rethrow** in the same process ([`ErrorInstance::preserve_for_rethrow`]),
//! - **dispatch** to another thread or domain ([`DispatchSnapshot`]),
//! - **persistence** ([`persist::PersistedError`] and
//!   [`ErrorInstance::on_deserialize`]),
//! - **help lookup** ([`parse_help_locator`]).
//!
//! ## Quick Example
//!
//! ```
//! use raisetrace::{ErrorInstance, TraceHandle, unwinder::Unwinder};
//!
//! struct FixedUnwinder;
//!
//! impl Unwinder for FixedUnwinder {
//!     fn capture_current(&self) -> Option<TraceHandle> {
//!         Some(TraceHandle::from_text("   at payments::charge\n"))
//!     }
//! }
//!
//! let mut error = ErrorInstance::new("card declined");
//! error.record_raise_with(&FixedUnwinder);
//!
//! // Caught, then raised again somewhere else.
//! error.preserve_for_rethrow_with(&FixedUnwinder);
//! error.record_raise_with(&FixedUnwinder);
//!
//! assert_eq!(
//!     error.stack_trace_with(&FixedUnwinder).as_deref(),
//!     Some("   at payments::charge\n\n   at payments::charge\n"),
//! );
//! ```
//!
//! ## Core Concepts
//!
//! **Singletons.** Failures that must be reportable without allocating, such
//! as running out of memory, use a preallocated instance shared by the whole
//! process ([`ErrorInstance::Singleton`]). A singleton is never written to;
//! every mutator silently does nothing on one.
//!
//! **Write-once traces.** An error that already carries any trace refuses a
//! directly set one with [`AlreadyHasTraceError`].
//!
//! **Opaque traces.** A [`TraceHandle`] is an immutable, reference-counted,
//! process-local handle. Capturing and rendering traces is delegated to an
//! [`Unwinder`](unwinder::Unwinder), passed explicitly to the `*_with`
//! methods or installed globally with [`hooks::Hooks`].
//!
//! **Pointer safety.** Process-local state (the local trace and the crash
//! address) never survives persistence: [`ErrorInstance::on_deserialize`]
//! scrubs it, and [`ErrorInstance::from_persisted`] always calls it.
//!
//! **Best-effort crash data.** [`crash::CrashCorrelation`] may be written
//! through a shared reference and never blocks; contended accesses are
//! dropped.
//!
//! ## Logging
//!
//! Lifecycle events are emitted with [`tracing`] under the `raisetrace`
//! target. Nothing is emitted for singletons.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`persist::PersistedError`].

extern crate alloc;

#[macro_use]
mod macros;

pub mod crash;
pub mod data;
pub mod handlers;
pub mod hooks;
pub mod persist;
pub mod prelude;
pub mod singleton;
pub mod unwinder;

mod dispatch;
mod help;
mod instance;
mod trace;

pub use self::{
    dispatch::DispatchSnapshot,
    help::parse_help_locator,
    instance::{AlreadyHasTraceError, DiagnosticState, END_OF_PREVIOUS_LOCATION, ErrorInstance},
    trace::TraceHandle,
};

// Not public API. Referenced by macro-generated code and raisetrace-backtrace.
#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    pub const RAISETRACE_LOCATION: &core::panic::Location = core::panic::Location::caller();

    #[doc(hidden)]
    pub use alloc::format;
}
