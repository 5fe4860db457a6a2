//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use raisetrace::prelude::*;
//!
//! fn lookup(id: u32) -> Result<&'static str, ErrorInstance> {
//!     match id {
//!         1 => Ok("alice"),
//!         _ => Err(raise!("no user with id {id}")),
//!     }
//! }
//!
//! let mut error = lookup(7).unwrap_err();
//! error.preserve_for_rethrow();
//! assert_eq!(error.message(), "no user with id 7");
//! ```

pub use crate::{
    AlreadyHasTraceError, DispatchSnapshot, ErrorInstance, TraceHandle, parse_help_locator,
    raise, singleton::SingletonKind, unwinder::Unwinder,
};
