//! Global installation of the unwinder collaborator.
//!
//! # Quick Start
//!
//! ```rust
//! use raisetrace::{TraceHandle, hooks::Hooks, unwinder::Unwinder};
//!
//! struct MyUnwinder;
//!
//! impl Unwinder for MyUnwinder {
//!     fn capture_current(&self) -> Option<TraceHandle> {
//!         Some(TraceHandle::from_text("   at my_app::main\n"))
//!     }
//! }
//!
//! Hooks::new()
//!     .unwinder(MyUnwinder)
//!     .install()
//!     .expect("failed to install hooks");
//! ```
//!
//! # When to Use Hooks
//!
//! Every operation on [`ErrorInstance`] that needs the unwinder comes in two
//! flavors: one taking an explicit `&dyn Unwinder` (the `*_with` methods) and
//! one consulting the globally installed hooks. Libraries should generally
//! use the explicit flavor or leave the choice to the application;
//! applications install their unwinder once at startup.
//!
//! [`ErrorInstance`]: crate::ErrorInstance

use alloc::boxed::Box;
use core::{
    panic::Location,
    ptr::NonNull,
    sync::atomic::{AtomicPtr, Ordering},
};

use triomphe::Arc;
use unsize::CoerceUnsize;

use crate::unwinder::Unwinder;

/// Builder for configuring and installing hooks globally.
///
/// # Examples
///
/// ```rust
/// use raisetrace::{hooks::Hooks, unwinder::NoopUnwinder};
///
/// Hooks::new()
///     .unwinder(NoopUnwinder)
///     .install()
///     .expect("failed to install hooks");
/// ```
#[derive(Debug)]
pub struct Hooks(Box<HookData>);

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct HookData {
    pub(crate) unwinder: Option<Arc<dyn Unwinder>>,
    pub(crate) created_at: &'static Location<'static>,
}

impl core::fmt::Debug for HookData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookData")
            .field("has_unwinder", &self.unwinder.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Error returned when attempting to install hooks when they're already
/// installed.
///
/// Contains the hooks that were attempted to be installed, so they can be
/// recovered.
pub struct HooksAlreadyInstalledError(pub Hooks);

impl core::fmt::Debug for HooksAlreadyInstalledError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HooksAlreadyInstalledError").finish()
    }
}

impl core::fmt::Display for HooksAlreadyInstalledError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "hooks are already installed globally")
    }
}

impl core::error::Error for HooksAlreadyInstalledError {}

impl Hooks {
    /// Creates a new, empty `Hooks` builder.
    ///
    /// Installing it without an unwinder is equivalent to not installing
    /// anything: the [`NoopUnwinder`](crate::unwinder::NoopUnwinder) is used.
    #[track_caller]
    #[must_use]
    pub fn new() -> Self {
        Self(Box::new(HookData {
            unwinder: None,
            created_at: Location::caller(),
        }))
    }

    /// Sets the unwinder used by all operations that do not receive one
    /// explicitly.
    #[must_use]
    pub fn unwinder<U>(mut self, unwinder: U) -> Self
    where
        U: Unwinder,
    {
        let unwinder = Arc::new(unwinder).unsize(unsize::Coercion!(to dyn Unwinder));
        self.0.unwinder = Some(unwinder);
        self
    }

    /// Sets an unwinder that is shared with other owners.
    #[must_use]
    pub fn shared_unwinder(mut self, unwinder: Arc<dyn Unwinder>) -> Self {
        self.0.unwinder = Some(unwinder);
        self
    }

    /// Returns the unwinder configured on this builder, if any.
    #[must_use]
    pub fn configured_unwinder(&self) -> Option<Arc<dyn Unwinder>> {
        self.0.unwinder.clone()
    }

    /// Installs the hooks globally.
    ///
    /// If hooks are already installed, returns a
    /// [`HooksAlreadyInstalledError`] containing the hooks that were
    /// attempted to be installed.
    ///
    /// # Memory Management
    ///
    /// Installed hooks are leaked and remain for the lifetime of the program,
    /// even if they are later replaced.
    pub fn install(self) -> Result<(), HooksAlreadyInstalledError> {
        let boxed = Box::into_raw(self.0);

        // SAFETY:
        // 1. `boxed` was obtained from `Box::into_raw`.
        // 2. On success, ownership moves to the global and we never use it again.
        // 3. On failure, we still own it and reclaim it below.
        let install_result = unsafe { HOOKS.install(boxed) };

        match install_result {
            Ok(()) => {
                tracing::debug!(target: "raisetrace", "installed global hooks");
                Ok(())
            }
            Err(()) => {
                // SAFETY: installation failed, so the pointer is still ours and
                // came from `Box::into_raw` above.
                let hooks = unsafe { Box::from_raw(boxed) };
                Err(HooksAlreadyInstalledError(Hooks(hooks)))
            }
        }
    }

    /// Replaces the currently installed hooks with `self`.
    ///
    /// Returns the previously installed hooks, if any.
    pub fn replace(self) -> Option<LeakedHooks> {
        self.leak().replace()
    }

    /// Leaks the hooks, returning a [`LeakedHooks`] handle that can be
    /// installed later.
    #[must_use]
    pub fn leak(self) -> LeakedHooks {
        let ptr = Box::into_raw(self.0);
        // SAFETY: `Box::into_raw` never returns a null pointer.
        let hook_data = unsafe { NonNull::new_unchecked(ptr) };
        LeakedHooks { hook_data }
    }
}

/// A handle to hooks that have been leaked into static memory.
#[derive(Copy, Clone, Debug)]
pub struct LeakedHooks {
    /// # Safety
    ///
    /// 1. Points to a valid `HookData` created by `Box::into_raw`.
    /// 2. The `HookData` is leaked and stays valid for the lifetime of the
    ///    program.
    hook_data: NonNull<HookData>,
}

impl LeakedHooks {
    /// Fetches the currently installed hooks, if any.
    #[must_use]
    pub fn fetch_current_hooks() -> Option<Self> {
        Some(Self {
            hook_data: HOOKS.fetch()?,
        })
    }

    /// Replaces the currently installed hooks with `self`.
    ///
    /// Returns the previously installed hooks, if any.
    pub fn replace(self) -> Option<LeakedHooks> {
        let previous = HOOKS.replace(self.hook_data)?;
        tracing::debug!(target: "raisetrace", "replaced global hooks");
        Some(Self {
            hook_data: previous,
        })
    }

    /// Returns the unwinder configured on these hooks, if any.
    #[must_use]
    pub fn unwinder(self) -> Option<&'static dyn Unwinder> {
        // SAFETY: the pointer is valid and leaked for the program lifetime
        // (invariants 1 and 2).
        let data: &'static HookData = unsafe { self.hook_data.as_ref() };
        data.unwinder.as_deref()
    }
}

struct GlobalHooks {
    /// # Safety
    ///
    /// 1. Either null or a pointer to a valid `HookData` created by
    ///    `Box::into_raw`.
    /// 2. Once set, the pointee stays valid for the lifetime of the program.
    /// 3. Writes use release semantics and dereferencing reads use acquire
    ///    semantics.
    ptr: AtomicPtr<HookData>,
}

impl GlobalHooks {
    const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    fn fetch(&self) -> Option<NonNull<HookData>> {
        NonNull::new(self.ptr.load(Ordering::Acquire))
    }

    /// Installs `new` if no hooks are installed yet.
    ///
    /// # Safety
    ///
    /// 1. `new` comes from `Box::into_raw` on a `Box<HookData>`.
    /// 2. On success ownership of `new` moves to the global.
    /// 3. On failure the caller keeps ownership of `new`.
    unsafe fn install(&self, new: *mut HookData) -> Result<(), ()> {
        self.ptr
            .compare_exchange(
                core::ptr::null_mut(),
                new,
                Ordering::Release,
                Ordering::Relaxed,
            )
            .map(|_| ())
            .map_err(|_| ())
    }

    fn replace(&self, new: NonNull<HookData>) -> Option<NonNull<HookData>> {
        NonNull::new(self.ptr.swap(new.as_ptr(), Ordering::AcqRel))
    }
}

static HOOKS: GlobalHooks = GlobalHooks::new();

impl HookData {
    pub(crate) fn fetch() -> Option<&'static HookData> {
        let ptr = HOOKS.fetch()?;

        // SAFETY: the pointer came from `Box::into_raw` and is leaked for the
        // program lifetime.
        Some(unsafe { ptr.as_ref() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TraceHandle, unwinder::NoopUnwinder};

    struct TextUnwinder;

    impl Unwinder for TextUnwinder {
        fn capture_current(&self) -> Option<TraceHandle> {
            Some(TraceHandle::from_text("   at hooks::test\n"))
        }
    }

    #[test]
    fn test_builder_configures_unwinder() {
        let hooks = Hooks::new();
        assert!(hooks.configured_unwinder().is_none());

        let hooks = hooks.unwinder(TextUnwinder);
        let unwinder = hooks.configured_unwinder();
        let captured = unwinder.and_then(|unwinder| unwinder.capture_current());
        assert_eq!(
            captured.map(|trace| trace.render()).as_deref(),
            Some("   at hooks::test\n")
        );

        let shared = Arc::new(NoopUnwinder).unsize(unsize::Coercion!(to dyn Unwinder));
        let hooks = Hooks::new().shared_unwinder(shared.clone());
        assert!(
            hooks
                .configured_unwinder()
                .is_some_and(|unwinder| Arc::ptr_eq(&unwinder, &shared))
        );
    }

    #[test]
    fn test_already_installed_error_display() {
        let error = HooksAlreadyInstalledError(Hooks::new());
        assert_eq!(
            alloc::format!("{error}"),
            "hooks are already installed globally"
        );
        assert_eq!(
            alloc::format!("{error:?}"),
            "HooksAlreadyInstalledError"
        );
    }
}
