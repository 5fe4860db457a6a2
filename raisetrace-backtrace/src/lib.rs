#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! A stack unwinder for raisetrace, built on the [`backtrace`] crate.
//!
//! [`BacktraceUnwinder`] captures the call stack whenever an
//! [`ErrorInstance`](raisetrace::ErrorInstance) is raised, filters out frames
//! that are rarely interesting (the unwinder itself, the standard library
//! runtime), and renders what is left one frame per line.
//!
//! # Quick Start
//!
//! ```rust
//! use raisetrace::{hooks::Hooks, raise};
//! use raisetrace_backtrace::BacktraceUnwinder;
//!
//! Hooks::new()
//!     .unwinder(BacktraceUnwinder::new_from_env())
//!     .install()
//!     .expect("failed to install hooks");
//!
//! let error = raise!("something went wrong");
//! println!("{error:#}");
//! ```
//!
//! This prints something like:
//!
//! ```text
//! something went wrong
//!    at main in [..]/my_app/src/main.rs:9
//!    note: 12 frame(s) omitted. For a complete backtrace, set RUST_BACKTRACE=full.
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Disables filtering and shows full paths
//! - `RAISETRACE_BACKTRACE` - Comma-separated options:
//!   - `full_paths` - Show full file paths and symbols
//!   - `off` - Never capture; raised errors carry no local trace
//!
//! # Path privacy
//!
//! Paths below a recognized prefix (the Rust sources, the Cargo registry, the
//! raisetrace workspace) are shortened, but any other path is printed as is.
//! Use the `--remap-path-prefix` option of `rustc` if that is a concern:
//!
//! ```sh
//! export RUSTFLAGS="--remap-path-prefix=$HOME=/home/user --remap-path-prefix=$PWD=/build"
//! ```
//!
//! # Filtering
//!
//! ```rust
//! use raisetrace_backtrace::{BacktraceFilter, BacktraceUnwinder};
//!
//! let unwinder = BacktraceUnwinder::new(BacktraceFilter {
//!     skipped_initial_crates: &["raisetrace", "raisetrace-backtrace"],
//!     skipped_middle_crates: &["tokio"],
//!     skipped_final_crates: &["std"],
//!     max_entry_count: 15,
//!     show_full_path: false,
//! });
//! ```

use std::{borrow::Cow, fmt, panic::Location, sync::OnceLock};

use backtrace::BytesOrWideString;
use raisetrace::{TraceHandle, handlers::TraceHandler, unwinder::Unwinder};

/// A captured and filtered call stack.
///
/// # Examples
///
/// ```rust
/// use raisetrace_backtrace::{Backtrace, BacktraceFilter};
///
/// if let Some(backtrace) = Backtrace::capture(&BacktraceFilter::DEFAULT) {
///     println!("captured {} entries", backtrace.entries.len());
/// }
/// ```
#[derive(Debug)]
pub struct Backtrace {
    /// The entries, most recent call first.
    pub entries: Vec<BacktraceEntry>,
    /// Number of frames left out by filtering.
    pub total_omitted_frames: usize,
}

/// One entry of a [`Backtrace`].
#[derive(Debug)]
pub enum BacktraceEntry {
    /// A stack frame.
    Frame(Frame),
    /// A run of consecutive frames from one crate, collapsed.
    OmittedFrames {
        /// Number of frames in the run.
        count: usize,
        /// The crate the frames belong to.
        skipped_crate: &'static str,
    },
}

/// A single stack frame.
#[derive(Debug)]
pub struct Frame {
    /// The demangled symbol, without the trailing hash.
    pub symbol: String,
    /// Source file of the frame, if known.
    pub path: Option<FramePath>,
    /// Line in the source file, if known.
    pub lineno: Option<u32>,
}

impl Frame {
    /// Returns the bare function name of the symbol, without its module path
    /// or generic arguments.
    #[must_use]
    pub fn function_name(&self) -> &str {
        function_name(&self.symbol)
    }
}

/// Source file of a [`Frame`].
#[derive(Debug)]
pub struct FramePath {
    /// The path as recorded in the debug information.
    pub raw_path: String,
    /// The crate the file belongs to, when recognizable from the path.
    pub crate_name: Option<Cow<'static, str>>,
    /// The path split at a recognized prefix.
    pub split_path: Option<FramePrefix>,
}

/// A frame path split at a recognized prefix.
#[derive(Debug)]
pub struct FramePrefix {
    /// What the prefix is: `"RUST_SRC"`, `"CARGO"` or `"RAISETRACE"`.
    pub prefix_kind: &'static str,
    /// The removed prefix.
    pub prefix: String,
    /// The rest of the path, starting with the crate directory.
    pub suffix: String,
}

/// Renders a [`Backtrace`] one frame per line.
///
/// With `FULL_PATH` the full symbol and file path are printed; otherwise the
/// bare function name and a shortened path.
#[derive(Copy, Clone, Debug)]
pub struct BacktraceHandler<const FULL_PATH: bool>;

impl<const FULL_PATH: bool> TraceHandler<Backtrace> for BacktraceHandler<FULL_PATH> {
    fn render(value: &Backtrace, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &value.entries {
            let frame = match entry {
                BacktraceEntry::OmittedFrames {
                    count,
                    skipped_crate,
                } => {
                    writeln!(f, "   ... {count} frame(s) from crate '{skipped_crate}' omitted ...")?;
                    continue;
                }
                BacktraceEntry::Frame(frame) => frame,
            };

            if FULL_PATH {
                write!(f, "   at {}", frame.symbol)?;
            } else {
                write!(f, "   at {}", frame.function_name())?;
            }

            if let Some(path) = &frame.path {
                match &path.split_path {
                    Some(split) if !FULL_PATH => write!(f, " in [..]/{}", split.suffix)?,
                    _ => write!(f, " in {}", path.raw_path)?,
                }
                if let Some(lineno) = frame.lineno {
                    write!(f, ":{lineno}")?;
                }
            }
            writeln!(f)?;
        }

        if value.total_omitted_frames > 0 {
            writeln!(
                f,
                "   note: {} frame(s) omitted. For a complete backtrace, set RUST_BACKTRACE=full.",
                value.total_omitted_frames
            )?;
        }

        Ok(())
    }

    fn target_site(value: &Backtrace) -> Option<&str> {
        value.entries.iter().find_map(|entry| match entry {
            BacktraceEntry::Frame(frame) => Some(frame.symbol.as_str()),
            BacktraceEntry::OmittedFrames { .. } => None,
        })
    }

    fn is_empty(value: &Backtrace) -> bool {
        value.entries.is_empty()
    }
}

/// Extracts the last identifier at nesting level zero, so that
/// `<Vec<T> as Foo>::bar::{{closure}}` becomes `{{closure}}` and
/// `app::run` becomes `run`.
fn function_name(symbol: &str) -> &str {
    let mut start = 0usize;
    let mut end = 0usize;
    let mut angle_depth = 0u64;
    let mut curly_depth = 0u64;
    let mut in_word = false;
    let mut previous = '\0';

    for (i, c) in symbol.char_indices() {
        if angle_depth == 0 && curly_depth == 0 {
            if !in_word && unicode_ident::is_xid_start(c) {
                start = i;
                in_word = true;
            } else if in_word && !unicode_ident::is_xid_continue(c) {
                end = i;
                in_word = false;
            }
        }

        match c {
            '<' => angle_depth = angle_depth.saturating_add(1),
            // `->` inside generic arguments is not a closing bracket
            '>' if previous != '-' => angle_depth = angle_depth.saturating_sub(1),
            '{' => {
                curly_depth = curly_depth.saturating_add(1);
                if !in_word && curly_depth == 1 && angle_depth == 0 {
                    start = i;
                    in_word = true;
                }
            }
            '}' => {
                curly_depth = curly_depth.saturating_sub(1);
                if in_word && curly_depth == 0 {
                    end = i + 1;
                    in_word = false;
                }
            }
            _ => {}
        }
        previous = c;
    }

    if start < end {
        &symbol[start..end]
    } else {
        &symbol[start..]
    }
}

/// Which frames to leave out of a captured [`Backtrace`].
///
/// # Examples
///
/// ```rust
/// use raisetrace_backtrace::BacktraceFilter;
///
/// let filter = BacktraceFilter {
///     max_entry_count: 10,
///     ..BacktraceFilter::DEFAULT
/// };
/// ```
#[derive(Copy, Clone, Debug)]
pub struct BacktraceFilter {
    /// Crates whose frames are dropped while they are at the top of the
    /// stack.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose consecutive frames are collapsed into one entry anywhere
    /// in the stack.
    pub skipped_middle_crates: &'static [&'static str],
    /// Crates whose frames are dropped while they are at the bottom of the
    /// stack.
    pub skipped_final_crates: &'static [&'static str],
    /// Maximum number of entries to keep.
    pub max_entry_count: usize,
    /// Whether to render full symbols and paths.
    pub show_full_path: bool,
}

impl BacktraceFilter {
    /// Default filter settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &[
            "backtrace",
            "raisetrace",
            "raisetrace-backtrace",
            "core",
            "std",
            "alloc",
        ],
        skipped_middle_crates: &["std", "core", "alloc", "tokio"],
        skipped_final_crates: &["std", "core", "alloc", "tokio"],
        max_entry_count: 20,
        show_full_path: false,
    };

    /// A filter that keeps every frame.
    pub const NONE: Self = Self {
        skipped_initial_crates: &[],
        skipped_middle_crates: &[],
        skipped_final_crates: &[],
        max_entry_count: usize::MAX,
        show_full_path: true,
    };
}

impl Default for BacktraceFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct EnvOptions {
    rust_backtrace_full: bool,
    show_full_path: bool,
    disabled: bool,
}

impl EnvOptions {
    fn get() -> &'static Self {
        static OPTIONS: OnceLock<EnvOptions> = OnceLock::new();

        OPTIONS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut options = EnvOptions {
                rust_backtrace_full,
                show_full_path: rust_backtrace_full,
                disabled: false,
            };
            if let Some(var) = std::env::var_os("RAISETRACE_BACKTRACE") {
                options.apply(&var.to_string_lossy());
            }
            tracing::debug!(target: "raisetrace_backtrace", ?options, "read backtrace options");
            options
        })
    }

    fn apply(&mut self, var: &str) {
        for option in var.split(',').map(str::trim) {
            if option.eq_ignore_ascii_case("full_paths") {
                self.show_full_path = true;
            } else if option.eq_ignore_ascii_case("off") {
                self.disabled = true;
            }
        }
    }
}

/// An [`Unwinder`] capturing [`Backtrace`]s.
///
/// # Examples
///
/// ```rust
/// use raisetrace::ErrorInstance;
/// use raisetrace_backtrace::{BacktraceFilter, BacktraceUnwinder};
///
/// let unwinder = BacktraceUnwinder::new(BacktraceFilter::NONE);
/// let mut error = ErrorInstance::new("lost connection");
/// error.record_raise_with(&unwinder);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct BacktraceUnwinder {
    /// Filtering and formatting of captured backtraces.
    pub filter: BacktraceFilter,
    /// When `false`, nothing is ever captured.
    pub enabled: bool,
}

impl BacktraceUnwinder {
    /// Creates an enabled unwinder with the given filter.
    #[must_use]
    pub const fn new(filter: BacktraceFilter) -> Self {
        Self {
            filter,
            enabled: true,
        }
    }

    /// Creates an unwinder configured from the environment.
    ///
    /// `RUST_BACKTRACE=full` disables filtering and implies full paths.
    /// `RAISETRACE_BACKTRACE` takes the comma-separated options `full_paths`
    /// and `off`. The environment is read once per process.
    #[must_use]
    pub fn new_from_env() -> Self {
        let options = EnvOptions::get();
        let filter = if options.rust_backtrace_full {
            BacktraceFilter {
                show_full_path: options.show_full_path,
                ..BacktraceFilter::NONE
            }
        } else {
            BacktraceFilter {
                show_full_path: options.show_full_path,
                ..BacktraceFilter::DEFAULT
            }
        };

        Self {
            filter,
            enabled: !options.disabled,
        }
    }
}

impl Default for BacktraceUnwinder {
    fn default() -> Self {
        Self::new(BacktraceFilter::DEFAULT)
    }
}

impl Unwinder for BacktraceUnwinder {
    fn capture_current(&self) -> Option<TraceHandle> {
        if !self.enabled {
            return None;
        }
        let backtrace = Backtrace::capture(&self.filter)?;
        tracing::trace!(
            target: "raisetrace_backtrace",
            entries = backtrace.entries.len(),
            omitted = backtrace.total_omitted_frames,
            "captured backtrace"
        );

        Some(if self.filter.show_full_path {
            TraceHandle::new_custom::<BacktraceHandler<true>, _>(backtrace)
        } else {
            TraceHandle::new_custom::<BacktraceHandler<false>, _>(backtrace)
        })
    }
}

/// Where the sources of a workspace crate live, derived from a location in
/// its `src/lib.rs`.
#[derive(Copy, Clone, Debug)]
struct CrateRoot {
    name: &'static str,
    /// `<parent>/<crate>/src`
    src_dir: &'static str,
    /// Length of `<parent>`.
    parent_len: usize,
}

const fn crate_root(name: &'static str, location: &'static Location<'static>) -> Option<CrateRoot> {
    let file = location.file();
    let bytes = file.as_bytes();

    // <parent>/<crate>/src/lib.rs
    let Some(src_end) = bytes.len().checked_sub("/lib.rs".len()) else {
        return None;
    };
    let Some(crate_end) = src_end.checked_sub("/src".len()) else {
        return None;
    };

    let mut parent_len = crate_end;
    while parent_len > 0 {
        parent_len -= 1;
        if bytes[parent_len] == b'/' || bytes[parent_len] == b'\\' {
            break;
        }
    }

    let (src_dir, _) = file.split_at(src_end);
    Some(CrateRoot {
        name,
        src_dir,
        parent_len,
    })
}

const WORKSPACE_ROOTS: [Option<CrateRoot>; 2] = [
    crate_root("raisetrace", raisetrace::__private::RAISETRACE_LOCATION),
    crate_root("raisetrace-backtrace", Location::caller()),
];

fn path_patterns() -> &'static [(regex::Regex, &'static str); 2] {
    static PATTERNS: OnceLock<[(regex::Regex, &'static str); 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // .../lib/rustlib/src/rust/library/<crate>/src/... or
            // /rustc/<commit>/library/<crate>/src/...
            (
                regex::Regex::new(
                    r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
                )
                .expect("std source pattern is valid"),
                "RUST_SRC",
            ),
            // .../.cargo/registry/src/<index>-<hash>/<crate>-<version>/src/...
            (
                regex::Regex::new(
                    r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
                )
                .expect("cargo registry pattern is valid"),
                "CARGO",
            ),
        ]
    })
}

impl FramePath {
    fn new(path: BytesOrWideString<'_>) -> Self {
        Self::from_raw(path.to_str_lossy().into_owned())
    }

    fn from_raw(raw_path: String) -> Self {
        for (pattern, prefix_kind) in path_patterns() {
            let Some(crate_match) = pattern.captures(&raw_path).and_then(|c| c.get(1)) else {
                continue;
            };
            let split = crate_match.start();
            let crate_name = crate_match.as_str().to_string();
            let split_path = FramePrefix {
                prefix_kind: *prefix_kind,
                prefix: raw_path[..split - 1].to_string(),
                suffix: raw_path[split..].to_string(),
            };
            return Self {
                raw_path,
                crate_name: Some(Cow::Owned(crate_name)),
                split_path: Some(split_path),
            };
        }

        for root in WORKSPACE_ROOTS.iter().flatten() {
            if raw_path.starts_with(root.src_dir) {
                let split_path = FramePrefix {
                    prefix_kind: "RAISETRACE",
                    prefix: raw_path[..root.parent_len].to_string(),
                    suffix: raw_path[root.parent_len + 1..].to_string(),
                };
                return Self {
                    raw_path,
                    crate_name: Some(Cow::Borrowed(root.name)),
                    split_path: Some(split_path),
                };
            }
        }

        Self {
            raw_path,
            crate_name: None,
            split_path: None,
        }
    }

    fn is_from(&self, crates: &[&'static str]) -> Option<&'static str> {
        let name = self.crate_name.as_deref()?;
        crates.iter().copied().find(|candidate| *candidate == name)
    }
}

/// A run of frames from one middle crate that may still turn out to be a
/// single frame.
struct OmittedRun {
    skipped_crate: &'static str,
    count: usize,
    first: Option<Frame>,
}

struct Collector<'a> {
    filter: &'a BacktraceFilter,
    at_top: bool,
    entries: Vec<BacktraceEntry>,
    total_omitted_frames: usize,
    run: Option<OmittedRun>,
}

impl<'a> Collector<'a> {
    fn new(filter: &'a BacktraceFilter) -> Self {
        Self {
            filter,
            at_top: !filter.skipped_initial_crates.is_empty(),
            entries: Vec::new(),
            total_omitted_frames: 0,
            run: None,
        }
    }

    fn push(&mut self, frame: Frame) {
        if self.entries.len() >= self.filter.max_entry_count {
            self.total_omitted_frames += 1;
            return;
        }

        let crate_name = frame.path.as_ref().and_then(|path| path.crate_name.as_deref());

        if self.at_top {
            if frame
                .path
                .as_ref()
                .and_then(|path| path.is_from(self.filter.skipped_initial_crates))
                .is_some()
            {
                self.total_omitted_frames += 1;
                return;
            }
            self.at_top = false;
        }

        if let Some(run) = &mut self.run
            && crate_name == Some(run.skipped_crate)
        {
            run.count += 1;
            run.first = None;
            return;
        }
        self.end_run();

        if let Some(skipped_crate) = frame
            .path
            .as_ref()
            .and_then(|path| path.is_from(self.filter.skipped_middle_crates))
        {
            self.run = Some(OmittedRun {
                skipped_crate,
                count: 1,
                first: Some(frame),
            });
            return;
        }

        self.entries.push(BacktraceEntry::Frame(frame));
    }

    fn end_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        match run.first {
            Some(frame) => self.entries.push(BacktraceEntry::Frame(frame)),
            None => {
                self.total_omitted_frames += run.count;
                self.entries.push(BacktraceEntry::OmittedFrames {
                    count: run.count,
                    skipped_crate: run.skipped_crate,
                });
            }
        }
    }

    fn is_runtime_entry(&self, entry: &BacktraceEntry) -> bool {
        match entry {
            BacktraceEntry::OmittedFrames { skipped_crate, .. } => {
                self.filter.skipped_final_crates.contains(skipped_crate)
            }
            BacktraceEntry::Frame(frame) => {
                let from_final_crate = frame
                    .path
                    .as_ref()
                    .and_then(|path| path.is_from(self.filter.skipped_final_crates))
                    .is_some();
                let libc_entry = matches!(
                    frame.symbol.as_str(),
                    "__libc_start_call_main" | "__libc_start_main_impl"
                ) || (frame.symbol == "_start"
                    && frame
                        .path
                        .as_ref()
                        .is_some_and(|path| path.raw_path.contains("zig/libc/glibc")));
                from_final_crate || libc_entry
            }
        }
    }

    fn finish(mut self) -> Option<Backtrace> {
        self.end_run();

        while let Some(last) = self.entries.last() {
            if !self.is_runtime_entry(last) {
                break;
            }
            if let Some(BacktraceEntry::Frame(_)) = self.entries.pop() {
                self.total_omitted_frames += 1;
            }
        }

        if self.entries.is_empty() && self.total_omitted_frames == 0 {
            None
        } else {
            Some(Backtrace {
                entries: self.entries,
                total_omitted_frames: self.total_omitted_frames,
            })
        }
    }
}

impl Backtrace {
    /// Captures the call stack of the current thread, filtered by `filter`.
    ///
    /// Returns `None` if no frame could be resolved.
    #[must_use]
    pub fn capture(filter: &BacktraceFilter) -> Option<Self> {
        let mut collector = Collector::new(filter);

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                let (Some(name), Some(file)) = (symbol.name(), symbol.filename_raw()) else {
                    return;
                };
                collector.push(Frame {
                    symbol: format!("{name:#}"),
                    path: Some(FramePath::new(file)),
                    lineno: symbol.lineno(),
                });
            });
            true
        });

        collector.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(symbol: &str, path: &str) -> Frame {
        Frame {
            symbol: symbol.to_string(),
            path: Some(FramePath::from_raw(path.to_string())),
            lineno: Some(7),
        }
    }

    #[test]
    fn test_types_send_sync() {
        static_assertions::assert_impl_all!(Backtrace: Send, Sync);
        static_assertions::assert_impl_all!(BacktraceUnwinder: Send, Sync, Copy);
    }

    #[test]
    fn test_function_name() {
        assert_eq!(function_name("app::run"), "run");
        assert_eq!(function_name("main"), "main");
        assert_eq!(function_name("<alloc::vec::Vec<T> as core::ops::Drop>::drop"), "drop");
        assert_eq!(function_name("app::worker::{{closure}}"), "{{closure}}");
        assert_eq!(function_name("app::apply<fn() -> u8>"), "apply");
    }

    #[test]
    fn test_path_classification() {
        let std_path = FramePath::from_raw(
            "/rustc/0123456789abcdef0123456789abcdef01234567/library/std/src/rt.rs".into(),
        );
        assert_eq!(std_path.crate_name.as_deref(), Some("std"));
        assert_eq!(
            std_path.split_path.as_ref().map(|split| (split.prefix_kind, split.suffix.as_str())),
            Some(("RUST_SRC", "std/src/rt.rs"))
        );

        let cargo_path = FramePath::from_raw(
            "/home/u/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/tokio-1.40.0/src/runtime/mod.rs"
                .into(),
        );
        assert_eq!(cargo_path.crate_name.as_deref(), Some("tokio"));
        assert_eq!(
            cargo_path.split_path.as_ref().map(|split| split.suffix.as_str()),
            Some("tokio-1.40.0/src/runtime/mod.rs")
        );

        let local = FramePath::from_raw("/build/my_app/src/main.rs".into());
        assert!(local.crate_name.is_none());
        assert!(local.split_path.is_none());
    }

    #[test]
    fn test_crate_root() {
        static LOCATION: &Location<'static> = Location::caller();
        let root = crate_root("raisetrace-backtrace", LOCATION);
        if let Some(root) = root {
            assert!(root.src_dir.ends_with("src"));
            assert!(root.parent_len < root.src_dir.len());
        }
    }

    #[test]
    fn test_collector_filters() {
        const STD: &str = "/rustc/0123456789abcdef0123456789abcdef01234567/library/std/src/rt.rs";
        const TOKIO: &str =
            "/h/.cargo/registry/src/index.crates.io-1949cf8c6b5b557f/tokio-1.40.0/src/lib.rs";

        let filter = BacktraceFilter {
            skipped_initial_crates: &["std"],
            skipped_middle_crates: &["tokio"],
            skipped_final_crates: &["std"],
            max_entry_count: 10,
            show_full_path: false,
        };
        let mut collector = Collector::new(&filter);
        collector.push(frame("std::backtrace::capture", STD));
        collector.push(frame("app::handle", "/build/app/src/handle.rs"));
        collector.push(frame("tokio::spawn", TOKIO));
        collector.push(frame("app::step", "/build/app/src/step.rs"));
        collector.push(frame("tokio::a", TOKIO));
        collector.push(frame("tokio::b", TOKIO));
        collector.push(frame("tokio::c", TOKIO));
        collector.push(frame("app::main", "/build/app/src/main.rs"));
        collector.push(frame("std::rt::lang_start", STD));
        collector.push(frame("__libc_start_main_impl", "/usr/lib/libc.c"));

        let backtrace = collector.finish().expect("frames were pushed");
        assert_eq!(backtrace.entries.len(), 5);
        assert_eq!(backtrace.total_omitted_frames, 6);

        let trace = TraceHandle::new_custom::<BacktraceHandler<false>, _>(backtrace);
        assert_eq!(trace.target_site(), Some("app::handle"));
        assert_eq!(
            trace.render(),
            "   at handle in /build/app/src/handle.rs:7\n\
             \x20  at spawn in [..]/tokio-1.40.0/src/lib.rs:7\n\
             \x20  at step in /build/app/src/step.rs:7\n\
             \x20  ... 3 frame(s) from crate 'tokio' omitted ...\n\
             \x20  at main in /build/app/src/main.rs:7\n\
             \x20  note: 6 frame(s) omitted. For a complete backtrace, set RUST_BACKTRACE=full.\n"
        );
    }

    #[test]
    fn test_collector_respects_max_entries() {
        let filter = BacktraceFilter {
            max_entry_count: 1,
            ..BacktraceFilter::NONE
        };
        let mut collector = Collector::new(&filter);
        collector.push(frame("a::one", "/x/a.rs"));
        collector.push(frame("a::two", "/x/a.rs"));
        let backtrace = collector.finish().expect("one frame kept");
        assert_eq!(backtrace.entries.len(), 1);
        assert_eq!(backtrace.total_omitted_frames, 1);

        assert!(Collector::new(&BacktraceFilter::NONE).finish().is_none());
    }

    #[test]
    fn test_env_options() {
        let mut options = EnvOptions {
            rust_backtrace_full: false,
            show_full_path: false,
            disabled: false,
        };
        options.apply("FULL_PATHS, off");
        assert!(options.show_full_path);
        assert!(options.disabled);
    }

    #[test]
    fn test_unwinder_capture() {
        let disabled = BacktraceUnwinder {
            enabled: false,
            ..BacktraceUnwinder::new(BacktraceFilter::NONE)
        };
        assert!(disabled.capture_current().is_none());

        let unwinder = BacktraceUnwinder::new(BacktraceFilter::NONE);
        if let Some(trace) = unwinder.capture_current() {
            assert!(trace.downcast_ref::<Backtrace>().is_some());
            assert!(!trace.render().is_empty());
        }
    }
}
