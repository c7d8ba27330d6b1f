//! Stack capture
//!
//! Two modes:
//! - [`capture_frames`] walks the calling thread's stack and returns up to
//!   [`MAX_FRAMES`] frames, starting at the caller of the reporter.
//! - [`full_dump`] produces one text block describing every thread in the
//!   process, the stack that panicked (when a panic hook recorded one) and
//!   the reporting thread's complete backtrace. It reads process-wide state
//!   and resolves every symbol, so it is only used on panic paths.

use std::cell::RefCell;
use std::fmt::{self, Write as _};

use backtrace::{Backtrace, BacktraceSymbol};

/// Maximum number of frames kept by [`capture_frames`].
pub const MAX_FRAMES: usize = 32;

const UNKNOWN: &str = "<unknown>";

/// Symbol of [`capture_frames`]; everything above it belongs to the unwinder.
const CAPTURER: &str = "waypost::capture::capture_frames";

/// The reporter's entry points, trimmed directly below the capturer.
const INTERNAL_PREFIXES: &[&str] = &[
    "waypost::reporter::Reporter",
    "<waypost::reporter::Reporter",
];

const UNWINDER_PREFIXES: &[&str] = &["backtrace::", "<backtrace::", "_Unwind_"];

struct PanicSite {
    location: String,
    backtrace: Backtrace,
}

thread_local! {
    static PANIC_SITE: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

/// Remember the current stack as this thread's panic site. Called from the
/// panic hook, so symbols are resolved later by [`full_dump`].
pub(crate) fn record_panic_site(location: String) {
    let backtrace = Backtrace::new_unresolved();
    let _ = PANIC_SITE.try_with(|site| {
        if let Ok(mut slot) = site.try_borrow_mut() {
            *slot = Some(PanicSite {
                location,
                backtrace,
            });
        }
    });
}

fn take_panic_site() -> Option<PanicSite> {
    PANIC_SITE
        .try_with(|site| site.borrow_mut().take())
        .ok()
        .flatten()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl CallFrame {
    fn from_symbol(symbol: &BacktraceSymbol) -> Self {
        Self {
            file: symbol
                .filename()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            line: symbol.lineno().unwrap_or(0),
            // `{:#}` drops the trailing symbol hash.
            function: symbol
                .name()
                .map(|name| format!("{:#}", name))
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }

    fn is_internal(&self) -> bool {
        INTERNAL_PREFIXES
            .iter()
            .any(|prefix| self.function.starts_with(prefix))
    }

    fn is_unwinder(&self) -> bool {
        UNWINDER_PREFIXES
            .iter()
            .any(|prefix| self.function.starts_with(prefix))
    }

    /// `"<file>:<line> <function>\n"`
    pub fn to_trace_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.file, self.line, self.function)
    }
}

/// Capture the calling thread's frames, innermost first.
///
/// Frames belonging to the unwinder, the capturer and the [`Reporter`]
/// entry points that called it are dropped, so the first frame is the code
/// that asked for the report.
///
/// [`Reporter`]: crate::Reporter Each kept frame is also
/// written to the diagnostic log.
#[inline(never)]
pub fn capture_frames() -> Vec<CallFrame> {
    let backtrace = Backtrace::new();
    let all: Vec<CallFrame> = backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols().iter().map(CallFrame::from_symbol))
        .collect();

    let frames = trim_internal(all);
    for frame in &frames {
        tracing::info!(target: "waypost::trace", "{}", frame);
    }
    frames
}

/// Drop the unwinder frames, the capturer, and the internal frames directly
/// below it. Without the capturer's symbol (inlined or stripped) the last
/// unwinder frame is the anchor; without either, only the unresolvable leading
/// frames are dropped.
fn trim_internal(frames: Vec<CallFrame>) -> Vec<CallFrame> {
    let anchor = frames
        .iter()
        .position(|frame| frame.function.starts_with(CAPTURER))
        .or_else(|| frames.iter().rposition(CallFrame::is_unwinder));

    let start = match anchor {
        Some(anchor) => frames[anchor + 1..]
            .iter()
            .position(|frame| !frame.is_internal())
            .map_or(frames.len(), |offset| anchor + 1 + offset),
        None => frames
            .iter()
            .position(|frame| frame.function != UNKNOWN)
            .unwrap_or(frames.len()),
    };

    frames.into_iter().skip(start).take(MAX_FRAMES).collect()
}

/// Capture a single block describing every thread of the process, then the
/// recorded panic site of this thread (consumed), then the reporting thread's
/// full, untrimmed backtrace.
#[inline(never)]
pub fn full_dump() -> String {
    let mut dump = String::new();

    write_thread_listing(&mut dump);

    let current = std::thread::current();
    if let Some(mut site) = take_panic_site() {
        site.backtrace.resolve();
        let _ = writeln!(
            dump,
            "\nthread '{}' ({:?}) [panicking] at {}:",
            current.name().unwrap_or(UNKNOWN),
            current.id(),
            site.location
        );
        let _ = write!(dump, "{:?}", site.backtrace);
    }

    let _ = writeln!(
        dump,
        "\nthread '{}' ({:?}) [reporting]:",
        current.name().unwrap_or(UNKNOWN),
        current.id()
    );
    let _ = write!(dump, "{:?}", Backtrace::new());
    dump
}

#[cfg(target_os = "linux")]
fn write_thread_listing(dump: &mut String) {
    let entries = match std::fs::read_dir("/proc/self/task") {
        Ok(entries) => entries,
        Err(e) => {
            let _ = writeln!(dump, "threads: unavailable ({})", e);
            return;
        }
    };

    let mut tids: Vec<u64> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
        .collect();
    tids.sort_unstable();

    let _ = writeln!(dump, "threads: {}", tids.len());
    for tid in tids {
        let task = format!("/proc/self/task/{}", tid);
        let name = std::fs::read_to_string(format!("{}/comm", task))
            .map(|name| name.trim().to_string())
            .unwrap_or_else(|_| UNKNOWN.to_string());
        let state = std::fs::read_to_string(format!("{}/stat", task))
            .ok()
            .and_then(|stat| thread_state(&stat))
            .unwrap_or(UNKNOWN);
        let _ = writeln!(dump, "thread {} [{}]: {}", tid, name, state);
    }
}

#[cfg(not(target_os = "linux"))]
fn write_thread_listing(dump: &mut String) {
    let _ = writeln!(dump, "threads: listing unavailable on this platform");
}

/// Scheduler state from a `/proc/<pid>/task/<tid>/stat` line. The command
/// name may contain spaces and parentheses, so parse after the last `)`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn thread_state(stat: &str) -> Option<&'static str> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let state = match rest.split_whitespace().next()? {
        "R" => "running",
        "S" => "sleeping",
        "D" => "waiting on io",
        "Z" => "zombie",
        "T" | "t" => "stopped",
        "X" | "x" => "dead",
        "I" => "idle",
        _ => UNKNOWN,
    };
    Some(state)
}
