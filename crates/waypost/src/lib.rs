//! Waypost
//!
//! Turns errors and recovered panics raised while handling an HTTP request into
//! one consistent response: a plain-text message, or, when verbosity allows it,
//! a JSON body carrying a machine-readable stack trace.
//!
//! ```
//! use axum::http::StatusCode;
//! use waypost::{Reporter, ResponseBuffer};
//! use waypost_core::ReporterConfig;
//!
//! let reporter = Reporter::new(ReporterConfig::default());
//! let mut sink = ResponseBuffer::new();
//! let outcome = reporter.report_error("disk full", &mut sink, StatusCode::SERVICE_UNAVAILABLE, false);
//!
//! assert!(outcome.is_reported());
//! assert_eq!(sink.status(), StatusCode::SERVICE_UNAVAILABLE);
//! assert_eq!(sink.body_text(), "disk full\n");
//! ```

pub mod capture;
pub mod panic;
pub mod reporter;
pub mod responder;
pub mod sink;

pub use capture::{CallFrame, MAX_FRAMES};
pub use panic::{install_panic_hook, PanicResponder};
pub use reporter::{Reporter, PANIC_MESSAGE};
pub use responder::{JsonEncoder, ReportEncoder};
pub use sink::{ResponseBuffer, ResponseSink};
pub use waypost_core::{ErrorReport, Outcome, ReporterConfig, Verbosity};
