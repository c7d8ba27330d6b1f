//! Reporting entry points
//!
//! **Handler pattern:** sub-operations return an [`Outcome`] and the handler
//! returns early once one of them reports:
//!
//! ```
//! use axum::http::StatusCode;
//! use waypost::{Outcome, Reporter, ResponseBuffer};
//! use waypost_core::ReporterConfig;
//!
//! fn load(reporter: &Reporter, sink: &mut ResponseBuffer, id: u32) -> Outcome {
//!     if id == 0 {
//!         return reporter.report_error("unknown id", sink, StatusCode::NOT_FOUND, false);
//!     }
//!     reporter.report_none()
//! }
//!
//! let reporter = Reporter::new(ReporterConfig::default());
//! let mut sink = ResponseBuffer::new();
//! assert!(load(&reporter, &mut sink, 0).is_reported());
//! assert_eq!(sink.status(), StatusCode::NOT_FOUND);
//! ```

use std::fmt;

use axum::http::StatusCode;
use waypost_core::{Outcome, ReporterConfig, Verbosity};

use crate::capture;
use crate::responder::{self, JsonEncoder, ReportEncoder};
use crate::sink::ResponseSink;

/// Message sent for recovered panics.
pub const PANIC_MESSAGE: &str = "Panic.";

#[derive(Debug, Clone)]
pub struct Reporter<E = JsonEncoder> {
    config: ReporterConfig,
    encoder: E,
}

impl Reporter {
    pub fn new(config: ReporterConfig) -> Self {
        Self::with_encoder(config, JsonEncoder)
    }
}

impl<E: ReportEncoder> Reporter<E> {
    pub fn with_encoder(config: ReporterConfig, encoder: E) -> Self {
        Self { config, encoder }
    }

    /// Handle to the verbosity knob; setting it affects every clone of this reporter.
    pub fn verbosity(&self) -> &Verbosity {
        &self.config.verbosity
    }

    /// Report `message` to the client and signal that an error occurred.
    pub fn report_error<S>(
        &self,
        message: impl Into<String>,
        sink: &mut S,
        status: StatusCode,
        capture_stack: bool,
    ) -> Outcome
    where
        S: ResponseSink + ?Sized,
    {
        let message = message.into();
        self.handle(&message, sink, status, capture_stack, false);
        Outcome::Reported
    }

    /// The success counterpart of [`report_error`](Self::report_error). Writes nothing.
    pub fn report_none(&self) -> Outcome {
        Outcome::Clean
    }

    /// Report an existing error to the client.
    pub fn handle_error<D, S>(&self, err: &D, sink: &mut S, status: StatusCode, capture_stack: bool)
    where
        D: fmt::Display + ?Sized,
        S: ResponseSink + ?Sized,
    {
        self.handle(&err.to_string(), sink, status, capture_stack, false);
    }

    /// Report a recovered panic as a 500 carrying a full dump of the process.
    ///
    /// The dump lists every thread and resolves the whole stack, so this
    /// belongs on panic paths only.
    pub fn handle_panic<S>(&self, sink: &mut S)
    where
        S: ResponseSink + ?Sized,
    {
        self.handle(
            PANIC_MESSAGE,
            sink,
            StatusCode::INTERNAL_SERVER_ERROR,
            true,
            true,
        );
    }

    #[inline(never)]
    fn handle<S>(
        &self,
        message: &str,
        sink: &mut S,
        status: StatusCode,
        capture_stack: bool,
        full_dump: bool,
    ) where
        S: ResponseSink + ?Sized,
    {
        log_report(message, status);

        // Read once so capture and disclosure agree for this call.
        let disclose = self.config.verbosity.discloses_traces();

        let mut trace = Vec::new();
        if capture_stack && (disclose || self.config.capture_when_quiet) {
            if full_dump {
                trace.push(capture::full_dump());
            } else {
                trace = capture::capture_frames()
                    .iter()
                    .map(capture::CallFrame::to_trace_line)
                    .collect();
            }
        }

        responder::respond(
            sink,
            &self.encoder,
            message,
            trace,
            status,
            capture_stack,
            disclose,
        );
    }
}

fn log_report(message: &str, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(error = %message, status = status.as_u16(), "Reporting error");
    } else {
        tracing::warn!(error = %message, status = status.as_u16(), "Reporting error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::test_support::trace_event_counter;
    use crate::sink::ResponseBuffer;
    use bytes::Bytes;
    use std::sync::atomic::Ordering;
    use waypost_core::{EncodeError, ErrorReport};

    #[derive(Debug, Clone)]
    struct FailingEncoder;

    impl ReportEncoder for FailingEncoder {
        fn content_type(&self) -> axum::http::HeaderValue {
            axum::http::HeaderValue::from_static("application/json")
        }

        fn encode(&self, _report: &ErrorReport) -> Result<Bytes, EncodeError> {
            Err(EncodeError::other("encoder refused the report"))
        }
    }

    fn json(sink: &ResponseBuffer) -> serde_json::Value {
        assert_eq!(sink.content_type(), Some("application/json"));
        serde_json::from_slice(sink.body()).unwrap()
    }

    #[test]
    fn test_report_error_without_capture() {
        let reporter = Reporter::new(ReporterConfig::with_verbosity(1));
        let mut sink = ResponseBuffer::new();
        let outcome =
            reporter.report_error("disk full", &mut sink, StatusCode::SERVICE_UNAVAILABLE, false);

        assert_eq!(outcome, Outcome::Reported);
        assert_eq!(sink.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(sink.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(sink.body_text(), "disk full\n");
    }

    #[test]
    fn test_capture_with_zero_verbosity_is_plain_text() {
        let reporter = Reporter::new(ReporterConfig::with_verbosity(0));
        let mut sink = ResponseBuffer::new();
        reporter.handle_error("bad gateway", &mut sink, StatusCode::BAD_GATEWAY, true);

        assert_eq!(sink.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(sink.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(sink.body_text(), "bad gateway\n");
    }

    #[test]
    fn test_capture_skipped_when_quiet_and_opted_out() {
        let config = ReporterConfig {
            capture_when_quiet: false,
            ..ReporterConfig::with_verbosity(0)
        };
        let reporter = Reporter::new(config);
        let mut sink = ResponseBuffer::new();
        reporter.handle_error("quiet", &mut sink, StatusCode::BAD_REQUEST, true);
        assert_eq!(sink.body_text(), "quiet\n");
    }

    #[test]
    fn test_per_frame_trace_excludes_reporter() {
        let reporter = Reporter::new(ReporterConfig::with_verbosity(1));
        let mut sink = ResponseBuffer::new();
        let err = std::io::Error::other("disk full");
        reporter.handle_error(&err, &mut sink, StatusCode::INSUFFICIENT_STORAGE, true);

        assert_eq!(sink.status(), StatusCode::INSUFFICIENT_STORAGE);
        let body = json(&sink);
        assert_eq!(body["err"], "disk full");

        let trace = body["trace"].as_array().expect("frames should be captured");
        assert!(!trace.is_empty());
        assert!(trace.len() <= crate::MAX_FRAMES);
        assert!(trace[0]
            .as_str()
            .unwrap()
            .contains("test_per_frame_trace_excludes_reporter"));
        for frame in trace {
            let frame = frame.as_str().unwrap();
            assert!(frame.ends_with('\n'));
            assert!(!frame.contains("waypost::reporter::Reporter"));
            assert!(!frame.contains("capture_frames"));
        }
    }

    #[test]
    fn test_quiet_capture_still_logs_frames() {
        let reporter = Reporter::new(ReporterConfig::with_verbosity(0));
        assert!(reporter.config.capture_when_quiet);

        let (subscriber, events) = trace_event_counter();
        let mut sink = ResponseBuffer::new();
        tracing::subscriber::with_default(subscriber, || {
            reporter.handle_error("disk full", &mut sink, StatusCode::SERVICE_UNAVAILABLE, true)
        });

        assert_eq!(sink.body_text(), "disk full\n");
        let logged = events.load(Ordering::SeqCst);
        assert!(logged > 0);
        assert!(logged <= crate::MAX_FRAMES);
    }

    #[test]
    fn test_quiet_capture_opt_out_logs_nothing() {
        let config = ReporterConfig {
            capture_when_quiet: false,
            ..ReporterConfig::with_verbosity(0)
        };
        let reporter = Reporter::new(config);

        let (subscriber, events) = trace_event_counter();
        let mut sink = ResponseBuffer::new();
        tracing::subscriber::with_default(subscriber, || {
            reporter.handle_error("disk full", &mut sink, StatusCode::SERVICE_UNAVAILABLE, true)
        });

        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panic_carries_single_dump() {
        let reporter = Reporter::new(ReporterConfig::with_verbosity(1));
        let mut sink = ResponseBuffer::new();
        reporter.handle_panic(&mut sink);

        assert_eq!(sink.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(&sink);
        assert_eq!(body["err"], PANIC_MESSAGE);
        let trace = body["trace"].as_array().unwrap();
        assert_eq!(trace.len(), 1);
        assert!(!trace[0].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_panic_without_verbosity_is_plain_text() {
        let reporter = Reporter::new(ReporterConfig::default());
        let mut sink = ResponseBuffer::new();
        reporter.handle_panic(&mut sink);
        assert_eq!(sink.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(sink.body_text(), "Panic.\n");
    }

    #[test]
    fn test_encode_failure_keeps_status() {
        let reporter =
            Reporter::with_encoder(ReporterConfig::with_verbosity(1), FailingEncoder);
        let mut sink = ResponseBuffer::new();
        let outcome = reporter.report_error("disk full", &mut sink, StatusCode::CONFLICT, true);

        assert!(outcome.is_reported());
        assert_eq!(sink.status(), StatusCode::CONFLICT);
        assert_eq!(sink.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(sink.body_text(), "encoder refused the report\n");
    }

    #[test]
    fn test_report_none_writes_nothing() {
        let reporter = Reporter::new(ReporterConfig::with_verbosity(1));
        let sink = ResponseBuffer::new();
        assert_eq!(reporter.report_none(), Outcome::Clean);
        assert!(!sink.is_written());
    }

    #[test]
    fn test_verbosity_change_applies_to_clones() {
        let reporter = Reporter::new(ReporterConfig::default());
        let clone = reporter.clone();
        reporter.verbosity().set(2);

        let mut sink = ResponseBuffer::new();
        clone.handle_panic(&mut sink);
        assert_eq!(sink.content_type(), Some("application/json"));
    }
}
