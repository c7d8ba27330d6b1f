//! Response writing
//!
//! Decides between the structured (JSON) and plain-text responses and writes
//! exactly one of them to the sink.

use axum::http::{header, HeaderValue, StatusCode};
use bytes::Bytes;
use waypost_core::{EncodeError, ErrorReport};

use crate::sink::ResponseSink;

/// Encodes an [`ErrorReport`] into a response body.
pub trait ReportEncoder: Send + Sync {
    fn content_type(&self) -> HeaderValue;

    fn encode(&self, report: &ErrorReport) -> Result<Bytes, EncodeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl ReportEncoder for JsonEncoder {
    fn content_type(&self) -> HeaderValue {
        HeaderValue::from_static("application/json")
    }

    fn encode(&self, report: &ErrorReport) -> Result<Bytes, EncodeError> {
        Ok(Bytes::from(serde_json::to_vec(report)?))
    }
}

/// Write `message` as a plain-text error response.
pub fn write_plain_text<S>(sink: &mut S, message: &str, status: StatusCode)
where
    S: ResponseSink + ?Sized,
{
    sink.set_header(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    sink.set_header(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    sink.write_status(status);
    sink.write_body(message.as_bytes());
    sink.write_body(b"\n");
}

/// Write the response for one report.
///
/// Traces are only sent when they were requested and `disclose` is set;
/// otherwise (and when encoding fails) the response is plain text.
pub(crate) fn respond<S, E>(
    sink: &mut S,
    encoder: &E,
    message: &str,
    trace: Vec<String>,
    status: StatusCode,
    capture_stack: bool,
    disclose: bool,
) where
    S: ResponseSink + ?Sized,
    E: ReportEncoder + ?Sized,
{
    if !capture_stack || !disclose {
        write_plain_text(sink, message, status);
        return;
    }

    let report = ErrorReport::new(message, trace);
    match encoder.encode(&report) {
        Ok(body) => {
            sink.set_header(header::CONTENT_TYPE, encoder.content_type());
            sink.write_status(status);
            sink.write_body(&body);
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                status = status.as_u16(),
                "Failed to encode error report, falling back to plain text"
            );
            write_plain_text(sink, &e.to_string(), status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ResponseBuffer;

    struct FailingEncoder;

    impl ReportEncoder for FailingEncoder {
        fn content_type(&self) -> HeaderValue {
            HeaderValue::from_static("application/json")
        }

        fn encode(&self, _report: &ErrorReport) -> Result<Bytes, EncodeError> {
            Err(EncodeError::other("unsupported value in trace"))
        }
    }

    fn trace() -> Vec<String> {
        vec!["src/main.rs:3 app::main\n".to_string()]
    }

    #[test]
    fn test_plain_text_without_capture() {
        let mut sink = ResponseBuffer::new();
        respond(
            &mut sink,
            &JsonEncoder,
            "disk full",
            trace(),
            StatusCode::SERVICE_UNAVAILABLE,
            false,
            true,
        );
        assert_eq!(sink.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(sink.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(sink.body_text(), "disk full\n");
    }

    #[test]
    fn test_plain_text_when_not_disclosing() {
        let mut sink = ResponseBuffer::new();
        respond(
            &mut sink,
            &JsonEncoder,
            "disk full",
            trace(),
            StatusCode::SERVICE_UNAVAILABLE,
            true,
            false,
        );
        assert_eq!(sink.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(sink.body_text(), "disk full\n");
    }

    #[test]
    fn test_json_when_disclosing() {
        let mut sink = ResponseBuffer::new();
        respond(
            &mut sink,
            &JsonEncoder,
            "disk full",
            trace(),
            StatusCode::SERVICE_UNAVAILABLE,
            true,
            true,
        );
        assert_eq!(sink.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(sink.content_type(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(sink.body()).unwrap();
        assert_eq!(body["err"], "disk full");
        assert_eq!(body["trace"][0], "src/main.rs:3 app::main\n");
    }

    #[test]
    fn test_json_with_empty_trace_has_null_trace() {
        let mut sink = ResponseBuffer::new();
        respond(
            &mut sink,
            &JsonEncoder,
            "nothing captured",
            Vec::new(),
            StatusCode::BAD_REQUEST,
            true,
            true,
        );
        let body: serde_json::Value = serde_json::from_slice(sink.body()).unwrap();
        assert!(body["trace"].is_null());
        assert_eq!(body["err"], "nothing captured");
    }

    #[test]
    fn test_encode_failure_falls_back_with_original_status() {
        let mut sink = ResponseBuffer::new();
        respond(
            &mut sink,
            &FailingEncoder,
            "disk full",
            trace(),
            StatusCode::SERVICE_UNAVAILABLE,
            true,
            true,
        );
        assert_eq!(sink.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(sink.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(sink.body_text(), "unsupported value in trace\n");
    }
}
