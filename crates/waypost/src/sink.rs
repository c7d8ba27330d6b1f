//! Response sinks
//!
//! The reporter writes through [`ResponseSink`], which models the three
//! capabilities of an HTTP response writer: setting headers, writing the
//! status line and writing body bytes. [`ResponseBuffer`] is the in-memory
//! implementation that turns into an axum [`Response`].

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::BytesMut;

pub trait ResponseSink {
    /// Set a header. Has no effect once the status has been written.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn write_status(&mut self, status: StatusCode);

    /// Append body bytes, implicitly writing `200 OK` if no status was written yet.
    fn write_body(&mut self, body: &[u8]);
}

/// Buffers a single response in memory.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything has been written yet.
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for ResponseBuffer {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.is_written() {
            tracing::warn!(header = %name, "Header set after status was written; ignoring");
            return;
        }
        self.headers.insert(name, value);
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some(existing) = self.status {
            tracing::warn!(
                existing = existing.as_u16(),
                attempted = status.as_u16(),
                "Superfluous status write; ignoring"
            );
            return;
        }
        self.status = Some(status);
    }

    fn write_body(&mut self, body: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(body);
    }
}

impl IntoResponse for ResponseBuffer {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
