//! Demo error routes
//!
//! Each handler owns a [`ResponseBuffer`] for the request and lets the
//! reporter fill it.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use waypost::{Outcome, Reporter, ResponseBuffer};

use crate::state::AppState;

const WIDGET_QUOTA: u32 = 1000;

pub async fn plain_error(State(state): State<Arc<AppState>>) -> Response {
    let mut sink = ResponseBuffer::new();
    let _ = state.reporter.report_error(
        "disk full",
        &mut sink,
        StatusCode::SERVICE_UNAVAILABLE,
        false,
    );
    sink.into_response()
}

pub async fn traced_error(State(state): State<Arc<AppState>>) -> Response {
    let mut sink = ResponseBuffer::new();
    let err = std::io::Error::other("upstream closed the connection");
    state
        .reporter
        .handle_error(&err, &mut sink, StatusCode::BAD_GATEWAY, true);
    sink.into_response()
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub message: String,
    pub status: Option<u16>,
    #[serde(default)]
    pub capture: bool,
}

/// Report an arbitrary message with a caller-chosen status.
pub async fn custom_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let mut sink = ResponseBuffer::new();

    let status = match query.status {
        None => StatusCode::INTERNAL_SERVER_ERROR,
        Some(code) => match StatusCode::from_u16(code) {
            Ok(status) => status,
            Err(_) => {
                let _ = state.reporter.report_error(
                    format!("invalid status code: {}", code),
                    &mut sink,
                    StatusCode::BAD_REQUEST,
                    false,
                );
                return sink.into_response();
            }
        },
    };

    let _ = state
        .reporter
        .report_error(query.message, &mut sink, status, query.capture);
    sink.into_response()
}

/// Two-step lookup where each step reports its own failure.
pub async fn nested_lookup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u32>,
) -> Response {
    let mut sink = ResponseBuffer::new();

    if lookup_widget(&state.reporter, &mut sink, id).is_reported() {
        return sink.into_response();
    }
    if check_quota(&state.reporter, &mut sink, id).is_reported() {
        return sink.into_response();
    }

    (StatusCode::OK, format!("widget {} ok", id)).into_response()
}

#[inline(never)]
fn lookup_widget(reporter: &Reporter, sink: &mut ResponseBuffer, id: u32) -> Outcome {
    if id == 0 {
        return reporter.report_error(
            format!("widget {} not found", id),
            sink,
            StatusCode::NOT_FOUND,
            true,
        );
    }
    reporter.report_none()
}

fn check_quota(reporter: &Reporter, sink: &mut ResponseBuffer, id: u32) -> Outcome {
    if id > WIDGET_QUOTA {
        return reporter.report_error(
            "widget quota exceeded",
            sink,
            StatusCode::TOO_MANY_REQUESTS,
            false,
        );
    }
    reporter.report_none()
}

pub async fn trigger_panic() -> &'static str {
    panic!("panic requested by client")
}
