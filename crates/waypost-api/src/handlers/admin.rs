//! Runtime verbosity switch

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use waypost::ResponseBuffer;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct VerbosityBody {
    pub verbosity: i32,
}

pub async fn get_verbosity(State(state): State<Arc<AppState>>) -> Json<VerbosityBody> {
    Json(VerbosityBody {
        verbosity: state.reporter.verbosity().level(),
    })
}

pub async fn set_verbosity(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerbosityBody>,
) -> Response {
    if body.verbosity > 0 && state.config.is_production() && !state.config.allow_traces_in_production
    {
        let mut sink = ResponseBuffer::new();
        let _ = state.reporter.report_error(
            "stack traces are disabled in production",
            &mut sink,
            StatusCode::FORBIDDEN,
            false,
        );
        return sink.into_response();
    }

    let previous = state.reporter.verbosity().level();
    state.reporter.verbosity().set(body.verbosity);
    tracing::info!(previous, verbosity = body.verbosity, "Verbosity changed");
    Json(body).into_response()
}
