//! Recovered panics
//!
//! [`PanicResponder`] plugs the reporter into tower-http's catch-panic
//! middleware so a panicking handler still answers with a normal response.
//! The response is built after unwinding, so [`install_panic_hook`] records
//! the panicking stack beforehand for the full dump.

use std::any::Any;
use std::sync::{Arc, Once};

use axum::{
    body::Body,
    http::Response,
    response::IntoResponse,
};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};

use crate::capture;
use crate::reporter::Reporter;
use crate::responder::{JsonEncoder, ReportEncoder};
use crate::sink::ResponseBuffer;

pub struct PanicResponder<E = JsonEncoder> {
    reporter: Arc<Reporter<E>>,
}

impl<E> Clone for PanicResponder<E> {
    fn clone(&self) -> Self {
        Self {
            reporter: Arc::clone(&self.reporter),
        }
    }
}

impl<E: ReportEncoder + 'static> PanicResponder<E> {
    pub fn new(reporter: Arc<Reporter<E>>) -> Self {
        install_panic_hook();
        Self { reporter }
    }

    /// `CatchPanicLayer` answering with [`Reporter::handle_panic`].
    pub fn layer(reporter: Arc<Reporter<E>>) -> CatchPanicLayer<Self> {
        CatchPanicLayer::custom(Self::new(reporter))
    }
}

impl<E: ReportEncoder + 'static> ResponseForPanic for PanicResponder<E> {
    type ResponseBody = Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response<Body> {
        tracing::error!(panic = %panic_message(err.as_ref()), "Request handler panicked");

        let mut sink = ResponseBuffer::new();
        self.reporter.handle_panic(&mut sink);
        sink.into_response()
    }
}

static PANIC_HOOK: Once = Once::new();

/// Install (once per process) a panic hook that records the panicking
/// thread's stack, then defers to the previously installed hook.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown location".to_string());
            capture::record_panic_site(location);
            previous(info);
        }));
    });
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
