//! Report data model
//!
//! `ErrorReport` is the body sent to clients when traces are disclosed, and
//! `Outcome` is the value handed back to callers so they can short-circuit
//! further handling of a request that has already been answered.

use serde::Serialize;

/// Error body serialized as `{"trace": [...] | null, "err": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Captured frames, or a single full-dump block. `None` when nothing was captured.
    pub trace: Option<Vec<String>>,
    pub err: String,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>, trace: Vec<String>) -> Self {
        Self {
            trace: if trace.is_empty() { None } else { Some(trace) },
            err: message.into(),
        }
    }
}

/// Whether a sub-operation reported an error to the client.
///
/// Returned by the reporting entry points so a caller can use one return
/// convention for both paths:
///
/// ```
/// use waypost_core::Outcome;
///
/// fn step(ok: bool) -> Outcome {
///     if ok { Outcome::Clean } else { Outcome::Reported }
/// }
///
/// assert!(step(false).is_reported());
/// ```
#[must_use = "an Outcome tells the caller whether a response was already written"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Nothing went wrong, no response was written.
    #[default]
    Clean,
    /// An error was reported and a response was written.
    Reported,
}

impl Outcome {
    pub fn is_reported(self) -> bool {
        matches!(self, Outcome::Reported)
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_reported()
    }
}
