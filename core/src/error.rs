//! Error taxonomy for the dispatch pipeline.
//!
//! Two classes of failure exist and they never mix:
//!
//! - **Domain/expected errors** — authorization denied, precondition unmet,
//!   validation failure. These are values: [`DispatchError`] travels up the
//!   chain inside the `Err` arm of [`DispatchResult`] and reaches the caller
//!   verbatim. A behavior may pass one through untouched but must never turn
//!   it into a success.
//! - **Programming-bug errors** — an unregistered request type, a duplicate
//!   registration. These panic immediately with a message naming the missing
//!   wiring step; they are never represented as a `DispatchError`.
//!
//! Subscriber failures during event delivery are a third, softer class: they
//! are isolated per subscriber, logged, and reported in aggregate by the
//! event dispatcher without failing the triggering operation.

use thiserror::Error;

/// Result type produced by handlers, behaviors, and the dispatcher.
///
/// Exactly one of success or failure, never both.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Domain-level failures produced inside the dispatch chain.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The caller does not hold an entitlement the handler requires.
    #[error("entitlement '{entitlement}' denied")]
    EntitlementDenied {
        /// The entitlement that was required and not granted.
        entitlement: String,
    },

    /// A precondition declared by the handler's capability tags was unmet.
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// Why the precondition did not hold.
        reason: String,
    },

    /// The request content itself was rejected by the handler.
    #[error("validation failed: {reason}")]
    Validation {
        /// Why the request was rejected.
        reason: String,
    },

    /// Ambient context required by the pipeline could not be established.
    #[error("missing ambient context: expected {expected}")]
    MissingContext {
        /// Description of the context value that was expected.
        expected: &'static str,
    },

    /// An opaque failure from a collaborator invoked by the handler.
    #[error("handler failed: {0}")]
    Handler(#[from] anyhow::Error),
}

impl DispatchError {
    /// Short stable label for this error class, used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EntitlementDenied { .. } => "entitlement_denied",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::Validation { .. } => "validation",
            Self::MissingContext { .. } => "missing_context",
            Self::Handler(_) => "handler",
        }
    }
}
