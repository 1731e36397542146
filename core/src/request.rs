//! Request trait - the typed input contract of the dispatch pipeline.
//!
//! A request is an immutable value carrying every input one operation needs.
//! Each request type is associated with exactly one response type at compile
//! time, so a caller that dispatches a `CreateWidget` can only ever receive a
//! `CreateWidget::Response` (or a failure).
//!
//! # Naming Convention
//!
//! [`Request::name`] returns a stable identifier used in logs, metrics labels,
//! and registry panic messages. Use the type's own name:
//!
//! - `"CreateWidget"`
//! - `"RenameWidget"`
//! - `"ExportWidget"`
//!
//! # Example
//!
//! ```
//! use relay_core::request::Request;
//!
//! struct RenameWidget {
//!     widget_id: u64,
//!     new_name: String,
//! }
//!
//! struct WidgetRenamed {
//!     widget_id: u64,
//!     name: String,
//! }
//!
//! impl Request for RenameWidget {
//!     type Response = WidgetRenamed;
//!
//!     fn name() -> &'static str {
//!         "RenameWidget"
//!     }
//! }
//! ```

/// A typed request flowing through the dispatch pipeline.
///
/// Requests are created per call, carry all inputs for one operation, and are
/// discarded after use. They must be `Send + Sync + 'static` so a dispatch
/// can run on any task and concurrently with any other dispatch.
pub trait Request: Send + Sync + 'static {
    /// The single response type produced when this request succeeds.
    type Response: Send + 'static;

    /// Stable identifier for this request type.
    ///
    /// Used as a structured-log field, a metrics label, and in the panic
    /// message raised when the type was never registered.
    fn name() -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ping;

    impl Request for Ping {
        type Response = ();

        fn name() -> &'static str {
            "Ping"
        }
    }

    #[test]
    fn name_is_stable() {
        assert_eq!(Ping::name(), "Ping");
    }
}
