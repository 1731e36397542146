//! # Relay Testing
//!
//! Testing utilities for the Relay dispatch pipeline.
//!
//! The probes here exist to pin the pipeline's observable invariants:
//!
//! - [`ProbeBehavior`] and [`CountingHandler`] record into a shared
//!   [`InvocationLog`], so a test can snapshot the full ordered list of
//!   layers actually invoked and assert it equals the reverse of the
//!   registration order
//! - [`FailingBehavior`] short-circuits, so a test can assert that inner
//!   layers recorded zero invocations
//! - [`CapturedDeliveries`] records which subscriber saw which event, in
//!   order, for at-most-once delivery assertions
//! - [`DispatchTest`] wraps wiring + dispatch + assertions in a fluent
//!   Given-When-Then flow
//!
//! # Example
//!
//! ```ignore
//! let log = InvocationLog::new();
//! let mut builder = Registry::builder();
//! builder.register_with(
//!     CountingHandler::new(&log),
//!     CapabilitySet::new(),
//!     BehaviorStack::new()
//!         .push(ProbeBehavior::new("b1", &log))
//!         .push(ProbeBehavior::new("b2", &log)),
//! );
//!
//! DispatchTest::new(builder.build())
//!     .when(MyRequest)
//!     .then_ok(|_| {})
//!     .then_trace(|layers| assert_eq!(layers, ["b2", "b1", "MyRequest"]))
//!     .run()
//!     .await;
//! ```

mod probes;

pub use dispatch_test::DispatchTest;
pub use probes::{CapturedDeliveries, CountingHandler, FailingBehavior, InvocationLog, ProbeBehavior};

/// Initialize tracing output for a test binary.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
