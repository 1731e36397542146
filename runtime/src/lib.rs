//! # Relay Runtime
//!
//! Execution surfaces for the Relay dispatch pipeline.
//!
//! This crate turns the contracts from `relay-core` into a running system:
//!
//! - [`Registry`] / [`RegistryBuilder`]: write-once wiring of request types
//!   to handlers, capability tags, and behavior stacks; chains are composed
//!   once at build time
//! - [`Dispatcher`]: the single public entry point — resolve the composed
//!   chain for a request's type, invoke it, return its result verbatim
//! - [`behaviors`]: the standard cross-cutting behavior set (observability,
//!   context establishment, entitlement checks, precondition validation,
//!   timing, undo scoping)
//! - [`EventDispatcher`]: drains an aggregate's event buffer and delivers
//!   each event to its subscribers at most once, best-effort
//!
//! # Lifecycle
//!
//! ```text
//! startup (single task)                │  steady state (any concurrency)
//! ─────────────────────                │  ──────────────────────────────
//! Registry::builder()                  │  dispatcher.dispatch(request)
//!   .register_with(handler, tags, …)  │    └► B_n → … → B_1 → handler
//! SubscriberRegistry::builder()        │  event_dispatcher
//!   .subscribe::<Event>(…)            │    .dispatch_and_clear(&mut agg)
//! build() — immutable from here on     │
//! ```
//!
//! Registration is not safe for concurrent mutation; after `build()` both
//! registries are immutable and safe for unbounded concurrent reads.

pub mod behaviors;
pub mod dispatcher;
pub mod events;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use events::{
    DeliveryFailure, DeliveryReport, EventDispatcher, SubscriberRegistry,
    SubscriberRegistryBuilder,
};
pub use registry::{BehaviorPosition, BehaviorStack, Registry, RegistryBuilder};
