//! # Relay Core
//!
//! Core contracts for the Relay request-dispatch pipeline.
//!
//! This crate provides the fundamental abstractions for routing typed requests
//! to handlers through an ordered chain of cross-cutting behaviors, and for
//! collecting and propagating domain events after a successful operation.
//!
//! ## Core Concepts
//!
//! - **Request**: an immutable value carrying all inputs for one operation,
//!   tied to exactly one response type
//! - **Handler**: the unit of work that turns one request into one result
//! - **Behavior**: a decorator wrapping a handler with cross-cutting logic
//!   (observability, authorization, preconditions, timing, undo scoping)
//! - **CapabilityTag**: declarative metadata on a handler, consulted by
//!   behaviors to decide whether they apply
//! - **DomainEvent**: an immutable record of something that already happened
//!   inside an aggregate, buffered until the operation succeeds
//!
//! ## Composition Model
//!
//! Behaviors are registered in a fixed order at startup and wrapped
//! iteratively around the base handler: the first-registered behavior sits
//! immediately around the handler, the last-registered one becomes the
//! outermost layer. At call time the chain therefore executes in the
//! *reverse* of registration order, ending at the base handler:
//!
//! ```text
//! register [B1, B2, B3]   →   call B3 → B2 → B1 → Handler
//! ```
//!
//! The chain is built once, is one-directional, and is never mutated after
//! construction.
//!
//! ## Example
//!
//! ```
//! use relay_core::prelude::*;
//!
//! struct CreateWidget {
//!     name: String,
//! }
//!
//! impl Request for CreateWidget {
//!     type Response = u64;
//!
//!     fn name() -> &'static str {
//!         "CreateWidget"
//!     }
//! }
//!
//! struct CreateWidgetHandler;
//!
//! #[async_trait]
//! impl Handler<CreateWidget> for CreateWidgetHandler {
//!     async fn handle(
//!         &self,
//!         request: CreateWidget,
//!         _ctx: &RequestContext,
//!     ) -> DispatchResult<u64> {
//!         if request.name.is_empty() {
//!             return Err(DispatchError::Validation {
//!                 reason: "widget name must not be empty".to_string(),
//!             });
//!         }
//!         Ok(42)
//!     }
//! }
//! ```

pub mod behavior;
pub mod capability;
pub mod chain;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod request;

// Re-export commonly used types
pub use async_trait::async_trait;
pub use behavior::{Behavior, Inner};
pub use capability::{CapabilitySet, CapabilityTag};
pub use chain::{ComposedHandler, compose};
pub use context::{InvocationTrace, LayerKind, Principal, RequestContext};
pub use error::{DispatchError, DispatchResult};
pub use event::{AggregateRoot, DomainEvent, EventBuffer, EventEnvelope};
pub use handler::Handler;
pub use request::Request;

/// Convenience prelude for implementing handlers and behaviors.
pub mod prelude {
    pub use crate::async_trait;
    pub use crate::behavior::{Behavior, Inner};
    pub use crate::capability::{CapabilitySet, CapabilityTag};
    pub use crate::chain::{ComposedHandler, compose};
    pub use crate::context::{Principal, RequestContext};
    pub use crate::error::{DispatchError, DispatchResult};
    pub use crate::event::{AggregateRoot, DomainEvent, EventBuffer, EventEnvelope};
    pub use crate::handler::Handler;
    pub use crate::request::Request;
}
