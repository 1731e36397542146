//! Behavior (decorator) contract for cross-cutting pipeline layers.
//!
//! A behavior wraps an inner layer of the same request/response shape. On
//! invocation it may perform pre-work, consult the capability tags of the
//! innermost base handler to decide whether to act at all, delegate inward,
//! perform post-work on the result, or short-circuit with a failure without
//! delegating.
//!
//! Two rules are absolute:
//!
//! - a behavior must delegate to its inner layer on every path unless it
//!   short-circuits with an `Err`
//! - a behavior must never convert an `Err` into an `Ok`; it may only pass a
//!   failure through unchanged
//!
//! The capability tags a behavior sees via [`Inner::capabilities`] are those
//! of the innermost, non-behavior handler — resolved once at composition
//! time and cached on every link, since tags never change after
//! registration.

use crate::capability::CapabilitySet;
use crate::context::RequestContext;
use crate::error::DispatchResult;
use crate::request::Request;
use async_trait::async_trait;

/// The next layer inward from a behavior: either another behavior link or
/// the base handler itself.
#[async_trait]
pub trait Inner<R: Request>: Send + Sync {
    /// Stable name of this layer, used in traces and logs.
    fn layer_name(&self) -> &'static str;

    /// Capability tags of the innermost base handler of this chain.
    fn capabilities(&self) -> &CapabilitySet;

    /// Invoke this layer and everything inside it.
    ///
    /// # Errors
    ///
    /// Propagates the first failure produced by any inner layer, verbatim.
    async fn call(&self, request: R, ctx: &RequestContext) -> DispatchResult<R::Response>;
}

/// A cross-cutting decorator layer in the dispatch chain.
///
/// # Example
///
/// A pass-through behavior that tags slow traffic:
///
/// ```
/// use relay_core::prelude::*;
/// use relay_core::behavior::Inner;
///
/// struct Shadow;
///
/// #[async_trait]
/// impl<R: Request> Behavior<R> for Shadow {
///     fn name(&self) -> &'static str {
///         "shadow"
///     }
///
///     async fn handle(
///         &self,
///         request: R,
///         ctx: &RequestContext,
///         next: &dyn Inner<R>,
///     ) -> DispatchResult<R::Response> {
///         // pre-work would go here
///         next.call(request, ctx).await
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior<R: Request>: Send + Sync {
    /// Stable name of this behavior, used in traces, logs, and tests that
    /// assert the execution order of the chain.
    fn name(&self) -> &'static str;

    /// Run this layer: pre-work, optional delegation via `next`, post-work.
    ///
    /// # Errors
    ///
    /// Returns a failure to short-circuit the chain (no inner layer runs),
    /// or propagates a failure produced further in.
    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response>;
}
