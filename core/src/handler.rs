//! Handler trait - the unit of work at the center of the chain.

use crate::context::RequestContext;
use crate::error::DispatchResult;
use crate::request::Request;
use async_trait::async_trait;

/// The base unit of work: turns one request into one result.
///
/// Handlers are constructed once at process startup and are stateless or
/// hold only injected collaborators that are immutable after construction.
/// They know nothing about the behaviors wrapped around them.
///
/// A handler may call into collaborators (storage, external services) and
/// surface their failures through [`DispatchError::Handler`]; domain-level
/// rejections use the structured variants instead.
///
/// [`DispatchError::Handler`]: crate::error::DispatchError::Handler
///
/// # Example
///
/// ```
/// use relay_core::prelude::*;
///
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = String;
///
///     fn name() -> &'static str {
///         "Ping"
///     }
/// }
///
/// struct PingHandler;
///
/// #[async_trait]
/// impl Handler<Ping> for PingHandler {
///     async fn handle(&self, _request: Ping, _ctx: &RequestContext) -> DispatchResult<String> {
///         Ok("pong".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    /// Execute the operation described by `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`](crate::error::DispatchError) for any
    /// domain-level rejection or collaborator failure.
    async fn handle(&self, request: R, ctx: &RequestContext) -> DispatchResult<R::Response>;
}
