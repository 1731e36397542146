//! Chain composer - builds the ordered wrapping of behaviors around a
//! base handler.
//!
//! Composition is iterative and happens once, at startup. Behaviors are
//! given in **registration order**: the first-registered behavior is wrapped
//! immediately around the base handler, and the last-registered one becomes
//! the outermost layer. At call time the chain therefore executes in the
//! **reverse** of registration order, ending at the base handler.
//!
//! ```text
//! compose(handler, tags, [B1, B2, B3])
//!
//!   call ──► B3 ──► B2 ──► B1 ──► handler
//! ```
//!
//! This is the single most important invariant of the pipeline and is pinned
//! by tests that snapshot the full ordered layer list actually invoked.
//!
//! The produced [`ComposedHandler`] is opaque to callers — it has the same
//! calling contract as a plain handler. Links are one-directional `Arc`s
//! built once and never mutated, so no cycle can exist. The base handler's
//! capability set is resolved at composition time and cached on every link;
//! behaviors read it through [`Inner::capabilities`] without walking the
//! chain.

use crate::behavior::{Behavior, Inner};
use crate::capability::CapabilitySet;
use crate::context::{LayerKind, RequestContext};
use crate::error::DispatchResult;
use crate::handler::Handler;
use crate::request::Request;
use async_trait::async_trait;
use std::sync::Arc;

/// The innermost link: the base handler plus its capability tags.
struct BaseLink<R: Request> {
    handler: Arc<dyn Handler<R>>,
    capabilities: Arc<CapabilitySet>,
}

#[async_trait]
impl<R: Request> Inner<R> for BaseLink<R> {
    fn layer_name(&self) -> &'static str {
        R::name()
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    async fn call(&self, request: R, ctx: &RequestContext) -> DispatchResult<R::Response> {
        ctx.trace().record(R::name(), LayerKind::Handler);
        self.handler.handle(request, ctx).await
    }
}

/// One behavior layer plus everything inside it.
struct Link<R: Request> {
    behavior: Arc<dyn Behavior<R>>,
    inner: Arc<dyn Inner<R>>,
    capabilities: Arc<CapabilitySet>,
}

#[async_trait]
impl<R: Request> Inner<R> for Link<R> {
    fn layer_name(&self) -> &'static str {
        self.behavior.name()
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    async fn call(&self, request: R, ctx: &RequestContext) -> DispatchResult<R::Response> {
        ctx.trace().record(self.behavior.name(), LayerKind::Behavior);
        self.behavior.handle(request, ctx, self.inner.as_ref()).await
    }
}

/// The outermost link of a composed chain.
///
/// Same contract as a plain handler; callers cannot tell whether zero or
/// ten behaviors sit between them and the handler.
pub struct ComposedHandler<R: Request> {
    outermost: Arc<dyn Inner<R>>,
    layers: Vec<&'static str>,
    capabilities: Arc<CapabilitySet>,
}

impl<R: Request> ComposedHandler<R> {
    /// Invoke the full chain for one request.
    ///
    /// # Errors
    ///
    /// Returns the first failure produced by any layer, verbatim.
    pub async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
    ) -> DispatchResult<R::Response> {
        self.outermost.call(request, ctx).await
    }

    /// Ordered layer names, outermost first, ending with the handler.
    ///
    /// This is the static composition; the per-call counterpart is the
    /// context's [`InvocationTrace`](crate::context::InvocationTrace), which
    /// records only the layers actually entered.
    #[must_use]
    pub fn layers(&self) -> &[&'static str] {
        &self.layers
    }

    /// Capability tags of the base handler at the center of this chain.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }
}

/// Compose a chain from a base handler, its capability tags, and behaviors
/// in registration order.
///
/// The first behavior in `behaviors` ends up immediately around the base
/// handler; the last one becomes the outermost layer.
pub fn compose<R: Request>(
    handler: Arc<dyn Handler<R>>,
    tags: CapabilitySet,
    behaviors: Vec<Arc<dyn Behavior<R>>>,
) -> ComposedHandler<R> {
    let capabilities = Arc::new(tags);
    let mut layers: Vec<&'static str> = vec![R::name()];
    let mut outermost: Arc<dyn Inner<R>> = Arc::new(BaseLink {
        handler,
        capabilities: Arc::clone(&capabilities),
    });

    for behavior in behaviors {
        layers.push(behavior.name());
        outermost = Arc::new(Link {
            behavior,
            inner: outermost,
            capabilities: Arc::clone(&capabilities),
        });
    }

    // Stored outermost-first to match execution order.
    layers.reverse();

    tracing::debug!(
        request = R::name(),
        layers = ?layers,
        "composed dispatch chain"
    );

    ComposedHandler {
        outermost,
        layers,
        capabilities,
    }
}
