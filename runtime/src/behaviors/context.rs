//! Context-establishment behavior.

use async_trait::async_trait;
use relay_core::{Behavior, DispatchError, DispatchResult, Inner, Request, RequestContext};
use std::sync::Arc;

/// Resolves the ambient context one dispatch needs: the principal, the
/// active working context, session-scoped values.
///
/// Implementations publish what they resolve through
/// [`RequestContext::set_principal`] and [`RequestContext::insert`], where
/// later layers (entitlement and precondition checks, the handler) read it.
pub trait ContextResolver: Send + Sync {
    /// Resolve and publish ambient context for this dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingContext`] (or another domain error)
    /// when required ambient context cannot be established.
    fn resolve(&self, ctx: &RequestContext) -> Result<(), DispatchError>;
}

/// Runs its [`ContextResolver`] before delegating, so every inner layer
/// sees a fully established context.
///
/// Placed directly inside observability: checks that depend on ambient
/// context must never run before it.
pub struct ContextBehavior {
    resolver: Arc<dyn ContextResolver>,
}

impl ContextBehavior {
    /// Create the behavior around a resolver.
    #[must_use]
    pub fn new(resolver: Arc<dyn ContextResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for ContextBehavior {
    fn name(&self) -> &'static str {
        "context"
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        self.resolver.resolve(ctx)?;
        next.call(request, ctx).await
    }
}
