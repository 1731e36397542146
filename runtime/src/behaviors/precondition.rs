//! Precondition-validation behavior.

use async_trait::async_trait;
use relay_core::{
    Behavior, CapabilityTag, DispatchError, DispatchResult, Inner, Request, RequestContext,
};
use std::sync::Arc;

/// A check that must hold before a handler tagged
/// [`CapabilityTag::RequiresActiveContext`] may run — typically "an active
/// working context must exist".
pub trait Precondition: Send + Sync {
    /// Stable name of this precondition, for logs.
    fn name(&self) -> &'static str;

    /// Check the precondition against the current context.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the precondition does not hold.
    fn check(&self, ctx: &RequestContext) -> Result<(), String>;
}

/// Enforces a [`Precondition`] for handlers that declare they need one.
///
/// Runs after authorization, so unauthorized callers never see precondition
/// error detail. Handlers without the tag pass through untouched.
pub struct PreconditionBehavior {
    precondition: Arc<dyn Precondition>,
}

impl PreconditionBehavior {
    /// Create the behavior around a precondition check.
    #[must_use]
    pub fn new(precondition: Arc<dyn Precondition>) -> Self {
        Self { precondition }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for PreconditionBehavior {
    fn name(&self) -> &'static str {
        "precondition"
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        if !next
            .capabilities()
            .contains(&CapabilityTag::RequiresActiveContext)
        {
            return next.call(request, ctx).await;
        }

        if let Err(reason) = self.precondition.check(ctx) {
            tracing::warn!(
                request = R::name(),
                correlation_id = %ctx.correlation_id(),
                precondition = self.precondition.name(),
                reason,
                "precondition failed"
            );
            return Err(DispatchError::PreconditionFailed { reason });
        }

        next.call(request, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{CapabilitySet, Handler, compose};

    struct Save;

    impl Request for Save {
        type Response = ();

        fn name() -> &'static str {
            "Save"
        }
    }

    struct SaveHandler;

    #[async_trait]
    impl Handler<Save> for SaveHandler {
        async fn handle(&self, _request: Save, _ctx: &RequestContext) -> DispatchResult<()> {
            Ok(())
        }
    }

    /// Holds only when the context carries an `ActiveDocument` extension.
    struct ActiveDocument(#[allow(dead_code)] String);

    struct ActiveDocumentOpen;

    impl Precondition for ActiveDocumentOpen {
        fn name(&self) -> &'static str {
            "active-document-open"
        }

        fn check(&self, ctx: &RequestContext) -> Result<(), String> {
            if ctx.get::<ActiveDocument>().is_some() {
                Ok(())
            } else {
                Err("no active document is open".to_string())
            }
        }
    }

    fn tagged_chain() -> relay_core::ComposedHandler<Save> {
        compose(
            Arc::new(SaveHandler),
            CapabilitySet::new().with(CapabilityTag::RequiresActiveContext),
            vec![Arc::new(PreconditionBehavior::new(Arc::new(
                ActiveDocumentOpen,
            )))],
        )
    }

    #[tokio::test]
    async fn fails_when_the_precondition_does_not_hold() {
        let chain = tagged_chain();
        let ctx = RequestContext::new();

        let err = chain.handle(Save, &ctx).await.unwrap_err();
        assert!(
            matches!(err, DispatchError::PreconditionFailed { reason } if reason.contains("no active document"))
        );
        assert_eq!(ctx.trace().layers(), vec!["precondition"]);
    }

    #[tokio::test]
    async fn delegates_when_the_precondition_holds() {
        let chain = tagged_chain();
        let ctx = RequestContext::new();
        ctx.insert(ActiveDocument("report.odt".to_string()));

        chain.handle(Save, &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn untagged_handlers_skip_the_check() {
        let chain = compose(
            Arc::new(SaveHandler),
            CapabilitySet::new(),
            vec![Arc::new(PreconditionBehavior::new(Arc::new(
                ActiveDocumentOpen,
            )))],
        );

        chain.handle(Save, &RequestContext::new()).await.unwrap();
    }
}
