//! Entitlement (authorization) behavior.

use async_trait::async_trait;
use relay_core::{
    Behavior, CapabilityTag, DispatchError, DispatchResult, Inner, Request, RequestContext,
};

/// Default-deny authorization: a handler must either declare the
/// entitlements it requires or explicitly opt out of the check.
///
/// The required entitlements come from the base handler's
/// [`CapabilityTag::Entitlement`](relay_core::CapabilityTag::Entitlement)
/// tags; the granted ones from the context's
/// [`Principal`](relay_core::Principal). A handler carrying no entitlement
/// tags is denied outright unless it is tagged
/// [`CapabilityTag::SkipEntitlementCheck`], so a handler never slips past
/// authorization by omission. A tagged handler dispatched without a
/// principal, or with a principal missing any required entitlement,
/// short-circuits with [`DispatchError::EntitlementDenied`] and the base
/// handler never runs.
pub struct EntitlementBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for EntitlementBehavior {
    fn name(&self) -> &'static str {
        "entitlement"
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        let capabilities = next.capabilities();
        if capabilities.contains(&CapabilityTag::SkipEntitlementCheck) {
            return next.call(request, ctx).await;
        }

        let mut required = capabilities.entitlements().peekable();
        if required.peek().is_none() {
            tracing::warn!(
                request = R::name(),
                correlation_id = %ctx.correlation_id(),
                "handler declares no entitlements and does not opt out; denying"
            );
            return Err(DispatchError::EntitlementDenied {
                entitlement: "(undeclared)".to_string(),
            });
        }

        let principal = ctx.principal();
        for entitlement in required {
            let granted = principal
                .as_ref()
                .is_some_and(|p| p.has_entitlement(entitlement));
            if !granted {
                tracing::warn!(
                    request = R::name(),
                    correlation_id = %ctx.correlation_id(),
                    entitlement,
                    principal = principal.as_ref().map(relay_core::Principal::name),
                    "entitlement denied"
                );
                return Err(DispatchError::EntitlementDenied {
                    entitlement: entitlement.to_string(),
                });
            }
        }

        next.call(request, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{CapabilitySet, CapabilityTag, Handler, Principal, compose};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Export;

    impl Request for Export {
        type Response = ();

        fn name() -> &'static str {
            "Export"
        }
    }

    struct ExportHandler {
        invocations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler<Export> for ExportHandler {
        async fn handle(&self, _request: Export, _ctx: &RequestContext) -> DispatchResult<()> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn export_chain(
        invocations: &Arc<AtomicUsize>,
    ) -> relay_core::ComposedHandler<Export> {
        compose(
            Arc::new(ExportHandler {
                invocations: Arc::clone(invocations),
            }),
            CapabilitySet::new().with(CapabilityTag::entitlement("export")),
            vec![Arc::new(EntitlementBehavior)],
        )
    }

    #[tokio::test]
    async fn denies_without_a_principal_and_never_invokes_the_handler() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = export_chain(&invocations);

        let err = chain.handle(Export, &RequestContext::new()).await.unwrap_err();
        assert!(
            matches!(err, DispatchError::EntitlementDenied { entitlement } if entitlement == "export")
        );
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denies_a_principal_missing_the_entitlement() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = export_chain(&invocations);
        let ctx = RequestContext::with_principal(Principal::new("bob").with_entitlement("print"));

        let err = chain.handle(Export, &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::EntitlementDenied { .. }));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delegates_when_the_entitlement_is_granted() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = export_chain(&invocations);
        let ctx = RequestContext::with_principal(Principal::new("alice").with_entitlement("export"));

        chain.handle(Export, &ctx).await.unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handlers_without_entitlement_tags_are_denied_by_default() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = compose(
            Arc::new(ExportHandler {
                invocations: Arc::clone(&invocations),
            }),
            CapabilitySet::new(),
            vec![Arc::new(EntitlementBehavior)],
        );

        let err = chain.handle(Export, &RequestContext::new()).await.unwrap_err();
        assert!(matches!(err, DispatchError::EntitlementDenied { .. }));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn opted_out_handlers_pass_through() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let chain = compose(
            Arc::new(ExportHandler {
                invocations: Arc::clone(&invocations),
            }),
            CapabilitySet::new().with(CapabilityTag::SkipEntitlementCheck),
            vec![Arc::new(EntitlementBehavior)],
        );

        chain.handle(Export, &RequestContext::new()).await.unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }
}
