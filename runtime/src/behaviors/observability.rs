//! Observability behavior - structured logging of every call.

use async_trait::async_trait;
use relay_core::{Behavior, CapabilityTag, DispatchResult, Inner, Request, RequestContext};

/// Outermost layer: logs every request entering the pipeline and its
/// outcome, including failures raised anywhere further in.
///
/// A handler tagged [`CapabilityTag::SkipObservability`] passes through
/// silently (chatty internal traffic opts out this way); everything else is
/// logged with the request name and correlation id.
pub struct ObservabilityBehavior;

#[async_trait]
impl<R: Request> Behavior<R> for ObservabilityBehavior {
    fn name(&self) -> &'static str {
        "observability"
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        if next
            .capabilities()
            .contains(&CapabilityTag::SkipObservability)
        {
            return next.call(request, ctx).await;
        }

        tracing::debug!(
            request = R::name(),
            correlation_id = %ctx.correlation_id(),
            "request entering pipeline"
        );

        let result = next.call(request, ctx).await;

        match &result {
            Ok(_) => tracing::info!(
                request = R::name(),
                correlation_id = %ctx.correlation_id(),
                "request handled"
            ),
            Err(err) => tracing::warn!(
                request = R::name(),
                correlation_id = %ctx.correlation_id(),
                kind = err.kind(),
                error = %err,
                "request failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::{CapabilitySet, Handler, compose};
    use std::sync::Arc;

    struct Noop;

    impl Request for Noop {
        type Response = ();

        fn name() -> &'static str {
            "Noop"
        }
    }

    struct NoopHandler;

    #[async_trait]
    impl Handler<Noop> for NoopHandler {
        async fn handle(&self, _request: Noop, _ctx: &RequestContext) -> DispatchResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn delegates_on_success_and_skip() {
        for tags in [
            CapabilitySet::new(),
            CapabilitySet::new().with(CapabilityTag::SkipObservability),
        ] {
            let chain = compose(
                Arc::new(NoopHandler),
                tags,
                vec![Arc::new(ObservabilityBehavior)],
            );
            let ctx = RequestContext::new();
            chain.handle(Noop, &ctx).await.unwrap();
            assert_eq!(ctx.trace().layers(), vec!["observability", "Noop"]);
        }
    }
}
