//! Dispatcher - the single public entry point for sending requests.
//!
//! The dispatcher holds no business logic. It resolves the pre-composed
//! chain for the request's type, invokes it, and returns the chain's result
//! verbatim — the first failure produced anywhere in the chain reaches the
//! caller unwrapped and unsummarized.
//!
//! Every dispatch runs inside a tracing span carrying the request name and
//! correlation id, and records a `relay_dispatch_total` counter and a
//! `relay_dispatch_duration_seconds` histogram.

use crate::registry::Registry;
use metrics::{counter, histogram};
use relay_core::{DispatchResult, Request, RequestContext};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Uniform entry point for dispatching typed requests.
///
/// Cheap to clone; all clones share the same immutable registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    /// Create a dispatcher over a built registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Dispatch a request with a fresh, anonymous context.
    ///
    /// # Errors
    ///
    /// Returns the first failure produced by the chain, verbatim.
    ///
    /// # Panics
    ///
    /// Panics if `R` was never registered (a missing wiring step).
    pub async fn dispatch<R: Request>(&self, request: R) -> DispatchResult<R::Response> {
        self.dispatch_with_context(request, &RequestContext::new())
            .await
    }

    /// Dispatch a request with a caller-built context (principal, ambient
    /// values).
    ///
    /// # Errors
    ///
    /// Returns the first failure produced by the chain, verbatim.
    ///
    /// # Panics
    ///
    /// Panics if `R` was never registered (a missing wiring step).
    pub async fn dispatch_with_context<R: Request>(
        &self,
        request: R,
        ctx: &RequestContext,
    ) -> DispatchResult<R::Response> {
        let chain = self.registry.resolve::<R>();
        let span = tracing::info_span!(
            "dispatch",
            request = R::name(),
            correlation_id = %ctx.correlation_id(),
        );

        let started = Instant::now();
        let result = chain.handle(request, ctx).instrument(span).await;
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        counter!("relay_dispatch_total", "request" => R::name(), "outcome" => outcome)
            .increment(1);
        histogram!("relay_dispatch_duration_seconds", "request" => R::name())
            .record(elapsed.as_secs_f64());

        result
    }

    /// The registry this dispatcher routes through.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::prelude::*;

    struct CreateWidget {
        name: String,
    }

    struct WidgetCreated {
        id: u64,
        name: String,
    }

    impl Request for CreateWidget {
        type Response = WidgetCreated;

        fn name() -> &'static str {
            "CreateWidget"
        }
    }

    struct CreateWidgetHandler;

    #[async_trait]
    impl Handler<CreateWidget> for CreateWidgetHandler {
        async fn handle(
            &self,
            request: CreateWidget,
            _ctx: &RequestContext,
        ) -> DispatchResult<WidgetCreated> {
            Ok(WidgetCreated {
                id: 1,
                name: request.name,
            })
        }
    }

    #[tokio::test]
    async fn happy_path_returns_the_handler_response() {
        let mut builder = Registry::builder();
        builder.register(CreateWidgetHandler, CapabilitySet::new());
        let dispatcher = Dispatcher::new(builder.build());

        let created = dispatcher
            .dispatch(CreateWidget {
                name: "Foo".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.name, "Foo");
    }

    #[tokio::test]
    async fn concurrent_dispatches_share_one_registry() {
        let mut builder = Registry::builder();
        builder.register(CreateWidgetHandler, CapabilitySet::new());
        let dispatcher = Dispatcher::new(builder.build());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .dispatch(CreateWidget {
                            name: format!("widget-{i}"),
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
    }
}
