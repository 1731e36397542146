//! Probe behaviors, handlers, and subscribers that record what the
//! pipeline actually did.

use async_trait::async_trait;
use relay_core::{
    Behavior, DispatchError, DispatchResult, EventEnvelope, Handler, Inner, Request,
    RequestContext,
};
use relay_runtime::events::SubscriberFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared, ordered log of layer names, appended as layers are entered.
///
/// Clones share the same underlying log.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl InvocationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, name: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.into());
    }

    /// Snapshot of all entries in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// A pass-through behavior that records its name when entered.
pub struct ProbeBehavior {
    name: &'static str,
    log: InvocationLog,
}

impl ProbeBehavior {
    /// Create a probe with the given name, recording into `log`.
    #[must_use]
    pub fn new(name: &'static str, log: &InvocationLog) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for ProbeBehavior {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(
        &self,
        request: R,
        ctx: &RequestContext,
        next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        self.log.record(self.name);
        next.call(request, ctx).await
    }
}

/// A behavior that short-circuits with a validation failure and never
/// delegates.
pub struct FailingBehavior {
    name: &'static str,
    reason: String,
}

impl FailingBehavior {
    /// Create a failing behavior with the given name and failure reason.
    pub fn new(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            name,
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for FailingBehavior {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(
        &self,
        _request: R,
        _ctx: &RequestContext,
        _next: &dyn Inner<R>,
    ) -> DispatchResult<R::Response> {
        Err(DispatchError::Validation {
            reason: self.reason.clone(),
        })
    }
}

/// A handler that counts its invocations, records into the shared log, and
/// returns `R::Response::default()`.
pub struct CountingHandler {
    invocations: Arc<AtomicUsize>,
    log: InvocationLog,
}

impl CountingHandler {
    /// Create a counting handler recording into `log`.
    #[must_use]
    pub fn new(log: &InvocationLog) -> Self {
        Self {
            invocations: Arc::new(AtomicUsize::new(0)),
            log: log.clone(),
        }
    }

    /// Shared counter of how many times the handler has run.
    #[must_use]
    pub fn invocations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.invocations)
    }
}

#[async_trait]
impl<R> Handler<R> for CountingHandler
where
    R: Request,
    R::Response: Default,
{
    async fn handle(&self, _request: R, _ctx: &RequestContext) -> DispatchResult<R::Response> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.log.record("handler");
        Ok(R::Response::default())
    }
}

/// Records `(subscriber, event_type)` pairs in delivery order.
///
/// Clones share the same underlying record.
#[derive(Debug, Clone, Default)]
pub struct CapturedDeliveries {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl CapturedDeliveries {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A raw subscriber callback that records every delivery under
    /// `subscriber_name` and succeeds.
    ///
    /// Pass the result to
    /// [`SubscriberRegistryBuilder::subscribe_raw`](relay_runtime::SubscriberRegistryBuilder::subscribe_raw).
    #[must_use]
    pub fn callback(
        &self,
        subscriber_name: &'static str,
    ) -> Arc<dyn Fn(EventEnvelope) -> SubscriberFuture + Send + Sync> {
        let entries = Arc::clone(&self.entries);
        Arc::new(move |envelope: EventEnvelope| {
            entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((subscriber_name.to_string(), envelope.event_type().to_string()));
            let done: SubscriberFuture = Box::pin(async { Ok(()) });
            done
        })
    }

    /// A raw subscriber callback that records the delivery and then fails
    /// with the given message, for exercising log-and-continue delivery.
    #[must_use]
    pub fn failing_callback(
        &self,
        subscriber_name: &'static str,
        message: &'static str,
    ) -> Arc<dyn Fn(EventEnvelope) -> SubscriberFuture + Send + Sync> {
        let entries = Arc::clone(&self.entries);
        Arc::new(move |envelope: EventEnvelope| {
            entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((subscriber_name.to_string(), envelope.event_type().to_string()));
            let failed: SubscriberFuture = Box::pin(async move { Err(anyhow::anyhow!(message)) });
            failed
        })
    }

    /// Snapshot of all `(subscriber, event_type)` pairs in delivery order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
