//! Event dispatcher - drains an aggregate's buffer and delivers each event
//! to its subscribers.
//!
//! # Delivery Contract
//!
//! This is a conscious **at-most-once, best-effort** notification
//! mechanism, not an at-least-once guarantee:
//!
//! - the aggregate's buffer is drained *first* — once drained, the events
//!   are in flight and gone from the aggregate no matter what happens next,
//!   so no retry-via-aggregate is possible
//! - events are delivered in original raise order; within one event, its
//!   subscribers run in registration order
//! - a failing (or over-budget) subscriber is logged and skipped; remaining
//!   subscribers and remaining events still run — one bad subscriber must
//!   not block unrelated notifications
//! - failures are reported in aggregate via [`DeliveryReport`] and never
//!   redelivered
//!
//! By the time subscribers run, the triggering operation has already
//! committed successfully, so subscriber failures never fail that
//! operation.
//!
//! # Subscription Table
//!
//! Subscriptions are keyed by the event's stable
//! [`event_type`](relay_core::DomainEvent::event_type) identifier and wired
//! once at startup; after [`SubscriberRegistryBuilder::build`] the table is
//! immutable and safe for unbounded concurrent reads.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = SubscriberRegistry::builder();
//! builder.subscribe::<WidgetRenamed, _, _>(
//!     "WidgetRenamed.v1",
//!     "refresh-title-bar",
//!     |event| async move {
//!         title_bar.refresh(&event.new).await?;
//!         Ok(())
//!     },
//! );
//! let dispatcher = EventDispatcher::new(builder.build())
//!     .with_subscriber_budget(Duration::from_millis(200));
//!
//! let report = dispatcher.dispatch_and_clear(&mut widget).await;
//! assert!(report.is_clean());
//! ```

use futures::FutureExt;
use futures::future::BoxFuture;
use metrics::counter;
use relay_core::{AggregateRoot, DomainEvent, EventEnvelope};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The future a subscriber callback returns.
pub type SubscriberFuture = BoxFuture<'static, Result<(), anyhow::Error>>;

type Callback = Arc<dyn Fn(EventEnvelope) -> SubscriberFuture + Send + Sync>;

struct Subscriber {
    name: &'static str,
    callback: Callback,
}

/// One subscriber that could not be delivered to.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    /// The stable type identifier of the event that failed to deliver.
    pub event_type: &'static str,
    /// The registered name of the failing subscriber.
    pub subscriber: &'static str,
    /// Why delivery failed (error message or budget overrun).
    pub reason: String,
}

/// Aggregate outcome of one `dispatch_and_clear` call.
///
/// Failures listed here were logged and skipped; the events are gone from
/// the aggregate and will not be redelivered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    /// Number of (event, subscriber) deliveries that succeeded.
    pub delivered: usize,
    /// Deliveries that failed, in the order they were attempted.
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// Whether every attempted delivery succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Immutable mapping from event type identifier to its ordered subscribers.
pub struct SubscriberRegistry {
    by_type: HashMap<&'static str, Vec<Subscriber>>,
}

impl SubscriberRegistry {
    /// Start building a subscription table.
    #[must_use]
    pub fn builder() -> SubscriberRegistryBuilder {
        SubscriberRegistryBuilder {
            by_type: HashMap::new(),
        }
    }

    fn subscribers_for(&self, event_type: &str) -> &[Subscriber] {
        self.by_type.get(event_type).map_or(&[], Vec::as_slice)
    }

    /// Number of subscribers registered for the given event type.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers_for(event_type).len()
    }
}

/// Startup-time, single-task builder for a [`SubscriberRegistry`].
pub struct SubscriberRegistryBuilder {
    by_type: HashMap<&'static str, Vec<Subscriber>>,
}

impl SubscriberRegistryBuilder {
    /// Subscribe a typed callback to events with the given type identifier.
    ///
    /// The callback receives an owned clone of the concrete event. Multiple
    /// subscribers per event type are allowed; they are invoked in
    /// registration order. An envelope whose payload fails to downcast to
    /// `E` (a wiring mistake: identifier registered against the wrong
    /// type) is reported as a delivery failure for this subscriber.
    pub fn subscribe<E, F, Fut>(
        &mut self,
        event_type: &'static str,
        name: &'static str,
        handler: F,
    ) -> &mut Self
    where
        E: DomainEvent + Clone,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        let callback: Callback = Arc::new(move |envelope: EventEnvelope| {
            envelope.downcast_ref::<E>().map_or_else(
                || {
                    let actual = envelope.event_type();
                    std::future::ready(Err(anyhow::anyhow!(
                        "event '{actual}' does not match the subscribed payload type"
                    )))
                    .boxed()
                },
                |event| handler(event.clone()).boxed(),
            )
        });
        self.subscribe_raw(event_type, name, callback)
    }

    /// Subscribe an untyped callback receiving the raw [`EventEnvelope`].
    pub fn subscribe_raw(
        &mut self,
        event_type: &'static str,
        name: &'static str,
        callback: Callback,
    ) -> &mut Self {
        self.by_type
            .entry(event_type)
            .or_default()
            .push(Subscriber { name, callback });
        self
    }

    /// Freeze the wiring into an immutable subscription table.
    #[must_use]
    pub fn build(self) -> SubscriberRegistry {
        let subscriptions: usize = self.by_type.values().map(Vec::len).sum();
        tracing::info!(
            event_types = self.by_type.len(),
            subscriptions,
            "subscriber registry built"
        );
        SubscriberRegistry {
            by_type: self.by_type,
        }
    }
}

/// Drains aggregates and delivers their buffered events.
pub struct EventDispatcher {
    subscribers: SubscriberRegistry,
    budget: Option<Duration>,
}

impl EventDispatcher {
    /// Create a dispatcher over a built subscription table, with no
    /// per-subscriber budget (subscribers run unbounded on the calling
    /// task).
    #[must_use]
    pub const fn new(subscribers: SubscriberRegistry) -> Self {
        Self {
            subscribers,
            budget: None,
        }
    }

    /// Bound each subscriber invocation to a time budget. A subscriber
    /// that exceeds it is treated as failed (logged, skipped) rather than
    /// blocking the remaining subscribers indefinitely.
    #[must_use]
    pub fn with_subscriber_budget(self, budget: Duration) -> Self {
        Self {
            budget: Some(budget),
            ..self
        }
    }

    /// Atomically drain the aggregate's event buffer and deliver each
    /// drained event to its subscribers.
    ///
    /// Calling this twice without an intervening raise delivers everything
    /// the first time and nothing the second.
    pub async fn dispatch_and_clear<A: AggregateRoot>(&self, aggregate: &mut A) -> DeliveryReport {
        let envelopes = aggregate.event_buffer_mut().drain_and_clear();
        self.deliver(envelopes).await
    }

    async fn deliver(&self, envelopes: Vec<EventEnvelope>) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for envelope in envelopes {
            let event_type = envelope.event_type();
            counter!("relay_events_dispatched_total", "event_type" => event_type).increment(1);

            for subscriber in self.subscribers.subscribers_for(event_type) {
                let outcome = self.invoke(subscriber, envelope.clone()).await;
                match outcome {
                    Ok(()) => report.delivered += 1,
                    Err(reason) => {
                        tracing::warn!(
                            event_type,
                            subscriber = subscriber.name,
                            reason,
                            "subscriber failed; continuing with remaining deliveries"
                        );
                        counter!(
                            "relay_event_delivery_failures_total",
                            "event_type" => event_type
                        )
                        .increment(1);
                        report.failures.push(DeliveryFailure {
                            event_type,
                            subscriber: subscriber.name,
                            reason,
                        });
                    }
                }
            }
        }

        report
    }

    async fn invoke(&self, subscriber: &Subscriber, envelope: EventEnvelope) -> Result<(), String> {
        let fut = (subscriber.callback)(envelope);
        match self.budget {
            Some(budget) => match tokio::time::timeout(budget, fut).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!(
                    "exceeded the {}ms subscriber budget",
                    budget.as_millis()
                )),
            },
            None => fut.await.map_err(|e| e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::EventBuffer;
    use std::any::Any;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Renamed {
        new: String,
    }

    impl DomainEvent for Renamed {
        fn event_type(&self) -> &'static str {
            "Renamed.v1"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, Clone)]
    struct Archived;

    impl DomainEvent for Archived {
        fn event_type(&self) -> &'static str {
            "Archived.v1"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Widget {
        buffer: EventBuffer,
    }

    impl AggregateRoot for Widget {
        fn event_buffer(&self) -> &EventBuffer {
            &self.buffer
        }

        fn event_buffer_mut(&mut self) -> &mut EventBuffer {
            &mut self.buffer
        }
    }

    fn widget_with(events: usize) -> Widget {
        let mut widget = Widget {
            buffer: EventBuffer::new(),
        };
        for i in 0..events {
            widget.buffer.raise(Renamed {
                new: format!("name-{i}"),
            });
        }
        widget
    }

    #[tokio::test]
    async fn delivers_to_each_subscriber_exactly_once_in_registration_order() {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let mut builder = SubscriberRegistry::builder();
        for name in ["s1", "s2"] {
            let log = Arc::clone(&log);
            builder.subscribe::<Renamed, _, _>("Renamed.v1", name, move |event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("{name}:{}", event.new));
                    Ok(())
                }
            });
        }
        let dispatcher = EventDispatcher::new(builder.build());

        let mut widget = widget_with(1);
        widget.buffer.raise(Archived);

        let report = dispatcher.dispatch_and_clear(&mut widget).await;
        assert!(report.is_clean());
        assert_eq!(report.delivered, 2);
        // Subscribers on Renamed ran in registration order; nobody was
        // invoked for Archived, which has no subscribers.
        assert_eq!(*log.lock().unwrap(), vec!["s1:name-0", "s2:name-0"]);
    }

    #[tokio::test]
    async fn second_dispatch_without_new_raises_delivers_nothing() {
        let mut builder = SubscriberRegistry::builder();
        builder.subscribe::<Renamed, _, _>("Renamed.v1", "s1", |_event| async { Ok(()) });
        let dispatcher = EventDispatcher::new(builder.build());

        let mut widget = widget_with(2);

        let first = dispatcher.dispatch_and_clear(&mut widget).await;
        assert_eq!(first.delivered, 2);
        assert!(widget.event_buffer().is_empty());

        let second = dispatcher.dispatch_and_clear(&mut widget).await;
        assert_eq!(second.delivered, 0);
        assert!(second.is_clean());
    }

    #[tokio::test]
    async fn a_failing_subscriber_does_not_block_the_rest() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let mut builder = SubscriberRegistry::builder();
        builder.subscribe::<Renamed, _, _>("Renamed.v1", "bad", |_event| async {
            Err(anyhow::anyhow!("subscriber exploded"))
        });
        {
            let log = Arc::clone(&log);
            builder.subscribe::<Renamed, _, _>("Renamed.v1", "good", move |_event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("good");
                    Ok(())
                }
            });
        }
        let dispatcher = EventDispatcher::new(builder.build());

        let mut widget = widget_with(2);
        let report = dispatcher.dispatch_and_clear(&mut widget).await;

        // The good subscriber still saw both events.
        assert_eq!(*log.lock().unwrap(), vec!["good", "good"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].subscriber, "bad");
        assert!(report.failures[0].reason.contains("subscriber exploded"));
    }

    #[tokio::test]
    async fn an_over_budget_subscriber_is_treated_as_failed() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let mut builder = SubscriberRegistry::builder();
        builder.subscribe::<Renamed, _, _>("Renamed.v1", "stuck", |_event| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });
        {
            let log = Arc::clone(&log);
            builder.subscribe::<Renamed, _, _>("Renamed.v1", "prompt", move |_event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push("prompt");
                    Ok(())
                }
            });
        }
        let dispatcher =
            EventDispatcher::new(builder.build()).with_subscriber_budget(Duration::from_millis(20));

        let mut widget = widget_with(1);
        let report = dispatcher.dispatch_and_clear(&mut widget).await;

        assert_eq!(*log.lock().unwrap(), vec!["prompt"]);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subscriber, "stuck");
        assert!(report.failures[0].reason.contains("budget"));
    }

    #[tokio::test]
    async fn events_with_no_subscribers_are_dropped_silently() {
        let dispatcher = EventDispatcher::new(SubscriberRegistry::builder().build());
        let mut widget = widget_with(3);

        let report = dispatcher.dispatch_and_clear(&mut widget).await;
        assert_eq!(report.delivered, 0);
        assert!(report.is_clean());
        assert!(widget.event_buffer().is_empty());
    }
}
