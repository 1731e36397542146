//! Domain events, the per-aggregate event buffer, and the aggregate root
//! contract.
//!
//! A domain event is an immutable record of something that *already
//! happened* inside an aggregate. It carries only data — never a reference
//! back to the aggregate that raised it. Events are appended to the
//! aggregate's private buffer only as a side effect of a successful state
//! transition; a failed transition raises none.
//!
//! The buffer is born empty, grows during one logical operation, and is
//! drained atomically by the event dispatcher before the operation's result
//! is returned to the original caller. It is never left populated across
//! operation boundaries.
//!
//! # Event Naming Convention
//!
//! [`DomainEvent::event_type`] returns a stable string identifier with a
//! version suffix, used as the subscription-table key:
//!
//! - `"WidgetCreated.v1"`
//! - `"WidgetRenamed.v1"`
//! - `"WidgetRenamed.v2"` (after a schema change)
//!
//! # Example
//!
//! ```
//! use relay_core::event::{DomainEvent, EventBuffer};
//! use std::any::Any;
//!
//! #[derive(Debug, Clone)]
//! struct WidgetRenamed {
//!     old: String,
//!     new: String,
//! }
//!
//! impl DomainEvent for WidgetRenamed {
//!     fn event_type(&self) -> &'static str {
//!         "WidgetRenamed.v1"
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let mut buffer = EventBuffer::new();
//! buffer.raise(WidgetRenamed {
//!     old: "Foo".to_string(),
//!     new: "Bar".to_string(),
//! });
//!
//! let drained = buffer.drain_and_clear();
//! assert_eq!(drained.len(), 1);
//! assert!(buffer.is_empty());
//! ```

use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An immutable fact raised by an aggregate's successful state transition.
///
/// Events must be `Send + Sync + 'static` so envelopes can cross task
/// boundaries on their way to subscribers.
pub trait DomainEvent: fmt::Debug + Send + Sync + 'static {
    /// Stable identifier for this event type, including a version suffix.
    ///
    /// This string keys the subscription table: subscribers register
    /// against it, and the event dispatcher routes by it. Treat it as a
    /// wire-format constant — changing it orphans existing subscriptions.
    fn event_type(&self) -> &'static str;

    /// Upcast for typed downcasting in subscribers.
    fn as_any(&self) -> &dyn Any;
}

/// A raised event plus the moment it was recorded.
///
/// Envelopes are cheap to clone (the payload is shared) and preserve raise
/// order through drain and delivery.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    event: Arc<dyn DomainEvent>,
    recorded_at: DateTime<Utc>,
}

impl EventEnvelope {
    fn new(event: Arc<dyn DomainEvent>) -> Self {
        Self {
            event,
            recorded_at: Utc::now(),
        }
    }

    /// The wrapped event.
    #[must_use]
    pub fn event(&self) -> &dyn DomainEvent {
        self.event.as_ref()
    }

    /// The wrapped event's stable type identifier.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }

    /// When the event was recorded into the buffer.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Downcast the payload to a concrete event type.
    #[must_use]
    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.event.as_any().downcast_ref::<E>()
    }
}

/// Private, ordered accumulation of the events one aggregate instance has
/// raised during the current logical operation.
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<EventEnvelope>,
}

impl EventBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    ///
    /// Only callable from within the aggregate's own state-mutating
    /// operations, and only after the state transition has succeeded.
    pub fn raise<E: DomainEvent>(&mut self, event: E) {
        self.events.push(EventEnvelope::new(Arc::new(event)));
    }

    /// Non-destructive ordered view of the buffered events.
    #[must_use]
    pub fn peek(&self) -> &[EventEnvelope] {
        &self.events
    }

    /// Atomically take the buffered events and reset the buffer to empty.
    ///
    /// A single move: no caller can observe a state between "copied" and
    /// "cleared". Calling this twice without an intervening
    /// [`raise`](Self::raise) yields an empty sequence the second time.
    #[must_use]
    pub fn drain_and_clear(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.events)
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer currently holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Owner of domain state and of the buffer of events that state has raised.
///
/// One aggregate instance is exclusively owned by one logical operation at
/// a time; the surrounding transaction boundary (out of scope here)
/// enforces that, so the buffer needs no internal synchronization.
pub trait AggregateRoot {
    /// Read-only access to the aggregate's event buffer.
    fn event_buffer(&self) -> &EventBuffer;

    /// Mutable access to the aggregate's event buffer, used by the event
    /// dispatcher to drain it.
    fn event_buffer_mut(&mut self) -> &mut EventBuffer;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Renamed {
        old: String,
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

    #[derive(Debug)]
    struct Archived;

    impl DomainEvent for Archived {
        fn event_type(&self) -> &'static str {
            "Archived.v1"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn buffer_preserves_raise_order() {
        let mut buffer = EventBuffer::new();
        buffer.raise(Renamed {
            old: "a".to_string(),
            new: "b".to_string(),
        });
        buffer.raise(Archived);

        let types: Vec<&str> = buffer.peek().iter().map(EventEnvelope::event_type).collect();
        assert_eq!(types, vec!["Renamed.v1", "Archived.v1"]);
    }

    #[test]
    fn peek_is_non_destructive() {
        let mut buffer = EventBuffer::new();
        buffer.raise(Archived);

        assert_eq!(buffer.peek().len(), 1);
        assert_eq!(buffer.peek().len(), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn drain_and_clear_is_idempotent_without_new_raises() {
        let mut buffer = EventBuffer::new();
        buffer.raise(Archived);
        buffer.raise(Archived);

        let first = buffer.drain_and_clear();
        assert_eq!(first.len(), 2);
        assert!(buffer.is_empty());

        let second = buffer.drain_and_clear();
        assert!(second.is_empty());
    }

    #[test]
    fn envelope_downcasts_to_the_concrete_event() {
        let mut buffer = EventBuffer::new();
        buffer.raise(Renamed {
            old: "Foo".to_string(),
            new: "Bar".to_string(),
        });

        let drained = buffer.drain_and_clear();
        let renamed = drained[0].downcast_ref::<Renamed>().unwrap();
        assert_eq!(renamed.new, "Bar");
        assert!(drained[0].downcast_ref::<Archived>().is_none());
    }
}
