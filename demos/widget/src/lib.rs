//! # Widget Example
//!
//! A small widget catalog demonstrating the Relay pipeline end to end:
//!
//! - typed requests (`CreateWidget`, `RenameWidget`, `ExportWidget`) routed
//!   through one dispatcher
//! - capability tags driving the entitlement check (`ExportWidget` requires
//!   the `"export"` entitlement; the others opt out of the check
//!   explicitly)
//! - a `Widget` aggregate that raises domain events only on successful
//!   state transitions, drained and delivered before the handler returns
//! - an audit-log subscriber receiving those events
//!
//! ## Example
//!
//! ```no_run
//! use widget::{AuditLog, CreateWidget, WidgetStore, build_dispatcher, build_event_dispatcher};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let audit = Arc::new(AuditLog::default());
//! let events = Arc::new(build_event_dispatcher(Arc::clone(&audit)));
//! let store = Arc::new(WidgetStore::default());
//! let dispatcher = build_dispatcher(store, events);
//!
//! let view = dispatcher
//!     .dispatch(CreateWidget { name: "Foo".to_string() })
//!     .await
//!     .unwrap();
//! assert_eq!(view.name, "Foo");
//! # }
//! ```

use async_trait::async_trait;
use relay_core::prelude::*;
use relay_runtime::behaviors::{EntitlementBehavior, ObservabilityBehavior, TimingBehavior};
use relay_runtime::{
    BehaviorStack, Dispatcher, EventDispatcher, Registry, SubscriberRegistry,
};
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

// ---------------------------------------------------------------------------
// Domain events
// ---------------------------------------------------------------------------

/// A widget came into existence.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetCreated {
    /// The new widget's id.
    pub id: u64,
    /// The name it was created with.
    pub name: String,
}

impl DomainEvent for WidgetCreated {
    fn event_type(&self) -> &'static str {
        "WidgetCreated.v1"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A widget's name changed.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetRenamed {
    /// The renamed widget's id.
    pub id: u64,
    /// The name before the change.
    pub old: String,
    /// The name after the change.
    pub new: String,
}

impl DomainEvent for WidgetRenamed {
    fn event_type(&self) -> &'static str {
        "WidgetRenamed.v1"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// The widget aggregate: state plus the events its transitions raise.
#[derive(Debug)]
pub struct Widget {
    id: u64,
    name: String,
    events: EventBuffer,
}

impl Widget {
    /// Create a widget with a validated name; raises [`WidgetCreated`].
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Validation`] when the name is empty; no
    /// event is raised in that case.
    pub fn create(id: u64, name: impl Into<String>) -> DispatchResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DispatchError::Validation {
                reason: "widget name must not be empty".to_string(),
            });
        }
        let mut widget = Self {
            id,
            name: name.clone(),
            events: EventBuffer::new(),
        };
        widget.events.raise(WidgetCreated { id, name });
        Ok(widget)
    }

    /// Rename the widget; raises [`WidgetRenamed`] on success.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Validation`] when the new name is empty.
    /// A failed rename leaves the event buffer untouched.
    pub fn rename(&mut self, new_name: impl Into<String>) -> DispatchResult<()> {
        let new_name = new_name.into();
        if new_name.is_empty() {
            return Err(DispatchError::Validation {
                reason: "widget name must not be empty".to_string(),
            });
        }
        let old = std::mem::replace(&mut self.name, new_name.clone());
        self.events.raise(WidgetRenamed {
            id: self.id,
            old,
            new: new_name,
        });
        Ok(())
    }

    /// The widget's id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The widget's current name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AggregateRoot for Widget {
    fn event_buffer(&self) -> &EventBuffer {
        &self.events
    }

    fn event_buffer_mut(&mut self) -> &mut EventBuffer {
        &mut self.events
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory widget storage shared by the handlers.
///
/// The async mutex is held across the event-delivery await while one
/// logical operation owns its aggregate exclusively.
#[derive(Default)]
pub struct WidgetStore {
    widgets: tokio::sync::Mutex<HashMap<u64, Widget>>,
    next_id: AtomicU64,
}

impl WidgetStore {
    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Snapshot of a widget returned by state-changing requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetView {
    /// The widget's id.
    pub id: u64,
    /// The widget's name after the operation.
    pub name: String,
}

/// Create a widget with the given name.
pub struct CreateWidget {
    /// The name for the new widget.
    pub name: String,
}

impl Request for CreateWidget {
    type Response = WidgetView;

    fn name() -> &'static str {
        "CreateWidget"
    }
}

/// Rename an existing widget.
pub struct RenameWidget {
    /// Which widget to rename.
    pub id: u64,
    /// The new name.
    pub new_name: String,
}

impl Request for RenameWidget {
    type Response = WidgetView;

    fn name() -> &'static str {
        "RenameWidget"
    }
}

/// Export a widget; requires the `"export"` entitlement.
pub struct ExportWidget {
    /// Which widget to export.
    pub id: u64,
}

impl Request for ExportWidget {
    type Response = String;

    fn name() -> &'static str {
        "ExportWidget"
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

struct CreateWidgetHandler {
    store: Arc<WidgetStore>,
    events: Arc<EventDispatcher>,
}

#[async_trait]
impl Handler<CreateWidget> for CreateWidgetHandler {
    async fn handle(
        &self,
        request: CreateWidget,
        _ctx: &RequestContext,
    ) -> DispatchResult<WidgetView> {
        let id = self.store.allocate_id();
        let mut widget = Widget::create(id, request.name)?;

        // Buffered events are drained and delivered before the result
        // reaches the caller.
        self.events.dispatch_and_clear(&mut widget).await;

        let view = WidgetView {
            id,
            name: widget.name().to_string(),
        };
        self.store.widgets.lock().await.insert(id, widget);
        Ok(view)
    }
}

struct RenameWidgetHandler {
    store: Arc<WidgetStore>,
    events: Arc<EventDispatcher>,
}

#[async_trait]
impl Handler<RenameWidget> for RenameWidgetHandler {
    async fn handle(
        &self,
        request: RenameWidget,
        _ctx: &RequestContext,
    ) -> DispatchResult<WidgetView> {
        let mut widgets = self.store.widgets.lock().await;
        let widget = widgets
            .get_mut(&request.id)
            .ok_or_else(|| DispatchError::Validation {
                reason: format!("widget {} does not exist", request.id),
            })?;

        widget.rename(request.new_name)?;
        self.events.dispatch_and_clear(widget).await;

        Ok(WidgetView {
            id: widget.id(),
            name: widget.name().to_string(),
        })
    }
}

struct ExportWidgetHandler {
    store: Arc<WidgetStore>,
}

#[async_trait]
impl Handler<ExportWidget> for ExportWidgetHandler {
    async fn handle(
        &self,
        request: ExportWidget,
        _ctx: &RequestContext,
    ) -> DispatchResult<String> {
        let widgets = self.store.widgets.lock().await;
        let widget = widgets
            .get(&request.id)
            .ok_or_else(|| DispatchError::Validation {
                reason: format!("widget {} does not exist", request.id),
            })?;

        let view = WidgetView {
            id: widget.id(),
            name: widget.name().to_string(),
        };
        serde_json::to_string(&view).map_err(|e| DispatchError::Handler(e.into()))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Append-only audit trail fed by the event subscribers.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<String>>,
}

impl AuditLog {
    /// Snapshot of all audit entries in delivery order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn append(&self, entry: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

/// Wire the event subscribers: every widget event lands in the audit log.
#[must_use]
pub fn build_event_dispatcher(audit: Arc<AuditLog>) -> EventDispatcher {
    let mut builder = SubscriberRegistry::builder();
    {
        let audit = Arc::clone(&audit);
        builder.subscribe::<WidgetCreated, _, _>(
            "WidgetCreated.v1",
            "audit-log",
            move |event| {
                let audit = Arc::clone(&audit);
                async move {
                    audit.append(format!("widget {} created as '{}'", event.id, event.name));
                    Ok(())
                }
            },
        );
    }
    builder.subscribe::<WidgetRenamed, _, _>(
        "WidgetRenamed.v1",
        "audit-log",
        move |event| {
            let audit = Arc::clone(&audit);
            async move {
                audit.append(format!(
                    "widget {} renamed '{}' -> '{}'",
                    event.id, event.old, event.new
                ));
                Ok(())
            }
        },
    );
    EventDispatcher::new(builder.build())
}

/// Wire the full pipeline: handlers, capability tags, and behaviors.
///
/// `ExportWidget` is tagged with the `"export"` entitlement; the other
/// requests carry the explicit opt-out tag, since the entitlement check
/// denies untagged handlers by default.
#[must_use]
pub fn build_dispatcher(store: Arc<WidgetStore>, events: Arc<EventDispatcher>) -> Dispatcher {
    let mut builder = Registry::builder();

    builder.register_with(
        CreateWidgetHandler {
            store: Arc::clone(&store),
            events: Arc::clone(&events),
        },
        CapabilitySet::new().with(CapabilityTag::SkipEntitlementCheck),
        BehaviorStack::new()
            .push(TimingBehavior::default())
            .push(EntitlementBehavior)
            .push(ObservabilityBehavior),
    );

    builder.register_with(
        RenameWidgetHandler {
            store: Arc::clone(&store),
            events,
        },
        CapabilitySet::new().with(CapabilityTag::SkipEntitlementCheck),
        BehaviorStack::new()
            .push(TimingBehavior::default())
            .push(EntitlementBehavior)
            .push(ObservabilityBehavior),
    );

    builder.register_with(
        ExportWidgetHandler { store },
        CapabilitySet::new().with(CapabilityTag::entitlement("export")),
        BehaviorStack::new()
            .push(TimingBehavior::default())
            .push(EntitlementBehavior)
            .push(ObservabilityBehavior),
    );

    Dispatcher::new(builder.build())
}
