//! Per-dispatch request context.
//!
//! One [`RequestContext`] accompanies one dispatch call through every layer
//! of the chain. It carries the correlation id for structured logging, the
//! authenticated principal (if any), a typed extension map that the
//! context-establishment behavior uses to publish ambient values to inner
//! layers, and the [`InvocationTrace`] that records the exact ordered list of
//! layers the request traversed.
//!
//! The context is shared by reference down a single dispatch call only; it is
//! never reused across calls. Interior mutability lets behaviors enrich it
//! without threading `&mut` through the whole chain.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

/// The authenticated caller of a dispatch, with its granted entitlements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    name: String,
    entitlements: BTreeSet<String>,
}

impl Principal {
    /// Create a principal with no entitlements.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entitlements: BTreeSet::new(),
        }
    }

    /// Grant an entitlement, builder-style.
    #[must_use]
    pub fn with_entitlement(mut self, entitlement: impl Into<String>) -> Self {
        self.entitlements.insert(entitlement.into());
        self
    }

    /// The principal's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this principal holds the named entitlement.
    #[must_use]
    pub fn has_entitlement(&self, entitlement: &str) -> bool {
        self.entitlements.contains(entitlement)
    }
}

/// What kind of layer produced a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// A cross-cutting behavior wrapping the handler.
    Behavior,
    /// The innermost base handler.
    Handler,
}

/// One entry in the invocation trace: a layer that was actually entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    /// The layer's stable name.
    pub layer: &'static str,
    /// Whether the layer was a behavior or the base handler.
    pub kind: LayerKind,
}

/// Append-only record of the layers one dispatch actually entered, in
/// execution order (outermost first, base handler last).
///
/// This is the diagnostics surface that lets tests and operators
/// reconstruct, after the fact, exactly which layers a request traversed.
#[derive(Debug, Default)]
pub struct InvocationTrace {
    entries: Mutex<Vec<TraceEntry>>,
}

impl InvocationTrace {
    /// Record that a layer was entered.
    pub fn record(&self, layer: &'static str, kind: LayerKind) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TraceEntry { layer, kind });
    }

    /// Snapshot of the layer names entered so far, in execution order.
    #[must_use]
    pub fn layers(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.layer)
            .collect()
    }

    /// Snapshot of the full trace entries, in execution order.
    #[must_use]
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Context handed through the chain for one dispatch call.
pub struct RequestContext {
    correlation_id: Uuid,
    principal: RwLock<Option<Principal>>,
    extensions: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    trace: InvocationTrace,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Create a fresh context with a new correlation id and no principal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            principal: RwLock::new(None),
            extensions: RwLock::new(HashMap::new()),
            trace: InvocationTrace::default(),
        }
    }

    /// Create a context pre-populated with an authenticated principal.
    #[must_use]
    pub fn with_principal(principal: Principal) -> Self {
        let ctx = Self::new();
        ctx.set_principal(principal);
        ctx
    }

    /// The correlation id tying together every log line of this dispatch.
    #[must_use]
    pub const fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// The current principal, if one was set by the caller or by the
    /// context-establishment behavior.
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.principal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Set or replace the principal.
    pub fn set_principal(&self, principal: Principal) {
        *self
            .principal
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(principal);
    }

    /// Publish a typed ambient value for inner layers to read.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Read back a typed ambient value published earlier in this dispatch.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|any| any.downcast::<T>().ok())
    }

    /// The trace of layers entered during this dispatch.
    #[must_use]
    pub const fn trace(&self) -> &InvocationTrace {
        &self.trace
    }
}
