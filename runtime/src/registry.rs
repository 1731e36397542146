//! Handler registry - write-once wiring of request types to composed
//! chains.
//!
//! Registration happens once, during process startup, on a single task.
//! [`RegistryBuilder::build`] freezes the wiring: every registered request
//! type gets its chain composed exactly once, and the resulting
//! [`Registry`] is immutable and safe for unbounded concurrent reads. No
//! chain is ever recomposed per call.
//!
//! Resolving an unregistered request type is a programming bug — a missing
//! wiring step, not a runtime data problem — and panics with a message
//! naming the request type. So does registering the same type twice.
//!
//! # Example
//!
//! ```ignore
//! let mut builder = Registry::builder();
//! builder.register_with(
//!     CreateWidgetHandler::new(store),
//!     CapabilitySet::new().with(CapabilityTag::Undoable),
//!     BehaviorStack::new()
//!         .push(UndoScopeBehavior::new(scope))
//!         .push(TimingBehavior::default())
//!         .push(ObservabilityBehavior),
//! );
//! let registry = builder.build();
//! ```

use relay_core::{Behavior, CapabilitySet, ComposedHandler, Handler, Request, compose};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Where to splice a behavior into the registration-order list.
///
/// Positions address the *registration* order; remember that execution
/// order at call time is the reverse, so `Last` runs outermost and `First`
/// runs immediately around the base handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorPosition {
    /// Insert at the front of the registration order (innermost layer).
    First,
    /// Append to the registration order (outermost layer).
    Last,
    /// Insert at the given registration-order index, clamped to the end.
    Index(usize),
}

/// Ordered list of behaviors for one request type, in registration order.
pub struct BehaviorStack<R: Request> {
    behaviors: Vec<Arc<dyn Behavior<R>>>,
}

impl<R: Request> Default for BehaviorStack<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> BehaviorStack<R> {
    /// Create an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            behaviors: Vec::new(),
        }
    }

    /// Append a behavior to the registration order.
    #[must_use]
    pub fn push(self, behavior: impl Behavior<R> + 'static) -> Self {
        self.insert(BehaviorPosition::Last, behavior)
    }

    /// Splice a behavior into the registration order at `position`.
    #[must_use]
    pub fn insert(
        mut self,
        position: BehaviorPosition,
        behavior: impl Behavior<R> + 'static,
    ) -> Self {
        let behavior: Arc<dyn Behavior<R>> = Arc::new(behavior);
        match position {
            BehaviorPosition::First => self.behaviors.insert(0, behavior),
            BehaviorPosition::Last => self.behaviors.push(behavior),
            BehaviorPosition::Index(i) => {
                let i = i.min(self.behaviors.len());
                self.behaviors.insert(i, behavior);
            }
        }
        self
    }

    /// Number of behaviors in the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// Whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    fn into_inner(self) -> Vec<Arc<dyn Behavior<R>>> {
        self.behaviors
    }
}

struct Registration {
    request_name: &'static str,
    // Holds an Arc<ComposedHandler<R>> behind Any; resolve() downcasts.
    chain: Arc<dyn Any + Send + Sync>,
}

/// Immutable map from request type to its pre-composed chain.
pub struct Registry {
    registrations: HashMap<TypeId, Registration>,
}

impl Registry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            registrations: HashMap::new(),
        }
    }

    /// Resolve the composed chain for a request type.
    ///
    /// # Panics
    ///
    /// Panics if `R` was never registered. This signals a missing wiring
    /// step and is intentionally not a recoverable error.
    #[must_use]
    pub fn resolve<R: Request>(&self) -> Arc<ComposedHandler<R>> {
        let Some(registration) = self.registrations.get(&TypeId::of::<R>()) else {
            panic!(
                "no handler registered for request type '{}'; register it before building the registry",
                R::name()
            );
        };
        Arc::clone(&registration.chain)
            .downcast::<ComposedHandler<R>>()
            .unwrap_or_else(|_| {
                panic!(
                    "registry entry for '{}' holds a chain of a different request type",
                    R::name()
                )
            })
    }

    /// Whether a handler is registered for `R`.
    #[must_use]
    pub fn is_registered<R: Request>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<R>())
    }

    /// Names of all registered request types, in arbitrary order.
    pub fn request_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.values().map(|r| r.request_name)
    }

    /// Number of registered request types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Startup-time, single-task builder for a [`Registry`].
pub struct RegistryBuilder {
    registrations: HashMap<TypeId, Registration>,
}

impl RegistryBuilder {
    /// Register a handler with its capability tags and no behaviors.
    ///
    /// # Panics
    ///
    /// Panics if `R` is already registered.
    pub fn register<R, H>(&mut self, handler: H, tags: CapabilitySet) -> &mut Self
    where
        R: Request,
        H: Handler<R> + 'static,
    {
        self.register_with(handler, tags, BehaviorStack::new())
    }

    /// Register a handler with its capability tags and a behavior stack in
    /// registration order (first pushed = innermost layer).
    ///
    /// # Panics
    ///
    /// Panics if `R` is already registered.
    pub fn register_with<R, H>(
        &mut self,
        handler: H,
        tags: CapabilitySet,
        behaviors: BehaviorStack<R>,
    ) -> &mut Self
    where
        R: Request,
        H: Handler<R> + 'static,
    {
        let chain = compose(Arc::new(handler), tags, behaviors.into_inner());
        let previous = self.registrations.insert(
            TypeId::of::<R>(),
            Registration {
                request_name: R::name(),
                chain: Arc::new(chain),
            },
        );
        assert!(
            previous.is_none(),
            "request type '{}' registered twice; each request type maps to exactly one handler",
            R::name()
        );
        self
    }

    /// Freeze the wiring into an immutable registry.
    #[must_use]
    pub fn build(self) -> Registry {
        tracing::info!(
            registered = self.registrations.len(),
            "dispatch registry built"
        );
        Registry {
            registrations: self.registrations,
        }
    }
}
