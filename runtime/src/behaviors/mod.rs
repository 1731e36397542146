//! Standard cross-cutting behaviors.
//!
//! Each behavior here is generic over the request type and consults the
//! base handler's capability tags (cached on the chain) to decide whether
//! it applies. They are stateless or internally synchronized, so one
//! instance may serve concurrent dispatches.
//!
//! # Recommended Ordering
//!
//! Outermost to innermost at call time:
//!
//! 1. [`ObservabilityBehavior`] — must see every call, including failures
//!    raised by inner layers
//! 2. [`ContextBehavior`] — establishes ambient context before any check
//!    that needs it
//! 3. [`EntitlementBehavior`] — default-deny authorization (handlers
//!    either declare entitlements or opt out explicitly); fails fast
//!    before any expensive or side-effecting precondition check, so
//!    unauthorized callers never see precondition error detail
//! 4. [`PreconditionBehavior`] — validates the working context after
//!    authorization
//! 5. [`TimingBehavior`] — near the handler, so it measures actual handler
//!    cost rather than cross-cutting overhead
//! 6. [`UndoScopeBehavior`] — innermost, wrapping only the handler's
//!    actual mutation
//!
//! Because execution order is the reverse of registration order,
//! [`standard_stack`] registers them back to front.

mod context;
mod entitlement;
mod observability;
mod precondition;
mod timing;
mod undo;

pub use context::{ContextBehavior, ContextResolver};
pub use entitlement::EntitlementBehavior;
pub use observability::ObservabilityBehavior;
pub use precondition::{Precondition, PreconditionBehavior};
pub use timing::TimingBehavior;
pub use undo::{UndoScope, UndoScopeBehavior};

use crate::registry::BehaviorStack;
use relay_core::Request;
use std::sync::Arc;

/// Build the full standard stack in the recommended order.
///
/// Registration order is innermost-first, so at call time the chain runs
/// observability → context → entitlement → precondition → timing →
/// undo scope → handler.
#[must_use]
pub fn standard_stack<R: Request>(
    scope: Arc<dyn UndoScope>,
    resolver: Arc<dyn ContextResolver>,
    precondition: Arc<dyn Precondition>,
) -> BehaviorStack<R> {
    BehaviorStack::new()
        .push(UndoScopeBehavior::new(scope))
        .push(TimingBehavior::default())
        .push(PreconditionBehavior::new(precondition))
        .push(EntitlementBehavior)
        .push(ContextBehavior::new(resolver))
        .push(ObservabilityBehavior)
}
