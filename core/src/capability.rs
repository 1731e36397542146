//! Capability metadata attached to handlers at registration time.
//!
//! Behaviors do not apply uniformly to every handler. A handler declares what
//! cross-cutting treatment it requires or opts out of by carrying capability
//! tags, attached once at registration and inspected (never mutated) during
//! dispatch. The tags are an explicit, statically checkable set; there is no
//! runtime type introspection anywhere in the pipeline.
//!
//! # Example
//!
//! ```
//! use relay_core::capability::{CapabilitySet, CapabilityTag};
//!
//! let tags = CapabilitySet::new()
//!     .with(CapabilityTag::RequiresActiveContext)
//!     .with(CapabilityTag::entitlement("export"));
//!
//! assert!(tags.contains(&CapabilityTag::RequiresActiveContext));
//! assert!(tags.has_entitlement("export"));
//! assert!(!tags.has_entitlement("print"));
//! ```

use serde::Serialize;
use smallvec::SmallVec;

/// A declarative marker describing cross-cutting treatment a handler
/// requires or forbids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CapabilityTag {
    /// The handler requires an active working context to exist before it
    /// runs; the precondition behavior enforces this.
    RequiresActiveContext,

    /// The handler requires the caller to hold the named entitlement; the
    /// entitlement behavior enforces this.
    Entitlement(String),

    /// The handler explicitly opts out of the entitlement check. Without
    /// this tag, a handler that declares no entitlements is denied.
    SkipEntitlementCheck,

    /// The handler opts out of per-call observability logging.
    SkipObservability,

    /// The handler's mutation should run inside an undo scope.
    Undoable,
}

impl CapabilityTag {
    /// Convenience constructor for [`CapabilityTag::Entitlement`].
    pub fn entitlement(name: impl Into<String>) -> Self {
        Self::Entitlement(name.into())
    }
}

/// An ordered set of [`CapabilityTag`]s carried by one registered handler.
///
/// Built at registration time, immutable afterwards. Most handlers carry
/// zero or a handful of tags, so storage is a small inline vector.
/// Serializes as the plain tag list for diagnostics output.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    tags: SmallVec<[CapabilityTag; 4]>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tags: SmallVec::new_const(),
        }
    }

    /// Add a tag, builder-style. Duplicate tags are ignored.
    #[must_use]
    pub fn with(mut self, tag: CapabilityTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Whether the set contains the exact tag.
    #[must_use]
    pub fn contains(&self, tag: &CapabilityTag) -> bool {
        self.tags.contains(tag)
    }

    /// Whether the set contains an entitlement tag with the given name.
    #[must_use]
    pub fn has_entitlement(&self, name: &str) -> bool {
        self.entitlements().any(|e| e == name)
    }

    /// Iterate over the names of all entitlement tags, in declaration order.
    pub fn entitlements(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().filter_map(|tag| match tag {
            CapabilityTag::Entitlement(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Iterate over all tags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CapabilityTag> {
        self.tags.iter()
    }

    /// Number of tags in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set carries no tags at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl FromIterator<CapabilityTag> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityTag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}
