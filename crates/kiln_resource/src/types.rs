//! # Resource Identity and State
//!
//! Identifiers, type tags and load-state flags shared by every resource.

use bitflags::bitflags;
use std::fmt;

/// Stable identifier of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Creates a new resource ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw ID value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Type tag of a resource.
///
/// A resource created without knowing what it holds is `Undefined`. The first
/// successful load of such a resource replaces it with a typed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Type not known yet.
    Undefined,
    /// Concrete type tag.
    Typed(u32),
}

impl ResourceType {
    /// Returns true for [`ResourceType::Undefined`].
    #[inline]
    #[must_use]
    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// The concrete tag, if any.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> Option<u32> {
        match self {
            Self::Undefined => None,
            Self::Typed(tag) => Some(tag),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Typed(tag) => write!(f, "{tag:#x}"),
        }
    }
}

bitflags! {
    /// Load state of a resource. No flag set means "unloaded".
    ///
    /// `LOADING` may be set together with `LOADED` or `FAILED` while a reload
    /// is in progress.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ResourceState: u8 {
        /// A load is in flight.
        const LOADING = 1 << 0;
        /// Data is available.
        const LOADED = 1 << 1;
        /// The last load attempt failed.
        const FAILED = 1 << 2;
    }
}

impl ResourceState {
    /// Returns true when no flag is set.
    #[inline]
    #[must_use]
    pub const fn is_unloaded(self) -> bool {
        self.is_empty()
    }
}
