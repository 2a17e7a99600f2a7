//! # Resource Handle
//!
//! A [`Resource`] is a shared pointer to one resource record. Cloning it
//! takes a reference and dropping it releases one; the record is destroyed
//! when the last reference goes away.
//!
//! ## Use Count
//!
//! Independent of references, a resource tracks how many parties are
//! actively using its data. Once a resource has been replaced, use-count
//! operations land on the replacement instead.

use super::unload::{dispose_detached, ResourceUnloader};
use crate::create_info::CreateInfo;
use crate::fns::ResourceFns;
use crate::types::{ResourceId, ResourceState, ResourceType};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased loaded data.
pub type ResourceData = Box<dyn Any + Send + Sync>;

/// Where use-count operations land.
pub(crate) enum UseLink {
    /// The resource counts its own uses.
    Owned(u32),
    /// The resource was replaced. `outstanding` is how many of the target's
    /// uses were taken through this resource.
    Forwarded {
        target: Resource,
        outstanding: u32,
    },
}

/// Mutable part of a resource, guarded by the per-resource lock.
pub(crate) struct ResourceCell {
    pub(crate) state: ResourceState,
    pub(crate) iteration: u32,
    pub(crate) uses: UseLink,
    pub(crate) data: Option<ResourceData>,
    pub(crate) unloader: Option<Arc<dyn ResourceUnloader>>,
    /// Latest imported description.
    pub(crate) create_info: Option<CreateInfo>,
    /// Description the current data was loaded from.
    pub(crate) loaded_create_info: Option<CreateInfo>,
}

impl ResourceCell {
    #[inline]
    pub(crate) fn replacement(&self) -> Option<&Resource> {
        match &self.uses {
            UseLink::Owned(_) => None,
            UseLink::Forwarded { target, .. } => Some(target),
        }
    }
}

pub(crate) struct ResourceInner {
    pub(crate) id: ResourceId,
    pub(crate) resource_type: ResourceType,
    pub(crate) fns: Arc<ResourceFns>,
    pub(crate) cell: RwLock<ResourceCell>,
}

/// Reference-counted handle to a resource.
///
/// Equality is identity: two handles are equal when they point at the same
/// resource record.
#[derive(Clone)]
pub struct Resource {
    pub(crate) inner: Arc<ResourceInner>,
}

impl Resource {
    /// Creates a resource holding one reference, in the unloaded state.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier of the resource
    /// * `resource_type` - Type tag, or [`ResourceType::Undefined`]
    /// * `fns` - Collaborators shared with other resources
    #[must_use]
    pub fn new(id: ResourceId, resource_type: ResourceType, fns: Arc<ResourceFns>) -> Self {
        let resource = Self::from_cell(
            id,
            resource_type,
            fns,
            ResourceCell {
                state: ResourceState::empty(),
                iteration: 0,
                uses: UseLink::Owned(0),
                data: None,
                unloader: None,
                create_info: None,
                loaded_create_info: None,
            },
        );
        tracing::trace!("Resource[{},{}] - Created", id, resource_type);
        resource
    }

    /// Creates an undefined resource.
    #[must_use]
    pub fn undefined(id: ResourceId, fns: Arc<ResourceFns>) -> Self {
        Self::new(id, ResourceType::Undefined, fns)
    }

    /// Creates a typed resource that already holds data, as the target of a
    /// replace-in-place.
    pub(crate) fn preloaded(
        id: ResourceId,
        resource_type: ResourceType,
        fns: Arc<ResourceFns>,
        data: ResourceData,
        unloader: Option<Arc<dyn ResourceUnloader>>,
        create_info: Option<CreateInfo>,
    ) -> Self {
        let resource = Self::from_cell(
            id,
            resource_type,
            fns,
            ResourceCell {
                state: ResourceState::LOADED,
                iteration: 1,
                uses: UseLink::Owned(0),
                data: Some(data),
                unloader,
                loaded_create_info: create_info.clone(),
                create_info,
            },
        );
        tracing::trace!("Resource[{},{}] - Created loaded", id, resource_type);
        resource
    }

    fn from_cell(
        id: ResourceId,
        resource_type: ResourceType,
        fns: Arc<ResourceFns>,
        cell: ResourceCell,
    ) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                id,
                resource_type,
                fns,
                cell: RwLock::new(cell),
            }),
        }
    }

    /// Identifier of the resource.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.inner.id
    }

    /// Type tag the resource was created with. Never changes, not even after
    /// replacement.
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.inner.resource_type
    }

    /// Collaborators of this resource.
    #[inline]
    #[must_use]
    pub fn fns(&self) -> &Arc<ResourceFns> {
        &self.inner.fns
    }

    /// Takes another reference. Same as `clone`.
    #[inline]
    #[must_use]
    pub fn acquire(&self) -> Self {
        self.clone()
    }

    /// Releases this reference and returns how many remain.
    ///
    /// Of any number of concurrent releases, exactly the one that destroys
    /// the resource returns `0`.
    ///
    /// # Returns
    ///
    /// `0` when this call destroyed the resource. Otherwise a non-zero
    /// snapshot of the remaining references, which other threads may change
    /// at any time.
    pub fn release(self) -> usize {
        let remaining = Arc::strong_count(&self.inner).saturating_sub(1);
        match Arc::into_inner(self.inner) {
            Some(inner) => {
                drop(inner);
                0
            }
            None => remaining.max(1),
        }
    }

    /// Current number of references.
    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Current use count, read through the replacement when there is one.
    #[must_use]
    pub fn use_count(&self) -> u32 {
        let cell = self.inner.cell.read();
        match &cell.uses {
            UseLink::Owned(count) => *count,
            UseLink::Forwarded { target, .. } => target.use_count(),
        }
    }

    /// Marks one more active use and returns the new count.
    pub fn increment_use_count(&self) -> u32 {
        self.shift_uses(1, true)
    }

    /// Ends one active use and returns the new count.
    ///
    /// # Panics
    ///
    /// Panics when the use count would go below zero.
    pub fn decrement_use_count(&self) -> u32 {
        self.shift_uses(1, false)
    }

    /// Marks one active use for the lifetime of the returned guard.
    #[must_use]
    pub fn use_guard(&self) -> UseGuard {
        self.increment_use_count();
        UseGuard {
            resource: self.clone(),
        }
    }

    /// Adds or removes `amount` uses. Locks this resource, then the target
    /// when forwarding.
    pub(crate) fn shift_uses(&self, amount: u32, increase: bool) -> u32 {
        let mut cell = self.inner.cell.write();
        match &mut cell.uses {
            UseLink::Owned(count) => {
                if increase {
                    *count = count.checked_add(amount).unwrap_or_else(|| {
                        panic!(
                            "Resource[{},{}] - use count overflow",
                            self.inner.id, self.inner.resource_type
                        )
                    });
                } else {
                    assert!(
                        *count >= amount,
                        "Resource[{},{}] - use count underflow",
                        self.inner.id,
                        self.inner.resource_type
                    );
                    *count -= amount;
                }
                *count
            }
            UseLink::Forwarded {
                target,
                outstanding,
            } => {
                if increase {
                    *outstanding = outstanding.checked_add(amount).unwrap_or_else(|| {
                        panic!(
                            "Resource[{},{}] - use count overflow through replacement",
                            self.inner.id, self.inner.resource_type
                        )
                    });
                } else {
                    assert!(
                        *outstanding >= amount,
                        "Resource[{},{}] - use count underflow through replacement",
                        self.inner.id,
                        self.inner.resource_type
                    );
                    *outstanding -= amount;
                }
                target.shift_uses(amount, increase)
            }
        }
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> ResourceState {
        self.inner.cell.read().state
    }

    /// True while a load is in flight.
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().contains(ResourceState::LOADING)
    }

    /// True when data is available, or the resource forwards to a replacement.
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state().contains(ResourceState::LOADED)
    }

    /// Number of successful loads so far.
    #[must_use]
    pub fn iteration(&self) -> u32 {
        self.inner.cell.read().iteration
    }

    /// A new reference to the latest imported create info.
    #[must_use]
    pub fn create_info(&self) -> Option<CreateInfo> {
        self.inner.cell.read().create_info.clone()
    }

    /// A new reference to the create info the current data was loaded from.
    #[must_use]
    pub fn loaded_create_info(&self) -> Option<CreateInfo> {
        self.inner.cell.read().loaded_create_info.clone()
    }

    /// True when data is present.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.inner.cell.read().data.is_some()
    }

    /// Borrows the loaded data as `T`.
    ///
    /// Returns `None` when nothing is loaded or the data is not a `T`. The
    /// guard holds the resource's read lock: drop it before mutating the
    /// resource from the same thread.
    #[must_use]
    pub fn data<T: Any>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.inner.cell.read(), |cell| {
            cell.data.as_ref().and_then(|data| (**data).downcast_ref::<T>())
        })
        .ok()
    }

    /// Borrows the loaded data as `T`, only if the resource has type
    /// `resource_type`.
    #[must_use]
    pub fn type_data<T: Any>(
        &self,
        resource_type: ResourceType,
    ) -> Option<MappedRwLockReadGuard<'_, T>> {
        if self.inner.resource_type != resource_type {
            return None;
        }
        self.data::<T>()
    }

    /// True when both handles point at the same resource.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    pub(crate) fn log_prefix(&self) -> LogPrefix {
        LogPrefix(self.inner.id, self.inner.resource_type)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Resource {}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.inner.id)
            .field("type", &self.inner.resource_type)
            .field("ref_count", &self.ref_count())
            .finish_non_exhaustive()
    }
}

/// `Resource[<id>,<type>]`, the prefix of every lifecycle log line.
pub(crate) struct LogPrefix(ResourceId, ResourceType);

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource[{},{}]", self.0, self.1)
    }
}

impl Drop for ResourceInner {
    fn drop(&mut self) {
        let prefix = LogPrefix(self.id, self.resource_type);
        tracing::trace!("{prefix} - Destroying...");

        let cell = self.cell.get_mut();
        match std::mem::replace(&mut cell.uses, UseLink::Owned(0)) {
            UseLink::Owned(0) => {}
            UseLink::Owned(count) => {
                tracing::warn!("{prefix} - Destroying with a non-zero use count of: {count}");
            }
            UseLink::Forwarded {
                target,
                outstanding,
            } => {
                if outstanding > 0 {
                    target.shift_uses(outstanding, false);
                }
            }
        }

        if let Some(data) = cell.data.take() {
            dispose_detached(
                self.id,
                self.resource_type,
                cell.iteration,
                data,
                cell.unloader.take(),
            );
        }

        tracing::trace!("{prefix} - Destroyed");
    }
}

/// Holds one use of a resource until dropped.
#[derive(Debug)]
pub struct UseGuard {
    resource: Resource,
}

impl UseGuard {
    /// The resource in use.
    #[inline]
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

impl Drop for UseGuard {
    fn drop(&mut self) {
        self.resource.decrement_use_count();
    }
}
