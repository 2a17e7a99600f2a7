//! # Create Info
//!
//! A [`CreateInfo`] is the imported description a loader builds a resource
//! from: file paths, formats, dependency IDs. It is produced by a
//! [`ResourceImporter`](crate::ResourceImporter), reference counted on its
//! own, and shared between the resource that imported it and whatever data
//! was loaded from it.

use crate::types::ResourceType;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

struct CreateInfoInner {
    resource_type: ResourceType,
    data: Box<dyn Any + Send + Sync>,
}

impl Drop for CreateInfoInner {
    fn drop(&mut self) {
        tracing::trace!("CreateInfo[{}] - Destroyed", self.resource_type);
    }
}

/// Reference-counted, immutable resource description.
///
/// Cloning takes a reference. The description is destroyed with its last
/// reference.
#[derive(Clone)]
pub struct CreateInfo {
    inner: Arc<CreateInfoInner>,
}

impl CreateInfo {
    /// Creates a description of a `resource_type` resource.
    pub fn new<T: Any + Send + Sync>(resource_type: ResourceType, data: T) -> Self {
        tracing::trace!("CreateInfo[{}] - Created", resource_type);
        Self {
            inner: Arc::new(CreateInfoInner {
                resource_type,
                data: Box::new(data),
            }),
        }
    }

    /// Type of resource this describes.
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.inner.resource_type
    }

    /// Borrows the description as `T`.
    #[must_use]
    pub fn data<T: Any>(&self) -> Option<&T> {
        (*self.inner.data).downcast_ref::<T>()
    }

    /// Current number of references.
    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// True when both point at the same description.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for CreateInfo {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CreateInfo {}

impl fmt::Debug for CreateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateInfo")
            .field("type", &self.inner.resource_type)
            .field("ref_count", &self.ref_count())
            .finish_non_exhaustive()
    }
}
