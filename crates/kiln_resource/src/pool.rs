//! # Resource Pool
//!
//! Indexes resources by ID and holds one reference to each.
//!
//! The pool registers itself with the [`ResourceFns`] of its resources. When
//! a load turns one of its undefined resources into a typed one, the entry
//! is swapped so [`ResourcePool::find`] yields the typed resource from then
//! on.

use crate::config::PoolConfig;
use crate::error::{ResourceError, ResourceResult};
use crate::fns::{ResourceFns, ResourceRegistry, TaskScheduler};
use crate::resource::{LoadedData, Resource};
use crate::types::{ResourceId, ResourceState, ResourceType};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct PoolShared {
    config: PoolConfig,
    fns: Arc<ResourceFns>,
    resources: RwLock<HashMap<ResourceId, Resource>>,
}

impl ResourceRegistry for PoolShared {
    fn resource_replaced(&self, original: &Resource, replacement: &Resource) {
        let previous = {
            let mut resources = self.resources.write();
            match resources.get_mut(&original.id()) {
                Some(entry) if entry.ptr_eq(original) => {
                    Some(std::mem::replace(entry, replacement.clone()))
                }
                _ => None,
            }
        };
        // Released outside the index lock.
        drop(previous);
    }
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        for (id, resource) in self.resources.get_mut().drain() {
            let remaining = resource.release();
            if remaining > 0 {
                tracing::warn!(
                    "Pool[{}] - Resource {} still has {} references on pool destruction",
                    self.config.name,
                    id,
                    remaining
                );
            }
        }
    }
}

/// Owner of a set of resources sharing one [`ResourceFns`].
pub struct ResourcePool {
    shared: Arc<PoolShared>,
}

impl ResourcePool {
    /// Creates an empty pool.
    ///
    /// # Arguments
    ///
    /// * `fns` - Loader and scheduler for every resource of the pool
    /// * `config` - Pool settings
    #[must_use]
    pub fn new(fns: ResourceFns, config: PoolConfig) -> Self {
        let capacity = config.initial_capacity;
        let shared = Arc::new_cyclic(|weak: &Weak<PoolShared>| {
            let registry: Weak<dyn ResourceRegistry> = weak.clone();
            PoolShared {
                config,
                fns: Arc::new(fns.with_registry(registry)),
                resources: RwLock::new(HashMap::with_capacity(capacity)),
            }
        });
        tracing::trace!("Pool[{}] - Created", shared.config.name);
        Self { shared }
    }

    /// Settings the pool was created with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Functions shared by all resources of the pool.
    #[inline]
    #[must_use]
    pub fn fns(&self) -> &Arc<ResourceFns> {
        &self.shared.fns
    }

    /// Adds an undefined resource.
    ///
    /// # Returns
    ///
    /// A new reference, or `None` if `id` is taken.
    #[must_use]
    pub fn add(&self, id: ResourceId) -> Option<Resource> {
        self.add_typed(id, ResourceType::Undefined)
    }

    /// Adds a resource of a known type.
    ///
    /// # Returns
    ///
    /// A new reference, or `None` if `id` is taken.
    #[must_use]
    pub fn add_typed(&self, id: ResourceId, resource_type: ResourceType) -> Option<Resource> {
        let mut resources = self.shared.resources.write();
        if resources.contains_key(&id) {
            return None;
        }
        let resource = Resource::new(id, resource_type, Arc::clone(&self.shared.fns));
        resources.insert(id, resource.clone());
        Some(resource)
    }

    /// A new reference to the resource with `id`.
    #[must_use]
    pub fn find(&self, id: ResourceId) -> Option<Resource> {
        self.shared.resources.read().get(&id).cloned()
    }

    /// Removes the resource with `id` and releases the pool's reference.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotFound`] if no resource has `id`.
    pub fn remove(&self, id: ResourceId) -> ResourceResult<()> {
        let resource = self
            .shared
            .resources
            .write()
            .remove(&id)
            .ok_or(ResourceError::NotFound(id))?;

        let remaining = resource.release();
        if remaining > 0 {
            tracing::warn!(
                "Pool[{}] - Removed resource {} still has {} references",
                self.shared.config.name,
                id,
                remaining
            );
        }
        Ok(())
    }

    /// Number of indexed resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.resources.read().len()
    }

    /// True when the pool indexes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the undefined resource `id` with a typed one holding
    /// `loaded`, and indexes the typed one under `id`.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotFound`] if no resource has `id`
    /// - [`ResourceError::InvalidReplacement`] if `loaded` has no concrete type
    /// - any error of [`Resource::replace`]
    pub fn loaded_replace(&self, id: ResourceId, loaded: LoadedData) -> ResourceResult<Resource> {
        let original = self.find(id).ok_or(ResourceError::NotFound(id))?;
        let resource_type = loaded.resource_type();
        if resource_type.is_undefined() {
            return Err(ResourceError::InvalidReplacement(id));
        }

        let parts = loaded.into_parts();
        let typed = Resource::preloaded(
            id,
            resource_type,
            Arc::clone(&self.shared.fns),
            parts.data,
            parts.unloader,
            parts.create_info,
        );
        original.replace(&typed)?;
        self.shared.resource_replaced(&original, &typed);
        Ok(typed)
    }

    /// Unloads every loaded resource of `resource_type`.
    ///
    /// Unloads are deferred unless the pool is configured for immediate
    /// unloading.
    ///
    /// # Returns
    ///
    /// How many resources were asked to unload.
    pub fn unload_type(&self, resource_type: ResourceType) -> usize {
        self.unload_matching(|resource| resource.resource_type() == resource_type)
    }

    /// Unloads every loaded resource of the pool.
    ///
    /// # Returns
    ///
    /// How many resources were asked to unload.
    pub fn unload_all(&self) -> usize {
        self.unload_matching(|_| true)
    }

    fn unload_matching(&self, predicate: impl Fn(&Resource) -> bool) -> usize {
        let targets: Vec<Resource> = self
            .shared
            .resources
            .read()
            .values()
            .filter(|resource| {
                predicate(resource)
                    && !resource.is_replaced()
                    && resource.state().contains(ResourceState::LOADED)
            })
            .cloned()
            .collect();

        let immediate = self.shared.config.immediate_unload;
        for resource in &targets {
            resource.unload_data(immediate);
        }
        targets.len()
    }

    /// Sets the scheduler used by every resource of the pool.
    pub fn set_scheduler(&self, scheduler: Option<Arc<dyn TaskScheduler>>) {
        self.shared.fns.set_scheduler(scheduler);
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.shared.config.name)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARMATURE: ResourceType = ResourceType::Typed(0x50);

    #[test]
    fn test_add_find_remove() {
        let pool = ResourcePool::new(ResourceFns::new(), PoolConfig::default());
        assert!(pool.is_empty());

        let resource = pool.add(ResourceId::new(1)).expect("fresh id");
        assert_eq!(resource.ref_count(), 2);
        assert!(pool.add(ResourceId::new(1)).is_none());
        assert_eq!(pool.len(), 1);

        let found = pool.find(ResourceId::new(1)).expect("indexed");
        assert_eq!(found, resource);
        assert_eq!(resource.ref_count(), 3);
        drop(found);

        pool.remove(ResourceId::new(1)).expect("indexed");
        assert_eq!(resource.ref_count(), 1);
        assert_eq!(
            pool.remove(ResourceId::new(1)),
            Err(ResourceError::NotFound(ResourceId::new(1)))
        );
        assert!(pool.find(ResourceId::new(1)).is_none());
    }

    #[test]
    fn test_loaded_replace_swaps_entry() {
        let pool = ResourcePool::new(ResourceFns::new(), PoolConfig::default());
        let original = pool.add(ResourceId::new(2)).expect("fresh id");

        let typed = pool
            .loaded_replace(ResourceId::new(2), LoadedData::new(ARMATURE, 3_u8))
            .expect("undefined entry");

        assert_eq!(original.ref_count(), 1);
        assert_eq!(typed.ref_count(), 3);
        assert_eq!(pool.find(ResourceId::new(2)), Some(typed.clone()));
        assert_eq!(original.replacement(), Some(typed.clone()));
        assert_eq!(typed.data::<u8>().map(|v| *v), Some(3));

        assert!(matches!(
            pool.loaded_replace(ResourceId::new(2), LoadedData::new(ARMATURE, 4_u8)),
            Err(ResourceError::NotUndefined { .. })
        ));
    }

    #[test]
    fn test_drop_releases_entries() {
        let pool = ResourcePool::new(ResourceFns::new(), PoolConfig::default());
        let resource = pool.add_typed(ResourceId::new(3), ARMATURE).expect("fresh id");
        assert_eq!(resource.ref_count(), 2);

        drop(pool);
        assert_eq!(resource.ref_count(), 1);
        assert!(resource.fns().registry().is_none());
    }
}
