//! # Resource Functions
//!
//! The collaborators a resource calls out to: the loader, an optional
//! importer of create info, an optional task scheduler and an optional
//! registry that hears about replacements.
//!
//! One `ResourceFns` is shared by every resource created from it, so changing
//! the scheduler affects all of them at once.

use crate::create_info::CreateInfo;
use crate::resource::{PostLoad, Resource};
use crate::types::ResourceId;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// A unit of work handed to a [`TaskScheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs load work off the calling thread.
pub trait TaskScheduler: Send + Sync {
    /// Schedules `task`. It must run exactly once.
    fn schedule(&self, task: Task);
}

impl<F> TaskScheduler for F
where
    F: Fn(Task) + Send + Sync,
{
    fn schedule(&self, task: Task) {
        self(task);
    }
}

/// Produces data for a resource.
///
/// The loader receives a [`PostLoad`] token and must eventually complete it,
/// either before returning or later from any thread.
pub trait ResourceLoader: Send + Sync {
    /// Starts loading the resource behind `post_load`.
    fn load(&self, post_load: PostLoad);
}

impl<F> ResourceLoader for F
where
    F: Fn(PostLoad) + Send + Sync,
{
    fn load(&self, post_load: PostLoad) {
        self(post_load);
    }
}

/// Produces the [`CreateInfo`] a resource is loaded from.
pub trait ResourceImporter: Send + Sync {
    /// Imports the description of resource `id`, or `None` if there is none.
    fn import(&self, id: ResourceId) -> Option<CreateInfo>;
}

impl<F> ResourceImporter for F
where
    F: Fn(ResourceId) -> Option<CreateInfo> + Send + Sync,
{
    fn import(&self, id: ResourceId) -> Option<CreateInfo> {
        self(id)
    }
}

/// Learns about undefined resources being replaced by typed ones.
pub trait ResourceRegistry: Send + Sync {
    /// `original` now forwards to `replacement`.
    fn resource_replaced(&self, original: &Resource, replacement: &Resource);
}

/// Shared collaborators of a set of resources.
pub struct ResourceFns {
    loader: Option<Arc<dyn ResourceLoader>>,
    importer: Option<Arc<dyn ResourceImporter>>,
    scheduler: RwLock<Option<Arc<dyn TaskScheduler>>>,
    registry: Option<Weak<dyn ResourceRegistry>>,
}

impl ResourceFns {
    /// Creates functions without loader, scheduler or registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: None,
            importer: None,
            scheduler: RwLock::new(None),
            registry: None,
        }
    }

    /// Sets the loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets the importer used by [`Resource::import_create_info`] and by
    /// loads that need fresh create info.
    #[must_use]
    pub fn with_importer(mut self, importer: Arc<dyn ResourceImporter>) -> Self {
        self.importer = Some(importer);
        self
    }

    /// Sets the scheduler. Without one, loads run inline.
    #[must_use]
    pub fn with_scheduler(self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        *self.scheduler.write() = Some(scheduler);
        self
    }

    /// Sets the registry notified on replace-in-place.
    ///
    /// The link is weak: a dropped registry is simply no longer notified.
    #[must_use]
    pub fn with_registry(mut self, registry: Weak<dyn ResourceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The loader, if any.
    #[inline]
    #[must_use]
    pub fn loader(&self) -> Option<&Arc<dyn ResourceLoader>> {
        self.loader.as_ref()
    }

    /// The importer, if any.
    #[inline]
    #[must_use]
    pub fn importer(&self) -> Option<&Arc<dyn ResourceImporter>> {
        self.importer.as_ref()
    }

    /// The current scheduler, if any.
    #[must_use]
    pub fn scheduler(&self) -> Option<Arc<dyn TaskScheduler>> {
        self.scheduler.read().clone()
    }

    /// Replaces the scheduler for every resource sharing these functions.
    ///
    /// Loads already dispatched are not affected.
    pub fn set_scheduler(&self, scheduler: Option<Arc<dyn TaskScheduler>>) {
        *self.scheduler.write() = scheduler;
    }

    /// The registry, if one is set and still alive.
    #[must_use]
    pub fn registry(&self) -> Option<Arc<dyn ResourceRegistry>> {
        self.registry.as_ref().and_then(Weak::upgrade)
    }
}

impl Default for ResourceFns {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResourceFns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFns")
            .field("loader", &self.loader.is_some())
            .field("importer", &self.importer.is_some())
            .field("scheduler", &self.scheduler.read().is_some())
            .field("registry", &self.registry().is_some())
            .finish()
    }
}
