//! # Loading
//!
//! [`Resource::load_data`] hands the resource to the loader together with a
//! [`PostLoad`] token. The token carries the in-flight reference, so the
//! resource stays alive until the load completes no matter who else lets go
//! of it.
//!
//! A load may first import [`CreateInfo`] through the importer of the
//! resource's functions; [`Resource::import_create_info`] runs that step on
//! its own.

use super::handle::{Resource, ResourceData};
use super::unload::{dispose_detached, ResourceUnloader};
use crate::create_info::CreateInfo;
use crate::error::{LoadError, ResourceError, ResourceResult};
use crate::fns::ResourceImporter;
use crate::types::{ResourceState, ResourceType};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Outcome of a successful [`Resource::load_data`] or
/// [`Resource::import_create_info`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// The work was run or scheduled.
    Started,
    /// A load or import is already in flight; nothing changed.
    AlreadyLoading,
}

/// Data produced by a loader.
pub struct LoadedData {
    resource_type: ResourceType,
    data: ResourceData,
    unloader: Option<Arc<dyn ResourceUnloader>>,
    create_info: Option<CreateInfo>,
}

/// Parts of [`LoadedData`] moved into a resource.
pub(crate) struct LoadedParts {
    pub(crate) data: ResourceData,
    pub(crate) unloader: Option<Arc<dyn ResourceUnloader>>,
    pub(crate) create_info: Option<CreateInfo>,
}

impl LoadedData {
    /// Wraps `data` of type `resource_type`.
    pub fn new<T: Any + Send + Sync>(resource_type: ResourceType, data: T) -> Self {
        Self::from_boxed(resource_type, Box::new(data))
    }

    /// Wraps already boxed data.
    #[must_use]
    pub fn from_boxed(resource_type: ResourceType, data: ResourceData) -> Self {
        Self {
            resource_type,
            data,
            unloader: None,
            create_info: None,
        }
    }

    /// Attaches the capability that will later unload this data.
    #[must_use]
    pub fn with_unloader(mut self, unloader: Arc<dyn ResourceUnloader>) -> Self {
        self.unloader = Some(unloader);
        self
    }

    /// Records the create info this data was loaded from. It becomes the
    /// resource's [`loaded_create_info`](Resource::loaded_create_info).
    #[must_use]
    pub fn with_create_info(mut self, create_info: CreateInfo) -> Self {
        self.create_info = Some(create_info);
        self
    }

    /// Type the data claims to be.
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub(crate) fn into_parts(self) -> LoadedParts {
        LoadedParts {
            data: self.data,
            unloader: self.unloader,
            create_info: self.create_info,
        }
    }
}

impl fmt::Debug for LoadedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedData")
            .field("resource_type", &self.resource_type)
            .field("unloader", &self.unloader.is_some())
            .field("create_info", &self.create_info.is_some())
            .finish_non_exhaustive()
    }
}

/// One-shot completion token for a started load.
///
/// Completing consumes the token. A token dropped without completing ends
/// the load as failed with [`LoadError::Abandoned`].
pub struct PostLoad {
    resource: Resource,
    completed: bool,
}

impl PostLoad {
    fn new(resource: Resource) -> Self {
        Self {
            resource,
            completed: false,
        }
    }

    /// The resource being loaded.
    #[inline]
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// The create info to load from, if one was imported.
    #[must_use]
    pub fn create_info(&self) -> Option<CreateInfo> {
        self.resource.create_info()
    }

    /// Finishes the load with `result` and releases the in-flight reference.
    pub fn complete(mut self, result: Result<LoadedData, LoadError>) {
        self.completed = true;
        finish_load(&self.resource, result);
    }

    /// Finishes the load successfully.
    pub fn succeed(self, loaded: LoadedData) {
        self.complete(Ok(loaded));
    }

    /// Finishes the load as failed.
    pub fn fail(self, error: LoadError) {
        self.complete(Err(error));
    }
}

impl Drop for PostLoad {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!(
                "{} - Load token dropped without completion",
                self.resource.log_prefix()
            );
            finish_load(&self.resource, Err(LoadError::Abandoned));
        }
    }
}

impl fmt::Debug for PostLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostLoad")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Starts loading the resource, importing create info only if there is
    /// none yet. Same as `load_data_with(false)`.
    ///
    /// # Errors
    ///
    /// See [`Resource::load_data_with`].
    pub fn load_data(&self) -> ResourceResult<LoadStatus> {
        self.load_data_with(false)
    }

    /// Starts loading the resource.
    ///
    /// Sets `LOADING`, then runs the load inline or through the scheduler of
    /// this resource's [`ResourceFns`](crate::ResourceFns). When an importer
    /// is set and `refresh_create_info` is true or no create info was
    /// imported yet, the load imports first. The loader finishes through the
    /// [`PostLoad`] token it receives.
    ///
    /// # Returns
    ///
    /// [`LoadStatus::AlreadyLoading`] without side effects when a load or an
    /// import is in flight.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::ReplacedCannotLoad`] if the resource was replaced
    /// - [`ResourceError::LoaderNotProvided`] if there is no loader
    pub fn load_data_with(&self, refresh_create_info: bool) -> ResourceResult<LoadStatus> {
        let loader = {
            let mut cell = self.inner.cell.write();
            if cell.replacement().is_some() {
                return Err(ResourceError::ReplacedCannotLoad(self.inner.id));
            }
            if cell.state.contains(ResourceState::LOADING) {
                tracing::warn!(
                    "{} - Attempted to load in parallel",
                    self.log_prefix()
                );
                return Ok(LoadStatus::AlreadyLoading);
            }
            let Some(loader) = self.inner.fns.loader().cloned() else {
                return Err(ResourceError::LoaderNotProvided(self.inner.id));
            };
            cell.state.insert(ResourceState::LOADING);
            loader
        };

        let importer = self.inner.fns.importer().cloned();
        let post_load = PostLoad::new(self.clone());
        let task = move || {
            if let Some(importer) = importer {
                let resource = post_load.resource();
                if refresh_create_info || resource.create_info().is_none() {
                    resource.store_imported(importer.as_ref());
                }
            }
            loader.load(post_load);
        };

        if let Some(scheduler) = self.inner.fns.scheduler() {
            tracing::trace!("{} - Loading asynchronously", self.log_prefix());
            scheduler.schedule(Box::new(task));
        } else {
            tracing::trace!("{} - Loading synchronously", self.log_prefix());
            task();
        }

        Ok(LoadStatus::Started)
    }

    /// Imports fresh create info without loading data.
    ///
    /// Shares the `LOADING` guard with [`Resource::load_data`], so an import
    /// never overlaps a load. Runs inline or through the scheduler. When the
    /// importer yields `None` the current create info is kept.
    ///
    /// # Returns
    ///
    /// [`LoadStatus::AlreadyLoading`] without side effects when a load or an
    /// import is in flight.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::ReplacedCannotLoad`] if the resource was replaced
    /// - [`ResourceError::ImporterNotProvided`] if there is no importer
    pub fn import_create_info(&self) -> ResourceResult<LoadStatus> {
        let importer = {
            let mut cell = self.inner.cell.write();
            if cell.replacement().is_some() {
                return Err(ResourceError::ReplacedCannotLoad(self.inner.id));
            }
            if cell.state.contains(ResourceState::LOADING) {
                tracing::warn!(
                    "{} - Attempted to import in parallel",
                    self.log_prefix()
                );
                return Ok(LoadStatus::AlreadyLoading);
            }
            let Some(importer) = self.inner.fns.importer().cloned() else {
                return Err(ResourceError::ImporterNotProvided(self.inner.id));
            };
            cell.state.insert(ResourceState::LOADING);
            importer
        };

        let resource = self.clone();
        let task = move || {
            resource.store_imported(importer.as_ref());
            resource.inner.cell.write().state.remove(ResourceState::LOADING);
        };

        if let Some(scheduler) = self.inner.fns.scheduler() {
            tracing::trace!("{} - Importing CreateInfo asynchronously", self.log_prefix());
            scheduler.schedule(Box::new(task));
        } else {
            tracing::trace!("{} - Importing CreateInfo synchronously", self.log_prefix());
            task();
        }

        Ok(LoadStatus::Started)
    }

    /// Runs `importer` and swaps a produced create info into the resource.
    /// The displaced one is released after the lock.
    fn store_imported(&self, importer: &dyn ResourceImporter) {
        let Some(imported) = importer.import(self.inner.id) else {
            tracing::trace!("{} - Importer produced no CreateInfo", self.log_prefix());
            return;
        };
        let displaced = self.inner.cell.write().create_info.replace(imported);
        drop(displaced);
        tracing::trace!("{} - Imported CreateInfo", self.log_prefix());
    }
}

fn finish_load(resource: &Resource, result: Result<LoadedData, LoadError>) {
    let loaded = match result.and_then(|loaded| check_type(resource, loaded)) {
        Ok(loaded) => loaded,
        Err(err) => {
            fail_load(resource, &err);
            return;
        }
    };

    if resource.resource_type().is_undefined() {
        replace_in_place(resource, loaded);
    } else {
        store_loaded(resource, loaded);
    }
}

/// Typed resources only accept data of their own type; undefined ones only
/// accept data with a concrete type.
fn check_type(resource: &Resource, loaded: LoadedData) -> Result<LoadedData, LoadError> {
    let expected = resource.resource_type();
    let found = loaded.resource_type();
    let err = if found.is_undefined() {
        LoadError::UndefinedPayload
    } else if !expected.is_undefined() && expected != found {
        LoadError::TypeMismatch { expected, found }
    } else {
        return Ok(loaded);
    };

    let parts = loaded.into_parts();
    dispose_detached(resource.id(), found, 0, parts.data, parts.unloader);
    Err(err)
}

fn fail_load(resource: &Resource, err: &LoadError) {
    tracing::error!("{} - Failed to load with error: {err}", resource.log_prefix());

    let mut cell = resource.inner.cell.write();
    cell.state.remove(ResourceState::LOADING);
    // Previously loaded data survives a failed reload untouched.
    if cell.replacement().is_none() && cell.data.is_none() {
        cell.state.insert(ResourceState::FAILED);
    }
}

fn store_loaded(resource: &Resource, loaded: LoadedData) {
    let LoadedParts {
        data,
        unloader,
        create_info,
    } = loaded.into_parts();
    let (displaced, old_create_info) = {
        let mut cell = resource.inner.cell.write();
        cell.state.remove(ResourceState::LOADING | ResourceState::FAILED);
        cell.state.insert(ResourceState::LOADED);
        let previous_iteration = cell.iteration;
        cell.iteration = cell.iteration.wrapping_add(1);
        let old_data = cell.data.replace(data);
        let old_unloader = std::mem::replace(&mut cell.unloader, unloader);
        let old_create_info = std::mem::replace(&mut cell.loaded_create_info, create_info);
        (
            old_data.map(|old| (old, old_unloader, previous_iteration)),
            old_create_info,
        )
    };
    drop(old_create_info);

    if let Some((old, old_unloader, iteration)) = displaced {
        tracing::trace!("{} - Disposing previously loaded data", resource.log_prefix());
        dispose_detached(
            resource.id(),
            resource.resource_type(),
            iteration,
            old,
            old_unloader,
        );
    }
    tracing::trace!("{} - Loaded", resource.log_prefix());
}

fn replace_in_place(resource: &Resource, loaded: LoadedData) {
    let resource_type = loaded.resource_type();
    let LoadedParts {
        data,
        unloader,
        create_info,
    } = loaded.into_parts();

    // LOADING stays set until `replace` overwrites the state.
    if resource.is_replaced() {
        tracing::warn!(
            "{} - Load completed after the resource was replaced, discarding data",
            resource.log_prefix()
        );
        dispose_detached(resource.id(), resource_type, 0, data, unloader);
        return;
    }

    let typed = Resource::preloaded(
        resource.id(),
        resource_type,
        Arc::clone(resource.fns()),
        data,
        unloader,
        create_info,
    );
    match resource.replace(&typed) {
        Ok(()) => {
            if let Some(registry) = resource.fns().registry() {
                registry.resource_replaced(resource, &typed);
            }
        }
        Err(err) => {
            // Dropping `typed` disposes the data.
            tracing::warn!("{} - Replace-in-place failed: {err}", resource.log_prefix());
        }
    }
}
