//! # Unloading
//!
//! Loaded data leaves a resource through the [`ResourceUnloader`] the loader
//! attached to it. The unloader gets an [`UnloadRequest`] and decides when to
//! [`execute`](UnloadRequest::execute) it: right away, or later from a
//! deferral context such as [`UnloadQueue`].
//!
//! A deferred request keeps the resource alive. It also remembers the load
//! iteration it was issued for, so a request that outlives a reload does
//! nothing when it finally runs.

use super::handle::{Resource, ResourceData};
use crate::types::{ResourceId, ResourceState, ResourceType};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fmt;
use std::sync::Arc;

/// Capability that unloads data attached to a resource.
pub trait ResourceUnloader: Send + Sync {
    /// Handles `request`.
    ///
    /// With `immediate` set the request must be executed before returning.
    /// Otherwise it may be stored and executed later.
    fn unload(&self, request: UnloadRequest, immediate: bool);
}

enum UnloadTarget {
    /// Data still inside the resource. Holds the protecting reference.
    Attached(Resource),
    /// Data already taken out of its resource.
    Detached(ResourceData),
}

/// A pending unload of one resource's data.
pub struct UnloadRequest {
    id: ResourceId,
    resource_type: ResourceType,
    iteration: u32,
    target: UnloadTarget,
}

impl UnloadRequest {
    pub(crate) fn attached(resource: Resource, iteration: u32) -> Self {
        Self {
            id: resource.id(),
            resource_type: resource.resource_type(),
            iteration,
            target: UnloadTarget::Attached(resource),
        }
    }

    /// Identifier of the resource the data belongs to.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Type of the resource the data belongs to.
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Load iteration the request was issued for.
    #[inline]
    #[must_use]
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The resource, while the data is still attached to it.
    ///
    /// `None` for data that was already detached, e.g. because the resource
    /// was destroyed or reloaded.
    #[must_use]
    pub fn resource(&self) -> Option<&Resource> {
        match &self.target {
            UnloadTarget::Attached(resource) => Some(resource),
            UnloadTarget::Detached(_) => None,
        }
    }

    /// True when executing would do nothing because the resource was
    /// reloaded or unloaded since the request was made.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        match &self.target {
            UnloadTarget::Attached(resource) => {
                let cell = resource.inner.cell.read();
                cell.iteration != self.iteration || cell.data.is_none()
            }
            UnloadTarget::Detached(_) => false,
        }
    }

    /// Removes the data from the resource and hands it to the caller.
    ///
    /// Clears `LOADED`, drops the loaded create info and releases the
    /// protecting reference. The caller owns the returned data and drops or
    /// recycles it.
    ///
    /// # Returns
    ///
    /// `None` for a stale request.
    #[must_use]
    pub fn execute(self) -> Option<ResourceData> {
        match self.target {
            UnloadTarget::Detached(data) => Some(data),
            UnloadTarget::Attached(resource) => {
                let (data, create_info) = {
                    let mut cell = resource.inner.cell.write();
                    if cell.iteration != self.iteration || cell.data.is_none() {
                        (None, None)
                    } else {
                        cell.state.remove(ResourceState::LOADED);
                        cell.unloader = None;
                        (cell.data.take(), cell.loaded_create_info.take())
                    }
                };
                drop(create_info);
                if data.is_some() {
                    tracing::trace!("{} - Unloaded", resource.log_prefix());
                } else {
                    tracing::trace!(
                        "{} - Skipping stale unload of iteration {}",
                        resource.log_prefix(),
                        self.iteration
                    );
                }
                data
            }
        }
    }
}

impl fmt::Debug for UnloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnloadRequest")
            .field("id", &self.id)
            .field("resource_type", &self.resource_type)
            .field("iteration", &self.iteration)
            .field("attached", &self.resource().is_some())
            .finish()
    }
}

/// Hands data that is no longer attached to any resource to its unloader,
/// or drops it when there is none.
pub(crate) fn dispose_detached(
    id: ResourceId,
    resource_type: ResourceType,
    iteration: u32,
    data: ResourceData,
    unloader: Option<Arc<dyn ResourceUnloader>>,
) {
    match unloader {
        Some(unloader) => unloader.unload(
            UnloadRequest {
                id,
                resource_type,
                iteration,
                target: UnloadTarget::Detached(data),
            },
            true,
        ),
        None => drop(data),
    }
}

impl Resource {
    /// Unloads the resource's data.
    ///
    /// Does nothing for replaced resources or when `LOADED` is not set.
    /// Without an unloader the data is dropped right away. Otherwise the
    /// unloader receives a request; with `immediate` unset it may keep the
    /// request, and the resource stays `LOADED` and referenced until the
    /// request executes.
    pub fn unload_data(&self, immediate: bool) {
        let (unloader, iteration) = {
            let mut cell = self.inner.cell.write();
            if cell.replacement().is_some() || !cell.state.contains(ResourceState::LOADED) {
                return;
            }
            let Some(unloader) = cell.unloader.clone() else {
                cell.state.remove(ResourceState::LOADED);
                let data = cell.data.take();
                let create_info = cell.loaded_create_info.take();
                drop(cell);
                tracing::trace!("{} - Unloaded without unloader", self.log_prefix());
                drop(data);
                drop(create_info);
                return;
            };
            (unloader, cell.iteration)
        };

        if immediate {
            tracing::trace!("{} - Unloading immediately", self.log_prefix());
        } else {
            tracing::trace!("{} - Requesting deferred unload", self.log_prefix());
        }
        unloader.unload(UnloadRequest::attached(self.clone(), iteration), immediate);
    }
}

/// Called with every payload an [`UnloadQueue`] releases.
pub type PayloadDestructor = Box<dyn Fn(ResourceId, ResourceData) + Send + Sync>;

/// Deferral context that stores deferred unloads until [`process`] runs.
///
/// Immediate requests execute on the spot. A queued request keeps its
/// resource alive until it is processed; requests still pending when the
/// queue is dropped are processed then. A queue owned only by the resources
/// it unloads is never dropped while it holds requests for them, so those
/// must be processed explicitly.
///
/// [`process`]: UnloadQueue::process
pub struct UnloadQueue {
    sender: Sender<UnloadRequest>,
    receiver: Receiver<UnloadRequest>,
    destructor: Option<PayloadDestructor>,
}

impl UnloadQueue {
    /// Creates an empty queue that simply drops released payloads.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            destructor: None,
        }
    }

    /// Creates an empty queue passing released payloads to `destructor`.
    #[must_use]
    pub fn with_destructor(destructor: PayloadDestructor) -> Self {
        let mut queue = Self::new();
        queue.destructor = Some(destructor);
        queue
    }

    /// Number of queued requests.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Executes every queued request.
    ///
    /// # Returns
    ///
    /// How many requests actually released data. Stale requests are
    /// dropped without counting.
    pub fn process(&self) -> usize {
        let mut released = 0;
        while let Ok(request) = self.receiver.try_recv() {
            if self.run(request) {
                released += 1;
            }
        }
        released
    }

    fn run(&self, request: UnloadRequest) -> bool {
        let id = request.id();
        match request.execute() {
            Some(data) => {
                match &self.destructor {
                    Some(destructor) => destructor(id, data),
                    None => drop(data),
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for UnloadQueue {
    fn drop(&mut self) {
        let pending = self.pending();
        if pending > 0 {
            tracing::warn!(
                "UnloadQueue - Dropped with {pending} pending unload requests, processing them"
            );
            self.process();
        }
    }
}

impl Default for UnloadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceUnloader for UnloadQueue {
    fn unload(&self, request: UnloadRequest, immediate: bool) {
        if immediate {
            self.run(request);
        } else {
            // The receiver lives in `self`, so the channel is never closed here.
            let _ = self.sender.send(request);
        }
    }
}

impl fmt::Debug for UnloadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnloadQueue")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
