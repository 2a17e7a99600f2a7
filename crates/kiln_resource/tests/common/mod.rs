//! Shared fixtures for the resource integration tests.

#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};
use kiln_resource::{
    LoadedData, PostLoad, ResourceLoader, ResourceType, ResourceUnloader, UnloadQueue,
    UnloadRequest,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MESH: ResourceType = ResourceType::Typed(0x10);
pub const IMAGE: ResourceType = ResourceType::Typed(0x20);

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

pub fn sample_mesh() -> Vec<Vertex> {
    (0..64_u16)
        .map(|i| {
            let f = f32::from(i);
            Vertex {
                position: [f, f * 0.5, -f],
                uv: [f / 64.0, 1.0 - f / 64.0],
            }
        })
        .collect()
}

/// Loader that parks every token until the test completes it.
#[derive(Default)]
pub struct ParkingLoader {
    tokens: Mutex<Vec<PostLoad>>,
    calls: AtomicUsize,
}

impl ParkingLoader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn parked(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn take(&self) -> PostLoad {
        self.tokens.lock().remove(0)
    }
}

impl ResourceLoader for ParkingLoader {
    fn load(&self, post_load: PostLoad) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().push(post_load);
    }
}

/// Unloader that counts how it was called and defers through a queue.
#[derive(Default)]
pub struct CountingUnloader {
    pub queue: UnloadQueue,
    immediate: AtomicUsize,
    deferred: AtomicUsize,
}

impl CountingUnloader {
    pub fn immediate_calls(&self) -> usize {
        self.immediate.load(Ordering::SeqCst)
    }

    pub fn deferred_calls(&self) -> usize {
        self.deferred.load(Ordering::SeqCst)
    }
}

impl ResourceUnloader for CountingUnloader {
    fn unload(&self, request: UnloadRequest, immediate: bool) {
        if immediate {
            self.immediate.fetch_add(1, Ordering::SeqCst);
        } else {
            self.deferred.fetch_add(1, Ordering::SeqCst);
        }
        self.queue.unload(request, immediate);
    }
}

/// Loaded mesh data that unloads through `unloader`.
pub fn mesh_data(unloader: &Arc<CountingUnloader>) -> LoadedData {
    let unloader: Arc<dyn ResourceUnloader> = unloader.clone();
    LoadedData::new(MESH, sample_mesh()).with_unloader(unloader)
}
