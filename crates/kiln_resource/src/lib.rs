//! # KILN Resource Lifecycle
//!
//! Reference-counted resource handles for the KILN engine.
//!
//! ## Design Principles
//!
//! 1. **Handles are `Arc`s** - cloning takes a reference, dropping releases it
//! 2. **Loads never block** - loaders run inline or on an external scheduler
//! 3. **One completion per load** - post-load is a token consumed by value
//! 4. **Transparent replacement** - undefined handles forward to typed ones
//!
//! ## Thread Safety
//!
//! Every operation may be called from any thread. Mutations on one handle
//! are serialized by a per-handle lock; readers borrow loaded data through a
//! read guard.
//!
//! ## Example
//!
//! ```rust,ignore
//! use kiln_resource::{LoadedData, PoolConfig, PostLoad, ResourceFns, ResourceId, ResourcePool, ResourceType};
//! use std::sync::Arc;
//!
//! const MESH: ResourceType = ResourceType::Typed(0x10);
//!
//! let fns = ResourceFns::new().with_loader(Arc::new(|post_load: PostLoad| {
//!     let mesh = read_mesh(post_load.resource().id());
//!     post_load.succeed(LoadedData::new(MESH, mesh));
//! }));
//!
//! let pool = ResourcePool::new(fns, PoolConfig::from_toml_file("data/pool.toml")?);
//! let handle = pool.add(ResourceId::new(1)).expect("fresh id");
//! handle.load_data()?;
//!
//! // The undefined handle now forwards to the typed one.
//! let mesh = pool.find(ResourceId::new(1)).expect("still indexed");
//! assert!(mesh.data::<Mesh>().is_some());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod create_info;
pub mod error;
pub mod fns;
pub mod pool;
pub mod resource;
pub mod types;

pub use config::PoolConfig;
pub use create_info::CreateInfo;
pub use error::{LoadError, ResourceError, ResourceResult};
pub use fns::{
    ResourceFns, ResourceImporter, ResourceLoader, ResourceRegistry, Task, TaskScheduler,
};
pub use pool::ResourcePool;
pub use resource::{
    LoadStatus, LoadedData, PayloadDestructor, PostLoad, Resource, ResourceData,
    ResourceUnloader, UnloadQueue, UnloadRequest, UseGuard,
};
pub use types::{ResourceId, ResourceState, ResourceType};
