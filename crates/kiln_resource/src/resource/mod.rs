//! # Resources
//!
//! The [`Resource`] handle and the operations that move it through its
//! lifecycle:
//!
//! - `handle` - identity, reference and use counts, state and data access
//! - `load` - importing create info, dispatching loaders and completing loads
//! - `unload` - immediate and deferred unloading
//! - `replace` - redirecting undefined handles to typed ones
//!
//! ## State Machine
//!
//! ```text
//!  {} ──load──> {LOADING} ──ok──> {LOADED} ──reload──> {LOADED|LOADING}
//!                   │                 ▲                       │
//!                   └──err──> {FAILED}└───────ok / err────────┘
//! ```

mod handle;
mod load;
mod replace;
mod unload;

pub use handle::{Resource, ResourceData, UseGuard};
pub use load::{LoadStatus, LoadedData, PostLoad};
pub use unload::{PayloadDestructor, ResourceUnloader, UnloadQueue, UnloadRequest};
