//! # Resource Error Types
//!
//! Errors returned by resource, pool and configuration operations, plus the
//! failure values a loader hands back through post-load.

use crate::types::{ResourceId, ResourceType};
use thiserror::Error;

/// Errors that can occur when operating on resources.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A replaced resource forwards to its replacement and can never load.
    #[error("resource {0} has been replaced and cannot be loaded")]
    ReplacedCannotLoad(ResourceId),

    /// Only undefined resources can be replaced.
    #[error("resource {id} has type {resource_type} and cannot be replaced")]
    NotUndefined {
        /// The resource that was asked to be replaced.
        id: ResourceId,
        /// Its concrete type.
        resource_type: ResourceType,
    },

    /// The resource already forwards to a replacement.
    #[error("resource {0} has already been replaced")]
    AlreadyReplaced(ResourceId),

    /// The replacement target must carry a concrete type.
    #[error("resource {0} cannot act as a replacement")]
    InvalidReplacement(ResourceId),

    /// The resource functions do not carry a loader.
    #[error("no loader was provided for resource {0}")]
    LoaderNotProvided(ResourceId),

    /// The resource functions do not carry an importer.
    #[error("no importer was provided for resource {0}")]
    ImporterNotProvided(ResourceId),

    /// No resource with this ID is known.
    #[error("resource {0} not found")]
    NotFound(ResourceId),

    /// A resource with this ID already exists.
    #[error("resource {0} already exists")]
    AlreadyExists(ResourceId),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Failure reported through post-load.
///
/// The core only routes these into the `FAILED` state; it never interprets
/// the loader-supplied variant.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The post-load token was dropped without being completed.
    #[error("load was abandoned before completion")]
    Abandoned,

    /// The loader produced data of a different type than the resource.
    #[error("loaded data has type {found}, resource expects {expected}")]
    TypeMismatch {
        /// The resource's type.
        expected: ResourceType,
        /// The type the loader reported.
        found: ResourceType,
    },

    /// Loaded data has to carry a concrete type.
    #[error("loaded data has no concrete type")]
    UndefinedPayload,

    /// Loader specific failure.
    #[error("loader failed: {0}")]
    Loader(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl LoadError {
    /// Wraps any loader error.
    pub fn loader(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Loader(err.into())
    }
}
