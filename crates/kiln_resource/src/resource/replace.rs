//! # Replacement
//!
//! An undefined resource can be redirected, once and for good, to a typed
//! one. From then on it reports `LOADED`, refuses to load, and passes its
//! use-count operations through to the replacement.

use super::handle::{Resource, UseLink};
use crate::error::{ResourceError, ResourceResult};
use crate::types::ResourceState;

impl Resource {
    /// Redirects this undefined resource to `replacement`.
    ///
    /// The resource keeps a reference to `replacement` until it is
    /// destroyed, and its current use count moves over to `replacement`.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NotUndefined`] if this resource is typed
    /// - [`ResourceError::InvalidReplacement`] if `replacement` is undefined
    /// - [`ResourceError::AlreadyReplaced`] if this resource already forwards
    pub fn replace(&self, replacement: &Resource) -> ResourceResult<()> {
        if !self.inner.resource_type.is_undefined() {
            return Err(ResourceError::NotUndefined {
                id: self.inner.id,
                resource_type: self.inner.resource_type,
            });
        }
        if replacement.resource_type().is_undefined() {
            return Err(ResourceError::InvalidReplacement(replacement.id()));
        }

        let mut cell = self.inner.cell.write();
        let uses = match cell.uses {
            UseLink::Owned(uses) => uses,
            UseLink::Forwarded { .. } => {
                return Err(ResourceError::AlreadyReplaced(self.inner.id));
            }
        };
        if uses > 0 {
            replacement.shift_uses(uses, true);
        }
        cell.uses = UseLink::Forwarded {
            target: replacement.clone(),
            outstanding: uses,
        };
        cell.state = ResourceState::LOADED;
        drop(cell);

        tracing::trace!(
            "{} - Replaced by {}",
            self.log_prefix(),
            replacement.log_prefix()
        );
        Ok(())
    }

    /// A new reference to the replacement, if there is one.
    #[must_use]
    pub fn replacement(&self) -> Option<Resource> {
        self.inner.cell.read().replacement().cloned()
    }

    /// True once the resource forwards to a replacement.
    #[must_use]
    pub fn is_replaced(&self) -> bool {
        self.inner.cell.read().replacement().is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ResourceError;
    use crate::fns::ResourceFns;
    use crate::resource::Resource;
    use crate::types::{ResourceId, ResourceState, ResourceType};
    use std::sync::Arc;

    const SHADER: ResourceType = ResourceType::Typed(0x40);

    fn pair() -> (Resource, Resource) {
        let fns = Arc::new(ResourceFns::new());
        (
            Resource::undefined(ResourceId::new(1), Arc::clone(&fns)),
            Resource::new(ResourceId::new(1), SHADER, fns),
        )
    }

    #[test]
    fn test_replace_moves_uses() {
        let (original, typed) = pair();
        original.increment_use_count();
        original.increment_use_count();

        original.replace(&typed).expect("undefined source");
        assert!(original.is_replaced());
        assert_eq!(original.state(), ResourceState::LOADED);
        assert_eq!(original.resource_type(), ResourceType::Undefined);
        assert_eq!(typed.use_count(), 2);
        assert_eq!(typed.ref_count(), 2);

        assert_eq!(original.decrement_use_count(), 1);
        assert_eq!(typed.use_count(), 1);
        assert_eq!(original.increment_use_count(), 2);
    }

    #[test]
    fn test_replace_errors() {
        let (original, typed) = pair();
        let other = Resource::undefined(ResourceId::new(2), Arc::clone(typed.fns()));

        assert_eq!(
            typed.replace(&original),
            Err(ResourceError::NotUndefined {
                id: ResourceId::new(1),
                resource_type: SHADER,
            })
        );
        assert_eq!(
            original.replace(&other),
            Err(ResourceError::InvalidReplacement(ResourceId::new(2)))
        );

        original.replace(&typed).expect("first replace");
        assert_eq!(
            original.replace(&typed),
            Err(ResourceError::AlreadyReplaced(ResourceId::new(1)))
        );
        assert_eq!(typed.ref_count(), 2);
    }

    #[test]
    fn test_destroy_releases_link_and_uses() {
        let (original, typed) = pair();
        original.increment_use_count();
        original.replace(&typed).expect("undefined source");

        let replacement = original.replacement().expect("replaced");
        assert_eq!(typed.ref_count(), 3);
        drop(replacement);

        assert_eq!(original.release(), 0);
        assert_eq!(typed.ref_count(), 1);
        assert_eq!(typed.use_count(), 0);
    }
}
