//! Content access traits.

use crate::id::{ComponentId, KeyPath, KeyPathError};

/// Outcome of resolving a [`KeyPath`] against a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The path addresses a sub-component.
    Component(ComponentId),
    /// The path addresses a text property.
    Property {
        /// Component that owns the property (the last component walked).
        owner: ComponentId,
        /// Final path segment, the property name on `owner`.
        key: String,
        /// Current property value.
        value: String,
    },
    /// Some segment of the path does not exist.
    Missing,
}

/// Read access to a store of content components.
///
/// This is the whole capability set the parser and binding session depend
/// on: concrete variants are only ever observed through [`kind`](Self::kind).
pub trait ContentSource {
    /// Concrete variant of a component, or `None` if it does not exist.
    fn kind(&self, id: &ComponentId) -> Option<&str>;

    /// Value of a named text property.
    fn property(&self, id: &ComponentId, key: &str) -> Option<String>;

    /// Identifier of a named sub-component.
    ///
    /// Sub-components may point anywhere in the store, including back at an
    /// ancestor. Callers walking the graph must guard against cycles.
    fn subcomponent(&self, id: &ComponentId, key: &str) -> Option<ComponentId>;

    /// Whether the component exists.
    fn contains(&self, id: &ComponentId) -> bool {
        self.kind(id).is_some()
    }

    /// Resolve a key-path relative to `id`.
    ///
    /// Leading segments must name sub-components. The final segment names a
    /// sub-component if one exists, otherwise a property.
    fn resolve(&self, id: &ComponentId, path: &KeyPath) -> Resolution {
        let (head, last) = path.split_last();
        let mut current = id.clone();
        for segment in head {
            match self.subcomponent(&current, segment) {
                Some(next) => current = next,
                None => return Resolution::Missing,
            }
        }

        if let Some(component) = self.subcomponent(&current, last) {
            return Resolution::Component(component);
        }
        match self.property(&current, last) {
            Some(value) => Resolution::Property {
                owner: current,
                key: last.to_owned(),
                value,
            },
            None => Resolution::Missing,
        }
    }
}

/// Notification that a property of a component changed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentChange {
    /// Component whose property changed.
    pub component: ComponentId,
    /// Property that changed, relative to `component`.
    pub key: KeyPath,
}

/// Error returned by [`ContentModel`] writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// The target component does not exist.
    #[error("unknown content component: {0}")]
    UnknownComponent(ComponentId),
    /// The property name is not a valid key.
    #[error("invalid property key: {0}")]
    InvalidKey(#[from] KeyPathError),
    /// The key names a sub-component, which cannot be overwritten with text.
    #[error("{key} on {component} is a sub-component, not a property")]
    NotAProperty {
        /// Component that was written.
        component: ComponentId,
        /// Key that was written.
        key: String,
    },
}

/// Write access to a content store.
pub trait ContentModel: ContentSource {
    /// Set a text property.
    ///
    /// Returns `Ok(None)` if the value is unchanged, otherwise the change
    /// notification describing the write.
    fn set_property(
        &mut self,
        id: &ComponentId,
        key: &str,
        value: String,
    ) -> Result<Option<ContentChange>, ContentError>;

    /// Withdraw the outward notification for a change the caller made
    /// itself.
    ///
    /// Called with the change [`set_property`](Self::set_property) just
    /// returned, so an observer that caused the write never hears it again.
    /// Models that do not queue notifications can keep the default no-op.
    fn absorb_change(&mut self, _change: &ContentChange) {}
}
