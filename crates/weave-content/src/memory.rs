//! Map-backed content store.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::id::{ComponentId, KeyPath};
use crate::source::{ContentChange, ContentError, ContentModel, ContentSource};

/// A single component in a [`MemoryContent`] store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Concrete variant name (e.g. `"page"`, `"text"`, `"image"`).
    pub kind: String,
    /// Named text properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Named sub-components, by identifier.
    #[serde(default)]
    pub subcomponents: BTreeMap<String, ComponentId>,
}

impl ComponentRecord {
    /// Create an empty record of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: BTreeMap::new(),
            subcomponents: BTreeMap::new(),
        }
    }
}

impl Default for ComponentRecord {
    fn default() -> Self {
        Self::new("component")
    }
}

/// In-memory content store.
///
/// Every successful [`set_property`](ContentModel::set_property) also queues
/// the resulting [`ContentChange`]. Hosts drain the queue with
/// [`take_changes`](Self::take_changes) and forward it to whoever observes
/// the model, which keeps notification delivery on the caller's thread of
/// control.
///
/// Deserializes from a `components` map:
///
/// ```json
/// { "components": { "home": { "kind": "page", "properties": { "title": "Hi" } } } }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct MemoryContent {
    #[serde(default)]
    components: HashMap<ComponentId, ComponentRecord>,
    #[serde(skip)]
    changes: Vec<ContentChange>,
}

impl MemoryContent {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a component of the given kind.
    #[must_use]
    pub fn with_component(mut self, id: impl Into<ComponentId>, kind: &str) -> Self {
        self.insert_component(id.into(), ComponentRecord::new(kind));
        self
    }

    /// Set a property, creating the component if needed. Does not queue a change.
    #[must_use]
    pub fn with_property(
        mut self,
        id: impl Into<ComponentId>,
        key: &str,
        value: impl Into<String>,
    ) -> Self {
        self.components
            .entry(id.into())
            .or_default()
            .properties
            .insert(key.to_owned(), value.into());
        self
    }

    /// Link a sub-component, creating the parent component if needed.
    #[must_use]
    pub fn with_subcomponent(
        mut self,
        id: impl Into<ComponentId>,
        key: &str,
        child: impl Into<ComponentId>,
    ) -> Self {
        self.components
            .entry(id.into())
            .or_default()
            .subcomponents
            .insert(key.to_owned(), child.into());
        self
    }

    /// Insert a component record, returning the previous one.
    pub fn insert_component(
        &mut self,
        id: ComponentId,
        record: ComponentRecord,
    ) -> Option<ComponentRecord> {
        self.components.insert(id, record)
    }

    /// Remove a component. Links pointing at it are left dangling and resolve
    /// as missing.
    pub fn remove_component(&mut self, id: &ComponentId) -> Option<ComponentRecord> {
        self.components.remove(id)
    }

    /// Borrow a component record.
    #[must_use]
    pub fn component(&self, id: &ComponentId) -> Option<&ComponentRecord> {
        self.components.get(id)
    }

    /// Number of components in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the store has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Changes queued since the last drain.
    #[must_use]
    pub fn pending_changes(&self) -> &[ContentChange] {
        &self.changes
    }

    /// Drain queued change notifications.
    pub fn take_changes(&mut self) -> Vec<ContentChange> {
        std::mem::take(&mut self.changes)
    }
}

impl ContentSource for MemoryContent {
    fn kind(&self, id: &ComponentId) -> Option<&str> {
        self.components.get(id).map(|c| c.kind.as_str())
    }

    fn property(&self, id: &ComponentId, key: &str) -> Option<String> {
        self.components.get(id)?.properties.get(key).cloned()
    }

    fn subcomponent(&self, id: &ComponentId, key: &str) -> Option<ComponentId> {
        self.components.get(id)?.subcomponents.get(key).cloned()
    }
}

impl ContentModel for MemoryContent {
    fn set_property(
        &mut self,
        id: &ComponentId,
        key: &str,
        value: String,
    ) -> Result<Option<ContentChange>, ContentError> {
        let key_path = KeyPath::new(key)?;
        let record = self
            .components
            .get_mut(id)
            .ok_or_else(|| ContentError::UnknownComponent(id.clone()))?;

        if record.subcomponents.contains_key(key) {
            return Err(ContentError::NotAProperty {
                component: id.clone(),
                key: key.to_owned(),
            });
        }

        if record.properties.get(key) == Some(&value) {
            return Ok(None);
        }
        record.properties.insert(key.to_owned(), value);

        tracing::debug!(component = %id, key = %key_path, "content property changed");
        let change = ContentChange {
            component: id.clone(),
            key: key_path,
        };
        self.changes.push(change.clone());
        Ok(Some(change))
    }

    fn absorb_change(&mut self, change: &ContentChange) {
        if let Some(pos) = self.changes.iter().rposition(|c| c == change) {
            self.changes.remove(pos);
        }
    }
}
