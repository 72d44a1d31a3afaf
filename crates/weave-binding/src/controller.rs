//! Element controllers and controller class resolution.

use std::collections::HashMap;
use std::fmt;

use weave_content::{ComponentId, ContentChange, KeyPath};

use crate::dom::DomAdapter;

/// A content property bound to a DOM element.
///
/// Always addresses the property on the component that owns it, so a
/// [`ContentChange`] maps onto it directly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundProperty {
    /// Component owning the property.
    pub component: ComponentId,
    /// Property name on `component`.
    pub key: KeyPath,
}

impl BoundProperty {
    /// Create a binding for `key` on `component`.
    #[must_use]
    pub fn new(component: impl Into<ComponentId>, key: KeyPath) -> Self {
        Self {
            component: component.into(),
            key,
        }
    }
}

impl From<&ContentChange> for BoundProperty {
    fn from(change: &ContentChange) -> Self {
        Self {
            component: change.component.clone(),
            key: change.key.clone(),
        }
    }
}

impl fmt::Display for BoundProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.key)
    }
}

/// How a controller moves values between a property and its element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ControllerClass {
    /// The element's text content.
    #[default]
    PlainText,
    /// The element's inner HTML, passed through unescaped.
    RichText,
    /// A named attribute on the element (e.g. `src` for images).
    Attribute(String),
}

impl ControllerClass {
    /// Read the bound value from `element`.
    pub(crate) fn read<D: DomAdapter>(&self, dom: &D, element: &D::Element) -> Option<String> {
        match self {
            Self::PlainText => dom.text(element),
            Self::RichText => dom.inner_html(element),
            Self::Attribute(name) => dom.attribute(element, name),
        }
    }

    /// Write `value` into `element`.
    pub(crate) fn write<D: DomAdapter>(&self, dom: &mut D, element: &D::Element, value: &str) {
        match self {
            Self::PlainText => dom.set_text(element, value),
            Self::RichText => dom.set_inner_html(element, value),
            Self::Attribute(name) => dom.set_attribute(element, name, value),
        }
    }
}

/// Maps component kinds to specialised controller classes.
///
/// Resolution is a pure function of the kind; unregistered kinds get
/// [`ControllerClass::PlainText`].
#[derive(Clone, Debug, Default)]
pub struct ControllerRegistry {
    classes: HashMap<String, ControllerClass>,
}

impl ControllerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `class` for components of `kind`.
    #[must_use]
    pub fn with_class(mut self, kind: impl Into<String>, class: ControllerClass) -> Self {
        self.register(kind, class);
        self
    }

    /// Register `class` for components of `kind`, replacing any previous one.
    pub fn register(&mut self, kind: impl Into<String>, class: ControllerClass) {
        self.classes.insert(kind.into(), class);
    }

    /// Controller class for a component kind.
    #[must_use]
    pub fn class_for(&self, kind: Option<&str>) -> ControllerClass {
        kind.and_then(|k| self.classes.get(k))
            .cloned()
            .unwrap_or_default()
    }
}

/// Binds one content property to one DOM element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementController<E> {
    binding: BoundProperty,
    element: E,
    class: ControllerClass,
}

impl<E> ElementController<E> {
    /// Create a controller.
    #[must_use]
    pub fn new(binding: BoundProperty, element: E, class: ControllerClass) -> Self {
        Self {
            binding,
            element,
            class,
        }
    }

    /// The bound property.
    #[must_use]
    pub fn binding(&self) -> &BoundProperty {
        &self.binding
    }

    /// The bound element.
    #[must_use]
    pub fn element(&self) -> &E {
        &self.element
    }

    /// How values are moved.
    #[must_use]
    pub fn class(&self) -> &ControllerClass {
        &self.class
    }
}
