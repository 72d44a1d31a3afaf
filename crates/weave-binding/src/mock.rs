//! Mock DOM for testing.
//!
//! Provides [`MockDom`], an in-memory [`DomAdapter`] whose elements are
//! addressed by anchor.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::dom::DomAdapter;

#[derive(Debug, Default)]
struct MockElement {
    text: String,
    attributes: BTreeMap<String, String>,
}

/// In-memory DOM keyed by anchor.
///
/// Writes made through the [`DomAdapter`] interface are logged so tests can
/// assert exactly what a session pushed into the page. Simulated user edits
/// ([`edit_text`](Self::edit_text)) bypass the log.
///
/// # Example
///
/// ```
/// use weave_binding::{DomAdapter, MockDom};
///
/// let mut dom = MockDom::new().with_element("title", "Hello");
/// dom.set_text(&"title".to_owned(), "Bye");
/// assert_eq!(dom.text_of("title"), Some("Bye"));
/// ```
#[derive(Debug, Default)]
pub struct MockDom {
    elements: HashMap<String, MockElement>,
    listening: HashSet<String>,
    writes: Vec<(String, String)>,
}

impl MockDom {
    /// Create an empty DOM.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element with the given anchor and text.
    #[must_use]
    pub fn with_element(mut self, anchor: &str, text: &str) -> Self {
        self.elements.insert(
            anchor.to_owned(),
            MockElement {
                text: text.to_owned(),
                attributes: BTreeMap::new(),
            },
        );
        self
    }

    /// Set an attribute, creating the element if needed.
    #[must_use]
    pub fn with_attribute(mut self, anchor: &str, name: &str, value: &str) -> Self {
        self.elements
            .entry(anchor.to_owned())
            .or_default()
            .attributes
            .insert(name.to_owned(), value.to_owned());
        self
    }

    /// Simulate a user editing an element's text.
    pub fn edit_text(&mut self, anchor: &str, text: &str) {
        if let Some(element) = self.elements.get_mut(anchor) {
            text.clone_into(&mut element.text);
        }
    }

    /// Current text of an element.
    #[must_use]
    pub fn text_of(&self, anchor: &str) -> Option<&str> {
        self.elements.get(anchor).map(|e| e.text.as_str())
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn attribute_of(&self, anchor: &str, name: &str) -> Option<&str> {
        self.elements
            .get(anchor)?
            .attributes
            .get(name)
            .map(String::as_str)
    }

    /// Whether a listener is attached to an element.
    #[must_use]
    pub fn is_listening(&self, anchor: &str) -> bool {
        self.listening.contains(anchor)
    }

    /// Writes made through the adapter, as `(anchor, value)` pairs.
    #[must_use]
    pub fn writes(&self) -> &[(String, String)] {
        &self.writes
    }
}

impl DomAdapter for MockDom {
    type Element = String;

    fn element_by_anchor(&self, anchor: &str) -> Option<String> {
        self.elements.contains_key(anchor).then(|| anchor.to_owned())
    }

    fn add_listener(&mut self, element: &String) {
        self.listening.insert(element.clone());
    }

    fn remove_listener(&mut self, element: &String) {
        self.listening.remove(element);
    }

    fn text(&self, element: &String) -> Option<String> {
        self.elements.get(element).map(|e| e.text.clone())
    }

    fn set_text(&mut self, element: &String, value: &str) {
        if let Some(e) = self.elements.get_mut(element) {
            value.clone_into(&mut e.text);
            self.writes.push((element.clone(), value.to_owned()));
        }
    }

    fn attribute(&self, element: &String, name: &str) -> Option<String> {
        self.elements.get(element)?.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, element: &String, name: &str, value: &str) {
        if let Some(e) = self.elements.get_mut(element) {
            e.attributes.insert(name.to_owned(), value.to_owned());
            self.writes.push((element.clone(), value.to_owned()));
        }
    }
}
