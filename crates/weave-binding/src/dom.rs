//! DOM adapter protocol.

use std::fmt::Debug;
use std::hash::Hash;

/// Host-side access to a rendered DOM.
///
/// Elements are addressed through an opaque handle type chosen by the host.
/// Listener registration is the adapter's business: once
/// [`add_listener`](Self::add_listener) has been called for an element, the
/// host is expected to forward that element's mutation events to
/// [`LiveBindingSession::dom_did_change`](crate::LiveBindingSession::dom_did_change).
pub trait DomAdapter {
    /// Handle to a DOM element.
    type Element: Clone + Eq + Hash + Debug;

    /// Find the element carrying `anchor` as its `id`.
    fn element_by_anchor(&self, anchor: &str) -> Option<Self::Element>;

    /// Start forwarding mutation events for `element`.
    fn add_listener(&mut self, element: &Self::Element);

    /// Stop forwarding mutation events for `element`.
    fn remove_listener(&mut self, element: &Self::Element);

    /// Text content of `element`.
    fn text(&self, element: &Self::Element) -> Option<String>;

    /// Replace the text content of `element`.
    fn set_text(&mut self, element: &Self::Element, value: &str);

    /// Value of an attribute on `element`.
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Set an attribute on `element`.
    fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str);

    /// Inner HTML of `element`. Defaults to its text content.
    fn inner_html(&self, element: &Self::Element) -> Option<String> {
        self.text(element)
    }

    /// Replace the inner HTML of `element`. Defaults to setting its text.
    fn set_inner_html(&mut self, element: &Self::Element, html: &str) {
        self.set_text(element, html);
    }
}
