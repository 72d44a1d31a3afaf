//! Live binding session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use weave_content::{ComponentId, ContentChange, ContentError, ContentModel, KeyPath, Resolution};
use weave_template::ParsedComponentTree;

use crate::controller::{BoundProperty, ControllerClass, ControllerRegistry, ElementController};
use crate::dom::DomAdapter;

/// Returned by [`LiveBindingSession::will_update`] when an update is already
/// in progress. Updates are never legitimately nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("an update is already in progress")]
pub struct ReentrantUpdate;

/// Error from a programmatic edit.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// The guard was acquired from a different session.
    #[error("update guard belongs to another session")]
    ForeignGuard,
    /// The content model rejected the write.
    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Outcome of an observation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Fired while an update was in progress; nothing happened.
    Suppressed,
    /// Nothing is bound to the observed element or property, or the value
    /// did not change.
    Ignored,
    /// The change was propagated to the other side.
    Applied,
}

/// Outward notification that a bound property changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingNotification {
    /// The property that changed.
    pub binding: BoundProperty,
}

#[derive(Debug, Default)]
struct UpdateState {
    updating: bool,
    /// Properties touched in the current bracket, in first-touch order.
    touched: Vec<BoundProperty>,
    notifications: Vec<BindingNotification>,
}

/// Scoped hold on a session's reentrancy guard.
///
/// Dropping the guard ends the update: the flag is cleared and every
/// distinct property touched inside the bracket produces one
/// [`BindingNotification`]. When the drop happens during a panic the flag is
/// still cleared but nothing is flushed.
#[derive(Debug)]
#[must_use = "the update ends as soon as the guard is dropped"]
pub struct UpdateGuard {
    state: Rc<RefCell<UpdateState>>,
}

impl UpdateGuard {
    /// End the update. Equivalent to dropping the guard.
    pub fn did_update(self) {}
}

impl Drop for UpdateGuard {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.updating = false;
        let touched = std::mem::take(&mut state.touched);
        if std::thread::panicking() {
            return;
        }
        state
            .notifications
            .extend(touched.into_iter().map(|binding| BindingNotification { binding }));
    }
}

/// Keeps a rendered DOM and a content model consistent while either side is
/// edited.
///
/// Controllers are stored once and indexed both by bound property and by
/// DOM element; every insertion and removal updates both indexes in the
/// same call. Updates pushed by the session itself are bracketed by an
/// [`UpdateGuard`], and observation callbacks arriving inside a bracket are
/// no-ops, which is what stops an edit from echoing back and forth.
pub struct LiveBindingSession<M: ContentModel, D: DomAdapter> {
    model: M,
    dom: D,
    registry: ControllerRegistry,
    controllers: Vec<Option<ElementController<D::Element>>>,
    free: Vec<usize>,
    by_binding: HashMap<BoundProperty, usize>,
    by_element: HashMap<D::Element, usize>,
    /// Where each bindable property is rendered.
    anchors: HashMap<BoundProperty, String>,
    state: Rc<RefCell<UpdateState>>,
}

impl<M: ContentModel, D: DomAdapter> LiveBindingSession<M, D> {
    /// Create a session with no controllers and no known anchors.
    #[must_use]
    pub fn new(model: M, dom: D, registry: ControllerRegistry) -> Self {
        Self {
            model,
            dom,
            registry,
            controllers: Vec::new(),
            free: Vec::new(),
            by_binding: HashMap::new(),
            by_element: HashMap::new(),
            anchors: HashMap::new(),
            state: Rc::new(RefCell::new(UpdateState::default())),
        }
    }

    /// Bind a session to the DOM rendered from `tree`.
    ///
    /// Every text block becomes bindable at its anchor. Nodes whose component
    /// kind is registered with [`ControllerClass::Attribute`] also bind that
    /// attribute's property to the node's own anchor element, provided the
    /// template gave that element an `id`. Controllers are
    /// created right away for anchors the DOM already contains; the rest are
    /// created on demand when their property changes.
    #[must_use]
    pub fn bind(tree: &ParsedComponentTree, model: M, dom: D, registry: ControllerRegistry) -> Self {
        let mut session = Self::new(model, dom, registry);

        for (_, node) in tree.iter() {
            let Some(component) = node.component() else {
                continue;
            };

            for block in node.text_blocks() {
                if let Some(binding) = session.owning_binding(component, &block.key_path) {
                    session.anchors.entry(binding).or_insert_with(|| block.anchor.clone());
                }
            }

            // A generated anchor names the wrapper div, not the element
            // carrying the attribute.
            if node.div_id().is_empty() || node.has_generated_anchor() {
                continue;
            }
            if let ControllerClass::Attribute(name) = session.registry.class_for(session.model.kind(component))
                && node
                    .parsed_key_paths()
                    .iter()
                    .any(|k| k.resolved && k.path.as_str() == name)
                && let Ok(key) = KeyPath::new(&name)
            {
                session
                    .anchors
                    .entry(BoundProperty::new(component.clone(), key))
                    .or_insert_with(|| node.div_id().to_owned());
            }
        }

        let mut bindable: Vec<(BoundProperty, String)> = session
            .anchors
            .iter()
            .map(|(b, a)| (b.clone(), a.clone()))
            .collect();
        bindable.sort_by(|a, b| a.1.cmp(&b.1));
        for (binding, anchor) in bindable {
            if let Some(element) = session.dom.element_by_anchor(&anchor) {
                session.make_and_add_controller(binding, element);
            }
        }

        tracing::debug!(
            bindable = session.anchors.len(),
            controllers = session.by_binding.len(),
            "bound live session"
        );
        session
    }

    /// The content model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the content model, for setup outside any update.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The DOM adapter.
    #[must_use]
    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Mutable access to the DOM adapter, for setup outside any update.
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    /// Give back the model and DOM adapter.
    pub fn into_parts(self) -> (M, D) {
        (self.model, self.dom)
    }

    /// Whether an update bracket is open.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.state.borrow().updating
    }

    /// Open an update bracket.
    ///
    /// # Errors
    ///
    /// Returns [`ReentrantUpdate`] if a bracket is already open.
    pub fn will_update(&self) -> Result<UpdateGuard, ReentrantUpdate> {
        let mut state = self.state.borrow_mut();
        if state.updating {
            return Err(ReentrantUpdate);
        }
        state.updating = true;
        Ok(UpdateGuard {
            state: Rc::clone(&self.state),
        })
    }

    /// Drain outward notifications flushed by closed brackets.
    pub fn take_notifications(&mut self) -> Vec<BindingNotification> {
        std::mem::take(&mut self.state.borrow_mut().notifications)
    }

    /// Set a property from code, inside an open bracket.
    ///
    /// Writes the model, then the bound element (creating its controller if
    /// needed). The model's own notification for the write is absorbed, so
    /// it never comes back through [`model_did_change`](Self::model_did_change).
    /// Returns whether the value changed; unchanged writes touch nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::ForeignGuard`] if `guard` was not opened on this
    /// session, or [`BindingError::Content`] if the model rejects the write.
    pub fn write_property(
        &mut self,
        guard: &UpdateGuard,
        binding: &BoundProperty,
        value: &str,
    ) -> Result<bool, BindingError> {
        if !Rc::ptr_eq(&guard.state, &self.state) {
            return Err(BindingError::ForeignGuard);
        }

        let Some(change) = self
            .model
            .set_property(&binding.component, binding.key.as_str(), value.to_owned())?
        else {
            return Ok(false);
        };
        self.model.absorb_change(&change);

        if let Some(slot) = self.ensure_controller(binding) {
            self.write_element(slot, value);
        }
        self.touch(binding);
        Ok(true)
    }

    /// Observation callback for a DOM mutation on `element`.
    ///
    /// Copies the element's value into the model and absorbs the model's
    /// notification for that write. A no-op inside an update.
    pub fn dom_did_change(&mut self, element: &D::Element) -> Observation {
        if self.is_updating() {
            tracing::trace!(?element, "suppressed DOM change during update");
            return Observation::Suppressed;
        }
        let Some(controller) = self.controller_for_html_element(element) else {
            return Observation::Ignored;
        };
        let binding = controller.binding().clone();
        let Some(value) = controller.class().read(&self.dom, element) else {
            return Observation::Ignored;
        };

        let Ok(_guard) = self.will_update() else {
            return Observation::Suppressed;
        };
        match self
            .model
            .set_property(&binding.component, binding.key.as_str(), value)
        {
            Ok(Some(change)) => {
                self.model.absorb_change(&change);
                self.touch(&binding);
                Observation::Applied
            }
            Ok(None) => Observation::Ignored,
            Err(e) => {
                tracing::warn!(binding = %binding, error = %e, "failed to apply DOM edit to content");
                Observation::Ignored
            }
        }
    }

    /// Observation callback for a content property change.
    ///
    /// Copies the new value into the bound element, creating its controller
    /// on demand. A no-op inside an update.
    pub fn model_did_change(&mut self, change: &ContentChange) -> Observation {
        if self.is_updating() {
            tracing::trace!(component = %change.component, key = %change.key, "suppressed content change during update");
            return Observation::Suppressed;
        }
        let binding = BoundProperty::from(change);
        let Some(slot) = self.ensure_controller(&binding) else {
            return Observation::Ignored;
        };

        let Ok(_guard) = self.will_update() else {
            return Observation::Suppressed;
        };
        let value = self
            .model
            .property(&binding.component, binding.key.as_str())
            .unwrap_or_default();
        self.write_element(slot, &value);
        self.touch(&binding);
        Observation::Applied
    }

    /// Register a controller in both indexes and attach its DOM listener.
    ///
    /// Any controller already bound to the same property or the same element
    /// is removed first and returned.
    pub fn add_element_controller(
        &mut self,
        controller: ElementController<D::Element>,
    ) -> Vec<ElementController<D::Element>> {
        let mut displaced = Vec::new();
        if let Some(old) = self.remove_element_controller(controller.binding()) {
            displaced.push(old);
        }
        if let Some(old) = self
            .by_element
            .get(controller.element())
            .copied()
            .and_then(|slot| self.remove_slot(slot))
        {
            displaced.push(old);
        }

        self.dom.add_listener(controller.element());
        let binding = controller.binding().clone();
        let element = controller.element().clone();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.controllers[slot] = Some(controller);
                slot
            }
            None => {
                self.controllers.push(Some(controller));
                self.controllers.len() - 1
            }
        };
        self.by_binding.insert(binding, slot);
        self.by_element.insert(element, slot);
        displaced
    }

    /// Remove the controller bound to `binding` from both indexes and detach
    /// its DOM listener.
    pub fn remove_element_controller(
        &mut self,
        binding: &BoundProperty,
    ) -> Option<ElementController<D::Element>> {
        let slot = self.by_binding.get(binding).copied()?;
        self.remove_slot(slot)
    }

    /// Controller bound to a content property.
    #[must_use]
    pub fn controller_for_body_element(
        &self,
        binding: &BoundProperty,
    ) -> Option<&ElementController<D::Element>> {
        let slot = *self.by_binding.get(binding)?;
        self.controllers[slot].as_ref()
    }

    /// Controller bound to a DOM element.
    #[must_use]
    pub fn controller_for_html_element(
        &self,
        element: &D::Element,
    ) -> Option<&ElementController<D::Element>> {
        let slot = *self.by_element.get(element)?;
        self.controllers[slot].as_ref()
    }

    /// Number of live controllers.
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.by_binding.len()
    }

    /// Controller class for a bound property, from its component's kind.
    ///
    /// An [`Attribute`](ControllerClass::Attribute) class only applies to
    /// the property it names; every other property of that component is
    /// plain text.
    #[must_use]
    pub fn controller_class_for_body_element(&self, binding: &BoundProperty) -> ControllerClass {
        match self.registry.class_for(self.model.kind(&binding.component)) {
            ControllerClass::Attribute(name) if name != binding.key.as_str() => ControllerClass::PlainText,
            class => class,
        }
    }

    /// Create a controller for `binding` on `element` and register it.
    ///
    /// Returns the controllers it displaced, as
    /// [`add_element_controller`](Self::add_element_controller) does.
    pub fn make_and_add_controller(
        &mut self,
        binding: BoundProperty,
        element: D::Element,
    ) -> Vec<ElementController<D::Element>> {
        let class = self.controller_class_for_body_element(&binding);
        tracing::debug!(binding = %binding, ?class, "created element controller");
        self.add_element_controller(ElementController::new(binding, element, class))
    }

    /// Slot of the controller for `binding`, creating it from the anchor map
    /// when the lookup misses.
    fn ensure_controller(&mut self, binding: &BoundProperty) -> Option<usize> {
        if let Some(&slot) = self.by_binding.get(binding) {
            return Some(slot);
        }
        let anchor = self.anchors.get(binding)?;
        let element = self.dom.element_by_anchor(anchor)?;
        self.make_and_add_controller(binding.clone(), element);
        self.by_binding.get(binding).copied()
    }

    fn remove_slot(&mut self, slot: usize) -> Option<ElementController<D::Element>> {
        let controller = self.controllers.get_mut(slot)?.take()?;
        self.by_binding.remove(controller.binding());
        self.by_element.remove(controller.element());
        self.dom.remove_listener(controller.element());
        self.free.push(slot);
        Some(controller)
    }

    fn write_element(&mut self, slot: usize, value: &str) {
        if let Some(controller) = &self.controllers[slot] {
            controller.class().write(&mut self.dom, controller.element(), value);
        }
    }

    fn touch(&self, binding: &BoundProperty) {
        let mut state = self.state.borrow_mut();
        if !state.touched.contains(binding) {
            state.touched.push(binding.clone());
        }
    }

    /// Binding for the property `path` addresses from `component`.
    fn owning_binding(&self, component: &ComponentId, path: &KeyPath) -> Option<BoundProperty> {
        match self.model.resolve(component, path) {
            Resolution::Property { owner, key, .. } => {
                KeyPath::new(&key).ok().map(|key| BoundProperty::new(owner, key))
            }
            Resolution::Component(_) | Resolution::Missing => None,
        }
    }
}
