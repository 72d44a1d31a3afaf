//! Live two-way binding for Weave.
//!
//! A [`LiveBindingSession`] sits between a rendered page and its content
//! model. Edits on either side are forwarded to the other through element
//! controllers, while an [`UpdateGuard`] makes sure the echo of a forwarded
//! edit is recognised and dropped instead of bouncing back.
//!
//! The session never talks to a browser directly: hosts implement
//! [`DomAdapter`] and forward mutation events to
//! [`LiveBindingSession::dom_did_change`] and model notifications to
//! [`LiveBindingSession::model_did_change`].
//!
//! # Features
//!
//! - `mock`: exports [`MockDom`], an in-memory DOM for tests.

mod controller;
mod dom;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod session;

pub use controller::{BoundProperty, ControllerClass, ControllerRegistry, ElementController};
pub use dom::DomAdapter;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockDom;
pub use session::{
    BindingError, BindingNotification, LiveBindingSession, Observation, ReentrantUpdate, UpdateGuard,
};
