//! Escape / outside-click routing scoped to open editors.
//!
//! An open editor holds a [`Subscription`]; dropping it unregisters the
//! editor, so a closed editor can never receive a dismissal.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::domain::FieldKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    Escape,
    OutsideClick,
}

#[derive(Debug, Default)]
struct HubState {
    next_id: u64,
    stack: Vec<(u64, FieldKey)>,
}

#[derive(Debug, Clone, Default)]
pub struct DismissHub {
    inner: Rc<RefCell<HubState>>,
}

impl DismissHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, owner: FieldKey) -> Subscription {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        trace!(%owner, id, "dismissal subscription opened");
        state.stack.push((id, owner));
        Subscription {
            id,
            hub: Rc::downgrade(&self.inner),
        }
    }

    /// Most recently opened editor that is still subscribed.
    pub fn target(&self) -> Option<FieldKey> {
        self.inner
            .borrow()
            .stack
            .last()
            .map(|(_, owner)| owner.clone())
    }

    pub fn route(&self, dismissal: Dismissal) -> Option<(FieldKey, Dismissal)> {
        self.target().map(|owner| (owner, dismissal))
    }

    pub fn is_subscribed(&self, owner: &FieldKey) -> bool {
        self.inner
            .borrow()
            .stack
            .iter()
            .any(|(_, key)| key == owner)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().stack.is_empty()
    }
}

#[derive(Debug)]
pub struct Subscription {
    id: u64,
    hub: Weak<RefCell<HubState>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let mut state = hub.borrow_mut();
            state.stack.retain(|(id, _)| *id != self.id);
            trace!(id = self.id, "dismissal subscription closed");
        }
    }
}
