//! Events - custom event queue and listener records.
//!
//! Handlers never touch the event bus directly. They push onto the
//! [`Emitter`] they are handed, and the runtime delivers queued events in
//! FIFO order as soon as the handler returns. A handler holds `&mut` to its
//! instance's props while it runs, so synchronous re-entry is not possible.
//!
//! # Example
//!
//! ```ignore
//! ComponentDescriptor::new("reset", |_, _| Ok("<button>Reset</button>".into()))
//!     .on("click", |_props, _payload, emitter| emitter.emit("reset", Value::Undefined));
//! ```

use std::collections::VecDeque;

use crate::types::{BindingKey, InstanceId, Value};

// =============================================================================
// Custom Events
// =============================================================================

/// An application-defined signal broadcast to every instance.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomEvent {
    pub name: String,
    pub payload: Value,
}

/// Outbox handed to handlers.
#[derive(Debug, Default)]
pub struct Emitter {
    queue: VecDeque<CustomEvent>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a custom event for delivery once the current handler returns.
    pub fn emit(&mut self, name: impl Into<String>, payload: impl Into<Value>) {
        self.queue.push_back(CustomEvent {
            name: name.into(),
            payload: payload.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn pop(&mut self) -> Option<CustomEvent> {
        self.queue.pop_front()
    }

    /// Move every queued event from `other` to the back of this queue.
    pub(crate) fn absorb(&mut self, other: Emitter) {
        self.queue.extend(other.queue);
    }
}

// =============================================================================
// Listeners
// =============================================================================

/// What runs when a host node receives a native event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Listener {
    /// The instance's native handler for `event`.
    Native { instance: InstanceId, event: String },
    /// Copy the element's value into the bound prop.
    Binding(BindingKey),
}
