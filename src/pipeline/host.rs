//! Host - the live document the runtime renders into.
//!
//! The engine never sees DOM nodes directly. A host exposes the handful of
//! operations reconciliation needs: find nodes, read and write attributes,
//! swap a node for new markup, keep listener lists, hold input values and
//! track focus. [`Document`](crate::dom::Document) is the in-memory
//! implementation; a browser binding would wrap real elements.

use std::fmt;

use crate::error::HostError;
use crate::state::{FocusKey, Listener, focus};
use crate::types::{BINDING_ATTR, BindingKey, INSTANCE_ATTR, InstanceId};

/// Capability set a document must provide.
pub trait Host {
    /// Handle to one element. Only meaningful while the element is attached.
    type Node: Clone + PartialEq + fmt::Debug;

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Replace the mount-point element with `markup`. Returns the new root.
    fn mount(&mut self, markup: &str) -> Result<Self::Node, HostError>;

    /// Replace `node` (outer markup included) with `markup`. Returns the new node.
    fn replace(&mut self, node: &Self::Node, markup: &str) -> Result<Self::Node, HostError>;

    /// First attached element, in document order, whose `attr` equals `value`.
    fn query(&self, attr: &str, value: &str) -> Option<Self::Node>;

    /// Element children in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    // -------------------------------------------------------------------------
    // Attributes & Values
    // -------------------------------------------------------------------------

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    /// Current value of a form element.
    fn value(&self, node: &Self::Node) -> String;

    fn set_value(&mut self, node: &Self::Node, value: &str);

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register `listener` for `event` on `node`. Adding the same listener twice is a no-op.
    fn add_listener(&mut self, node: &Self::Node, event: &str, listener: Listener);

    fn remove_listener(&mut self, node: &Self::Node, event: &str, listener: &Listener);

    fn listeners(&self, node: &Self::Node, event: &str) -> Vec<Listener>;

    // -------------------------------------------------------------------------
    // Focus
    // -------------------------------------------------------------------------

    fn focused(&self) -> Option<Self::Node>;

    /// Focus `node`. Returns false when the node is no longer attached.
    fn focus(&mut self, node: &Self::Node) -> bool;

    // -------------------------------------------------------------------------
    // Provided
    // -------------------------------------------------------------------------

    /// Root element of an instance.
    fn instance_root(&self, id: InstanceId) -> Option<Self::Node> {
        self.query(INSTANCE_ATTR, &id.to_string())
    }

    /// Element tagged with a binding key.
    fn binding_element(&self, key: &BindingKey) -> Option<Self::Node> {
        self.query(BINDING_ATTR, &key.to_string())
    }

    /// `node` and every element below it, in document order.
    fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(&current).into_iter().rev());
            out.push(current);
        }
        out
    }

    /// Whether `node` is `ancestor` or lies below it.
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if &candidate == ancestor {
                return true;
            }
            current = self.parent(&candidate);
        }
        false
    }

    /// `node` followed by its ancestors, the path a bubbling event takes.
    fn event_path(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut path = vec![node.clone()];
        let mut current = self.parent(node);
        while let Some(parent) = current {
            current = self.parent(&parent);
            path.push(parent);
        }
        path
    }

    /// Resolve the focused element to a key that survives replacing `scope`.
    fn capture_focus_key(&self, scope: &Self::Node) -> Option<FocusKey<Self::Node>> {
        focus::capture(self, scope)
    }

    /// Focus whatever `key` refers to now.
    fn restore_focus(&mut self, key: &FocusKey<Self::Node>) -> bool {
        focus::restore(self, key)
    }
}
