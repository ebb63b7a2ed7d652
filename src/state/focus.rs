//! Focus Preservation - stable keys for the focused element.
//!
//! Node identity does not survive a subtree replace, so before a re-render
//! the focused element is resolved to a key that does:
//! - The instance id, when the element is an instance root
//! - The binding key, when the element is a bound input
//! - The node itself as a last resort, which only works when the replace
//!   did not touch it
//!
//! # Example
//!
//! ```ignore
//! let key = capture(&host, &root);
//! host.replace(&root, &markup)?;
//! if let Some(key) = key {
//!     restore(&mut host, &key);
//! }
//! ```

use crate::pipeline::Host;
use crate::types::{BINDING_ATTR, BindingKey, INSTANCE_ATTR, InstanceId};

/// Stable reference to a focused element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FocusKey<N> {
    Instance(InstanceId),
    Binding(BindingKey),
    Node(N),
}

/// Resolve the host's focused element to a [`FocusKey`].
///
/// Returns `None` when nothing is focused. Instance and binding keys are only
/// recorded for elements inside `scope` (the subtree about to be replaced).
pub fn capture<H: Host + ?Sized>(host: &H, scope: &H::Node) -> Option<FocusKey<H::Node>> {
    let focused = host.focused()?;

    if host.contains(scope, &focused) {
        if let Some(id) = host
            .attribute(&focused, INSTANCE_ATTR)
            .and_then(|raw| raw.parse().ok())
        {
            return Some(FocusKey::Instance(id));
        }
        if let Some(key) = host
            .attribute(&focused, BINDING_ATTR)
            .and_then(|raw| BindingKey::parse(&raw))
        {
            return Some(FocusKey::Binding(key));
        }
    }

    Some(FocusKey::Node(focused))
}

/// Focus the element a key refers to. Returns whether focus moved.
pub fn restore<H: Host + ?Sized>(host: &mut H, key: &FocusKey<H::Node>) -> bool {
    let target = match key {
        FocusKey::Instance(id) => host.instance_root(*id),
        FocusKey::Binding(key) => host.binding_element(key),
        FocusKey::Node(node) => Some(node.clone()),
    };
    match target {
        Some(node) => host.focus(&node),
        None => false,
    }
}
